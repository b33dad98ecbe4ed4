//! CLI argument definitions for tickwise.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `analyze` | Resolve free text, fetch a quote, and derive alerts |
//! | `resolve` | Show the candidate and symbol variants for free text |
//! | `quote` | Run the provider chain for one exact symbol |
//! | `providers` | List the provider chain and credential status |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--timeout-ms` | config | Per-request timeout in ms; also caps the search timeout |
//! | `--config` | none | JSON config file |
//! | `--no-search` | `false` | Skip the symbol search step |
//! | `--no-cache` | `false` | Neither read nor write the quote cache |
//!
//! # Examples
//!
//! ```bash
//! tickwise analyze show me sbin price --entry 560
//! tickwise analyze infy --lot 1400@10 --lot 1550@5 --pretty
//! tickwise resolve "track reliance" --no-search
//! tickwise quote BTC-USD
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Resolve a ticker from free text and fetch its latest price.
#[derive(Debug, Parser)]
#[command(
    name = "tickwise",
    author,
    version,
    about = "Free-text ticker resolution and multi-provider quotes",
    long_about = "tickwise turns a loose query such as 'show me sbin price' into a listed \
symbol and fetches its latest price through a provider fallback chain \
(Yahoo chart, Yahoo quote, Alpha Vantage).\n\
\n\
Set TICKWISE_ALPHAVANTAGE_API_KEY (or ALPHAVANTAGE_API_KEY) to enable the \
Alpha Vantage fallback. Logs go to stderr; tune them with RUST_LOG."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Provider request timeout in milliseconds (overrides config). Search uses the
    /// smaller of this and its configured timeout.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// JSON configuration file.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Skip the external symbol search step.
    #[arg(long, global = true, default_value_t = false)]
    pub no_search: bool,

    /// Bypass the in-memory quote cache.
    #[arg(long, global = true, default_value_t = false)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve free text and fetch a quote, with alerts against an entry price.
    ///
    /// Exits with code 3 when no price data could be found.
    ///
    /// # Examples
    ///
    ///   tickwise analyze show me sbin price
    ///   tickwise analyze tcs --entry 3900
    ///   tickwise analyze infy --lot 1400@10 --lot 1550@5
    Analyze(AnalyzeArgs),

    /// Show the extracted candidate and the ordered symbol variants.
    ///
    /// # Examples
    ///
    ///   tickwise resolve "buy m&m"
    ///   tickwise resolve reliance --no-search
    Resolve(ResolveArgs),

    /// Fetch a quote for one exact symbol through the provider chain.
    ///
    /// # Examples
    ///
    ///   tickwise quote SBIN.NS
    ///   tickwise quote BTC-USD --pretty
    Quote(QuoteArgs),

    /// List providers in chain order with credential status.
    Providers,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Free-form query naming a stock or coin.
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,

    /// Entry price used for profit and loss alerts.
    #[arg(long, conflicts_with = "lots")]
    pub entry: Option<f64>,

    /// Purchase lot as PRICE@QUANTITY; repeat to average several lots.
    #[arg(long = "lot", value_name = "PRICE@QTY")]
    pub lots: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Free-form query naming a stock or coin.
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,
}

#[derive(Debug, Args)]
pub struct QuoteArgs {
    /// Exact market symbol (e.g. SBIN.NS, AAPL, BTC-USD).
    pub symbol: String,
}
