use tickwise_core::{Analyzer, Symbol};

use crate::cli::QuoteArgs;
use crate::error::CliError;

use super::CommandOutcome;

/// Runs the chain for the symbol exactly as typed; no variant expansion.
pub async fn run(args: &QuoteArgs, analyzer: &Analyzer) -> Result<CommandOutcome, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let report = analyzer.fetcher().fetch_quote(std::slice::from_ref(&symbol)).await;
    let exit_code = if report.quote.is_some() { 0 } else { 3 };

    Ok(CommandOutcome::ok(serde_json::to_value(&report)?).with_exit_code(exit_code))
}
