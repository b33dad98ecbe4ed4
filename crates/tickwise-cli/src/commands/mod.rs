mod analyze;
mod providers;
mod quote;
mod resolve;

use std::sync::Arc;

use serde_json::Value;
use tickwise_core::{Analyzer, ReqwestHttpClient, TickwiseConfig};
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// JSON payload plus the process exit code it implies.
pub struct CommandOutcome {
    pub data: Value,
    pub exit_code: u8,
}

impl CommandOutcome {
    pub fn ok(data: Value) -> Self {
        Self { data, exit_code: 0 }
    }

    pub fn with_exit_code(mut self, exit_code: u8) -> Self {
        self.exit_code = exit_code;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<CommandOutcome, CliError> {
    let config = load_config(cli)?;
    let analyzer = Analyzer::from_config(&config, Arc::new(ReqwestHttpClient::new()));

    match &cli.command {
        Command::Analyze(args) => analyze::run(args, &analyzer).await,
        Command::Resolve(args) => resolve::run(args, &analyzer).await,
        Command::Quote(args) => quote::run(args, &analyzer).await,
        Command::Providers => providers::run(&analyzer, &config),
    }
}

/// Defaults, then the config file, then environment, then flags.
fn load_config(cli: &Cli) -> Result<TickwiseConfig, CliError> {
    let config = match &cli.config {
        Some(path) => {
            debug!(path = %path.display(), "loading config file");
            TickwiseConfig::from_json_file(path).map_err(|error| CliError::Config(error.to_string()))?
        }
        None => TickwiseConfig::default(),
    };

    let mut config = config
        .with_env_overrides()
        .map_err(|error| CliError::Config(error.to_string()))?;
    apply_flags(cli, &mut config);
    config
        .validate()
        .map_err(|error| CliError::Config(error.to_string()))?;
    Ok(config)
}

fn apply_flags(cli: &Cli, config: &mut TickwiseConfig) {
    if let Some(timeout_ms) = cli.timeout_ms {
        config.fetch.timeout_ms = timeout_ms;
        // search only ever tightens; its own default is already shorter
        config.search.timeout_ms = config.search.timeout_ms.min(timeout_ms);
    }
    if cli.no_search {
        config.search.enabled = false;
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;

    use super::*;

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"fetch":{{"timeout_ms":2500}},"search":{{"enabled":true}}}}"#)
            .expect("write config");
        let path = file.path().to_string_lossy().into_owned();

        let cli = Cli::parse_from(["tickwise", "--config", &path, "--no-search", "providers"]);
        let config = load_config(&cli).expect("valid config");
        assert_eq!(config.fetch.timeout_ms, 2_500);
        assert!(!config.search.enabled);

        let cli = Cli::parse_from(["tickwise", "--config", &path, "--timeout-ms", "700", "providers"]);
        let config = load_config(&cli).expect("valid config");
        assert_eq!(config.fetch.timeout_ms, 700);
        assert_eq!(config.search.timeout_ms, 700);
    }

    #[test]
    fn timeout_flag_caps_search_without_raising_it() {
        let cli = Cli::parse_from(["tickwise", "--timeout-ms", "30000", "providers"]);
        let config = load_config(&cli).expect("valid config");
        assert_eq!(config.fetch.timeout_ms, 30_000);
        assert_eq!(config.search.timeout_ms, TickwiseConfig::default().search.timeout_ms);
    }

    #[test]
    fn zero_timeout_is_a_config_error() {
        let cli = Cli::parse_from(["tickwise", "--timeout-ms", "0", "providers"]);
        let error = load_config(&cli).err().expect("must fail");
        assert_eq!(error.exit_code(), 5);
    }
}
