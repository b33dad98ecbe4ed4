use serde::Serialize;
use tickwise_core::{Analyzer, ProviderStatus, TickwiseConfig};

use crate::error::CliError;

use super::CommandOutcome;

#[derive(Debug, Serialize)]
struct ProvidersResponseData {
    providers: Vec<ProviderStatus>,
    search_enabled: bool,
    cache_enabled: bool,
    timeout_ms: u64,
}

pub fn run(analyzer: &Analyzer, config: &TickwiseConfig) -> Result<CommandOutcome, CliError> {
    let data = ProvidersResponseData {
        providers: analyzer.fetcher().chain().statuses(),
        search_enabled: analyzer.resolver().has_search(),
        cache_enabled: analyzer.fetcher().chain().cache().is_some(),
        timeout_ms: config.fetch.timeout_ms,
    };
    Ok(CommandOutcome::ok(serde_json::to_value(data)?))
}
