use tickwise_core::Analyzer;

use crate::cli::ResolveArgs;
use crate::error::CliError;

use super::CommandOutcome;

pub async fn run(args: &ResolveArgs, analyzer: &Analyzer) -> Result<CommandOutcome, CliError> {
    let text = args.text.join(" ");
    let resolution = analyzer.resolver().resolve(&text).await?;
    Ok(CommandOutcome::ok(serde_json::to_value(resolution)?))
}
