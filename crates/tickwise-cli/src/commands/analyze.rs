use serde_json::Value;
use tickwise_core::{Analyzer, Lot, Position};

use crate::cli::AnalyzeArgs;
use crate::error::CliError;

use super::CommandOutcome;

pub async fn run(args: &AnalyzeArgs, analyzer: &Analyzer) -> Result<CommandOutcome, CliError> {
    let text = args.text.join(" ");
    let position = aggregate_lots(&args.lots)?;
    let entry_price = args.entry.or(position.map(|position| position.average_entry));

    let report = analyzer.analyze(&text, entry_price).await;
    let exit_code = if report.is_success() { 0 } else { 3 };

    let mut data = serde_json::to_value(&report)?;
    if let (Some(position), Value::Object(fields)) = (position, &mut data) {
        fields.insert(String::from("position"), serde_json::to_value(position)?);
    }

    Ok(CommandOutcome::ok(data).with_exit_code(exit_code))
}

fn aggregate_lots(raw: &[String]) -> Result<Option<Position>, CliError> {
    let lots = raw
        .iter()
        .map(|lot| lot.parse::<Lot>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Position::aggregate(&lots))
}
