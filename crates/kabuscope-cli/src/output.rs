use serde_json::Value;

use crate::cli::OutputFormat;
use crate::commands::CommandResult;
use crate::error::CliError;

pub fn render(result: &CommandResult, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(&result.data)?
            } else {
                serde_json::to_string(&result.data)?
            };
            println!("{payload}");
        }
        OutputFormat::Table => render_table(result)?,
    }

    Ok(())
}

fn render_table(result: &CommandResult) -> Result<(), CliError> {
    if result.summary.is_empty() {
        return render_value(&result.data);
    }

    let width = result
        .summary
        .iter()
        .map(|(label, _)| label.len())
        .max()
        .unwrap_or(0);
    for (label, value) in &result.summary {
        println!("{label:<width$} : {value}");
    }

    if !result.details.is_empty() {
        println!();
        for line in &result.details {
            println!("  {line}");
        }
    }

    Ok(())
}

fn render_value(data: &Value) -> Result<(), CliError> {
    let pretty = serde_json::to_string_pretty(data)?;
    for line in pretty.lines() {
        println!("  {line}");
    }
    Ok(())
}
