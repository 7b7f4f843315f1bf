use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use tagwire_codec::{Envelope, Value};
use tracing::warn;

use crate::cmd::decode::decode_message;
use crate::cmd::DecodeArgs;
use crate::exit::{CliResult, FAILURE, SUCCESS};
use crate::input::read_message;
use crate::output::{outline, print_json, OutputFormat};

#[derive(Serialize)]
struct EnvelopeOutput<'a> {
    schema_id: &'a str,
    success: bool,
    data: Option<&'a [Value]>,
    traceback: Vec<String>,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = read_message(args.path.as_deref(), args.hex.as_deref())?;
    let envelope = Envelope::from(decode_message(&bytes, args.max_depth)?);
    let success = envelope.is_success();

    match format {
        OutputFormat::Json => print_json(&EnvelopeOutput {
            schema_id: "https://schemas.3leaps.dev/tagwire/cli/v1/envelope.schema.json",
            success,
            data: envelope.data.as_deref(),
            traceback: envelope.traceback_lines(),
        }),
        OutputFormat::Table => println!("{}", envelope_table(&envelope)),
        OutputFormat::Pretty => println!("{}", envelope_outline(&envelope)),
        OutputFormat::Raw => print_json(&envelope.data),
    }

    if success {
        return Ok(SUCCESS);
    }
    warn!(
        traceback_lines = envelope.traceback.as_ref().map_or(0, Vec::len),
        "envelope reports failure"
    );
    Ok(FAILURE)
}

fn status(envelope: &Envelope) -> &'static str {
    if envelope.is_success() {
        "success"
    } else {
        "failure"
    }
}

fn envelope_table(envelope: &Envelope) -> Table {
    let data = match &envelope.data {
        Some(items) => serde_json::to_string(items).unwrap_or_else(|_| "?".to_string()),
        None => "-".to_string(),
    };
    let traceback = if envelope.traceback.is_some() {
        envelope.traceback_lines().join("\n")
    } else {
        "-".to_string()
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["FIELD", "VALUE"])
        .add_row(vec!["status".to_string(), status(envelope).to_string()])
        .add_row(vec!["data".to_string(), data])
        .add_row(vec!["traceback".to_string(), traceback]);
    table
}

fn envelope_outline(envelope: &Envelope) -> String {
    let mut lines = vec![format!("status: {}", status(envelope))];
    match &envelope.data {
        Some(items) => {
            lines.push("data:".to_string());
            for line in outline(&Value::List(items.clone())).lines().skip(1) {
                lines.push(line.to_string());
            }
        }
        None => lines.push("data: absent".to_string()),
    }
    if envelope.traceback.is_some() {
        lines.push("traceback:".to_string());
        for line in envelope.traceback_lines() {
            lines.push(format!("  {line}"));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outline_lists_data_and_traceback() {
        let envelope = Envelope {
            data: Some(vec![]),
            traceback: Some(vec![Value::from("boom")]),
        };
        assert_eq!(
            envelope_outline(&envelope),
            "status: failure\ndata:\ntraceback:\n  boom"
        );
    }

    #[test]
    fn table_marks_absent_fields() {
        let rendered = envelope_table(&Envelope::success(vec![Value::Int32(7)])).to_string();
        assert!(rendered.contains("success"));
        assert!(rendered.contains("[7]"));
        assert!(rendered.contains('-'));
    }
}
