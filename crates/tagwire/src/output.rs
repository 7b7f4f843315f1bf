use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use tagwire_codec::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

pub fn print_json<T: Serialize>(out: &T) {
    println!(
        "{}",
        serde_json::to_string(out).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// One row per top-level element or entry.
pub fn value_table(value: &Value) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["KEY", "TYPE", "VALUE"]);

    match value {
        Value::List(items) => {
            for (idx, item) in items.iter().enumerate() {
                table.add_row(row(idx.to_string(), item));
            }
        }
        Value::Map(map) => {
            for (key, item) in map {
                table.add_row(row(key.to_string(), item));
            }
        }
        other => {
            table.add_row(row("-".to_string(), other));
        }
    }
    table
}

fn row(key: String, value: &Value) -> Vec<String> {
    vec![key, value.kind().to_string(), inline(value)]
}

/// Indented outline of the whole tree, one line per value.
pub fn outline(value: &Value) -> String {
    let mut lines = Vec::new();
    push_outline(&mut lines, None, value, 0);
    lines.join("\n")
}

fn push_outline(lines: &mut Vec<String>, label: Option<String>, value: &Value, depth: usize) {
    let indent = "  ".repeat(depth);
    let label = label.map(|l| format!("{l} ")).unwrap_or_default();
    lines.push(format!("{indent}{label}{}", describe(value)));

    match value {
        Value::List(items) => {
            for (idx, item) in items.iter().enumerate() {
                push_outline(lines, Some(format!("[{idx}]")), item, depth + 1);
            }
        }
        Value::Map(map) => {
            for (key, item) in map {
                push_outline(lines, Some(format!("{key:?}:")), item, depth + 1);
            }
        }
        _ => {}
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::List(items) => format!("list ({})", items.len()),
        Value::Map(map) => format!("map ({})", map.len()),
        Value::Null => "null".to_string(),
        other => format!("{} {}", other.kind(), inline(other)),
    }
}

fn inline(value: &Value) -> String {
    match value {
        Value::Text(text) => format!("{text:?}"),
        Value::Float64(n) if !n.is_finite() => n.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "?".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagwire_codec::Map;

    fn sample() -> Value {
        let inner: Map = [("a", Value::Int32(1)), ("b", Value::Text("x".into()))]
            .into_iter()
            .collect();
        Value::List(vec![Value::Map(inner), Value::Float64(f64::NAN), Value::Null])
    }

    #[test]
    fn outline_indents_children() {
        assert_eq!(
            outline(&sample()),
            [
                "list (3)",
                "  [0] map (2)",
                "    \"a\": int32 1",
                "    \"b\": text \"x\"",
                "  [1] float64 NaN",
                "  [2] null",
            ]
            .join("\n")
        );
    }

    #[test]
    fn table_has_row_per_element() {
        let rendered = value_table(&sample()).to_string();
        assert!(rendered.contains("KEY"));
        assert!(rendered.contains(r#"{"a":1,"b":"x"}"#));
        assert!(rendered.contains("NaN"));
    }

    #[test]
    fn primitive_root_gets_single_row() {
        let rendered = value_table(&Value::Bool(true)).to_string();
        assert!(rendered.contains("bool"));
        assert!(rendered.contains("true"));
    }
}
