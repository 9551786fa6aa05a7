use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use xapilink_codec::{DecodedValue, Value};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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

/// Print one decoded message (response or event).
pub fn print_message(message: &DecodedValue, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let mut fields = serde_json::Map::new();
            for (name, value) in message.iter() {
                fields.insert(name.to_string(), value_to_json(value));
            }
            let out = serde_json::json!({
                "message": message.qualified_name(),
                "kind": message.kind().tag(),
                "fields": fields,
                "timestamp": now_unix_seconds(),
            });
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["MESSAGE", "FIELD", "VALUE"]);
            if message.is_empty() {
                table.add_row(vec![message.qualified_name(), String::new(), String::new()]);
            } else {
                for (index, (name, value)) in message.iter().enumerate() {
                    let label = if index == 0 {
                        message.qualified_name()
                    } else {
                        String::new()
                    };
                    table.add_row(vec![label, name.to_string(), value.to_string()]);
                }
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{message}");
        }
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Unsigned(v) => serde_json::Value::from(*v),
        Value::Signed(v) => serde_json::Value::from(*v),
        // Hex keeps binary fields printable and round-trippable.
        Value::Bytes(bytes) => serde_json::Value::from(hex_string(bytes)),
        Value::Text(text) => serde_json::Value::from(text.as_str()),
    }
}

pub fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
