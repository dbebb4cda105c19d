//! Value rendering for log lines and command output.

use anyhow::Result;
use clap::ValueEnum;
use serde_json::Value;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    #[value(alias = "yml")]
    Yaml,
}

impl OutputFormat {
    /// Render a value in this format.
    pub fn render(&self, value: &Value) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => {
                let mut out = serde_yaml::to_string(value)?;
                if out.ends_with('\n') {
                    out.pop();
                }
                Ok(out)
            }
        }
    }
}

/// Human readable rendering used in mutation log lines.
///
/// A top-level string is printed bare (`mock.a=b`); strings nested in
/// containers are quoted. Containers use `, ` and `: ` separators.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => {
            let mut out = String::new();
            render_nested(other, &mut out);
            out
        }
    }
}

fn render_nested(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_nested(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push_str(": ");
                render_nested(item, out);
            }
            out.push('}');
        }
        // Display on a scalar Value is its compact JSON form
        scalar => out.push_str(&scalar.to_string()),
    }
}
