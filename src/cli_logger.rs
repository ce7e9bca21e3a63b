use anyhow::Result;
use pariksha::{ExportSummary, OutputsListing};
use serde::Serialize;
use serde_json::Value;

pub struct CliLogger {
    json: bool,
    no_color: bool,
}

impl CliLogger {
    pub fn new(json: bool, no_color: bool) -> Self {
        Self { json, no_color }
    }

    pub fn print_serialized<T: Serialize>(&self, value: &T) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(value)?);
            return Ok(());
        }

        let rendered = render_value(&serde_json::to_value(value)?, 0);
        println!("{rendered}");
        Ok(())
    }

    pub fn print_export(&self, summary: &ExportSummary) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(summary)?);
            return Ok(());
        }

        let status = if summary.written {
            self.style("OK", "32;1")
        } else {
            self.style("SKIPPED", "33;1")
        };
        let mut out = String::new();
        out.push_str(&format!(
            "{} {} {}\n",
            self.style("pariksha", "36;1"),
            self.style("export", "37;1"),
            status
        ));
        out.push_str(&format!(
            "{} {}\n",
            self.style("artifact", "90"),
            summary.artifact.display()
        ));
        out.push_str(&format!("{} {}\n", self.style("format", "90"), summary.format));
        if summary.written {
            out.push_str(&format!("{} {}\n", self.style("out", "90"), summary.out.display()));
        }
        if !summary.warnings.is_empty() {
            out.push_str(&format!("{}\n", self.style("warnings", "33;1")));
            for warning in &summary.warnings {
                out.push_str(&format!(
                    "  - [{}] {}\n",
                    format!("{:?}", warning.stage).to_lowercase(),
                    warning.message
                ));
            }
        }

        println!("{}", out.trim_end());
        Ok(())
    }

    pub fn print_outputs(&self, listing: &OutputsListing) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(listing)?);
            return Ok(());
        }

        let mut out = String::new();
        out.push_str(&format!(
            "{} {} ({} files)\n",
            self.style("outputs", "36;1"),
            listing.root.display(),
            listing.total
        ));
        for file in &listing.files {
            let shown = file.strip_prefix(&listing.root).unwrap_or(file);
            out.push_str(&format!("  {}\n", shown.display()));
        }
        println!("{}", out.trim_end());
        Ok(())
    }

    pub fn print_error(&self, msg: &str) {
        if self.json {
            let out = serde_json::json!({
                "status": "error",
                "code": "error",
                "message": msg,
            });
            println!("{out}");
            return;
        }
        eprintln!("{} {msg}", self.style("error", "31;1"));
    }

    fn style(&self, text: &str, ansi: &str) -> String {
        if self.no_color {
            return text.to_string();
        }
        format!("\x1b[{ansi}m{text}\x1b[0m")
    }
}

fn render_value(value: &Value, indent: usize) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(v) => v.to_string(),
        Value::Number(v) => v.to_string(),
        Value::String(v) => v.clone(),
        Value::Array(items) => render_array(items, indent),
        Value::Object(map) => render_object(map, indent),
    }
}

fn render_array(items: &[Value], indent: usize) -> String {
    if items.is_empty() {
        return "[]".to_string();
    }

    let pad = " ".repeat(indent);
    let mut out = String::new();
    for item in items {
        match item {
            Value::Object(_) | Value::Array(_) => {
                out.push_str(&format!("{pad}-\n{}\n", render_value(item, indent + 2)));
            }
            _ => out.push_str(&format!("{pad}- {}\n", render_value(item, indent + 2))),
        }
    }
    out.trim_end().to_string()
}

fn render_object(map: &serde_json::Map<String, Value>, indent: usize) -> String {
    if map.is_empty() {
        return "{}".to_string();
    }

    let pad = " ".repeat(indent);
    let mut out = String::new();
    for (key, value) in map {
        match value {
            Value::Object(_) | Value::Array(_) => {
                out.push_str(&format!(
                    "{pad}{key}:\n{}\n",
                    render_value(value, indent + 2)
                ));
            }
            _ => out.push_str(&format!(
                "{pad}{key}: {}\n",
                render_value(value, indent + 2)
            )),
        }
    }
    out.trim_end().to_string()
}
