//! Table rendering for CLI output.
//!
//! Everything funnels through [`render`], a thin wrapper over the `tabled`
//! builder API. JSON documents are flattened into dot-keyed Setting/Value
//! rows first, so nested probe output reads as one flat table.

use tabled::builder::Builder;
use tabled::settings::Style;

/// Render a header row plus data rows as a rounded-border table.
pub fn render(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut builder = Builder::default();
    builder.push_record(headers.iter().map(|h| h.to_string()));
    for row in rows {
        builder.push_record(row);
    }
    builder.build().with(Style::rounded()).to_string()
}

/// Render a JSON document as a two-column Setting/Value table, flattening
/// nested objects into dot-separated keys.
pub fn settings_table(value: &serde_json::Value) -> String {
    let mut rows = Vec::new();
    flatten_into("", value, &mut rows);
    render(&["Setting", "Value"], rows)
}

fn flatten_into(prefix: &str, value: &serde_json::Value, rows: &mut Vec<Vec<String>>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                let full_key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(&full_key, child, rows);
            }
        }
        other => {
            rows.push(vec![prefix.to_string(), scalar_to_string(other)]);
        }
    }
}

/// Display form of a leaf value: strings unquoted, everything else as JSON.
pub fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_headers_and_rows() {
        let out = render(
            &["Name", "Value"],
            vec![vec!["a".into(), "1".into()], vec!["b".into(), "2".into()]],
        );
        assert!(out.contains("Name"));
        assert!(out.contains("a"));
        assert!(out.contains("2"));
    }

    #[test]
    fn settings_table_flattens_nested_keys() {
        let value = serde_json::json!({
            "video": { "codec": "h264", "width": 1920 },
            "extension": "mp4"
        });
        let out = settings_table(&value);
        assert!(out.contains("video.codec"));
        assert!(out.contains("h264"));
        assert!(out.contains("video.width"));
        assert!(out.contains("1920"));
        assert!(out.contains("extension"));
    }

    #[test]
    fn scalars_render_without_quotes() {
        assert_eq!(scalar_to_string(&serde_json::json!("mp4")), "mp4");
        assert_eq!(scalar_to_string(&serde_json::json!(42)), "42");
        assert_eq!(scalar_to_string(&serde_json::Value::Null), "");
        assert_eq!(scalar_to_string(&serde_json::json!(["a", "b"])), "[\"a\",\"b\"]");
    }
}
