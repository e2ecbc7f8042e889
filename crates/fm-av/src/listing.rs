//! Parsers for ffmpeg's human-readable introspection output.
//!
//! ffmpeg has no machine-readable surface for its muxer/encoder inventory,
//! so everything here scrapes columnar text. The format is fragile by
//! nature; this module is the only place that knows about it, and the rest
//! of the crate consumes the structured types it returns.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// One row of a columnar listing (`ffmpeg -muxers`, `-formats`, `-encoders`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRow {
    /// Capability flag column (e.g. `E`, `DE`, `V....D`).
    pub flag: String,
    /// Entry name.
    pub name: String,
    /// Human-readable description (remaining columns joined).
    pub description: String,
}

/// A muxer as reported by `ffmpeg -muxers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Muxer {
    /// Capability flag column.
    pub flag: String,
    /// Muxer name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
}

impl From<ListingRow> for Muxer {
    fn from(row: ListingRow) -> Self {
        Self {
            flag: row.flag,
            name: row.name,
            description: row.description,
        }
    }
}

/// Parse a columnar listing.
///
/// The listings all share one shape: a free-form header terminated by a
/// dash separator line, then one row per entry with a flag field, a name
/// field, and one or more description words. Rows with fewer than three
/// fields are skipped. The separator width varies by listing (`--` for
/// muxers/formats, `-------` for codecs), so any all-dash line counts.
///
/// # Errors
///
/// Returns [`fm_core::Error::Parse`] if no separator line is present.
pub fn parse_listing(output: &str) -> fm_core::Result<Vec<ListingRow>> {
    let lines: Vec<&str> = output.lines().collect();
    let start = lines
        .iter()
        .position(|line| is_separator(line))
        .ok_or_else(|| fm_core::Error::parse("no dash separator line in listing output"))?;

    let mut rows = Vec::new();
    for line in &lines[start + 1..] {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            continue;
        }
        rows.push(ListingRow {
            flag: fields[0].to_string(),
            name: fields[1].to_string(),
            description: fields[2..].join(" "),
        });
    }

    Ok(rows)
}

/// True for a header/data separator line: nothing but dashes, at least two.
fn is_separator(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 2 && trimmed.chars().all(|c| c == '-')
}

/// Parse `ffmpeg -muxers` output.
pub fn parse_muxers(output: &str) -> fm_core::Result<Vec<Muxer>> {
    Ok(parse_listing(output)?.into_iter().map(Muxer::from).collect())
}

/// Lower-case `text`, strip parentheses, and split on space, slash, and
/// comma. Used to cross-reference a container format's (possibly compound)
/// name against single-token muxer names.
pub fn clean_and_split(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| *c != '(' && *c != ')')
        .collect();
    cleaned
        .split(|c| c == ' ' || c == '/' || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Option-help parsing (`ffmpeg -h muxer=...` / `-h encoder=...`)
// ---------------------------------------------------------------------------

/// One AVOption entry from a help page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpOption {
    /// Option name (without leading dash).
    pub name: String,
    /// Declared value type (e.g. `flags`, `int`, `string`).
    pub value_type: String,
    /// Option flag column (e.g. `E..........`).
    pub flags: String,
    /// Description text.
    pub description: String,
    /// Named constant values accepted by the option.
    pub values: Vec<HelpOptionValue>,
}

/// A named constant value of a [`HelpOption`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpOptionValue {
    /// Constant name.
    pub name: String,
    /// Numeric value.
    pub value: i64,
    /// Flag column.
    pub flags: String,
    /// Description text.
    pub description: String,
}

/// Structured view of an `ffmpeg -h muxer=...` / `-h encoder=...` page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolHelp {
    /// Indented `Key: value` metadata lines, in page order.
    pub metadata: Vec<(String, String)>,
    /// AVOption entries.
    pub options: Vec<HelpOption>,
    /// Supported pixel formats (encoders only).
    pub pixel_formats: Vec<String>,
    /// Supported sample formats (audio encoders only).
    pub sample_formats: Vec<String>,
}

impl ToolHelp {
    /// Look up a metadata value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Common file extensions, split and cleaned of the trailing period.
    pub fn extensions(&self) -> Vec<String> {
        self.get("Common extensions")
            .map(|v| {
                v.trim_end_matches('.')
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Declared default video codec, if any.
    pub fn default_video_codec(&self) -> Option<String> {
        self.get("Default video codec")
            .map(|v| v.trim_end_matches('.').to_string())
    }

    /// Declared default audio codec, if any.
    pub fn default_audio_codec(&self) -> Option<String> {
        self.get("Default audio codec")
            .map(|v| v.trim_end_matches('.').to_string())
    }

    /// Sorted option names.
    pub fn option_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.options.iter().map(|o| o.name.clone()).collect();
        names.sort();
        names
    }
}

// The indentation widths are load-bearing: 4 spaces for metadata,
// 2 for options, 5 for option constants.
static METADATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s{4}(?P<key>[A-Za-z ]+):\s+(?P<value>.+)$").expect("valid regex")
});
static PIXEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s{4}Supported pixel formats:\s+(?P<formats>.+)$").expect("valid regex")
});
static SAMPLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s{4}Supported sample formats:\s+(?P<formats>.+)$").expect("valid regex")
});
static OPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s{2}-(?P<name>\S+)\s+<(?P<type>\S+)>\s+(?P<flags>[A-Z.]+)\s+(?P<description>.+)$")
        .expect("valid regex")
});
static VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s{5}(?P<name>\S+)\s+(?P<value>[\-\d]+)\s+(?P<flags>[A-Z.]+)\s+(?P<description>.+)$")
        .expect("valid regex")
});

/// Parse an `ffmpeg -h muxer=...` / `-h encoder=...` help page.
pub fn parse_tool_help(output: &str) -> ToolHelp {
    let mut help = ToolHelp::default();
    let mut current_option: Option<HelpOption> = None;

    for line in output.lines() {
        if let Some(caps) = PIXEL_RE.captures(line) {
            help.pixel_formats = caps["formats"]
                .split_whitespace()
                .map(|s| s.to_string())
                .collect();
            continue;
        }
        if let Some(caps) = SAMPLE_RE.captures(line) {
            help.sample_formats = caps["formats"]
                .split_whitespace()
                .map(|s| s.to_string())
                .collect();
            continue;
        }
        if let Some(caps) = METADATA_RE.captures(line) {
            help.metadata.push((
                caps["key"].trim().to_string(),
                caps["value"].trim().to_string(),
            ));
            continue;
        }
        if let Some(caps) = OPTION_RE.captures(line) {
            if let Some(opt) = current_option.take() {
                help.options.push(opt);
            }
            current_option = Some(HelpOption {
                name: caps["name"].to_string(),
                value_type: caps["type"].to_string(),
                flags: caps["flags"].to_string(),
                description: caps["description"].to_string(),
                values: Vec::new(),
            });
            continue;
        }
        if let Some(ref mut opt) = current_option {
            if let Some(caps) = VALUE_RE.captures(line) {
                if let Ok(value) = caps["value"].parse::<i64>() {
                    opt.values.push(HelpOptionValue {
                        name: caps["name"].to_string(),
                        value,
                        flags: caps["flags"].to_string(),
                        description: caps["description"].to_string(),
                    });
                }
            }
        }
    }

    if let Some(opt) = current_option {
        help.options.push(opt);
    }

    help
}
