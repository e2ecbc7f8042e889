//! Structured snapshots of the runtime's codec and container inventory.
//!
//! [`CodecCatalog`] holds every encode-capable codec (video/audio), parsed
//! from the `-codecs` listing. [`FormatCatalog`] holds every output-capable
//! container format, parsed from the `-muxers` and `-formats` listings and
//! enriched with extensions, default codecs, and option names from the
//! per-muxer help page. Both are loaded once and treated as immutable for
//! the rest of the run.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::command::ToolCommand;
use crate::listing::{self, ListingRow, Muxer, ToolHelp};
use crate::tools::ToolConfig;

/// Media kind of a codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    Video,
    Audio,
}

impl CodecKind {
    /// Canonical lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl std::fmt::Display for CodecKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An encode-capable codec known to the runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Codec {
    /// Lower-case codec name (the identity used everywhere).
    pub name: String,
    /// Video or audio.
    pub kind: CodecKind,
    /// Human-readable description from the listing.
    pub description: String,
}

/// Detailed per-encoder information from `ffmpeg -h encoder=...`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecDetails {
    /// Encoder name the details were requested for.
    pub name: String,
    /// `Key: value` capability lines, in page order.
    pub capabilities: Vec<(String, String)>,
    /// Supported pixel formats (video encoders).
    pub pixel_formats: Vec<String>,
    /// Supported sample formats (audio encoders).
    pub sample_formats: Vec<String>,
    /// Sorted private option names.
    pub options: Vec<String>,
}

/// All encode-capable codecs, indexed by name.
#[derive(Debug, Clone)]
pub struct CodecCatalog {
    codecs: Vec<Codec>,
}

impl CodecCatalog {
    /// Load the catalog by running `ffmpeg -codecs`.
    pub async fn load(ffmpeg: &ToolConfig, timeout: Duration) -> fm_core::Result<Self> {
        let output = ToolCommand::new(ffmpeg.path.clone())
            .args(["-hide_banner", "-codecs"])
            .timeout(timeout)
            .execute()
            .await?;
        Self::from_listing(&output.stdout)
    }

    /// Build the catalog from a raw `-codecs` listing.
    ///
    /// Rows that are not encode-capable, not video/audio, or unparsable are
    /// silently excluded; they can never be probed or resolved against.
    pub fn from_listing(output: &str) -> fm_core::Result<Self> {
        let rows = listing::parse_listing(output)?;

        let mut codecs: Vec<Codec> = rows
            .into_iter()
            .filter_map(|row| {
                let mut flags = row.flag.chars();
                let _decode = flags.next();
                let encode = flags.next();
                let kind = flags.next();
                if encode != Some('E') {
                    return None;
                }
                let kind = match kind {
                    Some('V') => CodecKind::Video,
                    Some('A') => CodecKind::Audio,
                    _ => return None,
                };
                Some(Codec {
                    name: row.name.to_lowercase(),
                    kind,
                    description: row.description,
                })
            })
            .collect();

        codecs.sort_by(|a, b| a.name.cmp(&b.name));
        codecs.dedup_by(|a, b| a.name == b.name);

        Ok(Self { codecs })
    }

    /// Look up a codec by (case-insensitive) name.
    pub fn get(&self, name: &str) -> Option<&Codec> {
        let name = name.to_lowercase();
        self.codecs
            .binary_search_by(|c| c.name.as_str().cmp(name.as_str()))
            .ok()
            .map(|i| &self.codecs[i])
    }

    /// Iterate over codecs of one kind.
    pub fn of_kind(&self, kind: CodecKind) -> impl Iterator<Item = &Codec> {
        self.codecs.iter().filter(move |c| c.kind == kind)
    }

    /// Sorted codec names of one kind.
    pub fn names_of_kind(&self, kind: CodecKind) -> Vec<String> {
        self.of_kind(kind).map(|c| c.name.clone()).collect()
    }

    /// All codecs, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &Codec> {
        self.codecs.iter()
    }

    /// Number of codecs in the catalog.
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// True when the catalog holds no codecs.
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

/// Fetch detailed settings for one encoder via `ffmpeg -h encoder=...`.
pub async fn encoder_details(
    ffmpeg: &ToolConfig,
    name: &str,
    timeout: Duration,
) -> fm_core::Result<CodecDetails> {
    let output = ToolCommand::new(ffmpeg.path.clone())
        .args(["-hide_banner", "-h"])
        .arg(format!("encoder={name}"))
        .timeout(timeout)
        .execute()
        .await?;

    // ffmpeg reports unknown encoders on stdout with a zero exit.
    if output.stdout.contains("is not recognized") {
        return Err(fm_core::Error::tool(
            "ffmpeg",
            format!("encoder '{name}' is not recognized"),
        ));
    }

    let help = listing::parse_tool_help(&output.stdout);
    Ok(CodecDetails {
        name: name.to_string(),
        capabilities: help.metadata.clone(),
        pixel_formats: help.pixel_formats.clone(),
        sample_formats: help.sample_formats.clone(),
        options: help.option_names(),
    })
}

/// List all encoders from `ffmpeg -encoders`.
pub async fn list_encoders(
    ffmpeg: &ToolConfig,
    timeout: Duration,
) -> fm_core::Result<Vec<ListingRow>> {
    let output = ToolCommand::new(ffmpeg.path.clone())
        .args(["-hide_banner", "-encoders"])
        .timeout(timeout)
        .execute()
        .await?;
    listing::parse_listing(&output.stdout)
}

// ---------------------------------------------------------------------------
// Container formats
// ---------------------------------------------------------------------------

/// An output-capable container format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerFormat {
    /// Format (muxer) name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Whether a demuxer exists for the format family.
    pub input: bool,
    /// Whether the format can be written. Always true for catalog entries;
    /// kept so snapshots remain self-describing.
    pub output: bool,
    /// Declared default muxer name.
    pub muxer: String,
    /// Muxer names cross-referenced from the format family's compound name.
    pub available_muxers: Vec<String>,
    /// Sorted file extensions.
    pub extensions: Vec<String>,
    /// Sorted format-level option names.
    pub options: Vec<String>,
    /// Declared default video codec, if any.
    pub default_video_codec: Option<String>,
    /// Declared default audio codec, if any.
    pub default_audio_codec: Option<String>,
}

/// All output-capable container formats, sorted by name.
#[derive(Debug, Clone)]
pub struct FormatCatalog {
    formats: Vec<ContainerFormat>,
}

impl FormatCatalog {
    /// Load the catalog by running `ffmpeg -muxers`, `ffmpeg -formats`, and
    /// one `ffmpeg -h muxer=...` per muxer.
    ///
    /// A muxer whose help page cannot be fetched or parsed is silently
    /// excluded from the catalog (logged at debug), mirroring the codec
    /// side: what cannot be introspected is never probed.
    pub async fn load(ffmpeg: &ToolConfig, timeout: Duration) -> fm_core::Result<Self> {
        let muxers_out = ToolCommand::new(ffmpeg.path.clone())
            .args(["-hide_banner", "-muxers"])
            .timeout(timeout)
            .execute()
            .await?;
        let formats_out = ToolCommand::new(ffmpeg.path.clone())
            .args(["-hide_banner", "-formats"])
            .timeout(timeout)
            .execute()
            .await?;

        let muxers = listing::parse_muxers(&muxers_out.stdout)?;
        let format_rows = listing::parse_listing(&formats_out.stdout)?;

        let mut helps = HashMap::new();
        for muxer in &muxers {
            let result = ToolCommand::new(ffmpeg.path.clone())
                .args(["-hide_banner", "-h"])
                .arg(format!("muxer={}", muxer.name))
                .timeout(timeout)
                .execute()
                .await;
            match result {
                Ok(output) => {
                    helps.insert(muxer.name.clone(), listing::parse_tool_help(&output.stdout));
                }
                Err(e) => {
                    tracing::debug!("excluding muxer {}: {e}", muxer.name);
                }
            }
        }

        Ok(Self::assemble(&muxers, &format_rows, &helps))
    }

    /// Assemble the catalog from already-parsed listings. Split out from
    /// [`FormatCatalog::load`] so the stitching logic is testable without a
    /// runtime.
    pub fn assemble(
        muxers: &[Muxer],
        format_rows: &[ListingRow],
        helps: &HashMap<String, ToolHelp>,
    ) -> Self {
        let mut formats = Vec::new();

        for muxer in muxers {
            // A muxer without a parsed help page was not introspectable.
            let Some(help) = helps.get(&muxer.name) else {
                continue;
            };

            // Find the format-family row this muxer belongs to; the row name
            // may be compound ("mov,mp4,m4a,3gp,3g2,mj2").
            let family = format_rows.iter().find(|row| {
                listing::clean_and_split(&row.name)
                    .iter()
                    .any(|token| token == &muxer.name.to_lowercase())
            });

            let input = family
                .map(|row| row.flag.contains('D'))
                .unwrap_or(false);

            let mut available_muxers: Vec<String> = family
                .map(|row| {
                    let tokens = listing::clean_and_split(&row.name);
                    muxers
                        .iter()
                        .filter(|m| tokens.iter().any(|t| t == &m.name.to_lowercase()))
                        .map(|m| m.name.clone())
                        .collect()
                })
                .unwrap_or_else(|| vec![muxer.name.clone()]);
            available_muxers.sort();
            available_muxers.dedup();

            let mut extensions = help.extensions();
            extensions.sort();

            formats.push(ContainerFormat {
                name: muxer.name.clone(),
                description: muxer.description.clone(),
                input,
                output: true,
                muxer: muxer.name.clone(),
                available_muxers,
                extensions,
                options: help.option_names(),
                default_video_codec: help.default_video_codec(),
                default_audio_codec: help.default_audio_codec(),
            });
        }

        formats.sort_by(|a, b| a.name.cmp(&b.name));
        Self { formats }
    }

    /// Look up a format by (case-insensitive) name.
    pub fn get(&self, name: &str) -> Option<&ContainerFormat> {
        let name = name.to_lowercase();
        self.formats.iter().find(|f| f.name == name)
    }

    /// Formats whose extension set contains `ext` (leading dot ignored).
    pub fn with_extension(&self, ext: &str) -> Vec<&ContainerFormat> {
        let ext = ext.trim_start_matches('.').to_lowercase();
        self.formats
            .iter()
            .filter(|f| f.extensions.iter().any(|e| *e == ext))
            .collect()
    }

    /// All formats, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &ContainerFormat> {
        self.formats.iter()
    }

    /// Number of formats in the catalog.
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    /// True when the catalog holds no formats.
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

/// Fetch detailed settings for one muxer via `ffmpeg -h muxer=...`.
pub async fn muxer_details(
    ffmpeg: &ToolConfig,
    name: &str,
    timeout: Duration,
) -> fm_core::Result<ToolHelp> {
    let output = ToolCommand::new(ffmpeg.path.clone())
        .args(["-hide_banner", "-h"])
        .arg(format!("muxer={name}"))
        .timeout(timeout)
        .execute()
        .await?;

    if output.stdout.contains("Unknown format") {
        return Err(fm_core::Error::tool(
            "ffmpeg",
            format!("muxer '{name}' is not recognized"),
        ));
    }

    Ok(listing::parse_tool_help(&output.stdout))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODECS_OUTPUT: &str = "\
Codecs:
 D..... = Decoding supported
 .E.... = Encoding supported
 ..V... = Video codec
 ..A... = Audio codec
 ..S... = Subtitle codec
 -------
 D.VI.S 012v                 Uncompressed 4:2:2 10-bit
 DEV.L. h264                 H.264 / AVC / MPEG-4 AVC (encoders: libx264 )
 DEV.L. mpeg2video           MPEG-2 video
 DEA.L. aac                  AAC (Advanced Audio Coding)
 DEA.L. mp2                  MP2 (MPEG audio layer 2)
 DES... ass                  ASS (Advanced SubStation Alpha) subtitle
 D.A.L. atrac3               ATRAC3 (Adaptive TRansform Acoustic Coding 3)
";

    fn catalog() -> CodecCatalog {
        CodecCatalog::from_listing(CODECS_OUTPUT).unwrap()
    }

    #[test]
    fn only_encode_capable_video_audio_rows_survive() {
        let cat = catalog();
        assert_eq!(cat.len(), 4);
        assert!(cat.get("012v").is_none(), "decode-only video excluded");
        assert!(cat.get("ass").is_none(), "subtitle codec excluded");
        assert!(cat.get("atrac3").is_none(), "decode-only audio excluded");
    }

    #[test]
    fn kinds_are_classified_from_flag_column() {
        let cat = catalog();
        assert_eq!(cat.get("h264").unwrap().kind, CodecKind::Video);
        assert_eq!(cat.get("aac").unwrap().kind, CodecKind::Audio);
    }

    #[test]
    fn names_of_kind_are_sorted() {
        let cat = catalog();
        assert_eq!(cat.names_of_kind(CodecKind::Video), vec!["h264", "mpeg2video"]);
        assert_eq!(cat.names_of_kind(CodecKind::Audio), vec!["aac", "mp2"]);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let cat = catalog();
        assert!(cat.get("H264").is_some());
        assert!(cat.get("nosuchcodec").is_none());
    }

    fn sample_format_inputs() -> (Vec<Muxer>, Vec<ListingRow>, HashMap<String, ToolHelp>) {
        let muxers = vec![
            Muxer {
                flag: "E".into(),
                name: "mp4".into(),
                description: "MP4 (MPEG-4 Part 14)".into(),
            },
            Muxer {
                flag: "E".into(),
                name: "mov".into(),
                description: "QuickTime / MOV".into(),
            },
            Muxer {
                flag: "E".into(),
                name: "null".into(),
                description: "raw null video".into(),
            },
        ];
        let format_rows = vec![
            ListingRow {
                flag: "DE".into(),
                name: "mov,mp4,m4a,3gp,3g2,mj2".into(),
                description: "QuickTime / MOV".into(),
            },
            ListingRow {
                flag: "E".into(),
                name: "null".into(),
                description: "raw null video".into(),
            },
        ];
        let mut helps = HashMap::new();
        helps.insert(
            "mp4".to_string(),
            listing::parse_tool_help(
                "Muxer mp4 [MP4]:\n    Common extensions: mp4,m4a.\n    Default video codec: h264.\n    Default audio codec: aac.\n",
            ),
        );
        helps.insert(
            "mov".to_string(),
            listing::parse_tool_help("Muxer mov [MOV]:\n    Common extensions: mov.\n"),
        );
        // "null" has no help entry: introspection failed.
        (muxers, format_rows, helps)
    }

    #[test]
    fn assemble_cross_references_family_muxers() {
        let (muxers, rows, helps) = sample_format_inputs();
        let cat = FormatCatalog::assemble(&muxers, &rows, &helps);

        let mp4 = cat.get("mp4").unwrap();
        assert!(mp4.input, "family row is demux-capable");
        assert!(mp4.output);
        assert_eq!(mp4.available_muxers, vec!["mov", "mp4"]);
        assert_eq!(mp4.extensions, vec!["m4a", "mp4"]);
        assert_eq!(mp4.default_video_codec.as_deref(), Some("h264"));
        assert_eq!(mp4.default_audio_codec.as_deref(), Some("aac"));
    }

    #[test]
    fn assemble_excludes_uninstrospectable_muxers() {
        let (muxers, rows, helps) = sample_format_inputs();
        let cat = FormatCatalog::assemble(&muxers, &rows, &helps);
        assert!(cat.get("null").is_none());
        assert_eq!(cat.len(), 2);
    }

    #[test]
    fn with_extension_ignores_leading_dot() {
        let (muxers, rows, helps) = sample_format_inputs();
        let cat = FormatCatalog::assemble(&muxers, &rows, &helps);
        let hits = cat.with_extension(".mp4");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "mp4");
        assert!(cat.with_extension("avi").is_empty());
    }
}
