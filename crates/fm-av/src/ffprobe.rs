//! FFprobe-backed media inspection.
//!
//! Shells out to `ffprobe -v error -show_format -show_streams -of json` and
//! maps the JSON output into explicit [`SourceMedia`] descriptors. Every
//! field the transcode resolver consumes is a named `Option`, never an open
//! map.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::command::ToolCommand;
use crate::tools::ToolConfig;

/// Everything ffmatrix knows about a probed source file.
///
/// Transient: rebuilt per invocation, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMedia {
    /// Path to the probed file.
    pub path: PathBuf,
    /// Lower-case file extension without the dot.
    pub extension: String,
    /// Container-level tag metadata, in deterministic (sorted) order.
    pub tags: BTreeMap<String, String>,
    /// Container-declared bit rate; fallback when a stream reports none.
    pub bit_rate: Option<String>,
    /// Video streams, in file order.
    pub video_streams: Vec<VideoStream>,
    /// Audio streams, in file order.
    pub audio_streams: Vec<AudioStream>,
}

/// Per-video-stream attributes as reported by ffprobe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoStream {
    pub codec_name: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub pix_fmt: Option<String>,
    pub color_space: Option<String>,
    pub color_transfer: Option<String>,
    pub color_range: Option<String>,
    pub color_primaries: Option<String>,
    pub chroma_location: Option<String>,
    pub level: Option<i64>,
    pub has_b_frames: Option<i64>,
    pub profile: Option<String>,
    pub bit_rate: Option<String>,
    pub time_base: Option<String>,
    pub frame_rate: Option<String>,
    pub field_order: Option<String>,
    /// The writing-application tag on the stream (e.g.
    /// "Apple ProRes 422 HQ"); drives ProRes profile selection.
    pub encoder_tag: Option<String>,
}

/// Per-audio-stream attributes as reported by ffprobe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioStream {
    pub codec_name: Option<String>,
    pub sample_rate: Option<String>,
    pub channels: Option<i64>,
    pub channel_layout: Option<String>,
    pub bit_rate: Option<String>,
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    #[serde(default)]
    tags: BTreeMap<String, String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<i64>,
    height: Option<i64>,
    pix_fmt: Option<String>,
    color_space: Option<String>,
    color_transfer: Option<String>,
    color_range: Option<String>,
    color_primaries: Option<String>,
    chroma_location: Option<String>,
    level: Option<i64>,
    has_b_frames: Option<i64>,
    profile: Option<String>,
    bit_rate: Option<String>,
    time_base: Option<String>,
    r_frame_rate: Option<String>,
    field_order: Option<String>,
    sample_rate: Option<String>,
    channels: Option<i64>,
    channel_layout: Option<String>,
    #[serde(default)]
    tags: FfprobeStreamTags,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeStreamTags {
    encoder: Option<String>,
}

// ---------------------------------------------------------------------------
// Inspector
// ---------------------------------------------------------------------------

/// Runs ffprobe and maps its JSON into [`SourceMedia`].
#[derive(Debug, Clone)]
pub struct MediaInspector {
    ffprobe: ToolConfig,
    timeout: Duration,
}

impl MediaInspector {
    /// Create an inspector for the given ffprobe binary.
    pub fn new(ffprobe: ToolConfig, timeout: Duration) -> Self {
        Self { ffprobe, timeout }
    }

    /// Probe a file and return its descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`fm_core::Error::Probe`] when ffprobe fails or its output
    /// cannot be parsed -- "no metadata available", a recoverable condition
    /// the caller reports without crashing.
    pub async fn inspect(&self, path: &Path) -> fm_core::Result<SourceMedia> {
        let output = ToolCommand::new(self.ffprobe.path.clone())
            .args(["-v", "error", "-show_format", "-show_streams", "-of", "json"])
            .arg(path.to_string_lossy().as_ref())
            .timeout(self.timeout)
            .execute()
            .await
            .map_err(|e| fm_core::Error::Probe(format!("{}: {e}", path.display())))?;

        parse_ffprobe_json(path, &output.stdout)
    }

    /// Probe a file and return the raw ffprobe JSON document.
    ///
    /// Used by metadata comparison, which diffs the full documents rather
    /// than the narrowed [`SourceMedia`] view.
    pub async fn raw(&self, path: &Path) -> fm_core::Result<serde_json::Value> {
        let output = ToolCommand::new(self.ffprobe.path.clone())
            .args(["-v", "error", "-show_format", "-show_streams", "-of", "json"])
            .arg(path.to_string_lossy().as_ref())
            .timeout(self.timeout)
            .execute()
            .await
            .map_err(|e| fm_core::Error::Probe(format!("{}: {e}", path.display())))?;

        serde_json::from_str(&output.stdout)
            .map_err(|e| fm_core::Error::Probe(format!("ffprobe JSON parse error: {e}")))
    }

    /// Probe a file for the field order of its first video stream.
    ///
    /// Any failure (missing file, malformed output, no video stream) is
    /// `None`: without metadata no interlace correction is attempted.
    pub async fn field_order(&self, path: &Path) -> Option<String> {
        match self.inspect(path).await {
            Ok(media) => media
                .video_streams
                .first()
                .and_then(|s| s.field_order.clone()),
            Err(e) => {
                tracing::debug!("field-order probe of {} failed: {e}", path.display());
                None
            }
        }
    }
}

/// Map raw ffprobe JSON into a [`SourceMedia`]. Split out from
/// [`MediaInspector::inspect`] so the mapping is testable on fixtures.
pub fn parse_ffprobe_json(path: &Path, json: &str) -> fm_core::Result<SourceMedia> {
    let ff: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| fm_core::Error::Probe(format!("ffprobe JSON parse error: {e}")))?;

    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mut video_streams = Vec::new();
    let mut audio_streams = Vec::new();

    for stream in ff.streams {
        match stream.codec_type.as_deref() {
            Some("video") => video_streams.push(VideoStream {
                codec_name: stream.codec_name,
                width: stream.width,
                height: stream.height,
                pix_fmt: stream.pix_fmt,
                color_space: stream.color_space,
                color_transfer: stream.color_transfer,
                color_range: stream.color_range,
                color_primaries: stream.color_primaries,
                chroma_location: stream.chroma_location,
                level: stream.level,
                has_b_frames: stream.has_b_frames,
                profile: stream.profile,
                bit_rate: stream.bit_rate,
                time_base: stream.time_base,
                frame_rate: stream.r_frame_rate,
                field_order: stream.field_order,
                encoder_tag: stream.tags.encoder,
            }),
            Some("audio") => audio_streams.push(AudioStream {
                codec_name: stream.codec_name,
                sample_rate: stream.sample_rate,
                channels: stream.channels,
                channel_layout: stream.channel_layout,
                bit_rate: stream.bit_rate,
            }),
            _ => {}
        }
    }

    Ok(SourceMedia {
        path: path.to_path_buf(),
        extension,
        tags: ff.format.tags,
        bit_rate: ff.format.bit_rate,
        video_streams,
        audio_streams,
    })
}
