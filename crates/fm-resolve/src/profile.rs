//! The resolved transcode target.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Resolved target parameters for one transcode.
///
/// Built once per resolution call and consumed immediately by the command
/// builder. Field values are kept in the string forms ffmpeg takes on the
/// command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscodeProfile {
    /// Target container extension (drives the output placeholder).
    pub extension: String,
    /// Container-level tags to re-emit as `-metadata` pairs, in the
    /// mapping's own (sorted) order.
    pub tags: BTreeMap<String, String>,
    /// Video target, absent when no video stream was retained.
    pub video: Option<VideoTarget>,
    /// Audio target, absent when no audio stream was retained.
    pub audio: Option<AudioTarget>,
    /// Request a deinterlace filter (`yadif`) on the filter graph.
    pub deinterlace: bool,
    /// Request re-interlace flags (`+ildct+ilme`) on the encoder.
    pub reinterlace: bool,
}

/// Normalized per-video-stream target flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoTarget {
    pub codec: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub pix_fmt: Option<String>,
    pub color_space: Option<String>,
    pub color_transfer: Option<String>,
    pub color_range: Option<String>,
    pub color_primaries: Option<String>,
    /// Profile string, lower-cased and space-stripped; for ProRes targets a
    /// numeric profile code.
    pub profile: Option<String>,
    pub frame_rate: Option<String>,
    pub bit_rate: Option<String>,
    pub time_base: Option<String>,
    pub chroma_location: Option<String>,
    pub b_frames: Option<String>,
    pub level: Option<String>,
    pub field_order: Option<String>,
}

/// Normalized per-audio-stream target flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioTarget {
    pub codec: String,
    pub sample_rate: Option<String>,
    pub channels: Option<i64>,
    pub channel_layout: Option<String>,
    pub bit_rate: Option<String>,
}
