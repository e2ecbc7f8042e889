//! The transcode parameter resolver.
//!
//! Consumes a [`SourceMedia`] descriptor plus the codec catalog and produces
//! a [`TranscodeProfile`]: the generic field mapping, the per-codec
//! normalization quirks (DNx bit-rate ladder, ProRes profile codes, MPEG-2
//! field clearing), and the interlace reconciliation.

use std::path::Path;

use fm_av::catalog::CodecCatalog;
use fm_av::ffprobe::{MediaInspector, SourceMedia};

use crate::profile::{AudioTarget, TranscodeProfile, VideoTarget};

/// Valid DNx bit rates in Mbps. Rates between entries are snapped to the
/// nearest valid value, ties toward the smaller entry.
const DNX_RATES_MBPS: &[u32] = &[
    36, 42, 45, 60, 63, 75, 80, 84, 90, 100, 110, 115, 120, 145, 175, 180, 185, 220, 240, 290,
    350, 365, 390, 440, 730, 880,
];

/// ProRes profile codes, keyed by the encoder tag the writing application
/// recorded on the stream.
const PRORES_PROFILES: &[(&str, u8)] = &[
    ("Apple ProRes 422 Proxy", 0),
    ("Apple ProRes 422 LT", 1),
    ("Apple ProRes 422", 2),
    ("Apple ProRes 422 HQ", 3),
    ("Apple ProRes 4444", 4),
    ("Apple ProRes 4444 XQ", 5),
];

/// Resolves source descriptors into transcode profiles.
#[derive(Debug, Clone)]
pub struct TranscodeResolver<'a> {
    codecs: &'a CodecCatalog,
}

impl<'a> TranscodeResolver<'a> {
    /// Create a resolver over the given codec catalog.
    pub fn new(codecs: &'a CodecCatalog) -> Self {
        Self { codecs }
    }

    /// Resolve a profile, probing `input_file` (when supplied) for its field
    /// order first. Without an input file the source's own field order is
    /// used, so no extra subprocess runs.
    pub async fn resolve_for_input(
        &self,
        media: &SourceMedia,
        inspector: &MediaInspector,
        input_file: Option<&Path>,
    ) -> fm_core::Result<TranscodeProfile> {
        let input_field_order = match input_file {
            Some(path) => inspector.field_order(path).await,
            None => media
                .video_streams
                .first()
                .and_then(|s| s.field_order.clone()),
        };
        self.resolve(media, input_field_order.as_deref())
    }

    /// Resolve a profile from a source descriptor and the (already probed)
    /// field order of the file the transcode will read.
    ///
    /// # Errors
    ///
    /// Returns [`fm_core::Error::NoSupportedStream`] when neither a video
    /// nor an audio stream carries a codec known to the catalog. No partial
    /// profile is ever emitted.
    pub fn resolve(
        &self,
        media: &SourceMedia,
        input_field_order: Option<&str>,
    ) -> fm_core::Result<TranscodeProfile> {
        let video = self.resolve_video(media);
        let audio = self.resolve_audio(media);

        if video.is_none() && audio.is_none() {
            return Err(fm_core::Error::NoSupportedStream(format!(
                "no stream of {} maps to a known codec",
                media.path.display()
            )));
        }

        // Polarity quirk, preserved deliberately: the flag is true when the
        // probe reports a *progressive* field order, and both guards below
        // are written against that convention. The derivation and the guards
        // must change together or deployed output changes.
        let input_interlaced = input_field_order
            .map(|f| f.eq_ignore_ascii_case("progressive"))
            .unwrap_or(false);

        let target_field_order = video.as_ref().and_then(|v| v.field_order.as_deref());
        let deinterlace = !input_interlaced && target_field_order == Some("progressive");
        let reinterlace = input_interlaced && target_field_order != Some("progressive");

        if deinterlace {
            tracing::info!("input needs deinterlacing; requesting yadif");
        }
        if reinterlace {
            tracing::info!("input needs re-interlacing; requesting +ildct+ilme");
        }

        Ok(TranscodeProfile {
            extension: media.extension.clone(),
            tags: media.tags.clone(),
            video,
            audio,
            deinterlace,
            reinterlace,
        })
    }

    /// Map the first video stream whose codec the catalog knows. Streams
    /// with unknown codecs are dropped, not an error.
    fn resolve_video(&self, media: &SourceMedia) -> Option<VideoTarget> {
        let stream = media.video_streams.iter().find(|s| {
            s.codec_name
                .as_deref()
                .map(|name| self.codecs.get(name).is_some())
                .unwrap_or(false)
        })?;

        let codec = stream.codec_name.clone()?.to_lowercase();

        let mut target = VideoTarget {
            codec: codec.clone(),
            width: stream.width,
            height: stream.height,
            pix_fmt: stream.pix_fmt.clone(),
            color_space: stream.color_space.clone(),
            color_transfer: stream.color_transfer.clone(),
            color_range: stream.color_range.clone(),
            color_primaries: stream.color_primaries.clone(),
            profile: stream
                .profile
                .as_deref()
                .map(|p| p.to_lowercase().replace(' ', "")),
            frame_rate: stream.frame_rate.clone(),
            bit_rate: stream.bit_rate.clone().or_else(|| media.bit_rate.clone()),
            time_base: stream.time_base.clone(),
            chroma_location: stream.chroma_location.clone(),
            b_frames: stream.has_b_frames.map(|n| n.to_string()),
            level: stream.level.map(|n| n.to_string()),
            field_order: stream.field_order.clone(),
        };

        // Per-codec corrections, in fixed order after the generic copy.
        if codec.starts_with("dnx") {
            if let Some(snapped) = target.bit_rate.as_deref().and_then(snap_dnx_bit_rate) {
                target.bit_rate = Some(snapped);
            }
        }
        if codec == "prores" {
            target.profile = stream
                .encoder_tag
                .as_deref()
                .and_then(prores_profile_code)
                .map(|code| code.to_string());
        }
        if codec == "mpeg2video" {
            target.profile = None;
            target.level = None;
            target.color_transfer = None;
        }

        Some(target)
    }

    /// Map the first audio stream whose codec the catalog knows. No
    /// codec-specific corrections apply to audio.
    fn resolve_audio(&self, media: &SourceMedia) -> Option<AudioTarget> {
        let stream = media.audio_streams.iter().find(|s| {
            s.codec_name
                .as_deref()
                .map(|name| self.codecs.get(name).is_some())
                .unwrap_or(false)
        })?;

        Some(AudioTarget {
            codec: stream.codec_name.clone()?.to_lowercase(),
            sample_rate: stream.sample_rate.clone(),
            channels: stream.channels,
            channel_layout: stream.channel_layout.clone(),
            bit_rate: stream.bit_rate.clone(),
        })
    }
}

/// Snap a bits-per-second rate onto the DNx ladder and render it as
/// `"<rate>M"`. Unparsable input yields `None` (the rate is left alone).
fn snap_dnx_bit_rate(bit_rate: &str) -> Option<String> {
    let bps: f64 = bit_rate.trim().parse().ok()?;
    let mbps = bps / 1_000_000.0;

    let mut best = DNX_RATES_MBPS[0];
    let mut best_diff = f64::INFINITY;
    for &rate in DNX_RATES_MBPS {
        let diff = (mbps - rate as f64).abs();
        // Strictly-less over an ascending ladder keeps the smaller rate on
        // an exact midpoint.
        if diff < best_diff {
            best = rate;
            best_diff = diff;
        }
    }

    Some(format!("{best}M"))
}

/// Look up the numeric ProRes profile code for an encoder tag.
fn prores_profile_code(encoder_tag: &str) -> Option<u8> {
    PRORES_PROFILES
        .iter()
        .find(|(tag, _)| *tag == encoder_tag)
        .map(|(_, code)| *code)
}
