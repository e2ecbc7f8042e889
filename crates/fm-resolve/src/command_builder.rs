//! Renders a [`TranscodeProfile`] into an ffmpeg argument list.
//!
//! A pure function of the profile and the two paths: the same inputs always
//! yield the same argument vector, in the same order. The binary name is not
//! included; callers prepend the resolved ffmpeg path (or the literal
//! `ffmpeg` for display).

use crate::profile::TranscodeProfile;

/// Build the ordered argument list for one transcode.
///
/// Ordering: global flags, input, filter graph (scale and deinterlace
/// combined into one `-vf` expression), video flags in fixed table order,
/// re-interlace flags, audio flags in fixed table order, one `-metadata`
/// pair per tag in the tag mapping's own order, output path. Absent or
/// blank profile fields are omitted entirely.
pub fn build_args(profile: &TranscodeProfile, input: &str, output: &str) -> Vec<String> {
    let mut args: Vec<String> = vec!["-y".into(), "-i".into(), input.into()];

    let mut filters: Vec<String> = Vec::new();
    if let Some(video) = &profile.video {
        if let (Some(width), Some(height)) = (video.width, video.height) {
            filters.push(format!("scale={width}:{height}"));
        }
    }
    if profile.deinterlace {
        filters.push("yadif=mode=1".into());
    }
    if !filters.is_empty() {
        args.push("-vf".into());
        args.push(filters.join(","));
    }

    if let Some(video) = &profile.video {
        push_flag(&mut args, "-c:v", Some(video.codec.as_str()));
        push_flag(&mut args, "-pix_fmt", video.pix_fmt.as_deref());
        push_flag(&mut args, "-colorspace", video.color_space.as_deref());
        push_flag(&mut args, "-color_trc", video.color_transfer.as_deref());
        push_flag(&mut args, "-color_range", video.color_range.as_deref());
        push_flag(&mut args, "-color_primaries", video.color_primaries.as_deref());
        push_flag(&mut args, "-profile:v", video.profile.as_deref());
        push_flag(&mut args, "-r", video.frame_rate.as_deref());
        push_flag(&mut args, "-b:v", video.bit_rate.as_deref());
        push_flag(
            &mut args,
            "-chroma_sample_location",
            video.chroma_location.as_deref(),
        );
        push_flag(&mut args, "-bf", video.b_frames.as_deref());
        push_flag(&mut args, "-time_base", video.time_base.as_deref());
        push_flag(&mut args, "-level:v", video.level.as_deref());
        push_flag(&mut args, "-field_order", video.field_order.as_deref());
    }

    if profile.reinterlace {
        args.push("-flags".into());
        args.push("+ildct+ilme".into());
    }

    if let Some(audio) = &profile.audio {
        push_flag(&mut args, "-c:a", Some(audio.codec.as_str()));
        push_flag(&mut args, "-ar", audio.sample_rate.as_deref());
        let channels = audio.channels.map(|c| c.to_string());
        push_flag(&mut args, "-ac", channels.as_deref());
        push_flag(&mut args, "-channel_layout", audio.channel_layout.as_deref());
        push_flag(&mut args, "-b:a", audio.bit_rate.as_deref());
    }

    for (key, value) in &profile.tags {
        args.push("-metadata".into());
        args.push(format!("{key}={value}"));
    }

    args.push(output.into());
    args
}

/// Append `flag value` unless the value is absent or blank.
fn push_flag(args: &mut Vec<String>, flag: &str, value: Option<&str>) {
    if let Some(value) = value {
        if !value.trim().is_empty() {
            args.push(flag.into());
            args.push(value.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{AudioTarget, VideoTarget};
    use std::collections::BTreeMap;

    fn full_profile() -> TranscodeProfile {
        let mut tags = BTreeMap::new();
        tags.insert("artist".to_string(), "Tester".to_string());
        tags.insert("title".to_string(), "Sample".to_string());

        TranscodeProfile {
            extension: "mp4".into(),
            tags,
            video: Some(VideoTarget {
                codec: "h264".into(),
                width: Some(1920),
                height: Some(1080),
                pix_fmt: Some("yuv420p".into()),
                color_space: Some("bt709".into()),
                color_transfer: Some("bt709".into()),
                color_range: Some("tv".into()),
                color_primaries: Some("bt709".into()),
                profile: Some("high".into()),
                frame_rate: Some("25/1".into()),
                bit_rate: Some("8000000".into()),
                time_base: Some("1/25000".into()),
                chroma_location: Some("left".into()),
                b_frames: Some("2".into()),
                level: Some("40".into()),
                field_order: Some("progressive".into()),
            }),
            audio: Some(AudioTarget {
                codec: "aac".into(),
                sample_rate: Some("48000".into()),
                channels: Some(2),
                channel_layout: Some("stereo".into()),
                bit_rate: Some("192000".into()),
            }),
            deinterlace: false,
            reinterlace: false,
        }
    }

    #[test]
    fn deterministic_output() {
        let profile = full_profile();
        let first = build_args(&profile, "in.mp4", "out.mp4");
        let second = build_args(&profile, "in.mp4", "out.mp4");
        assert_eq!(first, second);
    }

    #[test]
    fn full_profile_flag_order() {
        let args = build_args(&full_profile(), "in.mp4", "out.mp4");
        let expected: Vec<String> = [
            "-y", "-i", "in.mp4",
            "-vf", "scale=1920:1080",
            "-c:v", "h264",
            "-pix_fmt", "yuv420p",
            "-colorspace", "bt709",
            "-color_trc", "bt709",
            "-color_range", "tv",
            "-color_primaries", "bt709",
            "-profile:v", "high",
            "-r", "25/1",
            "-b:v", "8000000",
            "-chroma_sample_location", "left",
            "-bf", "2",
            "-time_base", "1/25000",
            "-level:v", "40",
            "-field_order", "progressive",
            "-c:a", "aac",
            "-ar", "48000",
            "-ac", "2",
            "-channel_layout", "stereo",
            "-b:a", "192000",
            "-metadata", "artist=Tester",
            "-metadata", "title=Sample",
            "out.mp4",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(args, expected);
    }

    #[test]
    fn metadata_follows_tag_map_order() {
        let args = build_args(&full_profile(), "in.mp4", "out.mp4");
        let metadata: Vec<&String> = args
            .iter()
            .zip(args.iter().skip(1))
            .filter(|(flag, _)| *flag == "-metadata")
            .map(|(_, value)| value)
            .collect();
        assert_eq!(metadata, ["artist=Tester", "title=Sample"]);
    }

    #[test]
    fn absent_fields_are_omitted() {
        let profile = TranscodeProfile {
            extension: "mp4".into(),
            video: Some(VideoTarget {
                codec: "h264".into(),
                pix_fmt: Some("yuv420p".into()),
                ..VideoTarget::default()
            }),
            ..TranscodeProfile::default()
        };
        let args = build_args(&profile, "in.mp4", "out.mp4");
        assert_eq!(
            args,
            vec!["-y", "-i", "in.mp4", "-c:v", "h264", "-pix_fmt", "yuv420p", "out.mp4"]
        );
        assert!(!args.iter().any(|a| a == "-vf"));
    }

    #[test]
    fn blank_fields_are_omitted() {
        let profile = TranscodeProfile {
            video: Some(VideoTarget {
                codec: "h264".into(),
                pix_fmt: Some("   ".into()),
                ..VideoTarget::default()
            }),
            ..TranscodeProfile::default()
        };
        let args = build_args(&profile, "in.mp4", "out.mp4");
        assert!(!args.iter().any(|a| a == "-pix_fmt"));
    }

    #[test]
    fn deinterlace_joins_the_filter_expression() {
        let mut profile = full_profile();
        profile.deinterlace = true;
        let args = build_args(&profile, "in.mp4", "out.mp4");
        let vf_index = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf_index + 1], "scale=1920:1080,yadif=mode=1");
    }

    #[test]
    fn deinterlace_without_scale_still_emits_filter() {
        let profile = TranscodeProfile {
            video: Some(VideoTarget {
                codec: "h264".into(),
                ..VideoTarget::default()
            }),
            deinterlace: true,
            ..TranscodeProfile::default()
        };
        let args = build_args(&profile, "in.mp4", "out.mp4");
        let vf_index = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf_index + 1], "yadif=mode=1");
    }

    #[test]
    fn reinterlace_emits_encoder_flags() {
        let mut profile = full_profile();
        profile.reinterlace = true;
        let args = build_args(&profile, "in.mp4", "out.mp4");
        let flags_index = args.iter().position(|a| a == "-flags").unwrap();
        assert_eq!(args[flags_index + 1], "+ildct+ilme");
        // After the video table, before the audio table.
        let field_order_index = args.iter().position(|a| a == "-field_order").unwrap();
        let audio_index = args.iter().position(|a| a == "-c:a").unwrap();
        assert!(field_order_index < flags_index && flags_index < audio_index);
    }

    #[test]
    fn audio_only_profile() {
        let profile = TranscodeProfile {
            extension: "wav".into(),
            audio: Some(AudioTarget {
                codec: "pcm_s16le".into(),
                sample_rate: Some("44100".into()),
                channels: Some(2),
                channel_layout: None,
                bit_rate: None,
            }),
            ..TranscodeProfile::default()
        };
        let args = build_args(&profile, "in.wav", "out.wav");
        assert_eq!(
            args,
            vec!["-y", "-i", "in.wav", "-c:a", "pcm_s16le", "-ar", "44100", "-ac", "2", "out.wav"]
        );
    }

    #[test]
    fn progressive_end_to_end_scenario() {
        // h264/yuv420p 1920x1080 progressive source targeting mp4: the
        // matrix knows mp4 takes h264, the resolver kept the target
        // progressive, so the only filter is the scale the resolver set.
        let profile = TranscodeProfile {
            extension: "mp4".into(),
            video: Some(VideoTarget {
                codec: "h264".into(),
                width: Some(1920),
                height: Some(1080),
                pix_fmt: Some("yuv420p".into()),
                field_order: Some("progressive".into()),
                ..VideoTarget::default()
            }),
            ..TranscodeProfile::default()
        };
        let args = build_args(&profile, "in.mp4", "out.mp4");

        let joined = args.join(" ");
        assert!(joined.contains("-c:v h264"));
        assert!(joined.contains("-pix_fmt yuv420p"));
        assert!(joined.contains("-vf scale=1920:1080"));
        assert!(!joined.contains("yadif"));
        assert!(!joined.contains("+ildct+ilme"));
    }
}
