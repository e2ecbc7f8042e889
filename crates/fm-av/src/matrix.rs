//! The persisted container/codec compatibility matrix.
//!
//! Built by probing every encode-capable codec against every output
//! container, persisted as a single JSON object keyed by container name,
//! and queried at resolution time. Entries are replaced wholesale on
//! rebuild; there is no incremental update.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::{CodecCatalog, CodecKind, FormatCatalog};
use crate::probe::CompatibilityProbe;

/// The two codec sets of one matrix entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecSets {
    /// Sorted, unique, lower-case video codec names.
    pub video: Vec<String>,
    /// Sorted, unique, lower-case audio codec names.
    pub audio: Vec<String>,
}

impl CodecSets {
    /// Normalize raw verdict lists into the stored form: lower-case,
    /// sorted, deduplicated. This is the only ordering guarantee the
    /// concurrent probe phase needs.
    pub fn normalized(video: Vec<String>, audio: Vec<String>) -> Self {
        let normalize = |mut names: Vec<String>| {
            for name in &mut names {
                *name = name.to_lowercase();
            }
            names.sort();
            names.dedup();
            names
        };
        Self {
            video: normalize(video),
            audio: normalize(audio),
        }
    }

    /// The set for one media kind.
    pub fn of_kind(&self, kind: CodecKind) -> &[String] {
        match kind {
            CodecKind::Video => &self.video,
            CodecKind::Audio => &self.audio,
        }
    }
}

/// One persisted matrix entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixEntry {
    /// Compatible codecs by kind.
    pub codecs: CodecSets,
}

/// The full compatibility matrix, keyed by container format name.
///
/// A `BTreeMap` keeps serialization order stable: rebuilding against an
/// unchanged runtime produces a byte-identical file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompatibilityMatrix {
    entries: BTreeMap<String, MatrixEntry>,
}

impl CompatibilityMatrix {
    /// Build a complete matrix by probing every codec of each kind against
    /// every output container.
    ///
    /// The outer container loop is sequential on purpose: it caps the
    /// number of live encoder subprocesses to one container's codec set and
    /// gives deterministic progress reporting. Within a container, probes
    /// of one kind run concurrently under a semaphore of `workers` permits.
    pub async fn build(
        probe: &CompatibilityProbe,
        codecs: &CodecCatalog,
        formats: &FormatCatalog,
        workers: usize,
    ) -> Self {
        let mut entries = BTreeMap::new();
        let total = formats.len();

        for (index, format) in formats.iter().enumerate() {
            tracing::info!(
                "({}/{total}) probing codec compatibility for {}",
                index + 1,
                format.name
            );

            let video =
                probe_kind(probe, &format.name, codecs, CodecKind::Video, workers).await;
            let audio =
                probe_kind(probe, &format.name, codecs, CodecKind::Audio, workers).await;

            tracing::debug!(
                "{}: {} video / {} audio codecs compatible",
                format.name,
                video.len(),
                audio.len()
            );

            entries.insert(
                format.name.clone(),
                MatrixEntry {
                    codecs: CodecSets::normalized(video, audio),
                },
            );
        }

        Self { entries }
    }

    /// Serialize to the persisted JSON form.
    pub fn to_json(&self) -> fm_core::Result<String> {
        serde_json::to_string_pretty(&self.entries)
            .map_err(|e| fm_core::Error::Internal(format!("matrix serialization failed: {e}")))
    }

    /// Write the matrix to `path`, replacing any previous file.
    pub fn save(&self, path: &Path) -> fm_core::Result<()> {
        let mut json = self.to_json()?;
        json.push('\n');
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a previously persisted matrix.
    ///
    /// # Errors
    ///
    /// - [`fm_core::Error::MatrixNotBuilt`] if the file does not exist --
    ///   a recoverable, user-actionable condition.
    /// - [`fm_core::Error::Parse`] if the file exists but is not valid.
    pub fn load(path: &Path) -> fm_core::Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(fm_core::Error::matrix_not_built(path));
            }
            Err(e) => return Err(e.into()),
        };

        let entries: BTreeMap<String, MatrixEntry> = serde_json::from_str(&contents)
            .map_err(|e| fm_core::Error::parse(format!("matrix file {}: {e}", path.display())))?;
        Ok(Self { entries })
    }

    /// Return the entry for a container, or [`fm_core::Error::EntryNotFound`].
    pub fn query(&self, container: &str) -> fm_core::Result<&MatrixEntry> {
        self.entries
            .get(&container.to_lowercase())
            .ok_or_else(|| fm_core::Error::EntryNotFound(container.to_string()))
    }

    /// Container names whose entries satisfy every supplied criterion.
    ///
    /// Codec membership is checked against the matrix itself; extension
    /// membership is checked against the live [`FormatCatalog`] (the
    /// persisted file carries only codec sets).
    pub fn search(
        &self,
        video_codec: Option<&str>,
        audio_codec: Option<&str>,
        extension: Option<&str>,
        formats: &FormatCatalog,
    ) -> Vec<String> {
        let video_codec = video_codec.map(str::to_lowercase);
        let audio_codec = audio_codec.map(str::to_lowercase);
        let extension = extension.map(|e| e.trim_start_matches('.').to_lowercase());

        self.entries
            .iter()
            .filter(|(name, entry)| {
                if let Some(ref vc) = video_codec {
                    if !entry.codecs.video.iter().any(|c| c == vc) {
                        return false;
                    }
                }
                if let Some(ref ac) = audio_codec {
                    if !entry.codecs.audio.iter().any(|c| c == ac) {
                        return false;
                    }
                }
                if let Some(ref ext) = extension {
                    let has_ext = formats
                        .get(name)
                        .map(|f| f.extensions.iter().any(|e| e == ext))
                        .unwrap_or(false);
                    if !has_ext {
                        return false;
                    }
                }
                true
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Iterate over all entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &MatrixEntry)> {
        self.entries.iter()
    }

    /// Number of container entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the matrix holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a matrix directly from entries. Intended for tests and for
    /// tools that synthesize matrices.
    pub fn from_entries(entries: BTreeMap<String, MatrixEntry>) -> Self {
        Self { entries }
    }
}

/// Probe every codec of one kind against one container, bounded by a
/// semaphore. Verdicts are aggregated as tasks complete; ordering comes
/// from the final normalization, not the scheduler.
async fn probe_kind(
    probe: &CompatibilityProbe,
    container: &str,
    codecs: &CodecCatalog,
    kind: CodecKind,
    workers: usize,
) -> Vec<String> {
    let semaphore = Arc::new(tokio::sync::Semaphore::new(workers.max(1)));
    let mut handles = Vec::new();

    for codec in codecs.of_kind(kind) {
        let semaphore = semaphore.clone();
        let probe = probe.clone();
        let container = container.to_string();
        let codec_name = codec.name.clone();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await.expect("semaphore closed");
            let verdict = probe.probe(&container, &codec_name, kind).await;
            (codec_name, verdict)
        }));
    }

    let mut compatible = Vec::new();
    for handle in handles {
        match handle.await {
            Ok((codec_name, true)) => compatible.push(codec_name),
            Ok((_, false)) => {}
            Err(e) => {
                // A panicked probe task counts as incompatible, like every
                // other probe failure.
                tracing::debug!("probe task for {container} failed: {e}");
            }
        }
    }

    compatible
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::listing::{self, ListingRow, Muxer};

    fn sample_matrix() -> CompatibilityMatrix {
        let mut entries = BTreeMap::new();
        entries.insert(
            "mp4".to_string(),
            MatrixEntry {
                codecs: CodecSets::normalized(
                    vec!["h264".into(), "mpeg2video".into()],
                    vec!["aac".into(), "mp2".into()],
                ),
            },
        );
        entries.insert(
            "matroska".to_string(),
            MatrixEntry {
                codecs: CodecSets::normalized(vec!["h264".into()], vec!["aac".into()]),
            },
        );
        entries.insert(
            "wav".to_string(),
            MatrixEntry {
                codecs: CodecSets::normalized(vec![], vec!["pcm_s16le".into()]),
            },
        );
        CompatibilityMatrix::from_entries(entries)
    }

    fn sample_formats() -> FormatCatalog {
        let muxers = vec![
            Muxer {
                flag: "E".into(),
                name: "mp4".into(),
                description: "MP4".into(),
            },
            Muxer {
                flag: "E".into(),
                name: "matroska".into(),
                description: "Matroska".into(),
            },
            Muxer {
                flag: "E".into(),
                name: "wav".into(),
                description: "WAV".into(),
            },
        ];
        let rows = vec![
            ListingRow {
                flag: "DE".into(),
                name: "mov,mp4,m4a".into(),
                description: "QuickTime / MOV".into(),
            },
            ListingRow {
                flag: "DE".into(),
                name: "matroska,webm".into(),
                description: "Matroska".into(),
            },
            ListingRow {
                flag: "DE".into(),
                name: "wav".into(),
                description: "WAV".into(),
            },
        ];
        let mut helps = HashMap::new();
        helps.insert(
            "mp4".to_string(),
            listing::parse_tool_help("Muxer mp4 [MP4]:\n    Common extensions: mp4,m4a.\n"),
        );
        helps.insert(
            "matroska".to_string(),
            listing::parse_tool_help(
                "Muxer matroska [Matroska]:\n    Common extensions: mkv.\n",
            ),
        );
        helps.insert(
            "wav".to_string(),
            listing::parse_tool_help("Muxer wav [WAV]:\n    Common extensions: wav.\n"),
        );
        FormatCatalog::assemble(&muxers, &rows, &helps)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn build_against_missing_binary_yields_empty_entries() {
        // Every probe fails to spawn; fail-closed means every verdict is
        // false, and every container still gets an entry with empty (not
        // absent) codec sets.
        let codecs = CodecCatalog::from_listing(
            "Codecs:\n -------\n DEV.L. h264  H.264\n DEA.L. aac  AAC\n",
        )
        .unwrap();
        let formats = sample_formats();
        let probe = crate::probe::CompatibilityProbe::new(
            crate::tools::ToolConfig {
                name: "ffmpeg".into(),
                path: std::path::PathBuf::from("/nonexistent/ffmpeg-binary"),
            },
            std::time::Duration::from_secs(1),
        );

        let matrix = CompatibilityMatrix::build(&probe, &codecs, &formats, 4).await;
        assert_eq!(matrix.len(), formats.len());
        for (_, entry) in matrix.entries() {
            assert!(entry.codecs.video.is_empty());
            assert!(entry.codecs.audio.is_empty());
        }
    }

    #[test]
    fn normalized_sorts_dedups_and_lowercases() {
        let sets = CodecSets::normalized(
            vec!["MPEG2VIDEO".into(), "h264".into(), "h264".into()],
            vec!["mp2".into(), "AAC".into()],
        );
        assert_eq!(sets.video, vec!["h264", "mpeg2video"]);
        assert_eq!(sets.audio, vec!["aac", "mp2"]);
    }

    #[test]
    fn serialization_shape_and_idempotence() {
        let matrix = sample_matrix();
        let json = matrix.to_json().unwrap();

        // Stable across repeated serialization.
        assert_eq!(json, matrix.to_json().unwrap());

        // Keyed by container, nested "codecs" object.
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["mp4"]["codecs"]["video"][0], "h264");
        assert_eq!(value["wav"]["codecs"]["video"], serde_json::json!([]));

        // BTreeMap keys serialize sorted.
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["matroska", "mp4", "wav"]);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.json");

        let matrix = sample_matrix();
        matrix.save(&path).unwrap();

        let loaded = CompatibilityMatrix::load(&path).unwrap();
        assert_eq!(loaded, matrix);

        // Saving the loaded matrix reproduces the file byte-for-byte.
        let first = std::fs::read(&path).unwrap();
        loaded.save(&path).unwrap();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn load_missing_file_is_not_built() {
        let result = CompatibilityMatrix::load(Path::new("/nonexistent/matrix.json"));
        assert!(matches!(
            result,
            Err(fm_core::Error::MatrixNotBuilt { .. })
        ));
    }

    #[test]
    fn load_garbage_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.json");
        std::fs::write(&path, "{not json").unwrap();
        let result = CompatibilityMatrix::load(&path);
        assert!(matches!(result, Err(fm_core::Error::Parse(_))));
    }

    #[test]
    fn query_known_and_unknown() {
        let matrix = sample_matrix();
        let entry = matrix.query("mp4").unwrap();
        assert_eq!(entry.codecs.video, vec!["h264", "mpeg2video"]);

        // Case-normalized lookup.
        assert!(matrix.query("MP4").is_ok());

        assert!(matches!(
            matrix.query("avi"),
            Err(fm_core::Error::EntryNotFound(_))
        ));
    }

    #[test]
    fn empty_kind_is_present_not_absent() {
        let matrix = sample_matrix();
        let entry = matrix.query("wav").unwrap();
        assert!(entry.codecs.video.is_empty());
        assert_eq!(entry.codecs.audio, vec!["pcm_s16le"]);
    }

    #[test]
    fn search_by_codecs_and_extension() {
        let matrix = sample_matrix();
        let formats = sample_formats();

        // Video codec only.
        assert_eq!(
            matrix.search(Some("h264"), None, None, &formats),
            vec!["matroska", "mp4"]
        );

        // Both codecs plus extension narrow to one container.
        assert_eq!(
            matrix.search(Some("h264"), Some("aac"), Some("mp4"), &formats),
            vec!["mp4"]
        );

        // Extension alone.
        assert_eq!(
            matrix.search(None, None, Some("mkv"), &formats),
            vec!["matroska"]
        );

        // Nothing matches.
        assert!(matrix
            .search(Some("prores"), None, Some("wav"), &formats)
            .is_empty());

        // No criteria: every container qualifies.
        assert_eq!(matrix.search(None, None, None, &formats).len(), 3);
    }
}
