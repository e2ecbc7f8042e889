//! The empirical (container, codec) compatibility probe.
//!
//! There is no query surface in ffmpeg that answers "can codec X be muxed
//! into container Y"; the only reliable oracle is attempting a real encode
//! and watching what happens. Each probe drives one minimal synthetic
//! encode (a single black frame, or one second of tone) into the discard
//! sink and classifies the outcome.

use std::time::Duration;

use crate::catalog::CodecKind;
use crate::command::ToolCommand;
use crate::tools::ToolConfig;

/// Diagnostic phrases that mark a *semantic* rejection of the (container,
/// codec) pair. Any of these in stderr means incompatible regardless of the
/// exit status: ffmpeg sometimes exits zero after silently substituting a
/// codec, and sometimes exits non-zero for unrelated reasons.
pub const INCOMPATIBILITY_PHRASES: &[&str] = &[
    "codec not currently supported in container",
    "Unknown encoder",
    "(incorrect codec parameters ?)",
    "Unable to find a suitable codec",
];

/// Platform discard sink for probe output.
pub fn discard_sink() -> &'static str {
    if cfg!(windows) {
        "NUL"
    } else {
        "/dev/null"
    }
}

/// Classify a finished probe run.
///
/// This is a heuristic, not a proof: a phrase match wins over the exit
/// status in both directions, and anything else falls through to the
/// status itself.
pub fn classify_outcome(stderr: &str, exit_ok: bool) -> bool {
    if INCOMPATIBILITY_PHRASES
        .iter()
        .any(|phrase| stderr.contains(phrase))
    {
        return false;
    }
    exit_ok
}

/// Drives synthetic encode attempts against one ffmpeg binary.
#[derive(Debug, Clone)]
pub struct CompatibilityProbe {
    ffmpeg: ToolConfig,
    timeout: Duration,
}

impl CompatibilityProbe {
    /// Create a probe for the given ffmpeg binary with a per-attempt timeout.
    pub fn new(ffmpeg: ToolConfig, timeout: Duration) -> Self {
        Self { ffmpeg, timeout }
    }

    /// Probe one (container, codec, kind) triple.
    ///
    /// Fail-closed: every failure mode -- spawn error, timeout, phrase
    /// match, non-zero exit -- yields `false`. Errors are logged at debug
    /// and never reach the aggregator.
    pub async fn probe(&self, container: &str, codec: &str, kind: CodecKind) -> bool {
        match self.try_probe(container, codec, kind).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::debug!("probe {container}/{codec} ({kind}) failed: {e}");
                false
            }
        }
    }

    async fn try_probe(
        &self,
        container: &str,
        codec: &str,
        kind: CodecKind,
    ) -> fm_core::Result<bool> {
        let mut cmd = ToolCommand::new(self.ffmpeg.path.clone());
        cmd.timeout(self.timeout);

        match kind {
            CodecKind::Video => {
                cmd.args([
                    "-hide_banner",
                    "-y",
                    "-f",
                    "lavfi",
                    "-i",
                    "color=c=black:s=64x64:r=25",
                    "-frames:v",
                    "1",
                    "-c:v",
                    codec,
                    "-pix_fmt",
                    "yuv420p",
                    "-f",
                    container,
                ]);
            }
            CodecKind::Audio => {
                cmd.args([
                    "-hide_banner",
                    "-y",
                    "-f",
                    "lavfi",
                    "-i",
                    "sine=frequency=1000:duration=1:sample_rate=44100",
                    "-c:a",
                    codec,
                    "-f",
                    container,
                ]);
            }
        }
        cmd.arg(discard_sink());

        let output = cmd.capture().await?;
        Ok(classify_outcome(&output.stderr, output.status.success()))
    }
}
