mod cli;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

use ffmatrix::{compare, table};
use fm_av::catalog::{self, CodecCatalog, FormatCatalog};
use fm_av::matrix::CompatibilityMatrix;
use fm_av::probe::CompatibilityProbe;
use fm_av::{MediaInspector, ToolRegistry};
use fm_core::Config;
use fm_resolve::{build_args, TranscodeResolver};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "ffmatrix=trace,fm_av=trace,fm_resolve=trace,fm_core=debug".to_string()
        } else {
            "ffmatrix=info,fm_av=info,fm_resolve=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let config = Config::load_or_default(cli.config.as_deref());
    for warning in config.validate() {
        tracing::warn!("config: {warning}");
    }

    let matrix_path = cli
        .matrix
        .clone()
        .unwrap_or_else(|| config.matrix.path.clone());

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Build { workers } => rt.block_on(build_matrix(&config, &matrix_path, workers)),
        Commands::Query { container, json } => query_matrix(&matrix_path, &container, json),
        Commands::Search {
            video_codec,
            audio_codec,
            extension,
        } => rt.block_on(search_matrix(
            &config,
            &matrix_path,
            video_codec.as_deref(),
            audio_codec.as_deref(),
            extension.as_deref(),
        )),
        Commands::Formats { json } => rt.block_on(list_formats(&config, json)),
        Commands::Encoders { json } => rt.block_on(list_encoders(&config, json)),
        Commands::InspectCodec { name, json } => rt.block_on(inspect_codec(&config, &name, json)),
        Commands::InspectMuxer { name, json } => rt.block_on(inspect_muxer(&config, &name, json)),
        Commands::Resolve {
            probe_file,
            input_file,
            output_file,
            run,
            json,
        } => rt.block_on(resolve_file(
            &config,
            &matrix_path,
            &probe_file,
            input_file.as_deref(),
            output_file.as_deref(),
            run,
            json,
        )),
        Commands::Compare {
            source,
            dest,
            diff,
            matches,
        } => rt.block_on(compare_files(&config, &source, &dest, diff, matches)),
        Commands::CheckTools => check_tools(&config),
    }
}

async fn build_matrix(
    config: &Config,
    matrix_path: &Path,
    workers: Option<usize>,
) -> Result<()> {
    let registry = ToolRegistry::discover(&config.tools);
    let ffmpeg = registry.require("ffmpeg")?.clone();

    tracing::info!("loading codec and format catalogs");
    let codecs = CodecCatalog::load(&ffmpeg, registry.timeout).await?;
    let formats = FormatCatalog::load(&ffmpeg, registry.timeout).await?;
    println!(
        "Probing {} output containers against {} codecs...",
        formats.len(),
        codecs.len()
    );

    let probe = CompatibilityProbe::new(
        ffmpeg,
        Duration::from_secs(config.matrix.probe_timeout_secs),
    );
    let workers = workers.unwrap_or(config.matrix.probe_workers);

    let matrix = CompatibilityMatrix::build(&probe, &codecs, &formats, workers).await;
    matrix.save(matrix_path)?;

    println!(
        "Wrote {} container entries to {}",
        matrix.len(),
        matrix_path.display()
    );
    Ok(())
}

fn query_matrix(matrix_path: &Path, container: &str, json: bool) -> Result<()> {
    let matrix = CompatibilityMatrix::load(matrix_path)?;
    let entry = matrix.query(container)?;

    if json {
        println!("{}", serde_json::to_string_pretty(entry)?);
    } else {
        let rows = vec![
            vec!["video".to_string(), entry.codecs.video.join(", ")],
            vec!["audio".to_string(), entry.codecs.audio.join(", ")],
        ];
        println!("{}", table::render(&["Kind", "Compatible codecs"], rows));
    }
    Ok(())
}

async fn search_matrix(
    config: &Config,
    matrix_path: &Path,
    video_codec: Option<&str>,
    audio_codec: Option<&str>,
    extension: Option<&str>,
) -> Result<()> {
    let matrix = CompatibilityMatrix::load(matrix_path)?;

    // The extension criterion needs live format data; codec-only searches
    // run straight off the matrix file.
    let formats = if extension.is_some() {
        let registry = ToolRegistry::discover(&config.tools);
        let ffmpeg = registry.require("ffmpeg")?.clone();
        FormatCatalog::load(&ffmpeg, registry.timeout).await?
    } else {
        FormatCatalog::assemble(&[], &[], &Default::default())
    };

    let hits = matrix.search(video_codec, audio_codec, extension, &formats);
    if hits.is_empty() {
        println!("No containers match the given criteria");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = hits
        .iter()
        .map(|name| {
            let extensions = formats
                .get(name)
                .map(|f| f.extensions.join(", "))
                .unwrap_or_default();
            vec![name.clone(), extensions]
        })
        .collect();
    println!("{}", table::render(&["Container", "Extensions"], rows));
    Ok(())
}

async fn list_formats(config: &Config, json: bool) -> Result<()> {
    let registry = ToolRegistry::discover(&config.tools);
    let ffmpeg = registry.require("ffmpeg")?.clone();
    let formats = FormatCatalog::load(&ffmpeg, registry.timeout).await?;

    if json {
        let all: Vec<_> = formats.iter().collect();
        println!("{}", serde_json::to_string_pretty(&all)?);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = formats
        .iter()
        .map(|f| {
            vec![
                f.name.clone(),
                f.description.clone(),
                f.extensions.join(", "),
                f.available_muxers.join(", "),
                f.default_video_codec.clone().unwrap_or_default(),
                f.default_audio_codec.clone().unwrap_or_default(),
            ]
        })
        .collect();
    println!(
        "{}",
        table::render(
            &["Name", "Description", "Extensions", "Muxers", "Video", "Audio"],
            rows
        )
    );
    Ok(())
}

async fn list_encoders(config: &Config, json: bool) -> Result<()> {
    let registry = ToolRegistry::discover(&config.tools);
    let ffmpeg = registry.require("ffmpeg")?.clone();
    let encoders = catalog::list_encoders(&ffmpeg, registry.timeout).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&encoders)?);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = encoders
        .iter()
        .map(|e| vec![e.flag.clone(), e.name.clone(), e.description.clone()])
        .collect();
    println!("{}", table::render(&["Flags", "Name", "Description"], rows));
    Ok(())
}

async fn inspect_codec(config: &Config, name: &str, json: bool) -> Result<()> {
    let registry = ToolRegistry::discover(&config.tools);
    let ffmpeg = registry.require("ffmpeg")?.clone();
    let details = catalog::encoder_details(&ffmpeg, name, registry.timeout).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&details)?);
        return Ok(());
    }

    println!("Encoder: {}", details.name);
    if !details.capabilities.is_empty() {
        let rows = details
            .capabilities
            .iter()
            .map(|(k, v)| vec![k.clone(), v.clone()])
            .collect();
        println!("{}", table::render(&["Capability", "Value"], rows));
    }
    if !details.pixel_formats.is_empty() {
        println!("Pixel formats: {}", details.pixel_formats.join(" "));
    }
    if !details.sample_formats.is_empty() {
        println!("Sample formats: {}", details.sample_formats.join(" "));
    }
    if !details.options.is_empty() {
        println!("Options: {}", details.options.join(", "));
    }
    Ok(())
}

async fn inspect_muxer(config: &Config, name: &str, json: bool) -> Result<()> {
    let registry = ToolRegistry::discover(&config.tools);
    let ffmpeg = registry.require("ffmpeg")?.clone();
    let help = catalog::muxer_details(&ffmpeg, name, registry.timeout).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&help)?);
        return Ok(());
    }

    println!("Muxer: {name}");
    if !help.metadata.is_empty() {
        let rows = help
            .metadata
            .iter()
            .map(|(k, v)| vec![k.clone(), v.clone()])
            .collect();
        println!("{}", table::render(&["Setting", "Value"], rows));
    }
    if !help.options.is_empty() {
        let rows = help
            .options
            .iter()
            .map(|o| {
                vec![
                    o.name.clone(),
                    o.value_type.clone(),
                    o.description.clone(),
                ]
            })
            .collect();
        println!("{}", table::render(&["Option", "Type", "Description"], rows));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn resolve_file(
    config: &Config,
    matrix_path: &Path,
    probe_file: &Path,
    input_file: Option<&Path>,
    output_file: Option<&Path>,
    run: bool,
    json: bool,
) -> Result<()> {
    if !probe_file.exists() {
        anyhow::bail!("File does not exist: {}", probe_file.display());
    }
    if run && (input_file.is_none() || output_file.is_none()) {
        anyhow::bail!("--run requires --input-file and --output-file");
    }

    let registry = ToolRegistry::discover(&config.tools);
    let ffprobe = registry.require("ffprobe")?.clone();
    let ffmpeg = registry.require("ffmpeg")?.clone();

    let inspector = MediaInspector::new(ffprobe, registry.timeout);
    let media = match inspector.inspect(probe_file).await {
        Ok(media) => media,
        Err(e) => {
            tracing::debug!("inspect failed: {e}");
            println!("\nUnable to get metadata for {}\n", probe_file.display());
            return Ok(());
        }
    };

    let codecs = CodecCatalog::load(&ffmpeg, registry.timeout).await?;
    let resolver = TranscodeResolver::new(&codecs);
    let profile = match resolver
        .resolve_for_input(&media, &inspector, input_file)
        .await
    {
        Ok(profile) => profile,
        Err(fm_core::Error::NoSupportedStream(msg)) => {
            println!("Could not detect any video or audio settings: {msg}");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        print_detected_codecs(&codecs, &profile);

        println!("\nTranscode Settings:");
        println!("{}", table::settings_table(&serde_json::to_value(&profile)?));

        print_matrix_hits(matrix_path, &profile);
    }

    let input_str = input_file
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "[input_file]".to_string());
    let extension = if profile.extension.is_empty() {
        "mp4"
    } else {
        profile.extension.as_str()
    };
    let output_str = output_file
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| format!("[output_file.{extension}]"));

    let args = build_args(&profile, &input_str, &output_str);
    println!("\nffmpeg command line:\n");
    println!("ffmpeg {}\n", args.join(" "));

    if run {
        let status = tokio::process::Command::new(&ffmpeg.path)
            .args(&args)
            .status()
            .await?;
        if !status.success() {
            anyhow::bail!("ffmpeg exited with status {status}");
        }
        println!("Transcode complete: {output_str}");
    }

    Ok(())
}

fn print_detected_codecs(codecs: &CodecCatalog, profile: &fm_resolve::TranscodeProfile) {
    let mut rows = Vec::new();
    if let Some(video) = &profile.video {
        if let Some(codec) = codecs.get(&video.codec) {
            rows.push(vec![
                codec.kind.to_string(),
                codec.name.clone(),
                codec.description.clone(),
            ]);
        }
    }
    if let Some(audio) = &profile.audio {
        if let Some(codec) = codecs.get(&audio.codec) {
            rows.push(vec![
                codec.kind.to_string(),
                codec.name.clone(),
                codec.description.clone(),
            ]);
        }
    }
    if !rows.is_empty() {
        println!("\nDetected Codecs:");
        println!("{}", table::render(&["Kind", "Codec", "Description"], rows));
    }
}

/// Informational: which containers the matrix says can hold the resolved
/// codec combination. An unbuilt matrix is reported, never fatal here.
fn print_matrix_hits(matrix_path: &Path, profile: &fm_resolve::TranscodeProfile) {
    match CompatibilityMatrix::load(matrix_path) {
        Ok(matrix) => {
            let empty = FormatCatalog::assemble(&[], &[], &Default::default());
            let hits = matrix.search(
                profile.video.as_ref().map(|v| v.codec.as_str()),
                profile.audio.as_ref().map(|a| a.codec.as_str()),
                None,
                &empty,
            );
            if hits.is_empty() {
                println!("\nNo container in the matrix supports this codec combination");
            } else {
                println!("\nCompatible containers: {}", hits.join(", "));
            }
        }
        Err(e) => println!("\n{e}"),
    }
}

async fn compare_files(
    config: &Config,
    source: &Path,
    dest: &Path,
    diff: bool,
    matches: bool,
) -> Result<()> {
    for path in [source, dest] {
        if !path.exists() {
            anyhow::bail!("File does not exist: {}", path.display());
        }
    }

    let registry = ToolRegistry::discover(&config.tools);
    let ffprobe = registry.require("ffprobe")?.clone();
    let inspector = MediaInspector::new(ffprobe, registry.timeout);

    let (source_doc, dest_doc) = match (
        inspector.raw(source).await,
        inspector.raw(dest).await,
    ) {
        (Ok(a), Ok(b)) => (a, b),
        _ => {
            println!("Could not get file metadata");
            return Ok(());
        }
    };

    let comparison = compare::compare_values(&source_doc, &dest_doc);

    // With no explicit selection, show both views.
    let (show_diff, show_matches) = if diff || matches {
        (diff, matches)
    } else {
        (true, true)
    };

    if show_diff {
        println!("\nDifferences:");
        if comparison.differences.is_empty() {
            println!("No differences found!");
        } else {
            println!("{}", comparison_table(&comparison.differences));
        }
    }

    if show_matches {
        println!("\nMatches:");
        if comparison.matches.is_empty() {
            println!("No matches found!");
        } else {
            println!("{}", comparison_table(&comparison.matches));
        }
    }

    Ok(())
}

fn comparison_table(rows: &[compare::ComparisonRow]) -> String {
    let data: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.section.clone(),
                r.setting.clone(),
                r.left.clone(),
                r.right.clone(),
            ]
        })
        .collect();
    table::render(&["Section", "Setting", "Source", "Dest"], data)
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let registry = ToolRegistry::discover(&config.tools);
    let tools = registry.check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to enable all features.");
    }

    Ok(())
}
