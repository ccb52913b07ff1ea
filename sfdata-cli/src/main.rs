//! SfData CLI - documents and SFDS containers from the command line
//!
//! This binary provides command-line interfaces for:
//! - pack: SfFormat text (or JSON) → .sfds container
//! - unpack: .sfds container → SfFormat text or JSON
//! - fmt: re-indent or compact SfFormat text
//! - inspect: show a container's header and chunk table

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use sfdata_codec::text;
use sfdata_io::{
    inspect_file, load_from_file_detailed, save_to_file_with_progress, Compression,
    ContainerInfo, ContainerOptions, LoadOutcome, NoProgress, Progress, ProgressObserver, Value,
    WriteSummary,
};
use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sfdata")]
#[command(about = "SfData document and container tool")]
#[command(version)]
struct Cli {
    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    /// TOML file whose [container] table supplies default options
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack an SfFormat (or .json) document into an .sfds container
    Pack {
        /// Input document
        input: PathBuf,
        /// Output file (.sfds)
        #[arg(short, long)]
        output: PathBuf,
        /// Raw bytes per chunk
        #[arg(long)]
        chunk_size: Option<u32>,
        /// Compression algorithm
        #[arg(long, value_enum)]
        compression: Option<Algorithm>,
        /// Compression level
        #[arg(long)]
        level: Option<u8>,
        /// Treat the input as JSON regardless of its extension
        #[arg(long)]
        json: bool,
        /// Show a progress bar while compressing
        #[arg(long)]
        progress: bool,
    },
    /// Unpack an .sfds container to SfFormat text or JSON
    Unpack {
        /// Input file (.sfds)
        input: PathBuf,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
        /// Write without indentation
        #[arg(long)]
        compact: bool,
        /// Write JSON instead of SfFormat text
        #[arg(long)]
        json: bool,
        /// Keep going past damaged chunks
        #[arg(long)]
        allow_recovery: bool,
        /// Show a progress bar while decompressing
        #[arg(long)]
        progress: bool,
    },
    /// Re-indent or compact SfFormat text
    ///
    /// Examples:
    ///   sfdata fmt player.sf
    ///   sfdata fmt player.sf --compact -o player.min.sf
    Fmt {
        /// Input document
        input: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write without indentation
        #[arg(long)]
        compact: bool,
    },
    /// Show a container's header and chunk table without decoding it
    ///
    /// Examples:
    ///   sfdata inspect save.sfds
    ///   sfdata inspect save.sfds --format json
    Inspect {
        /// Input file (.sfds)
        input: PathBuf,
        /// Output format (table, json)
        #[arg(long, value_enum, default_value_t = InspectFormat::Table)]
        format: InspectFormat,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Algorithm {
    Zstd,
    Deflate,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum InspectFormat {
    Table,
    Json,
}

/// Contents of the `--config` file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    container: ContainerOptions,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let base = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Pack {
            input,
            output,
            chunk_size,
            compression,
            level,
            json,
            progress,
        } => {
            let mut options = base;
            if let Some(chunk_size) = chunk_size {
                options.chunk_size_bytes = chunk_size;
            }
            options.compression = select_compression(options.compression, compression, level);
            handle_pack(&input, &output, &options, json, progress)?;
        }
        Commands::Unpack {
            input,
            output,
            compact,
            json,
            allow_recovery,
            progress,
        } => {
            let mut options = base;
            options.allow_recovery |= allow_recovery;
            handle_unpack(&input, &output, &options, compact, json, progress)?;
        }
        Commands::Fmt {
            input,
            output,
            compact,
        } => {
            handle_fmt(&input, output.as_deref(), compact, &base)?;
        }
        Commands::Inspect { input, format } => {
            handle_inspect(&input, format, &base)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ContainerOptions, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(ContainerOptions::default());
    };
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("cannot read config {}: {}", path.display(), e))?;
    let config: ConfigFile = toml::from_str(&contents)
        .map_err(|e| format!("invalid config {}: {}", path.display(), e))?;
    tracing::debug!(path = %path.display(), options = ?config.container, "loaded config");
    Ok(config.container)
}

/// Explicit flags override the configured algorithm and level independently
fn select_compression(
    base: Compression,
    algorithm: Option<Algorithm>,
    level: Option<u8>,
) -> Compression {
    let algorithm = algorithm.unwrap_or(match base {
        Compression::Zstd(_) => Algorithm::Zstd,
        Compression::Deflate(_) => Algorithm::Deflate,
    });
    let level = level.unwrap_or_else(|| match (base, algorithm) {
        (Compression::Zstd(level), Algorithm::Zstd) => level,
        (Compression::Deflate(level), Algorithm::Deflate) => level,
        _ => 6,
    });
    match algorithm {
        Algorithm::Zstd => Compression::Zstd(level),
        Algorithm::Deflate => Compression::Deflate(level),
    }
}

fn read_document(
    path: &Path,
    force_json: bool,
    options: &ContainerOptions,
) -> Result<Value, Box<dyn Error>> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let is_json = force_json
        || path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(serde_json::from_str(&contents)?)
    } else {
        Ok(text::parse_with_limits(&contents, &options.limits)?)
    }
}

fn handle_pack(
    input: &Path,
    output: &Path,
    options: &ContainerOptions,
    force_json: bool,
    show_progress: bool,
) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let value = read_document(input, force_json, options)?;

    let progress_bar = show_progress
        .then(|| create_progress_bar("Compressing"))
        .transpose()?;
    let summary = match &progress_bar {
        Some(pb) => save_to_file_with_progress(&value, output, options, &mut bar_observer(pb))?,
        None => save_to_file_with_progress(&value, output, options, &mut NoProgress)?,
    };
    let elapsed = start.elapsed();
    if let Some(pb) = progress_bar {
        pb.finish_with_message(format!(
            "Compressed {} bytes into {} chunks in {:.2?}",
            summary.total_raw_len, summary.chunk_count, elapsed
        ));
    }
    report_pack_summary(&summary, output, elapsed)?;
    Ok(())
}

fn handle_unpack(
    input: &Path,
    output: &Path,
    options: &ContainerOptions,
    compact: bool,
    json: bool,
    show_progress: bool,
) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let progress_bar = show_progress
        .then(|| create_progress_bar("Decompressing"))
        .transpose()?;
    let outcome = match &progress_bar {
        Some(pb) => load_from_file_detailed(input, options, &mut bar_observer(pb))?,
        None => load_from_file_detailed(input, options, &mut NoProgress)?,
    };
    if let Some(pb) = progress_bar {
        pb.finish_with_message(format!(
            "Decompressed {} chunks in {:.2?}",
            outcome.header.chunk_count,
            start.elapsed()
        ));
    }

    let mut writer = BufWriter::new(File::create(output)?);
    if json {
        if compact {
            serde_json::to_writer(&mut writer, &outcome.value)?;
        } else {
            serde_json::to_writer_pretty(&mut writer, &outcome.value)?;
        }
        writeln!(writer)?;
    } else {
        text::dump_to_writer(&outcome.value, !compact, &mut writer)?;
        writeln!(writer)?;
    }
    writer.flush()?;

    report_unpack_summary(&outcome, output, start.elapsed())?;
    Ok(())
}

fn handle_fmt(
    input: &Path,
    output: Option<&Path>,
    compact: bool,
    options: &ContainerOptions,
) -> Result<(), Box<dyn Error>> {
    let value = read_document(input, false, options)?;
    match output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            text::dump_to_writer(&value, !compact, &mut writer)?;
            writeln!(writer)?;
            writer.flush()?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            text::dump_to_writer(&value, !compact, &mut stdout)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

fn handle_inspect(
    input: &Path,
    format: InspectFormat,
    options: &ContainerOptions,
) -> Result<(), Box<dyn Error>> {
    let info = inspect_file(input, &options.limits)?;
    let mut stdout = io::stdout().lock();
    match format {
        InspectFormat::Table => print_inspect_table(&mut stdout, &info)?,
        InspectFormat::Json => print_inspect_json(&mut stdout, &info)?,
    }
    Ok(())
}

fn compression_ratio(raw: u64, compressed: u64) -> Option<f64> {
    (compressed > 0).then(|| raw as f64 / compressed as f64)
}

fn print_inspect_table(writer: &mut dyn Write, info: &ContainerInfo) -> Result<(), Box<dyn Error>> {
    let header = &info.header;
    let compressed = info.descriptors.total_compressed_len();
    writeln!(writer, "Version\t{}", header.version)?;
    writeln!(writer, "Compression\t{}", info.compression()?.name())?;
    writeln!(writer, "Chunk size\t{}", header.chunk_size)?;
    writeln!(writer, "Chunks\t{}", header.chunk_count)?;
    writeln!(writer, "Raw bytes\t{}", header.total_raw_len)?;
    writeln!(writer, "Compressed bytes\t{}", compressed)?;
    if let Some(ratio) = compression_ratio(header.total_raw_len, compressed) {
        writeln!(writer, "Ratio\t{:.2}", ratio)?;
    }
    writeln!(writer, "Checksums\t{}", header.has_chunk_checksums())?;
    writeln!(writer)?;

    writeln!(writer, "Chunk\tCompressed\tRaw\tChecksum")?;
    for (index, entry) in info.descriptors.entries.iter().enumerate() {
        writeln!(
            writer,
            "{}\t{}\t{}\t{:08x}",
            index, entry.compressed_len, entry.raw_len, entry.checksum
        )?;
    }
    Ok(())
}

fn print_inspect_json(writer: &mut dyn Write, info: &ContainerInfo) -> Result<(), Box<dyn Error>> {
    let header = &info.header;
    let compressed = info.descriptors.total_compressed_len();
    let chunks: Vec<serde_json::Value> = info
        .descriptors
        .entries
        .iter()
        .map(|entry| {
            serde_json::json!({
                "compressed_len": entry.compressed_len,
                "raw_len": entry.raw_len,
                "checksum": format!("{:08x}", entry.checksum),
            })
        })
        .collect();
    let root = serde_json::json!({
        "version": header.version,
        "compression": info.compression()?.name(),
        "chunk_size": header.chunk_size,
        "chunk_count": header.chunk_count,
        "total_raw_len": header.total_raw_len,
        "compressed_len": compressed,
        "ratio": compression_ratio(header.total_raw_len, compressed),
        "chunk_checksums": header.has_chunk_checksums(),
        "chunks": chunks,
    });
    serde_json::to_writer_pretty(&mut *writer, &root)?;
    writeln!(writer)?;
    Ok(())
}

fn report_pack_summary(
    summary: &WriteSummary,
    output: &Path,
    elapsed: Duration,
) -> Result<(), Box<dyn Error>> {
    let mut stderr = io::stderr().lock();
    let secs = elapsed.as_secs_f64().max(f64::EPSILON);
    writeln!(
        &mut stderr,
        "Packed to {} ({}-{}, chunks: {}, raw bytes: {}, compressed bytes: {}, elapsed: {:.2?}, {:.2} MiB/s)",
        output.display(),
        summary.compression.name(),
        summary.compression.level(),
        summary.chunk_count,
        summary.total_raw_len,
        summary.compressed_len,
        elapsed,
        summary.total_raw_len as f64 / (1024.0 * 1024.0) / secs
    )?;
    Ok(())
}

fn report_unpack_summary(
    outcome: &LoadOutcome,
    output: &Path,
    elapsed: Duration,
) -> Result<(), Box<dyn Error>> {
    let mut stderr = io::stderr().lock();
    writeln!(
        &mut stderr,
        "Unpacked to {} (chunks: {}, raw bytes: {}, elapsed: {:.2?})",
        output.display(),
        outcome.header.chunk_count,
        outcome.header.total_raw_len,
        elapsed
    )?;
    if !outcome.corrupt_chunks.is_empty() {
        writeln!(
            &mut stderr,
            "warning: {} damaged chunk(s) recovered: {:?}",
            outcome.corrupt_chunks.len(),
            outcome.corrupt_chunks
        )?;
    }
    if outcome.salvaged {
        writeln!(
            &mut stderr,
            "warning: document is incomplete, decoding stopped in damaged data"
        )?;
    }
    Ok(())
}

fn create_progress_bar(message: &str) -> Result<ProgressBar, Box<dyn Error>> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] {msg} [{bar:30}] {bytes}/{total_bytes}",
        )?,
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn bar_observer(pb: &ProgressBar) -> impl ProgressObserver + '_ {
    move |progress: &Progress| {
        pb.set_length(progress.total_bytes);
        pb.set_position(progress.bytes_processed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_compression_overrides() {
        let base = Compression::Zstd(19);
        assert_eq!(select_compression(base, None, None), Compression::Zstd(19));
        assert_eq!(select_compression(base, None, Some(3)), Compression::Zstd(3));
        assert_eq!(
            select_compression(base, Some(Algorithm::Deflate), None),
            Compression::Deflate(6)
        );
        assert_eq!(
            select_compression(Compression::Deflate(2), Some(Algorithm::Deflate), None),
            Compression::Deflate(2)
        );
    }

    #[test]
    fn test_config_container_table() {
        let config: ConfigFile = toml::from_str(
            r#"
            [container]
            chunk_size_bytes = 2048
            allow_recovery = true

            [container.compression]
            algorithm = "deflate"
            level = 4

            [container.limits]
            max_nesting_depth = 64
            "#,
        )
        .unwrap();
        assert_eq!(config.container.chunk_size_bytes, 2048);
        assert!(config.container.allow_recovery);
        assert_eq!(config.container.compression, Compression::Deflate(4));
        assert_eq!(config.container.limits.max_nesting_depth, 64);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config: ConfigFile = toml::from_str("").unwrap();
        assert_eq!(config.container, ContainerOptions::default());
    }

    #[test]
    fn test_inspect_table_lists_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.sfds");
        let value = Value::from(vec![Value::from("x"); 64]);
        let options = ContainerOptions {
            chunk_size_bytes: 50,
            compression: Compression::Deflate(6),
            ..ContainerOptions::default()
        };
        sfdata_io::save_to_file(&value, &path, &options).unwrap();

        let info = inspect_file(&path, &options.limits).unwrap();
        let mut out = Vec::new();
        print_inspect_table(&mut out, &info).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Compression\tdeflate"));
        assert!(out.contains("Chunks\t4"));
        assert_eq!(out.lines().filter(|l| l.starts_with("3\t")).count(), 1);
    }
}
