//! SfData I/O - SFDS containers on streams and files
//!
//! This crate wraps the binary tree codec in the chunked container:
//!
//! - Streaming chunked compression on write, bounded by one chunk of memory
//! - Sequential chunk verification and decompression on read
//! - Per-chunk progress reporting
//! - Opt-in recovery from damaged chunks
//! - Non-blocking variants (feature `async`)
//! - SfFormat text file helpers

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod chunked;
#[cfg(feature = "async")]
pub mod nonblocking;
pub mod progress;
pub mod reader;
pub mod text_file;
pub mod writer;

// Re-export commonly used types
pub use progress::{NoProgress, Progress, ProgressObserver, STAGE_COMPRESS, STAGE_DECOMPRESS};
pub use reader::{ContainerInfo, LoadOutcome};
pub use sfdata_format::{Compression, ContainerHeader, Limits, Result, SfError, Value};
pub use text_file::{load_text_file, save_text_file};
pub use writer::WriteSummary;

#[cfg(feature = "async")]
pub use nonblocking::{
    load_from_file_async, load_from_stream_async, save_to_file_async, save_to_stream_async,
};
#[cfg(feature = "async")]
pub use tokio_util::sync::CancellationToken;

use serde::Deserialize;
use sfdata_format::constants::DEFAULT_CHUNK_SIZE;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

/// Container read/write options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContainerOptions {
    /// Raw bytes buffered per chunk before it is compressed
    pub chunk_size_bytes: u32,
    /// Preferred compression algorithm and level (write only)
    pub compression: Compression,
    /// Tolerate damaged chunks instead of failing (read only)
    pub allow_recovery: bool,
    /// Decode limits (read only)
    pub limits: Limits,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
            compression: Compression::default(),
            allow_recovery: false,
            limits: Limits::default(),
        }
    }
}

/// Write `value` as a container at the sink's current position
pub fn save_to_stream<W: Write + Seek>(
    value: &Value,
    sink: &mut W,
    options: &ContainerOptions,
) -> Result<WriteSummary> {
    writer::write_container(value, sink, options, &mut NoProgress)
}

/// [`save_to_stream`] reporting progress once per chunk
pub fn save_to_stream_with_progress<W: Write + Seek>(
    value: &Value,
    sink: &mut W,
    options: &ContainerOptions,
    observer: &mut dyn ProgressObserver,
) -> Result<WriteSummary> {
    writer::write_container(value, sink, options, observer)
}

/// Read one container from the source's current position
pub fn load_from_stream<R: Read + Seek>(
    source: &mut R,
    options: &ContainerOptions,
) -> Result<Value> {
    Ok(load_from_stream_detailed(source, options, &mut NoProgress)?.value)
}

/// [`load_from_stream`] reporting progress once per chunk
pub fn load_from_stream_with_progress<R: Read + Seek>(
    source: &mut R,
    options: &ContainerOptions,
    observer: &mut dyn ProgressObserver,
) -> Result<Value> {
    Ok(load_from_stream_detailed(source, options, observer)?.value)
}

/// Read one container and report header, damaged chunks and salvage state
pub fn load_from_stream_detailed<R: Read + Seek>(
    source: &mut R,
    options: &ContainerOptions,
    observer: &mut dyn ProgressObserver,
) -> Result<LoadOutcome> {
    reader::read_container(source, options, observer)
}

/// Write `value` to a new container file, replacing any existing file
pub fn save_to_file<P: AsRef<Path>>(
    value: &Value,
    path: P,
    options: &ContainerOptions,
) -> Result<WriteSummary> {
    save_to_file_with_progress(value, path, options, &mut NoProgress)
}

/// [`save_to_file`] reporting progress once per chunk
pub fn save_to_file_with_progress<P: AsRef<Path>>(
    value: &Value,
    path: P,
    options: &ContainerOptions,
    observer: &mut dyn ProgressObserver,
) -> Result<WriteSummary> {
    let mut sink = BufWriter::new(File::create(path)?);
    let summary = writer::write_container(value, &mut sink, options, observer)?;
    sink.flush()?;
    Ok(summary)
}

/// Read a container file
pub fn load_from_file<P: AsRef<Path>>(path: P, options: &ContainerOptions) -> Result<Value> {
    Ok(load_from_file_detailed(path, options, &mut NoProgress)?.value)
}

/// [`load_from_file`] reporting progress once per chunk
pub fn load_from_file_with_progress<P: AsRef<Path>>(
    path: P,
    options: &ContainerOptions,
    observer: &mut dyn ProgressObserver,
) -> Result<Value> {
    Ok(load_from_file_detailed(path, options, observer)?.value)
}

/// Read a container file and report header, damaged chunks and salvage state
pub fn load_from_file_detailed<P: AsRef<Path>>(
    path: P,
    options: &ContainerOptions,
    observer: &mut dyn ProgressObserver,
) -> Result<LoadOutcome> {
    let mut source = BufReader::new(File::open(path)?);
    reader::read_container(&mut source, options, observer)
}

/// Validate a container file's header and descriptor table without decoding it
pub fn inspect_file<P: AsRef<Path>>(path: P, limits: &Limits) -> Result<ContainerInfo> {
    let mut source = BufReader::new(File::open(path)?);
    reader::inspect(&mut source, limits)
}
