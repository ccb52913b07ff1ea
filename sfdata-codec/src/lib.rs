//! SfData Codec - Encoders and decoders for SfData documents
//!
//! This crate turns [`Value`] trees into bytes and back:
//!
//! - [`text`]: the human-writable SfFormat notation
//! - [`tree`]: the compact tagged binary encoding
//! - [`compress`]: per-chunk Zstandard / Deflate compression
//! - [`mapper`]: serde bridge between host types and documents

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod compress;
pub mod mapper;
pub mod text;
pub mod tree;

// Re-export commonly used types
pub use sfdata_format::{Compression, Limits, Map, Result, SfError, Value, ValueKind};

pub use mapper::{from_text, from_value, to_text, to_value};
pub use text::{dump, parse, Document};
