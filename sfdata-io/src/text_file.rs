//! SfFormat text files

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use sfdata_codec::text;
use sfdata_format::{Limits, Result, Value};

/// Load a text document. A missing file reads as [`Value::None`].
pub fn load_text_file<P: AsRef<Path>>(path: P) -> Result<Value> {
    load_text_file_with_limits(path, &Limits::default())
}

/// Load a text document, bounding nesting depth by `limits`
pub fn load_text_file_with_limits<P: AsRef<Path>>(path: P, limits: &Limits) -> Result<Value> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(contents) => text::parse_with_limits(&contents, limits),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "text file missing, using empty document");
            Ok(Value::None)
        }
        Err(err) => Err(err.into()),
    }
}

/// Write `value` as SfFormat text, replacing any existing file
pub fn save_text_file<P: AsRef<Path>>(path: P, value: &Value, indent: bool) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    text::dump_to_writer(value, indent, &mut writer)?;
    writer.flush()?;
    Ok(())
}
