//! Object mapper between host types and [`Value`] trees
//!
//! Any `Serialize` type can become a document and any `Deserialize` type can
//! be read back out of one. Structs and maps become objects in field order,
//! sequences become arrays, unit enum variants become strings and data-carrying
//! variants become single-key objects.
//!
//! ```
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Player {
//!     name: String,
//!     level: u32,
//! }
//!
//! let text = sfdata_codec::mapper::to_text(&Player { name: "Song".into(), level: 99 }, false).unwrap();
//! assert_eq!(text, "name:Song,level:99");
//! let back: Player = sfdata_codec::mapper::from_text("name:Song\nlevel:\"99\"").unwrap();
//! assert_eq!(back.level, 99);
//! ```

mod de;
mod ser;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sfdata_format::{Result, Value};

pub use self::de::ValueDeserializer;
pub use self::ser::ValueSerializer;

use crate::text;

/// Convert any serializable value into a document tree
pub fn to_value<T>(value: &T) -> Result<Value>
where
    T: ?Sized + Serialize,
{
    value.serialize(ValueSerializer)
}

/// Build a host value out of a document tree
pub fn from_value<T>(value: Value) -> Result<T>
where
    T: DeserializeOwned,
{
    T::deserialize(ValueDeserializer::new(value))
}

/// Parse SfFormat text straight into a host value
pub fn from_text<T>(text: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    from_value(text::parse(text)?)
}

/// Render a host value as SfFormat text
pub fn to_text<T>(value: &T, indent: bool) -> Result<String>
where
    T: ?Sized + Serialize,
{
    Ok(text::dump(&to_value(value)?, indent))
}
