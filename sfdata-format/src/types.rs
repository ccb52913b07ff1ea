//! Tree node tag enumeration

use crate::constants::*;
use crate::error::SfError;

/// Leading tag byte of each binary tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TypeTag {
    /// Absent value
    None = TAG_NONE,
    /// UTF-8 string with varint length
    String = TAG_STRING,
    /// Zigzag varint integer
    Int = TAG_INT,
    /// Eight-byte little-endian double
    Double = TAG_DOUBLE,
    /// One-byte boolean
    Boolean = TAG_BOOLEAN,
    /// Object with varint entry count
    Object = TAG_OBJECT,
    /// Array with varint element count
    Array = TAG_ARRAY,
}

impl TypeTag {
    /// Convert from u8
    pub fn from_u8(val: u8) -> Result<Self, SfError> {
        match val {
            TAG_NONE => Ok(TypeTag::None),
            TAG_STRING => Ok(TypeTag::String),
            TAG_INT => Ok(TypeTag::Int),
            TAG_DOUBLE => Ok(TypeTag::Double),
            TAG_BOOLEAN => Ok(TypeTag::Boolean),
            TAG_OBJECT => Ok(TypeTag::Object),
            TAG_ARRAY => Ok(TypeTag::Array),
            other => Err(SfError::InvalidTag(other)),
        }
    }
}
