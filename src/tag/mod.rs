//! The NBT tag tree: a tagged-sum of twelve variants that composes into arbitrarily nested trees.

mod compound;
mod list;
mod query;
mod view;

pub use self::compound::{MergeMode, NbtCompound};
pub use self::list::NbtList;
pub use self::query::QueryValue;
pub use self::view::Value;

use crate::error::NbtError;

/// The numeric type ID of an NBT tag, as it appears on the wire.
pub const ID_END: u8 = 0;
pub const ID_BYTE: u8 = 1;
pub const ID_SHORT: u8 = 2;
pub const ID_INT: u8 = 3;
pub const ID_LONG: u8 = 4;
pub const ID_FLOAT: u8 = 5;
pub const ID_DOUBLE: u8 = 6;
pub const ID_BYTE_ARRAY: u8 = 7;
pub const ID_STRING: u8 = 8;
pub const ID_LIST: u8 = 9;
pub const ID_COMPOUND: u8 = 10;
pub const ID_INT_ARRAY: u8 = 11;
pub const ID_LONG_ARRAY: u8 = 12;

/// A single node of an NBT tag tree.
///
/// Each variant wraps the Rust type that naturally holds its payload; array variants share
/// nothing but a common encoder/decoder shape (see the `raw` module).
#[derive(Clone, Debug, PartialEq)]
pub enum NbtTag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(NbtList),
    Compound(NbtCompound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl NbtTag {
    /// The type ID of this tag, a single byte in the range `0x01` to `0x0c`.
    pub fn id(&self) -> u8 {
        match *self {
            NbtTag::Byte(_) => ID_BYTE,
            NbtTag::Short(_) => ID_SHORT,
            NbtTag::Int(_) => ID_INT,
            NbtTag::Long(_) => ID_LONG,
            NbtTag::Float(_) => ID_FLOAT,
            NbtTag::Double(_) => ID_DOUBLE,
            NbtTag::ByteArray(_) => ID_BYTE_ARRAY,
            NbtTag::String(_) => ID_STRING,
            NbtTag::List(_) => ID_LIST,
            NbtTag::Compound(_) => ID_COMPOUND,
            NbtTag::IntArray(_) => ID_INT_ARRAY,
            NbtTag::LongArray(_) => ID_LONG_ARRAY,
        }
    }

    /// A human-readable name for this tag's variant, used in error messages.
    pub fn tag_name(&self) -> &'static str {
        match *self {
            NbtTag::Byte(_) => "Byte",
            NbtTag::Short(_) => "Short",
            NbtTag::Int(_) => "Int",
            NbtTag::Long(_) => "Long",
            NbtTag::Float(_) => "Float",
            NbtTag::Double(_) => "Double",
            NbtTag::ByteArray(_) => "ByteArray",
            NbtTag::String(_) => "String",
            NbtTag::List(_) => "List",
            NbtTag::Compound(_) => "Compound",
            NbtTag::IntArray(_) => "IntArray",
            NbtTag::LongArray(_) => "LongArray",
        }
    }

    /// Returns the compound this tag holds, if it is one.
    pub fn as_compound(&self) -> Option<&NbtCompound> {
        match self {
            NbtTag::Compound(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the compound this tag holds, if it is one.
    pub fn as_compound_mut(&mut self) -> Option<&mut NbtCompound> {
        match self {
            NbtTag::Compound(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the list this tag holds, if it is one.
    pub fn as_list(&self) -> Option<&NbtList> {
        match self {
            NbtTag::List(l) => Some(l),
            _ => None,
        }
    }

    /// Returns the list this tag holds, if it is one.
    pub fn as_list_mut(&mut self) -> Option<&mut NbtList> {
        match self {
            NbtTag::List(l) => Some(l),
            _ => None,
        }
    }

    /// Fails with `ValueConstraint` if this tag's array-element variants contain an element
    /// outside the range of their element type. Scalars are always in range because they're
    /// stored in host types of the exact right width; this exists mainly so a future constructor
    /// built from a wider integer (e.g. parsing SNBT) has a single place to enforce §3.1's
    /// constraints.
    pub fn validate(&self) -> Result<(), NbtError> {
        match self {
            NbtTag::String(s) if s.len() > u16::MAX as usize => Err(NbtError::ValueConstraint(
                format!("string of {} bytes exceeds the 65535 byte limit", s.len()),
            )),
            NbtTag::ByteArray(v) if v.len() > i32::MAX as usize => {
                Err(NbtError::ValueConstraint("ByteArray too long".into()))
            }
            NbtTag::IntArray(v) if v.len() > i32::MAX as usize => {
                Err(NbtError::ValueConstraint("IntArray too long".into()))
            }
            NbtTag::LongArray(v) if v.len() > i32::MAX as usize => {
                Err(NbtError::ValueConstraint("LongArray too long".into()))
            }
            _ => Ok(()),
        }
    }
}

macro_rules! from_scalar {
    ($t:ty, $variant:ident) => {
        impl From<$t> for NbtTag {
            fn from(v: $t) -> NbtTag {
                NbtTag::$variant(v)
            }
        }
    };
}

from_scalar!(i8, Byte);
from_scalar!(i16, Short);
from_scalar!(i32, Int);
from_scalar!(i64, Long);
from_scalar!(f32, Float);
from_scalar!(f64, Double);
from_scalar!(Vec<i8>, ByteArray);
from_scalar!(Vec<i32>, IntArray);
from_scalar!(Vec<i64>, LongArray);

impl From<String> for NbtTag {
    fn from(v: String) -> NbtTag {
        NbtTag::String(v)
    }
}

impl<'a> From<&'a str> for NbtTag {
    fn from(v: &'a str) -> NbtTag {
        NbtTag::String(v.to_string())
    }
}

impl From<NbtCompound> for NbtTag {
    fn from(v: NbtCompound) -> NbtTag {
        NbtTag::Compound(v)
    }
}

impl From<NbtList> for NbtTag {
    fn from(v: NbtList) -> NbtTag {
        NbtTag::List(v)
    }
}
