//! The flattened view produced by `to_dict`/`to_array`, for consumers that would rather not
//! depend on the full `NbtTag` enum.

use std::collections::HashMap;

use super::NbtTag;

/// A tag tree flattened into plain Rust containers, as produced by
/// [`NbtCompound::to_dict`](super::NbtCompound::to_dict) and
/// [`NbtList::to_array`](super::NbtList::to_array).
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    List(Vec<Value>),
    Compound(HashMap<String, Value>),
}

impl From<&NbtTag> for Value {
    fn from(tag: &NbtTag) -> Value {
        match tag {
            NbtTag::Byte(v) => Value::Byte(*v),
            NbtTag::Short(v) => Value::Short(*v),
            NbtTag::Int(v) => Value::Int(*v),
            NbtTag::Long(v) => Value::Long(*v),
            NbtTag::Float(v) => Value::Float(*v),
            NbtTag::Double(v) => Value::Double(*v),
            NbtTag::ByteArray(v) => Value::ByteArray(v.clone()),
            NbtTag::String(v) => Value::String(v.clone()),
            NbtTag::IntArray(v) => Value::IntArray(v.clone()),
            NbtTag::LongArray(v) => Value::LongArray(v.clone()),
            NbtTag::List(l) => Value::List(l.to_array()),
            NbtTag::Compound(c) => Value::Compound(c.to_dict()),
        }
    }
}
