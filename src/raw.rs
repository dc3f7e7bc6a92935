//! The binary NBT codec: big-endian, length-prefixed, null-terminated for compounds.
//!
//! Decoding and encoding are both stream-based (forward-only `Read`/`Write`); encoding never
//! buffers the whole tree before emitting, it recurses straight into the destination writer.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::NbtError;
use crate::tag::{
    NbtCompound, NbtList, NbtTag, ID_BYTE, ID_BYTE_ARRAY, ID_COMPOUND, ID_DOUBLE, ID_END, ID_FLOAT,
    ID_INT, ID_INT_ARRAY, ID_LIST, ID_LONG, ID_LONG_ARRAY, ID_SHORT, ID_STRING,
};

/// Matches the nesting depth Minecraft itself enforces; guards the decoder against
/// pathologically nested input blowing the call stack.
pub const MAX_NBT_DEPTH: usize = 512;

fn too_deep() -> NbtError {
    NbtError::MalformedData(format!("nesting exceeds the {} tag depth limit", MAX_NBT_DEPTH))
}

fn read_name(r: &mut impl Read) -> Result<String, NbtError> {
    let len = r.read_u16::<BigEndian>()? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(String::from_utf8(buf)?)
}

fn write_name(w: &mut impl Write, name: &str) -> Result<(), NbtError> {
    if name.len() > u16::MAX as usize {
        return Err(NbtError::ValueConstraint(format!(
            "tag name of {} bytes exceeds the 65535 byte limit",
            name.len()
        )));
    }
    w.write_u16::<BigEndian>(name.len() as u16)?;
    w.write_all(name.as_bytes())?;
    Ok(())
}

/// Reads a top-level named `Compound` from `r`: a single `(u8 id, name, payload)` where `id`
/// must be `ID_COMPOUND`. Returns the tag's name alongside the decoded compound.
pub fn read_compound(r: &mut impl Read) -> Result<(String, NbtCompound), NbtError> {
    let id = r.read_u8()?;
    if id != ID_COMPOUND {
        return Err(NbtError::MalformedData(format!(
            "expected a top-level Compound (id {}), found id {}",
            ID_COMPOUND, id
        )));
    }
    let name = read_name(r)?;
    let compound = read_compound_payload(r, 0)?;
    Ok((name, compound))
}

/// Writes a top-level named `Compound` to `w`: the `ID_COMPOUND` byte, the name, then the
/// compound's payload (terminated by a single, unnamed `0x00` byte).
pub fn write_compound(w: &mut impl Write, name: &str, compound: &NbtCompound) -> Result<(), NbtError> {
    w.write_u8(ID_COMPOUND)?;
    write_name(w, name)?;
    write_compound_payload(w, compound)
}

fn read_compound_payload(r: &mut impl Read, depth: usize) -> Result<NbtCompound, NbtError> {
    if depth >= MAX_NBT_DEPTH {
        return Err(too_deep());
    }
    let mut compound = NbtCompound::new();
    loop {
        let id = r.read_u8()?;
        if id == ID_END {
            break;
        }
        let name = read_name(r)?;
        let tag = read_tag_payload(id, r, depth + 1)?;
        // `add` would reject a duplicate name; the wire format permits it only because a
        // malicious/foreign encoder wrote it, so the last one wins rather than erroring the
        // whole decode, matching how the original implementation's `add(replace=True)` is used
        // internally during decode of already-written files.
        compound.add(name, tag, true).expect("validate() only rejects oversized payloads already bounded by the stream length");
    }
    Ok(compound)
}

fn write_compound_payload(w: &mut impl Write, compound: &NbtCompound) -> Result<(), NbtError> {
    for (name, tag) in compound.iter() {
        w.write_u8(tag.id())?;
        write_name(w, name)?;
        write_tag_payload(w, tag)?;
    }
    w.write_u8(ID_END)?;
    Ok(())
}

fn read_tag_payload(id: u8, r: &mut impl Read, depth: usize) -> Result<NbtTag, NbtError> {
    match id {
        ID_BYTE => Ok(NbtTag::Byte(r.read_i8()?)),
        ID_SHORT => Ok(NbtTag::Short(r.read_i16::<BigEndian>()?)),
        ID_INT => Ok(NbtTag::Int(r.read_i32::<BigEndian>()?)),
        ID_LONG => Ok(NbtTag::Long(r.read_i64::<BigEndian>()?)),
        ID_FLOAT => Ok(NbtTag::Float(r.read_f32::<BigEndian>()?)),
        ID_DOUBLE => Ok(NbtTag::Double(r.read_f64::<BigEndian>()?)),
        ID_BYTE_ARRAY => {
            let len = read_array_len(r)?;
            let mut buf = vec![0i8; len];
            for slot in buf.iter_mut() {
                *slot = r.read_i8()?;
            }
            Ok(NbtTag::ByteArray(buf))
        }
        ID_STRING => Ok(NbtTag::String(read_name(r)?)),
        ID_LIST => Ok(NbtTag::List(read_list_payload(r, depth)?)),
        ID_COMPOUND => Ok(NbtTag::Compound(read_compound_payload(r, depth)?)),
        ID_INT_ARRAY => {
            let len = read_array_len(r)?;
            let mut buf = Vec::with_capacity(len);
            for _ in 0..len {
                buf.push(r.read_i32::<BigEndian>()?);
            }
            Ok(NbtTag::IntArray(buf))
        }
        ID_LONG_ARRAY => {
            let len = read_array_len(r)?;
            let mut buf = Vec::with_capacity(len);
            for _ in 0..len {
                buf.push(r.read_i64::<BigEndian>()?);
            }
            Ok(NbtTag::LongArray(buf))
        }
        other => Err(NbtError::MalformedData(format!("unknown tag type id {}", other))),
    }
}

fn read_array_len(r: &mut impl Read) -> Result<usize, NbtError> {
    let len = r.read_i32::<BigEndian>()?;
    if len < 0 {
        return Err(NbtError::MalformedData(format!("negative array length {}", len)));
    }
    Ok(len as usize)
}

fn read_list_payload(r: &mut impl Read, depth: usize) -> Result<NbtList, NbtError> {
    if depth >= MAX_NBT_DEPTH {
        return Err(too_deep());
    }
    let element_id = r.read_u8()?;
    let len = read_array_len(r)?;
    if element_id == ID_END && len != 0 {
        return Err(NbtError::MalformedData(format!(
            "List declared element type End (0) but length {}",
            len
        )));
    }
    let mut list = NbtList::with_element_type(element_id);
    for _ in 0..len {
        let tag = read_tag_payload(element_id, r, depth + 1)?;
        list.append(tag).expect("element type was just fixed from the stream and matches by construction");
    }
    Ok(list)
}

fn write_tag_payload(w: &mut impl Write, tag: &NbtTag) -> Result<(), NbtError> {
    match tag {
        NbtTag::Byte(v) => w.write_i8(*v)?,
        NbtTag::Short(v) => w.write_i16::<BigEndian>(*v)?,
        NbtTag::Int(v) => w.write_i32::<BigEndian>(*v)?,
        NbtTag::Long(v) => w.write_i64::<BigEndian>(*v)?,
        NbtTag::Float(v) => w.write_f32::<BigEndian>(*v)?,
        NbtTag::Double(v) => w.write_f64::<BigEndian>(*v)?,
        NbtTag::ByteArray(v) => {
            w.write_i32::<BigEndian>(v.len() as i32)?;
            for b in v {
                w.write_i8(*b)?;
            }
        }
        NbtTag::String(s) => write_name(w, s)?,
        NbtTag::List(list) => write_list_payload(w, list)?,
        NbtTag::Compound(c) => write_compound_payload(w, c)?,
        NbtTag::IntArray(v) => {
            w.write_i32::<BigEndian>(v.len() as i32)?;
            for i in v {
                w.write_i32::<BigEndian>(*i)?;
            }
        }
        NbtTag::LongArray(v) => {
            w.write_i32::<BigEndian>(v.len() as i32)?;
            for l in v {
                w.write_i64::<BigEndian>(*l)?;
            }
        }
    }
    Ok(())
}

fn write_list_payload(w: &mut impl Write, list: &NbtList) -> Result<(), NbtError> {
    w.write_u8(list.element_id())?;
    w.write_i32::<BigEndian>(list.len() as i32)?;
    for tag in list.iter() {
        write_tag_payload(w, tag)?;
    }
    Ok(())
}

/// Convenience: encode `compound` (named `name`) into a freshly allocated byte vector.
pub fn to_bytes(name: &str, compound: &NbtCompound) -> Result<Vec<u8>, NbtError> {
    let mut buf = Vec::new();
    write_compound(&mut buf, name, compound)?;
    Ok(buf)
}

/// Convenience: decode a named top-level `Compound` from a byte slice.
pub fn from_bytes(bytes: &[u8]) -> Result<(String, NbtCompound), NbtError> {
    let mut cursor = io::Cursor::new(bytes);
    read_compound(&mut cursor)
}
