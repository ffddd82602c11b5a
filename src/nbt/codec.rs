//! Binary codec for the NBT wire format (big-endian).

use super::{Compound, Tag};
use crate::error::{Result, StoreError};
use crate::wire;
use std::io::{Read, Write};

const TAG_END: u8 = 0;
const TAG_COMPOUND: u8 = 10;

/// Read a root compound: a named compound tag with an (ignored) root name.
pub fn read_compound(r: &mut impl Read) -> Result<Compound> {
    let id = wire::read_u8(r)?;
    if id != TAG_COMPOUND {
        return Err(StoreError::InvalidFormat(format!(
            "expected a compound tag at the root, found tag id {id}"
        )));
    }
    // Root name, conventionally empty.
    wire::read_string(r)?;
    read_compound_payload(r)
}

/// Write a root compound with an empty root name.
pub fn write_compound(w: &mut impl Write, compound: &Compound) -> Result<()> {
    wire::write_u8(w, TAG_COMPOUND)?;
    wire::write_string(w, "")?;
    write_compound_payload(w, compound)
}

fn read_compound_payload(r: &mut impl Read) -> Result<Compound> {
    let mut compound = Compound::new();
    loop {
        let id = wire::read_u8(r)?;
        if id == TAG_END {
            return Ok(compound);
        }
        let name = wire::read_string(r)?;
        let tag = read_payload(r, id)?;
        compound.set(name, tag);
    }
}

fn write_compound_payload(w: &mut impl Write, compound: &Compound) -> Result<()> {
    for (name, tag) in compound.iter() {
        wire::write_u8(w, tag.id())?;
        wire::write_string(w, name)?;
        write_payload(w, tag)?;
    }
    wire::write_u8(w, TAG_END)
}

fn read_len(r: &mut impl Read) -> Result<usize> {
    let len = wire::read_i32(r)?;
    if len < 0 {
        return Err(StoreError::InvalidFormat(format!(
            "negative NBT length {len}"
        )));
    }
    Ok(len as usize)
}

fn read_payload(r: &mut impl Read, id: u8) -> Result<Tag> {
    Ok(match id {
        1 => Tag::Byte(wire::read_i8(r)?),
        2 => Tag::Short(wire::read_i16(r)?),
        3 => Tag::Int(wire::read_i32(r)?),
        4 => Tag::Long(wire::read_i64(r)?),
        5 => Tag::Float(wire::read_f32(r)?),
        6 => Tag::Double(wire::read_f64(r)?),
        7 => {
            let len = read_len(r)?;
            Tag::ByteArray(wire::read_bytes(r, len)?)
        }
        8 => Tag::String(wire::read_string(r)?),
        9 => {
            let element_id = wire::read_u8(r)?;
            let len = read_len(r)?;
            if element_id == TAG_END && len > 0 {
                return Err(StoreError::InvalidFormat(
                    "non-empty NBT list of element type end".into(),
                ));
            }
            let mut items = Vec::with_capacity(len.min(4096));
            for _ in 0..len {
                items.push(read_payload(r, element_id)?);
            }
            Tag::List(items)
        }
        10 => Tag::Compound(read_compound_payload(r)?),
        11 => {
            let len = read_len(r)?;
            let mut values = Vec::with_capacity(len.min(4096));
            for _ in 0..len {
                values.push(wire::read_i32(r)?);
            }
            Tag::IntArray(values)
        }
        12 => {
            let len = read_len(r)?;
            let mut values = Vec::with_capacity(len.min(4096));
            for _ in 0..len {
                values.push(wire::read_i64(r)?);
            }
            Tag::LongArray(values)
        }
        _ => {
            return Err(StoreError::InvalidFormat(format!(
                "unknown NBT tag id {id}"
            )))
        }
    })
}

fn write_payload(w: &mut impl Write, tag: &Tag) -> Result<()> {
    match tag {
        Tag::Byte(v) => wire::write_i8(w, *v)?,
        Tag::Short(v) => wire::write_i16(w, *v)?,
        Tag::Int(v) => wire::write_i32(w, *v)?,
        Tag::Long(v) => wire::write_i64(w, *v)?,
        Tag::Float(v) => wire::write_f32(w, *v)?,
        Tag::Double(v) => wire::write_f64(w, *v)?,
        Tag::ByteArray(v) => {
            wire::write_i32(w, v.len() as i32)?;
            w.write_all(v)?;
        }
        Tag::String(v) => wire::write_string(w, v)?,
        Tag::List(items) => {
            let element_id = items.first().map(Tag::id).unwrap_or(TAG_END);
            if let Some(odd) = items.iter().find(|item| item.id() != element_id) {
                return Err(StoreError::InvalidArgument(format!(
                    "heterogeneous NBT list: element type {} mixed with {}",
                    element_id,
                    odd.id()
                )));
            }
            wire::write_u8(w, element_id)?;
            wire::write_i32(w, items.len() as i32)?;
            for item in items {
                write_payload(w, item)?;
            }
        }
        Tag::Compound(v) => write_compound_payload(w, v)?,
        Tag::IntArray(v) => {
            wire::write_i32(w, v.len() as i32)?;
            for value in v {
                wire::write_i32(w, *value)?;
            }
        }
        Tag::LongArray(v) => {
            wire::write_i32(w, v.len() as i32)?;
            for value in v {
                wire::write_i64(w, *value)?;
            }
        }
    }
    Ok(())
}
