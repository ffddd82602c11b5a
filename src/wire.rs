//! Big-endian binary primitives shared by the worldvault file formats.
//!
//! All container formats (objects, region storage, the NBT codec) are
//! big-endian, matching the game's own wire format.

use crate::error::{Result, StoreError};
use std::io::{Read, Write};

pub fn read_u8(r: &mut impl Read) -> Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn read_i8(r: &mut impl Read) -> Result<i8> {
    Ok(read_u8(r)? as i8)
}

pub fn read_u16(r: &mut impl Read) -> Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

pub fn read_i16(r: &mut impl Read) -> Result<i16> {
    Ok(read_u16(r)? as i16)
}

pub fn read_u32(r: &mut impl Read) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

pub fn read_i32(r: &mut impl Read) -> Result<i32> {
    Ok(read_u32(r)? as i32)
}

pub fn read_u64(r: &mut impl Read) -> Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

pub fn read_i64(r: &mut impl Read) -> Result<i64> {
    Ok(read_u64(r)? as i64)
}

pub fn read_f32(r: &mut impl Read) -> Result<f32> {
    Ok(f32::from_bits(read_u32(r)?))
}

pub fn read_f64(r: &mut impl Read) -> Result<f64> {
    Ok(f64::from_bits(read_u64(r)?))
}

pub fn read_bool(r: &mut impl Read) -> Result<bool> {
    Ok(read_u8(r)? != 0)
}

pub fn read_bytes(r: &mut impl Read, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// Read a length-prefixed (u16) UTF-8 string.
pub fn read_string(r: &mut impl Read) -> Result<String> {
    let len = read_u16(r)? as usize;
    let bytes = read_bytes(r, len)?;
    String::from_utf8(bytes)
        .map_err(|e| StoreError::InvalidFormat(format!("invalid UTF-8 string: {e}")))
}

pub fn write_u8(w: &mut impl Write, value: u8) -> Result<()> {
    w.write_all(&[value])?;
    Ok(())
}

pub fn write_i8(w: &mut impl Write, value: i8) -> Result<()> {
    write_u8(w, value as u8)
}

pub fn write_u16(w: &mut impl Write, value: u16) -> Result<()> {
    w.write_all(&value.to_be_bytes())?;
    Ok(())
}

pub fn write_i16(w: &mut impl Write, value: i16) -> Result<()> {
    write_u16(w, value as u16)
}

pub fn write_u32(w: &mut impl Write, value: u32) -> Result<()> {
    w.write_all(&value.to_be_bytes())?;
    Ok(())
}

pub fn write_i32(w: &mut impl Write, value: i32) -> Result<()> {
    write_u32(w, value as u32)
}

pub fn write_u64(w: &mut impl Write, value: u64) -> Result<()> {
    w.write_all(&value.to_be_bytes())?;
    Ok(())
}

pub fn write_i64(w: &mut impl Write, value: i64) -> Result<()> {
    write_u64(w, value as u64)
}

pub fn write_f32(w: &mut impl Write, value: f32) -> Result<()> {
    write_u32(w, value.to_bits())
}

pub fn write_f64(w: &mut impl Write, value: f64) -> Result<()> {
    write_u64(w, value.to_bits())
}

pub fn write_bool(w: &mut impl Write, value: bool) -> Result<()> {
    write_u8(w, value as u8)
}

/// Write a length-prefixed (u16) UTF-8 string.
pub fn write_string(w: &mut impl Write, value: &str) -> Result<()> {
    let bytes = value.as_bytes();
    if bytes.len() > u16::MAX as usize {
        return Err(StoreError::InvalidArgument(format!(
            "string of {} bytes exceeds the u16 length prefix",
            bytes.len()
        )));
    }
    write_u16(w, bytes.len() as u16)?;
    w.write_all(bytes)?;
    Ok(())
}

/// Read a 4-byte magic number and fail if it does not match.
pub fn expect_magic(r: &mut impl Read, expected: u32) -> Result<()> {
    let found = read_u32(r)?;
    if found != expected {
        return Err(StoreError::InvalidFormat(format!(
            "expected magic {expected:#010x} but found {found:#010x}, is the file corrupted?"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_roundtrip() {
        let mut buf = Vec::new();
        write_i32(&mut buf, -42).unwrap();
        write_i64(&mut buf, i64::MIN).unwrap();
        write_f64(&mut buf, 1.5).unwrap();
        write_string(&mut buf, "level.dat").unwrap();
        write_bool(&mut buf, true).unwrap();

        let mut r = buf.as_slice();
        assert_eq!(read_i32(&mut r).unwrap(), -42);
        assert_eq!(read_i64(&mut r).unwrap(), i64::MIN);
        assert_eq!(read_f64(&mut r).unwrap(), 1.5);
        assert_eq!(read_string(&mut r).unwrap(), "level.dat");
        assert!(read_bool(&mut r).unwrap());
    }

    #[test]
    fn magic_mismatch_is_a_format_error() {
        let mut buf = Vec::new();
        write_u32(&mut buf, 0xDEADBEEF).unwrap();
        let err = expect_magic(&mut buf.as_slice(), 0x77764262).unwrap_err();
        assert!(matches!(err, crate::error::StoreError::InvalidFormat(_)));
    }
}
