// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Payload transformer contract.
//!
//! A [`Wire`] implementation is the per-type codec between in-memory values
//! and wire bytes; `from_wire(to_wire(v)) == v` must hold for every
//! representable value. Scalars encode as fixed-width little-endian;
//! variable-size fields (strings, tuple members) are length-prefixed via
//! [`write_frame`]/[`read_frame`].

use crate::error::{Error, Result};

/// Media type of the built-in length-prefixed little-endian framing codec.
pub const FRAME_MEDIA_TYPE: &str = "application/x-driveline-frame";

/// Per-type codec between values and wire bytes.
pub trait Wire: Sized {
    /// Serialize into wire bytes.
    fn to_wire(&self) -> Result<Vec<u8>>;

    /// Deserialize from wire bytes.
    fn from_wire(bytes: &[u8]) -> Result<Self>;
}

/// Append one length-prefixed frame (u32 little-endian length + bytes).
pub fn write_frame(dst: &mut Vec<u8>, bytes: &[u8]) {
    dst.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    dst.extend_from_slice(bytes);
}

/// Read the frame at `*offset`, advancing the offset past it.
pub fn read_frame<'a>(src: &'a [u8], offset: &mut usize) -> Result<&'a [u8]> {
    let header_end = offset
        .checked_add(4)
        .filter(|end| *end <= src.len())
        .ok_or_else(|| Error::not_ok("Truncated frame header"))?;
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&src[*offset..header_end]);
    let len = u32::from_le_bytes(len_bytes) as usize;
    let end = header_end
        .checked_add(len)
        .filter(|end| *end <= src.len())
        .ok_or_else(|| Error::not_ok("Truncated frame payload"))?;
    *offset = end;
    Ok(&src[header_end..end])
}

macro_rules! scalar_wire {
    ($($ty:ty),*) => {
        $(
            impl Wire for $ty {
                fn to_wire(&self) -> Result<Vec<u8>> {
                    Ok(self.to_le_bytes().to_vec())
                }

                fn from_wire(bytes: &[u8]) -> Result<Self> {
                    let expected = core::mem::size_of::<$ty>();
                    if bytes.len() != expected {
                        return Err(Error::not_ok(format!(
                            "Expected {} payload bytes, got {}",
                            expected,
                            bytes.len()
                        )));
                    }
                    let mut buf = [0u8; core::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    Ok(<$ty>::from_le_bytes(buf))
                }
            }
        )*
    };
}

scalar_wire!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl Wire for bool {
    fn to_wire(&self) -> Result<Vec<u8>> {
        Ok(vec![u8::from(*self)])
    }

    fn from_wire(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [0] => Ok(false),
            [1] => Ok(true),
            _ => Err(Error::not_ok("Invalid bool payload")),
        }
    }
}

impl Wire for String {
    fn to_wire(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(4 + self.len());
        write_frame(&mut out, self.as_bytes());
        Ok(out)
    }

    fn from_wire(bytes: &[u8]) -> Result<Self> {
        let mut offset = 0;
        let frame = read_frame(bytes, &mut offset)?;
        String::from_utf8(frame.to_vec()).map_err(|_| Error::not_ok("Invalid UTF-8 payload"))
    }
}

impl Wire for () {
    fn to_wire(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn from_wire(_bytes: &[u8]) -> Result<Self> {
        Ok(())
    }
}

impl<A: Wire, B: Wire> Wire for (A, B) {
    fn to_wire(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        write_frame(&mut out, &self.0.to_wire()?);
        write_frame(&mut out, &self.1.to_wire()?);
        Ok(out)
    }

    fn from_wire(bytes: &[u8]) -> Result<Self> {
        let mut offset = 0;
        let a = A::from_wire(read_frame(bytes, &mut offset)?)?;
        let b = B::from_wire(read_frame(bytes, &mut offset)?)?;
        Ok((a, b))
    }
}
