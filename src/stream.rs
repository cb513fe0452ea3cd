//! Byte-stream boundary used by format readers/writers to move field values in and out
//! of an [`Editable`](crate::editable::Editable).
//!
//! The layout engine itself never serializes; [`ByteStream`] is the contract consumers
//! implement, and [`MemoryStream`] is the in-memory implementation. Reads and writes
//! share one position. Writes overwrite in place and grow the buffer when they run
//! past its end.

use std::io::{self, Cursor};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{LayoutError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    Big,
    #[default]
    Little,
}

pub trait ByteStream {
    /// Reads an integer of `width` bits (8, 16, 32 or 64).
    fn read_scalar(&mut self, width: u32, signed: bool) -> Result<i128>;
    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>>;
    /// Reads UTF-8 text up to a NUL; the terminator is consumed but not returned.
    fn read_text(&mut self) -> Result<String>;
    fn write_scalar(&mut self, width: u32, signed: bool, value: i128) -> Result<()>;
    fn write_bytes(&mut self, data: &[u8]) -> Result<()>;
    /// Writes UTF-8 text, appending a NUL unless one is already present.
    fn write_text(&mut self, text: &str) -> Result<()>;
    /// Writes `fill` until the position is a multiple of `boundary`.
    fn align(&mut self, boundary: usize, fill: u8) -> Result<()>;
    fn contents(&self) -> &[u8];
    fn seek(&mut self, position: usize);
    fn position(&self) -> usize;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStream {
    buf: Vec<u8>,
    pos: usize,
    endianness: Endianness,
}

fn check_width(width: u32) -> Result<()> {
    match width {
        8 | 16 | 32 | 64 => Ok(()),
        _ => Err(LayoutError::InvalidScalarWidth(width)),
    }
}

fn out_of_range(width: u32, signed: bool, value: i128) -> LayoutError {
    LayoutError::Io(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!(
            "{} does not fit in {} {}-bit integer",
            value,
            if signed { "a signed" } else { "an unsigned" },
            width
        ),
    ))
}

impl MemoryStream {
    pub fn new(endianness: Endianness) -> Self {
        MemoryStream {
            buf: Vec::new(),
            pos: 0,
            endianness,
        }
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>, endianness: Endianness) -> Self {
        MemoryStream {
            buf: bytes.into(),
            pos: 0,
            endianness,
        }
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    fn remaining(&self) -> &[u8] {
        self.buf.get(self.pos..).unwrap_or(&[])
    }

    /// Overwrites bytes at the position, zero-filling any gap left by a seek past the end.
    fn put(&mut self, data: &[u8]) -> Result<()> {
        let end = self.pos.checked_add(data.len()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("writing {} byte(s) at position {} overflows", data.len(), self.pos),
            )
        })?;
        if data.is_empty() {
            return Ok(());
        }
        if self.buf.len() < end {
            self.buf
                .try_reserve(end - self.buf.len())
                .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;
            self.buf.resize(end, 0);
        }
        self.buf[self.pos..end].copy_from_slice(data);
        self.pos = end;
        Ok(())
    }

    fn read_unsigned(&self, r: &mut Cursor<&[u8]>, width: u32) -> io::Result<u64> {
        Ok(match (width, self.endianness) {
            (8, _) => r.read_u8()? as u64,
            (16, Endianness::Little) => r.read_u16::<LittleEndian>()? as u64,
            (16, Endianness::Big) => r.read_u16::<BigEndian>()? as u64,
            (32, Endianness::Little) => r.read_u32::<LittleEndian>()? as u64,
            (32, Endianness::Big) => r.read_u32::<BigEndian>()? as u64,
            (_, Endianness::Little) => r.read_u64::<LittleEndian>()?,
            (_, Endianness::Big) => r.read_u64::<BigEndian>()?,
        })
    }

    fn read_signed(&self, r: &mut Cursor<&[u8]>, width: u32) -> io::Result<i64> {
        Ok(match (width, self.endianness) {
            (8, _) => r.read_i8()? as i64,
            (16, Endianness::Little) => r.read_i16::<LittleEndian>()? as i64,
            (16, Endianness::Big) => r.read_i16::<BigEndian>()? as i64,
            (32, Endianness::Little) => r.read_i32::<LittleEndian>()? as i64,
            (32, Endianness::Big) => r.read_i32::<BigEndian>()? as i64,
            (_, Endianness::Little) => r.read_i64::<LittleEndian>()?,
            (_, Endianness::Big) => r.read_i64::<BigEndian>()?,
        })
    }

    fn encode(&self, width: u32, signed: bool, value: i128) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(width as usize / 8);
        let e = self.endianness;
        if signed {
            let v = i64::try_from(value).map_err(|_| out_of_range(width, signed, value))?;
            let fits = match width {
                8 => i8::try_from(v).is_ok(),
                16 => i16::try_from(v).is_ok(),
                32 => i32::try_from(v).is_ok(),
                _ => true,
            };
            if !fits {
                return Err(out_of_range(width, signed, value));
            }
            match (width, e) {
                (8, _) => out.write_i8(v as i8)?,
                (16, Endianness::Little) => out.write_i16::<LittleEndian>(v as i16)?,
                (16, Endianness::Big) => out.write_i16::<BigEndian>(v as i16)?,
                (32, Endianness::Little) => out.write_i32::<LittleEndian>(v as i32)?,
                (32, Endianness::Big) => out.write_i32::<BigEndian>(v as i32)?,
                (_, Endianness::Little) => out.write_i64::<LittleEndian>(v)?,
                (_, Endianness::Big) => out.write_i64::<BigEndian>(v)?,
            }
        } else {
            let v = u64::try_from(value).map_err(|_| out_of_range(width, signed, value))?;
            if width < 64 && v >> width != 0 {
                return Err(out_of_range(width, signed, value));
            }
            match (width, e) {
                (8, _) => out.write_u8(v as u8)?,
                (16, Endianness::Little) => out.write_u16::<LittleEndian>(v as u16)?,
                (16, Endianness::Big) => out.write_u16::<BigEndian>(v as u16)?,
                (32, Endianness::Little) => out.write_u32::<LittleEndian>(v as u32)?,
                (32, Endianness::Big) => out.write_u32::<BigEndian>(v as u32)?,
                (_, Endianness::Little) => out.write_u64::<LittleEndian>(v)?,
                (_, Endianness::Big) => out.write_u64::<BigEndian>(v)?,
            }
        }
        Ok(out)
    }
}

impl ByteStream for MemoryStream {
    fn read_scalar(&mut self, width: u32, signed: bool) -> Result<i128> {
        check_width(width)?;
        let mut r = Cursor::new(self.remaining());
        let value = if signed {
            self.read_signed(&mut r, width)? as i128
        } else {
            self.read_unsigned(&mut r, width)? as i128
        };
        self.pos += width as usize / 8;
        Ok(value)
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let remaining = self.remaining();
        if remaining.len() < len {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        let out = remaining[..len].to_vec();
        self.pos += len;
        Ok(out)
    }

    fn read_text(&mut self) -> Result<String> {
        let remaining = self.remaining();
        let end = remaining
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "unterminated text"))?;
        let text = String::from_utf8(remaining[..end].to_vec())?;
        self.pos += end + 1;
        Ok(text)
    }

    fn write_scalar(&mut self, width: u32, signed: bool, value: i128) -> Result<()> {
        check_width(width)?;
        let bytes = self.encode(width, signed, value)?;
        self.put(&bytes)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.put(data)
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        self.put(text.as_bytes())?;
        if !text.contains('\0') {
            self.put(&[0])?;
        }
        Ok(())
    }

    fn align(&mut self, boundary: usize, fill: u8) -> Result<()> {
        if boundary > 1 {
            let pad = (boundary - self.pos % boundary) % boundary;
            self.put(&vec![fill; pad])?;
        }
        Ok(())
    }

    fn contents(&self) -> &[u8] {
        &self.buf
    }

    fn seek(&mut self, position: usize) {
        self.pos = position;
    }

    fn position(&self) -> usize {
        self.pos
    }
}
