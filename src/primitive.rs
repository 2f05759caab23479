//! Fixed-width unsigned big-endian reads.
//!
//! Each read consumes exactly `width` bytes or fails; a short stream is
//! reported as [`PrimitiveError::Truncated`] and never yields a partial value.

use crate::ast::Width;
use crate::value::Value;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Read};

#[derive(Debug, thiserror::Error)]
pub enum PrimitiveError {
    #[error("stream ended before {} could be read ({} byte(s) needed)", .0.name(), .0.bytes())]
    Truncated(Width),
    #[error("IO: {0}")]
    Io(io::Error),
}

impl PrimitiveError {
    fn from_io(width: Width, e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            PrimitiveError::Truncated(width)
        } else {
            PrimitiveError::Io(e)
        }
    }
}

pub fn read_u8<R: Read + ?Sized>(r: &mut R) -> Result<u8, PrimitiveError> {
    r.read_u8().map_err(|e| PrimitiveError::from_io(Width::U8, e))
}

pub fn read_u16<R: Read + ?Sized>(r: &mut R) -> Result<u16, PrimitiveError> {
    r.read_u16::<BigEndian>()
        .map_err(|e| PrimitiveError::from_io(Width::U16, e))
}

pub fn read_u32<R: Read + ?Sized>(r: &mut R) -> Result<u32, PrimitiveError> {
    r.read_u32::<BigEndian>()
        .map_err(|e| PrimitiveError::from_io(Width::U32, e))
}

/// Read one primitive of the given width.
pub fn read<R: Read + ?Sized>(r: &mut R, width: Width) -> Result<Value, PrimitiveError> {
    Ok(match width {
        Width::U8 => Value::U8(read_u8(r)?),
        Width::U16 => Value::U16(read_u16(r)?),
        Width::U32 => Value::U32(read_u32(r)?),
    })
}
