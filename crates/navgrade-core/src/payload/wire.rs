//! Minimal protobuf wire-format reader.
//!
//! Only the four wire types used by proto3 messages are supported (varint,
//! 64-bit, length-delimited, 32-bit). Deprecated group encodings are
//! rejected.

use crate::domain::error::DecodeError;

/// One decoded field value, borrowing from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireValue<'a> {
    Varint(u64),
    Fixed64(u64),
    Bytes(&'a [u8]),
    Fixed32(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireField<'a> {
    pub number: u32,
    pub value: WireValue<'a>,
}

impl<'a> WireField<'a> {
    pub fn wire_type(&self) -> u8 {
        match self.value {
            WireValue::Varint(_) => 0,
            WireValue::Fixed64(_) => 1,
            WireValue::Bytes(_) => 2,
            WireValue::Fixed32(_) => 5,
        }
    }

    /// Error for a known field that arrived with the wrong wire type.
    pub fn unexpected(&self) -> DecodeError {
        DecodeError::UnsupportedWireType {
            field: self.number,
            wire_type: self.wire_type(),
        }
    }

    /// The field as a UTF-8 string (length-delimited only).
    pub fn as_str(&self) -> Result<Option<&'a str>, DecodeError> {
        match self.value {
            WireValue::Bytes(b) => std::str::from_utf8(b)
                .map(Some)
                .map_err(|_| DecodeError::InvalidUtf8 { field: self.number }),
            _ => Ok(None),
        }
    }
}

/// Iterator over the top-level fields of one message.
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            failed: false,
        }
    }

    fn read_field(&mut self) -> Result<WireField<'a>, DecodeError> {
        let key = read_varint(self.buf, &mut self.pos)?;
        let number = (key >> 3) as u32;
        let wire_type = (key & 0x7) as u8;
        let value = match wire_type {
            0 => WireValue::Varint(read_varint(self.buf, &mut self.pos)?),
            1 => WireValue::Fixed64(u64::from_le_bytes(self.take_array::<8>(number)?)),
            2 => {
                let len = read_varint(self.buf, &mut self.pos)? as usize;
                WireValue::Bytes(self.take(number, len)?)
            }
            5 => WireValue::Fixed32(u32::from_le_bytes(self.take_array::<4>(number)?)),
            other => {
                return Err(DecodeError::UnsupportedWireType {
                    field: number,
                    wire_type: other,
                })
            }
        };
        Ok(WireField { number, value })
    }

    fn take(&mut self, field: u32, len: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.buf.len() - self.pos;
        if len > remaining {
            return Err(DecodeError::TruncatedField {
                field,
                needed: len,
                remaining,
            });
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn take_array<const N: usize>(&mut self, field: u32) -> Result<[u8; N], DecodeError> {
        let bytes = self.take(field, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }
}

impl<'a> Iterator for WireReader<'a> {
    type Item = Result<WireField<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.buf.len() {
            return None;
        }
        let field = self.read_field();
        if field.is_err() {
            self.failed = true;
        }
        Some(field)
    }
}

/// Read a base-128 varint starting at `*pos`, advancing it.
pub fn read_varint(buf: &[u8], pos: &mut usize) -> Result<u64, DecodeError> {
    let start = *pos;
    let mut value = 0u64;
    for shift in (0..70).step_by(7) {
        let Some(&byte) = buf.get(*pos) else {
            return Err(DecodeError::TruncatedVarint { offset: start });
        };
        *pos += 1;
        value |= u64::from(byte & 0x7f) << shift.min(63);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(DecodeError::TruncatedVarint { offset: start })
}

/// Decode the body of a packed repeated varint field.
pub fn read_packed_varints(buf: &[u8]) -> Result<Vec<u64>, DecodeError> {
    let mut pos = 0;
    let mut out = Vec::new();
    while pos < buf.len() {
        out.push(read_varint(buf, &mut pos)?);
    }
    Ok(out)
}
