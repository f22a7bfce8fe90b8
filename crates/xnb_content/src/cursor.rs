//! Forward-only byte cursors used by the readers and writers.
//!

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::Write;

use crate::error::{Error, Result};

/// Sequential read cursor over an immutable buffer
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Start reading at the beginning of `buffer`
    pub fn new(buffer: &'a [u8]) -> Self {
        ByteReader {
            buffer,
            position: 0,
        }
    }

    /// Number of bytes consumed so far
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of bytes left to consume
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    /// Whether every byte has been consumed
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take the next `amount` bytes and advance past them.
    pub fn consume(&mut self, amount: usize) -> Result<&'a [u8]> {
        if amount > self.remaining() {
            return Err(Error::TruncatedInput {
                requested: amount,
                remaining: self.remaining(),
                position: self.position,
            });
        }

        let slice = &self.buffer[self.position..self.position + amount];
        self.position += amount;
        Ok(slice)
    }

    /// Take everything that is left.
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.buffer[self.position..];
        self.position = self.buffer.len();
        slice
    }

    pub fn consume_u8(&mut self) -> Result<u8> {
        Ok(self.consume(1)?[0])
    }

    pub fn consume_i32_le(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.consume(4)?))
    }

    pub fn consume_u32_le(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.consume(4)?))
    }

    /// Read a 7-bit encoded number.
    ///
    /// Each group is shifted as a 32-bit integer (shift amount modulo 32) and
    /// summed rather than or-ed into the result. Files in the wild were written
    /// against this arithmetic, so groups past the fifth alias onto the low
    /// bits instead of being rejected.
    pub fn consume_varint(&mut self) -> Result<i64> {
        let mut number = 0i64;
        let mut bits_read = 0u32;

        loop {
            let byte = self.consume_u8()?;
            number = number.wrapping_add(i64::from(i32::from(byte & 0x7F).wrapping_shl(bits_read)));
            bits_read = bits_read.wrapping_add(7);

            if byte & 0x80 == 0 {
                return Ok(number);
            }
        }
    }

    /// Read a 7-bit encoded number that must be usable as a length or index.
    pub fn consume_length(&mut self) -> Result<usize> {
        let number = self.consume_varint()?;
        usize::try_from(number).map_err(|_| Error::InvalidLength(number))
    }
}

/// Append-only output buffer
#[derive(Debug, Clone, Default)]
pub struct ByteWriter {
    buffer: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn concat(&mut self, bytes: &[u8]) -> Result<()> {
        self.buffer.write_all(bytes)?;
        Ok(())
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.buffer.write_u8(byte)?;
        Ok(())
    }

    pub fn write_i32_le(&mut self, number: i32) -> Result<()> {
        self.buffer.write_i32::<LittleEndian>(number)?;
        Ok(())
    }

    pub fn write_u32_le(&mut self, number: u32) -> Result<()> {
        self.buffer.write_u32::<LittleEndian>(number)?;
        Ok(())
    }

    /// Write a number as 7-bit groups, low to high, with the continuation bit
    /// set on every group but the last.
    pub fn write_varint(&mut self, mut number: u32) -> Result<()> {
        loop {
            let mut byte = (number & 0x7F) as u8;
            number >>= 7;
            if number != 0 {
                byte |= 0x80;
            }
            self.write_byte(byte)?;

            if number == 0 {
                return Ok(());
            }
        }
    }

    /// Write a length or index as a 7-bit encoded number.
    pub fn write_length(&mut self, length: usize) -> Result<()> {
        let number = u32::try_from(length).map_err(|_| Error::InvalidLength(length as i64))?;
        self.write_varint(number)
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}
