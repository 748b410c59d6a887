//! Bit-level stream primitives
//!
//! Bits are packed least-significant first into consecutive bytes. Every
//! reader operation is bounds checked and fails with an error instead of
//! panicking, so a truncated or corrupted datagram can never take down the
//! tick loop.

use crate::error::{Error, Result};
use glam::Vec2;
use skirmish_core::quantize::{DIRECTION_RESOLUTION, POSITION_LIMIT, RESOLUTION, VELOCITY_LIMIT};

/// Token written at section boundaries to detect writer/reader drift
pub const CHECKPOINT: u32 = 0xA5C3;
const CHECKPOINT_BITS: u8 = 16;

/// Maximum byte length of a string field
pub const MAX_STRING_LEN: usize = u8::MAX as usize;

/// Number of bits needed to store any value in `0..=range`
pub fn bits_required(range: u32) -> u8 {
    (u32::BITS - range.leading_zeros()) as u8
}

fn steps_for(min: f32, max: f32, resolution: f32) -> u32 {
    ((max - min) / resolution).round() as u32
}

/// Append-only bit writer
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits written so far
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Write the low `bits` bits of `value` (at most 32)
    pub fn write_bits(&mut self, value: u32, bits: u8) {
        debug_assert!(bits <= 32);
        for i in 0..bits {
            let offset = self.bit_len % 8;
            if offset == 0 {
                self.bytes.push(0);
            }
            if (value >> i) & 1 == 1 {
                if let Some(last) = self.bytes.last_mut() {
                    *last |= 1 << offset;
                }
            }
            self.bit_len += 1;
        }
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_bits(value as u32, 1);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write_bits(value as u32, 8);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_bits(value as u32, 16);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bits(value, 32);
    }

    pub fn write_u64(&mut self, value: u64) {
        self.write_bits(value as u32, 32);
        self.write_bits((value >> 32) as u32, 32);
    }

    /// Write `value` in `min..=max` using only as many bits as the range needs
    pub fn write_ranged(&mut self, field: &'static str, value: u32, min: u32, max: u32) -> Result<()> {
        if value < min || value > max {
            return Err(Error::InvalidValue {
                field,
                value: value as u64,
            });
        }
        self.write_bits(value - min, bits_required(max - min));
        Ok(())
    }

    /// Write `value` as a whole number of `resolution` steps above `min`
    ///
    /// Values outside `[min, max]` are clamped.
    pub fn write_quantized(&mut self, value: f32, min: f32, max: f32, resolution: f32) {
        let range = steps_for(min, max, resolution);
        let steps = ((value.clamp(min, max) - min) / resolution).round() as u32;
        self.write_bits(steps.min(range), bits_required(range));
    }

    /// Write a position or aim point on the shared grid
    pub fn write_position(&mut self, v: Vec2) {
        self.write_quantized(v.x, -POSITION_LIMIT, POSITION_LIMIT, RESOLUTION);
        self.write_quantized(v.y, -POSITION_LIMIT, POSITION_LIMIT, RESOLUTION);
    }

    /// Write a velocity on the shared grid
    pub fn write_velocity(&mut self, v: Vec2) {
        self.write_quantized(v.x, -VELOCITY_LIMIT, VELOCITY_LIMIT, RESOLUTION);
        self.write_quantized(v.y, -VELOCITY_LIMIT, VELOCITY_LIMIT, RESOLUTION);
    }

    /// Write a move direction on its grid
    pub fn write_direction(&mut self, v: Vec2) {
        self.write_quantized(v.x, -1.0, 1.0, DIRECTION_RESOLUTION);
        self.write_quantized(v.y, -1.0, 1.0, DIRECTION_RESOLUTION);
    }

    /// Write the raw bits of a float
    pub fn write_f32(&mut self, value: f32) {
        self.write_u32(value.to_bits());
    }

    /// Write a length-prefixed UTF-8 string
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        if bytes.len() > MAX_STRING_LEN {
            return Err(Error::StringTooLong(bytes.len()));
        }
        self.write_u8(bytes.len() as u8);
        for b in bytes {
            self.write_u8(*b);
        }
        Ok(())
    }

    /// Mark a section boundary
    pub fn write_checkpoint(&mut self) {
        self.write_bits(CHECKPOINT, CHECKPOINT_BITS);
    }

    /// Finish writing; trailing bits of the last byte are zero
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Bounds-checked bit reader over a byte slice
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Bits left to read, including padding in the last byte
    pub fn remaining_bits(&self) -> usize {
        self.bytes.len() * 8 - self.position
    }

    /// Read `bits` bits (at most 32)
    pub fn read_bits(&mut self, bits: u8) -> Result<u32> {
        if bits > 32 {
            return Err(Error::InvalidValue {
                field: "bit count",
                value: bits as u64,
            });
        }
        if (bits as usize) > self.remaining_bits() {
            return Err(Error::UnexpectedEnd);
        }
        let mut value = 0u32;
        for i in 0..bits {
            let byte = self.bytes[self.position / 8];
            if (byte >> (self.position % 8)) & 1 == 1 {
                value |= 1 << i;
            }
            self.position += 1;
        }
        Ok(value)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bits(8)? as u8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.read_bits(16)? as u16)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_bits(32)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let low = self.read_bits(32)? as u64;
        let high = self.read_bits(32)? as u64;
        Ok(low | (high << 32))
    }

    /// Read a value written by [`BitWriter::write_ranged`]
    pub fn read_ranged(&mut self, field: &'static str, min: u32, max: u32) -> Result<u32> {
        let offset = self.read_bits(bits_required(max - min))?;
        let value = min as u64 + offset as u64;
        if value > max as u64 {
            return Err(Error::InvalidValue { field, value });
        }
        Ok(value as u32)
    }

    /// Read a value written by [`BitWriter::write_quantized`]
    pub fn read_quantized(&mut self, min: f32, max: f32, resolution: f32) -> Result<f32> {
        let range = steps_for(min, max, resolution);
        let steps = self.read_bits(bits_required(range))?;
        if steps > range {
            return Err(Error::InvalidValue {
                field: "quantized float",
                value: steps as u64,
            });
        }
        Ok(min + steps as f32 * resolution)
    }

    pub fn read_position(&mut self) -> Result<Vec2> {
        let x = self.read_quantized(-POSITION_LIMIT, POSITION_LIMIT, RESOLUTION)?;
        let y = self.read_quantized(-POSITION_LIMIT, POSITION_LIMIT, RESOLUTION)?;
        Ok(Vec2::new(x, y))
    }

    pub fn read_velocity(&mut self) -> Result<Vec2> {
        let x = self.read_quantized(-VELOCITY_LIMIT, VELOCITY_LIMIT, RESOLUTION)?;
        let y = self.read_quantized(-VELOCITY_LIMIT, VELOCITY_LIMIT, RESOLUTION)?;
        Ok(Vec2::new(x, y))
    }

    pub fn read_direction(&mut self) -> Result<Vec2> {
        let x = self.read_quantized(-1.0, 1.0, DIRECTION_RESOLUTION)?;
        let y = self.read_quantized(-1.0, 1.0, DIRECTION_RESOLUTION)?;
        Ok(Vec2::new(x, y))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u8()? as usize;
        let mut bytes = Vec::with_capacity(len);
        for _ in 0..len {
            bytes.push(self.read_u8()?);
        }
        String::from_utf8(bytes).map_err(|_| Error::InvalidValue {
            field: "string",
            value: len as u64,
        })
    }

    /// Verify a section boundary written by [`BitWriter::write_checkpoint`]
    pub fn read_checkpoint(&mut self) -> Result<()> {
        let found = self.read_bits(CHECKPOINT_BITS)?;
        if found != CHECKPOINT {
            return Err(Error::Desync {
                expected: CHECKPOINT,
                found,
            });
        }
        Ok(())
    }
}
