//! Little-endian field encoder and decoder

use crate::error::{Error, Result};
use crate::numeric::Numeric;

/// Append-only byte writer for serialized fields
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Sizes and indices are written as u64
    pub fn put_usize(&mut self, v: usize) {
        self.put_u64(v as u64);
    }

    pub fn put_value<T: Numeric>(&mut self, v: T) {
        v.write_le(&mut self.buf);
    }

    pub fn put_values<T: Numeric>(&mut self, values: &[T]) {
        self.buf.reserve(values.len() * T::FLOAT_TYPE.size());
        for &v in values {
            v.write_le(&mut self.buf);
        }
    }

    pub fn put_indices(&mut self, indices: &[usize]) {
        self.buf.reserve(indices.len() * 8);
        for &i in indices {
            self.put_usize(i);
        }
    }

    /// Length-prefixed UTF-8
    pub fn put_str(&mut self, s: &str) {
        self.put_usize(s.len());
        self.buf.extend_from_slice(s.as_bytes());
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over serialized fields
#[derive(Debug)]
pub struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::TruncatedStream {
                needed: n,
                available: self.remaining(),
            });
        }
        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn get_bool(&mut self) -> Result<bool> {
        match self.get_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::CorruptStream(format!("invalid flag byte {other}"))),
        }
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    pub fn get_u64(&mut self) -> Result<u64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(raw))
    }

    pub fn get_usize(&mut self) -> Result<usize> {
        let v = self.get_u64()?;
        usize::try_from(v).map_err(|_| Error::CorruptStream(format!("size {v} exceeds usize")))
    }

    pub fn get_value<T: Numeric>(&mut self) -> Result<T> {
        Ok(T::read_le(self.take(T::FLOAT_TYPE.size())?))
    }

    /// Read `n` values, checking the stream length before allocating
    pub fn get_values<T: Numeric>(&mut self, n: usize) -> Result<Vec<T>> {
        let width = T::FLOAT_TYPE.size();
        let bytes = self.take(Self::span(n, width)?)?;
        Ok(bytes.chunks_exact(width).map(T::read_le).collect())
    }

    pub fn get_indices(&mut self, n: usize) -> Result<Vec<usize>> {
        let bytes = self.take(Self::span(n, 8)?)?;
        bytes
            .chunks_exact(8)
            .map(|chunk| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                let v = u64::from_le_bytes(raw);
                usize::try_from(v)
                    .map_err(|_| Error::CorruptStream(format!("index {v} exceeds usize")))
            })
            .collect()
    }

    pub fn get_str(&mut self) -> Result<String> {
        let len = self.get_usize()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::CorruptStream(format!("invalid utf-8 name: {e}")))
    }

    fn span(n: usize, width: usize) -> Result<usize> {
        n.checked_mul(width)
            .ok_or_else(|| Error::CorruptStream(format!("element count {n} overflows")))
    }

    /// Fail with [`Error::CorruptStream`] if bytes are left over
    pub fn finish(self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(Error::CorruptStream(format!(
                "{} trailing bytes after position {}",
                self.remaining(),
                self.pos
            )));
        }
        Ok(())
    }
}
