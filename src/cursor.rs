//! Bounded cursor over a byte slice.
//!
//! The outer container is big-endian while the document dialect is mostly
//! little-endian, so endianness is chosen per call rather than per cursor.
//! Every read is checked against the slice bound and fails with
//! [`DecodeError::Truncated`] instead of panicking.

use crate::error::DecodeError;

/// Stateful reader over a borrowed byte slice.
#[derive(Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor { data, pos: 0 }
    }

    /// Current offset from the start of the slice.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left before the bound.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16_be(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_i16_be(&mut self) -> Result<i16, DecodeError> {
        let b = self.take(2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32_be(&mut self) -> Result<i32, DecodeError> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32_le(&mut self) -> Result<i32, DecodeError> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i64_le(&mut self) -> Result<i64, DecodeError> {
        let b = self.take(8)?;
        Ok(i64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn read_f64_le(&mut self) -> Result<f64, DecodeError> {
        let b = self.take(8)?;
        Ok(f64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        self.take(n)
    }

    /// NUL-terminated UTF-8 string; invalid sequences are replaced.
    pub fn read_cstring(&mut self) -> Result<String, DecodeError> {
        let start = self.pos;
        let end = self.data[start..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(DecodeError::UnterminatedString { offset: start })?;
        let s = String::from_utf8_lossy(&self.data[start..start + end]).into_owned();
        self.pos = start + end + 1;
        Ok(s)
    }

    /// Dialect string: i32 LE byte count (including the trailing NUL),
    /// then the bytes, then the NUL.
    pub fn read_string_i32_le(&mut self) -> Result<String, DecodeError> {
        let at = self.pos;
        let length = self.read_i32_le()?;
        if length < 1 {
            return Err(DecodeError::InvalidStringLength { length, offset: at });
        }
        let bytes = self.take(length as usize)?;
        if bytes[bytes.len() - 1] != 0 {
            return Err(DecodeError::UnterminatedString { offset: at });
        }
        Ok(String::from_utf8_lossy(&bytes[..bytes.len() - 1]).into_owned())
    }

    /// Section-payload string: u16 BE byte count, no terminator.
    pub fn read_string_u16_be(&mut self) -> Result<String, DecodeError> {
        let length = self.read_u16_be()? as usize;
        let bytes = self.take(length)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Move the position forward or backward within the bound.
    pub fn seek_relative(&mut self, delta: isize) -> Result<(), DecodeError> {
        let target = self.pos as isize + delta;
        if target < 0 || target as usize > self.data.len() {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: delta.unsigned_abs(),
                available: if delta < 0 {
                    self.pos
                } else {
                    self.remaining()
                },
            });
        }
        self.pos = target as usize;
        Ok(())
    }

    /// Split off a bounded view over the next `n` bytes, consuming them.
    pub fn sub_cursor(&mut self, n: usize) -> Result<ByteCursor<'a>, DecodeError> {
        Ok(ByteCursor::new(self.take(n)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_ints() {
        let mut cur = ByteCursor::new(&[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(cur.read_i32_le().unwrap(), 0x12345678);
        assert_eq!(cur.remaining(), 0);
    }

    #[test]
    fn reads_big_endian_ints() {
        let mut cur = ByteCursor::new(&[0x12, 0x34, 0x56, 0x78, 0xFF, 0xFE]);
        assert_eq!(cur.read_u32_be().unwrap(), 0x12345678);
        assert_eq!(cur.read_i16_be().unwrap(), -2);
    }

    #[test]
    fn reads_doubles() {
        let bytes = 3.14159f64.to_le_bytes();
        let mut cur = ByteCursor::new(&bytes);
        assert!((cur.read_f64_le().unwrap() - 3.14159).abs() < 1e-9);
    }

    #[test]
    fn cstring_stops_at_nul() {
        let mut cur = ByteCursor::new(b"hello\x00world");
        assert_eq!(cur.read_cstring().unwrap(), "hello");
        assert_eq!(cur.position(), 6);
    }

    #[test]
    fn unterminated_cstring_fails() {
        let mut cur = ByteCursor::new(b"hello");
        assert!(matches!(
            cur.read_cstring(),
            Err(DecodeError::UnterminatedString { offset: 0 })
        ));
    }

    #[test]
    fn dialect_string_includes_nul_in_length() {
        let mut data = 6i32.to_le_bytes().to_vec();
        data.extend_from_slice(b"hello\x00");
        let mut cur = ByteCursor::new(&data);
        assert_eq!(cur.read_string_i32_le().unwrap(), "hello");
    }

    #[test]
    fn read_past_end_reports_truncation() {
        let mut cur = ByteCursor::new(&[1, 2]);
        match cur.read_bytes(10) {
            Err(DecodeError::Truncated {
                offset,
                needed,
                available,
            }) => {
                assert_eq!((offset, needed, available), (0, 10, 2));
            }
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn sub_cursor_is_bounded() {
        let mut cur = ByteCursor::new(&[1, 2, 3, 4]);
        let mut sub = cur.sub_cursor(2).unwrap();
        assert_eq!(sub.read_u8().unwrap(), 1);
        assert_eq!(sub.read_u8().unwrap(), 2);
        assert!(sub.read_u8().is_err());
        assert_eq!(cur.position(), 2);
    }

    #[test]
    fn seek_relative_moves_both_ways() {
        let mut cur = ByteCursor::new(&[0; 8]);
        cur.seek_relative(5).unwrap();
        cur.seek_relative(-3).unwrap();
        assert_eq!(cur.position(), 2);
        assert!(cur.seek_relative(-4).is_err());
    }
}
