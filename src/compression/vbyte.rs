use crate::core::error::{Error, Result};

/// Variable byte encoding for integers (best for small integers)
pub struct VByteEncoder;

impl VByteEncoder {
    /// Encode single u32 value
    /// Values < 128 use 1 byte, < 16384 use 2 bytes, etc.
    #[inline]
    pub fn encode_u32(output: &mut Vec<u8>, mut value: u32) {
        while value >= 128 {
            output.push((value & 127) as u8 | 128);  // Set continuation bit
            value >>= 7;
        }
        output.push(value as u8);  // Last byte without continuation bit
    }

    /// Encode array of u32 values
    pub fn encode_u32_list(nums: &[u32]) -> Vec<u8> {
        let mut output = Vec::with_capacity(nums.len());
        for &num in nums {
            Self::encode_u32(&mut output, num);
        }
        output
    }

    /// Encode ascending values as gaps from `base`.
    pub fn encode_deltas(output: &mut Vec<u8>, base: u32, sorted: &[u32]) {
        let mut prev = base;
        for &value in sorted {
            Self::encode_u32(output, value - prev);
            prev = value;
        }
    }

    /// Decode single u32 value, returns (value, bytes_consumed)
    #[inline]
    pub fn decode_u32(input: &[u8]) -> Result<(u32, usize)> {
        let mut value = 0u32;
        let mut shift = 0;
        let mut consumed = 0;

        for &byte in input {
            consumed += 1;
            value |= ((byte & 127) as u32) << shift;

            if byte & 128 == 0 {  // No continuation bit
                return Ok((value, consumed));
            }

            shift += 7;
            if shift > 28 {  // Max 5 bytes for u32
                return Err(Error::corrupted("VByte overflow"));
            }
        }

        Err(Error::corrupted("Incomplete VByte"))
    }

    /// Decode array of u32 values
    pub fn decode_u32_list(data: &[u8]) -> Result<Vec<u32>> {
        let mut nums = Vec::new();
        let mut pos = 0;

        while pos < data.len() {
            let (value, consumed) = Self::decode_u32(&data[pos..])?;
            nums.push(value);
            pos += consumed;
        }

        Ok(nums)
    }

    /// Decode `count` gaps starting after `base` into `out`, returning the
    /// bytes consumed. Fails on a gap that would overflow `u32`.
    pub fn decode_deltas(data: &[u8], base: u32, count: usize, out: &mut Vec<u32>) -> Result<usize> {
        let mut pos = 0;
        let mut prev = base;
        for _ in 0..count {
            let (gap, consumed) = Self::decode_u32(&data[pos.min(data.len())..])?;
            prev = prev
                .checked_add(gap)
                .ok_or_else(|| Error::corrupted("document number overflow in block"))?;
            out.push(prev);
            pos += consumed;
        }
        Ok(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_values_take_one_byte() {
        let mut out = Vec::new();
        VByteEncoder::encode_u32(&mut out, 127);
        assert_eq!(out, vec![127]);
        out.clear();
        VByteEncoder::encode_u32(&mut out, 128);
        assert_eq!(out, vec![0x80, 0x01]);
    }

    #[test]
    fn list_round_trip_with_large_values() {
        let nums = vec![0, 1, 300, 16_384, u32::MAX];
        let bytes = VByteEncoder::encode_u32_list(&nums);
        assert_eq!(VByteEncoder::decode_u32_list(&bytes).unwrap(), nums);
    }

    #[test]
    fn deltas_from_base() {
        let docs = [105, 110, 400, 100_000];
        let mut bytes = Vec::new();
        VByteEncoder::encode_deltas(&mut bytes, 100, &docs);
        let mut out = Vec::new();
        let used = VByteEncoder::decode_deltas(&bytes, 100, docs.len(), &mut out).unwrap();
        assert_eq!(used, bytes.len());
        assert_eq!(out, docs);
    }

    #[test]
    fn truncated_input_is_corruption() {
        let err = VByteEncoder::decode_u32(&[0x80, 0x80]).unwrap_err();
        assert_eq!(err.kind, crate::core::error::ErrorKind::Corrupted);
        let mut out = Vec::new();
        assert!(VByteEncoder::decode_deltas(&[1], 0, 2, &mut out).is_err());
    }
}
