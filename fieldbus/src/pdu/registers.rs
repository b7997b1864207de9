use crate::common::traits::{write_u16_be, Parse, Serialize};
use crate::constants::limits;
use crate::error::{DecodeError, InvalidRange};
use crate::types::AddressRange;

use scursor::ReadCursor;

/// Request body shared by Read Holding Registers and Read Input Registers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadRegistersRequest {
    /// starting address
    pub address: u16,
    /// quantity of registers to read
    pub count: u16,
}

/// Response body shared by Read Holding Registers and Read Input Registers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadRegistersResponse {
    /// values in ascending address order
    pub values: Vec<u16>,
}

impl ReadRegistersRequest {
    /// construct a request from its fields
    pub fn new(address: u16, count: u16) -> Self {
        Self { address, count }
    }

    /// the requested addresses as a validated range of at most 125 registers
    pub fn range(&self) -> Result<AddressRange, InvalidRange> {
        AddressRange::try_from_limited(self.address, self.count, limits::MAX_READ_REGISTERS_COUNT)
    }
}

impl Serialize for ReadRegistersRequest {
    fn serialize(&self, out: &mut Vec<u8>) {
        write_u16_be(out, self.address);
        write_u16_be(out, self.count);
    }
}

impl Parse for ReadRegistersRequest {
    fn parse(cursor: &mut ReadCursor) -> Result<Self, DecodeError> {
        Ok(Self::new(cursor.read_u16_be()?, cursor.read_u16_be()?))
    }
}

impl ReadRegistersResponse {
    /// construct a response from the values that were read
    pub fn new(values: Vec<u16>) -> Self {
        Self { values }
    }
}

impl Serialize for ReadRegistersResponse {
    fn serialize(&self, out: &mut Vec<u8>) {
        // bounded by MAX_READ_REGISTERS_COUNT in the executor
        out.push(u8::try_from(2 * self.values.len()).unwrap_or(u8::MAX));
        for value in &self.values {
            write_u16_be(out, *value);
        }
    }
}

impl Parse for ReadRegistersResponse {
    fn parse(cursor: &mut ReadCursor) -> Result<Self, DecodeError> {
        let byte_count = cursor.read_u8()? as usize;
        if byte_count % 2 != 0 {
            return Err(DecodeError::ByteCountMismatch(byte_count + 1, byte_count));
        }
        let mut values = Vec::with_capacity(byte_count / 2);
        for _ in 0..byte_count / 2 {
            values.push(cursor.read_u16_be()?);
        }
        Ok(Self::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_registers_big_endian() {
        let response = ReadRegistersResponse::new(vec![0xCAFE, 0x0102]);
        assert_eq!(
            response.serialize_body(),
            vec![0x04, 0xCA, 0xFE, 0x01, 0x02]
        );
    }

    #[test]
    fn parses_registers() {
        let mut cursor = ReadCursor::new(&[0x04, 0xCA, 0xFE, 0xBB, 0xDD]);
        assert_eq!(
            ReadRegistersResponse::parse(&mut cursor),
            Ok(ReadRegistersResponse::new(vec![0xCAFE, 0xBBDD]))
        );
    }

    #[test]
    fn odd_byte_count_fails() {
        let mut cursor = ReadCursor::new(&[0x03, 0xCA, 0xFE, 0xBB]);
        assert_eq!(
            ReadRegistersResponse::parse(&mut cursor),
            Err(DecodeError::ByteCountMismatch(4, 3))
        );
    }

    #[test]
    fn range_is_limited_to_125_registers() {
        assert!(ReadRegistersRequest::new(0, 125).range().is_ok());
        assert_eq!(
            ReadRegistersRequest::new(0, 126).range(),
            Err(InvalidRange::CountTooLargeForType(126, 125))
        );
    }
}
