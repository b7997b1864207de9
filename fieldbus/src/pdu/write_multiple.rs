use crate::common::bits;
use crate::common::traits::{write_u16_be, Parse, Serialize};
use crate::constants::limits;
use crate::error::{DecodeError, InvalidRange};
use crate::types::AddressRange;

use scursor::ReadCursor;

/// Write Multiple Coils request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteMultipleCoilsRequest {
    /// starting address
    pub address: u16,
    /// values to write in ascending address order
    pub values: Vec<bool>,
}

/// Write Multiple Registers request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteMultipleRegistersRequest {
    /// starting address
    pub address: u16,
    /// values to write in ascending address order
    pub values: Vec<u16>,
}

/// Response to both write multiple requests, the data itself is not echoed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteMultipleResponse {
    /// starting address
    pub address: u16,
    /// quantity of values written
    pub count: u16,
}

// values of a decoded request always fit because the quantity field is a u16
fn count_of(len: usize) -> u16 {
    u16::try_from(len).unwrap_or(u16::MAX)
}

fn read_byte_count(cursor: &mut ReadCursor, expected: usize) -> Result<usize, DecodeError> {
    let byte_count = cursor.read_u8()? as usize;
    if byte_count != expected {
        return Err(DecodeError::ByteCountMismatch(expected, byte_count));
    }
    Ok(byte_count)
}

impl WriteMultipleCoilsRequest {
    /// construct a request from its fields
    pub fn new(address: u16, values: Vec<bool>) -> Self {
        Self { address, values }
    }

    /// quantity of coils
    pub fn count(&self) -> u16 {
        count_of(self.values.len())
    }

    /// number of bytes holding the packed values
    pub fn byte_count(&self) -> usize {
        bits::num_bytes_for_bits(self.count())
    }

    /// the addresses written as a validated range of at most 1968 coils
    pub fn range(&self) -> Result<AddressRange, InvalidRange> {
        AddressRange::try_from_limited(self.address, self.count(), limits::MAX_WRITE_COILS_COUNT)
    }
}

impl Serialize for WriteMultipleCoilsRequest {
    fn serialize(&self, out: &mut Vec<u8>) {
        let packed = bits::pack(&self.values);
        write_u16_be(out, self.address);
        write_u16_be(out, self.count());
        out.push(u8::try_from(packed.len()).unwrap_or(u8::MAX));
        out.extend_from_slice(&packed);
    }
}

impl Parse for WriteMultipleCoilsRequest {
    fn parse(cursor: &mut ReadCursor) -> Result<Self, DecodeError> {
        let address = cursor.read_u16_be()?;
        let count = cursor.read_u16_be()?;
        let byte_count = read_byte_count(cursor, bits::num_bytes_for_bits(count))?;
        let bytes = cursor.read_bytes(byte_count)?;
        Ok(Self::new(address, bits::unpack(bytes, count as usize)))
    }
}

impl std::fmt::Display for WriteMultipleCoilsRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WriteMultipleCoilRequest ({}) => {}", self.address, self.count())
    }
}

impl WriteMultipleRegistersRequest {
    /// construct a request from its fields
    pub fn new(address: u16, values: Vec<u16>) -> Self {
        Self { address, values }
    }

    /// quantity of registers
    pub fn count(&self) -> u16 {
        count_of(self.values.len())
    }

    /// number of bytes holding the values
    pub fn byte_count(&self) -> usize {
        2 * self.values.len()
    }

    /// the addresses written as a validated range of at most 123 registers
    pub fn range(&self) -> Result<AddressRange, InvalidRange> {
        AddressRange::try_from_limited(
            self.address,
            self.count(),
            limits::MAX_WRITE_REGISTERS_COUNT,
        )
    }
}

impl Serialize for WriteMultipleRegistersRequest {
    fn serialize(&self, out: &mut Vec<u8>) {
        write_u16_be(out, self.address);
        write_u16_be(out, self.count());
        out.push(u8::try_from(self.byte_count()).unwrap_or(u8::MAX));
        for value in &self.values {
            write_u16_be(out, *value);
        }
    }
}

impl Parse for WriteMultipleRegistersRequest {
    fn parse(cursor: &mut ReadCursor) -> Result<Self, DecodeError> {
        let address = cursor.read_u16_be()?;
        let count = cursor.read_u16_be()?;
        read_byte_count(cursor, 2 * count as usize)?;
        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            values.push(cursor.read_u16_be()?);
        }
        Ok(Self::new(address, values))
    }
}

impl std::fmt::Display for WriteMultipleRegistersRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WriteMultipleRegisterRequest ({}) => {}", self.address, self.count())
    }
}

impl WriteMultipleResponse {
    /// construct a response from its fields
    pub fn new(address: u16, count: u16) -> Self {
        Self { address, count }
    }
}

impl Serialize for WriteMultipleResponse {
    fn serialize(&self, out: &mut Vec<u8>) {
        write_u16_be(out, self.address);
        write_u16_be(out, self.count);
    }
}

impl Parse for WriteMultipleResponse {
    fn parse(cursor: &mut ReadCursor) -> Result<Self, DecodeError> {
        Ok(Self::new(cursor.read_u16_be()?, cursor.read_u16_be()?))
    }
}
