use crate::common::bits;
use crate::common::traits::{write_u16_be, Parse, Serialize};
use crate::constants::limits;
use crate::error::{DecodeError, InvalidRange};
use crate::types::AddressRange;

use scursor::ReadCursor;

/// Request body shared by Read Coils and Read Discrete Inputs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadBitsRequest {
    /// starting address
    pub address: u16,
    /// quantity of bits to read
    pub count: u16,
}

/// Response body shared by Read Coils and Read Discrete Inputs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadBitsResponse {
    /// values in ascending address order
    pub bits: Vec<bool>,
}

impl ReadBitsRequest {
    /// construct a request from its fields
    pub fn new(address: u16, count: u16) -> Self {
        Self { address, count }
    }

    /// the requested addresses as a validated range of at most 2000 bits
    pub fn range(&self) -> Result<AddressRange, InvalidRange> {
        AddressRange::try_from_limited(self.address, self.count, limits::MAX_READ_COILS_COUNT)
    }
}

impl Serialize for ReadBitsRequest {
    fn serialize(&self, out: &mut Vec<u8>) {
        write_u16_be(out, self.address);
        write_u16_be(out, self.count);
    }
}

impl Parse for ReadBitsRequest {
    fn parse(cursor: &mut ReadCursor) -> Result<Self, DecodeError> {
        Ok(Self::new(cursor.read_u16_be()?, cursor.read_u16_be()?))
    }
}

impl std::fmt::Display for ReadBitsRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReadBitRequest({},{})", self.address, self.count)
    }
}

impl ReadBitsResponse {
    /// construct a response from the values that were read
    pub fn new(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    /// value of the bit at `index`, false if the index is past the end
    pub fn get_bit(&self, index: usize) -> bool {
        self.bits.get(index).copied().unwrap_or(false)
    }

    /// set the bit at `index`, ignored if the index is past the end
    pub fn set_bit(&mut self, index: usize, value: bool) {
        if let Some(bit) = self.bits.get_mut(index) {
            *bit = value;
        }
    }

    /// clear the bit at `index`
    pub fn reset_bit(&mut self, index: usize) {
        self.set_bit(index, false)
    }
}

impl Serialize for ReadBitsResponse {
    fn serialize(&self, out: &mut Vec<u8>) {
        let packed = bits::pack(&self.bits);
        // the executor never builds a response above MAX_READ_COILS_COUNT, which fits in a u8
        out.push(u8::try_from(packed.len()).unwrap_or(u8::MAX));
        out.extend_from_slice(&packed);
    }
}

impl Parse for ReadBitsResponse {
    // the response does not carry the requested quantity, so pad bits are returned as well
    fn parse(cursor: &mut ReadCursor) -> Result<Self, DecodeError> {
        let byte_count = cursor.read_u8()? as usize;
        let bytes = cursor.read_bytes(byte_count)?;
        Ok(Self::new(bits::unpack(bytes, 8 * byte_count)))
    }
}

impl std::fmt::Display for ReadBitsResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReadBitResponse({})", self.bits.len())
    }
}
