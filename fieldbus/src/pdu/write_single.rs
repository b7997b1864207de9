use crate::common::traits::{write_u16_be, Parse, Serialize};
use crate::error::DecodeError;
use crate::types::{coil_from_u16, coil_to_u16};

use scursor::ReadCursor;

/// Write Single Coil request, echoed unchanged as the response
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteSingleCoil {
    /// address of the coil
    pub address: u16,
    /// value to write
    pub value: bool,
}

/// Write Single Register request, echoed unchanged as the response
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteSingleRegister {
    /// address of the register
    pub address: u16,
    /// value to write
    pub value: u16,
}

impl WriteSingleCoil {
    /// construct from its fields
    pub fn new(address: u16, value: bool) -> Self {
        Self { address, value }
    }
}

impl WriteSingleRegister {
    /// construct from its fields
    pub fn new(address: u16, value: u16) -> Self {
        Self { address, value }
    }
}

impl Serialize for WriteSingleCoil {
    fn serialize(&self, out: &mut Vec<u8>) {
        write_u16_be(out, self.address);
        write_u16_be(out, coil_to_u16(self.value));
    }
}

impl Parse for WriteSingleCoil {
    fn parse(cursor: &mut ReadCursor) -> Result<Self, DecodeError> {
        Ok(Self::new(
            cursor.read_u16_be()?,
            coil_from_u16(cursor.read_u16_be()?)?,
        ))
    }
}

impl Serialize for WriteSingleRegister {
    fn serialize(&self, out: &mut Vec<u8>) {
        write_u16_be(out, self.address);
        write_u16_be(out, self.value);
    }
}

impl Parse for WriteSingleRegister {
    fn parse(cursor: &mut ReadCursor) -> Result<Self, DecodeError> {
        Ok(Self::new(cursor.read_u16_be()?, cursor.read_u16_be()?))
    }
}

impl std::fmt::Display for WriteSingleCoil {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WriteCoilRequest({}) => {}", self.address, self.value)
    }
}

impl std::fmt::Display for WriteSingleRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WriteRegisterRequest({}) => {:#06X}", self.address, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coil_on_encodes_as_ff00() {
        assert_eq!(
            WriteSingleCoil::new(1, true).serialize_body(),
            vec![0x00, 0x01, 0xFF, 0x00]
        );
    }

    #[test]
    fn coil_off_encodes_as_0000() {
        assert_eq!(
            WriteSingleCoil::new(1, false).serialize_body(),
            vec![0x00, 0x01, 0x00, 0x00]
        );
    }

    #[test]
    fn parse_fails_for_unknown_coil_value() {
        let mut cursor = ReadCursor::new(&[0x00, 0x01, 0xAB, 0xCD]);
        assert_eq!(
            WriteSingleCoil::parse(&mut cursor),
            Err(DecodeError::UnknownCoilState(0xABCD))
        );
    }

    #[test]
    fn parse_succeeds_for_valid_coil_values() {
        let mut cursor = ReadCursor::new(&[0x00, 0x01, 0xFF, 0x00]);
        assert_eq!(
            WriteSingleCoil::parse(&mut cursor),
            Ok(WriteSingleCoil::new(1, true))
        );
        let mut cursor = ReadCursor::new(&[0x00, 0x01, 0x00, 0x00]);
        assert_eq!(
            WriteSingleCoil::parse(&mut cursor),
            Ok(WriteSingleCoil::new(1, false))
        );
    }

    #[test]
    fn parse_succeeds_for_valid_indexed_register() {
        let mut cursor = ReadCursor::new(&[0x00, 0x01, 0xCA, 0xFE]);
        assert_eq!(
            WriteSingleRegister::parse(&mut cursor),
            Ok(WriteSingleRegister::new(1, 0xCAFE))
        );
    }
}
