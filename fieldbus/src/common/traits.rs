use crate::error::DecodeError;

use scursor::ReadCursor;

/// Serialization of a message body, i.e. everything that follows the function code
pub trait Serialize {
    /// append the encoded body to `out`
    fn serialize(&self, out: &mut Vec<u8>);

    /// encode the body into a fresh buffer
    fn serialize_body(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.serialize(&mut out);
        out
    }
}

pub(crate) trait Parse: Sized {
    fn parse(cursor: &mut ReadCursor) -> Result<Self, DecodeError>;
}

pub(crate) fn write_u16_be(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}
