use crate::exception::ExceptionCode;
use crate::types::BlockKind;

/// Errors that occur while decoding a PDU
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The function code is not in the table of supported requests
    UnknownFunction(u8),
    /// The PDU is shorter than the message type requires
    Truncated,
    /// The PDU contains extra bytes after a complete message
    TrailingBytes(usize),
    /// The byte count field does not match the size implied by the quantity
    ByteCountMismatch(usize, usize), // expected / actual
    /// A coil value other than 0xFF00 or 0x0000
    UnknownCoilState(u16),
}

impl DecodeError {
    /// Exception code reported to the client when a request fails to decode
    pub(crate) fn exception(self) -> ExceptionCode {
        match self {
            DecodeError::UnknownFunction(_)
            | DecodeError::Truncated
            | DecodeError::TrailingBytes(_) => ExceptionCode::IllegalFunction,
            DecodeError::ByteCountMismatch(_, _) | DecodeError::UnknownCoilState(_) => {
                ExceptionCode::IllegalDataValue
            }
        }
    }
}

impl std::error::Error for DecodeError {}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DecodeError::UnknownFunction(value) => {
                write!(f, "unknown function code: {value:#04X}")
            }
            DecodeError::Truncated => f.write_str("PDU is too short to be valid"),
            DecodeError::TrailingBytes(count) => {
                write!(f, "PDU contains {count} extra trailing bytes")
            }
            DecodeError::ByteCountMismatch(expected, actual) => write!(
                f,
                "byte count ({actual}) doesn't match the quantity of the request ({expected})"
            ),
            DecodeError::UnknownCoilState(value) => {
                write!(f, "received coil state with unspecified value: {value:#06X}")
            }
        }
    }
}

impl From<scursor::ReadError> for DecodeError {
    fn from(_: scursor::ReadError) -> Self {
        DecodeError::Truncated
    }
}

impl From<scursor::TrailingBytes> for DecodeError {
    fn from(x: scursor::TrailingBytes) -> Self {
        DecodeError::TrailingBytes(x.count.get())
    }
}

/// Errors that result from an invalid address range
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InvalidRange {
    /// Count of zero not allowed
    CountOfZero,
    /// Address + count overflows u16
    AddressOverflow(u16, u16),
    /// Count too large for the request type
    CountTooLargeForType(u16, u16), // count / max
}

impl std::error::Error for InvalidRange {}

impl std::fmt::Display for InvalidRange {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InvalidRange::CountOfZero => f.write_str("range contains count == 0"),
            InvalidRange::AddressOverflow(start, count) => write!(
                f,
                "start == {start} and count = {count} would overflow the representation of u16"
            ),
            InvalidRange::CountTooLargeForType(count, max) => write!(
                f,
                "the request count of {count} exceeds maximum allowed count of {max} for this type"
            ),
        }
    }
}

impl From<InvalidRange> for ExceptionCode {
    fn from(err: InvalidRange) -> Self {
        match err {
            InvalidRange::AddressOverflow(_, _) => ExceptionCode::IllegalDataAddress,
            InvalidRange::CountOfZero | InvalidRange::CountTooLargeForType(_, _) => {
                ExceptionCode::IllegalDataValue
            }
        }
    }
}

/// Errors that occur while parsing an MBAP header off a stream
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameParseError {
    /// Received TCP frame whose length field cannot hold a unit id and a function code
    MbapLengthTooSmall(usize),
    /// Received TCP frame with length that exceeds max allowed size
    MbapLengthTooBig(usize, usize), // actual size and the maximum size
    /// Received TCP frame within non-Modbus protocol id
    UnknownProtocolId(u16),
}

impl std::error::Error for FrameParseError {}

impl std::fmt::Display for FrameParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FrameParseError::MbapLengthTooSmall(size) => write!(
                f,
                "Received TCP frame with length ({size}) too small to contain a function code"
            ),
            FrameParseError::MbapLengthTooBig(size, max) => write!(
                f,
                "Received TCP frame with length ({size}) that exceeds max allowed size ({max})"
            ),
            FrameParseError::UnknownProtocolId(id) => {
                write!(f, "Received TCP frame with non-Modbus protocol id: {id}")
            }
        }
    }
}

/// Errors returned by a [`Datastore`](crate::datastore::Datastore) when a caller breaks its contract
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Bit access on a register block or register access on a bit block
    WrongBlockKind(BlockKind),
    /// An address in the range is not populated in the block
    Unpopulated(BlockKind, u16),
}

impl std::error::Error for StoreError {}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            StoreError::WrongBlockKind(block) => {
                write!(f, "operation does not match the value type of {block}")
            }
            StoreError::Unpopulated(block, address) => {
                write!(f, "address {address:#06X} is not populated in {block}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_and_unknown_function_map_to_illegal_function() {
        assert_eq!(
            DecodeError::UnknownFunction(0x42).exception(),
            ExceptionCode::IllegalFunction
        );
        assert_eq!(
            DecodeError::Truncated.exception(),
            ExceptionCode::IllegalFunction
        );
    }

    #[test]
    fn malformed_values_map_to_illegal_data_value() {
        assert_eq!(
            DecodeError::UnknownCoilState(0xABCD).exception(),
            ExceptionCode::IllegalDataValue
        );
        assert_eq!(
            DecodeError::ByteCountMismatch(1, 2).exception(),
            ExceptionCode::IllegalDataValue
        );
    }
}
