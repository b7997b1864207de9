use crate::constants::exceptions;

/// Reason carried by an exception response
///
/// The server only ever produces the first four codes. The rest are decoded
/// so that a response from any device can be displayed.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Ord, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum ExceptionCode {
    /// function code is not supported
    IllegalFunction,
    /// range in the request is not mapped in the addressed block
    IllegalDataAddress,
    /// quantity, byte count or value in the request is malformed
    IllegalDataValue,
    /// the datastore failed while servicing a valid request
    ServerDeviceFailure,
    /// long running request was accepted
    Acknowledge,
    /// device is busy with a long running request
    ServerDeviceBusy,
    /// file record read failed a consistency check
    MemoryParityError,
    /// gateway has no route to the target
    GatewayPathUnavailable,
    /// gateway target did not answer
    GatewayTargetDeviceFailedToRespond,
    /// any other value
    Unknown(u8),
}

// (code, value, message)
macro_rules! exception_table {
    ($($variant:ident => $value:path, $msg:literal;)*) => {
        impl From<u8> for ExceptionCode {
            fn from(value: u8) -> Self {
                match value {
                    $($value => ExceptionCode::$variant,)*
                    _ => ExceptionCode::Unknown(value),
                }
            }
        }

        impl From<ExceptionCode> for u8 {
            fn from(code: ExceptionCode) -> Self {
                match code {
                    $(ExceptionCode::$variant => $value,)*
                    ExceptionCode::Unknown(value) => value,
                }
            }
        }

        impl std::fmt::Display for ExceptionCode {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                match self {
                    $(ExceptionCode::$variant => f.write_str($msg),)*
                    ExceptionCode::Unknown(value) => write!(f, "non-standard exception ({value:#04X})"),
                }
            }
        }
    };
}

exception_table! {
    IllegalFunction => exceptions::ILLEGAL_FUNCTION, "illegal function";
    IllegalDataAddress => exceptions::ILLEGAL_DATA_ADDRESS, "illegal data address";
    IllegalDataValue => exceptions::ILLEGAL_DATA_VALUE, "illegal data value";
    ServerDeviceFailure => exceptions::SERVER_DEVICE_FAILURE, "server device failure";
    Acknowledge => exceptions::ACKNOWLEDGE, "acknowledge";
    ServerDeviceBusy => exceptions::SERVER_DEVICE_BUSY, "server device busy";
    MemoryParityError => exceptions::MEMORY_PARITY_ERROR, "memory parity error";
    GatewayPathUnavailable => exceptions::GATEWAY_PATH_UNAVAILABLE, "gateway path unavailable";
    GatewayTargetDeviceFailedToRespond => exceptions::GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND, "gateway target device failed to respond";
}

impl std::error::Error for ExceptionCode {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_codes_have_expected_values() {
        assert_eq!(u8::from(ExceptionCode::IllegalFunction), 1);
        assert_eq!(u8::from(ExceptionCode::IllegalDataAddress), 2);
        assert_eq!(u8::from(ExceptionCode::IllegalDataValue), 3);
        assert_eq!(u8::from(ExceptionCode::ServerDeviceFailure), 4);
    }

    #[test]
    fn converts_every_byte_back_to_the_same_value() {
        for value in 0..=u8::MAX {
            assert_eq!(u8::from(ExceptionCode::from(value)), value);
        }
    }

    #[test]
    fn undefined_codes_are_unknown() {
        assert_eq!(ExceptionCode::from(0x07), ExceptionCode::Unknown(0x07));
        assert_eq!(
            ExceptionCode::Unknown(0x07).to_string(),
            "non-standard exception (0x07)"
        );
        assert_eq!(
            ExceptionCode::IllegalDataAddress.to_string(),
            "illegal data address"
        );
    }
}
