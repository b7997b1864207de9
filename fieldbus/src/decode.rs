//! Logging levels for the protocol layers
//!
//! Each layer is decoded independently at the INFO level. A level includes
//! everything the levels before it show.

use std::str::FromStr;

/// Decode levels of the PDU, MBAP and physical layers
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodeLevel {
    /// decoding of requests and responses
    pub pdu: PduDecodeLevel,
    /// decoding of the MBAP header and payload
    pub adu: AduDecodeLevel,
    /// logging of the raw bytes read from and written to the socket
    pub physical: PhysDecodeLevel,
}

/// How requests and responses are logged
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum PduDecodeLevel {
    /// log nothing
    #[default]
    Nothing,
    /// function code
    FunctionCode,
    /// function code plus the addresses and quantities of the message
    DataHeaders,
    /// function code, addresses, quantities and every value
    DataValues,
}

/// How MBAP frames are logged
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum AduDecodeLevel {
    /// log nothing
    #[default]
    Nothing,
    /// transaction id, unit id and length
    Header,
    /// header plus the PDU as hexadecimal
    Payload,
}

/// How bytes crossing the socket are logged
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum PhysDecodeLevel {
    /// log nothing
    #[default]
    Nothing,
    /// number of bytes
    Length,
    /// number of bytes plus the bytes as hexadecimal
    Data,
}

impl DecodeLevel {
    /// construct a `DecodeLevel` with nothing enabled
    pub fn nothing() -> Self {
        Self::default()
    }

    /// construct a `DecodeLevel` from its fields
    pub fn new(pdu: PduDecodeLevel, adu: AduDecodeLevel, physical: PhysDecodeLevel) -> Self {
        DecodeLevel { pdu, adu, physical }
    }
}

impl From<PduDecodeLevel> for DecodeLevel {
    fn from(pdu: PduDecodeLevel) -> Self {
        Self {
            pdu,
            ..Self::default()
        }
    }
}

impl PduDecodeLevel {
    pub(crate) fn enabled(self) -> bool {
        self > Self::Nothing
    }

    pub(crate) fn data_headers(self) -> bool {
        self >= Self::DataHeaders
    }

    pub(crate) fn data_values(self) -> bool {
        self >= Self::DataValues
    }
}

impl AduDecodeLevel {
    pub(crate) fn enabled(self) -> bool {
        self > Self::Nothing
    }

    pub(crate) fn payload_enabled(self) -> bool {
        self >= Self::Payload
    }
}

impl PhysDecodeLevel {
    pub(crate) fn enabled(self) -> bool {
        self > Self::Nothing
    }

    pub(crate) fn data_enabled(self) -> bool {
        self >= Self::Data
    }
}

/// A decode level name that is not recognized
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownDecodeLevel(pub String);

impl std::error::Error for UnknownDecodeLevel {}

impl std::fmt::Display for UnknownDecodeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown decode level: {}", self.0)
    }
}

// levels are named in kebab-case, e.g. `data-headers`
macro_rules! named_levels {
    ($level:ident { $($variant:ident => $name:literal),* $(,)? }) => {
        impl $level {
            /// name of the level as accepted by `from_str`
            pub fn name(self) -> &'static str {
                match self {
                    $($level::$variant => $name,)*
                }
            }
        }

        impl FromStr for $level {
            type Err = UnknownDecodeLevel;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($level::$variant),)*
                    _ => Err(UnknownDecodeLevel(s.to_string())),
                }
            }
        }

        impl std::fmt::Display for $level {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

named_levels!(PduDecodeLevel {
    Nothing => "nothing",
    FunctionCode => "function-code",
    DataHeaders => "data-headers",
    DataValues => "data-values",
});

named_levels!(AduDecodeLevel {
    Nothing => "nothing",
    Header => "header",
    Payload => "payload",
});

named_levels!(PhysDecodeLevel {
    Nothing => "nothing",
    Length => "length",
    Data => "data",
});
