use crate::common::traits::{Parse, Serialize};
use crate::error::DecodeError;
use crate::exception::ExceptionCode;

use scursor::ReadCursor;

/// Exception returned in place of a normal response
///
/// `function` is the function code of the request that failed. The high bit is
/// only set on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExceptionResponse {
    /// function code of the failed request
    pub function: u8,
    /// reason for the failure
    pub code: ExceptionCode,
}

impl ExceptionResponse {
    /// construct an exception for the request function code `function`
    pub fn new(function: u8, code: ExceptionCode) -> Self {
        Self {
            function: function & 0x7F,
            code,
        }
    }

    /// function code as it appears on the wire
    pub fn error_function(&self) -> u8 {
        self.function | 0x80
    }
}

impl Serialize for ExceptionResponse {
    fn serialize(&self, out: &mut Vec<u8>) {
        out.push(self.code.into());
    }
}

impl Parse for ExceptionCode {
    fn parse(cursor: &mut ReadCursor) -> Result<Self, DecodeError> {
        Ok(cursor.read_u8()?.into())
    }
}

impl std::fmt::Display for ExceptionResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ExceptionResponse({:#04X}) => {:?}",
            self.error_function(),
            self.code
        )
    }
}
