use crate::common::function::FunctionCode;
use crate::common::traits::{Parse, Serialize};
use crate::decode::PduDecodeLevel;
use crate::error::DecodeError;
use crate::exception::ExceptionCode;
use crate::types::Indexed;

use scursor::ReadCursor;

mod exception;
mod read_bits;
mod registers;
mod write_multiple;
mod write_single;

pub use exception::*;
pub use read_bits::*;
pub use registers::*;
pub use write_multiple::*;
pub use write_single::*;

/// A decoded request PDU
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    /// Read Coils (0x01)
    ReadCoils(ReadBitsRequest),
    /// Read Discrete Inputs (0x02)
    ReadDiscreteInputs(ReadBitsRequest),
    /// Read Holding Registers (0x03)
    ReadHoldingRegisters(ReadRegistersRequest),
    /// Read Input Registers (0x04)
    ReadInputRegisters(ReadRegistersRequest),
    /// Write Single Coil (0x05)
    WriteSingleCoil(WriteSingleCoil),
    /// Write Single Register (0x06)
    WriteSingleRegister(WriteSingleRegister),
    /// Write Multiple Coils (0x0F)
    WriteMultipleCoils(WriteMultipleCoilsRequest),
    /// Write Multiple Registers (0x10)
    WriteMultipleRegisters(WriteMultipleRegistersRequest),
}

/// A response PDU, either the normal reply to a request or an exception
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// Read Coils (0x01)
    ReadCoils(ReadBitsResponse),
    /// Read Discrete Inputs (0x02)
    ReadDiscreteInputs(ReadBitsResponse),
    /// Read Holding Registers (0x03)
    ReadHoldingRegisters(ReadRegistersResponse),
    /// Read Input Registers (0x04)
    ReadInputRegisters(ReadRegistersResponse),
    /// Write Single Coil (0x05), echo of the request
    WriteSingleCoil(WriteSingleCoil),
    /// Write Single Register (0x06), echo of the request
    WriteSingleRegister(WriteSingleRegister),
    /// Write Multiple Coils (0x0F)
    WriteMultipleCoils(WriteMultipleResponse),
    /// Write Multiple Registers (0x10)
    WriteMultipleRegisters(WriteMultipleResponse),
    /// Exception response (function code | 0x80)
    Exception(ExceptionResponse),
}

/// Decode a request PDU, the first byte of `payload` being the function code
pub fn decode_request(payload: &[u8]) -> Result<Request, DecodeError> {
    Request::decode(payload)
}

impl Request {
    /// function code of the request
    pub fn function(&self) -> FunctionCode {
        match self {
            Request::ReadCoils(_) => FunctionCode::ReadCoils,
            Request::ReadDiscreteInputs(_) => FunctionCode::ReadDiscreteInputs,
            Request::ReadHoldingRegisters(_) => FunctionCode::ReadHoldingRegisters,
            Request::ReadInputRegisters(_) => FunctionCode::ReadInputRegisters,
            Request::WriteSingleCoil(_) => FunctionCode::WriteSingleCoil,
            Request::WriteSingleRegister(_) => FunctionCode::WriteSingleRegister,
            Request::WriteMultipleCoils(_) => FunctionCode::WriteMultipleCoils,
            Request::WriteMultipleRegisters(_) => FunctionCode::WriteMultipleRegisters,
        }
    }

    /// Decode a complete request PDU
    ///
    /// Bytes left over after the body are an error.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = ReadCursor::new(payload);
        let value = cursor.read_u8()?;
        let function = FunctionCode::get(value).ok_or(DecodeError::UnknownFunction(value))?;
        let request = Self::parse(function, &mut cursor)?;
        cursor.expect_empty()?;
        Ok(request)
    }

    pub(crate) fn parse(
        function: FunctionCode,
        cursor: &mut ReadCursor,
    ) -> Result<Self, DecodeError> {
        match function {
            FunctionCode::ReadCoils => Ok(Request::ReadCoils(ReadBitsRequest::parse(cursor)?)),
            FunctionCode::ReadDiscreteInputs => Ok(Request::ReadDiscreteInputs(
                ReadBitsRequest::parse(cursor)?,
            )),
            FunctionCode::ReadHoldingRegisters => Ok(Request::ReadHoldingRegisters(
                ReadRegistersRequest::parse(cursor)?,
            )),
            FunctionCode::ReadInputRegisters => Ok(Request::ReadInputRegisters(
                ReadRegistersRequest::parse(cursor)?,
            )),
            FunctionCode::WriteSingleCoil => {
                Ok(Request::WriteSingleCoil(WriteSingleCoil::parse(cursor)?))
            }
            FunctionCode::WriteSingleRegister => Ok(Request::WriteSingleRegister(
                WriteSingleRegister::parse(cursor)?,
            )),
            FunctionCode::WriteMultipleCoils => Ok(Request::WriteMultipleCoils(
                WriteMultipleCoilsRequest::parse(cursor)?,
            )),
            FunctionCode::WriteMultipleRegisters => Ok(Request::WriteMultipleRegisters(
                WriteMultipleRegistersRequest::parse(cursor)?,
            )),
        }
    }

    /// Encode the complete PDU, function code included
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.function().get_value()];
        match self {
            Request::ReadCoils(x) => x.serialize(&mut out),
            Request::ReadDiscreteInputs(x) => x.serialize(&mut out),
            Request::ReadHoldingRegisters(x) => x.serialize(&mut out),
            Request::ReadInputRegisters(x) => x.serialize(&mut out),
            Request::WriteSingleCoil(x) => x.serialize(&mut out),
            Request::WriteSingleRegister(x) => x.serialize(&mut out),
            Request::WriteMultipleCoils(x) => x.serialize(&mut out),
            Request::WriteMultipleRegisters(x) => x.serialize(&mut out),
        }
        out
    }
}

impl Response {
    /// raw function code as it appears on the wire
    pub fn function(&self) -> u8 {
        match self {
            Response::ReadCoils(_) => FunctionCode::ReadCoils.get_value(),
            Response::ReadDiscreteInputs(_) => FunctionCode::ReadDiscreteInputs.get_value(),
            Response::ReadHoldingRegisters(_) => FunctionCode::ReadHoldingRegisters.get_value(),
            Response::ReadInputRegisters(_) => FunctionCode::ReadInputRegisters.get_value(),
            Response::WriteSingleCoil(_) => FunctionCode::WriteSingleCoil.get_value(),
            Response::WriteSingleRegister(_) => FunctionCode::WriteSingleRegister.get_value(),
            Response::WriteMultipleCoils(_) => FunctionCode::WriteMultipleCoils.get_value(),
            Response::WriteMultipleRegisters(_) => {
                FunctionCode::WriteMultipleRegisters.get_value()
            }
            Response::Exception(ex) => ex.error_function(),
        }
    }

    /// the exception code if this is an exception response
    pub fn exception_code(&self) -> Option<ExceptionCode> {
        match self {
            Response::Exception(ex) => Some(ex.code),
            _ => None,
        }
    }

    /// Encode the complete PDU, function code included
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.function()];
        match self {
            Response::ReadCoils(x) => x.serialize(&mut out),
            Response::ReadDiscreteInputs(x) => x.serialize(&mut out),
            Response::ReadHoldingRegisters(x) => x.serialize(&mut out),
            Response::ReadInputRegisters(x) => x.serialize(&mut out),
            Response::WriteSingleCoil(x) => x.serialize(&mut out),
            Response::WriteSingleRegister(x) => x.serialize(&mut out),
            Response::WriteMultipleCoils(x) => x.serialize(&mut out),
            Response::WriteMultipleRegisters(x) => x.serialize(&mut out),
            Response::Exception(x) => x.serialize(&mut out),
        }
        out
    }

    /// Decode a complete response PDU
    ///
    /// A function code with the high bit set is decoded as an exception.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = ReadCursor::new(payload);
        let value = cursor.read_u8()?;

        if value & 0x80 != 0 {
            let code = ExceptionCode::parse(&mut cursor)?;
            cursor.expect_empty()?;
            return Ok(Response::Exception(ExceptionResponse::new(value, code)));
        }

        let function = FunctionCode::get(value).ok_or(DecodeError::UnknownFunction(value))?;
        let response = match function {
            FunctionCode::ReadCoils => Response::ReadCoils(ReadBitsResponse::parse(&mut cursor)?),
            FunctionCode::ReadDiscreteInputs => {
                Response::ReadDiscreteInputs(ReadBitsResponse::parse(&mut cursor)?)
            }
            FunctionCode::ReadHoldingRegisters => {
                Response::ReadHoldingRegisters(ReadRegistersResponse::parse(&mut cursor)?)
            }
            FunctionCode::ReadInputRegisters => {
                Response::ReadInputRegisters(ReadRegistersResponse::parse(&mut cursor)?)
            }
            FunctionCode::WriteSingleCoil => {
                Response::WriteSingleCoil(WriteSingleCoil::parse(&mut cursor)?)
            }
            FunctionCode::WriteSingleRegister => {
                Response::WriteSingleRegister(WriteSingleRegister::parse(&mut cursor)?)
            }
            FunctionCode::WriteMultipleCoils => {
                Response::WriteMultipleCoils(WriteMultipleResponse::parse(&mut cursor)?)
            }
            FunctionCode::WriteMultipleRegisters => {
                Response::WriteMultipleRegisters(WriteMultipleResponse::parse(&mut cursor)?)
            }
        };
        cursor.expect_empty()?;
        Ok(response)
    }
}

fn write_values<T>(f: &mut std::fmt::Formatter<'_>, start: u16, values: &[T]) -> std::fmt::Result
where
    T: Copy,
    Indexed<T>: std::fmt::Display,
{
    for (index, value) in (start..=u16::MAX).zip(values.iter()) {
        write!(f, "\n{}", Indexed::new(index, *value))?;
    }
    Ok(())
}

pub(crate) struct RequestDisplay<'a> {
    request: &'a Request,
    level: PduDecodeLevel,
}

impl<'a> RequestDisplay<'a> {
    pub(crate) fn new(level: PduDecodeLevel, request: &'a Request) -> Self {
        Self { request, level }
    }
}

impl std::fmt::Display for RequestDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.request.function())?;

        if self.level.data_headers() {
            match self.request {
                Request::ReadCoils(x) | Request::ReadDiscreteInputs(x) => {
                    write!(f, " {x}")?;
                }
                Request::ReadHoldingRegisters(x) | Request::ReadInputRegisters(x) => {
                    write!(f, " address: {:#06X} qty: {}", x.address, x.count)?;
                }
                Request::WriteSingleCoil(x) => {
                    write!(f, " {x}")?;
                }
                Request::WriteSingleRegister(x) => {
                    write!(f, " {x}")?;
                }
                Request::WriteMultipleCoils(x) => {
                    write!(f, " {x}")?;
                    if self.level.data_values() {
                        write_values(f, x.address, &x.values)?;
                    }
                }
                Request::WriteMultipleRegisters(x) => {
                    write!(f, " {x}")?;
                    if self.level.data_values() {
                        write_values(f, x.address, &x.values)?;
                    }
                }
            }
        }

        Ok(())
    }
}

pub(crate) struct ResponseDisplay<'a> {
    response: &'a Response,
    // start address of the request, used to index read values
    start: u16,
    level: PduDecodeLevel,
}

impl<'a> ResponseDisplay<'a> {
    pub(crate) fn new(level: PduDecodeLevel, start: u16, response: &'a Response) -> Self {
        Self {
            response,
            start,
            level,
        }
    }
}

impl std::fmt::Display for ResponseDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match FunctionCode::get(self.response.function()) {
            Some(function) => write!(f, "{function}")?,
            None => write!(f, "{:#04X}", self.response.function())?,
        }

        if self.level.data_headers() {
            match self.response {
                Response::ReadCoils(x) | Response::ReadDiscreteInputs(x) => {
                    write!(f, " {x}")?;
                    if self.level.data_values() {
                        write_values(f, self.start, &x.bits)?;
                    }
                }
                Response::ReadHoldingRegisters(x) | Response::ReadInputRegisters(x) => {
                    write!(f, " qty: {}", x.values.len())?;
                    if self.level.data_values() {
                        write_values(f, self.start, &x.values)?;
                    }
                }
                Response::WriteSingleCoil(x) => write!(f, " {x}")?,
                Response::WriteSingleRegister(x) => write!(f, " {x}")?,
                Response::WriteMultipleCoils(x) | Response::WriteMultipleRegisters(x) => {
                    write!(f, " address: {:#06X} qty: {}", x.address, x.count)?
                }
                Response::Exception(x) => write!(f, " {x}")?,
            }
        }

        Ok(())
    }
}
