use std::sync::Mutex;

use crate::datastore::Datastore;
use crate::decode::PduDecodeLevel;
use crate::error::StoreError;
use crate::exception::ExceptionCode;
use crate::pdu::*;
use crate::types::{AddressRange, BlockKind};

/// Decodes request PDUs and executes them against a [`Datastore`]
///
/// Every failure that can be attributed to a request becomes an exception response.
#[derive(Copy, Clone, Debug, Default)]
pub struct RequestExecutor {
    level: PduDecodeLevel,
}

impl RequestExecutor {
    /// create an executor that logs PDUs at `level`
    pub fn new(level: PduDecodeLevel) -> Self {
        Self { level }
    }

    /// Execute one request PDU
    ///
    /// Returns `None` only when the PDU does not even contain a function code.
    pub fn execute<T: Datastore>(&self, pdu: &[u8], store: &Mutex<T>) -> Option<Response> {
        let function = match pdu.first() {
            Some(x) => *x,
            None => {
                tracing::warn!("received request without a function code");
                return None;
            }
        };

        let request = match Request::decode(pdu) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!("error decoding request: {}", err);
                return Some(Self::exception(function, err.exception()));
            }
        };

        if self.level.enabled() {
            tracing::info!("PDU RX - {}", RequestDisplay::new(self.level, &request));
        }

        let response = match Self::process(&request, store) {
            Ok(response) => response,
            Err(code) => {
                tracing::warn!("{} failed: {:?}", request.function(), code);
                Self::exception(function, code)
            }
        };

        if self.level.enabled() {
            tracing::info!(
                "PDU TX - {}",
                ResponseDisplay::new(self.level, Self::start_address(&request), &response)
            );
        }

        Some(response)
    }

    fn exception(function: u8, code: ExceptionCode) -> Response {
        Response::Exception(ExceptionResponse::new(function, code))
    }

    fn start_address(request: &Request) -> u16 {
        match request {
            Request::ReadCoils(x) | Request::ReadDiscreteInputs(x) => x.address,
            Request::ReadHoldingRegisters(x) | Request::ReadInputRegisters(x) => x.address,
            Request::WriteSingleCoil(x) => x.address,
            Request::WriteSingleRegister(x) => x.address,
            Request::WriteMultipleCoils(x) => x.address,
            Request::WriteMultipleRegisters(x) => x.address,
        }
    }

    fn process<T: Datastore>(request: &Request, store: &Mutex<T>) -> Result<Response, ExceptionCode> {
        match request {
            Request::ReadCoils(x) => {
                let range = x.range()?;
                let bits = locked(store, |db| read_bits(db, BlockKind::Coils, range))?;
                Ok(Response::ReadCoils(ReadBitsResponse::new(bits)))
            }
            Request::ReadDiscreteInputs(x) => {
                let range = x.range()?;
                let bits = locked(store, |db| read_bits(db, BlockKind::DiscreteInputs, range))?;
                Ok(Response::ReadDiscreteInputs(ReadBitsResponse::new(bits)))
            }
            Request::ReadHoldingRegisters(x) => {
                let range = x.range()?;
                let values =
                    locked(store, |db| read_registers(db, BlockKind::HoldingRegisters, range))?;
                Ok(Response::ReadHoldingRegisters(ReadRegistersResponse::new(
                    values,
                )))
            }
            Request::ReadInputRegisters(x) => {
                let range = x.range()?;
                let values =
                    locked(store, |db| read_registers(db, BlockKind::InputRegisters, range))?;
                Ok(Response::ReadInputRegisters(ReadRegistersResponse::new(
                    values,
                )))
            }
            Request::WriteSingleCoil(x) => {
                let range = AddressRange::try_from(x.address, 1)?;
                locked(store, |db| write_bits(db, range, &[x.value]))?;
                Ok(Response::WriteSingleCoil(*x))
            }
            Request::WriteSingleRegister(x) => {
                let range = AddressRange::try_from(x.address, 1)?;
                locked(store, |db| write_registers(db, range, &[x.value]))?;
                Ok(Response::WriteSingleRegister(*x))
            }
            Request::WriteMultipleCoils(x) => {
                let range = x.range()?;
                locked(store, |db| write_bits(db, range, &x.values))?;
                Ok(Response::WriteMultipleCoils(WriteMultipleResponse::new(
                    range.start,
                    range.count,
                )))
            }
            Request::WriteMultipleRegisters(x) => {
                let range = x.range()?;
                locked(store, |db| write_registers(db, range, &x.values))?;
                Ok(Response::WriteMultipleRegisters(WriteMultipleResponse::new(
                    range.start,
                    range.count,
                )))
            }
        }
    }
}

// validation and the access that follows it happen under a single acquisition of the lock
fn locked<T, R, F>(store: &Mutex<T>, action: F) -> Result<R, ExceptionCode>
where
    F: FnOnce(&mut T) -> Result<R, ExceptionCode>,
{
    let mut guard = store.lock().map_err(|_| {
        tracing::error!("datastore lock is poisoned");
        ExceptionCode::ServerDeviceFailure
    })?;
    action(&mut *guard)
}

fn device_failure(err: StoreError) -> ExceptionCode {
    tracing::error!("datastore failure: {}", err);
    ExceptionCode::ServerDeviceFailure
}

fn validate<T: Datastore>(db: &T, block: BlockKind, range: AddressRange) -> Result<(), ExceptionCode> {
    if db.validate(block, range.start, range.count) {
        Ok(())
    } else {
        Err(ExceptionCode::IllegalDataAddress)
    }
}

fn read_bits<T: Datastore>(
    db: &T,
    block: BlockKind,
    range: AddressRange,
) -> Result<Vec<bool>, ExceptionCode> {
    validate(db, block, range)?;
    db.get_bits(block, range.start, range.count)
        .map_err(device_failure)
}

fn read_registers<T: Datastore>(
    db: &T,
    block: BlockKind,
    range: AddressRange,
) -> Result<Vec<u16>, ExceptionCode> {
    validate(db, block, range)?;
    db.get_registers(block, range.start, range.count)
        .map_err(device_failure)
}

fn write_bits<T: Datastore>(
    db: &mut T,
    range: AddressRange,
    values: &[bool],
) -> Result<(), ExceptionCode> {
    validate(db, BlockKind::Coils, range)?;
    db.set_bits(BlockKind::Coils, range.start, values)
        .map_err(device_failure)
}

fn write_registers<T: Datastore>(
    db: &mut T,
    range: AddressRange,
    values: &[u16],
) -> Result<(), ExceptionCode> {
    validate(db, BlockKind::HoldingRegisters, range)?;
    db.set_registers(BlockKind::HoldingRegisters, range.start, values)
        .map_err(device_failure)
}
