use crate::constants::coil;
use crate::error::{DecodeError, InvalidRange};

/// Unit identifier carried in the MBAP header
///
/// The server does not route on it, it is only echoed in the response.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Ord, Eq, Hash)]
pub struct UnitId {
    /// raw identifier
    pub value: u8,
}

/// Run of `count` consecutive addresses beginning at `start`
///
/// The constructors guarantee that the run is not empty and ends at or before `u16::MAX`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressRange {
    /// first address
    pub start: u16,
    /// number of addresses
    pub count: u16,
}

/// A value tagged with the address it was read from or written to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Indexed<T> {
    /// address
    pub index: u16,
    /// value at the address
    pub value: T,
}

/// The four independently addressed blocks of a Modbus device
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum BlockKind {
    /// single-bit, read-only inputs
    DiscreteInputs,
    /// single-bit, read/write outputs
    Coils,
    /// 16-bit, read-only registers
    InputRegisters,
    /// 16-bit, read/write registers
    HoldingRegisters,
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BlockKind::DiscreteInputs => "discrete inputs",
            BlockKind::Coils => "coils",
            BlockKind::InputRegisters => "input registers",
            BlockKind::HoldingRegisters => "holding registers",
        };
        f.write_str(name)
    }
}

pub(crate) fn coil_from_u16(value: u16) -> Result<bool, DecodeError> {
    match value {
        coil::ON => Ok(true),
        coil::OFF => Ok(false),
        _ => Err(DecodeError::UnknownCoilState(value)),
    }
}

pub(crate) fn coil_to_u16(value: bool) -> u16 {
    match value {
        true => coil::ON,
        false => coil::OFF,
    }
}

impl UnitId {
    /// wrap a raw identifier
    pub fn new(value: u8) -> Self {
        UnitId { value }
    }
}

/// 0xFF, the identifier conventionally used on TCP
impl Default for UnitId {
    fn default() -> Self {
        UnitId::new(0xFF)
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#04X}", self.value)
    }
}

impl AddressRange {
    /// Validate a start and count
    ///
    /// The last address, `start + count - 1`, must fit in a `u16`.
    pub fn try_from(start: u16, count: u16) -> Result<Self, InvalidRange> {
        let last = count
            .checked_sub(1)
            .ok_or(InvalidRange::CountOfZero)?;
        match start.checked_add(last) {
            Some(_) => Ok(AddressRange { start, count }),
            None => Err(InvalidRange::AddressOverflow(start, count)),
        }
    }

    /// Like [`try_from`](Self::try_from), but a count above `limit` is rejected first
    pub(crate) fn try_from_limited(start: u16, count: u16, limit: u16) -> Result<Self, InvalidRange> {
        if count > limit {
            return Err(InvalidRange::CountTooLargeForType(count, limit));
        }
        Self::try_from(start, count)
    }
}

impl std::fmt::Display for AddressRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "address: {:#06X} qty: {}", self.start, self.count)
    }
}

impl<T> Indexed<T> {
    /// tag `value` with its address
    pub fn new(index: u16, value: T) -> Self {
        Indexed { index, value }
    }
}

impl std::fmt::Display for Indexed<bool> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:#06X}] = {}", self.index, u8::from(self.value))
    }
}

impl std::fmt::Display for Indexed<u16> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:#06X}] = {:#06X}", self.index, self.value)
    }
}
