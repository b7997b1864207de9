use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::types::BlockKind;

/// Storage for the four data blocks served to clients
///
/// Callers must [`validate`](Datastore::validate) a range before reading or writing it;
/// the accessors do not re-validate and report a [`StoreError`] if the contract is broken.
/// Values are always read and written in ascending address order.
pub trait Datastore: Send + 'static {
    /// true if `count` values starting at `address` exist in `block`
    ///
    /// Always false for a count of zero.
    fn validate(&self, block: BlockKind, address: u16, count: u16) -> bool;

    /// read bits from the coils or discrete inputs
    fn get_bits(&self, block: BlockKind, address: u16, count: u16)
        -> Result<Vec<bool>, StoreError>;

    /// read registers from the holding or input registers
    fn get_registers(
        &self,
        block: BlockKind,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, StoreError>;

    /// write bits to the coils or discrete inputs
    fn set_bits(&mut self, block: BlockKind, address: u16, values: &[bool])
        -> Result<(), StoreError>;

    /// write registers to the holding or input registers
    fn set_registers(
        &mut self,
        block: BlockKind,
        address: u16,
        values: &[u16],
    ) -> Result<(), StoreError>;
}

/// Values of a single block
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataBlock<T> {
    /// dense values starting at `start`
    Sequential {
        /// address of the first value
        start: u16,
        /// values in ascending address order
        values: Vec<T>,
    },
    /// only the addresses present in the map exist
    Sparse(BTreeMap<u16, T>),
}

impl<T> Default for DataBlock<T> {
    fn default() -> Self {
        DataBlock::Sequential {
            start: 0,
            values: Vec::new(),
        }
    }
}

impl<T> DataBlock<T>
where
    T: Copy,
{
    /// block with no addresses
    pub fn empty() -> Self {
        Self::default()
    }

    /// dense block of `values` starting at `start`
    pub fn sequential(start: u16, values: Vec<T>) -> Self {
        DataBlock::Sequential { start, values }
    }

    /// dense block of `count` copies of `value` starting at `start`
    pub fn filled(start: u16, count: u16, value: T) -> Self {
        Self::sequential(start, vec![value; count as usize])
    }

    /// block containing only the given addresses
    pub fn sparse<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (u16, T)>,
    {
        DataBlock::Sparse(values.into_iter().collect())
    }

    /// number of populated addresses
    pub fn len(&self) -> usize {
        match self {
            DataBlock::Sequential { values, .. } => values.len(),
            DataBlock::Sparse(map) => map.len(),
        }
    }

    /// true if no address is populated
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// true if every address in `address..address + count` is populated
    pub fn validate(&self, address: u16, count: u16) -> bool {
        if count == 0 {
            return false;
        }

        let begin = address as usize;
        let end = begin + count as usize;

        match self {
            DataBlock::Sequential { start, values } => {
                let first = *start as usize;
                begin >= first && end <= first + values.len()
            }
            DataBlock::Sparse(map) => (begin..end).all(|x| {
                u16::try_from(x)
                    .map(|x| map.contains_key(&x))
                    .unwrap_or(false)
            }),
        }
    }

    fn get(&self, address: u16) -> Option<T> {
        match self {
            DataBlock::Sequential { start, values } => {
                let offset = address.checked_sub(*start)?;
                values.get(offset as usize).copied()
            }
            DataBlock::Sparse(map) => map.get(&address).copied(),
        }
    }

    fn get_mut(&mut self, address: u16) -> Option<&mut T> {
        match self {
            DataBlock::Sequential { start, values } => {
                let offset = address.checked_sub(*start)?;
                values.get_mut(offset as usize)
            }
            DataBlock::Sparse(map) => map.get_mut(&address),
        }
    }

    fn read(&self, kind: BlockKind, address: u16, count: u16) -> Result<Vec<T>, StoreError> {
        (0..count)
            .map(|offset| {
                let current = address.wrapping_add(offset);
                self.get(current)
                    .ok_or(StoreError::Unpopulated(kind, current))
            })
            .collect()
    }

    fn write(&mut self, kind: BlockKind, address: u16, values: &[T]) -> Result<(), StoreError> {
        // check the whole range first so a failed write leaves the block untouched
        let mut current = address;
        for _ in values {
            if self.get(current).is_none() {
                return Err(StoreError::Unpopulated(kind, current));
            }
            current = current.wrapping_add(1);
        }

        let mut current = address;
        for value in values {
            if let Some(x) = self.get_mut(current) {
                *x = *value;
            }
            current = current.wrapping_add(1);
        }

        Ok(())
    }
}

/// In-memory [`Datastore`] made of four independent [`DataBlock`]s
///
/// The default store is empty, i.e. every request fails validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStore {
    discrete_inputs: DataBlock<bool>,
    coils: DataBlock<bool>,
    input_registers: DataBlock<u16>,
    holding_registers: DataBlock<u16>,
}

impl MemoryStore {
    /// create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// replace the discrete inputs block
    pub fn with_discrete_inputs(mut self, block: DataBlock<bool>) -> Self {
        self.discrete_inputs = block;
        self
    }

    /// replace the coils block
    pub fn with_coils(mut self, block: DataBlock<bool>) -> Self {
        self.coils = block;
        self
    }

    /// replace the input registers block
    pub fn with_input_registers(mut self, block: DataBlock<u16>) -> Self {
        self.input_registers = block;
        self
    }

    /// replace the holding registers block
    pub fn with_holding_registers(mut self, block: DataBlock<u16>) -> Self {
        self.holding_registers = block;
        self
    }

    fn bits(&self, block: BlockKind) -> Result<&DataBlock<bool>, StoreError> {
        match block {
            BlockKind::DiscreteInputs => Ok(&self.discrete_inputs),
            BlockKind::Coils => Ok(&self.coils),
            _ => Err(StoreError::WrongBlockKind(block)),
        }
    }

    fn bits_mut(&mut self, block: BlockKind) -> Result<&mut DataBlock<bool>, StoreError> {
        match block {
            BlockKind::DiscreteInputs => Ok(&mut self.discrete_inputs),
            BlockKind::Coils => Ok(&mut self.coils),
            _ => Err(StoreError::WrongBlockKind(block)),
        }
    }

    fn registers(&self, block: BlockKind) -> Result<&DataBlock<u16>, StoreError> {
        match block {
            BlockKind::InputRegisters => Ok(&self.input_registers),
            BlockKind::HoldingRegisters => Ok(&self.holding_registers),
            _ => Err(StoreError::WrongBlockKind(block)),
        }
    }

    fn registers_mut(&mut self, block: BlockKind) -> Result<&mut DataBlock<u16>, StoreError> {
        match block {
            BlockKind::InputRegisters => Ok(&mut self.input_registers),
            BlockKind::HoldingRegisters => Ok(&mut self.holding_registers),
            _ => Err(StoreError::WrongBlockKind(block)),
        }
    }
}

impl Datastore for MemoryStore {
    fn validate(&self, block: BlockKind, address: u16, count: u16) -> bool {
        match block {
            BlockKind::DiscreteInputs => self.discrete_inputs.validate(address, count),
            BlockKind::Coils => self.coils.validate(address, count),
            BlockKind::InputRegisters => self.input_registers.validate(address, count),
            BlockKind::HoldingRegisters => self.holding_registers.validate(address, count),
        }
    }

    fn get_bits(
        &self,
        block: BlockKind,
        address: u16,
        count: u16,
    ) -> Result<Vec<bool>, StoreError> {
        self.bits(block)?.read(block, address, count)
    }

    fn get_registers(
        &self,
        block: BlockKind,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, StoreError> {
        self.registers(block)?.read(block, address, count)
    }

    fn set_bits(
        &mut self,
        block: BlockKind,
        address: u16,
        values: &[bool],
    ) -> Result<(), StoreError> {
        self.bits_mut(block)?.write(block, address, values)
    }

    fn set_registers(
        &mut self,
        block: BlockKind,
        address: u16,
        values: &[u16],
    ) -> Result<(), StoreError> {
        self.registers_mut(block)?.write(block, address, values)
    }
}
