/// Function codes supported by the server
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum FunctionCode {
    /// Read Coils (0x01)
    ReadCoils = 0x01,
    /// Read Discrete Inputs (0x02)
    ReadDiscreteInputs = 0x02,
    /// Read Holding Registers (0x03)
    ReadHoldingRegisters = 0x03,
    /// Read Input Registers (0x04)
    ReadInputRegisters = 0x04,
    /// Write Single Coil (0x05)
    WriteSingleCoil = 0x05,
    /// Write Single Register (0x06)
    WriteSingleRegister = 0x06,
    /// Write Multiple Coils (0x0F)
    WriteMultipleCoils = 0x0F,
    /// Write Multiple Registers (0x10)
    WriteMultipleRegisters = 0x10,
}

const ALL: [FunctionCode; 8] = [
    FunctionCode::ReadCoils,
    FunctionCode::ReadDiscreteInputs,
    FunctionCode::ReadHoldingRegisters,
    FunctionCode::ReadInputRegisters,
    FunctionCode::WriteSingleCoil,
    FunctionCode::WriteSingleRegister,
    FunctionCode::WriteMultipleCoils,
    FunctionCode::WriteMultipleRegisters,
];

impl FunctionCode {
    /// raw value of the function code
    pub const fn get_value(self) -> u8 {
        self as u8
    }

    /// value of the function code in an exception response
    pub const fn as_error(self) -> u8 {
        self.get_value() | 0x80
    }

    /// look up a function code in the table of supported requests
    pub fn get(value: u8) -> Option<Self> {
        ALL.into_iter().find(|x| x.get_value() == value)
    }

    fn name(self) -> &'static str {
        match self {
            FunctionCode::ReadCoils => "READ COILS",
            FunctionCode::ReadDiscreteInputs => "READ DISCRETE INPUTS",
            FunctionCode::ReadHoldingRegisters => "READ HOLDING REGISTERS",
            FunctionCode::ReadInputRegisters => "READ INPUT REGISTERS",
            FunctionCode::WriteSingleCoil => "WRITE SINGLE COIL",
            FunctionCode::WriteSingleRegister => "WRITE SINGLE REGISTER",
            FunctionCode::WriteMultipleCoils => "WRITE MULTIPLE COILS",
            FunctionCode::WriteMultipleRegisters => "WRITE MULTIPLE REGISTERS",
        }
    }
}

impl std::fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:#04X})", self.name(), self.get_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_sets_the_high_bit() {
        assert_eq!(FunctionCode::ReadCoils.as_error(), 0x81);
        assert_eq!(FunctionCode::WriteMultipleCoils.as_error(), 0x8F);
    }

    #[test]
    fn every_code_is_found_by_its_value() {
        for value in 0..=u8::MAX {
            if let Some(function) = FunctionCode::get(value) {
                assert_eq!(function.get_value(), value);
            }
        }
        assert_eq!(FunctionCode::get(0x2B), None);
        assert_eq!(
            FunctionCode::get(0x10),
            Some(FunctionCode::WriteMultipleRegisters)
        );
    }

    #[test]
    fn displays_name_and_value() {
        assert_eq!(
            FunctionCode::WriteSingleCoil.to_string(),
            "WRITE SINGLE COIL (0x05)"
        );
    }
}
