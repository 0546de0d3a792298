use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("line {line}: unknown instruction '{mnemonic}'")]
    UnknownInstruction { line: usize, mnemonic: String },

    #[error("line {line}: unknown directive '{directive}'")]
    UnknownDirective { line: usize, directive: String },

    #[error("line {line}: unknown register '{name}'")]
    UnknownRegister { line: usize, name: String },

    #[error("line {line}: undefined label '{label}'")]
    UndefinedLabel { line: usize, label: String },

    #[error("line {line}: label '{label}' is defined twice")]
    DuplicateLabel { line: usize, label: String },

    #[error("line {line}: malformed operand '{operand}'")]
    BadOperand { line: usize, operand: String },

    #[error("line {line}: '{mnemonic}' takes {expected} operands, got {found}")]
    OperandCount {
        line: usize,
        mnemonic: String,
        expected: usize,
        found: usize,
    },

    #[error("program has no 'main' label")]
    MissingEntry,

    #[error("unaligned word access at {address:#010x}")]
    UnalignedAccess { address: u32 },

    #[error("access outside mapped memory at {address:#010x}")]
    InvalidAddress { address: u32 },

    #[error("program counter {pc:#010x} is outside the text segment")]
    PcOutOfRange { pc: u32 },

    #[error("division by zero at {pc:#010x}")]
    DivisionByZero { pc: u32 },

    #[error("read_int syscall with no input left")]
    InputExhausted,

    #[error("unsupported syscall {code}")]
    UnknownSyscall { code: i32 },

    #[error("step limit of {limit} instructions exceeded")]
    StepLimit { limit: usize },
}
