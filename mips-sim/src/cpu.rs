use crate::console::Console;
use crate::error::SimError;
use crate::program::{
    A0, Address, DATA_BASE, Instruction, Program, RA, Register, SP, TEXT_BASE, V0, ZERO,
};

/// Initial `$sp`; the stack grows down from here.
pub const STACK_TOP: u32 = 0x7fff_f000;
pub const STACK_SIZE: usize = 64 * 1024;
pub const DEFAULT_STEP_LIMIT: usize = 10_000_000;

pub struct Cpu {
    registers: [i32; 32],
    hi: i32,
    lo: i32,
    program_counter: u32,
    instructions: Vec<Instruction>,
    data: Vec<u8>,
    // [STACK_TOP - STACK_SIZE, STACK_TOP)
    stack: Vec<u8>,
    console: Console,
    step_limit: usize,
    halted: bool,
}

impl Cpu {
    pub fn new(program: Program) -> Self {
        let mut registers = [0; 32];
        registers[SP] = STACK_TOP as i32;
        Cpu {
            registers,
            hi: 0,
            lo: 0,
            program_counter: program.entry,
            instructions: program.instructions,
            data: program.data,
            stack: vec![0; STACK_SIZE],
            console: Console::default(),
            step_limit: DEFAULT_STEP_LIMIT,
            halted: false,
        }
    }

    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    pub fn register(&self, register: Register) -> i32 {
        self.registers[register]
    }

    /// Runs from `main` until the exit syscall and returns everything printed.
    pub fn run(mut self, input: impl IntoIterator<Item = i32>) -> Result<String, SimError> {
        self.console = Console::new(input);
        let mut steps = 0;
        while !self.halted {
            if steps == self.step_limit {
                return Err(SimError::StepLimit {
                    limit: self.step_limit,
                });
            }
            steps += 1;
            let instruction = self.fetch()?;
            self.execute(instruction)?;
        }
        Ok(self.console.into_output())
    }

    fn fetch(&mut self) -> Result<Instruction, SimError> {
        let pc = self.program_counter;
        let index = pc
            .checked_sub(TEXT_BASE)
            .filter(|offset| offset % 4 == 0)
            .map(|offset| (offset / 4) as usize);
        let instruction = index
            .and_then(|index| self.instructions.get(index))
            .copied()
            .ok_or(SimError::PcOutOfRange { pc })?;
        self.program_counter = pc.wrapping_add(4);
        Ok(instruction)
    }

    fn execute(&mut self, instruction: Instruction) -> Result<(), SimError> {
        match instruction {
            Instruction::Li { rt, imm } => self.set(rt, imm),
            Instruction::La { rt, address } => self.set(rt, address as i32),
            Instruction::Lw { rt, address } => {
                let address = self.effective(address);
                let value = self.load_word(address)?;
                self.set(rt, value);
            }
            Instruction::Sw { rt, address } => {
                let address = self.effective(address);
                self.store_word(address, self.registers[rt])?;
            }
            Instruction::Move { rd, rs } => self.set(rd, self.registers[rs]),
            Instruction::Addu { rd, rs, rt } => {
                self.set(rd, self.registers[rs].wrapping_add(self.registers[rt]))
            }
            Instruction::Subu { rd, rs, rt } => {
                self.set(rd, self.registers[rs].wrapping_sub(self.registers[rt]))
            }
            Instruction::Addiu { rd, rs, imm } => self.set(rd, self.registers[rs].wrapping_add(imm)),
            Instruction::Mult { rs, rt } => self.op_mult(rs, rt),
            Instruction::Div { rs, rt } => self.op_div(rs, rt)?,
            Instruction::Mflo { rd } => self.set(rd, self.lo),
            Instruction::Mfhi { rd } => self.set(rd, self.hi),
            Instruction::J { target } => self.program_counter = target,
            Instruction::Jal { target } => {
                self.set(RA, self.program_counter as i32);
                self.program_counter = target;
            }
            Instruction::Jr { rs } => self.program_counter = self.registers[rs] as u32,
            Instruction::Branch {
                cmp,
                rs,
                rt,
                target,
            } => {
                if cmp.holds(self.registers[rs], self.registers[rt]) {
                    self.program_counter = target;
                }
            }
            Instruction::Syscall => self.op_syscall()?,
        }
        Ok(())
    }

    /// mult rs, rt - 64-bit product into hi:lo
    fn op_mult(&mut self, rs: Register, rt: Register) {
        let product = i64::from(self.registers[rs]) * i64::from(self.registers[rt]);
        self.lo = product as i32;
        self.hi = (product >> 32) as i32;
    }

    /// div rs, rt - quotient into lo, remainder into hi
    fn op_div(&mut self, rs: Register, rt: Register) -> Result<(), SimError> {
        let divisor = self.registers[rt];
        if divisor == 0 {
            return Err(SimError::DivisionByZero {
                pc: self.program_counter.wrapping_sub(4),
            });
        }
        self.lo = self.registers[rs].wrapping_div(divisor);
        self.hi = self.registers[rs].wrapping_rem(divisor);
        Ok(())
    }

    fn op_syscall(&mut self) -> Result<(), SimError> {
        match self.registers[V0] {
            1 => self.console.print_int(self.registers[A0]),
            4 => {
                let text = self.load_string(self.registers[A0] as u32)?;
                self.console.print_str(&text);
            }
            5 => {
                let value = self.console.read_int()?;
                self.set(V0, value);
            }
            10 => self.halted = true,
            code => return Err(SimError::UnknownSyscall { code }),
        }
        Ok(())
    }

    fn set(&mut self, register: Register, value: i32) {
        if register != ZERO {
            self.registers[register] = value;
        }
    }

    fn effective(&self, address: Address) -> u32 {
        match address {
            Address::Absolute(address) => address,
            Address::Offset { offset, base } => (self.registers[base] as u32).wrapping_add(offset as u32),
        }
    }

    /// Maps an address onto the backing segment and the index within it.
    fn locate(&self, address: u32, len: usize) -> Result<(bool, usize), SimError> {
        let invalid = SimError::InvalidAddress { address };
        let stack_base = STACK_TOP - STACK_SIZE as u32;
        if address >= DATA_BASE && ((address - DATA_BASE) as usize) + len <= self.data.len() {
            Ok((false, (address - DATA_BASE) as usize))
        } else if address >= stack_base && ((address - stack_base) as usize) + len <= STACK_SIZE {
            Ok((true, (address - stack_base) as usize))
        } else {
            Err(invalid)
        }
    }

    fn load_word(&self, address: u32) -> Result<i32, SimError> {
        if address % 4 != 0 {
            return Err(SimError::UnalignedAccess { address });
        }
        let (on_stack, index) = self.locate(address, 4)?;
        let segment = if on_stack { &self.stack } else { &self.data };
        let mut bytes = [0; 4];
        bytes.copy_from_slice(&segment[index..index + 4]);
        Ok(i32::from_le_bytes(bytes))
    }

    fn store_word(&mut self, address: u32, value: i32) -> Result<(), SimError> {
        if address % 4 != 0 {
            return Err(SimError::UnalignedAccess { address });
        }
        let (on_stack, index) = self.locate(address, 4)?;
        let segment = if on_stack {
            &mut self.stack
        } else {
            &mut self.data
        };
        segment[index..index + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Reads a NUL-terminated string.
    fn load_string(&self, address: u32) -> Result<String, SimError> {
        let (on_stack, start) = self.locate(address, 1)?;
        let segment = if on_stack { &self.stack } else { &self.data };
        let bytes = &segment[start..];
        let end = bytes
            .iter()
            .position(|&b| b == 0)
            .ok_or(SimError::InvalidAddress { address })?;
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str, input: &[i32]) -> Result<String, SimError> {
        let program = Program::assemble(source)?;
        Cpu::new(program).run(input.iter().copied())
    }

    const NEWLINE: &str = "\t.data\nnewline:\t.asciiz \"\\n\"\n\t.text\n";

    #[test]
    fn prints_integers_and_strings() {
        let source = format!(
            "{NEWLINE}main:\n\tli $a0, 42\n\tli $v0, 1\n\tsyscall\n\tla $a0, newline\n\tli $v0, 4\n\tsyscall\n\tli $v0, 10\n\tsyscall\n"
        );
        assert_eq!(run(&source, &[]).unwrap(), "42\n");
    }

    #[test]
    fn stack_push_and_pop_round_trip() {
        let source = "main:\n\tli $v0, 7\n\tsubu $sp, $sp, 4\n\tsw $v0, ($sp)\n\tli $v0, 0\n\tlw $a0, ($sp)\n\taddu $sp, $sp, 4\n\tli $v0, 1\n\tsyscall\n\tli $v0, 10\n\tsyscall\n";
        assert_eq!(run(source, &[]).unwrap(), "7");
    }

    #[test]
    fn arithmetic_matches_signed_32_bit() {
        let source = "main:\n\tli $t0, -7\n\tli $v0, 2\n\tdiv $t0, $v0\n\tmflo $a0\n\tli $v0, 1\n\tsyscall\n\tmfhi $a0\n\tsyscall\n\tli $t0, 65536\n\tmult $t0, $t0\n\tmfhi $a0\n\tsyscall\n\tli $v0, 10\n\tsyscall\n";
        assert_eq!(run(source, &[]).unwrap(), "-3-11");
    }

    #[test]
    fn branches_and_loops() {
        // prints 3 2 1
        let source = "main:\n\tli $t0, 3\nloop:\n\tble $t0, $zero, done\n\tmove $a0, $t0\n\tli $v0, 1\n\tsyscall\n\tli $v0, 1\n\tsubu $t0, $t0, $v0\n\tj loop\ndone:\n\tli $v0, 10\n\tsyscall\n";
        assert_eq!(run(source, &[]).unwrap(), "321");
    }

    #[test]
    fn jal_and_jr_return_to_the_caller() {
        let source = "main:\n\tjal twice\n\tmove $a0, $v0\n\tli $v0, 1\n\tsyscall\n\tli $v0, 10\n\tsyscall\ntwice:\n\tli $v0, 21\n\taddu $v0, $v0, $v0\n\tjr $ra\n";
        assert_eq!(run(source, &[]).unwrap(), "42");
    }

    #[test]
    fn reads_input() {
        let source = "main:\n\tli $v0, 5\n\tsyscall\n\tmove $a0, $v0\n\tli $v0, 1\n\tsyscall\n\tli $v0, 10\n\tsyscall\n";
        assert_eq!(run(source, &[-9]).unwrap(), "-9");
        assert_eq!(run(source, &[]), Err(SimError::InputExhausted));
    }

    #[test]
    fn zero_register_ignores_writes() {
        let source = "main:\n\tli $zero, 5\n\tmove $a0, $zero\n\tli $v0, 1\n\tsyscall\n\tli $v0, 10\n\tsyscall\n";
        assert_eq!(run(source, &[]).unwrap(), "0");
    }

    #[test]
    fn runtime_faults() {
        let div = "main:\n\tli $t0, 1\n\tdiv $t0, $zero\n";
        assert!(matches!(run(div, &[]), Err(SimError::DivisionByZero { .. })));

        let unaligned = "main:\n\tlw $v0, 2($sp)\n";
        assert!(matches!(run(unaligned, &[]), Err(SimError::UnalignedAccess { .. })));

        let wild = "main:\n\tli $t0, 64\n\tlw $v0, ($t0)\n";
        assert_eq!(run(wild, &[]), Err(SimError::InvalidAddress { address: 64 }));

        let fell_off = "main:\n\tli $v0, 1\n";
        assert!(matches!(run(fell_off, &[]), Err(SimError::PcOutOfRange { .. })));
    }

    #[test]
    fn step_limit_stops_runaway_loops() {
        let program = Program::assemble("main:\n\tj main\n").unwrap();
        assert_eq!(
            Cpu::new(program).with_step_limit(100).run(std::iter::empty()),
            Err(SimError::StepLimit { limit: 100 })
        );
    }
}
