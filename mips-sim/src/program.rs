use std::collections::HashMap;

use crate::error::SimError;

pub const TEXT_BASE: u32 = 0x0040_0000;
pub const DATA_BASE: u32 = 0x1001_0000;

/// General purpose register index, `0..32`.
pub type Register = usize;

pub const ZERO: Register = 0;
pub const V0: Register = 2;
pub const A0: Register = 4;
pub const SP: Register = 29;
pub const RA: Register = 31;

const REGISTER_NAMES: [&str; 32] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "t0", "t1", "t2", "t3", "t4", "t5", "t6",
    "t7", "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "t8", "t9", "k0", "k1", "gp", "sp", "fp",
    "ra",
];

/// Memory operand of `lw`/`sw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address {
    Absolute(u32),
    Offset { offset: i32, base: Register },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Comparison {
    pub fn holds(self, left: i32, right: i32) -> bool {
        match self {
            Comparison::Eq => left == right,
            Comparison::Ne => left != right,
            Comparison::Lt => left < right,
            Comparison::Gt => left > right,
            Comparison::Le => left <= right,
            Comparison::Ge => left >= right,
        }
    }
}

/// One assembled instruction. Jump and branch targets are absolute text
/// addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Li { rt: Register, imm: i32 },
    La { rt: Register, address: u32 },
    Lw { rt: Register, address: Address },
    Sw { rt: Register, address: Address },
    Move { rd: Register, rs: Register },
    Addu { rd: Register, rs: Register, rt: Register },
    Subu { rd: Register, rs: Register, rt: Register },
    /// `addu`/`subu` with an immediate third operand
    Addiu { rd: Register, rs: Register, imm: i32 },
    Mult { rs: Register, rt: Register },
    Div { rs: Register, rt: Register },
    Mflo { rd: Register },
    Mfhi { rd: Register },
    J { target: u32 },
    Jal { target: u32 },
    Jr { rs: Register },
    Branch {
        cmp: Comparison,
        rs: Register,
        rt: Register,
        target: u32,
    },
    Syscall,
}

/// An assembled program: the text segment, the initial data segment and the
/// address of `main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub data: Vec<u8>,
    pub entry: u32,
    labels: HashMap<String, u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Text,
    Data,
}

/// A `.text` statement waiting for labels to be known.
struct Pending<'a> {
    line: usize,
    mnemonic: &'a str,
    operands: Vec<&'a str>,
}

impl Program {
    /// Two passes: the first lays out data and records every label, the
    /// second decodes instructions against the finished label table.
    pub fn assemble(source: &str) -> Result<Program, SimError> {
        let mut labels = HashMap::new();
        let mut data = Vec::new();
        let mut pending = Vec::new();
        let mut segment = Segment::Text;

        for (index, raw) in source.lines().enumerate() {
            let line = index + 1;
            let mut rest = strip_comment(raw).trim();

            if let Some((label, after)) = split_label(rest) {
                let address = match segment {
                    Segment::Text => TEXT_BASE + 4 * pending.len() as u32,
                    Segment::Data => DATA_BASE + data.len() as u32,
                };
                if labels.insert(label.to_string(), address).is_some() {
                    return Err(SimError::DuplicateLabel {
                        line,
                        label: label.to_string(),
                    });
                }
                rest = after.trim();
            }
            if rest.is_empty() {
                continue;
            }

            let (head, tail) = rest
                .split_once(char::is_whitespace)
                .map_or((rest, ""), |(head, tail)| (head, tail.trim()));

            match head {
                ".data" => segment = Segment::Data,
                ".text" => segment = Segment::Text,
                ".globl" => {}
                ".word" => {
                    for value in tail.split(',') {
                        let value = parse_immediate(value.trim(), line)?;
                        data.extend_from_slice(&value.to_le_bytes());
                    }
                }
                ".asciiz" => {
                    data.extend(parse_string(tail, line)?);
                    data.push(0);
                    while data.len() % 4 != 0 {
                        data.push(0);
                    }
                }
                directive if directive.starts_with('.') => {
                    return Err(SimError::UnknownDirective {
                        line,
                        directive: directive.to_string(),
                    });
                }
                mnemonic => {
                    let operands = if tail.is_empty() {
                        Vec::new()
                    } else {
                        tail.split(',').map(str::trim).collect()
                    };
                    pending.push(Pending {
                        line,
                        mnemonic,
                        operands,
                    });
                }
            }
        }

        let entry = *labels.get("main").ok_or(SimError::MissingEntry)?;
        let instructions = pending
            .iter()
            .map(|statement| decode(statement, &labels))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Program {
            instructions,
            data,
            entry,
            labels,
        })
    }

    pub fn label(&self, name: &str) -> Option<u32> {
        self.labels.get(name).copied()
    }
}

fn decode(statement: &Pending<'_>, labels: &HashMap<String, u32>) -> Result<Instruction, SimError> {
    let line = statement.line;
    let ops = &statement.operands;
    let arity = |expected: usize| {
        if ops.len() == expected {
            Ok(())
        } else {
            Err(SimError::OperandCount {
                line,
                mnemonic: statement.mnemonic.to_string(),
                expected,
                found: ops.len(),
            })
        }
    };
    let reg = |i: usize| parse_register(ops[i], line);
    let label = |i: usize| resolve_label(ops[i], labels, line);

    let instruction = match statement.mnemonic {
        "li" => {
            arity(2)?;
            Instruction::Li {
                rt: reg(0)?,
                imm: parse_immediate(ops[1], line)?,
            }
        }
        "la" => {
            arity(2)?;
            Instruction::La {
                rt: reg(0)?,
                address: label(1)?,
            }
        }
        "lw" | "sw" => {
            arity(2)?;
            let rt = reg(0)?;
            let address = parse_address(ops[1], labels, line)?;
            if statement.mnemonic == "lw" {
                Instruction::Lw { rt, address }
            } else {
                Instruction::Sw { rt, address }
            }
        }
        "move" => {
            arity(2)?;
            Instruction::Move {
                rd: reg(0)?,
                rs: reg(1)?,
            }
        }
        "addu" | "subu" => {
            arity(3)?;
            let (rd, rs) = (reg(0)?, reg(1)?);
            // `subu $sp, $sp, 4` carries an immediate third operand
            let rt = match parse_register(ops[2], line) {
                Ok(rt) => rt,
                Err(_) => {
                    let imm = parse_immediate(ops[2], line)?;
                    return Ok(immediate_arith(statement.mnemonic, rd, rs, imm));
                }
            };
            if statement.mnemonic == "addu" {
                Instruction::Addu { rd, rs, rt }
            } else {
                Instruction::Subu { rd, rs, rt }
            }
        }
        "mult" | "div" => {
            arity(2)?;
            let (rs, rt) = (reg(0)?, reg(1)?);
            if statement.mnemonic == "mult" {
                Instruction::Mult { rs, rt }
            } else {
                Instruction::Div { rs, rt }
            }
        }
        "mflo" => {
            arity(1)?;
            Instruction::Mflo { rd: reg(0)? }
        }
        "mfhi" => {
            arity(1)?;
            Instruction::Mfhi { rd: reg(0)? }
        }
        "j" => {
            arity(1)?;
            Instruction::J { target: label(0)? }
        }
        "jal" => {
            arity(1)?;
            Instruction::Jal { target: label(0)? }
        }
        "jr" => {
            arity(1)?;
            Instruction::Jr { rs: reg(0)? }
        }
        "beq" | "bne" | "blt" | "bgt" | "ble" | "bge" => {
            arity(3)?;
            let cmp = match statement.mnemonic {
                "beq" => Comparison::Eq,
                "bne" => Comparison::Ne,
                "blt" => Comparison::Lt,
                "bgt" => Comparison::Gt,
                "ble" => Comparison::Le,
                _ => Comparison::Ge,
            };
            Instruction::Branch {
                cmp,
                rs: reg(0)?,
                rt: reg(1)?,
                target: label(2)?,
            }
        }
        "syscall" => {
            arity(0)?;
            Instruction::Syscall
        }
        other => {
            return Err(SimError::UnknownInstruction {
                line,
                mnemonic: other.to_string(),
            });
        }
    };
    Ok(instruction)
}

fn immediate_arith(mnemonic: &str, rd: Register, rs: Register, imm: i32) -> Instruction {
    let imm = if mnemonic == "subu" {
        imm.wrapping_neg()
    } else {
        imm
    };
    Instruction::Addiu { rd, rs, imm }
}

fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            '#' if !quoted => return &line[..i],
            _ => {}
        }
    }
    line
}

fn split_label(line: &str) -> Option<(&str, &str)> {
    let (label, rest) = line.split_once(':')?;
    let valid = !label.is_empty()
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    valid.then_some((label, rest))
}

fn parse_register(text: &str, line: usize) -> Result<Register, SimError> {
    let unknown = || SimError::UnknownRegister {
        line,
        name: text.to_string(),
    };
    let name = text.strip_prefix('$').ok_or_else(unknown)?;
    if let Ok(number) = name.parse::<usize>() {
        return if number < 32 { Ok(number) } else { Err(unknown()) };
    }
    REGISTER_NAMES
        .iter()
        .position(|candidate| *candidate == name)
        .ok_or_else(unknown)
}

fn parse_immediate(text: &str, line: usize) -> Result<i32, SimError> {
    let bad = || SimError::BadOperand {
        line,
        operand: text.to_string(),
    };
    let (negative, digits) = match text.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, text),
    };
    let magnitude = match digits.strip_prefix("0x") {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => digits.parse::<i64>(),
    }
    .map_err(|_| bad())?;
    let value = if negative { -magnitude } else { magnitude };
    // accept anything that fits in 32 bits, signed or unsigned
    if value < i64::from(i32::MIN) || value > i64::from(u32::MAX) {
        return Err(bad());
    }
    Ok(value as i32)
}

fn resolve_label(text: &str, labels: &HashMap<String, u32>, line: usize) -> Result<u32, SimError> {
    labels
        .get(text)
        .copied()
        .ok_or_else(|| SimError::UndefinedLabel {
            line,
            label: text.to_string(),
        })
}

/// `label`, `(reg)` or `offset(reg)`.
fn parse_address(
    text: &str,
    labels: &HashMap<String, u32>,
    line: usize,
) -> Result<Address, SimError> {
    let Some((offset, base)) = text.split_once('(') else {
        return resolve_label(text, labels, line).map(Address::Absolute);
    };
    let base = base.strip_suffix(')').ok_or_else(|| SimError::BadOperand {
        line,
        operand: text.to_string(),
    })?;
    let offset = if offset.trim().is_empty() {
        0
    } else {
        parse_immediate(offset.trim(), line)?
    };
    Ok(Address::Offset {
        offset,
        base: parse_register(base.trim(), line)?,
    })
}

fn parse_string(text: &str, line: usize) -> Result<Vec<u8>, SimError> {
    let bad = || SimError::BadOperand {
        line,
        operand: text.to_string(),
    };
    let body = text
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(bad)?;

    let mut bytes = Vec::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        let c = if c == '\\' {
            match chars.next().ok_or_else(bad)? {
                'n' => '\n',
                't' => '\t',
                '0' => '\0',
                '\\' => '\\',
                '"' => '"',
                _ => return Err(bad()),
            }
        } else {
            c
        };
        let mut buf = [0; 4];
        bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    }
    Ok(bytes)
}
