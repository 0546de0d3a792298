//! A small MIPS32 simulator for the instruction subset emitted by the
//! `minipas` code generator.
//!
//! ```
//! let output = mips_sim::execute("main:\n\tli $a0, 5\n\tli $v0, 1\n\tsyscall\n\tli $v0, 10\n\tsyscall\n", std::iter::empty()).unwrap();
//! assert_eq!(output, "5");
//! ```

pub mod console;
pub mod cpu;
pub mod error;
pub mod program;

pub use cpu::Cpu;
pub use error::SimError;
pub use program::Program;

/// Assembles `source` and runs it to completion with the given READ_INT input.
pub fn execute(source: &str, input: impl IntoIterator<Item = i32>) -> Result<String, SimError> {
    let program = Program::assemble(source)?;
    Cpu::new(program).run(input)
}
