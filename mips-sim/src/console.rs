use std::collections::VecDeque;

use crate::error::SimError;

/// Syscall-facing I/O: queued integers in, captured text out.
#[derive(Debug, Default)]
pub struct Console {
    output: String,
    input: VecDeque<i32>,
}

impl Console {
    pub fn new(input: impl IntoIterator<Item = i32>) -> Self {
        Self {
            output: String::new(),
            input: input.into_iter().collect(),
        }
    }

    /// syscall 1
    pub fn print_int(&mut self, value: i32) {
        self.output.push_str(&value.to_string());
    }

    /// syscall 4
    pub fn print_str(&mut self, text: &str) {
        self.output.push_str(text);
    }

    /// syscall 5
    pub fn read_int(&mut self) -> Result<i32, SimError> {
        self.input.pop_front().ok_or(SimError::InputExhausted)
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn into_output(self) -> String {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_prints_in_order() {
        let mut console = Console::default();
        console.print_int(-3);
        console.print_str("\n");
        console.print_int(7);
        assert_eq!(console.output(), "-3\n7");
    }

    #[test]
    fn reads_until_exhausted() {
        let mut console = Console::new([5]);
        assert_eq!(console.read_int(), Ok(5));
        assert_eq!(console.read_int(), Err(SimError::InputExhausted));
    }
}
