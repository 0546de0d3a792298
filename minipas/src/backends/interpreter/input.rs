use std::collections::VecDeque;
use std::io::BufRead;

use crate::error::{CompileError, RuntimeError};

/// Supplies one integer per READLN.
pub trait InputSource {
    fn read_integer(&mut self) -> Result<i32, CompileError>;
}

impl InputSource for VecDeque<i32> {
    fn read_integer(&mut self) -> Result<i32, CompileError> {
        self.pop_front()
            .ok_or_else(|| RuntimeError::InputExhausted.into())
    }
}

/// Reads one integer per line from a buffered reader, skipping blank lines.
pub struct LineInput<R> {
    reader: R,
}

impl<R: BufRead> LineInput<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> InputSource for LineInput<R> {
    fn read_integer(&mut self) -> Result<i32, CompileError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(RuntimeError::InputExhausted.into());
            }
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            return text.parse().map_err(|_| {
                RuntimeError::InvalidInput {
                    text: text.to_string(),
                }
                .into()
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_yields_values_in_order() {
        let mut input = VecDeque::from([4, -2]);
        assert_eq!(input.read_integer().unwrap(), 4);
        assert_eq!(input.read_integer().unwrap(), -2);
        assert!(matches!(
            input.read_integer(),
            Err(CompileError::Runtime(RuntimeError::InputExhausted))
        ));
    }

    #[test]
    fn lines_are_trimmed_and_blank_lines_skipped() {
        let mut input = LineInput::new("  12 \n\n-7\n".as_bytes());
        assert_eq!(input.read_integer().unwrap(), 12);
        assert_eq!(input.read_integer().unwrap(), -7);
        assert!(matches!(
            input.read_integer(),
            Err(CompileError::Runtime(RuntimeError::InputExhausted))
        ));
    }

    #[test]
    fn non_numeric_line_is_rejected() {
        let mut input = LineInput::new("twelve\n".as_bytes());
        assert!(matches!(
            input.read_integer(),
            Err(CompileError::Runtime(RuntimeError::InvalidInput { text })) if text == "twelve"
        ));
    }
}
