//! The interactive operator menu.

use std::io::{BufRead, Write};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write { count: usize },
}

/// Shows the menu on `output` and reads the operator's choice from `input`.
///
/// Choosing write prompts for the number of messages. Anything that is not
/// a valid choice or count is [`Error::InvalidInput`].
pub fn prompt_operation<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<Operation> {
    writeln!(output, "Select operation:")?;
    writeln!(output, "1. Read events")?;
    writeln!(output, "2. Write test events")?;
    output.flush()?;

    match parse_choice(&read_line(input)?)? {
        Choice::Read => Ok(Operation::Read),
        Choice::Write => {
            writeln!(output, "Enter number of test messages to send:")?;
            output.flush()?;
            let count = parse_count(&read_line(input)?)?;
            Ok(Operation::Write { count })
        }
    }
}

enum Choice {
    Read,
    Write,
}

fn parse_choice(line: &str) -> Result<Choice> {
    match line.trim() {
        "1" => Ok(Choice::Read),
        "2" => Ok(Choice::Write),
        other => Err(Error::InvalidInput(format!("unknown operation '{}'", other))),
    }
}

/// Parses a non-negative message count.
pub fn parse_count(line: &str) -> Result<usize> {
    let text = line.trim();
    text.parse()
        .map_err(|_| Error::InvalidInput(format!("'{}' is not a valid message count", text)))
}

fn read_line<R: BufRead>(input: &mut R) -> Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(Error::InvalidInput("no input".to_string()));
    }
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompt(input: &str) -> (Result<Operation>, String) {
        let mut output = Vec::new();
        let result = prompt_operation(&mut Cursor::new(input), &mut output);
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_read_choice() {
        let (result, output) = prompt("1\n");
        assert_eq!(result.unwrap(), Operation::Read);
        assert!(output.starts_with("Select operation:\n1. Read events\n2. Write test events\n"));
        assert!(!output.contains("Enter number"));
    }

    #[test]
    fn test_write_choice_with_count() {
        let (result, output) = prompt("2\n 25 \n");
        assert_eq!(result.unwrap(), Operation::Write { count: 25 });
        assert!(output.ends_with("Enter number of test messages to send:\n"));
    }

    #[test]
    fn test_non_numeric_count_is_invalid() {
        let (result, _) = prompt("2\nabc\n");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_negative_count_is_invalid() {
        assert!(matches!(parse_count("-3"), Err(Error::InvalidInput(_))));
        assert_eq!(parse_count("0").unwrap(), 0);
    }

    #[test]
    fn test_unknown_choice_and_eof() {
        assert!(matches!(prompt("3\n").0, Err(Error::InvalidInput(_))));
        assert!(matches!(prompt("").0, Err(Error::InvalidInput(_))));
        assert!(matches!(prompt("2\n").0, Err(Error::InvalidInput(_))));
    }
}
