//! Interactive prompts.
//!
//! Every question re-asks until the answer parses; closing stdin ends the
//! program with [`DemoError::InputClosed`] instead of looping forever.

use std::io::{self, BufRead, StdinLock, Stdout, Write};

use crate::error::{DemoError, DemoResult};
use crate::postprocess::outcome_space;

/// Largest supported random number width.
pub const MAX_BIT_LENGTH: u32 = 128;

/// Enhancement picked from the menu, before its parameter is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnhancementChoice {
    /// Use the n-th observed outcome.
    NthCount,
    /// XOR a random outcome with a custom value.
    Xor,
    /// Plain random outcome.
    None,
}

/// Line-oriented question/answer loop over any reader and writer.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<StdinLock<'static>, Stdout> {
    /// Prompter on the process's stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    /// Wrap a reader and a writer.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Recover the writer, e.g. to inspect what was printed.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Print one line.
    pub fn say(&mut self, line: &str) -> DemoResult<()> {
        writeln!(self.output, "{line}")?;
        Ok(())
    }

    /// Ask until `parse` accepts the answer. `parse` returns the complaint to
    /// print on rejection.
    pub fn ask<T>(
        &mut self,
        prompt: &str,
        parse: impl Fn(&str) -> Result<T, String>,
    ) -> DemoResult<T> {
        loop {
            write!(self.output, "{prompt}")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(DemoError::InputClosed);
            }
            match parse(line.trim()) {
                Ok(value) => return Ok(value),
                Err(complaint) => writeln!(self.output, "{complaint}")?,
            }
        }
    }

    /// Width of the random number.
    pub fn bit_length(&mut self) -> DemoResult<u32> {
        self.ask(
            "\nEnter the bit length for the random number (should be greater than 1, e.g., 32 or 64):\n ",
            parse_bit_length,
        )
    }

    /// Print the enhancement menu and read a choice.
    pub fn enhancement_choice(&mut self) -> DemoResult<EnhancementChoice> {
        self.say("\nEnhancements available:")?;
        self.say(" 1. Use n-th result from the counts list.")?;
        self.say(" 2. XOR with a custom value.")?;
        self.say(" 3. None (default).")?;
        self.ask("\nChoose an enhancement (1, 2, or 3): ", parse_enhancement_choice)
    }

    /// 1-based outcome index, bounded by the size of the outcome space.
    pub fn nth_index(&mut self, bit_length: u32) -> DemoResult<u128> {
        let space = outcome_space(bit_length);
        self.ask(
            &format!(
                "\n Enter a valid positive integer for the n-th result. Possible outcomes: {space}: "
            ),
            |answer| parse_nth_index(answer, bit_length),
        )
    }

    /// Value to XOR the drawn outcome with.
    pub fn xor_value(&mut self) -> DemoResult<u128> {
        self.ask(
            " Enter a valid positive integer to XOR with (the binary length of this number should match the specified bit length): ",
            parse_xor_value,
        )
    }

    /// Whether to skip the remote device.
    pub fn force_simulator(&mut self) -> DemoResult<bool> {
        self.ask(
            "\nForce to use simulator instead of QPU?:\n 0: No\n 1: Yes\n\nAnswer: ",
            parse_force_simulator,
        )
    }

    /// Number whose basis state is transformed.
    pub fn qft_number(&mut self) -> DemoResult<u64> {
        self.ask("Please enter a number: ", parse_qft_number)
    }
}

/// Strictly positive integer, as the menus accept it.
fn positive<T: std::str::FromStr + PartialOrd + Default>(answer: &str) -> Option<T> {
    answer.parse::<T>().ok().filter(|v| *v > T::default())
}

/// Parse a bit length in `2..=MAX_BIT_LENGTH`.
pub fn parse_bit_length(answer: &str) -> Result<u32, String> {
    match positive::<u32>(answer) {
        Some(bits) if bits > MAX_BIT_LENGTH => Err(format!(
            " Invalid input. The bit length can be at most {MAX_BIT_LENGTH}."
        )),
        Some(bits) if bits > 1 => Ok(bits),
        _ => Err(" Invalid input. Please enter a positive integer greater than 1.".into()),
    }
}

/// Parse a menu entry.
pub fn parse_enhancement_choice(answer: &str) -> Result<EnhancementChoice, String> {
    match answer {
        "1" => Ok(EnhancementChoice::NthCount),
        "2" => Ok(EnhancementChoice::Xor),
        "3" => Ok(EnhancementChoice::None),
        _ => Err(" Invalid enhancement choice. Please choose 1, 2, or 3.".into()),
    }
}

/// Parse an index in `1..=2^bit_length`.
pub fn parse_nth_index(answer: &str, bit_length: u32) -> Result<u128, String> {
    // 2^128 does not fit; every positive u128 is then in range.
    let max = 1u128.checked_shl(bit_length).unwrap_or(u128::MAX);
    match positive::<u128>(answer) {
        Some(n) if n <= max => Ok(n),
        _ => Err(format!(
            "  Invalid input. Please choose a number between 1 and {}.",
            outcome_space(bit_length)
        )),
    }
}

/// Parse a strictly positive XOR operand.
pub fn parse_xor_value(answer: &str) -> Result<u128, String> {
    positive::<u128>(answer).ok_or_else(|| " Invalid input. Please enter a positive integer.".into())
}

/// Parse the `0`/`1` simulator answer.
pub fn parse_force_simulator(answer: &str) -> Result<bool, String> {
    match answer {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(" Invalid input. Please enter 0 or 1".into()),
    }
}

/// Parse a non-negative integer for the QFT.
pub fn parse_qft_number(answer: &str) -> Result<u64, String> {
    answer
        .parse::<u64>()
        .map_err(|_| "That's not a valid number. Please try again.".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_ask_repeats_until_valid() {
        let mut p = prompter("abc\n1\n0\n17\n");
        assert_eq!(p.bit_length().unwrap(), 17);

        let printed = String::from_utf8(p.into_output()).unwrap();
        assert_eq!(
            printed
                .matches("Please enter a positive integer greater than 1.")
                .count(),
            3
        );
    }

    #[test]
    fn test_ask_reports_closed_input() {
        let mut p = prompter("x\n");
        assert!(matches!(p.force_simulator(), Err(DemoError::InputClosed)));
    }

    #[test]
    fn test_bit_length_bounds() {
        assert_eq!(parse_bit_length("2"), Ok(2));
        assert_eq!(parse_bit_length("128"), Ok(128));
        assert!(parse_bit_length("129").unwrap_err().contains("at most 128"));
        assert!(parse_bit_length("-4").is_err());
        assert!(parse_bit_length("").is_err());
    }

    #[test]
    fn test_enhancement_menu() {
        let mut p = prompter("4\n2\n");
        assert_eq!(p.enhancement_choice().unwrap(), EnhancementChoice::Xor);

        let printed = String::from_utf8(p.into_output()).unwrap();
        assert!(printed.contains(" 3. None (default)."));
        assert!(printed.contains("Invalid enhancement choice"));
    }

    #[test]
    fn test_nth_index_range() {
        assert_eq!(parse_nth_index("4", 2), Ok(4));
        assert_eq!(
            parse_nth_index("5", 2).unwrap_err(),
            "  Invalid input. Please choose a number between 1 and 4."
        );
        assert!(parse_nth_index("0", 2).is_err());
        assert_eq!(parse_nth_index(&u128::MAX.to_string(), 128), Ok(u128::MAX));
    }

    #[test]
    fn test_xor_and_simulator_answers() {
        assert_eq!(parse_xor_value("5"), Ok(5));
        assert!(parse_xor_value("0").is_err());
        assert_eq!(parse_force_simulator("1"), Ok(true));
        assert_eq!(parse_force_simulator("0"), Ok(false));
        assert!(parse_force_simulator("yes").is_err());
    }

    #[test]
    fn test_qft_number_rejects_negative() {
        assert_eq!(parse_qft_number("0"), Ok(0));
        assert_eq!(parse_qft_number("13"), Ok(13));
        assert!(parse_qft_number("-3").is_err());
        assert!(parse_qft_number("1.5").is_err());
    }
}
