//! Terminal confirmations for the CLI.

use std::io::{self, BufRead, Write};

use crate::orchestrator::Confirm;

/// Asks on `output` and reads a `y`/`yes` answer from `input`.
///
/// Anything else, including EOF or a read error, counts as "no".
pub struct PromptConfirm<I, O> {
    input: I,
    output: O,
}

impl<I: BufRead, O: Write> PromptConfirm<I, O> {
    pub fn new(input: I, output: O) -> Self {
        Self { input, output }
    }
}

impl PromptConfirm<io::StdinLock<'static>, io::Stderr> {
    /// Prompt on stderr so stdout stays clean for reports.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<I: BufRead, O: Write> Confirm for PromptConfirm<I, O> {
    fn confirm(&mut self, prompt: &str) -> bool {
        if write!(self.output, "{prompt} [y/N] ").and_then(|()| self.output.flush()).is_err() {
            return false;
        }
        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(_) => false,
        }
    }
}

/// Fixed answer for non-interactive runs (`--yes`, `--no-build`).
#[derive(Debug, Clone, Copy)]
pub struct FixedConfirm(pub bool);

impl Confirm for FixedConfirm {
    fn confirm(&mut self, _prompt: &str) -> bool {
        self.0
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask(input: &str) -> (bool, String) {
        let mut out = Vec::new();
        let answer = PromptConfirm::new(input.as_bytes(), &mut out).confirm("Merge 'feature'?");
        (answer, String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn yes_answers_confirm() {
        assert!(ask("y\n").0);
        assert!(ask("YES\n").0);
    }

    #[test]
    fn anything_else_declines() {
        assert!(!ask("n\n").0);
        assert!(!ask("\n").0);
        assert!(!ask("").0);
        assert!(!ask("yep\n").0);
    }

    #[test]
    fn prompt_is_written_with_default_hint() {
        let (_, shown) = ask("n\n");
        assert_eq!(shown, "Merge 'feature'? [y/N] ");
    }
}
