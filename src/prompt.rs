//! Console prompting, kept behind a trait so interactive flows are testable.

use crate::errors::Result;
use std::io::{self, BufRead, Write};

pub trait Prompter {
    /// Prints `prompt` and returns the user's trimmed answer.
    fn read_line(&mut self, prompt: &str) -> Result<String>;
}

pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer.trim().to_string())
    }
}

/// Interprets an answer to a yes/no question. Empty input takes the default.
pub fn is_yes(answer: &str, default_yes: bool) -> bool {
    match answer.chars().next() {
        Some(c) => c.eq_ignore_ascii_case(&'y'),
        None => default_yes,
    }
}

/// Scripted prompter for tests: answers in order, panics when over-asked.
#[cfg(test)]
pub struct ScriptedPrompter {
    answers: std::collections::VecDeque<String>,
    pub asked: usize,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|s| s.to_string()).collect(),
            asked: 0,
        }
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        self.asked += 1;
        Ok(self
            .answers
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected prompt: {}", prompt)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_no_answers() {
        assert!(is_yes("y", false));
        assert!(is_yes("Yes", false));
        assert!(!is_yes("n", true));
        assert!(!is_yes("No thanks", true));
        assert!(is_yes("", true));
        assert!(!is_yes("", false));
    }
}
