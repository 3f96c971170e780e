//! Operator interaction.
//!
//! Phases only ask questions at their entry points: reuse an artifact,
//! provide custom principles, answer a clarification. Every prompt blocks
//! until answered or interrupted.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Errors from an operator prompt.
#[derive(Debug, thiserror::Error)]
pub enum OperatorError {
    /// Ctrl-C or end of input
    #[error("Interrupted by operator")]
    Interrupted,

    /// Terminal I/O failed
    #[error("Operator I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<OperatorError> for crate::error::WorkflowError {
    fn from(error: OperatorError) -> Self {
        match error {
            OperatorError::Interrupted => Self::Cancelled,
            OperatorError::Io(e) => Self::store("<stdin>", e),
        }
    }
}

/// Source of answers to workflow questions.
pub trait Operator {
    /// Ask a yes/no question.
    fn ask_yes_no(&self, prompt: &str, default: bool) -> Result<bool, OperatorError>;

    /// Ask for free text; an empty answer yields `default`.
    fn ask_text(&self, prompt: &str, default: &str) -> Result<String, OperatorError>;

    /// Whether the operator asked to stop the run.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Interactive operator on stdin/stdout.
#[derive(Debug, Clone, Default)]
pub struct ConsoleOperator {
    cancelled: Arc<AtomicBool>,
}

impl ConsoleOperator {
    /// Create an operator with its own cancellation flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Share a cancellation flag, typically set from a Ctrl-C handler.
    pub fn with_cancel_flag(flag: Arc<AtomicBool>) -> Self {
        Self { cancelled: flag }
    }

    fn read_line(&self, prompt: &str) -> Result<String, OperatorError> {
        if self.is_cancelled() {
            return Err(OperatorError::Interrupted);
        }

        let mut stdout = io::stdout();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;

        if read == 0 || self.is_cancelled() {
            return Err(OperatorError::Interrupted);
        }
        Ok(line.trim().to_string())
    }
}

impl Operator for ConsoleOperator {
    fn ask_yes_no(&self, prompt: &str, default: bool) -> Result<bool, OperatorError> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let answer = self.read_line(&format!("{prompt} {hint} "))?;
            match answer.to_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" | "o" | "oui" => return Ok(true),
                "n" | "no" | "non" => return Ok(false),
                _ => println!("Please answer y or n."),
            }
        }
    }

    fn ask_text(&self, prompt: &str, default: &str) -> Result<String, OperatorError> {
        let label =
            if default.is_empty() { format!("{prompt}: ") } else { format!("{prompt} ({default}): ") };
        let answer = self.read_line(&label)?;
        Ok(if answer.is_empty() { default.to_string() } else { answer })
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Non-interactive operator with a fixed yes/no answer.
///
/// Text questions always take their default.
#[derive(Debug, Clone, Copy)]
pub struct AutoOperator {
    answer: bool,
}

impl AutoOperator {
    /// Answer yes to everything.
    pub fn yes() -> Self {
        Self { answer: true }
    }

    /// Answer no to everything.
    pub fn no() -> Self {
        Self { answer: false }
    }
}

impl Operator for AutoOperator {
    fn ask_yes_no(&self, prompt: &str, _default: bool) -> Result<bool, OperatorError> {
        tracing::debug!(prompt, answer = self.answer, "Auto-answered");
        Ok(self.answer)
    }

    fn ask_text(&self, _prompt: &str, default: &str) -> Result<String, OperatorError> {
        Ok(default.to_string())
    }
}

/// Scripted answer for [`ScriptedOperator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Text(String),
    Interrupt,
}

/// Operator that replays a fixed script of answers.
///
/// When the script runs out, yes/no questions take their default and text
/// questions their default text.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    answers: Mutex<VecDeque<Answer>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedOperator {
    /// Create from a list of answers.
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self { answers: Mutex::new(answers.into_iter().collect()), asked: Mutex::new(Vec::new()) }
    }

    /// Prompts asked so far.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().clone()
    }

    fn next(&self, prompt: &str) -> Option<Answer> {
        self.asked.lock().push(prompt.to_string());
        self.answers.lock().pop_front()
    }
}

impl Operator for ScriptedOperator {
    fn ask_yes_no(&self, prompt: &str, default: bool) -> Result<bool, OperatorError> {
        match self.next(prompt) {
            Some(Answer::Yes) => Ok(true),
            Some(Answer::No) => Ok(false),
            Some(Answer::Interrupt) => Err(OperatorError::Interrupted),
            Some(Answer::Text(text)) => Ok(matches!(text.to_lowercase().as_str(), "y" | "yes")),
            None => Ok(default),
        }
    }

    fn ask_text(&self, prompt: &str, default: &str) -> Result<String, OperatorError> {
        match self.next(prompt) {
            Some(Answer::Text(text)) => Ok(text),
            Some(Answer::Interrupt) => Err(OperatorError::Interrupted),
            Some(Answer::Yes | Answer::No) | None => Ok(default.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_operator() {
        assert!(AutoOperator::yes().ask_yes_no("reuse?", false).unwrap());
        assert!(!AutoOperator::no().ask_yes_no("reuse?", true).unwrap());
        assert_eq!(AutoOperator::yes().ask_text("answer", "skip").unwrap(), "skip");
    }

    #[test]
    fn test_scripted_operator_replays_in_order() {
        let op = ScriptedOperator::new([Answer::Yes, Answer::Text("Admins only".into())]);
        assert!(op.ask_yes_no("first", false).unwrap());
        assert_eq!(op.ask_text("second", "skip").unwrap(), "Admins only");
        assert!(!op.ask_yes_no("third", false).unwrap());
        assert_eq!(op.asked(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_scripted_interrupt() {
        let op = ScriptedOperator::new([Answer::Interrupt]);
        assert!(matches!(op.ask_yes_no("reuse?", true), Err(OperatorError::Interrupted)));
    }

    #[test]
    fn test_console_operator_cancel_flag() {
        let flag = Arc::new(AtomicBool::new(true));
        let op = ConsoleOperator::with_cancel_flag(flag);
        assert!(op.is_cancelled());
        assert!(matches!(op.ask_text("anything", ""), Err(OperatorError::Interrupted)));
    }
}
