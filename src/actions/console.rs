//! Operator consoles: where printed text goes and where answers come from.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::rc::Rc;

use tracing::debug;

use crate::error::{Result, TidyError};

/// Menu shown by the RSVP negotiator.
pub const RSVP_MENU: &str = "Yes (Y), No (N), Maybe (M), Details (D), Ignore (I) or Delete (X)";

/// A question put to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Question {
    /// A yes/no question; only `Y` counts as yes.
    Confirm(String),
    /// The six-way RSVP menu.
    Rsvp,
}

impl Question {
    pub fn confirm(text: impl Into<String>) -> Self {
        Self::Confirm(text.into())
    }

    /// The text shown to the operator.
    pub fn text(&self) -> &str {
        match self {
            Self::Confirm(text) => text,
            Self::Rsvp => RSVP_MENU,
        }
    }
}

/// The human end of the pipeline.
///
/// `ask` blocks until an answer is available. Answers are returned raw;
/// normalization is the caller's job.
pub trait Console {
    fn say(&mut self, text: &str) -> Result<()>;

    fn ask(&mut self, question: &Question) -> Result<String>;
}

/// Reads answers line by line from an input stream.
pub struct TerminalConsole<R, W> {
    input: R,
    output: W,
}

impl TerminalConsole<std::io::BufReader<std::io::Stdin>, std::io::Stdout> {
    /// A console bound to the process's stdin and stdout.
    ///
    /// Stdin is not held locked and nothing is buffered past the current
    /// line, so other readers (the OAuth code prompt) can share it.
    pub fn stdio() -> Self {
        Self::new(
            std::io::BufReader::with_capacity(1, std::io::stdin()),
            std::io::stdout(),
        )
    }
}

impl<R: BufRead, W: Write> TerminalConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Console for TerminalConsole<R, W> {
    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{text}")?;
        Ok(())
    }

    fn ask(&mut self, question: &Question) -> Result<String> {
        writeln!(self.output, "{}", question.text())?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(TidyError::InputClosed);
        }
        Ok(line.trim().to_string())
    }
}

/// How an [`UnattendedConsole`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnattendedMode {
    /// Yes to every confirmation; RSVP menus still go to the operator.
    Force,
    /// Yes to every confirmation; every RSVP is ignored.
    Skip,
}

/// Answers questions without reading input where its mode allows it.
pub struct UnattendedConsole<C> {
    mode: UnattendedMode,
    fallback: C,
}

impl<C: Console> UnattendedConsole<C> {
    /// `fallback` prints everything and answers what the mode leaves open.
    pub fn new(mode: UnattendedMode, fallback: C) -> Self {
        Self { mode, fallback }
    }

    fn canned(&self, question: &Question) -> Option<&'static str> {
        match (self.mode, question) {
            (_, Question::Confirm(_)) => Some("Y"),
            (UnattendedMode::Skip, Question::Rsvp) => Some("I"),
            (UnattendedMode::Force, Question::Rsvp) => None,
        }
    }
}

impl<C: Console> Console for UnattendedConsole<C> {
    fn say(&mut self, text: &str) -> Result<()> {
        self.fallback.say(text)
    }

    fn ask(&mut self, question: &Question) -> Result<String> {
        match self.canned(question) {
            Some(answer) => {
                debug!(question = question.text(), answer, "Answered automatically");
                self.fallback
                    .say(&format!("{} -> {answer}", question.text()))?;
                Ok(answer.to_string())
            }
            None => self.fallback.ask(question),
        }
    }
}

/// One line of console traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    Said(String),
    Asked(String),
}

/// Shared view of everything a [`ScriptedConsole`] printed and asked.
#[derive(Debug, Clone, Default)]
pub struct Transcript(Rc<RefCell<Vec<Exchange>>>);

impl Transcript {
    fn push(&self, exchange: Exchange) {
        self.0.borrow_mut().push(exchange);
    }

    /// Texts of every question asked, in order.
    pub fn asked(&self) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Exchange::Asked(q) => Some(q.clone()),
                Exchange::Said(_) => None,
            })
            .collect()
    }

    /// Every printed line, in order.
    pub fn said(&self) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Exchange::Said(s) => Some(s.clone()),
                Exchange::Asked(_) => None,
            })
            .collect()
    }
}

/// Replays a fixed list of answers.
///
/// Once the script runs dry every further question fails with
/// [`TidyError::InputClosed`], the same as a closed terminal.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    answers: VecDeque<String>,
    transcript: Transcript,
}

impl ScriptedConsole {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            transcript: Transcript::default(),
        }
    }

    /// A handle that stays readable after the console is moved into a sink.
    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }
}

impl Console for ScriptedConsole {
    fn say(&mut self, text: &str) -> Result<()> {
        self.transcript.push(Exchange::Said(text.to_string()));
        Ok(())
    }

    fn ask(&mut self, question: &Question) -> Result<String> {
        self.transcript
            .push(Exchange::Asked(question.text().to_string()));
        self.answers.pop_front().ok_or(TidyError::InputClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_reads_one_line() {
        let input = std::io::Cursor::new(b"  y \nsecond\n".to_vec());
        let mut output = Vec::new();
        {
            let mut console = TerminalConsole::new(input, &mut output);
            let answer = console.ask(&Question::confirm("Delete?")).unwrap();
            assert_eq!(answer, "y");
        }
        assert_eq!(String::from_utf8(output).unwrap(), "Delete?\n");
    }

    #[test]
    fn test_terminal_eof_is_input_closed() {
        let input = std::io::Cursor::new(Vec::new());
        let mut console = TerminalConsole::new(input, Vec::new());
        assert!(matches!(
            console.ask(&Question::Rsvp),
            Err(TidyError::InputClosed)
        ));
    }

    #[test]
    fn test_skip_mode_answers_everything() {
        let mut console = UnattendedConsole::new(UnattendedMode::Skip, ScriptedConsole::default());
        assert_eq!(console.ask(&Question::confirm("Delete?")).unwrap(), "Y");
        assert_eq!(console.ask(&Question::Rsvp).unwrap(), "I");
    }

    #[test]
    fn test_force_mode_delegates_rsvp() {
        let script = ScriptedConsole::new(["m"]);
        let transcript = script.transcript();
        let mut console = UnattendedConsole::new(UnattendedMode::Force, script);
        assert_eq!(console.ask(&Question::confirm("Delete?")).unwrap(), "Y");
        assert_eq!(console.ask(&Question::Rsvp).unwrap(), "m");
        assert_eq!(transcript.asked(), vec![RSVP_MENU.to_string()]);
        assert_eq!(transcript.said(), vec!["Delete? -> Y".to_string()]);
    }

    #[test]
    fn test_scripted_runs_dry() {
        let mut console = ScriptedConsole::new(["Y"]);
        assert_eq!(console.ask(&Question::Rsvp).unwrap(), "Y");
        assert!(matches!(
            console.ask(&Question::Rsvp),
            Err(TidyError::InputClosed)
        ));
        assert_eq!(console.transcript().asked().len(), 2);
    }
}
