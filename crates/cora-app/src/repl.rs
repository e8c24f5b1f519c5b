//! Line parsing for the interactive session.

use std::path::PathBuf;

pub const HELP: &str = "\
Type a question to query the database, or one of:
  /good           confirm the last answer as known-good SQL
  /explain <q>    answer a question in natural language
  /suggest        show example questions
  /export <path>  save the transcript as JSON
  /help           show this help
  /quit           leave the session";

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Question(String),
    Good,
    Explain(String),
    Suggest,
    Export(PathBuf),
    Help,
    Quit,
    /// A slash command that is unknown or missing its argument.
    Invalid(String),
}

pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Question(line.to_string());
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };
    match (name, rest.is_empty()) {
        ("good", _) => Input::Good,
        ("suggest", _) => Input::Suggest,
        ("help", _) => Input::Help,
        ("quit" | "exit", _) => Input::Quit,
        ("explain", false) => Input::Explain(rest.to_string()),
        ("export", false) => Input::Export(PathBuf::from(rest)),
        ("explain" | "export", true) => Input::Invalid(format!("/{} needs an argument", name)),
        _ => Input::Invalid(format!("unknown command /{}", name)),
    }
}
