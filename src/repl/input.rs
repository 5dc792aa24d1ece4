//! Input handler for the question loop using rustyline
//!
//! Provides readline editing with persistent history.

use rustyline::error::ReadlineError;
use rustyline::history::History;
use rustyline::DefaultEditor;
use std::path::PathBuf;

use crate::errors::{RagError, Result};

pub const DEFAULT_PROMPT: &str = "question> ";

/// What the user typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    Question(String),
    Blank,
    Exit,
}

impl UserInput {
    /// Classify a raw line; `exit` and `quit` end the session in any case
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            UserInput::Blank
        } else if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            UserInput::Exit
        } else {
            UserInput::Question(trimmed.to_string())
        }
    }
}

/// Input handler managing the readline interface and history
pub struct InputHandler {
    editor: DefaultEditor,
    history_path: Option<PathBuf>,
    prompt: String,
}

impl InputHandler {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().map_err(readline_error)?;

        Ok(InputHandler {
            editor,
            history_path: None,
            prompt: DEFAULT_PROMPT.to_string(),
        })
    }

    /// Create input handler with persistent history
    pub fn with_history(history_file: PathBuf) -> Result<Self> {
        let mut editor = DefaultEditor::new().map_err(readline_error)?;

        if history_file.exists() {
            let _ = editor.load_history(&history_file);
        }

        Ok(InputHandler {
            editor,
            history_path: Some(history_file),
            prompt: DEFAULT_PROMPT.to_string(),
        })
    }

    pub fn set_prompt(&mut self, prompt: String) {
        self.prompt = prompt;
    }

    /// Read one line
    ///
    /// Ctrl-D and Ctrl-C both end the session.
    pub fn read_input(&mut self) -> Result<UserInput> {
        match self.editor.readline(&self.prompt) {
            Ok(line) => {
                let input = UserInput::parse(&line);
                if let UserInput::Question(question) = &input {
                    let _ = self.editor.add_history_entry(question.as_str());
                }
                Ok(input)
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(UserInput::Exit),
            Err(err) => Err(readline_error(err)),
        }
    }

    /// Save history to disk
    pub fn save_history(&mut self) -> Result<()> {
        if let Some(ref path) = self.history_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            self.editor.save_history(path).map_err(readline_error)?;
        }
        Ok(())
    }

    pub fn history_len(&self) -> usize {
        self.editor.history().len()
    }
}

fn readline_error(err: ReadlineError) -> RagError {
    match err {
        ReadlineError::Io(e) => RagError::Io(e),
        other => RagError::Generic(format!("Readline error: {}", other)),
    }
}
