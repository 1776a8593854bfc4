use crate::console::Console;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};
use std::io::{self, Write};
use tracing::debug;

/// Completion source: command names for the first word, section names after it.
pub struct EngineHelper {
    commands: Vec<String>,
    sections: Vec<String>,
}

impl EngineHelper {
    pub fn new(mut commands: Vec<String>, sections: Vec<String>) -> Self {
        commands.sort();
        commands.dedup();
        Self { commands, sections }
    }

    /// Start of the word under the cursor and every known name it prefixes.
    fn candidates<'a>(&'a self, line: &'a str) -> (usize, &'a str, Vec<&'a str>) {
        // split on any whitespace, as the lexer does
        let start = line
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map_or(0, |(i, c)| i + c.len_utf8());
        let word = &line[start..];
        let source = if line[..start].trim().is_empty() {
            &self.commands
        } else {
            &self.sections
        };
        let matches = source
            .iter()
            .map(String::as_str)
            .filter(|name| name.starts_with(word))
            .collect();
        (start, word, matches)
    }

    /// Remaining characters of the first name extending the last word, if any.
    fn suggestion(&self, line: &str) -> Option<String> {
        let (_, word, matches) = self.candidates(line);
        if word.is_empty() {
            return None;
        }
        matches
            .into_iter()
            .find(|name| *name != word)
            .map(|name| name[word.len()..].to_string())
    }
}

impl Completer for EngineHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, _, matches) = self.candidates(&line[..pos]);
        let pairs = matches
            .into_iter()
            .map(|name| Pair {
                display: name.to_string(),
                replacement: name.to_string(),
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for EngineHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        self.suggestion(line)
    }
}

impl Highlighter for EngineHelper {}

impl Validator for EngineHelper {}

impl Helper for EngineHelper {}

/// Interactive console backed by a `rustyline` editor with history and completion.
pub struct EditorConsole {
    editor: Editor<EngineHelper, DefaultHistory>,
    prompt: String,
    stdout: io::Stdout,
    stderr: io::Stderr,
}

impl EditorConsole {
    pub fn new(helper: EngineHelper) -> rustyline::Result<Self> {
        let config = Config::builder()
            .completion_type(CompletionType::List)
            .auto_add_history(false)
            .build();
        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(helper));
        Ok(Self {
            editor,
            prompt: String::new(),
            stdout: io::stdout(),
            stderr: io::stderr(),
        })
    }
}

impl Console for EditorConsole {
    fn write_prompt(&mut self, prompt: &str) -> io::Result<()> {
        // rustyline draws the prompt itself; pending command output goes first
        self.stdout.flush()?;
        self.prompt.clear();
        self.prompt.push_str(prompt);
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        match self.editor.readline(&self.prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) => {
                debug!("interrupted, discarding current line");
                Ok(Some(String::new()))
            }
            Err(ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Io(err)) => Err(err),
            Err(err) => Err(io::Error::other(err.to_string())),
        }
    }

    fn output(&mut self) -> &mut dyn Write {
        &mut self.stdout
    }

    fn error(&mut self) -> &mut dyn Write {
        &mut self.stderr
    }
}
