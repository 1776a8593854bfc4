use crate::builtin::HelpFactory;
use crate::command::{CommandFactory, CommandInfo, ExitCode};
use crate::console::Console;
use crate::lexer::{self, LexError, Word, WordPart};
use crate::state::EngineState;
use std::io::{self, Write};
use tracing::debug;

/// Exit code recorded in `$?` when a line can't be split into words.
const SYNTAX_ERROR_CODE: ExitCode = 2;
/// Exit code recorded in `$?` when no factory knows the command.
const NOT_FOUND_CODE: ExitCode = 127;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports the built-in commands defined in this crate.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Result of one interpreter step that consumed input successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// One unit of input was consumed and acted on.
    Handled(ExitCode),
    /// The input stream is closed.
    EndOfInput,
}

/// Why a step failed.
#[derive(Debug, thiserror::Error)]
pub enum InterpretError {
    #[error("syntax error: {0}")]
    Syntax(#[from] LexError),
    #[error("unreadable input line: {0}")]
    Encoding(io::Error),
    #[error("{0}: command not found")]
    UnknownCommand(String),
    #[error("{0:#}")]
    Command(anyhow::Error),
    #[error("console I/O failed: {0}")]
    Io(#[from] io::Error),
}

impl InterpretError {
    /// Fatal errors leave the console unusable; the session can't go on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// Consumes and acts on one unit of input per call.
///
/// This is the only thing the command loop knows about command execution.
pub trait Interpreter {
    fn step(
        &mut self,
        console: &mut dyn Console,
        state: &mut EngineState,
    ) -> Result<Step, InterpretError>;
}

/// Line-oriented interpreter that dispatches words to built-in commands.
///
/// The interpreter keeps a list of [`CommandFactory`] objects that are queried
/// to create commands by name. See [`Default`] for the commands included out of
/// the box. `help` is always registered and lists every other command.
///
/// Example
/// ```
/// use portfolio_engine::{CommandInterpreter, EngineState};
/// let mut interp = CommandInterpreter::default();
/// let mut state = EngineState::default();
/// let mut out = Vec::new();
/// let code = interp.execute_line("echo hello world", &mut out, &mut state).unwrap();
/// assert_eq!(code, 0);
/// assert_eq!(out, b"hello world\n");
/// ```
pub struct CommandInterpreter {
    commands: Vec<Box<dyn CommandFactory>>,
}

impl CommandInterpreter {
    /// Create an interpreter with a custom set of command factories plus `help`.
    pub fn new(mut commands: Vec<Box<dyn CommandFactory>>) -> Self {
        let infos: Vec<CommandInfo> = commands.iter().map(|factory| factory.info()).collect();
        commands.push(Box::new(HelpFactory::new(&infos)));
        Self { commands }
    }

    /// Every registered command, `help` included.
    pub fn catalog(&self) -> Vec<CommandInfo> {
        self.commands.iter().map(|factory| factory.info()).collect()
    }

    /// Every name a command can be invoked by, aliases included.
    pub fn command_names(&self) -> Vec<String> {
        self.catalog()
            .iter()
            .flat_map(|info| std::iter::once(info.name).chain(info.aliases.iter().copied()))
            .map(str::to_string)
            .collect()
    }

    /// Split, expand and run a single line, writing command output to `stdout`.
    ///
    /// A blank line does nothing and returns 0. `state.last_status` is updated for
    /// every non-blank line, including failed ones.
    pub fn execute_line(
        &mut self,
        line: &str,
        stdout: &mut dyn Write,
        state: &mut EngineState,
    ) -> Result<ExitCode, InterpretError> {
        let words = match lexer::split_into_words(line) {
            Ok(words) => words,
            Err(err) => {
                state.last_status = SYNTAX_ERROR_CODE;
                return Err(err.into());
            }
        };
        let Some((first, rest)) = words.split_first() else {
            return Ok(0);
        };

        let name = self.word_to_string(first, state);
        let args: Vec<String> = rest
            .iter()
            .map(|word| self.word_to_string(word, state))
            .collect();
        let args_ref: Vec<&str> = args.iter().map(|s| s.as_str()).collect();

        let Some(cmd) = self
            .commands
            .iter()
            .find_map(|factory| factory.try_create(state, &name, &args_ref))
        else {
            state.last_status = NOT_FOUND_CODE;
            return Err(InterpretError::UnknownCommand(name));
        };

        state.commands_run += 1;
        debug!(command = %name, args = ?args, "dispatching");
        match cmd.execute(stdout, state) {
            Ok(code) => {
                state.last_status = code;
                Ok(code)
            }
            Err(err) => {
                state.last_status = 1;
                // a write error here means the console output is gone
                match err.downcast::<io::Error>() {
                    Ok(io_err) => Err(InterpretError::Io(io_err)),
                    Err(err) => Err(InterpretError::Command(err)),
                }
            }
        }
    }

    /// Convert a word to a string, substituting session variables.
    ///
    /// Unset variables expand to the empty string.
    fn word_to_string(&self, word: &Word, state: &EngineState) -> String {
        let mut result = String::new();
        for part in word {
            match part {
                WordPart::Literal(text) => result.push_str(text),
                WordPart::Param(name) => {
                    if let Some(value) = state.get_var(name) {
                        result.push_str(&value);
                    }
                }
            }
        }
        result
    }
}

impl Interpreter for CommandInterpreter {
    fn step(
        &mut self,
        console: &mut dyn Console,
        state: &mut EngineState,
    ) -> Result<Step, InterpretError> {
        let line = match console.read_line() {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(Step::EndOfInput),
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                state.last_status = SYNTAX_ERROR_CODE;
                return Err(InterpretError::Encoding(err));
            }
            Err(err) => return Err(err.into()),
        };
        let code = self.execute_line(&line, console.output(), state)?;
        Ok(Step::Handled(code))
    }
}

impl Default for CommandInterpreter {
    /// Create an interpreter with the default set of commands:
    /// `echo`, `cat`, `clear` (`cls`), `set` and `help`.
    fn default() -> Self {
        use crate::builtin::*;
        Self::new(vec![
            Box::new(Factory::<Echo>::default()),
            Box::new(Factory::<Cat>::default()),
            Box::new(Factory::<Clear>::default()),
            Box::new(Factory::<Set>::default()),
        ])
    }
}
