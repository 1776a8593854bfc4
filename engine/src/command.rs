use crate::state::EngineState;
use anyhow::Result;
use std::io::Write;

/// Conventional exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// Static description of a command, used by `help` and by completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandInfo {
    /// Canonical name, e.g. "echo".
    pub name: &'static str,
    /// Other names the command answers to.
    pub aliases: &'static [&'static str],
    /// One-line description shown by `help`.
    pub summary: &'static str,
}

impl CommandInfo {
    /// Whether `name` is the canonical name or one of the aliases.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(&name)
    }
}

/// Object-safe trait for any command that can be executed by the interpreter.
///
/// This is implemented by built-ins via a blanket impl.
pub trait ExecutableCommand {
    /// Executes the command, writing its output to `stdout`.
    fn execute(self: Box<Self>, stdout: &mut dyn Write, state: &mut EngineState)
    -> Result<ExitCode>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Describe the command this factory produces.
    fn info(&self) -> CommandInfo;

    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(
        &self,
        state: &EngineState,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>>;
}
