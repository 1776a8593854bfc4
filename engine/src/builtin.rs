use crate::command::{CommandFactory, CommandInfo, ExecutableCommand, ExitCode};
use crate::interpreter::Factory;
use crate::state::EngineState;
use anyhow::{Result, bail};
use argh::{EarlyExit, FromArgs};
use regex::Regex;
use std::io::Write;
use std::sync::LazyLock;

/// ANSI sequence that clears the screen and homes the cursor.
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

static VAR_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("variable name pattern is valid")
});

/// Built-in commands known to the engine at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "cat".
    fn name() -> &'static str;

    /// Other names the command answers to.
    fn aliases() -> &'static [&'static str] {
        &[]
    }

    /// One-line description for `help`.
    fn summary() -> &'static str;

    /// Executes the command using the provided output stream and engine state.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, state: &mut EngineState) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        state: &mut EngineState,
    ) -> Result<ExitCode> {
        T::execute(*self, stdout, state)
    }
}

/// Usage text or parse error produced by argh instead of a command.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        _state: &mut EngineState,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.output.trim_end())?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

fn parse_args<T: FromArgs + ExecutableCommand + 'static>(
    name: &str,
    args: &[&str],
) -> Box<dyn ExecutableCommand> {
    match T::from_args(&[name], args) {
        Ok(cmd) => Box::new(cmd),
        Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
            output,
            is_error: status.is_err(),
        }),
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn info(&self) -> CommandInfo {
        CommandInfo {
            name: T::name(),
            aliases: T::aliases(),
            summary: T::summary(),
        }
    }

    fn try_create(
        &self,
        _state: &EngineState,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if self.info().answers_to(name) {
            Some(parse_args::<T>(name, args))
        } else {
            None
        }
    }
}

#[derive(FromArgs)]
/// write the arguments to standard output, separated by spaces.
/// by default, a trailing newline is printed.
pub struct Echo {
    #[argh(switch, short = 'n')]
    /// do not output the trailing newline.
    pub no_newline: bool,

    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces.
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn summary() -> &'static str {
        "print the arguments"
    }

    fn execute(self, stdout: &mut dyn Write, _state: &mut EngineState) -> Result<ExitCode> {
        let s = self.args.join(" ");
        if self.no_newline {
            write!(stdout, "{}", s)?;
        } else {
            writeln!(stdout, "{}", s)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// print one or more sections of the loaded engine data.
pub struct Cat {
    #[argh(positional, greedy)]
    /// names of the sections to print, in order.
    pub sections: Vec<String>,
}

impl BuiltinCommand for Cat {
    fn name() -> &'static str {
        "cat"
    }

    fn summary() -> &'static str {
        "print one or more sections"
    }

    fn execute(self, stdout: &mut dyn Write, state: &mut EngineState) -> Result<ExitCode> {
        if self.sections.is_empty() {
            bail!("cat: missing section name (try 'help')");
        }
        for name in &self.sections {
            let Some(text) = state.section(name) else {
                bail!("cat: {}: no such section", name);
            };
            write!(stdout, "{}", text)?;
            if !text.ends_with('\n') {
                writeln!(stdout)?;
            }
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// clear the terminal screen.
pub struct Clear {}

impl BuiltinCommand for Clear {
    fn name() -> &'static str {
        "clear"
    }

    fn aliases() -> &'static [&'static str] {
        &["cls"]
    }

    fn summary() -> &'static str {
        "clear the screen"
    }

    fn execute(self, stdout: &mut dyn Write, _state: &mut EngineState) -> Result<ExitCode> {
        write!(stdout, "{}", CLEAR_SCREEN)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// set session variables, or list them when called without arguments.
pub struct Set {
    #[argh(positional, greedy)]
    /// assignments in the form NAME=VALUE.
    pub assignments: Vec<String>,
}

impl BuiltinCommand for Set {
    fn name() -> &'static str {
        "set"
    }

    fn summary() -> &'static str {
        "set or list session variables"
    }

    fn execute(self, stdout: &mut dyn Write, state: &mut EngineState) -> Result<ExitCode> {
        if self.assignments.is_empty() {
            for (name, value) in &state.vars {
                writeln!(stdout, "{}={}", name, value)?;
            }
            return Ok(0);
        }

        let mut parsed = Vec::with_capacity(self.assignments.len());
        for assignment in &self.assignments {
            let Some((name, value)) = assignment.split_once('=') else {
                bail!("set: expected NAME=VALUE, got '{}'", assignment);
            };
            if !VAR_NAME.is_match(name) {
                bail!("set: invalid variable name '{}'", name);
            }
            parsed.push((name.to_string(), value.to_string()));
        }
        // all-or-nothing: a bad assignment leaves the variables untouched
        for (name, value) in parsed {
            state.set_var(name, value);
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// list the available commands and sections.
pub struct HelpArgs {}

/// `help` needs the whole command table, so it is built by its own factory
/// rather than through [`Factory`].
pub(crate) struct Help {
    catalog: Vec<CommandInfo>,
}

impl Help {
    pub(crate) const INFO: CommandInfo = CommandInfo {
        name: "help",
        aliases: &[],
        summary: "list commands and sections",
    };
}

impl ExecutableCommand for Help {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        state: &mut EngineState,
    ) -> Result<ExitCode> {
        let mut catalog = self.catalog;
        catalog.sort_by_key(|info| info.name);
        let width = catalog.iter().map(|info| info.name.len()).max().unwrap_or(0);

        writeln!(stdout, "Available commands:")?;
        for info in &catalog {
            write!(stdout, "  {:width$}  {}", info.name, info.summary, width = width)?;
            if !info.aliases.is_empty() {
                write!(stdout, " (also: {})", info.aliases.join(", "))?;
            }
            writeln!(stdout)?;
        }

        let sections: Vec<&str> = state.section_names().collect();
        if sections.is_empty() {
            writeln!(stdout, "Sections: none loaded")?;
        } else {
            writeln!(stdout, "Sections: {}", sections.join(", "))?;
        }
        Ok(0)
    }
}

pub(crate) struct HelpFactory {
    catalog: Vec<CommandInfo>,
}

impl HelpFactory {
    /// `others` is the rest of the command table; `help` adds itself.
    pub(crate) fn new(others: &[CommandInfo]) -> Self {
        let mut catalog = others.to_vec();
        catalog.push(Help::INFO);
        Self { catalog }
    }
}

impl CommandFactory for HelpFactory {
    fn info(&self) -> CommandInfo {
        Help::INFO
    }

    fn try_create(
        &self,
        _state: &EngineState,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if !Help::INFO.answers_to(name) {
            return None;
        }
        Some(match HelpArgs::from_args(&[name], args) {
            Ok(HelpArgs {}) => Box::new(Help {
                catalog: self.catalog.clone(),
            }),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}
