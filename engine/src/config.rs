use crate::repl::{DEFAULT_PROMPT, FailurePolicy, LoopConfig};
use argh::FromArgs;
use std::path::PathBuf;

#[derive(FromArgs, Debug, PartialEq)]
/// Portfolio Engine: prompt, read a command, run it, repeat until end of input.
pub struct Args {
    #[argh(option)]
    /// path to a JSON file whose "sections" object feeds the `cat` command.
    pub data: Option<PathBuf>,

    #[argh(option)]
    /// prompt printed before each line of input (default "> ").
    pub prompt: Option<String>,

    #[argh(switch)]
    /// end the session on the first failed command instead of continuing.
    pub fail_fast: bool,

    #[argh(switch)]
    /// read plain lines from stdin even when it is a terminal.
    pub plain: bool,

    #[argh(switch, short = 'v')]
    /// log debug events to stderr (RUST_LOG takes precedence).
    pub verbose: bool,
}

/// How input is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleKind {
    /// Line editor on a terminal, plain streams otherwise.
    Auto,
    /// Always plain streams.
    Plain,
}

/// Resolved engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub data: Option<PathBuf>,
    pub loop_config: LoopConfig,
    pub console: ConsoleKind,
    pub verbose: bool,
}

impl EngineConfig {
    /// Whether to use the interactive line editor for the given stdin.
    pub fn use_editor(&self, stdin_is_terminal: bool) -> bool {
        self.console == ConsoleKind::Auto && stdin_is_terminal
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose { "debug" } else { "warn" }
    }
}

impl From<Args> for EngineConfig {
    fn from(args: Args) -> Self {
        let on_failure = if args.fail_fast {
            FailurePolicy::Abort
        } else {
            FailurePolicy::Continue
        };
        Self {
            data: args.data,
            loop_config: LoopConfig {
                prompt: args.prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
                on_failure,
            },
            console: if args.plain {
                ConsoleKind::Plain
            } else {
                ConsoleKind::Auto
            },
            verbose: args.verbose,
        }
    }
}
