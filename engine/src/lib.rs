//! Bootstrap shell of an interactive command engine.
//!
//! The crate is built around one loop: print a prompt, flush it, let an
//! [`Interpreter`] consume one line of input, repeat until input runs out.
//! [`CommandLoop`] owns that cycle, [`EngineState`] is the per-process context
//! built once before the loop starts, and [`CommandInterpreter`] is the default
//! interpreter with a small set of built-in commands (`help`, `echo`, `cat`,
//! `clear`, `set`).
//!
//! Input and output go through a [`Console`]: [`StreamConsole`] for pipes and
//! in-memory buffers, [`EditorConsole`] for interactive terminals.

mod builtin;
pub mod command;
pub mod config;
pub mod console;
pub mod editor;
pub mod interpreter;
pub mod io_adapters;
mod lexer;
pub mod repl;
pub mod state;

pub use builtin::CLEAR_SCREEN;
pub use config::{Args, EngineConfig};
pub use console::{Console, StreamConsole};
pub use editor::{EditorConsole, EngineHelper};
pub use interpreter::{CommandInterpreter, InterpretError, Interpreter, Step};
pub use lexer::LexError;
pub use repl::{CommandLoop, FailurePolicy, LoopConfig, Outcome};
pub use state::{EngineState, InitError};
