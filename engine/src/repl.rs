//! The command loop: banner, then prompt / flush / interpret until the session ends.

use crate::console::Console;
use crate::interpreter::{InterpretError, Interpreter, Step};
use crate::state::EngineState;
use std::io::{self, Write};
use tracing::{debug, error, info, warn};

/// Identification line printed once at startup.
pub const BANNER: &str = concat!("Portfolio Engine v", env!("CARGO_PKG_VERSION"));
/// Usage hint printed right after the banner.
pub const USAGE_HINT: &str = "Type 'help' for a list of commands.";
/// Printed after the loop ends.
pub const SHUTDOWN_MESSAGE: &str = "Exiting.";
pub const DEFAULT_PROMPT: &str = "> ";

/// What to do when the interpreter reports a recoverable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Print a diagnostic and keep reading input.
    #[default]
    Continue,
    /// End the session as if the failure were fatal.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    pub prompt: String,
    pub on_failure: FailurePolicy,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            on_failure: FailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    EndOfInput,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Running,
    Ended(EndReason),
}

/// How a session finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Input was exhausted.
    Graceful,
    /// A fatal failure ended the session.
    Failed,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Graceful => 0,
            Outcome::Failed => 1,
        }
    }
}

/// Drives one interactive session.
///
/// The loop owns no input itself: each iteration prints the prompt, flushes it,
/// and hands control to the [`Interpreter`], which reads and acts on one line.
/// The session ends only when the interpreter reports end of input or a
/// failure the configured [`FailurePolicy`] treats as fatal.
pub struct CommandLoop {
    config: LoopConfig,
    iterations: u64,
}

impl CommandLoop {
    pub fn new(config: LoopConfig) -> Self {
        Self {
            config,
            iterations: 0,
        }
    }

    /// Number of interpreter steps taken so far.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Run the session to completion. `state` must already be initialized.
    pub fn run(
        &mut self,
        console: &mut dyn Console,
        interpreter: &mut dyn Interpreter,
        state: &mut EngineState,
    ) -> Outcome {
        info!("session started");
        let mut loop_state = match print_banner(console) {
            Ok(()) => LoopState::Running,
            Err(err) => self.fail(console, InterpretError::Io(err)),
        };

        let reason = loop {
            match loop_state {
                LoopState::Running => loop_state = self.iterate(console, interpreter, state),
                LoopState::Ended(reason) => break reason,
            }
        };
        if let Err(err) = write_shutdown(console) {
            error!(%err, "can't write shutdown message");
        }
        info!(iterations = self.iterations, ?reason, "session ended");

        match reason {
            EndReason::EndOfInput => Outcome::Graceful,
            EndReason::Fatal => Outcome::Failed,
        }
    }

    fn iterate(
        &mut self,
        console: &mut dyn Console,
        interpreter: &mut dyn Interpreter,
        state: &mut EngineState,
    ) -> LoopState {
        if let Err(err) = console.write_prompt(&self.config.prompt) {
            return self.fail(console, InterpretError::Io(err));
        }

        self.iterations += 1;
        match interpreter.step(console, state) {
            Ok(Step::Handled(code)) => {
                debug!(code, "input handled");
                LoopState::Running
            }
            Ok(Step::EndOfInput) => LoopState::Ended(EndReason::EndOfInput),
            Err(err) if err.is_fatal() || self.config.on_failure == FailurePolicy::Abort => {
                self.fail(console, err)
            }
            Err(err) => {
                warn!(%err, "command failed");
                report(console, &err);
                LoopState::Running
            }
        }
    }

    fn fail(&self, console: &mut dyn Console, err: InterpretError) -> LoopState {
        error!(%err, "ending session");
        report(console, &err);
        LoopState::Ended(EndReason::Fatal)
    }
}

fn print_banner(console: &mut dyn Console) -> io::Result<()> {
    let out = console.output();
    writeln!(out, "{}", BANNER)?;
    writeln!(out, "{}", USAGE_HINT)?;
    Ok(())
}

fn write_shutdown(console: &mut dyn Console) -> io::Result<()> {
    let out = console.output();
    writeln!(out)?;
    writeln!(out, "{}", SHUTDOWN_MESSAGE)?;
    out.flush()
}

fn report(console: &mut dyn Console, err: &InterpretError) {
    // command output may still be buffered; keep the diagnostic after it
    let _ = console.output().flush();
    let stderr = console.error();
    if let Err(write_err) = writeln!(stderr, "error: {}", err).and_then(|()| stderr.flush()) {
        error!(%write_err, diagnostic = %err, "can't write diagnostic");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::StreamConsole;
    use crate::interpreter::CommandInterpreter;
    use crate::io_adapters::{MemReader, MemWriter};
    use std::cell::RefCell;
    use std::io::{BufRead, BufReader, Read};
    use std::rc::Rc;

    struct Session {
        outcome: Outcome,
        stdout: String,
        stderr: String,
        iterations: u64,
    }

    fn run_session(input: &str, config: LoopConfig, state: &mut EngineState) -> Session {
        let (out, stdout) = MemWriter::with_handle();
        let (err, stderr) = MemWriter::with_handle();
        let mut console = StreamConsole::new(BufReader::new(MemReader::new(input)), out, err);
        let mut interpreter = CommandInterpreter::default();
        let mut repl = CommandLoop::new(config);
        let outcome = repl.run(&mut console, &mut interpreter, state);
        drop(console);
        let stdout = String::from_utf8(stdout.borrow().clone()).unwrap();
        let stderr = String::from_utf8(stderr.borrow().clone()).unwrap();
        Session {
            outcome,
            stdout,
            stderr,
            iterations: repl.iterations(),
        }
    }

    fn expected_header() -> String {
        format!("{}\n{}\n", BANNER, USAGE_HINT)
    }

    #[test]
    fn test_empty_input_shuts_down_gracefully() {
        let mut state = EngineState::default();
        let s = run_session("", LoopConfig::default(), &mut state);
        assert_eq!(s.outcome, Outcome::Graceful);
        assert_eq!(s.outcome.exit_code(), 0);
        assert_eq!(s.stdout, format!("{}> \nExiting.\n", expected_header()));
        assert!(s.stderr.is_empty());
        assert_eq!(s.iterations, 1);
    }

    #[test]
    fn test_banner_and_hint_precede_first_prompt() {
        let mut state = EngineState::default();
        let s = run_session("echo hi\n", LoopConfig::default(), &mut state);
        let banner = s.stdout.find(BANNER).unwrap();
        let hint = s.stdout.find(USAGE_HINT).unwrap();
        let prompt = s.stdout.find("> ").unwrap();
        assert!(banner < hint && hint < prompt);
        assert_eq!(
            s.stdout,
            format!("{}> hi\n> \nExiting.\n", expected_header())
        );
    }

    #[test]
    fn test_n_lines_give_n_plus_one_prompts() {
        let mut state = EngineState::default();
        let s = run_session("echo a\n\necho b\nset X=1\n", LoopConfig::default(), &mut state);
        assert_eq!(s.outcome, Outcome::Graceful);
        assert_eq!(s.stdout.matches("> ").count(), 5);
        assert_eq!(s.iterations, 5);
        assert_eq!(state.commands_run, 3);
    }

    #[test]
    fn test_help_scenario() {
        let mut state = EngineState::default();
        let s = run_session("help\n", LoopConfig::default(), &mut state);
        assert_eq!(s.outcome, Outcome::Graceful);
        assert!(s.stdout.starts_with(&expected_header()));
        assert!(s.stdout.contains("Available commands:"));
        assert_eq!(s.stdout.matches("\n> ").count(), 2);
        assert!(s.stdout.ends_with("> \nExiting.\n"));
    }

    #[test]
    fn test_failure_prints_diagnostic_and_continues() {
        let mut state = EngineState::default();
        let s = run_session("nope\necho still here\n", LoopConfig::default(), &mut state);
        assert_eq!(s.outcome, Outcome::Graceful);
        assert_eq!(s.stderr, "error: nope: command not found\n");
        assert!(s.stdout.contains("still here\n"));
    }

    #[test]
    fn test_invalid_utf8_line_does_not_end_session() {
        let (out, stdout) = MemWriter::with_handle();
        let (err, stderr) = MemWriter::with_handle();
        let input = BufReader::new(MemReader::new(b"\xff\necho after\n".to_vec()));
        let mut console = StreamConsole::new(input, out, err);
        let mut state = EngineState::default();
        let outcome = CommandLoop::new(LoopConfig::default()).run(
            &mut console,
            &mut CommandInterpreter::default(),
            &mut state,
        );
        drop(console);

        assert_eq!(outcome, Outcome::Graceful);
        let stdout = String::from_utf8(stdout.borrow().clone()).unwrap();
        let stderr = String::from_utf8(stderr.borrow().clone()).unwrap();
        assert!(stdout.contains("> after\n"));
        assert!(stderr.starts_with("error: unreadable input line"));
    }

    #[test]
    fn test_abort_policy_ends_session_on_failure() {
        let mut state = EngineState::default();
        let config = LoopConfig {
            on_failure: FailurePolicy::Abort,
            ..LoopConfig::default()
        };
        let s = run_session("cat missing\necho unreachable\n", config, &mut state);
        assert_eq!(s.outcome, Outcome::Failed);
        assert_eq!(s.outcome.exit_code(), 1);
        assert_eq!(s.stderr, "error: cat: missing: no such section\n");
        assert!(!s.stdout.contains("unreachable"));
        assert!(s.stdout.ends_with("\nExiting.\n"));
    }

    #[test]
    fn test_custom_prompt() {
        let mut state = EngineState::default();
        let config = LoopConfig {
            prompt: "engine$ ".to_string(),
            ..LoopConfig::default()
        };
        let s = run_session("\n", config, &mut state);
        assert_eq!(s.stdout.matches("engine$ ").count(), 2);
    }

    #[test]
    fn test_initialized_state_is_visible_to_first_command() {
        let mut state = EngineState::default();
        state
            .sections
            .insert("about".to_string(), "loaded before the loop".to_string());
        let s = run_session("cat about\n", LoopConfig::default(), &mut state);
        assert!(s.stdout.contains("> loaded before the loop\n"));
    }

    /// Reader that records how much output was visible each time input was requested.
    struct ProbeReader {
        inner: BufReader<MemReader>,
        visible: Rc<RefCell<Vec<u8>>>,
        seen: Rc<RefCell<Vec<String>>>,
    }

    impl Read for ProbeReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl BufRead for ProbeReader {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            let visible = String::from_utf8(self.visible.borrow().clone()).unwrap();
            self.seen.borrow_mut().push(visible);
            self.inner.fill_buf()
        }

        fn consume(&mut self, amt: usize) {
            self.inner.consume(amt)
        }
    }

    #[test]
    fn test_prompt_is_flushed_before_reading() {
        let (out, visible) = MemWriter::with_handle();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let input = ProbeReader {
            inner: BufReader::new(MemReader::new("echo -n x\n")),
            visible: visible.clone(),
            seen: seen.clone(),
        };
        let mut console = StreamConsole::new(input, out, Vec::new());
        let mut state = EngineState::default();
        let outcome = CommandLoop::new(LoopConfig::default()).run(
            &mut console,
            &mut CommandInterpreter::default(),
            &mut state,
        );
        assert_eq!(outcome, Outcome::Graceful);

        let seen = seen.borrow();
        assert!(!seen.is_empty());
        // every read saw a prompt as the last visible output
        for snapshot in seen.iter() {
            assert!(snapshot.ends_with("> "), "prompt not visible: {:?}", snapshot);
        }
        assert!(seen[0].starts_with(&expected_header()));
    }

    struct FailingOutput;

    impl Write for FailingOutput {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_unwritable_diagnostics_do_not_stop_the_session() {
        let (out, stdout) = MemWriter::with_handle();
        let input = BufReader::new(MemReader::new("nope\necho after\n"));
        let mut console = StreamConsole::new(input, out, FailingOutput);
        let mut state = EngineState::default();
        let outcome = CommandLoop::new(LoopConfig::default()).run(
            &mut console,
            &mut CommandInterpreter::default(),
            &mut state,
        );
        drop(console);

        assert_eq!(outcome, Outcome::Graceful);
        let stdout = String::from_utf8(stdout.borrow().clone()).unwrap();
        assert!(stdout.contains("> after\n"));
    }

    #[test]
    fn test_output_failure_is_fatal() {
        let (err, stderr) = MemWriter::with_handle();
        let mut console =
            StreamConsole::new(BufReader::new(MemReader::new("echo hi\n")), FailingOutput, err);
        let mut state = EngineState::default();
        let mut repl = CommandLoop::new(LoopConfig::default());
        let outcome = repl.run(&mut console, &mut CommandInterpreter::default(), &mut state);
        drop(console);
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(repl.iterations(), 0);
        assert!(
            String::from_utf8(stderr.borrow().clone())
                .unwrap()
                .starts_with("error: console I/O failed")
        );
    }
}
