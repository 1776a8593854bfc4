use portfolio_engine::{
    Args, CommandInterpreter, CommandLoop, Console, EditorConsole, EngineConfig, EngineHelper,
    EngineState, StreamConsole,
};
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let config = EngineConfig::from(argh::from_env::<Args>());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut state = match EngineState::init(config.data.as_deref()) {
        Ok(state) => state,
        Err(err) => {
            error!(%err, "initialization failed");
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut interpreter = CommandInterpreter::default();
    let mut console = open_console(&config, &interpreter, &state);

    let outcome = CommandLoop::new(config.loop_config.clone()).run(
        console.as_mut(),
        &mut interpreter,
        &mut state,
    );
    ExitCode::from(outcome.exit_code())
}

fn open_console(
    config: &EngineConfig,
    interpreter: &CommandInterpreter,
    state: &EngineState,
) -> Box<dyn Console> {
    if config.use_editor(std::io::stdin().is_terminal()) {
        let sections = state.section_names().map(str::to_string).collect();
        match EditorConsole::new(EngineHelper::new(interpreter.command_names(), sections)) {
            Ok(console) => return Box::new(console),
            Err(err) => warn!(%err, "line editor unavailable, reading plain lines"),
        }
    }
    Box::new(StreamConsole::stdio())
}
