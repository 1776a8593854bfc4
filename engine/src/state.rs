use crate::command::ExitCode;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Errors that prevent the engine from reaching a usable state.
///
/// Any of these is fatal: the process reports it on stderr and exits before
/// the banner is printed.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("can't read data file {}: {source}", path.display())]
    ReadData {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed data file {}: {source}", path.display())]
    ParseData {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// On-disk layout of the engine data file.
#[derive(Debug, Default, Deserialize)]
struct EngineData {
    #[serde(default)]
    sections: BTreeMap<String, String>,
}

/// Session-wide context shared by every command the interpreter runs.
///
/// The state contains:
/// - `sections`: named blocks of text that `cat` can print.
/// - `vars`: session variables set with `set` and expanded as `$NAME`.
/// - `last_status`: exit code of the last command, expanded as `$?`.
/// - `commands_run`: how many commands were dispatched so far.
///
/// One instance is built by [`EngineState::init`] before the loop starts and is
/// then lent to each interpreter step by mutable reference.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub sections: BTreeMap<String, String>,
    pub vars: BTreeMap<String, String>,
    pub last_status: ExitCode,
    pub commands_run: u64,
}

impl EngineState {
    /// Build the engine state, loading sections from `data` when given.
    ///
    /// Must not print anything: the banner has to be the first visible output.
    pub fn init(data: Option<&Path>) -> Result<Self, InitError> {
        let mut state = Self::default();
        if let Some(path) = data {
            state.sections = load_sections(path)?;
            info!(
                path = %path.display(),
                sections = state.sections.len(),
                "loaded engine data"
            );
        } else {
            debug!("no data file, starting with empty sections");
        }
        Ok(state)
    }

    /// Look up a session variable. `?` resolves to the last exit code.
    pub fn get_var(&self, key: &str) -> Option<String> {
        if key == "?" {
            return Some(self.last_status.to_string());
        }
        self.vars.get(key).cloned()
    }

    /// Set or override a session variable.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    pub fn section(&self, name: &str) -> Option<&str> {
        self.sections.get(name).map(String::as_str)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}

fn load_sections(path: &Path) -> Result<BTreeMap<String, String>, InitError> {
    let raw = fs::read_to_string(path).map_err(|source| InitError::ReadData {
        path: path.to_path_buf(),
        source,
    })?;
    let data: EngineData = serde_json::from_str(&raw).map_err(|source| InitError::ParseData {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(data.sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env as stdenv;
    use std::io::Write;

    fn temp_file(tag: &str, contents: &str) -> PathBuf {
        let mut tmp = stdenv::temp_dir();
        tmp.push(format!("engine_state_{}_{}.json", tag, std::process::id()));
        let mut f = fs::File::create(&tmp).expect("create tmp file");
        write!(f, "{}", contents).expect("write");
        tmp
    }

    #[test]
    fn test_init_without_data_is_empty() {
        let state = EngineState::init(None).unwrap();
        assert!(state.sections.is_empty());
        assert!(state.vars.is_empty());
        assert_eq!(state.last_status, 0);
        assert_eq!(state.commands_run, 0);
    }

    #[test]
    fn test_init_loads_sections() {
        let tmp = temp_file(
            "ok",
            r#"{"sections": {"about": "hi there", "skills": "rust"}, "extra": 1}"#,
        );
        let state = EngineState::init(Some(&tmp)).unwrap();
        assert_eq!(state.section("about"), Some("hi there"));
        assert_eq!(state.section_names().collect::<Vec<_>>(), ["about", "skills"]);
        let _ = fs::remove_file(tmp);
    }

    #[test]
    fn test_init_missing_file_fails() {
        let mut path = stdenv::temp_dir();
        path.push("engine_state_definitely_missing.json");
        let err = EngineState::init(Some(&path)).unwrap_err();
        assert!(matches!(err, InitError::ReadData { .. }));
    }

    #[test]
    fn test_init_malformed_json_fails() {
        let tmp = temp_file("bad", "{ sections: ");
        let err = EngineState::init(Some(&tmp)).unwrap_err();
        assert!(matches!(err, InitError::ParseData { .. }));
        assert!(err.to_string().starts_with("malformed data file"));
        let _ = fs::remove_file(tmp);
    }

    #[test]
    fn test_set_and_get_var() {
        let mut state = EngineState::default();
        assert_eq!(state.get_var("NAME"), None);
        state.set_var("NAME", "VALUE");
        assert_eq!(state.get_var("NAME"), Some("VALUE".to_string()));
    }

    #[test]
    fn test_question_mark_is_last_status() {
        let mut state = EngineState::default();
        state.last_status = 3;
        assert_eq!(state.get_var("?"), Some("3".to_string()));
    }
}
