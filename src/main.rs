use std::{env, fs};

use colored::Colorize;
use encore_collab::CollabError;
use encore_core::Settings;
use log::{error, info};
use thiserror::Error;

use crate::{
    logging::LogColor,
    script::{Session, Step},
};

mod logging;
mod script;

/// The session replayed when no script is given.
const DEMO_SESSION: &str = include_str!("../demos/party.ron");

/// Names a RON file to load the settings from.
const SETTINGS_VAR: &str = "ENCORE_SETTINGS";
/// Set to anything to also log debug output.
const VERBOSE_VAR: &str = "ENCORE_VERBOSE";

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Could not parse {name}: {source}")]
    Parse { name: String, source: ron::Error },

    #[error("Step {step} is done by {who}, who has not joined yet")]
    UnknownParticipant { step: usize, who: String },

    #[error("Step {step} refers to \"{title}\", which is not in the queue")]
    UnknownSong { step: usize, title: String },

    /// The collab system said no. Not fatal to a session.
    #[error(transparent)]
    Refused(#[from] CollabError),

    #[error("Could not serialize: {0}")]
    Json(#[from] serde_json::Error),
}

impl HostError {
    fn hint(&self) -> String {
        match self {
            HostError::Io { .. } => "Make sure the file exists and is readable.".to_string(),
            HostError::Parse { .. } => {
                "The file must be valid RON. See demos/party.ron for an example.".to_string()
            }
            HostError::UnknownParticipant { .. } => {
                "Every participant must join with JoinLocal or JoinRemote before acting."
                    .to_string()
            }
            HostError::UnknownSong { .. } => {
                "Songs must be enqueued before they can be voted for or removed.".to_string()
            }
            HostError::Refused(_) => "This step was refused by the collab system.".to_string(),
            HostError::Json(_) => "This error is fatal, and should not happen.".to_string(),
        }
    }
}

fn load_settings() -> Result<Settings, HostError> {
    let Ok(path) = env::var(SETTINGS_VAR) else {
        info!("{} is not set, using default settings", SETTINGS_VAR);
        return Ok(Settings::default());
    };

    info!("Loading settings from {}", path);
    parse(&path, &read(&path)?)
}

fn load_steps() -> Result<Vec<Step>, HostError> {
    match env::args().nth(1) {
        Some(path) => {
            info!("Replaying {}", path);
            parse(&path, &read(&path)?)
        }
        None => {
            info!("No script given, replaying the demo session");
            parse("the demo session", DEMO_SESSION)
        }
    }
}

fn read(path: &str) -> Result<String, HostError> {
    fs::read_to_string(path).map_err(|source| HostError::Io {
        path: path.to_string(),
        source,
    })
}

fn parse<T>(name: &str, data: &str) -> Result<T, HostError>
where
    T: serde::de::DeserializeOwned,
{
    ron::from_str(data).map_err(|source| HostError::Parse {
        name: name.to_string(),
        source,
    })
}

fn run() -> Result<(), HostError> {
    let settings = load_settings()?;
    let steps = load_steps()?;

    Session::new(settings).replay(&steps)
}

fn main() {
    let verbose = env::var_os(VERBOSE_VAR).is_some();

    if let Err(error) = logging::init_logger(verbose) {
        eprintln!("{}", error);
        return;
    }

    match run() {
        Ok(()) => info!("Session finished."),
        Err(error) => {
            error!(
                "{} Read the error below to troubleshoot the issue.",
                "Encore failed!".bold().color(LogColor::Red)
            );
            error!("{}", error);
            error!(
                "{}",
                format!("Hint: {}", error.hint())
                    .color(LogColor::Dimmed)
                    .italic()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_fill_in_defaults() {
        let settings: Settings = parse(
            "settings",
            "(lock_remote_control: true, max_vote_count: 5)",
        )
        .unwrap();

        assert!(settings.lock_remote_control);
        assert_eq!(settings.max_vote_count, 5);
        assert!(settings.enable_guest_system, "missing fields use defaults");
    }

    #[test]
    fn test_parse_errors_name_the_source() {
        let result = parse::<Settings>("broken.ron", "(max_vote_count: \"many\")");

        match result {
            Err(error @ HostError::Parse { .. }) => {
                assert!(error.to_string().contains("broken.ron"));
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }
}
