// Copyright 2023 Xayn AG
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Setup of the tracing subscriber of the evaluation binaries.

use std::{fs::File, io, path::PathBuf};

use displaydoc::Display;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::Dispatch;
use tracing_subscriber::{
    filter::LevelFilter,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};

/// A [`LevelFilter`] which is configured by its name, e.g. `"debug"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Level(pub LevelFilter);

impl Serialize for Level {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse()
            .map(Self)
            .map_err(de::Error::custom)
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Json log file written in addition to stderr.
    pub file: Option<PathBuf>,
    pub level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file: None,
            level: Level(LevelFilter::INFO),
        }
    }
}

/// Errors of the logging setup.
#[derive(Debug, Display, Error)]
pub enum Error {
    /// Failed to create the log file: {0}
    File(#[from] io::Error),
    /// Failed to install the global subscriber: {0}
    Init(#[from] TryInitError),
}

/// Installs the global subscriber.
///
/// Events are written as json to stderr, stdout is left to the evaluation report.
pub fn initialize_global(config: &Config) -> Result<(), Error> {
    dispatch(config)?.try_init().map_err(Into::into)
}

fn dispatch(config: &Config) -> Result<Dispatch, Error> {
    let file = config
        .file
        .as_ref()
        .map(|path| {
            File::create(path).map(|file| {
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .json()
            })
        })
        .transpose()?;
    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .json()
        .flatten_event(true)
        .with_current_span(false);

    Ok(tracing_subscriber::registry()
        .with(stderr)
        .with(file)
        .with(config.level.0)
        .into())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_level_round_trips_through_toml() {
        let config = toml::from_str::<Config>(r#"level = "debug""#).unwrap();
        assert_eq!(config.level, Level(LevelFilter::DEBUG));
        let serialized = toml::to_string(&config).unwrap();
        assert!(serialized.contains(r#"level = "debug""#));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(toml::from_str::<Config>("colors = true").is_err());
        assert!(toml::from_str::<Config>(r#"level = "loud""#).is_err());
    }

    #[test]
    fn test_log_file_is_created() {
        let dir = tempdir().unwrap();
        let config = Config {
            file: Some(dir.path().join("eval.log")),
            ..Config::default()
        };
        assert!(dispatch(&config).is_ok());
        assert!(dir.path().join("eval.log").exists());

        let config = Config {
            file: Some(dir.path().join("missing").join("eval.log")),
            ..Config::default()
        };
        assert!(matches!(dispatch(&config), Err(Error::File(_))));
    }
}
