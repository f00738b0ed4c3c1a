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

//! Layered configuration of the evaluation binaries.

mod cli;

use std::{
    ffi::OsString,
    fmt,
    path::{Path, PathBuf},
    process::exit,
};

use clap::{CommandFactory, Parser};
use displaydoc::Display;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use self::cli::Args;
use crate::{harness::Strategy, logging};

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
#[cfg_attr(test, serde(deny_unknown_fields))]
pub struct Config {
    pub logging: logging::Config,
    pub data: DataConfig,
    pub evaluation: EvaluationConfig,
    pub report: ReportConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), Error> {
        self.evaluation.validate()
    }
}

/// Locations of the input files.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DataConfig {
    /// Ratings csv with the header `userId,itemId,rating,timestamp`.
    pub ratings: PathBuf,
    /// User embeddings with lines `id:v1 v2 ...`.
    pub user_embeddings: Option<PathBuf>,
    /// Item embeddings with lines `id:v1 v2 ...`.
    pub item_embeddings: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            ratings: "data/ratings.csv".into(),
            user_embeddings: None,
            item_embeddings: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Number of recommendations per user.
    pub k: usize,
    /// Minimum score of a liked rating.
    pub like_threshold: f32,
    /// Number of most recent ratings per user held out for testing.
    pub leave_out: usize,
    /// Minimum number of training ratings of an eligible user.
    pub min_train: usize,
    /// Maximum number of users contributing to the metrics, `None` or zero for all.
    pub max_users: Option<usize>,
    /// Maximum number of neighbors per item of the co-occurrence model.
    pub max_neighbors: usize,
    pub strategies: Vec<Strategy>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            k: 10,
            like_threshold: 4.,
            leave_out: 1,
            min_train: 3,
            max_users: None,
            max_neighbors: 80,
            strategies: Strategy::ALL.to_vec(),
        }
    }
}

/// Errors of the evaluation configuration.
#[derive(Copy, Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum Error {
    /// Invalid k, expected positive value
    K,
    /// Invalid like threshold, expected value from the rating scale [0, 5]
    LikeThreshold,
    /// Invalid leave out, expected positive value
    LeaveOut,
    /// Invalid maximum number of neighbors, expected positive value
    MaxNeighbors,
    /// Missing strategies to evaluate
    Strategies,
}

impl EvaluationConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.k == 0 {
            return Err(Error::K);
        }
        if !(0. ..=5.).contains(&self.like_threshold) {
            return Err(Error::LikeThreshold);
        }
        if self.leave_out == 0 {
            return Err(Error::LeaveOut);
        }
        if self.max_neighbors == 0 {
            return Err(Error::MaxNeighbors);
        }
        if self.strategies.is_empty() {
            return Err(Error::Strategies);
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Directory of the csv report, no csv is written if `None`.
    pub dir: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dir: Some("reports".into()),
        }
    }
}

/// Loads the config with custom CLI args.
///
/// See [`load()`].
pub fn load_with_args<C>(
    application_names: impl IntoIterator<Item = impl fmt::Display>,
    args: impl IntoIterator<Item = impl Into<OsString> + Clone>,
) -> C
where
    C: Serialize + DeserializeOwned,
{
    load_with_parsed_args(application_names, Args::parse_from(args))
}

/// Loads the config.
///
/// # Panic/Program Exit
///
/// In case of `--help`, `--print-config` and failure
/// this functions will not return normally but terminate
/// the program normally instead.
pub fn load<C>(application_names: impl IntoIterator<Item = impl fmt::Display>) -> C
where
    C: Serialize + DeserializeOwned,
{
    load_with_parsed_args(application_names, Args::parse())
}

fn load_with_parsed_args<C>(
    application_names: impl IntoIterator<Item = impl fmt::Display>,
    mut cli_args: Args,
) -> C
where
    C: Serialize + DeserializeOwned,
{
    let config = cli_args.config.take();
    let config = match load_config(
        application_names,
        config.as_deref(),
        cli_args.to_config_overrides(),
    ) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            Args::command().print_help().ok();
            exit(1);
        }
    };

    if cli_args.print_config {
        match serde_json::to_string_pretty(&config) {
            Ok(config) => println!("{config}"),
            Err(err) => {
                eprintln!("Error: {err}");
                exit(1);
            }
        }
        exit(0);
    }

    config
}

/// Load the configuration into given type.
///
/// # Load order/priority
///
/// This will by ascending priority load:
///
/// 1. `./config.toml` or specified toml config file
/// 2. `./.env`
/// 3. `./.env.local`
/// 4. process environment
/// 5. options passed through `update_with`
///
/// Config values loaded from higher priority sources override such from lower
/// priority sources.
///
/// # Env and .env
///
/// Environment variables from `.env` and `.env.local` will be loaded into the process
/// environment if they don't already exist there.
///
/// Only environment variables which start with one of the names passed in
/// `application_names` will be considered, names earlier in the array take priority.
/// They are converted into a config path by splitting at `__`, e.g.
/// `WALLREC_EVAL__EVALUATION__K=20` is treated like `{ "evaluation": { "k": 20 } }`.
fn load_config<C, U>(
    application_names: impl IntoIterator<Item = impl fmt::Display>,
    config: Option<&str>,
    update_with: U,
) -> Result<C, figment::Error>
where
    C: DeserializeOwned,
    U: Serialize,
{
    // the order must be from highest to lowest priority
    load_dotenv(".env.local")?;
    load_dotenv(".env")?;

    let mut figment = Figment::new().join(Serialized::defaults(update_with));

    for name in application_names {
        figment = figment.join(Env::prefixed(&format!("{name}__")).split("__"));
    }

    let provider = config
        .map(|content_or_path| {
            if let Some(content) = content_or_path.strip_prefix("inline:") {
                Toml::string(content)
            } else {
                Toml::file(content_or_path)
            }
        })
        .or_else(|| {
            let default_file = Path::new("config.toml");
            default_file.exists().then(|| Toml::file(default_file))
        });

    if let Some(provider) = provider {
        figment = figment.join(provider);
    }

    figment.extract()
}

fn load_dotenv(file_name: &str) -> Result<(), figment::Error> {
    match dotenvy::from_filename(file_name) {
        Err(error) if !error.not_found() => {
            Err(figment::Error::from(error.to_string()).with_path(file_name))
        }
        _ => Ok(()),
    }
}
