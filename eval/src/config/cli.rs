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

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Offline evaluation of the wallpaper recommendation strategies.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub(super) struct Args {
    /// Number of recommendations per user.
    #[arg(short, long)]
    pub(super) k: Option<usize>,

    /// Minimum score of a liked rating.
    #[arg(long)]
    pub(super) like_threshold: Option<f32>,

    /// Number of most recent ratings per user held out for testing.
    #[arg(long)]
    pub(super) leave_out: Option<usize>,

    /// Minimum number of training ratings of an eligible user.
    #[arg(long)]
    pub(super) min_train: Option<usize>,

    /// Maximum number of users contributing to the metrics, 0 for all.
    #[arg(long)]
    pub(super) max_users: Option<usize>,

    /// Maximum number of neighbors per item of the co-occurrence model.
    #[arg(long)]
    pub(super) max_neighbors: Option<usize>,

    /// Ratings csv file.
    #[arg(short, long)]
    pub(super) ratings: Option<PathBuf>,

    /// Directory to write the csv report to.
    #[arg(long)]
    pub(super) report_dir: Option<PathBuf>,

    /// File to log to additionally to logging to stderr.
    #[arg(short, long)]
    pub(super) log_file: Option<PathBuf>,

    /// Use given configuration file.
    ///
    /// Instead of a path "inline" toml configuration file can also be
    /// passed in by prefixing it with `inline:`.
    #[arg(short, long)]
    pub(super) config: Option<String>,

    /// Print the config and exit instead of running the evaluation
    #[arg(long)]
    pub(super) print_config: bool,
}

impl Args {
    pub(super) fn to_config_overrides(&self) -> impl Serialize {
        let mut evaluation = Map::new();
        if let Some(k) = self.k {
            evaluation.insert(String::from("k"), json!(k));
        }
        if let Some(like_threshold) = self.like_threshold {
            evaluation.insert(String::from("like_threshold"), json!(like_threshold));
        }
        if let Some(leave_out) = self.leave_out {
            evaluation.insert(String::from("leave_out"), json!(leave_out));
        }
        if let Some(min_train) = self.min_train {
            evaluation.insert(String::from("min_train"), json!(min_train));
        }
        if let Some(max_users) = self.max_users {
            evaluation.insert(String::from("max_users"), json!(max_users));
        }
        if let Some(max_neighbors) = self.max_neighbors {
            evaluation.insert(String::from("max_neighbors"), json!(max_neighbors));
        }

        let mut map = Map::new();
        if !evaluation.is_empty() {
            map.insert(String::from("evaluation"), Value::Object(evaluation));
        }
        if let Some(ratings) = &self.ratings {
            map.insert(String::from("data"), json!({ "ratings": ratings }));
        }
        if let Some(report_dir) = &self.report_dir {
            map.insert(String::from("report"), json!({ "dir": report_dir }));
        }
        if let Some(log_file) = &self.log_file {
            map.insert(String::from("logging"), json!({ "file": log_file }));
        }

        Value::Object(map)
    }
}
