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

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{config::EvaluationConfig, error::Error, harness::StrategyMetrics};

/// The per strategy results of an evaluation run.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    k: usize,
    like_threshold: f32,
    leave_out: usize,
    rows: Vec<StrategyMetrics>,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    model: &'a str,
    users: usize,
    precision_at_k: f64,
    recall_at_k: f64,
    ndcg_at_k: f64,
    hit_at_k: f64,
}

impl Report {
    pub fn new(config: &EvaluationConfig, rows: Vec<StrategyMetrics>) -> Self {
        Self {
            k: config.k,
            like_threshold: config.like_threshold,
            leave_out: config.leave_out,
            rows,
        }
    }

    pub fn rows(&self) -> &[StrategyMetrics] {
        &self.rows
    }

    /// The csv file name, e.g. `offline_eval_k10_like4.0.csv`.
    pub fn file_name(&self) -> String {
        format!("offline_eval_k{}_like{:?}.csv", self.k, self.like_threshold)
    }

    /// Writes the report as csv into the directory, creating it if necessary.
    pub fn write_csv(&self, dir: impl AsRef<Path>) -> Result<PathBuf, Error> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());

        let mut writer = csv::Writer::from_path(&path)?;
        for row in &self.rows {
            writer.serialize(CsvRow {
                model: row.strategy.name(),
                users: row.users,
                precision_at_k: row.metrics.precision,
                recall_at_k: row.metrics.recall,
                ndcg_at_k: row.metrics.ndcg,
                hit_at_k: row.metrics.hit_rate,
            })?;
        }
        writer.flush()?;

        Ok(path)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "=== offline evaluation (temporal split, leave out {}, like >= {:?}, k = {}) ===",
            self.leave_out, self.like_threshold, self.k,
        )?;
        writeln!(
            f,
            "{:<12} {:<8} {:<12} {:<12} {:<12} {:<12}",
            "model", "users", "P@K", "R@K", "NDCG@K", "Hit@K",
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<12} {:<8} {:<12.4} {:<12.4} {:<12.4} {:<12.4}",
                row.strategy.name(),
                row.users,
                row.metrics.precision,
                row.metrics.recall,
                row.metrics.ndcg,
                row.metrics.hit_rate,
            )?;
        }

        Ok(())
    }
}
