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

//! Offline evaluation of the wallpaper recommendation strategies.
//!
//! The ratings of each user are split by time, the models are built from the training ratings
//! only and the recommendations of each strategy are scored against the held out likes.

#![forbid(unsafe_code, unsafe_op_in_unsafe_fn)]
#![deny(
    clippy::pedantic,
    noop_method_call,
    rust_2018_idioms,
    unused_qualifications
)]
#![warn(unreachable_pub, rustdoc::missing_crate_level_docs)]
#![allow(
    clippy::items_after_statements,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

pub mod config;
mod error;
mod harness;
pub mod logging;
mod metrics;
mod records;
mod report;
mod split;

pub use crate::{
    config::{Config, EvaluationConfig},
    error::Error,
    harness::{run, Harness, Strategy, StrategyMetrics},
    metrics::{MeanMetrics, Metrics},
    records::{Embeddings, Interactions},
    report::Report,
    split::Split,
};
