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

//! Candidate generation and ranking of wallpaper recommendations.
//!
//! The [`Store`] holds items, users and their ratings. A [`Recommender`] serves the personalized
//! feed, similar items, scenario and time of day recommendations and search from an immutable
//! [`Snapshot`] of the store and the models derived from it.

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

mod candidates;
mod config;
mod embedding;
mod id;
mod item_cf;
mod popularity;
mod rating;
mod ranking;
mod recommender;
mod scenario;
mod search;
mod store;
mod utils;

pub use crate::{
    candidates::CandidateGenerator,
    config::{Config, Error as ConfigError},
    embedding::{cosine_similarity, Embedding, COSINE_SIMILARITY_RANGE},
    id::{ItemId, UserId},
    item_cf::ItemCf,
    popularity::{popularity_score, PopularityModel},
    rating::{Rating, TopRatings, MAX_SCORE},
    ranking::{attribute_similarity, FeedStrategy, Ranker, SimilarStrategy, UnknownStrategy},
    recommender::{Recommender, Snapshot},
    scenario::{Scenario, ScenarioConfig, UnknownScenario, UserPreferences, DIVERSITY_SCORE},
    search::Searcher,
    store::{Item, SortBy, Store, User, DEFAULT_TOP_RATINGS_CAPACITY},
};
