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

//! Evaluation of the recommendation strategies on a temporal split.

use std::{collections::HashSet, fmt, str::FromStr};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use wallrec_engine::{ItemCf, ItemId, PopularityModel, UnknownStrategy, UserId};

use crate::{
    config::{Config, EvaluationConfig},
    error::Error,
    metrics::{MeanMetrics, Metrics},
    records::{Embeddings, Interactions},
    report::Report,
    split::Split,
};

/// The recommendation strategies which can be evaluated offline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Strategy {
    #[serde(rename = "popularity")]
    Popularity,
    #[serde(rename = "itemcf", alias = "item_cf")]
    ItemCf,
    #[serde(rename = "emb", alias = "embedding")]
    Embedding,
}

impl Strategy {
    pub const ALL: [Self; 3] = [Self::Popularity, Self::ItemCf, Self::Embedding];

    pub fn name(self) -> &'static str {
        match self {
            Self::Popularity => "popularity",
            Self::ItemCf => "itemcf",
            Self::Embedding => "emb",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "popularity" => Ok(Self::Popularity),
            "itemcf" | "item_cf" => Ok(Self::ItemCf),
            "emb" | "embedding" => Ok(Self::Embedding),
            _ => Err(UnknownStrategy(name.to_string())),
        }
    }
}

/// The aggregated metrics of one strategy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrategyMetrics {
    pub strategy: Strategy,
    /// The number of users which contributed to the means.
    pub users: usize,
    pub metrics: Metrics,
}

/// Models built from the training partition of a split.
pub struct Harness<'a> {
    split: &'a Split,
    embeddings: &'a Embeddings,
    config: &'a EvaluationConfig,
    popularity: PopularityModel,
    item_cf: ItemCf,
}

impl<'a> Harness<'a> {
    #[instrument(skip_all)]
    pub fn new(split: &'a Split, embeddings: &'a Embeddings, config: &'a EvaluationConfig) -> Self {
        let popularity = PopularityModel::build(split.train().values(), config.like_threshold);
        let item_cf = ItemCf::build(
            split.train().values(),
            config.like_threshold,
            config.max_neighbors,
        );

        Self {
            split,
            embeddings,
            config,
            popularity,
            item_cf,
        }
    }

    /// Recommends `k` items to a user, backfilled by popularity where the strategy runs short.
    pub fn recommend(&self, strategy: Strategy, user: UserId) -> Vec<ItemId> {
        let k = self.config.k;
        let seen = self.split.seen(user);
        let mut recommendations = match strategy {
            Strategy::Popularity => return self.popularity.recommend(&seen, k),
            Strategy::ItemCf => self
                .item_cf
                .recommend(self.split.train_of(user), &seen, k),
            Strategy::Embedding => self.recommend_by_embedding(user, &seen),
        };
        self.popularity.fill_up(&mut recommendations, &seen, k);

        recommendations
    }

    fn recommend_by_embedding(&self, user: UserId, seen: &HashSet<ItemId>) -> Vec<ItemId> {
        let Some(user) = self.embeddings.user(user) else {
            return Vec::new();
        };
        self.embeddings
            .items()
            .filter(|(id, _)| !seen.contains(id))
            .filter_map(|(id, item)| user.cosine_similarity(item).map(|score| (id, score)))
            .sorted_by(|(a_id, a), (b_id, b)| b.total_cmp(a).then_with(|| a_id.cmp(b_id)))
            .take(self.config.k)
            .map(|(id, _)| id)
            .collect()
    }

    /// Evaluates a strategy on the eligible users in ascending order of their ids.
    ///
    /// Users without liked held out items get recommendations but don't contribute to the means.
    #[instrument(skip(self))]
    pub fn evaluate(&self, strategy: Strategy) -> StrategyMetrics {
        let max_users = self.config.max_users.filter(|&max| max > 0);
        let mut mean = MeanMetrics::default();
        let mut without_ground_truth = 0;
        for user in self.split.users() {
            if max_users.is_some_and(|max| mean.users() >= max) {
                break;
            }
            let ground_truth = self.split.ground_truth(user, self.config.like_threshold);
            let recommendations = self.recommend(strategy, user);
            if ground_truth.is_empty() {
                without_ground_truth += 1;
                continue;
            }
            mean.add(Metrics::at_k(&recommendations, &ground_truth, self.config.k));
        }
        info!(users = mean.users(), without_ground_truth, "evaluated strategy");

        StrategyMetrics {
            strategy,
            users: mean.users(),
            metrics: mean.mean(),
        }
    }

    /// Evaluates the configured strategies in their configured order.
    pub fn evaluate_all(&self) -> Vec<StrategyMetrics> {
        self.config
            .strategies
            .iter()
            .map(|&strategy| self.evaluate(strategy))
            .collect()
    }
}

/// Runs an evaluation from the files of the configuration.
pub fn run(config: &Config) -> Result<Report, Error> {
    config.validate()?;

    let interactions = Interactions::read(&config.data.ratings)?;
    let split = Split::temporal(
        interactions.group_by_user(),
        config.evaluation.leave_out,
        config.evaluation.min_train,
    );
    if split.is_empty() {
        warn!("no user is eligible for evaluation");
    }
    let embeddings = Embeddings::read(
        config.data.user_embeddings.as_deref(),
        config.data.item_embeddings.as_deref(),
    )?;
    if config.evaluation.strategies.contains(&Strategy::Embedding) && !embeddings.has_items() {
        warn!("no item embeddings, the embedding strategy is backfilled by popularity only");
    }

    let rows = Harness::new(&split, &embeddings, &config.evaluation).evaluate_all();

    Ok(Report::new(&config.evaluation, rows))
}
