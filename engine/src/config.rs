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

use std::sync::Arc;

use displaydoc::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{recommender::Recommender, store::Store};

/// Configurations of the recommender.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
#[must_use]
pub struct Config {
    like_threshold: f32,
    max_neighbors: usize,
    feed_candidates: usize,
    similar_tag_limit: usize,
    similar_category_limit: usize,
    similar_style_limit: usize,
    scenario_recall_limit: usize,
    scenario_tag_limit: usize,
    item_cf_prior_weight: f32,
}

// the f32 fields are never NaN by construction
impl Eq for Config {}

impl Default for Config {
    fn default() -> Self {
        Self {
            like_threshold: 4.,
            max_neighbors: 80,
            feed_candidates: 800,
            similar_tag_limit: 100,
            similar_category_limit: 100,
            similar_style_limit: 50,
            scenario_recall_limit: 50,
            scenario_tag_limit: 80,
            item_cf_prior_weight: 0.05,
        }
    }
}

/// Errors of the recommender configuration.
#[derive(Copy, Clone, Debug, Display, Error)]
pub enum Error {
    /// Invalid like threshold, expected value from the rating scale [0, 5]
    LikeThreshold,
    /// Invalid maximum number of neighbors, expected positive value
    MaxNeighbors,
    /// Invalid number of feed candidates, expected positive value
    FeedCandidates,
    /// Invalid item cf prior weight, expected value from the unit interval
    ItemCfPriorWeight,
}

impl Config {
    pub fn validate(&self) -> Result<(), Error> {
        if !(0. ..=5.).contains(&self.like_threshold) {
            return Err(Error::LikeThreshold);
        }
        if self.max_neighbors == 0 {
            return Err(Error::MaxNeighbors);
        }
        if self.feed_candidates == 0 {
            return Err(Error::FeedCandidates);
        }
        if !(0. ..=1.).contains(&self.item_cf_prior_weight) {
            return Err(Error::ItemCfPriorWeight);
        }

        Ok(())
    }

    /// The minimum score for a rating to count as a like.
    pub fn like_threshold(&self) -> f32 {
        self.like_threshold
    }

    /// Sets the like threshold.
    ///
    /// # Errors
    /// Fails if the threshold is outside of the rating scale.
    pub fn with_like_threshold(mut self, like_threshold: f32) -> Result<Self, Error> {
        self.like_threshold = like_threshold;
        self.validate()?;

        Ok(self)
    }

    /// The maximum number of neighbors retained per item in the co-occurrence model.
    pub fn max_neighbors(&self) -> usize {
        self.max_neighbors
    }

    /// Sets the maximum number of neighbors.
    ///
    /// # Errors
    /// Fails if the maximum number is zero.
    pub fn with_max_neighbors(mut self, max_neighbors: usize) -> Result<Self, Error> {
        self.max_neighbors = max_neighbors;
        self.validate()?;

        Ok(self)
    }

    /// The number of top rated items considered for the personalized feed.
    pub fn feed_candidates(&self) -> usize {
        self.feed_candidates
    }

    /// Sets the number of feed candidates.
    ///
    /// # Errors
    /// Fails if the number is zero.
    pub fn with_feed_candidates(mut self, feed_candidates: usize) -> Result<Self, Error> {
        self.feed_candidates = feed_candidates;
        self.validate()?;

        Ok(self)
    }

    /// The number of items recalled per shared tag of a seed item.
    pub fn similar_tag_limit(&self) -> usize {
        self.similar_tag_limit
    }

    pub fn with_similar_tag_limit(mut self, limit: usize) -> Self {
        self.similar_tag_limit = limit;
        self
    }

    /// The number of items recalled per shared category of a seed item.
    pub fn similar_category_limit(&self) -> usize {
        self.similar_category_limit
    }

    pub fn with_similar_category_limit(mut self, limit: usize) -> Self {
        self.similar_category_limit = limit;
        self
    }

    /// The number of items recalled for the style of a seed item.
    pub fn similar_style_limit(&self) -> usize {
        self.similar_style_limit
    }

    pub fn with_similar_style_limit(mut self, limit: usize) -> Self {
        self.similar_style_limit = limit;
        self
    }

    /// The number of items recalled per preferred style, mood and category of a scenario.
    pub fn scenario_recall_limit(&self) -> usize {
        self.scenario_recall_limit
    }

    pub fn with_scenario_recall_limit(mut self, limit: usize) -> Self {
        self.scenario_recall_limit = limit;
        self
    }

    /// The number of items recalled per preferred tag of a scenario.
    pub fn scenario_tag_limit(&self) -> usize {
        self.scenario_tag_limit
    }

    pub fn with_scenario_tag_limit(mut self, limit: usize) -> Self {
        self.scenario_tag_limit = limit;
        self
    }

    /// The weight of the rating prior for candidates without co-occurrence signal.
    pub fn item_cf_prior_weight(&self) -> f32 {
        self.item_cf_prior_weight
    }

    /// Sets the item cf prior weight.
    ///
    /// # Errors
    /// Fails if the weight is outside of the unit interval.
    pub fn with_item_cf_prior_weight(mut self, weight: f32) -> Result<Self, Error> {
        self.item_cf_prior_weight = weight;
        self.validate()?;

        Ok(self)
    }

    /// Creates a recommender over the store.
    ///
    /// # Errors
    /// Fails if the configuration is invalid, e.g. after deserializing it.
    pub fn build(self, store: Arc<Store>) -> Result<Recommender, Error> {
        self.validate()?;

        Ok(Recommender::new(self, store))
    }
}
