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

use chrono::{Local, Timelike};
use parking_lot::RwLock;
use tracing::{info, instrument, warn};

use crate::{
    candidates::CandidateGenerator,
    config::Config,
    embedding::Embedding,
    id::{ItemId, UserId},
    item_cf::ItemCf,
    ranking::{FeedStrategy, Ranker, SimilarStrategy},
    scenario::Scenario,
    search::Searcher,
    store::{Item, SortBy, Store},
};

/// An immutable view of the store together with the models derived from it.
#[derive(Debug)]
pub struct Snapshot {
    store: Arc<Store>,
    item_cf: ItemCf,
}

impl Snapshot {
    /// Derives the models from the store.
    #[instrument(skip_all)]
    pub fn build(store: Arc<Store>, config: &Config) -> Self {
        let item_cf = ItemCf::build(
            store.histories(),
            config.like_threshold(),
            config.max_neighbors(),
        );
        info!(
            items = store.item_count(),
            users = store.user_count(),
            "built recommender snapshot",
        );

        Self { store, item_cf }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn item_cf(&self) -> &ItemCf {
        &self.item_cf
    }

    fn candidates<'a>(&'a self, config: &'a Config) -> CandidateGenerator<'a> {
        CandidateGenerator::new(&self.store, config)
    }

    fn ranker<'a>(&'a self, config: &'a Config) -> Ranker<'a> {
        Ranker::new(&self.store, &self.item_cf, config)
    }
}

/// The live recommender.
///
/// Requests are served from the current snapshot, a rebuild publishes a new snapshot without
/// blocking the requests in flight.
#[derive(Debug)]
pub struct Recommender {
    config: Config,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl Recommender {
    /// Creates a recommender from a validated configuration, see [`Config::build()`].
    pub(crate) fn new(config: Config, store: Arc<Store>) -> Self {
        let snapshot = Snapshot::build(store, &config);
        Self {
            config,
            snapshot: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Builds a snapshot of the store and publishes it.
    pub fn rebuild(&self, store: Arc<Store>) {
        let snapshot = Arc::new(Snapshot::build(store, &self.config));
        *self.snapshot.write() = snapshot;
    }

    /// Recommends unseen items to a user.
    ///
    /// Returns nothing for an unknown user.
    pub fn recommend_for_user(
        &self,
        user: UserId,
        size: usize,
        strategy: FeedStrategy,
    ) -> Vec<ItemId> {
        let snapshot = self.snapshot();
        let Some(user) = snapshot.store().user(user) else {
            warn!(%user, "unknown user");
            return Vec::new();
        };

        let candidates = snapshot.candidates(&self.config).for_user(user);
        let mut recommendations =
            snapshot
                .ranker(&self.config)
                .rank_for_user(user, &candidates, strategy);
        recommendations.truncate(size);
        recommendations
    }

    /// Recommends items similar to a seed item.
    ///
    /// Returns nothing for an unknown item.
    pub fn recommend_similar(
        &self,
        item: ItemId,
        size: usize,
        strategy: SimilarStrategy,
    ) -> Vec<ItemId> {
        let snapshot = self.snapshot();
        let Some(seed) = snapshot.store().item(item) else {
            warn!(%item, "unknown item");
            return Vec::new();
        };

        let candidates = snapshot.candidates(&self.config).similar_to(seed);
        let mut recommendations =
            snapshot
                .ranker(&self.config)
                .rank_similar(seed, &candidates, strategy);
        recommendations.truncate(size);
        recommendations
    }

    /// Recommends items for a named scenario.
    ///
    /// Returns nothing for an unknown user. An unknown scenario falls back to the top rated items.
    pub fn recommend_for_scenario(&self, scenario: &str, user: UserId, size: usize) -> Vec<ItemId> {
        let snapshot = self.snapshot();
        if snapshot.store().user(user).is_none() {
            warn!(%user, "unknown user");
            return Vec::new();
        }

        match scenario.parse::<Scenario>() {
            Ok(scenario) => self.recommend_in_scenario(scenario, user, size),
            Err(error) => {
                warn!(%error, "falling back to top rated items");
                snapshot
                    .store()
                    .top_items(size, SortBy::Rating)
                    .into_iter()
                    .map(Item::id)
                    .collect()
            }
        }
    }

    /// Recommends items for a scenario.
    ///
    /// Returns nothing for an unknown user.
    pub fn recommend_in_scenario(
        &self,
        scenario: Scenario,
        user: UserId,
        size: usize,
    ) -> Vec<ItemId> {
        let snapshot = self.snapshot();
        let Some(user) = snapshot.store().user(user) else {
            warn!(%user, "unknown user");
            return Vec::new();
        };

        let config = scenario.config();
        let candidates = snapshot.candidates(&self.config).for_scenario(config, size);
        let mut recommendations =
            snapshot
                .ranker(&self.config)
                .rank_for_scenario(config, Some(user), &candidates);
        recommendations.truncate(size);
        recommendations
    }

    /// Recommends items for the time of day of the given hour.
    pub fn recommend_for_time(&self, user: UserId, size: usize, hour: u32) -> Vec<ItemId> {
        self.recommend_in_scenario(Scenario::from_hour(hour), user, size)
    }

    /// Recommends items for the current local time of day.
    pub fn recommend_now(&self, user: UserId, size: usize) -> Vec<ItemId> {
        self.recommend_for_time(user, size, Local::now().hour())
    }

    /// Searches items by an optional query embedding and keywords.
    pub fn search(&self, text: &str, embedding: Option<&Embedding>, size: usize) -> Vec<ItemId> {
        Searcher::new(self.snapshot().store()).search(text, embedding, size)
    }
}
