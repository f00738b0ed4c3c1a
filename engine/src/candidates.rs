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

use itertools::Itertools;
use tracing::debug;

use crate::{
    config::Config,
    id::ItemId,
    scenario::ScenarioConfig,
    store::{Item, SortBy, Store, User},
};

/// Recalls the candidate pools of the recommendation paths from the store's indexes.
#[derive(Clone, Copy, Debug)]
pub struct CandidateGenerator<'a> {
    store: &'a Store,
    config: &'a Config,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(store: &'a Store, config: &'a Config) -> Self {
        Self { store, config }
    }

    /// The top rated items the user hasn't rated yet, in descending order of rating.
    pub fn for_user(&self, user: &User) -> Vec<ItemId> {
        let seen = user.seen();
        let candidates = self
            .store
            .top_items(self.config.feed_candidates(), SortBy::Rating)
            .into_iter()
            .map(Item::id)
            .filter(|id| !seen.contains(id))
            .collect_vec();
        debug!(user = %user.id(), candidates = candidates.len(), "recalled feed candidates");

        candidates
    }

    /// The items sharing a tag, a category or the style with the seed item.
    ///
    /// The pool is deduplicated in recall order and never contains the seed itself.
    pub fn similar_to(&self, seed: &Item) -> Vec<ItemId> {
        let by_tag = seed.tags().iter().flat_map(|tag| {
            self.store
                .items_by_tag(tag, self.config.similar_tag_limit(), SortBy::Rating)
        });
        let by_category = seed.categories().iter().flat_map(|category| {
            self.store.items_by_category(
                category,
                self.config.similar_category_limit(),
                SortBy::Rating,
            )
        });
        let by_style = seed.style().into_iter().flat_map(|style| {
            self.store
                .items_by_style(style, self.config.similar_style_limit(), SortBy::Rating)
        });
        let candidates = by_tag
            .chain(by_category)
            .chain(by_style)
            .map(Item::id)
            .filter(|&id| id != seed.id())
            .unique()
            .collect_vec();
        debug!(seed = %seed.id(), candidates = candidates.len(), "recalled similar candidates");

        candidates
    }

    /// The items matching a scenario's preferred attributes.
    ///
    /// If less than `2 * size` items match, the most downloaded items are added.
    pub fn for_scenario(&self, scenario: &ScenarioConfig, size: usize) -> Vec<ItemId> {
        let limit = self.config.scenario_recall_limit();
        let by_style = scenario
            .styles
            .iter()
            .flat_map(|style| self.store.items_by_style(style, limit, SortBy::Rating));
        let by_mood = scenario
            .moods
            .iter()
            .flat_map(|mood| self.store.items_by_mood(mood, limit, SortBy::Rating));
        let by_category = scenario.categories.iter().flat_map(|category| {
            self.store
                .items_by_category(category, limit, SortBy::Rating)
        });
        let by_tag = scenario.tags.iter().flat_map(|tag| {
            self.store
                .items_by_tag(tag, self.config.scenario_tag_limit(), SortBy::Rating)
        });
        let mut candidates = by_style
            .chain(by_mood)
            .chain(by_category)
            .chain(by_tag)
            .map(Item::id)
            .unique()
            .collect_vec();

        let backfill = 2 * size;
        if candidates.len() < backfill {
            let recalled = candidates.len();
            candidates = candidates
                .into_iter()
                .chain(
                    self.store
                        .top_items(backfill, SortBy::Downloads)
                        .into_iter()
                        .map(Item::id),
                )
                .unique()
                .collect();
            debug!(recalled, candidates = candidates.len(), "backfilled scenario candidates");
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        id::UserId,
        scenario::Scenario,
        store::tests::{item, rate},
    };

    fn ids(ids: &[u32]) -> Vec<ItemId> {
        ids.iter().copied().map(ItemId::new).collect()
    }

    fn store() -> Store {
        let mut store = Store::new();
        store.insert_item(
            item(1)
                .with_tags(["sky", "sea"])
                .with_categories(["nature"])
                .with_style("minimalist"),
        );
        store.insert_item(item(2).with_tags(["sky"]).with_download_count(300));
        store.insert_item(item(3).with_categories(["nature"]).with_style("anime"));
        store.insert_item(item(4).with_style("minimalist").with_download_count(100));
        store.insert_item(item(5).with_tags(["sea"]).with_download_count(200));
        rate(&mut store, 1, 1, 5., 0);
        rate(&mut store, 1, 2, 4., 1);
        rate(&mut store, 2, 3, 3., 2);
        rate(&mut store, 2, 5, 2., 3);
        store
    }

    #[test]
    fn test_for_user_excludes_seen() {
        let store = store();
        let config = Config::default();
        let generator = CandidateGenerator::new(&store, &config);
        let user = store.user(UserId::new(1)).unwrap();
        assert_eq!(generator.for_user(user), ids(&[3, 5, 4]));

        let config = Config::default().with_feed_candidates(2).unwrap();
        let generator = CandidateGenerator::new(&store, &config);
        assert!(generator.for_user(user).is_empty());
    }

    #[test]
    fn test_similar_to_unions_channels() {
        let store = store();
        let config = Config::default();
        let generator = CandidateGenerator::new(&store, &config);
        let seed = store.item(ItemId::new(1)).unwrap();
        // tags "sea" then "sky", category "nature", style "minimalist"
        assert_eq!(generator.similar_to(seed), ids(&[5, 2, 3, 4]));

        let lonely = store.item(ItemId::new(4)).unwrap();
        assert_eq!(generator.similar_to(lonely), ids(&[1]));
    }

    #[test]
    fn test_similar_to_respects_limits() {
        let store = store();
        let config = Config::default()
            .with_similar_tag_limit(1)
            .with_similar_category_limit(0)
            .with_similar_style_limit(0);
        let generator = CandidateGenerator::new(&store, &config);
        let seed = store.item(ItemId::new(1)).unwrap();
        assert!(generator.similar_to(seed).is_empty());
    }

    #[test]
    fn test_for_scenario_backfills_by_downloads() {
        let store = store();
        let config = Config::default();
        let generator = CandidateGenerator::new(&store, &config);
        let candidates = generator.for_scenario(Scenario::Work.config(), 2);
        // style "minimalist" and category "nature", then downloads
        assert_eq!(candidates, ids(&[1, 4, 3, 2, 5]));

        let candidates = generator.for_scenario(Scenario::Work.config(), 1);
        assert_eq!(candidates, ids(&[1, 4, 3]));
    }
}
