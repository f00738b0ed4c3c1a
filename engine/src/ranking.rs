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

use std::{collections::BTreeSet, fmt, str::FromStr};

use displaydoc::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::{
    config::Config,
    embedding::cosine_similarity,
    id::ItemId,
    item_cf::ItemCf,
    popularity::popularity_score,
    rating::MAX_SCORE,
    scenario::{ScenarioConfig, UserPreferences},
    store::{Item, Store, User},
    utils::{rank_by_optional_score, rank_by_score},
};

/// The discount of the popularity fallback for candidates without embedding similarity.
const EMBEDDING_FALLBACK_WEIGHT: f32 = 0.1;

/// Unknown ranking strategy: {0}
#[derive(Clone, Debug, Display, Error, PartialEq, Eq)]
pub struct UnknownStrategy(pub String);

/// The ranking strategies of the personalized feed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedStrategy {
    /// Cosine similarity between the user's and the item's embeddings.
    #[serde(rename = "emb")]
    Embedding,
    /// Live rating and download popularity.
    #[serde(rename = "popularity")]
    Popularity,
    /// Co-occurrence with the items the user liked.
    #[default]
    #[serde(rename = "itemcf")]
    ItemCf,
    /// Keeps the candidate recall order.
    #[serde(rename = "default")]
    InsertionOrder,
}

impl FeedStrategy {
    pub fn name(self) -> &'static str {
        match self {
            Self::Embedding => "emb",
            Self::Popularity => "popularity",
            Self::ItemCf => "itemcf",
            Self::InsertionOrder => "default",
        }
    }
}

impl fmt::Display for FeedStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeedStrategy {
    type Err = UnknownStrategy;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "emb" | "embedding" => Ok(Self::Embedding),
            "popularity" => Ok(Self::Popularity),
            "itemcf" | "item_cf" => Ok(Self::ItemCf),
            "default" | "insertion" => Ok(Self::InsertionOrder),
            _ => Err(UnknownStrategy(name.to_string())),
        }
    }
}

/// The ranking strategies of similar items.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimilarStrategy {
    /// Cosine similarity between the seed's and the candidate's embeddings.
    #[serde(rename = "emb")]
    Embedding,
    /// Blend of shared tags, categories, style, mood and the candidate's rating.
    #[default]
    #[serde(rename = "attributes")]
    Attributes,
}

impl SimilarStrategy {
    pub fn name(self) -> &'static str {
        match self {
            Self::Embedding => "emb",
            Self::Attributes => "attributes",
        }
    }
}

impl fmt::Display for SimilarStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SimilarStrategy {
    type Err = UnknownStrategy;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "emb" | "embedding" => Ok(Self::Embedding),
            "attributes" | "default" => Ok(Self::Attributes),
            _ => Err(UnknownStrategy(name.to_string())),
        }
    }
}

/// The share of common elements relative to the larger set, `0` if the seed set is empty.
#[allow(clippy::cast_precision_loss)] // small sets
fn overlap<'a>(
    seed: impl ExactSizeIterator<Item = &'a String>,
    candidate: &BTreeSet<String>,
) -> f32 {
    let seed_len = seed.len();
    if seed_len == 0 {
        return 0.;
    }
    let matches = seed.filter(|value| candidate.contains(*value)).count();
    matches as f32 / seed_len.max(candidate.len()) as f32
}

/// Scores a candidate by its attribute overlap with a seed item.
pub fn attribute_similarity(seed: &Item, candidate: &Item) -> f32 {
    let tags = overlap(seed.tags().iter(), candidate.tags());
    let categories = overlap(seed.categories().iter(), candidate.categories());
    let style = match (seed.style(), candidate.style()) {
        (Some(seed), Some(candidate)) if seed == candidate => 1.,
        _ => 0.,
    };
    let mood = match (seed.mood(), candidate.mood()) {
        (Some(seed), Some(candidate)) if seed == candidate => 1.,
        _ => 0.,
    };
    let rating = (candidate.average_rating() / MAX_SCORE).clamp(0., 1.);

    0.3 * tags + 0.2 * categories + 0.2 * style + 0.1 * mood + 0.2 * rating
}

/// Scores and orders candidate pools.
///
/// Every ranking is strictly descending by score with ties broken by ascending item id, and
/// contains each known candidate exactly once.
#[derive(Clone, Copy, Debug)]
pub struct Ranker<'a> {
    store: &'a Store,
    item_cf: &'a ItemCf,
    config: &'a Config,
}

impl<'a> Ranker<'a> {
    pub fn new(store: &'a Store, item_cf: &'a ItemCf, config: &'a Config) -> Self {
        Self {
            store,
            item_cf,
            config,
        }
    }

    fn items<'c>(&self, candidates: &'c [ItemId]) -> impl Iterator<Item = &'a Item> + 'c
    where
        'a: 'c,
    {
        let store = self.store;
        candidates.iter().filter_map(move |&id| store.item(id))
    }

    /// Ranks the feed candidates of a user.
    #[allow(clippy::cast_precision_loss)] // bounded pool size
    #[instrument(skip_all, fields(user = %user.id(), strategy = %strategy))]
    pub fn rank_for_user(
        &self,
        user: &User,
        candidates: &[ItemId],
        strategy: FeedStrategy,
    ) -> Vec<ItemId> {
        let scored = match strategy {
            FeedStrategy::Embedding => self
                .items(candidates)
                .map(|item| {
                    let score = cosine_similarity(user.embedding(), item.embedding())
                        .unwrap_or_else(|| popularity_score(item) * EMBEDDING_FALLBACK_WEIGHT);
                    (item.id(), score)
                })
                .collect(),
            FeedStrategy::Popularity => self
                .items(candidates)
                .map(|item| (item.id(), popularity_score(item)))
                .collect(),
            FeedStrategy::ItemCf => self
                .items(candidates)
                .map(|item| {
                    let score = self
                        .item_cf
                        .score(user.ratings().iter().map(AsRef::as_ref), item.id())
                        .unwrap_or_else(|| {
                            item.average_rating() / MAX_SCORE * self.config.item_cf_prior_weight()
                        });
                    (item.id(), score)
                })
                .collect(),
            FeedStrategy::InsertionOrder => {
                let len = candidates.len();
                self.items(candidates)
                    .enumerate()
                    .map(|(index, item)| (item.id(), (len - index) as f32))
                    .collect()
            }
        };

        rank_by_score(scored)
    }

    /// Ranks the candidates for their similarity to a seed item.
    ///
    /// With the embedding strategy, candidates without a similarity are ranked last.
    #[instrument(skip_all, fields(seed = %seed.id(), strategy = %strategy))]
    pub fn rank_similar(
        &self,
        seed: &Item,
        candidates: &[ItemId],
        strategy: SimilarStrategy,
    ) -> Vec<ItemId> {
        match strategy {
            SimilarStrategy::Embedding => rank_by_optional_score(
                self.items(candidates)
                    .map(|item| (item.id(), cosine_similarity(seed.embedding(), item.embedding())))
                    .collect(),
            ),
            SimilarStrategy::Attributes => rank_by_score(
                self.items(candidates)
                    .map(|item| (item.id(), attribute_similarity(seed, item)))
                    .collect(),
            ),
        }
    }

    /// Ranks the candidates for their fit to a scenario and the user's taste.
    #[instrument(skip_all)]
    pub fn rank_for_scenario(
        &self,
        scenario: &ScenarioConfig,
        user: Option<&User>,
        candidates: &[ItemId],
    ) -> Vec<ItemId> {
        let preferences = user
            .map(|user| UserPreferences::new(self.store, user, self.config.like_threshold()))
            .filter(|preferences| !preferences.is_empty());
        rank_by_score(
            self.items(candidates)
                .map(|item| (item.id(), scenario.score(item, preferences.as_ref())))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use wallrec_test_utils::assert_approx_eq;

    use super::*;
    use crate::{
        embedding::Embedding,
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
                .with_style("minimalist")
                .with_mood("calm")
                .with_embedding(Embedding::from([1., 0.])),
        );
        store.insert_item(
            item(2)
                .with_tags(["sky"])
                .with_style("minimalist")
                .with_download_count(10_000)
                .with_embedding(Embedding::from([0.8, 0.6])),
        );
        store.insert_item(
            item(3)
                .with_tags(["sky", "sea", "sun"])
                .with_categories(["nature"])
                .with_mood("calm")
                .with_embedding(Embedding::from([0., 1.])),
        );
        store.insert_item(item(4).with_download_count(5_000));
        rate(&mut store, 1, 1, 5., 0);
        rate(&mut store, 1, 2, 4., 1);
        rate(&mut store, 2, 1, 4., 2);
        rate(&mut store, 2, 3, 5., 3);
        rate(&mut store, 3, 4, 1., 4);
        store.set_user_embedding(UserId::new(3), Embedding::from([0.6, 0.8]));
        store
    }

    fn item_cf(store: &Store) -> ItemCf {
        ItemCf::build(store.histories(), 4., 80)
    }

    #[test]
    fn test_parse_strategies() {
        assert_eq!("emb".parse(), Ok(FeedStrategy::Embedding));
        assert_eq!("ItemCF".parse(), Ok(FeedStrategy::ItemCf));
        assert_eq!("popularity".parse(), Ok(FeedStrategy::Popularity));
        assert_eq!("default".parse(), Ok(FeedStrategy::InsertionOrder));
        assert_eq!(
            "random".parse::<FeedStrategy>(),
            Err(UnknownStrategy("random".into())),
        );
        assert_eq!("attributes".parse(), Ok(SimilarStrategy::Attributes));
        assert_eq!("emb".parse(), Ok(SimilarStrategy::Embedding));
        assert!("itemcf".parse::<SimilarStrategy>().is_err());
    }

    #[test]
    fn test_attribute_similarity() {
        let store = store();
        let seed = store.item(ItemId::new(1)).unwrap();
        let candidate = store.item(ItemId::new(3)).unwrap();
        // tags 2 / 3, categories 1 / 1, no style, same mood, rating 5 / 5
        assert_approx_eq!(
            f32,
            attribute_similarity(seed, candidate),
            0.3 * 2. / 3. + 0.2 + 0.1 + 0.2,
            epsilon = 1e-6,
        );
        let untagged = store.item(ItemId::new(4)).unwrap();
        assert_approx_eq!(f32, attribute_similarity(untagged, seed), 0.2 * 4.5 / 5.);
    }

    #[test]
    fn test_rank_feed_by_popularity() {
        let store = store();
        let (item_cf, config) = (item_cf(&store), Config::default());
        let ranker = Ranker::new(&store, &item_cf, &config);
        let user = store.user(UserId::new(3)).unwrap();
        // 2: 0.6 * 0.8 + 0.4, 3: 0.6, 1: 0.6 * 0.9
        assert_eq!(
            ranker.rank_for_user(user, &ids(&[1, 2, 3]), FeedStrategy::Popularity),
            ids(&[2, 3, 1]),
        );
    }

    #[test]
    fn test_rank_feed_by_embedding_keeps_unavailable() {
        let store = store();
        let (item_cf, config) = (item_cf(&store), Config::default());
        let ranker = Ranker::new(&store, &item_cf, &config);
        let user = store.user(UserId::new(3)).unwrap();
        let ranked = ranker.rank_for_user(user, &ids(&[4, 3, 1, 2]), FeedStrategy::Embedding);
        // similarities 0.96, 0.8, 0.6 and the discounted popularity of the item without embedding
        assert_eq!(ranked, ids(&[2, 3, 1, 4]));

        let anonymous = store.user(UserId::new(1)).unwrap();
        let ranked = ranker.rank_for_user(anonymous, &ids(&[1, 2, 3, 4]), FeedStrategy::Embedding);
        assert_eq!(ranked, ids(&[2, 3, 1, 4]));
    }

    #[test]
    fn test_rank_feed_by_item_cf_falls_back_to_prior() {
        let store = store();
        let (item_cf, config) = (item_cf(&store), Config::default());
        let ranker = Ranker::new(&store, &item_cf, &config);
        let user = store.user(UserId::new(1)).unwrap();
        // 3 co-occurs with 1, 4 only has the prior
        assert_eq!(
            ranker.rank_for_user(user, &ids(&[4, 3]), FeedStrategy::ItemCf),
            ids(&[3, 4]),
        );

        let cold = store.user(UserId::new(3)).unwrap();
        assert_eq!(
            ranker.rank_for_user(cold, &ids(&[4, 2, 1, 3]), FeedStrategy::ItemCf),
            ids(&[3, 1, 2, 4]),
        );
    }

    #[test]
    fn test_rank_feed_in_insertion_order() {
        let store = store();
        let (item_cf, config) = (item_cf(&store), Config::default());
        let ranker = Ranker::new(&store, &item_cf, &config);
        let user = store.user(UserId::new(1)).unwrap();
        assert_eq!(
            ranker.rank_for_user(user, &ids(&[4, 9, 1, 3]), FeedStrategy::InsertionOrder),
            ids(&[4, 1, 3]),
        );
    }

    #[test]
    fn test_rank_similar() {
        let store = store();
        let (item_cf, config) = (item_cf(&store), Config::default());
        let ranker = Ranker::new(&store, &item_cf, &config);
        let seed = store.item(ItemId::new(1)).unwrap();
        assert_eq!(
            ranker.rank_similar(seed, &ids(&[4, 3, 2]), SimilarStrategy::Embedding),
            ids(&[2, 3, 4]),
        );
        assert_eq!(
            ranker.rank_similar(seed, &ids(&[4, 2, 3]), SimilarStrategy::Attributes),
            ids(&[3, 2, 4]),
        );
    }

    #[test]
    fn test_rank_for_scenario() {
        let store = store();
        let (item_cf, config) = (item_cf(&store), Config::default());
        let ranker = Ranker::new(&store, &item_cf, &config);
        let sleep = Scenario::Sleep.config();
        let ranked = ranker.rank_for_scenario(sleep, None, &ids(&[4, 3, 2, 1]));
        // 1: style, mood and category; 3: mood and category; 2: style
        assert_eq!(ranked, ids(&[1, 3, 2, 4]));

        let user = store.user(UserId::new(2)).unwrap();
        let ranked = ranker.rank_for_scenario(sleep, Some(user), &ids(&[2, 3]));
        assert_eq!(ranked, ids(&[3, 2]));
    }
}
