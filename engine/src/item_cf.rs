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

use std::collections::{BTreeSet, HashMap, HashSet};

use rayon::prelude::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, instrument};

use crate::{
    id::ItemId,
    rating::Rating,
    utils::{cmp_scored_desc, rank_by_score},
};

/// An item-to-item co-occurrence model over liked items.
///
/// Two items co-occur if the same user liked both of them. Their similarity is the number of
/// co-occurrences normalized by the geometric mean of their like counts.
#[derive(Clone, Debug, Default)]
pub struct ItemCf {
    neighbors: HashMap<ItemId, Vec<(ItemId, f32)>>,
    like_counts: HashMap<ItemId, u32>,
    like_threshold: f32,
}

impl ItemCf {
    /// Builds the model from the rating histories of users.
    ///
    /// Each item retains at most `max_neighbors` of its most similar items.
    #[instrument(skip(histories))]
    pub fn build<'a, H, R>(histories: H, like_threshold: f32, max_neighbors: usize) -> Self
    where
        H: IntoIterator<Item = R>,
        R: IntoIterator<Item = &'a Rating>,
    {
        let mut like_counts = HashMap::<ItemId, u32>::new();
        let mut co_counts = HashMap::<ItemId, HashMap<ItemId, u32>>::new();
        for history in histories {
            let liked = history
                .into_iter()
                .filter(|rating| rating.is_liked(like_threshold))
                .map(|rating| rating.item)
                .collect::<BTreeSet<_>>();
            for &item in &liked {
                *like_counts.entry(item).or_default() += 1;
            }
            for (index, &a) in liked.iter().enumerate() {
                for &b in liked.iter().skip(index + 1) {
                    *co_counts.entry(a).or_default().entry(b).or_default() += 1;
                    *co_counts.entry(b).or_default().entry(a).or_default() += 1;
                }
            }
        }

        let neighbors = co_counts
            .into_par_iter()
            .map(|(item, co_counts)| {
                let count = like_counts.get(&item).copied().unwrap_or_default();
                let mut row = co_counts
                    .into_iter()
                    .filter_map(|(other, co_count)| {
                        let other_count = like_counts.get(&other).copied().unwrap_or_default();
                        (count > 0 && other_count > 0).then(|| {
                            #[allow(clippy::cast_possible_truncation)]
                            let similarity = (f64::from(co_count)
                                / (f64::from(count) * f64::from(other_count)).sqrt())
                                as f32;
                            (other, similarity)
                        })
                    })
                    .collect::<Vec<_>>();
                row.sort_by(cmp_scored_desc);
                row.truncate(max_neighbors);
                (item, row)
            })
            .collect::<HashMap<_, _>>();
        debug!(items = neighbors.len(), "built item cf model");

        Self {
            neighbors,
            like_counts,
            like_threshold,
        }
    }

    /// The retained neighbors of an item in descending order of similarity.
    pub fn neighbors(&self, item: ItemId) -> &[(ItemId, f32)] {
        self.neighbors
            .get(&item)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The number of users who liked the item.
    pub fn like_count(&self, item: ItemId) -> u32 {
        self.like_counts.get(&item).copied().unwrap_or_default()
    }

    pub fn like_threshold(&self) -> f32 {
        self.like_threshold
    }

    /// The similarity of two items if either retained the other as neighbor.
    pub fn similarity(&self, a: ItemId, b: ItemId) -> Option<f32> {
        let find = |row: &[(ItemId, f32)], target| {
            row.iter()
                .find_map(|&(id, similarity)| (id == target).then_some(similarity))
        };
        find(self.neighbors(a), b).or_else(|| find(self.neighbors(b), a))
    }

    /// Scores a candidate for a user by the neighbor rows of the items they liked.
    ///
    /// Each liked item contributes the similarity of the candidate in its row, weighted by the
    /// scaled rating. Returns `None` if no liked item retained the candidate.
    pub fn score<'a>(
        &self,
        history: impl IntoIterator<Item = &'a Rating>,
        candidate: ItemId,
    ) -> Option<f32> {
        history
            .into_iter()
            .filter(|rating| rating.is_liked(self.like_threshold))
            .filter_map(|rating| {
                self.neighbors(rating.item)
                    .iter()
                    .find_map(|&(id, similarity)| {
                        (id == candidate).then_some(similarity * rating.preference())
                    })
            })
            .reduce(|a, b| a + b)
    }

    /// Recommends up to `k` unseen items by aggregating the neighbor rows of liked items.
    pub fn recommend<'a>(
        &self,
        history: impl IntoIterator<Item = &'a Rating>,
        seen: &HashSet<ItemId>,
        k: usize,
    ) -> Vec<ItemId> {
        let mut scores = HashMap::<ItemId, f32>::new();
        for rating in history {
            if !rating.is_liked(self.like_threshold) {
                continue;
            }
            for &(id, similarity) in self.neighbors(rating.item) {
                if !seen.contains(&id) {
                    *scores.entry(id).or_default() += similarity * rating.preference();
                }
            }
        }

        let mut recommendations = rank_by_score(scores.into_iter().collect());
        recommendations.truncate(k);
        recommendations
    }
}
