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

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument};

use crate::{
    id::ItemId,
    rating::{Rating, MAX_SCORE},
    store::Item,
    utils::cmp_scored_desc,
};

/// The download count at which the download signal saturates.
const DOWNLOAD_SATURATION: f32 = 10_000.;

/// Blends the rating and download signals of an item into a live popularity score from `[0, 1]`.
#[allow(clippy::cast_precision_loss)] // realistic download counts
pub fn popularity_score(item: &Item) -> f32 {
    let rating = (item.average_rating() / MAX_SCORE).clamp(0., 1.);
    let downloads = (item.download_count() as f32 / DOWNLOAD_SATURATION).min(1.);
    0.6 * rating + 0.4 * downloads
}

/// A global ranking of items by likes in a set of rating histories.
///
/// The score of an item is its number of likes plus a tenth of its average rating.
#[derive(Clone, Debug, Default)]
pub struct PopularityModel {
    ranked: Vec<(ItemId, f32)>,
}

impl PopularityModel {
    /// Builds the model from the rating histories of users.
    #[instrument(skip_all)]
    pub fn build<'a, H, R>(histories: H, like_threshold: f32) -> Self
    where
        H: IntoIterator<Item = R>,
        R: IntoIterator<Item = &'a Rating>,
    {
        #[derive(Default)]
        struct Stats {
            likes: u32,
            sum: f32,
            count: u32,
        }

        let mut stats = HashMap::<ItemId, Stats>::new();
        for rating in histories.into_iter().flatten() {
            let stats = stats.entry(rating.item).or_default();
            stats.sum += rating.score;
            stats.count += 1;
            if rating.is_liked(like_threshold) {
                stats.likes += 1;
            }
        }

        #[allow(clippy::cast_precision_loss)] // realistic rating counts
        let mut ranked = stats
            .into_iter()
            .map(|(id, stats)| {
                let average = stats.sum / stats.count as f32;
                (id, stats.likes as f32 + 0.1 * average)
            })
            .collect::<Vec<_>>();
        ranked.sort_by(cmp_scored_desc);
        debug!(items = ranked.len(), "built popularity model");

        Self { ranked }
    }

    /// The items in descending order of popularity.
    pub fn ranked(&self) -> impl ExactSizeIterator<Item = ItemId> + '_ {
        self.ranked.iter().map(|&(id, _)| id)
    }

    pub fn score(&self, item: ItemId) -> Option<f32> {
        self.ranked
            .iter()
            .find_map(|&(id, score)| (id == item).then_some(score))
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// Recommends the `k` most popular items which haven't been seen.
    pub fn recommend(&self, seen: &HashSet<ItemId>, k: usize) -> Vec<ItemId> {
        let mut recommendations = Vec::with_capacity(k);
        self.fill_up(&mut recommendations, seen, k);
        recommendations
    }

    /// Appends unseen popular items which aren't recommended yet until there are `k` items.
    pub fn fill_up(&self, recommendations: &mut Vec<ItemId>, seen: &HashSet<ItemId>, k: usize) {
        if recommendations.len() >= k {
            return;
        }
        let mut present = recommendations.iter().copied().collect::<HashSet<_>>();
        for id in self.ranked() {
            if recommendations.len() >= k {
                break;
            }
            if !seen.contains(&id) && present.insert(id) {
                recommendations.push(id);
            }
        }
    }
}
