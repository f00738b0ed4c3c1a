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

use serde::{Deserialize, Serialize};

use crate::id::{ItemId, UserId};

/// The highest score of the rating scale.
pub const MAX_SCORE: f32 = 5.;

/// A single rating event of a user for an item.
///
/// Ratings are immutable once created and shared between the user's and the item's histories.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    #[serde(rename = "userId")]
    pub user: UserId,
    #[serde(rename = "itemId", alias = "wallpaperId")]
    pub item: ItemId,
    #[serde(rename = "rating")]
    pub score: f32,
    /// Seconds since the unix epoch.
    pub timestamp: i64,
}

impl Rating {
    pub fn new(user: UserId, item: ItemId, score: f32, timestamp: i64) -> Self {
        Self {
            user,
            item,
            score,
            timestamp,
        }
    }

    pub fn is_liked(&self, like_threshold: f32) -> bool {
        self.score >= like_threshold
    }

    /// The score scaled into the unit interval.
    pub fn preference(&self) -> f32 {
        (self.score / MAX_SCORE).clamp(0., 1.)
    }
}

/// A bounded list of the highest ratings of an item, kept in ascending order of score.
#[derive(Clone, Debug)]
pub struct TopRatings {
    capacity: usize,
    ratings: Vec<Arc<Rating>>,
}

impl TopRatings {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ratings: Vec::with_capacity(capacity + 1),
        }
    }

    /// Inserts the rating in front of the first rating with an equal or higher score.
    ///
    /// If the capacity is exceeded afterwards the first, i.e. lowest, rating is evicted.
    pub fn insert(&mut self, rating: Arc<Rating>) {
        let index = self
            .ratings
            .iter()
            .position(|other| other.score >= rating.score)
            .unwrap_or(self.ratings.len());
        self.ratings.insert(index, rating);
        if self.ratings.len() > self.capacity {
            self.ratings.remove(0);
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    pub fn as_slice(&self) -> &[Arc<Rating>] {
        &self.ratings
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Rating> {
        self.ratings.iter().map(AsRef::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(user: u32, score: f32) -> Arc<Rating> {
        Arc::new(Rating::new(
            UserId::new(user),
            ItemId::new(0),
            score,
            i64::from(user),
        ))
    }

    fn scores(top: &TopRatings) -> Vec<f32> {
        top.iter().map(|rating| rating.score).collect()
    }

    #[test]
    fn test_preference_is_clamped() {
        let mut rating = *rating(0, 4.);
        assert!((rating.preference() - 0.8).abs() < f32::EPSILON);
        rating.score = 7.;
        assert!((rating.preference() - 1.).abs() < f32::EPSILON);
        rating.score = -1.;
        assert!(rating.preference().abs() < f32::EPSILON);
    }

    #[test]
    fn test_top_ratings_stay_sorted() {
        let mut top = TopRatings::new(10);
        for (user, score) in [3., 5., 1., 4.].into_iter().enumerate() {
            top.insert(rating(u32::try_from(user).unwrap(), score));
        }
        assert_eq!(scores(&top), [1., 3., 4., 5.]);
    }

    #[test]
    fn test_top_ratings_evict_lowest() {
        let mut top = TopRatings::new(2);
        top.insert(rating(0, 3.));
        top.insert(rating(1, 4.));
        top.insert(rating(2, 5.));
        assert_eq!(scores(&top), [4., 5.]);
        top.insert(rating(3, 1.));
        assert_eq!(scores(&top), [4., 5.]);
    }

    #[test]
    fn test_top_ratings_evict_latest_among_equal_lowest() {
        let mut top = TopRatings::new(2);
        top.insert(rating(0, 3.));
        top.insert(rating(1, 3.));
        top.insert(rating(2, 3.));
        assert_eq!(top.len(), 2);
        let users = top.iter().map(|rating| rating.user).collect::<Vec<_>>();
        assert_eq!(users, [UserId::new(1), UserId::new(0)]);
    }
}
