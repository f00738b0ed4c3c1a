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

//! Temporal leave-n-out split of the interaction histories.

use std::collections::{BTreeMap, HashSet};

use tracing::info;
use wallrec_engine::{ItemId, Rating, UserId};

/// The training and test partitions of the eligible users.
#[derive(Clone, Debug, Default)]
pub struct Split {
    train: BTreeMap<UserId, Vec<Rating>>,
    test: BTreeMap<UserId, Vec<Rating>>,
    ineligible: usize,
}

impl Split {
    /// Pairs given training and test partitions.
    ///
    /// Users without training ratings can't be evaluated, they are dropped and counted as
    /// ineligible. Users without test ratings have no ground truth.
    pub fn new(
        train: BTreeMap<UserId, Vec<Rating>>,
        mut test: BTreeMap<UserId, Vec<Rating>>,
    ) -> Self {
        let mut split = Self::default();
        for (user, ratings) in train {
            let held_out = test.remove(&user).unwrap_or_default();
            if ratings.is_empty() {
                split.ineligible += 1;
                continue;
            }
            split.train.insert(user, ratings);
            split.test.insert(user, held_out);
        }
        split.ineligible += test.len();

        split
    }

    /// Splits each history into all but the last `leave_out` ratings for training and the last
    /// `leave_out` ratings for testing, ordered by timestamp.
    ///
    /// A user is eligible if more than `leave_out` ratings exist and at least `min_train` of them
    /// remain for training. Ineligible users are dropped from both partitions.
    pub fn temporal(
        by_user: BTreeMap<UserId, Vec<Rating>>,
        leave_out: usize,
        min_train: usize,
    ) -> Self {
        let mut split = Self::default();
        for (user, mut ratings) in by_user {
            let total = ratings.len();
            if total <= leave_out || total - leave_out < min_train {
                split.ineligible += 1;
                continue;
            }
            // stable, ratings with equal timestamps keep their order of appearance
            ratings.sort_by_key(|rating| rating.timestamp);
            let test = ratings.split_off(total - leave_out);
            split.train.insert(user, ratings);
            split.test.insert(user, test);
        }
        info!(
            eligible = split.train.len(),
            ineligible = split.ineligible,
            "split interactions",
        );

        split
    }

    /// The eligible users in ascending order.
    pub fn users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.train.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.train.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train.is_empty()
    }

    /// The number of users excluded for having too few ratings.
    pub fn ineligible(&self) -> usize {
        self.ineligible
    }

    pub fn train(&self) -> &BTreeMap<UserId, Vec<Rating>> {
        &self.train
    }

    pub fn train_of(&self, user: UserId) -> &[Rating] {
        self.train.get(&user).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn test_of(&self, user: UserId) -> &[Rating] {
        self.test.get(&user).map(Vec::as_slice).unwrap_or_default()
    }

    /// The held out items the user liked.
    pub fn ground_truth(&self, user: UserId, like_threshold: f32) -> HashSet<ItemId> {
        self.test_of(user)
            .iter()
            .filter(|rating| rating.is_liked(like_threshold))
            .map(|rating| rating.item)
            .collect()
    }

    /// The items the user rated during training.
    pub fn seen(&self, user: UserId) -> HashSet<ItemId> {
        self.train_of(user)
            .iter()
            .map(|rating| rating.item)
            .collect()
    }
}
