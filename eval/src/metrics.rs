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

//! Ranking quality metrics at a cutoff.

use std::{collections::HashSet, ops::AddAssign};

use serde::Serialize;
use wallrec_engine::ItemId;

/// Precision, recall, normalized discounted cumulative gain and hit rate at a cutoff `k`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub precision: f64,
    pub recall: f64,
    pub ndcg: f64,
    pub hit_rate: f64,
}

impl Metrics {
    /// Scores the top `k` recommendations of a user against the ground truth.
    #[allow(clippy::cast_precision_loss)]
    pub fn at_k(recommendations: &[ItemId], ground_truth: &HashSet<ItemId>, k: usize) -> Self {
        if k == 0 || ground_truth.is_empty() {
            return Self::default();
        }

        let top = &recommendations[..k.min(recommendations.len())];
        let hits = top
            .iter()
            .filter(|item| ground_truth.contains(*item))
            .count();
        let dcg = top
            .iter()
            .enumerate()
            .filter(|(_, item)| ground_truth.contains(*item))
            .map(|(index, _)| discount(index + 1))
            .sum::<f64>();
        let idcg = (1..=k.min(ground_truth.len())).map(discount).sum::<f64>();

        Self {
            precision: hits as f64 / k as f64,
            recall: hits as f64 / ground_truth.len() as f64,
            ndcg: if idcg > 0. { dcg / idcg } else { 0. },
            hit_rate: if hits > 0 { 1. } else { 0. },
        }
    }
}

/// The gain discount of a hit at the 1-indexed `rank`.
#[allow(clippy::cast_precision_loss)]
fn discount(rank: usize) -> f64 {
    1. / (rank as f64 + 2.).log2()
}

impl AddAssign for Metrics {
    fn add_assign(&mut self, other: Self) {
        self.precision += other.precision;
        self.recall += other.recall;
        self.ndcg += other.ndcg;
        self.hit_rate += other.hit_rate;
    }
}

/// Running mean of the metrics of several users.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeanMetrics {
    users: usize,
    sum: Metrics,
}

impl MeanMetrics {
    pub fn add(&mut self, metrics: Metrics) {
        self.users += 1;
        self.sum += metrics;
    }

    pub fn users(&self) -> usize {
        self.users
    }

    /// The mean over all added users, all zero if there are none.
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> Metrics {
        if self.users == 0 {
            return Metrics::default();
        }
        let users = self.users as f64;
        Metrics {
            precision: self.sum.precision / users,
            recall: self.sum.recall / users,
            ndcg: self.sum.ndcg / users,
            hit_rate: self.sum.hit_rate / users,
        }
    }
}

#[cfg(test)]
mod tests {
    use wallrec_test_utils::assert_approx_eq;

    use super::*;

    fn ids(ids: &[u32]) -> Vec<ItemId> {
        ids.iter().copied().map(ItemId::new).collect()
    }

    fn truth(ids: &[u32]) -> HashSet<ItemId> {
        ids.iter().copied().map(ItemId::new).collect()
    }

    #[test]
    fn test_hit_at_first_rank() {
        let metrics = Metrics::at_k(&ids(&[5, 3]), &truth(&[5]), 2);
        assert_approx_eq!(f64, metrics.precision, 0.5);
        assert_approx_eq!(f64, metrics.recall, 1.);
        assert_approx_eq!(f64, metrics.hit_rate, 1.);
        assert_approx_eq!(f64, metrics.ndcg, 1.);
    }

    #[test]
    fn test_hit_at_second_rank() {
        let metrics = Metrics::at_k(&ids(&[3, 5]), &truth(&[5, 7]), 2);
        assert_approx_eq!(f64, metrics.precision, 0.5);
        assert_approx_eq!(f64, metrics.recall, 0.5);
        assert_approx_eq!(f64, metrics.hit_rate, 1.);
        // 1/log2(4) / (1/log2(3) + 1/log2(4))
        assert_approx_eq!(f64, metrics.ndcg, 0.5 / (1. / 3_f64.log2() + 0.5));
    }

    #[test]
    fn test_no_hits() {
        let metrics = Metrics::at_k(&ids(&[1, 2, 3]), &truth(&[4]), 3);
        assert_eq!(metrics, Metrics::default());
    }

    #[test]
    fn test_only_top_k_count() {
        let metrics = Metrics::at_k(&ids(&[1, 2, 3]), &truth(&[3]), 2);
        assert_eq!(metrics, Metrics::default());
    }

    #[test]
    fn test_short_recommendations() {
        let metrics = Metrics::at_k(&ids(&[4]), &truth(&[4, 5, 6]), 4);
        assert_approx_eq!(f64, metrics.precision, 0.25);
        assert_approx_eq!(f64, metrics.recall, 1. / 3.);
        assert_approx_eq!(f64, metrics.hit_rate, 1.);
        let idcg = 1. / 3_f64.log2() + 0.5 + 1. / 5_f64.log2();
        assert_approx_eq!(f64, metrics.ndcg, (1. / 3_f64.log2()) / idcg);
    }

    #[test]
    fn test_bounds() {
        let metrics = Metrics::at_k(&ids(&[1, 2, 3, 4]), &truth(&[1, 2, 3, 4]), 4);
        assert_approx_eq!(f64, metrics.precision, 1.);
        assert_approx_eq!(f64, metrics.recall, 1.);
        assert_approx_eq!(f64, metrics.ndcg, 1.);
    }

    #[test]
    fn test_empty_ground_truth_and_zero_k() {
        assert_eq!(
            Metrics::at_k(&ids(&[1]), &HashSet::new(), 1),
            Metrics::default(),
        );
        assert_eq!(Metrics::at_k(&ids(&[1]), &truth(&[1]), 0), Metrics::default());
    }

    #[test]
    fn test_mean() {
        let mut mean = MeanMetrics::default();
        assert_eq!(mean.mean(), Metrics::default());

        mean.add(Metrics::at_k(&ids(&[5, 3]), &truth(&[5]), 2));
        mean.add(Metrics::at_k(&ids(&[1, 2]), &truth(&[9]), 2));
        assert_eq!(mean.users(), 2);
        let mean = mean.mean();
        assert_approx_eq!(f64, mean.precision, 0.25);
        assert_approx_eq!(f64, mean.recall, 0.5);
        assert_approx_eq!(f64, mean.ndcg, 0.5);
        assert_approx_eq!(f64, mean.hit_rate, 0.5);
    }
}
