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

use derive_more::{Deref, From};
use ndarray::{Array1, ArrayView1};

/// The closed range of valid cosine similarities.
pub const COSINE_SIMILARITY_RANGE: [f32; 2] = [-1., 1.];

/// A dense vector representation of an item or a user.
#[derive(Clone, Debug, Deref, From, PartialEq)]
pub struct Embedding(Array1<f32>);

impl Embedding {
    /// The l2 norm of the embedding.
    pub fn norm(&self) -> f32 {
        self.0.dot(&self.0).sqrt()
    }

    pub fn view(&self) -> ArrayView1<'_, f32> {
        self.0.view()
    }

    /// Computes the cosine similarity to another embedding.
    ///
    /// Returns `None` if the dimensions differ. A zero vector on either side has similarity `0`.
    pub fn cosine_similarity(&self, other: &Self) -> Option<f32> {
        if self.len() != other.len() {
            return None;
        }

        let norms = self.norm() * other.norm();
        if norms <= 0. || !norms.is_finite() {
            return Some(0.);
        }

        let [min, max] = COSINE_SIMILARITY_RANGE;
        Some((self.0.dot(&other.0) / norms).clamp(min, max))
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self(Array1::from(values))
    }
}

impl<const N: usize> From<[f32; N]> for Embedding {
    fn from(values: [f32; N]) -> Self {
        Self(Array1::from(values.to_vec()))
    }
}

impl FromIterator<f32> for Embedding {
    fn from_iter<I: IntoIterator<Item = f32>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Computes the cosine similarity of two optional embeddings.
///
/// The similarity is unavailable if either embedding is absent or if their dimensions differ.
pub fn cosine_similarity(a: Option<&Embedding>, b: Option<&Embedding>) -> Option<f32> {
    a.zip(b).and_then(|(a, b)| a.cosine_similarity(b))
}

#[cfg(test)]
mod tests {
    use wallrec_test_utils::assert_approx_eq;

    use super::*;

    #[test]
    fn test_identical_vectors() {
        let a = Embedding::from([1., 2., 3.]);
        assert_approx_eq!(f32, a.cosine_similarity(&a).unwrap(), 1.);
    }

    #[test]
    fn test_orthogonal_vectors() {
        let a = Embedding::from([1., 0.]);
        let b = Embedding::from([0., 4.]);
        assert_approx_eq!(f32, a.cosine_similarity(&b).unwrap(), 0.);
    }

    #[test]
    fn test_opposite_vectors() {
        let a = Embedding::from([1., 1.]);
        let b = Embedding::from([-2., -2.]);
        assert_approx_eq!(f32, a.cosine_similarity(&b).unwrap(), -1.);
    }

    #[test]
    fn test_zero_norm() {
        let a = Embedding::from([0., 0.]);
        let b = Embedding::from([1., 2.]);
        assert_eq!(a.cosine_similarity(&b), Some(0.));
        assert_eq!(b.cosine_similarity(&a), Some(0.));
    }

    #[test]
    fn test_unavailable() {
        let a = Embedding::from([1., 2.]);
        let b = Embedding::from([1., 2., 3.]);
        assert!(a.cosine_similarity(&b).is_none());
        assert!(cosine_similarity(Some(&a), None).is_none());
        assert!(cosine_similarity(None, Some(&a)).is_none());
        assert!(cosine_similarity(Some(&a), Some(&a)).is_some());
    }

    #[test]
    fn test_collect() {
        let embedding = [0.5, 0.25].into_iter().collect::<Embedding>();
        assert_eq!(embedding.len(), 2);
        assert_approx_eq!(f32, embedding.norm(), 0.559_017, epsilon = 1e-6);
    }
}
