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

use std::cmp::Ordering;

use crate::id::ItemId;

/// Allows comparing and sorting f32 even if `NaN` is involved.
///
/// `NaN` is treated as the lowest possible value, similar to what [`f32::max`] does.
#[allow(clippy::trivially_copy_pass_by_ref)]
// we allow the lint because we want to use the function for `std::slice::sort_by`
pub(crate) fn nan_safe_f32_cmp(a: &f32, b: &f32) -> Ordering {
    a.partial_cmp(b).unwrap_or_else(|| {
        // if `partial_cmp` returns None we have at least one `NaN`
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, _) => Ordering::Greater,
        }
    })
}

/// Like [`nan_safe_f32_cmp`] but for a descending order, i.e. `[2.0, 1.5, 0.5, NaN]`.
#[allow(clippy::trivially_copy_pass_by_ref)]
pub(crate) fn nan_safe_f32_cmp_desc(a: &f32, b: &f32) -> Ordering {
    nan_safe_f32_cmp(b, a)
}

/// Orders by descending score with ties broken by ascending id.
pub(crate) fn cmp_scored_desc(a: &(ItemId, f32), b: &(ItemId, f32)) -> Ordering {
    nan_safe_f32_cmp_desc(&a.1, &b.1).then_with(|| a.0.cmp(&b.0))
}

/// Sorts scored items by descending score, ties broken by ascending id, and drops the scores.
pub(crate) fn rank_by_score(mut scored: Vec<(ItemId, f32)>) -> Vec<ItemId> {
    scored.sort_by(cmp_scored_desc);
    scored.into_iter().map(|(id, _)| id).collect()
}

/// Like [`rank_by_score`] but items without a score are ranked last in ascending id order.
pub(crate) fn rank_by_optional_score(mut scored: Vec<(ItemId, Option<f32>)>) -> Vec<ItemId> {
    scored.sort_by(|(a_id, a), (b_id, b)| {
        match (a, b) {
            (Some(a), Some(b)) => nan_safe_f32_cmp_desc(a, b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| a_id.cmp(b_id))
    });
    scored.into_iter().map(|(id, _)| id).collect()
}
