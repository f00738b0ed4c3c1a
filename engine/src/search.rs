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
use tracing::{debug, instrument};

use crate::{
    embedding::Embedding,
    id::ItemId,
    store::{Item, Store},
    utils::rank_by_score,
};

const TITLE_MATCH: u32 = 10;
const TAG_MATCH: u32 = 5;
const CATEGORY_MATCH: u32 = 3;

/// Searches the store by query embeddings and keywords.
#[derive(Clone, Copy, Debug)]
pub struct Searcher<'a> {
    store: &'a Store,
}

impl<'a> Searcher<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Searches by query embedding and falls back to keyword matching.
    ///
    /// Without a query embedding only the keywords are matched. If the embedding yields less than
    /// half of the requested results, the keyword matches are appended.
    #[instrument(skip(self, embedding))]
    pub fn search(&self, text: &str, embedding: Option<&Embedding>, size: usize) -> Vec<ItemId> {
        let Some(embedding) = embedding else {
            return self.by_text(text, size);
        };

        let mut results = self.by_embedding(embedding, size);
        if results.len() < size / 2 {
            debug!(results = results.len(), "merging keyword matches");
            results = results
                .into_iter()
                .chain(self.by_text(text, size))
                .unique()
                .take(size)
                .collect();
        }

        results
    }

    /// Ranks the items with an embedding by their similarity to the query.
    pub fn by_embedding(&self, query: &Embedding, size: usize) -> Vec<ItemId> {
        self.rank_embedded(size, |embedding| query.cosine_similarity(embedding))
    }

    /// Ranks the items by their average similarity to all queries.
    pub fn search_all(&self, queries: &[Embedding], size: usize) -> Vec<ItemId> {
        if queries.is_empty() {
            return Vec::new();
        }
        #[allow(clippy::cast_precision_loss)] // small number of queries
        let len = queries.len() as f32;
        self.rank_embedded(size, |embedding| {
            queries
                .iter()
                .map(|query| query.cosine_similarity(embedding))
                .sum::<Option<f32>>()
                .map(|sum| sum / len)
        })
    }

    /// Ranks the items by their highest similarity to any query.
    pub fn search_any(&self, queries: &[Embedding], size: usize) -> Vec<ItemId> {
        self.rank_embedded(size, |embedding| {
            queries
                .iter()
                .filter_map(|query| query.cosine_similarity(embedding))
                .reduce(f32::max)
        })
    }

    fn rank_embedded(
        &self,
        size: usize,
        similarity: impl Fn(&Embedding) -> Option<f32>,
    ) -> Vec<ItemId> {
        let scored = self
            .store
            .items()
            .filter_map(|item| {
                let score = similarity(item.embedding()?)?;
                Some((item.id(), score))
            })
            .collect();
        let mut ranked = rank_by_score(scored);
        ranked.truncate(size);
        ranked
    }

    /// Ranks the items by case-insensitive keyword matches in title, tags and categories.
    ///
    /// Items without any match are dropped.
    pub fn by_text(&self, text: &str, size: usize) -> Vec<ItemId> {
        let keyword = text.trim().to_lowercase();
        if keyword.is_empty() {
            return Vec::new();
        }

        let scored = self
            .store
            .items()
            .filter_map(|item| {
                #[allow(clippy::cast_precision_loss)] // small integer scores
                let score = text_score(item, &keyword) as f32;
                (score > 0.).then_some((item.id(), score))
            })
            .collect();
        let mut ranked = rank_by_score(scored);
        ranked.truncate(size);
        ranked
    }
}

#[allow(clippy::cast_possible_truncation)] // small sets
fn text_score(item: &Item, keyword: &str) -> u32 {
    let contains = |value: &str| value.to_lowercase().contains(keyword);
    let title = if contains(item.title()) { TITLE_MATCH } else { 0 };
    let tags = item.tags().iter().filter(|tag| contains(tag.as_str())).count();
    let categories = item
        .categories()
        .iter()
        .filter(|category| contains(category.as_str()))
        .count();

    title + TAG_MATCH * tags as u32 + CATEGORY_MATCH * categories as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::item;

    fn ids(ids: &[u32]) -> Vec<ItemId> {
        ids.iter().copied().map(ItemId::new).collect()
    }

    fn store() -> Store {
        let mut store = Store::new();
        store.insert_item(
            item(1)
                .with_title("Neon City")
                .with_tags(["night", "city lights"])
                .with_categories(["city"])
                .with_embedding(Embedding::from([1., 0.])),
        );
        store.insert_item(
            item(2)
                .with_title("Forest")
                .with_tags(["green", "City park"])
                .with_embedding(Embedding::from([0.6, 0.8])),
        );
        store.insert_item(item(3).with_title("Quiet lake").with_categories(["nature"]));
        store.insert_item(item(4).with_embedding(Embedding::from([0., 1., 0.])));
        store
    }

    #[test]
    fn test_by_text() {
        let store = store();
        let searcher = Searcher::new(&store);
        // 1: title, tag and category; 2: tag
        assert_eq!(searcher.by_text(" CITY ", 10), ids(&[1, 2]));
        assert_eq!(searcher.by_text("lake", 10), ids(&[3]));
        assert!(searcher.by_text("desert", 10).is_empty());
        assert!(searcher.by_text("  ", 10).is_empty());
        assert_eq!(text_score(store.item(ItemId::new(1)).unwrap(), "city"), 18);
    }

    #[test]
    fn test_by_embedding_skips_unavailable() {
        let store = store();
        let searcher = Searcher::new(&store);
        let query = Embedding::from([0., 1.]);
        assert_eq!(searcher.by_embedding(&query, 10), ids(&[2, 1]));
        assert_eq!(searcher.by_embedding(&query, 1), ids(&[2]));
    }

    #[test]
    fn test_search_merges_keyword_matches() {
        let store = store();
        let searcher = Searcher::new(&store);
        let query = Embedding::from([1., 0.]);
        assert_eq!(searcher.search("lake", Some(&query), 2), ids(&[1, 2]));
        assert_eq!(searcher.search("lake", Some(&query), 6), ids(&[1, 2, 3]));
        assert_eq!(searcher.search("lake", None, 6), ids(&[3]));

        let mismatched = Embedding::from([1., 0., 0., 0.]);
        assert_eq!(searcher.search("city", Some(&mismatched), 4), ids(&[1, 2]));
    }

    #[test]
    fn test_multiple_queries() {
        let store = store();
        let searcher = Searcher::new(&store);
        let queries = [Embedding::from([1., 0.]), Embedding::from([0., 1.])];
        // averages 0.5 and 0.7, maxima 1 and 0.8
        assert_eq!(searcher.search_all(&queries, 10), ids(&[2, 1]));
        assert_eq!(searcher.search_any(&queries, 10), ids(&[1, 2]));
        assert!(searcher.search_all(&[], 10).is_empty());
        assert!(searcher.search_any(&[], 10).is_empty());
    }
}
