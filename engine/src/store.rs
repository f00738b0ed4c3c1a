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

use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap, HashSet},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use tracing::debug;

use crate::{
    embedding::Embedding,
    id::{ItemId, UserId},
    rating::{Rating, TopRatings},
    utils::nan_safe_f32_cmp_desc,
};

/// The default number of top ratings retained per item.
pub const DEFAULT_TOP_RATINGS_CAPACITY: usize = 10;

/// A recommendable item with its descriptive attributes and aggregated rating statistics.
#[derive(Clone, Debug)]
pub struct Item {
    id: ItemId,
    external_id: String,
    title: String,
    tags: BTreeSet<String>,
    categories: BTreeSet<String>,
    style: Option<String>,
    mood: Option<String>,
    color_palette: Option<String>,
    download_count: u32,
    upload_time: Option<DateTime<Utc>>,
    average_rating: f32,
    rating_count: u32,
    embedding: Option<Embedding>,
    ratings: Vec<Arc<Rating>>,
    top_ratings: TopRatings,
}

impl Item {
    /// Creates an item without attributes, its title defaults to the external id.
    pub fn new(id: ItemId, external_id: impl Into<String>) -> Self {
        let external_id = external_id.into();
        Self {
            id,
            title: external_id.clone(),
            external_id,
            tags: BTreeSet::new(),
            categories: BTreeSet::new(),
            style: None,
            mood: None,
            color_palette: None,
            download_count: 0,
            upload_time: None,
            average_rating: 0.,
            rating_count: 0,
            embedding: None,
            ratings: Vec::new(),
            top_ratings: TopRatings::new(DEFAULT_TOP_RATINGS_CAPACITY),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_categories(
        mut self,
        categories: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    #[must_use]
    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = Some(mood.into());
        self
    }

    #[must_use]
    pub fn with_color_palette(mut self, color_palette: impl Into<String>) -> Self {
        self.color_palette = Some(color_palette.into());
        self
    }

    #[must_use]
    pub fn with_download_count(mut self, download_count: u32) -> Self {
        self.download_count = download_count;
        self
    }

    #[must_use]
    pub fn with_upload_time(mut self, upload_time: DateTime<Utc>) -> Self {
        self.upload_time = Some(upload_time);
        self
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Embedding) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    pub fn mood(&self) -> Option<&str> {
        self.mood.as_deref()
    }

    pub fn color_palette(&self) -> Option<&str> {
        self.color_palette.as_deref()
    }

    pub fn download_count(&self) -> u32 {
        self.download_count
    }

    pub fn upload_time(&self) -> Option<DateTime<Utc>> {
        self.upload_time
    }

    /// The running mean of all scores this item received, `0` if it is unrated.
    pub fn average_rating(&self) -> f32 {
        self.average_rating
    }

    pub fn rating_count(&self) -> u32 {
        self.rating_count
    }

    pub fn embedding(&self) -> Option<&Embedding> {
        self.embedding.as_ref()
    }

    pub fn ratings(&self) -> &[Arc<Rating>] {
        &self.ratings
    }

    pub fn top_ratings(&self) -> &TopRatings {
        &self.top_ratings
    }

    #[allow(clippy::cast_precision_loss)] // realistic rating counts
    fn add_rating(&mut self, rating: Arc<Rating>) {
        let count = self.rating_count as f32;
        self.average_rating = (self.average_rating * count + rating.score) / (count + 1.);
        self.rating_count += 1;
        self.top_ratings.insert(Arc::clone(&rating));
        self.ratings.push(rating);
    }
}

/// A user with the chronological list of the ratings they gave.
#[derive(Clone, Debug)]
pub struct User {
    id: UserId,
    ratings: Vec<Arc<Rating>>,
    embedding: Option<Embedding>,
}

impl User {
    fn new(id: UserId) -> Self {
        Self {
            id,
            ratings: Vec::new(),
            embedding: None,
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    /// The ratings in insertion order.
    pub fn ratings(&self) -> &[Arc<Rating>] {
        &self.ratings
    }

    pub fn embedding(&self) -> Option<&Embedding> {
        self.embedding.as_ref()
    }

    /// The items this user has rated.
    pub fn seen(&self) -> HashSet<ItemId> {
        self.ratings.iter().map(|rating| rating.item).collect()
    }

    /// The ratings which count as likes.
    pub fn liked(&self, like_threshold: f32) -> impl Iterator<Item = &Rating> {
        self.ratings
            .iter()
            .map(AsRef::as_ref)
            .filter(move |rating| rating.is_liked(like_threshold))
    }
}

/// The order of item lookups.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortBy {
    /// Descending average rating.
    #[default]
    Rating,
    /// Descending download count.
    Downloads,
    /// Most recent upload first, items without upload time last.
    UploadTime,
    /// Index insertion order, or ascending id for unindexed lookups.
    Unsorted,
}

impl SortBy {
    fn compare(self, a: &Item, b: &Item) -> Ordering {
        match self {
            Self::Rating => nan_safe_f32_cmp_desc(&a.average_rating, &b.average_rating),
            Self::Downloads => b.download_count.cmp(&a.download_count),
            Self::UploadTime => match (a.upload_time, b.upload_time) {
                (Some(a), Some(b)) => b.cmp(&a),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            Self::Unsorted => Ordering::Equal,
        }
    }
}

/// The in-memory repository of items, users and ratings.
#[derive(Clone, Debug)]
pub struct Store {
    items: HashMap<ItemId, Item>,
    external_ids: HashMap<String, ItemId>,
    users: HashMap<UserId, User>,
    tag_index: HashMap<String, Vec<ItemId>>,
    category_index: HashMap<String, Vec<ItemId>>,
    style_index: HashMap<String, Vec<ItemId>>,
    mood_index: HashMap<String, Vec<ItemId>>,
    top_ratings_capacity: usize,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
            external_ids: HashMap::new(),
            users: HashMap::new(),
            tag_index: HashMap::new(),
            category_index: HashMap::new(),
            style_index: HashMap::new(),
            mood_index: HashMap::new(),
            top_ratings_capacity: DEFAULT_TOP_RATINGS_CAPACITY,
        }
    }

    /// Sets the number of top ratings retained for items inserted afterwards.
    #[must_use]
    pub fn with_top_ratings_capacity(mut self, capacity: usize) -> Self {
        self.top_ratings_capacity = capacity;
        self
    }

    /// Inserts an item and indexes its attributes.
    ///
    /// An item with the same id is replaced and returned, its ratings are carried over.
    pub fn insert_item(&mut self, mut item: Item) -> Option<Item> {
        let replaced = self.remove_item(item.id);
        item.top_ratings = TopRatings::new(self.top_ratings_capacity);
        item.average_rating = 0.;
        item.rating_count = 0;
        item.ratings.clear();
        if let Some(replaced) = &replaced {
            for rating in &replaced.ratings {
                item.add_rating(Arc::clone(rating));
            }
        }

        let id = item.id;
        for tag in &item.tags {
            self.tag_index.entry(tag.clone()).or_default().push(id);
        }
        for category in &item.categories {
            self.category_index
                .entry(category.clone())
                .or_default()
                .push(id);
        }
        if let Some(style) = &item.style {
            self.style_index.entry(style.clone()).or_default().push(id);
        }
        if let Some(mood) = &item.mood {
            self.mood_index.entry(mood.clone()).or_default().push(id);
        }
        self.external_ids.insert(item.external_id.clone(), id);
        self.items.insert(id, item);

        replaced
    }

    fn remove_item(&mut self, id: ItemId) -> Option<Item> {
        let item = self.items.remove(&id)?;
        let indexes = [
            &mut self.tag_index,
            &mut self.category_index,
            &mut self.style_index,
            &mut self.mood_index,
        ];
        for index in indexes {
            index.retain(|_, ids| {
                ids.retain(|&other| other != id);
                !ids.is_empty()
            });
        }
        if self.external_ids.get(&item.external_id) == Some(&id) {
            self.external_ids.remove(&item.external_id);
        }

        Some(item)
    }

    /// Records a rating for both the user and the item.
    ///
    /// The user is created on their first rating. Ratings of unknown items are kept in the
    /// user's history only.
    pub fn add_rating(&mut self, rating: Rating) -> Arc<Rating> {
        let rating = Arc::new(rating);
        self.users
            .entry(rating.user)
            .or_insert_with(|| User::new(rating.user))
            .ratings
            .push(Arc::clone(&rating));
        if let Some(item) = self.items.get_mut(&rating.item) {
            item.add_rating(Arc::clone(&rating));
        } else {
            debug!(item = %rating.item, "rating of unknown item");
        }

        rating
    }

    /// Attaches an embedding to a known item.
    pub fn set_item_embedding(&mut self, id: ItemId, embedding: Embedding) -> bool {
        self.items
            .get_mut(&id)
            .map(|item| item.embedding = Some(embedding))
            .is_some()
    }

    /// Attaches an embedding to the item with the external id.
    pub fn set_item_embedding_by_external_id(
        &mut self,
        external_id: &str,
        embedding: Embedding,
    ) -> bool {
        match self.external_ids.get(external_id) {
            Some(&id) => self.set_item_embedding(id, embedding),
            None => false,
        }
    }

    /// Attaches an embedding to a known user.
    pub fn set_user_embedding(&mut self, id: UserId, embedding: Embedding) -> bool {
        self.users
            .get_mut(&id)
            .map(|user| user.embedding = Some(embedding))
            .is_some()
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn item_by_external_id(&self, external_id: &str) -> Option<&Item> {
        self.external_ids
            .get(external_id)
            .and_then(|id| self.items.get(id))
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    /// Iterates over the items in arbitrary order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Iterates over the users in arbitrary order.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// The ratings of all users, grouped per user.
    pub fn histories(&self) -> impl Iterator<Item = impl Iterator<Item = &Rating>> {
        self.users
            .values()
            .map(|user| user.ratings.iter().map(AsRef::as_ref))
    }

    /// Returns up to `limit` items in the requested order.
    pub fn top_items(&self, limit: usize, sort_by: SortBy) -> Vec<&Item> {
        let items = self
            .items
            .values()
            .sorted_by(|a, b| sort_by.compare(a, b).then_with(|| a.id.cmp(&b.id)));
        items.take(limit).collect()
    }

    pub fn items_by_tag(&self, tag: &str, limit: usize, sort_by: SortBy) -> Vec<&Item> {
        self.lookup(&self.tag_index, tag, limit, sort_by)
    }

    pub fn items_by_category(&self, category: &str, limit: usize, sort_by: SortBy) -> Vec<&Item> {
        self.lookup(&self.category_index, category, limit, sort_by)
    }

    pub fn items_by_style(&self, style: &str, limit: usize, sort_by: SortBy) -> Vec<&Item> {
        self.lookup(&self.style_index, style, limit, sort_by)
    }

    pub fn items_by_mood(&self, mood: &str, limit: usize, sort_by: SortBy) -> Vec<&Item> {
        self.lookup(&self.mood_index, mood, limit, sort_by)
    }

    fn lookup<'a>(
        &'a self,
        index: &'a HashMap<String, Vec<ItemId>>,
        key: &str,
        limit: usize,
        sort_by: SortBy,
    ) -> Vec<&'a Item> {
        let Some(ids) = index.get(key) else {
            return Vec::new();
        };
        let items = ids.iter().filter_map(|id| self.items.get(id));
        if sort_by == SortBy::Unsorted {
            items.take(limit).collect()
        } else {
            items
                .sorted_by(|a, b| sort_by.compare(a, b).then_with(|| a.id.cmp(&b.id)))
                .take(limit)
                .collect()
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::TimeZone;
    use wallrec_test_utils::assert_approx_eq;

    use super::*;

    pub(crate) fn item(id: u32) -> Item {
        Item::new(ItemId::new(id), format!("w{id}"))
    }

    pub(crate) fn rate(store: &mut Store, user: u32, item: u32, score: f32, timestamp: i64) {
        store.add_rating(Rating::new(
            UserId::new(user),
            ItemId::new(item),
            score,
            timestamp,
        ));
    }

    fn ids(items: &[&Item]) -> Vec<u32> {
        items.iter().map(|item| item.id().into()).collect()
    }

    #[test]
    fn test_average_rating_is_running_mean() {
        let mut store = Store::new();
        store.insert_item(item(1));
        rate(&mut store, 1, 1, 5., 0);
        rate(&mut store, 2, 1, 2., 1);
        rate(&mut store, 3, 1, 3.5, 2);
        let item = store.item(ItemId::new(1)).unwrap();
        assert_approx_eq!(f32, item.average_rating(), 3.5);
        assert_eq!(item.rating_count(), 3);
        assert_eq!(item.ratings().len(), 3);
    }

    #[test]
    fn test_rating_is_shared() {
        let mut store = Store::new();
        store.insert_item(item(1));
        let rating = store.add_rating(Rating::new(UserId::new(9), ItemId::new(1), 4., 0));
        let user = store.user(UserId::new(9)).unwrap();
        let item = store.item(ItemId::new(1)).unwrap();
        assert!(Arc::ptr_eq(&user.ratings()[0], &rating));
        assert!(Arc::ptr_eq(&item.ratings()[0], &rating));
        assert!(Arc::ptr_eq(&item.top_ratings().as_slice()[0], &rating));
    }

    #[test]
    fn test_rating_of_unknown_item_is_kept_by_user() {
        let mut store = Store::new();
        rate(&mut store, 1, 7, 4., 0);
        assert_eq!(store.user(UserId::new(1)).unwrap().ratings().len(), 1);
        assert!(store.item(ItemId::new(7)).is_none());
    }

    #[test]
    fn test_top_ratings_capacity() {
        let mut store = Store::new().with_top_ratings_capacity(2);
        store.insert_item(item(1));
        for (user, score) in [(1, 1.), (2, 5.), (3, 3.)] {
            rate(&mut store, user, 1, score, 0);
        }
        let top = store.item(ItemId::new(1)).unwrap().top_ratings();
        assert_eq!(top.iter().map(|r| r.score).collect::<Vec<_>>(), [3., 5.]);
    }

    #[test]
    fn test_sorted_lookups() {
        let mut store = Store::new();
        store.insert_item(item(1).with_tags(["sky"]).with_download_count(5));
        store.insert_item(item(2).with_tags(["sky"]).with_download_count(50));
        store.insert_item(item(3).with_tags(["sky", "sea"]).with_download_count(50));
        rate(&mut store, 1, 1, 5., 0);
        rate(&mut store, 1, 2, 3., 0);

        assert_eq!(ids(&store.items_by_tag("sky", 10, SortBy::Rating)), [1, 2, 3]);
        assert_eq!(ids(&store.items_by_tag("sky", 10, SortBy::Downloads)), [2, 3, 1]);
        assert_eq!(ids(&store.items_by_tag("sky", 2, SortBy::Unsorted)), [1, 2]);
        assert_eq!(ids(&store.items_by_tag("sea", 10, SortBy::Rating)), [3]);
        assert!(store.items_by_tag("forest", 10, SortBy::Rating).is_empty());
        assert_eq!(ids(&store.top_items(2, SortBy::Downloads)), [2, 3]);
    }

    #[test]
    fn test_upload_time_order() {
        let mut store = Store::new();
        let time = |secs| Utc.timestamp_opt(secs, 0).unwrap();
        store.insert_item(item(1).with_upload_time(time(10)));
        store.insert_item(item(2));
        store.insert_item(item(3).with_upload_time(time(20)));
        assert_eq!(ids(&store.top_items(3, SortBy::UploadTime)), [3, 1, 2]);
    }

    #[test]
    fn test_replace_item_reindexes() {
        let mut store = Store::new();
        store.insert_item(item(1).with_style("anime").with_mood("calm"));
        rate(&mut store, 1, 1, 4., 0);
        let replaced = store.insert_item(item(1).with_style("minimalist"));
        assert!(replaced.is_some());
        assert!(store.items_by_style("anime", 10, SortBy::Rating).is_empty());
        assert!(store.items_by_mood("calm", 10, SortBy::Rating).is_empty());
        assert_eq!(ids(&store.items_by_style("minimalist", 10, SortBy::Rating)), [1]);
        assert_eq!(store.item(ItemId::new(1)).unwrap().rating_count(), 1);
    }

    #[test]
    fn test_embeddings() {
        let mut store = Store::new();
        store.insert_item(item(1));
        rate(&mut store, 4, 1, 4., 0);
        assert!(store.set_item_embedding_by_external_id("w1", Embedding::from([1., 0.])));
        assert!(!store.set_item_embedding_by_external_id("w2", Embedding::from([1., 0.])));
        assert!(store.set_user_embedding(UserId::new(4), Embedding::from([0., 1.])));
        assert!(!store.set_user_embedding(UserId::new(5), Embedding::from([0., 1.])));
        assert!(store.item_by_external_id("w1").unwrap().embedding().is_some());
    }
}
