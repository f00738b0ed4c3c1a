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

//! Readers for the interaction and embedding files of an evaluation run.

use std::{
    collections::{BTreeMap, HashMap},
    fs::File,
    io::{self, BufRead, BufReader, Read},
    path::Path,
};

use csv::{ReaderBuilder, Trim};
use tracing::{info, warn};
use wallrec_engine::{Embedding, ItemId, Rating, UserId};

use crate::error::Error;

/// The ratings of an interaction file together with the number of skipped rows.
#[derive(Clone, Debug, Default)]
pub struct Interactions {
    pub ratings: Vec<Rating>,
    pub malformed: usize,
}

impl Interactions {
    /// Reads a ratings csv file with the header `userId,itemId,rating,timestamp`.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let interactions = Self::from_reader(File::open(path)?)?;
        info!(
            path = %path.display(),
            ratings = interactions.ratings.len(),
            malformed = interactions.malformed,
            "read interactions",
        );
        Ok(interactions)
    }

    /// Reads ratings csv from any reader.
    ///
    /// Rows which can't be parsed are skipped and counted, only I/O failures are fatal.
    pub fn from_reader(reader: impl Read) -> Result<Self, Error> {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut interactions = Self::default();
        for record in reader.into_deserialize::<Rating>() {
            match record {
                Ok(rating) if rating.score.is_finite() => interactions.ratings.push(rating),
                Ok(rating) => {
                    warn!(?rating, "skipping rating with a non finite score");
                    interactions.malformed += 1;
                }
                Err(error) if error.is_io_error() => return Err(error.into()),
                Err(error) => {
                    warn!(%error, "skipping malformed rating");
                    interactions.malformed += 1;
                }
            }
        }
        Ok(interactions)
    }

    /// Groups the ratings by user, keeping the order in which they were read.
    pub fn group_by_user(self) -> BTreeMap<UserId, Vec<Rating>> {
        let mut by_user = BTreeMap::<_, Vec<_>>::new();
        for rating in self.ratings {
            by_user.entry(rating.user).or_default().push(rating);
        }
        by_user
    }
}

/// Precomputed embeddings of users and items.
#[derive(Clone, Debug, Default)]
pub struct Embeddings {
    users: HashMap<UserId, Embedding>,
    items: BTreeMap<ItemId, Embedding>,
}

impl Embeddings {
    /// Reads the optional user and item embedding files.
    pub fn read(users: Option<&Path>, items: Option<&Path>) -> Result<Self, Error> {
        let mut embeddings = Self::default();
        if let Some(path) = users {
            for (id, embedding) in read_embeddings(path)? {
                embeddings.insert_user(UserId::new(id), embedding);
            }
        }
        if let Some(path) = items {
            for (id, embedding) in read_embeddings(path)? {
                embeddings.insert_item(ItemId::new(id), embedding);
            }
        }
        Ok(embeddings)
    }

    pub fn insert_user(&mut self, id: UserId, embedding: Embedding) -> Option<Embedding> {
        self.users.insert(id, embedding)
    }

    pub fn insert_item(&mut self, id: ItemId, embedding: Embedding) -> Option<Embedding> {
        self.items.insert(id, embedding)
    }

    pub fn user(&self, id: UserId) -> Option<&Embedding> {
        self.users.get(&id)
    }

    /// Iterates over the item embeddings in ascending order of the item ids.
    pub fn items(&self) -> impl Iterator<Item = (ItemId, &Embedding)> {
        self.items.iter().map(|(&id, embedding)| (id, embedding))
    }

    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }
}

/// Reads lines of the form `id:v1 v2 v3 ...`, skipping malformed ones.
fn read_embeddings(path: &Path) -> Result<Vec<(u32, Embedding)>, Error> {
    let embeddings = parse_embeddings(BufReader::new(File::open(path)?))?;
    info!(path = %path.display(), embeddings = embeddings.len(), "read embeddings");
    Ok(embeddings)
}

fn parse_embeddings(reader: impl BufRead) -> Result<Vec<(u32, Embedding)>, io::Error> {
    let mut embeddings = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Some(embedding) = parse_embedding_line(&line) {
            embeddings.push(embedding);
        } else {
            warn!(line = index + 1, "skipping malformed embedding");
        }
    }
    Ok(embeddings)
}

fn parse_embedding_line(line: &str) -> Option<(u32, Embedding)> {
    let (id, values) = line.split_once(':')?;
    let id = id.trim().parse().ok()?;
    let values = values
        .split_whitespace()
        .map(|value| value.parse::<f32>().ok().filter(|value| value.is_finite()))
        .collect::<Option<Vec<_>>>()?;
    (!values.is_empty()).then(|| (id, values.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_ratings_skips_malformed_rows() {
        let csv = "\
userId,itemId,rating,timestamp
1,10,4.5,100
1, 11 ,3,101
2,abc,5,102
3,12
4,13,NaN,104

5,14,5,105,extra
";
        let interactions = Interactions::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(
            interactions.ratings,
            [
                Rating::new(UserId::new(1), ItemId::new(10), 4.5, 100),
                Rating::new(UserId::new(1), ItemId::new(11), 3., 101),
                Rating::new(UserId::new(5), ItemId::new(14), 5., 105),
            ],
        );
        assert_eq!(interactions.malformed, 3);
    }

    #[test]
    fn test_read_ratings_accepts_wallpaper_id_header() {
        let csv = "wallpaperId,userId,timestamp,rating\n7,2,50,1.5\n";
        let interactions = Interactions::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(
            interactions.ratings,
            [Rating::new(UserId::new(2), ItemId::new(7), 1.5, 50)],
        );
    }

    #[test]
    fn test_group_by_user() {
        let interactions = Interactions {
            ratings: vec![
                Rating::new(UserId::new(2), ItemId::new(1), 4., 3),
                Rating::new(UserId::new(1), ItemId::new(2), 5., 2),
                Rating::new(UserId::new(2), ItemId::new(3), 1., 1),
            ],
            malformed: 0,
        };
        let by_user = interactions.group_by_user();
        assert_eq!(by_user.keys().copied().collect::<Vec<_>>(), [1, 2].map(UserId::new));
        assert_eq!(
            by_user[&UserId::new(2)]
                .iter()
                .map(|rating| rating.item)
                .collect::<Vec<_>>(),
            [1, 3].map(ItemId::new),
        );
    }

    #[test]
    fn test_parse_embedding_line() {
        let (id, embedding) = parse_embedding_line("42: 0.5 -1 2e-1").unwrap();
        assert_eq!(id, 42);
        assert_eq!(embedding, Embedding::from([0.5, -1., 0.2]));

        assert!(parse_embedding_line("42 0.5 1").is_none());
        assert!(parse_embedding_line("x:0.5 1").is_none());
        assert!(parse_embedding_line("42:0.5 one").is_none());
        assert!(parse_embedding_line("42:").is_none());
    }

    #[test]
    fn test_parse_embeddings_skips_malformed_lines() {
        let lines = "1:1 0\n\nbroken\n2:0 1\n";
        let embeddings = parse_embeddings(lines.as_bytes()).unwrap();
        assert_eq!(
            embeddings.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            [1, 2],
        );
    }
}
