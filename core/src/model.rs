use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub type ItemId = String;
pub type UserId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: ItemId,
    pub name: String,
    pub genres: Vec<String>,
}

impl Game {
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>, genres: &[&str]) -> Self {
        Self { id: id.into(), name: name.into(), genres: genres.iter().map(|g| g.to_string()).collect() }
    }
}

/// Which users own which games. Items are deduplicated per user and users are
/// merged when they show up in more than one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    owned: BTreeMap<UserId, BTreeSet<ItemId>>,
}

impl Ownership {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, user: impl Into<UserId>, item: impl Into<ItemId>) {
        self.owned.entry(user.into()).or_default().insert(item.into());
    }

    pub fn extend<I, T>(&mut self, user: &str, items: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<ItemId>,
    {
        let set = self.owned.entry(user.to_string()).or_default();
        set.extend(items.into_iter().map(Into::into));
    }

    /// Users in ascending id order with their distinct items.
    pub fn users_with_items(&self) -> impl Iterator<Item = (&UserId, &BTreeSet<ItemId>)> {
        self.owned.iter()
    }

    pub fn items_of(&self, user: &str) -> Option<&BTreeSet<ItemId>> { self.owned.get(user) }

    pub fn num_users(&self) -> usize { self.owned.len() }

    /// Number of distinct users per owned item, keyed in ascending item order.
    pub fn owner_counts(&self) -> BTreeMap<&ItemId, u32> {
        let mut counts: BTreeMap<&ItemId, u32> = BTreeMap::new();
        for items in self.owned.values() {
            for item in items {
                *counts.entry(item).or_insert(0) += 1;
            }
        }
        counts
    }
}

impl<U: Into<UserId>, I: Into<ItemId>> FromIterator<(U, I)> for Ownership {
    fn from_iter<T: IntoIterator<Item = (U, I)>>(iter: T) -> Self {
        let mut ownership = Ownership::new();
        for (user, item) in iter {
            ownership.add(user, item);
        }
        ownership
    }
}

/// Game metadata in load order together with the lookups derived from it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    games: Vec<Game>,
    id_to_name: HashMap<ItemId, String>,
    /// lowercase display name -> id
    name_index: HashMap<String, ItemId>,
}

impl Catalog {
    pub fn new() -> Self { Self::default() }

    /// Later records overwrite earlier ones in every lookup; `games()` keeps them all.
    pub fn push(&mut self, game: Game) {
        self.id_to_name.insert(game.id.clone(), game.name.clone());
        self.name_index.insert(game.name.to_lowercase(), game.id.clone());
        self.games.push(game);
    }

    pub fn games(&self) -> &[Game] { &self.games }

    pub fn len(&self) -> usize { self.games.len() }

    pub fn is_empty(&self) -> bool { self.games.is_empty() }

    pub fn name_of(&self, id: &str) -> Option<&str> { self.id_to_name.get(id).map(String::as_str) }

    /// Case-insensitive lookup of a display name.
    pub fn id_for_name(&self, name: &str) -> Option<&ItemId> { self.name_index.get(&name.to_lowercase()) }

    pub fn id_to_name(&self) -> &HashMap<ItemId, String> { &self.id_to_name }

    pub fn name_index(&self) -> &HashMap<String, ItemId> { &self.name_index }
}

impl FromIterator<Game> for Catalog {
    fn from_iter<T: IntoIterator<Item = Game>>(iter: T) -> Self {
        let mut catalog = Catalog::new();
        for game in iter {
            catalog.push(game);
        }
        catalog
    }
}

/// Mean recommend rate per item, in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingIndex {
    ratings: HashMap<ItemId, f64>,
}

impl RatingIndex {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, id: impl Into<ItemId>, rating: f64) {
        self.ratings.insert(id.into(), rating);
    }

    /// Items nobody reviewed rate 0.0.
    pub fn get(&self, id: &str) -> f64 { self.ratings.get(id).copied().unwrap_or(0.0) }

    pub fn contains(&self, id: &str) -> bool { self.ratings.contains_key(id) }

    pub fn len(&self) -> usize { self.ratings.len() }

    pub fn is_empty(&self) -> bool { self.ratings.is_empty() }
}

impl<I: Into<ItemId>> FromIterator<(I, f64)> for RatingIndex {
    fn from_iter<T: IntoIterator<Item = (I, f64)>>(iter: T) -> Self {
        Self { ratings: iter.into_iter().map(|(id, r)| (id.into(), r)).collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_dedupes_and_merges_users() {
        let mut own = Ownership::new();
        own.extend("u1", ["a", "b", "a"]);
        own.add("u1", "c");
        assert_eq!(own.num_users(), 1);
        assert_eq!(own.items_of("u1").unwrap().len(), 3);
    }

    #[test]
    fn name_index_is_case_insensitive_and_last_wins() {
        let catalog: Catalog = vec![
            Game::new("1", "Portal", &["Puzzle"]),
            Game::new("2", "PORTAL", &["Action"]),
        ]
        .into_iter()
        .collect();
        assert_eq!(catalog.id_for_name("portal").map(String::as_str), Some("2"));
        assert_eq!(catalog.id_for_name("PoRtAl").map(String::as_str), Some("2"));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn missing_rating_defaults_to_zero() {
        let ratings: RatingIndex = vec![("1", 0.75)].into_iter().collect();
        assert_eq!(ratings.get("1"), 0.75);
        assert_eq!(ratings.get("404"), 0.0);
    }
}
