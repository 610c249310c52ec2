//! Coercion of loosely-typed JSON records into the typed model.
//!
//! Raw dumps carry ids that are sometimes numbers, names that are sometimes
//! missing or numeric, and genre fields that are not always lists. Everything
//! is resolved here so the builders only ever see [`Game`], [`Ownership`] and
//! [`RatingIndex`].

use crate::model::{Catalog, Game, ItemId, Ownership, RatingIndex};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    pub games: usize,
    pub games_skipped: usize,
    pub item_records: usize,
    pub ownership_pairs: usize,
    pub review_records: usize,
    pub reviews: usize,
    pub reviews_skipped: usize,
}

/// Accumulates game, user-item and user-review records.
#[derive(Debug, Default)]
pub struct RecordNormalizer {
    catalog: Catalog,
    ownership: Ownership,
    // item -> (recommended, total)
    review_tally: HashMap<ItemId, (u32, u32)>,
    stats: NormalizeStats,
}

pub struct Normalized {
    pub catalog: Catalog,
    pub ownership: Ownership,
    pub ratings: RatingIndex,
    pub stats: NormalizeStats,
}

impl RecordNormalizer {
    pub fn new() -> Self { Self::default() }

    /// `{"id", "app_name", "genres", ...}`. Returns false when the record has no usable id.
    pub fn push_game(&mut self, record: &Value) -> bool {
        match game_from_record(record) {
            Some(game) => {
                self.catalog.push(game);
                self.stats.games += 1;
                true
            }
            None => {
                self.stats.games_skipped += 1;
                false
            }
        }
    }

    /// `{"user_id", "items": [{"item_id", ...}, ...]}`
    pub fn push_user_items(&mut self, record: &Value) {
        self.stats.item_records += 1;
        let Some(user) = record.get("user_id").and_then(coerce_id) else { return };
        let Some(items) = record.get("items").and_then(Value::as_array) else { return };
        for item in items {
            if let Some(item_id) = item.get("item_id").and_then(coerce_id) {
                self.ownership.add(user.clone(), item_id);
                self.stats.ownership_pairs += 1;
            }
        }
    }

    /// `{"user_id", "reviews": [{"item_id", "recommend", ...}, ...]}`
    pub fn push_user_reviews(&mut self, record: &Value) {
        self.stats.review_records += 1;
        let Some(reviews) = record.get("reviews").and_then(Value::as_array) else { return };
        for review in reviews {
            let item_id = review.get("item_id").and_then(coerce_id);
            let recommend = review.get("recommend").and_then(coerce_bool);
            match (item_id, recommend) {
                (Some(item_id), Some(recommend)) => {
                    let tally = self.review_tally.entry(item_id).or_insert((0, 0));
                    tally.0 += u32::from(recommend);
                    tally.1 += 1;
                    self.stats.reviews += 1;
                }
                _ => self.stats.reviews_skipped += 1,
            }
        }
    }

    pub fn stats(&self) -> NormalizeStats { self.stats }

    pub fn finish(self) -> Normalized {
        let ratings = self
            .review_tally
            .into_iter()
            .map(|(id, (yes, total))| (id, f64::from(yes) / f64::from(total)))
            .collect();
        Normalized { catalog: self.catalog, ownership: self.ownership, ratings, stats: self.stats }
    }
}

pub fn game_from_record(record: &Value) -> Option<Game> {
    let id = record.get("id").and_then(coerce_id)?;
    let name = match record.get("app_name") {
        None | Some(Value::Null) => format!("Game_{id}"),
        Some(v) => coerce_string(v),
    };
    let genres = record.get("genres").map(coerce_genres).unwrap_or_default();
    Some(Game { id, name, genres })
}

/// Strings pass through; integral numbers lose any trailing `.0`.
pub fn coerce_id(value: &Value) -> Option<ItemId> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().map(|f| if f.fract() == 0.0 { format!("{f:.0}") } else { f.to_string() })
            }
        }
        _ => None,
    }
}

pub fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Non-list genre fields become empty; non-string entries are dropped.
pub fn coerce_genres(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(|g| g.as_str().map(str::to_string)).collect(),
        _ => Vec::new(),
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn games_are_coerced_at_the_boundary() {
        let numeric = game_from_record(&json!({"id": 70, "app_name": 1942, "genres": "Action"})).unwrap();
        assert_eq!(numeric, Game { id: "70".into(), name: "1942".into(), genres: vec![] });

        let unnamed = game_from_record(&json!({"id": "5", "genres": ["RPG", 3, "Indie"]})).unwrap();
        assert_eq!(unnamed.name, "Game_5");
        assert_eq!(unnamed.genres, vec!["RPG", "Indie"]);

        assert!(game_from_record(&json!({"app_name": "No Id"})).is_none());
        assert_eq!(coerce_id(&json!(10.0)).as_deref(), Some("10"));
        // beyond i64 range: must not saturate into one id
        assert_eq!(coerce_id(&json!(1e20)).as_deref(), Some("100000000000000000000"));
        assert_ne!(coerce_id(&json!(1e20)), coerce_id(&json!(2e20)));
    }

    #[test]
    fn user_items_merge_across_records() {
        let mut n = RecordNormalizer::new();
        n.push_user_items(&json!({"user_id": "u1", "items": [{"item_id": "10"}, {"item_id": "20"}]}));
        n.push_user_items(&json!({"user_id": "u1", "items": [{"item_id": "10"}, {"item_name": "no id"}]}));
        n.push_user_items(&json!({"user_id": "u2", "items": null}));
        let out = n.finish();
        assert_eq!(out.ownership.num_users(), 1);
        assert_eq!(out.ownership.items_of("u1").unwrap().len(), 2);
        assert_eq!(out.stats.ownership_pairs, 3);
        assert_eq!(out.stats.item_records, 3);
    }

    #[test]
    fn ratings_are_mean_recommend_rate() {
        let mut n = RecordNormalizer::new();
        n.push_user_reviews(&json!({"user_id": "a", "reviews": [
            {"item_id": "1", "recommend": true},
            {"item_id": "2", "recommend": false},
        ]}));
        n.push_user_reviews(&json!({"user_id": "b", "reviews": [
            {"item_id": "1", "recommend": "False"},
            {"item_id": "1", "recommend": true},
            {"item_id": "3"},
        ]}));
        let out = n.finish();
        assert!((out.ratings.get("1") - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(out.ratings.get("2"), 0.0);
        assert!(out.ratings.contains("2"));
        assert!(!out.ratings.contains("3"));
        assert_eq!(out.stats.reviews_skipped, 1);
    }
}
