use crate::model::{Catalog, Game, ItemId, Ownership};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularityRow {
    pub item_id: ItemId,
    pub name: String,
    pub genres: Vec<String>,
    /// distinct owners
    pub popularity: u32,
}

/// Owner counts joined with game metadata. Owned items without metadata and
/// games nobody owns are both left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularityTable {
    rows: Vec<PopularityRow>,
}

impl PopularityTable {
    pub fn build(catalog: &Catalog, ownership: &Ownership) -> Self {
        let mut by_id: HashMap<&str, Vec<&Game>> = HashMap::new();
        for game in catalog.games() {
            by_id.entry(game.id.as_str()).or_default().push(game);
        }
        let counts = ownership.owner_counts();
        let mut rows = Vec::new();
        let mut unmatched = 0usize;
        for (item_id, popularity) in counts.iter() {
            let Some(games) = by_id.get(item_id.as_str()) else {
                unmatched += 1;
                continue;
            };
            // one row per metadata record, as an inner join would produce
            for game in games {
                rows.push(PopularityRow {
                    item_id: (*item_id).clone(),
                    name: game.name.clone(),
                    genres: game.genres.clone(),
                    popularity: *popularity,
                });
            }
        }
        tracing::debug!(owned_items = counts.len(), rows = rows.len(), unmatched, "built popularity table");
        Self { rows }
    }

    pub fn rows(&self) -> &[PopularityRow] { &self.rows }

    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn popularity_of(&self, item_id: &str) -> Option<u32> {
        self.rows.iter().find(|r| r.item_id == item_id).map(|r| r.popularity)
    }

    pub fn top10_overall(&self) -> Vec<String> { self.top_n_overall(TOP_N) }

    pub fn top10_in_category(&self, category: &str) -> Vec<String> { self.top_n_in_category(category, TOP_N) }

    pub fn top_n_overall(&self, n: usize) -> Vec<String> {
        top_names(self.rows.iter(), n)
    }

    /// `category` must match a genre exactly.
    pub fn top_n_in_category(&self, category: &str, n: usize) -> Vec<String> {
        top_names(self.rows.iter().filter(|r| r.genres.iter().any(|g| g == category)), n)
    }
}

// Stable sort: equal popularity keeps table order.
fn top_names<'a>(rows: impl Iterator<Item = &'a PopularityRow>, n: usize) -> Vec<String> {
    let mut rows: Vec<&PopularityRow> = rows.collect();
    rows.sort_by(|a, b| b.popularity.cmp(&a.popularity));
    rows.into_iter().take(n).map(|r| r.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Catalog, Ownership) {
        let catalog: Catalog = vec![
            Game::new("1", "Alpha", &["Action"]),
            Game::new("2", "Beta", &["Action", "RPG"]),
            Game::new("3", "Gamma", &["RPG"]),
            Game::new("4", "Unowned", &["Action"]),
        ]
        .into_iter()
        .collect();
        let ownership: Ownership = vec![
            ("u1", "1"), ("u1", "2"), ("u1", "orphan"),
            ("u2", "2"), ("u2", "3"),
            ("u3", "2"), ("u3", "2"),
        ]
        .into_iter()
        .collect();
        (catalog, ownership)
    }

    #[test]
    fn inner_join_counts_distinct_owners() {
        let (catalog, ownership) = fixture();
        let table = PopularityTable::build(&catalog, &ownership);
        assert_eq!(table.len(), 3);
        assert_eq!(table.popularity_of("2"), Some(3));
        assert_eq!(table.popularity_of("1"), Some(1));
        assert_eq!(table.popularity_of("4"), None);
        assert_eq!(table.popularity_of("orphan"), None);
    }

    #[test]
    fn top_lists_sort_by_popularity_with_stable_ties() {
        let (catalog, ownership) = fixture();
        let table = PopularityTable::build(&catalog, &ownership);
        assert_eq!(table.top10_overall(), vec!["Beta", "Alpha", "Gamma"]);
        assert_eq!(table.top10_in_category("RPG"), vec!["Beta", "Gamma"]);
        assert!(table.top10_in_category("rpg").is_empty());
        assert_eq!(table.top10_overall(), table.top10_overall());
    }

    #[test]
    fn top10_caps_at_ten() {
        let catalog: Catalog = (0..15).map(|i| Game::new(format!("{i:02}"), format!("G{i}"), &["Action"])).collect();
        let ownership: Ownership = (0..15).flat_map(|i| (0..=i).map(move |u| (format!("u{u}"), format!("{i:02}")))).collect();
        let table = PopularityTable::build(&catalog, &ownership);
        let top = table.top10_overall();
        assert_eq!(top.len(), 10);
        assert_eq!(top[0], "G14");
        assert_eq!(top[9], "G5");
    }
}
