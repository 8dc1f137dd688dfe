//! Ranking builder: the ranked position metric per entity.
//!
//! Driver mode reads the recorded finishing position straight from the
//! store; constructor mode ranks summed points per (season, round) and maps
//! raw team names through the alias table before any filtering happens.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::store::InMemoryDb;

/// Entity mode for trend queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Driver,
    Constructor,
}

impl EntityKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "driver" | "drivers" => Some(EntityKind::Driver),
            "constructor" | "constructors" => Some(EntityKind::Constructor),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Driver => "driver",
            EntityKind::Constructor => "constructor",
        }
    }
}

/// One ranked observation for one entity in one race.
#[derive(Debug, Clone)]
pub struct RankedRow {
    pub entity: String,
    pub season: i32,
    pub round: i32,
    /// Rank metric; None when a driver did not finish
    pub position: Option<f64>,
}

/// Raw constructor name -> display alias.
///
/// Users select constructors by alias, so remapping must run over the full
/// standings before the selection filter. A name without an alias entry is
/// its own display name.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    aliases: HashMap<String, String>,
}

impl AliasMap {
    pub fn new(aliases: HashMap<String, String>) -> Self {
        Self { aliases }
    }

    pub fn resolve<'a>(&'a self, raw: &'a str) -> &'a str {
        self.aliases.get(raw).map(String::as_str).unwrap_or(raw)
    }
}

/// Driver-mode rankings for the selected drivers.
///
/// No derivation needed: the finishing position is the metric. A selected
/// driver with no rows simply contributes nothing.
pub fn driver_rankings(db: &InMemoryDb, selected: &[String]) -> Result<Vec<RankedRow>> {
    db.driver_results(selected)
}

/// Constructor-mode rankings for the selected aliases.
///
/// Ranks come from the full standings table; names are remapped through the
/// alias table and then filtered, so selecting an alias yields the union of
/// every raw name mapped to it.
pub fn constructor_rankings(
    db: &InMemoryDb,
    aliases: &AliasMap,
    selected: &[String],
) -> Result<Vec<RankedRow>> {
    let standings = db.constructor_standings()?;

    let mut rows: Vec<RankedRow> = standings
        .into_iter()
        .filter_map(|standing| {
            let alias = aliases.resolve(&standing.constructor);
            if !selected.iter().any(|sel| sel == alias) {
                return None;
            }
            Some(RankedRow {
                entity: alias.to_string(),
                season: standing.season,
                round: standing.round,
                position: Some(standing.position as f64),
            })
        })
        .collect();

    // Standings arrive ordered by raw name; re-sort on the display name
    rows.sort_by(|a, b| {
        (&a.entity, a.season, a.round).cmp(&(&b.entity, b.season, b.round))
    });

    Ok(rows)
}

/// Distinct selectable constructor names (post-remapping), sorted.
pub fn constructor_aliases(db: &InMemoryDb, aliases: &AliasMap) -> Result<Vec<String>> {
    let mut names: Vec<String> = db
        .list_constructors()?
        .iter()
        .map(|raw| aliases.resolve(raw).to_string())
        .collect();
    names.sort();
    names.dedup();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias_map() -> AliasMap {
        let mut aliases = HashMap::new();
        aliases.insert("Toro Rosso".to_string(), "AlphaTauri".to_string());
        aliases.insert("AlphaTauri".to_string(), "AlphaTauri".to_string());
        AliasMap::new(aliases)
    }

    fn seeded_db() -> InMemoryDb {
        let db = InMemoryDb::open().unwrap();
        db.insert_result("Gasly", "Toro Rosso", 2019, 1, Some(6), 8.0)
            .unwrap();
        db.insert_result("Hamilton", "Mercedes", 2019, 1, Some(1), 25.0)
            .unwrap();
        db.insert_result("Gasly", "AlphaTauri", 2020, 1, Some(4), 12.0)
            .unwrap();
        db.insert_result("Hamilton", "Mercedes", 2020, 1, Some(1), 25.0)
            .unwrap();
        db
    }

    #[test]
    fn test_entity_kind_parsing() {
        assert_eq!(EntityKind::from_str("driver"), Some(EntityKind::Driver));
        assert_eq!(
            EntityKind::from_str("Constructors"),
            Some(EntityKind::Constructor)
        );
        assert_eq!(EntityKind::from_str("team"), None);
    }

    #[test]
    fn test_alias_resolve_falls_back_to_raw() {
        let aliases = alias_map();
        assert_eq!(aliases.resolve("Toro Rosso"), "AlphaTauri");
        assert_eq!(aliases.resolve("Mercedes"), "Mercedes");
    }

    #[test]
    fn test_selecting_alias_returns_union_of_raw_names() {
        let db = seeded_db();
        let rows =
            constructor_rankings(&db, &alias_map(), &["AlphaTauri".to_string()]).unwrap();

        // Both the Toro Rosso season and the AlphaTauri season come back
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.entity == "AlphaTauri"));
        assert_eq!(rows[0].season, 2019);
        assert_eq!(rows[1].season, 2020);
    }

    #[test]
    fn test_selecting_raw_name_hidden_by_alias_matches_nothing() {
        let db = seeded_db();
        // Remapping runs first, so the raw name is no longer selectable
        let rows =
            constructor_rankings(&db, &alias_map(), &["Toro Rosso".to_string()]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_constructor_rankings_carry_rank_not_points() {
        let db = seeded_db();
        let rows =
            constructor_rankings(&db, &AliasMap::default(), &["Mercedes".to_string()])
                .unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.position == Some(1.0)));
    }

    #[test]
    fn test_unknown_entity_contributes_nothing() {
        let db = seeded_db();
        let rows = driver_rankings(&db, &["Fangio".to_string()]).unwrap();
        assert!(rows.is_empty());

        let rows =
            constructor_rankings(&db, &AliasMap::default(), &["Brabham".to_string()])
                .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_constructor_aliases_deduplicates() {
        let db = seeded_db();
        let names = constructor_aliases(&db, &alias_map()).unwrap();
        assert_eq!(names, vec!["AlphaTauri", "Mercedes"]);
    }
}
