//! Display ordering and row visibility

use std::cmp::Ordering;

use crate::models::{BuildingEntry, Inventory, InventoryEntry, ScoredStats};
use crate::settings::SortKey;

/// Building types that never get a row.
pub const EXCLUDED_TYPES: [&str; 7] = [
    "hub_part",
    "hub_main",
    "main_building",
    "street",
    "outpost_ship",
    "off_grid",
    "friends_tavern",
];

/// A displayable table row.
pub trait Row {
    fn asset_id(&self) -> &str;
    fn name(&self) -> &str;
    fn quantity(&self) -> u32;
    /// Scored stats, absent for unscored kit rows.
    fn stats(&self) -> Option<&ScoredStats>;

    fn value(&self, key: SortKey) -> f64 {
        self.stats().map_or(0.0, |s| s.value(key))
    }

    fn is_hidden(&self) -> bool {
        self.stats().is_some_and(|s| s.hidden)
    }
}

impl Row for InventoryEntry {
    fn asset_id(&self) -> &str {
        &self.asset_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn stats(&self) -> Option<&ScoredStats> {
        self.stats.as_ref()
    }
}

impl Row for BuildingEntry {
    fn asset_id(&self) -> &str {
        &self.stats.asset_id
    }

    fn name(&self) -> &str {
        &self.stats.name
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn stats(&self) -> Option<&ScoredStats> {
        Some(&self.stats)
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

/// Inventory rows by `key` descending, then combined efficiency, then
/// forge points per square.
pub fn sort_inventory(inventory: &Inventory, key: SortKey) -> Vec<&InventoryEntry> {
    let mut rows: Vec<&InventoryEntry> = inventory.values().collect();
    rows.sort_by(|a, b| {
        descending(a.value(key), b.value(key))
            .then_with(|| descending(a.value(SortKey::Efficiency), b.value(SortKey::Efficiency)))
            .then_with(|| descending(a.value(SortKey::FPefficiency), b.value(SortKey::FPefficiency)))
    });
    rows
}

/// City rows by `key` descending.
pub fn sort_buildings(entries: &mut [BuildingEntry], key: SortKey) {
    entries.sort_by(|a, b| descending(a.value(key), b.value(key)));
}

/// Whether a row is shown at all.
pub fn is_visible<R: Row + ?Sized>(row: &R, show_hidden: bool) -> bool {
    if row.is_hidden() && !show_hidden {
        return false;
    }
    !row
        .stats()
        .is_some_and(|s| EXCLUDED_TYPES.contains(&s.kind.as_str()))
}

pub fn visible_rows<'r, R: Row + 'r>(
    rows: impl IntoIterator<Item = &'r R>,
    show_hidden: bool,
) -> Vec<&'r R> {
    rows.into_iter()
        .filter(|row| is_visible(*row, show_hidden))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, efficiency: f64, fp_efficiency: f64, ao: f64) -> InventoryEntry {
        let mut e = InventoryEntry::new(id, 1, id.to_string());
        e.stats = Some(ScoredStats {
            asset_id: id.to_string(),
            efficiency,
            fp_efficiency,
            ao_efficiency: ao,
            ..Default::default()
        });
        e
    }

    #[test]
    fn ties_break_on_efficiency_then_fp() {
        let mut inv = Inventory::new();
        for e in [
            entry("a", 3.0, 0.0, 1.0),
            entry("b", 5.0, 0.0, 1.0),
            entry("c", 5.0, 2.0, 1.0),
            entry("d", 1.0, 0.0, 9.0),
        ] {
            inv.insert(e.asset_id.clone(), e);
        }
        let ids: Vec<&str> = sort_inventory(&inv, SortKey::AOefficiency)
            .into_iter()
            .map(|e| e.asset_id.as_str())
            .collect();
        assert_eq!(ids, vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn unscored_rows_sort_last() {
        let mut inv = Inventory::new();
        inv.insert("kit".to_string(), InventoryEntry::new("kit", 2, "Kit".to_string()));
        let e = entry("a", 3.0, 0.0, 0.0);
        inv.insert(e.asset_id.clone(), e);
        let rows = sort_inventory(&inv, SortKey::Efficiency);
        assert_eq!(rows[1].asset_id, "kit");
    }

    #[test]
    fn hidden_and_excluded_rows() {
        let mut hidden = entry("h", 3.0, 0.0, 0.0);
        hidden.stats.as_mut().unwrap().hidden = true;
        let mut street = entry("s", 3.0, 0.0, 0.0);
        street.stats.as_mut().unwrap().kind = "street".to_string();
        let plain = entry("p", 3.0, 0.0, 0.0);
        let kit = InventoryEntry::new("kit", 1, "Kit".to_string());

        let rows = [hidden, street, plain, kit];
        let shown: Vec<&str> = visible_rows(&rows, false).into_iter().map(|r| r.asset_id()).collect();
        assert_eq!(shown, vec!["p", "kit"]);
        let shown: Vec<&str> = visible_rows(&rows, true).into_iter().map(|r| r.asset_id()).collect();
        assert_eq!(shown, vec!["h", "p", "kit"]);
    }

    #[test]
    fn city_rows_sort_descending() {
        let mut rows: Vec<BuildingEntry> = [1.0, 4.0, 2.0]
            .iter()
            .map(|&d| BuildingEntry {
                stats: ScoredStats {
                    d_efficiency: d,
                    ..Default::default()
                },
                quantity: 1,
            })
            .collect();
        sort_buildings(&mut rows, SortKey::Defficiency);
        let order: Vec<f64> = rows.iter().map(|r| r.stats.d_efficiency).collect();
        assert_eq!(order, vec![4.0, 2.0, 1.0]);
    }
}
