//! City and inventory reports: the full resolution pass and its text rendering

use std::collections::BTreeMap;
use std::fmt::Write as _;

use tracing::{info, warn};

use crate::assemble::{AssemblyOptions, UpgradeAssembler};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::expand::InventoryExpander;
use crate::filter::{Row, sort_buildings, sort_inventory, visible_rows};
use crate::models::{Ally, BuildingEntry, Inventory, PlacedBuilding, RawItem, ScoredStats, Totals};
use crate::scorer::{ScoringContext, score};
use crate::settings::{FlagStore, Settings, ShowMode, SortKey};
use crate::totals::aggregate;

/// The city being displayed.
#[derive(Debug, Clone, Copy)]
pub struct CityView<'a> {
    pub player: &'a str,
    pub era: &'a str,
    pub city: &'a [PlacedBuilding],
    /// Another player's city, visited.
    pub is_other: bool,
}

#[derive(Debug, Clone)]
pub struct CityReport {
    pub player: String,
    pub era: String,
    pub is_other: bool,
    pub entries: Vec<BuildingEntry>,
    pub totals: Totals,
}

/// Count placed buildings per asset id.
pub fn group_buildings(city: &[PlacedBuilding]) -> BTreeMap<&str, u32> {
    let mut counts = BTreeMap::new();
    for building in city {
        *counts.entry(building.cityentity_id.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Score every distinct placed building and total the city.
///
/// Great-building bonuses are always read from `own_city`.
///
/// `allies` belong to the viewing player: their bonuses are added to the
/// totals of the own city and ignored when `view.is_other` is set. Great
/// buildings are also left out of another player's totals.
pub fn city_report(
    catalog: &Catalog,
    view: CityView<'_>,
    own_city: &[PlacedBuilding],
    allies: &[Ally],
    flags: &FlagStore,
    sort: SortKey,
) -> CityReport {
    let ctx = ScoringContext {
        era: view.era,
        landmark_city: own_city,
        flags,
    };

    let mut entries = Vec::new();
    for (id, quantity) in group_buildings(view.city) {
        match score(catalog, id, &ctx) {
            Ok(stats) => entries.push(BuildingEntry { stats, quantity }),
            Err(e) => warn!(building = id, error = %e, "skipping building"),
        }
    }
    sort_buildings(&mut entries, sort);

    let allies = if view.is_other { &[][..] } else { allies };
    let totals = aggregate(&entries, allies, !view.is_other);

    CityReport {
        player: view.player.to_string(),
        era: view.era.to_string(),
        is_other: view.is_other,
        entries,
        totals,
    }
}

/// Expand, assemble and prune the raw inventory in one pass.
pub fn resolve_inventory(
    catalog: &Catalog,
    raw: &[RawItem],
    era: &str,
    own_city: &[PlacedBuilding],
    flags: &FlagStore,
    settings: &Settings,
) -> Result<Inventory> {
    let mut inventory = InventoryExpander::new(catalog, era).expand(raw);
    let expanded = inventory.len();

    let ctx = ScoringContext {
        era,
        landmark_city: own_city,
        flags,
    };
    UpgradeAssembler::new(catalog, era)?.resolve(&mut inventory, AssemblyOptions::from(settings), &ctx);

    info!(raw = raw.len(), expanded, kept = inventory.len(), "resolved inventory");
    Ok(inventory)
}

// ----------------------------------------------------------------------------
// Rendering
// ----------------------------------------------------------------------------

/// Colour band of an efficiency value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EfficiencyClass {
    High,
    Mid,
    Low,
    None,
}

impl EfficiencyClass {
    pub fn of(efficiency: f64) -> Self {
        if efficiency.is_nan() {
            EfficiencyClass::None
        } else if efficiency >= 10.0 {
            EfficiencyClass::High
        } else if efficiency >= 2.5 {
            EfficiencyClass::Mid
        } else if efficiency >= 0.0 {
            EfficiencyClass::Low
        } else {
            EfficiencyClass::None
        }
    }

    fn marker(self) -> &'static str {
        match self {
            EfficiencyClass::High => "++",
            EfficiencyClass::Mid => "+",
            EfficiencyClass::Low => "-",
            EfficiencyClass::None => "",
        }
    }
}

fn stat_cell(value: f64, efficiency: f64, show: ShowMode, always_both: bool) -> String {
    let text = match (show, always_both) {
        (ShowMode::Both, _) | (_, true) => format!("{value}% ({efficiency:.1})"),
        (ShowMode::Percent, false) => format!("{value}%"),
        (ShowMode::Efficiency, false) => format!("{efficiency:.1}"),
    };
    format!("{text}{}", EfficiencyClass::of(efficiency).marker())
}

fn stat_cells(stats: &ScoredStats, show: ShowMode) -> Vec<String> {
    [
        (stats.aoffense, stats.ao_efficiency),
        (stats.adefense, stats.ad_efficiency),
        (stats.atotal, stats.a_efficiency),
        (stats.doffense, stats.do_efficiency),
        (stats.ddefense, stats.dd_efficiency),
        (stats.dtotal, stats.d_efficiency),
    ]
    .into_iter()
    .map(|(value, efficiency)| stat_cell(value, efficiency, show, false))
    .chain(std::iter::once(stat_cell(
        stats.stat_total(),
        stats.efficiency,
        show,
        true,
    )))
    .collect()
}

/// One table line for a row.
pub fn format_row<R: Row + ?Sized>(row: &R, show: ShowMode) -> String {
    let mut line = format!("{:<40} {:>4}", row.name(), row.quantity());
    let Some(stats) = row.stats() else {
        return line;
    };

    if stats.size > 0.0 {
        let mut dims = format!(
            "{}x{}",
            stats.length.unwrap_or_default(),
            stats.width.unwrap_or_default()
        );
        if stats.needs_roads > 0 {
            let _ = write!(dims, " +{}", stats.roads);
        }
        let mut space = stats.size.to_string();
        if row.quantity() > 1 {
            let _ = write!(space, " ({})", f64::from(row.quantity()) * stats.size);
        }
        let _ = write!(line, " {dims:>8} {space:>12}");
    } else {
        let _ = write!(line, " {:>8} {:>12}", "", "");
    }

    let fp = if stats.fp_efficiency > 0.0 {
        format!("{:.1}", stats.fp_efficiency)
    } else {
        String::new()
    };
    let _ = write!(line, " {fp:>6}");

    for cell in stat_cells(stats, show) {
        let _ = write!(line, " {cell:>14}");
    }
    if stats.important {
        line.push_str(" [important]");
    }
    if stats.hidden {
        line.push_str(" [hidden]");
    }
    line
}

fn header() -> String {
    format!(
        "{:<40} {:>4} {:>8} {:>12} {:>6} {:>14} {:>14} {:>14} {:>14} {:>14} {:>14} {:>14}",
        "Item", "Qty", "Size", "Space", "FP/sq", "A.Off", "A.Def", "A.Both", "D.Off", "D.Def",
        "D.Both", "Total"
    )
}

/// Render the city table with its totals.
pub fn format_city(report: &CityReport, settings: &Settings) -> String {
    let mut output = String::new();
    let t = &report.totals;
    let _ = writeln!(
        output,
        "Player: {}{} | Era: {}",
        report.player,
        if report.is_other { " (visited)" } else { "" },
        report.era
    );
    let _ = writeln!(
        output,
        "GbG: A. Offense: {} | A. Defense: {} | D. Offense: {} | D. Defense: {}",
        t.attacking_attack, t.attacking_defense, t.defending_attack, t.defending_defense
    );
    let _ = writeln!(
        output,
        "QI: A. Offense: {} | A. Defense: {} | D. Offense: {} | D. Defense: {}",
        t.qi_attacking_attack, t.qi_attacking_defense, t.qi_defending_attack, t.qi_defending_defense
    );
    if report.is_other {
        let _ = writeln!(output, "Not including great buildings");
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "{}", header());
    for row in visible_rows(&report.entries, settings.show_hidden) {
        let _ = writeln!(output, "{}", format_row(row, settings.show));
    }
    output
}

/// Render the resolved inventory, sorted by the inventory sort key.
pub fn format_inventory(inventory: &Inventory, settings: &Settings) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Inventory");
    let _ = writeln!(output, "{}", header());
    let rows = sort_inventory(inventory, settings.inventory_sort);
    for row in visible_rows(rows, settings.show_hidden) {
        let _ = writeln!(output, "{}", format_row(row, settings.show));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Boost, BoostSet, BuildingDefinition, EraComponents};

    const ERA: &str = "IronAge";

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        for (id, value) in [("a", 10.0), ("X_IronAge_Landmark1", 20.0)] {
            let mut def = BuildingDefinition {
                asset_id: id.to_string(),
                name: id.to_string(),
                length: Some(2),
                width: Some(2),
                ..Default::default()
            };
            def.components.insert(
                ERA.to_string(),
                EraComponents {
                    boosts: Some(BoostSet {
                        boosts: vec![Boost::new("battleground", "att_boost_attacker", value)],
                    }),
                    ..Default::default()
                },
            );
            catalog.insert_building(def);
        }
        catalog
    }

    #[test]
    fn city_report_groups_scores_and_totals() {
        let catalog = catalog();
        let city = vec![
            PlacedBuilding::new("a"),
            PlacedBuilding::new("a"),
            PlacedBuilding::new("X_IronAge_Landmark1"),
            PlacedBuilding::new("unknown"),
        ];
        let allies = vec![Ally {
            name: "ally".to_string(),
            bonuses: vec![Boost::new("battleground", "att_boost_attacker", 5.0)],
        }];
        let flags = FlagStore::new();
        let view = CityView {
            player: "me",
            era: ERA,
            city: &city,
            is_other: false,
        };

        let report = city_report(&catalog, view, &city, &allies, &flags, SortKey::AOefficiency);
        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.entries[0].stats.asset_id, "X_IronAge_Landmark1");
        assert_eq!(report.entries[1].quantity, 2);
        assert_eq!(report.totals.attacking_attack, 45.0);

        let other = city_report(
            &catalog,
            CityView { is_other: true, player: "them", ..view },
            &[],
            &allies,
            &flags,
            SortKey::Efficiency,
        );
        assert_eq!(other.totals.attacking_attack, 20.0);
        assert!(format_city(&other, &Settings::default()).contains("Not including great buildings"));
    }

    #[test]
    fn efficiency_classes() {
        assert_eq!(EfficiencyClass::of(f64::NAN), EfficiencyClass::None);
        assert_eq!(EfficiencyClass::of(12.0), EfficiencyClass::High);
        assert_eq!(EfficiencyClass::of(5.0), EfficiencyClass::Mid);
        assert_eq!(EfficiencyClass::of(2.5), EfficiencyClass::Mid);
        assert_eq!(EfficiencyClass::of(0.0), EfficiencyClass::Low);
        assert_eq!(EfficiencyClass::of(-1.0), EfficiencyClass::None);
    }

    #[test]
    fn cells_follow_show_mode() {
        assert_eq!(stat_cell(15.0, 0.9375, ShowMode::Percent, false), "15%-");
        assert_eq!(stat_cell(15.0, 3.0, ShowMode::Efficiency, false), "3.0+");
        assert_eq!(stat_cell(15.0, 12.0, ShowMode::Percent, true), "15% (12.0)++");
    }

    #[test]
    fn inventory_render_lists_rows() {
        let catalog = catalog();
        let flags = FlagStore::new();
        let inventory = resolve_inventory(
            &catalog,
            &[RawItem::new("a", 3)],
            ERA,
            &[],
            &flags,
            &Settings::default(),
        )
        .unwrap();
        let text = format_inventory(&inventory, &Settings::default());
        assert!(text.lines().any(|l| l.starts_with('a') && l.contains("4 (12)")));
    }
}
