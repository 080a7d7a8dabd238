//! Bonus resolution for a single building definition

use crate::catalog::Catalog;
use crate::error::Result;
use crate::models::{ALL_AGE, Boost, BuildingDefinition, EraComponents};

const SECONDS_PER_DAY: f64 = 86_400.0;
const FORGE_POINT_RESOURCE: &str = "strategy_points";
const RESOURCE_PRODUCT: &str = "resources";

/// Bonus types the scorer asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoostKind {
    /// Attack and defense for both attacking and defending units.
    AttDefBoth,
    AttAttacker,
    AttDefAttacker,
    DefAttacker,
    AttDefender,
    AttDefDefender,
    DefDefender,
    /// Daily forge point production, read from the production schedule.
    ForgePoints,
}

impl BoostKind {
    pub const COMBAT: [BoostKind; 7] = [
        BoostKind::AttDefBoth,
        BoostKind::AttAttacker,
        BoostKind::AttDefAttacker,
        BoostKind::DefAttacker,
        BoostKind::AttDefender,
        BoostKind::AttDefDefender,
        BoostKind::DefDefender,
    ];

    pub fn key(self) -> &'static str {
        match self {
            BoostKind::AttDefBoth => "att_def_boost_attacker_defender",
            BoostKind::AttAttacker => "att_boost_attacker",
            BoostKind::AttDefAttacker => "att_def_boost_attacker",
            BoostKind::DefAttacker => "def_boost_attacker",
            BoostKind::AttDefender => "att_boost_defender",
            BoostKind::AttDefDefender => "att_def_boost_defender",
            BoostKind::DefDefender => "def_boost_defender",
            BoostKind::ForgePoints => "fp",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::COMBAT
            .into_iter()
            .chain(std::iter::once(BoostKind::ForgePoints))
            .find(|kind| kind.key() == key)
    }
}

/// Which game mode a bonus is counted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureContext {
    /// Battlegrounds; also accepts bonuses targeting every feature.
    Primary,
    /// Guild raids only, with no fallback to `all`.
    Secondary,
}

impl FeatureContext {
    pub fn targets(self) -> &'static [&'static str] {
        match self {
            FeatureContext::Primary => &["battleground", "all"],
            FeatureContext::Secondary => &["guild_raids"],
        }
    }

    pub fn matches(self, targeted_feature: &str) -> bool {
        self.targets().contains(&targeted_feature)
    }

    /// The context a record counts for, if any.
    pub fn of(targeted_feature: &str) -> Option<Self> {
        [FeatureContext::Primary, FeatureContext::Secondary]
            .into_iter()
            .find(|ctx| ctx.matches(targeted_feature))
    }
}

/// The four per-side combat values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CombatValues {
    pub aoffense: f64,
    pub adefense: f64,
    pub doffense: f64,
    pub ddefense: f64,
}

impl CombatValues {
    /// Add `value` to every side the bonus type raises.
    pub fn apply(&mut self, kind: BoostKind, value: f64) {
        match kind {
            BoostKind::AttDefBoth => {
                self.aoffense += value;
                self.adefense += value;
                self.doffense += value;
                self.ddefense += value;
            }
            BoostKind::AttAttacker => self.aoffense += value,
            BoostKind::DefAttacker => self.adefense += value,
            BoostKind::AttDefAttacker => {
                self.aoffense += value;
                self.adefense += value;
            }
            BoostKind::AttDefender => self.doffense += value,
            BoostKind::DefDefender => self.ddefense += value,
            BoostKind::AttDefDefender => {
                self.doffense += value;
                self.ddefense += value;
            }
            BoostKind::ForgePoints => {}
        }
    }

    pub fn total(&self) -> f64 {
        self.aoffense + self.adefense + self.doffense + self.ddefense
    }
}

/// Net bonus of `kind` contributed by `building` in `era`.
///
/// Sums the `AllAge` components and the era's own components, so a bonus
/// defined in both counts twice.
pub fn boost_for(
    building: &BuildingDefinition,
    era: &str,
    kind: BoostKind,
    context: FeatureContext,
) -> f64 {
    let mut total = 0.0;
    for age in [ALL_AGE, era] {
        let components = building.era(age);
        if kind == BoostKind::ForgePoints {
            total += components.map_or(0.0, daily_forge_points);
            continue;
        }

        if let Some(boosts) = components.and_then(|c| c.boosts.as_ref()) {
            total += sum_matching(&boosts.boosts, kind, context);
        }

        for ability in &building.abilities {
            let hints = ability
                .boost_hints
                .iter()
                .filter_map(|hint| hint.boost_hint_era_map.get(age));
            total += sum_matching(hints, kind, context);
        }
    }
    total
}

/// [`boost_for`] by id.
pub fn boost_for_id(
    catalog: &Catalog,
    id: &str,
    era: &str,
    kind: BoostKind,
    context: FeatureContext,
) -> Result<f64> {
    let building = catalog.require_building(id)?;
    Ok(boost_for(building, era, kind, context))
}

fn sum_matching<'a>(
    boosts: impl IntoIterator<Item = &'a Boost>,
    kind: BoostKind,
    context: FeatureContext,
) -> f64 {
    boosts
        .into_iter()
        .filter(|b| context.matches(&b.targeted_feature) && b.kind == kind.key())
        .map(|b| b.value)
        .sum()
}

fn daily_forge_points(components: &EraComponents) -> f64 {
    let Some(production) = components.production.as_ref() else {
        return 0.0;
    };
    if !production.auto_start {
        return 0.0;
    }

    let mut total = 0.0;
    for option in &production.options {
        if option.time <= 0.0 {
            continue;
        }
        let multiple = SECONDS_PER_DAY / option.time;
        for product in option.products.iter().filter(|p| p.kind == RESOURCE_PRODUCT) {
            let points = product
                .player_resources
                .as_ref()
                .and_then(|r| r.resources.get(FORGE_POINT_RESOURCE))
                .copied()
                .unwrap_or(0.0);
            total += points * multiple;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::models::{
        Ability, BoostHint, BoostSet, PlayerResources, Product, Production, ProductionOption,
    };

    fn with_boosts(era: &str, boosts: Vec<Boost>) -> BuildingDefinition {
        let mut def = BuildingDefinition {
            asset_id: "B".to_string(),
            ..Default::default()
        };
        def.components.insert(
            era.to_string(),
            EraComponents {
                boosts: Some(BoostSet { boosts }),
                ..Default::default()
            },
        );
        def
    }

    #[test]
    fn primary_context_accepts_battleground_and_all() {
        let def = with_boosts(
            "IronAge",
            vec![
                Boost::new("battleground", "att_boost_attacker", 5.0),
                Boost::new("all", "att_boost_attacker", 2.0),
                Boost::new("guild_raids", "att_boost_attacker", 100.0),
                Boost::new("battleground", "def_boost_attacker", 50.0),
            ],
        );
        let v = boost_for(&def, "IronAge", BoostKind::AttAttacker, FeatureContext::Primary);
        assert_eq!(v, 7.0);
    }

    #[test]
    fn secondary_context_has_no_all_fallback() {
        let def = with_boosts(
            "IronAge",
            vec![
                Boost::new("all", "att_boost_attacker", 2.0),
                Boost::new("guild_raids", "att_boost_attacker", 4.0),
            ],
        );
        let v = boost_for(&def, "IronAge", BoostKind::AttAttacker, FeatureContext::Secondary);
        assert_eq!(v, 4.0);
    }

    #[test]
    fn all_age_and_era_layers_add_up() {
        let mut def = with_boosts("IronAge", vec![Boost::new("all", "def_boost_defender", 3.0)]);
        def.components.insert(
            ALL_AGE.to_string(),
            EraComponents {
                boosts: Some(BoostSet {
                    boosts: vec![Boost::new("all", "def_boost_defender", 3.0)],
                }),
                ..Default::default()
            },
        );
        assert_eq!(
            boost_for(&def, "IronAge", BoostKind::DefDefender, FeatureContext::Primary),
            6.0
        );
        // Another era only sees the AllAge layer.
        assert_eq!(
            boost_for(&def, "BronzeAge", BoostKind::DefDefender, FeatureContext::Primary),
            3.0
        );
    }

    #[test]
    fn ability_hints_count_per_era() {
        let mut map = HashMap::new();
        map.insert("IronAge".to_string(), Boost::new("battleground", "att_boost_defender", 8.0));
        let def = BuildingDefinition {
            asset_id: "B".to_string(),
            abilities: vec![Ability {
                boost_hints: vec![BoostHint { boost_hint_era_map: map }],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(
            boost_for(&def, "IronAge", BoostKind::AttDefender, FeatureContext::Primary),
            8.0
        );
        assert_eq!(
            boost_for(&def, "BronzeAge", BoostKind::AttDefender, FeatureContext::Primary),
            0.0
        );
    }

    #[test]
    fn forge_points_need_auto_start() {
        let mut resources = HashMap::new();
        resources.insert(FORGE_POINT_RESOURCE.to_string(), 5.0);
        let production = Production {
            auto_start: true,
            options: vec![ProductionOption {
                time: 43_200.0,
                products: vec![Product {
                    kind: RESOURCE_PRODUCT.to_string(),
                    player_resources: Some(PlayerResources { resources }),
                }],
            }],
        };
        let mut def = BuildingDefinition {
            asset_id: "FP".to_string(),
            ..Default::default()
        };
        def.components.insert(
            "IronAge".to_string(),
            EraComponents {
                production: Some(production.clone()),
                ..Default::default()
            },
        );
        assert_eq!(
            boost_for(&def, "IronAge", BoostKind::ForgePoints, FeatureContext::Secondary),
            10.0
        );

        let mut manual = production;
        manual.auto_start = false;
        def.components.get_mut("IronAge").unwrap().production = Some(manual);
        assert_eq!(
            boost_for(&def, "IronAge", BoostKind::ForgePoints, FeatureContext::Primary),
            0.0
        );
    }

    #[test]
    fn boost_for_id_rejects_unknown() {
        let catalog = Catalog::new();
        assert!(
            boost_for_id(&catalog, "missing", "IronAge", BoostKind::ForgePoints, FeatureContext::Primary)
                .is_err()
        );
    }

    #[test]
    fn combat_values_apply_by_side() {
        let mut v = CombatValues::default();
        v.apply(BoostKind::AttDefBoth, 1.0);
        v.apply(BoostKind::AttDefAttacker, 2.0);
        v.apply(BoostKind::DefDefender, 3.0);
        assert_eq!(
            v,
            CombatValues {
                aoffense: 3.0,
                adefense: 3.0,
                doffense: 1.0,
                ddefense: 4.0
            }
        );
        assert_eq!(BoostKind::from_key("def_boost_defender"), Some(BoostKind::DefDefender));
        assert_eq!(BoostKind::from_key("coins"), None);
    }
}
