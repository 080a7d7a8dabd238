//! City-wide combat totals

use tracing::debug;

use crate::bonus::{BoostKind, CombatValues, FeatureContext};
use crate::models::{Ally, BuildingEntry, Totals};
use crate::scorer::is_landmark;

impl Totals {
    fn add(&mut self, context: FeatureContext, values: CombatValues) {
        match context {
            FeatureContext::Primary => {
                self.attacking_attack += values.aoffense;
                self.attacking_defense += values.adefense;
                self.defending_attack += values.doffense;
                self.defending_defense += values.ddefense;
            }
            FeatureContext::Secondary => {
                self.qi_attacking_attack += values.aoffense;
                self.qi_attacking_defense += values.adefense;
                self.qi_defending_attack += values.doffense;
                self.qi_defending_defense += values.ddefense;
            }
        }
    }
}

/// Sum the placed buildings, each weighted by its quantity.
///
/// Great buildings are skipped unless `include_landmarks` is set; their
/// levels are not visible in another player's city.
pub fn building_totals(entries: &[BuildingEntry], include_landmarks: bool) -> Totals {
    let mut totals = Totals::default();
    for entry in entries {
        let stats = &entry.stats;
        if !include_landmarks && is_landmark(&stats.asset_id) {
            continue;
        }
        let quantity = f64::from(entry.quantity);
        totals.add(
            FeatureContext::Primary,
            CombatValues {
                aoffense: stats.aoffense * quantity,
                adefense: stats.adefense * quantity,
                doffense: stats.doffense * quantity,
                ddefense: stats.ddefense * quantity,
            },
        );
        totals.add(
            FeatureContext::Secondary,
            CombatValues {
                aoffense: stats.qi_aoffense * quantity,
                adefense: stats.qi_adefense * quantity,
                doffense: stats.qi_doffense * quantity,
                ddefense: stats.qi_ddefense * quantity,
            },
        );
    }
    totals
}

/// Merge ally bonus records, classified the way building boosts are.
pub fn add_ally_bonuses(totals: &mut Totals, allies: &[Ally]) {
    for ally in allies {
        for bonus in &ally.bonuses {
            let (Some(kind), Some(context)) = (
                BoostKind::from_key(&bonus.kind),
                FeatureContext::of(&bonus.targeted_feature),
            ) else {
                debug!(ally = %ally.name, kind = %bonus.kind, "ally bonus not counted");
                continue;
            };
            let mut values = CombatValues::default();
            values.apply(kind, bonus.value);
            totals.add(context, values);
        }
    }
}

pub fn aggregate(entries: &[BuildingEntry], allies: &[Ally], include_landmarks: bool) -> Totals {
    let mut totals = building_totals(entries, include_landmarks);
    add_ally_bonuses(&mut totals, allies);
    totals
}
