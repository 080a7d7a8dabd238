//! Per-building combat and efficiency scoring

use crate::bonus::{BoostKind, CombatValues, FeatureContext, boost_for};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::models::{BuildingDefinition, GREAT_BUILDING_TYPE, PlacedBuilding, ScoredStats};
use crate::settings::FlagStore;

/// Asset ids of great buildings contain this marker.
pub const LANDMARK_MARKER: &str = "Landmark";

/// A great building whose id lacks the marker.
pub const LANDMARK_EXCEPTION_ID: &str = "X_AllAge_EasterBonus4";

/// Roads cap at a single tile once the short side exceeds this.
const MAX_ROAD_SIDE: u32 = 5;

pub fn is_landmark(asset_id: &str) -> bool {
    asset_id.contains(LANDMARK_MARKER) || asset_id == LANDMARK_EXCEPTION_ID
}

/// Everything besides the definition that scoring reads.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub era: &'a str,
    /// Placed buildings searched for great-building flat bonuses.
    pub landmark_city: &'a [PlacedBuilding],
    pub flags: &'a FlagStore,
}

/// Score a building by id.
pub fn score(catalog: &Catalog, id: &str, ctx: &ScoringContext<'_>) -> Result<ScoredStats> {
    let building = catalog.require_building(id)?;
    Ok(score_definition(building, ctx))
}

pub fn score_definition(building: &BuildingDefinition, ctx: &ScoringContext<'_>) -> ScoredStats {
    let mut primary = combat_values(building, ctx.era, FeatureContext::Primary);
    let mut secondary = combat_values(building, ctx.era, FeatureContext::Secondary);

    if is_landmark(&building.asset_id) {
        apply_landmark_bonus(&mut primary, &building.asset_id, ctx.landmark_city);
    }
    apply_chain_links(building, ctx.era, &mut primary, &mut secondary);

    let footprint = Footprint::of(building);
    let fp = boost_for(building, ctx.era, BoostKind::ForgePoints, FeatureContext::Primary);
    let ratio = |n: f64| {
        if footprint.size > 0.0 {
            n / footprint.size
        } else {
            0.0
        }
    };

    let flags = ctx.flags.get(&building.asset_id);
    let CombatValues {
        aoffense,
        adefense,
        doffense,
        ddefense,
    } = primary;

    ScoredStats {
        asset_id: building.asset_id.clone(),
        name: building.name.clone(),
        kind: building.kind.clone(),
        aoffense,
        adefense,
        atotal: aoffense + adefense,
        doffense,
        ddefense,
        dtotal: doffense + ddefense,
        qi_aoffense: secondary.aoffense,
        qi_adefense: secondary.adefense,
        qi_doffense: secondary.doffense,
        qi_ddefense: secondary.ddefense,
        length: footprint.length,
        width: footprint.width,
        needs_roads: footprint.needs_roads,
        roads: footprint.roads,
        size: footprint.size,
        efficiency: ratio(primary.total()),
        a_efficiency: ratio(aoffense + adefense),
        ao_efficiency: ratio(aoffense),
        ad_efficiency: ratio(adefense),
        d_efficiency: ratio(doffense + ddefense),
        do_efficiency: ratio(doffense),
        dd_efficiency: ratio(ddefense),
        fp,
        fp_efficiency: ratio(fp),
        hidden: flags.hidden,
        important: flags.important,
    }
}

/// The four combat values from boosts alone.
///
/// Each side value is the symmetric bonus plus its own bonus plus the
/// shared attack-and-defense bonus of that side.
fn combat_values(building: &BuildingDefinition, era: &str, context: FeatureContext) -> CombatValues {
    let mut values = CombatValues::default();
    for kind in BoostKind::COMBAT {
        values.apply(kind, boost_for(building, era, kind, context));
    }
    values
}

fn apply_landmark_bonus(values: &mut CombatValues, asset_id: &str, city: &[PlacedBuilding]) {
    let Some(bonus) = city
        .iter()
        .find(|placed| placed.cityentity_id == asset_id)
        .and_then(|placed| placed.bonus.as_ref())
    else {
        return;
    };

    if matches!(bonus.kind.as_str(), "military_boost" | "advanced_tactics") {
        values.aoffense += bonus.value;
        values.adefense += bonus.value;
    }
    if matches!(bonus.kind.as_str(), "advanced_tactics" | "fierce_resistance") {
        values.doffense += bonus.value;
        values.ddefense += bonus.value;
    }
}

fn apply_chain_links(
    building: &BuildingDefinition,
    era: &str,
    primary: &mut CombatValues,
    secondary: &mut CombatValues,
) {
    for ability in building.abilities.iter().filter(|a| a.is_chain_link()) {
        let Some(boost) = ability.bonus_given.as_ref().and_then(|g| g.for_era(era)) else {
            continue;
        };
        let Some(kind) = BoostKind::from_key(&boost.kind) else {
            continue;
        };
        match FeatureContext::of(&boost.targeted_feature) {
            Some(FeatureContext::Primary) => primary.apply(kind, boost.value),
            Some(FeatureContext::Secondary) => secondary.apply(kind, boost.value),
            None => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Footprint {
    length: Option<u32>,
    width: Option<u32>,
    needs_roads: u32,
    roads: u32,
    size: f64,
}

impl Footprint {
    fn of(building: &BuildingDefinition) -> Self {
        let all_age = building.all_age();
        let placed = all_age
            .and_then(|c| c.placement.as_ref())
            .and_then(|p| p.size.as_ref());
        let non_zero = |v: &u32| *v > 0;

        let length = building
            .length
            .filter(non_zero)
            .or_else(|| placed.and_then(|s| s.y))
            .filter(non_zero);
        let width = building
            .width
            .filter(non_zero)
            .or_else(|| placed.and_then(|s| s.x))
            .filter(non_zero);

        let needs_roads = all_age
            .and_then(|c| c.street_connection_requirement.as_ref())
            .and_then(|r| r.required_level)
            .filter(non_zero)
            .or_else(|| {
                building
                    .requirements
                    .as_ref()
                    .and_then(|r| r.street_connection_level)
                    .filter(non_zero)
            })
            .unwrap_or(if building.kind == GREAT_BUILDING_TYPE { 1 } else { 0 });

        let (roads, size) = match (length, width) {
            (Some(l), Some(w)) => {
                let short_side = l.min(w);
                let road_units = if short_side > MAX_ROAD_SIDE { 1 } else { short_side };
                let roads = needs_roads.saturating_mul(road_units);
                (roads, f64::from(l) * f64::from(w) + f64::from(roads) / 2.0)
            }
            _ => (0, 0.0),
        };

        Self {
            length,
            width,
            needs_roads,
            roads,
            size,
        }
    }
}
