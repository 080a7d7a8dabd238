//! Data models for catalog definitions, city snapshots and scored rows

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::settings::SortKey;

/// Era key whose components apply in every era.
pub const ALL_AGE: &str = "AllAge";

/// Ability class carrying a chain-link (set) bonus.
pub const CHAIN_LINK_ABILITY: &str = "ChainLinkAbility";

/// Building type whose road requirement defaults to one.
pub const GREAT_BUILDING_TYPE: &str = "greatbuilding";

// ----------------------------------------------------------------------------
// Catalog definitions (read-only, deserialised from game data dumps)
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildingDefinition {
    pub asset_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub requirements: Option<Requirements>,
    /// Components keyed by era, `AllAge` included.
    #[serde(default)]
    pub components: HashMap<String, EraComponents>,
    #[serde(default)]
    pub abilities: Vec<Ability>,
}

impl BuildingDefinition {
    pub fn era(&self, era: &str) -> Option<&EraComponents> {
        self.components.get(era)
    }

    pub fn all_age(&self) -> Option<&EraComponents> {
        self.era(ALL_AGE)
    }

    /// Target id a limited (temporary) building downgrades into.
    pub fn downgrade_target(&self) -> Option<&str> {
        self.all_age()?
            .limited
            .as_ref()?
            .config
            .as_ref()?
            .target_city_entity_id
            .as_deref()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    pub street_connection_level: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EraComponents {
    #[serde(default)]
    pub boosts: Option<BoostSet>,
    #[serde(default)]
    pub production: Option<Production>,
    #[serde(default)]
    pub placement: Option<Placement>,
    #[serde(default)]
    pub street_connection_requirement: Option<StreetConnectionRequirement>,
    #[serde(default)]
    pub limited: Option<Limited>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoostSet {
    #[serde(default)]
    pub boosts: Vec<Boost>,
}

/// A single bonus record: which feature it targets, its type and value.
///
/// Also used for ally bonus records, which share the same shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Boost {
    #[serde(default)]
    pub targeted_feature: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: f64,
}

impl Boost {
    pub fn new(targeted_feature: &str, kind: &str, value: f64) -> Self {
        Self {
            targeted_feature: targeted_feature.to_string(),
            kind: kind.to_string(),
            value,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Production {
    #[serde(default)]
    pub auto_start: bool,
    #[serde(default)]
    pub options: Vec<ProductionOption>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductionOption {
    /// Cycle time in seconds.
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub player_resources: Option<PlayerResources>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerResources {
    #[serde(default)]
    pub resources: HashMap<String, f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Placement {
    #[serde(default)]
    pub size: Option<PlacementSize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacementSize {
    #[serde(default)]
    pub x: Option<u32>,
    #[serde(default)]
    pub y: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreetConnectionRequirement {
    #[serde(default)]
    pub required_level: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Limited {
    #[serde(default)]
    pub config: Option<LimitedConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitedConfig {
    #[serde(default)]
    pub target_city_entity_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ability {
    #[serde(rename = "__class__", default)]
    pub class: String,
    #[serde(default)]
    pub boost_hints: Vec<BoostHint>,
    #[serde(default)]
    pub bonus_given: Option<BonusGiven>,
}

impl Ability {
    pub fn is_chain_link(&self) -> bool {
        self.class == CHAIN_LINK_ABILITY
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostHint {
    #[serde(default)]
    pub boost_hint_era_map: HashMap<String, Boost>,
}

/// Bonus granted by a chain-link ability once the set is linked.
///
/// The value is looked up per era, then `AllAge`, then the untyped
/// fields on the record itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusGiven {
    #[serde(default)]
    pub boost: HashMap<String, Boost>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub targeted_feature: Option<String>,
}

impl BonusGiven {
    pub fn for_era(&self, era: &str) -> Option<Boost> {
        if let Some(boost) = self.boost.get(era).or_else(|| self.boost.get(ALL_AGE)) {
            return Some(boost.clone());
        }
        Some(Boost {
            targeted_feature: self
                .targeted_feature
                .clone()
                .unwrap_or_else(|| "all".to_string()),
            kind: self.kind.clone()?,
            value: self.value?,
        })
    }
}

/// Multi-step upgrade chain, keyed in the catalog by its upgrade-kit item id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeChainDefinition {
    #[serde(default)]
    pub upgrade_item: Option<UpgradeItem>,
    /// Steps ordered from the lowest tier upwards.
    #[serde(default)]
    pub upgrade_steps: Vec<UpgradeStep>,
}

impl UpgradeChainDefinition {
    /// First option of the lowest tier.
    pub fn base_item(&self) -> Option<&str> {
        self.upgrade_steps
            .first()?
            .building_ids
            .first()
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpgradeItem {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeStep {
    #[serde(default)]
    pub building_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionKitDefinition {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub era_options: HashMap<String, KitOptionSet>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KitOptionSet {
    #[serde(default)]
    pub options: Vec<KitOption>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitOption {
    pub item_asset_name: String,
    #[serde(default)]
    pub name: Option<String>,
}

// ----------------------------------------------------------------------------
// Raw inputs supplied by the host game
// ----------------------------------------------------------------------------

/// An owned inventory item as reported by the game.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(rename = "itemAssetName", default)]
    pub asset_id: String,
    #[serde(rename = "inStock", default)]
    pub quantity: u32,
    #[serde(default)]
    pub name: Option<String>,
}

impl RawItem {
    pub fn new(asset_id: &str, quantity: u32) -> Self {
        Self {
            asset_id: asset_id.to_string(),
            quantity,
            name: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacedBuilding {
    pub cityentity_id: String,
    /// Flat bonus carried by placed great buildings.
    #[serde(default)]
    pub bonus: Option<FlatBonus>,
}

impl PlacedBuilding {
    pub fn new(cityentity_id: &str) -> Self {
        Self {
            cityentity_id: cityentity_id.to_string(),
            bonus: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlatBonus {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ally {
    #[serde(default)]
    pub name: String,
    /// Bonus records of the ally's current tier.
    #[serde(default)]
    pub bonuses: Vec<Boost>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OtherPlayer {
    pub name: String,
    pub era: String,
    #[serde(default)]
    pub city: Vec<PlacedBuilding>,
}

/// Everything the host game hands over for one refresh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CitySnapshot {
    pub player_name: String,
    pub era: String,
    #[serde(default)]
    pub city: Vec<PlacedBuilding>,
    #[serde(default)]
    pub inventory: Vec<RawItem>,
    #[serde(default)]
    pub allies: Vec<Ally>,
    #[serde(default)]
    pub other_player: Option<OtherPlayer>,
}

// ----------------------------------------------------------------------------
// Derived rows
// ----------------------------------------------------------------------------

/// Scored stats of one building in one era.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoredStats {
    pub asset_id: String,
    pub name: String,
    pub kind: String,
    pub aoffense: f64,
    pub adefense: f64,
    pub atotal: f64,
    pub doffense: f64,
    pub ddefense: f64,
    pub dtotal: f64,
    pub qi_aoffense: f64,
    pub qi_adefense: f64,
    pub qi_doffense: f64,
    pub qi_ddefense: f64,
    pub length: Option<u32>,
    pub width: Option<u32>,
    pub needs_roads: u32,
    pub roads: u32,
    /// Footprint plus half the road allowance; 0 when unsized.
    pub size: f64,
    pub efficiency: f64,
    pub a_efficiency: f64,
    pub ao_efficiency: f64,
    pub ad_efficiency: f64,
    pub d_efficiency: f64,
    pub do_efficiency: f64,
    pub dd_efficiency: f64,
    /// Forge points per day.
    pub fp: f64,
    pub fp_efficiency: f64,
    pub hidden: bool,
    pub important: bool,
}

impl ScoredStats {
    pub fn value(&self, key: SortKey) -> f64 {
        match key {
            SortKey::Efficiency => self.efficiency,
            SortKey::Aefficiency => self.a_efficiency,
            SortKey::AOefficiency => self.ao_efficiency,
            SortKey::ADefficiency => self.ad_efficiency,
            SortKey::Defficiency => self.d_efficiency,
            SortKey::DOefficiency => self.do_efficiency,
            SortKey::DDefficiency => self.dd_efficiency,
            SortKey::FPefficiency => self.fp_efficiency,
            SortKey::FP => self.fp,
        }
    }

    pub fn stat_total(&self) -> f64 {
        self.aoffense + self.adefense + self.doffense + self.ddefense
    }
}

/// Records that part of an entry's quantity came out of a selection kit
/// that also contained the matching upgrade kit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KitProvenance {
    pub kit: String,
    pub main_item: String,
    pub upgrade_item: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryEntry {
    pub asset_id: String,
    pub quantity: u32,
    pub name: String,
    pub from_kits: Vec<KitProvenance>,
    pub from_kits_quantity: u32,
    pub stats: Option<ScoredStats>,
}

impl InventoryEntry {
    pub fn new(asset_id: &str, quantity: u32, name: String) -> Self {
        Self {
            asset_id: asset_id.to_string(),
            quantity,
            name,
            from_kits: Vec::new(),
            from_kits_quantity: 0,
            stats: None,
        }
    }

    /// True when every held unit came out of a paired kit.
    pub fn is_fully_kit_derived(&self) -> bool {
        !self.from_kits.is_empty() && self.from_kits_quantity == self.quantity
    }

    pub fn value(&self, key: SortKey) -> f64 {
        self.stats.as_ref().map_or(0.0, |s| s.value(key))
    }
}

/// Working inventory of one resolution pass, ordered by asset id.
pub type Inventory = BTreeMap<String, InventoryEntry>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingEntry {
    pub stats: ScoredStats,
    pub quantity: u32,
}

/// City-wide sums of the four combat values, primary and secondary context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub attacking_attack: f64,
    pub attacking_defense: f64,
    pub defending_attack: f64,
    pub defending_defense: f64,
    pub qi_attacking_attack: f64,
    pub qi_attacking_defense: f64,
    pub qi_defending_attack: f64,
    pub qi_defending_defense: f64,
}
