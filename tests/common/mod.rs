#![allow(dead_code)]

use city_stats::Catalog;
use city_stats::models::{
    Boost, BoostSet, BuildingDefinition, EraComponents, KitOption, KitOptionSet,
    SelectionKitDefinition, UpgradeChainDefinition, UpgradeItem, UpgradeStep,
};

pub const ERA: &str = "IronAge";

/// A 1x1 building with a single attacker boost.
pub fn building(id: &str, name: &str, attack: f64) -> BuildingDefinition {
    let mut def = BuildingDefinition {
        asset_id: id.to_string(),
        name: name.to_string(),
        kind: "military".to_string(),
        length: Some(1),
        width: Some(1),
        ..Default::default()
    };
    def.components.insert(
        ERA.to_string(),
        EraComponents {
            boosts: Some(BoostSet {
                boosts: vec![Boost::new("battleground", "att_boost_attacker", attack)],
            }),
            ..Default::default()
        },
    );
    def
}

pub fn selection_kit(name: &str, options: &[&str]) -> SelectionKitDefinition {
    let mut kit = SelectionKitDefinition {
        name: Some(name.to_string()),
        ..Default::default()
    };
    kit.era_options.insert(
        ERA.to_string(),
        KitOptionSet {
            options: options
                .iter()
                .map(|id| KitOption {
                    item_asset_name: id.to_string(),
                    name: None,
                })
                .collect(),
        },
    );
    kit
}

pub fn upgrade_chain(name: &str, tiers: &[&str]) -> UpgradeChainDefinition {
    UpgradeChainDefinition {
        upgrade_item: Some(UpgradeItem {
            name: Some(name.to_string()),
        }),
        upgrade_steps: tiers
            .iter()
            .map(|id| UpgradeStep {
                building_ids: vec![id.to_string()],
            })
            .collect(),
    }
}

/// Three-tier chain `t1 -> t2 -> t3` upgraded by `kit_up`, a selection kit
/// `sk` pairing `t1` with `kit_up`, and `sk_nested` holding `sk` and `b`.
///
/// `t1` is too weak to survive pruning; everything else is kept.
pub fn fixture_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.insert_building(building("t1", "Tower - Lv. 1", 1.0));
    catalog.insert_building(building("t2", "Tower - Lv. 2", 10.0));
    catalog.insert_building(building("t3", "Tower - Lv. 3", 20.0));
    catalog.insert_building(building("b", "Barracks", 5.0));
    catalog.insert_upgrade_chain("kit_up", upgrade_chain("Tower Upgrade Kit", &["t1", "t2", "t3"]));
    catalog.insert_selection_kit("sk", selection_kit("Tower Kit", &["t1", "kit_up"]));
    catalog.insert_selection_kit("sk_nested", selection_kit("Bundle", &["sk", "b"]));
    catalog
}

/// Item ids the property tests draw from.
pub const ITEM_POOL: [&str; 8] = ["t1", "t2", "t3", "b", "kit_up", "sk", "sk_nested", "mystery"];
