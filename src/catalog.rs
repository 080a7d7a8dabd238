//! Read-only lookup over the game's building, upgrade-chain and selection-kit data

use std::collections::HashMap;

use crate::error::{Result, StatsError};
use crate::models::{BuildingDefinition, SelectionKitDefinition, UpgradeChainDefinition};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    buildings: HashMap<String, BuildingDefinition>,
    upgrade_chains: HashMap<String, UpgradeChainDefinition>,
    selection_kits: HashMap<String, SelectionKitDefinition>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_building(&mut self, building: BuildingDefinition) {
        self.buildings.insert(building.asset_id.clone(), building);
    }

    /// Register an upgrade chain under its upgrade-kit item id.
    pub fn insert_upgrade_chain(&mut self, kit_id: &str, chain: UpgradeChainDefinition) {
        self.upgrade_chains.insert(kit_id.to_string(), chain);
    }

    pub fn insert_selection_kit(&mut self, kit_id: &str, kit: SelectionKitDefinition) {
        self.selection_kits.insert(kit_id.to_string(), kit);
    }

    pub fn building(&self, id: &str) -> Option<&BuildingDefinition> {
        self.buildings.get(id)
    }

    /// Like [`Catalog::building`] but an absent id is an error.
    pub fn require_building(&self, id: &str) -> Result<&BuildingDefinition> {
        self.building(id)
            .ok_or_else(|| StatsError::UnknownEntity(id.to_string()))
    }

    pub fn upgrade_chain(&self, kit_id: &str) -> Option<&UpgradeChainDefinition> {
        self.upgrade_chains.get(kit_id)
    }

    pub fn selection_kit(&self, kit_id: &str) -> Option<&SelectionKitDefinition> {
        self.selection_kits.get(kit_id)
    }

    /// Upgrade-kit ids in a stable order.
    pub fn upgrade_chain_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.upgrade_chains.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn buildings(&self) -> impl Iterator<Item = &BuildingDefinition> {
        self.buildings.values()
    }

    pub fn upgrade_chains(&self) -> impl Iterator<Item = (&String, &UpgradeChainDefinition)> {
        self.upgrade_chains.iter()
    }

    pub fn selection_kits(&self) -> impl Iterator<Item = (&String, &SelectionKitDefinition)> {
        self.selection_kits.iter()
    }

    pub fn len(&self) -> usize {
        self.buildings.len() + self.upgrade_chains.len() + self.selection_kits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
