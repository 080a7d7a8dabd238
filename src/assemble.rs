//! Upgrade-chain assembly, temporary-building downgrade, and inventory pruning

use regex::Regex;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::error::Result;
use crate::expand::InventoryExpander;
use crate::models::{Inventory, InventoryEntry, UpgradeChainDefinition, UpgradeStep};
use crate::scorer::{ScoringContext, score_definition};
use crate::settings::{Settings, SortKey};

/// Minimum forge points per square kept when sorting by forge points.
pub const MIN_FP_EFFICIENCY: f64 = 0.25;

/// Minimum combined efficiency kept under every other sort.
pub const MIN_EFFICIENCY: f64 = 2.5;

/// Upper bound on full passes over the chain catalog.
const MAX_ASSEMBLY_PASSES: usize = 1_000;

/// The settings the resolution pass reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyOptions {
    pub assemble: bool,
    pub downgrade_temporary: bool,
    pub neo_max_only: bool,
    pub sort: SortKey,
}

impl From<&Settings> for AssemblyOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            assemble: settings.assemble,
            downgrade_temporary: settings.downgrade_temporary_items,
            neo_max_only: settings.neo_max_only,
            sort: settings.inventory_sort,
        }
    }
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

/// Matches the partial tiers of "Neo" building lines by display name.
#[derive(Debug, Clone)]
pub struct NeoTierRule {
    level: Regex,
}

impl NeoTierRule {
    pub fn new() -> Result<Self> {
        Ok(Self {
            level: Regex::new(r"Lv\. (\d+)")?,
        })
    }

    /// Level 1 of any Neo line, or below level 10 of a "Col" line.
    pub fn is_partial(&self, name: &str) -> bool {
        let Some(rest) = name.strip_prefix("Neo ") else {
            return false;
        };
        let Some(level) = self
            .level
            .captures(name)
            .and_then(|cap| cap[1].parse::<u32>().ok())
        else {
            return false;
        };
        (rest.starts_with("Col") && level < 10) || level == 1
    }
}

/// Turns an expanded inventory into the best obtainable buildings.
#[derive(Debug, Clone)]
pub struct UpgradeAssembler<'a> {
    catalog: &'a Catalog,
    expander: InventoryExpander<'a>,
    neo: NeoTierRule,
}

impl<'a> UpgradeAssembler<'a> {
    pub fn new(catalog: &'a Catalog, era: &'a str) -> Result<Self> {
        Ok(Self {
            catalog,
            expander: InventoryExpander::new(catalog, era),
            neo: NeoTierRule::new()?,
        })
    }

    /// Run upgrade assembly, the downgrade pass and pruning, in that order.
    pub fn resolve<'i>(
        &self,
        inventory: &'i mut Inventory,
        options: AssemblyOptions,
        ctx: &ScoringContext<'_>,
    ) -> &'i mut Inventory {
        if options.assemble {
            let upgrades = self.apply_upgrades(inventory);
            debug!(upgrades, "assembled upgrade chains");
        }
        if options.downgrade_temporary {
            self.downgrade_temporary(inventory);
        }
        self.prune(inventory, options, ctx);
        inventory
    }

    /// Apply upgrade kits until no chain changes anything. Returns the
    /// number of upgrades made.
    pub fn apply_upgrades(&self, inventory: &mut Inventory) -> usize {
        let mut total = 0;
        for _ in 0..MAX_ASSEMBLY_PASSES {
            let mut changed = false;
            for kit_id in self.catalog.upgrade_chain_ids() {
                let Some(chain) = self.catalog.upgrade_chain(kit_id) else {
                    continue;
                };
                let upgrades = self.upgrade_chain(inventory, kit_id, chain);
                if upgrades > 0 {
                    total += upgrades;
                    changed = true;
                }
            }
            if !changed {
                return total;
            }
        }
        warn!(passes = MAX_ASSEMBLY_PASSES, "upgrade assembly did not settle");
        total
    }

    /// Spend one chain's upgrade kits, highest upgradable tier first.
    fn upgrade_chain(&self, inventory: &mut Inventory, kit_id: &str, chain: &UpgradeChainDefinition) -> usize {
        let Some(kit) = inventory.get(kit_id) else {
            return 0;
        };
        let mut remaining = i64::from(kit.quantity);
        let tiers: Vec<&UpgradeStep> = chain.upgrade_steps.iter().rev().collect();

        let mut upgrades = 0;
        while remaining > 0 {
            let mut upgraded = false;
            for pair in tiers.windows(2) {
                let (next_tier, tier) = (pair[0], pair[1]);
                let Some(item_id) = tier.building_ids.first() else {
                    continue;
                };
                let Some(item) = inventory.get_mut(item_id) else {
                    continue;
                };
                if item.quantity == 0 || is_own_kit_pair(item, kit_id) {
                    continue;
                }

                remaining -= 1;
                let mut kits_used = 1;
                if item.is_fully_kit_derived() {
                    // The kit that supplied this item also supplied an upgrade
                    // kit; both halves of the pair are spent together.
                    release_credits(item, kit_id, 2);
                    item.from_kits_quantity = item.from_kits_quantity.saturating_sub(2);
                    item.quantity = item.quantity.saturating_sub(1);
                    remaining -= 1;
                    kits_used += 1;
                }
                item.quantity = item.quantity.saturating_sub(1);
                if let Some(kit) = inventory.get_mut(kit_id) {
                    kit.quantity = kit.quantity.saturating_sub(kits_used);
                }

                for id in &next_tier.building_ids {
                    self.expander.add_item(inventory, id, 1, None);
                }
                debug!(kit = kit_id, from = %item_id, to = ?next_tier.building_ids, "upgraded");
                upgrades += 1;
                upgraded = true;
                break;
            }
            if !upgraded {
                break;
            }
        }
        upgrades
    }

    /// Replace temporary buildings by what they turn into once expired.
    pub fn downgrade_temporary(&self, inventory: &mut Inventory) {
        let held: Vec<String> = inventory
            .iter()
            .filter(|(_, entry)| entry.quantity > 0)
            .map(|(id, _)| id.clone())
            .collect();

        for id in held {
            let Some(target) = self.catalog.building(&id).and_then(|b| b.downgrade_target()) else {
                continue;
            };
            if target == id {
                continue;
            }
            let Some(entry) = inventory.get_mut(&id) else {
                continue;
            };
            let quantity = std::mem::take(&mut entry.quantity);
            debug!(from = %id, to = target, quantity, "downgraded temporary building");
            self.expander.add_item(inventory, target, quantity, None);
        }
    }

    /// Drop entries that should not be displayed and score the rest.
    pub fn prune(&self, inventory: &mut Inventory, options: AssemblyOptions, ctx: &ScoringContext<'_>) {
        inventory.retain(|id, entry| {
            if options.neo_max_only && self.neo.is_partial(&entry.name) {
                return false;
            }

            let Some(building) = self.catalog.building(id).filter(|_| entry.quantity > 0) else {
                // With assembly off, kits still held stay visible. Spent kits
                // (quantity 0) are dropped like any other empty entry.
                return !options.assemble
                    && entry.quantity > 0
                    && (self.catalog.upgrade_chain(id).is_some()
                        || self.catalog.selection_kit(id).is_some());
            };

            let stats = score_definition(building, ctx);
            let keep = if options.sort.is_forge_points() {
                stats.fp_efficiency >= MIN_FP_EFFICIENCY
            } else {
                stats.efficiency >= MIN_EFFICIENCY
            };
            if keep {
                entry.stats = Some(stats);
            }
            keep
        });
    }
}

/// A single unit that is both the base item and, through its kit, the
/// upgrade kit of this chain.
fn is_own_kit_pair(item: &InventoryEntry, kit_id: &str) -> bool {
    item.quantity == 1
        && item.is_fully_kit_derived()
        && item
            .from_kits
            .first()
            .is_some_and(|link| link.upgrade_item == kit_id)
}

fn release_credits(item: &mut InventoryEntry, kit_id: &str, mut count: u32) {
    for link in item.from_kits.iter_mut().filter(|l| l.upgrade_item == kit_id) {
        let released = link.quantity.min(count);
        link.quantity -= released;
        count -= released;
        if count == 0 {
            break;
        }
    }
}
