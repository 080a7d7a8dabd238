//! Selection-kit expansion of the raw owned-item list

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::models::{Inventory, InventoryEntry, KitProvenance, RawItem};

/// Marker item the game lists in the inventory but that is never placeable.
pub const NON_PLACEABLE_ITEM: &str = "icon_fragment";

/// Kit whose full option list would flood the inventory with partial tiers.
pub const RESTRICTED_KIT_ID: &str = "selection_kit_epic_GR24_2";

/// The only options unpacked from [`RESTRICTED_KIT_ID`].
pub const RESTRICTED_KIT_OPTIONS: [&str; 2] = ["Neo King - Lv. 1", "Neo King Upgrade Kit"];

/// A kit or item waiting to be added, with the kits it was unpacked from.
#[derive(Debug)]
struct Pending {
    asset_id: String,
    quantity: u32,
    name: Option<String>,
    ancestors: Vec<String>,
}

/// Expands bundled selection kits into the building options they contain.
#[derive(Debug, Clone, Copy)]
pub struct InventoryExpander<'a> {
    catalog: &'a Catalog,
    era: &'a str,
}

impl<'a> InventoryExpander<'a> {
    pub fn new(catalog: &'a Catalog, era: &'a str) -> Self {
        Self { catalog, era }
    }

    pub fn expand(&self, raw: &[RawItem]) -> Inventory {
        let mut inventory = Inventory::new();
        self.expand_into(&mut inventory, raw);
        inventory
    }

    /// Add raw items to an existing inventory.
    pub fn expand_into(&self, inventory: &mut Inventory, raw: &[RawItem]) {
        for item in raw {
            if item.asset_id.is_empty() || item.asset_id == NON_PLACEABLE_ITEM {
                continue;
            }
            self.add_item(inventory, &item.asset_id, item.quantity, item.name.as_deref());
        }
    }

    /// Add `quantity` of an item, unpacking it first when it is a selection kit.
    ///
    /// Every option of an unpacked kit is added with the kit's own quantity.
    /// Kits nested inside kits are unpacked through a worklist; a kit found
    /// again among its own ancestors is skipped.
    pub fn add_item(&self, inventory: &mut Inventory, asset_id: &str, quantity: u32, name: Option<&str>) {
        let mut queue = VecDeque::from([Pending {
            asset_id: asset_id.to_string(),
            quantity,
            name: name.map(str::to_string),
            ancestors: Vec::new(),
        }]);

        while let Some(item) = queue.pop_front() {
            if self.catalog.selection_kit(&item.asset_id).is_none() {
                self.add_leaf(inventory, &item.asset_id, item.quantity, item.name.as_deref());
                continue;
            }
            if item.ancestors.contains(&item.asset_id) {
                warn!(kit = %item.asset_id, path = ?item.ancestors, "selection kit contains itself, skipping");
                continue;
            }
            self.unpack_kit(inventory, &mut queue, item);
        }
    }

    fn unpack_kit(&self, inventory: &mut Inventory, queue: &mut VecDeque<Pending>, kit: Pending) {
        let Some(options) = self
            .catalog
            .selection_kit(&kit.asset_id)
            .and_then(|def| def.era_options.get(self.era))
            .map(|set| &set.options)
        else {
            warn!(kit = %kit.asset_id, era = self.era, "can't find selection kit items");
            return;
        };

        let mut ancestors = kit.ancestors.clone();
        ancestors.push(kit.asset_id.clone());
        let mut paired = Vec::new();

        for option in options {
            if kit.asset_id == RESTRICTED_KIT_ID
                && !option
                    .name
                    .as_deref()
                    .is_some_and(|n| RESTRICTED_KIT_OPTIONS.contains(&n))
            {
                continue;
            }

            let option_id = option.item_asset_name.as_str();
            if self.catalog.selection_kit(option_id).is_some() {
                queue.push_back(Pending {
                    asset_id: option_id.to_string(),
                    quantity: kit.quantity,
                    name: option.name.clone(),
                    ancestors: ancestors.clone(),
                });
            } else {
                self.add_leaf(inventory, option_id, kit.quantity, option.name.as_deref());
            }

            let base = self
                .catalog
                .upgrade_chain(option_id)
                .and_then(|chain| chain.base_item());
            if let Some(base) = base {
                if options.iter().any(|o| o.item_asset_name == base) {
                    paired.push(KitProvenance {
                        kit: kit.asset_id.clone(),
                        main_item: base.to_string(),
                        upgrade_item: option_id.to_string(),
                        quantity: kit.quantity,
                    });
                }
            }
        }

        for link in paired {
            match inventory.get_mut(&link.main_item) {
                Some(entry) => {
                    entry.from_kits_quantity = entry.from_kits_quantity.saturating_add(link.quantity);
                    entry.from_kits.push(link);
                }
                None => debug!(kit = %link.kit, item = %link.main_item, "paired item not unpacked"),
            }
        }
    }

    fn add_leaf(&self, inventory: &mut Inventory, asset_id: &str, quantity: u32, name: Option<&str>) {
        if let Some(entry) = inventory.get_mut(asset_id) {
            entry.quantity = entry.quantity.saturating_add(quantity);
            return;
        }
        let name = self.display_name(asset_id, name);
        inventory.insert(asset_id.to_string(), InventoryEntry::new(asset_id, quantity, name));
    }

    fn display_name(&self, asset_id: &str, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_string)
            .or_else(|| self.catalog.building(asset_id).map(|b| b.name.clone()))
            .or_else(|| {
                self.catalog
                    .upgrade_chain(asset_id)
                    .and_then(|c| c.upgrade_item.as_ref())
                    .and_then(|i| i.name.clone())
            })
            .or_else(|| self.catalog.selection_kit(asset_id).and_then(|k| k.name.clone()))
            .unwrap_or_else(|| format!("Unknown item {asset_id}"))
    }
}
