//! Game data dump extraction
//!
//! Walks a directory of JSON dumps taken from the game client and loads
//! building definitions, upgrade chains and selection kits into the database.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::db;
use crate::error::Result;
use crate::models::{BuildingDefinition, SelectionKitDefinition, UpgradeChainDefinition};

/// Which catalog table a dump file feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpKind {
    CityEntities,
    BuildingUpgrades,
    SelectionKits,
}

impl DumpKind {
    /// Classify a dump by file name, e.g. `city_entities_2024.json`.
    pub fn of(path: &Path) -> Option<Self> {
        if path.extension().is_none_or(|ext| ext != "json") {
            return None;
        }
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.contains("city_entities") {
            Some(DumpKind::CityEntities)
        } else if name.contains("building_upgrades") {
            Some(DumpKind::BuildingUpgrades)
        } else if name.contains("selection_kits") {
            Some(DumpKind::SelectionKits)
        } else {
            None
        }
    }
}

/// Entity dumps come either as a list or keyed by id.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EntityDump {
    List(Vec<BuildingDefinition>),
    Map(BTreeMap<String, BuildingDefinition>),
}

/// Find all dump files below `dump_dir`
pub fn find_dump_files(dump_dir: &Path) -> Vec<(PathBuf, DumpKind)> {
    let mut dumps: Vec<(PathBuf, DumpKind)> = WalkDir::new(dump_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|entry| {
            let path = entry.path();
            DumpKind::of(path).map(|kind| (path.to_path_buf(), kind))
        })
        .collect();
    dumps.sort_by(|a, b| a.0.cmp(&b.0));
    dumps
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Load one dump file, returning how many records it held
fn load_dump(conn: &Connection, path: &Path, kind: DumpKind) -> Result<usize> {
    match kind {
        DumpKind::CityEntities => {
            let buildings = match read_json::<EntityDump>(path)? {
                EntityDump::List(list) => list,
                EntityDump::Map(map) => map.into_values().collect(),
            };
            for building in &buildings {
                db::upsert_building(conn, building)?;
            }
            Ok(buildings.len())
        }
        DumpKind::BuildingUpgrades => {
            let chains: BTreeMap<String, UpgradeChainDefinition> = read_json(path)?;
            for (id, chain) in &chains {
                db::upsert_upgrade_chain(conn, id, chain)?;
            }
            Ok(chains.len())
        }
        DumpKind::SelectionKits => {
            let kits: BTreeMap<String, SelectionKitDefinition> = read_json(path)?;
            for (id, kit) in &kits {
                db::upsert_selection_kit(conn, id, kit)?;
            }
            Ok(kits.len())
        }
    }
}

/// Extract all dumps below `dump_dir` and populate the database
pub fn extract_to_database(conn: &Connection, dump_dir: &Path) -> Result<ExtractStats> {
    let mut stats = ExtractStats::default();

    info!(dir = %dump_dir.display(), "scanning for game data dumps");
    let dumps = find_dump_files(dump_dir);
    info!(files = dumps.len(), "found dump files");

    for (path, kind) in &dumps {
        match load_dump(conn, path, *kind) {
            Ok(count) => {
                debug!(file = %path.display(), ?kind, count, "loaded dump");
                match kind {
                    DumpKind::CityEntities => stats.buildings += count,
                    DumpKind::BuildingUpgrades => stats.upgrade_chains += count,
                    DumpKind::SelectionKits => stats.selection_kits += count,
                }
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to load dump");
                stats.errors += 1;
            }
        }
    }

    Ok(stats)
}

#[derive(Debug, Default)]
pub struct ExtractStats {
    pub buildings: usize,
    pub upgrade_chains: usize,
    pub selection_kits: usize,
    pub errors: usize,
}

impl std::fmt::Display for ExtractStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Extracted {} buildings, {} upgrade chains, {} selection kits. Errors: {}",
            self.buildings, self.upgrade_chains, self.selection_kits, self.errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_dump_names() {
        assert_eq!(
            DumpKind::of(Path::new("a/City_Entities_v2.json")),
            Some(DumpKind::CityEntities)
        );
        assert_eq!(
            DumpKind::of(Path::new("building_upgrades.json")),
            Some(DumpKind::BuildingUpgrades)
        );
        assert_eq!(DumpKind::of(Path::new("selection_kits.txt")), None);
        assert_eq!(DumpKind::of(Path::new("notes.json")), None);
    }

    #[test]
    fn extracts_directory_into_catalog() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("city_entities.json"),
            r#"[{ "asset_id": "b1", "name": "Barracks", "type": "military", "length": 2, "width": 2 }]"#,
        )
        .unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("nested/building_upgrades.json"),
            r#"{ "kit": { "upgradeItem": { "name": "Kit" }, "upgradeSteps": [ { "buildingIds": ["b1"] } ] } }"#,
        )
        .unwrap();
        fs::write(dir.path().join("selection_kits.json"), "not json").unwrap();

        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        let stats = extract_to_database(&conn, dir.path()).unwrap();
        assert_eq!(stats.buildings, 1);
        assert_eq!(stats.upgrade_chains, 1);
        assert_eq!(stats.selection_kits, 0);
        assert_eq!(stats.errors, 1);

        let catalog = db::load_catalog(&conn).unwrap();
        assert_eq!(catalog.building("b1").unwrap().name, "Barracks");
        assert_eq!(catalog.upgrade_chain("kit").unwrap().base_item(), Some("b1"));
    }
}
