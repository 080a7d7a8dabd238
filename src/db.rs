//! Database schema and operations

use rusqlite::{Connection, OptionalExtension};

use crate::catalog::Catalog;
use crate::error::Result;
use crate::models::{BuildingDefinition, SelectionKitDefinition, UpgradeChainDefinition};
use crate::settings::{BuildingFlags, FlagStore, Settings, SettingsRepository};

const SETTINGS_KEY: &str = "building_stats_settings";

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Building definitions, stored as the game's JSON
        CREATE TABLE IF NOT EXISTS city_entities (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            type TEXT,
            definition TEXT NOT NULL
        );

        -- Upgrade chains keyed by their upgrade-kit item id
        CREATE TABLE IF NOT EXISTS building_upgrades (
            id TEXT PRIMARY KEY,
            definition TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS selection_kits (
            id TEXT PRIMARY KEY,
            name TEXT,
            definition TEXT NOT NULL
        );

        -- User settings bag, one JSON value per key
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Per-building display flags
        CREATE TABLE IF NOT EXISTS building_flags (
            asset_id TEXT PRIMARY KEY,
            hidden INTEGER NOT NULL DEFAULT 0,
            important INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_city_entities_type ON city_entities(type);
        "#,
    )?;
    Ok(())
}

/// Insert or replace a building definition
pub fn upsert_building(conn: &Connection, building: &BuildingDefinition) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO city_entities (id, name, type, definition) VALUES (?1, ?2, ?3, ?4)",
        (
            &building.asset_id,
            &building.name,
            &building.kind,
            serde_json::to_string(building)?,
        ),
    )?;
    Ok(())
}

/// Insert or replace an upgrade chain
pub fn upsert_upgrade_chain(conn: &Connection, kit_id: &str, chain: &UpgradeChainDefinition) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO building_upgrades (id, definition) VALUES (?1, ?2)",
        (kit_id, serde_json::to_string(chain)?),
    )?;
    Ok(())
}

/// Insert or replace a selection kit
pub fn upsert_selection_kit(conn: &Connection, kit_id: &str, kit: &SelectionKitDefinition) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO selection_kits (id, name, definition) VALUES (?1, ?2, ?3)",
        (kit_id, &kit.name, serde_json::to_string(kit)?),
    )?;
    Ok(())
}

/// Clear all catalog data (for re-extraction); settings and flags are kept
pub fn clear_catalog(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM selection_kits;
        DELETE FROM building_upgrades;
        DELETE FROM city_entities;
        "#,
    )?;
    Ok(())
}

fn definitions(conn: &Connection, table: &str) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(&format!("SELECT id, definition FROM {table} ORDER BY id"))?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Load the whole catalog into memory
pub fn load_catalog(conn: &Connection) -> Result<Catalog> {
    let mut catalog = Catalog::new();
    for (_, json) in definitions(conn, "city_entities")? {
        catalog.insert_building(serde_json::from_str(&json)?);
    }
    for (id, json) in definitions(conn, "building_upgrades")? {
        catalog.insert_upgrade_chain(&id, serde_json::from_str(&json)?);
    }
    for (id, json) in definitions(conn, "selection_kits")? {
        catalog.insert_selection_kit(&id, serde_json::from_str(&json)?);
    }
    Ok(catalog)
}

/// List all buildings as (id, name, type)
pub fn list_buildings(conn: &Connection) -> Result<Vec<(String, String, String)>> {
    let mut stmt = conn.prepare("SELECT id, name, COALESCE(type, '') FROM city_entities ORDER BY name")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Settings and flags persisted in SQLite
#[derive(Debug)]
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    pub fn new(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl SettingsRepository for SqliteRepository {
    fn load_settings(&self) -> Result<Settings> {
        let value: Option<String> = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [SETTINGS_KEY], |row| row.get(0))
            .optional()?;
        match value {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Settings::default()),
        }
    }

    fn save_settings(&mut self, settings: &Settings) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            (SETTINGS_KEY, serde_json::to_string(settings)?),
        )?;
        Ok(())
    }

    fn load_flags(&self) -> Result<FlagStore> {
        let mut stmt = self
            .conn
            .prepare("SELECT asset_id, hidden, important FROM building_flags")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                BuildingFlags {
                    hidden: row.get(1)?,
                    important: row.get(2)?,
                },
            ))
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results.into_iter().collect())
    }

    fn save_flags(&mut self, id: &str, flags: BuildingFlags) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO building_flags (asset_id, hidden, important) VALUES (?1, ?2, ?3)",
            (id, flags.hidden, flags.important),
        )?;
        Ok(())
    }
}
