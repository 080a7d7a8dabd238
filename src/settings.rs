//! User settings, per-building flags, and their debounced persistence

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Delay between the last mutation and the commit that persists it.
pub const DEFAULT_COMMIT_DELAY: Duration = Duration::from_secs(1);

/// Stat a table is sorted by, descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum SortKey {
    #[default]
    #[serde(rename = "efficiency")]
    #[value(name = "efficiency")]
    Efficiency,
    #[serde(rename = "Aefficiency")]
    #[value(name = "Aefficiency")]
    Aefficiency,
    #[serde(rename = "AOefficiency")]
    #[value(name = "AOefficiency")]
    AOefficiency,
    #[serde(rename = "ADefficiency")]
    #[value(name = "ADefficiency")]
    ADefficiency,
    #[serde(rename = "Defficiency")]
    #[value(name = "Defficiency")]
    Defficiency,
    #[serde(rename = "DOefficiency")]
    #[value(name = "DOefficiency")]
    DOefficiency,
    #[serde(rename = "DDefficiency")]
    #[value(name = "DDefficiency")]
    DDefficiency,
    #[serde(rename = "FPefficiency")]
    #[value(name = "FPefficiency")]
    FPefficiency,
    #[serde(rename = "FP")]
    #[value(name = "FP")]
    FP,
}

impl SortKey {
    pub fn is_forge_points(self) -> bool {
        matches!(self, SortKey::FP | SortKey::FPefficiency)
    }
}

/// What the stat cells display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum ShowMode {
    #[serde(rename = "%")]
    #[value(name = "percent")]
    Percent,
    #[serde(rename = "#")]
    #[value(name = "efficiency")]
    Efficiency,
    #[default]
    #[serde(rename = "both")]
    #[value(name = "both")]
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sort: SortKey,
    pub inventory_sort: SortKey,
    pub show: ShowMode,
    pub show_hidden: bool,
    pub show_inventory: bool,
    pub downgrade_temporary_items: bool,
    pub assemble: bool,
    pub neo_max_only: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sort: SortKey::Efficiency,
            inventory_sort: SortKey::Efficiency,
            show: ShowMode::Both,
            show_hidden: false,
            show_inventory: true,
            downgrade_temporary_items: true,
            assemble: true,
            neo_max_only: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingFlags {
    pub hidden: bool,
    pub important: bool,
}

/// Persisted flags keyed by building id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagStore {
    flags: HashMap<String, BuildingFlags>,
}

impl FlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags for `id`, all false when never set.
    pub fn get(&self, id: &str) -> BuildingFlags {
        self.flags.get(id).copied().unwrap_or_default()
    }

    pub fn set(&mut self, id: &str, flags: BuildingFlags) {
        self.flags.insert(id.to_string(), flags);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BuildingFlags)> {
        self.flags.iter()
    }
}

impl FromIterator<(String, BuildingFlags)> for FlagStore {
    fn from_iter<I: IntoIterator<Item = (String, BuildingFlags)>>(iter: I) -> Self {
        Self {
            flags: iter.into_iter().collect(),
        }
    }
}

/// Storage for the state that survives across resolution passes.
pub trait SettingsRepository {
    fn load_settings(&self) -> Result<Settings>;
    fn save_settings(&mut self, settings: &Settings) -> Result<()>;
    fn load_flags(&self) -> Result<FlagStore>;
    fn save_flags(&mut self, id: &str, flags: BuildingFlags) -> Result<()>;
}

/// In-memory repository that counts writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    pub settings: Settings,
    pub flags: FlagStore,
    pub writes: usize,
}

impl SettingsRepository for MemoryRepository {
    fn load_settings(&self) -> Result<Settings> {
        Ok(self.settings.clone())
    }

    fn save_settings(&mut self, settings: &Settings) -> Result<()> {
        self.settings = settings.clone();
        self.writes += 1;
        Ok(())
    }

    fn load_flags(&self) -> Result<FlagStore> {
        Ok(self.flags.clone())
    }

    fn save_flags(&mut self, id: &str, flags: BuildingFlags) -> Result<()> {
        self.flags.set(id, flags);
        self.writes += 1;
        Ok(())
    }
}

/// Write-behind cache over a [`SettingsRepository`].
///
/// Every mutation restarts the commit timer; [`DebouncedWriter::poll`]
/// persists everything pending once the timer has expired.
#[derive(Debug)]
pub struct DebouncedWriter<R> {
    repo: R,
    delay: Duration,
    settings: Settings,
    flags: FlagStore,
    settings_dirty: bool,
    dirty_flags: BTreeSet<String>,
    deadline: Option<Instant>,
}

impl<R: SettingsRepository> DebouncedWriter<R> {
    pub fn new(repo: R, delay: Duration) -> Result<Self> {
        let settings = repo.load_settings()?;
        let flags = repo.load_flags()?;
        Ok(Self {
            repo,
            delay,
            settings,
            flags,
            settings_dirty: false,
            dirty_flags: BTreeSet::new(),
            deadline: None,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn flags(&self) -> &FlagStore {
        &self.flags
    }

    pub fn update_settings(&mut self, now: Instant, update: impl FnOnce(&mut Settings)) {
        update(&mut self.settings);
        self.settings_dirty = true;
        self.deadline = Some(now + self.delay);
    }

    pub fn update_flags(&mut self, now: Instant, id: &str, update: impl FnOnce(&mut BuildingFlags)) {
        let mut flags = self.flags.get(id);
        update(&mut flags);
        self.flags.set(id, flags);
        self.dirty_flags.insert(id.to_string());
        self.deadline = Some(now + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Commit if the timer has expired. Returns whether anything was written.
    pub fn poll(&mut self, now: Instant) -> Result<bool> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.flush()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Commit everything pending now.
    pub fn flush(&mut self) -> Result<()> {
        if self.settings_dirty {
            self.repo.save_settings(&self.settings)?;
            self.settings_dirty = false;
        }
        let dirty = std::mem::take(&mut self.dirty_flags);
        for id in &dirty {
            self.repo.save_flags(id, self.flags.get(id))?;
        }
        debug!(flags = dirty.len(), "committed settings");
        self.deadline = None;
        Ok(())
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn into_inner(mut self) -> Result<R> {
        self.flush()?;
        Ok(self.repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_first_run() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.assemble);
        assert!(settings.downgrade_temporary_items);
        assert!(settings.show_inventory);
        assert_eq!(settings.show, ShowMode::Both);
    }

    #[test]
    fn sort_keys_use_display_names() {
        let settings: Settings =
            serde_json::from_str(r#"{ "sort": "FPefficiency", "show": "%" }"#).unwrap();
        assert_eq!(settings.sort, SortKey::FPefficiency);
        assert_eq!(settings.show, ShowMode::Percent);
        assert!(settings.sort.is_forge_points());
    }

    #[test]
    fn unknown_flags_default_to_false() {
        let store = FlagStore::new();
        assert_eq!(store.get("x"), BuildingFlags::default());
    }

    #[test]
    fn mutations_inside_window_coalesce() {
        let start = Instant::now();
        let mut writer =
            DebouncedWriter::new(MemoryRepository::default(), DEFAULT_COMMIT_DELAY).unwrap();

        writer.update_settings(start, |s| s.show_hidden = true);
        writer.update_settings(start + Duration::from_millis(500), |s| s.neo_max_only = true);
        writer.update_flags(start + Duration::from_millis(800), "A", |f| f.hidden = true);

        // Timer restarted at 800ms.
        assert!(!writer.poll(start + Duration::from_millis(1500)).unwrap());
        assert_eq!(writer.repository().writes, 0);

        assert!(writer.poll(start + Duration::from_millis(1800)).unwrap());
        assert_eq!(writer.repository().writes, 2);
        assert!(writer.repository().settings.neo_max_only);
        assert!(writer.repository().flags.get("A").hidden);
        assert!(!writer.is_pending());

        assert!(!writer.poll(start + Duration::from_secs(10)).unwrap());
        assert_eq!(writer.repository().writes, 2);
    }

    #[test]
    fn into_inner_flushes() {
        let mut writer =
            DebouncedWriter::new(MemoryRepository::default(), DEFAULT_COMMIT_DELAY).unwrap();
        writer.update_flags(Instant::now(), "B", |f| f.important = true);
        let repo = writer.into_inner().unwrap();
        assert!(repo.flags.get("B").important);
    }
}
