//! City Stats
//!
//! Combat-stat and inventory overlay for a city-builder game.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

use city_stats::Catalog;
use city_stats::db::{self, SqliteRepository};
use city_stats::extract;
use city_stats::models::{
    ALL_AGE, Boost, BoostSet, BuildingDefinition, CitySnapshot, EraComponents, KitOption,
    KitOptionSet, SelectionKitDefinition, UpgradeChainDefinition, UpgradeItem, UpgradeStep,
};
use city_stats::report::{self, CityView};
use city_stats::scorer::{self, ScoringContext};
use city_stats::session::{Session, SessionEvent};
use city_stats::settings::{DEFAULT_COMMIT_DELAY, DebouncedWriter, ShowMode, SortKey};

/// Sleep between session ticks in `watch`.
const WATCH_STEP: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "city-stats")]
#[command(about = "Combat stats and inventory overlay for city-builder snapshots")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, default_value = "city_stats.db")]
    database: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Load building, upgrade and selection kit dumps
    Extract {
        /// Directory holding the JSON dumps
        dump_dir: PathBuf,

        /// Clear the existing catalog before extraction
        #[arg(long)]
        clear: bool,
    },

    /// Load a small sample catalog for testing (without game dumps)
    LoadSample,

    /// List all buildings in the database
    ListBuildings,

    /// Score the buildings of a city snapshot
    City {
        snapshot: PathBuf,

        /// Show the visited player's city instead of the own one
        #[arg(long)]
        other: bool,

        #[arg(short, long, value_enum)]
        sort: Option<SortKey>,
    },

    /// Resolve and list the inventory of a city snapshot
    Inventory {
        snapshot: PathBuf,

        #[arg(short, long, value_enum)]
        sort: Option<SortKey>,
    },

    /// Show the scored stats of one building
    Building {
        /// Building asset id
        id: String,

        #[arg(short, long, default_value = ALL_AGE)]
        era: String,
    },

    /// Update the flags of one building
    Flag {
        /// Building asset id
        id: String,

        #[arg(long)]
        hidden: Option<bool>,

        #[arg(long)]
        important: Option<bool>,
    },

    /// Show or update the persisted settings
    Settings {
        #[arg(long, value_enum)]
        sort: Option<SortKey>,

        #[arg(long, value_enum)]
        inventory_sort: Option<SortKey>,

        #[arg(long, value_enum)]
        show: Option<ShowMode>,

        #[arg(long)]
        show_hidden: Option<bool>,

        #[arg(long)]
        show_inventory: Option<bool>,

        #[arg(long)]
        downgrade_temporary_items: Option<bool>,

        #[arg(long)]
        assemble: Option<bool>,

        #[arg(long)]
        neo_max_only: Option<bool>,
    },

    /// Re-render whenever the snapshot file changes
    Watch { snapshot: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open database: {}", cli.database.display()))?;
    let repo = SqliteRepository::new(conn)?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::Extract { dump_dir, clear } => {
            if clear {
                println!("Clearing existing catalog...");
                db::clear_catalog(repo.connection())?;
            }

            let stats = extract::extract_to_database(repo.connection(), &dump_dir)?;
            println!("\n{}", stats);
        }

        Commands::LoadSample => {
            load_sample_data(repo.connection())?;
            println!("Sample data loaded successfully!");
        }

        Commands::ListBuildings => {
            let buildings = db::list_buildings(repo.connection())?;
            if buildings.is_empty() {
                println!("No buildings in database. Run 'extract' or 'load-sample' first.");
            } else {
                println!("{:<40} {:<40} {:<16}", "Building", "ID", "Type");
                println!("{}", "-".repeat(96));
                for (id, name, kind) in buildings {
                    println!("{:<40} {:<40} {:<16}", name, id, kind);
                }
            }
        }

        Commands::City {
            snapshot,
            other,
            sort,
        } => {
            let catalog = db::load_catalog(repo.connection())?;
            let writer = DebouncedWriter::new(repo, DEFAULT_COMMIT_DELAY)?;
            let snapshot = read_snapshot(&snapshot)?;

            let mut settings = writer.settings().clone();
            if let Some(sort) = sort {
                settings.sort = sort;
            }

            let view = if other {
                let Some(visit) = snapshot.other_player.as_ref() else {
                    bail!("Snapshot has no visited player");
                };
                CityView {
                    player: &visit.name,
                    era: &visit.era,
                    city: &visit.city,
                    is_other: true,
                }
            } else {
                own_view(&snapshot)
            };

            let city = report::city_report(
                &catalog,
                view,
                &snapshot.city,
                &snapshot.allies,
                writer.flags(),
                settings.sort,
            );
            print!("{}", report::format_city(&city, &settings));
        }

        Commands::Inventory { snapshot, sort } => {
            let catalog = db::load_catalog(repo.connection())?;
            let writer = DebouncedWriter::new(repo, DEFAULT_COMMIT_DELAY)?;
            let snapshot = read_snapshot(&snapshot)?;

            let mut settings = writer.settings().clone();
            if let Some(sort) = sort {
                settings.inventory_sort = sort;
            }

            let inventory = report::resolve_inventory(
                &catalog,
                &snapshot.inventory,
                &snapshot.era,
                &snapshot.city,
                writer.flags(),
                &settings,
            )?;
            print!("{}", report::format_inventory(&inventory, &settings));
        }

        Commands::Building { id, era } => {
            let catalog = db::load_catalog(repo.connection())?;
            let writer = DebouncedWriter::new(repo, DEFAULT_COMMIT_DELAY)?;
            let ctx = ScoringContext {
                era: &era,
                landmark_city: &[],
                flags: writer.flags(),
            };

            let Ok(stats) = scorer::score(&catalog, &id, &ctx) else {
                println!("Building '{}' not found", id);
                return Ok(());
            };
            println!("Building: {}", stats.name);
            println!("  ID: {}", stats.asset_id);
            println!("  Type: {}", stats.kind);
            if let (Some(l), Some(w)) = (stats.length, stats.width) {
                println!("  Size: {}x{} +{} roads ({} squares)", l, w, stats.roads, stats.size);
            }
            println!(
                "  Attacking: {} / {} ({:.2} per square)",
                stats.aoffense, stats.adefense, stats.a_efficiency
            );
            println!(
                "  Defending: {} / {} ({:.2} per square)",
                stats.doffense, stats.ddefense, stats.d_efficiency
            );
            println!(
                "  QI: {} / {} / {} / {}",
                stats.qi_aoffense, stats.qi_adefense, stats.qi_doffense, stats.qi_ddefense
            );
            if stats.fp > 0.0 {
                println!("  Forge points: {} per day ({:.1} per square)", stats.fp, stats.fp_efficiency);
            }
        }

        Commands::Flag {
            id,
            hidden,
            important,
        } => {
            let mut writer = DebouncedWriter::new(repo, DEFAULT_COMMIT_DELAY)?;
            writer.update_flags(Instant::now(), &id, |flags| {
                if let Some(hidden) = hidden {
                    flags.hidden = hidden;
                }
                if let Some(important) = important {
                    flags.important = important;
                }
            });
            let flags = writer.flags().get(&id);
            writer.into_inner()?;
            println!("{}: hidden={} important={}", id, flags.hidden, flags.important);
        }

        Commands::Settings {
            sort,
            inventory_sort,
            show,
            show_hidden,
            show_inventory,
            downgrade_temporary_items,
            assemble,
            neo_max_only,
        } => {
            let mut writer = DebouncedWriter::new(repo, DEFAULT_COMMIT_DELAY)?;
            writer.update_settings(Instant::now(), |s| {
                s.sort = sort.unwrap_or(s.sort);
                s.inventory_sort = inventory_sort.unwrap_or(s.inventory_sort);
                s.show = show.unwrap_or(s.show);
                s.show_hidden = show_hidden.unwrap_or(s.show_hidden);
                s.show_inventory = show_inventory.unwrap_or(s.show_inventory);
                s.downgrade_temporary_items =
                    downgrade_temporary_items.unwrap_or(s.downgrade_temporary_items);
                s.assemble = assemble.unwrap_or(s.assemble);
                s.neo_max_only = neo_max_only.unwrap_or(s.neo_max_only);
            });
            println!("{}", serde_json::to_string_pretty(writer.settings())?);
            writer.into_inner()?;
        }

        Commands::Watch { snapshot } => {
            watch(repo, &snapshot)?;
        }
    }

    Ok(())
}

fn read_snapshot(path: &Path) -> Result<CitySnapshot> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot: {}", path.display()))
}

fn own_view(snapshot: &CitySnapshot) -> CityView<'_> {
    CityView {
        player: &snapshot.player_name,
        era: &snapshot.era,
        city: &snapshot.city,
        is_other: false,
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Re-read the snapshot once its modification time moves.
///
/// A file that can't be read or parsed (e.g. caught mid-save) is skipped and
/// `last_modified` is left alone, so the next call tries again.
fn reload_snapshot(path: &Path, last_modified: &mut Option<SystemTime>) -> Option<CitySnapshot> {
    let current = modified(path);
    if current == *last_modified {
        return None;
    }
    match read_snapshot(path) {
        Ok(snapshot) => {
            *last_modified = current;
            Some(snapshot)
        }
        Err(e) => {
            warn!(error = %format!("{e:#}"), "keeping last good snapshot");
            None
        }
    }
}

/// Drive a session from the snapshot file until interrupted.
fn watch(repo: SqliteRepository, path: &Path) -> Result<()> {
    let catalog = db::load_catalog(repo.connection())?;
    let mut writer = DebouncedWriter::new(repo, DEFAULT_COMMIT_DELAY)?;
    let mut snapshot = read_snapshot(path)?;
    let mut last_modified = modified(path);

    let mut session = Session::new();
    session.start(Instant::now());
    info!(snapshot = %path.display(), "watching");

    loop {
        thread::sleep(WATCH_STEP);
        let now = Instant::now();

        if let Some(fresh) = reload_snapshot(path, &mut last_modified) {
            snapshot = fresh;
            match snapshot.other_player.clone() {
                Some(visit) => session.on_visit_player(visit, now),
                None if session.is_showing_other() => session.show_own(),
                None => session.mark_inventory_dirty(),
            }
        }

        for event in session.tick(now) {
            let settings = writer.settings();
            match event {
                SessionEvent::RefreshInventory => {
                    let city = report::city_report(
                        &catalog,
                        own_view(&snapshot),
                        &snapshot.city,
                        &snapshot.allies,
                        writer.flags(),
                        settings.sort,
                    );
                    print!("{}", report::format_city(&city, settings));
                    if settings.show_inventory {
                        let inventory = report::resolve_inventory(
                            &catalog,
                            &snapshot.inventory,
                            &snapshot.era,
                            &snapshot.city,
                            writer.flags(),
                            settings,
                        )?;
                        print!("\n{}", report::format_inventory(&inventory, settings));
                    }
                }
                SessionEvent::ShowOther(visit) => {
                    let view = CityView {
                        player: &visit.name,
                        era: &visit.era,
                        city: &visit.city,
                        is_other: true,
                    };
                    let city = report::city_report(
                        &catalog,
                        view,
                        &snapshot.city,
                        &snapshot.allies,
                        writer.flags(),
                        settings.sort,
                    );
                    print!("{}", report::format_city(&city, settings));
                }
            }
        }

        writer.poll(now)?;
    }
}

/// Load a small sample catalog for testing without game dumps
fn load_sample_data(conn: &Connection) -> Result<()> {
    db::clear_catalog(conn)?;

    let era = "IronAge";
    let samples = [
        ("W_MultiAge_Barracks1", "Training Grounds", "military", 3, 3, "att_boost_attacker", 4.0),
        ("W_MultiAge_Fort1", "Fortress", "military", 4, 4, "def_boost_defender", 12.0),
        ("W_MultiAge_Fort1b", "Fortress - Lv. 2", "military", 4, 4, "def_boost_defender", 20.0),
        ("W_MultiAge_Statue1", "Statue of Honor", "decoration", 1, 1, "att_def_boost_attacker_defender", 3.0),
    ];

    for (id, name, kind, length, width, boost, value) in samples {
        let mut building = BuildingDefinition {
            asset_id: id.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            length: Some(length),
            width: Some(width),
            ..Default::default()
        };
        building.components.insert(
            era.to_string(),
            EraComponents {
                boosts: Some(BoostSet {
                    boosts: vec![Boost::new("battleground", boost, value)],
                }),
                ..Default::default()
            },
        );
        db::upsert_building(conn, &building)?;
    }

    db::upsert_upgrade_chain(
        conn,
        "upgrade_kit_fort",
        &UpgradeChainDefinition {
            upgrade_item: Some(UpgradeItem {
                name: Some("Fortress Upgrade Kit".to_string()),
            }),
            upgrade_steps: vec![
                UpgradeStep {
                    building_ids: vec!["W_MultiAge_Fort1".to_string()],
                },
                UpgradeStep {
                    building_ids: vec!["W_MultiAge_Fort1b".to_string()],
                },
            ],
        },
    )?;

    let mut kit = SelectionKitDefinition {
        name: Some("Fortress Selection Kit".to_string()),
        ..Default::default()
    };
    kit.era_options.insert(
        era.to_string(),
        KitOptionSet {
            options: vec![
                KitOption {
                    item_asset_name: "W_MultiAge_Fort1".to_string(),
                    name: None,
                },
                KitOption {
                    item_asset_name: "upgrade_kit_fort".to_string(),
                    name: None,
                },
            ],
        },
    );
    db::upsert_selection_kit(conn, "selection_kit_fort", &kit)?;

    let catalog: Catalog = db::load_catalog(conn)?;
    println!("Loaded {} sample catalog entries", catalog.len());
    Ok(())
}
