//! City Stats
//!
//! Inventory resolution and combat-stat aggregation for a city-builder
//! overlay: building scoring, kit expansion, upgrade assembly and city totals.

pub mod assemble;
pub mod bonus;
pub mod catalog;
pub mod db;
pub mod error;
pub mod expand;
pub mod extract;
pub mod filter;
pub mod models;
pub mod report;
pub mod scorer;
pub mod session;
pub mod settings;
pub mod totals;

pub use catalog::Catalog;
pub use error::{Result, StatsError};
