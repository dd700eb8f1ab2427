//! Blog categories and taxonomy housekeeping

pub mod housekeeper;
pub mod model;

pub use housekeeper::CategoryHousekeeper;
pub use model::{BlogCategory, CategorySummary};
