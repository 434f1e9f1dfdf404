// Re-exports
pub use column_names as COL;
pub use dashboard::{Dashboard, DashboardCache};

// Modules
pub mod classify;
pub mod column_names;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod formatters;
pub mod join;
pub mod loader;
pub mod reconcile;
pub mod views;
