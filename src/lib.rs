pub mod api;
pub mod audit;
pub mod backend;
pub mod config;
pub mod controller;
pub mod demo;
pub mod dispatch;
pub mod error;
pub mod guard;
pub mod models;
pub mod normalize;
pub mod poller;
pub mod reconcile;
pub mod store;

// Re-export commonly used items
pub use config::Config;
pub use controller::SiteController;
pub use error::{AppError, Result};
pub use models::{Action, CommandRequest, CommandResult, Device, ViewModel};
pub use store::SiteStore;
