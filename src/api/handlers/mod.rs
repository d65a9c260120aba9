pub mod audit;
pub mod commands;
pub mod frequency;
pub mod health;
pub mod site;

use std::sync::Arc;

use crate::controller::SiteController;
use crate::poller::Refresher;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SiteController>,
    /// Absent when the status poller is not running
    pub status_refresh: Option<Refresher>,
}

impl AppState {
    pub fn new(controller: SiteController, status_refresh: Option<Refresher>) -> Self {
        Self {
            controller: Arc::new(controller),
            status_refresh,
        }
    }
}
