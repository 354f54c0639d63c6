pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod entities;
pub mod error;
pub mod models;
pub mod omdb;
pub mod routes;
pub mod seed;
pub mod store;

use std::sync::Arc;

use crate::{catalog::CatalogService, coordinator::SearchCoordinator};

pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub coordinator: SearchCoordinator,
}
