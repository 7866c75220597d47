pub mod api;
pub mod config;
pub mod db;

pub use db::DbPool;

use anyhow::Result;
use config::Config;

use crate::api::token::TokenService;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Result<Self> {
        let tokens = TokenService::from_config(&config.auth)?;
        Ok(Self { config, db, tokens })
    }
}
