use crate::config::Config;

use sqlx::{Pool, Postgres};

pub struct AppState {
    pub config: Config,
    pub http_client: reqwest::Client,
    pub db_pool: Pool<Postgres>,
}

impl AppState {
    pub fn new(config: Config, db_pool: Pool<Postgres>) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
            db_pool,
        }
    }
}
