use std::net::SocketAddr;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub omdb_api_key: String,
    pub omdb_base_url: String,
    pub database_url: String,
    pub http_timeout_secs: u64,
    pub detail_concurrency: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = var("PORT").unwrap_or_else(|| "3000".to_string()).parse().context("PORT")?;

        let omdb_api_key = var("OMDB_API_KEY").unwrap_or_default();
        let omdb_base_url =
            var("OMDB_BASE_URL").unwrap_or_else(|| "https://www.omdbapi.com/".to_string());

        let database_url =
            var("DATABASE_URL").unwrap_or_else(|| "sqlite://moviedex.db?mode=rwc".to_string());

        let http_timeout_secs: u64 =
            var("HTTP_TIMEOUT_SECS").and_then(|s| s.parse().ok()).unwrap_or(15);

        let detail_concurrency: usize =
            var("DETAIL_CONCURRENCY").and_then(|s| s.parse().ok()).unwrap_or(1);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            omdb_api_key,
            omdb_base_url,
            database_url,
            http_timeout_secs,
            detail_concurrency,
        })
    }
}
