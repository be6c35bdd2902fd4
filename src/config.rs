use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub run_migrations: bool,
    pub migrations_dir: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let run_migrations = env::var("APP_RUN_MIGRATIONS")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);
        let migrations_dir =
            env::var("APP_MIGRATIONS_DIR").unwrap_or_else(|_| "migrations".to_string());
        Ok(Self {
            port,
            database_url,
            host,
            run_migrations,
            migrations_dir,
        })
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
