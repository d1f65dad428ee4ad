use clap::Parser;
use database::Database;

pub mod cors;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:database.db")]
    pub database_url: String,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Origins allowed to make cross-origin requests, comma separated.
    /// `file://` and `null` cover pages opened straight from disk.
    #[arg(
        long,
        env = "ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_values = [
            "http://localhost",
            "http://localhost:8000",
            "http://localhost:8080",
            "http://127.0.0.1:5500",
            "file://",
            "null",
        ]
    )]
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
