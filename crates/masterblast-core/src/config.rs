//! Configuration module
//!
//! Settings for the HTTP server, the database pool, authentication, the NCBI
//! endpoints and the background BLAST queue. Everything is read from the
//! environment (a `.env` file is honoured) with defaults for all but the
//! database URL and the JWT secret.

use std::env;

use crate::constants::DEFAULT_BLAST_DATABASE;

const SERVER_PORT: u16 = 3000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const JWT_EXPIRY_HOURS: i64 = 24;
const NCBI_BLAST_URL: &str = "https://blast.ncbi.nlm.nih.gov/Blast.cgi";
const NCBI_ENTREZ_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const NCBI_EMAIL: &str = "masterblast@bbc.com";
const BLAST_POLL_INTERVAL_SECS: u64 = 10;
const BLAST_TIMEOUT_SECS: u64 = 900;
const TASK_QUEUE_MAX_WORKERS: usize = 4;
const TASK_QUEUE_CAPACITY: usize = 256;
const STALE_JOB_REAP_INTERVAL_SECS: u64 = 300;
const STALE_JOB_GRACE_PERIOD_SECS: i64 = 3600;
const MAX_UPLOAD_SIZE_BYTES: usize = 10 * 1024 * 1024;
const RECENT_JOBS_LIMIT: i64 = 10;

/// Endpoints and contact details for the NCBI web services.
#[derive(Clone, Debug)]
pub struct NcbiConfig {
    pub blast_url: String,
    pub entrez_url: String,
    /// Sent as `email` on every Entrez request, as NCBI asks of API users.
    pub email: String,
    pub blast_database: String,
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
}

/// Background BLAST queue settings.
#[derive(Clone, Debug)]
pub struct QueueConfig {
    pub max_workers: usize,
    pub capacity: usize,
    /// 0 disables the stale job reaper.
    pub stale_job_reap_interval_secs: u64,
    pub stale_job_grace_period_secs: i64,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub max_upload_size_bytes: usize,
    pub recent_jobs_limit: i64,
    pub ncbi: NcbiConfig,
    pub queue: QueueConfig,
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Build a config from an arbitrary key lookup. `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port = match lookup("SERVER_PORT").or_else(|| lookup("PORT")) {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("SERVER_PORT must be a valid number"))?,
            None => SERVER_PORT,
        };

        Ok(Config {
            database_url: lookup("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?,
            server_port,
            db_max_connections: parse_or(lookup("DB_MAX_CONNECTIONS"), MAX_CONNECTIONS),
            db_timeout_seconds: parse_or(lookup("DB_TIMEOUT_SECONDS"), CONNECTION_TIMEOUT_SECS),
            jwt_secret: lookup("JWT_SECRET")
                .ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            jwt_expiry_hours: parse_or(lookup("JWT_EXPIRY_HOURS"), JWT_EXPIRY_HOURS),
            cors_origins,
            environment,
            max_upload_size_bytes: parse_or(lookup("MAX_UPLOAD_SIZE_BYTES"), MAX_UPLOAD_SIZE_BYTES),
            recent_jobs_limit: parse_or(lookup("RECENT_JOBS_LIMIT"), RECENT_JOBS_LIMIT),
            ncbi: NcbiConfig {
                blast_url: lookup("NCBI_BLAST_URL").unwrap_or_else(|| NCBI_BLAST_URL.to_string()),
                entrez_url: lookup("NCBI_ENTREZ_URL")
                    .unwrap_or_else(|| NCBI_ENTREZ_URL.to_string()),
                email: lookup("NCBI_EMAIL").unwrap_or_else(|| NCBI_EMAIL.to_string()),
                blast_database: lookup("BLAST_DATABASE")
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_BLAST_DATABASE.to_string()),
                poll_interval_secs: parse_or(
                    lookup("BLAST_POLL_INTERVAL_SECS"),
                    BLAST_POLL_INTERVAL_SECS,
                ),
                timeout_secs: parse_or(lookup("BLAST_TIMEOUT_SECS"), BLAST_TIMEOUT_SECS),
            },
            queue: QueueConfig {
                max_workers: parse_or(lookup("TASK_QUEUE_MAX_WORKERS"), TASK_QUEUE_MAX_WORKERS),
                capacity: parse_or(lookup("TASK_QUEUE_CAPACITY"), TASK_QUEUE_CAPACITY),
                stale_job_reap_interval_secs: parse_or(
                    lookup("STALE_JOB_REAP_INTERVAL_SECS"),
                    STALE_JOB_REAP_INTERVAL_SECS,
                ),
                stale_job_grace_period_secs: parse_or(
                    lookup("STALE_JOB_GRACE_PERIOD_SECS"),
                    STALE_JOB_GRACE_PERIOD_SECS,
                ),
            },
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.is_production() {
            if self.jwt_secret.len() < 32 {
                return Err(anyhow::anyhow!(
                    "JWT_SECRET must be at least 32 characters long"
                ));
            }
            if self.cors_origins.iter().any(|o| o == "*") {
                return Err(anyhow::anyhow!(
                    "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
                ));
            }
        }

        if self.queue.max_workers == 0 || self.queue.capacity == 0 {
            return Err(anyhow::anyhow!(
                "TASK_QUEUE_MAX_WORKERS and TASK_QUEUE_CAPACITY must be greater than zero"
            ));
        }

        if self.ncbi.poll_interval_secs == 0 {
            return Err(anyhow::anyhow!("BLAST_POLL_INTERVAL_SECS must be greater than zero"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, anyhow::Error> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/masterblast"),
        ("JWT_SECRET", "dev-secret"),
    ];

    #[test]
    fn test_defaults() {
        let config = config_from(&REQUIRED).unwrap();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.db_max_connections, 20);
        assert_eq!(config.ncbi.blast_database, "nr");
        assert_eq!(config.ncbi.email, "masterblast@bbc.com");
        assert_eq!(config.queue.max_workers, 4);
        assert_eq!(config.recent_jobs_limit, 10);
        assert_eq!(config.cors_origins, vec!["*".to_string()]);
        assert!(!config.is_production());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_database_url() {
        let err = config_from(&[("JWT_SECRET", "x")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SERVER_PORT", "not-a-port"));
        assert!(config_from(&pairs).is_err());
    }

    #[test]
    fn test_unparseable_numbers_fall_back_to_defaults() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("BLAST_TIMEOUT_SECS", "soon"));
        let config = config_from(&pairs).unwrap();
        assert_eq!(config.ncbi.timeout_secs, 900);
    }

    #[test]
    fn test_production_requires_strong_secret_and_explicit_origins() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ENVIRONMENT", "production"));
        let config = config_from(&pairs).unwrap();
        assert!(config.is_production());
        assert!(config.validate().is_err());

        let pairs = vec![
            ("DATABASE_URL", "postgres://db/masterblast"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("ENVIRONMENT", "prod"),
            ("CORS_ORIGINS", "https://masterblast.example.org"),
        ];
        assert!(config_from(&pairs).unwrap().validate().is_ok());
    }

    #[test]
    fn test_non_postgres_url_is_rejected() {
        let config = config_from(&[
            ("DATABASE_URL", "mysql://localhost/db"),
            ("JWT_SECRET", "x"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }
}
