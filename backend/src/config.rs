use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub store_path: PathBuf,
    /// Static front end to serve for every path the API doesn't claim.
    pub frontend_dir: Option<PathBuf>,
    pub login_delay: Duration,
    pub payment_delay: Duration,
    pub store_write_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            store_path: PathBuf::from("data/storage.json"),
            frontend_dir: None,
            login_delay: Duration::from_millis(1000),
            payment_delay: Duration::from_millis(2000),
            store_write_delay: Duration::from_millis(50),
        }
    }
}

fn parsed<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{key} has an invalid value: {value}")),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading {key}")),
    }
}

fn millis(key: &str) -> Result<Option<Duration>> {
    Ok(parsed::<u64>(key)?.map(Duration::from_millis))
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv` first to pick
    /// up a `.env` file.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            port: parsed("PORT")?.unwrap_or(defaults.port),
            store_path: parsed("STORE_PATH")?.unwrap_or(defaults.store_path),
            frontend_dir: parsed("FRONTEND_DIR")?,
            login_delay: millis("LOGIN_DELAY_MS")?.unwrap_or(defaults.login_delay),
            payment_delay: millis("PAYMENT_DELAY_MS")?.unwrap_or(defaults.payment_delay),
            store_write_delay: millis("STORE_WRITE_DELAY_MS")?
                .unwrap_or(defaults.store_write_delay),
        })
    }

    /// No artificial waits, for tests.
    pub fn instant(store_path: PathBuf) -> Self {
        Self {
            store_path,
            login_delay: Duration::ZERO,
            payment_delay: Duration::ZERO,
            store_write_delay: Duration::from_millis(1),
            ..Self::default()
        }
    }
}
