use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8085";
const DEFAULT_WINDOW_SECS: u64 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertServiceConfig {
    pub bind_addr: String,
    /// Incident log to preload into the timeline
    pub csv_path: Option<PathBuf>,
    /// Width of the live-alert window
    pub window: Duration,
}

impl Default for AlertServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            csv_path: None,
            window: Duration::from_secs(DEFAULT_WINDOW_SECS),
        }
    }
}

impl AlertServiceConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = env::var("ALERT_SERVICE_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(path) = env::var("ALERT_CSV_PATH") {
            if !path.trim().is_empty() {
                config.csv_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(raw) = env::var("ALERT_WINDOW_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid ALERT_WINDOW_SECS '{}'", raw))?;
            config.window = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window.is_zero() {
            bail!("ALERT_WINDOW_SECS must be at least 1");
        }
        Ok(())
    }
}
