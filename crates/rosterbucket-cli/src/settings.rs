//! Settings loading.
//!
//! Layers, lowest first: built-in defaults, `rosterbucket.toml` in the
//! working directory, the file given with `--config`, then `ROSTERBUCKET_*`
//! environment variables.

use std::path::Path;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use rosterbucket_core::StateCatalog;
use rosterbucket_core::tz::parse_tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_REFERENCE_TIMEZONE: &str = "Australia/Sydney";
const LOCAL_SETTINGS_FILE: &str = "rosterbucket.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// IANA zone every schedule row is normalized into.
    pub reference_timezone: String,
    #[serde(default)]
    pub catalog: StateCatalog,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reference_timezone: DEFAULT_REFERENCE_TIMEZONE.to_string(),
            catalog: StateCatalog::builtin(),
        }
    }
}

impl Settings {
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(LOCAL_SETTINGS_FILE));

        if let Some(path) = config_path {
            if !path.exists() {
                anyhow::bail!("settings file {} does not exist", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        let settings: Self = figment
            .merge(Env::prefixed("ROSTERBUCKET_"))
            .extract()
            .context("failed to load settings")?;

        settings
            .catalog
            .validate()
            .context("invalid state catalog")?;
        debug!(
            reference = %settings.reference_timezone,
            states = settings.catalog.states.len(),
            "settings loaded"
        );
        Ok(settings)
    }

    /// The reference zone, with `override_tz` taking precedence.
    pub fn reference(&self, override_tz: Option<&str>) -> Result<Tz> {
        let name = override_tz.unwrap_or(&self.reference_timezone);
        parse_tz(name).with_context(|| format!("invalid reference timezone '{}'", name))
    }
}
