use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use proxy_dns_syncer::error::Result;
use proxy_dns_syncer::fleet::FleetSnapshot;
use proxy_dns_syncer::provider::cloudflare::CLOUDFLARE_API_BASE;
use proxy_dns_syncer::zone::ZoneConfig;
use proxy_dns_syncer::{Pacing, SweepMode};

////////////////////////////////////////////////////////////
// Provider API
////////////////////////////////////////////////////////////
#[derive(Debug, Clone, Deserialize)]
pub struct CfgApi {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CfgApi {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl CfgApi {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String {
    CLOUDFLARE_API_BASE.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

////////////////////////////////////////////////////////////
// Pacing
////////////////////////////////////////////////////////////
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CfgPacing {
    #[serde(default = "default_startup_ms")]
    pub startup_ms: u64,

    #[serde(default = "default_shutdown_ms")]
    pub shutdown_ms: u64,
}

impl Default for CfgPacing {
    fn default() -> Self {
        Self {
            startup_ms: default_startup_ms(),
            shutdown_ms: default_shutdown_ms(),
        }
    }
}

impl From<CfgPacing> for Pacing {
    fn from(cfg: CfgPacing) -> Self {
        Pacing {
            startup: Duration::from_millis(cfg.startup_ms),
            shutdown: Duration::from_millis(cfg.shutdown_ms),
        }
    }
}

fn default_startup_ms() -> u64 {
    400
}

fn default_shutdown_ms() -> u64 {
    450
}

////////////////////////////////////////////////////////////
// Yaml parser
////////////////////////////////////////////////////////////
#[derive(Debug, Clone, Deserialize)]
pub struct Cfg {
    #[serde(default)]
    pub api: CfgApi,

    #[serde(default)]
    pub pacing: CfgPacing,

    #[serde(default)]
    pub sweep: SweepMode,

    /// Where created records are remembered across restarts.
    pub store: PathBuf,

    /// Fleet membership at startup. Missing means an empty fleet.
    #[serde(default)]
    pub fleet: Option<PathBuf>,

    pub zones: Vec<ZoneConfig>,
}

pub struct Parser;

impl Parser {
    pub fn parse_yaml<P: AsRef<Path>>(path: P) -> Result<Cfg> {
        let reader = Self::file_reader(path)?;
        let config: Cfg = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse_fleet<P: AsRef<Path>>(path: P) -> Result<FleetSnapshot> {
        let reader = Self::file_reader(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }

    fn file_reader<P: AsRef<Path>>(path: P) -> Result<BufReader<File>> {
        let f = std::fs::File::open(path)?;
        Ok(BufReader::new(f))
    }
}

impl Cfg {
    fn validate(&self) -> Result<()> {
        self.zones.iter().try_for_each(ZoneConfig::validate)
    }
}

////////////////////////////////////////////////////////////
// Unit test
////////////////////////////////////////////////////////////
#[cfg(test)]
#[path = "config_test.rs"]
mod test;
