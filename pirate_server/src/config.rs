use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use pirate_core::{AdRewardPolicy, DailyPolicy, EngineConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "pirate-server", about = "HTTP backend for the pirate slot mini app")]
pub struct ServerConfig {
    /// Database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://pirate_slot.db")]
    pub database_url: String,
    #[arg(long, env = "BIND", default_value = "127.0.0.1:8080")]
    pub bind: String,
    /// Bearer token for /admin routes
    #[arg(long, env = "API_KEY", default_value = "dev-key")]
    pub api_key: String,
    /// JSON engine config written to the params row on startup
    #[arg(long, env = "ENGINE_CONFIG")]
    pub engine_config: Option<PathBuf>,
    /// Points a brand-new account starts with
    #[arg(long, env = "STARTING_BALANCE", default_value_t = 10)]
    pub starting_balance: u64,
    #[arg(long, env = "AD_REWARD", default_value_t = 5)]
    pub ad_reward: u64,
    #[arg(long, env = "DAILY_REWARD", default_value_t = 50)]
    pub daily_reward: u64,
    #[arg(long, env = "DAILY_COOLDOWN_SECS", default_value_t = 86_400)]
    pub daily_cooldown_secs: i64,
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_filter: String,
}

impl ServerConfig {
    pub fn daily_policy(&self) -> DailyPolicy {
        DailyPolicy {
            amount: self.daily_reward,
            cooldown_secs: self.daily_cooldown_secs,
        }
    }

    pub fn ad_policy(&self) -> AdRewardPolicy {
        AdRewardPolicy {
            amount: self.ad_reward,
        }
    }

    pub fn load_engine_config(&self) -> anyhow::Result<Option<EngineConfig>> {
        let Some(path) = &self.engine_config else {
            return Ok(None);
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading engine config {}", path.display()))?;
        let config = EngineConfig::from_json(&json)
            .with_context(|| format!("parsing engine config {}", path.display()))?;
        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_flags_win() {
        let config = ServerConfig::try_parse_from([
            "pirate-server",
            "--database-url",
            "sqlite::memory:",
            "--api-key",
            "k",
            "--ad-reward",
            "7",
            "--daily-reward",
            "20",
            "--daily-cooldown-secs",
            "60",
        ])
        .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.ad_policy().amount, 7);
        assert_eq!(
            config.daily_policy(),
            DailyPolicy {
                amount: 20,
                cooldown_secs: 60
            }
        );
    }

    #[test]
    fn engine_config_file_is_validated() {
        let dir = std::env::temp_dir();
        let good = dir.join(format!("pirate-engine-{}.json", std::process::id()));
        std::fs::write(&good, serde_json::to_string(&EngineConfig::default()).unwrap()).unwrap();
        let mut config =
            ServerConfig::try_parse_from(["pirate-server", "--engine-config", "unused"]).unwrap();
        config.engine_config = Some(good.clone());
        assert_eq!(config.load_engine_config().unwrap(), Some(EngineConfig::default()));

        std::fs::write(&good, r#"{"rows":0}"#).unwrap();
        assert!(config.load_engine_config().is_err());
        let _ = std::fs::remove_file(good);
    }
}
