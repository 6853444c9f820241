use std::default::Default;
use std::env;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use snafu::{ensure, Snafu};

pub fn load() -> Result<Settings, ConfigError> {
    let env = env::var(RUN_MODE_ENV).unwrap_or_else(|_| "development".into());
    Config::builder()
        .add_source(File::with_name(DEFAULT_CFG_PATH).required(false))
        .add_source(File::with_name(&format!("config/{}", env)).required(false))
        .add_source(File::with_name(LOCAL_CFG_PATH).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

const DEFAULT_CFG_PATH: &str = "config/default";
const LOCAL_CFG_PATH: &str = "config/local";
const RUN_MODE_ENV: &str = "NETJACK_SERVER_RUN_MODE";
const ENV_PREFIX: &str = "NETJACK";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logging: Logging,
    pub runtime: Runtime,
    pub server: Server,
    pub game: netjack_game::Settings,
}

/// A setting that loaded but cannot be used.
#[derive(Debug, Snafu)]
pub enum Invalid {
    #[snafu(display("{} must be a positive integer", key))]
    NotPositive { key: &'static str },
    #[snafu(display("game.starting_balance must cover game.minimum_bet"))]
    BalanceBelowMinimum,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Invalid> {
        let game = &self.game;
        let numbers = [
            ("runtime.worker_threads", self.runtime.worker_threads as u64),
            ("server.port", u64::from(self.server.port)),
            ("game.players_per_table", game.players_per_table as u64),
            ("game.starting_balance", u64::from(game.starting_balance)),
            ("game.minimum_bet", u64::from(game.minimum_bet)),
            ("game.decks", game.decks as u64),
            ("game.reshuffle_threshold", game.reshuffle_threshold as u64),
        ];
        for &(key, value) in numbers.iter() {
            ensure!(value > 0, NotPositiveSnafu { key });
        }
        ensure!(
            game.starting_balance >= game.minimum_bet,
            BalanceBelowMinimumSnafu
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
}

impl Default for Logging {
    fn default() -> Self {
        Logging {
            level: "info".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Runtime {
    pub threaded: bool,
    pub worker_threads: usize,
    pub thread_name: String,
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime {
            threaded: true,
            worker_threads: num_cpus::get_physical(),
            thread_name: "netjack-worker".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Server {
            host: "127.0.0.1".into(),
            port: 8023,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn zero_names_the_setting() {
        let mut settings = Settings::default();
        settings.game.decks = 0;
        let err = settings.validate().expect_err("zero decks");
        assert_eq!(err.to_string(), "game.decks must be a positive integer");

        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(matches!(
            settings.validate(),
            Err(Invalid::NotPositive { key: "server.port" })
        ));
    }

    #[test]
    fn balance_must_cover_minimum() {
        let mut settings = Settings::default();
        settings.game.starting_balance = 100;
        assert!(matches!(
            settings.validate(),
            Err(Invalid::BalanceBelowMinimum)
        ));
    }

    #[test]
    fn layers_override_defaults() {
        let settings: Settings = Config::builder()
            .add_source(config::File::from_str(
                "[game]\nminimum_bet = 25\n[server]\nport = 9000\n",
                config::FileFormat::Toml,
            ))
            .build()
            .expect("config builds")
            .try_deserialize()
            .expect("settings deserialize");
        assert_eq!(settings.game.minimum_bet, 25);
        assert_eq!(settings.game.starting_balance, 2500);
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn non_integer_fails_to_load() {
        let loaded: Result<Settings, _> = Config::builder()
            .add_source(config::File::from_str(
                "[game]\ndecks = \"many\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .and_then(Config::try_deserialize);
        assert!(loaded.is_err());
    }
}
