//! Server configuration read from the environment.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use fable_game::application::config::{DelayRange, GameConfig};
use fable_game::domain::session::SessionSettings;
use fable_textgen::MoralServiceConfig;

use crate::error::AppError;

const DEFAULT_MORAL_MODEL: &str = "gpt-4o-mini";

/// Everything the server binary needs at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deck file; the built-in deck is used when unset.
    pub deck_path: Option<PathBuf>,
    /// Text-generation endpoint; fallback morals only when unset.
    pub moral_service: Option<MoralServiceConfig>,
    pub otlp_endpoint: Option<String>,
    pub game: GameConfig,
}

impl ServerConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a value cannot be parsed or a game
    /// setting is out of range.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = GameConfig::default();
        let settings = SessionSettings {
            max_participants: parse_or(&lookup, "FABLE_MAX_PARTICIPANTS", defaults.settings.max_participants)?,
            rounds_to_play: parse_or(&lookup, "FABLE_ROUNDS_TO_PLAY", defaults.settings.rounds_to_play)?,
            custom_card_chance: parse_or(
                &lookup,
                "FABLE_CUSTOM_CARD_CHANCE",
                defaults.settings.custom_card_chance,
            )?,
            ..defaults.settings
        };
        if settings.max_participants == 0 {
            return Err(AppError::Config("FABLE_MAX_PARTICIPANTS must be at least 1".into()));
        }
        if settings.rounds_to_play == 0 {
            return Err(AppError::Config("FABLE_ROUNDS_TO_PLAY must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&settings.custom_card_chance) {
            return Err(AppError::Config(
                "FABLE_CUSTOM_CARD_CHANCE must be between 0 and 1".into(),
            ));
        }

        let game = GameConfig {
            settings,
            selection_delay: parse_or::<DelayRange>(&lookup, "FABLE_SELECTION_DELAY_MS", defaults.selection_delay)?,
            vote_delay: parse_or::<DelayRange>(&lookup, "FABLE_VOTE_DELAY_MS", defaults.vote_delay)?,
            moral_timeout: Duration::from_millis(parse_or(
                &lookup,
                "FABLE_MORAL_TIMEOUT_MS",
                u64::try_from(defaults.moral_timeout.as_millis()).unwrap_or(5000),
            )?),
        };

        let moral_service = non_empty(&lookup, "MORAL_API_URL").map(|api_url| MoralServiceConfig {
            api_url,
            api_key: non_empty(&lookup, "MORAL_API_KEY"),
            model: non_empty(&lookup, "MORAL_MODEL").unwrap_or_else(|| DEFAULT_MORAL_MODEL.to_owned()),
        });

        Ok(Self {
            host: non_empty(&lookup, "HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port: parse_or(&lookup, "PORT", 3000)?,
            deck_path: non_empty(&lookup, "FABLE_DECK_PATH").map(PathBuf::from),
            moral_service,
            otlp_endpoint: non_empty(&lookup, "OTEL_EXPORTER_OTLP_ENDPOINT"),
            game,
        })
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
        None => Ok(default),
    }
}
