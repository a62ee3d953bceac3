//! Game tunables.

use std::str::FromStr;
use std::time::Duration;

use fable_core::rng::DeterministicRng;
use thiserror::Error;

use crate::domain::session::SessionSettings;

/// An inclusive range of milliseconds to wait before a simulated action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min_ms: u32,
    pub max_ms: u32,
}

impl DelayRange {
    /// Builds a range from two bounds given in either order.
    #[must_use]
    pub const fn new(min_ms: u32, max_ms: u32) -> Self {
        if min_ms <= max_ms {
            Self { min_ms, max_ms }
        } else {
            Self {
                min_ms: max_ms,
                max_ms: min_ms,
            }
        }
    }

    /// The shortest delay in the range.
    #[must_use]
    pub fn min(&self) -> Duration {
        Duration::from_millis(u64::from(self.min_ms))
    }

    /// Picks a delay uniformly from the range.
    pub fn sample(&self, rng: &mut dyn DeterministicRng) -> Duration {
        Duration::from_millis(u64::from(rng.next_u32_range(self.min_ms, self.max_ms)))
    }
}

/// Error returned when a delay range such as `"1000-3000"` cannot be parsed.
/// Bounds may come in either order, like [`DelayRange::new`].
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid delay range {0:?}, expected MIN-MAX in milliseconds")]
pub struct ParseDelayRangeError(String);

impl FromStr for DelayRange {
    type Err = ParseDelayRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseDelayRangeError(s.to_owned());
        let (min, max) = match s.trim().split_once('-') {
            Some((min, max)) => (min.trim(), max.trim()),
            None => (s.trim(), s.trim()),
        };
        let min_ms = min.parse().map_err(|_| invalid())?;
        let max_ms = max.parse().map_err(|_| invalid())?;
        Ok(Self::new(min_ms, max_ms))
    }
}

/// Everything the registry needs to run sessions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameConfig {
    pub settings: SessionSettings,
    /// How long a simulated participant "thinks" before picking a card.
    pub selection_delay: DelayRange,
    /// How long a simulated participant waits before voting.
    pub vote_delay: DelayRange,
    /// Hard deadline for the text-generation service.
    pub moral_timeout: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            settings: SessionSettings::default(),
            selection_delay: DelayRange::new(1000, 3000),
            vote_delay: DelayRange::new(300, 1200),
            moral_timeout: Duration::from_millis(5000),
        }
    }
}
