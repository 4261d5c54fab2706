use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Lives granted to a learner when the store does not report a maximum.
pub const DEFAULT_MAX_LIVES: u32 = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LivesError {
    #[error("maximum lives must be > 0")]
    ZeroMax,

    #[error("current lives ({current}) exceed maximum ({max})")]
    CurrentExceedsMax { current: u32, max: u32 },
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Bounded consumable resource a learner spends on wrong answers.
///
/// `current <= max` always holds, and a regeneration instant is only kept
/// while there is a deficit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivesState {
    current: u32,
    max: u32,
    next_regen_at: Option<DateTime<Utc>>,
}

impl LivesState {
    /// Build a validated lives state.
    ///
    /// A regeneration instant supplied for a full state is dropped.
    ///
    /// # Errors
    ///
    /// Returns `LivesError::ZeroMax` if `max` is zero.
    /// Returns `LivesError::CurrentExceedsMax` if `current > max`.
    pub fn new(
        current: u32,
        max: u32,
        next_regen_at: Option<DateTime<Utc>>,
    ) -> Result<Self, LivesError> {
        if max == 0 {
            return Err(LivesError::ZeroMax);
        }
        if current > max {
            return Err(LivesError::CurrentExceedsMax { current, max });
        }
        let next_regen_at = if current < max { next_regen_at } else { None };
        Ok(Self {
            current,
            max,
            next_regen_at,
        })
    }

    /// A full state with no pending regeneration.
    #[must_use]
    pub fn full(max: u32) -> Self {
        let max = max.max(1);
        Self {
            current: max,
            max,
            next_regen_at: None,
        }
    }

    #[must_use]
    pub fn current(&self) -> u32 {
        self.current
    }

    #[must_use]
    pub fn max(&self) -> u32 {
        self.max
    }

    #[must_use]
    pub fn next_regen_at(&self) -> Option<DateTime<Utc>> {
        self.next_regen_at
    }

    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.current == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.current == self.max
    }

    /// Lives missing until the maximum.
    #[must_use]
    pub fn deficit(&self) -> u32 {
        self.max - self.current
    }

    /// One entry per possible life, `true` for the ones still available.
    #[must_use]
    pub fn hearts(&self) -> Vec<bool> {
        (0..self.max).map(|idx| idx < self.current).collect()
    }
}

impl Default for LivesState {
    fn default() -> Self {
        Self::full(DEFAULT_MAX_LIVES)
    }
}

//
// ─── REGENERATION SCHEDULE ─────────────────────────────────────────────────────
//

/// When the next life is expected back, as reported by the lives store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenSchedule {
    /// Nothing pending.
    Idle,
    /// A life regenerates at the given instant.
    At(DateTime<Utc>),
    /// The store reported a timestamp that cannot be read; treat it as elapsed.
    Due,
}

impl RegenSchedule {
    /// Interpret a raw `next_life_at` value.
    ///
    /// Accepts RFC 3339 and `YYYY-MM-DD HH:MM:SS` (taken as UTC). Anything
    /// else non-empty becomes [`RegenSchedule::Due`].
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
            return Self::Idle;
        };
        if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
            return Self::At(at.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
            return Self::At(naive.and_utc());
        }
        tracing::warn!(raw, "unreadable regeneration timestamp, treating as due");
        Self::Due
    }

    #[must_use]
    pub fn instant(self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(at) => Some(at),
            Self::Idle | Self::Due => None,
        }
    }

    /// True when regeneration should already have happened at `now`.
    #[must_use]
    pub fn is_due(self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Idle => false,
            Self::At(at) => at <= now,
            Self::Due => true,
        }
    }
}

impl From<Option<DateTime<Utc>>> for RegenSchedule {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Self::Idle, Self::At)
    }
}
