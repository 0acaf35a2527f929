//! # Reward Calculator
//!
//! Every qualifying activity (focus timer, meditation, journaling, game
//! completion) is rewarded with the same threshold-then-clamp shape:
//!
//! ```text
//! elapsed < 60s  -> 0 (no claim offered)
//! otherwise      -> clamp(minutes * unit + streak * bonus, minimum, cap)
//! ```
//!
//! Only the constants differ per activity, so the formula lives once in
//! [`RewardPolicy::compute`].

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::types::ActivityId;

/// Activities shorter than this earn nothing.
pub const QUALIFYING_SECONDS: u64 = 60;

/// Constants for one activity's reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardPolicy {
    pub unit_per_minute: Amount,
    pub streak_bonus_per_level: Amount,
    pub session_cap: Amount,
    pub minimum: Amount,
}

impl RewardPolicy {
    /// Reward for an activity that ran `elapsed_seconds` at streak level `streak`.
    ///
    /// Returns zero below [`QUALIFYING_SECONDS`]. Never exceeds `session_cap`,
    /// even when `minimum` is configured above it.
    pub fn compute(&self, elapsed_seconds: u64, streak: u32) -> Amount {
        if elapsed_seconds < QUALIFYING_SECONDS {
            return Amount::ZERO;
        }

        let base = self
            .unit_per_minute
            .saturating_mul(elapsed_seconds / QUALIFYING_SECONDS);
        let bonus = self.streak_bonus_per_level.saturating_mul(u64::from(streak));

        base.saturating_add(bonus)
            .max(self.minimum)
            .min(self.session_cap)
    }

    /// The same policy with its cap lowered to `cap` if that is tighter.
    pub fn capped_at(mut self, cap: Amount) -> Self {
        self.session_cap = self.session_cap.min(cap);
        self
    }
}

/// Shorthand for [`RewardPolicy::compute`].
pub fn compute_session_reward(elapsed_seconds: u64, streak: u32, policy: &RewardPolicy) -> Amount {
    policy.compute(elapsed_seconds, streak)
}

/// The activities that can earn a reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Focus,
    Meditation,
    Journaling,
    GameCompletion,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 4] = [
        Self::Focus,
        Self::Meditation,
        Self::Journaling,
        Self::GameCompletion,
    ];

    /// Default reward constants for this activity.
    pub const fn default_policy(self) -> RewardPolicy {
        match self {
            Self::Focus => RewardPolicy {
                unit_per_minute: Amount::tokens(1),
                streak_bonus_per_level: Amount::token_fraction(2, 2),
                session_cap: Amount::tokens(50),
                minimum: Amount::tokens(1),
            },
            // 10 minutes earns 5 tokens.
            Self::Meditation => RewardPolicy {
                unit_per_minute: Amount::token_fraction(5, 1),
                streak_bonus_per_level: Amount::token_fraction(2, 2),
                session_cap: Amount::tokens(10),
                minimum: Amount::tokens(1),
            },
            // Flat 5 tokens per saved entry.
            Self::Journaling => RewardPolicy {
                unit_per_minute: Amount::tokens(1),
                streak_bonus_per_level: Amount::ZERO,
                session_cap: Amount::tokens(5),
                minimum: Amount::tokens(5),
            },
            Self::GameCompletion => RewardPolicy {
                unit_per_minute: Amount::tokens(1),
                streak_bonus_per_level: Amount::ZERO,
                session_cap: Amount::tokens(10),
                minimum: Amount::tokens(1),
            },
        }
    }

    /// Whether the account must hold an active stake to claim.
    pub const fn requires_active_account(self) -> bool {
        matches!(self, Self::GameCompletion)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::Meditation => "meditation",
            Self::Journaling => "journaling",
            Self::GameCompletion => "game_completion",
        }
    }
}

/// A discrete "activity finished" event from a timer or tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityCompleted {
    /// Unique per activity instance; a claim is submitted at most once per id.
    pub id: ActivityId,
    pub kind: ActivityKind,
    pub elapsed_seconds: u64,
}

impl ActivityCompleted {
    pub fn new(id: impl Into<String>, kind: ActivityKind, elapsed_seconds: u64) -> Self {
        Self {
            id: ActivityId::new(id),
            kind,
            elapsed_seconds,
        }
    }
}
