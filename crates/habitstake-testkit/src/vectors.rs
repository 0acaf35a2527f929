//! Reward vectors.
//!
//! Exact amounts the reward calculator must produce for the default
//! activity policies. A change to any default policy shows up here.

use habitstake_core::{compute_session_reward, ActivityKind, Amount};

#[derive(Debug, Clone)]
pub struct RewardVector {
    pub name: &'static str,
    pub kind: ActivityKind,
    pub elapsed_seconds: u64,
    pub streak: u32,
    pub expected: Amount,
}

impl RewardVector {
    /// What the calculator produces for this vector.
    pub fn compute(&self) -> Amount {
        compute_session_reward(self.elapsed_seconds, self.streak, &self.kind.default_policy())
    }
}

pub fn all_vectors() -> Vec<RewardVector> {
    vec![
        RewardVector {
            name: "focus below threshold",
            kind: ActivityKind::Focus,
            elapsed_seconds: 59,
            streak: 10,
            expected: Amount::ZERO,
        },
        RewardVector {
            name: "focus one minute",
            kind: ActivityKind::Focus,
            elapsed_seconds: 60,
            streak: 0,
            expected: Amount::tokens(1),
        },
        RewardVector {
            name: "focus partial minutes floor",
            kind: ActivityKind::Focus,
            elapsed_seconds: 179,
            streak: 0,
            expected: Amount::tokens(2),
        },
        RewardVector {
            name: "focus pomodoro with streak",
            kind: ActivityKind::Focus,
            elapsed_seconds: 25 * 60,
            streak: 3,
            expected: Amount::token_fraction(2506, 2),
        },
        RewardVector {
            name: "focus long streak",
            kind: ActivityKind::Focus,
            elapsed_seconds: 60,
            streak: 100,
            expected: Amount::tokens(3),
        },
        RewardVector {
            name: "focus capped",
            kind: ActivityKind::Focus,
            elapsed_seconds: 3 * 60 * 60,
            streak: 0,
            expected: Amount::tokens(50),
        },
        RewardVector {
            name: "meditation raised to minimum",
            kind: ActivityKind::Meditation,
            elapsed_seconds: 60,
            streak: 0,
            expected: Amount::tokens(1),
        },
        RewardVector {
            name: "meditation ten minutes",
            kind: ActivityKind::Meditation,
            elapsed_seconds: 600,
            streak: 0,
            expected: Amount::tokens(5),
        },
        RewardVector {
            name: "meditation capped",
            kind: ActivityKind::Meditation,
            elapsed_seconds: 3600,
            streak: 5,
            expected: Amount::tokens(10),
        },
        RewardVector {
            name: "journaling flat",
            kind: ActivityKind::Journaling,
            elapsed_seconds: 120,
            streak: 7,
            expected: Amount::tokens(5),
        },
        RewardVector {
            name: "journaling long entry",
            kind: ActivityKind::Journaling,
            elapsed_seconds: 1200,
            streak: 0,
            expected: Amount::tokens(5),
        },
        RewardVector {
            name: "game three minutes",
            kind: ActivityKind::GameCompletion,
            elapsed_seconds: 180,
            streak: 4,
            expected: Amount::tokens(3),
        },
        RewardVector {
            name: "game below threshold",
            kind: ActivityKind::GameCompletion,
            elapsed_seconds: 30,
            streak: 0,
            expected: Amount::ZERO,
        },
    ]
}
