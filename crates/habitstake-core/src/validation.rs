//! Local precondition checks.
//!
//! Each check runs against the caller's current mirror values before any
//! transaction is submitted. Passing a check says nothing about whether the
//! ledger will accept the transaction; it can still reject on fresher state.

use crate::account::{AccountSnapshot, GlobalConstants, ProviderProfile};
use crate::amount::Amount;
use crate::booking::{BookingStatus, BookingView};
use crate::error::ValidationError;
use crate::types::{AccountId, BookingHandle};

/// Longest accepted provider display name, in characters.
pub const MAX_PROVIDER_NAME_LEN: usize = 50;

type Result<T> = std::result::Result<T, ValidationError>;

fn check_positive(amount: Amount) -> Result<()> {
    if amount.is_zero() {
        return Err(ValidationError::NonPositiveAmount);
    }
    Ok(())
}

pub fn check_stake(amount: Amount, constants: &GlobalConstants) -> Result<()> {
    check_positive(amount)?;
    if amount > constants.max_stake {
        return Err(ValidationError::ExceedsMaxStake {
            amount,
            max: constants.max_stake,
        });
    }
    Ok(())
}

pub fn check_unstake(amount: Amount, account: &AccountSnapshot) -> Result<()> {
    check_positive(amount)?;
    if amount > account.staked {
        return Err(ValidationError::ExceedsStaked {
            amount,
            staked: account.staked,
        });
    }
    Ok(())
}

pub fn check_earn(amount: Amount, constants: &GlobalConstants) -> Result<()> {
    check_positive(amount)?;
    if amount > constants.max_reward {
        return Err(ValidationError::ExceedsMaxReward {
            amount,
            max: constants.max_reward,
        });
    }
    Ok(())
}

pub fn check_redeem(amount: Amount, account: &AccountSnapshot) -> Result<()> {
    check_positive(amount)?;
    if amount > account.earned {
        return Err(ValidationError::ExceedsEarned {
            amount,
            earned: account.earned,
        });
    }
    Ok(())
}

/// Validate a booking request and return the parsed provider address.
pub fn check_booking(
    provider: &str,
    fee: Amount,
    account: &AccountSnapshot,
    constants: &GlobalConstants,
) -> Result<AccountId> {
    let provider = AccountId::parse_address(provider)?;
    if fee < constants.min_session_fee {
        return Err(ValidationError::FeeBelowMinimum {
            fee,
            min: constants.min_session_fee,
        });
    }
    if fee > account.staked {
        return Err(ValidationError::InsufficientStakeForFee {
            fee,
            staked: account.staked,
        });
    }
    Ok(provider)
}

/// Validate a cancellation against the caller's own bookings.
pub fn check_cancel(handle: BookingHandle, bookings: &[BookingView]) -> Result<()> {
    let view = bookings
        .iter()
        .find(|b| b.handle() == handle)
        .ok_or(ValidationError::BookingNotFound(handle))?;

    if view.status != BookingStatus::Pending {
        return Err(ValidationError::BookingNotPending {
            handle,
            status: view.status.as_str(),
        });
    }
    Ok(())
}

/// Validate a registration and return the trimmed display name.
pub fn check_provider_name(name: &str, profile: &ProviderProfile) -> Result<String> {
    if profile.active {
        return Err(ValidationError::AlreadyProvider);
    }
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyProviderName);
    }
    let len = trimmed.chars().count();
    if len > MAX_PROVIDER_NAME_LEN {
        return Err(ValidationError::ProviderNameTooLong {
            len,
            max: MAX_PROVIDER_NAME_LEN,
        });
    }
    Ok(trimmed.to_string())
}

pub fn check_deactivate(profile: &ProviderProfile) -> Result<()> {
    if !profile.is_registered() {
        return Err(ValidationError::NotProvider);
    }
    if !profile.active {
        return Err(ValidationError::ProviderState("inactive"));
    }
    Ok(())
}

pub fn check_reactivate(profile: &ProviderProfile) -> Result<()> {
    if !profile.is_registered() {
        return Err(ValidationError::NotProvider);
    }
    if profile.active {
        return Err(ValidationError::ProviderState("active"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{reconcile, BookingRecord};

    fn constants() -> GlobalConstants {
        GlobalConstants {
            max_stake: Amount::tokens(1000),
            min_session_fee: Amount::tokens(1),
            max_reward: Amount::tokens(10),
        }
    }

    fn account(staked: u64, earned: u64) -> AccountSnapshot {
        AccountSnapshot {
            staked: Amount::tokens(staked),
            earned: Amount::tokens(earned),
            streak: 0,
            active: staked > 0,
        }
    }

    const PROVIDER: &str = "0x8ba1f109551bD432803012645Ac136ddd64DBA72";

    #[test]
    fn test_zero_amount_rejected_everywhere() {
        let c = constants();
        let a = account(10, 10);
        let zero = Amount::ZERO;
        assert_eq!(check_stake(zero, &c), Err(ValidationError::NonPositiveAmount));
        assert_eq!(check_unstake(zero, &a), Err(ValidationError::NonPositiveAmount));
        assert_eq!(check_earn(zero, &c), Err(ValidationError::NonPositiveAmount));
        assert_eq!(check_redeem(zero, &a), Err(ValidationError::NonPositiveAmount));
    }

    #[test]
    fn test_stake_cap() {
        let c = constants();
        assert!(check_stake(Amount::tokens(1000), &c).is_ok());
        assert!(matches!(
            check_stake(Amount::tokens(1001), &c),
            Err(ValidationError::ExceedsMaxStake { .. })
        ));
    }

    #[test]
    fn test_unstake_and_redeem_bounded_by_balances() {
        let a = account(100, 120);
        assert!(check_unstake(Amount::tokens(100), &a).is_ok());
        assert!(check_unstake(Amount::tokens(101), &a).is_err());
        assert!(check_redeem(Amount::tokens(120), &a).is_ok());
        assert_eq!(
            check_redeem(Amount::tokens(150), &a),
            Err(ValidationError::ExceedsEarned {
                amount: Amount::tokens(150),
                earned: Amount::tokens(120),
            })
        );
    }

    #[test]
    fn test_earn_cap() {
        let c = constants();
        assert!(check_earn(Amount::tokens(10), &c).is_ok());
        assert!(check_earn(Amount::tokens(11), &c).is_err());
    }

    #[test]
    fn test_booking_checks() {
        let c = constants();
        let a = account(5, 0);

        let provider = check_booking(PROVIDER, Amount::tokens(5), &a, &c).unwrap();
        assert_eq!(provider.as_str(), PROVIDER);

        assert!(matches!(
            check_booking("bob", Amount::tokens(1), &a, &c),
            Err(ValidationError::InvalidAddress(_))
        ));
        assert!(matches!(
            check_booking(PROVIDER, Amount::token_fraction(5, 1), &a, &c),
            Err(ValidationError::FeeBelowMinimum { .. })
        ));
        assert!(matches!(
            check_booking(PROVIDER, Amount::tokens(6), &a, &c),
            Err(ValidationError::InsufficientStakeForFee { .. })
        ));
    }

    #[test]
    fn test_cancel_requires_pending_booking() {
        let record = |handle, status| BookingRecord {
            handle: BookingHandle::new(handle),
            patient: AccountId::new(PROVIDER),
            provider: AccountId::new(PROVIDER),
            created_at: 0,
            session_fee: Amount::tokens(1),
            report_pointer: None,
            status,
        };
        let views = vec![
            reconcile(&record(0, 0)).unwrap(),
            reconcile(&record(1, 2)).unwrap(),
        ];

        assert!(check_cancel(BookingHandle::new(0), &views).is_ok());
        assert_eq!(
            check_cancel(BookingHandle::new(1), &views),
            Err(ValidationError::BookingNotPending {
                handle: BookingHandle::new(1),
                status: "cancelled",
            })
        );
        assert_eq!(
            check_cancel(BookingHandle::new(7), &views),
            Err(ValidationError::BookingNotFound(BookingHandle::new(7)))
        );
    }

    #[test]
    fn test_provider_name() {
        let fresh = ProviderProfile::default();
        assert_eq!(check_provider_name("  Dr. Lee  ", &fresh).unwrap(), "Dr. Lee");
        assert_eq!(
            check_provider_name("   ", &fresh),
            Err(ValidationError::EmptyProviderName)
        );
        assert!(matches!(
            check_provider_name(&"x".repeat(51), &fresh),
            Err(ValidationError::ProviderNameTooLong { len: 51, max: 50 })
        ));

        let active = ProviderProfile {
            display_name: "Dr. Lee".into(),
            active: true,
            ..Default::default()
        };
        assert_eq!(
            check_provider_name("Dr. Lee", &active),
            Err(ValidationError::AlreadyProvider)
        );
    }

    #[test]
    fn test_provider_state_transitions() {
        let fresh = ProviderProfile::default();
        assert_eq!(check_deactivate(&fresh), Err(ValidationError::NotProvider));
        assert_eq!(check_reactivate(&fresh), Err(ValidationError::NotProvider));

        let mut profile = ProviderProfile {
            display_name: "Dr. Lee".into(),
            active: true,
            ..Default::default()
        };
        assert!(check_deactivate(&profile).is_ok());
        assert!(check_reactivate(&profile).is_err());

        profile.active = false;
        assert!(check_reactivate(&profile).is_ok());
        assert!(check_deactivate(&profile).is_err());
    }
}
