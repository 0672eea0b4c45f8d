//! Admission checks for `open_order`, in the order they are reported:
//! range ordering, tick domain, amount, caller, then controller state.

use super::error::ControllerError;
use crate::domain::{AccountId, OpenOrderParams, RangeOrder, Tick};

/// A range that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidRange {
    pub lower: Tick,
    pub upper: Tick,
}

/// `lower < upper`, and both inside the tick domain.
pub fn check_range(lower: i32, upper: i32) -> Result<ValidRange, ControllerError> {
    if lower >= upper {
        return Err(ControllerError::InvalidTickRange { lower, upper });
    }
    Ok(ValidRange {
        lower: Tick::new(lower)?,
        upper: Tick::new(upper)?,
    })
}

pub fn check_amount(amount: u128) -> Result<(), ControllerError> {
    if amount == 0 {
        return Err(ControllerError::ZeroAmount);
    }
    Ok(())
}

pub fn check_owner(caller: &AccountId, owner: &AccountId) -> Result<(), ControllerError> {
    if caller != owner {
        return Err(ControllerError::Unauthorized {
            caller: caller.clone(),
        });
    }
    Ok(())
}

pub fn check_idle(order: &RangeOrder) -> Result<(), ControllerError> {
    if order.is_active {
        return Err(ControllerError::OrderAlreadyActive {
            position: order.position,
        });
    }
    Ok(())
}

/// All admission checks for a new order.
pub fn admit(
    params: &OpenOrderParams,
    caller: &AccountId,
    owner: &AccountId,
    current: &RangeOrder,
) -> Result<ValidRange, ControllerError> {
    let range = check_range(params.lower_tick, params.upper_tick)?;
    check_amount(params.committed_amount)?;
    check_owner(caller, owner)?;
    check_idle(current)?;
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetId, FeeTier, PositionHandle, TickError, MAX_TICK};

    fn params(lower: i32, upper: i32, amount: u128) -> OpenOrderParams {
        OpenOrderParams {
            base_asset: AssetId::new("USDC"),
            quote_asset: AssetId::new("WETH"),
            fee_tier: FeeTier::MEDIUM,
            committed_amount: amount,
            lower_tick: lower,
            upper_tick: upper,
        }
    }

    #[test]
    fn equal_and_inverted_ranges_rejected() {
        assert_eq!(
            check_range(80_000, 80_000),
            Err(ControllerError::InvalidTickRange {
                lower: 80_000,
                upper: 80_000
            })
        );
        assert!(matches!(
            check_range(80_000, 79_700),
            Err(ControllerError::InvalidTickRange { .. })
        ));
    }

    #[test]
    fn inverted_range_reported_before_bounds() {
        assert!(matches!(
            check_range(MAX_TICK + 10, 0),
            Err(ControllerError::InvalidTickRange { .. })
        ));
        assert_eq!(
            check_range(0, MAX_TICK + 10),
            Err(ControllerError::TickOutOfBounds(TickError::OutOfBounds(
                MAX_TICK as i64 + 10
            )))
        );
    }

    #[test]
    fn admit_reports_first_failure() {
        let owner = AccountId::new("owner");
        let stranger = AccountId::new("stranger");
        let idle = RangeOrder::default();

        // Amount is checked before the caller.
        assert_eq!(
            admit(&params(79_700, 80_000, 0), &stranger, &owner, &idle),
            Err(ControllerError::ZeroAmount)
        );
        assert_eq!(
            admit(&params(79_700, 80_000, 1), &stranger, &owner, &idle),
            Err(ControllerError::Unauthorized { caller: stranger })
        );

        let mut active = RangeOrder::default();
        active.is_active = true;
        active.position = Some(PositionHandle(1));
        assert_eq!(
            admit(&params(79_700, 80_000, 1), &owner, &owner, &active),
            Err(ControllerError::OrderAlreadyActive {
                position: Some(PositionHandle(1))
            })
        );

        let range = admit(&params(79_700, 80_000, 1), &owner, &owner, &idle).unwrap();
        assert_eq!(range.lower.get(), 79_700);
        assert_eq!(range.upper.get(), 80_000);
    }
}
