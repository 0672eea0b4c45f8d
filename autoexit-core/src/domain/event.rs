//! Lifecycle events: the audit trail of committed state transitions.
//!
//! Events are appended only when a transaction commits; a rolled-back
//! transaction leaves no trace here.

use super::ids::{AccountId, PositionHandle};
use super::tick::Tick;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// `Idle → Active`
    OrderOpened {
        seq: u64,
        position: PositionHandle,
        committed_amount: u128,
        liquidity: u128,
        lower_tick: Tick,
        upper_tick: Tick,
        target_tick: Tick,
    },
    /// `Active → Idle`
    UpkeepPerformed {
        seq: u64,
        caller: AccountId,
        position: PositionHandle,
        observed_tick: Tick,
        quote_disbursed: u128,
        base_disbursed: u128,
    },
}

impl LifecycleEvent {
    pub fn seq(&self) -> u64 {
        match self {
            LifecycleEvent::OrderOpened { seq, .. } | LifecycleEvent::UpkeepPerformed { seq, .. } => {
                *seq
            }
        }
    }

    pub fn position(&self) -> PositionHandle {
        match self {
            LifecycleEvent::OrderOpened { position, .. }
            | LifecycleEvent::UpkeepPerformed { position, .. } => *position,
        }
    }
}
