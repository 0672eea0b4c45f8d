use crate::collab::{AssetError, CollabError, IssuerError, OracleError};
use crate::domain::{AccountId, PositionHandle, Tick, TickError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why an `execute_upkeep` call had nothing to do.
///
/// Both cases are expected outcomes of the evaluate/execute race, not bugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoUpkeepReason {
    /// No order is open (never opened, or another caller already exited it).
    NoActiveOrder,
    /// The price is at or above the target again.
    AboveTarget { tick: Tick, target: Tick },
}

impl fmt::Display for NoUpkeepReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoUpkeepReason::NoActiveOrder => write!(f, "no active order"),
            NoUpkeepReason::AboveTarget { tick, target } => {
                write!(f, "tick {tick} is not below target {target}")
            }
        }
    }
}

/// Errors returned by the controller entrypoints.
///
/// Every error means the whole call was rolled back: no state was committed
/// and no asset moved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("invalid tick range: lower {lower} must be below upper {upper}")]
    InvalidTickRange { lower: i32, upper: i32 },

    #[error("tick out of bounds: {0}")]
    TickOutOfBounds(#[from] TickError),

    #[error("committed amount must be greater than zero")]
    ZeroAmount,

    #[error("caller {caller} is not the owner")]
    Unauthorized { caller: AccountId },

    #[error("an order is already active (position {position:?})")]
    OrderAlreadyActive { position: Option<PositionHandle> },

    #[error("no upkeep needed: {0}")]
    NoUpkeepNeeded(NoUpkeepReason),

    #[error("collaborator failure: {0}")]
    Collaborator(#[from] CollabError),
}

impl ControllerError {
    /// Input and authorization errors: the caller must change the request.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ControllerError::InvalidTickRange { .. }
                | ControllerError::TickOutOfBounds(_)
                | ControllerError::ZeroAmount
                | ControllerError::Unauthorized { .. }
                | ControllerError::OrderAlreadyActive { .. }
        )
    }

    /// Stale-trigger outcome of `execute_upkeep`; safe to ignore.
    pub fn is_no_upkeep(&self) -> bool {
        matches!(self, ControllerError::NoUpkeepNeeded(_))
    }
}

impl From<AssetError> for ControllerError {
    fn from(err: AssetError) -> Self {
        ControllerError::Collaborator(CollabError::Asset(err))
    }
}

impl From<IssuerError> for ControllerError {
    fn from(err: IssuerError) -> Self {
        ControllerError::Collaborator(CollabError::Issuer(err))
    }
}

impl From<OracleError> for ControllerError {
    fn from(err: OracleError) -> Self {
        ControllerError::Collaborator(CollabError::Oracle(err))
    }
}
