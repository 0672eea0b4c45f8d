//! Upkeep check results and the advisory payload handed from the evaluator to
//! whoever calls the executor.
//!
//! The payload is a data hint. The executor decodes it only to log what the
//! keeper believed it saw; every decision is re-derived from live state.

use super::ids::PositionHandle;
use super::tick::Tick;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("empty payload")]
    Empty,

    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// What the evaluator observed when it reported a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpkeepPayload {
    pub position: PositionHandle,
    pub observed_tick: Tick,
}

impl UpkeepPayload {
    pub fn encode(&self) -> Vec<u8> {
        // Plain struct of integers: serialization cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        if bytes.is_empty() {
            return Err(PayloadError::Empty);
        }
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Result of `evaluate_upkeep`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpkeepCheck {
    pub triggered: bool,
    /// Encoded [`UpkeepPayload`] when triggered, empty otherwise.
    pub payload: Vec<u8>,
}

impl UpkeepCheck {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn triggered(payload: &UpkeepPayload) -> Self {
        Self {
            triggered: true,
            payload: payload.encode(),
        }
    }
}
