//! Failure injection for the simulated market.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Collaborator operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimOp {
    Approve,
    Transfer,
    TransferFrom,
    OpenPosition,
    DecreaseLiquidity,
    Collect,
    Oracle,
}

impl fmt::Display for SimOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SimOp::Approve => "approve",
            SimOp::Transfer => "transfer",
            SimOp::TransferFrom => "transfer_from",
            SimOp::OpenPosition => "open_position",
            SimOp::DecreaseLiquidity => "decrease_liquidity",
            SimOp::Collect => "collect",
            SimOp::Oracle => "oracle",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Armed {
    reason: String,
    /// `None` fails every call until cleared.
    remaining: Option<u32>,
}

/// Which operations fail, with what reason, and how many more times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailurePlan {
    armed: BTreeMap<SimOp, Armed>,
}

impl FailurePlan {
    /// Fail every call to `op` until cleared.
    pub fn always(&mut self, op: SimOp, reason: impl Into<String>) {
        self.armed.insert(
            op,
            Armed {
                reason: reason.into(),
                remaining: None,
            },
        );
    }

    /// Fail the next `times` calls to `op`.
    pub fn times(&mut self, op: SimOp, times: u32, reason: impl Into<String>) {
        if times == 0 {
            self.armed.remove(&op);
            return;
        }
        self.armed.insert(
            op,
            Armed {
                reason: reason.into(),
                remaining: Some(times),
            },
        );
    }

    pub fn clear(&mut self, op: SimOp) {
        self.armed.remove(&op);
    }

    pub fn clear_all(&mut self) {
        self.armed.clear();
    }

    pub fn is_armed(&self, op: SimOp) -> bool {
        self.armed.contains_key(&op)
    }

    /// Consume one failure for `op`, returning its reason if the call must fail.
    pub fn take(&mut self, op: SimOp) -> Option<String> {
        let armed = self.armed.get_mut(&op)?;
        let reason = armed.reason.clone();
        match armed.remaining.as_mut() {
            None => {}
            Some(n) if *n > 1 => *n -= 1,
            Some(_) => {
                self.armed.remove(&op);
            }
        }
        Some(reason)
    }
}
