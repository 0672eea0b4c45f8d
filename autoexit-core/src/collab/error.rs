//! Structured errors surfaced by external collaborators.

use crate::domain::{AccountId, AssetId, FeeTier, PositionHandle};
use thiserror::Error;

/// Failures of the fungible asset contracts (pull / push / approve).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("{owner} has approved only {available} {asset} to {spender}, {needed} required")]
    InsufficientAllowance {
        asset: AssetId,
        owner: AccountId,
        spender: AccountId,
        needed: u128,
        available: u128,
    },

    #[error("{account} holds {available} {asset}, {needed} required")]
    InsufficientBalance {
        asset: AssetId,
        account: AccountId,
        needed: u128,
        available: u128,
    },

    #[error("transfer of {asset} rejected: {reason}")]
    Rejected { asset: AssetId, reason: String },
}

/// Failures of the position issuer (open / decrease / collect).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IssuerError {
    #[error("issuer rejected range [{lower}, {upper}]")]
    InvalidRange { lower: i32, upper: i32 },

    #[error("issuer rejected zero liquidity")]
    ZeroLiquidity,

    #[error("unknown position {0}")]
    UnknownPosition(PositionHandle),

    #[error("position {position} holds {available} liquidity, {requested} requested")]
    InsufficientLiquidity {
        position: PositionHandle,
        requested: u128,
        available: u128,
    },

    #[error("pool for {base}/{quote} fee {fee} is not initialized")]
    PoolNotInitialized {
        base: AssetId,
        quote: AssetId,
        fee: FeeTier,
    },

    #[error("issuer rejected the call: {0}")]
    Rejected(String),

    #[error("issuer asset movement failed: {0}")]
    Asset(#[from] AssetError),
}

/// Failures of the price oracle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("no pool for {base}/{quote} fee {fee}")]
    PoolNotFound {
        base: AssetId,
        quote: AssetId,
        fee: FeeTier,
    },

    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

/// Any collaborator failure, as propagated by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollabError {
    #[error("asset: {0}")]
    Asset(#[from] AssetError),

    #[error("position issuer: {0}")]
    Issuer(#[from] IssuerError),

    #[error("oracle: {0}")]
    Oracle(#[from] OracleError),
}
