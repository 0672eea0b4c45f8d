//! Domain types for AutoExit

pub mod event;
pub mod ids;
pub mod order;
pub mod payload;
pub mod tick;

pub use event::LifecycleEvent;
pub use ids::{AccountId, AssetId, FeeTier, PositionHandle};
pub use order::{OpenOrderParams, OrderStatus, RangeOrder};
pub use payload::{PayloadError, UpkeepCheck, UpkeepPayload};
pub use tick::{Tick, TickError, MAX_TICK, MIN_TICK};
