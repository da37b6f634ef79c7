//! Event bus decoupling trade execution from risk oversight

mod bus;
mod types;

pub use bus::{
    EventBus, StopRequestedHandler, SubscriptionId, TradeCycleCompletedHandler,
    TradeExecutedHandler,
};
pub use types::{StopReason, StopRequest, StopScope};
