//! Strategy module for buy/sell/exit decisions
//!
//! The trading core depends only on the [`Strategy`] capability trait;
//! concrete strategies are supplied by the caller through a
//! [`StrategyFactory`].
//!
//! # Decision flow per tick
//!
//! ```text
//! no position:    should_exit? ──yes──▶ grace window, then exit
//!                      │no
//!                 should_buy?  ──yes──▶ buy, record ExitThresholds on the position
//!
//! open position:  should_sell? ──yes──▶ sell (retried until it lands)
//!                      │no
//!                 should_exit? ──yes──▶ ignored, keep holding
//! ```

mod traits;
mod types;

pub use traits::{SharedStrategy, Strategy, StrategyFactory};
pub use types::{ExitThresholds, SellDecision};
