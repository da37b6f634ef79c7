//! Common test utilities and fakes

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use pump_sniper::common::types::PositionStatus;
use pump_sniper::{
    BuyParams, ExecutionClient, ExecutionError, MarketDataProvider, MarketSnapshot, Opportunity,
    OpportunityFeed, OpportunityHandler, OutcomeReport, Position, PositionClosure, PositionStore,
    Result, ResultStore, SellDecision, SellParams, Side, Strategy, TradeOutcome, TradeTransaction,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Create a sample opportunity for testing
pub fn sample_opportunity(n: usize) -> Opportunity {
    Opportunity {
        mint: format!("mint{n}"),
        creator: "creator".to_string(),
        bonding_curve: format!("curve{n}"),
        associated_bonding_curve: Some(format!("ata{n}")),
        name: format!("Test Token {n}"),
        symbol: format!("TT{n}"),
        created_at: Utc::now(),
    }
}

/// Feed that delivers only what the test pushes
#[derive(Default)]
pub struct ManualFeed {
    handler: Mutex<Option<OpportunityHandler>>,
}

impl ManualFeed {
    pub fn deliver(&self, opportunity: Opportunity) {
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(opportunity);
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.handler.lock().is_some()
    }
}

impl OpportunityFeed for ManualFeed {
    fn listen(&self, handler: OpportunityHandler) -> Result<()> {
        *self.handler.lock() = Some(handler);
        Ok(())
    }

    fn stop_listening(&self) {
        *self.handler.lock() = None;
    }
}

/// Market data at a fixed price per mint
pub struct FixedMarket {
    price: Decimal,
}

impl FixedMarket {
    pub fn new(price: Decimal) -> Self {
        Self { price }
    }
}

#[async_trait]
impl MarketDataProvider for FixedMarket {
    async fn get_snapshot(&self, opportunity: &Opportunity) -> Result<MarketSnapshot> {
        Ok(MarketSnapshot {
            mint: opportunity.mint.clone(),
            price: self.price,
            market_cap: dec!(30),
            bonding_curve_progress: dec!(5),
            top_holders_percent: dec!(20),
            holder_count: 12,
            taken_at: Utc::now(),
        })
    }
}

/// Execution client that fills at a fixed price and records every call
pub struct FakeExecution {
    price: Decimal,
    buy_failures: Mutex<HashMap<String, ExecutionError>>,
    holdings: Mutex<HashMap<String, Decimal>>,
    pub buys: Mutex<Vec<BuyParams>>,
    pub sells: Mutex<Vec<SellParams>>,
}

impl FakeExecution {
    pub fn new(price: Decimal) -> Self {
        Self {
            price,
            buy_failures: Mutex::new(HashMap::new()),
            holdings: Mutex::new(HashMap::new()),
            buys: Mutex::new(Vec::new()),
            sells: Mutex::new(Vec::new()),
        }
    }

    /// Every buy of `mint` fails with `error`
    pub fn fail_buys(&self, mint: &str, error: ExecutionError) {
        self.buy_failures.lock().insert(mint.to_string(), error);
    }

    pub fn sell_reasons(&self, mint: &str) -> Vec<String> {
        self.sells
            .lock()
            .iter()
            .filter(|p| p.mint == mint)
            .map(|p| p.reason.clone())
            .collect()
    }

    fn transaction(&self, side: Side, mint: &str, tokens: Decimal, net: Decimal) -> TradeTransaction {
        TradeTransaction {
            id: Uuid::new_v4(),
            side,
            mint: mint.to_string(),
            token_amount: tokens,
            price: self.price,
            gross_amount: net,
            fees: Decimal::ZERO,
            net_amount: net,
            signature: format!("sig-{}", Uuid::new_v4()),
            metadata: serde_json::Value::Null,
            executed_at: Utc::now(),
        }
    }
}

#[async_trait]
impl ExecutionClient for FakeExecution {
    async fn buy(&self, params: BuyParams) -> std::result::Result<TradeTransaction, ExecutionError> {
        self.buys.lock().push(params.clone());
        if let Some(error) = self.buy_failures.lock().get(&params.mint) {
            return Err(error.clone());
        }
        let tokens = params.amount / self.price;
        *self.holdings.lock().entry(params.mint.clone()).or_default() += tokens;
        Ok(self.transaction(Side::Buy, &params.mint, tokens, params.amount))
    }

    async fn sell(&self, params: SellParams) -> std::result::Result<TradeTransaction, ExecutionError> {
        self.sells.lock().push(params.clone());
        let held = self.holdings.lock().remove(&params.mint).unwrap_or_default();
        if held.is_zero() {
            return Err(ExecutionError::Other("nothing to sell".to_string()));
        }
        let tokens = params.token_amount.unwrap_or(held);
        Ok(self.transaction(Side::Sell, &params.mint, tokens, tokens * self.price))
    }
}

#[derive(Default)]
pub struct MemoryPositions {
    positions: Mutex<HashMap<Uuid, Position>>,
}

impl MemoryPositions {
    pub fn open_count(&self) -> usize {
        self.positions.lock().values().filter(|p| p.is_open()).count()
    }

    pub fn len(&self) -> usize {
        self.positions.lock().len()
    }
}

#[async_trait]
impl PositionStore for MemoryPositions {
    async fn insert(&self, position: &Position) -> Result<()> {
        self.positions.lock().insert(position.trade_id, position.clone());
        Ok(())
    }

    async fn close(&self, trade_id: Uuid, closure: &PositionClosure) -> Result<()> {
        if let Some(position) = self.positions.lock().get_mut(&trade_id) {
            position.status = PositionStatus::Closed;
            position.closed_at = Some(closure.closed_at);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryResults {
    pub outcomes: Mutex<Vec<(TradeOutcome, OutcomeReport)>>,
}

impl MemoryResults {
    pub fn len(&self) -> usize {
        self.outcomes.lock().len()
    }

    pub fn completed(&self) -> usize {
        self.outcomes.lock().iter().filter(|(o, _)| o.is_completed()).count()
    }
}

#[async_trait]
impl ResultStore for MemoryResults {
    async fn insert_outcome(&self, outcome: &TradeOutcome, report: &OutcomeReport) -> Result<()> {
        self.outcomes.lock().push((outcome.clone(), report.clone()));
        Ok(())
    }
}

/// Never buys and never exits; runs until stopped
pub struct Watcher;

impl Strategy for Watcher {
    fn name(&self) -> &str {
        "watcher"
    }

    fn should_buy(&self, _snapshot: &MarketSnapshot) -> bool {
        false
    }

    fn should_sell(&self, _position: &Position, _snapshot: &MarketSnapshot) -> SellDecision {
        SellDecision::hold()
    }

    fn should_exit(&self, _position: Option<&Position>, _snapshot: &MarketSnapshot) -> bool {
        false
    }
}

/// Buys immediately and holds until the shared gate opens
pub struct GatedHolder {
    pub gate: Arc<AtomicBool>,
}

impl Strategy for GatedHolder {
    fn name(&self) -> &str {
        "gated_holder"
    }

    fn should_buy(&self, _snapshot: &MarketSnapshot) -> bool {
        true
    }

    fn should_sell(&self, _position: &Position, _snapshot: &MarketSnapshot) -> SellDecision {
        if self.gate.load(Ordering::SeqCst) {
            SellDecision::sell("gate_open")
        } else {
            SellDecision::hold()
        }
    }

    fn should_exit(&self, _position: Option<&Position>, _snapshot: &MarketSnapshot) -> bool {
        false
    }
}
