pub mod backtest;
pub mod execution;

pub use backtest::{step, BacktestEngine, BacktestResult, EnrichedBar, Transition};
pub use execution::{ExitReason, TradeAction, TradeRecord};
