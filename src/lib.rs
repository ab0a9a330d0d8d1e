//a Rust-based moving-average crossover backtester for daily closes

pub mod config;
pub mod data;
pub mod engine;
pub mod metrics;
pub mod portfolio;
pub mod strategy;

//prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{BacktestConfiguration, FeePolicy, SimulationConfig};
    pub use crate::data::{load_csv, validate_series, Bar, ValidationError};
    pub use crate::engine::{
        step, BacktestEngine, BacktestResult, EnrichedBar, ExitReason, TradeAction, TradeRecord,
        Transition,
    };
    pub use crate::metrics::{calculate_equity_curve, EquityPoint, ExitReasonStats, SummaryMetrics};
    pub use crate::portfolio::{Account, Position, PositionState};
    pub use crate::strategy::{
        rolling_sma,
        sma_crossover::{IndicatorRow, SmaCrossoverStrategy},
        RollingMean, Signal, BEARISH_CROSSOVER, BULLISH_CROSSOVER,
    };
}
