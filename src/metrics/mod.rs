pub mod summary;
pub mod timeseries;

pub use summary::{ExitReasonStats, SummaryMetrics};
pub use timeseries::{calculate_equity_curve, EquityPoint};
