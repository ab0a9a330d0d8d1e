use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

//everything that must be rejected before a simulation starts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Price series is empty")]
    EmptySeries,
    #[error("Invalid close price {close} on {date} (bar {index}): must be finite and positive")]
    InvalidClose {
        index: usize,
        date: NaiveDate,
        close: f64,
    },
    #[error("Duplicate date {date} at bar {index}")]
    DuplicateDate { index: usize, date: NaiveDate },
    #[error("Date {date} at bar {index} is earlier than the previous bar ({previous})")]
    OutOfOrder {
        index: usize,
        date: NaiveDate,
        previous: NaiveDate,
    },
    #[error("initial_capital must be finite and positive, got {0}")]
    InitialCapital(f64),
    #[error("transaction_cost_rate must be in [0, 1), got {0}")]
    TransactionCost(f64),
    #[error("stop_loss_pct must be in (0, 1), got {0}")]
    StopLoss(f64),
    #[error("risk_per_trade must be in (0, 1], got {0}")]
    RiskPerTrade(f64),
    #[error("moving average window `{name}` must be at least 1")]
    ZeroWindow { name: &'static str },
    #[error("fast window ({fast}) must be shorter than slow window ({slow})")]
    WindowOrder { fast: usize, slow: usize },
}

//a single daily close
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    pub date: NaiveDate,
    pub close: f64,
}

impl Bar {
    //creates a new Bar, rejecting prices the simulation cannot trade at
    pub fn new(date: NaiveDate, close: f64) -> Result<Self, ValidationError> {
        if !close.is_finite() || close <= 0.0 {
            return Err(ValidationError::InvalidClose {
                index: 0,
                date,
                close,
            });
        }

        Ok(Bar { date, close })
    }

    //creates a Bar without validation
    pub fn new_unchecked(date: NaiveDate, close: f64) -> Self {
        Bar { date, close }
    }
}

//checks a whole series: non-empty, positive closes, strictly increasing dates
pub fn validate_series(bars: &[Bar]) -> Result<(), ValidationError> {
    if bars.is_empty() {
        return Err(ValidationError::EmptySeries);
    }

    for (index, bar) in bars.iter().enumerate() {
        if !bar.close.is_finite() || bar.close <= 0.0 {
            return Err(ValidationError::InvalidClose {
                index,
                date: bar.date,
                close: bar.close,
            });
        }

        if index > 0 {
            let previous = bars[index - 1].date;
            if bar.date == previous {
                return Err(ValidationError::DuplicateDate {
                    index,
                    date: bar.date,
                });
            }
            if bar.date < previous {
                return Err(ValidationError::OutOfOrder {
                    index,
                    date: bar.date,
                    previous,
                });
            }
        }
    }

    Ok(())
}
