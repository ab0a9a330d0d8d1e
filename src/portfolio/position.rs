use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

//flat or long label used in the enriched series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionState {
    Flat,
    Long,
}

//the single position the simulation can hold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Position {
    Flat,
    Long {
        entry_date: NaiveDate,
        entry_price: f64,
        //shares, fractional allowed, always > 0
        size: f64,
    },
}

impl Position {
    //returns true if the position is flat (no open position)
    pub fn is_flat(&self) -> bool {
        matches!(self, Position::Flat)
    }

    //returns true if the position is long
    pub fn is_long(&self) -> bool {
        matches!(self, Position::Long { .. })
    }

    //shares held, zero when flat
    pub fn size(&self) -> f64 {
        match self {
            Position::Flat => 0.0,
            Position::Long { size, .. } => *size,
        }
    }

    pub fn state(&self) -> PositionState {
        match self {
            Position::Flat => PositionState::Flat,
            Position::Long { .. } => PositionState::Long,
        }
    }

    //calculates unrealized pnl at a given price
    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        match self {
            Position::Flat => 0.0,
            Position::Long {
                entry_price, size, ..
            } => (current_price - entry_price) * size,
        }
    }

    //returns the market value of the shares held
    pub fn market_value(&self, current_price: f64) -> f64 {
        self.size() * current_price
    }
}
