use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

//a point in the equity curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub cash: f64,
    //mark-to-market value: cash plus shares at the close
    pub equity: f64,
    //(equity - running peak) / running peak, never positive
    pub drawdown: f64,
    //percentage change from the previous bar, zero on the first
    pub returns: f64,
    //true when the bar closed long
    pub invested: bool,
}

impl EquityPoint {
    //a raw mark, drawdown and returns are filled in by calculate_equity_curve
    pub fn mark(date: NaiveDate, cash: f64, equity: f64, invested: bool) -> Self {
        EquityPoint {
            date,
            cash,
            equity,
            drawdown: 0.0,
            returns: 0.0,
            invested,
        }
    }
}

//fills in drawdown against the running peak and bar-to-bar returns
pub fn calculate_equity_curve(marks: Vec<EquityPoint>) -> Vec<EquityPoint> {
    let mut curve = Vec::with_capacity(marks.len());
    let mut peak = f64::NEG_INFINITY;
    let mut prev_equity: Option<f64> = None;

    for mut point in marks {
        //running max includes the current bar
        if point.equity > peak {
            peak = point.equity;
        }

        point.drawdown = if peak > 0.0 {
            (point.equity - peak) / peak
        } else {
            0.0
        };

        point.returns = match prev_equity {
            Some(prev) if prev != 0.0 => (point.equity - prev) / prev,
            _ => 0.0,
        };

        prev_equity = Some(point.equity);
        curve.push(point);
    }

    curve
}

//calculates maximum drawdown from equity curve (zero or negative)
pub fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    equity_curve
        .iter()
        .map(|point| point.drawdown)
        .fold(0.0, f64::min)
}
