pub mod sma_crossover;

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

//crossover value marking fast crossing above slow (-1 -> +1)
pub const BULLISH_CROSSOVER: i8 = 2;
//crossover value marking fast crossing below slow (+1 -> -1)
pub const BEARISH_CROSSOVER: i8 = -2;

//rolling mean over the last `window` pushed values, none until the window is full
//a window of identical values yields that value exactly, so averages of any
//length over a constant series compare equal
#[derive(Debug, Clone)]
pub struct RollingMean {
    window: usize,
    values: VecDeque<f64>,
    sum: f64,
    same_run: usize,
}

impl RollingMean {
    //none for a zero window, which has no mean
    pub fn new(window: usize) -> Option<Self> {
        if window == 0 {
            return None;
        }

        Some(RollingMean {
            window,
            values: VecDeque::with_capacity(window + 1),
            sum: 0.0,
            same_run: 0,
        })
    }

    //adds a value and returns the mean of the current window, if full
    pub fn push(&mut self, value: f64) -> Option<f64> {
        self.same_run = match self.values.back() {
            Some(&last) if last == value => self.same_run + 1,
            _ => 1,
        };

        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.window {
            if let Some(leaving) = self.values.pop_front() {
                self.sum -= leaving;
            }
        }

        if self.values.len() < self.window {
            None
        } else if self.same_run >= self.window {
            Some(value)
        } else {
            Some(self.sum / self.window as f64)
        }
    }
}

//simple moving average of every prefix, none until `window` closes exist
//a zero window never produces a value
pub fn rolling_sma(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    match RollingMean::new(window) {
        Some(mut mean) => closes.iter().map(|&close| mean.push(close)).collect(),
        None => vec![None; closes.len()],
    }
}

//sign of the fast/slow spread on one bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Bearish,
    Neutral,
    Bullish,
}

impl Signal {
    //undefined averages count as no signal
    pub fn from_smas(fast: Option<f64>, slow: Option<f64>) -> Self {
        match (fast, slow) {
            (Some(fast), Some(slow)) if fast > slow => Signal::Bullish,
            (Some(fast), Some(slow)) if fast < slow => Signal::Bearish,
            _ => Signal::Neutral,
        }
    }

    pub fn value(&self) -> i8 {
        match self {
            Signal::Bearish => -1,
            Signal::Neutral => 0,
            Signal::Bullish => 1,
        }
    }
}

//first difference of the signal series, the first bar has no event
pub fn crossovers(signals: &[Signal]) -> Vec<i8> {
    let mut events = Vec::with_capacity(signals.len());
    let mut previous: Option<Signal> = None;

    for signal in signals {
        let event = match previous {
            Some(prev) => signal.value() - prev.value(),
            None => 0,
        };
        events.push(event);
        previous = Some(*signal);
    }

    events
}
