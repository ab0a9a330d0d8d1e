use crate::config::SimulationConfig;
use crate::data::Bar;
use crate::strategy::{crossovers, rolling_sma, Signal, BEARISH_CROSSOVER, BULLISH_CROSSOVER};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

//indicator values derived for one bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub date: NaiveDate,
    pub close: f64,
    pub sma_fast: Option<f64>,
    pub sma_slow: Option<f64>,
    pub sma_trend: Option<f64>,
    pub signal: Signal,
    pub crossover: i8,
}

impl IndicatorRow {
    //bullish crossover confirmed by the close sitting above the trend average
    //bars before the trend average exists can never qualify
    pub fn is_entry(&self) -> bool {
        self.crossover == BULLISH_CROSSOVER
            && self.sma_trend.map_or(false, |trend| self.close > trend)
    }

    //bearish crossover
    pub fn is_exit(&self) -> bool {
        self.crossover == BEARISH_CROSSOVER
    }
}

//sma crossover with a long-window trend filter
//long when fast sma crosses above slow sma and price is above the trend sma
//flat when fast sma crosses back below slow sma
#[derive(Debug, Clone, PartialEq)]
pub struct SmaCrossoverStrategy {
    fast_window: usize,
    slow_window: usize,
    trend_window: usize,
}

impl SmaCrossoverStrategy {
    pub fn new(fast_window: usize, slow_window: usize, trend_window: usize) -> Self {
        SmaCrossoverStrategy {
            fast_window,
            slow_window,
            trend_window,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.fast_window, config.slow_window, config.trend_window)
    }

    //derives averages, signal and crossover for every bar
    pub fn compute(&self, bars: &[Bar]) -> Vec<IndicatorRow> {
        let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();

        //the three averages are independent scans over the same closes
        let (sma_fast, (sma_slow, sma_trend)) = rayon::join(
            || rolling_sma(&closes, self.fast_window),
            || {
                rayon::join(
                    || rolling_sma(&closes, self.slow_window),
                    || rolling_sma(&closes, self.trend_window),
                )
            },
        );

        let signals: Vec<Signal> = sma_fast
            .iter()
            .zip(sma_slow.iter())
            .map(|(&fast, &slow)| Signal::from_smas(fast, slow))
            .collect();
        let events = crossovers(&signals);

        bars.iter()
            .enumerate()
            .map(|(i, bar)| IndicatorRow {
                date: bar.date,
                close: bar.close,
                sma_fast: sma_fast[i],
                sma_slow: sma_slow[i],
                sma_trend: sma_trend[i],
                signal: signals[i],
                crossover: events[i],
            })
            .collect()
    }

    pub fn name(&self) -> String {
        format!(
            "SMA Crossover ({}/{}, trend {})",
            self.fast_window, self.slow_window, self.trend_window
        )
    }
}
