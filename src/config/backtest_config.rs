use crate::data::ValidationError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

//how exits are charged
//entries always pay transaction_cost_rate on the cash they invest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeePolicy {
    //exits are free, only the entry fee reduces capital
    #[default]
    EntryOnly,
    //every exit, stop-loss or crossover, pays the same rate on its proceeds
    EntryAndExit,
}

//parameters injected into the simulation
//risk_per_trade is validated but inert, every entry reinvests the full balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub initial_capital: f64,
    pub transaction_cost_rate: f64,
    pub stop_loss_pct: f64,
    pub risk_per_trade: f64,
    pub fast_window: usize,
    pub slow_window: usize,
    pub trend_window: usize,
    pub fee_policy: FeePolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            initial_capital: 100000.0,
            transaction_cost_rate: 0.001,
            stop_loss_pct: 0.08,
            risk_per_trade: 0.01,
            fast_window: 20,
            slow_window: 50,
            trend_window: 200,
            fee_policy: FeePolicy::EntryOnly,
        }
    }
}

impl SimulationConfig {
    //checks every bound before the engine accepts the config
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(ValidationError::InitialCapital(self.initial_capital));
        }

        if !(0.0..1.0).contains(&self.transaction_cost_rate) {
            return Err(ValidationError::TransactionCost(self.transaction_cost_rate));
        }

        if !(self.stop_loss_pct > 0.0 && self.stop_loss_pct < 1.0) {
            return Err(ValidationError::StopLoss(self.stop_loss_pct));
        }

        if !(self.risk_per_trade > 0.0 && self.risk_per_trade <= 1.0) {
            return Err(ValidationError::RiskPerTrade(self.risk_per_trade));
        }

        for (name, window) in [
            ("fast_window", self.fast_window),
            ("slow_window", self.slow_window),
            ("trend_window", self.trend_window),
        ] {
            if window == 0 {
                return Err(ValidationError::ZeroWindow { name });
            }
        }

        if self.fast_window >= self.slow_window {
            return Err(ValidationError::WindowOrder {
                fast: self.fast_window,
                slow: self.slow_window,
            });
        }

        Ok(())
    }

    //price at or below which an open long is stopped out
    pub fn stop_price(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 - self.stop_loss_pct)
    }
}

//complete run configuration, as stored in a json file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfiguration {
    //data
    pub data_path: PathBuf,
    pub symbol: String,

    //simulation parameters
    #[serde(default)]
    pub simulation: SimulationConfig,

    //optional output paths
    #[serde(default)]
    pub output_series_csv: Option<PathBuf>,
    #[serde(default)]
    pub output_trades_csv: Option<PathBuf>,
    #[serde(default)]
    pub output_report_json: Option<PathBuf>,
}

impl Default for BacktestConfiguration {
    fn default() -> Self {
        BacktestConfiguration {
            data_path: PathBuf::from("data.csv"),
            symbol: "SPY".to_string(),
            simulation: SimulationConfig::default(),
            output_series_csv: None,
            output_trades_csv: None,
            output_report_json: None,
        }
    }
}

impl BacktestConfiguration {
    //load configuration from a JSON file
    pub fn from_json_file(path: &PathBuf) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: BacktestConfiguration = serde_json::from_str(&contents)?;
        Ok(config)
    }

    //save configuration to a JSON file
    pub fn to_json_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
