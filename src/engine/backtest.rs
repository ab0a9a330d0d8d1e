use crate::config::{FeePolicy, SimulationConfig};
use crate::data::{validate_series, Bar, ValidationError};
use crate::engine::execution::{ExitReason, TradeAction, TradeRecord};
use crate::metrics::{calculate_equity_curve, EquityPoint, SummaryMetrics};
use crate::portfolio::{Account, Position, PositionState};
use crate::strategy::sma_crossover::{IndicatorRow, SmaCrossoverStrategy};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

//one row of the enriched output series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedBar {
    pub date: NaiveDate,
    pub close: f64,
    pub sma_fast: Option<f64>,
    pub sma_slow: Option<f64>,
    pub sma_trend: Option<f64>,
    pub signal: i8,
    pub crossover: i8,
    pub position_state: PositionState,
    pub trade_action: TradeAction,
    pub exit_reason: Option<ExitReason>,
    pub trade_pnl: Option<f64>,
    pub cash: f64,
    pub equity: f64,
    pub drawdown: f64,
}

//result of a backtest
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub summary: SummaryMetrics,
    pub series: Vec<EnrichedBar>,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
    //state after the last bar, a position still open here has no trade record
    pub final_account: Account,
}

//outcome of applying one bar to the account
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub account: Account,
    pub action: TradeAction,
    pub trade: Option<TradeRecord>,
}

impl Transition {
    fn hold(account: Account) -> Self {
        Transition {
            account,
            action: TradeAction::Hold,
            trade: None,
        }
    }

    fn exit(account: Account, trade: Option<TradeRecord>) -> Self {
        Transition {
            account,
            action: TradeAction::Sell,
            trade,
        }
    }
}

//applies one bar to the account
//first matching rule consumes the bar: stop-loss, then crossover exit when long, entry when flat
//a stop-loss exit never re-enters on the same bar
pub fn step(account: Account, row: &IndicatorRow, config: &SimulationConfig) -> Transition {
    let exit_fee_rate = match config.fee_policy {
        FeePolicy::EntryOnly => 0.0,
        FeePolicy::EntryAndExit => config.transaction_cost_rate,
    };

    match account.position {
        Position::Long { entry_price, .. } => {
            if row.close <= config.stop_price(entry_price) {
                let (account, trade) =
                    account.exit_long(row.date, row.close, exit_fee_rate, ExitReason::StopLoss);
                return Transition::exit(account, trade);
            }

            if row.is_exit() {
                let (account, trade) =
                    account.exit_long(row.date, row.close, exit_fee_rate, ExitReason::MaExit);
                return Transition::exit(account, trade);
            }

            Transition::hold(account)
        }
        Position::Flat => {
            if row.is_entry() {
                return Transition {
                    account: account.enter_long(row.date, row.close, config.transaction_cost_rate),
                    action: TradeAction::Buy,
                    trade: None,
                };
            }

            Transition::hold(account)
        }
    }
}

//main backtest engine
pub struct BacktestEngine {
    config: SimulationConfig,
    strategy: SmaCrossoverStrategy,
}

impl BacktestEngine {
    //creates a new backtest engine, rejecting an invalid config
    pub fn new(config: SimulationConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        let strategy = SmaCrossoverStrategy::from_config(&config);

        Ok(BacktestEngine { config, strategy })
    }

    //runs the simulation over a validated series
    pub fn run(&self, bars: &[Bar]) -> Result<BacktestResult, ValidationError> {
        validate_series(bars)?;

        info!(
            bars = bars.len(),
            strategy = %self.strategy.name(),
            initial_capital = self.config.initial_capital,
            "starting backtest"
        );

        let rows = self.strategy.compute(bars);

        let mut account = Account::new(self.config.initial_capital);
        let mut marks = Vec::with_capacity(rows.len());
        let mut outcomes = Vec::with_capacity(rows.len());
        let mut trades = Vec::new();

        //strictly ordered fold, bar i only sees the state left by bar i-1
        for row in &rows {
            let transition = step(account, row, &self.config);
            account = transition.account;

            match transition.action {
                TradeAction::Buy => debug!(
                    date = %row.date,
                    price = row.close,
                    size = account.position.size(),
                    cash = account.cash,
                    "entered long"
                ),
                TradeAction::Sell => {
                    if let Some(trade) = &transition.trade {
                        debug!(
                            date = %row.date,
                            price = row.close,
                            pnl = trade.pnl,
                            reason = %trade.exit_reason,
                            "exited long"
                        );
                    }
                }
                TradeAction::Hold => {}
            }

            let equity = account.equity(row.close);
            debug_assert!(equity > 0.0, "equity must stay positive, got {equity}");

            marks.push(EquityPoint::mark(
                row.date,
                account.cash,
                equity,
                account.position.is_long(),
            ));
            outcomes.push((
                account.position.state(),
                transition.action,
                transition.trade.as_ref().map(|t| (t.exit_reason, t.pnl)),
            ));

            if let Some(trade) = transition.trade {
                trades.push(trade);
            }
        }

        let equity_curve = calculate_equity_curve(marks);

        let series = rows
            .iter()
            .zip(outcomes)
            .zip(equity_curve.iter())
            .map(|((row, (state, action, closed)), point)| EnrichedBar {
                date: row.date,
                close: row.close,
                sma_fast: row.sma_fast,
                sma_slow: row.sma_slow,
                sma_trend: row.sma_trend,
                signal: row.signal.value(),
                crossover: row.crossover,
                position_state: state,
                trade_action: action,
                exit_reason: closed.map(|(reason, _)| reason),
                trade_pnl: closed.map(|(_, pnl)| pnl),
                cash: point.cash,
                equity: point.equity,
                drawdown: point.drawdown,
            })
            .collect();

        let mut summary =
            SummaryMetrics::from_backtest(&equity_curve, &trades, self.config.initial_capital);
        if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
            summary = summary.with_benchmark(first.close, last.close);
        }

        info!(
            trades = trades.len(),
            final_equity = summary.final_equity,
            "backtest finished"
        );

        Ok(BacktestResult {
            summary,
            series,
            equity_curve,
            trades,
            final_account: account,
        })
    }

    //returns a reference to the config
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    //returns a reference to the strategy
    pub fn strategy(&self) -> &SmaCrossoverStrategy {
        &self.strategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{Signal, BEARISH_CROSSOVER, BULLISH_CROSSOVER};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn row(d: u32, close: f64, crossover: i8, trend: Option<f64>) -> IndicatorRow {
        IndicatorRow {
            date: day(d),
            close,
            sma_fast: Some(close),
            sma_slow: Some(close),
            sma_trend: trend,
            signal: Signal::Neutral,
            crossover,
        }
    }

    fn config() -> SimulationConfig {
        SimulationConfig::default()
    }

    fn long_at(price: f64) -> Account {
        Account::new(10000.0).enter_long(day(1), price, 0.001)
    }

    #[test]
    fn bullish_crossover_above_trend_enters() {
        let t = step(
            Account::new(10000.0),
            &row(2, 100.0, BULLISH_CROSSOVER, Some(90.0)),
            &config(),
        );

        assert_eq!(t.action, TradeAction::Buy);
        assert!(t.account.position.is_long());
        //10000 less the 10 fee, all of it at 100
        assert!((t.account.position.size() - 99.9).abs() < 1e-9);
        assert_eq!(t.account.cash, 0.0);
        assert!(t.trade.is_none());
    }

    #[test]
    fn no_entry_without_trend_average() {
        let t = step(
            Account::new(10000.0),
            &row(2, 100.0, BULLISH_CROSSOVER, None),
            &config(),
        );
        assert_eq!(t.action, TradeAction::Hold);
        assert!(t.account.position.is_flat());
    }

    #[test]
    fn stop_loss_beats_crossover_and_blocks_reentry() {
        //long from 100, close through the 8% stop with a bullish crossover on the same bar
        let t = step(
            long_at(100.0),
            &row(5, 91.5, BULLISH_CROSSOVER, Some(50.0)),
            &config(),
        );

        assert_eq!(t.action, TradeAction::Sell);
        assert!(t.account.position.is_flat());
        let trade = t.trade.unwrap();
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert!((trade.pnl - (91.5 - 100.0) * trade.size).abs() < 1e-9);
    }

    #[test]
    fn stop_loss_beats_bearish_crossover() {
        let t = step(
            long_at(100.0),
            &row(5, 80.0, BEARISH_CROSSOVER, Some(50.0)),
            &config(),
        );
        assert_eq!(t.trade.unwrap().exit_reason, ExitReason::StopLoss);
    }

    #[test]
    fn bearish_crossover_exits_above_stop() {
        let t = step(
            long_at(100.0),
            &row(5, 97.0, BEARISH_CROSSOVER, Some(50.0)),
            &config(),
        );

        let trade = t.trade.unwrap();
        assert_eq!(trade.exit_reason, ExitReason::MaExit);
        assert_eq!(trade.exit_price, 97.0);
        //entry-only fees: cash is the full proceeds
        assert!((t.account.cash - 97.0 * 99.9).abs() < 1e-6);
    }

    #[test]
    fn exit_fee_policy_applies_to_both_exits() {
        let config = SimulationConfig {
            fee_policy: FeePolicy::EntryAndExit,
            ..SimulationConfig::default()
        };

        let stop = step(long_at(100.0), &row(5, 90.0, 0, None), &config);
        let cross = step(long_at(100.0), &row(5, 99.0, BEARISH_CROSSOVER, None), &config);

        assert!((stop.account.cash - 90.0 * 99.9 * 0.999).abs() < 1e-6);
        assert!((cross.account.cash - 99.0 * 99.9 * 0.999).abs() < 1e-6);
    }

    #[test]
    fn large_fees_on_a_collapse_leave_cash_positive() {
        let config = SimulationConfig {
            transaction_cost_rate: 0.5,
            fee_policy: FeePolicy::EntryAndExit,
            ..SimulationConfig::default()
        };

        let entered = step(
            Account::new(1000.0),
            &row(2, 100.0, BULLISH_CROSSOVER, Some(90.0)),
            &config,
        );
        assert_eq!(entered.account.cash, 0.0);
        assert!((entered.account.position.size() - 5.0).abs() < 1e-12);

        //proceeds 200, exit fee 100
        let stopped = step(entered.account, &row(3, 40.0, 0, Some(90.0)), &config);
        let trade = stopped.trade.unwrap();
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert!((trade.fees - 600.0).abs() < 1e-9);
        assert!((stopped.account.cash - 100.0).abs() < 1e-9);
        assert!(stopped.account.equity(40.0) > 0.0);
    }

    #[test]
    fn signals_without_matching_state_are_ignored() {
        //bearish crossover while flat
        let flat = step(
            Account::new(10000.0),
            &row(3, 100.0, BEARISH_CROSSOVER, Some(90.0)),
            &config(),
        );
        assert_eq!(flat.action, TradeAction::Hold);

        //bullish crossover while long, above the stop
        let long = long_at(100.0);
        let again = step(long, &row(3, 101.0, BULLISH_CROSSOVER, Some(90.0)), &config());
        assert_eq!(again.action, TradeAction::Hold);
        assert_eq!(again.account, long);
    }

    #[test]
    fn collapse_far_below_the_fee_keeps_equity_positive() {
        //tight windows so the entry happens early, then the price nearly vanishes
        let config = SimulationConfig {
            fast_window: 2,
            slow_window: 3,
            trend_window: 4,
            ..SimulationConfig::default()
        };
        let engine = BacktestEngine::new(config).unwrap();
        let closes = [10.0, 9.0, 8.0, 7.0, 6.0, 9.0, 12.0, 0.005, 0.005];
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new_unchecked(day(i as u32 + 1), c))
            .collect();

        let result = engine.run(&bars).unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_eq!(trade.exit_price, 0.005);
        for point in &result.equity_curve {
            assert!(point.cash >= 0.0);
            assert!(point.equity > 0.0);
        }
        assert_eq!(trade.entry_price, 9.0);
        assert!((result.final_account.cash - trade.size * 0.005).abs() < 1e-12);
        assert!((result.summary.final_equity - 55.5).abs() < 1e-9);
        assert!(result.summary.cagr.unwrap() >= -1.0);
    }

    #[test]
    fn engine_rejects_bad_input_before_simulating() {
        let engine = BacktestEngine::new(config()).unwrap();
        let bars = vec![
            Bar::new_unchecked(day(2), 10.0),
            Bar::new_unchecked(day(2), 11.0),
        ];

        assert!(matches!(
            engine.run(&bars),
            Err(ValidationError::DuplicateDate { .. })
        ));
        assert!(matches!(engine.run(&[]), Err(ValidationError::EmptySeries)));
    }

    #[test]
    fn engine_rejects_bad_config() {
        let config = SimulationConfig {
            stop_loss_pct: 1.5,
            ..SimulationConfig::default()
        };
        assert!(BacktestEngine::new(config).is_err());
    }

    #[test]
    fn warm_up_bars_are_cash_only() {
        let engine = BacktestEngine::new(config()).unwrap();
        let bars: Vec<Bar> = (1..=10)
            .map(|d| Bar::new_unchecked(day(d), 100.0 + d as f64))
            .collect();
        let result = engine.run(&bars).unwrap();

        assert_eq!(result.series.len(), 10);
        for point in &result.equity_curve {
            assert_eq!(point.equity, 100000.0);
            assert_eq!(point.cash, 100000.0);
        }
        assert!(result.series.iter().all(|b| b.sma_slow.is_none()));
    }
}
