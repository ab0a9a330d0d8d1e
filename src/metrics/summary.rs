use crate::engine::execution::{ExitReason, TradeRecord};
use crate::metrics::timeseries::{max_drawdown, EquityPoint};
use indexmap::IndexMap;
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const UNDEFINED: &str = "undefined";

//count and mean pnl of the trades closed by one rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitReasonStats {
    pub count: usize,
    pub mean_pnl: f64,
}

//summary metrics for a backtest
//ratios that cannot be computed are none and print as undefined
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub initial_capital: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub cagr: Option<f64>,
    pub max_drawdown: f64,
    pub sharpe_ratio: Option<f64>,
    pub num_trades: usize,
    pub num_winning_trades: usize,
    pub num_losing_trades: usize,
    pub win_rate: Option<f64>,
    pub avg_win: f64,
    //magnitude of the mean losing pnl
    pub avg_loss: f64,
    pub expectancy: Option<f64>,
    pub largest_win: f64,
    pub largest_loss: f64,
    //sum of pnl after fees over closed trades
    pub total_net_pnl: f64,
    //mean calendar days held, zero without trades
    pub avg_holding_days: f64,
    pub total_fees: f64,
    pub exposure: f64,
    pub min_equity: f64,
    pub max_equity: f64,
    //buy and hold over the same bars
    pub benchmark_return: Option<f64>,
    pub exit_reasons: IndexMap<ExitReason, ExitReasonStats>,
}

impl SummaryMetrics {
    //calculate summary metrics from equity curve and trade log
    pub fn from_backtest(
        equity_curve: &[EquityPoint],
        trades: &[TradeRecord],
        initial_capital: f64,
    ) -> Self {
        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let total_return = (final_equity - initial_capital) / initial_capital;

        let cagr = calculate_cagr(equity_curve, initial_capital, final_equity);

        //the first point has no previous bar to return against
        let returns: Vec<f64> = equity_curve.iter().skip(1).map(|p| p.returns).collect();
        let sharpe = calculate_sharpe_ratio(&returns);

        let trade_stats = calculate_trade_statistics(trades);

        let exposure = if equity_curve.is_empty() {
            0.0
        } else {
            equity_curve.iter().filter(|p| p.invested).count() as f64 / equity_curve.len() as f64
        };

        let min_equity = equity_curve.iter().map(|p| p.equity).fold(final_equity, f64::min);
        let max_equity = equity_curve.iter().map(|p| p.equity).fold(final_equity, f64::max);

        SummaryMetrics {
            initial_capital,
            final_equity,
            total_return,
            cagr,
            max_drawdown: max_drawdown(equity_curve),
            sharpe_ratio: sharpe,
            num_trades: trade_stats.num_trades,
            num_winning_trades: trade_stats.num_winning_trades,
            num_losing_trades: trade_stats.num_losing_trades,
            win_rate: trade_stats.win_rate,
            avg_win: trade_stats.avg_win,
            avg_loss: trade_stats.avg_loss,
            expectancy: trade_stats.expectancy,
            largest_win: trade_stats.largest_win,
            largest_loss: trade_stats.largest_loss,
            total_net_pnl: trade_stats.total_net_pnl,
            avg_holding_days: trade_stats.avg_holding_days,
            total_fees: trades.iter().map(|t| t.fees).sum(),
            exposure,
            min_equity,
            max_equity,
            benchmark_return: None,
            exit_reasons: exit_reason_breakdown(trades),
        }
    }

    //attaches the buy and hold return between two closes
    pub fn with_benchmark(mut self, first_close: f64, last_close: f64) -> Self {
        self.benchmark_return = if first_close > 0.0 {
            Some(last_close / first_close - 1.0)
        } else {
            None
        };
        self
    }

    //builds the formatted metrics table
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();

        table.add_row(Row::new(vec![Cell::new("Metric"), Cell::new("Value")]));

        let rows: Vec<(&str, String)> = vec![
            ("Initial Capital", format!("{:.2}", self.initial_capital)),
            ("Final Equity", format!("{:.2}", self.final_equity)),
            ("Total Return", format_pct(Some(self.total_return))),
            ("CAGR", format_pct(self.cagr)),
            ("Max Drawdown", format_pct(Some(self.max_drawdown))),
            ("Sharpe Ratio", format_ratio(self.sharpe_ratio)),
            ("Buy & Hold Return", format_pct(self.benchmark_return)),
            ("Number of Trades", format!("{}", self.num_trades)),
            ("Win Rate", format_pct(self.win_rate)),
            ("Avg Win", format!("{:.2}", self.avg_win)),
            ("Avg Loss", format!("{:.2}", self.avg_loss)),
            ("Expectancy", format_money(self.expectancy)),
            ("Largest Win", format!("{:.2}", self.largest_win)),
            ("Largest Loss", format!("{:.2}", self.largest_loss)),
            ("Net PnL", format!("{:.2}", self.total_net_pnl)),
            ("Avg Holding Days", format!("{:.1}", self.avg_holding_days)),
            ("Total Fees", format!("{:.2}", self.total_fees)),
            ("Exposure", format_pct(Some(self.exposure))),
            ("Min Equity", format!("{:.2}", self.min_equity)),
            ("Max Equity", format!("{:.2}", self.max_equity)),
        ];

        for (name, value) in rows {
            table.add_row(Row::new(vec![Cell::new(name), Cell::new(&value)]));
        }

        for (reason, stats) in &self.exit_reasons {
            table.add_row(Row::new(vec![
                Cell::new(&format!("Exits: {}", reason)),
                Cell::new(&format!(
                    "{} trade(s), mean pnl {:.2}",
                    stats.count, stats.mean_pnl
                )),
            ]));
        }

        table
    }

    //prints metrics in a formatted table
    pub fn pretty_print_table(&self) {
        self.to_table().printstd();
    }
}

fn format_pct(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}%", v * 100.0))
        .unwrap_or_else(|| UNDEFINED.to_string())
}

fn format_ratio(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.3}", v))
        .unwrap_or_else(|| UNDEFINED.to_string())
}

fn format_money(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| UNDEFINED.to_string())
}

fn calculate_cagr(
    equity_curve: &[EquityPoint],
    initial_capital: f64,
    final_equity: f64,
) -> Option<f64> {
    let first = equity_curve.first()?;
    let last = equity_curve.last()?;
    let elapsed_days = (last.date - first.date).num_days();

    if elapsed_days <= 0 || initial_capital <= 0.0 {
        return None;
    }

    //final equity stays positive, so the ratio and its power are finite
    Some((final_equity / initial_capital).powf(365.0 / elapsed_days as f64) - 1.0)
}

struct TradeStats {
    num_trades: usize,
    num_winning_trades: usize,
    num_losing_trades: usize,
    win_rate: Option<f64>,
    avg_win: f64,
    avg_loss: f64,
    expectancy: Option<f64>,
    largest_win: f64,
    largest_loss: f64,
    total_net_pnl: f64,
    avg_holding_days: f64,
}

fn calculate_trade_statistics(trades: &[TradeRecord]) -> TradeStats {
    let winning_trades: Vec<f64> = trades.iter().filter(|t| t.is_win()).map(|t| t.pnl).collect();
    let losing_trades: Vec<f64> = trades.iter().filter(|t| t.is_loss()).map(|t| t.pnl).collect();

    let num_winning = winning_trades.len();
    let num_losing = losing_trades.len();
    let total = trades.len();

    let win_rate = if total > 0 {
        Some(num_winning as f64 / total as f64)
    } else {
        None
    };

    let avg_win = if num_winning > 0 {
        winning_trades.iter().sum::<f64>() / num_winning as f64
    } else {
        0.0
    };

    let avg_loss = if num_losing > 0 {
        (losing_trades.iter().sum::<f64>() / num_losing as f64).abs()
    } else {
        0.0
    };

    let expectancy = win_rate.map(|rate| rate * avg_win - (1.0 - rate) * avg_loss);

    let largest_win = winning_trades.iter().fold(0.0f64, |a, &b| a.max(b));
    let largest_loss = losing_trades.iter().fold(0.0f64, |a, &b| a.min(b));

    let total_net_pnl = trades.iter().map(|t| t.net_pnl()).sum::<f64>();
    let avg_holding_days = if total > 0 {
        trades.iter().map(|t| t.holding_days() as f64).sum::<f64>() / total as f64
    } else {
        0.0
    };

    TradeStats {
        num_trades: total,
        num_winning_trades: num_winning,
        num_losing_trades: num_losing,
        win_rate,
        avg_win,
        avg_loss,
        expectancy,
        largest_win,
        largest_loss,
        total_net_pnl,
        avg_holding_days,
    }
}

fn calculate_sharpe_ratio(returns: &[f64]) -> Option<f64> {
    //sample standard deviation needs at least two observations
    if returns.len() < 2 {
        return None;
    }

    let mean = returns.mean();
    let std_dev = returns.std_dev();

    if !std_dev.is_finite() || std_dev <= 0.0 {
        return None;
    }

    //simplified sharpe = mean / std_dev * sqrt(252)
    Some((mean / std_dev) * TRADING_DAYS_PER_YEAR.sqrt())
}

//groups trades by exit reason in order of first appearance
fn exit_reason_breakdown(trades: &[TradeRecord]) -> IndexMap<ExitReason, ExitReasonStats> {
    let mut totals: IndexMap<ExitReason, (usize, f64)> = IndexMap::new();

    for trade in trades {
        let entry = totals.entry(trade.exit_reason).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += trade.pnl;
    }

    totals
        .into_iter()
        .map(|(reason, (count, pnl))| {
            (
                reason,
                ExitReasonStats {
                    count,
                    mean_pnl: pnl / count as f64,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::timeseries::calculate_equity_curve;
    use chrono::{Duration, NaiveDate};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    fn curve(values: &[f64], step_days: i64) -> Vec<EquityPoint> {
        let marks = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                EquityPoint::mark(start() + Duration::days(i as i64 * step_days), v, v, false)
            })
            .collect();
        calculate_equity_curve(marks)
    }

    fn trade(pnl: f64, reason: ExitReason) -> TradeRecord {
        TradeRecord {
            entry_date: start(),
            exit_date: start() + Duration::days(5),
            entry_price: 100.0,
            exit_price: 100.0 + pnl,
            size: 1.0,
            pnl,
            fees: 0.1,
            exit_reason: reason,
        }
    }

    #[test]
    fn no_trades_leaves_win_rate_undefined() {
        let metrics = SummaryMetrics::from_backtest(&curve(&[1000.0; 10], 1), &[], 1000.0);

        assert_eq!(metrics.num_trades, 0);
        assert_eq!(metrics.win_rate, None);
        assert_eq!(metrics.expectancy, None);
        assert_eq!(metrics.avg_win, 0.0);
        assert_eq!(metrics.avg_loss, 0.0);
        assert_eq!(metrics.total_net_pnl, 0.0);
        assert_eq!(metrics.avg_holding_days, 0.0);
        assert_eq!(metrics.total_return, 0.0);
        assert!(metrics.exit_reasons.is_empty());
    }

    #[test]
    fn flat_equity_has_undefined_sharpe() {
        let metrics = SummaryMetrics::from_backtest(&curve(&[1000.0; 10], 1), &[], 1000.0);
        assert_eq!(metrics.sharpe_ratio, None);
        assert_eq!(metrics.max_drawdown, 0.0);
    }

    #[test]
    fn single_day_has_undefined_cagr() {
        let metrics = SummaryMetrics::from_backtest(&curve(&[1000.0], 1), &[], 1000.0);
        assert_eq!(metrics.cagr, None);
        assert_eq!(metrics.sharpe_ratio, None);
    }

    #[test]
    fn cagr_over_one_year() {
        //two points 365 days apart, equity up 10%
        let metrics = SummaryMetrics::from_backtest(&curve(&[1000.0, 1100.0], 365), &[], 1000.0);

        assert!((metrics.cagr.unwrap() - 0.1).abs() < 1e-9);
        assert!((metrics.total_return - 0.1).abs() < 1e-12);
    }

    #[test]
    fn sharpe_uses_sample_deviation_of_curve_returns() {
        let values = [100.0, 110.0, 99.0, 108.9];
        let points = curve(&values, 1);
        let metrics = SummaryMetrics::from_backtest(&points, &[], 100.0);

        //the leading zero return of the first bar is not an observation
        let returns = [0.1, -0.1, 0.1];
        for (point, r) in points[1..].iter().zip(returns) {
            assert!((point.returns - r).abs() < 1e-12);
        }
        let mean = 0.1 / 3.0;
        let var = returns.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / 2.0;
        let expected = mean / var.sqrt() * 252.0_f64.sqrt();

        assert!((metrics.sharpe_ratio.unwrap() - expected).abs() < 1e-6);
    }

    #[test]
    fn trade_statistics_and_expectancy() {
        let trades = vec![
            trade(30.0, ExitReason::MaExit),
            trade(-10.0, ExitReason::StopLoss),
            trade(10.0, ExitReason::MaExit),
            trade(-20.0, ExitReason::StopLoss),
        ];
        let metrics = SummaryMetrics::from_backtest(&curve(&[1000.0, 1010.0], 1), &trades, 1000.0);

        assert_eq!(metrics.num_trades, 4);
        assert_eq!(metrics.num_winning_trades, 2);
        assert_eq!(metrics.num_losing_trades, 2);
        assert_eq!(metrics.win_rate, Some(0.5));
        assert!((metrics.avg_win - 20.0).abs() < 1e-12);
        assert!((metrics.avg_loss - 15.0).abs() < 1e-12);
        assert!((metrics.expectancy.unwrap() - 2.5).abs() < 1e-12);
        assert_eq!(metrics.largest_win, 30.0);
        assert_eq!(metrics.largest_loss, -20.0);
        assert!((metrics.total_fees - 0.4).abs() < 1e-12);
        assert!((metrics.total_net_pnl - 9.6).abs() < 1e-12);
        assert_eq!(metrics.avg_holding_days, 5.0);
    }

    #[test]
    fn breakdown_groups_by_exit_reason() {
        let trades = vec![
            trade(-8.0, ExitReason::StopLoss),
            trade(12.0, ExitReason::MaExit),
            trade(-4.0, ExitReason::StopLoss),
        ];
        let metrics = SummaryMetrics::from_backtest(&curve(&[1000.0, 1000.0], 1), &trades, 1000.0);

        let reasons: Vec<ExitReason> = metrics.exit_reasons.keys().copied().collect();
        assert_eq!(reasons, vec![ExitReason::StopLoss, ExitReason::MaExit]);

        let stop = &metrics.exit_reasons[&ExitReason::StopLoss];
        assert_eq!(stop.count, 2);
        assert!((stop.mean_pnl - -6.0).abs() < 1e-12);
        assert_eq!(metrics.exit_reasons[&ExitReason::MaExit].count, 1);
    }

    #[test]
    fn exposure_counts_invested_bars() {
        let mut points = curve(&[1000.0, 1000.0, 1000.0, 1000.0], 1);
        points[1].invested = true;
        points[2].invested = true;

        let metrics = SummaryMetrics::from_backtest(&points, &[], 1000.0);
        assert_eq!(metrics.exposure, 0.5);
    }

    #[test]
    fn benchmark_and_table_render_undefined() {
        let metrics = SummaryMetrics::from_backtest(&curve(&[1000.0], 1), &[], 1000.0)
            .with_benchmark(50.0, 75.0);

        assert_eq!(metrics.benchmark_return, Some(0.5));

        let rendered = metrics.to_table().to_string();
        assert!(rendered.contains("Win Rate"));
        assert!(rendered.contains("Avg Holding Days"));
        assert!(rendered.contains("undefined"));
        assert!(rendered.contains("50.00%"));
    }
}
