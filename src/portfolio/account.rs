use crate::engine::execution::{ExitReason, TradeRecord};
use crate::portfolio::position::Position;
use chrono::NaiveDate;

//simulation state carried from one bar to the next
//cash is never negative: entries invest the balance left after the fee
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Account {
    pub cash: f64,
    pub position: Position,
    //fee paid when the open position was entered
    entry_fee: f64,
}

impl Account {
    //creates a flat account holding only cash
    pub fn new(initial_capital: f64) -> Self {
        Account {
            cash: initial_capital,
            position: Position::Flat,
            entry_fee: 0.0,
        }
    }

    //mark-to-market value at the given close
    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.position.market_value(price)
    }

    //pays fee_rate on the cash balance and buys with everything that is left
    //a no-op unless flat
    pub fn enter_long(self, date: NaiveDate, price: f64, fee_rate: f64) -> Account {
        if self.position.is_long() {
            return self;
        }

        let fee = self.cash * fee_rate;
        let size = (self.cash - fee) / price;

        Account {
            //fully invested, the division residue is not carried
            cash: 0.0,
            position: Position::Long {
                entry_date: date,
                entry_price: price,
                size,
            },
            entry_fee: fee,
        }
    }

    //sells the whole position, paying exit_fee_rate on the proceeds
    //returns the flat account and the closed trade, none if already flat
    pub fn exit_long(
        self,
        date: NaiveDate,
        price: f64,
        exit_fee_rate: f64,
        reason: ExitReason,
    ) -> (Account, Option<TradeRecord>) {
        let Position::Long {
            entry_date,
            entry_price,
            size,
        } = self.position
        else {
            return (self, None);
        };

        let proceeds = size * price;
        let exit_fee = proceeds * exit_fee_rate;

        let trade = TradeRecord {
            entry_date,
            exit_date: date,
            entry_price,
            exit_price: price,
            size,
            pnl: (price - entry_price) * size,
            fees: self.entry_fee + exit_fee,
            exit_reason: reason,
        };

        let account = Account {
            cash: self.cash + proceeds - exit_fee,
            position: Position::Flat,
            entry_fee: 0.0,
        };

        (account, Some(trade))
    }
}
