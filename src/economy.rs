//! Per-faction treasury and income tracking.

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Treasury plus a rolling income/expense window.
///
/// Credits and debits are unconditional. Callers that must not overdraw (trade
/// purchases, ship replacement) check [`Ledger::can_afford`] first; payouts and
/// losses may push the balance below zero.
#[derive(Clone, Debug, PartialEq)]
pub struct Ledger {
    pub treasury: f64,
    pub income: f64,
    pub expenses: f64,
    pub income_rate: f64,
    pub expense_rate: f64,
    pub window_started_at: f64,
}

impl Ledger {
    pub fn new(treasury: f64, now: f64) -> Self {
        Self {
            treasury,
            income: 0.0,
            expenses: 0.0,
            income_rate: 0.0,
            expense_rate: 0.0,
            window_started_at: now,
        }
    }

    pub fn credit(&mut self, amount: f64) {
        if amount <= 0.0 || !amount.is_finite() {
            return;
        }
        self.treasury += amount;
        self.income += amount;
    }

    pub fn debit(&mut self, amount: f64) {
        if amount <= 0.0 || !amount.is_finite() {
            return;
        }
        self.treasury -= amount;
        self.expenses += amount;
    }

    pub fn can_afford(&self, amount: f64, reserve: f64) -> bool {
        self.treasury - amount >= reserve
    }

    /// Projects the current window totals to per-hour rates.
    pub fn refresh_rates(&mut self, now: f64) {
        let elapsed_hours = (now - self.window_started_at) / SECONDS_PER_HOUR;
        if elapsed_hours <= 0.0 {
            self.income_rate = 0.0;
            self.expense_rate = 0.0;
            return;
        }
        self.income_rate = self.income / elapsed_hours;
        self.expense_rate = self.expenses / elapsed_hours;
    }

    /// Closes the window. Rates keep their last projection until the next refresh.
    pub fn reset_window(&mut self, now: f64) {
        self.refresh_rates(now);
        self.income = 0.0;
        self.expenses = 0.0;
        self.window_started_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::Ledger;

    #[test]
    fn credit_and_debit_track_window_totals() {
        let mut ledger = Ledger::new(1000.0, 0.0);
        ledger.credit(250.0);
        ledger.debit(100.0);
        assert_eq!(ledger.treasury, 1150.0);
        assert_eq!(ledger.income, 250.0);
        assert_eq!(ledger.expenses, 100.0);
    }

    #[test]
    fn debit_can_go_negative() {
        let mut ledger = Ledger::new(50.0, 0.0);
        ledger.debit(80.0);
        assert_eq!(ledger.treasury, -30.0);
    }

    #[test]
    fn non_positive_amounts_are_ignored() {
        let mut ledger = Ledger::new(10.0, 0.0);
        ledger.credit(-5.0);
        ledger.debit(0.0);
        ledger.credit(f64::NAN);
        assert_eq!(ledger.treasury, 10.0);
        assert_eq!(ledger.income, 0.0);
    }

    #[test]
    fn can_afford_respects_reserve() {
        let ledger = Ledger::new(10_000.0, 0.0);
        assert!(ledger.can_afford(5_000.0, 5_000.0));
        assert!(!ledger.can_afford(5_001.0, 5_000.0));
    }

    #[test]
    fn rates_project_to_hourly() {
        let mut ledger = Ledger::new(0.0, 0.0);
        ledger.credit(500.0);
        ledger.debit(100.0);
        ledger.refresh_rates(1800.0);
        assert_eq!(ledger.income_rate, 1000.0);
        assert_eq!(ledger.expense_rate, 200.0);
    }

    #[test]
    fn rates_zero_without_elapsed_time() {
        let mut ledger = Ledger::new(0.0, 100.0);
        ledger.credit(500.0);
        ledger.refresh_rates(100.0);
        assert_eq!(ledger.income_rate, 0.0);
    }

    #[test]
    fn reset_window_clears_totals_and_keeps_rates() {
        let mut ledger = Ledger::new(0.0, 0.0);
        ledger.credit(360.0);
        ledger.reset_window(3600.0);
        assert_eq!(ledger.income, 0.0);
        assert_eq!(ledger.income_rate, 360.0);
        assert_eq!(ledger.window_started_at, 3600.0);
    }
}
