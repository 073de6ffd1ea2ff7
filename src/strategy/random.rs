use std::{fs, path::Path};

use rand::Rng;

use crate::frame::CandleFrame;

use super::{Hyperparams, Strategy, StrategyAction, StrategyKind, error::StrategyError};

/// Rule-based baseline that buys or sells with configured probabilities.
///
/// Buys commit 90% of the cash balance at the latest close; sells liquidate
/// the full coin balance. Useful as a control when evaluating real
/// strategies.
pub struct RandomStrategy {
    hyperparams: Hyperparams,
}

impl RandomStrategy {
    pub const DEFAULT_BUY_PROB: f64 = 0.3;
    pub const DEFAULT_SELL_PROB: f64 = 0.3;

    pub fn new() -> Self {
        Self {
            hyperparams: Hyperparams::new(),
        }
    }

    fn buy_prob(&self) -> f64 {
        self.hyperparams
            .get("buy_prob")
            .copied()
            .unwrap_or(Self::DEFAULT_BUY_PROB)
    }

    fn sell_prob(&self) -> f64 {
        self.hyperparams
            .get("sell_prob")
            .copied()
            .unwrap_or(Self::DEFAULT_SELL_PROB)
    }
}

impl Default for RandomStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for RandomStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RuleBased
    }

    fn inference_window(&self) -> usize {
        1
    }

    fn hyperparam_defaults(&self) -> Hyperparams {
        Hyperparams::from([
            ("buy_prob".to_string(), Self::DEFAULT_BUY_PROB),
            ("sell_prob".to_string(), Self::DEFAULT_SELL_PROB),
        ])
    }

    fn action(
        &self,
        frame: &CandleFrame,
        cash_balance: f64,
        coin_balance: f64,
    ) -> Result<StrategyAction, StrategyError> {
        let latest = frame.last().ok_or(StrategyError::EmptyFrame)?;

        let roll: f64 = rand::rng().random();

        let action = if roll < self.buy_prob() {
            StrategyAction::Buy {
                amount: (cash_balance / latest.close) * 0.9,
            }
        } else if roll < self.buy_prob() + self.sell_prob() {
            StrategyAction::Sell {
                amount: coin_balance,
            }
        } else {
            StrategyAction::Hold
        };

        Ok(action)
    }

    fn train(
        &mut self,
        _frame: &CandleFrame,
        hyperparams: Hyperparams,
    ) -> Result<(), StrategyError> {
        self.hyperparams = hyperparams;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<(), StrategyError> {
        let raw = fs::read_to_string(path)?;
        self.hyperparams = serde_json::from_str(&raw)?;
        Ok(())
    }

    fn save(&self, path: &Path) -> Result<(), StrategyError> {
        let raw = serde_json::to_string(&self.hyperparams)?;
        fs::write(path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::db::models::CandleRow;

    use super::*;

    fn one_candle_frame(price: f64) -> CandleFrame {
        CandleFrame::from_rows(vec![CandleRow::new_flat(Utc::now(), price, 1.0)])
    }

    #[test]
    fn empty_frame_is_rejected() {
        let strategy = RandomStrategy::new();

        assert!(matches!(
            strategy.action(&CandleFrame::new(), 1000.0, 0.0),
            Err(StrategyError::EmptyFrame)
        ));
    }

    #[test]
    fn certain_buy_sizes_against_latest_close() {
        let mut strategy = RandomStrategy::new();
        strategy
            .train(
                &CandleFrame::new(),
                Hyperparams::from([("buy_prob".to_string(), 1.0), ("sell_prob".to_string(), 0.0)]),
            )
            .unwrap();

        let action = strategy
            .action(&one_candle_frame(100.0), 1000.0, 0.0)
            .unwrap();

        assert_eq!(action, StrategyAction::Buy { amount: 9.0 });
    }

    #[test]
    fn certain_sell_liquidates_coin_balance() {
        let mut strategy = RandomStrategy::new();
        strategy
            .train(
                &CandleFrame::new(),
                Hyperparams::from([("buy_prob".to_string(), 0.0), ("sell_prob".to_string(), 1.0)]),
            )
            .unwrap();

        let action = strategy
            .action(&one_candle_frame(100.0), 0.0, 2.5)
            .unwrap();

        assert_eq!(action, StrategyAction::Sell { amount: 2.5 });
    }

    #[test]
    fn hyperparams_round_trip_through_disk() {
        let mut strategy = RandomStrategy::new();
        strategy
            .train(
                &CandleFrame::new(),
                Hyperparams::from([("buy_prob".to_string(), 0.7)]),
            )
            .unwrap();

        let path = std::env::temp_dir().join(format!(
            "candlerack-strategy-{}.json",
            std::process::id()
        ));
        strategy.save(&path).unwrap();

        let mut restored = RandomStrategy::new();
        restored.load(&path).unwrap();
        assert_eq!(restored.buy_prob(), 0.7);

        let _ = std::fs::remove_file(&path);
    }
}
