use std::{collections::BTreeMap, path::Path};

use crate::frame::CandleFrame;

pub(crate) mod error;
mod random;

pub use random::RandomStrategy;

use error::StrategyError;

/// Trading decision produced by a strategy for the latest candle window.
///
/// Amounts are denominated in the base asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrategyAction {
    Buy { amount: f64 },
    Sell { amount: f64 },
    Hold,
}

/// Broad class of a strategy implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    RuleBased,
    Model,
}

/// Hyperparameter set passed to training and persisted by `save`/`load`.
pub type Hyperparams = BTreeMap<String, f64>;

/// A pluggable trading strategy over candle frames.
///
/// Implementations are registered by name in a [`StrategyRegistry`] at
/// process init; downstream training, inference, and backtesting
/// collaborate through this interface only.
pub trait Strategy: Send {
    fn kind(&self) -> StrategyKind;

    /// Number of candles of history [`action`] expects in its frame.
    ///
    /// [`action`]: Strategy::action
    fn inference_window(&self) -> usize;

    /// Default hyperparameters, doubling as the accepted-key schema.
    fn hyperparam_defaults(&self) -> Hyperparams;

    /// Decides an action from the latest [`inference_window`] candles.
    ///
    /// [`inference_window`]: Strategy::inference_window
    fn action(
        &self,
        frame: &CandleFrame,
        cash_balance: f64,
        coin_balance: f64,
    ) -> Result<StrategyAction, StrategyError>;

    fn train(&mut self, frame: &CandleFrame, hyperparams: Hyperparams)
    -> Result<(), StrategyError>;

    fn load(&mut self, path: &Path) -> Result<(), StrategyError>;

    fn save(&self, path: &Path) -> Result<(), StrategyError>;

    /// Optional natural-language rationale for the latest decision.
    fn explain(&self, frame: &CandleFrame) -> Option<String> {
        let _ = frame;
        None
    }
}

type StrategyConstructor = fn() -> Box<dyn Strategy>;

/// Explicit name-to-constructor registry of strategies.
///
/// Populated with a fixed set of constructors at process init and threaded
/// through the application context; there is no runtime discovery of
/// implementations.
pub struct StrategyRegistry {
    constructors: BTreeMap<&'static str, StrategyConstructor>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Registry pre-populated with the built-in strategies.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("random", || Box::new(RandomStrategy::new()));
        registry
    }

    /// Registers a constructor under `name`, replacing any previous one.
    pub fn register(&mut self, name: &'static str, constructor: StrategyConstructor) {
        self.constructors.insert(name, constructor);
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Strategy>, StrategyError> {
        self.constructors
            .get(name)
            .map(|constructor| constructor())
            .ok_or_else(|| StrategyError::UnknownStrategy {
                name: name.to_string(),
            })
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.constructors.keys().copied()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let registry = StrategyRegistry::with_builtins();

        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["random"]);

        let strategy = registry.create("random").expect("registered");
        assert_eq!(strategy.kind(), StrategyKind::RuleBased);
        assert_eq!(strategy.inference_window(), 1);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let registry = StrategyRegistry::with_builtins();

        assert!(matches!(
            registry.create("momentum"),
            Err(StrategyError::UnknownStrategy { name }) if name == "momentum"
        ));
    }

    #[test]
    fn registration_replaces_existing_constructor() {
        let mut registry = StrategyRegistry::new();
        registry.register("random", || Box::new(RandomStrategy::new()));
        registry.register("random", || {
            let mut strategy = RandomStrategy::new();
            let _ = strategy.train(&CandleFrame::new(), Hyperparams::new());
            Box::new(strategy)
        });

        assert_eq!(registry.names().count(), 1);
        assert!(registry.create("random").is_ok());
    }
}
