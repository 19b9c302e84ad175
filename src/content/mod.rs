//! Teaching content attached to facts.

pub mod strategies;

pub use strategies::{hint_for_fact, strategies_for_fact, Strategy, StrategyHint};
