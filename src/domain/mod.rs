pub mod attempt;
pub mod fact;
pub mod timestamp;

pub use attempt::{Attempt, AttemptWindow, InputMethod, DEFAULT_ATTEMPT_WINDOW};
pub use fact::{all_facts, generate_all_facts, is_factor, Confidence, Fact, FactState, FACT_COUNT, MAX_FACTOR, MIN_FACTOR};
