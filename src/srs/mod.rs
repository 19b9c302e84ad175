pub mod choices;
pub mod classifier;
pub mod fact_selector;
pub mod mastery;
pub mod modality;

pub use choices::generate_choices;
pub use classifier::{classify, reclassify, WindowStats};
pub use fact_selector::{
  fact_difficulty, score_fact, select_next_fact, FactScore, RecentFacts, SchedulerContext,
};
pub use mastery::{is_table_mastered, mastered_tables};
pub use modality::{preferred_input_method, use_multiple_choice};
