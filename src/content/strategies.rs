//! Strategy hints shown after a wrong answer.
//!
//! Each fact gets every strategy that applies to it, most general first.
//! The learner can pin one as their preferred strategy on the fact.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::Fact;

/// Identifier stored as a fact's preferred strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    VisualArray,
    SkipCounting,
    OnesRule,
    FivesTrick,
    NinesTrick,
    TensTrick,
    Squares,
    UseNeighbor,
    BreakApart,
}

impl Strategy {
    pub const ALL: [Strategy; 9] = [
        Strategy::VisualArray,
        Strategy::SkipCounting,
        Strategy::OnesRule,
        Strategy::FivesTrick,
        Strategy::NinesTrick,
        Strategy::TensTrick,
        Strategy::Squares,
        Strategy::UseNeighbor,
        Strategy::BreakApart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VisualArray => "visual_array",
            Self::SkipCounting => "skip_counting",
            Self::OnesRule => "ones_rule",
            Self::FivesTrick => "fives_trick",
            Self::NinesTrick => "nines_trick",
            Self::TensTrick => "tens_trick",
            Self::Squares => "squares",
            Self::UseNeighbor => "use_neighbor",
            Self::BreakApart => "break_apart",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|strategy| strategy.as_str() == s)
    }
}

/// How a hint can be drawn alongside its steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visual {
    Array,
    NumberLine,
    Groups,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyHint {
    pub strategy: Strategy,
    pub name: &'static str,
    pub description: String,
    pub steps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual: Option<Visual>,
}

const ENCOURAGEMENT: [&str; 5] = [
    "Let me show you a trick!",
    "Here's a helpful way to think about it.",
    "No worries, let's figure this out together.",
    "Good try! Here's a strategy that might help.",
    "Let's look at this a different way.",
];

/// The factor that is not `n`, for facts involving `n`.
fn other_factor(fact: Fact, n: u8) -> u8 {
    if fact.a() == n { fact.b() } else { fact.a() }
}

/// All strategies that apply to `fact`.
pub fn strategies_for_fact(fact: Fact) -> Vec<StrategyHint> {
    let (a, b) = (fact.a(), fact.b());
    let mut hints = Vec::new();

    hints.push(StrategyHint {
        strategy: Strategy::VisualArray,
        name: "See It",
        description: format!("Picture {} rows with {} in each row", a, b),
        steps: vec![
            format!("Draw {} rows", a),
            format!("Put {} dots in each row", b),
            "Now count all the dots!".into(),
        ],
        visual: Some(Visual::Array),
    });

    if a <= 6 || b <= 6 {
        let skip_by = a.min(b);
        let times = a.max(b);
        let preview: Vec<String> = (1..=times.min(3))
            .map(|i| (skip_by as u32 * i as u32).to_string())
            .collect();
        hints.push(StrategyHint {
            strategy: Strategy::SkipCounting,
            name: "Skip Count",
            description: format!("Count by {}s, {} times", skip_by, times),
            steps: vec![
                format!("Start counting by {}s:", skip_by),
                format!("{}...", preview.join(", ")),
                format!("Keep going until you've counted {} numbers!", times),
            ],
            visual: None,
        });
    }

    if fact.involves(1) {
        hints.push(StrategyHint {
            strategy: Strategy::OnesRule,
            name: "Ones Rule",
            description: "Any number times 1 equals itself".into(),
            steps: vec![
                "When you multiply by 1, the number stays the same!".into(),
                format!("What is {} times 1?", other_factor(fact, 1)),
            ],
            visual: None,
        });
    }

    if fact.involves(5) {
        let other = other_factor(fact, 5);
        hints.push(StrategyHint {
            strategy: Strategy::FivesTrick,
            name: "Fives Trick",
            description: "Multiply by 10, then cut in half".into(),
            steps: vec![
                format!("First, what is {} × 10?", other),
                "Now cut that number in half!".into(),
            ],
            visual: None,
        });
    }

    if fact.involves(9) {
        let other = other_factor(fact, 9);
        hints.push(StrategyHint {
            strategy: Strategy::NinesTrick,
            name: "Nines Trick",
            description: "Multiply by 10, then subtract once".into(),
            steps: vec![
                format!("First, what is {} × 10?", other),
                format!("Now subtract {} from that!", other),
                format!("Tip: The tens digit is always one less than {}.", other),
            ],
            visual: None,
        });
    }

    if fact.involves(10) {
        hints.push(StrategyHint {
            strategy: Strategy::TensTrick,
            name: "Tens Trick",
            description: "Just add a zero!".into(),
            steps: vec![
                "When you multiply by 10, just add a zero to the end!".into(),
                format!(
                    "What do you get when you add a 0 after {}?",
                    other_factor(fact, 10)
                ),
            ],
            visual: None,
        });
    }

    if fact.is_square() {
        hints.push(StrategyHint {
            strategy: Strategy::Squares,
            name: "Square Number",
            description: format!("{} squared", a),
            steps: vec![
                format!("This is called \"{} squared\"", a),
                format!("Picture a square with {} on each side.", a),
                "How many squares in total?".into(),
            ],
            visual: Some(Visual::Array),
        });
    }

    if a > 2 && b > 2 {
        let neighbor = a - 1;
        hints.push(StrategyHint {
            strategy: Strategy::UseNeighbor,
            name: "Use a Neighbor",
            description: format!("Start from {} × {}, add {} more", neighbor, b, b),
            steps: vec![
                format!("Do you know {} × {}?", neighbor, b),
                format!("If so, just add one more group of {}!", b),
                format!("{} × {} + {} = ?", neighbor, b, b),
            ],
            visual: None,
        });
    }

    if a > 5 && b > 5 {
        let half = a / 2;
        let rest = a - half;
        hints.push(StrategyHint {
            strategy: Strategy::BreakApart,
            name: "Break Apart",
            description: format!("Split {} into {} + {}", a, half, rest),
            steps: vec![
                format!("First, figure out {} × {}", half, b),
                format!("Then, figure out {} × {}", rest, b),
                "Finally, add those two answers together!".into(),
            ],
            visual: Some(Visual::Groups),
        });
    }

    hints
}

/// The hint to show first: the learner's pinned strategy if it applies,
/// otherwise the first applicable one.
pub fn hint_for_fact(fact: Fact, preferred: Option<&str>) -> Option<StrategyHint> {
    let mut hints = strategies_for_fact(fact);
    let pinned = preferred
        .and_then(Strategy::from_str)
        .and_then(|s| hints.iter().position(|h| h.strategy == s));
    match pinned {
        Some(idx) => Some(hints.swap_remove(idx)),
        None => hints.into_iter().next(),
    }
}

pub fn encouraging_message<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    ENCOURAGEMENT.choose(rng).copied().unwrap_or(ENCOURAGEMENT[0])
}
