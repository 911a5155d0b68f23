//! Badge catalogue and progress evaluation.

use serde::Serialize;

/// Counters the badge catalogue is evaluated against.
#[derive(Debug, Clone, Default)]
pub struct BadgeInputs {
    pub books_read: u32,
    pub longest_book_read: i64,
    pub longest_streak: u32,
    pub ratings_given: u32,
    pub quotes_saved: u32,
    pub words_saved: u32,
    pub genres_read: u32,
    pub goals_achieved: u32,
    pub series_completed: u32,
}

/// Which counter a badge measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metric {
    BooksRead,
    LongestBook,
    Streak,
    Ratings,
    Quotes,
    Words,
    Genres,
    Goals,
    Series,
}

impl Metric {
    fn value(self, inputs: &BadgeInputs) -> u64 {
        match self {
            Self::BooksRead => inputs.books_read as u64,
            Self::LongestBook => inputs.longest_book_read.max(0) as u64,
            Self::Streak => inputs.longest_streak as u64,
            Self::Ratings => inputs.ratings_given as u64,
            Self::Quotes => inputs.quotes_saved as u64,
            Self::Words => inputs.words_saved as u64,
            Self::Genres => inputs.genres_read as u64,
            Self::Goals => inputs.goals_achieved as u64,
            Self::Series => inputs.series_completed as u64,
        }
    }
}

struct BadgeDef {
    key: &'static str,
    name: &'static str,
    description: &'static str,
    metric: Metric,
    threshold: u64,
}

const CATALOGUE: &[BadgeDef] = &[
    BadgeDef {
        key: "first_book",
        name: "First Chapter",
        description: "Finish your first book",
        metric: Metric::BooksRead,
        threshold: 1,
    },
    BadgeDef {
        key: "bookworm",
        name: "Bookworm",
        description: "Finish 10 books",
        metric: Metric::BooksRead,
        threshold: 10,
    },
    BadgeDef {
        key: "bibliophile",
        name: "Bibliophile",
        description: "Finish 50 books",
        metric: Metric::BooksRead,
        threshold: 50,
    },
    BadgeDef {
        key: "centurion",
        name: "Centurion",
        description: "Finish 100 books",
        metric: Metric::BooksRead,
        threshold: 100,
    },
    BadgeDef {
        key: "doorstopper",
        name: "Doorstopper",
        description: "Finish a book of 1000 pages or more",
        metric: Metric::LongestBook,
        threshold: 1000,
    },
    BadgeDef {
        key: "streak_7",
        name: "Week of Pages",
        description: "Read 7 days in a row",
        metric: Metric::Streak,
        threshold: 7,
    },
    BadgeDef {
        key: "streak_30",
        name: "Month of Pages",
        description: "Read 30 days in a row",
        metric: Metric::Streak,
        threshold: 30,
    },
    BadgeDef {
        key: "critic",
        name: "Critic",
        description: "Rate 25 books",
        metric: Metric::Ratings,
        threshold: 25,
    },
    BadgeDef {
        key: "collector",
        name: "Quote Collector",
        description: "Save 10 quotes",
        metric: Metric::Quotes,
        threshold: 10,
    },
    BadgeDef {
        key: "lexicographer",
        name: "Lexicographer",
        description: "Add 25 words to your lexicon",
        metric: Metric::Words,
        threshold: 25,
    },
    BadgeDef {
        key: "explorer",
        name: "Genre Explorer",
        description: "Read books from 5 different genres",
        metric: Metric::Genres,
        threshold: 5,
    },
    BadgeDef {
        key: "goal_getter",
        name: "Goal Getter",
        description: "Reach a yearly reading goal",
        metric: Metric::Goals,
        threshold: 1,
    },
    BadgeDef {
        key: "completionist",
        name: "Completionist",
        description: "Complete 3 series",
        metric: Metric::Series,
        threshold: 3,
    },
];

/// A badge with the user's progress towards it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct BadgeProgress {
    pub key: String,
    pub name: String,
    pub description: String,
    pub earned: bool,
    /// Current value, capped at the threshold.
    pub progress: u64,
    pub threshold: u64,
}

/// Evaluate every badge in the catalogue, in catalogue order.
pub fn evaluate(inputs: &BadgeInputs) -> Vec<BadgeProgress> {
    CATALOGUE
        .iter()
        .map(|def| {
            let value = def.metric.value(inputs);
            BadgeProgress {
                key: def.key.to_string(),
                name: def.name.to_string(),
                description: def.description.to_string(),
                earned: value >= def.threshold,
                progress: value.min(def.threshold),
                threshold: def.threshold,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(badges: &'a [BadgeProgress], key: &str) -> &'a BadgeProgress {
        badges.iter().find(|b| b.key == key).unwrap()
    }

    #[test]
    fn nothing_earned_for_new_user() {
        let badges = evaluate(&BadgeInputs::default());
        assert_eq!(badges.len(), CATALOGUE.len());
        assert!(badges.iter().all(|b| !b.earned && b.progress == 0));
    }

    #[test]
    fn thresholds_and_caps() {
        let inputs = BadgeInputs {
            books_read: 12,
            longest_book_read: 1200,
            longest_streak: 9,
            ..Default::default()
        };
        let badges = evaluate(&inputs);
        assert!(find(&badges, "first_book").earned);
        assert!(find(&badges, "bookworm").earned);
        assert_eq!(find(&badges, "bookworm").progress, 10);
        assert!(!find(&badges, "bibliophile").earned);
        assert_eq!(find(&badges, "bibliophile").progress, 12);
        assert!(find(&badges, "doorstopper").earned);
        assert!(find(&badges, "streak_7").earned);
        assert!(!find(&badges, "streak_30").earned);
    }

    #[test]
    fn keys_are_unique() {
        let mut keys: Vec<_> = CATALOGUE.iter().map(|d| d.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), CATALOGUE.len());
    }
}
