use super::Scope;
use serde::{Deserialize, Serialize};

/// One discrete score a criterion can receive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub score: u32,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub max_marks: f64,
    pub levels: Vec<Level>,
}

impl Criterion {
    pub fn accepts(&self, score: u32) -> bool {
        self.levels.iter().any(|l| l.score == score)
    }

    fn top_score(&self) -> u32 {
        self.levels.iter().map(|l| l.score).max().unwrap_or(0)
    }

    /// Scale a level score to the criterion's marks.
    pub fn weighted(&self, score: u32) -> f64 {
        match self.top_score() {
            0 => 0.0,
            top => f64::from(score) / f64::from(top) * self.max_marks,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub name: String,
    pub rubric: Vec<Criterion>,
}

impl Review {
    pub fn criterion(&self, id: &str) -> Option<&Criterion> {
        self.rubric.iter().find(|c| c.id == id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkingSchema {
    #[serde(flatten)]
    pub scope: Scope,
    pub reviews: Vec<Review>,
}

impl MarkingSchema {
    pub fn review(&self, name: &str) -> Option<&Review> {
        self.reviews.iter().find(|r| r.name == name)
    }
}

#[cfg(test)]
pub(crate) fn sample_rubric() -> Vec<Criterion> {
    let levels = |scores: std::ops::RangeInclusive<u32>| {
        scores
            .map(|score| Level {
                score,
                label: format!("L{score}"),
                description: String::new(),
            })
            .collect()
    };
    vec![
        Criterion {
            id: "concept".into(),
            name: "Concept Innovation".into(),
            description: String::new(),
            max_marks: 10.0,
            levels: levels(0..=10),
        },
        Criterion {
            id: "presentation".into(),
            name: "Presentation".into(),
            description: String::new(),
            max_marks: 5.0,
            levels: levels(1..=5),
        },
        Criterion {
            id: "qa".into(),
            name: "Q&A".into(),
            description: String::new(),
            max_marks: 3.0,
            levels: levels(1..=3),
        },
    ]
}
