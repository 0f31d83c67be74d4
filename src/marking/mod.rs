use crate::model::{Criterion, ProjectId, StudentId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub use self::session::{Action, CloseDecision, MarkEntry, Phase, STUDENT_TRANSITION_DELAY};

mod session;

pub const MIN_TEAM_COMMENT_CHARS: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkEntryError {
    #[error("Team comments are required (min 10 chars).")]
    CommentTooShort,
    #[error("{action} is not allowed while {phase}.")]
    NotAllowed {
        action: &'static str,
        phase: &'static str,
    },
    #[error("Student is absent or on PAT; only skipping is possible.")]
    StudentBlocked,
    #[error("Student is not blocked and must be marked.")]
    StudentNotBlocked,
    #[error("No student at position {0}.")]
    NoSuchStudent(usize),
    #[error("Unknown criterion: {0}")]
    UnknownCriterion(String),
    #[error("Score {score} is not a level of criterion {criterion}.")]
    InvalidScore { criterion: String, score: u32 },
}

/// A team comment counts once surrounding whitespace is removed.
pub fn validate_team_comment(comment: &str) -> Result<(), MarkEntryError> {
    if comment.trim().chars().count() < MIN_TEAM_COMMENT_CHARS {
        return Err(MarkEntryError::CommentTooShort);
    }
    Ok(())
}

pub fn check_score(criterion: &Criterion, score: u32) -> Result<(), MarkEntryError> {
    if !criterion.accepts(score) {
        return Err(MarkEntryError::InvalidScore {
            criterion: criterion.id.clone(),
            score,
        });
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attendance {
    #[default]
    Present,
    Absent,
}

impl Attendance {
    pub fn as_str(self) -> &'static str {
        match self {
            Attendance::Present => "present",
            Attendance::Absent => "absent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "present" => Some(Attendance::Present),
            "absent" => Some(Attendance::Absent),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentMeta {
    pub attendance: Attendance,
    #[serde(rename = "PAT", alias = "pat")]
    pub pat: bool,
}

impl StudentMeta {
    /// Absent and PAT students are not scored.
    pub fn is_blocked(&self) -> bool {
        self.attendance == Attendance::Absent || self.pat
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentMarks {
    pub student_id: StudentId,
    /// Criterion id to level score.
    #[serde(default)]
    pub marks: BTreeMap<String, u32>,
    #[serde(default)]
    pub meta: StudentMeta,
}

/// Everything a faculty member saves for one team in one review.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSubmission {
    pub project_id: ProjectId,
    pub review: String,
    pub students: Vec<StudentMarks>,
    #[serde(default)]
    pub team_comment: String,
    #[serde(default)]
    pub ppt_approved: bool,
}

/// Weighted total of one student over a rubric. Absent students score 0 and
/// PAT students have no total; unscored criteria add nothing.
pub fn student_total(rubric: &[Criterion], marks: &BTreeMap<String, u32>, meta: StudentMeta) -> Option<f64> {
    if meta.pat {
        return None;
    }
    if meta.attendance == Attendance::Absent {
        return Some(0.0);
    }
    Some(
        rubric
            .iter()
            .filter_map(|c| marks.get(&c.id).map(|&score| c.weighted(score)))
            .sum(),
    )
}
