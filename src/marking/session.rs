use super::{
    MarkEntryError, StudentMarks, StudentMeta, TeamSubmission, check_score, student_total, validate_team_comment,
};
use crate::model::{Criterion, ProjectId, Review, StudentId};
use std::collections::BTreeMap;
use std::time::Duration;

/// How long the "next student" screen stays up before `TransitionElapsed`.
pub const STUDENT_TRANSITION_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Marking { student: usize, criterion: usize },
    StudentTransition { from: usize },
    TeamDashboard { editing: Option<usize> },
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::Marking { .. } => "marking",
            Phase::StudentTransition { .. } => "moving to the next student",
            Phase::TeamDashboard { .. } => "on the team dashboard",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    SelectScore(u32),
    ToggleAbsent,
    TogglePat,
    Skip,
    TransitionElapsed,
    FocusStudent(usize),
    BackToGuided,
    EditStudent(usize),
    SetMark { criterion: String, score: u32 },
    FinishEditing,
    SetTeamComment(String),
    TogglePptApproved,
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::SelectScore(_) => "Selecting a score",
            Action::ToggleAbsent => "Marking absent",
            Action::TogglePat => "Toggling PAT",
            Action::Skip => "Skipping",
            Action::TransitionElapsed => "Advancing",
            Action::FocusStudent(_) => "Jumping to a student",
            Action::BackToGuided => "Returning to guided marking",
            Action::EditStudent(_) => "Editing a student",
            Action::SetMark { .. } => "Editing a mark",
            Action::FinishEditing => "Finishing an edit",
            Action::SetTeamComment(_) => "Editing the team comment",
            Action::TogglePptApproved => "Approving the presentation",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseDecision {
    Close,
    ConfirmDiscard,
}

/// Guided marking of one team for one review. Nothing leaves the session
/// until [`MarkEntry::save`] produces a submission.
#[derive(Clone, Debug)]
pub struct MarkEntry {
    project_id: ProjectId,
    review: String,
    rubric: Vec<Criterion>,
    students: Vec<StudentId>,
    marks: Vec<BTreeMap<String, u32>>,
    meta: Vec<StudentMeta>,
    team_comment: String,
    ppt_approved: bool,
    phase: Phase,
    dirty: bool,
}

impl MarkEntry {
    pub fn new(project_id: ProjectId, review: &Review, students: Vec<StudentId>) -> Self {
        let phase = if students.is_empty() || review.rubric.is_empty() {
            Phase::TeamDashboard { editing: None }
        } else {
            Phase::Marking {
                student: 0,
                criterion: 0,
            }
        };
        Self {
            project_id,
            review: review.name.clone(),
            rubric: review.rubric.clone(),
            marks: vec![BTreeMap::new(); students.len()],
            meta: vec![StudentMeta::default(); students.len()],
            students,
            team_comment: String::new(),
            ppt_approved: false,
            phase,
            dirty: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    pub fn marks(&self, student: usize) -> Option<&BTreeMap<String, u32>> {
        self.marks.get(student)
    }

    pub fn meta(&self, student: usize) -> Option<StudentMeta> {
        self.meta.get(student).copied()
    }

    pub fn total(&self, student: usize) -> Option<f64> {
        student_total(&self.rubric, self.marks.get(student)?, *self.meta.get(student)?)
    }

    pub fn can_save(&self) -> bool {
        matches!(self.phase, Phase::TeamDashboard { .. }) && validate_team_comment(&self.team_comment).is_ok()
    }

    pub fn close(&self) -> CloseDecision {
        if self.dirty {
            CloseDecision::ConfirmDiscard
        } else {
            CloseDecision::Close
        }
    }

    fn not_allowed(&self, action: &Action) -> MarkEntryError {
        MarkEntryError::NotAllowed {
            action: action.name(),
            phase: self.phase.name(),
        }
    }

    /// The student that attendance toggles apply to.
    fn focused(&self) -> Option<usize> {
        match self.phase {
            Phase::Marking { student, .. } => Some(student),
            Phase::TeamDashboard { editing } => editing,
            Phase::StudentTransition { .. } => None,
        }
    }

    fn after_student(&self, student: usize) -> Phase {
        if student + 1 < self.students.len() {
            Phase::StudentTransition { from: student }
        } else {
            Phase::TeamDashboard { editing: None }
        }
    }

    fn check_student(&self, student: usize) -> Result<(), MarkEntryError> {
        if student >= self.students.len() {
            return Err(MarkEntryError::NoSuchStudent(student));
        }
        Ok(())
    }

    /// Apply one user action and return the resulting phase. A rejected
    /// action leaves the session untouched.
    pub fn apply(&mut self, action: Action) -> Result<Phase, MarkEntryError> {
        self.phase = match (self.phase, &action) {
            (Phase::Marking { student, criterion }, Action::SelectScore(score)) => {
                if self.meta[student].is_blocked() {
                    return Err(MarkEntryError::StudentBlocked);
                }
                let rubric = &self.rubric[criterion];
                check_score(rubric, *score)?;
                self.marks[student].insert(rubric.id.clone(), *score);
                self.dirty = true;
                if criterion + 1 < self.rubric.len() {
                    Phase::Marking {
                        student,
                        criterion: criterion + 1,
                    }
                } else {
                    self.after_student(student)
                }
            }
            (Phase::Marking { student, .. }, Action::Skip) => {
                if !self.meta[student].is_blocked() {
                    return Err(MarkEntryError::StudentNotBlocked);
                }
                self.after_student(student)
            }
            (phase, Action::ToggleAbsent | Action::TogglePat) => {
                let student = self.focused().ok_or_else(|| self.not_allowed(&action))?;
                let meta = &mut self.meta[student];
                if action == Action::ToggleAbsent {
                    meta.attendance = match meta.attendance {
                        super::Attendance::Present => super::Attendance::Absent,
                        super::Attendance::Absent => super::Attendance::Present,
                    };
                    meta.pat = false;
                } else {
                    meta.pat = !meta.pat;
                    meta.attendance = super::Attendance::Present;
                }
                self.dirty = true;
                phase
            }
            (Phase::StudentTransition { from }, Action::TransitionElapsed) => Phase::Marking {
                student: from + 1,
                criterion: 0,
            },
            (Phase::Marking { .. } | Phase::StudentTransition { .. }, Action::FocusStudent(student)) => {
                self.check_student(*student)?;
                Phase::Marking {
                    student: *student,
                    criterion: 0,
                }
            }
            (Phase::TeamDashboard { .. }, Action::BackToGuided) if !self.rubric.is_empty() && !self.students.is_empty() => {
                Phase::Marking {
                    student: 0,
                    criterion: 0,
                }
            }
            (Phase::TeamDashboard { .. }, Action::EditStudent(student)) => {
                self.check_student(*student)?;
                Phase::TeamDashboard {
                    editing: Some(*student),
                }
            }
            (Phase::TeamDashboard { editing: Some(student) }, Action::SetMark { criterion, score }) => {
                if self.meta[student].is_blocked() {
                    return Err(MarkEntryError::StudentBlocked);
                }
                let rubric = self
                    .rubric
                    .iter()
                    .find(|c| c.id == *criterion)
                    .ok_or_else(|| MarkEntryError::UnknownCriterion(criterion.clone()))?;
                check_score(rubric, *score)?;
                self.marks[student].insert(criterion.clone(), *score);
                self.dirty = true;
                self.phase
            }
            (Phase::TeamDashboard { .. }, Action::FinishEditing) => Phase::TeamDashboard { editing: None },
            (phase @ Phase::TeamDashboard { .. }, Action::SetTeamComment(comment)) => {
                self.team_comment = comment.clone();
                self.dirty = true;
                phase
            }
            (phase @ Phase::TeamDashboard { .. }, Action::TogglePptApproved) => {
                self.ppt_approved = !self.ppt_approved;
                self.dirty = true;
                phase
            }
            _ => return Err(self.not_allowed(&action)),
        };
        Ok(self.phase)
    }

    /// Produce the team submission. Only possible from the dashboard with a
    /// long enough team comment; the session is clean afterwards.
    pub fn save(&mut self) -> Result<TeamSubmission, MarkEntryError> {
        if !matches!(self.phase, Phase::TeamDashboard { .. }) {
            return Err(MarkEntryError::NotAllowed {
                action: "Saving",
                phase: self.phase.name(),
            });
        }
        validate_team_comment(&self.team_comment)?;
        let students = self
            .students
            .iter()
            .zip(&self.marks)
            .zip(&self.meta)
            .map(|((&student_id, marks), &meta)| StudentMarks {
                student_id,
                marks: if meta.is_blocked() {
                    BTreeMap::new()
                } else {
                    marks.clone()
                },
                meta,
            })
            .collect();
        self.dirty = false;
        Ok(TeamSubmission {
            project_id: self.project_id,
            review: self.review.clone(),
            students,
            team_comment: self.team_comment.trim().to_owned(),
            ppt_approved: self.ppt_approved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::Attendance;
    use super::*;
    use crate::model::sample_rubric;

    fn session(students: usize) -> MarkEntry {
        let review = Review {
            name: "review1".into(),
            rubric: sample_rubric(),
        };
        MarkEntry::new(
            ProjectId(7),
            &review,
            (1..=students as i64).map(StudentId).collect(),
        )
    }

    fn score_student(entry: &mut MarkEntry, scores: [u32; 3]) -> Phase {
        let mut phase = entry.phase();
        for score in scores {
            phase = entry.apply(Action::SelectScore(score)).unwrap();
        }
        phase
    }

    #[test]
    fn test_guided_walk_through() {
        let mut entry = session(2);
        assert_eq!(
            entry.apply(Action::SelectScore(8)).unwrap(),
            Phase::Marking {
                student: 0,
                criterion: 1
            }
        );
        entry.apply(Action::SelectScore(4)).unwrap();
        assert_eq!(
            entry.apply(Action::SelectScore(3)).unwrap(),
            Phase::StudentTransition { from: 0 }
        );
        assert!(entry.apply(Action::SelectScore(3)).is_err());
        assert_eq!(
            entry.apply(Action::TransitionElapsed).unwrap(),
            Phase::Marking {
                student: 1,
                criterion: 0
            }
        );
        assert_eq!(
            score_student(&mut entry, [10, 5, 3]),
            Phase::TeamDashboard { editing: None }
        );
        assert_eq!(entry.total(0), Some(8.0 + 4.0 + 3.0));
        assert_eq!(entry.total(1), Some(18.0));
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        let mut entry = session(1);
        entry.apply(Action::SelectScore(3)).unwrap();
        let err = entry.apply(Action::SelectScore(0)).unwrap_err();
        assert_eq!(
            err,
            MarkEntryError::InvalidScore {
                criterion: "presentation".into(),
                score: 0
            }
        );
        assert_eq!(
            entry.phase(),
            Phase::Marking {
                student: 0,
                criterion: 1
            }
        );
    }

    #[test]
    fn test_blocked_student_can_only_skip() {
        let mut entry = session(2);
        assert_eq!(entry.apply(Action::Skip), Err(MarkEntryError::StudentNotBlocked));
        entry.apply(Action::TogglePat).unwrap();
        assert_eq!(
            entry.apply(Action::SelectScore(5)),
            Err(MarkEntryError::StudentBlocked)
        );
        entry.apply(Action::ToggleAbsent).unwrap();
        let meta = entry.meta(0).unwrap();
        assert_eq!(meta.attendance, Attendance::Absent);
        assert!(!meta.pat);
        entry.apply(Action::TogglePat).unwrap();
        let meta = entry.meta(0).unwrap();
        assert_eq!(meta.attendance, Attendance::Present);
        assert!(meta.pat);
        assert_eq!(
            entry.apply(Action::Skip).unwrap(),
            Phase::StudentTransition { from: 0 }
        );
        assert_eq!(entry.total(0), None);
    }

    #[test]
    fn test_focus_and_back_to_guided() {
        let mut entry = session(3);
        assert_eq!(
            entry.apply(Action::FocusStudent(2)).unwrap(),
            Phase::Marking {
                student: 2,
                criterion: 0
            }
        );
        assert_eq!(
            entry.apply(Action::FocusStudent(3)),
            Err(MarkEntryError::NoSuchStudent(3))
        );
        entry.apply(Action::ToggleAbsent).unwrap();
        assert_eq!(
            entry.apply(Action::Skip).unwrap(),
            Phase::TeamDashboard { editing: None }
        );
        assert_eq!(entry.total(2), Some(0.0));
        assert_eq!(
            entry.apply(Action::BackToGuided).unwrap(),
            Phase::Marking {
                student: 0,
                criterion: 0
            }
        );
    }

    #[test]
    fn test_dashboard_quick_edit() {
        let mut entry = session(1);
        score_student(&mut entry, [2, 2, 2]);
        assert!(
            entry
                .apply(Action::SetMark {
                    criterion: "qa".into(),
                    score: 3
                })
                .is_err()
        );
        entry.apply(Action::EditStudent(0)).unwrap();
        entry
            .apply(Action::SetMark {
                criterion: "qa".into(),
                score: 3,
            })
            .unwrap();
        assert_eq!(
            entry.apply(Action::SetMark {
                criterion: "design".into(),
                score: 1
            }),
            Err(MarkEntryError::UnknownCriterion("design".into()))
        );
        assert_eq!(
            entry.apply(Action::FinishEditing).unwrap(),
            Phase::TeamDashboard { editing: None }
        );
        assert_eq!(entry.marks(0).unwrap()["qa"], 3);
    }

    #[test]
    fn test_save_needs_ten_characters() {
        let mut entry = session(1);
        assert!(entry.save().is_err());
        score_student(&mut entry, [6, 3, 2]);
        entry
            .apply(Action::SetTeamComment("  123456789 ".into()))
            .unwrap();
        assert!(!entry.can_save());
        assert_eq!(entry.save(), Err(MarkEntryError::CommentTooShort));
        entry
            .apply(Action::SetTeamComment(" 1234567890 ".into()))
            .unwrap();
        entry.apply(Action::TogglePptApproved).unwrap();
        assert!(entry.can_save());
        let submission = entry.save().unwrap();
        assert_eq!(submission.team_comment, "1234567890");
        assert!(submission.ppt_approved);
        assert_eq!(submission.students[0].marks.len(), 3);
        assert_eq!(entry.close(), CloseDecision::Close);
    }

    #[test]
    fn test_close_with_changes_asks_first() {
        let mut entry = session(1);
        assert_eq!(entry.close(), CloseDecision::Close);
        entry.apply(Action::SelectScore(1)).unwrap();
        assert_eq!(entry.close(), CloseDecision::ConfirmDiscard);
    }

    #[test]
    fn test_transition_delay() {
        assert_eq!(STUDENT_TRANSITION_DELAY, Duration::from_secs(1));
    }
}
