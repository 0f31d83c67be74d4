use super::Store;
use super::projects::project_in;
use super::schemas::marking_schema_in;
use crate::error::{Error, Result, ensure_valid};
use crate::marking::{Attendance, StudentMarks, StudentMeta, TeamSubmission, check_score, validate_team_comment};
use crate::model::*;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::Row;
use std::collections::{BTreeMap, HashSet};
use tracing::info;

/// Summary of a stored team submission.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedMarks {
    pub project_id: ProjectId,
    pub review: String,
    pub students: usize,
    pub marks: usize,
    pub submitted_at: DateTime<Utc>,
}

fn check_against_review(review: &Review, students: &[StudentMarks]) -> Result<()> {
    for student in students {
        for (criterion, &score) in &student.marks {
            let criterion = review
                .criterion(criterion)
                .ok_or_else(|| Error::validation(format!("Unknown criterion: {criterion}")))?;
            check_score(criterion, score).map_err(|e| Error::validation(e.to_string()))?;
        }
    }
    Ok(())
}

impl Store {
    /// Store one faculty member's marks for a team, replacing whatever that
    /// faculty member saved earlier for the same project and review.
    pub async fn save_team_marks(&self, faculty: &Faculty, submission: TeamSubmission) -> Result<SavedMarks> {
        validate_team_comment(&submission.team_comment).map_err(|e| Error::validation(e.to_string()))?;
        ensure_valid!(!submission.review.is_empty(), "Review name is required.");
        let mut tx = self.pool().begin().await?;
        let project = project_in(&mut tx, submission.project_id)
            .await?
            .ok_or_else(|| Error::not_found("Project not found."))?;
        let on_panel = match project.panel {
            Some(panel) => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM panel_members WHERE panel_id = ? AND faculty_id = ?",
                )
                .bind(panel)
                .bind(faculty.id)
                .fetch_one(&mut *tx)
                .await?
                    > 0
            }
            None => false,
        };
        if project.guide_faculty != faculty.id && !on_panel {
            return Err(Error::Forbidden(
                "Only the guide or a panel member can mark this project.".into(),
            ));
        }
        let team = project.students.iter().collect::<HashSet<_>>();
        let mut seen = HashSet::new();
        for student in &submission.students {
            ensure_valid!(
                team.contains(&student.student_id),
                "Student {} is not part of this project.",
                student.student_id
            );
            ensure_valid!(
                seen.insert(student.student_id),
                "Student {} appears twice.",
                student.student_id
            );
            ensure_valid!(
                student.marks.is_empty() || !student.meta.is_blocked(),
                "Student {} is absent or on PAT and cannot be scored.",
                student.student_id
            );
        }
        if let Some(schema) = marking_schema_in(&mut tx, &project.scope).await? {
            let review = schema
                .review(&submission.review)
                .ok_or_else(|| Error::validation(format!("Review not found: {}", submission.review)))?;
            check_against_review(review, &submission.students)?;
        }

        for table in ["marks", "student_review_meta", "team_reviews"] {
            sqlx::query(&format!(
                "DELETE FROM {table} WHERE project_id = ? AND review = ? AND faculty_id = ?"
            ))
            .bind(project.id)
            .bind(&submission.review)
            .bind(faculty.id)
            .execute(&mut *tx)
            .await?;
        }
        let mut marks = 0;
        for student in &submission.students {
            for (criterion, score) in &student.marks {
                sqlx::query(
                    "INSERT INTO marks (project_id, review, faculty_id, student_id, criterion, score)
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(project.id)
                .bind(&submission.review)
                .bind(faculty.id)
                .bind(student.student_id)
                .bind(criterion)
                .bind(score)
                .execute(&mut *tx)
                .await?;
                marks += 1;
            }
            sqlx::query(
                "INSERT INTO student_review_meta (project_id, review, faculty_id, student_id, attendance, pat)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(project.id)
            .bind(&submission.review)
            .bind(faculty.id)
            .bind(student.student_id)
            .bind(student.meta.attendance.as_str())
            .bind(student.meta.pat)
            .execute(&mut *tx)
            .await?;
        }
        let submitted_at = Utc::now();
        sqlx::query(
            "INSERT INTO team_reviews (project_id, review, faculty_id, team_comment, ppt_approved, submitted_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(project.id)
        .bind(&submission.review)
        .bind(faculty.id)
        .bind(submission.team_comment.trim())
        .bind(submission.ppt_approved)
        .bind(submitted_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        info!(
            project_id = %project.id,
            review = %submission.review,
            faculty = %faculty.employee_id,
            marks,
            "team_marks_saved"
        );
        Ok(SavedMarks {
            project_id: project.id,
            review: submission.review,
            students: submission.students.len(),
            marks,
            submitted_at,
        })
    }

    /// What a faculty member last saved for a team, if anything.
    pub async fn team_marks(
        &self,
        faculty: &Faculty,
        project_id: ProjectId,
        review: &str,
    ) -> Result<Option<TeamSubmission>> {
        let mut conn = self.pool().acquire().await?;
        let team = sqlx::query(
            "SELECT team_comment, ppt_approved FROM team_reviews
             WHERE project_id = ? AND review = ? AND faculty_id = ?",
        )
        .bind(project_id)
        .bind(review)
        .bind(faculty.id)
        .fetch_optional(&mut *conn)
        .await?;
        let Some(team) = team else {
            return Ok(None);
        };
        let mut students: BTreeMap<StudentId, StudentMarks> = BTreeMap::new();
        let meta = sqlx::query(
            "SELECT student_id, attendance, pat FROM student_review_meta
             WHERE project_id = ? AND review = ? AND faculty_id = ?",
        )
        .bind(project_id)
        .bind(review)
        .bind(faculty.id)
        .fetch_all(&mut *conn)
        .await?;
        for row in meta {
            let student_id: StudentId = row.try_get("student_id")?;
            let attendance: String = row.try_get("attendance")?;
            students.insert(
                student_id,
                StudentMarks {
                    student_id,
                    marks: BTreeMap::new(),
                    meta: StudentMeta {
                        attendance: Attendance::parse(&attendance).unwrap_or_default(),
                        pat: row.try_get("pat")?,
                    },
                },
            );
        }
        let marks = sqlx::query(
            "SELECT student_id, criterion, score FROM marks
             WHERE project_id = ? AND review = ? AND faculty_id = ?",
        )
        .bind(project_id)
        .bind(review)
        .bind(faculty.id)
        .fetch_all(&mut *conn)
        .await?;
        for row in marks {
            let student_id: StudentId = row.try_get("student_id")?;
            if let Some(student) = students.get_mut(&student_id) {
                student.marks.insert(row.try_get("criterion")?, row.try_get("score")?);
            }
        }
        Ok(Some(TeamSubmission {
            project_id,
            review: review.to_owned(),
            students: students.into_values().collect(),
            team_comment: team.try_get("team_comment")?,
            ppt_approved: team.try_get("ppt_approved")?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;

    async fn team_project(store: &Store) -> (Project, Vec<StudentId>) {
        fixtures::faculty(store, "F001", &["AI"]).await;
        fixtures::faculty(store, "F002", &["AI"]).await;
        fixtures::faculty(store, "F003", &["AI"]).await;
        let rows = ["21BCE001", "21BCE002"]
            .iter()
            .map(|reg_no| StudentRow {
                reg_no: reg_no.to_string(),
                name: reg_no.to_string(),
                email_id: format!("{reg_no}@example.edu"),
                pat: false,
            })
            .collect();
        store.upsert_students(rows, &fixtures::scope()).await.unwrap();
        let project = store
            .create_project(NewProject {
                name: "Crop monitor".into(),
                scope: fixtures::scope(),
                guide_employee_id: "F001".into(),
                student_reg_nos: vec!["21BCE001".into(), "21BCE002".into()],
                specialization: Some("AI".into()),
            })
            .await
            .unwrap();
        let students = project.students.clone();
        (project, students)
    }

    fn submission(project: &Project, students: &[StudentId], comment: &str) -> TeamSubmission {
        TeamSubmission {
            project_id: project.id,
            review: "review1".into(),
            students: students
                .iter()
                .map(|&student_id| StudentMarks {
                    student_id,
                    marks: BTreeMap::from([("concept".to_owned(), 7), ("qa".to_owned(), 2)]),
                    meta: StudentMeta::default(),
                })
                .collect(),
            team_comment: comment.into(),
            ppt_approved: true,
        }
    }

    #[tokio::test]
    async fn test_guide_saves_and_replaces() {
        let store = fixtures::store().await;
        let (project, students) = team_project(&store).await;
        let guide = store.faculty("F001").await.unwrap();
        let saved = store
            .save_team_marks(&guide, submission(&project, &students, "Good progress overall"))
            .await
            .unwrap();
        assert_eq!(saved.marks, 4);
        let mut second = submission(&project, &students[..1], "Revised after demo");
        second.students[0].meta.attendance = Attendance::Absent;
        second.students[0].marks.clear();
        store.save_team_marks(&guide, second).await.unwrap();
        let stored = store
            .team_marks(&guide, project.id, "review1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.students.len(), 1);
        assert!(stored.students[0].marks.is_empty());
        assert_eq!(stored.students[0].meta.attendance, Attendance::Absent);
        assert_eq!(stored.team_comment, "Revised after demo");
    }

    #[tokio::test]
    async fn test_blocked_students_cannot_be_scored() {
        let store = fixtures::store().await;
        let (project, students) = team_project(&store).await;
        let guide = store.faculty("F001").await.unwrap();
        let mut absent = submission(&project, &students, "Demo went well");
        absent.students[1].meta.attendance = Attendance::Absent;
        let err = store.save_team_marks(&guide, absent).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Student {} is absent or on PAT and cannot be scored.", students[1])
        );
        let mut pat = submission(&project, &students, "Demo went well");
        pat.students[0].meta.pat = true;
        assert!(store.save_team_marks(&guide, pat).await.is_err());
        assert!(store.team_marks(&guide, project.id, "review1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_short_comment_rejected() {
        let store = fixtures::store().await;
        let (project, students) = team_project(&store).await;
        let guide = store.faculty("F001").await.unwrap();
        let err = store
            .save_team_marks(&guide, submission(&project, &students, " 123456789 "))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Team comments are required (min 10 chars).");
        assert!(store
            .save_team_marks(&guide, submission(&project, &students, "1234567890"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_only_guide_or_panel_may_mark() {
        let store = fixtures::store().await;
        let (project, students) = team_project(&store).await;
        let outsider = store.faculty("F003").await.unwrap();
        let err = store
            .save_team_marks(&outsider, submission(&project, &students, "Looks fine to me"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        let panel = fixtures::panel(&store, &["F002", "F003"], &["AI"], 2).await;
        store.assign_panel_to_project(panel.id, project.id, None).await.unwrap();
        assert!(store
            .save_team_marks(&outsider, submission(&project, &students, "Looks fine to me"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_rubric_is_enforced() {
        let store = fixtures::store().await;
        let (project, students) = team_project(&store).await;
        store
            .upsert_marking_schema(MarkingSchema {
                scope: fixtures::scope(),
                reviews: vec![Review {
                    name: "review1".into(),
                    rubric: sample_rubric(),
                }],
            })
            .await
            .unwrap();
        let guide = store.faculty("F001").await.unwrap();
        let mut bad = submission(&project, &students, "Needs more testing");
        bad.students[0].marks.insert("qa".into(), 9);
        let err = store.save_team_marks(&guide, bad).await.unwrap_err();
        assert_eq!(err.to_string(), "Score 9 is not a level of criterion qa.");
        let mut stranger = submission(&project, &students, "Needs more testing");
        stranger.students[0].student_id = StudentId(999);
        let err = store.save_team_marks(&guide, stranger).await.unwrap_err();
        assert_eq!(err.to_string(), "Student 999 is not part of this project.");
        store
            .save_team_marks(&guide, submission(&project, &students, "Needs more testing"))
            .await
            .unwrap();
    }
}
