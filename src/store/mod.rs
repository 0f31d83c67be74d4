use crate::algos::PanelDraft;
use crate::config::{DatabaseConfig, PanelDefaults};
use crate::model::Assignment;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::debug;

mod broadcasts;
mod coordinators;
mod department;
mod faculty;
mod marks;
mod panels;
mod projects;
mod requests;
mod schemas;
mod students;

pub use self::marks::SavedMarks;
pub use self::panels::PanelAssignment;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS faculty (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    employee_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    email_id TEXT NOT NULL,
    role TEXT NOT NULL,
    specialization TEXT NOT NULL,
    schools TEXT NOT NULL,
    departments TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS students (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reg_no TEXT NOT NULL,
    name TEXT NOT NULL,
    email_id TEXT NOT NULL,
    pat BOOLEAN NOT NULL DEFAULT 0,
    academic_year TEXT NOT NULL,
    school TEXT NOT NULL,
    department TEXT NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT 1,
    UNIQUE (reg_no, academic_year)
);

CREATE TABLE IF NOT EXISTS panels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    panel_name TEXT NOT NULL,
    venue TEXT NOT NULL,
    academic_year TEXT NOT NULL,
    school TEXT NOT NULL,
    department TEXT NOT NULL,
    specializations TEXT NOT NULL,
    max_projects INTEGER NOT NULL,
    assigned_projects_count INTEGER NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    CHECK (assigned_projects_count >= 0 AND assigned_projects_count <= max_projects)
);

CREATE TABLE IF NOT EXISTS panel_members (
    panel_id INTEGER NOT NULL REFERENCES panels (id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    faculty_id INTEGER NOT NULL REFERENCES faculty (id),
    role TEXT NOT NULL,
    added_at TEXT NOT NULL,
    PRIMARY KEY (panel_id, position)
);

CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    academic_year TEXT NOT NULL,
    school TEXT NOT NULL,
    department TEXT NOT NULL,
    guide_faculty_id INTEGER NOT NULL REFERENCES faculty (id),
    panel_id INTEGER REFERENCES panels (id),
    specialization TEXT,
    status TEXT NOT NULL DEFAULT 'active',
    best_project BOOLEAN NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS project_students (
    project_id INTEGER NOT NULL REFERENCES projects (id) ON DELETE CASCADE,
    student_id INTEGER NOT NULL REFERENCES students (id),
    position INTEGER NOT NULL,
    PRIMARY KEY (project_id, student_id)
);

CREATE TABLE IF NOT EXISTS department_configs (
    academic_year TEXT NOT NULL,
    school TEXT NOT NULL,
    department TEXT NOT NULL,
    min_panel_size INTEGER NOT NULL,
    max_panel_size INTEGER NOT NULL,
    PRIMARY KEY (academic_year, school, department)
);

CREATE TABLE IF NOT EXISTS marking_schemas (
    academic_year TEXT NOT NULL,
    school TEXT NOT NULL,
    department TEXT NOT NULL,
    reviews TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (academic_year, school, department)
);

CREATE TABLE IF NOT EXISTS marks (
    project_id INTEGER NOT NULL REFERENCES projects (id) ON DELETE CASCADE,
    review TEXT NOT NULL,
    faculty_id INTEGER NOT NULL REFERENCES faculty (id),
    student_id INTEGER NOT NULL REFERENCES students (id),
    criterion TEXT NOT NULL,
    score INTEGER NOT NULL,
    PRIMARY KEY (project_id, review, faculty_id, student_id, criterion)
);

CREATE TABLE IF NOT EXISTS student_review_meta (
    project_id INTEGER NOT NULL REFERENCES projects (id) ON DELETE CASCADE,
    review TEXT NOT NULL,
    faculty_id INTEGER NOT NULL REFERENCES faculty (id),
    student_id INTEGER NOT NULL REFERENCES students (id),
    attendance TEXT NOT NULL,
    pat BOOLEAN NOT NULL,
    PRIMARY KEY (project_id, review, faculty_id, student_id)
);

CREATE TABLE IF NOT EXISTS team_reviews (
    project_id INTEGER NOT NULL REFERENCES projects (id) ON DELETE CASCADE,
    review TEXT NOT NULL,
    faculty_id INTEGER NOT NULL REFERENCES faculty (id),
    team_comment TEXT NOT NULL,
    ppt_approved BOOLEAN NOT NULL,
    submitted_at TEXT NOT NULL,
    PRIMARY KEY (project_id, review, faculty_id)
);

CREATE TABLE IF NOT EXISTS requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    faculty_id INTEGER NOT NULL REFERENCES faculty (id),
    project_id INTEGER REFERENCES projects (id),
    kind TEXT NOT NULL,
    reason TEXT NOT NULL,
    status TEXT NOT NULL,
    remarks TEXT,
    new_deadline TEXT,
    created_at TEXT NOT NULL,
    decided_by INTEGER REFERENCES faculty (id)
);

CREATE TABLE IF NOT EXISTS broadcasts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    target_schools TEXT NOT NULL,
    target_departments TEXT NOT NULL,
    target_academic_years TEXT NOT NULL,
    created_by INTEGER NOT NULL,
    created_by_employee_id TEXT NOT NULL,
    created_by_name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    is_active BOOLEAN NOT NULL,
    action TEXT NOT NULL,
    priority TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS project_coordinators (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    faculty_id INTEGER NOT NULL REFERENCES faculty (id),
    academic_year TEXT NOT NULL,
    school TEXT NOT NULL,
    department TEXT NOT NULL,
    is_primary BOOLEAN NOT NULL DEFAULT 0,
    UNIQUE (faculty_id, academic_year, school, department)
);
"#;

/// Handle on the database plus the defaults that services fall back on.
#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
    defaults: PanelDefaults,
}

impl Store {
    pub async fn connect(config: &DatabaseConfig, defaults: PanelDefaults) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;
        let store = Self { pool, defaults };
        store.migrate().await?;
        Ok(store)
    }

    /// Single-connection in-memory store: every pooled connection would
    /// otherwise see its own empty database.
    #[cfg(test)]
    pub async fn in_memory(defaults: PanelDefaults) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool, defaults };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        debug!("database schema is up to date");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn defaults(&self) -> PanelDefaults {
        self.defaults
    }
}

/// Outcome of a batch operation. Failures never abort the batch.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned: Option<usize>,
    pub errors: usize,
    pub details: Vec<Failure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assignments: Vec<Assignment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub panels: Vec<PanelDraft>,
}

impl BatchReport {
    pub fn creation() -> Self {
        Self {
            created: Some(0),
            ..Self::default()
        }
    }

    pub fn upsert() -> Self {
        Self {
            created: Some(0),
            updated: Some(0),
            ..Self::default()
        }
    }

    pub fn assignment() -> Self {
        Self {
            assigned: Some(0),
            ..Self::default()
        }
    }

    pub fn record_created(&mut self) {
        *self.created.get_or_insert(0) += 1;
    }

    pub fn record_updated(&mut self) {
        *self.updated.get_or_insert(0) += 1;
    }

    pub fn record_assigned(&mut self, assignment: Assignment) {
        *self.assigned.get_or_insert(0) += 1;
        self.assignments.push(assignment);
    }

    pub fn record_failure(&mut self, subject: Subject, error: impl ToString) {
        self.errors += 1;
        self.details.push(Failure {
            subject,
            error: error.to_string(),
        });
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Failure {
    #[serde(flatten)]
    pub subject: Subject,
    pub error: String,
}

/// What a batch failure refers to.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Subject {
    Department(String),
    ProjectId(crate::model::ProjectId),
    /// 1-based position in the submitted list.
    Row(usize),
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::model::*;

    pub async fn store() -> Store {
        Store::in_memory(PanelDefaults::default())
            .await
            .expect("in-memory store")
    }

    pub fn scope() -> Scope {
        Scope::new("2025-26", "SCOPE", "CSE")
    }

    pub async fn faculty(store: &Store, employee_id: &str, specialization: &[&str]) -> Faculty {
        store
            .create_faculty(NewFaculty {
                employee_id: employee_id.into(),
                name: format!("Faculty {employee_id}"),
                email_id: format!("{}@example.edu", employee_id.to_lowercase()),
                role: FacultyRole::Faculty,
                specialization: specialization.iter().map(|s| s.to_string()).collect(),
                schools: vec!["SCOPE".into()],
                departments: vec!["CSE".into()],
            })
            .await
            .expect("faculty")
    }

    pub async fn project(store: &Store, name: &str, guide: &str, specialization: Option<&str>) -> Project {
        store
            .create_project(NewProject {
                name: name.into(),
                scope: scope(),
                guide_employee_id: guide.into(),
                student_reg_nos: Vec::new(),
                specialization: specialization.map(String::from),
            })
            .await
            .expect("project")
    }

    pub async fn panel(store: &Store, members: &[&str], specializations: &[&str], max_projects: u32) -> Panel {
        store
            .create_panel(
                NewPanel {
                    member_employee_ids: members.iter().map(|s| s.to_string()).collect(),
                    scope: scope(),
                    venue: "SJT 301".into(),
                    specializations: specializations.iter().map(|s| s.to_string()).collect(),
                    panel_name: None,
                    max_projects: Some(max_projects),
                },
                None,
            )
            .await
            .expect("panel")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serialization() {
        let mut report = BatchReport::creation();
        report.record_created();
        report.record_failure(Subject::Department("ECE".into()), "Not enough faculty. Need 3, found 1");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["created"], 1);
        assert_eq!(json["errors"], 1);
        assert_eq!(json["details"][0]["department"], "ECE");
        assert_eq!(json["details"][0]["error"], "Not enough faculty. Need 3, found 1");
        assert!(json.get("assigned").is_none());
        assert!(json.get("assignments").is_none());
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let store = fixtures::store().await;
        store.migrate().await.unwrap();
    }
}
