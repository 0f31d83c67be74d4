use super::Store;
use crate::error::{Error, Result, ensure_valid};
use crate::model::*;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::info;

const PROJECT_COLUMNS: &str = "id, name, academic_year, school, department, guide_faculty_id, \
                               panel_id, specialization, status, best_project";

fn project_from_row(row: &SqliteRow) -> Result<Project, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(Project {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        scope: Scope {
            academic_year: row.try_get("academic_year")?,
            school: row.try_get("school")?,
            department: row.try_get("department")?,
        },
        guide_faculty: row.try_get("guide_faculty_id")?,
        students: Vec::new(),
        panel: row.try_get("panel_id")?,
        specialization: row.try_get("specialization")?,
        status: ProjectStatus::parse(&status).unwrap_or_default(),
        best_project: row.try_get("best_project")?,
    })
}

async fn attach_students(conn: &mut SqliteConnection, projects: &mut [Project]) -> Result<(), sqlx::Error> {
    if projects.is_empty() {
        return Ok(());
    }
    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT project_id, student_id FROM project_students WHERE project_id IN (",
    );
    let mut ids = query.separated(", ");
    for p in projects.iter() {
        ids.push_bind(p.id);
    }
    query.push(") ORDER BY project_id, position");
    let mut by_project: HashMap<ProjectId, Vec<StudentId>> = HashMap::new();
    for row in query.build().fetch_all(&mut *conn).await? {
        by_project
            .entry(row.try_get("project_id")?)
            .or_default()
            .push(row.try_get("student_id")?);
    }
    for p in projects {
        p.students = by_project.remove(&p.id).unwrap_or_default();
    }
    Ok(())
}

/// Load one project on an existing connection (possibly inside a transaction).
pub(super) async fn project_in(conn: &mut SqliteConnection, id: ProjectId) -> Result<Option<Project>, sqlx::Error> {
    let project = sqlx::query(&format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"))
        .bind(id)
        .try_map(|row: SqliteRow| project_from_row(&row))
        .fetch_optional(&mut *conn)
        .await?;
    match project {
        Some(project) => {
            let mut projects = [project];
            attach_students(conn, &mut projects).await?;
            let [project] = projects;
            Ok(Some(project))
        }
        None => Ok(None),
    }
}

impl Store {
    pub async fn create_project(&self, new: NewProject) -> Result<Project> {
        ensure_valid!(!new.name.is_empty(), "Project name is required.");
        ensure_valid!(
            new.scope.is_complete(),
            "Academic year, school and department are required."
        );
        let guide = self
            .find_faculty(&new.guide_employee_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Guide faculty not found: {}", new.guide_employee_id)))?;
        let mut students = Vec::with_capacity(new.student_reg_nos.len());
        let mut missing = Vec::new();
        for reg_no in &new.student_reg_nos {
            match self.find_student(reg_no, &new.scope.academic_year).await? {
                Some(student) => students.push(student.id),
                None => missing.push(reg_no.as_str()),
            }
        }
        if !missing.is_empty() {
            return Err(Error::not_found(format!("Student not found: {}", missing.join(", "))));
        }
        let mut tx = self.pool().begin().await?;
        let id = sqlx::query(
            "INSERT INTO projects (name, academic_year, school, department, guide_faculty_id, specialization, status)
             VALUES (?, ?, ?, ?, ?, ?, 'active')",
        )
        .bind(&new.name)
        .bind(&new.scope.academic_year)
        .bind(&new.scope.school)
        .bind(&new.scope.department)
        .bind(guide.id)
        .bind(&new.specialization)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        for (position, student) in students.iter().enumerate() {
            sqlx::query("INSERT INTO project_students (project_id, student_id, position) VALUES (?, ?, ?)")
                .bind(id)
                .bind(student)
                .bind(position as i64)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        info!(project_id = id, guide = %guide.employee_id, "project_created");
        Ok(Project {
            id: ProjectId(id),
            name: new.name,
            scope: new.scope,
            guide_faculty: guide.id,
            students,
            panel: None,
            specialization: new.specialization,
            status: ProjectStatus::Active,
            best_project: false,
        })
    }

    pub async fn project(&self, id: ProjectId) -> Result<Project> {
        let mut conn = self.pool().acquire().await?;
        project_in(&mut conn, id)
            .await?
            .ok_or_else(|| Error::not_found("Project not found."))
    }

    pub async fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE 1 = 1"));
        if let Some(year) = &filter.academic_year {
            query.push(" AND academic_year = ").push_bind(year);
        }
        if let Some(school) = &filter.school {
            query.push(" AND school = ").push_bind(school);
        }
        if let Some(department) = &filter.department {
            query.push(" AND department = ").push_bind(department);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(guide) = filter.guide_faculty {
            query.push(" AND guide_faculty_id = ").push_bind(guide);
        }
        if let Some(panel) = filter.panel {
            query.push(" AND panel_id = ").push_bind(panel);
        }
        query.push(" ORDER BY id");
        let mut conn = self.pool().acquire().await?;
        let mut projects = query
            .build()
            .try_map(|row: SqliteRow| project_from_row(&row))
            .fetch_all(&mut *conn)
            .await?;
        attach_students(&mut conn, &mut projects).await?;
        Ok(projects)
    }

    /// Active projects of a scope that have no panel yet, oldest first.
    pub async fn unassigned_projects(&self, scope: &Scope) -> Result<Vec<Project>> {
        let filter = ProjectFilter {
            academic_year: Some(scope.academic_year.clone()),
            school: Some(scope.school.clone()),
            department: Some(scope.department.clone()),
            status: Some(ProjectStatus::Active),
            ..ProjectFilter::default()
        };
        Ok(self
            .list_projects(&filter)
            .await?
            .into_iter()
            .filter(Project::is_unassigned)
            .collect())
    }

    pub async fn reassign_guide(&self, id: ProjectId, employee_id: &str) -> Result<Project> {
        let mut project = self.project(id).await?;
        let guide = self
            .find_faculty(employee_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Guide faculty not found: {employee_id}")))?;
        ensure_valid!(
            guide.id != project.guide_faculty,
            "Faculty is already the guide of this project."
        );
        sqlx::query("UPDATE projects SET guide_faculty_id = ? WHERE id = ?")
            .bind(guide.id)
            .bind(id)
            .execute(self.pool())
            .await?;
        info!(project_id = %id, from = %project.guide_faculty, to = %guide.id, "project_guide_reassigned");
        project.guide_faculty = guide.id;
        Ok(project)
    }

    /// Flip the best-project flag and return its new value.
    pub async fn toggle_best_project(&self, id: ProjectId) -> Result<bool> {
        let project = self.project(id).await?;
        let best = !project.best_project;
        sqlx::query("UPDATE projects SET best_project = ? WHERE id = ?")
            .bind(best)
            .bind(id)
            .execute(self.pool())
            .await?;
        info!(project_id = %id, best_project = best, "project_marked_best");
        Ok(best)
    }

    pub async fn set_project_status(&self, id: ProjectId, status: ProjectStatus) -> Result<Project> {
        let mut project = self.project(id).await?;
        sqlx::query("UPDATE projects SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(self.pool())
            .await?;
        info!(project_id = %id, status = status.as_str(), "project_status_updated");
        project.status = status;
        Ok(project)
    }
}
