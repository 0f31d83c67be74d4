use super::department::department_config_in;
use super::faculty::faculty_by_employee_ids;
use super::projects::project_in;
use super::{BatchReport, Store, Subject};
use crate::algos::{plan_assignments, plan_panels};
use crate::error::{Error, Result, ensure_valid};
use crate::model::*;
use chrono::Utc;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

const PANEL_COLUMNS: &str = "id, panel_name, venue, academic_year, school, department, specializations, \
                             max_projects, assigned_projects_count, is_active";

#[derive(Clone, Debug, Serialize)]
pub struct PanelAssignment {
    pub panel: Panel,
    pub project: Project,
}

fn panel_from_row(row: &SqliteRow) -> Result<Panel, sqlx::Error> {
    Ok(Panel {
        id: row.try_get("id")?,
        panel_name: row.try_get("panel_name")?,
        members: Vec::new(),
        venue: row.try_get("venue")?,
        scope: Scope {
            academic_year: row.try_get("academic_year")?,
            school: row.try_get("school")?,
            department: row.try_get("department")?,
        },
        specializations: row.try_get::<Json<_>, _>("specializations")?.0,
        max_projects: row.try_get("max_projects")?,
        assigned_projects_count: row.try_get("assigned_projects_count")?,
        is_active: row.try_get("is_active")?,
    })
}

async fn attach_members(conn: &mut SqliteConnection, panels: &mut [Panel]) -> Result<(), sqlx::Error> {
    if panels.is_empty() {
        return Ok(());
    }
    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT m.panel_id, m.faculty_id, m.role, f.employee_id, f.name
         FROM panel_members m JOIN faculty f ON f.id = m.faculty_id
         WHERE m.panel_id IN (",
    );
    let mut ids = query.separated(", ");
    for p in panels.iter() {
        ids.push_bind(p.id);
    }
    query.push(") ORDER BY m.panel_id, m.position");
    let mut by_panel: HashMap<PanelId, Vec<PanelMember>> = HashMap::new();
    for row in query.build().fetch_all(&mut *conn).await? {
        let role: String = row.try_get("role")?;
        by_panel
            .entry(row.try_get("panel_id")?)
            .or_default()
            .push(PanelMember {
                faculty: row.try_get("faculty_id")?,
                employee_id: row.try_get("employee_id")?,
                name: row.try_get("name")?,
                role: if role == "chair" {
                    MemberRole::Chair
                } else {
                    MemberRole::Member
                },
            });
    }
    for p in panels {
        p.members = by_panel.remove(&p.id).unwrap_or_default();
    }
    Ok(())
}

async fn panel_in(conn: &mut SqliteConnection, id: PanelId) -> Result<Option<Panel>, sqlx::Error> {
    let panel = sqlx::query(&format!("SELECT {PANEL_COLUMNS} FROM panels WHERE id = ?"))
        .bind(id)
        .try_map(|row: SqliteRow| panel_from_row(&row))
        .fetch_optional(&mut *conn)
        .await?;
    match panel {
        Some(panel) => {
            let mut panels = [panel];
            attach_members(conn, &mut panels).await?;
            let [panel] = panels;
            Ok(Some(panel))
        }
        None => Ok(None),
    }
}

/// Check a proposed member list and resolve it to faculty in input order.
async fn validate_members_in(
    conn: &mut SqliteConnection,
    employee_ids: &[String],
    scope: &Scope,
) -> Result<Vec<Faculty>> {
    ensure_valid!(!employee_ids.is_empty(), "At least one panel member is required.");
    let distinct = employee_ids.iter().collect::<HashSet<_>>();
    ensure_valid!(
        distinct.len() == employee_ids.len(),
        "Duplicate faculty members in panel."
    );
    let faculty = faculty_by_employee_ids(conn, employee_ids).await?;
    if faculty.len() != employee_ids.len() {
        let found = faculty.iter().map(|f| f.employee_id.as_str()).collect::<HashSet<_>>();
        let missing = employee_ids
            .iter()
            .filter(|id| !found.contains(id.as_str()))
            .map(String::as_str)
            .collect::<Vec<_>>();
        return Err(Error::validation(format!("Faculty not found: {}", missing.join(", "))));
    }
    if let Some(config) = department_config_in(conn, scope).await? {
        ensure_valid!(
            config.accepts_panel_size(faculty.len()),
            "Panel size must be between {} and {}.",
            config.min_panel_size,
            config.max_panel_size
        );
    }
    Ok(faculty)
}

async fn replace_members(conn: &mut SqliteConnection, panel: PanelId, members: &[Faculty]) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM panel_members WHERE panel_id = ?")
        .bind(panel)
        .execute(&mut *conn)
        .await?;
    let now = Utc::now();
    for (position, faculty) in members.iter().enumerate() {
        let role = match MemberRole::for_position(position) {
            MemberRole::Chair => "chair",
            MemberRole::Member => "member",
        };
        sqlx::query(
            "INSERT INTO panel_members (panel_id, position, faculty_id, role, added_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(panel)
        .bind(position as i64)
        .bind(faculty.id)
        .bind(role)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

fn members_of(faculty: &[Faculty]) -> Vec<PanelMember> {
    faculty
        .iter()
        .enumerate()
        .map(|(position, f)| PanelMember {
            faculty: f.id,
            employee_id: f.employee_id.clone(),
            name: f.name.clone(),
            role: MemberRole::for_position(position),
        })
        .collect()
}

impl Store {
    pub async fn validate_panel_members(&self, employee_ids: &[String], scope: &Scope) -> Result<Vec<Faculty>> {
        let mut conn = self.pool().acquire().await?;
        validate_members_in(&mut conn, employee_ids, scope).await
    }

    /// Create a panel. Members keep their input order and the first one
    /// chairs the panel.
    pub async fn create_panel(&self, new: NewPanel, created_by: Option<&str>) -> Result<Panel> {
        ensure_valid!(
            new.scope.is_complete(),
            "Academic year, school and department are required."
        );
        let mut tx = self.pool().begin().await?;
        let faculty = validate_members_in(&mut tx, &new.member_employee_ids, &new.scope).await?;
        let max_projects = match new.max_projects {
            Some(n) => n,
            None => department_config_in(&mut tx, &new.scope)
                .await?
                .map_or(self.defaults().default_max_projects, |c| c.max_panel_size * 2),
        };
        ensure_valid!(max_projects >= 1, "maxProjects must be at least 1.");
        let now = Utc::now();
        let panel_name = new
            .panel_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Panel-{}", now.timestamp_millis()));
        let id = sqlx::query(
            "INSERT INTO panels (panel_name, venue, academic_year, school, department, specializations,
                                 max_projects, assigned_projects_count, is_active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, 0, 1, ?)",
        )
        .bind(&panel_name)
        .bind(&new.venue)
        .bind(&new.scope.academic_year)
        .bind(&new.scope.school)
        .bind(&new.scope.department)
        .bind(Json(&new.specializations))
        .bind(max_projects)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        let id = PanelId(id);
        replace_members(&mut tx, id, &faculty).await?;
        tx.commit().await?;
        if let Some(created_by) = created_by {
            info!(
                panel_id = %id,
                member_count = faculty.len(),
                scope = %new.scope,
                created_by,
                "panel_created"
            );
        }
        Ok(Panel {
            id,
            panel_name,
            members: members_of(&faculty),
            venue: new.venue,
            scope: new.scope,
            specializations: new.specializations,
            max_projects,
            assigned_projects_count: 0,
            is_active: true,
        })
    }

    pub async fn panel(&self, id: PanelId) -> Result<Panel> {
        let mut conn = self.pool().acquire().await?;
        panel_in(&mut conn, id)
            .await?
            .ok_or_else(|| Error::not_found("Panel not found."))
    }

    /// Active panels matching the filter, members expanded.
    pub async fn list_panels(&self, filter: &PanelFilter) -> Result<Vec<Panel>> {
        self.load_panels(filter, true).await
    }

    async fn load_panels(&self, filter: &PanelFilter, active_only: bool) -> Result<Vec<Panel>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {PANEL_COLUMNS} FROM panels WHERE 1 = 1"));
        if active_only {
            query.push(" AND is_active = 1");
        }
        if let Some(year) = &filter.academic_year {
            query.push(" AND academic_year = ").push_bind(year);
        }
        if let Some(school) = &filter.school {
            query.push(" AND school = ").push_bind(school);
        }
        if let Some(department) = &filter.department {
            query.push(" AND department = ").push_bind(department);
        }
        query.push(" ORDER BY id");
        let mut conn = self.pool().acquire().await?;
        let mut panels = query
            .build()
            .try_map(|row: SqliteRow| panel_from_row(&row))
            .fetch_all(&mut *conn)
            .await?;
        if let Some(specialization) = &filter.specialization {
            panels.retain(|p| p.covers(specialization));
        }
        attach_members(&mut conn, &mut panels).await?;
        Ok(panels)
    }

    /// Every panel, active or not.
    pub async fn all_panels(&self) -> Result<Vec<Panel>> {
        self.load_panels(&PanelFilter::default(), false).await
    }

    /// Put a project on a panel. The capacity check, the counter update and
    /// the project update commit together; the counter is only incremented
    /// while it is below `max_projects`, so racing assignments cannot
    /// overshoot. Moving a project off another panel releases its slot there.
    pub async fn assign_panel_to_project(
        &self,
        panel_id: PanelId,
        project_id: ProjectId,
        assigned_by: Option<&str>,
    ) -> Result<PanelAssignment> {
        let mut tx = self.pool().begin().await?;
        let mut panel = panel_in(&mut tx, panel_id)
            .await?
            .ok_or_else(|| Error::not_found("Panel not found."))?;
        let mut project = project_in(&mut tx, project_id)
            .await?
            .ok_or_else(|| Error::not_found("Project not found."))?;
        if project.panel == Some(panel_id) {
            debug!(panel_id = %panel_id, project_id = %project_id, "project already on panel");
            return Ok(PanelAssignment { panel, project });
        }
        if panel.is_at_capacity() {
            return Err(Error::PanelFull);
        }
        ensure_valid!(panel.is_active, "Panel is inactive.");
        let claimed = sqlx::query(
            "UPDATE panels SET assigned_projects_count = assigned_projects_count + 1
             WHERE id = ? AND assigned_projects_count < max_projects",
        )
        .bind(panel_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if claimed == 0 {
            return Err(Error::PanelFull);
        }
        if let Some(previous) = project.panel {
            sqlx::query(
                "UPDATE panels SET assigned_projects_count = assigned_projects_count - 1
                 WHERE id = ? AND assigned_projects_count > 0",
            )
            .bind(previous)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query("UPDATE projects SET panel_id = ? WHERE id = ?")
            .bind(panel_id)
            .bind(project_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        if let Some(assigned_by) = assigned_by {
            info!(
                panel_id = %panel_id,
                project_id = %project_id,
                previous = ?project.panel,
                assigned_by,
                "panel_assigned_to_project"
            );
        }
        panel.assigned_projects_count += 1;
        project.panel = Some(panel_id);
        Ok(PanelAssignment { panel, project })
    }

    pub async fn update_panel_members(
        &self,
        id: PanelId,
        employee_ids: &[String],
        updated_by: Option<&str>,
    ) -> Result<Panel> {
        let mut tx = self.pool().begin().await?;
        let mut panel = panel_in(&mut tx, id)
            .await?
            .ok_or_else(|| Error::not_found("Panel not found."))?;
        let faculty = validate_members_in(&mut tx, employee_ids, &panel.scope).await?;
        replace_members(&mut tx, id, &faculty).await?;
        tx.commit().await?;
        if let Some(updated_by) = updated_by {
            info!(panel_id = %id, new_member_count = faculty.len(), updated_by, "panel_members_updated");
        }
        panel.members = members_of(&faculty);
        Ok(panel)
    }

    pub async fn update_panel(&self, id: PanelId, update: PanelUpdate) -> Result<Panel> {
        let mut panel = self.panel(id).await?;
        if let Some(venue) = update.venue {
            panel.venue = venue;
        }
        if let Some(specializations) = update.specializations {
            panel.specializations = specializations;
        }
        if let Some(max_projects) = update.max_projects {
            ensure_valid!(
                max_projects >= panel.assigned_projects_count,
                "maxProjects cannot be below the number of assigned projects ({}).",
                panel.assigned_projects_count
            );
            panel.max_projects = max_projects;
        }
        if let Some(is_active) = update.is_active {
            panel.is_active = is_active;
        }
        let updated = sqlx::query(
            "UPDATE panels SET venue = ?, specializations = ?, max_projects = ?, is_active = ?
             WHERE id = ? AND assigned_projects_count <= ?",
        )
        .bind(&panel.venue)
        .bind(Json(&panel.specializations))
        .bind(panel.max_projects)
        .bind(panel.is_active)
        .bind(id)
        .bind(panel.max_projects)
        .execute(self.pool())
        .await?
        .rows_affected();
        ensure_valid!(
            updated == 1,
            "maxProjects cannot be below the number of assigned projects."
        );
        info!(panel_id = %id, is_active = panel.is_active, "panel_updated");
        Ok(panel)
    }

    /// Delete a panel no project refers to.
    pub async fn delete_panel(&self, id: PanelId, deleted_by: Option<&str>) -> Result<()> {
        let mut tx = self.pool().begin().await?;
        let referenced: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE panel_id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        ensure_valid!(
            referenced == 0,
            "Cannot delete panel with {referenced} assigned projects."
        );
        let deleted = sqlx::query("DELETE FROM panels WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(Error::not_found("Panel not found."));
        }
        tx.commit().await?;
        if let Some(deleted_by) = deleted_by {
            info!(panel_id = %id, deleted_by, "panel_deleted");
        }
        Ok(())
    }

    /// Build panels of `panel_size` faculty per specialization for every
    /// department. A department that fails is reported and the batch goes on;
    /// panels created before the failure are kept.
    pub async fn auto_create_panels(
        &self,
        departments: &[String],
        school: &str,
        academic_year: &str,
        panel_size: usize,
        created_by: Option<&str>,
        dry_run: bool,
    ) -> Result<BatchReport> {
        ensure_valid!(panel_size >= 1, "Panel size must be at least 1.");
        ensure_valid!(!departments.is_empty(), "At least one department is required.");
        let mut report = BatchReport::creation();
        for department in departments {
            let filter = FacultyFilter {
                school: Some(school.to_owned()),
                department: Some(department.clone()),
                role: Some(FacultyRole::Faculty),
                sort_by: FacultySort::EmployeeId,
                ..FacultyFilter::default()
            };
            let faculty = match self.list_faculty(&filter).await {
                Ok(faculty) => faculty.into_iter().filter(Faculty::is_specialized).collect::<Vec<_>>(),
                Err(e) => {
                    report.record_failure(Subject::Department(department.clone()), e);
                    continue;
                }
            };
            if faculty.len() < panel_size {
                report.record_failure(
                    Subject::Department(department.clone()),
                    format!("Not enough faculty. Need {panel_size}, found {}", faculty.len()),
                );
                continue;
            }
            let scope = Scope::new(academic_year, school, department);
            for draft in plan_panels(department, &faculty, panel_size) {
                let outcome = if dry_run {
                    self.validate_panel_members(&draft.members, &scope).await.map(|_| ())
                } else {
                    self.create_panel(draft.to_new_panel(&scope), created_by)
                        .await
                        .map(|_| ())
                };
                match outcome {
                    Ok(()) => {
                        report.record_created();
                        report.panels.push(draft);
                    }
                    Err(e) => {
                        warn!(department = %department, error = %e, "panel auto-creation failed");
                        report.record_failure(Subject::Department(department.clone()), e);
                        break;
                    }
                }
            }
        }
        info!(
            created = report.created.unwrap_or(0),
            errors = report.errors,
            dry_run,
            "panels_auto_created"
        );
        Ok(report)
    }

    /// Give every unassigned active project of the scope the least loaded
    /// panel covering its specialization.
    pub async fn auto_assign_panels(
        &self,
        scope: &Scope,
        assigned_by: Option<&str>,
        dry_run: bool,
    ) -> Result<BatchReport> {
        let projects = self.unassigned_projects(scope).await?;
        let filter = PanelFilter {
            academic_year: Some(scope.academic_year.clone()),
            school: Some(scope.school.clone()),
            department: Some(scope.department.clone()),
            specialization: None,
        };
        let panels = self.list_panels(&filter).await?;
        let plan = plan_assignments(&projects, &panels);
        let mut report = BatchReport::assignment();
        for project in plan.unplaced {
            report.record_failure(Subject::ProjectId(project), "No available panel found");
        }
        for assignment in plan.assignments {
            if dry_run {
                report.record_assigned(assignment);
                continue;
            }
            match self
                .assign_panel_to_project(assignment.panel_id, assignment.project_id, assigned_by)
                .await
            {
                Ok(_) => report.record_assigned(assignment),
                Err(e) => report.record_failure(Subject::ProjectId(assignment.project_id), e),
            }
        }
        info!(
            scope = %scope,
            assigned = report.assigned.unwrap_or(0),
            errors = report.errors,
            dry_run,
            "panels_auto_assigned"
        );
        Ok(report)
    }

    /// Live number of projects referencing each panel.
    pub async fn project_counts_by_panel(&self) -> Result<HashMap<PanelId, u32>> {
        let rows = sqlx::query(
            "SELECT panel_id, COUNT(*) AS n FROM projects WHERE panel_id IS NOT NULL GROUP BY panel_id",
        )
        .fetch_all(self.pool())
        .await?;
        rows.iter()
            .map(|row| Ok((row.try_get("panel_id")?, row.try_get("n")?)))
            .collect()
    }

    pub async fn reset_panel_counter(&self, id: PanelId, count: u32) -> Result<()> {
        sqlx::query("UPDATE panels SET assigned_projects_count = ? WHERE id = ?")
            .bind(count)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;

    async fn seed_faculty(store: &Store) {
        for (id, spec) in [("F001", "AI"), ("F002", "AI"), ("F003", "AI"), ("F004", "IoT")] {
            fixtures::faculty(store, id, &[spec]).await;
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_duplicate_members() {
        let store = fixtures::store().await;
        seed_faculty(&store).await;
        let err = store
            .validate_panel_members(&ids(&["F001", "F002", "F001"]), &fixtures::scope())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Duplicate faculty members in panel.");
    }

    #[tokio::test]
    async fn test_missing_members_reported_together() {
        let store = fixtures::store().await;
        seed_faculty(&store).await;
        let err = store
            .validate_panel_members(&ids(&["F001", "X9", "F002", "X7"]), &fixtures::scope())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Faculty not found: X9, X7");
    }

    #[tokio::test]
    async fn test_size_bounds() {
        let store = fixtures::store().await;
        seed_faculty(&store).await;
        store
            .upsert_department_config(DepartmentConfig {
                scope: fixtures::scope(),
                min_panel_size: 2,
                max_panel_size: 3,
            })
            .await
            .unwrap();
        let scope = fixtures::scope();
        for bad in [&["F001"][..], &["F001", "F002", "F003", "F004"][..]] {
            let err = store.validate_panel_members(&ids(bad), &scope).await.unwrap_err();
            assert_eq!(err.to_string(), "Panel size must be between 2 and 3.");
        }
        for good in [&["F001", "F002"][..], &["F001", "F002", "F003"][..]] {
            assert!(store.validate_panel_members(&ids(good), &scope).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_create_orders_members_and_defaults_capacity() {
        let store = fixtures::store().await;
        seed_faculty(&store).await;
        store
            .upsert_department_config(DepartmentConfig {
                scope: fixtures::scope(),
                min_panel_size: 2,
                max_panel_size: 4,
            })
            .await
            .unwrap();
        let panel = store
            .create_panel(
                NewPanel {
                    member_employee_ids: ids(&["F003", "F001"]),
                    scope: fixtures::scope(),
                    ..NewPanel::default()
                },
                Some("ADM1"),
            )
            .await
            .unwrap();
        assert_eq!(panel.max_projects, 8);
        let loaded = store.panel(panel.id).await.unwrap();
        let members = loaded
            .members
            .iter()
            .map(|m| (m.employee_id.as_str(), m.role))
            .collect::<Vec<_>>();
        assert_eq!(
            members,
            vec![("F003", MemberRole::Chair), ("F001", MemberRole::Member)]
        );
    }

    #[tokio::test]
    async fn test_capacity_falls_back_to_default() {
        let store = fixtures::store().await;
        seed_faculty(&store).await;
        let panel = store
            .create_panel(
                NewPanel {
                    member_employee_ids: ids(&["F001"]),
                    scope: fixtures::scope(),
                    ..NewPanel::default()
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(panel.max_projects, 10);
    }

    #[tokio::test]
    async fn test_full_panel_rejects_and_state_is_unchanged() {
        let store = fixtures::store().await;
        seed_faculty(&store).await;
        let panel = fixtures::panel(&store, &["F001", "F002"], &["AI"], 1).await;
        let p1 = fixtures::project(&store, "A", "F003", Some("AI")).await;
        let p2 = fixtures::project(&store, "B", "F003", Some("AI")).await;
        store.assign_panel_to_project(panel.id, p1.id, None).await.unwrap();
        let err = store
            .assign_panel_to_project(panel.id, p2.id, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Panel has reached maximum capacity.");
        assert_eq!(store.panel(panel.id).await.unwrap().assigned_projects_count, 1);
        assert!(store.project(p2.id).await.unwrap().panel.is_none());
    }

    #[tokio::test]
    async fn test_missing_panel_or_project() {
        let store = fixtures::store().await;
        seed_faculty(&store).await;
        let panel = fixtures::panel(&store, &["F001"], &["AI"], 2).await;
        let project = fixtures::project(&store, "A", "F003", Some("AI")).await;
        let err = store
            .assign_panel_to_project(PanelId(99), project.id, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Panel not found.");
        let err = store
            .assign_panel_to_project(panel.id, ProjectId(99), None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Project not found.");
    }

    #[tokio::test]
    async fn test_reassignment_moves_load() {
        let store = fixtures::store().await;
        seed_faculty(&store).await;
        let first = fixtures::panel(&store, &["F001"], &["AI"], 2).await;
        let second = fixtures::panel(&store, &["F002"], &["AI"], 2).await;
        let project = fixtures::project(&store, "A", "F003", Some("AI")).await;
        store.assign_panel_to_project(first.id, project.id, None).await.unwrap();
        store.assign_panel_to_project(first.id, project.id, None).await.unwrap();
        assert_eq!(store.panel(first.id).await.unwrap().assigned_projects_count, 1);
        store.assign_panel_to_project(second.id, project.id, None).await.unwrap();
        assert_eq!(store.panel(first.id).await.unwrap().assigned_projects_count, 0);
        assert_eq!(store.panel(second.id).await.unwrap().assigned_projects_count, 1);
        assert_eq!(store.project(project.id).await.unwrap().panel, Some(second.id));
    }

    #[tokio::test]
    async fn test_delete_guard() {
        let store = fixtures::store().await;
        seed_faculty(&store).await;
        let used = fixtures::panel(&store, &["F001"], &["AI"], 2).await;
        let unused = fixtures::panel(&store, &["F002"], &["AI"], 2).await;
        let project = fixtures::project(&store, "A", "F003", Some("AI")).await;
        store.assign_panel_to_project(used.id, project.id, None).await.unwrap();
        let err = store.delete_panel(used.id, None).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete panel with 1 assigned projects.");
        store.delete_panel(unused.id, Some("ADM1")).await.unwrap();
        assert!(matches!(store.panel(unused.id).await, Err(Error::NotFound(_))));
        assert!(matches!(
            store.delete_panel(unused.id, None).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_panel_guards_capacity() {
        let store = fixtures::store().await;
        seed_faculty(&store).await;
        let panel = fixtures::panel(&store, &["F001"], &["AI"], 3).await;
        for name in ["A", "B"] {
            let project = fixtures::project(&store, name, "F003", Some("AI")).await;
            store.assign_panel_to_project(panel.id, project.id, None).await.unwrap();
        }
        let shrink = PanelUpdate {
            max_projects: Some(1),
            ..PanelUpdate::default()
        };
        assert!(store.update_panel(panel.id, shrink).await.is_err());
        let deactivate = PanelUpdate {
            is_active: Some(false),
            ..PanelUpdate::default()
        };
        store.update_panel(panel.id, deactivate).await.unwrap();
        assert!(store.list_panels(&PanelFilter::default()).await.unwrap().is_empty());
        assert_eq!(store.all_panels().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_members_revalidates() {
        let store = fixtures::store().await;
        seed_faculty(&store).await;
        let panel = fixtures::panel(&store, &["F001", "F002"], &["AI"], 3).await;
        let panel = store
            .update_panel_members(panel.id, &ids(&["F004", "F001"]), Some("ADM1"))
            .await
            .unwrap();
        assert_eq!(panel.members[0].employee_id, "F004");
        assert_eq!(panel.members[0].role, MemberRole::Chair);
        assert!(store
            .update_panel_members(panel.id, &ids(&["F004", "F004"]), None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_auto_create_collects_department_errors() {
        let store = fixtures::store().await;
        seed_faculty(&store).await;
        let report = store
            .auto_create_panels(&ids(&["CSE", "ECE"]), "SCOPE", "2025-26", 3, Some("ADM1"), false)
            .await
            .unwrap();
        assert_eq!(report.created, Some(1));
        assert_eq!(report.errors, 1);
        assert_eq!(report.details[0].error, "Not enough faculty. Need 3, found 0");
        let panels = store.list_panels(&PanelFilter::default()).await.unwrap();
        assert_eq!(panels.len(), 1);
        assert!(panels[0].covers("AI"));
        assert_eq!(panels[0].members.len(), 3);
    }

    #[tokio::test]
    async fn test_auto_create_dry_run_writes_nothing() {
        let store = fixtures::store().await;
        seed_faculty(&store).await;
        let report = store
            .auto_create_panels(&ids(&["CSE"]), "SCOPE", "2025-26", 1, None, true)
            .await
            .unwrap();
        assert_eq!(report.created, Some(4));
        assert!(store.all_panels().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_auto_assign_respects_capacity() {
        let store = fixtures::store().await;
        seed_faculty(&store).await;
        let small = fixtures::panel(&store, &["F001"], &["AI"], 1).await;
        let large = fixtures::panel(&store, &["F002"], &["AI"], 2).await;
        for name in ["A", "B", "C", "D"] {
            fixtures::project(&store, name, "F003", Some("AI")).await;
        }
        fixtures::project(&store, "E", "F003", Some("IoT")).await;
        let report = store.auto_assign_panels(&fixtures::scope(), None, false).await.unwrap();
        assert_eq!(report.assigned, Some(3));
        assert_eq!(report.errors, 2);
        assert_eq!(store.panel(small.id).await.unwrap().assigned_projects_count, 1);
        assert_eq!(store.panel(large.id).await.unwrap().assigned_projects_count, 2);
        let again = store.auto_assign_panels(&fixtures::scope(), None, false).await.unwrap();
        assert_eq!(again.assigned, Some(0));
        assert_eq!(again.errors, 2);
    }
}
