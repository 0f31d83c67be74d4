use crate::model::{FacultyFilter, ProjectFilter};
use crate::store::Store;
use eyre::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;

#[derive(Debug, Serialize)]
struct ProjectRecord<'a> {
    id: i64,
    name: &'a str,
    academic_year: &'a str,
    school: &'a str,
    department: &'a str,
    specialization: &'a str,
    status: &'static str,
    guide_employee_id: &'a str,
    guide_name: &'a str,
    panel: &'a str,
    students: usize,
    best_project: bool,
}

/// Write one CSV line per project matching `filter`, with guide and panel
/// names resolved. Returns the number of projects written.
pub async fn export_projects<W: Write>(store: &Store, filter: &ProjectFilter, out: W) -> Result<usize> {
    let projects = store.list_projects(filter).await?;
    let guides = store
        .list_faculty(&FacultyFilter::default())
        .await?
        .into_iter()
        .map(|f| (f.id, f))
        .collect::<HashMap<_, _>>();
    let panels = store
        .all_panels()
        .await?
        .into_iter()
        .map(|p| (p.id, p.panel_name))
        .collect::<HashMap<_, _>>();
    let mut writer = csv::Writer::from_writer(out);
    for p in &projects {
        let guide = guides.get(&p.guide_faculty);
        writer.serialize(ProjectRecord {
            id: p.id.0,
            name: &p.name,
            academic_year: &p.scope.academic_year,
            school: &p.scope.school,
            department: &p.scope.department,
            specialization: p.specialization.as_deref().unwrap_or(""),
            status: p.status.as_str(),
            guide_employee_id: guide.map_or("", |g| g.employee_id.as_str()),
            guide_name: guide.map_or("", |g| g.name.as_str()),
            panel: p
                .panel
                .and_then(|id| panels.get(&id))
                .map_or("", String::as_str),
            students: p.students.len(),
            best_project: p.best_project,
        })?;
    }
    writer.flush()?;
    Ok(projects.len())
}
