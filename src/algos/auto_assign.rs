use crate::model::{Assignment, Panel, PanelId, Project, ProjectId};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct AssignmentPlan {
    pub assignments: Vec<Assignment>,
    /// Projects for which no eligible panel had room.
    pub unplaced: Vec<ProjectId>,
}

/// Place every unassigned project on the least loaded active panel that
/// covers its specialization and still has room, lowest panel id first on
/// ties. Loads are tracked as projects are placed so no panel is planned
/// past its capacity.
pub fn plan_assignments(projects: &[Project], panels: &[Panel]) -> AssignmentPlan {
    let mut load = panels
        .iter()
        .map(|p| (p.id, p.assigned_projects_count))
        .collect::<HashMap<PanelId, u32>>();
    let mut plan = AssignmentPlan::default();
    for project in projects.iter().filter(|p| p.is_unassigned()) {
        let chosen = project.specialization.as_deref().and_then(|specialization| {
            panels
                .iter()
                .filter(|p| p.is_active && p.covers(specialization))
                .filter(|p| load[&p.id] < p.max_projects)
                .min_by_key(|p| (load[&p.id], p.id))
        });
        match chosen {
            Some(panel) => {
                if let Some(n) = load.get_mut(&panel.id) {
                    *n += 1;
                }
                plan.assignments.push(Assignment {
                    project_id: project.id,
                    panel_id: panel.id,
                });
            }
            None => plan.unplaced.push(project.id),
        }
    }
    plan
}
