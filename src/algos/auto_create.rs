use crate::model::{Faculty, NewPanel, Scope};
use serde::Serialize;
use std::collections::BTreeMap;

/// A panel proposed by auto-creation, not yet persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelDraft {
    pub panel_name: String,
    pub department: String,
    pub specialization: String,
    pub members: Vec<String>,
}

impl PanelDraft {
    pub fn to_new_panel(&self, scope: &Scope) -> NewPanel {
        NewPanel {
            member_employee_ids: self.members.clone(),
            scope: scope.clone(),
            venue: String::new(),
            specializations: [self.specialization.clone()].into(),
            panel_name: Some(self.panel_name.clone()),
            max_projects: None,
        }
    }
}

/// Faculty grouped by specialization, keeping their relative order. A
/// faculty with several specializations appears in every matching group.
pub fn group_by_specialization(faculty: &[Faculty]) -> BTreeMap<&str, Vec<&Faculty>> {
    let mut groups: BTreeMap<&str, Vec<&Faculty>> = BTreeMap::new();
    for f in faculty {
        for specialization in &f.specialization {
            groups.entry(specialization.as_str()).or_default().push(f);
        }
    }
    groups
}

/// Cut every specialization group into panels of exactly `panel_size`
/// members. Leftover faculty in a group get no panel.
pub fn plan_panels(department: &str, faculty: &[Faculty], panel_size: usize) -> Vec<PanelDraft> {
    if panel_size == 0 {
        return Vec::new();
    }
    let mut drafts = Vec::new();
    for (specialization, members) in group_by_specialization(faculty) {
        for (n, chunk) in members.chunks_exact(panel_size).enumerate() {
            drafts.push(PanelDraft {
                panel_name: format!("{department}-{specialization}-{}", n + 1),
                department: department.to_owned(),
                specialization: specialization.to_owned(),
                members: chunk.iter().map(|f| f.employee_id.clone()).collect(),
            });
        }
    }
    drafts
}
