use crate::model::{Panel, PanelId};
use crate::store::Store;
use eyre::Result;
use std::collections::HashMap;
use tracing::warn;

/// A panel whose stored project counter disagrees with the projects that
/// actually reference it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CounterDrift {
    pub panel: PanelId,
    pub panel_name: String,
    pub stored: u32,
    pub actual: u32,
    pub max_projects: u32,
}

impl CounterDrift {
    /// The counter cannot be reset past the panel capacity.
    pub fn is_fixable(&self) -> bool {
        self.actual <= self.max_projects
    }
}

pub fn counter_drifts(panels: &[Panel], counts: &HashMap<PanelId, u32>) -> Vec<CounterDrift> {
    panels
        .iter()
        .filter_map(|p| {
            let actual = counts.get(&p.id).copied().unwrap_or(0);
            (actual != p.assigned_projects_count).then(|| CounterDrift {
                panel: p.id,
                panel_name: p.panel_name.clone(),
                stored: p.assigned_projects_count,
                actual,
                max_projects: p.max_projects,
            })
        })
        .collect()
}

/// Compare every panel counter with the live project references. With `fix`,
/// drifting counters are reset to the live value when it fits the capacity.
pub async fn check_panel_counters(store: &Store, fix: bool) -> Result<Vec<CounterDrift>> {
    let panels = store.all_panels().await?;
    let counts = store.project_counts_by_panel().await?;
    let drifts = counter_drifts(&panels, &counts);
    for drift in &drifts {
        warn!(
            panel = %drift.panel,
            stored = drift.stored,
            actual = drift.actual,
            "panel counter does not match assigned projects"
        );
        if fix {
            if drift.is_fixable() {
                store.reset_panel_counter(drift.panel, drift.actual).await?;
            } else {
                warn!(panel = %drift.panel, max = drift.max_projects, "panel is over capacity, not fixing");
            }
        }
    }
    Ok(drifts)
}
