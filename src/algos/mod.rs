pub use self::auto_assign::{AssignmentPlan, plan_assignments};
pub use self::auto_create::{PanelDraft, group_by_specialization, plan_panels};

mod auto_assign;
mod auto_create;
