use serde::{Deserialize, Serialize};
use std::fmt;

/// Academic scope shared by panels, projects, students and configuration.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub academic_year: String,
    pub school: String,
    pub department: String,
}

impl Scope {
    pub fn new(academic_year: &str, school: &str, department: &str) -> Self {
        Self {
            academic_year: academic_year.to_owned(),
            school: school.to_owned(),
            department: department.to_owned(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.academic_year.is_empty() && !self.school.is_empty() && !self.department.is_empty()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.academic_year, self.school, self.department)
    }
}

/// Optional scope filters used by list endpoints.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeFilter {
    pub academic_year: Option<String>,
    pub school: Option<String>,
    pub department: Option<String>,
}

/// Panel size bounds configured for one academic scope.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentConfig {
    #[serde(flatten)]
    pub scope: Scope,
    pub min_panel_size: u32,
    pub max_panel_size: u32,
}

impl DepartmentConfig {
    pub fn accepts_panel_size(&self, n: usize) -> bool {
        (self.min_panel_size as usize..=self.max_panel_size as usize).contains(&n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_panel_size() {
        let config = DepartmentConfig {
            scope: Scope::new("2025-26", "SCOPE", "CSE"),
            min_panel_size: 2,
            max_panel_size: 4,
        };
        assert!(!config.accepts_panel_size(1));
        assert!(config.accepts_panel_size(2));
        assert!(config.accepts_panel_size(4));
        assert!(!config.accepts_panel_size(5));
    }
}
