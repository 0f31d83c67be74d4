use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct FacultyId(pub i64);

impl fmt::Display for FacultyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role held by a faculty record. Project coordinators are faculty with a
/// coordinator assignment, not a separate role on the record.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacultyRole {
    Admin,
    #[default]
    Faculty,
}

impl FacultyRole {
    pub fn as_str(self) -> &'static str {
        match self {
            FacultyRole::Admin => "admin",
            FacultyRole::Faculty => "faculty",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(FacultyRole::Admin),
            "faculty" => Some(FacultyRole::Faculty),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faculty {
    pub id: FacultyId,
    pub employee_id: String,
    pub name: String,
    pub email_id: String,
    pub role: FacultyRole,
    pub specialization: BTreeSet<String>,
    pub schools: Vec<String>,
    pub departments: Vec<String>,
}

impl Faculty {
    pub fn is_specialized(&self) -> bool {
        !self.specialization.is_empty()
    }
}

impl fmt::Display for Faculty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.employee_id)
    }
}

/// Payload used to create a faculty record.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFaculty {
    #[serde(default)]
    pub employee_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email_id: String,
    #[serde(default)]
    pub role: FacultyRole,
    #[serde(default)]
    pub specialization: BTreeSet<String>,
    #[serde(default, alias = "school")]
    pub schools: Vec<String>,
    #[serde(default, alias = "department")]
    pub departments: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyUpdate {
    pub name: Option<String>,
    pub email_id: Option<String>,
    pub specialization: Option<BTreeSet<String>>,
    #[serde(alias = "school")]
    pub schools: Option<Vec<String>>,
    #[serde(alias = "department")]
    pub departments: Option<Vec<String>>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FacultySort {
    #[default]
    Name,
    EmployeeId,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyFilter {
    pub school: Option<String>,
    pub department: Option<String>,
    pub specialization: Option<String>,
    pub role: Option<FacultyRole>,
    #[serde(default)]
    pub sort_by: FacultySort,
    #[serde(default)]
    pub sort_order: SortOrder,
}

/// A faculty member coordinating projects for one academic scope.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCoordinator {
    pub id: i64,
    pub faculty: FacultyId,
    pub employee_id: String,
    pub name: String,
    #[serde(flatten)]
    pub scope: super::Scope,
    pub is_primary: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCoordinator {
    #[serde(default)]
    pub employee_id: String,
    #[serde(flatten)]
    pub scope: super::Scope,
    #[serde(default)]
    pub is_primary: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn faculty(specialization: &[&str]) -> Faculty {
        Faculty {
            id: FacultyId(1),
            employee_id: "F001".into(),
            name: "Asha".into(),
            email_id: "asha@example.edu".into(),
            role: FacultyRole::Faculty,
            specialization: specialization.iter().map(|s| s.to_string()).collect(),
            schools: vec!["SCOPE".into()],
            departments: vec!["CSE".into(), "IT".into()],
        }
    }

    #[test]
    fn test_is_specialized() {
        let f = faculty(&["AI"]);
        assert!(f.is_specialized());
        assert!(!faculty(&[]).is_specialized());
    }
}
