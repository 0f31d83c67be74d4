use super::Scope;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct StudentId(pub i64);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    pub reg_no: String,
    pub name: String,
    pub email_id: String,
    #[serde(rename = "PAT")]
    pub pat: bool,
    #[serde(flatten)]
    pub scope: Scope,
    pub is_active: bool,
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.reg_no)
    }
}

/// One row of a student upload, already parsed by the client.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRow {
    #[serde(default)]
    pub reg_no: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email_id: String,
    #[serde(default, rename = "PAT")]
    pub pat: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFilter {
    pub academic_year: Option<String>,
    pub school: Option<String>,
    pub department: Option<String>,
    pub reg_no: Option<String>,
}
