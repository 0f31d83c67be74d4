use super::FacultyId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct BroadcastId(pub i64);

impl fmt::Display for BroadcastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastAction {
    #[default]
    Notice,
    Block,
}

impl BroadcastAction {
    pub fn as_str(self) -> &'static str {
        match self {
            BroadcastAction::Notice => "notice",
            BroadcastAction::Block => "block",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "notice" => Some(BroadcastAction::Notice),
            "block" => Some(BroadcastAction::Block),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Broadcast {
    pub id: BroadcastId,
    pub title: String,
    pub message: String,
    pub target_schools: Vec<String>,
    pub target_departments: Vec<String>,
    pub target_academic_years: Vec<String>,
    pub created_by: FacultyId,
    pub created_by_employee_id: String,
    pub created_by_name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub action: BroadcastAction,
    pub priority: Priority,
}

/// An empty target list reaches everyone.
fn targets(list: &[String], value: Option<&str>) -> bool {
    value.is_none_or(|v| list.is_empty() || list.iter().any(|x| x == v))
}

impl Broadcast {
    pub fn reaches(&self, audience: &Audience) -> bool {
        targets(&self.target_schools, audience.school.as_deref())
            && targets(&self.target_departments, audience.department.as_deref())
            && targets(&self.target_academic_years, audience.academic_year.as_deref())
    }
}

/// Action and priority stay strings here so that unknown values surface as
/// validation messages rather than deserialisation failures.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBroadcast {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub target_schools: Vec<String>,
    #[serde(default)]
    pub target_departments: Vec<String>,
    #[serde(default)]
    pub target_academic_years: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub action: Option<String>,
    pub priority: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastUpdate {
    pub title: Option<String>,
    pub message: Option<String>,
    pub target_schools: Option<Vec<String>>,
    pub target_departments: Option<Vec<String>>,
    pub target_academic_years: Option<Vec<String>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
    pub action: Option<String>,
    pub priority: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audience {
    pub school: Option<String>,
    pub department: Option<String>,
    pub academic_year: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastFilter {
    pub is_active: Option<bool>,
    pub action: Option<BroadcastAction>,
    pub school: Option<String>,
    pub department: Option<String>,
    pub academic_year: Option<String>,
}

impl BroadcastFilter {
    pub fn audience(&self) -> Audience {
        Audience {
            school: self.school.clone(),
            department: self.department.clone(),
            academic_year: self.academic_year.clone(),
        }
    }
}
