use super::Store;
use crate::error::{Error, Result, ensure_valid};
use crate::model::*;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use tracing::{debug, info};

const BROADCAST_COLUMNS: &str = "id, title, message, target_schools, target_departments, target_academic_years, \
                                 created_by, created_by_employee_id, created_by_name, created_at, expires_at, \
                                 is_active, action, priority";

fn broadcast_from_row(row: &SqliteRow) -> Result<Broadcast, sqlx::Error> {
    let action: String = row.try_get("action")?;
    let priority: String = row.try_get("priority")?;
    Ok(Broadcast {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        target_schools: row.try_get::<Json<_>, _>("target_schools")?.0,
        target_departments: row.try_get::<Json<_>, _>("target_departments")?.0,
        target_academic_years: row.try_get::<Json<_>, _>("target_academic_years")?.0,
        created_by: row.try_get("created_by")?,
        created_by_employee_id: row.try_get("created_by_employee_id")?,
        created_by_name: row.try_get("created_by_name")?,
        created_at: row.try_get("created_at")?,
        expires_at: row.try_get("expires_at")?,
        is_active: row.try_get("is_active")?,
        action: BroadcastAction::parse(&action).unwrap_or_default(),
        priority: Priority::parse(&priority).unwrap_or_default(),
    })
}

fn parse_action(value: Option<&str>) -> Result<Option<BroadcastAction>> {
    value
        .map(|v| BroadcastAction::parse(v).ok_or_else(|| Error::validation("Action must be notice or block.")))
        .transpose()
}

fn parse_priority(value: Option<&str>) -> Result<Option<Priority>> {
    value
        .map(|v| {
            Priority::parse(v).ok_or_else(|| Error::validation("Priority must be low, medium, high or urgent."))
        })
        .transpose()
}

impl Store {
    pub async fn create_broadcast(&self, creator: &Faculty, new: NewBroadcast) -> Result<Broadcast> {
        ensure_valid!(!new.message.is_empty(), "Broadcast message is required.");
        let expires_at = new
            .expires_at
            .ok_or_else(|| Error::validation("Expiry time is required."))?;
        let now = Utc::now();
        ensure_valid!(expires_at > now, "Expiry time must be in the future.");
        let action = parse_action(new.action.as_deref())?.unwrap_or_default();
        let priority = parse_priority(new.priority.as_deref())?.unwrap_or_default();
        let id = sqlx::query(
            "INSERT INTO broadcasts (title, message, target_schools, target_departments, target_academic_years,
                                     created_by, created_by_employee_id, created_by_name, created_at, expires_at,
                                     is_active, action, priority)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(&new.title)
        .bind(&new.message)
        .bind(Json(&new.target_schools))
        .bind(Json(&new.target_departments))
        .bind(Json(&new.target_academic_years))
        .bind(creator.id)
        .bind(&creator.employee_id)
        .bind(&creator.name)
        .bind(now)
        .bind(expires_at)
        .bind(action.as_str())
        .bind(priority.as_str())
        .execute(self.pool())
        .await?
        .last_insert_rowid();
        info!(
            broadcast_id = id,
            created_by = %creator.employee_id,
            action = action.as_str(),
            priority = priority.as_str(),
            "broadcast_created"
        );
        Ok(Broadcast {
            id: BroadcastId(id),
            title: new.title,
            message: new.message,
            target_schools: new.target_schools,
            target_departments: new.target_departments,
            target_academic_years: new.target_academic_years,
            created_by: creator.id,
            created_by_employee_id: creator.employee_id.clone(),
            created_by_name: creator.name.clone(),
            created_at: now,
            expires_at,
            is_active: true,
            action,
            priority,
        })
    }

    pub async fn broadcast(&self, id: BroadcastId) -> Result<Broadcast> {
        sqlx::query(&format!("SELECT {BROADCAST_COLUMNS} FROM broadcasts WHERE id = ?"))
            .bind(id)
            .try_map(|row: SqliteRow| broadcast_from_row(&row))
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| Error::not_found("Broadcast not found."))
    }

    /// Switch off every active broadcast whose expiry has passed.
    pub async fn deactivate_expired_broadcasts(&self, now: DateTime<Utc>) -> Result<u64> {
        let n = sqlx::query("UPDATE broadcasts SET is_active = 0 WHERE is_active = 1 AND expires_at <= ?")
            .bind(now)
            .execute(self.pool())
            .await?
            .rows_affected();
        if n > 0 {
            debug!(count = n, "expired broadcasts deactivated");
        }
        Ok(n)
    }

    /// Broadcasts matching the filter, newest first. Expired ones are
    /// deactivated before anything is read.
    pub async fn list_broadcasts(&self, filter: &BroadcastFilter) -> Result<Vec<Broadcast>> {
        self.deactivate_expired_broadcasts(Utc::now()).await?;
        let audience = filter.audience();
        let all = sqlx::query(&format!(
            "SELECT {BROADCAST_COLUMNS} FROM broadcasts ORDER BY created_at DESC, id DESC"
        ))
        .try_map(|row: SqliteRow| broadcast_from_row(&row))
        .fetch_all(self.pool())
        .await?;
        Ok(all
            .into_iter()
            .filter(|b| filter.is_active.is_none_or(|active| b.is_active == active))
            .filter(|b| filter.action.is_none_or(|action| b.action == action))
            .filter(|b| b.reaches(&audience))
            .collect())
    }

    /// Active broadcasts reaching the given audience.
    pub async fn active_broadcasts_for(&self, audience: Audience) -> Result<Vec<Broadcast>> {
        self.list_broadcasts(&BroadcastFilter {
            is_active: Some(true),
            action: None,
            school: audience.school,
            department: audience.department,
            academic_year: audience.academic_year,
        })
        .await
    }

    pub async fn update_broadcast(&self, id: BroadcastId, update: BroadcastUpdate) -> Result<Broadcast> {
        let mut broadcast = self.broadcast(id).await?;
        if let Some(title) = update.title {
            broadcast.title = title;
        }
        if let Some(message) = update.message {
            ensure_valid!(!message.is_empty(), "Broadcast message is required.");
            broadcast.message = message;
        }
        if let Some(schools) = update.target_schools {
            broadcast.target_schools = schools;
        }
        if let Some(departments) = update.target_departments {
            broadcast.target_departments = departments;
        }
        if let Some(years) = update.target_academic_years {
            broadcast.target_academic_years = years;
        }
        if let Some(expires_at) = update.expires_at {
            broadcast.expires_at = expires_at;
        }
        if let Some(is_active) = update.is_active {
            broadcast.is_active = is_active;
        }
        if let Some(action) = parse_action(update.action.as_deref())? {
            broadcast.action = action;
        }
        if let Some(priority) = parse_priority(update.priority.as_deref())? {
            broadcast.priority = priority;
        }
        sqlx::query(
            "UPDATE broadcasts SET title = ?, message = ?, target_schools = ?, target_departments = ?,
                                   target_academic_years = ?, expires_at = ?, is_active = ?, action = ?, priority = ?
             WHERE id = ?",
        )
        .bind(&broadcast.title)
        .bind(&broadcast.message)
        .bind(Json(&broadcast.target_schools))
        .bind(Json(&broadcast.target_departments))
        .bind(Json(&broadcast.target_academic_years))
        .bind(broadcast.expires_at)
        .bind(broadcast.is_active)
        .bind(broadcast.action.as_str())
        .bind(broadcast.priority.as_str())
        .bind(id)
        .execute(self.pool())
        .await?;
        info!(broadcast_id = %id, is_active = broadcast.is_active, "broadcast_updated");
        Ok(broadcast)
    }

    pub async fn delete_broadcast(&self, id: BroadcastId) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM broadcasts WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(Error::not_found("Broadcast not found."));
        }
        info!(broadcast_id = %id, "broadcast_deleted");
        Ok(())
    }
}
