//! Subscription persistence

use chrono::{NaiveDate, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Charge, NewSubscription, RecurringDuration, Subscription};
use crate::repository::SubscriptionRepository;

const COLUMNS: &str = "id, title, description, url, price, charges, currency, recurring_duration, start_date, created_at";

/// Map a row selected with [`COLUMNS`]
fn row_to_subscription(row: &Row) -> rusqlite::Result<Subscription> {
    let charges_json: Option<String> = row.get(5)?;
    let duration_str: String = row.get(7)?;
    let start_str: String = row.get(8)?;
    let created_str: String = row.get(9)?;

    let charges = match charges_json {
        Some(json) => Some(serde_json::from_str::<Vec<Charge>>(&json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
        })?),
        None => None,
    };

    Ok(Subscription {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        url: row.get(3)?,
        price: row.get(4)?,
        charges,
        currency: row.get(6)?,
        recurring_duration: duration_str.parse::<RecurringDuration>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, Type::Text, e.into())
        })?,
        start_date: NaiveDate::parse_from_str(&start_str, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e))
        })?,
        created_at: parse_datetime(&created_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                9,
                Type::Text,
                format!("invalid timestamp '{}'", created_str).into(),
            )
        })?,
    })
}

fn charges_json(charges: &Option<Vec<Charge>>) -> Result<Option<String>> {
    Ok(match charges {
        Some(charges) if !charges.is_empty() => Some(serde_json::to_string(charges)?),
        _ => None,
    })
}

fn insert(conn: &Connection, user_id: &str, new: &NewSubscription) -> Result<Subscription> {
    let sub = new.clone().into_subscription(Utc::now());
    conn.execute(
        r#"
        INSERT INTO subscriptions
            (id, user_id, title, description, url, price, charges, currency, recurring_duration, start_date, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            sub.id,
            user_id,
            sub.title,
            sub.description,
            sub.url,
            sub.price,
            charges_json(&sub.charges)?,
            sub.currency,
            sub.recurring_duration.as_str(),
            sub.start_date.to_string(),
            sub.created_at.to_rfc3339(),
        ],
    )?;
    Ok(sub)
}

fn delete_ids(conn: &Connection, user_id: &str, ids: &[String]) -> Result<usize> {
    let mut stmt = conn.prepare("DELETE FROM subscriptions WHERE id = ? AND user_id = ?")?;
    let mut removed = 0;
    for id in ids {
        removed += stmt.execute(params![id, user_id])?;
    }
    Ok(removed)
}

impl SubscriptionRepository for Database {
    fn get_all(&self, user_id: &str) -> Result<Vec<Subscription>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = ? ORDER BY rowid",
            COLUMNS
        ))?;
        let subs = stmt
            .query_map(params![user_id], row_to_subscription)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(subs)
    }

    fn get_by_id(&self, user_id: &str, id: &str) -> Result<Option<Subscription>> {
        let conn = self.conn()?;
        let sub = conn
            .query_row(
                &format!(
                    "SELECT {} FROM subscriptions WHERE id = ? AND user_id = ?",
                    COLUMNS
                ),
                params![id, user_id],
                row_to_subscription,
            )
            .optional()?;
        Ok(sub)
    }

    fn create(&self, user_id: &str, new: &NewSubscription) -> Result<Subscription> {
        let conn = self.conn()?;
        let sub = insert(&conn, user_id, new)?;
        debug!(id = %sub.id, "Subscription stored");
        Ok(sub)
    }

    fn update(&self, user_id: &str, id: &str, new: &NewSubscription) -> Result<Subscription> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE subscriptions
            SET title = ?, description = ?, url = ?, price = ?, charges = ?,
                currency = ?, recurring_duration = ?, start_date = ?
            WHERE id = ? AND user_id = ?
            "#,
            params![
                new.title,
                new.description,
                new.url,
                new.price,
                charges_json(&new.charges)?,
                new.currency,
                new.recurring_duration.as_str(),
                new.start_date.to_string(),
                id,
                user_id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::not_found(id));
        }
        drop(conn);

        self.get_by_id(user_id, id)?
            .ok_or_else(|| Error::not_found(id))
    }

    fn delete(&self, user_id: &str, id: &str) -> Result<()> {
        let conn = self.conn()?;
        match delete_ids(&conn, user_id, &[id.to_string()])? {
            0 => Err(Error::not_found(id)),
            _ => Ok(()),
        }
    }

    fn bulk_create(&self, user_id: &str, items: &[NewSubscription]) -> Result<Vec<Subscription>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let created = items
            .iter()
            .map(|item| insert(&tx, user_id, item))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;
        Ok(created)
    }

    fn bulk_delete(&self, user_id: &str, ids: &[String]) -> Result<usize> {
        let conn = self.conn()?;
        delete_ids(&conn, user_id, ids)
    }

    /// Delete and recreate in one transaction; on failure nothing changes
    fn replace_all(&self, user_id: &str, items: &[NewSubscription]) -> Result<Vec<Subscription>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM subscriptions WHERE user_id = ?",
            params![user_id],
        )?;
        let created = items
            .iter()
            .map(|item| insert(&tx, user_id, item))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;

        info!(removed, created = created.len(), "Replaced subscriptions");
        Ok(created)
    }
}
