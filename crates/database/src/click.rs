//! Click audit log.

use sqlx::SqlitePool;

use crate::models::{Click, NewClick};
use crate::Result;

/// Append a click record.
pub async fn insert_click(pool: &SqlitePool, click: &NewClick) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO clicks (agent_id, group_id, user_agent, ip_address, referrer)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(click.agent_id)
    .bind(click.group_id)
    .bind(&click.user_agent)
    .bind(&click.ip_address)
    .bind(&click.referrer)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Get recent clicks for a group.
pub async fn list_clicks(pool: &SqlitePool, group_id: i64, limit: i64) -> Result<Vec<Click>> {
    let rows = sqlx::query_as::<_, Click>(
        r#"
        SELECT id, agent_id, group_id, user_agent, ip_address, referrer, created_at
        FROM clicks
        WHERE group_id = ?
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(group_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Count clicks per agent phone number for a group.
pub async fn click_distribution(pool: &SqlitePool, group_id: i64) -> Result<Vec<(String, i64)>> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT a.phone_number, COUNT(*) as count
        FROM clicks c
        JOIN agents a ON a.id = c.agent_id
        WHERE c.group_id = ?
        GROUP BY a.phone_number
        ORDER BY count DESC, a.phone_number
        "#,
    )
    .bind(group_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Count total clicks for a group.
pub async fn count_clicks(pool: &SqlitePool, group_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM clicks WHERE group_id = ?
        "#,
    )
    .bind(group_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
