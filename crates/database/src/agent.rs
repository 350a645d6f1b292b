//! Agent CRUD operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Agent, NewAgent};
use crate::validation::{normalize_phone_number, validate_name, validate_weight};

/// Create a new agent.
///
/// The phone number is normalized to digits only before it is stored.
pub async fn create_agent(pool: &SqlitePool, agent: &NewAgent) -> Result<Agent> {
    validate_name(&agent.name)?;
    validate_weight(agent.weight)?;
    let phone_number = normalize_phone_number(&agent.phone_number)?;

    let result = sqlx::query(
        r#"
        INSERT INTO agents (owner_id, name, phone_number, weight)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&agent.owner_id)
    .bind(agent.name.trim())
    .bind(&phone_number)
    .bind(agent.weight)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "Agent",
                    id: phone_number.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    get_agent(pool, result.last_insert_rowid()).await
}

/// Get an agent by ID.
pub async fn get_agent(pool: &SqlitePool, id: i64) -> Result<Agent> {
    sqlx::query_as::<_, Agent>(
        r#"
        SELECT id, owner_id, name, phone_number, weight, is_active, created_at, updated_at
        FROM agents
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Agent",
        id: id.to_string(),
    })
}

/// List all agents belonging to an owner.
pub async fn list_agents(pool: &SqlitePool, owner_id: &str) -> Result<Vec<Agent>> {
    let agents = sqlx::query_as::<_, Agent>(
        r#"
        SELECT id, owner_id, name, phone_number, weight, is_active, created_at, updated_at
        FROM agents
        WHERE owner_id = ?
        ORDER BY name, id
        "#,
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(agents)
}

/// Activate or deactivate an agent.
///
/// Deactivated agents drop out of every group's rotation on the next request.
pub async fn set_agent_active(pool: &SqlitePool, id: i64, is_active: bool) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE agents
        SET is_active = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(is_active)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Agent",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Delete an agent by ID.
///
/// Memberships and click history cascade with it.
pub async fn delete_agent(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM agents
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Agent",
            id: id.to_string(),
        });
    }

    Ok(())
}
