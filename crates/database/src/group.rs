//! Rotation group and membership operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{GroupAgent, NewRotationGroup, RotationGroup};
use crate::validation::{
    slugify, validate_name, validate_slug, validate_strategy, validate_weight,
};

/// Create a new rotation group.
///
/// When no slug is given it is derived from the group name.
pub async fn create_group(pool: &SqlitePool, group: &NewRotationGroup) -> Result<RotationGroup> {
    validate_name(&group.name)?;
    validate_strategy(&group.strategy)?;

    let slug = match &group.slug {
        Some(slug) => slug.trim().to_string(),
        None => slugify(&group.name),
    };
    validate_slug(&slug)?;

    let result = sqlx::query(
        r#"
        INSERT INTO rotation_groups (owner_id, name, slug, strategy)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&group.owner_id)
    .bind(group.name.trim())
    .bind(&slug)
    .bind(&group.strategy)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "RotationGroup",
                    id: slug.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    get_group(pool, result.last_insert_rowid()).await
}

/// Get a rotation group by ID.
pub async fn get_group(pool: &SqlitePool, id: i64) -> Result<RotationGroup> {
    sqlx::query_as::<_, RotationGroup>(
        r#"
        SELECT id, owner_id, name, slug, strategy, is_active, created_at
        FROM rotation_groups
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "RotationGroup",
        id: id.to_string(),
    })
}

/// Get a rotation group by slug.
///
/// Returns `None` rather than an error so callers can decide how a missing
/// group is reported.
pub async fn get_group_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<RotationGroup>> {
    let group = sqlx::query_as::<_, RotationGroup>(
        r#"
        SELECT id, owner_id, name, slug, strategy, is_active, created_at
        FROM rotation_groups
        WHERE slug = ?
        "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(group)
}

/// Change a group's distribution strategy.
pub async fn set_group_strategy(pool: &SqlitePool, id: i64, strategy: &str) -> Result<()> {
    validate_strategy(strategy)?;

    let result = sqlx::query(
        r#"
        UPDATE rotation_groups
        SET strategy = ?
        WHERE id = ?
        "#,
    )
    .bind(strategy)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "RotationGroup",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Activate or deactivate a group.
pub async fn set_group_active(pool: &SqlitePool, id: i64, is_active: bool) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE rotation_groups
        SET is_active = ?
        WHERE id = ?
        "#,
    )
    .bind(is_active)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "RotationGroup",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Add an agent to a group.
///
/// Uses the agent's default weight when `weight` is `None`.
pub async fn add_member(
    pool: &SqlitePool,
    group_id: i64,
    agent_id: i64,
    weight: Option<i64>,
) -> Result<()> {
    if let Some(weight) = weight {
        validate_weight(weight)?;
    }

    let result = sqlx::query(
        r#"
        INSERT INTO agent_groups (agent_id, group_id, weight)
        SELECT id, ?, COALESCE(?, weight)
        FROM agents
        WHERE id = ?
        "#,
    )
    .bind(group_id)
    .bind(weight)
    .bind(agent_id)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "GroupMember",
                    id: format!("{}/{}", group_id, agent_id),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Agent",
            id: agent_id.to_string(),
        });
    }

    Ok(())
}

/// Activate or deactivate an agent's membership in a group.
pub async fn set_member_active(
    pool: &SqlitePool,
    group_id: i64,
    agent_id: i64,
    is_active: bool,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE agent_groups
        SET is_active = ?
        WHERE group_id = ? AND agent_id = ?
        "#,
    )
    .bind(is_active)
    .bind(group_id)
    .bind(agent_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "GroupMember",
            id: format!("{}/{}", group_id, agent_id),
        });
    }

    Ok(())
}

/// Change an agent's weight within a group.
pub async fn set_member_weight(
    pool: &SqlitePool,
    group_id: i64,
    agent_id: i64,
    weight: i64,
) -> Result<()> {
    validate_weight(weight)?;

    let result = sqlx::query(
        r#"
        UPDATE agent_groups
        SET weight = ?
        WHERE group_id = ? AND agent_id = ?
        "#,
    )
    .bind(weight)
    .bind(group_id)
    .bind(agent_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "GroupMember",
            id: format!("{}/{}", group_id, agent_id),
        });
    }

    Ok(())
}

/// List the agents eligible for rotation in a group, in membership order.
///
/// An agent is eligible only when both the agent itself and its membership
/// are active.
pub async fn list_group_agents(pool: &SqlitePool, group_id: i64) -> Result<Vec<GroupAgent>> {
    let agents = sqlx::query_as::<_, GroupAgent>(
        r#"
        SELECT a.id AS agent_id, a.name, a.phone_number, ag.weight
        FROM agent_groups ag
        JOIN agents a ON a.id = ag.agent_id
        WHERE ag.group_id = ? AND ag.is_active = 1 AND a.is_active = 1
        ORDER BY ag.id
        "#,
    )
    .bind(group_id)
    .fetch_all(pool)
    .await?;

    Ok(agents)
}
