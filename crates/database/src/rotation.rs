//! Persisted rotation state: sequence, cursor, version.
//!
//! Writes are guarded by `sequence_version` so concurrent requests against the
//! same group cannot clobber each other's regeneration or lose cursor steps.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::RotationState;

#[derive(FromRow)]
struct RotationStateRow {
    id: i64,
    rotation_sequence: String,
    sequence_basis: Option<String>,
    current_index: i64,
    sequence_version: i64,
    last_sequence_update: Option<DateTime<Utc>>,
}

impl TryFrom<RotationStateRow> for RotationState {
    type Error = DatabaseError;

    fn try_from(row: RotationStateRow) -> Result<Self> {
        Ok(Self {
            group_id: row.id,
            rotation_sequence: serde_json::from_str(&row.rotation_sequence)?,
            sequence_basis: row.sequence_basis,
            current_index: row.current_index,
            sequence_version: row.sequence_version,
            last_sequence_update: row.last_sequence_update,
        })
    }
}

/// Get the rotation state for a group.
pub async fn get_rotation_state(pool: &SqlitePool, group_id: i64) -> Result<RotationState> {
    let row = sqlx::query_as::<_, RotationStateRow>(
        r#"
        SELECT id, rotation_sequence, sequence_basis, current_index, sequence_version,
               last_sequence_update
        FROM rotation_groups
        WHERE id = ?
        "#,
    )
    .bind(group_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "RotationGroup",
        id: group_id.to_string(),
    })?;

    row.try_into()
}

/// Replace a group's sequence if nobody else has since `expected_version`.
///
/// On success the cursor is reset to 0, the version is bumped and the new
/// state is returned. Returns `None` when the stored version has moved on,
/// meaning another request regenerated first.
pub async fn replace_sequence(
    pool: &SqlitePool,
    group_id: i64,
    sequence: &[String],
    basis: &str,
    expected_version: i64,
    now: DateTime<Utc>,
) -> Result<Option<RotationState>> {
    let encoded = serde_json::to_string(sequence)?;

    let result = sqlx::query(
        r#"
        UPDATE rotation_groups
        SET rotation_sequence = ?,
            sequence_basis = ?,
            current_index = 0,
            sequence_version = sequence_version + 1,
            last_sequence_update = ?
        WHERE id = ? AND sequence_version = ?
        "#,
    )
    .bind(&encoded)
    .bind(basis)
    .bind(now)
    .bind(group_id)
    .bind(expected_version)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    Ok(Some(RotationState {
        group_id,
        rotation_sequence: sequence.to_vec(),
        sequence_basis: Some(basis.to_string()),
        current_index: 0,
        sequence_version: expected_version + 1,
        last_sequence_update: Some(now),
    }))
}

/// Atomically claim the slot under the cursor and advance it by one.
///
/// The increment wraps at `sequence_len` and only applies while the stored
/// version still equals `expected_version`. Returns the claimed slot, or
/// `None` when the sequence was regenerated underneath the caller.
pub async fn claim_slot(
    pool: &SqlitePool,
    group_id: i64,
    expected_version: i64,
    sequence_len: usize,
    now: DateTime<Utc>,
) -> Result<Option<usize>> {
    if sequence_len == 0 {
        return Err(DatabaseError::NotFound {
            entity: "RotationSequence",
            id: group_id.to_string(),
        });
    }

    let len = sequence_len as i64;
    let next = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE rotation_groups
        SET current_index = (current_index + 1) % ?,
            last_sequence_update = ?
        WHERE id = ? AND sequence_version = ?
        RETURNING current_index
        "#,
    )
    .bind(len)
    .bind(now)
    .bind(group_id)
    .bind(expected_version)
    .fetch_optional(pool)
    .await?;

    Ok(next.map(|next| ((next + len - 1) % len) as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRotationGroup;
    use crate::{group, Database};

    async fn test_group(db: &Database) -> i64 {
        let group = group::create_group(
            db.pool(),
            &NewRotationGroup {
                owner_id: "owner-1".to_string(),
                name: "Sales".to_string(),
                slug: None,
                strategy: "round-robin".to_string(),
            },
        )
        .await
        .unwrap();
        group.id
    }

    fn seq(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_new_group_has_empty_state() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let group_id = test_group(&db).await;

        let state = get_rotation_state(db.pool(), group_id).await.unwrap();
        assert!(state.rotation_sequence.is_empty());
        assert_eq!(state.current_index, 0);
        assert_eq!(state.sequence_version, 0);
        assert!(state.last_sequence_update.is_none());
        assert!(state.sequence_basis.is_none());
    }

    #[tokio::test]
    async fn test_replace_sequence_is_version_guarded() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let group_id = test_group(&db).await;
        let now = Utc::now();

        let state = replace_sequence(db.pool(), group_id, &seq(&["1", "2"]), "basis", 0, now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.sequence_version, 1);

        // Stale writer loses.
        let lost = replace_sequence(db.pool(), group_id, &seq(&["3"]), "basis", 0, now)
            .await
            .unwrap();
        assert!(lost.is_none());

        let stored = get_rotation_state(db.pool(), group_id).await.unwrap();
        assert_eq!(stored.rotation_sequence, seq(&["1", "2"]));
        assert_eq!(stored.sequence_version, 1);
        assert_eq!(stored.sequence_basis.as_deref(), Some("basis"));
        assert!(stored.last_sequence_update.is_some());
    }

    #[tokio::test]
    async fn test_claim_slot_wraps_and_resets() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let group_id = test_group(&db).await;
        let now = Utc::now();

        replace_sequence(db.pool(), group_id, &seq(&["1", "2", "3"]), "b", 0, now)
            .await
            .unwrap()
            .unwrap();

        let mut claimed = Vec::new();
        for _ in 0..4 {
            claimed.push(claim_slot(db.pool(), group_id, 1, 3, now).await.unwrap().unwrap());
        }
        assert_eq!(claimed, vec![0, 1, 2, 0]);

        let state = get_rotation_state(db.pool(), group_id).await.unwrap();
        assert_eq!(state.current_index, 1);

        // Old version can no longer claim.
        assert!(claim_slot(db.pool(), group_id, 0, 3, now).await.unwrap().is_none());

        // Regeneration resets the cursor.
        replace_sequence(db.pool(), group_id, &seq(&["1", "2"]), "b", 1, now)
            .await
            .unwrap()
            .unwrap();
        let state = get_rotation_state(db.pool(), group_id).await.unwrap();
        assert_eq!(state.current_index, 0);
        assert_eq!(state.sequence_version, 2);
    }

    #[tokio::test]
    async fn test_claim_slot_rejects_empty_sequence() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let group_id = test_group(&db).await;

        let result = claim_slot(db.pool(), group_id, 0, 0, Utc::now()).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }
}
