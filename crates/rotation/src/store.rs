//! Storage seam between the dispatcher and the database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database::{
    click, group, rotation, Database, DatabaseError, GroupAgent, NewClick, RotationGroup,
    RotationState,
};

/// Everything the dispatcher needs to know about one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSnapshot {
    pub group: RotationGroup,
    /// Eligible agents in membership order.
    pub agents: Vec<GroupAgent>,
    pub state: RotationState,
}

/// Durable rotation state used by [`RotationDispatcher`](crate::RotationDispatcher).
///
/// Implementations must make `replace_sequence` and `claim_slot` conditional
/// on the expected sequence version so that concurrent dispatches for the same
/// group never lose a cursor step.
#[async_trait]
pub trait RotationStore: Clone + Send + Sync + 'static {
    /// Load a group by slug, whether active or not.
    async fn load_group(&self, slug: &str) -> Result<Option<GroupSnapshot>, DatabaseError>;

    /// Store a freshly generated sequence, resetting the cursor.
    ///
    /// Returns `None` if the version moved since the caller loaded it.
    async fn replace_sequence(
        &self,
        group_id: i64,
        sequence: &[String],
        basis: &str,
        expected_version: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<RotationState>, DatabaseError>;

    /// Claim the slot under the cursor and advance it with wrap-around.
    ///
    /// Returns `None` if the version moved since the caller loaded it.
    async fn claim_slot(
        &self,
        group_id: i64,
        expected_version: i64,
        sequence_len: usize,
        now: DateTime<Utc>,
    ) -> Result<Option<usize>, DatabaseError>;

    /// Append a click audit record.
    async fn record_click(&self, click: NewClick) -> Result<(), DatabaseError>;

    /// Click counts per phone number for a group.
    async fn click_distribution(&self, group_id: i64) -> Result<Vec<(String, i64)>, DatabaseError>;

    /// Total clicks for a group.
    async fn count_clicks(&self, group_id: i64) -> Result<i64, DatabaseError>;
}

#[async_trait]
impl RotationStore for Database {
    async fn load_group(&self, slug: &str) -> Result<Option<GroupSnapshot>, DatabaseError> {
        let Some(group) = group::get_group_by_slug(self.pool(), slug).await? else {
            return Ok(None);
        };

        let agents = group::list_group_agents(self.pool(), group.id).await?;
        let state = rotation::get_rotation_state(self.pool(), group.id).await?;

        Ok(Some(GroupSnapshot {
            group,
            agents,
            state,
        }))
    }

    async fn replace_sequence(
        &self,
        group_id: i64,
        sequence: &[String],
        basis: &str,
        expected_version: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<RotationState>, DatabaseError> {
        rotation::replace_sequence(self.pool(), group_id, sequence, basis, expected_version, now)
            .await
    }

    async fn claim_slot(
        &self,
        group_id: i64,
        expected_version: i64,
        sequence_len: usize,
        now: DateTime<Utc>,
    ) -> Result<Option<usize>, DatabaseError> {
        rotation::claim_slot(self.pool(), group_id, expected_version, sequence_len, now).await
    }

    async fn record_click(&self, new_click: NewClick) -> Result<(), DatabaseError> {
        click::insert_click(self.pool(), &new_click).await?;
        Ok(())
    }

    async fn click_distribution(&self, group_id: i64) -> Result<Vec<(String, i64)>, DatabaseError> {
        click::click_distribution(self.pool(), group_id).await
    }

    async fn count_clicks(&self, group_id: i64) -> Result<i64, DatabaseError> {
        click::count_clicks(self.pool(), group_id).await
    }
}
