//! SQLite persistence layer for the WhatsApp link rotator.
//!
//! This crate provides async database operations for agents, rotation groups,
//! their persisted rotation state, and the click audit log using SQLx with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::{agent, group, Database, NewAgent, NewRotationGroup};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:rotator.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // Create an agent and put it in a group
//!     let alice = agent::create_agent(db.pool(), &NewAgent {
//!         owner_id: "owner-1".to_string(),
//!         name: "Alice".to_string(),
//!         phone_number: "+62 812-3456-7890".to_string(),
//!         weight: 1,
//!     }).await?;
//!     let sales = group::create_group(db.pool(), &NewRotationGroup {
//!         owner_id: "owner-1".to_string(),
//!         name: "Sales".to_string(),
//!         slug: None,
//!         strategy: "round-robin".to_string(),
//!     }).await?;
//!     group::add_member(db.pool(), sales.id, alice.id, None).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod click;
pub mod error;
pub mod group;
pub mod models;
pub mod rotation;
pub mod validation;

pub use error::{DatabaseError, Result};
pub use models::{
    Agent, Click, GroupAgent, NewAgent, NewClick, NewRotationGroup, RotationGroup,
    RotationState, Strategy,
};
pub use validation::ValidationError;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// // File database
    /// let db = database::Database::connect("sqlite:data/rotator.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing)
    /// let db = database::Database::connect("sqlite::memory:").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check that a connection can be acquired and used.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn new_agent(name: &str, phone: &str, weight: i64) -> NewAgent {
        NewAgent {
            owner_id: "owner-1".to_string(),
            name: name.to_string(),
            phone_number: phone.to_string(),
            weight,
        }
    }

    fn new_group(name: &str, strategy: &str) -> NewRotationGroup {
        NewRotationGroup {
            owner_id: "owner-1".to_string(),
            name: name.to_string(),
            slug: None,
            strategy: strategy.to_string(),
        }
    }

    #[tokio::test]
    async fn test_agent_crud() {
        let db = test_db().await;

        // Create
        let created = agent::create_agent(db.pool(), &new_agent("Alice", "+1 (415) 555-2671", 2))
            .await
            .unwrap();
        assert_eq!(created.phone_number, "14155552671");
        assert_eq!(created.weight, 2);
        assert!(created.is_active);

        // Duplicate phone for the same owner
        let dup = agent::create_agent(db.pool(), &new_agent("Alias", "14155552671", 1)).await;
        assert!(matches!(dup, Err(DatabaseError::AlreadyExists { .. })));

        // Invalid input never reaches the database
        let bad = agent::create_agent(db.pool(), &new_agent("Bob", "not-a-phone", 1)).await;
        assert!(matches!(bad, Err(DatabaseError::Validation(_))));
        let bad = agent::create_agent(db.pool(), &new_agent("Bob", "14155550000", 0)).await;
        assert!(matches!(bad, Err(DatabaseError::Validation(_))));

        // Toggle
        agent::set_agent_active(db.pool(), created.id, false).await.unwrap();
        let fetched = agent::get_agent(db.pool(), created.id).await.unwrap();
        assert!(!fetched.is_active);

        // List
        let agents = agent::list_agents(db.pool(), "owner-1").await.unwrap();
        assert_eq!(agents.len(), 1);
        assert!(agent::list_agents(db.pool(), "owner-2").await.unwrap().is_empty());

        // Delete
        agent::delete_agent(db.pool(), created.id).await.unwrap();
        let result = agent::get_agent(db.pool(), created.id).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_group_crud() {
        let db = test_db().await;

        let sales = group::create_group(db.pool(), &new_group("Sales Team", "weighted"))
            .await
            .unwrap();
        assert_eq!(sales.slug, "sales-team");
        assert_eq!(sales.strategy, "weighted");
        assert!(sales.is_active);

        let dup = group::create_group(db.pool(), &new_group("Sales Team", "random")).await;
        assert!(matches!(dup, Err(DatabaseError::AlreadyExists { .. })));

        let bad = group::create_group(db.pool(), &new_group("Support", "sticky")).await;
        assert!(matches!(bad, Err(DatabaseError::Validation(_))));

        let fetched = group::get_group_by_slug(db.pool(), "sales-team")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.id, sales.id);
        assert!(group::get_group_by_slug(db.pool(), "missing").await.unwrap().is_none());

        group::set_group_strategy(db.pool(), sales.id, "random").await.unwrap();
        group::set_group_active(db.pool(), sales.id, false).await.unwrap();
        let fetched = group::get_group(db.pool(), sales.id).await.unwrap();
        assert_eq!(fetched.strategy, "random");
        assert!(!fetched.is_active);
    }

    #[tokio::test]
    async fn test_group_agents_require_both_active_flags() {
        let db = test_db().await;

        let a = agent::create_agent(db.pool(), &new_agent("A", "10000000001", 3)).await.unwrap();
        let b = agent::create_agent(db.pool(), &new_agent("B", "10000000002", 1)).await.unwrap();
        let c = agent::create_agent(db.pool(), &new_agent("C", "10000000003", 1)).await.unwrap();
        let sales = group::create_group(db.pool(), &new_group("Sales", "weighted")).await.unwrap();

        group::add_member(db.pool(), sales.id, a.id, None).await.unwrap();
        group::add_member(db.pool(), sales.id, b.id, Some(5)).await.unwrap();
        group::add_member(db.pool(), sales.id, c.id, None).await.unwrap();

        let dup = group::add_member(db.pool(), sales.id, a.id, None).await;
        assert!(matches!(dup, Err(DatabaseError::AlreadyExists { .. })));
        let missing = group::add_member(db.pool(), sales.id, 9999, None).await;
        assert!(matches!(missing, Err(DatabaseError::NotFound { .. })));

        let members = group::list_group_agents(db.pool(), sales.id).await.unwrap();
        let phones: Vec<_> = members.iter().map(|m| m.phone_number.as_str()).collect();
        assert_eq!(phones, vec!["10000000001", "10000000002", "10000000003"]);
        // Default weight comes from the agent, explicit weight wins.
        assert_eq!(members[0].weight, 3);
        assert_eq!(members[1].weight, 5);

        agent::set_agent_active(db.pool(), b.id, false).await.unwrap();
        group::set_member_active(db.pool(), sales.id, c.id, false).await.unwrap();
        let members = group::list_group_agents(db.pool(), sales.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].agent_id, a.id);

        group::set_member_weight(db.pool(), sales.id, a.id, 7).await.unwrap();
        let members = group::list_group_agents(db.pool(), sales.id).await.unwrap();
        assert_eq!(members[0].weight, 7);
    }

    #[tokio::test]
    async fn test_weights_are_capped() {
        let db = test_db().await;

        let heaviest = new_agent("A", "10000000001", validation::MAX_WEIGHT);
        let a = agent::create_agent(db.pool(), &heaviest).await.unwrap();
        let over = agent::create_agent(db.pool(), &new_agent("B", "10000000002", 1001)).await;
        assert!(matches!(over, Err(DatabaseError::Validation(_))));

        let sales = group::create_group(db.pool(), &new_group("Sales", "weighted")).await.unwrap();
        group::add_member(db.pool(), sales.id, a.id, None).await.unwrap();

        let huge = group::set_member_weight(db.pool(), sales.id, a.id, 10_000_000_000).await;
        assert!(matches!(huge, Err(DatabaseError::Validation(_))));

        // The schema enforces the same bound for writes that skip validation.
        let raw = sqlx::query("UPDATE agent_groups SET weight = 5000 WHERE group_id = ?")
            .bind(sales.id)
            .execute(db.pool())
            .await;
        assert!(raw.is_err());

        let members = group::list_group_agents(db.pool(), sales.id).await.unwrap();
        assert_eq!(members[0].weight, validation::MAX_WEIGHT);
    }

    #[tokio::test]
    async fn test_click_distribution() {
        let db = test_db().await;

        let a = agent::create_agent(db.pool(), &new_agent("A", "10000000001", 1)).await.unwrap();
        let b = agent::create_agent(db.pool(), &new_agent("B", "10000000002", 1)).await.unwrap();
        let sales = group::create_group(db.pool(), &new_group("Sales", "round-robin"))
            .await
            .unwrap();

        for agent_id in [a.id, a.id, b.id] {
            click::insert_click(
                db.pool(),
                &NewClick {
                    agent_id,
                    group_id: Some(sales.id),
                    user_agent: Some("Mozilla/5.0".to_string()),
                    ip_address: Some("203.0.113.7".to_string()),
                    referrer: None,
                },
            )
            .await
            .unwrap();
        }
        // Ungrouped click is not attributed to the group.
        click::insert_click(db.pool(), &NewClick { agent_id: a.id, ..Default::default() })
            .await
            .unwrap();

        let distribution = click::click_distribution(db.pool(), sales.id).await.unwrap();
        assert_eq!(
            distribution,
            vec![("10000000001".to_string(), 2), ("10000000002".to_string(), 1)]
        );
        assert_eq!(click::count_clicks(db.pool(), sales.id).await.unwrap(), 3);

        let recent = click::list_clicks(db.pool(), sales.id, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].agent_id, b.id);
    }
}
