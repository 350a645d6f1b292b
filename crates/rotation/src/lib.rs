//! Rotation engine for the WhatsApp link rotator.
//!
//! Each rotation group keeps a precomputed sequence of agent phone numbers and
//! a persisted cursor. Visitors are served by walking that sequence instead of
//! recomputing a choice on every hit.
//!
//! - [`sequence`] builds round-robin, random and weighted sequences.
//! - [`stats`] checks sequence coverage and measures fairness.
//! - [`staleness`] decides when a stored sequence must be rebuilt.
//! - [`RotationDispatcher`] ties it together against a [`RotationStore`].
//!
//! # Example
//!
//! ```no_run
//! use database::Database;
//! use rotation::{RequestMeta, RotationDispatcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect("sqlite:rotator.db?mode=rwc").await?;
//! db.migrate().await?;
//!
//! let dispatcher = RotationDispatcher::new(db);
//! let dispatch = dispatcher.dispatch("sales", RequestMeta::default()).await?;
//! println!("redirect to {}", dispatch.redirect_url);
//! # Ok(())
//! # }
//! ```

pub mod click;
pub mod dispatcher;
pub mod error;
pub mod link;
pub mod sequence;
pub mod staleness;
pub mod stats;
pub mod store;

pub use click::{spawn_click_log, RequestMeta};
pub use dispatcher::{
    Dispatch, GroupDiagnostics, RotationConfig, RotationDiagnostics, RotationDispatcher,
    SequenceGenerator,
};
pub use error::{Result, RotationError};
pub use link::wa_me_link;
pub use sequence::{
    generate_random_sequence, generate_rotation_sequence, generate_round_robin_sequence,
    generate_weighted_sequence, weighted_block, weighted_block_len, AgentWeight, Strategy,
    DEFAULT_SEQUENCE_LENGTH,
};
pub use staleness::{should_regenerate, RegenerationReason};
pub use stats::{
    calculate_sequence_stats, validate_sequence, SequenceIssue, SequenceStats,
    SequenceValidation,
};
pub use store::{GroupSnapshot, RotationStore};
