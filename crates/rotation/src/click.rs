//! Fire-and-forget click logging.

use database::NewClick;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::store::RotationStore;

/// Visitor metadata captured with each click.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub referrer: Option<String>,
}

/// Write a click record in the background.
///
/// The caller is never blocked on the write, and a failed write is logged and
/// dropped. The handle is only useful to tests that want to wait for the write.
pub fn spawn_click_log<S: RotationStore>(
    store: S,
    agent_id: i64,
    group_id: Option<i64>,
    meta: RequestMeta,
) -> JoinHandle<()> {
    let click = NewClick {
        agent_id,
        group_id,
        user_agent: meta.user_agent,
        ip_address: meta.ip_address,
        referrer: meta.referrer,
    };

    tokio::spawn(async move {
        match store.record_click(click).await {
            Ok(()) => debug!(agent_id, ?group_id, "Click recorded"),
            Err(err) => warn!(agent_id, ?group_id, error = %err, "Failed to record click"),
        }
    })
}
