//! Presence tracking
//!
//! Connections are reference-counted per user. A user is online from their
//! first connection until their last one closes; `PRESENCE_UPDATE` only goes
//! out on those two edges.

use crate::connection::ConnectionManager;
use crate::events::{GatewayEventType, PresenceEvent};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use kizuna_core::Snowflake;
use kizuna_service::{PresenceService, ServiceContext};
use std::sync::Arc;
use tracing::{info, warn};

pub struct PresenceTracker {
    /// Open connections per user
    counts: DashMap<Snowflake, usize>,
    manager: Arc<ConnectionManager>,
    ctx: ServiceContext,
}

impl PresenceTracker {
    pub fn new(ctx: ServiceContext, manager: Arc<ConnectionManager>) -> Self {
        Self {
            counts: DashMap::new(),
            manager,
            ctx,
        }
    }

    /// Count a new connection for `user_id`. Returns `true` if it is the
    /// user's first, in which case the online transition was broadcast.
    pub async fn on_connect(&self, user_id: Snowflake) -> bool {
        let now = Utc::now();

        let first = {
            let mut count = self.counts.entry(user_id).or_insert(0);
            *count += 1;
            let first = *count == 1;
            // Broadcast under the entry lock so transitions for one user go
            // out in the order they were decided.
            if first {
                self.broadcast_presence_change(user_id, true, now);
            }
            first
        };

        PresenceService::new(&self.ctx).mark_online(user_id, now).await;

        if first {
            info!(user_id = %user_id, "User online");
        }
        first
    }

    /// Release one connection for `user_id`. Returns `true` if it was the
    /// last, in which case the offline transition was broadcast.
    pub async fn on_disconnect(&self, user_id: Snowflake) -> bool {
        let now = Utc::now();

        let last = match self.counts.entry(user_id) {
            Entry::Occupied(mut entry) => {
                let count = entry.get_mut();
                *count = count.saturating_sub(1);
                if *count == 0 {
                    entry.remove();
                    self.broadcast_presence_change(user_id, false, now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(_) => {
                warn!(user_id = %user_id, "Disconnect for a user with no tracked connections");
                return false;
            }
        };

        let presence = PresenceService::new(&self.ctx);
        if last {
            presence.mark_offline(user_id, now).await;
            // A reconnect may have raced the offline write
            if self.is_online(user_id) {
                presence.mark_online(user_id, Utc::now()).await;
            }
            info!(user_id = %user_id, "User offline");
        } else {
            presence.touch(user_id, now).await;
        }
        last
    }

    /// Send `PRESENCE_UPDATE` to every connection except the user's own
    pub fn broadcast_presence_change(&self, user_id: Snowflake, online: bool, at: DateTime<Utc>) {
        let event = if online {
            PresenceEvent::online(user_id)
        } else {
            PresenceEvent::offline(user_id, at)
        };
        self.manager
            .broadcast_except_user(user_id, GatewayEventType::PresenceUpdate, &event);
    }

    pub fn is_online(&self, user_id: Snowflake) -> bool {
        self.counts.contains_key(&user_id)
    }

    /// Users with at least one open connection
    pub fn online_count(&self) -> usize {
        self.counts.len()
    }

    pub fn connection_count(&self, user_id: Snowflake) -> usize {
        self.counts.get(&user_id).map_or(0, |c| *c)
    }
}

impl std::fmt::Debug for PresenceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceTracker")
            .field("online", &self.counts.len())
            .finish_non_exhaustive()
    }
}
