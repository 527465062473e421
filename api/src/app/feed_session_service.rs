//! Feed session service
//!
//! Owns every open feed session, one per page view. Live-coverage reports
//! are fanned out to all sessions and remembered, so a session opened later
//! still locks on an article that went live before it existed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::app::feed_controller::{FeedController, FeedSettings};
use crate::domain::entities::Slug;
use crate::domain::ports::ContentSource;
use crate::error::{AppError, ContentSourceError, DomainError};

/// Unique identifier for a feed session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SessionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct SessionEntry<CS: ContentSource + ?Sized> {
    controller: Arc<FeedController<CS>>,
    last_seen: Instant,
}

/// Service for opening, looking up and expiring feed sessions
pub struct FeedSessionService<CS>
where
    CS: ContentSource + ?Sized,
{
    source: Arc<CS>,
    settings: FeedSettings,
    max_sessions: usize,
    sessions: RwLock<HashMap<SessionId, SessionEntry<CS>>>,
    live: RwLock<HashSet<Slug>>,
}

impl<CS> FeedSessionService<CS>
where
    CS: ContentSource + ?Sized + 'static,
{
    pub fn new(source: Arc<CS>, settings: FeedSettings, max_sessions: usize) -> Self {
        Self {
            source,
            settings,
            max_sessions,
            sessions: RwLock::new(HashMap::new()),
            live: RwLock::new(HashSet::new()),
        }
    }

    /// Open a feed starting at the article the reader landed on
    pub async fn open(
        &self,
        slug: &Slug,
    ) -> Result<(SessionId, Arc<FeedController<CS>>), AppError> {
        if self.sessions.read().await.len() >= self.max_sessions {
            tracing::warn!(max_sessions = self.max_sessions, "Feed session limit reached");
            return Err(AppError::Unavailable(
                "too many open feed sessions".to_string(),
            ));
        }

        let timeout = self.settings.fetch_timeout;
        let initial = tokio::time::timeout(timeout, self.source.fetch_post(slug))
            .await
            .map_err(|_| ContentSourceError::Timeout(timeout))??
            .ok_or_else(|| DomainError::NotFound(format!("Article {} not found", slug)))?;

        let controller = Arc::new(FeedController::new(
            self.source.clone(),
            self.settings.clone(),
            initial,
        ));

        let id = SessionId::new();
        {
            // copy live marks and register under the same guard as mark_live reads
            let mut sessions = self.sessions.write().await;
            if sessions.len() >= self.max_sessions {
                tracing::warn!(max_sessions = self.max_sessions, "Feed session limit reached");
                return Err(AppError::Unavailable(
                    "too many open feed sessions".to_string(),
                ));
            }
            for live_slug in self.live.read().await.iter() {
                controller.mark_live(live_slug.clone()).await;
            }
            sessions.insert(
                id,
                SessionEntry {
                    controller: controller.clone(),
                    last_seen: Instant::now(),
                },
            );
        }
        controller.schedule_prefetch().await;
        tracing::info!(session_id = %id, slug = %slug, "Opened feed session");

        Ok((id, controller))
    }

    /// Look up a session and refresh its idle timer
    pub async fn get(&self, id: SessionId) -> Result<Arc<FeedController<CS>>, AppError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Feed session {} not found", id)))?;
        entry.last_seen = Instant::now();
        Ok(entry.controller.clone())
    }

    pub async fn close(&self, id: SessionId) -> Result<(), AppError> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                tracing::debug!(session_id = %id, "Closed feed session");
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Feed session {} not found", id))),
        }
    }

    /// Record that an article has live coverage and tell every open session.
    /// Returns how many sessions had not seen the mark before.
    pub async fn mark_live(&self, slug: Slug) -> usize {
        let first_report = self.live.write().await.insert(slug.clone());

        let controllers: Vec<_> = self
            .sessions
            .read()
            .await
            .values()
            .map(|entry| entry.controller.clone())
            .collect();

        let mut notified = 0;
        for controller in controllers {
            if controller.mark_live(slug.clone()).await {
                notified += 1;
            }
        }
        tracing::info!(slug = %slug, first_report, notified, "Live coverage reported");
        notified
    }

    /// Drop sessions not touched within `ttl`. Returns how many were dropped.
    pub async fn prune_idle(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let now = Instant::now();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < ttl);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Periodically prune idle sessions
pub fn spawn_session_sweeper<CS>(
    service: Arc<FeedSessionService<CS>>,
    interval: Duration,
    ttl: Duration,
) -> JoinHandle<()>
where
    CS: ContentSource + ?Sized + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let pruned = service.prune_idle(ttl).await;
            if pruned > 0 {
                let open = service.len().await;
                tracing::info!(pruned, open, "Pruned idle feed sessions");
            }
        }
    })
}
