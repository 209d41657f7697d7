//! Registry of live gallery sessions
//!
//! Each session holds its own snapshot, so the registry is bounded: sessions
//! idle for longer than the TTL are dropped, and opening a session at the cap
//! evicts the least recently used one.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::catalog::CatalogSource;
use crate::controller::gallery::{GallerySession, GalleryView};
use crate::error::CatalogError;
use crate::model::CategoryFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub idle_ttl: Duration,
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(30 * 60),
            max_sessions: 1000,
        }
    }
}

struct SessionEntry {
    session: GallerySession,
    last_used: Instant,
    // Logical clock value of the last access, orders eviction
    last_tick: u64,
}

#[derive(Default)]
struct Sessions {
    entries: HashMap<String, SessionEntry>,
    clock: u64,
}

impl Sessions {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

pub struct SessionRegistry {
    sessions: Mutex<Sessions>,
    source: Arc<dyn CatalogSource>,
    page_size: usize,
    limits: SessionLimits,
}

impl SessionRegistry {
    pub fn new(source: Arc<dyn CatalogSource>, page_size: usize) -> Self {
        Self::with_limits(source, page_size, SessionLimits::default())
    }

    pub fn with_limits(source: Arc<dyn CatalogSource>, page_size: usize, limits: SessionLimits) -> Self {
        Self {
            sessions: Mutex::new(Sessions::default()),
            source,
            page_size,
            limits: SessionLimits {
                max_sessions: limits.max_sessions.max(1),
                ..limits
            },
        }
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_expired(&self, entry: &SessionEntry) -> bool {
        entry.last_used.elapsed() >= self.limits.idle_ttl
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Drop every session idle for longer than the TTL. Returns how many went.
    pub fn evict_idle(&self) -> usize {
        let mut sessions = self.lock();
        let before = sessions.entries.len();
        sessions.entries.retain(|_, entry| !self.is_expired(entry));
        let evicted = before - sessions.entries.len();
        if evicted > 0 {
            info!("Evicted {} idle gallery sessions", evicted);
        }
        evicted
    }

    /// Open a session over a fresh snapshot. Returns its id and first view.
    pub async fn create(&self) -> Result<(String, GalleryView), CatalogError> {
        let session = GallerySession::open(self.source.as_ref(), self.page_size).await?;
        let session_id = Uuid::new_v4().to_string();
        let view = session.render();
        info!("Opened gallery session {} with {} records", session_id, session.index().len());

        self.evict_idle();
        let mut sessions = self.lock();
        while sessions.entries.len() >= self.limits.max_sessions {
            let oldest = sessions
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_tick)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    sessions.entries.remove(&id);
                    info!("Evicted gallery session {} to stay under {} sessions", id, self.limits.max_sessions);
                }
                None => break,
            }
        }
        let last_tick = sessions.tick();
        sessions.entries.insert(
            session_id.clone(),
            SessionEntry {
                session,
                last_used: Instant::now(),
                last_tick,
            },
        );
        Ok((session_id, view))
    }

    fn with_session<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut GallerySession) -> R,
    ) -> Result<R, CatalogError> {
        let mut sessions = self.lock();
        let expired = match sessions.entries.get(session_id) {
            Some(entry) => self.is_expired(entry),
            None => return Err(CatalogError::UnknownSession(session_id.to_string())),
        };
        if expired {
            sessions.entries.remove(session_id);
            info!("Gallery session {} expired", session_id);
            return Err(CatalogError::UnknownSession(session_id.to_string()));
        }

        let last_tick = sessions.tick();
        let entry = sessions
            .entries
            .get_mut(session_id)
            .ok_or_else(|| CatalogError::UnknownSession(session_id.to_string()))?;
        entry.last_used = Instant::now();
        entry.last_tick = last_tick;
        Ok(f(&mut entry.session))
    }

    pub fn view(&self, session_id: &str) -> Result<GalleryView, CatalogError> {
        self.with_session(session_id, |session| session.render())
    }

    pub fn select_category(&self, session_id: &str, filter: CategoryFilter) -> Result<GalleryView, CatalogError> {
        debug!("Session {} selected {}", session_id, filter);
        self.with_session(session_id, |session| session.category_selected(filter))
    }

    pub fn load_more(&self, session_id: &str) -> Result<GalleryView, CatalogError> {
        self.with_session(session_id, |session| session.load_more_requested())
    }

    /// Reload the session's snapshot from the source, keeping its filter and
    /// window. On failure the old snapshot stays and the error is returned.
    pub async fn refresh(&self, session_id: &str) -> Result<GalleryView, CatalogError> {
        self.with_session(session_id, |session| session.begin_refresh())?;

        let result = self.source.load_snapshot().await;
        let (snapshot, failure) = match result {
            Ok(records) => (Some(records), None),
            Err(e) => {
                warn!("Refresh of session {} failed: {}", session_id, e);
                (None, Some(e))
            }
        };

        // The session may have been dropped while the snapshot loaded
        let view = self.with_session(session_id, |session| session.finish_refresh(snapshot))?;
        match failure {
            Some(e) => Err(e),
            None => Ok(view),
        }
    }

    /// Forget a session. Returns whether it existed.
    pub fn remove(&self, session_id: &str) -> bool {
        let removed = self.lock().entries.remove(session_id).is_some();
        if removed {
            info!("Closed gallery session {}", session_id);
        }
        removed
    }
}
