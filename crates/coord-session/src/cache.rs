//! Session handle cache: at most one session per endpoint.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use coord_session_core::{Endpoint, Result};

use crate::session::Session;

/// Mapping from endpoint to its shared session.
#[derive(Debug, Default)]
pub struct SessionCache {
    sessions: HashMap<Endpoint, Arc<Session>>,
}

impl SessionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the session for `endpoint`.
    pub fn get(&self, endpoint: &Endpoint) -> Option<Arc<Session>> {
        self.sessions.get(endpoint).cloned()
    }

    /// Return the cached session for `endpoint`, or insert the one built by `open`.
    ///
    /// The flag is `true` when `open` ran. Nothing is inserted if `open` fails.
    pub fn get_or_try_insert_with<F>(
        &mut self,
        endpoint: &Endpoint,
        open: F,
    ) -> Result<(Arc<Session>, bool)>
    where
        F: FnOnce() -> Result<Arc<Session>>,
    {
        match self.sessions.entry(endpoint.clone()) {
            Entry::Occupied(entry) => Ok((Arc::clone(entry.get()), false)),
            Entry::Vacant(entry) => {
                let session = open()?;
                entry.insert(Arc::clone(&session));
                Ok((session, true))
            }
        }
    }

    /// Remove the session for `endpoint`.
    pub fn remove(&mut self, endpoint: &Endpoint) -> Option<Arc<Session>> {
        self.sessions.remove(endpoint)
    }

    /// Remove every session.
    pub fn drain(&mut self) -> Vec<Arc<Session>> {
        self.sessions.drain().map(|(_, session)| session).collect()
    }

    /// Iterate over cached sessions.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Session>> {
        self.sessions.values()
    }

    /// Number of cached sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
