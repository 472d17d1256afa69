//! Per-address connection cache.
//!
//! [`ConnectionCache`] maps light addresses to live [`LightSession`]s and
//! keeps at most one session per address. Addresses are compared in
//! normalized form, so `AA:BB:...` and `aa:bb:...` share an entry.
//!
//! The map lock is only held for map updates, never across radio I/O.
//! Two callers racing to connect the same light both connect; the later
//! insert wins and the displaced session is disconnected.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::Result;
use crate::session::LightSession;
use crate::transport::BleTransport;
use crate::util::normalize_address;

/// Address to live session map.
pub struct ConnectionCache {
    transport: Arc<dyn BleTransport>,
    sessions: Mutex<HashMap<String, Arc<LightSession>>>,
}

impl std::fmt::Debug for ConnectionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionCache").finish_non_exhaustive()
    }
}

impl ConnectionCache {
    /// Create an empty cache connecting through `transport`.
    pub fn new(transport: Arc<dyn BleTransport>) -> Self {
        Self {
            transport,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached session for `address`, connecting if there is none.
    ///
    /// A cached session that is no longer connected is treated as absent.
    pub async fn get_or_create(&self, address: &str) -> Result<Arc<LightSession>> {
        if let Some(session) = self.get(address).await {
            debug!("Reusing cached session for {}", address);
            return Ok(session);
        }

        let session = Arc::new(LightSession::connect(self.transport.as_ref(), address).await?);
        self.insert(Arc::clone(&session)).await;
        Ok(session)
    }

    /// Register a session, replacing any previous one for its address.
    pub async fn insert(&self, session: Arc<LightSession>) {
        let key = normalize_address(session.address());
        let displaced = self
            .sessions
            .lock()
            .await
            .insert(key, Arc::clone(&session));

        if let Some(old) = displaced.filter(|old| !Arc::ptr_eq(old, &session)) {
            debug!("Replacing cached session for {}", old.address());
            old.disconnect().await;
        }
    }

    /// Connected session for `address`, if cached.
    pub async fn get(&self, address: &str) -> Option<Arc<LightSession>> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&normalize_address(address))
            .filter(|session| session.is_connected())
            .cloned()
    }

    /// Remove and disconnect the session for `address`.
    pub async fn invalidate(&self, address: &str) {
        let removed = self.sessions.lock().await.remove(&normalize_address(address));
        if let Some(session) = removed {
            info!("Invalidated session for {}", session.address());
            session.disconnect().await;
        }
    }

    /// Remove `session` if it is still the cached one, then disconnect it.
    ///
    /// A newer session cached for the same address is left alone.
    pub async fn discard(&self, session: &Arc<LightSession>) {
        let key = normalize_address(session.address());
        {
            let mut sessions = self.sessions.lock().await;
            if sessions
                .get(&key)
                .is_some_and(|cached| Arc::ptr_eq(cached, session))
            {
                sessions.remove(&key);
            }
        }
        session.disconnect().await;
    }

    /// Number of cached sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Addresses of the cached sessions.
    pub async fn addresses(&self) -> Vec<String> {
        self.sessions
            .lock()
            .await
            .values()
            .map(|session| session.address().to_string())
            .collect()
    }

    /// Disconnect and remove every session.
    pub async fn clear(&self) {
        let drained: Vec<Arc<LightSession>> =
            self.sessions.lock().await.drain().map(|(_, s)| s).collect();
        if drained.is_empty() {
            return;
        }

        info!("Disconnecting {} cached session(s)", drained.len());
        join_all(drained.iter().map(|session| session.disconnect())).await;
    }
}
