//! Testing utilities for coordination-service sessions.
//!
//! [`MockConnector`] stands in for a client library. It records every
//! connection it constructs and lets tests inject connectivity notifications,
//! delivered from a separate thread like a real library's dispatch thread.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use coord_session_core::{ConnectionEvent, Endpoint, Error, Result};

use crate::client::{Connection, Connector, EventCallback};

/// Delay before an auto-connecting mock reports `Connected`.
const AUTO_CONNECT_DELAY: Duration = Duration::from_millis(5);

#[derive(Default)]
struct Shared {
    callbacks: Mutex<HashMap<Endpoint, EventCallback>>,
    closed: Mutex<Vec<Endpoint>>,
    connect_failure: Mutex<Option<String>>,
    fail_closes: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scriptable in-memory [`Connector`].
#[derive(Default)]
pub struct MockConnector {
    shared: Arc<Shared>,
    connects: AtomicUsize,
    auto_connect: bool,
}

impl MockConnector {
    /// Connector whose connections only change state through [`MockConnector::emit`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector whose connections report `Connected` shortly after construction.
    pub fn auto_connect() -> Self {
        Self {
            auto_connect: true,
            ..Self::default()
        }
    }

    /// Make every following `connect` fail with `reason`.
    pub fn fail_connects(&self, reason: impl Into<String>) {
        *lock(&self.shared.connect_failure) = Some(reason.into());
    }

    /// Make every following connection close fail.
    pub fn fail_closes(&self) {
        self.shared.fail_closes.store(true, Ordering::SeqCst);
    }

    /// Number of connections constructed.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Endpoints whose connections were closed, in close order.
    pub fn closed_endpoints(&self) -> Vec<Endpoint> {
        lock(&self.shared.closed).clone()
    }

    /// Whether a connection to `endpoint` has been constructed.
    pub fn is_connected_to(&self, endpoint: impl Into<Endpoint>) -> bool {
        lock(&self.shared.callbacks).contains_key(&endpoint.into())
    }

    /// Deliver `event` to the latest connection for `endpoint`.
    ///
    /// The callback runs on its own thread; this returns once it has finished.
    /// Returns `false` if no connection to `endpoint` exists.
    pub fn emit(&self, endpoint: impl Into<Endpoint>, event: ConnectionEvent) -> bool {
        let callback = lock(&self.shared.callbacks).get(&endpoint.into()).cloned();
        match callback {
            Some(callback) => thread::spawn(move || callback(event)).join().is_ok(),
            None => false,
        }
    }
}

impl Connector for MockConnector {
    fn connect(
        &self,
        endpoint: &Endpoint,
        _session_timeout: Duration,
        on_event: EventCallback,
    ) -> Result<Box<dyn Connection>> {
        if let Some(reason) = lock(&self.shared.connect_failure).clone() {
            return Err(Error::connection(endpoint, reason));
        }

        self.connects.fetch_add(1, Ordering::SeqCst);
        lock(&self.shared.callbacks).insert(endpoint.clone(), Arc::clone(&on_event));

        if self.auto_connect {
            thread::spawn(move || {
                thread::sleep(AUTO_CONNECT_DELAY);
                on_event(ConnectionEvent::Connected);
            });
        }

        Ok(Box::new(MockConnection {
            endpoint: endpoint.clone(),
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct MockConnection {
    endpoint: Endpoint,
    shared: Arc<Shared>,
}

impl Connection for MockConnection {
    fn close(&self) -> Result<()> {
        lock(&self.shared.callbacks).remove(&self.endpoint);
        lock(&self.shared.closed).push(self.endpoint.clone());

        if self.shared.fail_closes.load(Ordering::SeqCst) {
            return Err(Error::close(&self.endpoint, "mock close failure"));
        }
        Ok(())
    }
}
