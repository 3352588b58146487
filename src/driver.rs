//! Process-wide driver registry for rdbc-bridge
//!
//! Distributed workers load a driver module through an isolated loader per
//! job; the process-wide registry may hold a stale same-named driver from an
//! earlier job attempt, or none at all. `ensure_registered` makes a loaded
//! driver usable through the shared registry, wrapping it in a thin
//! forwarding shim, and hands back a registration that must be released
//! exactly once per worker-process lifetime.
//!
//! The registry is reference-counted and keyed by driver identity, so
//! concurrent same-process callers race safely: the first one registers, the
//! rest bump the refcount.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;

use crate::config::ConnectionConfig;
use crate::connection::{Connection, Driver};
use crate::error::{Error, Result};

struct Entry {
    driver: Arc<dyn Driver>,
    refcount: usize,
}

fn registry() -> &'static Mutex<HashMap<String, Entry>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, Entry>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Thin forwarding wrapper letting a dynamically loaded driver instance
/// satisfy the shared registry's expectations.
pub struct DriverShim {
    inner: Arc<dyn Driver>,
}

impl DriverShim {
    /// Wrap a driver
    pub fn new(inner: Arc<dyn Driver>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Driver for DriverShim {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn accepts_url(&self, url: &str) -> bool {
        self.inner.accepts_url(url)
    }

    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        self.inner.connect(config).await
    }
}

/// Handle to a registry registration.
///
/// `deregister` is idempotent and also runs on drop, so task retry or
/// abnormal teardown still releases the registry entry. Leaking entries
/// across job attempts accumulates drivers and causes nondeterministic
/// driver selection later.
#[derive(Debug)]
pub struct DriverRegistration {
    key: String,
    active: AtomicBool,
}

impl DriverRegistration {
    /// A handle that never registered anything; deregistering it is a no-op.
    pub fn unregistered() -> Self {
        Self {
            key: String::new(),
            active: AtomicBool::new(false),
        }
    }

    /// Release the registration. Safe to call more than once; only the
    /// first call touches the registry.
    pub fn deregister(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        let mut entries = registry().lock().expect("driver registry poisoned");
        if let Some(entry) = entries.get_mut(&self.key) {
            entry.refcount -= 1;
            if entry.refcount == 0 {
                entries.remove(&self.key);
                tracing::debug!(driver = %self.key, "deregistered driver shim");
            }
        }
    }
}

impl Drop for DriverRegistration {
    fn drop(&mut self) {
        self.deregister();
    }
}

/// Make a loaded driver resolvable through the process-wide registry.
///
/// No-op (refcount bump) if the registry already resolves a usable driver
/// for `sample_url`; otherwise any stale same-identity entry is replaced and
/// the driver is registered behind a forwarding shim. A driver that cannot
/// handle its own sample connection string is a fatal connection error,
/// surfaced before any row is read or written.
pub fn ensure_registered(
    driver: Arc<dyn Driver>,
    sample_url: &str,
    plugin_id: &str,
) -> Result<DriverRegistration> {
    let mut entries = registry().lock().expect("driver registry poisoned");

    // Already resolvable: reuse whichever entry accepts the URL.
    if let Some((key, entry)) = entries
        .iter_mut()
        .find(|(_, e)| e.driver.accepts_url(sample_url))
    {
        entry.refcount += 1;
        return Ok(DriverRegistration {
            key: key.clone(),
            active: AtomicBool::new(true),
        });
    }

    if !driver.accepts_url(sample_url) {
        return Err(Error::connection(
            sample_url.to_string(),
            format!(
                "driver '{}' does not accept its own connection string",
                driver.name()
            ),
        ));
    }

    let shim: Arc<dyn Driver> = Arc::new(DriverShim::new(driver));
    match entries.get_mut(plugin_id) {
        // Stale same-identity instance from an earlier attempt: replace it.
        Some(entry) => {
            tracing::debug!(driver = plugin_id, "replacing stale driver registration");
            entry.driver = shim;
            entry.refcount += 1;
        }
        None => {
            entries.insert(
                plugin_id.to_string(),
                Entry {
                    driver: shim,
                    refcount: 1,
                },
            );
            tracing::debug!(driver = plugin_id, "registered driver shim");
        }
    }

    Ok(DriverRegistration {
        key: plugin_id.to_string(),
        active: AtomicBool::new(true),
    })
}

/// Resolve a registered driver for a connection URL
pub fn resolve(url: &str) -> Option<Arc<dyn Driver>> {
    let entries = registry().lock().expect("driver registry poisoned");
    entries
        .values()
        .find(|e| e.driver.accepts_url(url))
        .map(|e| Arc::clone(&e.driver))
}

/// Whether a driver identity currently has a live registration (test aid)
pub fn is_registered(plugin_id: &str) -> bool {
    registry()
        .lock()
        .expect("driver registry poisoned")
        .contains_key(plugin_id)
}
