//! In-process cache handler.
//!
//! Config key `expire_time`: default lifetime in seconds, `0` for no expiry.
//! A lifetime too large to represent never expires. Expired entries are
//! dropped when read and swept on every write.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use keel_core::{BoxError, ConfigMap, Handler, Meta, Provides};
use serde_json::Value;

use crate::interfaces::cache::{CacheHandler, CAPABILITIES};

#[derive(Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

#[derive(Debug, Default)]
pub struct MemoryCacheHandler {
    entries: RefCell<HashMap<String, Entry>>,
    default_expire: Option<Duration>,
}

impl MemoryCacheHandler {
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl Provides for MemoryCacheHandler {
    const LABEL: &'static str = "memory";
    const CAPABILITIES: &'static [&'static str] = CAPABILITIES;

    fn config_defaults() -> ConfigMap {
        let mut defaults = ConfigMap::new();
        defaults.insert("expire_time".into(), Value::from(0));
        defaults
    }
}

impl Handler for MemoryCacheHandler {
    fn setup(&mut self, meta: &Meta) -> Result<(), BoxError> {
        self.default_expire = match meta.get("expire_time") {
            None => None,
            Some(value) => match value.as_u64() {
                Some(0) => None,
                Some(seconds) => Some(Duration::from_secs(seconds)),
                None => return Err(format!("'expire_time' must be whole seconds, got {value}").into()),
            },
        };
        Ok(())
    }
}

impl CacheHandler for MemoryCacheHandler {
    fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.borrow_mut();
        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => entry
                .expires_at
                .is_some_and(|at| Instant::now() >= at),
        };
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    fn set(&self, key: &str, value: Value, expire: Option<Duration>) {
        let now = Instant::now();
        let expires_at = expire
            .or(self.default_expire)
            .and_then(|lifetime| now.checked_add(lifetime));
        let mut entries = self.entries.borrow_mut();
        entries.retain(|_, entry| !entry.expires_at.is_some_and(|at| now >= at));
        entries.insert(key.to_string(), Entry { value, expires_at });
    }

    fn delete(&self, key: &str) -> bool {
        self.entries.borrow_mut().remove(key).is_some()
    }

    fn purge(&self) {
        self.entries.borrow_mut().clear();
    }
}
