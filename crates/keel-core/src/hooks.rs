//! Named, ordered hook points.
//!
//! Hooks let extensions run code at fixed points of the application
//! lifecycle without the application knowing about them. A hook point must
//! be defined before anything can be registered against it.
//!
//! # Ordering
//!
//! Callables run by ascending priority: lower numbers run first. Callables
//! with equal priority run in registration order.
//!
//! ```text
//! register A (priority 0), B (priority 0), C (priority 1), D (priority -5)
//! run order: D, A, B, C
//! ```
//!
//! # States
//!
//! ```text
//!  OPEN ──begin──▶ DISPATCHING ──finish──▶ OPEN
//!    └──────────────close──────────────▶ CLOSED
//! ```
//!
//! - Registering while a point is DISPATCHING is rejected with
//!   [`HookError::Dispatching`]; so is a nested run of the same point.
//! - A CLOSED point rejects registration and dispatch with [`HookError::Closed`].
//!
//! # Failure policy
//!
//! Dispatch is fail-fast: the first callable returning an error aborts the
//! remaining callables of that point, and the error is returned as
//! [`HookError::Dispatch`] naming the hook and the callable's position.
//!
//! # Dispatching with an owning context
//!
//! [`HookDispatcher::run`] needs the dispatcher and the context as separate
//! borrows. When the context owns the dispatcher (an application object
//! whose hooks receive `&mut App`), split the run in three steps:
//!
//! ```rust
//! use keel_core::HookDispatcher;
//!
//! struct App {
//!     hooks: HookDispatcher<App>,
//!     calls: Vec<&'static str>,
//! }
//!
//! let mut app = App { hooks: HookDispatcher::new(), calls: Vec::new() };
//! app.hooks.define("pre_setup").unwrap();
//! app.hooks
//!     .register("pre_setup", 0, |app: &mut App| {
//!         app.calls.push("pre_setup");
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let batch = app.hooks.begin("pre_setup").unwrap();
//! let result = batch.invoke(&mut app);
//! app.hooks.finish("pre_setup");
//!
//! assert!(result.is_ok());
//! assert_eq!(app.calls, vec!["pre_setup"]);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{BoxError, HookError};

/// A callable registered against a hook point.
pub type HookFn<C> = Rc<dyn Fn(&mut C) -> Result<(), BoxError>>;

/// Lifecycle state of a hook point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    /// Accepting registrations and dispatch.
    Open,
    /// Callables are running.
    Dispatching,
    /// Torn down.
    Closed,
}

impl fmt::Display for HookState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookState::Open => write!(f, "open"),
            HookState::Dispatching => write!(f, "dispatching"),
            HookState::Closed => write!(f, "closed"),
        }
    }
}

struct HookEntry<C: ?Sized> {
    priority: i32,
    sequence: u64,
    label: Option<String>,
    func: HookFn<C>,
}

impl<C: ?Sized> Clone for HookEntry<C> {
    fn clone(&self) -> Self {
        Self {
            priority: self.priority,
            sequence: self.sequence,
            label: self.label.clone(),
            func: Rc::clone(&self.func),
        }
    }
}

struct HookPoint<C: ?Sized> {
    state: HookState,
    entries: Vec<HookEntry<C>>,
}

/// A snapshot of one hook point's callables, taken by [`HookDispatcher::begin`].
pub struct HookBatch<C: ?Sized> {
    hook: String,
    entries: Vec<HookEntry<C>>,
}

impl<C: ?Sized> HookBatch<C> {
    /// Runs every callable in order, stopping at the first failure.
    pub fn invoke(&self, ctx: &mut C) -> Result<(), HookError> {
        for (position, entry) in self.entries.iter().enumerate() {
            tracing::trace!(
                hook = %self.hook,
                position,
                priority = entry.priority,
                label = entry.label.as_deref(),
                "running hook"
            );
            if let Err(source) = (entry.func)(ctx) {
                tracing::warn!(hook = %self.hook, position, error = %source, "hook failed");
                return Err(HookError::Dispatch {
                    hook: self.hook.clone(),
                    position,
                    label: entry.label.clone(),
                    source,
                });
            }
        }
        Ok(())
    }

    pub fn hook(&self) -> &str {
        &self.hook
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Registry and dispatcher of named hook points for a context type `C`.
pub struct HookDispatcher<C: ?Sized> {
    points: HashMap<String, HookPoint<C>>,
    order: Vec<String>,
    sequence: u64,
}

impl<C: ?Sized> Default for HookDispatcher<C> {
    fn default() -> Self {
        Self {
            points: HashMap::new(),
            order: Vec::new(),
            sequence: 0,
        }
    }
}

impl<C: ?Sized> HookDispatcher<C> {
    /// Creates a dispatcher with no hook points.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a new, open hook point.
    pub fn define(&mut self, name: &str) -> Result<(), HookError> {
        if self.points.contains_key(name) {
            return Err(HookError::DuplicateHook {
                hook: name.to_string(),
            });
        }
        self.points.insert(
            name.to_string(),
            HookPoint {
                state: HookState::Open,
                entries: Vec::new(),
            },
        );
        self.order.push(name.to_string());
        tracing::trace!(hook = name, "defined hook");
        Ok(())
    }

    /// Returns true if the hook point exists.
    pub fn defined(&self, name: &str) -> bool {
        self.points.contains_key(name)
    }

    /// Returns hook names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Returns the state of a hook point.
    pub fn state(&self, name: &str) -> Result<HookState, HookError> {
        self.point(name).map(|p| p.state)
    }

    /// Returns the number of callables registered against a hook point.
    pub fn len(&self, name: &str) -> usize {
        self.points.get(name).map_or(0, |p| p.entries.len())
    }

    /// Registers a callable.
    pub fn register<F>(&mut self, name: &str, priority: i32, func: F) -> Result<(), HookError>
    where
        F: Fn(&mut C) -> Result<(), BoxError> + 'static,
    {
        self.insert(name, priority, None, Rc::new(func))
    }

    /// Registers a callable with a label, reported if it fails.
    pub fn register_labeled<F>(
        &mut self,
        name: &str,
        label: impl Into<String>,
        priority: i32,
        func: F,
    ) -> Result<(), HookError>
    where
        F: Fn(&mut C) -> Result<(), BoxError> + 'static,
    {
        self.insert(name, priority, Some(label.into()), Rc::new(func))
    }

    /// Registers an already shared callable.
    pub fn register_fn(
        &mut self,
        name: &str,
        priority: i32,
        label: Option<String>,
        func: HookFn<C>,
    ) -> Result<(), HookError> {
        self.insert(name, priority, label, func)
    }

    fn insert(
        &mut self,
        name: &str,
        priority: i32,
        label: Option<String>,
        func: HookFn<C>,
    ) -> Result<(), HookError> {
        let point = self.point_mut(name)?;
        match point.state {
            HookState::Open => {}
            HookState::Dispatching => {
                return Err(HookError::Dispatching {
                    hook: name.to_string(),
                })
            }
            HookState::Closed => {
                return Err(HookError::Closed {
                    hook: name.to_string(),
                })
            }
        }

        self.sequence += 1;
        let sequence = self.sequence;
        let entry = HookEntry {
            priority,
            sequence,
            label,
            func,
        };
        let point = self.point_mut(name)?;
        let index = point
            .entries
            .partition_point(|e| (e.priority, e.sequence) < (priority, sequence));
        point.entries.insert(index, entry);
        tracing::trace!(hook = name, priority, "registered hook callable");
        Ok(())
    }

    /// Moves a hook point to DISPATCHING and snapshots its callables.
    ///
    /// Every successful `begin` must be paired with [`finish`](Self::finish).
    pub fn begin(&mut self, name: &str) -> Result<HookBatch<C>, HookError> {
        let point = self.point_mut(name)?;
        match point.state {
            HookState::Open => {}
            HookState::Dispatching => {
                return Err(HookError::Dispatching {
                    hook: name.to_string(),
                })
            }
            HookState::Closed => {
                return Err(HookError::Closed {
                    hook: name.to_string(),
                })
            }
        }
        point.state = HookState::Dispatching;
        tracing::debug!(hook = name, callables = point.entries.len(), "dispatching hook");
        Ok(HookBatch {
            hook: name.to_string(),
            entries: point.entries.clone(),
        })
    }

    /// Returns a DISPATCHING hook point to OPEN. Other states are left alone.
    pub fn finish(&mut self, name: &str) {
        if let Some(point) = self.points.get_mut(name) {
            if point.state == HookState::Dispatching {
                point.state = HookState::Open;
            }
        }
    }

    /// Runs every callable of a hook point against `ctx`, fail-fast.
    pub fn run(&mut self, name: &str, ctx: &mut C) -> Result<(), HookError> {
        let batch = self.begin(name)?;
        let result = batch.invoke(ctx);
        self.finish(name);
        result
    }

    /// Closes every hook point. Closing is final.
    pub fn close(&mut self) {
        for point in self.points.values_mut() {
            point.state = HookState::Closed;
        }
        tracing::debug!(hooks = self.points.len(), "hooks closed");
    }

    fn point(&self, name: &str) -> Result<&HookPoint<C>, HookError> {
        self.points.get(name).ok_or_else(|| HookError::UnknownHook {
            hook: name.to_string(),
        })
    }

    fn point_mut(&mut self, name: &str) -> Result<&mut HookPoint<C>, HookError> {
        self.points.get_mut(name).ok_or_else(|| HookError::UnknownHook {
            hook: name.to_string(),
        })
    }
}

impl<C: ?Sized> fmt::Debug for HookDispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for name in &self.order {
            if let Some(point) = self.points.get(name) {
                map.entry(
                    name,
                    &format_args!("{} callable(s), {}", point.entries.len(), point.state),
                );
            }
        }
        map.finish()
    }
}
