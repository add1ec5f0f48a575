//! Named notification bus with one-shot listeners and intercepting middleware.
//!
//! The carousel composes a bus rather than being one. Delivery is synchronous,
//! in registration order. A listener that returns an error is logged and the
//! remaining listeners still run.

use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;

use anyhow::Result;
use tracing::{debug, warn};

/// What a middleware decided about an emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Veto,
}

/// A delivered emission.
#[derive(Debug, Clone)]
pub struct Notification<T> {
    pub name: String,
    pub timestamp: SystemTime,
    pub data: T,
}

type ListenerFn<T> = Box<dyn FnMut(&Notification<T>) -> Result<()> + Send>;
type MiddlewareFn<T> = Box<dyn FnMut(&str, &mut T) -> Flow + Send>;

struct Listener<T> {
    once: bool,
    callback: ListenerFn<T>,
}

pub struct EventBus<T> {
    listeners: HashMap<String, Vec<Listener<T>>>,
    middlewares: HashMap<String, Vec<MiddlewareFn<T>>>,
}

impl<T> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut listeners: Vec<(&str, usize)> = self
            .listeners
            .iter()
            .map(|(name, list)| (name.as_str(), list.len()))
            .collect();
        listeners.sort_unstable();
        f.debug_struct("EventBus")
            .field("listeners", &listeners)
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Split `"a b,c"` style name lists.
fn split_names(names: &str) -> impl Iterator<Item = &str> {
    names
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|name| !name.is_empty())
}

impl<T> EventBus<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
            middlewares: HashMap::new(),
        }
    }

    /// Register a persistent listener for every name in `names`.
    pub fn on<F>(&mut self, names: &str, callback: F)
    where
        F: FnMut(&Notification<T>) -> Result<()> + Clone + Send + 'static,
    {
        self.register(names, callback, false);
    }

    /// Register a listener that is dropped after its first delivery.
    pub fn once<F>(&mut self, names: &str, callback: F)
    where
        F: FnMut(&Notification<T>) -> Result<()> + Clone + Send + 'static,
    {
        self.register(names, callback, true);
    }

    fn register<F>(&mut self, names: &str, callback: F, once: bool)
    where
        F: FnMut(&Notification<T>) -> Result<()> + Clone + Send + 'static,
    {
        for name in split_names(names) {
            self.listeners
                .entry(name.to_owned())
                .or_default()
                .push(Listener {
                    once,
                    callback: Box::new(callback.clone()),
                });
        }
    }

    /// Install an interceptor that runs before delivery of `names`.
    pub fn middleware<F>(&mut self, names: &str, hook: F)
    where
        F: FnMut(&str, &mut T) -> Flow + Clone + Send + 'static,
    {
        for name in split_names(names) {
            self.middlewares
                .entry(name.to_owned())
                .or_default()
                .push(Box::new(hook.clone()));
        }
    }

    /// Remove listeners for `name`, or for every name when `None`.
    /// `include_middleware` also drops the matching interceptors.
    pub fn remove_listeners(&mut self, name: Option<&str>, include_middleware: bool) {
        match name {
            Some(names) => {
                for name in split_names(names) {
                    self.listeners.remove(name);
                }
            }
            None => self.listeners.clear(),
        }
        if include_middleware {
            self.remove_middleware(name);
        }
    }

    pub fn remove_middleware(&mut self, name: Option<&str>) {
        match name {
            Some(names) => {
                for name in split_names(names) {
                    self.middlewares.remove(name);
                }
            }
            None => self.middlewares.clear(),
        }
    }

    #[must_use]
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.get(name).map_or(0, Vec::len)
    }

    /// Run middleware, then deliver. Returns how many listeners were called.
    pub fn emit(&mut self, name: &str, mut data: T) -> usize {
        if let Some(hooks) = self.middlewares.get_mut(name) {
            for hook in hooks.iter_mut() {
                if hook(name, &mut data) == Flow::Veto {
                    debug!(event = name, "emission vetoed by middleware");
                    return 0;
                }
            }
        }
        self.deliver(name, data)
    }

    /// Deliver without consulting middleware.
    pub fn emit_silent(&mut self, name: &str, data: T) -> usize {
        self.deliver(name, data)
    }

    fn deliver(&mut self, name: &str, data: T) -> usize {
        let Some(listeners) = self.listeners.get_mut(name) else {
            return 0;
        };
        let notification = Notification {
            name: name.to_owned(),
            timestamp: SystemTime::now(),
            data,
        };
        let mut delivered = 0;
        listeners.retain_mut(|listener| {
            delivered += 1;
            if let Err(err) = (listener.callback)(&notification) {
                warn!(event = name, error = %err, "listener failed");
            }
            !listener.once
        });
        if listeners.is_empty() {
            self.listeners.remove(name);
        }
        delivered
    }
}
