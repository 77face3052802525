//! Per-request scratch space shared between the stages of one chain.
//!
//! A [`Context`] is created together with its [`Request`](crate::Request)
//! and dropped with it. It is never global and never shared across
//! requests: each in-flight request owns exactly one.
//!
//! Slots are addressed by typed [`Key`]s, so a stage cannot store a `bool`
//! under a key that a later stage reads as a user:
//!
//! ```rust
//! use apigate::context::{Context, Key};
//!
//! const ATTEMPTS: Key<u32> = Key::new("attempts");
//!
//! let mut ctx = Context::new();
//! ctx.insert(ATTEMPTS, 3).unwrap();
//! assert_eq!(ctx.get(ATTEMPTS), Some(&3));
//!
//! // Each slot is write-once per request.
//! assert!(ctx.insert(ATTEMPTS, 4).is_err());
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A named, typed slot in a [`Context`].
pub struct Key<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    pub const fn new(name: &'static str) -> Self {
        Self { name, _marker: PhantomData }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

// Manual impls: derives would demand `T: Clone`.
impl<T> Clone for Key<T> {
    fn clone(&self) -> Self { *self }
}

impl<T> Copy for Key<T> {}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Key").field(&self.name).finish()
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("context slot `{0}` was already written for this request")]
    AlreadySet(&'static str),
}

/// Write-once key/value slots scoped to a single request.
///
/// Values sit behind `Arc` so the context can be handed to the terminal
/// handler by cheap clone while stages keep reading it.
#[derive(Clone, Default)]
pub struct Context {
    slots: HashMap<&'static str, Arc<dyn Any + Send + Sync>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`. Fails if the slot already holds a value.
    pub fn insert<T>(&mut self, key: Key<T>, value: T) -> Result<(), ContextError>
    where
        T: Send + Sync + 'static,
    {
        if self.slots.contains_key(key.name) {
            return Err(ContextError::AlreadySet(key.name));
        }
        self.slots.insert(key.name, Arc::new(value));
        Ok(())
    }

    /// Reads the value stored under `key`, if any stage wrote one.
    pub fn get<T>(&self, key: Key<T>) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        let value = self.slots.get(key.name)?;
        (**value).downcast_ref::<T>()
    }

    pub fn contains<T>(&self, key: Key<T>) -> bool {
        self.slots.contains_key(key.name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.slots.keys()).finish()
    }
}
