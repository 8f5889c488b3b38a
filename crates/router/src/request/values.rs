use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// String keyed, type erased values shared between middleware and handlers of one request.
///
/// Values are reference counted, so cloning the store is cheap and yields a snapshot that no
/// longer depends on the request it came from.
#[derive(Clone, Default)]
pub struct ContextValues {
    inner: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl ContextValues {
    pub fn new() -> Self {
        Self { inner: HashMap::new() }
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.inner.insert(key.into(), Arc::new(value));
    }

    /// Returns the value under `key` when it exists and has type `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.inner.get(key).and_then(|value| value.as_ref().downcast_ref::<T>())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.inner.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for ContextValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.inner.keys()).finish()
    }
}
