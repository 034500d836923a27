use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::RwLock;

/// Scope-partitioned key/value store abstraction for disposable read models.
///
/// Read models here are partitioned by an owner scope — a user for the
/// per-learner enrollment directory, a course for per-course stats — so
/// listing stays a scope-local scan.
pub trait ScopedStore<S, K, V>: Send + Sync {
    fn get(&self, scope: S, key: &K) -> Option<V>;
    fn upsert(&self, scope: S, key: K, value: V);
    fn list(&self, scope: S) -> Vec<V>;
    /// Clear all read-model records for a scope (rebuild support).
    fn clear_scope(&self, scope: S);
}

impl<S, K, V, T> ScopedStore<S, K, V> for Arc<T>
where
    T: ScopedStore<S, K, V> + ?Sized,
{
    fn get(&self, scope: S, key: &K) -> Option<V> {
        (**self).get(scope, key)
    }

    fn upsert(&self, scope: S, key: K, value: V) {
        (**self).upsert(scope, key, value)
    }

    fn list(&self, scope: S) -> Vec<V> {
        (**self).list(scope)
    }

    fn clear_scope(&self, scope: S) {
        (**self).clear_scope(scope)
    }
}

/// In-memory scoped store for tests/dev.
#[derive(Debug)]
pub struct InMemoryScopedStore<S, K, V> {
    inner: RwLock<HashMap<(S, K), V>>,
}

impl<S, K, V> InMemoryScopedStore<S, K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<S, K, V> Default for InMemoryScopedStore<S, K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, K, V> ScopedStore<S, K, V> for InMemoryScopedStore<S, K, V>
where
    S: Clone + Eq + Hash + Send + Sync + 'static,
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, scope: S, key: &K) -> Option<V> {
        let map = self.inner.read().ok()?;
        map.get(&(scope, key.clone())).cloned()
    }

    fn upsert(&self, scope: S, key: K, value: V) {
        if let Ok(mut map) = self.inner.write() {
            map.insert((scope, key), value);
        }
    }

    fn list(&self, scope: S) -> Vec<V> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        map.iter()
            .filter_map(|((s, _k), v)| if *s == scope { Some(v.clone()) } else { None })
            .collect()
    }

    fn clear_scope(&self, scope: S) {
        if let Ok(mut map) = self.inner.write() {
            map.retain(|(s, _k), _v| *s != scope);
        }
    }
}
