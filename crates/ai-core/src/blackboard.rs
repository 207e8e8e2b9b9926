use std::any::Any;
use std::collections::BTreeMap;
use std::marker::PhantomData;

/// Typed key into a [`Blackboard`].
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BbKey<T: 'static> {
    id: u64,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: 'static> Copy for BbKey<T> {}

impl<T: 'static> Clone for BbKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> BbKey<T> {
    pub const fn new(id: u64) -> Self {
        Self {
            id,
            _phantom: PhantomData,
        }
    }

    pub fn id(self) -> u64 {
        self.id
    }
}

/// Per-agent scratch memory shared between the leaves of one decision tree.
///
/// A read with the wrong type behaves like a missing key and is logged; it never panics.
#[derive(Default)]
pub struct Blackboard {
    values: BTreeMap<u64, Box<dyn Any + Send>>,
}

impl std::fmt::Debug for Blackboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blackboard")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn contains<T: 'static>(&self, key: BbKey<T>) -> bool {
        self.values.contains_key(&key.id)
    }

    pub fn set<T: Send + 'static>(&mut self, key: BbKey<T>, value: T) {
        self.values.insert(key.id, Box::new(value));
    }

    pub fn get<T: 'static>(&self, key: BbKey<T>) -> Option<&T> {
        let value = self.values.get(&key.id)?;
        let typed = value.as_ref().downcast_ref::<T>();
        if typed.is_none() {
            type_mismatch::<T>(key.id);
        }
        typed
    }

    pub fn get_mut<T: 'static>(&mut self, key: BbKey<T>) -> Option<&mut T> {
        let value = self.values.get_mut(&key.id)?;
        let typed = value.as_mut().downcast_mut::<T>();
        if typed.is_none() {
            type_mismatch::<T>(key.id);
        }
        typed
    }

    /// Removes the value if it has the requested type; a mismatched value stays in place.
    pub fn remove<T: 'static>(&mut self, key: BbKey<T>) -> Option<T> {
        if !self.values.get(&key.id)?.as_ref().is::<T>() {
            type_mismatch::<T>(key.id);
            return None;
        }
        let value = self.values.remove(&key.id)?;
        value.downcast::<T>().ok().map(|boxed| *boxed)
    }
}

fn type_mismatch<T>(id: u64) {
    tracing::warn!(
        key = id,
        requested = std::any::type_name::<T>(),
        "blackboard type mismatch"
    );
}
