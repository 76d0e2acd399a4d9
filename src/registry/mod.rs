//! Type-keyed registrations collected by the builder.
//!
//! Requests and notifications live in two separate maps because their
//! cardinality differs: a request type has at most one handler, a notification
//! type any number of subscribers.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    cache::{CacheStore, GroupLocks},
    notification::{Notification, NotificationHandler},
    pipeline::PipelineBehavior,
    request::{Request, RequestHandler},
    validation::Validator,
};

/// A map holding at most one value per Rust type.
#[derive(Default)]
pub(crate) struct TypeMap {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl TypeMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert<T>(&mut self, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.map.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub(crate) fn get<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub(crate) fn remove<T>(&mut self) -> Option<T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    /// Take the value of type `T` (or its default), let `f` mutate it, put it back.
    pub(crate) fn update<T>(&mut self, f: impl FnOnce(&mut T))
    where
        T: Default + Send + Sync + 'static,
    {
        let mut value = self.remove::<T>().unwrap_or_default();
        f(&mut value);
        self.insert(value);
    }
}

/// Builds the caching behavior for `R` once a store is known.
pub(crate) type CachingFactory<R> =
    fn(Arc<dyn CacheStore>, Arc<GroupLocks>) -> Arc<dyn PipelineBehavior<R>>;

/// Everything registered for one request type.
pub(crate) struct RequestRegistration<R: Request> {
    pub(crate) handler: Option<Arc<dyn RequestHandler<R>>>,
    pub(crate) validators: Vec<Arc<dyn Validator<R>>>,
    pub(crate) behaviors: Vec<Arc<dyn PipelineBehavior<R>>>,
    pub(crate) caching: Option<CachingFactory<R>>,
}

impl<R: Request> Default for RequestRegistration<R> {
    fn default() -> Self {
        Self {
            handler: None,
            validators: Vec::new(),
            behaviors: Vec::new(),
            caching: None,
        }
    }
}

/// Every subscriber registered for one notification type.
pub(crate) struct NotificationRegistration<N: Notification> {
    pub(crate) handlers: Vec<Arc<dyn NotificationHandler<N>>>,
}

impl<N: Notification> Default for NotificationRegistration<N> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Counter(u32);

    #[test]
    fn insert_get_remove() {
        let mut map = TypeMap::new();
        assert!(map.get::<Counter>().is_none());

        map.insert(Counter(1));
        map.insert(String::from("other type"));
        assert_eq!(map.get::<Counter>(), Some(&Counter(1)));

        assert_eq!(map.remove::<Counter>(), Some(Counter(1)));
        assert!(map.get::<Counter>().is_none());
        assert_eq!(map.get::<String>().map(String::as_str), Some("other type"));
    }

    #[test]
    fn update_starts_from_default() {
        let mut map = TypeMap::new();
        map.update::<Counter>(|c| c.0 += 1);
        map.update::<Counter>(|c| c.0 += 1);
        assert_eq!(map.get::<Counter>(), Some(&Counter(2)));
    }
}
