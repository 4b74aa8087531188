//! Shapes: the view templates items render as.
//!
//! A [`ShapeResolver`] maps each item to a [`ShapeId`]; a [`ShapeRegistry`]
//! maps each shape to the factory that instantiates its views. Both are plain
//! lookups supplied by the host, so the engine never inspects item types.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{RecyclerError, Result};

/// Identifies a view template.
///
/// Shapes are interned string tokens, usually declared as constants:
///
/// ```
/// use horizon_recycler::ShapeId;
///
/// const HEADER: ShapeId = ShapeId::new("header");
/// const ROW: ShapeId = ShapeId::new("row");
/// assert_ne!(HEADER, ROW);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(&'static str);

impl ShapeId {
    /// Create a shape token.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The shape's name.
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Maps an item to its shape. Must be deterministic and side-effect free.
pub trait ShapeResolver<I>: Send + Sync {
    /// The shape `item` renders as.
    fn resolve(&self, item: &I) -> ShapeId;
}

impl<I, F> ShapeResolver<I> for F
where
    F: Fn(&I) -> ShapeId + Send + Sync,
{
    fn resolve(&self, item: &I) -> ShapeId {
        self(item)
    }
}

/// Resolves every item to the same shape.
#[derive(Debug, Clone, Copy)]
pub struct SingleShape(pub ShapeId);

impl<I> ShapeResolver<I> for SingleShape {
    fn resolve(&self, _item: &I) -> ShapeId {
        self.0
    }
}

type Factory<V> = Arc<dyn Fn() -> V + Send + Sync>;

/// Registered view templates, keyed by shape.
pub struct ShapeRegistry<V> {
    factories: HashMap<ShapeId, Factory<V>>,
}

impl<V> Default for ShapeRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ShapeRegistry<V> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register (or replace) the factory for `shape`.
    pub fn register<F>(&mut self, shape: ShapeId, factory: F)
    where
        F: Fn() -> V + Send + Sync + 'static,
    {
        self.factories.insert(shape, Arc::new(factory));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_template<F>(mut self, shape: ShapeId, factory: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
    {
        self.register(shape, factory);
        self
    }

    /// Whether `shape` has a template.
    pub fn contains(&self, shape: ShapeId) -> bool {
        self.factories.contains_key(&shape)
    }

    /// Number of registered shapes.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether no shapes are registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Create a new view for `shape`.
    ///
    /// An unregistered shape is a configuration error and is never retried.
    pub fn instantiate(&self, shape: ShapeId) -> Result<V> {
        self.factories
            .get(&shape)
            .map(|factory| factory())
            .ok_or(RecyclerError::UnknownShape { shape })
    }
}

impl<V> fmt::Debug for ShapeRegistry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut shapes: Vec<_> = self.factories.keys().collect();
        shapes.sort();
        f.debug_struct("ShapeRegistry").field("shapes", &shapes).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const TEXT: ShapeId = ShapeId::new("text");
    const IMAGE: ShapeId = ShapeId::new("image");

    #[test]
    fn test_instantiate_registered() {
        let counter = Arc::new(AtomicU32::new(0));
        let registry = ShapeRegistry::new().with_template(TEXT, {
            let counter = counter.clone();
            move || counter.fetch_add(1, Ordering::SeqCst)
        });

        assert!(registry.contains(TEXT));
        assert_eq!(registry.instantiate(TEXT).unwrap(), 0);
        assert_eq!(registry.instantiate(TEXT).unwrap(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_shape_is_error() {
        let registry: ShapeRegistry<u32> = ShapeRegistry::new();
        let err = registry.instantiate(IMAGE).unwrap_err();
        assert!(matches!(err, RecyclerError::UnknownShape { shape } if shape == IMAGE));
        assert_eq!(err.to_string(), "no view template registered for shape 'image'");
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |n: &u32| if n % 2 == 0 { TEXT } else { IMAGE };
        assert_eq!(ShapeResolver::resolve(&resolver, &2), TEXT);
        assert_eq!(ShapeResolver::resolve(&resolver, &3), IMAGE);
        assert_eq!(ShapeResolver::<u32>::resolve(&SingleShape(TEXT), &3), TEXT);
    }
}
