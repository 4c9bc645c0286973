//! Owning container for the active instances of one registry category.

use std::fmt;

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::error::RegistryError;
use crate::registry::{Category, Registered, Registry};

/// Owns the active instances of one [`Category`], keyed by identifier.
///
/// Iteration, and therefore every broadcast over the collection, follows
/// insertion order. At most one instance exists per identifier.
pub struct CollectionMgr<C: Category> {
    items: IndexMap<String, Box<C::Product>>,
}

impl<C: Category> CollectionMgr<C> {
    /// An empty collection.
    pub fn new() -> Self {
        Self {
            items: IndexMap::new(),
        }
    }

    /// Construct the module registered under `identifier` and take ownership.
    ///
    /// Fails with [`RegistryError::DuplicateInstance`] before running any
    /// constructor if the identifier is already active, and with
    /// [`RegistryError::UnknownIdentifier`] if `registry` has no entry for it.
    /// The collection is unchanged on failure.
    pub fn add(
        &mut self,
        registry: &Registry<C>,
        identifier: &str,
        ctx: &mut C::Context,
    ) -> Result<&mut C::Product, RegistryError> {
        match self.items.entry(identifier.to_string()) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateInstance {
                category: C::BASE_IDENTIFIER,
                identifier: identifier.to_string(),
            }),
            Entry::Vacant(slot) => {
                let obj = registry.create(identifier, ctx)?;
                Ok(&mut **slot.insert(obj))
            }
        }
    }

    /// Take ownership of an already-constructed instance.
    pub fn insert(
        &mut self,
        identifier: impl Into<String>,
        obj: Box<C::Product>,
    ) -> Result<&mut C::Product, RegistryError> {
        match self.items.entry(identifier.into()) {
            Entry::Occupied(slot) => Err(RegistryError::DuplicateInstance {
                category: C::BASE_IDENTIFIER,
                identifier: slot.key().clone(),
            }),
            Entry::Vacant(slot) => Ok(&mut **slot.insert(obj)),
        }
    }

    /// Whether an instance with this identifier is active.
    pub fn contains(&self, identifier: &str) -> bool {
        self.items.contains_key(identifier)
    }

    /// Typed access to the active instance of `T`.
    ///
    /// # Panics
    ///
    /// Panics if no instance is registered under `T::identifier()`, or if
    /// the instance stored there is not a `T`. Both are programming errors
    /// in the caller; use [`try_get`](Self::try_get) to probe.
    #[track_caller]
    pub fn get<T: Registered>(&self) -> &T {
        let id = T::identifier();
        let Some(obj) = self.items.get(&id) else {
            panic!("{} '{}' is not active", C::BASE_IDENTIFIER, id);
        };
        match C::as_any(obj).downcast_ref::<T>() {
            Some(t) => t,
            None => panic!(
                "{} '{}' is active but is not a {}",
                C::BASE_IDENTIFIER,
                id,
                std::any::type_name::<T>()
            ),
        }
    }

    /// Mutable counterpart of [`get`](Self::get).
    ///
    /// # Panics
    ///
    /// Same conditions as [`get`](Self::get).
    #[track_caller]
    pub fn get_mut<T: Registered>(&mut self) -> &mut T {
        let id = T::identifier();
        let Some(obj) = self.items.get_mut(&id) else {
            panic!("{} '{}' is not active", C::BASE_IDENTIFIER, id);
        };
        match C::as_any_mut(obj).downcast_mut::<T>() {
            Some(t) => t,
            None => panic!(
                "{} '{}' is active but is not a {}",
                C::BASE_IDENTIFIER,
                id,
                std::any::type_name::<T>()
            ),
        }
    }

    /// Typed access that returns `None` instead of panicking.
    pub fn try_get<T: Registered>(&self) -> Option<&T> {
        self.items
            .get(&T::identifier())
            .and_then(|obj| C::as_any(obj).downcast_ref::<T>())
    }

    /// Mutable counterpart of [`try_get`](Self::try_get).
    pub fn try_get_mut<T: Registered>(&mut self) -> Option<&mut T> {
        self.items
            .get_mut(&T::identifier())
            .and_then(|obj| C::as_any_mut(obj).downcast_mut::<T>())
    }

    /// Untyped access by identifier.
    pub fn by_identifier(&self, identifier: &str) -> Option<&C::Product> {
        self.items.get(identifier).map(|b| &**b)
    }

    /// Untyped mutable access by identifier.
    pub fn by_identifier_mut(&mut self, identifier: &str) -> Option<&mut C::Product> {
        self.items.get_mut(identifier).map(|b| &mut **b)
    }

    /// Active identifiers, in insertion order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    /// Number of active instances.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate `(identifier, instance)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &C::Product)> {
        self.items.iter().map(|(k, v)| (k.as_str(), &**v))
    }

    /// Mutable iteration in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut C::Product)> {
        self.items.iter_mut().map(|(k, v)| (k.as_str(), &mut **v))
    }

    /// Apply `f` to every instance in insertion order.
    pub fn for_each_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&str, &mut C::Product),
    {
        for (id, obj) in self.items.iter_mut() {
            f(id.as_str(), &mut **obj);
        }
    }
}

impl<C: Category> Default for CollectionMgr<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Category> fmt::Debug for CollectionMgr<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionMgr")
            .field("category", &C::BASE_IDENTIFIER)
            .field("active", &self.items.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::{shape_registry, Polygon, Shape, ShapeCategory, Triangle};
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn add_then_typed_get() {
        let reg = shape_registry();
        let mut mgr = CollectionMgr::<ShapeCategory>::new();
        let mut built = 0;
        assert_eq!(mgr.add(&reg, "Polygon", &mut built).unwrap().sides(), 5);
        mgr.add(&reg, "Triangle", &mut built).unwrap();
        assert_eq!(mgr.get::<Polygon>().0, 5);
        assert!(mgr.contains("Triangle"));
        mgr.get_mut::<Polygon>().0 = 6;
        assert_eq!(mgr.try_get::<Polygon>().map(|p| p.0), Some(6));
        assert_eq!(built, 2);
    }

    #[test]
    fn duplicate_add_fails_without_constructing() {
        let reg = shape_registry();
        let mut mgr = CollectionMgr::<ShapeCategory>::new();
        let mut built = 0;
        mgr.add(&reg, "Triangle", &mut built).unwrap();
        let err = mgr.add(&reg, "Triangle", &mut built).err().unwrap();
        assert_eq!(
            err,
            RegistryError::DuplicateInstance {
                category: "Shape",
                identifier: "Triangle".to_string(),
            }
        );
        assert_eq!(built, 1);
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn unknown_add_leaves_collection_unchanged() {
        let reg = shape_registry();
        let mut mgr = CollectionMgr::<ShapeCategory>::new();
        let mut built = 0;
        assert!(matches!(
            mgr.add(&reg, "Hexagon", &mut built),
            Err(RegistryError::UnknownIdentifier { .. })
        ));
        assert!(mgr.is_empty());
        assert!(!mgr.contains("Hexagon"));
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let reg = shape_registry();
        let mut mgr = CollectionMgr::<ShapeCategory>::new();
        let mut built = 0;
        mgr.add(&reg, "Polygon", &mut built).unwrap();
        mgr.add(&reg, "Triangle", &mut built).unwrap();
        mgr.insert("Square", Box::new(Polygon(4))).unwrap();
        let mut seen = Vec::new();
        mgr.for_each_mut(|id, shape| seen.push((id.to_string(), shape.sides())));
        assert_eq!(
            seen,
            vec![
                ("Polygon".to_string(), 5),
                ("Triangle".to_string(), 3),
                ("Square".to_string(), 4)
            ]
        );
        let ids: Vec<_> = mgr.identifiers().collect();
        assert_eq!(ids, vec!["Polygon", "Triangle", "Square"]);
    }

    #[test]
    fn get_absent_panics_with_identifier() {
        let mgr = CollectionMgr::<ShapeCategory>::new();
        let err = catch_unwind(AssertUnwindSafe(|| {
            mgr.get::<Triangle>();
        }))
        .unwrap_err();
        let msg = err.downcast_ref::<String>().unwrap();
        assert_eq!(msg, "Shape 'Triangle' is not active");
    }

    #[test]
    fn get_wrong_type_panics() {
        let mut mgr = CollectionMgr::<ShapeCategory>::new();
        mgr.insert("Triangle", Box::new(Polygon(3))).unwrap();
        assert!(mgr.try_get::<Triangle>().is_none());
        let err = catch_unwind(AssertUnwindSafe(|| {
            mgr.get::<Triangle>();
        }))
        .unwrap_err();
        let msg = err.downcast_ref::<String>().unwrap();
        assert!(msg.contains("is active but is not a"));
    }
}
