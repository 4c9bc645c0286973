//! Construct-by-name registry for pluggable module families.
//!
//! A [`Category`] describes one module family (physics, PDEs, source
//! terms): its base identifier, the trait object it produces, and the
//! context a constructor receives. A [`Registry`] maps string identifiers
//! within one category to constructors.
//!
//! Registries have two phases. All constructors are registered on a
//! [`RegistryBuilder`] before any simulation object exists; `build()` then
//! freezes it into a read-only [`Registry`] used during setup. Setup code
//! takes the registry as an explicit argument so construction paths can
//! be tested in isolation.

use std::any::Any;
use std::error::Error;
use std::fmt;

use indexmap::IndexMap;

use crate::error::RegistryError;

/// A module family that can be constructed by name.
pub trait Category: 'static {
    /// Base identifier used in error messages, e.g. `"Physics"`.
    const BASE_IDENTIFIER: &'static str;

    /// The trait object instances of this family are stored as.
    type Product: ?Sized + 'static;

    /// What a constructor receives. Typically the simulation core, so a
    /// module can declare its fields and read its parameters.
    type Context: ?Sized;

    /// View a product as `Any` for typed downcasts.
    fn as_any(product: &Self::Product) -> &dyn Any;

    /// Mutable counterpart of [`as_any`](Self::as_any).
    fn as_any_mut(product: &mut Self::Product) -> &mut dyn Any;
}

/// A concrete module type that knows its own registry key.
///
/// Used by typed lookup ([`CollectionMgr::get`](crate::CollectionMgr::get)):
/// the key selects the instance and the concrete type validates it.
pub trait Registered: 'static {
    /// The identifier this type is registered under.
    fn identifier() -> String;
}

/// Result of a constructor.
pub type ConstructResult<P> = Result<Box<P>, Box<dyn Error + Send + Sync>>;

type Constructor<C> = Box<
    dyn Fn(&mut <C as Category>::Context) -> ConstructResult<<C as Category>::Product>
        + Send
        + Sync,
>;

/// Registration phase of a [`Registry`].
pub struct RegistryBuilder<C: Category> {
    constructors: IndexMap<String, Constructor<C>>,
}

impl<C: Category> RegistryBuilder<C> {
    /// An empty builder.
    pub fn new() -> Self {
        Self {
            constructors: IndexMap::new(),
        }
    }

    /// Register a constructor under `identifier`.
    ///
    /// Registering the same identifier twice is a programming error and
    /// is reported as [`RegistryError::DuplicateRegistration`]; the
    /// original constructor is kept.
    pub fn register<F>(
        &mut self,
        identifier: impl Into<String>,
        constructor: F,
    ) -> Result<&mut Self, RegistryError>
    where
        F: Fn(&mut C::Context) -> ConstructResult<C::Product> + Send + Sync + 'static,
    {
        let identifier = identifier.into();
        if self.constructors.contains_key(&identifier) {
            return Err(RegistryError::DuplicateRegistration {
                category: C::BASE_IDENTIFIER,
                identifier,
            });
        }
        self.constructors.insert(identifier, Box::new(constructor));
        Ok(self)
    }

    /// Register a constructor under `T::identifier()`.
    pub fn register_type<T, F>(&mut self, constructor: F) -> Result<&mut Self, RegistryError>
    where
        T: Registered,
        F: Fn(&mut C::Context) -> ConstructResult<C::Product> + Send + Sync + 'static,
    {
        self.register(T::identifier(), constructor)
    }

    /// Freeze the builder into a read-only registry.
    pub fn build(self) -> Registry<C> {
        Registry {
            constructors: self.constructors,
        }
    }
}

impl<C: Category> Default for RegistryBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only mapping from identifier to constructor for one [`Category`].
///
/// Holds no simulation state and outlives any individual simulation.
pub struct Registry<C: Category> {
    constructors: IndexMap<String, Constructor<C>>,
}

impl<C: Category> Registry<C> {
    /// Start a new registration phase.
    pub fn builder() -> RegistryBuilder<C> {
        RegistryBuilder::new()
    }

    /// The base identifier of this registry's category.
    pub fn category(&self) -> &'static str {
        C::BASE_IDENTIFIER
    }

    /// Construct the module registered under `identifier`.
    ///
    /// Unknown identifiers are a recoverable configuration error: nothing
    /// is constructed and the error lists the registered identifiers.
    pub fn create(
        &self,
        identifier: &str,
        ctx: &mut C::Context,
    ) -> Result<Box<C::Product>, RegistryError> {
        let constructor =
            self.constructors
                .get(identifier)
                .ok_or_else(|| RegistryError::UnknownIdentifier {
                    category: C::BASE_IDENTIFIER,
                    identifier: identifier.to_string(),
                    available: self.constructors.keys().cloned().collect(),
                })?;
        constructor(ctx).map_err(|e| RegistryError::ConstructionFailed {
            category: C::BASE_IDENTIFIER,
            identifier: identifier.to_string(),
            reason: e.to_string(),
        })
    }

    /// Whether a constructor is registered under `identifier`.
    pub fn contains(&self, identifier: &str) -> bool {
        self.constructors.contains_key(identifier)
    }

    /// Registered identifiers, in registration order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Number of registered constructors.
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Whether no constructor is registered.
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl<C: Category> fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("category", &C::BASE_IDENTIFIER)
            .field("identifiers", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}
