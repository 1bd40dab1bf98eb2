//! The type catalog: an explicit registry of named constructors.
//!
//! Each entry is registered for exactly one capability (a trait-object
//! type such as `dyn Widget`). A factory asks the catalog two questions:
//! does a type with this name exist, and was it registered for the
//! capability the factory builds. The second answer is a downcast on the
//! stored constructor, so a type can never be handed to a consumer that
//! expects another capability.
//!
//! ```rust
//! use kiln::{Arguments, Catalog};
//!
//! trait Greeter: Send { fn greet(&self) -> String; }
//! struct HelloGreeter;
//! impl Greeter for HelloGreeter { fn greet(&self) -> String { "hello".into() } }
//!
//! let catalog = Catalog::new()
//!     .with::<dyn Greeter, _>("HelloGreeter", |_args: &Arguments| Ok(Box::new(HelloGreeter)));
//! assert!(catalog.contains("HelloGreeter"));
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::arguments::Arguments;
use crate::error::BoxError;

/// A shareable constructor for capability `T`.
pub type Constructor<T> =
    Arc<dyn Fn(&Arguments) -> Result<Box<T>, BoxError> + Send + Sync + 'static>;

struct Entry {
    capability: &'static str,
    constructor: Box<dyn Any + Send + Sync>,
}

/// Outcome of a typed catalog lookup.
pub(crate) enum Found<T: ?Sized + 'static> {
    Constructor(Constructor<T>),
    /// The name exists but was registered for this other capability.
    OtherCapability(&'static str),
}

/// Registry of constructors keyed by type name.
///
/// Populated once at start-up, then shared behind an `Arc` by every factory.
#[derive(Default)]
pub struct Catalog {
    entries: HashMap<String, Entry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Registers `constructor` under `type_name` for capability `T`.
    ///
    /// Registering the same name twice replaces the earlier entry.
    pub fn register<T, F>(&mut self, type_name: impl Into<String>, constructor: F) -> &mut Self
    where
        T: ?Sized + 'static,
        F: Fn(&Arguments) -> Result<Box<T>, BoxError> + Send + Sync + 'static,
    {
        let name = type_name.into();
        let constructor: Constructor<T> = Arc::new(constructor);
        trace!(
            type_name = %name,
            capability = std::any::type_name::<T>(),
            "catalog entry registered"
        );
        self.entries.insert(
            name,
            Entry { capability: std::any::type_name::<T>(), constructor: Box::new(constructor) },
        );
        self
    }

    /// Chaining form of [`register`](Catalog::register).
    pub fn with<T, F>(mut self, type_name: impl Into<String>, constructor: F) -> Self
    where
        T: ?Sized + 'static,
        F: Fn(&Arguments) -> Result<Box<T>, BoxError> + Send + Sync + 'static,
    {
        self.register::<T, F>(type_name, constructor);
        self
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    /// Registered `(type name, capability)` pairs, sorted by name.
    pub fn entries(&self) -> Vec<(&str, &'static str)> {
        let mut list: Vec<_> = self
            .entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.capability))
            .collect();
        list.sort_unstable();
        list
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn lookup<T: ?Sized + 'static>(&self, type_name: &str) -> Option<Found<T>> {
        let entry = self.entries.get(type_name)?;
        Some(match entry.constructor.downcast_ref::<Constructor<T>>() {
            Some(ctor) => Found::Constructor(Arc::clone(ctor)),
            None => Found::OtherCapability(entry.capability),
        })
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape: Send {
        fn sides(&self) -> u32;
    }
    trait Color: Send {}

    struct Square;
    impl Shape for Square {
        fn sides(&self) -> u32 {
            4
        }
    }

    fn squares() -> Catalog {
        Catalog::new().with::<dyn Shape, _>("SquareShape", |_: &Arguments| Ok(Box::new(Square)))
    }

    #[test]
    fn lookup_returns_constructor_for_matching_capability() {
        let catalog = squares();

        let Some(Found::Constructor(ctor)) = catalog.lookup::<dyn Shape>("SquareShape") else {
            panic!("expected a constructor");
        };
        assert_eq!(ctor(&Arguments::new()).unwrap().sides(), 4);
    }

    #[test]
    fn lookup_reports_other_capability() {
        let catalog = squares();

        match catalog.lookup::<dyn Color>("SquareShape") {
            Some(Found::OtherCapability(cap)) => assert!(cap.contains("Shape")),
            _ => panic!("expected a capability mismatch"),
        }
        assert!(catalog.lookup::<dyn Shape>("CircleShape").is_none());
    }

    #[test]
    fn entries_are_sorted() {
        let catalog = Catalog::new()
            .with::<dyn Shape, _>("b", |_: &Arguments| Ok(Box::new(Square)))
            .with::<dyn Shape, _>("a", |_: &Arguments| Ok(Box::new(Square)));
        let names: Vec<_> = catalog.entries().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b"]);
    }
}
