//! Typed object factories.
//!
//! A [`Factory<T>`] turns an identifier into a ready-to-use `Box<T>`:
//!
//! ```text
//! "gallery"                                   ← identifier
//!     ↓ ResolutionRule (suffix "Widget")
//! "GalleryWidget"                             ← catalog type name
//!     ↓ Catalog lookup, typed by capability
//! Constructor<dyn Widget>
//!     ↓ called with the merged Arguments
//! Box<dyn Widget>
//!     ↓ optional callback (second-phase injection)
//! Box<dyn Widget>                             ← handed to the caller
//! ```
//!
//! Factories are immutable once built and can be shared across threads.

mod arguments;
mod builder;
mod catalog;
mod resolver;

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

pub use arguments::Arguments;
pub use builder::{Builder, Configurable, UnknownFields};
pub use catalog::{Catalog, Constructor};
use catalog::Found;
pub use resolver::ResolutionRule;

/// Post-construction hook run on every object a factory builds.
pub type Callback<T> = Arc<dyn Fn(&mut T) -> Result<()> + Send + Sync + 'static>;

/// Builds objects of capability `T` from identifiers.
pub struct Factory<T: ?Sized + 'static> {
    catalog: Arc<Catalog>,
    rule: ResolutionRule,
    aliases: HashMap<String, String>,
    default_type: Option<String>,
    arguments: Arguments,
    callback: Option<Callback<T>>,
}

impl<T: ?Sized + 'static> Factory<T> {
    pub fn builder(catalog: Arc<Catalog>) -> FactoryBuilder<T> {
        FactoryBuilder {
            catalog,
            rule: ResolutionRule::default(),
            aliases: HashMap::new(),
            default_type: None,
            bundles: Vec::new(),
            callback: None,
            _capability: PhantomData,
        }
    }

    /// Resolves, constructs and injects one object.
    ///
    /// `overrides` are merged over a copy of the factory's arguments for
    /// this call only.
    pub fn create(&self, identifier: &str, overrides: Option<&Arguments>) -> Result<Box<T>> {
        let (type_name, constructor) = self.lookup(identifier)?;

        let merged;
        let arguments = match overrides {
            Some(o) if !o.is_empty() => {
                merged = self.arguments.merged(o);
                &merged
            }
            _ => &self.arguments,
        };

        let mut object = constructor(arguments).map_err(|source| Error::Construction {
            type_name: type_name.clone(),
            source,
        })?;

        if let Some(callback) = &self.callback {
            callback(object.as_mut()).map_err(|e| Error::construction(type_name.clone(), e))?;
        }

        debug!(identifier, type_name = %type_name, "object created");
        Ok(object)
    }

    /// The catalog type name `create(identifier)` would build.
    pub fn resolve(&self, identifier: &str) -> Result<String> {
        self.lookup(identifier).map(|(name, _)| name)
    }

    /// Whether `identifier` resolves to a conforming type, ignoring the
    /// configured default.
    pub fn is_resolvable(&self, identifier: &str) -> bool {
        let identifier = identifier.trim();
        !identifier.is_empty() && matches!(self.find(identifier), Some(Ok(_)))
    }

    pub fn rule(&self) -> &ResolutionRule {
        &self.rule
    }

    pub fn default_type(&self) -> Option<&str> {
        self.default_type.as_deref()
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    fn candidates(&self, identifier: &str) -> Vec<String> {
        let mut names = vec![identifier.to_owned()];
        if let Some(target) = self.aliases.get(identifier) {
            names.push(target.clone());
        }
        names.push(self.rule.resolve(identifier));
        names
    }

    /// The first catalog hit among the candidates, default excluded.
    fn find(&self, identifier: &str) -> Option<Result<(String, Constructor<T>)>> {
        self.candidates(identifier).into_iter().find_map(|name| {
            let found = self.catalog.lookup::<T>(&name)?;
            Some(self.conform(name, found))
        })
    }

    fn lookup(&self, identifier: &str) -> Result<(String, Constructor<T>)> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(Error::UnknownIdentifier {
                identifier: identifier.to_owned(),
                resolved: String::new(),
            });
        }

        if let Some(result) = self.find(identifier) {
            return result;
        }

        if let Some(default) = &self.default_type {
            debug!(identifier, default = %default, "falling back to default type");
            if let Some(found) = self.catalog.lookup::<T>(default) {
                return self.conform(default.clone(), found);
            }
        }

        Err(Error::UnknownIdentifier {
            identifier: identifier.to_owned(),
            resolved: self.rule.resolve(identifier),
        })
    }

    fn conform(&self, type_name: String, found: Found<T>) -> Result<(String, Constructor<T>)> {
        match found {
            Found::Constructor(ctor) if self.rule.conforms(&type_name) => Ok((type_name, ctor)),
            Found::Constructor(_) => Err(Error::CapabilityMismatch {
                type_name,
                capability: format!("*{} naming", self.rule.suffix()),
            }),
            Found::OtherCapability(registered) => Err(Error::CapabilityMismatch {
                type_name: format!("{type_name} ({registered})"),
                capability: std::any::type_name::<T>().to_owned(),
            }),
        }
    }
}

impl<T: ?Sized + 'static> fmt::Debug for Factory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("capability", &std::any::type_name::<T>())
            .field("rule", &self.rule)
            .field("aliases", &self.aliases)
            .field("default_type", &self.default_type)
            .field("arguments", &self.arguments)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Configures a [`Factory`]. Obtain via [`Factory::builder`].
pub struct FactoryBuilder<T: ?Sized + 'static> {
    catalog: Arc<Catalog>,
    rule: ResolutionRule,
    aliases: HashMap<String, String>,
    default_type: Option<String>,
    bundles: Vec<Value>,
    callback: Option<Callback<T>>,
    _capability: PhantomData<fn() -> Box<T>>,
}

impl<T: ?Sized + 'static> FactoryBuilder<T> {
    /// Naming suffix every built type must carry (`Action`, `Widget`, …).
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        let namespace = self.rule.namespace().map(str::to_owned);
        self.rule = ResolutionRule::new(suffix);
        if let Some(ns) = namespace {
            self.rule = self.rule.with_namespace(ns);
        }
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.rule = self.rule.with_namespace(namespace);
        self
    }

    /// Maps a short identifier directly to a catalog type name.
    pub fn alias(mut self, identifier: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.aliases.insert(identifier.into(), type_name.into());
        self
    }

    /// Type built when an identifier does not resolve.
    pub fn default_type(mut self, type_name: impl Into<String>) -> Self {
        self.default_type = Some(type_name.into());
        self
    }

    /// Appends one bundle of named construction values.
    pub fn arguments(mut self, bundle: Value) -> Self {
        self.bundles.push(bundle);
        self
    }

    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut T) -> Result<()> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Validates the configuration and freezes it into a [`Factory`].
    pub fn build(self) -> Result<Factory<T>> {
        let arguments = Arguments::from_bundles(self.bundles)?;

        let factory = Factory {
            catalog: self.catalog,
            rule: self.rule,
            aliases: self.aliases,
            default_type: self.default_type,
            arguments,
            callback: self.callback,
        };

        if let Some(default) = &factory.default_type {
            let found = factory.catalog.lookup::<T>(default).ok_or_else(|| {
                Error::invalid_configuration(format!("default type `{default}` is not registered"))
            })?;
            factory.conform(default.clone(), found)?;
        }

        Ok(factory)
    }
}
