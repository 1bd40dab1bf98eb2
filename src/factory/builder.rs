//! Building objects from configuration maps.
//!
//! A [`Builder`] reads the type key out of a config map, creates the object
//! through its [`Factory`], then pushes the rest of the map into it through
//! [`Configurable`].

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::trace;

use super::Factory;
use crate::error::{Error, Result};

/// Keys that name the type to build, in priority order.
const TYPE_KEYS: [&str; 2] = ["controller", "type"];

/// What to do with a field the target object does not recognise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownFields {
    /// Skip it (logged at trace level).
    #[default]
    Ignore,
    /// Fail with [`Error::InvalidConfiguration`].
    Reject,
}

/// Bulk data-setting contract for built objects.
pub trait Configurable {
    /// Applies one named field.
    ///
    /// Returns `Ok(false)` when the field is not recognised; errors mean the
    /// value was recognised but invalid.
    fn set_field(&mut self, key: &str, value: &Value) -> Result<bool>;

    /// Applies every field of `data`. `null` values are skipped.
    fn set_data(&mut self, data: &Map<String, Value>, policy: UnknownFields) -> Result<()> {
        for (key, value) in data {
            if value.is_null() {
                continue;
            }
            if self.set_field(key, value)? {
                continue;
            }
            match policy {
                UnknownFields::Ignore => trace!(field = %key, "ignoring unknown field"),
                UnknownFields::Reject => {
                    return Err(Error::invalid_configuration(format!("unknown field `{key}`")));
                }
            }
        }
        Ok(())
    }
}

/// Builds configured objects from option maps.
pub struct Builder<T: ?Sized + Configurable + 'static> {
    factory: Arc<Factory<T>>,
    default_identifier: String,
    policy: UnknownFields,
}

impl<T: ?Sized + Configurable + 'static> Builder<T> {
    /// `default_identifier` is used when an options map names no type.
    pub fn new(factory: Arc<Factory<T>>, default_identifier: impl Into<String>) -> Self {
        Self {
            factory,
            default_identifier: default_identifier.into(),
            policy: UnknownFields::default(),
        }
    }

    pub fn unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.policy = policy;
        self
    }

    pub fn factory(&self) -> &Arc<Factory<T>> {
        &self.factory
    }

    pub fn default_identifier(&self) -> &str {
        &self.default_identifier
    }

    /// Resolves the type from `controller`, then `type`, then the default,
    /// builds it, and applies the remaining fields.
    pub fn build(&self, options: &Map<String, Value>) -> Result<Box<T>> {
        let identifier = self.identifier(options)?;
        let mut object = self.factory.create(identifier, None)?;

        let data: Map<String, Value> = options
            .iter()
            .filter(|(k, _)| !TYPE_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        object.set_data(&data, self.policy)?;
        Ok(object)
    }

    fn identifier<'a>(&'a self, options: &'a Map<String, Value>) -> Result<&'a str> {
        for key in TYPE_KEYS {
            match options.get(key) {
                None | Some(Value::Null) => continue,
                Some(Value::String(s)) => return Ok(s),
                Some(other) => {
                    return Err(Error::invalid_configuration(format!(
                        "`{key}` must be a string, got `{other}`"
                    )));
                }
            }
        }
        Ok(&self.default_identifier)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::factory::{Arguments, Catalog};

    trait Widget: Configurable + Send {
        fn kind(&self) -> &'static str;
        fn title(&self) -> &str;
    }

    #[derive(Default)]
    struct TextWidget {
        title: String,
    }

    impl Configurable for TextWidget {
        fn set_field(&mut self, key: &str, value: &Value) -> Result<bool> {
            match key {
                "title" => {
                    self.title = value
                        .as_str()
                        .ok_or_else(|| Error::invalid_configuration("title must be a string"))?
                        .to_owned();
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
    }

    impl Widget for TextWidget {
        fn kind(&self) -> &'static str {
            "text"
        }
        fn title(&self) -> &str {
            &self.title
        }
    }

    struct ImageWidget;

    impl Configurable for ImageWidget {
        fn set_field(&mut self, _: &str, _: &Value) -> Result<bool> {
            Ok(false)
        }
    }

    impl Widget for ImageWidget {
        fn kind(&self) -> &'static str {
            "image"
        }
        fn title(&self) -> &str {
            ""
        }
    }

    fn builder() -> Builder<dyn Widget> {
        let catalog = Arc::new(
            Catalog::new()
                .with::<dyn Widget, _>("TextWidget", |_: &Arguments| {
                    Ok(Box::new(TextWidget::default()))
                })
                .with::<dyn Widget, _>("ImageWidget", |_: &Arguments| Ok(Box::new(ImageWidget))),
        );
        let factory = Factory::builder(catalog).suffix("Widget").build().unwrap();
        Builder::new(Arc::new(factory), "text")
    }

    fn options(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn controller_wins_over_type() {
        let opts = options(json!({"controller": "image", "type": "text"}));
        let widget = builder().build(&opts).unwrap();
        assert_eq!(widget.kind(), "image");
    }

    #[test]
    fn type_key_is_used_without_controller() {
        let widget = builder().build(&options(json!({"type": "image"}))).unwrap();
        assert_eq!(widget.kind(), "image");
    }

    #[test]
    fn missing_type_keys_fall_back_to_default() {
        let widget = builder().build(&options(json!({"title": "Hello"}))).unwrap();
        assert_eq!(widget.kind(), "text");
        assert_eq!(widget.title(), "Hello");
    }

    #[test]
    fn non_string_type_is_invalid() {
        let err = builder().build(&options(json!({"type": 4}))).err().unwrap();
        assert!(matches!(err, Error::InvalidConfiguration { .. }));
    }

    #[test]
    fn unknown_fields_are_ignored_by_default() {
        let widget = builder().build(&options(json!({"title": "a", "colour": "red"}))).unwrap();
        assert_eq!(widget.title(), "a");
    }

    #[test]
    fn unknown_fields_can_be_rejected() {
        let builder = builder().unknown_fields(UnknownFields::Reject);
        let err = builder.build(&options(json!({"colour": "red"}))).err().unwrap();
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn null_values_are_skipped() {
        let builder = builder().unknown_fields(UnknownFields::Reject);
        let widget = builder.build(&options(json!({"title": null, "colour": null}))).unwrap();
        assert_eq!(widget.title(), "");
    }

    #[test]
    fn setter_errors_propagate() {
        let err = builder().build(&options(json!({"title": 12}))).err().unwrap();
        assert!(err.to_string().contains("title must be a string"));
    }
}
