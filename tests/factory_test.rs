//! Factory and builder tests through the public API.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use kiln::{Arguments, BoxError, Builder, Catalog, Configurable, Error, Factory, Result, Widget};
use serde_json::{Map, Value, json};

#[derive(Default)]
struct CardWidget {
    kind: &'static str,
    title: String,
    locale: String,
    hidden: bool,
}

impl Configurable for CardWidget {
    fn set_field(&mut self, key: &str, value: &Value) -> Result<bool> {
        match key {
            "title" => self.title = value.as_str().unwrap_or_default().to_owned(),
            "hidden" => self.hidden = value.as_bool().unwrap_or(false),
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl Widget for CardWidget {
    fn active(&self) -> bool {
        !self.hidden
    }

    fn render(&self) -> Result<String> {
        Ok(format!("{}:{}:{}", self.kind, self.title, self.locale))
    }
}

type Built = std::result::Result<Box<dyn Widget>, BoxError>;

fn card(kind: &'static str) -> impl Fn(&Arguments) -> Built + Send + Sync {
    move |args: &Arguments| -> Built {
        Ok(Box::new(CardWidget {
            kind,
            locale: args.get_str("locale").unwrap_or("en").to_owned(),
            ..CardWidget::default()
        }))
    }
}

fn catalog() -> Arc<Catalog> {
    Arc::new(
        Catalog::new()
            .with::<dyn Widget, _>("GalleryWidget", card("gallery"))
            .with::<dyn Widget, _>("Foo::BarBazWidget", card("bar-baz"))
            .with::<dyn Widget, _>("shop::CartWidget", card("cart"))
            .with::<dyn Widget, _>("TextWidget", card("text")),
    )
}

fn options(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

#[test]
fn test_nested_identifier_resolution() {
    let factory = Factory::<dyn Widget>::builder(catalog()).suffix("Widget").build().unwrap();

    assert_eq!(factory.resolve("foo/bar-baz").unwrap(), "Foo::BarBazWidget");
    assert_eq!(factory.resolve("foo\\bar_baz").unwrap(), "Foo::BarBazWidget");
    assert_eq!(factory.create("foo/bar-baz", None).unwrap().render().unwrap(), "bar-baz::en");
}

#[test]
fn test_namespace_prefixes_resolution() {
    let factory = Factory::<dyn Widget>::builder(catalog())
        .suffix("Widget")
        .namespace("shop")
        .build()
        .unwrap();

    assert_eq!(factory.resolve("cart").unwrap(), "shop::CartWidget");
    assert!(factory.is_resolvable("cart"));
    assert!(!factory.is_resolvable("basket"));
}

#[test]
fn test_unknown_identifier_reports_resolved_name() {
    let factory = Factory::<dyn Widget>::builder(catalog()).suffix("Widget").build().unwrap();

    let err = factory.create("photo/slider", None).err().unwrap();
    assert_eq!(
        err.to_string(),
        "unknown identifier `photo/slider` (resolved to `Photo::SliderWidget`)"
    );
}

#[test]
fn test_arguments_bundles_merge_in_order() {
    let factory = Factory::<dyn Widget>::builder(catalog())
        .suffix("Widget")
        .arguments(json!({"locale": "en", "debug": false}))
        .arguments(json!({"locale": "de"}))
        .build()
        .unwrap();

    assert_eq!(factory.arguments().get_str("locale"), Some("de"));
    assert_eq!(factory.arguments().get_bool("debug"), Some(false));
    assert_eq!(factory.create("gallery", None).unwrap().render().unwrap(), "gallery::de");

    let overrides = Arguments::new().with("locale", "it");
    let localized = factory.create("gallery", Some(&overrides)).unwrap();
    assert_eq!(localized.render().unwrap(), "gallery::it");
}

#[test]
fn test_callback_sees_every_created_object() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let factory = Factory::<dyn Widget>::builder(catalog())
        .suffix("Widget")
        .callback(move |widget| {
            counter.fetch_add(1, Ordering::SeqCst);
            widget.set_field("title", &json!("injected")).map(|_| ())
        })
        .build()
        .unwrap();

    for identifier in ["gallery", "text", "foo/bar-baz"] {
        let widget = factory.create(identifier, None).unwrap();
        assert!(widget.render().unwrap().contains(":injected:"));
    }
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[test]
fn test_default_type_must_carry_suffix() {
    let catalog = Arc::new(Catalog::new().with::<dyn Widget, _>("Fallback", card("fallback")));
    let err = Factory::<dyn Widget>::builder(catalog)
        .suffix("Widget")
        .default_type("Fallback")
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::CapabilityMismatch { .. }));
}

#[test]
fn test_builder_reads_type_and_data() {
    let factory = Factory::<dyn Widget>::builder(catalog()).suffix("Widget").build().unwrap();
    let builder = Builder::new(Arc::new(factory), "text");

    let opts = options(json!({"controller": "gallery", "title": "Summer"}));
    let widget = builder.build(&opts).unwrap();
    assert_eq!(widget.render().unwrap(), "gallery:Summer:en");

    let widget = builder.build(&options(json!({"title": "Plain"}))).unwrap();
    assert_eq!(widget.render().unwrap(), "text:Plain:en");

    let widget = builder.build(&options(json!({"type": "gallery", "hidden": true}))).unwrap();
    assert!(!widget.active());
}

#[test]
fn test_builder_unknown_type_fails() {
    let factory = Factory::<dyn Widget>::builder(catalog()).suffix("Widget").build().unwrap();
    let builder = Builder::new(Arc::new(factory), "text");

    let err = builder.build(&options(json!({"type": "carousel"}))).err().unwrap();
    assert!(matches!(err, Error::UnknownIdentifier { .. }));
}
