//! Template and widget controllers.
//!
//! Rendering engines are out of scope for the kernel: a template receives
//! the engine name from its route and produces the final markup itself.

use serde_json::{Map, Value};

use crate::container::Container;
use crate::error::Result;
use crate::factory::{Builder, Configurable};
use crate::request::Request;

/// A page controller.
pub trait Template: Configurable + Send {
    fn set_dependencies(&mut self, _container: &Container) -> Result<()> {
        Ok(())
    }

    /// Prepares the template for `req`. Returning `false` aborts the
    /// request with a server error.
    fn init(&mut self, _req: &Request) -> bool {
        true
    }

    fn render(&self, engine: &str) -> Result<String>;
}

/// A reusable page fragment.
pub trait Widget: Configurable + Send {
    fn set_dependencies(&mut self, _container: &Container) -> Result<()> {
        Ok(())
    }

    /// Inactive widgets render as nothing.
    fn active(&self) -> bool {
        true
    }

    fn render(&self) -> Result<String>;
}

/// Builds and renders each widget option map in order, concatenating the
/// markup of the active ones.
pub fn render_widgets(
    builder: &Builder<dyn Widget>,
    options: &[Map<String, Value>],
) -> Result<String> {
    let mut html = String::new();
    for opts in options {
        let widget = builder.build(opts)?;
        if widget.active() {
            html.push_str(&widget.render()?);
        }
    }
    Ok(html)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::error::Error;
    use crate::factory::{Arguments, Catalog, Factory};

    #[derive(Default)]
    struct BadgeWidget {
        label: String,
        hidden: bool,
    }

    impl Configurable for BadgeWidget {
        fn set_field(&mut self, key: &str, value: &Value) -> Result<bool> {
            match (key, value) {
                ("label", Value::String(s)) => self.label = s.clone(),
                ("hidden", Value::Bool(b)) => self.hidden = *b,
                ("label" | "hidden", _) => {
                    return Err(Error::invalid_configuration(format!("bad `{key}`")));
                }
                _ => return Ok(false),
            }
            Ok(true)
        }
    }

    impl Widget for BadgeWidget {
        fn active(&self) -> bool {
            !self.hidden
        }
        fn render(&self) -> Result<String> {
            Ok(format!("<span>{}</span>", self.label))
        }
    }

    fn builder() -> Builder<dyn Widget> {
        let catalog = Catalog::new()
            .with::<dyn Widget, _>("BadgeWidget", |_: &Arguments| {
                Ok(Box::new(BadgeWidget::default()))
            });
        let factory = Factory::builder(Arc::new(catalog)).suffix("Widget").build().unwrap();
        Builder::new(Arc::new(factory), "badge")
    }

    fn opts(value: Value) -> Map<String, Value> {
        let Value::Object(map) = value else { unreachable!() };
        map
    }

    #[test]
    fn inactive_widgets_are_skipped() {
        let html = render_widgets(
            &builder(),
            &[
                opts(json!({"label": "new"})),
                opts(json!({"label": "old", "hidden": true})),
                opts(json!({"type": "badge", "label": "hot"})),
            ],
        )
        .unwrap();
        assert_eq!(html, "<span>new</span><span>hot</span>");
    }

    #[test]
    fn first_failure_stops_rendering() {
        let err = render_widgets(&builder(), &[opts(json!({"type": "chart"}))]).unwrap_err();
        assert!(matches!(err, Error::UnknownIdentifier { .. }));
    }
}
