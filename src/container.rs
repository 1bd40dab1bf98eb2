//! The service container: configuration plus the kernel factories.
//!
//! Objects built by the kernel factories get a second-phase
//! `set_dependencies(&Container)` call. Factories live inside the
//! container, so their callbacks only hold a weak reference back to it.

use std::sync::{Arc, OnceLock, Weak};

use serde_json::{Value, json};
use tracing::debug;

use crate::action::Action;
use crate::config::AppConfig;
use crate::email::Email;
use crate::error::{Error, Result};
use crate::factory::{Builder, Catalog, Factory, FactoryBuilder};
use crate::module::Module;
use crate::route::Route;
use crate::script::Script;
use crate::template::{Template, Widget};

type Slot = Arc<OnceLock<Weak<Container>>>;

pub struct Container {
    config: Arc<AppConfig>,
    catalog: Arc<Catalog>,
    routes: Arc<Factory<dyn Route>>,
    actions: Arc<Factory<dyn Action>>,
    scripts: Arc<Factory<dyn Script>>,
    templates: Arc<Factory<dyn Template>>,
    widgets: Arc<Factory<dyn Widget>>,
    emails: Arc<Factory<dyn Email>>,
    modules: Arc<Factory<dyn Module>>,
    widget_builder: Option<Arc<Builder<dyn Widget>>>,
}

impl Container {
    pub fn new(config: Arc<AppConfig>, catalog: Arc<Catalog>) -> Result<Arc<Self>> {
        let slot = Slot::default();
        let bundles = [
            json!({ "debug": config.debug, "base_url": config.base_url }),
            Value::Object(config.arguments.clone()),
        ];

        let routes = kernel_factory::<dyn Route>(&catalog, "Route", &bundles)
            .callback(inject::<dyn Route>(Arc::clone(&slot), |route, c| {
                route.set_dependencies(c)
            }))
            .build()?;
        let actions = kernel_factory::<dyn Action>(&catalog, "Action", &bundles)
            .callback(inject::<dyn Action>(Arc::clone(&slot), |action, c| {
                action.set_dependencies(c)
            }))
            .build()?;
        let scripts = kernel_factory::<dyn Script>(&catalog, "Script", &bundles)
            .callback(inject::<dyn Script>(Arc::clone(&slot), |script, c| {
                script.set_dependencies(c)
            }))
            .build()?;
        let templates = kernel_factory::<dyn Template>(&catalog, "Template", &bundles)
            .callback(inject::<dyn Template>(Arc::clone(&slot), |template, c| {
                template.set_dependencies(c)
            }))
            .build()?;
        let widgets = Arc::new(
            kernel_factory::<dyn Widget>(&catalog, "Widget", &bundles)
                .callback(inject::<dyn Widget>(Arc::clone(&slot), |widget, c| {
                    widget.set_dependencies(c)
                }))
                .build()?,
        );
        let emails = kernel_factory::<dyn Email>(&catalog, "Email", &bundles)
            .callback(inject::<dyn Email>(Arc::clone(&slot), |email, c| {
                email.set_dependencies(c)
            }))
            .build()?;
        let modules = kernel_factory::<dyn Module>(&catalog, "Module", &bundles).build()?;

        let widget_builder = match &config.widgets.default_type {
            Some(default) => {
                widgets.resolve(default).map_err(|e| {
                    Error::invalid_configuration(format!("widgets.default_type: {e}"))
                })?;
                Some(Arc::new(Builder::new(Arc::clone(&widgets), default.clone())))
            }
            None => None,
        };

        let container = Arc::new(Self {
            config,
            catalog,
            routes: Arc::new(routes),
            actions: Arc::new(actions),
            scripts: Arc::new(scripts),
            templates: Arc::new(templates),
            widgets,
            emails: Arc::new(emails),
            modules: Arc::new(modules),
            widget_builder,
        });
        // A fresh slot cannot already be set.
        let _ = slot.set(Arc::downgrade(&container));

        debug!(types = container.catalog.len(), "container ready");
        Ok(container)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn routes(&self) -> &Arc<Factory<dyn Route>> {
        &self.routes
    }

    pub fn actions(&self) -> &Arc<Factory<dyn Action>> {
        &self.actions
    }

    pub fn scripts(&self) -> &Arc<Factory<dyn Script>> {
        &self.scripts
    }

    pub fn templates(&self) -> &Arc<Factory<dyn Template>> {
        &self.templates
    }

    pub fn widgets(&self) -> &Arc<Factory<dyn Widget>> {
        &self.widgets
    }

    pub fn emails(&self) -> &Arc<Factory<dyn Email>> {
        &self.emails
    }

    pub fn modules(&self) -> &Arc<Factory<dyn Module>> {
        &self.modules
    }

    /// Fails unless `widgets.default_type` is configured.
    pub fn widget_builder(&self) -> Result<&Arc<Builder<dyn Widget>>> {
        self.widget_builder
            .as_ref()
            .ok_or_else(|| Error::invalid_configuration("widgets.default_type is not configured"))
    }
}

fn kernel_factory<T: ?Sized + 'static>(
    catalog: &Arc<Catalog>,
    suffix: &str,
    bundles: &[Value],
) -> FactoryBuilder<T> {
    let builder = Factory::builder(Arc::clone(catalog)).suffix(suffix);
    bundles
        .iter()
        .fold(builder, |builder, bundle| builder.arguments(bundle.clone()))
}

fn inject<T: ?Sized + 'static>(
    slot: Slot,
    apply: fn(&mut T, &Container) -> Result<()>,
) -> impl Fn(&mut T) -> Result<()> + Send + Sync + 'static {
    move |object: &mut T| {
        let container = slot
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| Error::invalid_configuration("container is no longer available"))?;
        apply(object, &container)
    }
}
