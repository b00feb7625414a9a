//! Widget factories keyed by the `type` tag in configuration.
//!
//! The binary builds one registry at startup (built-ins plus anything it
//! registers itself) and invokes the matching factory once per configured
//! widget.

use std::collections::BTreeMap;

use tokio::runtime::Handle;

use crate::config::WidgetConfig;

use super::builtin;
use super::{Widget, WidgetError};

/// Process resources a factory may hand to the widget it builds.
#[derive(Clone, Default)]
pub struct WidgetContext {
    /// Runtime for background workers. Without one, widgets poll inline.
    pub runtime: Option<Handle>,
}

impl WidgetContext {
    pub fn with_runtime(runtime: Handle) -> Self {
        Self {
            runtime: Some(runtime),
        }
    }
}

pub type Factory = fn(&WidgetConfig, &WidgetContext) -> Result<Box<dyn Widget>, WidgetError>;

#[derive(Default)]
pub struct Registry {
    factories: BTreeMap<String, Factory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in widget type.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("clock", builtin::clock::build);
        registry.register("text", builtin::text::build);
        registry.register("messages", builtin::messages::build);
        registry.register("graph", builtin::graph::build);
        registry
    }

    /// Adds or replaces the factory for `kind`.
    pub fn register(&mut self, kind: &str, factory: Factory) -> Option<Factory> {
        self.factories.insert(kind.to_string(), factory)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn build(&self, config: &WidgetConfig, ctx: &WidgetContext) -> Result<Box<dyn Widget>, WidgetError> {
        let factory = self
            .factories
            .get(&config.kind)
            .ok_or_else(|| WidgetError::UnknownType(config.kind.clone()))?;
        let widget = factory(config, ctx)?;
        log::debug!("Built {} widget {:?}", config.kind, config.id);
        Ok(widget)
    }

    /// Builds every configured widget, failing on the first bad one.
    pub fn build_all(&self, configs: &[WidgetConfig], ctx: &WidgetContext) -> Result<Vec<Box<dyn Widget>>, WidgetError> {
        configs.iter().map(|c| self.build(c, ctx)).collect()
    }
}
