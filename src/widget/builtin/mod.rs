//! Built-in widget catalogue.
//!
//! Each module exposes a `build` factory with the [`super::registry::Factory`]
//! signature and an `Options` type parsed from the instance's `options`
//! table.

pub mod clock;
pub mod graph;
pub mod messages;
pub mod text;

use serde::de::DeserializeOwned;

use crate::config::WidgetConfig;

use super::WidgetError;

/// Parses `config.options` into `T`, reporting failures against the widget id.
pub(crate) fn parse_options<T: DeserializeOwned>(config: &WidgetConfig) -> Result<T, WidgetError> {
    config
        .options_as()
        .map_err(|e| WidgetError::options(&config.id, e))
}
