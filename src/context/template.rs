//! Template context processor.
//!
//! Exposes the request's flash to presentation code under the name
//! [`CONTEXT_VAR`], so templates read `flash.message` without knowing about
//! the middleware.

use crate::context::request::{InvalidFlashObject, Request};
use crate::context::CONTEXT_VAR;
use crate::scope::FlashScope;
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Variables contributed to a template's rendering context.
#[derive(Debug, Clone)]
pub struct TemplateContext<'a> {
    flash: Cow<'a, FlashScope>,
}

impl<'a> TemplateContext<'a> {
    pub fn flash(&self) -> &FlashScope {
        &self.flash
    }

    /// Looks up a context variable by name.
    pub fn get(&self, name: &str) -> Option<&FlashScope> {
        (name == CONTEXT_VAR).then(|| self.flash())
    }

    /// Renders the context as JSON: `{ "flash": { key: value, ... } }`.
    pub fn to_json(&self) -> Value {
        let entries: Map<String, Value> = self
            .flash
            .iter()
            .map(|(key, value)| (key.to_owned(), value.clone()))
            .collect();

        let mut context = Map::new();
        context.insert(CONTEXT_VAR.to_string(), Value::Object(entries));
        Value::Object(context)
    }
}

/// Builds the template context for `request`.
///
/// A request without a flash gets an empty one. Anything other than a
/// [`FlashScope`] under the flash attribute is an error.
pub fn template_context(request: &Request) -> Result<TemplateContext<'_>, InvalidFlashObject> {
    let flash = match request.flash()? {
        Some(flash) => Cow::Borrowed(flash),
        None => Cow::Owned(FlashScope::new()),
    };
    Ok(TemplateContext { flash })
}
