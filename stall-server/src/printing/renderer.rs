//! Receipt template rendering
//!
//! Templates produce inline-markup text (`[[C]][[B]]...`), never bytes; the
//! printer crate turns that text into ESC/POS.

use handlebars::{Handlebars, handlebars_helper, no_escape};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template render failed: {0}")]
    Template(String),
}

/// Text templating capability
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, context: &Value) -> Result<String, RenderError>;
}

fn cents_of(v: &Value) -> i64 {
    v.as_i64()
        .or_else(|| v.as_f64().map(|f| f.round() as i64))
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        .unwrap_or(0)
}

// `{{money cents}}` -> `12.50`
handlebars_helper!(money: |cents: Json| format_cents(cents_of(cents)));

// `{{mul a b}}` for line totals
handlebars_helper!(mul: |a: Json, b: Json| cents_of(a).saturating_mul(cents_of(b)));

pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Handlebars with escaping disabled
pub struct HandlebarsRenderer {
    engine: Handlebars<'static>,
}

impl HandlebarsRenderer {
    pub fn new() -> Self {
        let mut engine = Handlebars::new();
        engine.set_strict_mode(false);
        engine.register_escape_fn(no_escape);
        engine.register_helper("money", Box::new(money));
        engine.register_helper("mul", Box::new(mul));
        Self { engine }
    }
}

impl Default for HandlebarsRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HandlebarsRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlebarsRenderer").finish_non_exhaustive()
    }
}

impl TemplateRenderer for HandlebarsRenderer {
    fn render(&self, template: &str, context: &Value) -> Result<String, RenderError> {
        if !template.contains("{{") {
            return Ok(template.to_string());
        }
        self.engine
            .render_template(template, context)
            .map_err(|e| RenderError::Template(e.to_string()))
    }
}
