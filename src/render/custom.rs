//! User-supplied frame around the examples of a built-in style.

use super::{RenderContext, Renderer};
use crate::model::{NamedScope, Operation};

pub struct CustomRenderer {
    template: String,
    inner: Box<dyn Renderer>,
}

impl CustomRenderer {
    pub fn new(template: &str, inner: Box<dyn Renderer>) -> Self {
        Self {
            template: template.to_string(),
            inner,
        }
    }
}

impl Renderer for CustomRenderer {
    fn operation_example(&self, ctx: &RenderContext<'_>, op: &Operation) -> String {
        self.inner.operation_example(ctx, op)
    }

    fn scope_example(&self, ctx: &RenderContext<'_>, scope: &NamedScope) -> Option<String> {
        self.inner.scope_example(ctx, scope)
    }

    fn frame(&self, _full: bool) -> &str {
        &self.template
    }
}
