//! Plain RSpec examples calling the method on the class or an instance.

use super::codegen;
use super::{example, RenderContext, Renderer};
use crate::model::{NamedScope, Operation};

pub struct GenericRenderer;

impl Renderer for GenericRenderer {
    fn operation_example(&self, ctx: &RenderContext<'_>, op: &Operation) -> String {
        let setup = format!(
            "{}{}",
            codegen::instantiation(ctx.declaration, op),
            codegen::params_initialization(&codegen::call_params(op))
        );
        example(
            &op.decorated_name(),
            &setup,
            &codegen::invocation(ctx.declaration, op),
        )
    }

    fn scope_example(&self, _ctx: &RenderContext<'_>, scope: &NamedScope) -> Option<String> {
        Some(scope_example(scope))
    }
}

/// Shared with the model style: `described_class.<scope>`.
pub(super) fn scope_example(scope: &NamedScope) -> String {
    example(
        &format!(".{}", scope.name),
        "",
        &format!("described_class.{}", scope.name),
    )
}
