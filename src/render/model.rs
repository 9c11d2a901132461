//! Data-model specs. Models are built with a bare `new`, since their
//! constructors take attribute hashes rather than collaborators.

use super::{codegen, generic};
use super::{example, RenderContext, Renderer};
use crate::model::{NamedScope, Operation};

pub struct ModelRenderer;

impl Renderer for ModelRenderer {
    fn operation_example(&self, ctx: &RenderContext<'_>, op: &Operation) -> String {
        let instance = if op.singleton {
            String::new()
        } else {
            format!(
                "      {} = described_class.new\n",
                codegen::instance_name(ctx.declaration)
            )
        };
        let setup = format!(
            "{}{}",
            instance,
            codegen::params_initialization(&codegen::call_params(op))
        );
        example(
            &op.decorated_name(),
            &setup,
            &codegen::invocation(ctx.declaration, op),
        )
    }

    fn scope_example(&self, _ctx: &RenderContext<'_>, scope: &NamedScope) -> Option<String> {
        Some(generic::scope_example(scope))
    }
}
