//! View-helper specs: helpers are called as plain functions, no instance.

use super::codegen;
use super::{example, RenderContext, Renderer};
use crate::model::Operation;

pub struct HelperRenderer;

impl Renderer for HelperRenderer {
    fn operation_example(&self, _ctx: &RenderContext<'_>, op: &Operation) -> String {
        example(
            &op.decorated_name(),
            &codegen::params_initialization(&codegen::call_params(op)),
            &codegen::helper_invocation(op),
        )
    }
}
