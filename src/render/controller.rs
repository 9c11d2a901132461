//! Resource-controller specs driven by HTTP requests.

use super::codegen;
use super::{RenderContext, Renderer};
use crate::model::Operation;

pub struct ControllerRenderer;

impl Renderer for ControllerRenderer {
    fn operation_example(&self, _ctx: &RenderContext<'_>, op: &Operation) -> String {
        format!(
            "  describe '{}' do
    it 'works' do
      {} :{}, params: {{}}

      expect(response).to have_http_status(:ok)
    end
  end",
            op.decorated_name(),
            codegen::http_verb(&op.name),
            op.name
        )
    }
}
