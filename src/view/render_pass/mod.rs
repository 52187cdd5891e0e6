use crate::view::frame_graph::PassContext;
use crate::view::frame_graph::builder::BuildContext;

pub mod effect_pass;
pub(crate) mod render_target_store;

pub use effect_pass::{EffectInput, EffectOutput, EffectRenderPass, EffectTag, EffectTarget};

pub trait RenderPass {
    type Input: Default;
    type Output: Default;

    fn input(&self) -> &Self::Input;
    fn input_mut(&mut self) -> &mut Self::Input;

    fn output(&self) -> &Self::Output;
    fn output_mut(&mut self) -> &mut Self::Output;

    fn build(&mut self, builder: &mut BuildContext);
    fn execute(&mut self, ctx: &mut PassContext<'_, '_>);
}

pub trait RenderPassDyn {
    fn build(&mut self, builder: &mut BuildContext);
    fn execute(&mut self, ctx: &mut PassContext<'_, '_>);
    fn name(&self) -> &'static str;
}

pub struct PassWrapper<P: RenderPass> {
    pub pass: P,
}

impl<P: RenderPass + 'static> RenderPassDyn for PassWrapper<P> {
    fn build(&mut self, builder: &mut BuildContext) {
        self.pass.build(builder);
    }

    fn execute(&mut self, ctx: &mut PassContext<'_, '_>) {
        self.pass.execute(ctx);
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<P>()
    }
}
