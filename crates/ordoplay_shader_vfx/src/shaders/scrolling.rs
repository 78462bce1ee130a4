// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scrolling texture shader.

use ordoplay_shader_graph::nodes::{rgba, vec2};
use ordoplay_shader_graph::{
    AssembleError, Color, OutputDescriptor, ParameterRegistry, Parameters, ShaderContext,
    ShaderDefinition, TextureRef,
};
use std::sync::OnceLock;

/// Texture scrolled along UV over time, tinted and alpha blended
#[derive(Debug, Clone, Copy, Default)]
pub struct ScrollingShader;

impl ScrollingShader {
    /// Shader type name
    pub const NAME: &'static str = "ScrollingShader";
}

impl ShaderDefinition for ScrollingShader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> &'static ParameterRegistry {
        static REGISTRY: OnceLock<ParameterRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            ParameterRegistry::new(Self::NAME)
                .with("texture", || TextureRef::Placeholder.into())
                .with("speed_x", || 1.0_f32.into())
                .with("speed_y", || 0.0_f32.into())
                .with("color", || Color::WHITE.into())
        })
    }

    fn assemble(
        &self,
        params: &Parameters,
        ctx: &ShaderContext,
    ) -> Result<OutputDescriptor, AssembleError> {
        let speed = vec2(params.node("speed_x")?, params.node("speed_y")?)?;
        let coord = ctx
            .attributes
            .uv
            .add(speed.multiply_scalar(&ctx.time.elapsed)?)?;
        let sample = params.node("texture")?.sample(coord)?;
        let color = rgba(sample.rgb()?.multiply(params.node("color")?)?, sample.a()?)?;
        Ok(OutputDescriptor::new(color).with_transparent(true))
    }
}
