// SPDX-License-Identifier: MIT OR Apache-2.0
//! Vertex color preview shader.

use ordoplay_shader_graph::nodes::vec3;
use ordoplay_shader_graph::{
    AssembleError, Color, OutputDescriptor, ParameterRegistry, Parameters, ShaderContext,
    ShaderDefinition,
};
use std::sync::OnceLock;

/// Shows the red channel of the vertex color as a grey level
#[derive(Debug, Clone, Copy, Default)]
pub struct ExampleShader;

impl ExampleShader {
    /// Shader type name
    pub const NAME: &'static str = "ExampleShader";
}

impl ShaderDefinition for ExampleShader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> &'static ParameterRegistry {
        static REGISTRY: OnceLock<ParameterRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| ParameterRegistry::new(Self::NAME).with("color", || Color::BLACK.into()))
    }

    fn assemble(
        &self,
        _params: &Parameters,
        ctx: &ShaderContext,
    ) -> Result<OutputDescriptor, AssembleError> {
        let mask = ctx.attributes.color.r()?.varying()?;
        Ok(OutputDescriptor::new(vec3(&mask, &mask, &mask)?))
    }
}
