// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sword slash trail shader.
//!
//! A slash texture panned along U, displaced by a scrolling noise texture,
//! dissolved by a voronoi erosion mask and faded where it meets scene
//! geometry. The slash refracts the scene color behind it, scaled by the
//! red channel of the vertex color.

use ordoplay_shader_graph::compose::{
    binary_cutout, erosion, looping_phase, panner, particle_phase, symmetric_offset,
};
use ordoplay_shader_graph::nodes::{standard_surface, vec2};
use ordoplay_shader_graph::{
    AssembleError, Color, Material, OutputDescriptor, ParameterRegistry, Parameters,
    ShaderContext, ShaderDefinition, Side, TextureRef,
};
use std::sync::OnceLock;

/// Half range of the slash sweep in UV units
const SWEEP_EXTENT: f32 = 0.95;

/// Animated slash trail with erosion, depth fade and refraction
#[derive(Debug, Clone, Copy, Default)]
pub struct SlashShader;

impl SlashShader {
    /// Shader type name
    pub const NAME: &'static str = "SlashShader";
}

impl ShaderDefinition for SlashShader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> &'static ParameterRegistry {
        static REGISTRY: OnceLock<ParameterRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            ParameterRegistry::new(Self::NAME)
                .with("is_particle", || false.into())
                .with("color1", || Color::from_hex(0xFF0000).into())
                .with("color2", || Color::from_hex(0x0C00FF).into())
                .with("depth_fade", || 3.0_f32.into())
                .with("emissive_contrast", || 2.0_f32.into())
                .with("emissive_power", || 1.0_f32.into())
                .with("erosion_amount", || (-1.0_f32).into())
                .with("erosion_speed_u", || 1.0_f32.into())
                .with("erosion_speed_v", || 1.0_f32.into())
                .with("erosion_tile_u", || 1.0_f32.into())
                .with("erosion_tile_v", || 1.0_f32.into())
                .with("masked", || false.into())
                .with("noise", || TextureRef::Placeholder.into())
                .with("noise_power", || 0.3_f32.into())
                .with("noise_range_contrast", || 0.0_f32.into())
                .with("noise_speed_u", || 1.0_f32.into())
                .with("noise_speed_v", || 0.0_f32.into())
                .with("noise_tile_u", || 1.0_f32.into())
                .with("noise_tile_v", || 1.0_f32.into())
                .with("opacity_contrast_control", || 1.0_f32.into())
                .with("slash_texture", || TextureRef::Placeholder.into())
                .with("speed_u", || 0.0_f32.into())
                .with("voronoi", || TextureRef::Placeholder.into())
                .with("refraction_strength", || 0.15_f32.into())
        })
    }

    fn assemble(
        &self,
        params: &Parameters,
        ctx: &ShaderContext,
    ) -> Result<OutputDescriptor, AssembleError> {
        let uv = &ctx.attributes.uv;

        // Noise
        let noise_coord = panner(vec2(params.node("noise_speed_u")?, params.node("noise_speed_v")?)?)
            .tile(vec2(params.node("noise_tile_u")?, params.node("noise_tile_v")?)?)
            .build(ctx)?;
        let noise = params
            .node("noise")?
            .sample(noise_coord)?
            .r()?
            .multiply(params.node("noise_power")?)?;
        let noise_mask = uv
            .x()?
            .one_minus()?
            .clamp(0.0, 1.0)?
            .pow(params.node("noise_range_contrast")?)?;

        // Sweep, once per particle lifetime or looping every second
        let phase = if params.boolean("is_particle")? {
            particle_phase(ctx)?
        } else {
            looping_phase(ctx, 1.0)?
        };
        let sweep = symmetric_offset(phase, SWEEP_EXTENT)?;

        let slash_coord = panner(vec2(params.node("speed_u")?, 0.0)?)
            .time(sweep)
            .build(ctx)?
            .add_scalar(noise.multiply(&noise_mask)?)?;
        let slash = params.node("slash_texture")?.sample(slash_coord)?.r()?;

        // Color
        let color1 = params.node("color1")?;
        let color2 = params.node("color2")?;
        let emissive_mask = slash.pow(params.node("emissive_contrast")?)?;
        let emissive = color2
            .multiply_scalar(&emissive_mask)?
            .multiply_scalar(params.node("emissive_power")?)?;
        let surface = standard_surface(color1.mix(&color2, &emissive_mask)?, Some(emissive))?.rgb()?;

        // Erosion
        let erosion_coord =
            panner(vec2(params.node("erosion_speed_u")?, params.node("erosion_speed_v")?)?)
                .tile(vec2(params.node("erosion_tile_u")?, params.node("erosion_tile_v")?)?)
                .build(ctx)?;
        let voronoi = params.node("voronoi")?.sample(erosion_coord)?.r()?;
        let eroded = erosion(voronoi, params.node("erosion_amount")?)?;
        let opacity = slash
            .subtract(eroded)?
            .clamp(0.0, 1.0)?
            .pow(params.node("opacity_contrast_control")?)?;
        let opacity = if params.boolean("masked")? {
            binary_cutout(opacity)?
        } else {
            opacity
        };

        // Vertex color and depth fade
        let vertex_mask = ctx.attributes.color.r()?.varying()?;
        let edge = ctx.edge_depth(params.node("depth_fade")?)?;
        let opacity = opacity.multiply(&vertex_mask)?.multiply(edge.one_minus()?)?;

        // Refraction
        let refraction = noise
            .multiply(params.node("refraction_strength")?)?
            .multiply(&vertex_mask)?;
        let scene = ctx.scene_color(ctx.screen_uv.add_scalar(refraction)?)?.rgb()?;

        Ok(OutputDescriptor::new(scene.mix(surface, opacity)?))
    }

    fn build_hook(&self, mut material: Material) -> Material {
        material.render_state.side = Side::Double;
        // Two passes for back and front faces avoid self-overlap artifacts
        material.render_state.force_single_pass = false;
        material
    }
}
