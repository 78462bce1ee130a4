// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material building.
//!
//! The [`MaterialBuilder`] turns a shader instance into a [`Material`]:
//! it assembles the output graph (once, unless rebuilt), validates it,
//! hands it to a [`ProgramCompiler`] and finally lets the definition's
//! build hook adjust render state. The hook may only add render state; a
//! hook that alters anything derived from the output graph is rejected.

use crate::context::ShaderContext;
use crate::graph::{InstructionRef, ShaderProgram};
use crate::shader::{AssembleError, OutputDescriptor, ShaderInstance};
use crate::shape::Shape;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a built material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub Uuid);

impl MaterialId {
    /// Create a new random material ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MaterialId {
    fn default() -> Self {
        Self::new()
    }
}

/// Faces rendered by a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Side {
    /// Front faces only
    #[default]
    Front,
    /// Back faces only
    Back,
    /// Both faces
    Double,
}

/// Render state flags, set by build hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderState {
    /// Rendered faces
    pub side: Side,
    /// Draw double-sided transparent surfaces in one pass instead of
    /// back faces first, then front faces
    pub force_single_pass: bool,
}

/// How the alpha channel of the surface color is used
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AlphaMode {
    /// Alpha ignored
    Opaque,
    /// Fragments below the threshold are discarded
    Mask(f32),
    /// Alpha blended
    Blend,
}

/// Compiled material consumed by the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Unique ID
    pub id: MaterialId,
    /// Name of the shader the material was built from
    pub shader: String,
    /// Compiled program
    pub program: ShaderProgram,
    /// Shape of the surface color
    pub color_shape: Shape,
    /// Alpha blending
    pub transparent: bool,
    /// Alpha test threshold
    pub alpha_test: Option<f32>,
    /// Render state flags
    pub render_state: RenderState,
}

impl Material {
    /// Surface color source
    pub fn color(&self) -> InstructionRef {
        self.program.color()
    }

    /// Emissive source
    pub fn emissive(&self) -> Option<InstructionRef> {
        self.program.emissive()
    }

    /// Rendered faces
    pub fn side(&self) -> Side {
        self.render_state.side
    }

    /// Effective use of the alpha channel.
    ///
    /// An RGBA color on a non-transparent material only feeds the alpha test.
    pub fn alpha_mode(&self) -> AlphaMode {
        match (self.transparent, self.alpha_test) {
            (true, _) => AlphaMode::Blend,
            (false, Some(threshold)) => AlphaMode::Mask(threshold),
            (false, None) => AlphaMode::Opaque,
        }
    }

    /// First output-derived field that differs from `other`
    fn output_difference(&self, other: &Material) -> Option<&'static str> {
        if self.id != other.id {
            Some("id")
        } else if self.shader != other.shader {
            Some("shader")
        } else if self.program != other.program {
            Some("program")
        } else if self.color_shape != other.color_shape {
            Some("color")
        } else if self.transparent != other.transparent {
            Some("transparent")
        } else if self.alpha_test != other.alpha_test {
            Some("alpha_test")
        } else {
            None
        }
    }
}

/// Turns an output graph into a program the renderer can run
pub trait ProgramCompiler {
    /// Compile a validated output descriptor
    fn compile(&self, outputs: &OutputDescriptor) -> Result<ShaderProgram, BuildError>;
}

/// Default compiler producing the flattened instruction form
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphCompiler;

impl ProgramCompiler for GraphCompiler {
    fn compile(&self, outputs: &OutputDescriptor) -> Result<ShaderProgram, BuildError> {
        Ok(ShaderProgram::from_outputs(outputs))
    }
}

/// Builds materials from shader instances
#[derive(Debug, Clone)]
pub struct MaterialBuilder<C = GraphCompiler> {
    compiler: C,
    context: ShaderContext,
}

impl MaterialBuilder<GraphCompiler> {
    /// Create a builder with the default compiler and shared context
    pub fn new() -> Self {
        Self::with_compiler(GraphCompiler)
    }
}

impl Default for MaterialBuilder<GraphCompiler> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ProgramCompiler> MaterialBuilder<C> {
    /// Create a builder with a custom compiler
    pub fn with_compiler(compiler: C) -> Self {
        Self {
            compiler,
            context: ShaderContext::shared().clone(),
        }
    }

    /// Context nodes handed to `assemble`
    pub fn context(&self) -> &ShaderContext {
        &self.context
    }

    /// Build a material, assembling the instance's graph on first use
    pub fn build(&self, instance: &mut ShaderInstance) -> Result<Material, BuildError> {
        let outputs = instance.outputs_or_assemble(&self.context)?;
        self.finish(instance, &outputs)
    }

    /// Re-assemble with the current parameter values, then build
    pub fn rebuild(&self, instance: &mut ShaderInstance) -> Result<Material, BuildError> {
        tracing::debug!("Rebuilding {}", instance.name());
        let outputs = instance.assemble(&self.context)?;
        self.finish(instance, &outputs)
    }

    /// Default build of an output descriptor, without any build hook
    pub fn build_outputs(
        &self,
        shader: &str,
        outputs: &OutputDescriptor,
    ) -> Result<Material, BuildError> {
        let color_shape = outputs.color.shape();
        if !matches!(color_shape, Shape::Vec3 | Shape::Vec4) {
            return Err(BuildError::InvalidColorShape(color_shape));
        }
        if let Some(emissive) = &outputs.emissive {
            if emissive.shape() != Shape::Vec3 {
                return Err(BuildError::InvalidEmissiveShape(emissive.shape()));
            }
        }
        if let Some((parameter, _)) = outputs
            .textures()
            .into_iter()
            .find(|(_, texture)| !texture.is_assigned())
        {
            return Err(BuildError::UnresolvedTexture {
                shader: shader.to_string(),
                parameter,
            });
        }

        let program = self.compiler.compile(outputs)?;
        Ok(Material {
            id: MaterialId::new(),
            shader: shader.to_string(),
            program,
            color_shape,
            transparent: outputs.transparent,
            alpha_test: outputs.alpha_test,
            render_state: RenderState::default(),
        })
    }

    fn finish(
        &self,
        instance: &ShaderInstance,
        outputs: &OutputDescriptor,
    ) -> Result<Material, BuildError> {
        let base = self.build_outputs(instance.name(), outputs)?;
        let material = instance.definition().build_hook(base.clone());

        if let Some(field) = material.output_difference(&base) {
            return Err(BuildError::HookContractViolation {
                shader: instance.name().to_string(),
                field,
            });
        }

        tracing::info!(
            "Built material {} ({} instructions, side {:?})",
            material.shader,
            material.program.len(),
            material.render_state.side
        );
        Ok(material)
    }
}

/// Error while building a material
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    /// Assembling the output graph failed
    #[error(transparent)]
    Assemble(#[from] AssembleError),

    /// Surface color is not a 3- or 4-component node
    #[error("Surface color must be vec3 or vec4, got {0}")]
    InvalidColorShape(Shape),

    /// Emissive is not a 3-component node
    #[error("Emissive color must be vec3, got {0}")]
    InvalidEmissiveShape(Shape),

    /// A texture in the graph was never assigned
    #[error("{shader}: texture {} is not assigned", parameter.as_deref().unwrap_or("<unnamed>"))]
    UnresolvedTexture {
        /// Shader name
        shader: String,
        /// Parameter holding the placeholder
        parameter: Option<String>,
    },

    /// The build hook changed output-derived material data
    #[error("{shader}: build hook modified `{field}`")]
    HookContractViolation {
        /// Shader name
        shader: String,
        /// Modified field
        field: &'static str,
    },

    /// The program compiler failed
    #[error("Compilation failed: {0}")]
    Compile(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{GraphError, Node};
    use crate::parameter::{ParameterRegistry, Parameters};
    use crate::shader::ShaderDefinition;
    use crate::value::{Color, TextureId, TextureRef};
    use std::cell::Cell;
    use std::sync::OnceLock;

    fn registry() -> &'static ParameterRegistry {
        static REGISTRY: OnceLock<ParameterRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            ParameterRegistry::new("DecalShader")
                .with("texture", || TextureRef::Placeholder.into())
                .with("tint", || Color::WHITE.into())
                .with("cutoff", || 0.0_f32.into())
        })
    }

    #[derive(Clone, Copy)]
    enum Hook {
        None,
        DoubleSided,
        Tamper,
    }

    struct DecalShader {
        hook: Hook,
    }

    impl ShaderDefinition for DecalShader {
        fn name(&self) -> &'static str {
            "DecalShader"
        }

        fn parameters(&self) -> &'static ParameterRegistry {
            registry()
        }

        fn assemble(
            &self,
            params: &Parameters,
            ctx: &ShaderContext,
        ) -> Result<OutputDescriptor, AssembleError> {
            let sample = params.node("texture")?.sample(&ctx.attributes.uv)?;
            let color = sample.rgb()?.multiply(params.node("tint")?)?;
            let mut outputs = OutputDescriptor::new(color.with_alpha(sample.a()?)?);
            let cutoff = params.scalar("cutoff")?;
            if cutoff > 0.0 {
                outputs = outputs.with_alpha_test(cutoff);
            }
            Ok(outputs)
        }

        fn build_hook(&self, mut material: Material) -> Material {
            match self.hook {
                Hook::None => {}
                Hook::DoubleSided => {
                    material.render_state.side = Side::Double;
                    material.render_state.force_single_pass = false;
                }
                Hook::Tamper => material.transparent = !material.transparent,
            }
            material
        }
    }

    fn instance(hook: Hook) -> ShaderInstance {
        instance_with_texture(hook, TextureId::new())
    }

    fn instance_with_texture(hook: Hook, texture: TextureId) -> ShaderInstance {
        let mut instance = ShaderInstance::new(DecalShader { hook });
        instance.set_parameter("texture", texture).unwrap();
        instance
    }

    #[test]
    fn test_build_exposes_outputs() {
        let builder = MaterialBuilder::new();
        let material = builder.build(&mut instance(Hook::None)).unwrap();

        assert_eq!(material.shader, "DecalShader");
        assert_eq!(material.color_shape, Shape::Vec4);
        assert!(!material.transparent);
        assert_eq!(material.alpha_mode(), AlphaMode::Opaque);
        assert_eq!(material.emissive(), None);
        assert_eq!(material.render_state, RenderState::default());
        assert_eq!(material.program.shape(material.color()), Some(Shape::Vec4));
    }

    #[test]
    fn test_unresolved_texture_fails_until_assigned() {
        let builder = MaterialBuilder::new();
        let mut instance = ShaderInstance::new(DecalShader { hook: Hook::None });

        let err = builder.build(&mut instance).unwrap_err();
        assert_eq!(
            err,
            BuildError::UnresolvedTexture {
                shader: "DecalShader".to_string(),
                parameter: Some("texture".to_string()),
            }
        );

        instance.set_parameter("texture", TextureId::new()).unwrap();
        // The cached graph still holds the placeholder until rebuilt
        assert!(builder.build(&mut instance).is_err());
        assert!(builder.rebuild(&mut instance).is_ok());
        assert!(builder.build(&mut instance).is_ok());
    }

    #[test]
    fn test_hook_is_additive() {
        let builder = MaterialBuilder::new();
        let texture = TextureId::new();
        let plain = builder.build(&mut instance_with_texture(Hook::None, texture)).unwrap();
        let hooked = builder
            .build(&mut instance_with_texture(Hook::DoubleSided, texture))
            .unwrap();

        assert_eq!(hooked.side(), Side::Double);
        assert!(!hooked.render_state.force_single_pass);
        assert_eq!(hooked.program, plain.program);
        assert_eq!(hooked.transparent, plain.transparent);
        assert_eq!(hooked.alpha_test, plain.alpha_test);
        assert_eq!(hooked.color_shape, plain.color_shape);
    }

    #[test]
    fn test_hook_contract_violation() {
        let builder = MaterialBuilder::new();
        let err = builder.build(&mut instance(Hook::Tamper)).unwrap_err();
        assert_eq!(
            err,
            BuildError::HookContractViolation {
                shader: "DecalShader".to_string(),
                field: "transparent",
            }
        );
    }

    #[test]
    fn test_parameter_write_applies_on_rebuild() {
        let builder = MaterialBuilder::new();
        let mut instance = instance(Hook::None);
        let first = builder.build(&mut instance).unwrap();

        instance.set_parameter("cutoff", 0.5_f32).unwrap();
        let cached = builder.build(&mut instance).unwrap();
        assert_eq!(cached.alpha_mode(), AlphaMode::Opaque);
        assert_eq!(first.alpha_test, None);

        let rebuilt = builder.rebuild(&mut instance).unwrap();
        assert_eq!(rebuilt.alpha_mode(), AlphaMode::Mask(0.5));
    }

    struct MismatchedShader;

    impl ShaderDefinition for MismatchedShader {
        fn name(&self) -> &'static str {
            "MismatchedShader"
        }

        fn parameters(&self) -> &'static ParameterRegistry {
            static REGISTRY: OnceLock<ParameterRegistry> = OnceLock::new();
            REGISTRY.get_or_init(|| ParameterRegistry::new("MismatchedShader"))
        }

        fn assemble(
            &self,
            _params: &Parameters,
            _ctx: &ShaderContext,
        ) -> Result<OutputDescriptor, AssembleError> {
            let color = Node::from([1.0, 0.5]).add(Node::from([0.0, 0.0, 1.0]))?;
            Ok(OutputDescriptor::new(color))
        }
    }

    #[test]
    fn test_assemble_shape_mismatch_is_surfaced() {
        let builder = MaterialBuilder::new();
        let mut instance = ShaderInstance::new(MismatchedShader);

        let err = builder.build(&mut instance).unwrap_err();
        assert_eq!(
            err,
            BuildError::Assemble(AssembleError::Graph(GraphError::ShapeMismatch {
                operator: "add",
                left: Shape::Vec2,
                right: Shape::Vec3,
            }))
        );
        assert!(instance.outputs().is_none());
        assert!(builder.rebuild(&mut instance).is_err());
        assert!(instance.outputs().is_none());
    }

    #[test]
    fn test_color_shape_is_validated() {
        let builder = MaterialBuilder::new();
        let outputs = OutputDescriptor::new(Node::scalar(1.0));
        assert_eq!(
            builder.build_outputs("Test", &outputs).unwrap_err(),
            BuildError::InvalidColorShape(Shape::Scalar)
        );

        let outputs = OutputDescriptor::new(Node::from([1.0, 1.0, 1.0]))
            .with_emissive(Node::from([1.0, 1.0]));
        assert_eq!(
            builder.build_outputs("Test", &outputs).unwrap_err(),
            BuildError::InvalidEmissiveShape(Shape::Vec2)
        );
    }

    #[test]
    fn test_transparent_blend_mode() {
        let builder = MaterialBuilder::new();
        let outputs = OutputDescriptor::new(Node::from([1.0, 1.0, 1.0, 0.5]))
            .with_transparent(true)
            .with_alpha_test(0.1);
        let material = builder.build_outputs("Test", &outputs).unwrap();
        assert_eq!(material.alpha_mode(), AlphaMode::Blend);
        assert_eq!(material.alpha_test, Some(0.1));
    }

    struct CountingCompiler {
        calls: Cell<usize>,
    }

    impl ProgramCompiler for CountingCompiler {
        fn compile(&self, outputs: &OutputDescriptor) -> Result<ShaderProgram, BuildError> {
            self.calls.set(self.calls.get() + 1);
            GraphCompiler.compile(outputs)
        }
    }

    #[test]
    fn test_custom_compiler_and_lazy_assemble() {
        let builder = MaterialBuilder::with_compiler(CountingCompiler { calls: Cell::new(0) });
        let mut instance = instance(Hook::None);

        let a = builder.build(&mut instance).unwrap();
        let b = builder.build(&mut instance).unwrap();
        assert_eq!(builder.compiler.calls.get(), 2);
        assert_eq!(a.program, b.program);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_material_serialization() {
        let builder = MaterialBuilder::new();
        let material = builder.build(&mut instance(Hook::DoubleSided)).unwrap();
        let ron_str = ron::to_string(&material).unwrap();
        let loaded: Material = ron::from_str(&ron_str).unwrap();
        assert_eq!(loaded, material);
    }
}
