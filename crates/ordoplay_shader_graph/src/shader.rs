// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader definitions, their output descriptor and live instances.

use crate::context::ShaderContext;
use crate::material::Material;
use crate::node::{GraphError, Node, NodeKind};
use crate::parameter::{ParameterError, ParameterRegistry, Parameters};
use crate::value::{ParamValue, TextureRef};
use std::fmt;

/// Named outputs produced by a shader definition
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDescriptor {
    /// Surface color, a 3- or 4-component node
    pub color: Node,
    /// Whether the surface is alpha blended
    pub transparent: bool,
    /// Alpha threshold below which fragments are discarded
    pub alpha_test: Option<f32>,
    /// Emissive color
    pub emissive: Option<Node>,
}

impl OutputDescriptor {
    /// Create an opaque descriptor from a color node
    pub fn new(color: impl Into<Node>) -> Self {
        Self {
            color: color.into(),
            transparent: false,
            alpha_test: None,
            emissive: None,
        }
    }

    /// Set transparency
    pub fn with_transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    /// Set the alpha test threshold
    pub fn with_alpha_test(mut self, threshold: f32) -> Self {
        self.alpha_test = Some(threshold);
        self
    }

    /// Set the emissive color
    pub fn with_emissive(mut self, emissive: impl Into<Node>) -> Self {
        self.emissive = Some(emissive.into());
        self
    }

    /// Root nodes of the graph: color, then emissive
    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        std::iter::once(&self.color).chain(self.emissive.as_ref())
    }

    /// Distinct texture references of the graph with their parameter names
    pub fn textures(&self) -> Vec<(Option<String>, TextureRef)> {
        let mut textures = Vec::new();
        for root in self.roots() {
            root.visit(|node| {
                if let NodeKind::Texture { parameter, texture } = node.kind() {
                    let entry = (parameter.clone(), *texture);
                    if !textures.contains(&entry) {
                        textures.push(entry);
                    }
                }
            });
        }
        textures
    }
}

/// Authoring unit turning parameters into an output graph
///
/// `assemble` must be a pure function of the parameter values and the
/// context nodes: the same values always yield a structurally equal graph.
pub trait ShaderDefinition {
    /// Shader type name
    fn name(&self) -> &'static str;

    /// Parameter declaration table, shared by all instances
    fn parameters(&self) -> &'static ParameterRegistry;

    /// Build the output graph
    fn assemble(
        &self,
        params: &Parameters,
        ctx: &ShaderContext,
    ) -> Result<OutputDescriptor, AssembleError>;

    /// Post-process the default material. Must only touch render state.
    fn build_hook(&self, material: Material) -> Material {
        material
    }
}

/// A shader definition together with its own parameter values
pub struct ShaderInstance {
    definition: Box<dyn ShaderDefinition>,
    parameters: Parameters,
    outputs: Option<OutputDescriptor>,
    assembled_revision: u64,
}

impl ShaderInstance {
    /// Create an instance with default parameter values
    pub fn new<D: ShaderDefinition + 'static>(definition: D) -> Self {
        Self::from_boxed(Box::new(definition))
    }

    /// Create an instance from a boxed definition
    pub fn from_boxed(definition: Box<dyn ShaderDefinition>) -> Self {
        let parameters = definition.parameters().instantiate();
        Self {
            definition,
            parameters,
            outputs: None,
            assembled_revision: 0,
        }
    }

    /// Shader type name
    pub fn name(&self) -> &'static str {
        self.definition.name()
    }

    /// The definition
    pub fn definition(&self) -> &dyn ShaderDefinition {
        self.definition.as_ref()
    }

    /// Current parameter values
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Read a parameter
    pub fn parameter(&self, name: &str) -> Result<&ParamValue, ParameterError> {
        self.parameters.get(name)
    }

    /// Override a parameter. Takes effect on the next assemble.
    pub fn set_parameter(
        &mut self,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> Result<(), ParameterError> {
        self.parameters.set(name, value)
    }

    /// Most recently assembled outputs
    pub fn outputs(&self) -> Option<&OutputDescriptor> {
        self.outputs.as_ref()
    }

    /// Whether parameters changed since the last assemble
    pub fn is_stale(&self) -> bool {
        self.outputs.is_none() || self.parameters.revision() != self.assembled_revision
    }

    /// Drop the cached outputs so the next build assembles again
    pub fn invalidate(&mut self) {
        self.outputs = None;
    }

    /// Run `assemble` with the current parameters and cache the result
    pub fn assemble(&mut self, ctx: &ShaderContext) -> Result<OutputDescriptor, AssembleError> {
        tracing::debug!("Assembling {}", self.name());
        let outputs = self.definition.assemble(&self.parameters, ctx)?;
        self.outputs = Some(outputs.clone());
        self.assembled_revision = self.parameters.revision();
        Ok(outputs)
    }

    /// Cached outputs, assembling on first use
    pub fn outputs_or_assemble(
        &mut self,
        ctx: &ShaderContext,
    ) -> Result<OutputDescriptor, AssembleError> {
        if let Some(outputs) = &self.outputs {
            return Ok(outputs.clone());
        }
        self.assemble(ctx)
    }
}

impl fmt::Debug for ShaderInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderInstance")
            .field("name", &self.name())
            .field("parameters", &self.parameters)
            .field("assembled", &self.outputs.is_some())
            .finish()
    }
}

/// Error raised by `assemble`
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssembleError {
    /// Node construction failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Parameter lookup failed
    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Color;
    use std::sync::OnceLock;

    struct TintShader;

    impl ShaderDefinition for TintShader {
        fn name(&self) -> &'static str {
            "TintShader"
        }

        fn parameters(&self) -> &'static ParameterRegistry {
            static REGISTRY: OnceLock<ParameterRegistry> = OnceLock::new();
            REGISTRY.get_or_init(|| {
                ParameterRegistry::new("TintShader")
                    .with("tint", || Color::WHITE.into())
                    .with("strength", || 1.0_f32.into())
            })
        }

        fn assemble(
            &self,
            params: &Parameters,
            ctx: &ShaderContext,
        ) -> Result<OutputDescriptor, AssembleError> {
            let mask = ctx.attributes.color.r()?.varying()?;
            let strength = params.node("strength")?;
            let color = params
                .node("tint")?
                .multiply_scalar(mask.multiply(strength)?)?;
            Ok(OutputDescriptor::new(color))
        }
    }

    #[test]
    fn test_lazy_assemble_is_cached() {
        let ctx = ShaderContext::new();
        let mut instance = ShaderInstance::new(TintShader);
        assert!(instance.outputs().is_none());
        assert!(instance.is_stale());

        let first = instance.outputs_or_assemble(&ctx).unwrap();
        let second = instance.outputs_or_assemble(&ctx).unwrap();
        assert!(first.color.ptr_eq(&second.color));
        assert!(!instance.is_stale());
    }

    #[test]
    fn test_parameter_write_does_not_touch_cached_outputs() {
        let ctx = ShaderContext::new();
        let mut instance = ShaderInstance::new(TintShader);
        let before = instance.assemble(&ctx).unwrap();

        instance.set_parameter("strength", 0.5_f32).unwrap();
        assert!(instance.is_stale());
        assert_eq!(instance.outputs(), Some(&before));

        let after = instance.assemble(&ctx).unwrap();
        assert_ne!(after, before);
        assert!(!instance.is_stale());
    }

    #[test]
    fn test_assemble_is_deterministic() {
        let ctx = ShaderContext::new();
        let mut a = ShaderInstance::new(TintShader);
        let mut b = ShaderInstance::new(TintShader);
        assert_eq!(a.assemble(&ctx).unwrap(), b.assemble(&ctx).unwrap());
        assert_eq!(a.assemble(&ctx).unwrap(), a.assemble(&ctx).unwrap());
    }

    #[test]
    fn test_unknown_parameter_on_instance() {
        let mut instance = ShaderInstance::new(TintShader);
        assert!(matches!(
            instance.set_parameter("glow", 1.0_f32),
            Err(ParameterError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn test_descriptor_textures() {
        let texture = Node::texture(TextureRef::Placeholder);
        let uv = ShaderContext::new().attributes.uv;
        let sample = texture.sample(&uv).unwrap();
        let descriptor = OutputDescriptor::new(sample.rgb().unwrap().add(sample.rgb().unwrap()).unwrap())
            .with_transparent(true)
            .with_alpha_test(0.1);

        assert_eq!(descriptor.textures(), vec![(None, TextureRef::Placeholder)]);
        assert!(descriptor.transparent);
        assert_eq!(descriptor.alpha_test, Some(0.1));
    }
}
