// SPDX-License-Identifier: MIT OR Apache-2.0
//! CPU reference evaluation of node graphs.
//!
//! Computes the value of a node at one sample point, given the values the
//! renderer would supply for context inputs and textures. Used to check the
//! numeric behavior of graphs without a GPU.

use crate::context::{Attribute, Uniform};
use crate::node::{BinaryOp, Node, NodeKind, UnaryOp};
use crate::value::{ParamValue, TextureId, TextureRef};
use std::collections::HashMap;
use std::sync::Arc;

/// Value of a node at one sample point, 1 to 4 components
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Value {
    components: [f32; 4],
    len: usize,
}

impl Value {
    /// Create a value from a slice of 1 to 4 components
    pub fn from_slice(components: &[f32]) -> Self {
        let count = components.len().min(4);
        let mut value = [0.0; 4];
        value[..count].copy_from_slice(&components[..count]);
        Self {
            components: value,
            len: count.max(1),
        }
    }

    /// Single float
    pub fn scalar(value: f32) -> Self {
        Self::from_slice(&[value])
    }

    /// Components
    pub fn as_slice(&self) -> &[f32] {
        &self.components[..self.len]
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false, values have at least one component
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Component by index
    pub fn get(&self, index: usize) -> Option<f32> {
        self.as_slice().get(index).copied()
    }

    /// First component
    pub fn x(&self) -> f32 {
        self.components[0]
    }

    fn map(self, f: impl Fn(f32) -> f32) -> Self {
        let mut out = self;
        for c in &mut out.components[..out.len] {
            *c = f(*c);
        }
        out
    }

    /// Combine component-wise, broadcasting a single-component operand
    fn zip(self, other: Value, f: impl Fn(f32, f32) -> f32) -> Self {
        let len = self.len.max(other.len);
        let pick = |v: &Value, i: usize| if v.len == 1 { v.components[0] } else { v.components[i] };
        let mut components = [0.0; 4];
        for (i, c) in components.iter_mut().enumerate().take(len) {
            *c = f(pick(&self, i), pick(&other, i));
        }
        Self { components, len }
    }

    fn zip3(self, b: Value, c: Value, f: impl Fn(f32, f32, f32) -> f32) -> Self {
        let len = self.len.max(b.len).max(c.len);
        let pick = |v: &Value, i: usize| if v.len == 1 { v.components[0] } else { v.components[i] };
        let mut components = [0.0; 4];
        for (i, out) in components.iter_mut().enumerate().take(len) {
            *out = f(pick(&self, i), pick(&b, i), pick(&c, i));
        }
        Self { components, len }
    }
}

/// Source of texels for a texture
pub trait TextureSampler: Send + Sync {
    /// RGBA at a texture coordinate
    fn sample(&self, uv: [f32; 2]) -> [f32; 4];
}

impl<F> TextureSampler for F
where
    F: Fn([f32; 2]) -> [f32; 4] + Send + Sync,
{
    fn sample(&self, uv: [f32; 2]) -> [f32; 4] {
        self(uv)
    }
}

/// Texture with the same color everywhere
#[derive(Debug, Clone, Copy)]
pub struct SolidTexture(pub [f32; 4]);

impl TextureSampler for SolidTexture {
    fn sample(&self, _uv: [f32; 2]) -> [f32; 4] {
        self.0
    }
}

/// Renderer-supplied values for one sample point
#[derive(Clone)]
pub struct EvaluationInputs {
    /// Elapsed time in seconds
    pub elapsed: f32,
    /// Normalized particle energy
    pub particle_energy: f32,
    /// Vertex color
    pub vertex_color: [f32; 4],
    /// Texture coordinates
    pub uv: [f32; 2],
    /// Screen-space UV
    pub screen_uv: [f32; 2],
    /// Position
    pub position: [f32; 3],
    /// Normal
    pub normal: [f32; 3],
    /// Scene depth minus fragment depth, in world units
    pub depth_gap: f32,
    /// Light intensity applied by lit surface nodes
    pub light: f32,
    /// Texture samplers by texture
    pub textures: HashMap<TextureId, Arc<dyn TextureSampler>>,
    /// Scene color buffer
    pub scene_color: Option<Arc<dyn TextureSampler>>,
}

impl EvaluationInputs {
    /// Inputs at time zero with neutral attribute values
    pub fn new() -> Self {
        Self {
            elapsed: 0.0,
            particle_energy: 1.0,
            vertex_color: [1.0; 4],
            uv: [0.0; 2],
            screen_uv: [0.5; 2],
            position: [0.0; 3],
            normal: [0.0, 0.0, 1.0],
            depth_gap: f32::INFINITY,
            light: 1.0,
            textures: HashMap::new(),
            scene_color: None,
        }
    }

    /// Set elapsed time
    pub fn at_time(mut self, elapsed: f32) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// Register a texture sampler
    pub fn with_texture(mut self, id: TextureId, sampler: impl TextureSampler + 'static) -> Self {
        self.textures.insert(id, Arc::new(sampler));
        self
    }

    /// Set the scene color buffer
    pub fn with_scene_color(mut self, sampler: impl TextureSampler + 'static) -> Self {
        self.scene_color = Some(Arc::new(sampler));
        self
    }
}

impl Default for EvaluationInputs {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluate a node at one sample point
pub fn evaluate(node: &Node, inputs: &EvaluationInputs) -> Result<Value, EvaluationError> {
    Evaluator {
        inputs,
        cache: HashMap::new(),
    }
    .eval(node)
}

struct Evaluator<'a> {
    inputs: &'a EvaluationInputs,
    cache: HashMap<usize, Value>,
}

impl Evaluator<'_> {
    fn eval(&mut self, node: &Node) -> Result<Value, EvaluationError> {
        if let Some(value) = self.cache.get(&node.key()) {
            return Ok(*value);
        }
        let value = self.compute(node)?;
        self.cache.insert(node.key(), value);
        Ok(value)
    }

    fn compute(&mut self, node: &Node) -> Result<Value, EvaluationError> {
        let inputs = self.inputs;
        let value = match node.kind() {
            NodeKind::Scalar(value) => Value::scalar(*value),
            NodeKind::Vector(components) => Value::from_slice(components),
            NodeKind::Color { rgb, alpha } => match alpha {
                Some(a) => Value::from_slice(&[rgb[0], rgb[1], rgb[2], *a]),
                None => Value::from_slice(rgb),
            },
            NodeKind::Parameter { name, value } => match value {
                ParamValue::Scalar(v) => Value::scalar(*v),
                ParamValue::Vector2(v) => Value::from_slice(v),
                ParamValue::Color(c) => Value::from_slice(&c.to_array()),
                ParamValue::Texture(_) | ParamValue::Boolean(_) => {
                    return Err(EvaluationError::NotAValue(name.clone()))
                }
            },
            NodeKind::Texture { parameter, .. } => {
                return Err(EvaluationError::NotAValue(
                    parameter.clone().unwrap_or_else(|| "texture".to_string()),
                ))
            }
            NodeKind::Sample { texture, coord } => {
                let uv = self.eval(coord)?;
                let sampler = self.sampler(texture)?;
                Value::from_slice(&sampler.sample([uv.x(), uv.get(1).unwrap_or(0.0)]))
            }
            NodeKind::SceneColor { coord } => {
                let uv = self.eval(coord)?;
                let sampler = inputs
                    .scene_color
                    .as_ref()
                    .ok_or(EvaluationError::MissingSceneColor)?;
                Value::from_slice(&sampler.sample([uv.x(), uv.get(1).unwrap_or(0.0)]))
            }
            NodeKind::DepthFade { distance } => {
                let distance = self.eval(distance)?.x();
                if distance <= 0.0 {
                    Value::scalar(0.0)
                } else {
                    Value::scalar(1.0 - (inputs.depth_gap / distance).clamp(0.0, 1.0))
                }
            }
            NodeKind::Attribute(attribute) => match attribute {
                Attribute::VertexColor => Value::from_slice(&inputs.vertex_color),
                Attribute::Uv => Value::from_slice(&inputs.uv),
                Attribute::Position => Value::from_slice(&inputs.position),
                Attribute::Normal => Value::from_slice(&inputs.normal),
            },
            NodeKind::Uniform(uniform) => match uniform {
                Uniform::ElapsedTime => Value::scalar(inputs.elapsed),
                Uniform::ParticleEnergy => Value::scalar(inputs.particle_energy),
            },
            NodeKind::ScreenUv => Value::from_slice(&inputs.screen_uv),
            NodeKind::Varying(inner) => self.eval(inner)?,
            NodeKind::Compose(parts) => {
                let mut components = Vec::with_capacity(4);
                for part in parts {
                    components.extend_from_slice(self.eval(part)?.as_slice());
                }
                Value::from_slice(&components)
            }
            NodeKind::Swizzle { source, components } => {
                let source = self.eval(source)?;
                let picked: Vec<f32> = components
                    .iter()
                    .map(|&i| source.get(i as usize).unwrap_or(0.0))
                    .collect();
                Value::from_slice(&picked)
            }
            NodeKind::Unary(op, operand) => {
                let x = self.eval(operand)?;
                match op {
                    UnaryOp::Floor => x.map(f32::floor),
                    UnaryOp::OneMinus => x.map(|v| 1.0 - v),
                    UnaryOp::Pow(exponent) => x.zip(self.eval(exponent)?, f32::powf),
                    UnaryOp::Clamp { min, max } => {
                        let lo = self.eval(min)?;
                        let hi = self.eval(max)?;
                        x.zip3(lo, hi, |v, lo, hi| v.max(lo).min(hi))
                    }
                }
            }
            NodeKind::Binary(op, left, right) => {
                let a = self.eval(left)?;
                let b = self.eval(right)?;
                match op {
                    BinaryOp::Add | BinaryOp::AddScalar => a.zip(b, |x, y| x + y),
                    BinaryOp::Subtract => a.zip(b, |x, y| x - y),
                    BinaryOp::Multiply | BinaryOp::MultiplyScalar => a.zip(b, |x, y| x * y),
                    BinaryOp::Mod => a.zip(b, gpu_mod),
                    BinaryOp::Mix(factor) => {
                        let t = self.eval(factor)?;
                        a.zip3(b, t, |x, y, t| x * (1.0 - t) + y * t)
                    }
                }
            }
            NodeKind::StandardSurface { color, emissive } => {
                let base = self.eval(color)?;
                let glow = match emissive {
                    Some(e) => self.eval(e)?,
                    None => Value::scalar(0.0),
                };
                let lit = Value::from_slice(&base.as_slice()[..3])
                    .zip(glow, |c, e| c * inputs.light + e);
                let alpha = base.get(3).unwrap_or(1.0);
                let rgb = lit.as_slice();
                Value::from_slice(&[rgb[0], rgb[1], rgb[2], alpha])
            }
        };
        Ok(value)
    }

    fn sampler(&self, texture: &Node) -> Result<Arc<dyn TextureSampler>, EvaluationError> {
        let NodeKind::Texture { parameter, texture } = texture.kind() else {
            return Err(EvaluationError::NotATexture);
        };
        let missing = || EvaluationError::MissingTexture(parameter.clone());
        match texture {
            TextureRef::Assigned(id) => self.inputs.textures.get(id).cloned().ok_or_else(missing),
            TextureRef::Placeholder => Err(missing()),
        }
    }
}

/// Remainder with the sign of the divisor, as GPU `mod`
pub fn gpu_mod(x: f32, y: f32) -> f32 {
    x - y * (x / y).floor()
}

/// Error during evaluation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    /// Texture has no sampler in the inputs
    #[error("No sampler for texture {0:?}")]
    MissingTexture(Option<String>),

    /// Scene color buffer was not supplied
    #[error("No scene color buffer supplied")]
    MissingSceneColor,

    /// Node does not produce a numeric value
    #[error("`{0}` is not a value")]
    NotAValue(String),

    /// Sampled node is not a texture
    #[error("Sampled node is not a texture")]
    NotATexture,
}
