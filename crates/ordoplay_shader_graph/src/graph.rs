// SPDX-License-Identifier: MIT OR Apache-2.0
//! Flattened program form of a node graph.
//!
//! [`ShaderProgram`] is what the material builder hands to the renderer: the
//! expression DAG lowered to a list of instructions in topological order,
//! with structurally identical sub-expressions merged through a hashed
//! instruction table, plus the parameters, textures and context inputs the
//! program reads.

use crate::context::ContextInput;
use crate::node::{BinaryOp, Node, NodeKind, UnaryOp};
use crate::shader::OutputDescriptor;
use crate::shape::Shape;
use crate::value::{ParamValue, TextureRef};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Index of an instruction in a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstructionRef(pub u32);

impl InstructionRef {
    /// Position in the instruction list
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Operation of a single instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Op {
    Scalar(f32),
    Vector(Vec<f32>),
    Color { rgb: [f32; 3], alpha: Option<f32> },
    /// Material uniform, default value listed in [`ShaderProgram::parameters`]
    Parameter(String),
    Texture { parameter: Option<String>, texture: TextureRef },
    Sample { texture: InstructionRef, coord: InstructionRef },
    SceneColor { coord: InstructionRef },
    DepthFade { distance: InstructionRef },
    Input(ContextInput),
    Varying(InstructionRef),
    Compose(Vec<InstructionRef>),
    Swizzle { source: InstructionRef, components: Vec<u8> },
    Floor(InstructionRef),
    OneMinus(InstructionRef),
    Pow { base: InstructionRef, exponent: InstructionRef },
    Clamp { value: InstructionRef, min: InstructionRef, max: InstructionRef },
    Add(InstructionRef, InstructionRef),
    Subtract(InstructionRef, InstructionRef),
    Multiply(InstructionRef, InstructionRef),
    MultiplyScalar(InstructionRef, InstructionRef),
    AddScalar(InstructionRef, InstructionRef),
    Mod(InstructionRef, InstructionRef),
    Mix { a: InstructionRef, b: InstructionRef, factor: InstructionRef },
    StandardSurface { color: InstructionRef, emissive: Option<InstructionRef> },
}

impl Op {
    /// Instructions this operation reads
    pub fn operands(&self) -> Vec<InstructionRef> {
        match self {
            Self::Scalar(_)
            | Self::Vector(_)
            | Self::Color { .. }
            | Self::Parameter(_)
            | Self::Texture { .. }
            | Self::Input(_) => Vec::new(),
            Self::Sample { texture, coord } => vec![*texture, *coord],
            Self::SceneColor { coord } => vec![*coord],
            Self::DepthFade { distance } => vec![*distance],
            Self::Varying(r) | Self::Floor(r) | Self::OneMinus(r) => vec![*r],
            Self::Swizzle { source, .. } => vec![*source],
            Self::Compose(parts) => parts.clone(),
            Self::Pow { base, exponent } => vec![*base, *exponent],
            Self::Clamp { value, min, max } => vec![*value, *min, *max],
            Self::Add(a, b)
            | Self::Subtract(a, b)
            | Self::Multiply(a, b)
            | Self::MultiplyScalar(a, b)
            | Self::AddScalar(a, b)
            | Self::Mod(a, b) => vec![*a, *b],
            Self::Mix { a, b, factor } => vec![*a, *b, *factor],
            Self::StandardSurface { color, emissive } => {
                std::iter::once(*color).chain(*emissive).collect()
            }
        }
    }
}

/// One step of a program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// Result shape
    pub shape: Shape,
    /// Operation
    pub op: Op,
}

/// Texture read by a program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureBinding {
    /// Parameter the texture is bound to
    pub parameter: Option<String>,
    /// Texture reference
    pub texture: TextureRef,
}

/// Node graph lowered to an ordered instruction list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderProgram {
    instructions: Vec<Instruction>,
    color: InstructionRef,
    emissive: Option<InstructionRef>,
    parameters: IndexMap<String, ParamValue>,
    textures: Vec<TextureBinding>,
    inputs: Vec<ContextInput>,
}

impl ShaderProgram {
    /// Lower the graph of an output descriptor
    pub fn from_outputs(outputs: &OutputDescriptor) -> Self {
        let mut lowering = Lowering::default();
        let color = lowering.lower(&outputs.color);
        let emissive = outputs.emissive.as_ref().map(|node| lowering.lower(node));
        Self {
            instructions: lowering.instructions,
            color,
            emissive,
            parameters: lowering.parameters,
            textures: lowering.textures,
            inputs: lowering.inputs,
        }
    }

    /// Instructions in evaluation order
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Get an instruction
    pub fn instruction(&self, r: InstructionRef) -> Option<&Instruction> {
        self.instructions.get(r.index())
    }

    /// Number of instructions
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if the program has no instructions
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Surface color result
    pub fn color(&self) -> InstructionRef {
        self.color
    }

    /// Emissive result
    pub fn emissive(&self) -> Option<InstructionRef> {
        self.emissive
    }

    /// Shape of an instruction result
    pub fn shape(&self, r: InstructionRef) -> Option<Shape> {
        self.instruction(r).map(|i| i.shape)
    }

    /// Parameters read as material uniforms, with their values at build time
    pub fn parameters(&self) -> &IndexMap<String, ParamValue> {
        &self.parameters
    }

    /// Textures read by the program
    pub fn textures(&self) -> &[TextureBinding] {
        &self.textures
    }

    /// Renderer inputs read by the program
    pub fn inputs(&self) -> &[ContextInput] {
        &self.inputs
    }
}

#[derive(Default)]
struct Lowering {
    instructions: Vec<Instruction>,
    lowered: HashMap<usize, InstructionRef>,
    buckets: HashMap<u64, Vec<InstructionRef>>,
    parameters: IndexMap<String, ParamValue>,
    textures: Vec<TextureBinding>,
    inputs: Vec<ContextInput>,
}

impl Lowering {
    fn lower(&mut self, node: &Node) -> InstructionRef {
        if let Some(r) = self.lowered.get(&node.key()) {
            return *r;
        }

        let op = match node.kind() {
            NodeKind::Scalar(value) => Op::Scalar(*value),
            NodeKind::Vector(components) => Op::Vector(components.clone()),
            NodeKind::Color { rgb, alpha } => Op::Color {
                rgb: *rgb,
                alpha: *alpha,
            },
            NodeKind::Parameter { name, value } => {
                self.parameters.insert(name.clone(), *value);
                Op::Parameter(name.clone())
            }
            NodeKind::Texture { parameter, texture } => {
                let binding = TextureBinding {
                    parameter: parameter.clone(),
                    texture: *texture,
                };
                if !self.textures.contains(&binding) {
                    self.textures.push(binding);
                }
                Op::Texture {
                    parameter: parameter.clone(),
                    texture: *texture,
                }
            }
            NodeKind::Sample { texture, coord } => Op::Sample {
                texture: self.lower(texture),
                coord: self.lower(coord),
            },
            NodeKind::SceneColor { coord } => {
                self.input(ContextInput::SceneColor);
                Op::SceneColor {
                    coord: self.lower(coord),
                }
            }
            NodeKind::DepthFade { distance } => {
                self.input(ContextInput::SceneDepth);
                Op::DepthFade {
                    distance: self.lower(distance),
                }
            }
            NodeKind::Attribute(attribute) => self.input(ContextInput::Attribute(*attribute)),
            NodeKind::Uniform(uniform) => self.input(ContextInput::Uniform(*uniform)),
            NodeKind::ScreenUv => self.input(ContextInput::ScreenUv),
            NodeKind::Varying(inner) => Op::Varying(self.lower(inner)),
            NodeKind::Compose(parts) => Op::Compose(parts.iter().map(|p| self.lower(p)).collect()),
            NodeKind::Swizzle { source, components } => Op::Swizzle {
                source: self.lower(source),
                components: components.clone(),
            },
            NodeKind::Unary(op, operand) => {
                let operand = self.lower(operand);
                match op {
                    UnaryOp::Floor => Op::Floor(operand),
                    UnaryOp::OneMinus => Op::OneMinus(operand),
                    UnaryOp::Pow(exponent) => Op::Pow {
                        base: operand,
                        exponent: self.lower(exponent),
                    },
                    UnaryOp::Clamp { min, max } => Op::Clamp {
                        value: operand,
                        min: self.lower(min),
                        max: self.lower(max),
                    },
                }
            }
            NodeKind::Binary(op, left, right) => {
                let a = self.lower(left);
                let b = self.lower(right);
                match op {
                    BinaryOp::Add => Op::Add(a, b),
                    BinaryOp::Subtract => Op::Subtract(a, b),
                    BinaryOp::Multiply => Op::Multiply(a, b),
                    BinaryOp::MultiplyScalar => Op::MultiplyScalar(a, b),
                    BinaryOp::AddScalar => Op::AddScalar(a, b),
                    BinaryOp::Mod => Op::Mod(a, b),
                    BinaryOp::Mix(factor) => Op::Mix {
                        a,
                        b,
                        factor: self.lower(factor),
                    },
                }
            }
            NodeKind::StandardSurface { color, emissive } => Op::StandardSurface {
                color: self.lower(color),
                emissive: emissive.as_ref().map(|e| self.lower(e)),
            },
        };

        let r = self.push(Instruction {
            shape: node.shape(),
            op,
        });
        self.lowered.insert(node.key(), r);
        r
    }

    fn input(&mut self, input: ContextInput) -> Op {
        if !self.inputs.contains(&input) {
            self.inputs.push(input);
        }
        Op::Input(input)
    }

    /// Append an instruction, reusing a structurally identical one
    fn push(&mut self, instruction: Instruction) -> InstructionRef {
        let bucket = self.buckets.entry(fingerprint(&instruction)).or_default();
        if let Some(r) = bucket
            .iter()
            .copied()
            .find(|r| self.instructions[r.index()] == instruction)
        {
            return r;
        }
        let r = InstructionRef(self.instructions.len() as u32);
        self.instructions.push(instruction);
        bucket.push(r);
        r
    }
}

/// Hash bucket of an instruction. Equal instructions always land in the
/// same bucket; buckets are searched with `PartialEq`.
fn fingerprint(instruction: &Instruction) -> u64 {
    let mut hasher = DefaultHasher::new();
    instruction.shape.hash(&mut hasher);
    std::mem::discriminant(&instruction.op).hash(&mut hasher);
    let literal: &[f32] = match &instruction.op {
        Op::Scalar(value) => std::slice::from_ref(value),
        Op::Vector(components) => components,
        Op::Color { rgb, .. } => rgb,
        _ => &[],
    };
    for value in literal {
        // 0.0 == -0.0
        let bits = if *value == 0.0 { 0 } else { value.to_bits() };
        bits.hash(&mut hasher);
    }
    if let Op::Parameter(name) = &instruction.op {
        name.hash(&mut hasher);
    }
    instruction.op.operands().hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Attribute, ShaderContext, Uniform};
    use crate::value::TextureId;

    fn scrolling_uv(ctx: &ShaderContext) -> Node {
        let speed = Node::from([1.0, 0.0]);
        ctx.attributes
            .uv
            .add(speed.multiply_scalar(&ctx.time.elapsed).unwrap())
            .unwrap()
    }

    #[test]
    fn test_operands_precede_users() {
        let ctx = ShaderContext::new();
        let texture = Node::texture(TextureRef::Assigned(TextureId::new()));
        let color = texture.sample(scrolling_uv(&ctx)).unwrap().rgb().unwrap();
        let program = ShaderProgram::from_outputs(&OutputDescriptor::new(color));

        for (index, instruction) in program.instructions().iter().enumerate() {
            for operand in instruction.op.operands() {
                assert!(operand.index() < index);
            }
        }
        assert_eq!(program.color().index(), program.len() - 1);
        assert_eq!(program.shape(program.color()), Some(Shape::Vec3));
    }

    #[test]
    fn test_identical_subexpressions_are_merged() {
        let ctx = ShaderContext::new();
        // Built twice, no sharing between the two copies
        let color = Node::compose(vec![
            scrolling_uv(&ctx).x().unwrap(),
            scrolling_uv(&ctx).x().unwrap(),
            Node::scalar(0.0),
        ])
        .unwrap();
        let program = ShaderProgram::from_outputs(&OutputDescriptor::new(color));

        let adds = program
            .instructions()
            .iter()
            .filter(|i| matches!(i.op, Op::Add(..)))
            .count();
        assert_eq!(adds, 1);

        match &program.instruction(program.color()).unwrap().op {
            Op::Compose(parts) => assert_eq!(parts[0], parts[1]),
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[test]
    fn test_literals_and_parameters_are_merged() {
        let tint = || Node::parameter("tint", ParamValue::Scalar(0.5)).unwrap();
        let color = Node::compose(vec![
            Node::scalar(0.25).add(tint()).unwrap(),
            Node::scalar(0.25).add(tint()).unwrap(),
            Node::scalar(-0.0).add(Node::scalar(0.0)).unwrap(),
        ])
        .unwrap();
        let program = ShaderProgram::from_outputs(&OutputDescriptor::new(color));

        let count = |f: fn(&Op) -> bool| program.instructions().iter().filter(|i| f(&i.op)).count();
        assert_eq!(count(|op| matches!(op, Op::Parameter(_))), 1);
        assert_eq!(count(|op| matches!(op, Op::Scalar(_))), 2);
        assert_eq!(count(|op| matches!(op, Op::Add(..))), 2);
        assert_eq!(program.len(), 6);

        match &program.instruction(program.color()).unwrap().op {
            Op::Compose(parts) => {
                assert_eq!(parts[0], parts[1]);
                assert_ne!(parts[0], parts[2]);
                let Op::Add(a, b) = &program.instruction(parts[2]).unwrap().op else {
                    panic!("expected an add");
                };
                assert_eq!(a, b);
            }
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[test]
    fn test_dependencies_are_recorded() {
        let ctx = ShaderContext::new();
        let id = TextureId::new();
        let texture = Node::parameter("noise", ParamValue::Texture(TextureRef::Assigned(id))).unwrap();
        let strength = Node::parameter("strength", ParamValue::Scalar(0.5)).unwrap();
        let offset = texture
            .sample(&ctx.attributes.uv)
            .unwrap()
            .r()
            .unwrap()
            .multiply(strength)
            .unwrap();
        let color = ctx
            .scene_color(ctx.screen_uv.add_scalar(offset).unwrap())
            .unwrap()
            .rgb()
            .unwrap();
        let outputs = OutputDescriptor::new(color).with_emissive(Node::from([0.0, 0.0, 1.0]));
        let program = ShaderProgram::from_outputs(&outputs);

        assert_eq!(program.parameters().get("strength"), Some(&ParamValue::Scalar(0.5)));
        assert_eq!(
            program.textures(),
            &[TextureBinding {
                parameter: Some("noise".to_string()),
                texture: TextureRef::Assigned(id),
            }]
        );
        assert!(program.inputs().contains(&ContextInput::Attribute(Attribute::Uv)));
        assert!(program.inputs().contains(&ContextInput::ScreenUv));
        assert!(program.inputs().contains(&ContextInput::SceneColor));
        assert!(!program.inputs().contains(&ContextInput::Uniform(Uniform::ElapsedTime)));
        assert!(program.emissive().is_some());
    }

    #[test]
    fn test_equal_graphs_lower_to_equal_programs() {
        let ctx = ShaderContext::new();
        let a = ShaderProgram::from_outputs(&OutputDescriptor::new(
            Node::compose(vec![scrolling_uv(&ctx), Node::scalar(1.0)]).unwrap(),
        ));
        let b = ShaderProgram::from_outputs(&OutputDescriptor::new(
            Node::compose(vec![scrolling_uv(&ctx), Node::scalar(1.0)]).unwrap(),
        ));
        assert_eq!(a, b);
    }
}
