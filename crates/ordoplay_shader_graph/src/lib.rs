// SPDX-License-Identifier: MIT OR Apache-2.0
//! Declarative shader graphs for `OrdoPlay`.
//!
//! Shaders are authored as typed expression graphs rather than shader
//! source:
//! - Immutable, shape-checked expression nodes
//! - Per-definition parameter registries with isolated instance values
//! - Read-only context nodes (time, particle, vertex attributes, screen)
//! - Shader definitions producing an output descriptor
//! - A material builder with an additive build hook
//!
//! ## Architecture
//!
//! A [`ShaderDefinition`] turns [`Parameters`] and a [`ShaderContext`] into an
//! [`OutputDescriptor`]. The [`MaterialBuilder`] validates the descriptor,
//! flattens it into a [`ShaderProgram`] and applies the definition's build
//! hook. The [`evaluation`] module computes node values on the CPU, which
//! is what the tests use to check graph semantics.

pub mod shape;
pub mod value;
pub mod node;
pub mod nodes;
pub mod context;
pub mod parameter;
pub mod shader;
pub mod compose;
pub mod graph;
pub mod material;
pub mod evaluation;

pub use shape::Shape;
pub use value::{Color, ParamType, ParamValue, TextureId, TextureRef};
pub use node::{BinaryOp, GraphError, Node, NodeKind, UnaryOp};
pub use context::{Attribute, ContextInput, ShaderContext, Uniform};
pub use parameter::{ParameterDecl, ParameterError, ParameterRegistry, Parameters};
pub use shader::{AssembleError, OutputDescriptor, ShaderDefinition, ShaderInstance};
pub use compose::{panner, Panner};
pub use graph::{Instruction, InstructionRef, Op, ShaderProgram, TextureBinding};
pub use material::{
    AlphaMode, BuildError, GraphCompiler, Material, MaterialBuilder, MaterialId, ProgramCompiler,
    RenderState, Side,
};
pub use evaluation::{evaluate, EvaluationError, EvaluationInputs, SolidTexture, TextureSampler, Value};
