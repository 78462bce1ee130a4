// SPDX-License-Identifier: MIT OR Apache-2.0
//! Renderer-provided context nodes.
//!
//! Time, particle state, vertex attributes and screen coordinates are not
//! instantiated by shader authors. They are read from a [`ShaderContext`]
//! handed to `assemble`, and behave as ordinary nodes in every operator.
//! Their values are supplied by the renderer per evaluation.

use crate::node::{GraphError, Node};
use crate::shape::Shape;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Per-frame or per-particle uniform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Uniform {
    /// Monotonic elapsed time in seconds
    ElapsedTime,
    /// Normalized remaining particle energy in `[0, 1]`
    ParticleEnergy,
}

impl Uniform {
    /// Shape of the uniform
    pub fn shape(self) -> Shape {
        Shape::Scalar
    }
}

/// Per-vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    /// Vertex color (RGBA)
    VertexColor,
    /// Primary texture coordinates
    Uv,
    /// Object-space position
    Position,
    /// Object-space normal
    Normal,
}

impl Attribute {
    /// Shape of the attribute
    pub fn shape(self) -> Shape {
        match self {
            Self::VertexColor => Shape::Vec4,
            Self::Uv => Shape::Vec2,
            Self::Position | Self::Normal => Shape::Vec3,
        }
    }
}

/// Any renderer-supplied input a graph can depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextInput {
    /// Uniform value
    Uniform(Uniform),
    /// Vertex attribute
    Attribute(Attribute),
    /// Screen-space UV of the fragment
    ScreenUv,
    /// Previously rendered scene color buffer
    SceneColor,
    /// Scene depth buffer
    SceneDepth,
}

/// Time uniforms
#[derive(Debug, Clone)]
pub struct TimeUniforms {
    /// Elapsed seconds
    pub elapsed: Node,
}

/// Particle uniforms, meaningful on particle geometry only
#[derive(Debug, Clone)]
pub struct ParticleUniforms {
    /// Normalized particle energy
    pub energy: Node,
}

/// Vertex attribute nodes
#[derive(Debug, Clone)]
pub struct VertexAttributes {
    /// Vertex color
    pub color: Node,
    /// Texture coordinates
    pub uv: Node,
    /// Position
    pub position: Node,
    /// Normal
    pub normal: Node,
}

/// The set of read-only context nodes available while assembling a graph
#[derive(Debug, Clone)]
pub struct ShaderContext {
    /// Time uniforms
    pub time: TimeUniforms,
    /// Particle uniforms
    pub particle: ParticleUniforms,
    /// Vertex attributes
    pub attributes: VertexAttributes,
    /// Screen-space UV
    pub screen_uv: Node,
}

impl ShaderContext {
    /// Create a context with fresh context nodes
    pub fn new() -> Self {
        Self {
            time: TimeUniforms {
                elapsed: Node::uniform(Uniform::ElapsedTime),
            },
            particle: ParticleUniforms {
                energy: Node::uniform(Uniform::ParticleEnergy),
            },
            attributes: VertexAttributes {
                color: Node::attribute(Attribute::VertexColor),
                uv: Node::attribute(Attribute::Uv),
                position: Node::attribute(Attribute::Position),
                normal: Node::attribute(Attribute::Normal),
            },
            screen_uv: Node::screen_uv(),
        }
    }

    /// Process-wide context shared by every builder
    pub fn shared() -> &'static ShaderContext {
        static CONTEXT: OnceLock<ShaderContext> = OnceLock::new();
        CONTEXT.get_or_init(ShaderContext::new)
    }

    /// Sample the scene color buffer at a screen coordinate
    pub fn scene_color(&self, coord: impl Into<Node>) -> Result<Node, GraphError> {
        Node::scene_color(coord.into())
    }

    /// Edge factor that reaches 1 where the surface meets scene geometry
    /// and fades to 0 over `distance` world units.
    pub fn edge_depth(&self, distance: impl Into<Node>) -> Result<Node, GraphError> {
        Node::depth_fade(distance.into())
    }
}

impl Default for ShaderContext {
    fn default() -> Self {
        Self::new()
    }
}
