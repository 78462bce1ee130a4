// SPDX-License-Identifier: MIT OR Apache-2.0
//! Expression nodes for the shader graph.
//!
//! A [`Node`] is an immutable, reference-counted vertex of an expression DAG.
//! Every operator validates the shapes of its operands, infers the shape of
//! its result and returns a new node that references the operands. Operands
//! are never modified, so sub-expressions can be shared freely.

use crate::context::{Attribute, Uniform};
use crate::shape::Shape;
use crate::value::{Color, ParamValue, TextureRef};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Component-wise operator taking one node plus optional operator arguments
#[derive(Debug, Clone, PartialEq)]
pub enum UnaryOp {
    /// Round down
    Floor,
    /// `1 - x`
    OneMinus,
    /// `x ^ exponent`
    Pow(Node),
    /// Clamp into `[min, max]`
    Clamp {
        /// Lower bound
        min: Node,
        /// Upper bound
        max: Node,
    },
}

impl UnaryOp {
    /// Operator name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::Floor => "floor",
            Self::OneMinus => "oneMinus",
            Self::Pow(_) => "pow",
            Self::Clamp { .. } => "clamp",
        }
    }
}

/// Operator combining two nodes
#[derive(Debug, Clone, PartialEq)]
pub enum BinaryOp {
    /// `a + b`, same shape
    Add,
    /// `a - b`, same shape
    Subtract,
    /// `a * b`, same shape
    Multiply,
    /// `a * s`, scalar broadcast
    MultiplyScalar,
    /// `a + s`, scalar broadcast
    AddScalar,
    /// GPU `mod`: remainder with the sign of the divisor
    Mod,
    /// `a * (1 - factor) + b * factor`
    Mix(Node),
}

impl BinaryOp {
    /// Operator name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::MultiplyScalar => "multiplyScalar",
            Self::AddScalar => "addScalar",
            Self::Mod => "mod",
            Self::Mix(_) => "mix",
        }
    }
}

/// The expression a node stands for
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Float literal
    Scalar(f32),
    /// Vector literal with 2 to 4 components
    Vector(Vec<f32>),
    /// Color literal, with alpha when it is a 4-vector
    Color {
        /// RGB components
        rgb: [f32; 3],
        /// Optional alpha
        alpha: Option<f32>,
    },
    /// Value bound to a named shader parameter
    Parameter {
        /// Parameter name
        name: String,
        /// Value at assembly time
        value: ParamValue,
    },
    /// Texture handle, optionally bound to a parameter
    Texture {
        /// Parameter name, if bound to one
        parameter: Option<String>,
        /// Referenced texture
        texture: TextureRef,
    },
    /// Texture lookup yielding RGBA
    Sample {
        /// Texture node
        texture: Node,
        /// 2D coordinate
        coord: Node,
    },
    /// Scene color buffer lookup yielding RGBA
    SceneColor {
        /// Screen-space coordinate
        coord: Node,
    },
    /// Depth-derived edge factor
    DepthFade {
        /// Fade distance in world units
        distance: Node,
    },
    /// Per-vertex attribute
    Attribute(Attribute),
    /// Renderer uniform
    Uniform(Uniform),
    /// Fragment screen-space UV
    ScreenUv,
    /// Vertex value interpolated to the fragment stage
    Varying(Node),
    /// Vector built by concatenating components of the parts
    Compose(Vec<Node>),
    /// Component projection
    Swizzle {
        /// Projected node
        source: Node,
        /// Component indices
        components: Vec<u8>,
    },
    /// Unary operator
    Unary(UnaryOp, Node),
    /// Binary operator
    Binary(BinaryOp, Node, Node),
    /// Lit surface shading yielding RGBA
    StandardSurface {
        /// Base color
        color: Node,
        /// Emissive color
        emissive: Option<Node>,
    },
}

impl NodeKind {
    /// Direct operands of this expression
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Self::Scalar(_)
            | Self::Vector(_)
            | Self::Color { .. }
            | Self::Parameter { .. }
            | Self::Texture { .. }
            | Self::Attribute(_)
            | Self::Uniform(_)
            | Self::ScreenUv => Vec::new(),
            Self::Sample { texture, coord } => vec![texture, coord],
            Self::SceneColor { coord } => vec![coord],
            Self::DepthFade { distance } => vec![distance],
            Self::Varying(node) => vec![node],
            Self::Compose(parts) => parts.iter().collect(),
            Self::Swizzle { source, .. } => vec![source],
            Self::Unary(op, operand) => match op {
                UnaryOp::Floor | UnaryOp::OneMinus => vec![operand],
                UnaryOp::Pow(exponent) => vec![operand, exponent],
                UnaryOp::Clamp { min, max } => vec![operand, min, max],
            },
            Self::Binary(op, left, right) => match op {
                BinaryOp::Mix(factor) => vec![left, right, factor],
                _ => vec![left, right],
            },
            Self::StandardSurface { color, emissive } => {
                std::iter::once(color).chain(emissive.as_ref()).collect()
            }
        }
    }
}

#[derive(Debug, PartialEq)]
struct NodeData {
    shape: Shape,
    kind: NodeKind,
}

/// Immutable typed expression node
///
/// Cloning a node is cheap and shares the underlying expression. Equality is
/// structural: two independently built graphs describing the same expression
/// compare equal.
#[derive(Clone)]
pub struct Node(Arc<NodeData>);

impl Node {
    fn from_parts(shape: Shape, kind: NodeKind) -> Self {
        Self(Arc::new(NodeData { shape, kind }))
    }

    /// Float literal
    pub fn scalar(value: f32) -> Self {
        Self::from_parts(Shape::Scalar, NodeKind::Scalar(value))
    }

    /// Vector literal with 2 to 4 components
    pub fn vector(components: &[f32]) -> Result<Self, GraphError> {
        let shape = match Shape::from_components(components.len()) {
            Some(shape) if shape != Shape::Scalar => shape,
            _ => {
                return Err(GraphError::InvalidComponents {
                    count: components.len(),
                })
            }
        };
        Ok(Self::from_parts(shape, NodeKind::Vector(components.to_vec())))
    }

    /// RGB color literal
    pub fn color(color: Color) -> Self {
        Self::from_parts(
            Shape::Vec3,
            NodeKind::Color {
                rgb: color.to_array(),
                alpha: None,
            },
        )
    }

    /// RGBA color literal
    pub fn color_alpha(color: Color, alpha: f32) -> Self {
        Self::from_parts(
            Shape::Vec4,
            NodeKind::Color {
                rgb: color.to_array(),
                alpha: Some(alpha),
            },
        )
    }

    /// Node bound to a named parameter.
    ///
    /// Texture values produce a texture node. Booleans are static switches
    /// with no node representation and yield `None`.
    pub fn parameter(name: impl Into<String>, value: ParamValue) -> Option<Self> {
        let name = name.into();
        let node = match value {
            ParamValue::Boolean(_) => return None,
            ParamValue::Texture(texture) => Self::from_parts(
                Shape::Texture,
                NodeKind::Texture {
                    parameter: Some(name),
                    texture,
                },
            ),
            _ => {
                let shape = value.param_type().shape()?;
                Self::from_parts(shape, NodeKind::Parameter { name, value })
            }
        };
        Some(node)
    }

    /// Texture handle not bound to any parameter
    pub fn texture(texture: TextureRef) -> Self {
        Self::from_parts(
            Shape::Texture,
            NodeKind::Texture {
                parameter: None,
                texture,
            },
        )
    }

    /// Per-vertex attribute
    pub fn attribute(attribute: Attribute) -> Self {
        Self::from_parts(attribute.shape(), NodeKind::Attribute(attribute))
    }

    /// Renderer uniform
    pub fn uniform(uniform: Uniform) -> Self {
        Self::from_parts(uniform.shape(), NodeKind::Uniform(uniform))
    }

    /// Screen-space UV of the fragment
    pub fn screen_uv() -> Self {
        Self::from_parts(Shape::Vec2, NodeKind::ScreenUv)
    }

    pub(crate) fn scene_color(coord: Node) -> Result<Self, GraphError> {
        if coord.shape() != Shape::Vec2 {
            return Err(GraphError::InvalidOperand {
                operator: "sceneColor",
                shape: coord.shape(),
            });
        }
        Ok(Self::from_parts(Shape::Vec4, NodeKind::SceneColor { coord }))
    }

    pub(crate) fn depth_fade(distance: Node) -> Result<Self, GraphError> {
        if !distance.shape().is_scalar() {
            return Err(GraphError::InvalidOperand {
                operator: "depthFade",
                shape: distance.shape(),
            });
        }
        Ok(Self::from_parts(Shape::Scalar, NodeKind::DepthFade { distance }))
    }

    /// Concatenate the components of scalar or vector parts into one vector.
    ///
    /// Parts that are all float literals fold into a vector literal.
    pub fn compose(parts: Vec<Node>) -> Result<Self, GraphError> {
        if let Some(part) = parts.iter().find(|p| !p.shape().is_numeric()) {
            return Err(GraphError::InvalidOperand {
                operator: "compose",
                shape: part.shape(),
            });
        }
        let count = parts.iter().map(|p| p.shape().components()).sum();
        let shape = match Shape::from_components(count) {
            Some(shape) if shape != Shape::Scalar => shape,
            _ => return Err(GraphError::InvalidComponents { count }),
        };

        let literals: Option<Vec<f32>> = parts
            .iter()
            .map(|p| match p.kind() {
                NodeKind::Scalar(value) => Some(*value),
                _ => None,
            })
            .collect();
        if let Some(components) = literals {
            return Ok(Self::from_parts(shape, NodeKind::Vector(components)));
        }

        Ok(Self::from_parts(shape, NodeKind::Compose(parts)))
    }

    /// Lit surface shading of a base color with optional emission
    pub fn standard_surface(color: Node, emissive: Option<Node>) -> Result<Self, GraphError> {
        if !matches!(color.shape(), Shape::Vec3 | Shape::Vec4) {
            return Err(GraphError::InvalidOperand {
                operator: "standardSurface",
                shape: color.shape(),
            });
        }
        if let Some(emissive) = &emissive {
            if emissive.shape() != Shape::Vec3 {
                return Err(GraphError::ShapeMismatch {
                    operator: "standardSurface",
                    left: color.shape(),
                    right: emissive.shape(),
                });
            }
        }
        Ok(Self::from_parts(
            Shape::Vec4,
            NodeKind::StandardSurface { color, emissive },
        ))
    }

    /// Static shape of the node
    pub fn shape(&self) -> Shape {
        self.0.shape
    }

    /// Expression of the node
    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    /// Check whether both handles share the same expression instance
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Address used to identify shared sub-expressions
    pub(crate) fn key(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Visit every distinct node of the graph once, operands before users
    pub fn visit(&self, mut f: impl FnMut(&Node)) {
        let mut visited = HashSet::new();
        self.visit_inner(&mut visited, &mut f);
    }

    fn visit_inner(&self, visited: &mut HashSet<usize>, f: &mut impl FnMut(&Node)) {
        if !visited.insert(self.key()) {
            return;
        }
        for child in self.kind().children() {
            child.visit_inner(visited, f);
        }
        f(self);
    }

    fn binary(
        &self,
        op: BinaryOp,
        rhs: Node,
        rule: fn(Shape, Shape) -> Option<Shape>,
    ) -> Result<Node, GraphError> {
        let shape = rule(self.shape(), rhs.shape()).ok_or(GraphError::ShapeMismatch {
            operator: op.name(),
            left: self.shape(),
            right: rhs.shape(),
        })?;
        Ok(Self::from_parts(shape, NodeKind::Binary(op, self.clone(), rhs)))
    }

    fn unary(&self, op: UnaryOp) -> Result<Node, GraphError> {
        if !self.shape().is_numeric() {
            return Err(GraphError::InvalidOperand {
                operator: op.name(),
                shape: self.shape(),
            });
        }
        let argument_mismatch = |arg: &Node| {
            (!Shape::accepts_argument(self.shape(), arg.shape())).then(|| {
                GraphError::ShapeMismatch {
                    operator: op.name(),
                    left: self.shape(),
                    right: arg.shape(),
                }
            })
        };
        let mismatch = match &op {
            UnaryOp::Floor | UnaryOp::OneMinus => None,
            UnaryOp::Pow(exponent) => argument_mismatch(exponent),
            UnaryOp::Clamp { min, max } => argument_mismatch(min).or_else(|| argument_mismatch(max)),
        };
        if let Some(error) = mismatch {
            return Err(error);
        }
        Ok(Self::from_parts(self.shape(), NodeKind::Unary(op, self.clone())))
    }

    /// `self + rhs`, shapes must match
    pub fn add(&self, rhs: impl Into<Node>) -> Result<Node, GraphError> {
        self.binary(BinaryOp::Add, rhs.into(), Shape::matching)
    }

    /// `self - rhs`, shapes must match
    pub fn subtract(&self, rhs: impl Into<Node>) -> Result<Node, GraphError> {
        self.binary(BinaryOp::Subtract, rhs.into(), Shape::matching)
    }

    /// `self * rhs` component-wise, shapes must match
    pub fn multiply(&self, rhs: impl Into<Node>) -> Result<Node, GraphError> {
        self.binary(BinaryOp::Multiply, rhs.into(), Shape::matching)
    }

    /// `self * s` where either side may be the broadcast scalar
    pub fn multiply_scalar(&self, scalar: impl Into<Node>) -> Result<Node, GraphError> {
        self.binary(BinaryOp::MultiplyScalar, scalar.into(), Shape::broadcast_scalar)
    }

    /// `self + s` where either side may be the broadcast scalar
    pub fn add_scalar(&self, scalar: impl Into<Node>) -> Result<Node, GraphError> {
        self.binary(BinaryOp::AddScalar, scalar.into(), Shape::broadcast_scalar)
    }

    /// GPU `mod`, either operand may be a broadcast scalar
    pub fn modulo(&self, divisor: impl Into<Node>) -> Result<Node, GraphError> {
        self.binary(BinaryOp::Mod, divisor.into(), Shape::matching_or_scalar)
    }

    /// Blend from `self` to `other` by `factor`
    pub fn mix(&self, other: impl Into<Node>, factor: impl Into<Node>) -> Result<Node, GraphError> {
        let factor = factor.into();
        if !Shape::accepts_argument(self.shape(), factor.shape()) {
            return Err(GraphError::ShapeMismatch {
                operator: "mix",
                left: self.shape(),
                right: factor.shape(),
            });
        }
        self.binary(BinaryOp::Mix(factor), other.into(), Shape::matching)
    }

    /// Round every component down
    pub fn floor(&self) -> Result<Node, GraphError> {
        self.unary(UnaryOp::Floor)
    }

    /// `1 - self`
    pub fn one_minus(&self) -> Result<Node, GraphError> {
        self.unary(UnaryOp::OneMinus)
    }

    /// Raise every component to `exponent`
    pub fn pow(&self, exponent: impl Into<Node>) -> Result<Node, GraphError> {
        self.unary(UnaryOp::Pow(exponent.into()))
    }

    /// Clamp every component into `[min, max]`
    pub fn clamp(&self, min: impl Into<Node>, max: impl Into<Node>) -> Result<Node, GraphError> {
        self.unary(UnaryOp::Clamp {
            min: min.into(),
            max: max.into(),
        })
    }

    /// Sample this texture at a 2D coordinate, yielding RGBA
    pub fn sample(&self, coord: impl Into<Node>) -> Result<Node, GraphError> {
        let coord = coord.into();
        if self.shape() != Shape::Texture || coord.shape() != Shape::Vec2 {
            return Err(GraphError::ShapeMismatch {
                operator: "sample",
                left: self.shape(),
                right: coord.shape(),
            });
        }
        Ok(Self::from_parts(
            Shape::Vec4,
            NodeKind::Sample {
                texture: self.clone(),
                coord,
            },
        ))
    }

    /// Mark a vertex value as interpolated to the fragment stage
    pub fn varying(&self) -> Result<Node, GraphError> {
        if !self.shape().is_numeric() {
            return Err(GraphError::InvalidOperand {
                operator: "varying",
                shape: self.shape(),
            });
        }
        Ok(Self::from_parts(self.shape(), NodeKind::Varying(self.clone())))
    }

    /// Project components by name, e.g. `"x"`, `"rgb"`, `"xy"`
    pub fn swizzle(&self, pattern: &str) -> Result<Node, GraphError> {
        let invalid = || GraphError::InvalidSwizzle {
            swizzle: pattern.to_string(),
            shape: self.shape(),
        };
        let available = self.shape().components();
        let components = pattern
            .chars()
            .map(|c| {
                let index = match c {
                    'x' | 'r' => 0,
                    'y' | 'g' => 1,
                    'z' | 'b' => 2,
                    'w' | 'a' => 3,
                    _ => return None,
                };
                (index < available).then_some(index as u8)
            })
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(invalid)?;
        let shape = Shape::from_components(components.len()).ok_or_else(invalid)?;
        Ok(Self::from_parts(
            shape,
            NodeKind::Swizzle {
                source: self.clone(),
                components,
            },
        ))
    }

    /// First component
    pub fn x(&self) -> Result<Node, GraphError> {
        self.swizzle("x")
    }

    /// Second component
    pub fn y(&self) -> Result<Node, GraphError> {
        self.swizzle("y")
    }

    /// Red channel
    pub fn r(&self) -> Result<Node, GraphError> {
        self.swizzle("r")
    }

    /// Green channel
    pub fn g(&self) -> Result<Node, GraphError> {
        self.swizzle("g")
    }

    /// Blue channel
    pub fn b(&self) -> Result<Node, GraphError> {
        self.swizzle("b")
    }

    /// Alpha channel
    pub fn a(&self) -> Result<Node, GraphError> {
        self.swizzle("a")
    }

    /// RGB channels
    pub fn rgb(&self) -> Result<Node, GraphError> {
        self.swizzle("rgb")
    }

    /// Extend an RGB node with an alpha channel
    pub fn with_alpha(&self, alpha: impl Into<Node>) -> Result<Node, GraphError> {
        let alpha = alpha.into();
        if self.shape() != Shape::Vec3 || !alpha.shape().is_scalar() {
            return Err(GraphError::ShapeMismatch {
                operator: "rgba",
                left: self.shape(),
                right: alpha.shape(),
            });
        }
        Self::compose(vec![self.clone(), alpha])
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("shape", &self.0.shape)
            .field("kind", &self.0.kind)
            .finish()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0 == other.0
    }
}

impl From<&Node> for Node {
    fn from(node: &Node) -> Self {
        node.clone()
    }
}

impl From<f32> for Node {
    fn from(value: f32) -> Self {
        Self::scalar(value)
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Self::scalar(value as f32)
    }
}

impl From<[f32; 2]> for Node {
    fn from(value: [f32; 2]) -> Self {
        Self::from_parts(Shape::Vec2, NodeKind::Vector(value.to_vec()))
    }
}

impl From<[f32; 3]> for Node {
    fn from(value: [f32; 3]) -> Self {
        Self::from_parts(Shape::Vec3, NodeKind::Vector(value.to_vec()))
    }
}

impl From<[f32; 4]> for Node {
    fn from(value: [f32; 4]) -> Self {
        Self::from_parts(Shape::Vec4, NodeKind::Vector(value.to_vec()))
    }
}

impl From<Color> for Node {
    fn from(color: Color) -> Self {
        Self::color(color)
    }
}

/// Error raised while constructing a node
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Operands of an operator have incompatible shapes
    #[error("Shape mismatch in `{operator}`: {left} and {right}")]
    ShapeMismatch {
        /// Operator name
        operator: &'static str,
        /// Left operand shape
        left: Shape,
        /// Right operand shape
        right: Shape,
    },

    /// Operator cannot take an operand of this shape
    #[error("`{operator}` cannot be applied to {shape}")]
    InvalidOperand {
        /// Operator name
        operator: &'static str,
        /// Operand shape
        shape: Shape,
    },

    /// Vector component count outside 2..=4
    #[error("Cannot build a vector from {count} components")]
    InvalidComponents {
        /// Requested component count
        count: usize,
    },

    /// Swizzle pattern does not fit the source shape
    #[error("Invalid swizzle `{swizzle}` on {shape}")]
    InvalidSwizzle {
        /// Requested pattern
        swizzle: String,
        /// Source shape
        shape: Shape,
    },
}
