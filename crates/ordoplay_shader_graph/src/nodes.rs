// SPDX-License-Identifier: MIT OR Apache-2.0
//! Free-function constructors for writing shader graphs.
//!
//! These mirror the [`Node`] methods so expressions can be written either
//! fluently (`a.mix(b, t)`) or functionally (`mix(a, b, t)`).

use crate::node::{GraphError, Node};
use crate::value::{Color, TextureRef};

/// Float literal
pub fn float(value: f32) -> Node {
    Node::scalar(value)
}

/// 2D vector from scalar nodes or literals
pub fn vec2(x: impl Into<Node>, y: impl Into<Node>) -> Result<Node, GraphError> {
    Node::compose(vec![x.into(), y.into()])
}

/// 3D vector from scalar nodes or literals
pub fn vec3(
    x: impl Into<Node>,
    y: impl Into<Node>,
    z: impl Into<Node>,
) -> Result<Node, GraphError> {
    Node::compose(vec![x.into(), y.into(), z.into()])
}

/// 4D vector from scalar nodes or literals
pub fn vec4(
    x: impl Into<Node>,
    y: impl Into<Node>,
    z: impl Into<Node>,
    w: impl Into<Node>,
) -> Result<Node, GraphError> {
    Node::compose(vec![x.into(), y.into(), z.into(), w.into()])
}

/// RGB color literal
pub fn rgb(color: Color) -> Node {
    Node::color(color)
}

/// RGBA from an RGB node and an alpha node
pub fn rgba(rgb: impl Into<Node>, alpha: impl Into<Node>) -> Result<Node, GraphError> {
    rgb.into().with_alpha(alpha)
}

/// Texture handle
pub fn texture(texture: TextureRef) -> Node {
    Node::texture(texture)
}

/// Sample a texture at a coordinate
pub fn texture_sample(texture: &Node, coord: impl Into<Node>) -> Result<Node, GraphError> {
    texture.sample(coord)
}

/// Round down
pub fn floor(x: impl Into<Node>) -> Result<Node, GraphError> {
    x.into().floor()
}

/// `1 - x`
pub fn one_minus(x: impl Into<Node>) -> Result<Node, GraphError> {
    x.into().one_minus()
}

/// `x ^ exponent`
pub fn pow(x: impl Into<Node>, exponent: impl Into<Node>) -> Result<Node, GraphError> {
    x.into().pow(exponent)
}

/// Clamp into `[min, max]`
pub fn clamp(
    x: impl Into<Node>,
    min: impl Into<Node>,
    max: impl Into<Node>,
) -> Result<Node, GraphError> {
    x.into().clamp(min, max)
}

/// `a * (1 - t) + b * t`
pub fn mix(
    a: impl Into<Node>,
    b: impl Into<Node>,
    t: impl Into<Node>,
) -> Result<Node, GraphError> {
    a.into().mix(b, t)
}

/// GPU `mod`
pub fn modulo(x: impl Into<Node>, y: impl Into<Node>) -> Result<Node, GraphError> {
    x.into().modulo(y)
}

/// Interpolate a vertex value to the fragment stage
pub fn varying(x: impl Into<Node>) -> Result<Node, GraphError> {
    x.into().varying()
}

/// Lit surface with optional emission
pub fn standard_surface(
    color: impl Into<Node>,
    emissive: Option<Node>,
) -> Result<Node, GraphError> {
    Node::standard_surface(color.into(), emissive)
}
