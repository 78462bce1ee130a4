// SPDX-License-Identifier: MIT OR Apache-2.0
//! Parameter value types: colors, texture references and typed values.

use crate::shape::Shape;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque reference to a texture owned by the asset system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureId(pub Uuid);

impl TextureId {
    /// Create a new random texture ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TextureId {
    fn default() -> Self {
        Self::new()
    }
}

/// Texture slot of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureRef {
    /// Empty texture, rejected when a material is built
    #[default]
    Placeholder,
    /// Texture supplied by the asset loader
    Assigned(TextureId),
}

impl TextureRef {
    /// Check if a real texture has been assigned
    pub fn is_assigned(&self) -> bool {
        matches!(self, Self::Assigned(_))
    }

    /// Get the assigned texture ID
    pub fn id(&self) -> Option<TextureId> {
        match self {
            Self::Assigned(id) => Some(*id),
            Self::Placeholder => None,
        }
    }
}

impl From<TextureId> for TextureRef {
    fn from(id: TextureId) -> Self {
        Self::Assigned(id)
    }
}

/// Linear RGB color
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
}

impl Color {
    /// Black
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);
    /// White
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);

    /// Create a color from components
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create a color from a `0xRRGGBB` value
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
        Self::new(channel(16), channel(8), channel(0))
    }

    /// Components as an array
    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

/// Declared type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamType {
    /// Float value
    Scalar,
    /// 2D vector
    Vector2,
    /// RGB color
    Color,
    /// Texture reference
    Texture,
    /// Static switch, consumed while assembling
    Boolean,
}

impl ParamType {
    /// Shape of the node bound to a parameter of this type
    pub fn shape(self) -> Option<Shape> {
        match self {
            Self::Scalar => Some(Shape::Scalar),
            Self::Vector2 => Some(Shape::Vec2),
            Self::Color => Some(Shape::Vec3),
            Self::Texture => Some(Shape::Texture),
            Self::Boolean => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scalar => "scalar",
            Self::Vector2 => "vector2",
            Self::Color => "color",
            Self::Texture => "texture",
            Self::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// Value held by a parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// Float
    Scalar(f32),
    /// 2D vector
    Vector2([f32; 2]),
    /// Color
    Color(Color),
    /// Texture
    Texture(TextureRef),
    /// Boolean
    Boolean(bool),
}

impl ParamValue {
    /// Get the type for this value
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::Scalar(_) => ParamType::Scalar,
            Self::Vector2(_) => ParamType::Vector2,
            Self::Color(_) => ParamType::Color,
            Self::Texture(_) => ParamType::Texture,
            Self::Boolean(_) => ParamType::Boolean,
        }
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        Self::Scalar(value)
    }
}

impl From<[f32; 2]> for ParamValue {
    fn from(value: [f32; 2]) -> Self {
        Self::Vector2(value)
    }
}

impl From<Color> for ParamValue {
    fn from(value: Color) -> Self {
        Self::Color(value)
    }
}

impl From<TextureRef> for ParamValue {
    fn from(value: TextureRef) -> Self {
        Self::Texture(value)
    }
}

impl From<TextureId> for ParamValue {
    fn from(value: TextureId) -> Self {
        Self::Texture(TextureRef::Assigned(value))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}
