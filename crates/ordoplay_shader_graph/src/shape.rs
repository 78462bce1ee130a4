// SPDX-License-Identifier: MIT OR Apache-2.0
//! Static shapes carried by every node and the rules that combine them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Arity of the value a node produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    /// Single float
    Scalar,
    /// 2D vector
    Vec2,
    /// 3D vector / RGB color
    Vec3,
    /// 4D vector / RGBA color
    Vec4,
    /// Texture handle (not a value, only sampleable)
    Texture,
}

impl Shape {
    /// Number of float components, zero for textures
    pub fn components(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
            Self::Texture => 0,
        }
    }

    /// Shape with the given component count
    pub fn from_components(count: usize) -> Option<Self> {
        match count {
            1 => Some(Self::Scalar),
            2 => Some(Self::Vec2),
            3 => Some(Self::Vec3),
            4 => Some(Self::Vec4),
            _ => None,
        }
    }

    /// Whether this shape holds float components
    pub fn is_numeric(self) -> bool {
        self != Self::Texture
    }

    /// Check if this is a scalar
    pub fn is_scalar(self) -> bool {
        self == Self::Scalar
    }

    /// Both operands must have the same numeric shape.
    pub fn matching(left: Shape, right: Shape) -> Option<Shape> {
        (left.is_numeric() && left == right).then_some(left)
    }

    /// One operand must be a scalar, broadcast over the other.
    ///
    /// The result takes the shape of the non-scalar side, so `float * vec3`
    /// and `vec3 * float` are both `vec3`.
    pub fn broadcast_scalar(left: Shape, right: Shape) -> Option<Shape> {
        if left.is_numeric() && right.is_scalar() {
            Some(left)
        } else if left.is_scalar() && right.is_numeric() {
            Some(right)
        } else {
            None
        }
    }

    /// Operands either match or one of them is a broadcast scalar.
    pub fn matching_or_scalar(left: Shape, right: Shape) -> Option<Shape> {
        Self::matching(left, right).or_else(|| Self::broadcast_scalar(left, right))
    }

    /// Whether `argument` can feed an operator whose result keeps `target`'s
    /// shape: it must match `target` or be a scalar.
    pub fn accepts_argument(target: Shape, argument: Shape) -> bool {
        target.is_numeric() && (argument == target || argument.is_scalar())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scalar => "float",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
            Self::Texture => "texture",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUMERIC: [Shape; 4] = [Shape::Scalar, Shape::Vec2, Shape::Vec3, Shape::Vec4];

    #[test]
    fn test_matching_requires_equal_arity() {
        for left in NUMERIC {
            for right in NUMERIC {
                let result = Shape::matching(left, right);
                if left == right {
                    assert_eq!(result, Some(left));
                } else {
                    assert_eq!(result, None);
                }
            }
        }
        assert_eq!(Shape::matching(Shape::Texture, Shape::Texture), None);
    }

    #[test]
    fn test_scalar_broadcasts_over_any_shape() {
        for left in NUMERIC {
            assert_eq!(Shape::broadcast_scalar(left, Shape::Scalar), Some(left));
            assert_eq!(Shape::matching_or_scalar(left, Shape::Scalar), Some(left));
        }
        assert_eq!(Shape::broadcast_scalar(Shape::Vec2, Shape::Vec3), None);
        assert_eq!(Shape::broadcast_scalar(Shape::Texture, Shape::Scalar), None);
        assert_eq!(Shape::broadcast_scalar(Shape::Scalar, Shape::Texture), None);
    }

    #[test]
    fn test_scalar_broadcasts_from_either_side() {
        for vector in [Shape::Vec2, Shape::Vec3, Shape::Vec4] {
            assert_eq!(Shape::broadcast_scalar(Shape::Scalar, vector), Some(vector));
            assert_eq!(Shape::broadcast_scalar(vector, Shape::Scalar), Some(vector));
            assert_eq!(Shape::matching_or_scalar(Shape::Scalar, vector), Some(vector));
            assert_eq!(Shape::matching_or_scalar(vector, Shape::Scalar), Some(vector));
        }
        assert_eq!(
            Shape::broadcast_scalar(Shape::Scalar, Shape::Scalar),
            Some(Shape::Scalar)
        );
    }

    #[test]
    fn test_arguments_keep_the_target_shape() {
        for target in NUMERIC {
            assert!(Shape::accepts_argument(target, target));
            assert!(Shape::accepts_argument(target, Shape::Scalar));
        }
        assert!(!Shape::accepts_argument(Shape::Scalar, Shape::Vec3));
        assert!(!Shape::accepts_argument(Shape::Vec2, Shape::Vec4));
        assert!(!Shape::accepts_argument(Shape::Texture, Shape::Scalar));
    }

    #[test]
    fn test_component_counts() {
        for shape in NUMERIC {
            assert_eq!(Shape::from_components(shape.components()), Some(shape));
        }
        assert_eq!(Shape::from_components(0), None);
        assert_eq!(Shape::from_components(5), None);
        assert_eq!(Shape::Vec3.to_string(), "vec3");
    }
}
