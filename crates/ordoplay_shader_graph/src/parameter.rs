// SPDX-License-Identifier: MIT OR Apache-2.0
//! Parameter registry and per-instance parameter values.
//!
//! A [`ParameterRegistry`] is the declaration table of a shader definition:
//! an ordered list of `{name, type, default factory}` entries built once per
//! definition type and shared read-only. Each shader instance receives its
//! own [`Parameters`], produced by invoking every default factory, so no
//! default value is ever shared between instances.

use crate::node::Node;
use crate::value::{Color, ParamType, ParamValue, TextureRef};
use indexmap::IndexMap;

/// Declaration of a single parameter
#[derive(Debug, Clone)]
pub struct ParameterDecl {
    /// Parameter name
    pub name: &'static str,
    /// Human readable description for editors
    pub description: &'static str,
    default: fn() -> ParamValue,
}

impl ParameterDecl {
    /// Create a declaration; the type is inferred from the default
    pub fn new(name: &'static str, default: fn() -> ParamValue) -> Self {
        Self {
            name,
            description: "",
            default,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Produce a fresh default value
    pub fn default_value(&self) -> ParamValue {
        (self.default)()
    }

    /// Declared type
    pub fn param_type(&self) -> ParamType {
        self.default_value().param_type()
    }
}

/// Declaration table of a shader definition
#[derive(Debug, Clone)]
pub struct ParameterRegistry {
    shader: &'static str,
    decls: IndexMap<&'static str, ParameterDecl>,
}

impl ParameterRegistry {
    /// Create an empty registry for a shader
    pub fn new(shader: &'static str) -> Self {
        Self {
            shader,
            decls: IndexMap::new(),
        }
    }

    /// Declare a parameter, builder style
    pub fn with(mut self, name: &'static str, default: fn() -> ParamValue) -> Self {
        self.register(ParameterDecl::new(name, default));
        self
    }

    /// Declare a parameter
    pub fn register(&mut self, decl: ParameterDecl) {
        debug_assert!(
            !self.decls.contains_key(decl.name),
            "parameter `{}` declared twice on {}",
            decl.name,
            self.shader
        );
        self.decls.insert(decl.name, decl);
    }

    /// Name of the owning shader
    pub fn shader(&self) -> &'static str {
        self.shader
    }

    /// Get a declaration by name
    pub fn get(&self, name: &str) -> Option<&ParameterDecl> {
        self.decls.get(name)
    }

    /// All declarations in declaration order
    pub fn decls(&self) -> impl Iterator<Item = &ParameterDecl> {
        self.decls.values()
    }

    /// Number of declared parameters
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    /// Check if no parameters are declared
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Create per-instance values from the default factories
    pub fn instantiate(&'static self) -> Parameters {
        let values = self
            .decls
            .values()
            .map(|decl| (decl.name, decl.default_value()))
            .collect();
        Parameters {
            registry: self,
            values,
            revision: 0,
        }
    }
}

/// Current parameter values of one shader instance
#[derive(Debug, Clone)]
pub struct Parameters {
    registry: &'static ParameterRegistry,
    values: IndexMap<&'static str, ParamValue>,
    revision: u64,
}

impl Parameters {
    /// Registry these values were created from
    pub fn registry(&self) -> &'static ParameterRegistry {
        self.registry
    }

    /// Monotonic counter bumped by every successful write
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn unknown(&self, name: &str) -> ParameterError {
        ParameterError::UnknownParameter {
            shader: self.registry.shader.to_string(),
            name: name.to_string(),
        }
    }

    /// Get a value by name
    pub fn get(&self, name: &str) -> Result<&ParamValue, ParameterError> {
        self.values.get(name).ok_or_else(|| self.unknown(name))
    }

    /// Override a value by name.
    ///
    /// The value must have the declared type. Nothing is modified on error.
    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) -> Result<(), ParameterError> {
        let value = value.into();
        let Some(slot) = self.values.get_mut(name) else {
            return Err(self.unknown(name));
        };
        if slot.param_type() != value.param_type() {
            return Err(ParameterError::TypeMismatch {
                name: name.to_string(),
                expected: slot.param_type(),
                found: value.param_type(),
            });
        }
        *slot = value;
        self.revision += 1;
        tracing::debug!("Set parameter {}.{} = {:?}", self.registry.shader, name, value);
        Ok(())
    }

    /// Restore the declared default of a parameter
    pub fn reset(&mut self, name: &str) -> Result<(), ParameterError> {
        let decl = self.registry.get(name).ok_or_else(|| self.unknown(name))?;
        self.set(name, decl.default_value())
    }

    /// Iterate over `(name, value)` in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ParamValue)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }

    fn mismatch(&self, name: &str, expected: ParamType, found: &ParamValue) -> ParameterError {
        ParameterError::TypeMismatch {
            name: name.to_string(),
            expected,
            found: found.param_type(),
        }
    }

    /// Read a scalar parameter
    pub fn scalar(&self, name: &str) -> Result<f32, ParameterError> {
        match self.get(name)? {
            ParamValue::Scalar(value) => Ok(*value),
            other => Err(self.mismatch(name, ParamType::Scalar, other)),
        }
    }

    /// Read a 2D vector parameter
    pub fn vector2(&self, name: &str) -> Result<[f32; 2], ParameterError> {
        match self.get(name)? {
            ParamValue::Vector2(value) => Ok(*value),
            other => Err(self.mismatch(name, ParamType::Vector2, other)),
        }
    }

    /// Read a color parameter
    pub fn color(&self, name: &str) -> Result<Color, ParameterError> {
        match self.get(name)? {
            ParamValue::Color(value) => Ok(*value),
            other => Err(self.mismatch(name, ParamType::Color, other)),
        }
    }

    /// Read a texture parameter
    pub fn texture(&self, name: &str) -> Result<TextureRef, ParameterError> {
        match self.get(name)? {
            ParamValue::Texture(value) => Ok(*value),
            other => Err(self.mismatch(name, ParamType::Texture, other)),
        }
    }

    /// Read a boolean switch
    pub fn boolean(&self, name: &str) -> Result<bool, ParameterError> {
        match self.get(name)? {
            ParamValue::Boolean(value) => Ok(*value),
            other => Err(self.mismatch(name, ParamType::Boolean, other)),
        }
    }

    /// Node bound to a parameter's current value.
    ///
    /// Booleans are static switches and cannot be bound into the graph.
    pub fn node(&self, name: &str) -> Result<Node, ParameterError> {
        let value = *self.get(name)?;
        Node::parameter(name, value).ok_or_else(|| ParameterError::NotBindable {
            name: name.to_string(),
            found: value.param_type(),
        })
    }
}

/// Error raised at the parameter registry boundary
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    /// The shader does not declare this parameter
    #[error("Unknown parameter `{name}` on {shader}")]
    UnknownParameter {
        /// Shader name
        shader: String,
        /// Requested name
        name: String,
    },

    /// Value type differs from the declared type
    #[error("Parameter `{name}` expects {expected}, got {found}")]
    TypeMismatch {
        /// Parameter name
        name: String,
        /// Declared type
        expected: ParamType,
        /// Supplied type
        found: ParamType,
    },

    /// The parameter's type has no node form
    #[error("Parameter `{name}` of type {found} cannot be bound into a graph")]
    NotBindable {
        /// Parameter name
        name: String,
        /// Declared type
        found: ParamType,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;
    use crate::value::TextureId;
    use std::sync::OnceLock;

    fn registry() -> &'static ParameterRegistry {
        static REGISTRY: OnceLock<ParameterRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            ParameterRegistry::new("TestShader")
                .with("tint", || Color::from_hex(0xFF0000).into())
                .with("speed", || 1.0_f32.into())
                .with("tile", || [1.0_f32, 1.0].into())
                .with("noise", || TextureRef::Placeholder.into())
                .with("masked", || false.into())
        })
    }

    #[test]
    fn test_declaration_order_and_types() {
        let names: Vec<_> = registry().decls().map(|d| d.name).collect();
        assert_eq!(names, ["tint", "speed", "tile", "noise", "masked"]);
        assert_eq!(registry().get("tile").unwrap().param_type(), ParamType::Vector2);
        assert_eq!(registry().len(), 5);
    }

    #[test]
    fn test_register_with_description() {
        let mut registry = ParameterRegistry::new("Described");
        registry.register(
            ParameterDecl::new("glow", || 0.5_f32.into()).with_description("Emission strength"),
        );
        let decl = registry.get("glow").unwrap();
        assert_eq!(decl.description, "Emission strength");
        assert_eq!(decl.default_value(), ParamValue::Scalar(0.5));
        assert!(registry.get("missing").is_none());
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_instances_have_isolated_defaults() {
        let mut first = registry().instantiate();
        let second = registry().instantiate();

        first.set("tint", Color::new(0.0, 1.0, 0.0)).unwrap();

        assert_eq!(first.color("tint").unwrap(), Color::new(0.0, 1.0, 0.0));
        assert_eq!(second.color("tint").unwrap(), Color::from_hex(0xFF0000));
    }

    #[test]
    fn test_unknown_parameter() {
        let mut params = registry().instantiate();
        let before = params.revision();

        let err = params.set("missing", 2.0_f32).unwrap_err();
        assert_eq!(
            err,
            ParameterError::UnknownParameter {
                shader: "TestShader".to_string(),
                name: "missing".to_string(),
            }
        );
        assert_eq!(params.revision(), before);
        assert!(params.get("missing").is_err());
    }

    #[test]
    fn test_type_mismatch_leaves_value_unchanged() {
        let mut params = registry().instantiate();
        let err = params.set("speed", Color::WHITE).unwrap_err();
        assert!(matches!(err, ParameterError::TypeMismatch { .. }));
        assert_eq!(params.scalar("speed").unwrap(), 1.0);
    }

    #[test]
    fn test_reset_restores_default() {
        let mut params = registry().instantiate();
        params.set("speed", 4.0_f32).unwrap();
        params.reset("speed").unwrap();
        assert_eq!(params.scalar("speed").unwrap(), 1.0);
        assert_eq!(params.revision(), 2);
    }

    #[test]
    fn test_parameter_nodes() {
        let mut params = registry().instantiate();
        assert_eq!(params.node("speed").unwrap().shape(), Shape::Scalar);
        assert_eq!(params.node("tint").unwrap().shape(), Shape::Vec3);
        assert_eq!(params.node("noise").unwrap().shape(), Shape::Texture);
        assert_eq!(
            params.node("masked").unwrap_err(),
            ParameterError::NotBindable {
                name: "masked".to_string(),
                found: ParamType::Boolean,
            }
        );

        let id = TextureId::new();
        params.set("noise", id).unwrap();
        assert_eq!(params.texture("noise").unwrap(), TextureRef::Assigned(id));
    }
}
