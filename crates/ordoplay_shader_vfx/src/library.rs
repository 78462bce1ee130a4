// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader library: definitions by name.

use crate::shaders::{ExampleShader, ScrollingShader, SlashShader};
use indexmap::IndexMap;
use ordoplay_shader_graph::{ShaderDefinition, ShaderInstance};

/// Creates a fresh definition
pub type ShaderFactory = fn() -> Box<dyn ShaderDefinition>;

/// Registry of available shader definitions
pub struct ShaderLibrary {
    /// Registered factories by shader name
    factories: IndexMap<&'static str, ShaderFactory>,
}

impl ShaderLibrary {
    /// Create a new empty library
    pub fn new() -> Self {
        Self {
            factories: IndexMap::new(),
        }
    }

    /// Register a shader definition under its own name
    pub fn register(&mut self, factory: ShaderFactory) {
        let name = factory().name();
        if self.factories.insert(name, factory).is_some() {
            tracing::warn!("Shader {} registered twice, keeping the latest", name);
        }
    }

    /// Check if a shader is registered
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// All registered shader names in registration order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    /// Number of registered shaders
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check if the library is empty
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Create a definition by name
    pub fn create(&self, name: &str) -> Option<Box<dyn ShaderDefinition>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// Create an instance with default parameters by name
    pub fn instantiate(&self, name: &str) -> Option<ShaderInstance> {
        self.create(name).map(ShaderInstance::from_boxed)
    }
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the library of bundled VFX shaders
pub fn create_vfx_library() -> ShaderLibrary {
    let mut library = ShaderLibrary::new();
    library.register(|| Box::new(ExampleShader));
    library.register(|| Box::new(ScrollingShader));
    library.register(|| Box::new(SlashShader));
    library
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordoplay_shader_graph::{MaterialBuilder, ParamType, TextureId};

    #[test]
    fn test_bundled_shaders() {
        let library = create_vfx_library();
        let names: Vec<_> = library.names().collect();
        assert_eq!(names, ["ExampleShader", "ScrollingShader", "SlashShader"]);
        assert_eq!(library.len(), 3);
        assert!(library.contains("SlashShader"));
        assert!(library.instantiate("PanningShader").is_none());
    }

    #[test]
    fn test_instances_do_not_share_values() {
        let library = create_vfx_library();
        let mut a = library.instantiate("ScrollingShader").unwrap();
        let b = library.instantiate("ScrollingShader").unwrap();
        a.set_parameter("speed_x", 3.0_f32).unwrap();
        assert_eq!(a.parameters().scalar("speed_x").unwrap(), 3.0);
        assert_eq!(b.parameters().scalar("speed_x").unwrap(), 1.0);
    }

    #[test]
    fn test_every_shader_builds_once_textures_are_assigned() {
        let library = create_vfx_library();
        let builder = MaterialBuilder::new();
        for name in library.names() {
            let mut instance = library.instantiate(name).unwrap();
            let textures: Vec<_> = instance
                .definition()
                .parameters()
                .decls()
                .filter(|decl| decl.param_type() == ParamType::Texture)
                .map(|decl| decl.name)
                .collect();
            for texture in textures {
                instance.set_parameter(texture, TextureId::new()).unwrap();
            }
            let material = builder.build(&mut instance).unwrap();
            assert_eq!(material.shader, name);
        }
    }
}
