// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material manifest file format.
//!
//! A manifest lists the materials to bake: for each one, the shader to
//! instantiate from the library plus parameter and texture overrides.
//!
//! ```text
//! MaterialManifest(
//!     version: 1,
//!     materials: [
//!         (
//!             name: "sword_trail",
//!             shader: "SlashShader",
//!             overrides: { "masked": Boolean(true), "speed_u": Scalar(0.5) },
//!             textures: { "noise": ("67e55044-10b1-426f-9247-bb680e5fe0c8") },
//!         ),
//!     ],
//! )
//! ```

use indexmap::IndexMap;
use ordoplay_shader_graph::{ParamValue, ParameterError, ShaderInstance, TextureId};
use ordoplay_shader_vfx::ShaderLibrary;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current manifest format version
pub const MANIFEST_FORMAT_VERSION: u32 = 1;

/// Materials to bake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialManifest {
    /// Format version
    pub version: u32,
    /// Material entries in bake order
    #[serde(default)]
    pub materials: Vec<MaterialEntry>,
}

impl Default for MaterialManifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_FORMAT_VERSION,
            materials: Vec::new(),
        }
    }
}

/// One material to bake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialEntry {
    /// Material name
    pub name: String,
    /// Shader type name in the library
    pub shader: String,
    /// Parameter overrides
    #[serde(default)]
    pub overrides: IndexMap<String, ParamValue>,
    /// Texture assignments by parameter name
    #[serde(default)]
    pub textures: IndexMap<String, TextureId>,
}

impl MaterialEntry {
    /// Create an entry without overrides
    pub fn new(name: impl Into<String>, shader: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shader: shader.into(),
            overrides: IndexMap::new(),
            textures: IndexMap::new(),
        }
    }

    /// Add a parameter override
    pub fn with_override(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    /// Assign a texture
    pub fn with_texture(mut self, name: impl Into<String>, texture: TextureId) -> Self {
        self.textures.insert(name.into(), texture);
        self
    }

    /// Create the shader instance and apply overrides, then textures
    pub fn instantiate(&self, library: &ShaderLibrary) -> Result<ShaderInstance, ManifestError> {
        let mut instance =
            library
                .instantiate(&self.shader)
                .ok_or_else(|| ManifestError::UnknownShader {
                    material: self.name.clone(),
                    shader: self.shader.clone(),
                })?;

        let overrides = self.overrides.iter().map(|(name, value)| (name, *value));
        let textures = self.textures.iter().map(|(name, id)| (name, ParamValue::from(*id)));
        for (name, value) in overrides.chain(textures) {
            instance
                .set_parameter(name, value)
                .map_err(|source| ManifestError::Parameter {
                    material: self.name.clone(),
                    source,
                })?;
        }
        Ok(instance)
    }
}

impl MaterialManifest {
    /// Parse a manifest from RON text
    pub fn from_ron(content: &str) -> Result<Self, ManifestError> {
        let manifest: MaterialManifest = ron::from_str(content)?;

        if manifest.version > MANIFEST_FORMAT_VERSION {
            return Err(ManifestError::UnsupportedVersion {
                found: manifest.version,
                supported: MANIFEST_FORMAT_VERSION,
            });
        }

        Ok(manifest)
    }

    /// Serialize to RON text
    pub fn to_ron(&self) -> Result<String, ManifestError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Load a manifest from a file
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        let manifest = Self::from_ron(&content)?;
        tracing::info!(
            "Loaded manifest {} ({} materials)",
            path.display(),
            manifest.materials.len()
        );
        Ok(manifest)
    }

    /// Save the manifest to a file
    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}

/// Error while reading or applying a manifest
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed RON
    #[error("Invalid manifest: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Serialization failed
    #[error("Could not serialize manifest: {0}")]
    Serialize(#[from] ron::Error),

    /// Written by a newer tool
    #[error("Manifest version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Highest supported version
        supported: u32,
    },

    /// Shader not in the library
    #[error("{material}: unknown shader `{shader}`")]
    UnknownShader {
        /// Material name
        material: String,
        /// Requested shader
        shader: String,
    },

    /// An override was rejected
    #[error("{material}: {source}")]
    Parameter {
        /// Material name
        material: String,
        /// Parameter error
        source: ParameterError,
    },
}
