// SPDX-License-Identifier: MIT OR Apache-2.0
//! Baking manifest entries into materials.

use crate::manifest::{MaterialEntry, MaterialManifest};
use indexmap::IndexMap;
use ordoplay_shader_graph::{
    AlphaMode, ContextInput, Material, MaterialBuilder, MaterialId, ParamValue, RenderState,
    Shape, TextureBinding,
};
use ordoplay_shader_vfx::ShaderLibrary;
use serde::Serialize;

/// What the renderer needs to know about a baked material
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialSummary {
    /// Manifest entry name
    pub name: String,
    /// Shader type name
    pub shader: String,
    /// Built material ID
    pub id: MaterialId,
    /// Shape of the surface color
    pub color_shape: Shape,
    /// Whether an emissive output is present
    pub emissive: bool,
    /// Use of the alpha channel
    pub alpha_mode: AlphaMode,
    /// Render state flags
    pub render_state: RenderState,
    /// Number of program instructions
    pub instructions: usize,
    /// Material uniforms with their values
    pub parameters: IndexMap<String, ParamValue>,
    /// Bound textures
    pub textures: Vec<TextureBinding>,
    /// Context inputs read by the program
    pub inputs: Vec<ContextInput>,
}

impl MaterialSummary {
    /// Summarize a built material
    pub fn new(name: impl Into<String>, material: &Material) -> Self {
        let program = &material.program;
        Self {
            name: name.into(),
            shader: material.shader.clone(),
            id: material.id,
            color_shape: material.color_shape,
            emissive: material.emissive().is_some(),
            alpha_mode: material.alpha_mode(),
            render_state: material.render_state,
            instructions: program.len(),
            parameters: program.parameters().clone(),
            textures: program.textures().to_vec(),
            inputs: program.inputs().to_vec(),
        }
    }
}

/// Entry that could not be baked
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BakeFailure {
    /// Manifest entry name
    pub name: String,
    /// Error message
    pub error: String,
}

/// Result of baking a whole manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BakeReport {
    /// Successfully built materials
    pub materials: Vec<MaterialSummary>,
    /// Entries that failed
    pub failures: Vec<BakeFailure>,
}

impl BakeReport {
    /// Check if every entry was baked
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Bakes manifest entries with a shader library
pub struct Baker {
    library: ShaderLibrary,
    builder: MaterialBuilder,
}

impl Baker {
    /// Create a baker
    pub fn new(library: ShaderLibrary) -> Self {
        Self {
            library,
            builder: MaterialBuilder::new(),
        }
    }

    /// Bake a single entry
    pub fn bake_entry(&self, entry: &MaterialEntry) -> Result<Material, String> {
        let mut instance = entry.instantiate(&self.library).map_err(|e| e.to_string())?;
        self.builder
            .build(&mut instance)
            .map_err(|e| format!("{}: {e}", entry.name))
    }

    /// Bake every entry, collecting failures instead of stopping at the first
    pub fn bake(&self, manifest: &MaterialManifest) -> BakeReport {
        let mut report = BakeReport::default();
        for entry in &manifest.materials {
            match self.bake_entry(entry) {
                Ok(material) => {
                    tracing::debug!("Baked {} with {}", entry.name, entry.shader);
                    report.materials.push(MaterialSummary::new(&entry.name, &material));
                }
                Err(error) => {
                    tracing::warn!("Failed to bake {}: {}", entry.name, error);
                    report.failures.push(BakeFailure {
                        name: entry.name.clone(),
                        error,
                    });
                }
            }
        }
        tracing::info!(
            "Baked {} of {} materials",
            report.materials.len(),
            manifest.materials.len()
        );
        report
    }
}
