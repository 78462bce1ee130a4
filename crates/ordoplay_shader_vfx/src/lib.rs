// SPDX-License-Identifier: MIT OR Apache-2.0
//! VFX shaders for `OrdoPlay`.
//!
//! Shader definitions for effects, authored on top of
//! `ordoplay_shader_graph`:
//! - Vertex color preview
//! - Scrolling textures
//! - Slash trails with erosion, depth fade and refraction
//!
//! The [`ShaderLibrary`] maps shader names to definition factories so
//! tools can instantiate shaders by name.

pub mod library;
pub mod shaders;

pub use library::{create_vfx_library, ShaderFactory, ShaderLibrary};
pub use shaders::{ExampleShader, ScrollingShader, SlashShader};
