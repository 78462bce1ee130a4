// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bundled shader definitions.

pub mod example;
pub mod scrolling;
pub mod slash;

pub use example::ExampleShader;
pub use scrolling::ScrollingShader;
pub use slash::SlashShader;
