// SPDX-License-Identifier: MIT OR Apache-2.0
//! Composition helpers built from ordinary nodes.
//!
//! None of these carry state: each call returns a new sub-graph over the
//! context nodes it is given.

use crate::context::ShaderContext;
use crate::node::{GraphError, Node};
use crate::nodes::{mix, vec2};

/// UV with the V axis flipped, `(u, 1 - v)`
pub fn flipped_uv(ctx: &ShaderContext) -> Result<Node, GraphError> {
    let uv = &ctx.attributes.uv;
    vec2(uv.x()?, uv.y()?.one_minus()?)
}

/// Repeating phase in `[0, period)` driven by elapsed time
pub fn looping_phase(ctx: &ShaderContext, period: impl Into<Node>) -> Result<Node, GraphError> {
    ctx.time.elapsed.modulo(period)
}

/// One-shot phase over a particle's lifetime, `1 - energy^1.5`
pub fn particle_phase(ctx: &ShaderContext) -> Result<Node, GraphError> {
    ctx.particle.energy.pow(1.5)?.one_minus()
}

/// Remap a `[0, 1]` phase into `[-extent, extent]`
pub fn symmetric_offset(phase: impl Into<Node>, extent: f32) -> Result<Node, GraphError> {
    mix(-extent, extent, phase)
}

/// Binary mask of an already clamped value: below 1 becomes 0
pub fn binary_cutout(value: impl Into<Node>) -> Result<Node, GraphError> {
    value.into().floor()
}

/// Dissolve mask, `clamp(sample + amount, 0, 1)`
pub fn erosion(sample: impl Into<Node>, amount: impl Into<Node>) -> Result<Node, GraphError> {
    sample.into().add(amount)?.clamp(0.0, 1.0)
}

/// Time-animated, tiled UV coordinate: `coord * tile + speed * time`
///
/// Defaults: flipped UV coordinate, unit tile, elapsed time.
#[derive(Debug, Clone)]
pub struct Panner {
    speed: Node,
    tile: Option<Node>,
    coord: Option<Node>,
    time: Option<Node>,
}

/// Start a panner moving at `speed` UV units per time unit
pub fn panner(speed: impl Into<Node>) -> Panner {
    Panner {
        speed: speed.into(),
        tile: None,
        coord: None,
        time: None,
    }
}

impl Panner {
    /// Tile factor
    pub fn tile(mut self, tile: impl Into<Node>) -> Self {
        self.tile = Some(tile.into());
        self
    }

    /// Coordinate being panned
    pub fn coord(mut self, coord: impl Into<Node>) -> Self {
        self.coord = Some(coord.into());
        self
    }

    /// Phase override replacing elapsed time
    pub fn time(mut self, time: impl Into<Node>) -> Self {
        self.time = Some(time.into());
        self
    }

    /// Build the coordinate node
    pub fn build(self, ctx: &ShaderContext) -> Result<Node, GraphError> {
        let coord = match self.coord {
            Some(coord) => coord,
            None => flipped_uv(ctx)?,
        };
        let tile = match self.tile {
            Some(tile) => tile,
            None => vec2(1.0, 1.0)?,
        };
        let time = self.time.unwrap_or_else(|| ctx.time.elapsed.clone());
        coord.multiply(tile)?.add(self.speed.multiply_scalar(time)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{evaluate, EvaluationInputs};
    use crate::nodes::float;
    use crate::shape::Shape;

    const EPSILON: f32 = 1e-5;

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < EPSILON, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_flipped_uv() {
        let ctx = ShaderContext::new();
        let mut inputs = EvaluationInputs::new();
        inputs.uv = [0.25, 0.75];
        let value = evaluate(&flipped_uv(&ctx).unwrap(), &inputs).unwrap();
        assert_close(value.as_slice(), &[0.25, 0.25]);
    }

    #[test]
    fn test_panner_defaults() {
        let ctx = ShaderContext::new();
        let coord = panner(vec2(1.0, 0.0).unwrap()).build(&ctx).unwrap();
        assert_eq!(coord.shape(), Shape::Vec2);

        let mut inputs = EvaluationInputs::new().at_time(0.5);
        inputs.uv = [0.25, 0.75];
        let value = evaluate(&coord, &inputs).unwrap();
        assert_close(value.as_slice(), &[0.75, 0.25]);
    }

    #[test]
    fn test_panner_overrides() {
        let ctx = ShaderContext::new();
        let coord = panner(vec2(0.5, 1.0).unwrap())
            .tile(vec2(2.0, 3.0).unwrap())
            .coord(ctx.attributes.uv.clone())
            .time(float(2.0))
            .build(&ctx)
            .unwrap();

        let mut inputs = EvaluationInputs::new().at_time(100.0);
        inputs.uv = [0.5, 0.5];
        let value = evaluate(&coord, &inputs).unwrap();
        assert_close(value.as_slice(), &[2.0, 3.5]);
    }

    #[test]
    fn test_panner_rejects_scalar_time_shape() {
        let ctx = ShaderContext::new();
        let result = panner(vec2(1.0, 0.0).unwrap())
            .time(vec2(1.0, 1.0).unwrap())
            .build(&ctx);
        assert!(matches!(result, Err(GraphError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_particle_phase() {
        let ctx = ShaderContext::new();
        let phase = particle_phase(&ctx).unwrap();
        let mut inputs = EvaluationInputs::new();

        inputs.particle_energy = 1.0;
        assert!(evaluate(&phase, &inputs).unwrap().x().abs() < EPSILON);
        inputs.particle_energy = 0.0;
        assert!((evaluate(&phase, &inputs).unwrap().x() - 1.0).abs() < EPSILON);
        inputs.particle_energy = 0.25;
        assert!((evaluate(&phase, &inputs).unwrap().x() - 0.875).abs() < EPSILON);
    }

    #[test]
    fn test_symmetric_offset_of_looping_phase() {
        let ctx = ShaderContext::new();
        let offset = symmetric_offset(looping_phase(&ctx, 1.0).unwrap(), 0.95).unwrap();
        let at = |t: f32| evaluate(&offset, &EvaluationInputs::new().at_time(t)).unwrap().x();

        assert!((at(0.0) + 0.95).abs() < EPSILON);
        assert!(at(0.5).abs() < EPSILON);
        assert!((at(2.5) - at(0.5)).abs() < 1e-4);
    }

    #[test]
    fn test_erosion_and_cutout() {
        let inputs = EvaluationInputs::new();
        let eroded = |sample: f32, amount: f32| {
            evaluate(&erosion(sample, amount).unwrap(), &inputs).unwrap().x()
        };
        assert_eq!(eroded(0.3, -1.0), 0.0);
        assert!((eroded(0.8, -0.5) - 0.3).abs() < EPSILON);
        assert_eq!(eroded(0.8, 1.0), 1.0);

        let cut = |x: f32| {
            let node = binary_cutout(erosion(x, 0.0).unwrap()).unwrap();
            evaluate(&node, &inputs).unwrap().x()
        };
        assert_eq!(cut(0.5), 0.0);
        assert_eq!(cut(1.0), 1.0);
        assert_eq!(cut(3.0), 1.0);
    }
}
