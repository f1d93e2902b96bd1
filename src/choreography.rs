//! Per-frame particle choreography.
//!
//! Owns the live particle buffer and relaxes it toward the most recent
//! target field by exponential smoothing. The buffer never snaps: digits
//! melt into the cake, the cake melts into the next digit. Flame particles
//! get extra physics (flicker, wind deflection, post-extinguish smoke), and
//! the whole field carries a slow rotation plus a breathing scale that the
//! renderer applies as a model transform.
//!
//! `advance` is one cooperative tick; the renderer reads the buffer between
//! ticks, so no synchronization is needed around it.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::flame::{CandleState, FlameData};
use crate::params::{ChoreographyParams, SceneParams};
use crate::shapes::{ParticleField, ParticleType, ShapeKind};

/// Half-extent of the initial scatter cube particles assemble from
const SCATTER_EXTENT: f32 = 25.0;

/// One live particle as uploaded to the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Particle {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

/// Fixed smoke velocity, assigned when a field is installed and used only
/// after the candle goes out.
#[derive(Debug, Clone, Copy)]
struct SmokeSeed {
    velocity: Vec3,
}

/// Live buffer plus the target field it converges toward.
pub struct Choreographer {
    particles: Vec<Particle>,
    target: ParticleField,
    shape: ShapeKind,
    smoke: Vec<SmokeSeed>,
    rotation_y: f32,
    breath_scale: f32,
    params: ChoreographyParams,
    rng: SmallRng,
}

impl Choreographer {
    /// Create a buffer of `count` particles scattered far from the origin,
    /// with the scatter itself as the initial target (nothing moves until a
    /// real shape is installed).
    pub fn new(count: usize, params: ChoreographyParams, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);

        let mut particles = Vec::with_capacity(count);
        let mut target = ParticleField {
            positions: Vec::with_capacity(count),
            colors: Vec::with_capacity(count),
            types: vec![ParticleType::Body; count],
        };

        for _ in 0..count {
            let pos = Vec3::new(
                (rng.gen::<f32>() - 0.5) * 2.0 * SCATTER_EXTENT,
                (rng.gen::<f32>() - 0.5) * 2.0 * SCATTER_EXTENT,
                (rng.gen::<f32>() - 0.5) * 2.0 * SCATTER_EXTENT,
            );
            particles.push(Particle {
                position: pos.to_array(),
                color: [1.0; 3],
            });
            target.positions.push(pos);
            target.colors.push(Vec3::ONE);
        }

        let smoke = (0..count).map(|_| random_smoke_seed(&mut rng)).collect();

        Self {
            particles,
            target,
            shape: ShapeKind::Glyph,
            smoke,
            rotation_y: 0.0,
            breath_scale: 1.0,
            params,
            rng,
        }
    }

    /// Install a freshly generated target field. The old target is replaced
    /// wholesale between ticks, so a tick never sees a mix of two shapes.
    /// Smoke velocities are re-rolled per field lifetime.
    pub fn set_target(&mut self, field: ParticleField, shape: ShapeKind) {
        debug_assert_eq!(field.len(), self.particles.len());
        self.target = field;
        self.shape = shape;
        for seed in &mut self.smoke {
            *seed = random_smoke_seed(&mut self.rng);
        }
    }

    pub fn shape(&self) -> ShapeKind {
        self.shape
    }

    /// Live buffer for the renderer (exactly N entries, always fully defined).
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Model transform combining the field rotation, the breathing scale and
    /// the scene's vertical offset.
    pub fn model_transform(&self, group_offset_y: f32) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, group_offset_y, 0.0))
            * Mat4::from_rotation_y(self.rotation_y)
            * Mat4::from_scale(Vec3::splat(self.breath_scale))
    }

    /// One choreography tick at elapsed time `time_s`.
    pub fn advance(
        &mut self,
        time_s: f32,
        flame: FlameData,
        candle: CandleState,
        scene: &SceneParams,
    ) {
        let k = self.params.lerp_factor;

        for i in 0..self.particles.len() {
            let ty = self.target.types[i];
            let mut t_pos = self.target.positions[i];
            let mut t_col = self.target.colors[i];

            if self.shape == ShapeKind::Cake && ty == ParticleType::Flame {
                if candle == CandleState::Extinguished {
                    self.advance_smoke(i, time_s);
                    continue;
                }

                // Dim with remaining life, flicker harder under wind
                t_col *= flame.life;

                let flicker = self.params.flicker_base + flame.wind * self.params.flicker_wind_gain;
                t_pos.x += (self.rng.gen::<f32>() - 0.5) * flicker;
                t_pos.y += (self.rng.gen::<f32>() - 0.5) * flicker * 2.0;
                t_pos.z += (self.rng.gen::<f32>() - 0.5) * flicker;

                if flame.wind > 0.01 {
                    // Bend off-axis and churn vertically before the candle
                    // actually goes out
                    t_pos.x += flame.wind * self.params.wind_bend;
                    t_pos.y += (time_s * 10.0 + i as f32).sin() * flame.wind * 0.5;
                }
            }

            let p = &mut self.particles[i];
            let pos = Vec3::from_array(p.position);
            let col = Vec3::from_array(p.color);
            p.position = (pos + (t_pos - pos) * k).to_array();
            p.color = (col + (t_col - col) * k).to_array();
        }

        // Whole-field motion: steady spin for the cake, a gentle sway for
        // digits, and a breathing scale throughout
        match self.shape {
            ShapeKind::Cake => self.rotation_y += scene.rotation_speed * 0.01,
            ShapeKind::Glyph => self.rotation_y = (time_s * 0.5).sin() * 0.1,
        }
        self.breath_scale = 1.0 + (time_s * scene.sparkle_speed).sin() * 0.02;
    }

    /// Post-extinguish smoke: ballistic rise with a sinusoidal side drift,
    /// fading to black. The target field is never consulted again for this
    /// particle within the current field lifetime.
    fn advance_smoke(&mut self, i: usize, time_s: f32) {
        let seed = self.smoke[i];
        let p = &mut self.particles[i];

        let mut pos = Vec3::from_array(p.position);
        pos += seed.velocity;
        pos.x += (time_s + i as f32).sin() * self.params.smoke_drift;
        p.position = pos.to_array();

        let fade = self.params.smoke_fade_rate;
        let col = Vec3::from_array(p.color);
        p.color = (col - Vec3::splat(fade)).max(Vec3::ZERO).to_array();
    }
}

/// Upward-biased smoke velocity with small random lateral components.
fn random_smoke_seed<R: Rng>(rng: &mut R) -> SmokeSeed {
    SmokeSeed {
        velocity: Vec3::new(
            (rng.gen::<f32>() - 0.5) * 0.05,
            0.02 + rng.gen::<f32>() * 0.05,
            (rng.gen::<f32>() - 0.5) * 0.05,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::generate_cake_shape;

    fn constant_field(count: usize, pos: Vec3, col: Vec3) -> ParticleField {
        ParticleField {
            positions: vec![pos; count],
            colors: vec![col; count],
            types: vec![ParticleType::Body; count],
        }
    }

    fn lit() -> FlameData {
        FlameData {
            life: 1.0,
            wind: 0.0,
        }
    }

    #[test]
    fn test_buffer_always_fully_defined() {
        let choreo = Choreographer::new(500, ChoreographyParams::default(), 1);
        assert_eq!(choreo.particles().len(), 500);
        for p in choreo.particles() {
            assert!(p.position.iter().all(|v| v.is_finite()));
            assert!(p.color.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_convergence_to_constant_target() {
        let mut choreo = Choreographer::new(200, ChoreographyParams::default(), 2);
        let target = Vec3::new(1.0, -2.0, 3.0);
        choreo.set_target(constant_field(200, target, Vec3::splat(0.5)), ShapeKind::Glyph);

        let scene = SceneParams::default();
        for frame in 0..300 {
            choreo.advance(frame as f32 / 60.0, lit(), CandleState::Lit, &scene);
        }

        for p in choreo.particles() {
            let pos = Vec3::from_array(p.position);
            assert!((pos - target).length() < 1e-3, "pos {:?} not converged", pos);
            let col = Vec3::from_array(p.color);
            assert!((col - Vec3::splat(0.5)).length() < 1e-3);
        }
    }

    #[test]
    fn test_convergence_follows_exponential_decay() {
        let mut choreo = Choreographer::new(10, ChoreographyParams::default(), 3);
        let target = Vec3::new(5.0, 0.0, 0.0);
        choreo.set_target(constant_field(10, target, Vec3::ZERO), ShapeKind::Glyph);

        let scene = SceneParams::default();
        let err0 = (Vec3::from_array(choreo.particles()[0].position) - target).length();

        let n = 20;
        for frame in 0..n {
            choreo.advance(frame as f32 / 60.0, lit(), CandleState::Lit, &scene);
        }

        let err_n = (Vec3::from_array(choreo.particles()[0].position) - target).length();
        let expected = err0 * (1.0f32 - 0.08).powi(n);
        assert!(
            (err_n - expected).abs() / expected < 1e-3,
            "error {} vs expected {}",
            err_n,
            expected
        );
    }

    #[test]
    fn test_smoke_fades_monotonically_to_black() {
        let mut choreo = Choreographer::new(3000, ChoreographyParams::default(), 4);
        let mut rng = SmallRng::seed_from_u64(4);
        let field = generate_cake_shape(3000, Vec3::X, Vec3::Y, &mut rng);
        let flame_indices: Vec<usize> = field
            .types
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == ParticleType::Flame)
            .map(|(i, _)| i)
            .collect();
        assert!(!flame_indices.is_empty());
        choreo.set_target(field, ShapeKind::Cake);

        let scene = SceneParams::default();
        let out = FlameData {
            life: 0.0,
            wind: 0.0,
        };

        let mut last_sums: Vec<f32> = flame_indices
            .iter()
            .map(|&i| choreo.particles()[i].color.iter().sum())
            .collect();

        for frame in 0..120 {
            choreo.advance(frame as f32 / 60.0, out, CandleState::Extinguished, &scene);
            for (slot, &i) in flame_indices.iter().enumerate() {
                let sum: f32 = choreo.particles()[i].color.iter().sum();
                assert!(
                    sum <= last_sums[slot] + 1e-6,
                    "smoke color must never brighten"
                );
                last_sums[slot] = sum;
            }
        }

        for &i in &flame_indices {
            let sum: f32 = choreo.particles()[i].color.iter().sum();
            assert!(sum.abs() < 1e-6, "smoke should have faded to black");
        }
    }

    #[test]
    fn test_smoke_ignores_target_and_rises() {
        let count = 2000;
        let mut choreo = Choreographer::new(count, ChoreographyParams::default(), 5);
        let mut rng = SmallRng::seed_from_u64(5);
        let field = generate_cake_shape(count, Vec3::X, Vec3::Y, &mut rng);
        let types = field.types.clone();
        choreo.set_target(field, ShapeKind::Cake);

        let scene = SceneParams::default();
        let out = FlameData {
            life: 0.0,
            wind: 0.0,
        };

        // Let the buffer settle near the cake first
        for frame in 0..100 {
            choreo.advance(frame as f32 / 60.0, lit(), CandleState::Lit, &scene);
        }

        let flame_idx = types
            .iter()
            .position(|t| *t == ParticleType::Flame)
            .unwrap();
        let before = Vec3::from_array(choreo.particles()[flame_idx].position);

        for frame in 100..200 {
            choreo.advance(frame as f32 / 60.0, out, CandleState::Extinguished, &scene);
        }

        let after = Vec3::from_array(choreo.particles()[flame_idx].position);
        // 100 ticks of at least 0.02/tick upward velocity
        assert!(after.y > before.y + 1.0, "smoke must rise away from target");
    }

    #[test]
    fn test_lit_flame_color_scales_with_life() {
        let count = 2000;
        let mut choreo = Choreographer::new(count, ChoreographyParams::default(), 6);
        let mut rng = SmallRng::seed_from_u64(6);
        let field = generate_cake_shape(count, Vec3::X, Vec3::Y, &mut rng);
        let types = field.types.clone();
        let colors = field.colors.clone();
        choreo.set_target(field, ShapeKind::Cake);

        let scene = SceneParams::default();
        let dim = FlameData {
            life: 0.5,
            wind: 0.0,
        };
        for frame in 0..300 {
            choreo.advance(frame as f32 / 60.0, dim, CandleState::Lit, &scene);
        }

        for (i, t) in types.iter().enumerate() {
            if *t == ParticleType::Flame {
                let col = Vec3::from_array(choreo.particles()[i].color);
                assert!((col - colors[i] * 0.5).length() < 1e-2);
            }
        }
    }

    #[test]
    fn test_cake_rotation_accumulates_glyph_oscillates() {
        let mut choreo = Choreographer::new(50, ChoreographyParams::default(), 7);
        let scene = SceneParams::default();

        choreo.set_target(
            constant_field(50, Vec3::ZERO, Vec3::ONE),
            ShapeKind::Cake,
        );
        for frame in 0..100 {
            choreo.advance(frame as f32 / 60.0, lit(), CandleState::Lit, &scene);
        }
        let spun = choreo.rotation_y;
        assert!((spun - scene.rotation_speed * 0.01 * 100.0).abs() < 1e-4);

        choreo.set_target(
            constant_field(50, Vec3::ZERO, Vec3::ONE),
            ShapeKind::Glyph,
        );
        for frame in 0..100 {
            choreo.advance(frame as f32 / 60.0, lit(), CandleState::Lit, &scene);
            assert!(choreo.rotation_y.abs() <= 0.1 + 1e-6);
        }

        // Breathing scale stays within its 2% envelope
        assert!((choreo.breath_scale - 1.0).abs() <= 0.02 + 1e-6);
    }

    #[test]
    fn test_set_target_replaces_wholesale() {
        let mut choreo = Choreographer::new(10, ChoreographyParams::default(), 8);
        choreo.set_target(constant_field(10, Vec3::ONE, Vec3::ONE), ShapeKind::Glyph);
        choreo.set_target(
            constant_field(10, Vec3::splat(9.0), Vec3::ZERO),
            ShapeKind::Cake,
        );

        assert_eq!(choreo.shape(), ShapeKind::Cake);
        assert!(choreo.target.positions.iter().all(|p| *p == Vec3::splat(9.0)));
    }

    #[test]
    fn test_restart_reclaims_smoke_particles() {
        let count = 2000;
        let mut choreo = Choreographer::new(count, ChoreographyParams::default(), 10);
        let mut rng = SmallRng::seed_from_u64(10);
        let field = generate_cake_shape(count, Vec3::X, Vec3::Y, &mut rng);
        let types = field.types.clone();
        choreo.set_target(field, ShapeKind::Cake);

        let scene = SceneParams::default();
        let out = FlameData {
            life: 0.0,
            wind: 0.0,
        };

        // Settle on the cake, then let the smoke rise and fade out fully
        for frame in 0..100 {
            choreo.advance(frame as f32 / 60.0, lit(), CandleState::Lit, &scene);
        }
        for frame in 100..250 {
            choreo.advance(frame as f32 / 60.0, out, CandleState::Extinguished, &scene);
        }

        let flame_idx = types
            .iter()
            .position(|t| *t == ParticleType::Flame)
            .unwrap();
        let smoke_pos = Vec3::from_array(choreo.particles()[flame_idx].position);
        let smoke_col = Vec3::from_array(choreo.particles()[flame_idx].color);
        assert!(smoke_pos.y > 5.0, "smoke should have drifted far upward");
        assert!(smoke_col.length() < 1e-6, "smoke should have faded to black");

        // Replay: candle relit, a fresh digit target installed. The former
        // smoke must rejoin the flock in both position and color.
        let target = Vec3::new(2.0, -1.0, 0.5);
        choreo.set_target(
            constant_field(count, target, Vec3::splat(0.8)),
            ShapeKind::Glyph,
        );
        for frame in 250..550 {
            choreo.advance(frame as f32 / 60.0, lit(), CandleState::Lit, &scene);
        }

        for p in choreo.particles() {
            let pos = Vec3::from_array(p.position);
            assert!(
                (pos - target).length() < 1e-3,
                "particle {:?} did not reconverge",
                pos
            );
            let col = Vec3::from_array(p.color);
            assert!((col - Vec3::splat(0.8)).length() < 1e-3);
        }
    }

    #[test]
    fn test_wind_bends_flame_targets() {
        let count = 2000;
        let mut choreo = Choreographer::new(count, ChoreographyParams::default(), 9);
        let mut rng = SmallRng::seed_from_u64(9);
        let field = generate_cake_shape(count, Vec3::X, Vec3::Y, &mut rng);
        let types = field.types.clone();
        choreo.set_target(field, ShapeKind::Cake);

        let scene = SceneParams::default();
        let gale = FlameData {
            life: 0.8,
            wind: 1.0,
        };
        for frame in 0..300 {
            choreo.advance(frame as f32 / 60.0, gale, CandleState::Lit, &scene);
        }

        // Average flame x should be pushed well off the candle axis
        let (sum, n) = types
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == ParticleType::Flame)
            .fold((0.0f32, 0usize), |(s, n), (i, _)| {
                (s + choreo.particles()[i].position[0], n + 1)
            });
        let mean_x = sum / n as f32;
        assert!(mean_x > 0.5, "mean flame x {} not deflected", mean_x);
    }
}
