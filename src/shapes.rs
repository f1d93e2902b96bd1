//! Target particle field generation for the countdown digits and the cake.
//!
//! Both generators fill three index-locked arrays (position, color, type) of
//! exactly the requested particle count. A shuffled index permutation
//! decorrelates placement order from buffer order so regenerations disperse
//! evenly instead of sweeping across the buffer.

use glam::Vec3;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::glyph;

/// Glyph canvas resolution
const GLYPH_CANVAS: u32 = 256;

/// World-space extent of the glyph plane
const GLYPH_SCALE: f32 = 4.0;

/// Fraction of particles assigned to glyph strokes
const GLYPH_TEXT_FRACTION: f32 = 0.4;

/// Ambient cloud shell radius range
const CLOUD_RADIUS_MIN: f32 = 10.0;
const CLOUD_RADIUS_MAX: f32 = 30.0;

/// Faint gold dust for ambient cloud particles (#332200 dimmed)
const CLOUD_COLOR: Vec3 = Vec3::new(0.06, 0.04, 0.0);

/// Candle wax (#fffaee)
const CANDLE_COLOR: Vec3 = Vec3::new(1.0, 0.980, 0.933);

/// Outer flame (#ffaa00)
const FLAME_COLOR: Vec3 = Vec3::new(1.0, 0.667, 0.0);

/// White-hot flame core
const FLAME_CORE_COLOR: Vec3 = Vec3::ONE;

/// Role a particle plays within the current shape. Assigned at generation
/// and fixed until the next shape switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleType {
    Body,
    Icing,
    Candle,
    Flame,
    Text,
}

/// Which shape family the field describes (drives type-specific choreography)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Glyph,
    Cake,
}

/// One complete target field: three parallel arrays in lock-step by index.
#[derive(Debug, Clone)]
pub struct ParticleField {
    pub positions: Vec<Vec3>,
    pub colors: Vec<Vec3>,
    pub types: Vec<ParticleType>,
}

impl ParticleField {
    fn filled(count: usize) -> Self {
        Self {
            positions: vec![Vec3::ZERO; count],
            colors: vec![Vec3::ZERO; count],
            types: vec![ParticleType::Body; count],
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// One cylindrical cake tier
struct Tier {
    y_bottom: f32,
    height: f32,
    radius: f32,
}

const TIERS: [Tier; 3] = [
    Tier {
        y_bottom: -1.5,
        height: 1.0,
        radius: 2.0,
    },
    Tier {
        y_bottom: -0.5,
        height: 1.0,
        radius: 1.4,
    },
    Tier {
        y_bottom: 0.5,
        height: 1.0,
        radius: 0.9,
    },
];

const CANDLE_HEIGHT: f32 = 1.2;
const CANDLE_RADIUS: f32 = 0.15;
const FLAME_HEIGHT: f32 = 0.6;

/// Generate a digit/glyph field: 40% of particles trace the rasterized
/// strokes on a centered plane, the rest scatter onto a distant spherical
/// shell as ambient dust. If rasterization yields no strokes (unsupported
/// text), every particle falls back to the dust cloud.
pub fn generate_glyph_shape<R: Rng>(
    text: &str,
    count: usize,
    main_color: Vec3,
    rng: &mut R,
) -> ParticleField {
    let pixels = glyph::rasterize_text(text, GLYPH_CANVAS);

    let mut indices: Vec<usize> = (0..count).collect();
    indices.shuffle(rng);

    let mut field = ParticleField::filled(count);
    let text_limit = (count as f32 * GLYPH_TEXT_FRACTION) as usize;
    let canvas = GLYPH_CANVAS as f32;

    for (i, &idx) in indices.iter().enumerate() {
        if i < text_limit && !pixels.is_empty() {
            let (px, py) = pixels[i % pixels.len()];
            let u = px as f32 / canvas - 0.5;
            let v = py as f32 / canvas - 0.5;
            let depth = (rng.gen::<f32>() - 0.5) * 0.5;

            // Canvas y grows downward; flip into world up
            field.positions[idx] = Vec3::new(u * GLYPH_SCALE, -v * GLYPH_SCALE, depth);
            field.colors[idx] = main_color;
            field.types[idx] = ParticleType::Text;
        } else {
            field.positions[idx] = sample_cloud_shell(rng);
            field.colors[idx] = CLOUD_COLOR;
            field.types[idx] = ParticleType::Body;
        }
    }

    field
}

/// Uniform point on a spherical shell of radius U(10,30) via inverse-CDF
/// sampling.
fn sample_cloud_shell<R: Rng>(rng: &mut R) -> Vec3 {
    let r = CLOUD_RADIUS_MIN + rng.gen::<f32>() * (CLOUD_RADIUS_MAX - CLOUD_RADIUS_MIN);
    let theta = rng.gen::<f32>() * std::f32::consts::TAU;
    let phi = (2.0 * rng.gen::<f32>() - 1.0).acos();

    Vec3::new(
        r * phi.sin() * theta.cos(),
        r * phi.sin() * theta.sin(),
        r * phi.cos(),
    )
}

/// Generate the cake field: three stacked tiers (85% of the particles split
/// evenly), the remainder forming the candle shaft and the teardrop flame
/// above it.
pub fn generate_cake_shape<R: Rng>(
    count: usize,
    cake_color: Vec3,
    icing_color: Vec3,
    rng: &mut R,
) -> ParticleField {
    let mut field = ParticleField::filled(count);

    let mut indices: Vec<usize> = (0..count).collect();
    indices.shuffle(rng);
    let mut ptr = 0;

    let per_tier = (count as f32 * 0.85) as usize / TIERS.len();
    let candle_total = count - per_tier * TIERS.len();

    let mut write = |field: &mut ParticleField, pos: Vec3, color: Vec3, ty: ParticleType| {
        if ptr >= indices.len() {
            return;
        }
        let idx = indices[ptr];
        field.positions[idx] = pos;
        field.colors[idx] = color;
        field.types[idx] = ty;
        ptr += 1;
    };

    for tier in &TIERS {
        for _ in 0..per_tier {
            let is_icing = rng.gen::<f32>() < 0.7;
            if is_icing {
                let (pos, color, ty) = sample_icing(tier, icing_color, rng);
                write(&mut field, pos, color, ty);
            } else {
                let (pos, color, ty) = sample_tier_body(tier, cake_color, rng);
                write(&mut field, pos, color, ty);
            }
        }
    }

    // Candle shaft on top of the uppermost tier
    let top = &TIERS[TIERS.len() - 1];
    let candle_base_y = top.y_bottom + top.height;
    let shaft_count = (candle_total as f32 * 0.6) as usize;

    for _ in 0..shaft_count {
        let h = rng.gen::<f32>() * CANDLE_HEIGHT;
        let theta = rng.gen::<f32>() * std::f32::consts::TAU;
        let r = rng.gen::<f32>() * CANDLE_RADIUS;
        write(
            &mut field,
            Vec3::new(theta.cos() * r, candle_base_y + h, theta.sin() * r),
            CANDLE_COLOR,
            ParticleType::Candle,
        );
    }

    // Teardrop flame: radius shrinks with normalized height u
    let flame_base_y = candle_base_y + CANDLE_HEIGHT;
    let flame_count = candle_total - shaft_count;

    for _ in 0..flame_count {
        let u = rng.gen::<f32>();
        let theta = rng.gen::<f32>() * std::f32::consts::TAU;
        let h = u * FLAME_HEIGHT;
        let r = (1.0 - u) * 0.2 * (u * std::f32::consts::PI).sin();
        let color = if u > 0.3 { FLAME_COLOR } else { FLAME_CORE_COLOR };
        write(
            &mut field,
            Vec3::new(theta.cos() * r, flame_base_y + h, theta.sin() * r),
            color,
            ParticleType::Flame,
        );
    }

    debug_assert_eq!(ptr, count);
    field
}

/// Icing disk sample, density-correct in radius, with an occasional drip
/// down the tier's side edge.
fn sample_icing<R: Rng>(tier: &Tier, icing_color: Vec3, rng: &mut R) -> (Vec3, Vec3, ParticleType) {
    let r = rng.gen::<f32>().sqrt() * tier.radius;
    let theta = rng.gen::<f32>() * std::f32::consts::TAU;
    let thickness = 0.1;
    let mut y = tier.y_bottom + tier.height + rng.gen::<f32>() * thickness;

    let (x, z) = if r > tier.radius * 0.9 && rng.gen::<f32>() > 0.5 {
        // Rim particle drooping down the side
        y -= rng.gen::<f32>() * 0.4;
        (theta.cos() * tier.radius, theta.sin() * tier.radius)
    } else {
        (theta.cos() * r, theta.sin() * r)
    };

    (Vec3::new(x, y, z), icing_color, ParticleType::Icing)
}

/// Lateral cylinder-shell sample for the sponge body.
fn sample_tier_body<R: Rng>(
    tier: &Tier,
    cake_color: Vec3,
    rng: &mut R,
) -> (Vec3, Vec3, ParticleType) {
    let theta = rng.gen::<f32>() * std::f32::consts::TAU;
    let r = tier.radius - rng.gen::<f32>() * 0.1;
    let h = rng.gen::<f32>() * tier.height;

    (
        Vec3::new(theta.cos() * r, tier.y_bottom + h, theta.sin() * r),
        cake_color,
        ParticleType::Body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3Swizzles;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn field_is_fully_defined(field: &ParticleField, count: usize) {
        assert_eq!(field.positions.len(), count);
        assert_eq!(field.colors.len(), count);
        assert_eq!(field.types.len(), count);
        for i in 0..count {
            assert!(field.positions[i].is_finite(), "position {} not finite", i);
            assert!(field.colors[i].is_finite(), "color {} not finite", i);
            let c = field.colors[i];
            assert!(c.min_element() >= 0.0 && c.max_element() <= 1.0);
        }
    }

    #[test]
    fn test_glyph_shape_fully_defined() {
        let mut rng = SmallRng::seed_from_u64(7);
        let field = generate_glyph_shape("3", 5000, Vec3::new(1.0, 0.84, 0.0), &mut rng);
        field_is_fully_defined(&field, 5000);
    }

    #[test]
    fn test_glyph_shape_text_fraction() {
        let mut rng = SmallRng::seed_from_u64(7);
        let count = 5000;
        let field = generate_glyph_shape("3", count, Vec3::ONE, &mut rng);

        let text_particles = field
            .types
            .iter()
            .filter(|&&t| t == ParticleType::Text)
            .count();
        assert_eq!(text_particles, (count as f32 * 0.4) as usize);
    }

    #[test]
    fn test_glyph_shape_cloud_on_shell() {
        let mut rng = SmallRng::seed_from_u64(11);
        let field = generate_glyph_shape("1", 2000, Vec3::ONE, &mut rng);

        for (pos, ty) in field.positions.iter().zip(&field.types) {
            if *ty == ParticleType::Body {
                let r = pos.length();
                assert!((10.0..=30.0).contains(&r), "cloud radius {} off shell", r);
            }
        }
    }

    #[test]
    fn test_glyph_shape_falls_back_to_cloud() {
        let mut rng = SmallRng::seed_from_u64(3);
        let count = 1000;
        let field = generate_glyph_shape("@", count, Vec3::ONE, &mut rng);

        field_is_fully_defined(&field, count);
        assert!(field.types.iter().all(|&t| t == ParticleType::Body));
    }

    #[test]
    fn test_cake_shape_fully_defined() {
        let mut rng = SmallRng::seed_from_u64(42);
        let count = 10_007; // deliberately not divisible by tier count
        let field = generate_cake_shape(count, Vec3::new(0.2, 0.1, 0.1), Vec3::ONE, &mut rng);
        field_is_fully_defined(&field, count);
    }

    #[test]
    fn test_cake_shape_category_proportions() {
        let mut rng = SmallRng::seed_from_u64(42);
        let count = 10_000;
        let field = generate_cake_shape(count, Vec3::X, Vec3::Y, &mut rng);

        let mut body = 0usize;
        let mut icing = 0usize;
        let mut candle = 0usize;
        let mut flame = 0usize;
        for t in &field.types {
            match t {
                ParticleType::Body => body += 1,
                ParticleType::Icing => icing += 1,
                ParticleType::Candle => candle += 1,
                ParticleType::Flame => flame += 1,
                ParticleType::Text => panic!("no text particles in a cake"),
            }
        }

        let tier_total = (body + icing) as f32;
        let icing_ratio = icing as f32 / tier_total;
        assert!(
            (icing_ratio - 0.7).abs() < 0.03,
            "icing ratio {} outside tolerance",
            icing_ratio
        );

        // 85% to tiers, 60% of the remainder to the candle shaft
        assert_eq!(body + icing, (count as f32 * 0.85) as usize / 3 * 3);
        let candle_total = count - (body + icing);
        assert_eq!(candle, (candle_total as f32 * 0.6) as usize);
        assert_eq!(flame, candle_total - candle);
        assert!(flame > 0);
    }

    #[test]
    fn test_cake_flame_above_candle() {
        let mut rng = SmallRng::seed_from_u64(9);
        let field = generate_cake_shape(6000, Vec3::X, Vec3::Y, &mut rng);

        let flame_base = 0.5 + 1.0 + CANDLE_HEIGHT; // top tier rim + candle
        for (pos, ty) in field.positions.iter().zip(&field.types) {
            match ty {
                ParticleType::Flame => {
                    assert!(pos.y >= flame_base - 1e-4);
                    assert!(pos.y <= flame_base + FLAME_HEIGHT + 1e-4);
                }
                ParticleType::Candle => {
                    assert!(pos.xz().length() <= CANDLE_RADIUS + 1e-4);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_cake_flame_core_is_white() {
        let mut rng = SmallRng::seed_from_u64(13);
        let field = generate_cake_shape(6000, Vec3::X, Vec3::Y, &mut rng);
        let flame_base = 0.5 + 1.0 + CANDLE_HEIGHT;

        for (pos, (color, ty)) in field
            .positions
            .iter()
            .zip(field.colors.iter().zip(&field.types))
        {
            if *ty == ParticleType::Flame {
                let u = (pos.y - flame_base) / FLAME_HEIGHT;
                if u < 0.3 {
                    assert_eq!(*color, FLAME_CORE_COLOR);
                } else if u > 0.3 {
                    assert_eq!(*color, FLAME_COLOR);
                }
            }
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = generate_cake_shape(2000, Vec3::X, Vec3::Y, &mut SmallRng::seed_from_u64(5));
        let b = generate_cake_shape(2000, Vec3::X, Vec3::Y, &mut SmallRng::seed_from_u64(5));
        assert_eq!(a.positions, b.positions);
        assert_eq!(a.colors, b.colors);
    }
}
