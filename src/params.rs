//! Parameter definitions with documented semantics and defaults.
//!
//! Every tunable of the scene lives here as an explicit struct passed into
//! the generators and the choreographer at construction/update time. Changing
//! a value requires an explicit regenerate call by the caller; there is no
//! implicit reactive binding.

use glam::Vec3;

/// Scene composition parameters (particle look and cake palette)
#[derive(Debug, Clone)]
pub struct SceneParams {
    /// Total particle count N (all shapes share one buffer)
    pub particle_count: usize,

    /// Rendered sprite size in world units
    pub particle_size: f32,

    /// Cake rotation speed (buffer rotates by speed * 0.01 rad per tick)
    pub rotation_speed: f32,

    /// Breathing-scale oscillation speed (rad/s)
    pub sparkle_speed: f32,

    /// Cake sponge color (RGB in [0,1])
    pub cake_color: Vec3,

    /// Icing / frosting color
    pub icing_color: Vec3,

    /// Glow strength multiplier forwarded to the sprite shader
    pub bloom_intensity: f32,

    /// Luminance floor below which sprites get no extra glow
    pub bloom_threshold: f32,
}

impl Default for SceneParams {
    fn default() -> Self {
        Self {
            particle_count: 25_000,
            particle_size: 0.15,
            rotation_speed: 0.25,
            sparkle_speed: 1.2,
            cake_color: parse_hex_color("#2C1B18").unwrap(), // dark chocolate
            icing_color: parse_hex_color("#FFD700").unwrap(), // gold leaf
            bloom_intensity: 1.8,
            bloom_threshold: 0.15,
        }
    }
}

/// Countdown schedule: 3 (0s) -> 2 (1s) -> 1 (2s) -> cake (3s)
#[derive(Debug, Clone)]
pub struct CountdownParams {
    /// Seconds each digit stays on screen
    pub step_secs: f32,
}

impl Default for CountdownParams {
    fn default() -> Self {
        Self { step_secs: 1.0 }
    }
}

/// Candle life state-machine constants
#[derive(Debug, Clone)]
pub struct FlameParams {
    /// Wind below this threshold counts as "no breath" and lets the flame recover
    pub wind_threshold: f32,

    /// Life lost per sample is wind * decay_rate
    pub decay_rate: f32,

    /// Life regained per windless sample
    pub recovery_rate: f32,
}

impl Default for FlameParams {
    fn default() -> Self {
        Self {
            wind_threshold: 0.1,
            decay_rate: 0.15,
            recovery_rate: 0.005,
        }
    }
}

/// Per-tick choreography constants
#[derive(Debug, Clone)]
pub struct ChoreographyParams {
    /// Exponential smoothing factor toward the target field (per tick)
    pub lerp_factor: f32,

    /// Base flame position jitter; wind adds wind * flicker_wind_gain on top
    pub flicker_base: f32,

    /// Extra jitter per unit of wind
    pub flicker_wind_gain: f32,

    /// Horizontal target displacement per unit of wind
    pub wind_bend: f32,

    /// Smoke color decay toward black per tick
    pub smoke_fade_rate: f32,

    /// Horizontal sinusoidal smoke drift amplitude
    pub smoke_drift: f32,
}

impl Default for ChoreographyParams {
    fn default() -> Self {
        Self {
            lerp_factor: 0.08,
            flicker_base: 0.05,
            flicker_wind_gain: 0.5,
            wind_bend: 1.5,
            smoke_fade_rate: 0.03,
            smoke_drift: 0.005,
        }
    }
}

/// Breath analysis configuration.
///
/// Normalization works on a byte-scale spectrum: magnitudes are mapped from
/// dB into 0..255 before the noise floor and sensitivity divisor apply, so
/// the floor/divisor constants keep their conventional meaning.
#[derive(Debug, Clone)]
pub struct BreathParams {
    /// FFT window size (power of two; small for fast low-frequency reaction)
    pub fft_size: usize,

    /// Fraction of the lowest bins averaged as breath energy
    pub low_band_fraction: f32,

    /// Noise floor subtracted from the byte-scale average (0..255)
    pub noise_floor: f32,

    /// Divisor mapping floor-adjusted energy to full intensity
    pub sensitivity: f32,

    /// Temporal smoothing constant for spectrum magnitudes (0 = none)
    pub smoothing: f32,

    /// dB level mapped to byte value 0
    pub min_db: f32,

    /// dB level mapped to byte value 255
    pub max_db: f32,

    /// Analysis cadence in milliseconds (~one rendered frame)
    pub update_interval_ms: u64,
}

impl Default for BreathParams {
    fn default() -> Self {
        Self {
            fft_size: 256,
            low_band_fraction: 0.1,
            noise_floor: 12.0,
            sensitivity: 50.0,
            smoothing: 0.2,
            min_db: -100.0,
            max_db: -30.0,
            update_interval_ms: 16,
        }
    }
}

impl BreathParams {
    /// Number of low-frequency bins averaged (at least 2)
    pub fn low_band_bins(&self) -> usize {
        let bin_count = self.fft_size / 2;
        ((bin_count as f32 * self.low_band_fraction) as usize).max(2)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.fft_size.is_power_of_two() {
            return Err(format!(
                "FFT size must be power of 2, got {}",
                self.fft_size
            ));
        }
        if self.sensitivity <= 0.0 {
            return Err("Sensitivity must be > 0".to_string());
        }
        Ok(())
    }
}

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Field of view (degrees)
    pub fov_degrees: f32,

    /// Near clipping plane
    pub near_plane: f32,

    /// Far clipping plane
    pub far_plane: f32,

    /// Camera eye position (looks at the cake origin)
    pub camera_eye: Vec3,

    /// Vertical offset applied to the whole particle group
    pub group_offset_y: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            fov_degrees: 45.0,
            near_plane: 0.1,
            far_plane: 200.0,
            camera_eye: Vec3::new(0.0, 2.0, 9.0),
            group_offset_y: -1.2,
        }
    }
}

impl RenderConfig {
    pub fn aspect_ratio(&self) -> f32 {
        self.window_width as f32 / self.window_height as f32
    }
}

/// Recording mode configuration
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// Duration to record (seconds)
    pub duration_secs: f32,

    /// Output directory for frames
    pub output_dir: String,

    /// Frame rate (FPS)
    pub fps: u32,
}

impl RecordingConfig {
    pub fn new(duration_secs: f32) -> Self {
        Self {
            duration_secs,
            output_dir: "recording".to_string(),
            fps: 60,
        }
    }

    /// Total number of frames to capture
    pub fn total_frames(&self) -> usize {
        (self.duration_secs * self.fps as f32).ceil() as usize
    }

    /// Frame directory path
    pub fn frames_dir(&self) -> String {
        format!("{}/frames", self.output_dir)
    }
}

/// Parse a `#RRGGBB` hex color into RGB components in [0,1].
pub fn parse_hex_color(hex: &str) -> Option<Vec3> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Vec3::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
    ))
}
