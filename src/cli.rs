//! Command-line argument parsing.

use clap::Parser;

use crate::params::{parse_hex_color, RecordingConfig, SceneParams};

/// Command line arguments
#[derive(Parser, Debug, Default)]
#[command(name = "Candleglow")]
#[command(about = "Audio-reactive particle birthday cake", long_about = None)]
pub struct Args {
    /// Record the show to PNG frames (duration in seconds)
    #[arg(long, value_name = "SECONDS")]
    pub record: Option<f32>,

    /// Total particle count
    #[arg(long, value_name = "COUNT")]
    pub particles: Option<usize>,

    /// Sponge color as #RRGGBB
    #[arg(long, value_name = "HEX")]
    pub cake_color: Option<String>,

    /// Frosting color as #RRGGBB
    #[arg(long, value_name = "HEX")]
    pub icing_color: Option<String>,

    /// Cake rotation speed
    #[arg(long, value_name = "SPEED")]
    pub rotation_speed: Option<f32>,

    /// RNG seed for reproducible shapes (random if omitted)
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Skip microphone capture (candle only goes out manually)
    #[arg(long)]
    pub no_mic: bool,

    /// Skip the background melody
    #[arg(long)]
    pub no_music: bool,
}

impl Args {
    /// Build scene parameters from defaults plus command-line overrides.
    pub fn scene_params(&self) -> SceneParams {
        let mut scene = SceneParams::default();

        if let Some(count) = self.particles {
            scene.particle_count = count.max(1);
        }
        if let Some(speed) = self.rotation_speed {
            scene.rotation_speed = speed;
        }
        if let Some(ref hex) = self.cake_color {
            match parse_hex_color(hex) {
                Some(color) => scene.cake_color = color,
                None => eprintln!("Warning: invalid cake color '{}', using default", hex),
            }
        }
        if let Some(ref hex) = self.icing_color {
            match parse_hex_color(hex) {
                Some(color) => scene.icing_color = color,
                None => eprintln!("Warning: invalid icing color '{}', using default", hex),
            }
        }

        scene
    }

    /// Shape RNG seed (entropy-derived unless pinned on the command line).
    pub fn rng_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }

    /// Create recording configuration if recording mode is enabled
    pub fn create_recording_config(&self) -> Option<RecordingConfig> {
        self.record.map(|duration| {
            let config = RecordingConfig::new(duration);

            std::fs::create_dir_all(config.frames_dir())
                .expect("Failed to create frames directory");

            config
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_params_overrides() {
        let args = Args {
            particles: Some(5000),
            cake_color: Some("#112233".to_string()),
            rotation_speed: Some(1.5),
            ..Args::default()
        };

        let scene = args.scene_params();
        assert_eq!(scene.particle_count, 5000);
        assert_eq!(scene.rotation_speed, 1.5);
        assert_eq!(scene.cake_color, parse_hex_color("#112233").unwrap());
        // Untouched options keep their defaults
        assert_eq!(scene.icing_color, SceneParams::default().icing_color);
    }

    #[test]
    fn test_invalid_color_keeps_default() {
        let args = Args {
            cake_color: Some("not-a-color".to_string()),
            ..Args::default()
        };
        let scene = args.scene_params();
        assert_eq!(scene.cake_color, SceneParams::default().cake_color);
    }

    #[test]
    fn test_pinned_seed_is_stable() {
        let args = Args {
            seed: Some(99),
            ..Args::default()
        };
        assert_eq!(args.rng_seed(), 99);
    }
}
