//! Background melody playback.
//!
//! A short Happy Birthday arrangement is synthesized with Glicol and pushed
//! through a cpal output stream. Playback is a thin collaborator: the show
//! works without it, so any output-device failure downgrades to a warning.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use glicol::Engine;
use std::sync::{Arc, Mutex};

/// Audio block size (samples per Glicol buffer)
const BLOCK_SIZE: usize = 128;

/// Happy Birthday lead over a soft plate reverb (seq values are MIDI notes,
/// 60 = middle C)
const MELODY: &str = r#"
~gate: speed 0.9 >> seq 67 67 69 67 72 71 _ 67 67 69 67 74 72 _ 67 67 79 76 72 71 69 _ 77 77 76 72 74 72 _
~amp: ~gate >> envperc 0.01 0.4
~pit: ~gate >> mul 261.63
~lead: saw ~pit >> mul ~amp >> lpf 2000.0 1.0 >> mul 0.1
o: ~lead >> plate 0.1
"#;

/// Melody playback handle; the stream stops when this is dropped.
pub struct MusicPlayer {
    _stream: cpal::Stream,
}

impl MusicPlayer {
    /// Start the melody on the default output device.
    pub fn start() -> Result<Self, String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or("no audio output device found")?;

        let config = device
            .default_output_config()
            .map_err(|e| format!("failed to get output config: {}", e))?;

        println!(
            "Music: {} @ {}Hz",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            config.sample_rate().0
        );

        let mut engine = Engine::<BLOCK_SIZE>::new();
        engine.set_sr(config.sample_rate().0 as usize);
        engine.update_with_code(MELODY);

        let engine = Arc::new(Mutex::new(engine));
        let engine_clone = Arc::clone(&engine);
        let channels = config.channels() as usize;

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut engine = engine_clone.lock().unwrap();

                    let frames_needed = data.len() / channels;
                    let mut frame_idx = 0;

                    while frame_idx < frames_needed {
                        let (buffers, _) = engine.next_block(vec![]);
                        let frames_to_copy = (frames_needed - frame_idx).min(BLOCK_SIZE);

                        for i in 0..frames_to_copy {
                            // Safety limiter: hard clip to +-0.5
                            let left = buffers[0][i].clamp(-0.5, 0.5);
                            let right = buffers[1][i].clamp(-0.5, 0.5);

                            let out = (frame_idx + i) * channels;
                            data[out] = left;
                            if channels > 1 {
                                data[out + 1] = right;
                            }
                            for extra in 2..channels {
                                data[out + extra] = 0.0;
                            }
                        }

                        frame_idx += frames_to_copy;
                    }
                },
                |err| eprintln!("Music stream error: {}", err),
                None,
            )
            .map_err(|e| format!("failed to build output stream: {}", e))?;

        stream
            .play()
            .map_err(|e| format!("failed to start output stream: {}", e))?;

        Ok(Self { _stream: stream })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_melody_compiles_in_engine() {
        // Engine setup needs no audio device, so the composition can be
        // validated headless
        let mut engine = Engine::<BLOCK_SIZE>::new();
        engine.set_sr(44_100);
        engine.update_with_code(MELODY);

        let (buffers, _) = engine.next_block(vec![]);
        assert_eq!(buffers[0].len(), BLOCK_SIZE);
    }
}
