//! Microphone breath detection.
//!
//! Captures a raw input stream and runs FFT analysis on a dedicated thread:
//! blowing produces a broadband low-frequency rumble, so the intensity is the
//! average energy of the lowest ~10% of bins, floor-subtracted and scaled
//! into [0,1]. The latest value is published through a shared cell; readers
//! see the most recent sample, possibly stale by up to one analysis tick.
//!
//! cpal delivers unprocessed device samples (no host noise suppression or
//! auto gain), which is what breath detection wants; echo cancellation of
//! our own music output is left to the operating system.
//!
//! Microphone access failing for any reason is recoverable: the signal
//! degrades to a permanently-zero intensity and the show goes on.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::params::BreathParams;

/// Live breath signal with its capture stream and analysis thread.
///
/// Dropping (or calling [`BreathSignal::stop`]) halts analysis and releases
/// the audio device; a disabled signal owns no resources and always reads 0.
pub struct BreathSignal {
    intensity: Arc<Mutex<f32>>,
    active: Arc<AtomicBool>,
    stream: Option<cpal::Stream>,
    analysis_thread: Option<thread::JoinHandle<()>>,
}

impl BreathSignal {
    /// Start capturing and analyzing the default input device.
    ///
    /// Never fails hard: if the device is missing, refuses to open, or uses
    /// an unsupported sample format, a warning is logged and a disabled
    /// signal is returned.
    pub fn start(params: BreathParams) -> Self {
        if let Err(e) = params.validate() {
            eprintln!("Breath analysis disabled: {}", e);
            return Self::disabled();
        }
        match Self::try_start(params) {
            Ok(signal) => signal,
            Err(e) => {
                eprintln!("Microphone unavailable ({}), candle is safe from breath", e);
                Self::disabled()
            }
        }
    }

    /// A signal that always reads zero (microphone denied or absent).
    pub fn disabled() -> Self {
        Self {
            intensity: Arc::new(Mutex::new(0.0)),
            active: Arc::new(AtomicBool::new(false)),
            stream: None,
            analysis_thread: None,
        }
    }

    fn try_start(params: BreathParams) -> Result<Self, String> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or("no input device found")?;

        let config = device
            .default_input_config()
            .map_err(|e| format!("failed to get input config: {}", e))?;

        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(format!(
                "unsupported input sample format {:?}",
                config.sample_format()
            ));
        }

        println!(
            "Breath input: {} @ {}Hz",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            config.sample_rate().0
        );

        let channels = config.channels() as usize;
        let capture_buffer = Arc::new(Mutex::new(Vec::<f32>::new()));
        let capture_clone = Arc::clone(&capture_buffer);

        // Keep only channel 0; breath energy is mono anyway
        let stream = device
            .build_input_stream(
                &config.into(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mut buf = capture_clone.lock().unwrap();
                    buf.extend(data.iter().step_by(channels));
                },
                |err| eprintln!("Breath input stream error: {}", err),
                None,
            )
            .map_err(|e| format!("failed to build input stream: {}", e))?;

        stream
            .play()
            .map_err(|e| format!("failed to start input stream: {}", e))?;

        let intensity = Arc::new(Mutex::new(0.0));
        let active = Arc::new(AtomicBool::new(true));
        let analysis_thread = spawn_analysis_thread(
            params,
            capture_buffer,
            Arc::clone(&intensity),
            Arc::clone(&active),
        );

        Ok(Self {
            intensity,
            active,
            stream: Some(stream),
            analysis_thread: Some(analysis_thread),
        })
    }

    /// Latest normalized breath intensity in [0,1].
    pub fn intensity(&self) -> f32 {
        *self.intensity.lock().unwrap()
    }

    /// Stop sampling and release the audio device. Consumes the handle, so
    /// release happens exactly once; the teardown in `Drop` covers handles
    /// that are never explicitly stopped.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        // Dropping the stream stops capture and releases the device handle
        self.stream.take();
        if let Some(handle) = self.analysis_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for BreathSignal {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawn the FFT analysis thread (runs until `active` clears).
fn spawn_analysis_thread(
    params: BreathParams,
    capture_buffer: Arc<Mutex<Vec<f32>>>,
    intensity: Arc<Mutex<f32>>,
    active: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(params.fft_size);
        let mut fft_data = vec![Complex::new(0.0f32, 0.0); params.fft_size];
        let mut smoothed = vec![0.0f32; params.low_band_bins()];

        while active.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(params.update_interval_ms));

            let mut buf = capture_buffer.lock().unwrap();
            if buf.len() < params.fft_size {
                continue;
            }

            for i in 0..params.fft_size {
                let window = hann_window(i, params.fft_size);
                fft_data[i] = Complex::new(buf[i] * window, 0.0);
            }

            // 50% overlap between analysis windows; also cap the backlog so
            // a slow tick cannot grow the buffer without bound
            buf.drain(0..params.fft_size / 2);
            let excess = buf.len().saturating_sub(params.fft_size * 4);
            if excess > 0 {
                buf.drain(0..excess);
            }
            drop(buf);

            fft.process(&mut fft_data);

            let byte_avg = low_band_byte_average(&fft_data, &mut smoothed, &params);
            *intensity.lock().unwrap() = normalize_intensity(byte_avg, &params);
        }
    })
}

/// Hann window function
fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

/// Average the lowest bins of the spectrum on the 0..255 byte scale, with
/// temporal smoothing of the underlying magnitudes.
fn low_band_byte_average(
    spectrum: &[Complex<f32>],
    smoothed: &mut [f32],
    params: &BreathParams,
) -> f32 {
    let bins = smoothed.len();
    let mut sum = 0.0;
    for i in 0..bins {
        let mag = spectrum[i].norm() / params.fft_size as f32;
        smoothed[i] = params.smoothing * smoothed[i] + (1.0 - params.smoothing) * mag;
        sum += magnitude_to_byte(smoothed[i], params);
    }
    sum / bins as f32
}

/// Map a linear magnitude onto the 0..255 dB byte scale.
fn magnitude_to_byte(magnitude: f32, params: &BreathParams) -> f32 {
    let db = 20.0 * magnitude.max(1e-10).log10();
    let scaled = 255.0 * (db - params.min_db) / (params.max_db - params.min_db);
    scaled.clamp(0.0, 255.0)
}

/// Normalize byte-scale breath energy into [0,1]: subtract the noise floor,
/// divide by the sensitivity constant, clamp.
pub fn normalize_intensity(byte_avg: f32, params: &BreathParams) -> f32 {
    ((byte_avg - params.noise_floor) / params.sensitivity).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_intensity_anchor_points() {
        let params = BreathParams::default();

        // Exactly at the noise floor -> silence
        assert_eq!(normalize_intensity(12.0, &params), 0.0);
        // floor + sensitivity -> full intensity
        assert_eq!(normalize_intensity(62.0, &params), 1.0);
        // Halfway
        assert!((normalize_intensity(37.0, &params) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_intensity_clamps() {
        let params = BreathParams::default();
        assert_eq!(normalize_intensity(0.0, &params), 0.0);
        assert_eq!(normalize_intensity(255.0, &params), 1.0);
    }

    #[test]
    fn test_magnitude_to_byte_monotonic_and_bounded() {
        let params = BreathParams::default();
        let quiet = magnitude_to_byte(1e-6, &params);
        let loud = magnitude_to_byte(0.1, &params);

        assert!(loud > quiet);
        assert!((0.0..=255.0).contains(&quiet));
        assert!((0.0..=255.0).contains(&loud));

        // Total silence pins to 0, clipping pins to 255
        assert_eq!(magnitude_to_byte(0.0, &params), 0.0);
        assert_eq!(magnitude_to_byte(10.0, &params), 255.0);
    }

    #[test]
    fn test_low_band_average_tracks_energy() {
        let params = BreathParams {
            smoothing: 0.0,
            ..BreathParams::default()
        };
        let bins = params.low_band_bins();

        let silent = vec![Complex::new(0.0f32, 0.0); params.fft_size];
        let mut smoothed = vec![0.0; bins];
        let quiet_avg = low_band_byte_average(&silent, &mut smoothed, &params);

        let mut rumble = silent.clone();
        for bin in rumble.iter_mut().take(bins) {
            *bin = Complex::new(params.fft_size as f32 * 0.05, 0.0);
        }
        let mut smoothed = vec![0.0; bins];
        let loud_avg = low_band_byte_average(&rumble, &mut smoothed, &params);

        assert!(loud_avg > quiet_avg);
    }

    #[test]
    fn test_disabled_signal_reads_zero() {
        let signal = BreathSignal::disabled();
        assert_eq!(signal.intensity(), 0.0);
        signal.stop(); // must be a harmless no-op
    }

    #[test]
    fn test_hann_window_shape() {
        let size = 256;
        assert!(hann_window(0, size).abs() < 0.01);
        assert!(hann_window(size - 1, size).abs() < 0.01);
        assert!((hann_window(size / 2, size) - 1.0).abs() < 0.01);
    }
}
