//! Candleglow - an audio-reactive particle birthday cake.
//!
//! A countdown of particle digits assembles into a tiered cake with a lit
//! candle. Blow into the microphone (or press B) to put it out, watch the
//! smoke curl away, then press R to relight and replay.

mod breath;
mod camera;
mod choreography;
mod cli;
mod flame;
mod glyph;
mod music;
mod params;
mod rendering;
mod sequence;
mod shapes;

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use glam::Vec3;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use breath::BreathSignal;
use camera::CameraRig;
use choreography::Choreographer;
use cli::Args;
use flame::{CandleState, FlameState};
use music::MusicPlayer;
use params::*;
use rendering::{BackdropUniforms, RenderSystem, Uniforms};
use sequence::{AnimationPhase, Countdown};
use shapes::{generate_cake_shape, generate_glyph_shape, ShapeKind};

/// Countdown digit color (gold, #FFD700)
const GLYPH_COLOR: Vec3 = Vec3::new(1.0, 0.843, 0.0);

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Simulation systems
    choreographer: Choreographer,
    flame: FlameState,
    countdown: Countdown,
    camera: CameraRig,
    breath: Option<BreathSignal>,
    music: Option<MusicPlayer>,

    // Configuration
    scene: SceneParams,
    render_config: RenderConfig,
    breath_params: BreathParams,
    mic_enabled: bool,
    music_enabled: bool,

    // Time and show state
    rng: SmallRng,
    app_start: Instant,
    show_start: Option<Instant>,
    installed_phase: Option<AnimationPhase>,
    recording: Option<RecordingConfig>,
    frame_num: usize,
}

impl App {
    fn new(args: &Args) -> Self {
        let scene = args.scene_params();
        let seed = args.rng_seed();
        println!("Shape seed: {}", seed);

        let choreographer = Choreographer::new(
            scene.particle_count,
            ChoreographyParams::default(),
            seed,
        );

        Self {
            window: None,
            render_system: None,
            choreographer,
            flame: FlameState::new(FlameParams::default()),
            countdown: Countdown::new(CountdownParams::default()),
            camera: CameraRig::new(),
            breath: None,
            music: None,
            scene,
            render_config: RenderConfig::default(),
            breath_params: BreathParams::default(),
            mic_enabled: !args.no_mic,
            music_enabled: !args.no_music,
            rng: SmallRng::seed_from_u64(seed),
            app_start: Instant::now(),
            show_start: None,
            installed_phase: None,
            recording: args.create_recording_config(),
            frame_num: 0,
        }
    }

    /// Start (or restart) the whole sequence: relight the candle, rewind the
    /// countdown, and let the current particles morph into the first digit.
    fn begin_show(&mut self) {
        self.show_start = Some(Instant::now());
        self.installed_phase = None;
        self.flame.reset();
        self.breath = None; // drop releases the microphone
        self.music = None;
        println!("Counting down...");
    }

    /// Generate and install the target field for a phase; entering the cake
    /// phase arms the candle (microphone + music).
    fn install_phase(&mut self, phase: AnimationPhase) {
        let count = self.scene.particle_count;

        match phase.glyph_text() {
            Some(text) => {
                let field = generate_glyph_shape(text, count, GLYPH_COLOR, &mut self.rng);
                self.choreographer.set_target(field, ShapeKind::Glyph);
            }
            None => {
                let field = generate_cake_shape(
                    count,
                    self.scene.cake_color,
                    self.scene.icing_color,
                    &mut self.rng,
                );
                self.choreographer.set_target(field, ShapeKind::Cake);

                if self.music_enabled {
                    match MusicPlayer::start() {
                        Ok(player) => self.music = Some(player),
                        Err(e) => eprintln!("Music unavailable ({}), celebrating quietly", e),
                    }
                }
                if self.mic_enabled {
                    self.breath = Some(BreathSignal::start(self.breath_params.clone()));
                    println!("Blow gently into your microphone (or press B)...");
                }
            }
        }

        self.installed_phase = Some(phase);
    }

    /// Tear down the breath subscription and announce the extinguish.
    fn on_extinguished(&mut self) {
        if let Some(signal) = self.breath.take() {
            signal.stop();
        }
        println!("The candle is out. May all your wishes come true!");
    }

    /// Advance the show by one frame and render it. Returns `true` once a
    /// recording session has captured its final frame.
    fn render_frame(&mut self) -> bool {
        if self.render_system.is_none() {
            return false;
        }

        let time_s = self.app_start.elapsed().as_secs_f32();

        // Phase schedule
        if let Some(start) = self.show_start {
            let phase = self.countdown.phase_at(start.elapsed().as_secs_f32());
            if self.installed_phase != Some(phase) {
                self.install_phase(phase);
            }
        }

        // Feed the flame the latest breath sample while the candle is lit
        if self.installed_phase == Some(AnimationPhase::Cake)
            && self.flame.state() == CandleState::Lit
        {
            let wind = self.breath.as_ref().map_or(0.0, |b| b.intensity());
            if self.flame.apply_sample(wind) {
                self.on_extinguished();
            }
        }

        // Choreography tick
        let extinguished = self.flame.state() == CandleState::Extinguished;
        self.choreographer
            .advance(time_s, self.flame.data(), self.flame.state(), &self.scene);
        self.camera
            .advance(extinguished && self.installed_phase == Some(AnimationPhase::Cake));

        // Matrices: model carries rotation + breathing scale; billboard axes
        // must be expressed in model space
        let (view_proj, right_w, up_w) = self.camera.view_proj(&self.render_config);
        let model = self
            .choreographer
            .model_transform(self.render_config.group_offset_y);
        let model_inv = model.inverse();

        let render_system = self.render_system.as_mut().unwrap();
        render_system.update_particles(self.choreographer.particles());
        render_system.update_uniforms(&Uniforms {
            view_proj: (view_proj * model).to_cols_array_2d(),
            camera_right: model_inv.transform_vector3(right_w).to_array(),
            particle_size: self.scene.particle_size,
            camera_up: model_inv.transform_vector3(up_w).to_array(),
            time: time_s,
            bloom_intensity: self.scene.bloom_intensity,
            bloom_threshold: self.scene.bloom_threshold,
            _padding: [0.0; 2],
        });
        render_system.update_backdrop_uniforms(&BackdropUniforms {
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            time: time_s,
            _padding: [0.0; 3],
        });

        if let Err(e) = render_system.render(self.frame_num) {
            eprintln!("Render error: {:?}", e);
        }
        self.frame_num += 1;

        match self.recording {
            Some(ref config) => self.frame_num >= config.total_frames(),
            None => false,
        }
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &winit::event_loop::ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let window_attributes = Window::default_attributes()
            .with_title("Candleglow - Happy Birthday")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = Arc::new(event_loop.create_window(window_attributes).unwrap());

        let render_system = pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            self.scene.particle_count,
            self.recording.clone(),
        ))
        .unwrap();

        println!("\nCandleglow is running!");
        println!("  SPACE  celebrate");
        println!("  B      blow out the candle");
        println!("  R      relight and replay");
        println!("  ESC    quit\n");

        self.window = Some(window);
        self.render_system = Some(render_system);

        // Recording mode starts the show immediately
        if self.recording.is_some() {
            self.begin_show();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                self.render_config.window_width = size.width;
                self.render_config.window_height = size.height;
                if let Some(ref mut render_system) = self.render_system {
                    render_system.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        ..
                    },
                ..
            } => match code {
                KeyCode::Escape => event_loop.exit(),
                KeyCode::Space => {
                    if self.show_start.is_none() {
                        self.begin_show();
                    }
                }
                KeyCode::KeyR => self.begin_show(),
                KeyCode::KeyB => {
                    if self.installed_phase == Some(AnimationPhase::Cake)
                        && self.flame.blow_out()
                    {
                        self.on_extinguished();
                    }
                }
                _ => {}
            },
            WindowEvent::RedrawRequested => {
                if self.render_frame() {
                    println!("Recording finished ({} frames)", self.frame_num);
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }
}

fn main() {
    println!("Candleglow - particle birthday cake");

    let args = Args::parse();
    let mut app = App::new(&args);

    let event_loop = EventLoop::new().unwrap();
    let _ = event_loop.run_app(&mut app);
}
