//! Candleglow library - audio-reactive particle birthday cake

pub mod breath;
pub mod camera;
pub mod choreography;
pub mod cli;
pub mod flame;
pub mod glyph;
pub mod music;
pub mod params;
pub mod rendering;
pub mod sequence;
pub mod shapes;
