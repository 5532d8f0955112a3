//! Decorative geometry generator shown while a track plays.
//!
//! The visualiser never reads audio samples. Every tick synthesises a bell-shaped set
//! of pseudo features with a little noise and turns them into shapes for the current
//! [`VisualMode`], in a fixed 512x512 drawing space.

use crate::model::VisualMode;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::time::Duration;

pub const TICK_INTERVAL: Duration = Duration::from_millis(75);
pub const CANVAS_SIZE: f64 = 512.0;
pub const FEATURE_COUNT: usize = 30;

const CENTER: Point = Point {
    x: CANVAS_SIZE / 2.0,
    y: CANVAS_SIZE / 2.0,
};
const NOISE: f64 = 0.1;
const PULSE_STEP: u32 = 5;
const PULSE_WRAP: u32 = 50;
const ROTATION_STEP: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    fn rotated(self, degrees: f64) -> Self {
        if degrees == 0.0 {
            return self;
        }
        let (sin, cos) = degrees.to_radians().sin_cos();
        let dx = self.x - CENTER.x;
        let dy = self.y - CENTER.y;
        Self {
            x: CENTER.x + dx * cos - dy * sin,
            y: CENTER.y + dx * sin + dy * cos,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    fn clamped(r: f64, g: f64, b: f64) -> Self {
        Self(channel(r), channel(g), channel(b))
    }
}

fn channel(value: f64) -> u8 {
    value.trunc().clamp(0.0, 255.0) as u8
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Polygon { points: Vec<Point>, color: Rgb },
    Circle { center: Point, radius: f64, color: Rgb },
    Line { from: Point, to: Point, color: Rgb },
}

impl Shape {
    pub fn color(&self) -> Rgb {
        match self {
            Self::Polygon { color, .. } | Self::Circle { color, .. } | Self::Line { color, .. } => {
                *color
            }
        }
    }
}

/// One rendered refresh. Points are already rotated about the centre.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualFrame {
    pub mode: VisualMode,
    pub rotation: f64,
    pub shapes: Vec<Shape>,
}

pub struct Visualiser {
    mode: VisualMode,
    running: bool,
    shuffle_effect: bool,
    repeat_effect: bool,
    rotation: f64,
    pulse: u32,
    rng: SmallRng,
}

impl Default for Visualiser {
    fn default() -> Self {
        Self::new(VisualMode::default())
    }
}

impl Visualiser {
    pub fn new(mode: VisualMode) -> Self {
        Self::with_rng(mode, SmallRng::from_os_rng())
    }

    pub fn seeded(mode: VisualMode, seed: u64) -> Self {
        Self::with_rng(mode, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(mode: VisualMode, rng: SmallRng) -> Self {
        Self {
            mode,
            running: false,
            shuffle_effect: false,
            repeat_effect: false,
            rotation: 0.0,
            pulse: 0,
            rng,
        }
    }

    /// Begins refreshing, capturing the shuffle and repeat effects active at play time.
    pub fn start(&mut self, shuffle: bool, repeat: bool) {
        self.running = true;
        self.shuffle_effect = shuffle;
        self.repeat_effect = repeat;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> VisualMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: VisualMode) {
        self.mode = mode;
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Produces the next frame, or nothing when stopped or when the output is not playing.
    pub fn tick(&mut self, output_playing: bool, volume_percent: u8) -> Option<VisualFrame> {
        if !self.running || !output_playing {
            return None;
        }
        let features = self.features();
        Some(self.render(&features, f64::from(volume_percent) / 100.0))
    }

    fn features(&mut self) -> [f64; FEATURE_COUNT] {
        let mut features = [0.0; FEATURE_COUNT];
        let last = (FEATURE_COUNT - 1) as f64;
        for (index, feature) in features.iter_mut().enumerate() {
            let base = (PI * index as f64 / last).sin();
            *feature = (base + self.gaussian() * NOISE).abs();
        }
        features
    }

    // Box-Muller; the first uniform is shifted into (0, 1] so ln never sees zero.
    fn gaussian(&mut self) -> f64 {
        let u1 = 1.0 - self.rng.random::<f64>();
        let u2 = self.rng.random::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    pub fn render(&mut self, features: &[f64], volume: f64) -> VisualFrame {
        let mut volume = volume;
        if self.repeat_effect {
            self.pulse = (self.pulse + PULSE_STEP) % PULSE_WRAP;
            volume += f64::from(self.pulse) / 100.0;
        }
        if self.shuffle_effect {
            self.rotation = (self.rotation + ROTATION_STEP) % 360.0;
        }

        let shapes = match self.mode {
            VisualMode::Polygons => polygons(features, volume),
            VisualMode::Waves => waves(features, volume),
            VisualMode::Stars => stars(features, volume),
            VisualMode::Lines => lines(features, volume),
        };

        VisualFrame {
            mode: self.mode,
            rotation: self.rotation,
            shapes: shapes
                .into_iter()
                .map(|shape| rotate(shape, self.rotation))
                .collect(),
        }
    }
}

fn rotate(shape: Shape, degrees: f64) -> Shape {
    match shape {
        Shape::Polygon { points, color } => Shape::Polygon {
            points: points.into_iter().map(|p| p.rotated(degrees)).collect(),
            color,
        },
        Shape::Circle {
            center,
            radius,
            color,
        } => Shape::Circle {
            center: center.rotated(degrees),
            radius,
            color,
        },
        Shape::Line { from, to, color } => Shape::Line {
            from: from.rotated(degrees),
            to: to.rotated(degrees),
            color,
        },
    }
}

fn polygons(features: &[f64], volume: f64) -> Vec<Shape> {
    features
        .iter()
        .take(10)
        .map(|&feature| {
            let radius = (250.0 * feature * volume).trunc();
            let points = (0..6)
                .map(|k| {
                    let angle = (60.0 * f64::from(k)).to_radians();
                    Point {
                        x: CENTER.x + radius * angle.cos(),
                        y: CENTER.y + radius * angle.sin(),
                    }
                })
                .collect();
            Shape::Polygon {
                points,
                color: Rgb::clamped(volume * 255.0, feature * 255.0, (1.0 - feature) * 255.0),
            }
        })
        .collect()
}

fn waves(features: &[f64], volume: f64) -> Vec<Shape> {
    features
        .iter()
        .take(15)
        .enumerate()
        .map(|(index, &feature)| Shape::Circle {
            center: CENTER,
            radius: 50.0 + index as f64 * 15.0,
            color: Rgb::clamped(volume * 255.0, feature * 255.0, (1.0 - feature) * 255.0),
        })
        .collect()
}

fn stars(features: &[f64], volume: f64) -> Vec<Shape> {
    features
        .iter()
        .take(12)
        .enumerate()
        .map(|(index, &feature)| {
            let radius = (200.0 * feature * volume).trunc();
            let angle = (index as f64 * 30.0).to_radians();
            Shape::Line {
                from: CENTER,
                to: Point {
                    x: CENTER.x + radius * angle.cos(),
                    y: CENTER.y + radius * angle.sin(),
                },
                color: Rgb::clamped(
                    volume * 255.0,
                    feature * 200.0 + 50.0,
                    255.0 - (feature * 200.0).trunc(),
                ),
            }
        })
        .collect()
}

fn lines(features: &[f64], volume: f64) -> Vec<Shape> {
    features
        .iter()
        .take(15)
        .enumerate()
        .map(|(index, &feature)| {
            let half = 200.0 * feature * volume;
            let y = CENTER.y + (index as f64 - 7.0) * 20.0;
            Shape::Line {
                from: Point {
                    x: (CENTER.x - half).trunc(),
                    y,
                },
                to: Point {
                    x: (CENTER.x + half).trunc(),
                    y,
                },
                color: Rgb::clamped(
                    feature * 255.0,
                    volume * 255.0,
                    255.0 - (volume * 255.0).trunc(),
                ),
            }
        })
        .collect()
}
