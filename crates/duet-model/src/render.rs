//! Motion-to-video encoding.
//!
//! [`FfmpegRenderer`] rasterizes both skeletons as stick figures and pipes
//! raw RGB frames into an `ffmpeg` child process.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use image::{Rgb, RgbImage};
use tracing::debug;
use crate::motion::{Pose, NUM_JOINTS};
use crate::{MotionPair, RenderError};

pub trait VideoRenderer: Send + Sync {
    /// Encode `motion` into a video file at `output`, embedding `caption`.
    fn render(&self, motion: &MotionPair, caption: &str, output: &Path) -> Result<(), RenderError>;
}

/// Bones of the 22-joint body as chains of joint indices.
pub const KINEMATIC_CHAIN: [&[usize]; 5] = [
    &[0, 2, 5, 8, 11],
    &[0, 1, 4, 7, 10],
    &[0, 3, 6, 9, 12, 15],
    &[9, 14, 17, 19, 21],
    &[9, 13, 16, 18, 20],
];

const BACKGROUND: Rgb<u8> = Rgb([24, 24, 32]);
const AGENT_COLORS: [Rgb<u8>; 2] = [Rgb([230, 90, 80]), Rgb([80, 150, 230])];
const MARGIN: f32 = 0.1;

#[derive(Debug, Clone)]
pub struct FfmpegRenderer {
    program: PathBuf,
    width: u32,
    height: u32,
}

impl FfmpegRenderer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            width: 640,
            height: 480,
        }
    }

    /// Frame size, rounded down to even numbers for yuv420p.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = (width & !1).max(2);
        self.height = (height & !1).max(2);
        self
    }
}

impl VideoRenderer for FfmpegRenderer {
    fn render(&self, motion: &MotionPair, caption: &str, output: &Path) -> Result<(), RenderError> {
        let frames = motion.frame_count();
        if frames == 0 {
            return Err(RenderError::Empty);
        }
        let view = Viewport::fit(motion, self.width, self.height);

        let program = self.program.display().to_string();
        let mut child = Command::new(&self.program)
            .args(["-y", "-loglevel", "error", "-nostats"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24"])
            .args(["-s", &format!("{}x{}", self.width, self.height)])
            .args(["-r", &motion.fps.to_string()])
            .args(["-i", "-"])
            .args(["-metadata", &format!("title={caption}")])
            .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-movflags", "+faststart"])
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => RenderError::EncoderUnavailable(program.clone()),
                _ => RenderError::Io(e),
            })?;

        let written = match child.stdin.take() {
            Some(mut stdin) => (0..frames).try_for_each(|t| {
                let frame = draw_frame(&view, [&motion.agents[0].frames[t], &motion.agents[1].frames[t]]);
                stdin.write_all(frame.as_raw())
            }),
            None => Err(std::io::Error::other("encoder stdin unavailable")),
        };

        let result = child.wait_with_output()?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(RenderError::Encoder(format!("{program} exited with {}: {}", result.status, stderr.trim())));
        }
        written?;

        debug!(output = %output.display(), frames, "video encoded");
        Ok(())
    }
}

/// Orthographic front view (x right, y up) scaled to fit every frame of both agents.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    min_x: f32,
    max_y: f32,
    scale: f32,
    offset_x: f32,
    offset_y: f32,
    width: u32,
    height: u32,
}

impl Viewport {
    pub fn fit(motion: &MotionPair, width: u32, height: u32) -> Self {
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (f32::MAX, f32::MIN, f32::MAX, f32::MIN);
        for joint in motion.agents.iter().flat_map(|a| a.frames.iter()).flat_map(|p| p.iter()) {
            min_x = min_x.min(joint[0]);
            max_x = max_x.max(joint[0]);
            min_y = min_y.min(joint[1]);
            max_y = max_y.max(joint[1]);
        }
        if min_x > max_x {
            (min_x, max_x, min_y, max_y) = (-1.0, 1.0, 0.0, 2.0);
        }

        let span_x = (max_x - min_x).max(1e-3);
        let span_y = (max_y - min_y).max(1e-3);
        let usable_w = width as f32 * (1.0 - 2.0 * MARGIN);
        let usable_h = height as f32 * (1.0 - 2.0 * MARGIN);
        let scale = (usable_w / span_x).min(usable_h / span_y);

        Self {
            min_x,
            max_y,
            scale,
            offset_x: (width as f32 - span_x * scale) / 2.0,
            offset_y: (height as f32 - span_y * scale) / 2.0,
            width,
            height,
        }
    }

    pub fn project(&self, joint: &[f32; 3]) -> (i64, i64) {
        let x = self.offset_x + (joint[0] - self.min_x) * self.scale;
        let y = self.offset_y + (self.max_y - joint[1]) * self.scale;
        (x.round() as i64, y.round() as i64)
    }
}

pub fn draw_frame(view: &Viewport, poses: [&Pose; 2]) -> RgbImage {
    let mut img = RgbImage::from_pixel(view.width, view.height, BACKGROUND);

    for (pose, color) in poses.iter().zip(AGENT_COLORS) {
        let points: Vec<(i64, i64)> = pose.iter().map(|j| view.project(j)).collect();
        for chain in KINEMATIC_CHAIN {
            for bone in chain.windows(2) {
                draw_line(&mut img, points[bone[0]], points[bone[1]], color);
            }
        }
        for &(x, y) in points.iter().take(NUM_JOINTS) {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    put(&mut img, x + dx, y + dy, color);
                }
            }
        }
    }

    img
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Bresenham
fn draw_line(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        put(img, x, y, color);
        if (x, y) == to {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}
