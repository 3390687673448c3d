//! Recorded skeleton traces and their replay through the engine.
//!
//! A trace holds one s-expression frame per line:
//!
//! ```text
//! (:time-ms 33 :joints ((:id :head :x 0 :y -400 :z 1800 :screen-x 320 :screen-y 80))
//!  :depth "frame-0001.raw" :width 640 :height 480)
//! ```
//!
//! Blank lines and lines starting with `;` are skipped.  `:depth` is
//! optional and names a file of little-endian u16 samples, resolved
//! relative to the trace file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use lexpr::Value;
use tracing::{debug, info, warn};

use crate::dispatcher::Salut;
use crate::gesture::GestureId;
use crate::presence::{PresenceEvent, PresenceMonitor};
use crate::sexp::{get_int, get_keyword, get_value, list_items};
use crate::skeleton::{DepthFrame, Joint, JointId, SkeletonFrame};

/// Owned depth samples loaded from a trace.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthImage {
    pub data: Vec<u16>,
    pub width: u32,
    pub height: u32,
}

impl DepthImage {
    /// Decode little-endian u16 samples.
    pub fn from_le_bytes(bytes: &[u8], width: u32, height: u32) -> anyhow::Result<Self> {
        let expected = width as usize * height as usize * 2;
        if bytes.len() != expected {
            bail!(
                "depth image is {} bytes, expected {} for {}x{}",
                bytes.len(),
                expected,
                width,
                height
            );
        }
        let data = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn as_frame(&self) -> Option<DepthFrame<'_>> {
        DepthFrame::new(&self.data, self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraceFrame {
    pub time_ms: u64,
    pub skeleton: SkeletonFrame,
    pub depth: Option<DepthImage>,
}

// ── Parsing ────────────────────────────────────────────────

fn coordinate(value: &Value, key: &str) -> anyhow::Result<i32> {
    let n = get_int(value, key).ok_or_else(|| anyhow::anyhow!("joint is missing :{}", key))?;
    i32::try_from(n).map_err(|_| anyhow::anyhow!("joint :{} out of range: {}", key, n))
}

fn parse_joints(value: &Value) -> anyhow::Result<SkeletonFrame> {
    let mut skeleton = SkeletonFrame::new();
    let Some(joints) = get_value(value, "joints") else {
        return Ok(skeleton);
    };

    for item in list_items(joints) {
        let name = get_keyword(item, "id").ok_or_else(|| anyhow::anyhow!("joint without :id"))?;
        let Some(id) = JointId::from_name(&name) else {
            warn!(joint = %name, "trace: unknown joint skipped");
            continue;
        };
        let joint = Joint::new(
            coordinate(item, "x")?,
            coordinate(item, "y")?,
            coordinate(item, "z")?,
            coordinate(item, "screen-x")?,
            coordinate(item, "screen-y")?,
        );
        skeleton.set(id, joint);
    }
    Ok(skeleton)
}

fn load_depth(value: &Value, base_dir: &Path) -> anyhow::Result<Option<DepthImage>> {
    let Some(file) = get_keyword(value, "depth") else {
        return Ok(None);
    };
    let dimension = |key: &str| -> anyhow::Result<u32> {
        let n = get_int(value, key).ok_or_else(|| anyhow::anyhow!(":depth needs :{}", key))?;
        u32::try_from(n).map_err(|_| anyhow::anyhow!(":{} out of range: {}", key, n))
    };
    let (width, height) = (dimension("width")?, dimension("height")?);

    let path = base_dir.join(&file);
    let bytes = std::fs::read(&path)
        .map_err(|e| anyhow::anyhow!("failed to read depth {}: {}", path.display(), e))?;
    DepthImage::from_le_bytes(&bytes, width, height)
        .with_context(|| format!("in depth {}", path.display()))
        .map(Some)
}

/// Parse one frame.  Depth files are looked up under `base_dir`.
pub fn parse_frame(text: &str, base_dir: &Path) -> anyhow::Result<TraceFrame> {
    let value = lexpr::from_str(text).context("frame is not a valid s-expression")?;
    let time_ms = get_int(&value, "time-ms").ok_or_else(|| anyhow::anyhow!("frame is missing :time-ms"))?;
    let time_ms = u64::try_from(time_ms).map_err(|_| anyhow::anyhow!("negative :time-ms {}", time_ms))?;

    Ok(TraceFrame {
        time_ms,
        skeleton: parse_joints(&value)?,
        depth: load_depth(&value, base_dir)?,
    })
}

/// Parse a whole trace, one frame per line.
pub fn parse_trace(text: &str, base_dir: &Path) -> anyhow::Result<Vec<TraceFrame>> {
    let mut frames = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        let frame = parse_frame(line, base_dir).with_context(|| format!("trace line {}", n + 1))?;
        frames.push(frame);
    }
    debug!(frames = frames.len(), "trace parsed");
    Ok(frames)
}

/// Read a trace file.
pub fn load_trace(path: &Path) -> anyhow::Result<Vec<TraceFrame>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read trace {}", path.display()))?;
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_else(PathBuf::new);
    parse_trace(&text, &base_dir)
}

// ── Replay ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub frame: usize,
    pub time_ms: u64,
    pub gesture: GestureId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceChange {
    pub frame: usize,
    pub time_ms: u64,
    pub event: PresenceEvent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Frames handed to the engine (those with a head).
    pub frames_fed: usize,
    pub completions: Vec<Completion>,
    pub presence: Vec<PresenceChange>,
}

/// Feed a trace through the engine the way the live skeleton stream
/// does: only frames with a tracked head reach the classifiers, and
/// every frame updates presence.  Without `repeat` classification stops
/// after the first completion.
pub fn replay(
    salut: &mut Salut,
    presence: &mut PresenceMonitor,
    frames: &[TraceFrame],
    repeat: bool,
) -> ReplayReport {
    let mut report = ReplayReport::default();

    for (index, frame) in frames.iter().enumerate() {
        let has_head = frame.skeleton.contains(JointId::Head);
        if let Some(event) = presence.observe(has_head, frame.time_ms) {
            report.presence.push(PresenceChange {
                frame: index,
                time_ms: frame.time_ms,
                event,
            });
        }
        if !has_head {
            continue;
        }

        report.frames_fed += 1;
        let depth = frame.depth.as_ref().and_then(DepthImage::as_frame);
        let Some(gesture) = salut.feed(&frame.skeleton, depth.as_ref()) else {
            continue;
        };
        info!(frame = index, time_ms = frame.time_ms, gesture = %gesture, "replay: completion");
        report.completions.push(Completion {
            frame: index,
            time_ms: frame.time_ms,
            gesture,
        });
        if !repeat {
            salut.stop();
        }
    }
    report
}

#[cfg(test)]
fn head_line(time_ms: u64, x: i32) -> String {
    format!(
        "(:time-ms {} :joints ((:id :head :x {} :y -400 :z 1800 :screen-x 320 :screen-y 80)))",
        time_ms, x
    )
}
