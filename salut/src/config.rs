//! Engine configuration: every tuned threshold in one place.
//!
//! Overrides are keyword plists, the same shape [`SalutConfig::config_sexp`]
//! prints, e.g. `(:bow-min-movement 120 :hand-pose-run-length 6)`.

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use lexpr::Value;
use tracing::debug;

use crate::gesture::{BowConfig, CurtsyConfig, HandPoseConfig, KissConfig, WaveConfig};
use crate::hand_shape::HandShapeConfig;
use crate::presence::PresenceConfig;
use crate::sexp::{atom_string, flag, plist_entries};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalutConfig {
    pub bow: BowConfig,
    pub kiss: KissConfig,
    pub curtsy: CurtsyConfig,
    pub wave: WaveConfig,
    pub hand_pose: HandPoseConfig,
    pub hand_shape: HandShapeConfig,
    pub presence: PresenceConfig,
}

fn parse_number<T>(key: &str, value: &Value) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let text = atom_string(value).ok_or_else(|| anyhow!(":{} expects a number", key))?;
    text.parse()
        .map_err(|e| anyhow!(":{} expects a number, got {}: {}", key, text, e))
}

fn parse_flag(key: &str, value: &Value) -> anyhow::Result<bool> {
    match atom_string(value).as_deref() {
        Some("t") => Ok(true),
        Some("nil") => Ok(false),
        Some(other) => bail!(":{} expects t or nil, got {}", key, other),
        None => bail!(":{} expects t or nil", key),
    }
}

impl SalutConfig {
    /// Apply a plist of overrides.  Keys not listed in
    /// [`SalutConfig::config_sexp`] are rejected; keys before the bad one
    /// are already applied.
    pub fn apply_sexp(&mut self, value: &Value) -> anyhow::Result<()> {
        for (key, v) in plist_entries(value) {
            match key {
                "bow-min-movement" => self.bow.min_movement_mm = parse_number(key, v)?,
                "bow-min-forward" => self.bow.min_forward_mm = parse_number(key, v)?,
                "bow-max-drift" => self.bow.max_drift_mm = parse_number(key, v)?,

                "kiss-max-start-distance" => self.kiss.max_start_distance_mm = parse_number(key, v)?,
                "kiss-min-stride" => self.kiss.min_stride_mm = parse_number(key, v)?,
                "kiss-max-stride" => self.kiss.max_stride_mm = parse_number(key, v)?,

                "curtsy-min-movement" => self.curtsy.min_movement_mm = parse_number(key, v)?,
                "curtsy-max-depth-change" => self.curtsy.max_depth_change_mm = parse_number(key, v)?,
                "curtsy-min-height-change" => {
                    self.curtsy.min_height_change_mm = parse_number(key, v)?
                }
                "curtsy-hands-gate" => self.curtsy.hands_gate = parse_flag(key, v)?,

                "wave-min-hand-lift" => self.wave.min_hand_lift_mm = parse_number(key, v)?,

                "hand-pose-run-length" => self.hand_pose.run_length = parse_number(key, v)?,
                "hand-pose-min-head-separation" => {
                    self.hand_pose.min_head_separation_mm = parse_number(key, v)?
                }
                "hand-pose-horizontal-min-deg" => {
                    self.hand_pose.horizontal_min_deg = parse_number(key, v)?
                }
                "hand-pose-horizontal-max-deg" => {
                    self.hand_pose.horizontal_max_deg = parse_number(key, v)?
                }
                "praying-min-depth" => self.hand_pose.praying_min_depth = parse_number(key, v)?,
                "praying-vertical-margin-deg" => {
                    self.hand_pose.praying_vertical_margin_deg = parse_number(key, v)?
                }
                "praying-region-offset" => {
                    self.hand_pose.praying_region_offset_mm = parse_number(key, v)?
                }

                "hand-shape-near" => self.hand_shape.near_mm = parse_number(key, v)?,
                "hand-shape-far" => self.hand_shape.far_mm = parse_number(key, v)?,
                "hand-shape-reference-box" => self.hand_shape.reference_box = parse_number(key, v)?,
                "hand-shape-max-box" => self.hand_shape.max_box = parse_number(key, v)?,
                "hand-shape-depth-tolerance" => {
                    self.hand_shape.depth_tolerance_mm = parse_number(key, v)?
                }
                "hand-shape-median-radius" => self.hand_shape.median_radius = parse_number(key, v)?,
                "hand-shape-max-defect-angle-deg" => {
                    self.hand_shape.max_defect_angle_deg = parse_number(key, v)?
                }

                "presence-lookup-interval-ms" => {
                    self.presence.lookup_interval_ms = parse_number(key, v)?
                }

                other => bail!("unknown config key :{}", other),
            }
            debug!(key, "config override applied");
        }
        Ok(())
    }

    /// Parse and apply an override string.
    pub fn apply_str(&mut self, text: &str) -> anyhow::Result<()> {
        let value = lexpr::from_str(text).context("config overrides are not a valid s-expression")?;
        self.apply_sexp(&value)
    }

    /// Read and apply an override file.
    pub fn apply_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        self.apply_str(&text)
            .with_context(|| format!("in config {}", path.display()))
    }

    /// Generate s-expression for the full configuration.
    pub fn config_sexp(&self) -> String {
        format!(
            "(:bow-min-movement {} :bow-min-forward {} :bow-max-drift {} \
             :kiss-max-start-distance {} :kiss-min-stride {} :kiss-max-stride {} \
             :curtsy-min-movement {} :curtsy-max-depth-change {} :curtsy-min-height-change {} :curtsy-hands-gate {} \
             :wave-min-hand-lift {} \
             :hand-pose-run-length {} :hand-pose-min-head-separation {} :hand-pose-horizontal-min-deg {} :hand-pose-horizontal-max-deg {} \
             :praying-min-depth {} :praying-vertical-margin-deg {} :praying-region-offset {} \
             :hand-shape-near {} :hand-shape-far {} :hand-shape-reference-box {} :hand-shape-max-box {} :hand-shape-depth-tolerance {} :hand-shape-median-radius {} :hand-shape-max-defect-angle-deg {} \
             :presence-lookup-interval-ms {})",
            self.bow.min_movement_mm,
            self.bow.min_forward_mm,
            self.bow.max_drift_mm,
            self.kiss.max_start_distance_mm,
            self.kiss.min_stride_mm,
            self.kiss.max_stride_mm,
            self.curtsy.min_movement_mm,
            self.curtsy.max_depth_change_mm,
            self.curtsy.min_height_change_mm,
            flag(self.curtsy.hands_gate),
            self.wave.min_hand_lift_mm,
            self.hand_pose.run_length,
            self.hand_pose.min_head_separation_mm,
            self.hand_pose.horizontal_min_deg,
            self.hand_pose.horizontal_max_deg,
            self.hand_pose.praying_min_depth,
            self.hand_pose.praying_vertical_margin_deg,
            self.hand_pose.praying_region_offset_mm,
            self.hand_shape.near_mm,
            self.hand_shape.far_mm,
            self.hand_shape.reference_box,
            self.hand_shape.max_box,
            self.hand_shape.depth_tolerance_mm,
            self.hand_shape.median_radius,
            self.hand_shape.max_defect_angle_deg,
            self.presence.lookup_interval_ms,
        )
    }
}
