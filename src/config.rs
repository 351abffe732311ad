use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;
use crate::pipeline::types::{
    CategoryMap, CategoryProfile, MotionStep, MotionTemplate, RotationMode, SortBin, SERVO_COUNT,
    SERVO_RANGE_MAX,
};

const SERVO_MAX: u16 = SERVO_RANGE_MAX;

/// Region-of-interest margins, as fractions of frame width/height. The ROI
/// is a centered rectangle of `margin_x * width` by `margin_y * height`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoiConfig {
    pub margin_x: f32,
    pub margin_y: f32,
}

/// Gripper rotation servo mapping. Servo values are raw units in the arm's
/// 0..=1000 range; `neutral` is the straight-gripper pose.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RotationConfig {
    pub servo_id: u8,
    pub neutral: u16,
    pub min: u16,
    pub max: u16,
    /// Orientation outside [adjust_min_deg, adjust_max_deg] is treated as
    /// unreliable and the gripper stays at neutral.
    pub adjust_min_deg: f64,
    pub adjust_max_deg: f64,
}

/// One fine-tune axis: which servo it drives and how pixels map to units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FineTuneAxis {
    pub servo_id: u8,
    pub neutral: u16,
    /// Servo units per pixel of offset. Sign is part of the calibration;
    /// the vertical axis is typically negative (camera y grows downward,
    /// the shoulder servo grows upward).
    pub factor: f64,
    pub deadzone_px: f64,
    pub max_delta: u16,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FineTuneConfig {
    pub enabled: bool,
    pub horizontal: FineTuneAxis,
    pub vertical: FineTuneAxis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConveyorConfig {
    pub host: String,
    pub port: u16,
    pub timeout_ms: u64,
    /// Pause after a stop command so the belt physically settles before the
    /// arm reaches in.
    pub settle_ms: u64,
    pub ensure_running_at_start: bool,
}

impl ConveyorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Which orientation estimator drives angle-aware picks. Both speak the
/// same trait; swapping them never touches the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrientationAlgorithm {
    Moments,
    RectFit,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IntakeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Templates {
    pub left: MotionTemplate,
    pub right: MotionTemplate,
}

impl Templates {
    pub fn for_bin(&self, bin: SortBin) -> &MotionTemplate {
        match bin {
            SortBin::Left => &self.left,
            SortBin::Right => &self.right,
        }
    }
}

/// Whole-process configuration. Built once at startup, validated, then
/// passed immutably to the coordinator; no component reads mutable globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    pub roi: RoiConfig,
    pub confidence_threshold: f32,
    pub stable_frames: u32,
    pub cooldown_secs: f64,
    /// Whether a stable target outside the ROI may trigger a pick. The
    /// conservative default only lets out-of-ROI candidates warm the
    /// stability counter up to 1.
    pub allow_out_of_roi_trigger: bool,
    pub orientation_algorithm: OrientationAlgorithm,
    pub conveyor: ConveyorConfig,
    pub rotation: RotationConfig,
    pub fine_tune: FineTuneConfig,
    pub categories: CategoryMap,
    pub templates: Templates,
    pub intake: IntakeConfig,
}

impl SortConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.cooldown_secs.max(0.0))
    }

    /// Layered load: built-in defaults, then an optional TOML file, then
    /// SORTBOT__* environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let defaults = config::Config::try_from(&SortConfig::default())?;
        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix("SORTBOT").separator("__"))
            .build()?;
        let loaded: SortConfig = settings.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Startup gate: a coordinator must never be constructed from a
    /// configuration that could fail mid-pick.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::ConfidenceThreshold(self.confidence_threshold));
        }
        if self.stable_frames == 0 {
            return Err(ConfigError::StabilityCount);
        }
        if self.categories.is_empty() {
            return Err(ConfigError::NoCategories);
        }

        Self::validate_servo_id(self.rotation.servo_id)?;
        Self::validate_servo_id(self.fine_tune.horizontal.servo_id)?;
        Self::validate_servo_id(self.fine_tune.vertical.servo_id)?;

        let r = &self.rotation;
        if !(r.min < r.neutral && r.neutral < r.max) {
            return Err(ConfigError::RotationRange {
                min: r.min,
                neutral: r.neutral,
                max: r.max,
            });
        }
        if r.max > SERVO_MAX {
            return Err(ConfigError::ServoPosition(r.max, SERVO_MAX));
        }
        if r.adjust_min_deg > r.adjust_max_deg {
            return Err(ConfigError::AdjustRange(r.adjust_min_deg, r.adjust_max_deg));
        }

        for axis in [&self.fine_tune.horizontal, &self.fine_tune.vertical] {
            if axis.neutral > SERVO_MAX {
                return Err(ConfigError::ServoPosition(axis.neutral, SERVO_MAX));
            }
        }

        for (_, profile) in self.categories.iter() {
            if profile.fixed_rotation > SERVO_MAX {
                return Err(ConfigError::ServoPosition(profile.fixed_rotation, SERVO_MAX));
            }
        }

        Self::validate_template("left", &self.templates.left)?;
        Self::validate_template("right", &self.templates.right)?;
        Ok(())
    }

    fn validate_servo_id(id: u8) -> Result<(), ConfigError> {
        if id == 0 || id as usize > SERVO_COUNT {
            return Err(ConfigError::ServoChannel(id, SERVO_COUNT));
        }
        Ok(())
    }

    fn validate_template(bin: &'static str, template: &MotionTemplate) -> Result<(), ConfigError> {
        if template.steps.is_empty() {
            return Err(ConfigError::EmptyTemplate(bin));
        }
        for step in &template.steps {
            for &pos in &step.positions {
                if pos > SERVO_MAX {
                    return Err(ConfigError::ServoPosition(pos, SERVO_MAX));
                }
            }
        }
        let len = template.steps.len();
        for &index in template.rotation_steps.iter().chain(&template.fine_tune_steps) {
            if index >= len {
                return Err(ConfigError::StepIndex { bin, index, len });
            }
        }
        Ok(())
    }
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            roi: RoiConfig {
                margin_x: 0.15,
                margin_y: 0.15,
            },
            confidence_threshold: 0.5,
            stable_frames: 5,
            cooldown_secs: 2.0,
            allow_out_of_roi_trigger: false,
            orientation_algorithm: OrientationAlgorithm::Moments,
            conveyor: ConveyorConfig {
                host: "10.0.0.94".to_string(),
                port: 9999,
                timeout_ms: 3000,
                settle_ms: 500,
                ensure_running_at_start: true,
            },
            rotation: RotationConfig {
                servo_id: 2,
                neutral: 500,
                min: 130,
                max: 875,
                adjust_min_deg: -35.0,
                adjust_max_deg: 35.0,
            },
            fine_tune: FineTuneConfig {
                enabled: true,
                horizontal: FineTuneAxis {
                    servo_id: 6,
                    neutral: 500,
                    factor: 0.15,
                    deadzone_px: 20.0,
                    max_delta: 100,
                },
                vertical: FineTuneAxis {
                    servo_id: 3,
                    neutral: 150,
                    factor: -0.10,
                    deadzone_px: 20.0,
                    max_delta: 80,
                },
            },
            categories: default_categories(),
            templates: default_templates(),
            intake: IntakeConfig {
                width: 1920,
                height: 1080,
                fps: 30,
            },
        }
    }
}

fn default_categories() -> CategoryMap {
    let mut entries = IndexMap::new();
    for label in ["plastic_bottle", "glass_bottle"] {
        entries.insert(
            label.to_string(),
            CategoryProfile {
                bin: SortBin::Left,
                rotation: RotationMode::AngleAware,
                fixed_rotation: 130,
            },
        );
    }
    entries.insert(
        "aluminum_can".to_string(),
        CategoryProfile {
            bin: SortBin::Left,
            rotation: RotationMode::Fixed,
            fixed_rotation: 130,
        },
    );
    for label in ["paper_cup", "chips_bag"] {
        entries.insert(
            label.to_string(),
            CategoryProfile {
                bin: SortBin::Right,
                rotation: RotationMode::Fixed,
                fixed_rotation: 130,
            },
        );
    }
    CategoryMap::new(entries)
}

fn default_templates() -> Templates {
    // Hand-tuned poses for the rig. Step order: home, reach, grip, lift,
    // swing to the bin, position above the drop, release, retract, home.
    let left = vec![
        MotionStep::new([250, 500, 300, 900, 700, 500], 1000),
        MotionStep::new([250, 500, 150, 660, 330, 500], 1000),
        MotionStep::new([600, 500, 150, 660, 330, 500], 1000),
        MotionStep::new([600, 500, 150, 660, 450, 500], 1000),
        MotionStep::new([600, 500, 150, 660, 450, 1000], 1000),
        MotionStep::new([600, 500, 125, 800, 475, 1000], 1000),
        MotionStep::new([250, 500, 125, 800, 475, 1000], 1000),
        MotionStep::new([250, 500, 125, 900, 700, 1000], 1000),
        MotionStep::new([250, 500, 300, 900, 700, 500], 2000),
    ];
    let right = vec![
        MotionStep::new([250, 500, 300, 900, 700, 500], 1000),
        MotionStep::new([250, 500, 150, 660, 330, 500], 1000),
        MotionStep::new([600, 500, 150, 660, 330, 500], 1000),
        MotionStep::new([600, 500, 150, 660, 450, 500], 1000),
        MotionStep::new([600, 500, 150, 660, 450, 0], 1000),
        MotionStep::new([600, 500, 125, 800, 475, 0], 1000),
        MotionStep::new([250, 500, 125, 800, 475, 0], 1000),
        MotionStep::new([250, 500, 125, 900, 700, 0], 1000),
        MotionStep::new([250, 500, 300, 900, 700, 500], 2000),
    ];
    Templates {
        left: MotionTemplate {
            steps: left,
            rotation_steps: vec![1, 2, 3],
            fine_tune_steps: vec![1, 2],
        },
        right: MotionTemplate {
            steps: right,
            rotation_steps: vec![1, 2, 3],
            fine_tune_steps: vec![1, 2],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        SortConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_rotation_servo_out_of_channel_range() {
        let mut cfg = SortConfig::default();
        cfg.rotation.servo_id = 7;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ServoChannel(7, _))
        ));
    }

    #[test]
    fn rejects_empty_template() {
        let mut cfg = SortConfig::default();
        cfg.templates.left.steps.clear();
        cfg.templates.left.rotation_steps.clear();
        cfg.templates.left.fine_tune_steps.clear();
        assert!(matches!(cfg.validate(), Err(ConfigError::EmptyTemplate("left"))));
    }

    #[test]
    fn rejects_step_index_out_of_range() {
        let mut cfg = SortConfig::default();
        cfg.templates.right.rotation_steps.push(42);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::StepIndex { bin: "right", index: 42, .. })
        ));
    }

    #[test]
    fn rejects_inverted_rotation_range() {
        let mut cfg = SortConfig::default();
        cfg.rotation.neutral = 100;
        assert!(matches!(cfg.validate(), Err(ConfigError::RotationRange { .. })));
    }

    #[test]
    fn rejects_confidence_outside_unit_interval() {
        let mut cfg = SortConfig::default();
        cfg.confidence_threshold = 1.5;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ConfidenceThreshold(_))
        ));
    }

    #[test]
    fn rejects_zero_stability_count() {
        let mut cfg = SortConfig::default();
        cfg.stable_frames = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::StabilityCount)));
    }

    #[test]
    fn toml_override_layers_on_defaults() {
        let toml = r#"
            confidence_threshold = 0.65
            stable_frames = 3

            [conveyor]
            host = "192.168.1.50"
            port = 9999
            timeout_ms = 1500
            settle_ms = 250
            ensure_running_at_start = false
        "#;
        let defaults = config::Config::try_from(&SortConfig::default()).unwrap();
        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap();
        let cfg: SortConfig = settings.try_deserialize().unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.confidence_threshold, 0.65);
        assert_eq!(cfg.stable_frames, 3);
        assert_eq!(cfg.conveyor.host, "192.168.1.50");
        // untouched sections keep their defaults
        assert_eq!(cfg.rotation.neutral, 500);
        assert_eq!(cfg.templates.left.steps.len(), 9);
    }
}
