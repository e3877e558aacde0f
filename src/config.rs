//! Settings consumed by the note engine.
//!
//! [`FlowSettings`] come from the settings provider and have no defaults: every
//! field must be supplied. [`EngineConfig`] holds construction-time tuning.

use serde::{Deserialize, Serialize};

/// Default number of note slots.
pub const DEFAULT_CAPACITY: usize = 2048;

/// Default cleanup cadence in frames.
pub const DEFAULT_CLEANUP_INTERVAL_FRAMES: u32 = 4;

/// Errors raised while loading or validating settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Flow speed must be finite and non-negative, got {0}")]
    InvalidSpeed(f32),
    #[error("Track height must be finite and positive, got {0}")]
    InvalidTrackHeight(f32),
    #[error("Capacity must be at least 1")]
    InvalidCapacity,
    #[error("Capacity {requested} exceeds the renderer's {available} instance slots")]
    CapacityExceedsRenderer { requested: usize, available: usize },
}

/// Which edge of the track fades notes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FadePosition {
    /// Follow the travel direction: top when flowing up, bottom when reversed.
    Auto,
    Top,
    Bottom,
    None,
}

impl FadePosition {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "top" => Some(Self::Top),
            "bottom" => Some(Self::Bottom),
            "none" | "off" | "disabled" => Some(Self::None),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::None => "none",
        }
    }

    /// Shader encoding, shared with `notes.wgsl`.
    pub fn shader_mode(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Top => 1,
            Self::Bottom => 2,
            Self::Auto => 3,
        }
    }

    /// Resolve `Auto` against the travel direction.
    ///
    /// Returns `None` when fading is disabled, otherwise whether the fade sits
    /// at the bottom edge of the track.
    pub fn fades_at_bottom(&self, reverse: bool) -> Option<bool> {
        match self {
            Self::None => None,
            Self::Top => Some(false),
            Self::Bottom => Some(true),
            Self::Auto => Some(reverse),
        }
    }
}

/// Flow settings pushed by the settings provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSettings {
    /// Flow rate in logical pixels per second.
    pub speed: f32,
    /// Track height in logical pixels.
    pub track_height: f32,
    /// Notes travel downward when set.
    pub reverse: bool,
    pub fade_position: FadePosition,
}

impl FlowSettings {
    /// Parse settings from the provider's JSON representation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err(ConfigError::InvalidSpeed(self.speed));
        }
        if !self.track_height.is_finite() || self.track_height <= 0.0 {
            return Err(ConfigError::InvalidTrackHeight(self.track_height));
        }
        Ok(())
    }
}

/// Construction-time engine tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Maximum number of live notes.
    pub capacity: usize,
    /// Run `cleanup` once every this many frames.
    pub cleanup_interval_frames: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            cleanup_interval_frames: DEFAULT_CLEANUP_INTERVAL_FRAMES,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidCapacity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_settings_from_provider_json() {
        let json = r#"{"speed":180,"trackHeight":150,"reverse":true,"fadePosition":"bottom"}"#;
        let settings = FlowSettings::from_json(json).unwrap();
        assert_eq!(settings.speed, 180.0);
        assert_eq!(settings.track_height, 150.0);
        assert!(settings.reverse);
        assert_eq!(settings.fade_position, FadePosition::Bottom);
    }

    #[test]
    fn test_flow_settings_require_every_field() {
        let json = r#"{"speed":180,"trackHeight":150,"reverse":false}"#;
        assert!(matches!(
            FlowSettings::from_json(json),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_flow_settings_validation() {
        let json = r#"{"speed":-1,"trackHeight":150,"reverse":false,"fadePosition":"auto"}"#;
        assert!(matches!(
            FlowSettings::from_json(json),
            Err(ConfigError::InvalidSpeed(_))
        ));
        let json = r#"{"speed":10,"trackHeight":0,"reverse":false,"fadePosition":"auto"}"#;
        assert!(matches!(
            FlowSettings::from_json(json),
            Err(ConfigError::InvalidTrackHeight(_))
        ));
    }

    #[test]
    fn test_fade_position_parsing() {
        assert_eq!(FadePosition::from_str("AUTO"), Some(FadePosition::Auto));
        assert_eq!(FadePosition::from_str("off"), Some(FadePosition::None));
        assert_eq!(FadePosition::from_str("left"), None);
        for fade in [
            FadePosition::Auto,
            FadePosition::Top,
            FadePosition::Bottom,
            FadePosition::None,
        ] {
            assert_eq!(FadePosition::from_str(fade.name()), Some(fade));
        }
    }

    #[test]
    fn test_auto_fade_follows_direction() {
        assert_eq!(FadePosition::Auto.fades_at_bottom(false), Some(false));
        assert_eq!(FadePosition::Auto.fades_at_bottom(true), Some(true));
        assert_eq!(FadePosition::Top.fades_at_bottom(true), Some(false));
        assert_eq!(FadePosition::None.fades_at_bottom(false), None);
    }

    #[test]
    fn test_engine_config_defaults_and_partial_json() {
        let config: EngineConfig = serde_json::from_str(r#"{"capacity":16}"#).unwrap();
        assert_eq!(config.capacity, 16);
        assert_eq!(config.cleanup_interval_frames, DEFAULT_CLEANUP_INTERVAL_FRAMES);
        assert!(EngineConfig { capacity: 0, ..Default::default() }.validate().is_err());
    }
}
