use serde::Deserialize;
use std::path::PathBuf;

/// Effective agent configuration. Deserializes from the host's JSON config
/// blob; every bound has the upstream default so a partial blob is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Root of the one-shot source scan.
    pub working_directory: PathBuf,
    pub capture: CaptureConfig,
    /// Maximum level for agent diagnostics, applied through the proxy logger.
    pub log_level: String,
    /// Consumed by the external registration loop, not by the core: how long
    /// a breakpoint may stay armed before the loop reports it expired.
    pub breakpoint_expiration_sec: u64,
}

/// Bounds consumed by the state capturer.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureConfig {
    /// Hard cap on reported frames.
    pub max_frames: usize,
    /// Frames past this cap get their arguments and locals collapsed into a
    /// shared not-expanded table entry. Zero collapses every frame.
    pub max_expand_frames: usize,
    /// Cap on members materialized per compound value.
    pub max_properties: usize,
    /// Cap on rendered string length, excluding the truncation marker.
    pub max_string_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            working_directory: PathBuf::from("."),
            capture: CaptureConfig::default(),
            log_level: "warn".to_string(),
            breakpoint_expiration_sec: 600,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_frames: 20,
            max_expand_frames: 5,
            max_properties: 10,
            max_string_length: 100,
        }
    }
}

impl Config {
    pub fn log_level_filter(&self) -> log::LevelFilter {
        match self.log_level.as_str() {
            "off" => log::LevelFilter::Off,
            "error" => log::LevelFilter::Error,
            "warn" => log::LevelFilter::Warn,
            "debug" => log::LevelFilter::Debug,
            "trace" => log::LevelFilter::Trace,
            _ => log::LevelFilter::Info,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg: Config = serde_json::from_str(
            r#"{"workingDirectory": "/srv/app", "capture": {"maxProperties": 3}}"#,
        )
        .unwrap();

        assert_eq!(cfg.working_directory, PathBuf::from("/srv/app"));
        assert_eq!(cfg.capture.max_properties, 3);
        assert_eq!(cfg.capture.max_frames, 20);
        assert_eq!(cfg.capture.max_expand_frames, 5);
        assert_eq!(cfg.breakpoint_expiration_sec, 600);
    }
}
