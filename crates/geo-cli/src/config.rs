use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use geo_core::SessionConfig;

/// Load session tunables from a TOML file; defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: SessionConfig =
        toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))?;
    tracing::debug!("loaded config from {}", path.display());
    Ok(config)
}

pub fn render_config(config: &SessionConfig) -> Result<String> {
    toml::to_string(config).context("failed to render config")
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_core::AnchorKind;

    #[test]
    fn test_missing_path_gives_defaults() {
        assert_eq!(load_config(None).unwrap(), SessionConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        fs::write(
            &path,
            r#"
localization_timeout = 30.0

[thresholds]
max_yaw_accuracy = 10.0

[anchor_kind]
type = "standard"
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.localization_timeout, 30.0);
        assert_eq!(config.thresholds.max_yaw_accuracy, 10.0);
        assert_eq!(config.thresholds.max_horizontal_accuracy, 20.0);
        assert_eq!(config.anchor_kind, AnchorKind::Standard);
        assert_eq!(config.history.capacity, 5);
    }

    #[test]
    fn test_rendered_config_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        fs::write(&path, render_config(&SessionConfig::default()).unwrap()).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), SessionConfig::default());
    }

    #[test]
    fn test_invalid_toml_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "localization_timeout = \"soon\"").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err}").contains("bad.toml"));
    }
}
