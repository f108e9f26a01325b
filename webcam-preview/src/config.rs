use serde::Deserialize;
use thiserror::Error;

use crate::types::Size;
use crate::{IMG_HEIGHT, IMG_WIDTH};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid preview config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("content dimensions must be non-zero")]
    ZeroContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreviewConfig {
    /// Resolution the capture service delivers; fixes the displayed aspect
    /// ratio.
    pub content_width: u32,
    pub content_height: u32,
    /// Name given to the render thread.
    pub thread_name: String,
    /// Recompute the destination rect on every surface size change instead of
    /// keeping the one computed at construction.
    pub recompute_on_resize: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            content_width: IMG_WIDTH,
            content_height: IMG_HEIGHT,
            thread_name: "webcam-preview".to_owned(),
            recompute_on_resize: true,
        }
    }
}

impl PreviewConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content().is_empty() {
            return Err(ConfigError::ZeroContent);
        }
        Ok(())
    }

    pub fn content(&self) -> Size {
        Size::new(self.content_width, self.content_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(
            PreviewConfig::from_json("{}").unwrap(),
            PreviewConfig::default()
        );
    }

    #[test]
    fn fields_override_defaults() {
        let config = PreviewConfig::from_json(
            r#"{"contentWidth": 1280, "contentHeight": 720, "recomputeOnResize": false}"#,
        )
        .unwrap();
        assert_eq!(config.content(), Size::new(1280, 720));
        assert!(!config.recompute_on_resize);
        assert_eq!(config.thread_name, "webcam-preview");
    }

    #[test]
    fn zero_content_rejected() {
        assert!(matches!(
            PreviewConfig::from_json(r#"{"contentHeight": 0}"#),
            Err(ConfigError::ZeroContent)
        ));
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(matches!(
            PreviewConfig::from_json("{contentWidth"),
            Err(ConfigError::Json(_))
        ));
    }
}
