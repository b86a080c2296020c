//! Loader configuration.

use url::Url;

/// Tag of the container element whose children are definitions.
pub const DEFAULT_CONTAINER_TAG: &str = "imports";
/// Tag of a single component definition.
pub const DEFAULT_DEFINITION_TAG: &str = "component";

/// Configuration for a [`Loader`](crate::Loader).
///
/// ```
/// use sprig_loader::LoaderConfig;
///
/// let config = LoaderConfig::new()
///     .with_base_url("https://app.test/index.html".parse().unwrap())
///     .one_shot(true);
/// assert_eq!(config.container_tag, "imports");
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LoaderConfig {
    /// Document URL that relative sources resolve against and that defines the
    /// same-origin boundary. Without one every external source is cross-origin.
    pub base_url: Option<Url>,
    pub container_tag: String,
    pub definition_tag: String,
    /// Stop observing after the first batch from a container.
    pub one_shot: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            container_tag: DEFAULT_CONTAINER_TAG.to_string(),
            definition_tag: DEFAULT_DEFINITION_TAG.to_string(),
            one_shot: false,
        }
    }
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn with_container_tag(mut self, tag: impl Into<String>) -> Self {
        self.container_tag = tag.into().to_ascii_lowercase();
        self
    }

    pub fn with_definition_tag(mut self, tag: impl Into<String>) -> Self {
        self.definition_tag = tag.into().to_ascii_lowercase();
        self
    }

    pub fn one_shot(mut self, one_shot: bool) -> Self {
        self.one_shot = one_shot;
        self
    }

    /// Read a configuration from JSON. Missing keys take their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.base_url, None);
        assert_eq!(config.container_tag, "imports");
        assert_eq!(config.definition_tag, "component");
        assert!(!config.one_shot);
    }

    #[test]
    fn test_builder_lowercases_tags() {
        let config = LoaderConfig::new()
            .with_container_tag("Modules")
            .with_definition_tag("DEF")
            .one_shot(true);
        assert_eq!(config.container_tag, "modules");
        assert_eq!(config.definition_tag, "def");
        assert!(config.one_shot);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json() {
        let config =
            LoaderConfig::from_json(r#"{"base_url": "https://app.test/", "one_shot": true}"#)
                .unwrap();
        assert_eq!(config.base_url.unwrap().as_str(), "https://app.test/");
        assert!(config.one_shot);
        assert_eq!(config.definition_tag, "component");

        assert!(LoaderConfig::from_json(r#"{"base_url": "not a url"}"#).is_err());
    }
}
