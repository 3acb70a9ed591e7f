use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};
use crate::length::{Length, Orientation, PaperFormat, Unit};

pub const DEFAULT_SOURCE: &str = "booklet.md";
pub const DEFAULT_DESTINATION: &str = "booklet.pdf";
pub const DEFAULT_STYLESHEET: &str = "css/style.css";
pub const DEFAULT_PAGE_BORDER: Length = Length::new(1.0, Unit::In);
/// Pause before the rendered document is captured.
pub const DEFAULT_RENDER_DELAY: Duration = Duration::from_millis(2000);
/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "booklet.toml";

/// Everything a run needs, as read from `booklet.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub job: JobConfig,
    pub options: ConversionOptions,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobConfig {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from(DEFAULT_SOURCE),
            destination: PathBuf::from(DEFAULT_DESTINATION),
        }
    }
}

/// How a booklet is laid out and when it is captured.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionOptions {
    /// CSS applied while rendering. An empty string in TOML disables it.
    #[serde(deserialize_with = "empty_path_is_none")]
    pub stylesheet: Option<PathBuf>,
    /// Uniform margin on every page.
    pub page_border: Length,
    #[serde(rename = "render_delay_ms", deserialize_with = "millis")]
    pub render_delay: Duration,
    pub paper_format: PaperFormat,
    pub orientation: Orientation,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            stylesheet: Some(PathBuf::from(DEFAULT_STYLESHEET)),
            page_border: DEFAULT_PAGE_BORDER,
            render_delay: DEFAULT_RENDER_DELAY,
            paper_format: PaperFormat::default(),
            orientation: Orientation::default(),
        }
    }
}

fn empty_path_is_none<'de, D>(deserializer: D) -> std::result::Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let path = PathBuf::deserialize(deserializer)?;
    Ok((!path.as_os_str().is_empty()).then_some(path))
}

fn millis<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

impl Config {
    /// Load config from a TOML file. Keys left out keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::read(path, e, |path| Error::ConfigNotFound { path }))?;
        Self::parse(&content).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load `explicit` if given, else `booklet.toml` from the working
    /// directory if it exists, else the compiled defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let implicit = Path::new(DEFAULT_CONFIG_FILE);
        if implicit.is_file() {
            log::debug!("Using config file {}", implicit.display());
            Self::load(implicit)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_booklet_setup() {
        let config = Config::default();
        assert_eq!(config.job.source, Path::new("booklet.md"));
        assert_eq!(config.job.destination, Path::new("booklet.pdf"));
        assert_eq!(
            config.options.stylesheet.as_deref(),
            Some(Path::new("css/style.css"))
        );
        assert_eq!(config.options.page_border.to_string(), "1in");
        assert_eq!(config.options.render_delay, Duration::from_millis(2000));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::parse("[options]\nrender_delay_ms = 0\npaper_format = \"Letter\"\n")
            .unwrap();
        assert_eq!(config.options.render_delay, Duration::ZERO);
        assert_eq!(config.options.paper_format, PaperFormat::Letter);
        assert_eq!(config.options.page_border, DEFAULT_PAGE_BORDER);
        assert_eq!(config.job, JobConfig::default());
    }

    #[test]
    fn full_file() {
        let config = Config::parse(
            r#"
[job]
source = "docs/guide.md"
destination = "out/guide.pdf"

[options]
stylesheet = ""
page_border = "2cm"
orientation = "landscape"
"#,
        )
        .unwrap();
        assert_eq!(config.job.source, Path::new("docs/guide.md"));
        assert_eq!(config.options.stylesheet, None);
        assert_eq!(config.options.page_border, Length::new(2.0, Unit::Cm));
        assert_eq!(config.options.orientation, Orientation::Landscape);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::parse("[options]\npage_border = \"wide\"\n").is_err());
        assert!(Config::parse("[options]\nrender_delay_ms = -5\n").is_err());
        assert!(Config::parse("[options]\ncss_path = \"x.css\"\n").is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::discover(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }
}
