use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parsing(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parsing(e) => write!(f, "TOML parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Parsing(value)
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct Config {
    pub site: Option<SiteConfig>,
    pub export: Option<ExportConfig>,
}

impl Config {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&data)?;

        Ok(config)
    }
}

/// Presentation data handed to templates as the `site` context value.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct SiteConfig {
    pub title: Option<String>,
    pub tagline: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: Some("Notes".into()),
            tagline: None,
        }
    }
}

/// Knobs that change what the engine exports and how.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct ExportConfig {
    /// Vault path of the document published as `index.html` at the
    /// export root. Defaults to `index.md`/`README.md` when present.
    pub index: Option<String>,
    /// Glob patterns (relative to the vault root) excluded from export.
    pub exclude: Vec<String>,
    /// Syntect theme used for fenced code blocks.
    pub syntax_theme: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            index: None,
            exclude: Vec::new(),
            syntax_theme: "base16-ocean.dark".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_a_full_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[site]\ntitle = \"My Vault\"\n\n[export]\nindex = \"Start Here.md\"\nexclude = [\"private/**\"]\n"
        )
        .unwrap();

        let config = Config::read(file.path()).unwrap();
        let site = config.site.unwrap();
        let export = config.export.unwrap();
        assert_eq!(site.title.as_deref(), Some("My Vault"));
        assert_eq!(export.index.as_deref(), Some("Start Here.md"));
        assert_eq!(export.exclude, vec!["private/**".to_string()]);
        // Unset keys fall back to their defaults
        assert_eq!(export.syntax_theme, "base16-ocean.dark");
    }

    #[test]
    fn missing_sections_stay_none() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.site.is_none());
        assert!(config.export.is_none());
    }
}
