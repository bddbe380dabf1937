use anyhow::Result;
use clap::ArgMatches;
use ::config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use vellum_core::config::{ExportConfig, SiteConfig};

/// Complete configuration that merges CLI args, env vars, config files, and defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VellumConfig {
    /// Build configuration
    pub build: BuildConfig,
    /// Site and export configuration (from vellum-core)
    #[serde(flatten)]
    pub core: vellum_core::config::Config,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Vault directory containing the markdown documents
    pub vault: String,
    /// Output directory for the generated site
    pub output: String,
    /// Theme directory; the built-in template is used when unset
    pub theme: Option<String>,
    /// Configuration file path
    pub config: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            vault: ".".to_string(),
            output: "./out".to_string(),
            theme: None,
            config: "./vellum.toml".to_string(),
        }
    }
}

impl Default for VellumConfig {
    fn default() -> Self {
        Self {
            build: BuildConfig::default(),
            core: vellum_core::config::Config::default(),
        }
    }
}

impl VellumConfig {
    /// Load configuration with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (VELLUM_*)
    /// 3. Configuration file
    /// 4. Defaults (lowest priority)
    pub fn load(args: &ArgMatches) -> Result<Self> {
        let config_file = args
            .get_one::<String>("config")
            .unwrap_or(&"./vellum.toml".to_string())
            .clone();

        let mut builder = ConfigBuilder::builder();

        // 1. Start with defaults
        let defaults = Self::default();
        builder = builder.add_source(ConfigBuilder::try_from(&defaults)?);

        // 2. Add configuration file if it exists
        if Path::new(&config_file).exists() {
            builder = builder.add_source(File::with_name(&config_file.replace(".toml", "")));
        }

        // 3. Add environment variables with VELLUM_ prefix
        builder = builder.add_source(
            Environment::with_prefix("VELLUM")
                .prefix_separator("_")
                .separator("__"), // Use double underscore for nested keys
        );

        // 4. Override with CLI arguments (highest priority)
        let mut cli_overrides = std::collections::HashMap::new();

        if let Some(vault) = args.get_one::<String>("vault") {
            cli_overrides.insert("build.vault".to_string(), vault.clone());
        }
        if let Some(config) = args.get_one::<String>("config") {
            cli_overrides.insert("build.config".to_string(), config.clone());
        }
        // Only override with CLI args that are actually defined for this command
        if let Some(output) = args.try_get_one::<String>("output").unwrap_or(None) {
            cli_overrides.insert("build.output".to_string(), output.clone());
        }
        if let Some(theme) = args.try_get_one::<String>("theme").unwrap_or(None) {
            cli_overrides.insert("build.theme".to_string(), theme.clone());
        }

        if !cli_overrides.is_empty() {
            builder = builder.add_source(ConfigBuilder::try_from(&cli_overrides)?);
        }

        // Build and deserialize
        let config = builder.build()?;
        let vellum_config: VellumConfig = config.try_deserialize()?;

        Ok(vellum_config)
    }

    /// Site presentation config for the template context
    pub fn site_config(&self) -> SiteConfig {
        self.core.site.clone().unwrap_or_default()
    }

    /// Engine options (index document, excludes, syntax theme)
    pub fn export_config(&self) -> ExportConfig {
        self.core.export.clone().unwrap_or_default()
    }

    /// Get the build configuration
    pub fn build_config(&self) -> &BuildConfig {
        &self.build
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, Command};

    #[test]
    fn test_default_config() {
        let config = VellumConfig::default();
        assert_eq!(config.build.vault, ".");
        assert_eq!(config.build.output, "./out");
        assert_eq!(config.build.theme, None);
        assert_eq!(config.build.config, "./vellum.toml");
    }

    #[test]
    fn test_cli_args_override() {
        let app = Command::new("test")
            .arg(Arg::new("vault").long("vault").value_name("DIR"))
            .arg(Arg::new("output").long("output").value_name("DIR"))
            .arg(Arg::new("theme").long("theme").value_name("DIR"))
            .arg(Arg::new("config").long("config").value_name("FILE"));

        let matches = app
            .try_get_matches_from(vec![
                "test",
                "--vault",
                "/custom/vault",
                "--output",
                "/custom/output",
            ])
            .unwrap();

        let config = VellumConfig::load(&matches).unwrap();
        assert_eq!(config.build.vault, "/custom/vault");
        assert_eq!(config.build.output, "/custom/output");
        // Should still have defaults for non-overridden values
        assert_eq!(config.build.theme, None);
    }
}
