use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use vellum_core::Exporter;

use crate::config::VellumConfig;

pub fn add_export_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("vault")
                .short('s')
                .long("vault")
                .value_name("DIR")
                .help("Vault directory containing the markdown documents")
                .default_value("."),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory for the generated site")
                .default_value("./out"),
        )
        .arg(
            Arg::new("theme")
                .short('t')
                .long("theme")
                .value_name("DIR")
                .help("Theme directory (built-in template when omitted)"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file")
                .default_value("./vellum.toml"),
        )
}

pub fn make_subcommand() -> Command {
    add_export_args(Command::new("export")).about("Export the vault to a static HTML site")
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    // Load cascading configuration
    let vellum_config = VellumConfig::load(args)?;
    let build = vellum_config.build_config();

    let mut builder = Exporter::builder()
        .vault_dir(&build.vault)
        .output_dir(&build.output)
        .site_config(vellum_config.site_config())
        .export_config(vellum_config.export_config());
    if let Some(theme) = &build.theme {
        builder = builder.theme_dir(theme);
    }

    let mut exporter = builder.build()?;
    let report = exporter.run()?;

    println!(
        "Exported {} pages and {} assets to {}",
        report.pages, report.assets, build.output
    );
    if report.broken_links > 0 {
        println!(
            "{} unresolved references were rendered as dead links",
            report.broken_links
        );
    }

    Ok(())
}
