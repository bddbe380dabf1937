use anyhow::{bail, Result};
use clap::{Arg, ArgMatches, Command};
use vellum_core::Exporter;

use crate::config::VellumConfig;

pub fn make_subcommand() -> Command {
    Command::new("check")
        .about("Resolve every wiki reference and report the broken ones")
        .arg(
            Arg::new("vault")
                .short('s')
                .long("vault")
                .value_name("DIR")
                .help("Vault directory containing the markdown documents")
                .default_value("."),
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

pub fn execute(args: &ArgMatches) -> Result<()> {
    let vellum_config = VellumConfig::load(args)?;
    let build = vellum_config.build_config();

    let exporter = Exporter::builder()
        .vault_dir(&build.vault)
        .site_config(vellum_config.site_config())
        .export_config(vellum_config.export_config())
        .build()?;

    let broken = exporter.check()?;
    if broken.is_empty() {
        println!("All wiki references resolve");
        return Ok(());
    }

    for item in &broken {
        eprintln!("{}: [[{}]]", item.source, item.reference);
    }
    bail!("found {} broken references", broken.len());
}
