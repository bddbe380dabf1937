use anyhow::Result;
use clap::Command;

mod cmd;
mod config;

fn main() -> Result<()> {
    let matches = Command::new("vellum")
        .about("Publish an Obsidian vault as a static HTML site")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(cmd::export::make_subcommand())
        .subcommand(cmd::check::make_subcommand())
        .get_matches();

    match matches.subcommand() {
        Some(("export", args)) => cmd::export::execute(args),
        Some(("check", args)) => cmd::check::execute(args),
        _ => unreachable!("subcommand is required"),
    }
}
