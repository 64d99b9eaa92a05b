//! Prints the effective lifecycle configuration and where it was read from.

use clap::Parser;
use colored::Colorize;

use crate::{
    command::working_dir,
    internal::config::load_lifecycle_config,
    utils::path::{project_config, user_config},
};

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Also list the config files consulted, in precedence order
    #[arg(long)]
    pub show_origin: bool,
}

pub fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    let cwd = working_dir()?;
    if args.show_origin {
        let tiers = [Some(project_config(&cwd)), user_config()];
        for path in tiers.into_iter().flatten() {
            let marker = if path.exists() {
                "found".green()
            } else {
                "missing".dimmed()
            };
            println!("# {marker} {}", path.display());
        }
    }
    let config = load_lifecycle_config(&cwd);
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
