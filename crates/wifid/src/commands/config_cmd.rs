//! `wifid config`: show, locate, and initialize the CLI config file.

use wifid_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util::{config_path, load_config};

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => show(global),
        ConfigCommand::Path => {
            output::print_output(&config_path(global).display().to_string(), global.quiet);
            Ok(())
        }
        ConfigCommand::Init { force } => init(global, force),
    }
}

fn show(global: &GlobalOpts) -> Result<(), CliError> {
    let config = load_config(global)?;
    let rendered = match global.output {
        OutputFormat::Json => output::render_json(&config, false)?,
        OutputFormat::JsonCompact => output::render_json(&config, true)?,
        OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&config)?,
    };
    output::print_output(rendered.trim_end(), global.quiet);
    Ok(())
}

fn init(global: &GlobalOpts, force: bool) -> Result<(), CliError> {
    let path = config_path(global);
    if path.exists() && !force {
        return Err(CliError::ConfigExists {
            path: path.display().to_string(),
        });
    }
    wifid_config::save_config_to(&Config::default(), &path)?;
    tracing::info!(path = %path.display(), "config initialized");
    if !global.quiet {
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}
