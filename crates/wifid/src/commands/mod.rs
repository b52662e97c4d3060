//! Command dispatch: bridges CLI args to core operations and output formatting.

pub mod classify;
pub mod conf;
pub mod config_cmd;
pub mod ctrl;
pub mod events;
pub mod util;

use clap::CommandFactory;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Classify(args) => classify::handle(&args, global),
        Command::Conf(args) => conf::handle(args, global),
        Command::Ctrl(args) => ctrl::handle(args, global).await,
        Command::CtrlStatus(args) => ctrl::status(args, global).await,
        Command::Events(args) => events::handle(args, global).await,
        Command::Config(args) => config_cmd::handle(&args, global),
        Command::Completions(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "wifid", &mut std::io::stdout());
            Ok(())
        }
    }
}
