pub mod handlers;

use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("kg")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run plugin commands across the packages of a monorepo")
        .after_help(
            "Commands are discovered from installed packages that ship a kg.json manifest.\n\
             Built-in commands: packages, config, create.\n\
             Every command accepts --all|-a and --package|-p <id>.",
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Log debug output and print full error details"),
        )
        .arg(
            Arg::new("directory")
                .short('C')
                .long("directory")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Run as if started in DIR"),
        )
        .arg(
            Arg::new("root-search")
                .long("root-search")
                .value_name("MODE")
                .value_parser(["outward", "inward"])
                .help("How to look for the workspace root marker"),
        )
        .arg(
            Arg::new("command")
                .value_name("COMMAND")
                .num_args(0..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .help("Command name followed by its parameters"),
        )
}
