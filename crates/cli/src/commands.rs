//! Clap command tree definition.

use clap::{Arg, ArgAction, Command};

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("mircs")
        .about("Explore related datasets on a map")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .help("Config file (default: ./mircs.toml)")
                .global(true),
        )
        .arg(
            Arg::new("api")
                .long("api")
                .help("Persistence server URL, overrides api_url")
                .conflicts_with("fixture")
                .global(true),
        )
        .arg(
            Arg::new("fixture")
                .long("fixture")
                .help("Serve datasets from a JSON fixture file instead of a server")
                .global(true),
        )
        .arg(
            Arg::new("token")
                .long("token")
                .help("Bearer token for the persistence server, overrides api_token")
                .global(true),
        )
        .arg(
            Arg::new("tile-layer")
                .long("tile-layer")
                .help("Default tile layer, overrides tile_layer")
                .global(true),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("JSON output mode")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log requests and state changes to stderr")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(Command::new("datasets").about("List datasets"))
        .subcommand(Command::new("relationships").about("List relationships"))
        .subcommand(build_login())
        .subcommand(build_explore())
        .subcommand(build_join())
}

fn build_login() -> Command {
    Command::new("login")
        .about("Sign in and save the issued token to the config file")
        .arg(Arg::new("email").required(true).help("Account email"))
        .arg(
            Arg::new("password")
                .long("password")
                .help("Password (read from stdin when omitted)"),
        )
}

fn build_explore() -> Command {
    Command::new("explore")
        .about("Open a dataset with its related records and describe the map")
        .arg(Arg::new("dataset").required(true).help("Dataset id"))
        .arg(
            Arg::new("search")
                .long("search")
                .short('s')
                .action(ArgAction::Append)
                .help("Search term, `text` or `field: value` (repeatable)"),
        )
        .arg(
            Arg::new("highlight")
                .long("highlight")
                .help("Highlight field; seeds the search with its most frequent values"),
        )
        .arg(Arg::new("tile").long("tile").help("Tile layer to show"))
}

fn build_join() -> Command {
    Command::new("join")
        .about("Open a relationship's joined records and describe the map")
        .arg(Arg::new("relationship").required(true).help("Relationship id"))
        .arg(
            Arg::new("search")
                .long("search")
                .short('s')
                .action(ArgAction::Append)
                .help("Search term (repeatable)"),
        )
}
