//! MIRCS CLI: list, open and search related datasets from a terminal.
//!
//! Every invocation runs one subcommand against the persistence server
//! (or a `--fixture` file), draws onto an off-screen map and prints what
//! the map and panels would show:
//! - `mircs datasets` / `mircs relationships`
//! - `mircs login EMAIL` stores the issued token in the config file
//! - `mircs explore DATASET [--search TERM]... [--highlight FIELD]`
//! - `mircs join RELATIONSHIP`

mod commands;
mod format;
mod parse;

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{anyhow, Context};
use clap::ArgMatches;
use mircs_explorer::{
    Command, Explorer, ExplorerConfig, Output, RecordingCanvas, CONFIG_FILE_NAME,
};
use tracing_subscriber::EnvFilter;

use commands::build_cli;
use format::{format_error, format_output, is_reportable, OutputMode};
use parse::{matches_to_action, CliAction};

fn main() {
    let cli = build_cli();
    let matches = cli.get_matches();

    init_tracing(matches.get_count("verbose"));

    let output_mode = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let action = match matches_to_action(&matches) {
        Ok(action) => action,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    let config_path = matches
        .get_one::<String>("config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

    let mut explorer = match open_explorer(&matches, &config_path) {
        Ok(explorer) => explorer,
        Err(e) => {
            eprintln!("{:#}", e);
            process::exit(1);
        }
    };

    let exit_code = run(&mut explorer, action, &config_path, output_mode);
    process::exit(exit_code);
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "mircs=debug,warn",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the config file, apply flag overrides and build the explorer.
fn open_explorer(matches: &ArgMatches, config_path: &Path) -> anyhow::Result<Explorer> {
    let mut config = load_config(config_path)?;
    if let Some(url) = matches.get_one::<String>("api") {
        config.api_url = url.trim_end_matches('/').to_string();
    }
    if let Some(token) = matches.get_one::<String>("token") {
        config.api_token = Some(token.clone());
    }
    if let Some(layer) = matches.get_one::<String>("tile-layer") {
        config.tile_layer = layer.clone();
    }
    config.validate()?;

    let explorer = match matches.get_one::<String>("fixture") {
        Some(fixture) => Explorer::offline(config, Path::new(fixture))
            .with_context(|| format!("failed to load fixture '{}'", fixture))?,
        None => Explorer::connect(config),
    };
    explorer.mount(Box::new(RecordingCanvas::new()))?;
    Ok(explorer)
}

fn load_config(path: &Path) -> anyhow::Result<ExplorerConfig> {
    ExplorerConfig::write_default_if_missing(path)?;
    Ok(ExplorerConfig::from_file(path)?)
}

fn run(explorer: &mut Explorer, action: CliAction, config_path: &Path, mode: OutputMode) -> i32 {
    match action {
        CliAction::Execute(cmd) => match explorer.execute(cmd) {
            Ok(output) => {
                println!("{}", format_output(&output, mode));
                0
            }
            Err(e) => {
                eprintln!("{}", format_error(&e, mode));
                1
            }
        },
        CliAction::Sequence(cmds) => {
            for cmd in cmds {
                match explorer.execute(cmd) {
                    Ok(output) if is_reportable(&output) => {
                        println!("{}", format_output(&output, mode))
                    }
                    Ok(_) => {}
                    Err(e) => {
                        eprintln!("{}", format_error(&e, mode));
                        return 1;
                    }
                }
            }
            0
        }
        CliAction::Login { email, password } => {
            match login(explorer, email, password, config_path, mode) {
                Ok(()) => 0,
                Err(e) => {
                    eprintln!("{:#}", e);
                    1
                }
            }
        }
    }
}

fn login(
    explorer: &mut Explorer,
    email: String,
    password: Option<String>,
    config_path: &Path,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let password = match password {
        Some(p) => p,
        None => read_password()?,
    };
    let output = explorer
        .execute(Command::SignIn { email, password })
        .map_err(|e| anyhow!(format_error(&e, mode)))?;
    if let Output::SignedIn { id_token, .. } = &output {
        // flag overrides stay out of the stored file
        let mut stored = ExplorerConfig::from_file(config_path)?;
        stored.api_token = Some(id_token.clone());
        stored.write_to_file(config_path)?;
        tracing::info!(target: "mircs::api", path = %config_path.display(), "Saved API token");
    }
    println!("{}", format_output(&output, mode));
    Ok(())
}

fn read_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
