//! ArgMatches → explorer commands.
//!
//! `datasets` and `relationships` map to one command each. `explore` and
//! `join` expand to a sequence: open, adjust the map, then snapshot it.

use clap::ArgMatches;
use mircs_explorer::Command;

/// What the binary should do.
#[derive(Debug, Clone, PartialEq)]
pub enum CliAction {
    /// A single command.
    Execute(Command),
    /// Commands run in order; only data-carrying outputs are printed.
    Sequence(Vec<Command>),
    /// Sign in and store the token.
    Login {
        email: String,
        password: Option<String>,
    },
}

/// Convert top-level matches into an action.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction, String> {
    let (sub_name, sub_matches) = matches
        .subcommand()
        .ok_or_else(|| "No command provided".to_string())?;

    match sub_name {
        "datasets" => Ok(CliAction::Execute(Command::ListDataSets)),
        "relationships" => Ok(CliAction::Execute(Command::ListRelationships)),
        "login" => Ok(CliAction::Login {
            email: required(sub_matches, "email")?,
            password: sub_matches.get_one::<String>("password").cloned(),
        }),
        "explore" => parse_explore(sub_matches),
        "join" => parse_join(sub_matches),
        other => Err(format!("Unknown command: {}", other)),
    }
}

fn required(matches: &ArgMatches, name: &str) -> Result<String, String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .ok_or_else(|| format!("Missing argument: {}", name))
}

fn search_terms(matches: &ArgMatches) -> impl Iterator<Item = Command> + '_ {
    matches
        .get_many::<String>("search")
        .into_iter()
        .flatten()
        .map(|term| Command::AddSearchTerm { term: term.clone() })
}

fn parse_explore(matches: &ArgMatches) -> Result<CliAction, String> {
    let id = required(matches, "dataset")?;
    let mut cmds = vec![Command::OpenDataSet { id: id.into() }];
    if let Some(name) = matches.get_one::<String>("tile") {
        cmds.push(Command::SetTileLayer { name: name.clone() });
    }
    // the highlight field replaces the terms, so explicit terms go after it
    if let Some(field) = matches.get_one::<String>("highlight") {
        cmds.push(Command::SetHighlightField {
            field: Some(field.clone()),
        });
    }
    cmds.extend(search_terms(matches));
    cmds.push(Command::View);
    Ok(CliAction::Sequence(cmds))
}

fn parse_join(matches: &ArgMatches) -> Result<CliAction, String> {
    let id = required(matches, "relationship")?;
    let mut cmds = vec![Command::OpenRelationship { id: id.into() }];
    cmds.extend(search_terms(matches));
    cmds.push(Command::View);
    Ok(CliAction::Sequence(cmds))
}
