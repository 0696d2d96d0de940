//! Parsing of REPL input lines into [`Command`]s.

use shared::domain::{ExportFormat, ProjectId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { email: String, password: String },
    Register { email: String, password: String },
    Logout,
    Generate { topic: String },
    Mode,
    Edit { text: String },
    Refine { instruction: String },
    Like { on: bool },
    Dislike { on: bool },
    Notes { text: String },
    Save,
    Projects,
    Open { project_id: ProjectId },
    Delete { project_id: ProjectId },
    Export { format: ExportFormat },
    Show,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty input")]
    Empty,
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("'{value}' is not a valid {what}")]
    Invalid { what: &'static str, value: String },
}

pub const HELP: &str = "\
commands:
  login <email> <password>     sign in
  register <email> <password>  create an account
  logout                       sign out
  generate <topic>             generate a new draft
  mode                         toggle preview/edit
  edit <text>                  replace the draft text (edit mode, \\n for newline)
  refine <instruction>         ask the server to rework the draft
  like [off] | dislike [off]   rate the draft
  notes [text]                 set notes on the draft
  save                         save the draft as a new project
  projects                     list saved projects
  open <id>                    load a saved project
  delete <id>                  delete a saved project
  export <pdf|docx|pptx>       export the draft to a file
  show                         print the current draft
  help | quit";

pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "login" => {
            let (email, password) = credentials(rest, "login <email> <password>")?;
            Command::Login { email, password }
        }
        "register" => {
            let (email, password) = credentials(rest, "register <email> <password>")?;
            Command::Register { email, password }
        }
        "logout" => Command::Logout,
        "generate" | "gen" => Command::Generate {
            topic: required(rest, "generate <topic>")?,
        },
        "mode" => Command::Mode,
        "edit" => Command::Edit {
            text: rest.replace("\\n", "\n"),
        },
        "refine" => Command::Refine {
            instruction: required(rest, "refine <instruction>")?,
        },
        "like" => Command::Like { on: switch(rest)? },
        "dislike" => Command::Dislike { on: switch(rest)? },
        "notes" => Command::Notes {
            text: rest.to_string(),
        },
        "save" => Command::Save,
        "projects" | "ls" => Command::Projects,
        "open" => Command::Open {
            project_id: project_id(rest, "open <id>")?,
        },
        "delete" | "rm" => Command::Delete {
            project_id: project_id(rest, "delete <id>")?,
        },
        "export" => {
            let raw = required(rest, "export <pdf|docx|pptx>")?;
            let format = ExportFormat::parse(&raw).ok_or(ParseError::Invalid {
                what: "export format",
                value: raw,
            })?;
            Command::Export { format }
        }
        "show" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(command)
}

fn required(rest: &str, usage: &'static str) -> Result<String, ParseError> {
    if rest.is_empty() {
        Err(ParseError::Usage(usage))
    } else {
        Ok(rest.to_string())
    }
}

fn credentials(rest: &str, usage: &'static str) -> Result<(String, String), ParseError> {
    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(email), Some(password), None) => Ok((email.to_string(), password.to_string())),
        _ => Err(ParseError::Usage(usage)),
    }
}

fn project_id(rest: &str, usage: &'static str) -> Result<ProjectId, ParseError> {
    if rest.is_empty() {
        return Err(ParseError::Usage(usage));
    }
    rest.parse::<i64>()
        .map(ProjectId)
        .map_err(|_| ParseError::Invalid {
            what: "project id",
            value: rest.to_string(),
        })
}

fn switch(rest: &str) -> Result<bool, ParseError> {
    match rest.to_ascii_lowercase().as_str() {
        "" | "on" => Ok(true),
        "off" => Ok(false),
        other => Err(ParseError::Invalid {
            what: "switch (expected on or off)",
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
