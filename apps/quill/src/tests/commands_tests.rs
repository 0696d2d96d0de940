use super::{parse_command, Command, ParseError};

use shared::domain::{ExportFormat, ProjectId};

#[test]
fn parses_topic_with_spaces() {
    assert_eq!(
        parse_command("  generate   Renewable Energy  "),
        Ok(Command::Generate {
            topic: "Renewable Energy".into()
        })
    );
}

#[test]
fn command_names_are_case_insensitive() {
    assert_eq!(parse_command("SAVE"), Ok(Command::Save));
    assert_eq!(parse_command("Quit"), Ok(Command::Quit));
}

#[test]
fn parses_credentials() {
    assert_eq!(
        parse_command("login writer@example.com hunter2"),
        Ok(Command::Login {
            email: "writer@example.com".into(),
            password: "hunter2".into()
        })
    );
    assert!(matches!(
        parse_command("register only-email"),
        Err(ParseError::Usage(_))
    ));
    assert!(matches!(
        parse_command("login a b c"),
        Err(ParseError::Usage(_))
    ));
}

#[test]
fn edit_expands_newline_escapes() {
    assert_eq!(
        parse_command("edit Intro\\nBody"),
        Ok(Command::Edit {
            text: "Intro\nBody".into()
        })
    );
    assert_eq!(parse_command("edit"), Ok(Command::Edit { text: String::new() }));
}

#[test]
fn refine_requires_instruction() {
    assert_eq!(
        parse_command("refine"),
        Err(ParseError::Usage("refine <instruction>"))
    );
    assert_eq!(
        parse_command("refine Make it shorter"),
        Ok(Command::Refine {
            instruction: "Make it shorter".into()
        })
    );
}

#[test]
fn feedback_switches() {
    assert_eq!(parse_command("like"), Ok(Command::Like { on: true }));
    assert_eq!(parse_command("dislike off"), Ok(Command::Dislike { on: false }));
    assert!(matches!(
        parse_command("like maybe"),
        Err(ParseError::Invalid { .. })
    ));
    assert_eq!(parse_command("notes"), Ok(Command::Notes { text: String::new() }));
}

#[test]
fn parses_project_ids() {
    assert_eq!(
        parse_command("open 42"),
        Ok(Command::Open {
            project_id: ProjectId(42)
        })
    );
    assert_eq!(
        parse_command("rm 7"),
        Ok(Command::Delete {
            project_id: ProjectId(7)
        })
    );
    assert!(matches!(
        parse_command("open forty-two"),
        Err(ParseError::Invalid { what: "project id", .. })
    ));
    assert!(matches!(parse_command("delete"), Err(ParseError::Usage(_))));
}

#[test]
fn parses_export_formats() {
    assert_eq!(
        parse_command("export PDF"),
        Ok(Command::Export {
            format: ExportFormat::Pdf
        })
    );
    assert_eq!(
        parse_command("export .pptx"),
        Ok(Command::Export {
            format: ExportFormat::Pptx
        })
    );
    assert!(matches!(
        parse_command("export odt"),
        Err(ParseError::Invalid { what: "export format", .. })
    ));
}

#[test]
fn rejects_empty_and_unknown() {
    assert_eq!(parse_command("   "), Err(ParseError::Empty));
    assert_eq!(
        parse_command("publish now"),
        Err(ParseError::Unknown("publish".into()))
    );
}
