//! Line-oriented front end over the workspace controller.

use std::{io::Write, path::PathBuf, sync::Arc};

use anyhow::Context;
use client_core::{
    CredentialProvider, ExportedDocument, FeedbackUpdate, HttpDocumentService, SessionContext,
    WorkspaceController, WorkspaceError, WorkspaceEvent, WorkspaceSnapshot,
};
use shared::{domain::Feedback, protocol::ProjectRecord};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::RecvError},
};
use tracing::{info, warn};

use crate::{
    commands::{parse_command, Command, ParseError, HELP},
    config::Settings,
};

pub struct Repl {
    pub settings: Settings,
    pub session: Arc<SessionContext>,
    pub http: Arc<HttpDocumentService>,
    pub workspace: Arc<WorkspaceController>,
}

pub async fn run(repl: Repl) -> anyhow::Result<()> {
    let printer = tokio::spawn(print_events(repl.workspace.subscribe_events()));
    println!("connected to {} (type 'help' for commands)", repl.http.base_url());
    if repl.session.is_authenticated() {
        report(repl.workspace.refresh_projects().await);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(ParseError::Empty) => continue,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Err(err) = repl.dispatch(command).await {
            println!("error: {err:#}");
        }
    }

    printer.abort();
    Ok(())
}

impl Repl {
    async fn dispatch(&self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Login { email, password } => {
                let token = self.http.login(&email, &password).await?;
                self.session.sign_in(token);
                println!("signed in as {email}");
                report(self.workspace.refresh_projects().await);
            }
            Command::Register { email, password } => {
                self.http.register(&email, &password).await?;
                println!("account created for {email}; sign in with 'login'");
            }
            Command::Logout => {
                self.session.sign_out();
                self.workspace.projects().clear().await;
                println!("signed out");
            }
            Command::Generate { topic } => {
                let workspace = Arc::clone(&self.workspace);
                tokio::spawn(async move {
                    report(workspace.generate(&topic).await);
                });
            }
            Command::Mode => {
                let mode = self.workspace.toggle_mode().await;
                println!("mode: {mode:?}");
            }
            Command::Edit { text } => {
                report(self.workspace.edit_content(text).await);
            }
            Command::Refine { instruction } => {
                let workspace = Arc::clone(&self.workspace);
                tokio::spawn(async move {
                    report(workspace.refine(&instruction).await);
                });
            }
            Command::Like { on } => {
                let feedback = self
                    .workspace
                    .set_feedback(FeedbackUpdate {
                        liked: Some(on),
                        ..FeedbackUpdate::default()
                    })
                    .await;
                println!("{}", describe_feedback(&feedback));
            }
            Command::Dislike { on } => {
                let feedback = self
                    .workspace
                    .set_feedback(FeedbackUpdate {
                        disliked: Some(on),
                        ..FeedbackUpdate::default()
                    })
                    .await;
                println!("{}", describe_feedback(&feedback));
            }
            Command::Notes { text } => {
                let feedback = self.workspace.set_feedback(FeedbackUpdate::notes(text)).await;
                println!("{}", describe_feedback(&feedback));
            }
            Command::Save => {
                if let Some(outcome) = report(self.workspace.save().await) {
                    if !outcome.bound {
                        println!(
                            "saved as project {} but the draft changed meanwhile",
                            outcome.project_id
                        );
                    }
                    if !outcome.feedback_synced {
                        println!("feedback for project {} was not stored", outcome.project_id);
                    }
                    if !outcome.list_refreshed {
                        println!("project list may be out of date; run 'projects'");
                    }
                }
            }
            Command::Projects => {
                if let Some(projects) = report(self.workspace.refresh_projects().await) {
                    print_projects(&projects);
                }
            }
            Command::Open { project_id } => {
                if self.workspace.projects().get(project_id).await.is_none() {
                    report(self.workspace.refresh_projects().await);
                }
                if let Some(project) = report(self.workspace.open_project(project_id).await) {
                    println!("opened project {} '{}'", project.id, project.title);
                }
            }
            Command::Delete { project_id } => {
                if let Some(cleared) = report(self.workspace.delete_project(project_id).await) {
                    println!("deleted project {project_id}");
                    if cleared {
                        println!("the open draft belonged to it and was closed");
                    }
                }
            }
            Command::Export { format } => {
                if let Some(document) = report(self.workspace.export(format).await) {
                    let path = self.write_export(&document).await?;
                    println!("wrote {} ({} bytes)", path.display(), document.bytes.len());
                }
            }
            Command::Show => print_snapshot(&self.workspace.snapshot().await),
            Command::Help => println!("{HELP}"),
            Command::Quit => {}
        }
        Ok(())
    }

    async fn write_export(&self, document: &ExportedDocument) -> anyhow::Result<PathBuf> {
        let dir = &self.settings.export_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join(&document.file_name);
        tokio::fs::write(&path, &document.bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), format = document.format.as_str(), "export written");
        Ok(path)
    }
}

/// Service failures are already announced through a notice event.
fn report<T>(result: Result<T, WorkspaceError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(WorkspaceError::Service(_)) => None,
        Err(err) => {
            println!("{err}");
            None
        }
    }
}

async fn print_events(mut events: broadcast::Receiver<WorkspaceEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => print_event(&event),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "event printer fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_event(event: &WorkspaceEvent) {
    match event {
        WorkspaceEvent::PhaseChanged(phase) => println!("[{phase:?}]"),
        WorkspaceEvent::ContentReplaced { kind, .. } => {
            println!("draft updated by {kind}; 'show' to view it")
        }
        WorkspaceEvent::ProjectBound(project_id) => println!("draft saved as project {project_id}"),
        WorkspaceEvent::DraftCleared => println!("draft closed"),
        WorkspaceEvent::ProjectsRefreshed { count } => println!("{count} saved project(s)"),
        WorkspaceEvent::StaleCompletionDiscarded { token, kind } => println!(
            "ignored a late {kind} result (request {}) for a draft that was replaced",
            token.request_id
        ),
        WorkspaceEvent::Notice(notice) => {
            println!("{} failed: {}", notice.context(), notice.message());
            if notice.requires_reauth() {
                println!("sign in with 'login <email> <password>'");
            }
        }
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

fn describe_feedback(feedback: &Feedback) -> String {
    let rating = match (feedback.liked(), feedback.disliked()) {
        (true, _) => "liked",
        (_, true) => "disliked",
        _ => "unrated",
    };
    if feedback.notes.is_empty() {
        rating.to_string()
    } else {
        format!("{rating}, notes: {}", feedback.notes)
    }
}

fn print_snapshot(snapshot: &WorkspaceSnapshot) {
    let draft = &snapshot.draft;
    let project = draft
        .project_id
        .map(|id| format!("project {id}"))
        .unwrap_or_else(|| "unsaved".to_string());
    println!(
        "{} | {:?} | {:?} | {} | {}",
        if draft.topic.is_empty() { "(no topic)" } else { draft.topic.as_str() },
        snapshot.phase,
        draft.mode,
        project,
        describe_feedback(&draft.feedback)
    );
    if !draft.refinement_instruction.is_empty() {
        println!("pending instruction: {}", draft.refinement_instruction);
    }
    if draft.content.is_empty() {
        println!("(empty)");
    } else {
        println!("{}", draft.content);
    }
}

fn print_projects(projects: &[ProjectRecord]) {
    if projects.is_empty() {
        println!("no saved projects");
        return;
    }
    for project in projects {
        let rating = match (project.is_liked, project.is_disliked) {
            (Some(true), _) => " [liked]",
            (_, Some(true)) => " [disliked]",
            _ => "",
        };
        println!(
            "{:>6}  {} ({}){rating}",
            project.id, project.title, project.doc_type
        );
    }
}
