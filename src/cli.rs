use std::io::{self, Write};

use clap::{Parser, Subcommand};

use crate::app::connect;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::format_score;
use crate::services::RestClient;
use crate::session::SessionProvider;
use crate::views::{sign_in_message, DashboardView, SubjectsView, TopicsView};

/// Track subjects, topics and evaluations from the terminal.
#[derive(Debug, Parser)]
#[command(name = "study-tracker", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and cache the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "STUDY_TRACKER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the cached session
    Logout,
    /// List your subjects, newest first
    Subjects,
    /// List the topics of a subject
    Topics { subject_id: String },
    /// Print every subject with its progress and average score
    Dashboard,
    /// Create a subject
    AddSubject { title: String },
    /// Create a topic under a subject
    AddTopic { subject_id: String, title: String },
}

/// Run a headless command and print its result to stdout.
pub async fn run(command: Command, config: &Config) -> Result<()> {
    let (mut session, rest) = connect(config).await?;
    let mut stdout = io::stdout().lock();
    execute(command, config.subject_limit, &mut session, &rest, &mut stdout).await
}

async fn execute<W: Write>(
    command: Command,
    subject_limit: usize,
    session: &mut SessionProvider,
    rest: &RestClient,
    out: &mut W,
) -> Result<()> {
    if let Command::Login { email, password } = &command {
        return match session.sign_in(email, password).await {
            Ok(user) => {
                writeln!(out, "Signed in as {}", user.email.as_deref().unwrap_or(&user.id))?;
                Ok(())
            }
            Err(e) => Err(AppError::Validation(sign_in_message(&e).to_string())),
        };
    }

    if matches!(command, Command::Logout) {
        return match session.sign_out().await {
            Ok(()) => {
                writeln!(out, "Signed out")?;
                Ok(())
            }
            Err(e) => {
                writeln!(out, "Local session cleared")?;
                Err(e)
            }
        };
    }

    let user_id = session
        .current_user()
        .map(|u| u.id.clone())
        .ok_or(AppError::NotAuthenticated)?;

    match command {
        Command::Subjects => {
            let mut view = SubjectsView::new(subject_limit);
            view.fetch_subjects(rest, &user_id).await;
            banner(view.error.take())?;
            for subject in &view.subjects {
                writeln!(
                    out,
                    "{}  {}  Criada em {}",
                    subject.id,
                    subject.title,
                    subject.created_at.format("%d/%m/%Y")
                )?;
            }
        }
        Command::Topics { subject_id } => {
            let mut view = TopicsView::new(&subject_id);
            view.fetch_topics_for_subject(rest, &subject_id).await;
            banner(view.error.take())?;
            if let Some(subject) = &view.subject {
                writeln!(
                    out,
                    "{} ({}/{})",
                    subject.title,
                    view.completed_count(),
                    view.topics.len()
                )?;
            }
            for topic in &view.topics {
                let mark = if topic.completed { "✓" } else { "✗" };
                writeln!(out, "  {mark} {}  {}", topic.title, topic.id)?;
            }
        }
        Command::Dashboard => {
            let mut view = DashboardView::new();
            view.fetch_all(rest).await;
            banner(view.error.take())?;
            for subject in &view.subjects {
                let mut line = format!(
                    "{}  {}/{} assuntos",
                    subject.subject.title,
                    subject.completed_topics(),
                    subject.topics.len()
                );
                if let Some(average) = DashboardView::average_label(subject) {
                    line.push_str(&format!("  Média: {average}"));
                }
                writeln!(out, "{line}")?;
                for evaluation in &subject.subject.evaluations {
                    let mark = if evaluation.completed { "✓" } else { " " };
                    writeln!(
                        out,
                        "  [{mark}] {}  nota {}",
                        evaluation.date,
                        format_score(evaluation.score)
                    )?;
                }
            }
        }
        Command::AddSubject { title } => {
            let mut view = SubjectsView::new(subject_limit);
            view.fetch_subjects(rest, &user_id).await;
            banner(view.error.take())?;
            if view.add_subject(rest, &user_id, &title).await {
                writeln!(out, "Created subject {}", title.trim())?;
            }
            banner(view.error)?;
        }
        Command::AddTopic { subject_id, title } => {
            let mut view = TopicsView::new(&subject_id);
            view.fetch_topics_for_subject(rest, &subject_id).await;
            banner(view.error.take())?;
            if view.add_topic(rest, &title).await {
                writeln!(out, "Created topic {}", title.trim())?;
            }
            banner(view.error)?;
        }
        Command::Login { .. } | Command::Logout => {}
    }

    Ok(())
}

fn banner(error: Option<String>) -> Result<()> {
    match error {
        Some(message) => Err(AppError::Validation(message)),
        None => Ok(()),
    }
}
