//! Command-line entry point.
//!
//! # Responsibility
//! - Run one content operation against the configured store.
//! - Fall back to compiled-in content in demo mode.

mod cli;

use clap::Parser;
use cli::{Cli, Command, ResumeCommand};
use log::error;
use portfolio_core::{
    AuthState, ContentEditor, GuardOutcome, HomeSnapshot, IdentityHandle, IdentityProvider,
    MemoryIdentityProvider, PageOutcome, RecordingNavigator, SessionGuard, SessionIdentity,
    SiteConfig, SiteContent, StoreHandle, VisitorService,
};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = SiteConfig::from_env();
    if let Err(err) = config.init_logging() {
        eprintln!("warning: {err}");
    }

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_command module=cli status=error error={message}");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &SiteConfig) -> Result<(), String> {
    match command {
        Command::Ping => {
            println!("portfolio_core ping={}", portfolio_core::ping());
            println!("portfolio_core version={}", portfolio_core::core_version());
            Ok(())
        }
        Command::Home { json } => {
            let store = config.open_store_or_fallback();
            let site = SiteContent::activate(&store);
            let snapshot = site.home_snapshot();
            if json {
                let rendered =
                    serde_json::to_string_pretty(&snapshot).map_err(|err| err.to_string())?;
                println!("{rendered}");
            } else {
                print_summary(&snapshot, config.is_demo());
            }
            Ok(())
        }
        Command::Visit { email } => {
            let store = config.open_store_or_fallback();
            let auth = auth_state(email);
            let outcome = VisitorService::new(store, config.admin_gate()).track_visit(&auth);
            println!(
                "total_visitors={} counted={}",
                outcome.stats.total_visitors, outcome.counted
            );
            Ok(())
        }
        Command::Open { path, email } => {
            let provider = Arc::new(match email {
                Some(email) => MemoryIdentityProvider::signed_in(SessionIdentity::with_email(email)),
                None => MemoryIdentityProvider::signed_out(),
            });
            let mut guard = SessionGuard::new(
                config.admin_gate(),
                IdentityHandle::connected(Arc::clone(&provider) as Arc<dyn IdentityProvider>),
                config.device_flags(),
            );
            let mut navigator = RecordingNavigator::new();
            let outcome = guard.open_path(&path, &provider.current_state(), &mut navigator);
            println!("{}", describe_page(&outcome));
            if let Some(route) = navigator.last() {
                println!("navigate={route}");
            }
            Ok(())
        }
        Command::CheckAdmin { email } => {
            let gate = config.admin_gate();
            let authorized = gate.is_authorized_admin(Some(&email));
            println!("authorized={authorized} open_gate={}", gate.is_open());
            Ok(())
        }
        Command::Seed { kind } => {
            let written = editor(config)?
                .seed_samples(kind)
                .map_err(|err| err.to_string())?;
            println!("seeded {written} {} items", kind.as_str());
            Ok(())
        }
        Command::Resume(ResumeCommand::Set { url, file_name }) => {
            editor(config)?
                .set_resume_url(&url, file_name.as_deref())
                .map_err(|err| err.to_string())?;
            println!("resume set");
            Ok(())
        }
        Command::Resume(ResumeCommand::Clear) => {
            editor(config)?
                .clear_resume()
                .map_err(|err| err.to_string())?;
            println!("resume cleared");
            Ok(())
        }
    }
}

fn auth_state(email: Option<String>) -> AuthState {
    match email {
        Some(email) => AuthState::SignedIn(SessionIdentity::with_email(email)),
        None => AuthState::SignedOut,
    }
}

fn editor(config: &SiteConfig) -> Result<ContentEditor, String> {
    let store: StoreHandle = config.open_store().map_err(|err| err.to_string())?;
    Ok(ContentEditor::new(store))
}

fn describe_page(outcome: &PageOutcome) -> String {
    match outcome {
        PageOutcome::Public(route) => format!("page={route} access=public"),
        PageOutcome::NotFound => "page=unknown".to_string(),
        PageOutcome::Guarded(GuardOutcome::ShowLoading) => "page=/admin render=loading".to_string(),
        PageOutcome::Guarded(GuardOutcome::Redirect(route)) => {
            format!("page=/admin redirect={route}")
        }
        PageOutcome::Guarded(GuardOutcome::RenderAdmin(identity)) => format!(
            "page=/admin render=dashboard email={}",
            identity.email.as_deref().unwrap_or("-")
        ),
        PageOutcome::Guarded(GuardOutcome::RenderDemo) => "page=/admin render=demo".to_string(),
    }
}

fn print_summary(snapshot: &HomeSnapshot, demo: bool) {
    if demo {
        println!("mode=demo");
    }
    println!("{} - {}", snapshot.profile.name, snapshot.profile.title);
    for group in &snapshot.skill_groups {
        let names: Vec<&str> = group.skills.iter().map(|skill| skill.name.as_str()).collect();
        println!("  [{}] {}", group.category, names.join(", "));
    }
    println!("education: {}", snapshot.education.len());
    println!("bento tiles: {}", snapshot.bento.len());
    for project in &snapshot.projects {
        println!("  project: {}", project.title);
    }
    match snapshot.resume.as_ref().and_then(|resume| resume.url.as_deref()) {
        Some(url) => println!("resume: {url}"),
        None => println!("resume: not set"),
    }
}
