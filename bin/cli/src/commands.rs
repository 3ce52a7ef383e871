//! Command handlers and their text output.

use seed_portal_access::{
    GateDecision, Organization, PortalBackend, PortalUser, RouteGate, SelectionRedirect,
    SelectionView, SessionManager, SessionStorage,
};
use seed_portal_core::{OrganizationId, Result};
use tracing::debug;

use crate::cli::Command;
use crate::error::{CliError, session_failed};

/// Runs one command against a rehydrated session manager.
pub async fn run<B, S>(manager: &mut SessionManager<B, S>, command: Command) -> Result<(), CliError>
where
    B: PortalBackend,
    S: SessionStorage,
{
    let gate = RouteGate::default();

    match command {
        Command::Login {
            email,
            password,
            return_to,
        } => {
            let outcome = manager.sign_in(&email, &password).await.map_err(|report| {
                let message = report.current_context().user_message();
                report.context(CliError::SignIn { message })
            })?;
            debug!(?outcome, "sign-in finished");

            if let Some(session) = manager.session() {
                println!("Signed in as {}", describe_user(session.user()));
            }
            if outcome.organization_fetch_failed || outcome.needs_selection {
                if let Some(view) = manager.selection_view() {
                    println!("{}", render_view(&view));
                }
            } else if let Some(current) = manager.current_organization() {
                println!("Current school: {}", describe_organization(current));
            }

            let destination = gate.post_login_destination(return_to.as_deref());
            let decision = gate.decide(&destination, &manager.snapshot());
            println!("{}", describe_decision(&gate, &destination, &decision));
        }

        Command::Signup {
            email,
            password,
            name,
        } => {
            manager
                .sign_up(&email, &password, &name)
                .await
                .map_err(|report| {
                    let message = report.current_context().user_message();
                    report.context(CliError::SignUp { message })
                })?;
            println!("Account created for {email}. Sign in with `seed-portal login`.");
        }

        Command::Logout => {
            let was_signed_in = manager.is_authenticated();
            manager.sign_out();
            if was_signed_in {
                println!("Signed out.");
            } else {
                println!("Not signed in.");
            }
        }

        Command::Whoami { remote } => {
            let session = manager.session().ok_or(CliError::NotSignedIn)?;
            println!("{}", describe_user(session.user()));
            println!("Member id: {}", session.user_id());
            println!("Signed in: {}", session.signed_in_at());
            match manager.current_organization() {
                Some(current) => println!("Current school: {}", describe_organization(current)),
                None => println!("Current school: none"),
            }
            if remote {
                let profile = manager.fetch_profile().await.map_err(session_failed)?;
                println!("Token is valid for {}", profile.email());
            }
        }

        Command::Schools => {
            let view = manager.selection_view().ok_or(CliError::NotSignedIn)?;
            println!("{}", render_view(&view));
        }

        Command::Select { id } => {
            let id = OrganizationId::new(id).map_err(|e| CliError::InvalidArgument {
                name: "school id",
                reason: e.to_string(),
            })?;
            let chosen = manager
                .set_current_organization(&id)
                .map_err(session_failed)?;
            println!("Current school: {}", describe_organization(chosen));
        }

        Command::Refresh => {
            let count = manager.refresh_organizations().await.map_err(session_failed)?;
            println!("Found {count} school(s).");
            if let Some(view) = manager.selection_view() {
                println!("{}", render_view(&view));
            }
        }

        Command::Open { path } => {
            let decision = gate.decide(&path, &manager.snapshot());
            println!("{}", describe_decision(&gate, &path, &decision));
        }
    }

    Ok(())
}

fn describe_user(user: &PortalUser) -> String {
    format!("{} <{}>", user.display_name(), user.email())
}

fn describe_organization(org: &Organization) -> String {
    let mut line = format!("{} ({}, {})", org.display_name(), org.id(), org.role().label());
    if !org.country_name().is_empty() {
        line.push_str(&format!(" - {}", org.country_name()));
    }
    line
}

/// Text for the school selection screen.
pub fn render_view(view: &SelectionView<'_>) -> String {
    match view {
        SelectionView::LoadFailed { reason } => format!(
            "Could not load your schools ({reason}).\nRun `seed-portal refresh` to try again."
        ),
        SelectionView::NoOrganizations => "You do not have access to any schools yet.\n\
             Contact your SEED administrator to be added to a school."
            .to_string(),
        SelectionView::Picker {
            organizations,
            current,
        } => {
            let mut lines = Vec::with_capacity(organizations.len() + 1);
            if current.is_none() {
                lines.push("Choose a school with `seed-portal select <id>`:".to_string());
            }
            for org in organizations.iter() {
                let marker = if Some(org.id()) == *current { "*" } else { " " };
                let primary = if org.is_primary() { " [primary]" } else { "" };
                lines.push(format!("{marker} {}{primary}", describe_organization(org)));
            }
            lines.join("\n")
        }
    }
}

/// Text for a route gate decision.
pub fn describe_decision(gate: &RouteGate, path: &str, decision: &GateDecision) -> String {
    match decision {
        GateDecision::Loading => format!("{path}: still loading"),
        GateDecision::Render => format!("{path}: open"),
        GateDecision::RedirectToLogin { return_to } => format!(
            "{path}: sign in first ({} then back to {return_to})",
            gate.login_path()
        ),
        GateDecision::RedirectToSelection { reason } => {
            let why = match reason {
                SelectionRedirect::NeedsSelection => "choose a school first",
                SelectionRedirect::NoAccess => "no schools available",
                SelectionRedirect::AlreadySignedIn => "already signed in",
            };
            format!("{path}: {why} (go to {})", gate.selection_path())
        }
    }
}
