//! Command line definition.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "seed-portal")]
#[command(about = "Sign in to the SEED portal and manage your current school", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Session file (overrides SEED_PORTAL_STORAGE_PATH)
    #[arg(long, global = true)]
    pub storage: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long, env = "SEED_PORTAL_EMAIL")]
        email: String,

        #[arg(long, env = "SEED_PORTAL_PASSWORD", hide_env_values = true)]
        password: String,

        /// Page to continue to after signing in
        #[arg(long)]
        return_to: Option<String>,
    },

    /// Create an account (does not sign in)
    Signup {
        #[arg(long)]
        email: String,

        #[arg(long, env = "SEED_PORTAL_PASSWORD", hide_env_values = true)]
        password: String,

        /// Full name shown in the portal
        #[arg(long)]
        name: String,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in member
    Whoami {
        /// Check the stored token against the portal
        #[arg(long, default_value_t = false)]
        remote: bool,
    },

    /// List your schools
    Schools,

    /// Make a school the current one
    Select {
        /// School id as listed by `schools`
        id: String,
    },

    /// Fetch your school list again
    Refresh,

    /// Show what the portal does when opening a page
    Open {
        /// Portal path, e.g. /dashboard
        path: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_takes_flags() {
        let cli = Cli::try_parse_from([
            "seed-portal",
            "login",
            "--email",
            "ops@seed.example",
            "--password",
            "pw",
            "--return-to",
            "/leads",
        ])
        .expect("parse");
        match cli.command {
            Command::Login {
                email, return_to, ..
            } => {
                assert_eq!(email, "ops@seed.example");
                assert_eq!(return_to.as_deref(), Some("/leads"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_storage_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["seed-portal", "schools", "--storage", "/tmp/s.json"])
            .expect("parse");
        assert_eq!(cli.storage, Some(PathBuf::from("/tmp/s.json")));
        assert!(matches!(cli.command, Command::Schools));
    }

    #[test]
    fn select_needs_an_id() {
        assert!(Cli::try_parse_from(["seed-portal", "select"]).is_err());
    }

    #[test]
    fn definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
