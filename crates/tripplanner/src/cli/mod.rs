//! Command-line interface for tripplanner.
//!
//! This module provides the CLI structure for the `tripctl` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ActivityCommand, ActivityFields, AuthCommand, ChecklistCommand, ConfigCommand, DaySelector,
    NotesCommand, StayCommand, StayFields, TransportCommand, TransportFields, TransportModeArg,
    TripCommand, TripStatusArg, TripUpdateArgs,
};

use crate::logging::Verbosity;

/// tripctl - Plan trips day by day
///
/// Keeps trips, daily itineraries, stays, transport and packing lists.
/// Signed out, everything is stored locally; signed in, trips sync to your
/// account.
#[derive(Debug, Parser)]
#[command(name = "tripctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in, sign out, or show the session
    #[command(subcommand)]
    Auth(AuthCommand),

    /// Manage trips
    #[command(subcommand)]
    Trip(TripCommand),

    /// Manage activities of an itinerary day
    #[command(subcommand)]
    Activity(ActivityCommand),

    /// Manage lodging
    #[command(subcommand)]
    Stay(StayCommand),

    /// Manage transport legs
    #[command(subcommand)]
    Transport(TransportCommand),

    /// Replace a trip's notes
    Notes(NotesCommand),

    /// Manage the packing checklist
    #[command(subcommand)]
    Checklist(ChecklistCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "tripctl");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["tripctl", "-q", "trip", "list"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["tripctl", "trip", "list"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["tripctl", "-v", "trip", "list"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["tripctl", "-vv", "trip", "list"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["tripctl", "-c", "/custom/config.toml", "auth", "status"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert!(matches!(
            cli.command,
            Command::Auth(AuthCommand::Status { json: false })
        ));
    }

    #[test]
    fn test_parse_trip_add() {
        let cli = parse(&[
            "tripctl", "trip", "add", "--title", "US Trip", "--start", "2026-05-19", "--end",
            "2026-05-26",
        ]);
        match cli.command {
            Command::Trip(TripCommand::Add {
                title, start, end, cover,
            }) => {
                assert_eq!(title, "US Trip");
                assert_eq!(start, NaiveDate::from_ymd_opt(2026, 5, 19).unwrap());
                assert_eq!(end, NaiveDate::from_ymd_opt(2026, 5, 26).unwrap());
                assert!(cover.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        let result = Cli::try_parse_from([
            "tripctl", "trip", "add", "--title", "X", "--start", "2026-02-30", "--end",
            "2026-03-01",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_trip_update_status() {
        let cli = parse(&["tripctl", "trip", "update", "t1", "--status", "booked"]);
        match cli.command {
            Command::Trip(TripCommand::Update(args)) => {
                assert_eq!(args.id, "t1");
                assert_eq!(args.status, Some(TripStatusArg::Booked));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_trip_select_without_id() {
        let cli = parse(&["tripctl", "trip", "select"]);
        assert!(matches!(
            cli.command,
            Command::Trip(TripCommand::Select { id: None })
        ));
    }

    #[test]
    fn test_parse_activity_add_by_day() {
        let cli = parse(&[
            "tripctl", "activity", "add", "t1", "--day", "1", "--name", "Museum",
        ]);
        match cli.command {
            Command::Activity(ActivityCommand::Add { trip, day, fields }) => {
                assert_eq!(trip, "t1");
                assert_eq!(day.day, Some(1));
                assert_eq!(fields.name.as_deref(), Some("Museum"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_activity_requires_one_day_selector() {
        assert!(Cli::try_parse_from(["tripctl", "activity", "delete", "t1", "a1"]).is_err());
        assert!(Cli::try_parse_from([
            "tripctl", "activity", "delete", "t1", "a1", "--day", "1", "--date", "2026-05-19",
        ])
        .is_err());
    }

    #[test]
    fn test_parse_transport_add() {
        let cli = parse(&[
            "tripctl", "transport", "add", "t1", "--mode", "train", "--from", "Boston",
        ]);
        match cli.command {
            Command::Transport(TransportCommand::Add { fields, .. }) => {
                assert_eq!(fields.mode, Some(TransportModeArg::Train));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_checklist_check_undo() {
        let cli = parse(&["tripctl", "checklist", "check", "t1", "i1", "--undo"]);
        assert!(matches!(
            cli.command,
            Command::Checklist(ChecklistCommand::Check { undo: true, .. })
        ));
    }

    #[test]
    fn test_parse_notes() {
        let cli = parse(&["tripctl", "notes", "t1", "Bring sunscreen"]);
        match cli.command {
            Command::Notes(cmd) => assert_eq!(cmd.text, "Bring sunscreen"),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
