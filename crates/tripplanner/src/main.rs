//! `tripctl` - CLI for tripplanner
//!
//! Opens the local and remote stores named by the configuration, starts a
//! [`TripStore`] on them and runs one command against it.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;

use tripplanner::cli::{
    ActivityCommand, AuthCommand, ChecklistCommand, Cli, Command, ConfigCommand, StayCommand,
    TransportCommand, TripCommand,
};
use tripplanner::model::{NewTrip, Trip};
use tripplanner::store::{Backends, TripStore};
use tripplanner::{init_logging, Config, DocumentStore, LocalStorage, SessionAuthProvider};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Config(cmd) => handle_config(&config, cmd),
        command => {
            let mut store = open_store(&config)?;
            run(&config, &mut store, command).await
        }
    }
}

fn open_store(config: &Config) -> anyhow::Result<TripStore> {
    let local_path = config.local_database_path();
    let local = Arc::new(
        LocalStorage::open(&local_path, config.local.state_key.clone())
            .with_context(|| format!("opening local storage at {}", local_path.display()))?,
    );

    let remote_path = config.remote_database_path();
    let remote = Arc::new(
        DocumentStore::open(&remote_path)
            .with_context(|| format!("opening document store at {}", remote_path.display()))?,
    );

    let auth = Arc::new(SessionAuthProvider::new(
        Arc::clone(&local),
        config.identity(),
    ));

    let mut store = TripStore::new(
        Backends {
            auth,
            remote,
            local,
        },
        config.store_settings(),
    );
    store.start()?;
    Ok(store)
}

async fn run(config: &Config, store: &mut TripStore, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Auth(cmd) => handle_auth(store, cmd).await,
        Command::Trip(cmd) => handle_trip(store, cmd).await,
        Command::Activity(cmd) => handle_activity(store, cmd).await,
        Command::Stay(cmd) => handle_stay(store, cmd).await,
        Command::Transport(cmd) => handle_transport(store, cmd).await,
        Command::Notes(cmd) => {
            store.update_notes(&cmd.trip, cmd.text).await?;
            println!("Notes updated.");
            Ok(())
        }
        Command::Checklist(cmd) => handle_checklist(store, cmd).await,
        Command::Config(cmd) => handle_config(config, cmd),
    }
}

async fn handle_auth(store: &mut TripStore, cmd: AuthCommand) -> anyhow::Result<()> {
    match cmd {
        AuthCommand::Login => {
            let user = store.sign_in().await?;
            match &user.email {
                Some(email) => println!("Signed in as {} ({email}).", user.uid),
                None => println!("Signed in as {}.", user.uid),
            }
            println!("{} trips synced.", store.state().trips.len());
        }
        AuthCommand::Logout => {
            store.sign_out().await?;
            println!("Signed out. Trips are now stored locally.");
        }
        AuthCommand::Status { json } => {
            if json {
                let status = serde_json::json!({
                    "mode": store.mode().to_string(),
                    "user": store.user(),
                    "trips": store.state().trips.len(),
                    "active_trip_id": store.state().active_trip_id,
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("Mode:    {}", store.mode());
                match store.user() {
                    Some(user) => println!("User:    {}", user.uid),
                    None => println!("User:    (signed out)"),
                }
                println!("Trips:   {}", store.state().trips.len());
            }
        }
    }
    Ok(())
}

async fn handle_trip(store: &mut TripStore, cmd: TripCommand) -> anyhow::Result<()> {
    match cmd {
        TripCommand::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(store.state())?);
                return Ok(());
            }
            if store.state().trips.is_empty() {
                println!("No trips.");
                return Ok(());
            }
            let today = chrono::Local::now().date_naive();
            let active = store.state().active_trip_id.as_deref();
            for trip in &store.state().trips {
                let marker = if active == Some(trip.id.as_str()) { "*" } else { " " };
                println!(
                    "{marker} {:<36}  {:<24}  {} to {}  {:<9}  {}",
                    trip.id,
                    trip.title,
                    trip.start_date,
                    trip.end_date,
                    trip.status.to_string(),
                    countdown(trip, today)
                );
            }
        }
        TripCommand::Show { id, json } => {
            let trip = store
                .trip(&id)
                .with_context(|| format!("no trip with id {id}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(trip)?);
            } else {
                print_trip(trip);
            }
        }
        TripCommand::Add {
            title,
            start,
            end,
            cover,
        } => {
            let mut input = NewTrip::new(title, start, end);
            if let Some(cover) = cover {
                input = input.with_cover_image(cover);
            }
            let trip = store.add_trip(input).await?;
            println!(
                "Created trip {} ({} days).",
                trip.id,
                trip.daily_itinerary.len()
            );
        }
        TripCommand::Update(args) => {
            let patch = args.to_patch();
            if patch.is_empty() {
                bail!("nothing to update; pass at least one field");
            }
            let trip = store.update_trip(&args.id, &patch).await?;
            println!("Updated trip {}.", trip.id);
        }
        TripCommand::Delete { id } => {
            store.delete_trip(&id).await?;
            println!("Deleted trip {id}.");
        }
        TripCommand::Select { id } => {
            store.set_active_trip(id.as_deref())?;
            match id {
                Some(id) => println!("Active trip: {id}"),
                None => println!("Selection cleared."),
            }
        }
    }
    Ok(())
}

async fn handle_activity(store: &mut TripStore, cmd: ActivityCommand) -> anyhow::Result<()> {
    match cmd {
        ActivityCommand::Add { trip, day, fields } => {
            let index = day.index(store, &trip)?;
            let activity = store
                .add_activity(&trip, index, fields.to_details()?)
                .await?;
            println!("Added activity {} to day {}.", activity.id, index + 1);
        }
        ActivityCommand::Update {
            trip,
            id,
            day,
            fields,
        } => {
            let index = day.index(store, &trip)?;
            let mut activity = store
                .trip(&trip)
                .and_then(|t| t.daily_itinerary.get(index))
                .and_then(|d| d.activities.iter().find(|a| a.id == id))
                .cloned()
                .with_context(|| format!("no activity {id} on day {}", index + 1))?;
            fields.apply_to(&mut activity.details);
            store.update_activity(&trip, index, activity).await?;
            println!("Updated activity {id}.");
        }
        ActivityCommand::Delete { trip, id, day } => {
            let index = day.index(store, &trip)?;
            store.delete_activity(&trip, index, &id).await?;
            println!("Deleted activity {id}.");
        }
    }
    Ok(())
}

async fn handle_stay(store: &mut TripStore, cmd: StayCommand) -> anyhow::Result<()> {
    match cmd {
        StayCommand::Add { trip, fields } => {
            let stay = store.add_stay(&trip, fields.to_details()?).await?;
            println!("Added stay {}.", stay.id);
        }
        StayCommand::Update { trip, id, fields } => {
            let mut stay = store
                .trip(&trip)
                .and_then(|t| t.stays.iter().find(|s| s.id == id))
                .cloned()
                .with_context(|| format!("no stay {id} in trip {trip}"))?;
            fields.apply_to(&mut stay.details);
            store.update_stay(&trip, stay).await?;
            println!("Updated stay {id}.");
        }
        StayCommand::Delete { trip, id } => {
            store.delete_stay(&trip, &id).await?;
            println!("Deleted stay {id}.");
        }
    }
    Ok(())
}

async fn handle_transport(store: &mut TripStore, cmd: TransportCommand) -> anyhow::Result<()> {
    match cmd {
        TransportCommand::Add { trip, fields } => {
            let transport = store.add_transport(&trip, fields.to_details()).await?;
            println!("Added transport {}.", transport.id);
        }
        TransportCommand::Update { trip, id, fields } => {
            let mut transport = store
                .trip(&trip)
                .and_then(|t| t.transports.iter().find(|l| l.id == id))
                .cloned()
                .with_context(|| format!("no transport {id} in trip {trip}"))?;
            fields.apply_to(&mut transport.details);
            store.update_transport(&trip, transport).await?;
            println!("Updated transport {id}.");
        }
        TransportCommand::Delete { trip, id } => {
            store.delete_transport(&trip, &id).await?;
            println!("Deleted transport {id}.");
        }
    }
    Ok(())
}

async fn handle_checklist(store: &mut TripStore, cmd: ChecklistCommand) -> anyhow::Result<()> {
    match cmd {
        ChecklistCommand::Add { trip, text } => {
            let item = store.add_checklist_item(&trip, text).await?;
            println!("Added checklist item {}.", item.id);
        }
        ChecklistCommand::Check { trip, item, undo } => {
            store.update_checklist(&trip, &item, !undo).await?;
            if undo {
                println!("Unchecked {item}.");
            } else {
                println!("Checked {item}.");
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Local]");
                println!(
                    "  Database path:      {}",
                    config.local_database_path().display()
                );
                println!("  State key:          {}", config.local.state_key);
                println!();
                println!("[Remote]");
                println!(
                    "  Database path:      {}",
                    config.remote_database_path().display()
                );
                println!();
                println!("[Auth]");
                println!(
                    "  Uid:                {}",
                    config.auth.uid.as_deref().unwrap_or("(none)")
                );
                println!();
                println!("[Trips]");
                println!("  Default budget:     {}", config.trips.default_budget);
                println!("  Cover template:     {}", config.trips.cover_image_template);
                println!("  Seed preview trip:  {}", config.trips.seed);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn countdown(trip: &Trip, today: chrono::NaiveDate) -> String {
    match trip.days_until_start(today) {
        1 => "starts tomorrow".to_string(),
        days if days > 1 => format!("{days} days left"),
        _ if today <= trip.end_date => "underway".to_string(),
        _ => "past".to_string(),
    }
}

fn print_trip(trip: &Trip) {
    println!("{} [{}]", trip.title, trip.status);
    println!("{} to {}", trip.start_date, trip.end_date);
    println!("Budget: {:.2}", trip.budget.total);
    if !trip.notes.is_empty() {
        println!("Notes:  {}", trip.notes);
    }

    println!();
    println!("Itinerary");
    for day in &trip.daily_itinerary {
        println!("  Day {} ({})", day.day, day.date);
        for activity in &day.activities {
            let time = activity.details.time.as_deref().unwrap_or("--:--");
            println!("    {time}  {}  [{}]", activity.details.name, activity.id);
        }
    }

    if !trip.stays.is_empty() {
        println!();
        println!("Stays");
        for stay in &trip.stays {
            println!("  {}  [{}]", stay.details.name, stay.id);
        }
    }

    if !trip.transports.is_empty() {
        println!();
        println!("Transport");
        for leg in &trip.transports {
            println!(
                "  {} {} -> {}  [{}]",
                leg.details.mode,
                leg.details.from.as_deref().unwrap_or("?"),
                leg.details.to.as_deref().unwrap_or("?"),
                leg.id
            );
        }
    }

    if !trip.checklist.is_empty() {
        println!();
        println!(
            "Checklist ({}/{})",
            trip.completed_checklist_count(),
            trip.checklist.len()
        );
        for item in &trip.checklist {
            let mark = if item.completed { "x" } else { " " };
            println!("  [{mark}] {}  [{}]", item.item, item.id);
        }
    }
}
