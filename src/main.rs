// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use court_rotation::config::DB_ENV_VAR;
use court_rotation::{
    db, Config, RoundError, SessionError, SessionState, STATION_COUNT,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "court-rotation",
    about = "Rotate doubles players across courts with fair sit-outs and fresh partners",
    version
)]
struct Cli {
    /// Session database (default: ./court_rotation.db)
    #[arg(long, global = true, env = DB_ENV_VAR)]
    db: Option<PathBuf>,

    /// Show debug logs
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a participant
    Add { name: String },

    /// Delete a participant and their partnership history
    Remove { who: String },

    /// Take a participant out of rotation for a while
    Pause { who: String },

    /// Put a paused participant back into rotation
    Resume { who: String },

    /// Check a participant in or out
    Toggle { who: String },

    /// Show the roster
    List,

    /// Assign a new round
    Shuffle,

    /// Show the current round
    Courts,

    /// Empty every court (history and counters are kept)
    ClearCourts,

    /// Delete all players, partnerships and assignments
    ClearAll,

    /// Interactive court view
    Ui,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match (&cli.command, cli.verbose) {
        (_, true) => tracing::Level::DEBUG,
        (Commands::Ui, false) => tracing::Level::ERROR,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::resolve(cli.db.as_deref());
    let conn = db::open_database(&config.db_path)?;
    let mut session = db::load_state(&conn).context("Failed to load session")?;

    match cli.command {
        Commands::Add { name } => {
            let added = session.add_participant(&name)?;
            println!("✓ Added {}", added.name);
        }
        Commands::Remove { who } => {
            let id = resolve(&session, &who)?;
            let removed = session.remove_participant(&id)?;
            println!("✓ Removed {}", removed.name);
        }
        Commands::Pause { who } => {
            let id = resolve(&session, &who)?;
            session.pause(&id)?;
            println!("⏸  Paused {}", session.name_of(&id).unwrap_or(&who));
        }
        Commands::Resume { who } => {
            let id = resolve(&session, &who)?;
            session.resume(&id)?;
            println!("▶️  Resumed {}", session.name_of(&id).unwrap_or(&who));
        }
        Commands::Toggle { who } => {
            let id = resolve(&session, &who)?;
            let active = session.toggle_active(&id)?;
            let name = session.name_of(&id).unwrap_or(&who);
            if active {
                println!("✓ {} checked in", name);
            } else {
                println!("✓ {} checked out", name);
            }
        }
        Commands::List => {
            print_roster(&session);
            return Ok(());
        }
        Commands::Shuffle => match session.shuffle() {
            Ok(result) if result.assignments.is_empty() => {
                println!("🪑 Fewer than 4 eligible players: everyone sits out this round");
                println!();
                print_courts(&session);
            }
            Ok(result) => {
                println!("🎲 Players shuffled across {} courts!", result.assignments.len());
                if !result.forced_repeats.is_empty() {
                    println!(
                        "⚠️  {} team(s) had to repeat a recent pairing",
                        result.forced_repeats.len()
                    );
                }
                println!();
                print_courts(&session);
            }
            Err(SessionError::Round(RoundError::NoEligibleParticipants)) => {
                println!("❌ No active players to shuffle. Add or resume players first.");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        },
        Commands::Courts => {
            print_courts(&session);
            return Ok(());
        }
        Commands::ClearCourts => {
            session.clear_stations();
            println!("✓ Courts cleared!");
        }
        Commands::ClearAll => {
            session.clear_all();
            println!("✓ All data cleared!");
        }
        Commands::Ui => {
            run_ui_mode(&conn, session)?;
            return Ok(());
        }
    }

    db::save_state(&conn, &session)?;
    Ok(())
}

/// Map an id or a name to a participant id
fn resolve(session: &SessionState, who: &str) -> Result<String> {
    session
        .find(who)
        .map(|p| p.id.clone())
        .ok_or_else(|| SessionError::ParticipantNotFound(who.to_string()).into())
}

fn print_roster(session: &SessionState) {
    if session.participants.is_empty() {
        println!("No players yet. Add one with: court-rotation add <name>");
        return;
    }

    println!("🏸 Players ({} eligible)", session.eligible_count());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for p in &session.participants {
        println!(
            "  {:<24} {:<9} sat out {:>2}x   {}",
            p.name,
            p.status_label(),
            p.sit_out_count,
            p.id
        );
    }
}

fn print_courts(session: &SessionState) {
    let current = session.current_round();
    let name = |id: &String| session.name_of(id).unwrap_or("?").to_string();

    if current.is_empty() {
        println!("No courts assigned. Run: court-rotation shuffle");
    }

    for court in 1..=STATION_COUNT {
        let Some(row) = current.iter().find(|a| a.station_number == court) else {
            continue;
        };

        let team_a: Vec<String> = row.team_a().iter().map(name).collect();
        let team_b: Vec<String> = row.team_b().iter().map(name).collect();
        println!("Court {}", court);
        println!("  🔵 Team A: {}", team_a.join(" & "));
        println!("  🔴 Team B: {}", team_b.join(" & "));
        println!("  {}/4 players assigned", row.player_ids.len());
    }

    let waiting = session.sitting_out();
    if !waiting.is_empty() {
        println!();
        println!("🪑 Sitting Out ({})", waiting.len());
        for p in waiting {
            println!("  {}", p.name);
        }
    }

    let paused = session.paused();
    if !paused.is_empty() {
        println!();
        println!("⏸  Paused ({})", paused.len());
        for p in paused {
            println!("  {}", p.name);
        }
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(conn: &rusqlite::Connection, session: SessionState) -> Result<()> {
    let mut app = ui::App::new(session);
    ui::run_ui(&mut app, conn)?;

    println!("\n✅ UI closed successfully");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_conn: &rusqlite::Connection, _session: SessionState) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    std::process::exit(1);
}
