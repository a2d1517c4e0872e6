//! videomeet - conference rooms from the terminal

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use videomeet::auth;
use videomeet::config::Config;
use videomeet::directory::{FileStore, RoomDirectory, RoomRecord};
use videomeet::navigation::{generate_room_id, NavigationParams, Route};
use videomeet::session::{SessionController, StartOutcome};
use videomeet::surface;
use videomeet::widget::loopback::LoopbackLoader;
use videomeet::widget::WidgetOptions;

#[derive(Parser)]
#[command(name = "videomeet")]
#[command(about = "Create or join named video conference rooms")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a username and password
    Login { username: String, password: String },

    /// Manage the room directory
    Rooms {
        #[command(subcommand)]
        command: RoomCommands,
    },

    /// Print a join link
    Link {
        /// Room id (a fresh one is generated when omitted)
        #[arg(long)]
        room: Option<String>,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        moderator: bool,
    },

    /// Open a conference route, e.g. "/room/room-001?name=Ann&moderator=true"
    Join {
        route: String,

        /// Print the widget construction options and exit
        #[arg(long)]
        print_options: bool,

        /// Show the widget's own toolbar
        #[arg(long)]
        native_controls: bool,

        /// Simulate a lobby guest knocking (repeatable)
        #[arg(long = "knock")]
        knocking: Vec<String>,
    },
}

#[derive(Subcommand)]
enum RoomCommands {
    /// List rooms
    List {
        /// Only rooms this user created or joined
        #[arg(long)]
        user: Option<String>,
    },
    /// Create a room
    Create {
        name: String,
        #[arg(long)]
        creator: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Flip a room between active and paused
    Toggle { id: String },
    /// Delete a room
    Delete { id: String },
    /// Add a user to a room and print the join link
    Join {
        id: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        moderator: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Login { username, password } => {
            let user = auth::authenticate(&username, &password)
                .ok_or_else(|| anyhow!("Invalid username or password"))?;
            println!("Signed in as {} (id {})", user.name, user.id);
            Ok(())
        }
        Commands::Rooms { command } => rooms(&config, command),
        Commands::Link {
            room,
            name,
            moderator,
        } => {
            let room_id = room.unwrap_or_else(generate_room_id);
            println!("{}", NavigationParams::new(room_id, name, moderator).to_path());
            Ok(())
        }
        Commands::Join {
            route,
            print_options,
            native_controls,
            knocking,
        } => {
            let mut config = config;
            config.widget.native_controls |= native_controls;
            join(&config, &route, print_options, knocking).await
        }
    }
}

fn print_room(room: &RoomRecord) {
    println!(
        "{:<10} {:<28} {:<8} by {:<16} {}/{} participants  created {}",
        room.id,
        room.name,
        if room.is_active { "active" } else { "paused" },
        auth::display_name_for(&room.created_by),
        room.participants.len(),
        room.max_participants
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".to_string()),
        room.created_at.format("%Y-%m-%d %H:%M"),
    );
}

fn rooms(config: &Config, command: RoomCommands) -> Result<()> {
    let mut directory = RoomDirectory::load(FileStore::new(config.data_dir()));

    match command {
        RoomCommands::List { user: None } => {
            directory.list().iter().for_each(print_room);
        }
        RoomCommands::List { user: Some(user) } => {
            println!("My rooms:");
            directory.owned_by(&user).into_iter().for_each(print_room);
            println!("Joined rooms:");
            directory.joined_by(&user).into_iter().for_each(print_room);
        }
        RoomCommands::Create {
            name,
            creator,
            description,
        } => {
            let room = directory.create(&name, description.as_deref(), &creator)?;
            print_room(&room);
        }
        RoomCommands::Toggle { id } => {
            let active = directory.toggle_active(&id)?;
            println!("{} is now {}", id, if active { "active" } else { "paused" });
        }
        RoomCommands::Delete { id } => {
            let room = directory.remove(&id)?;
            println!("Deleted {} ({})", room.name, room.id);
        }
        RoomCommands::Join {
            id,
            user,
            moderator,
        } => {
            let name = auth::user_by_id(&user)
                .map(|u| u.name)
                .with_context(|| format!("Unknown user '{}'", user))?;
            directory.join(&id, &user)?;
            println!("{}", NavigationParams::new(id, Some(name), moderator).to_path());
        }
    }

    Ok(())
}

async fn join(config: &Config, route: &str, print_options: bool, knocking: Vec<String>) -> Result<()> {
    let params = match Route::parse(route) {
        Route::Room(params) => params,
        Route::Home => bail!("'{}' is the home view, not a room", route),
        Route::NotFound(path) => bail!("No such route: {}", path),
    };
    let session_config = params.session_config();

    if print_options {
        let options = WidgetOptions::for_session(&session_config, &config.widget);
        println!("{}", serde_json::to_string_pretty(&options)?);
        return Ok(());
    }

    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let loader = LoopbackLoader::new().with_knocking(knocking);
    let mut controller = SessionController::new(loader, config.session_settings(), notice_tx);

    match controller.start(session_config) {
        Ok(StartOutcome::Started) => {}
        Ok(StartOutcome::Redirected(reason)) => {
            println!("{}; back to {}", reason, Route::Home.to_path());
            return Ok(());
        }
        // Stays initializing; the surface shows the failure
        Err(e) => tracing::warn!("{}", e),
    }

    surface::run(&mut controller, notice_rx).await?;
    controller.stop();
    Ok(())
}
