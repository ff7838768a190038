use std::env;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use foundation::bounds::LatLngBounds;
use foundation::ids::TileId;
use foundation::math::{
    LatLng, TILE_ZOOM, bounds_of, covering_count, tile_center, tile_of, tiles_covering,
};
use foundation::time::Millis;
use planner::{Planner, PlannerConfig};
use routing::{CoordinatorState, RouteEvent, ServiceCall, TravelMode};
use storage::FileStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod http;

use http::HttpBackend;

/// Largest rectangle the `tiles` command will list.
const MAX_LISTED_TILES: u64 = 100_000;

#[derive(Parser, Debug)]
#[command(author, version, about = "Tile-based cycling and hiking route planner")]
struct Args {
    /// Routing backend base URL (default: $PLANNER_BACKEND_URL or http://127.0.0.1:8000)
    #[arg(long)]
    backend: Option<String>,

    /// State file (default: $PLANNER_STORE or planner.json)
    #[arg(long)]
    store: Option<PathBuf>,

    /// Planner configuration as JSON; missing fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the tiles covering a rectangle
    Tiles {
        #[arg(long, allow_hyphen_values = true)]
        from: LatLng,
        #[arg(long, allow_hyphen_values = true)]
        to: LatLng,
    },
    /// Print the tile containing a point and its bounds
    Tile {
        #[arg(allow_hyphen_values = true)]
        point: LatLng,
    },
    /// Toggle tiles in the selection
    Select {
        #[arg(required = true)]
        tiles: Vec<TileId>,
    },
    /// Empty the tile selection
    ClearTiles,
    Start {
        #[arg(allow_hyphen_values = true)]
        point: LatLng,
    },
    End {
        #[arg(allow_hyphen_values = true)]
        point: LatLng,
    },
    /// Exchange start and end points
    Swap,
    ClearStart,
    ClearEnd,
    Waypoint {
        #[arg(allow_hyphen_values = true)]
        point: LatLng,
    },
    ClearWaypoints,
    /// Travel mode: car, cycle or foot
    Mode { mode: TravelMode },
    /// Cost of a U-turn on the route
    Cost { cost: f64 },
    /// Compute a route with the backend
    Route {
        /// Save the result as a trace with this name
        #[arg(long)]
        save: Option<String>,
    },
    /// Manage saved traces
    Traces {
        #[command(subcommand)]
        command: TraceCommand,
    },
}

#[derive(Subcommand, Debug)]
enum TraceCommand {
    List,
    Remove { index: usize },
    Duplicate { index: usize },
    /// Append SOURCE to TARGET and delete SOURCE
    Merge { target: usize, source: usize },
    /// Split a trace at the point nearest to POINT
    Split {
        index: usize,
        #[arg(allow_hyphen_values = true)]
        point: LatLng,
    },
    /// Replace the stretch of TARGET between PATCH's endpoints with PATCH
    Insert { target: usize, patch: usize },
    Rename { index: usize, name: String },
    Undo,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = real_main().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn real_main() -> Result<(), String> {
    let args = Args::parse();

    // Pure tile math needs no state.
    match &args.command {
        Command::Tiles { from, to } => {
            let count = covering_count(*from, *to);
            if count > MAX_LISTED_TILES {
                return Err(format!(
                    "{count} tiles in that rectangle, at most {MAX_LISTED_TILES} can be listed"
                ));
            }
            for tile in tiles_covering(*from, *to) {
                println!("{tile}");
            }
            return Ok(());
        }
        Command::Tile { point } => {
            let tile = tile_of(*point);
            let b = bounds_of(tile);
            println!("{tile}\t{}\t{}", b.north_west, b.south_east);
            return Ok(());
        }
        _ => {}
    }

    let store_path = args.store.clone().unwrap_or_else(|| {
        PathBuf::from(env::var("PLANNER_STORE").unwrap_or_else(|_| "planner.json".to_string()))
    });
    let config: PlannerConfig = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
            serde_json::from_str(&raw).map_err(|e| format!("{}: {e}", path.display()))?
        }
        None => PlannerConfig::default(),
    };
    let store = FileStore::open(store_path.clone()).map_err(|e| e.to_string())?;
    let mut planner = Planner::open(store, config).map_err(|e| e.to_string())?;
    let now = Millis::ZERO;

    match args.command {
        Command::Tiles { .. } | Command::Tile { .. } => {}
        Command::Select { tiles } => {
            for tile in tiles {
                // A degenerate view on the centre materializes this tile only.
                let c = tile_center(tile);
                planner.set_viewport(LatLngBounds::from_corners(c, c), TILE_ZOOM as u8);
                let selected = planner.toggle_tile(tile, now).map_err(|e| e.to_string())?;
                println!("{tile}\t{}", if selected { "selected" } else { "unselected" });
            }
        }
        Command::ClearTiles => planner.clear_selection(now).map_err(|e| e.to_string())?,
        Command::Start { point } => planner.set_start(point, now).map_err(|e| e.to_string())?,
        Command::End { point } => planner.set_end(point, now).map_err(|e| e.to_string())?,
        Command::Swap => {
            if !planner.swap_endpoints(now).map_err(|e| e.to_string())? {
                return Err("swap needs both a start and an end point".to_string());
            }
        }
        Command::ClearStart => planner.clear_start(now).map_err(|e| e.to_string())?,
        Command::ClearEnd => planner.clear_end(now).map_err(|e| e.to_string())?,
        Command::Waypoint { point } => planner.add_waypoint(point, now).map_err(|e| e.to_string())?,
        Command::ClearWaypoints => planner.clear_waypoints(now).map_err(|e| e.to_string())?,
        Command::Mode { mode } => planner.set_mode(mode, now).map_err(|e| e.to_string())?,
        Command::Cost { cost } => {
            planner.set_turnaround_cost(cost, now).map_err(|e| e.to_string())?
        }
        Command::Route { save } => {
            let base_url = args.backend.unwrap_or_else(|| {
                env::var("PLANNER_BACKEND_URL")
                    .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string())
            });
            run_route(&mut planner, &HttpBackend::new(&base_url), save).await?;
        }
        Command::Traces { command } => run_traces(&mut planner, command)?,
    }
    Ok(())
}

/// Drives the coordinator against the wall clock until the search ends.
async fn run_route(
    planner: &mut Planner<FileStore>,
    backend: &HttpBackend,
    save: Option<String>,
) -> Result<(), String> {
    let started = Instant::now();
    let clock = || Millis(started.elapsed().as_millis() as u64);

    planner.request_route(clock());
    while let Some(deadline) = planner.next_deadline() {
        let wait = clock().until(deadline);
        if wait > 0 {
            tokio::time::sleep(Duration::from_millis(wait)).await;
        }

        for call in planner.fire_due(clock()) {
            match call {
                ServiceCall::StartRoute {
                    generation,
                    request,
                } => {
                    let response = backend.start_route(&request).await;
                    planner.on_start_response(generation, response, clock());
                }
                ServiceCall::RouteStatus {
                    generation,
                    request,
                } => {
                    let response = backend.route_status(&request).await;
                    planner.on_status_response(generation, response, clock());
                }
            }
        }
        print_events(planner);
    }
    print_events(planner);

    match planner.coordinator().state() {
        CoordinatorState::Complete => {
            if let Some(name) = save {
                let index = planner.commit_route(name).map_err(|e| e.to_string())?;
                info!("saved as trace {index}");
                println!("saved as trace {index}");
            }
            Ok(())
        }
        CoordinatorState::Failed => Err(planner
            .coordinator()
            .failure()
            .map(|f| f.message.clone())
            .unwrap_or_else(|| "route failed".to_string())),
        state => Err(format!("route not computed ({state:?})")),
    }
}

fn print_events(planner: &mut Planner<FileStore>) {
    for event in planner.drain_events() {
        let at = event.at.0;
        match event.payload {
            RouteEvent::NotEnoughData(missing) => println!("[{at}ms] waiting: {missing}"),
            RouteEvent::Waiting => println!("[{at}ms] waiting"),
            RouteEvent::AskRoute => println!("[{at}ms] asking for a route"),
            RouteEvent::Started { session_id } => println!("[{at}ms] search started ({session_id})"),
            RouteEvent::Searching { progress } => match progress {
                Some(p) => println!("[{at}ms] searching {p:.0}%"),
                None => println!("[{at}ms] searching"),
            },
            RouteEvent::RouteUpdated { length_km } => {
                println!("[{at}ms] route updated: {length_km:.2} km")
            }
            RouteEvent::Complete { length_km } => println!("[{at}ms] complete: {length_km:.2} km"),
            RouteEvent::Failed(failure) => {
                let tiles: Vec<String> = failure.tiles.iter().map(|t| t.to_string()).collect();
                println!("[{at}ms] failed: {} [{}]", failure.message, tiles.join(","));
            }
        }
    }
}

fn run_traces(planner: &mut Planner<FileStore>, command: TraceCommand) -> Result<(), String> {
    let applied = match command {
        TraceCommand::List => {
            for (i, t) in planner.traces().iter().enumerate() {
                println!("{i}\t{}\t{:.2} km\t{} points", t.name, t.distance_km, t.route.len());
            }
            if planner.traces().can_undo() {
                println!("({} undo steps)", planner.traces().undo_len());
            }
            return Ok(());
        }
        TraceCommand::Remove { index } => planner.remove_trace(index).map(|_| true),
        TraceCommand::Duplicate { index } => planner.duplicate_trace(index).map(|_| true),
        TraceCommand::Merge { target, source } => planner.merge_traces(target, source),
        TraceCommand::Split { index, point } => planner.split_trace(index, point),
        TraceCommand::Insert { target, patch } => planner.insert_trace(target, patch),
        TraceCommand::Rename { index, name } => planner.rename_trace(index, name).map(|_| true),
        TraceCommand::Undo => planner.undo(),
    }
    .map_err(|e| e.to_string())?;

    if !applied {
        println!("nothing changed");
    }
    Ok(())
}
