use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use rahukaal::config::ALERT_OFFSETS;
use rahukaal::notification::{Alert, AlertScheduler, TokioAlertScheduler};
use rahukaal::session::ForecastSession;
use rahukaal::{AppContext, Coordinates, DayEntry, RahuConfig, logging, web};

#[derive(Parser, Debug)]
#[command(name = "rahukaal", version, about = "Daily Rahu Kaal windows and reminders")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// IANA time zone used to display times, e.g. Asia/Kolkata (defaults to the system zone)
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// Compute sunrise and sunset locally instead of calling the API
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show today's window
    Today(LocationArgs),
    /// Show the window for the coming days
    Forecast {
        #[command(flatten)]
        location: LocationArgs,
        /// Number of days, up to the configured maximum
        #[arg(short, long)]
        days: Option<usize>,
    },
    /// Search places by name
    Search { query: String },
    /// Wait for today's window and print alerts as they fire
    Watch {
        #[command(flatten)]
        location: LocationArgs,
        /// Minutes before the start to warn (0, 5, 10, 15, 30 or 60)
        #[arg(short, long)]
        offset: Option<u32>,
    },
    /// Remember the default alert offset in minutes
    SetOffset { minutes: u32 },
    /// Serve the JSON API
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Args, Debug)]
struct LocationArgs {
    /// Latitude in decimal degrees
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    lat: Option<f64>,
    /// Longitude in decimal degrees
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lng: Option<f64>,
    /// Display name for the location
    #[arg(long)]
    label: Option<String>,
    /// Remember this location for later runs
    #[arg(long)]
    save: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = RahuConfig::load_from_path(cli.config.clone())?;
    if cli.offline {
        config.provider.offline = true;
    }
    logging::init(&config.logging, cli.verbose)?;

    let tz = cli
        .timezone
        .as_deref()
        .map(|name| name.parse::<Tz>())
        .transpose()
        .map_err(|e| anyhow::anyhow!("Unknown time zone: {e}"))?;

    let port = config.server.port;
    let ctx = AppContext::from_config(config)?;

    match cli.command {
        Command::Today(location) => {
            let session = open_session(&ctx, &location).await?;
            print_today(&session, tz);
        }
        Command::Forecast { location, days } => {
            let session = open_session(&ctx, &location).await?;
            let days = days
                .unwrap_or(ctx.config.forecast.initial_days as usize)
                .clamp(1, ctx.assembler.max_days());
            while session.snapshot().forecast.len() < days && session.has_more() {
                if !session.load_more().await {
                    break;
                }
            }
            print_forecast(&session, days, tz);
        }
        Command::Search { query } => {
            let matches = ctx.geocoder.search_by_name(&query).await;
            if matches.is_empty() {
                println!("No places found for '{query}'");
            }
            for place in matches {
                println!(
                    "{:>9.4} {:>9.4}  {}",
                    place.latitude, place.longitude, place.display_name
                );
            }
        }
        Command::Watch { location, offset } => {
            let offset = match offset {
                Some(minutes) => minutes,
                None => ctx.preferences.alert_offset().await,
            };
            if !ALERT_OFFSETS.contains(&offset) {
                bail!("Alert offset must be one of {ALERT_OFFSETS:?} minutes");
            }
            let session = open_session(&ctx, &location).await?;
            print_today(&session, tz);
            watch(&session, offset, tz).await?;
        }
        Command::SetOffset { minutes } => {
            ctx.preferences.set_alert_offset(minutes).await?;
            println!("Alerts will warn {minutes} minutes ahead");
        }
        Command::Serve { port: override_port } => {
            web::run(ctx, override_port.unwrap_or(port)).await?;
        }
    }

    Ok(())
}

/// Resolve the location from arguments or preferences and load today's forecast
async fn open_session(ctx: &AppContext, args: &LocationArgs) -> Result<ForecastSession> {
    let coords = match (args.lat, args.lng) {
        (Some(lat), Some(lng)) => {
            let coords = Coordinates {
                latitude: lat,
                longitude: lng,
                label: args.label.clone(),
            };
            coords.validate()?;
            ctx.labelled(coords).await
        }
        _ => {
            if !ctx.preferences.has_location().await {
                info!("No saved location, using the default");
            }
            ctx.preferences.location().await
        }
    };
    if args.save {
        ctx.preferences.set_location(&coords).await?;
    }

    let session = ctx.session(coords);
    let outcome = session
        .load()
        .await
        .with_context(|| "Failed to load today's Rahu Kaal")?;
    debug!("Load finished: {outcome:?}");
    Ok(session)
}

fn fmt_time(instant: DateTime<Utc>, tz: Option<Tz>) -> String {
    match tz {
        Some(tz) => instant.with_timezone(&tz).format("%H:%M").to_string(),
        None => instant.with_timezone(&Local).format("%H:%M").to_string(),
    }
}

fn print_today(session: &ForecastSession, tz: Option<Tz>) {
    let snapshot = session.snapshot();
    let Some(entry) = snapshot.today else {
        return;
    };
    let now = Utc::now();
    println!(
        "Rahu Kaal for {} on {}",
        snapshot.coords.display_name(),
        entry.date.format("%a %d %b %Y")
    );
    println!("  Sunrise  {}", fmt_time(entry.sunrise, tz));
    println!("  Sunset   {}", fmt_time(entry.sunset, tz));
    println!("  Window   {}", window_range(&entry, tz));
    println!("  Status   {}", entry.window.describe_remaining(now));
}

fn window_range(entry: &DayEntry, tz: Option<Tz>) -> String {
    format!(
        "{} - {} ({}m)",
        fmt_time(entry.window.start, tz),
        fmt_time(entry.window.end, tz),
        entry.window.duration().num_minutes()
    )
}

fn print_forecast(session: &ForecastSession, days: usize, tz: Option<Tz>) {
    let snapshot = session.snapshot();
    println!("Rahu Kaal forecast for {}", snapshot.coords.display_name());
    for entry in snapshot.forecast.entries().iter().take(days) {
        println!("  {}  {}", entry.date.format("%a %d %b"), window_range(entry, tz));
    }
    if snapshot.forecast.len() < days {
        println!("  ({} of {days} days available)", snapshot.forecast.len());
    }
}

async fn watch(session: &ForecastSession, offset: u32, tz: Option<Tz>) -> Result<()> {
    let Some(request) = session.alert_request(offset) else {
        bail!("Today's window is not loaded");
    };
    let sink = Arc::new(move |alert: Alert| {
        let body = match tz {
            Some(tz) => alert.body(&tz),
            None => alert.body(&Local),
        };
        println!("[{}] {}: {body}", fmt_time(alert.fire_at, tz), alert.title());
    });

    let mut scheduler = TokioAlertScheduler::new(sink);
    scheduler.schedule(&request);
    if scheduler.pending() == 0 {
        println!("No alerts left for today");
        return Ok(());
    }

    println!("Waiting for {} alert(s), press Ctrl-C to stop", scheduler.pending());
    let interrupted = tokio::select! {
        () = scheduler.wait() => false,
        _ = tokio::signal::ctrl_c() => true,
    };
    if interrupted {
        scheduler.cancel_all();
        println!("Stopped");
    }
    Ok(())
}
