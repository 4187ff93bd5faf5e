use r_jukebox::audio::SimulatedPlayer;
use r_jukebox::config::Settings;
use r_jukebox::init_app_dirs;
use r_jukebox::player::{spawn_control_loop, ControllerOptions, PlaybackController};
use r_jukebox::presentation::{ConsoleSink, LogSink, PresentationSink};
use r_jukebox::resolver::CatalogResolver;
use r_jukebox::session::{SessionKey, SessionRegistry};
use r_jukebox::ui::{Cli, CommandReply, CommandSurface};
use std::error::Error;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(default_filter: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let (plain, structured) = if json {
        (None, Some(fmt::layer().json().with_writer(std::io::stderr)))
    } else {
        (Some(fmt::layer().with_writer(std::io::stderr)), None)
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(structured)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::new();
    let args = &cli.args;

    init_app_dirs()?;

    let config_path = args.config_path();
    let mut settings = Settings::load(&config_path)?;
    args.apply_overrides(&mut settings);
    settings.validate()?;

    init_tracing(&settings.log_filter, args.log_json);
    info!(config = %config_path.display(), "Settings loaded.");

    let catalog = match &settings.catalog_path {
        Some(path) => CatalogResolver::load(path)?,
        None => {
            warn!("No catalog configured; every query will come back empty.");
            CatalogResolver::new(Vec::new())
        }
    };
    let track_count = catalog.tracks().len();

    let player = Arc::new(SimulatedPlayer::new(catalog.lengths(), settings.fallback_track_length()));
    let sink: Arc<dyn PresentationSink> = if args.log_json {
        Arc::new(LogSink)
    } else {
        Arc::new(ConsoleSink::new())
    };
    let registry = Arc::new(SessionRegistry::new(settings.history_capacity, settings.default_volume));
    let options = ControllerOptions { progress_interval: settings.progress_interval() };

    let (controller, bridge) = PlaybackController::new(registry, player, sink, options);
    let (control, control_task) = spawn_control_loop(Arc::new(controller), bridge);
    let surface = CommandSurface::new(control.clone(), Arc::new(catalog), SessionKey(args.session), settings.volume_step);

    cli.display_banner(track_count);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                cli.display_error(&e);
                break;
            }
        };
        match surface.handle_line(&line).await {
            CommandReply::Text(reply) => cli.display_reply(&reply),
            CommandReply::Quit => break,
        }
    }

    control.shutdown().await;
    if let Err(e) = control_task.await {
        cli.display_error(&e);
    }
    info!("Goodbye.");
    Ok(())
}
