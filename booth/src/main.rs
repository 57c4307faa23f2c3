mod compositor;
mod delivery;
mod export;
mod pipeline;
mod scheduler;
mod session;
mod source;

use lovelens_common::config::Config;
use lovelens_common::filter::FilterKind;
use lovelens_common::frame::CapturedFrame;
use pipeline::PhotoPipeline;
use scheduler::{CaptureEvent, Scheduler};
use session::Session;
use source::CameraSource;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let mut config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    if let Err(e) = config.telegram.resolve_secrets() {
        error!(error = %e, "telegram credentials missing");
        std::process::exit(1);
    }

    let filter = match FilterKind::from_id(&config.capture.filter) {
        Some(f) => f,
        None => {
            warn!(
                filter = config.capture.filter,
                "unknown filter in config, falling back to 'none'"
            );
            FilterKind::None
        }
    };

    info!(
        camera = config.camera.url,
        mode = config.camera.mode,
        filter = filter.id(),
        auto_send = config.capture.auto_send,
        interval_ms = config.capture.auto_send_interval_ms,
        "starting lovelens booth"
    );

    let client = match delivery::TelegramClient::new(&config.telegram) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to build delivery client");
            std::process::exit(1);
        }
    };

    let mut session = Session::new(filter);
    let stream = match CameraSource::acquire(&config.camera).await {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to acquire camera");
            std::process::exit(1);
        }
    };
    let frames = stream.frames();
    session.attach(stream);

    let pipeline = Arc::new(PhotoPipeline::new(
        frames.clone(),
        session.filter_watch(),
        client,
    ));
    let (mut scheduler, mut events) = Scheduler::new(pipeline);

    if config.capture.auto_send {
        scheduler.start_auto_send(Duration::from_millis(config.capture.auto_send_interval_ms));
        run_until_shutdown(&mut events).await;
    } else {
        single_shot(&mut session, &config, frames, &scheduler, &mut events).await;
    }

    scheduler.stop_auto_send();
    session.detach();
    info!("booth stopped");
}

/// Auto-send mode: keep delivering on the interval until ctrl-c, surfacing
/// manual-capture outcomes as they arrive.
async fn run_until_shutdown(events: &mut mpsc::UnboundedReceiver<CaptureEvent>) {
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            event = events.recv() => match event {
                Some(event) => notify(event),
                None => break,
            },
        }
    }
}

/// Single-capture mode: wait for the camera's first frame, send one photo,
/// and keep a local review copy next to it.
async fn single_shot(
    session: &mut Session,
    config: &Config,
    frames: watch::Receiver<Option<CapturedFrame>>,
    scheduler: &Scheduler<PhotoPipeline>,
    events: &mut mpsc::UnboundedReceiver<CaptureEvent>,
) {
    let mut frames = frames;
    if frames.borrow().is_none() {
        match tokio::time::timeout(Duration::from_secs(10), frames.changed()).await {
            Ok(Ok(())) => {}
            _ => {
                error!("no frame from camera within 10s");
                return;
            }
        }
    }

    scheduler.capture_once();
    if let Some(event) = events.recv().await {
        notify(event);
    }

    let Some(frame) = session.latest_frame() else {
        return;
    };
    match compositor::compose(&frame, session.selected_filter()) {
        Ok(still) => {
            match export::save_still(&still, &config.export).await {
                Ok(path) => match export::share(&path, &config.export).await {
                    Ok(()) => {}
                    Err(export::ExportError::ShareUnsupported) => {
                        info!("sharing not supported on this deployment");
                    }
                    Err(e) => warn!(error = %e, "share failed"),
                },
                Err(e) => warn!(error = %e, "export failed"),
            }
            session.last_still = Some(still);
        }
        Err(e) => warn!(error = %e, "compose failed"),
    }
}

/// Stand-in for the toast layer: one log line per user-initiated outcome.
fn notify(event: CaptureEvent) {
    match event {
        CaptureEvent::Sent { message_id } => info!(?message_id, "photo sent"),
        CaptureEvent::Failed { reason } => warn!(reason = %reason, "photo send failed"),
    }
}
