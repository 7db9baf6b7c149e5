use color_eyre::{eyre::eyre, Result};
use rc_receiver::receiver::{Receiver, ReceiverHandle, SweepSource};
use rc_receiver::Settings;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

const SOURCE_JITTER: f32 = 0.02;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(Settings::default_path);
    info!("Using settings file {}", config_path.display());

    let settings = Settings::load_or_default(&config_path).await?;
    debug!("Settings: {:?}", settings);

    // Simulated transport; a serial or PWM source would be plugged in here
    let source = SweepSource::new(settings.runtime.loop_rate_hz, SOURCE_JITTER);
    let receiver = Receiver::new(source, settings.receiver);

    let (event_tx, mut event_rx) = mpsc::channel(settings.runtime.event_buffer);
    let handle = ReceiverHandle::spawn(receiver, Some(settings.runtime.clone()), event_tx)
        .map_err(|e| eyre!("Failed to spawn receiver: {}", e))?;

    let mut outputs = handle.subscribe();
    let cancel = handle.cancel_token();
    let monitor = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                Some(event) = event_rx.recv() => {
                    info!(
                        "Stick combination {} stable at cycle {}",
                        event.combination, event.cycle
                    );
                }
                changed = outputs.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let output = *outputs.borrow_and_update();
                    debug!(
                        "cycle {} roll {:+.3} pitch {:+.3} yaw {:+.3} throttle {:.3} aux {:?}",
                        output.cycle,
                        output.frame.roll,
                        output.frame.pitch,
                        output.frame.yaw,
                        output.frame.throttle,
                        output.frame.aux
                    );
                }
            }
        }
    });

    info!("Receiver running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    handle.shutdown();
    handle.join().await?;
    monitor
        .await
        .map_err(|e| eyre!("Monitor task failed: {}", e))?;

    info!("Receiver stopped");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    let level = match std::env::var("RUST_LOG").as_deref() {
        Ok("trace") => Level::TRACE,
        Ok("debug") => Level::DEBUG,
        Ok("warn") => Level::WARN,
        Ok("error") => Level::ERROR,
        _ => Level::INFO,
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
