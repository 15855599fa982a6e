use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use vibrowtion::domain::events::StatusEvent;
use vibrowtion::domain::settings::SettingsService;
use vibrowtion::infrastructure::bluetooth::{platform_radio, start, LinkOptions};
use vibrowtion::infrastructure::haptics::TracingHapticOutput;
use vibrowtion::infrastructure::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings_service = SettingsService::new()?;
    let settings = settings_service.get().clone();

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = logging::init_logger(&settings.log_settings)?;
    info!("Starting Vibrowtion (settings: {:?})", settings_service.path());

    let options = LinkOptions {
        raw_data_logging: settings.debug_raw_data_logging,
    };
    let (link, mut status) = start(TracingHapticOutput::new(), options, platform_radio)
        .context("Bluetooth LE is not available on this host")?;

    if settings.auto_connect {
        link.request_connect();
    }
    info!("Commands: connect, disconnect, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            event = status.recv() => match event {
                Some(event) => log_status(&event),
                None => break,
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match line.trim() {
                    "connect" => link.request_connect(),
                    "disconnect" => link.request_disconnect(),
                    "quit" | "exit" => break,
                    "" => {}
                    other => warn!("Unknown command: {}", other),
                },
                Ok(None) => stdin_open = false,
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    link.stop().await;
    info!("Vibrowtion stopped");
    Ok(())
}

fn log_status(event: &StatusEvent) {
    match event {
        StatusEvent::StateChanged { from, to } => info!("Link state: {} -> {}", from, to),
        StatusEvent::ConnectionFailed(e) => warn!("Connection failed: {}", e),
        StatusEvent::PayloadRejected(len) => warn!("Rejected {}-byte payload", len),
        StatusEvent::DataAvailable(_) | StatusEvent::HapticFired(_) => debug!("{:?}", event),
        other => info!("{:?}", other),
    }
}
