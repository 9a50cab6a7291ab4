// SPDX-License-Identifier: MPL-2.0
use std::path::PathBuf;
use std::time::Duration;
use toast_bus::config;
use toast_bus::notifications::{Notification, NotificationBus, PublishOptions};
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
Publishes a burst of sample notifications and prints every snapshot.

USAGE:
  toast_bus [--config <path>] [--wait <ms>]

OPTIONS:
  --config <path>  Load default durations from this settings file
  --wait <ms>      How long to watch before tearing down [default: 6000]
  -h, --help       Print help
";

#[tokio::main]
async fn main() -> toast_bus::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }
    let config_path: Option<PathBuf> = args
        .opt_value_from_str("--config")
        .map_err(|err| toast_bus::Error::Config(err.to_string()))?;
    let wait_ms: u64 = args
        .opt_value_from_str("--wait")
        .map_err(|err| toast_bus::Error::Config(err.to_string()))?
        .unwrap_or(6_000);

    let config = match config_path {
        Some(path) => config::load_from_path(&path)?,
        None => config::load()?,
    };
    let bus = NotificationBus::with_tokio(config)?;

    let subscription = bus.subscribe(|toasts: &[Notification]| {
        let rendered: Vec<String> = toasts
            .iter()
            .map(|n| format!("[{}] {}", n.kind(), n.message()))
            .collect();
        println!("{} active: {}", toasts.len(), rendered.join(", "));
    });

    bus.success("Church profile saved", None);
    bus.info("Event registration opens tomorrow", Some(1_500));
    bus.error("Could not reach the member directory", None);
    let pinned = bus.publish(
        PublishOptions::new("Role changes pending review")
            .kind("warning")
            .persistent(),
    );

    tokio::time::sleep(Duration::from_millis(wait_ms)).await;
    bus.dismiss(pinned);
    subscription.unsubscribe();
    bus.teardown();
    Ok(())
}
