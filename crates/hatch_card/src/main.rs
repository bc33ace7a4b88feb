use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use clap::Parser;
use hatch_card::AnchoredClock;
use hatch_card::CardConfig;
use hatch_card::Clock;
use hatch_card::EntityState;
use hatch_card::SimulatedHost;
use hatch_card::Widget;
use hatch_card::WidgetEvent;
use hatch_card::WidgetFile;
use hatch_card::config::TimerSource;
use hatch_card::gesture::HOLD_THRESHOLD_MS;
use hatch_card::logging::init_tracing;
use serde_json::json;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;

/// Run a Hatch card against a simulated dashboard host.
///
/// Commands are read from stdin, one per line: `tap`, `double`, `hold`,
/// `press`, `release`, `timer <minutes>`, `cancel`, `volume <up|down|level>`,
/// `brightness <0-255>`, `sound <mode>`, `quit`.
#[derive(Parser, Debug)]
#[clap(version, about)]
struct Cli {
    /// Card configuration file
    #[clap(default_value = "hatch_card.toml")]
    config: PathBuf,

    /// Register the device driver's `hatch.set_timer` / `hatch.cancel_timer`
    #[clap(long)]
    device_driver: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let file = WidgetFile::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    init_tracing(&file.logging);

    tracing::info!("hatch_card starting");
    tracing::info!("Loaded config from: {}", cli.config.display());

    let clock: Arc<dyn Clock> = Arc::new(AnchoredClock::new());
    let host = Arc::new(SimulatedHost::new(clock.clone()));
    seed_host(&host, &file.card)?;
    if cli.device_driver {
        host.register_service("hatch", "set_timer");
        host.register_service("hatch", "cancel_timer");
    }

    let widget = Widget::new(host.clone(), clock, file.card.clone())?;
    let mut view = widget.subscribe();
    let (tx, rx) = mpsc::channel(16);
    let card = tokio::spawn(widget.run(rx));

    tokio::spawn(async move {
        while view.changed().await.is_ok() {
            let current = view.borrow_and_update().clone();
            match serde_json::to_string(&current) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!("Failed to render view: {}", e),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        let events = match parse_command(&words, file.card.volume_step) {
            Ok(Some(events)) => events,
            Ok(None) => break,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        for (delay, event) in events {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if tx.send(event).await.is_err() {
                bail!("card stopped unexpectedly");
            }
        }
    }

    // Best effort; the card also stops once the sender is dropped.
    let _ = tx.send(WidgetEvent::Unmount).await;
    card.await?;

    for call in host.calls() {
        tracing::debug!("Recorded {} {:?}", call, call.data);
    }
    tracing::info!("hatch_card stopped");
    Ok(())
}

/// States for the configured entities, as a fresh device would report them.
fn seed_host(host: &SimulatedHost, card: &CardConfig) -> Result<()> {
    host.set_entity(
        &card.light_entity,
        EntityState::new("off")
            .with_attribute("friendly_name", "Hatch Rest")
            .with_attribute("brightness", 0)
            .with_attribute("rgb_color", json!([255, 160, 60])),
    );
    host.set_entity(
        &card.media_player_entity,
        EntityState::new("idle")
            .with_attribute("volume_level", 0.3)
            .with_attribute("sound_mode", "WhiteNoise")
            .with_attribute("sound_mode_list", json!(["WhiteNoise", "Ocean", "Rain", "Wind"])),
    );

    match card.timer_source()? {
        TimerSource::Local => {}
        TimerSource::JsonHelper { entity_id } => host.set_entity(&entity_id, EntityState::new("")),
        TimerSource::NativeTimer { entity_id } => {
            host.set_entity(&entity_id, EntityState::new("idle"))
        }
    }
    Ok(())
}

type Script = Vec<(Duration, WidgetEvent)>;

/// Events for one command line. `None` means quit.
fn parse_command(words: &[&str], volume_step: f64) -> Result<Option<Script>> {
    let now = Duration::ZERO;
    let tap = Duration::from_millis(60);
    let hold = Duration::from_millis(HOLD_THRESHOLD_MS as u64 + 100);

    let script = match words {
        [] => Vec::new(),
        ["quit" | "exit"] => return Ok(None),
        ["press"] => vec![(now, WidgetEvent::Press)],
        ["release"] => vec![(now, WidgetEvent::Release)],
        ["tap"] => vec![(now, WidgetEvent::Press), (tap, WidgetEvent::Release)],
        ["double"] => vec![
            (now, WidgetEvent::Press),
            (tap, WidgetEvent::Release),
            (tap, WidgetEvent::Press),
            (tap, WidgetEvent::Release),
        ],
        ["hold"] => vec![(now, WidgetEvent::Press), (hold, WidgetEvent::Release)],
        ["timer", minutes] => {
            let minutes = minutes.parse().context("timer takes whole minutes")?;
            vec![(now, WidgetEvent::StartTimer(minutes))]
        }
        ["cancel"] => vec![(now, WidgetEvent::CancelTimer)],
        ["volume", "up"] => vec![(now, WidgetEvent::VolumeStep(volume_step))],
        ["volume", "down"] => vec![(now, WidgetEvent::VolumeStep(-volume_step))],
        ["volume", level] => {
            let level = level.parse().context("volume takes up, down or 0-1")?;
            vec![(now, WidgetEvent::SetVolume(level))]
        }
        ["brightness", value] => {
            let value = value.parse().context("brightness takes 0-255")?;
            vec![(now, WidgetEvent::SetBrightness(value))]
        }
        ["sound", mode] => vec![(now, WidgetEvent::SelectSoundMode(mode.to_string()))],
        other => bail!("unknown command: {}", other.join(" ")),
    };

    Ok(Some(script))
}
