use log::{LevelFilter, error, info};
use std::error::Error;
use std::path::Path;

use railsync::config::GameConfig;
use railsync::core::audio::{AudioClock, ManualClock};
use railsync::core::input::{InputEdge, LaneId};
use railsync::game::chart::{Chart, ChartEvent};
use railsync::game::gameplay::{Phase, Session};
use railsync::game::scores::SessionSummary;

const FRAME_SECONDS: f64 = 1.0 / 120.0;
/// Music keeps playing this many beats after the last chart event.
const TAIL_BEATS: f64 = 4.0;
const MAX_FRAMES: usize = 120 * 60 * 30;
const AUTOPLAY_SEED: u64 = 0x5eed;

fn main() -> Result<(), Box<dyn Error>> {
    // --- Logging Setup ---
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .filter_module("railsync::game::gameplay", LevelFilter::Info)
        .filter_module("railsync::game::lane", LevelFilter::Debug)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = match args.first() {
        Some(path) => GameConfig::load(Path::new(path))?,
        None => {
            info!("No config given, using defaults.");
            GameConfig::default()
        }
    };
    let chart = match args.get(1) {
        Some(path) => Chart::load(Path::new(path))?,
        None => {
            info!("No chart given, playing the built-in demo.");
            Chart::from_events(120.0, Some(4), &demo_events())?
        }
    };

    let summary = match run_autoplay(&config, chart) {
        Ok(summary) => summary,
        Err(e) => {
            error!("Session could not run: {}", e);
            return Err(e);
        }
    };
    println!("{}", summary.to_json()?);
    Ok(())
}

fn demo_events() -> Vec<ChartEvent> {
    let mut events = Vec::new();
    for step in 0..48u32 {
        let beat = 4.0 + f64::from(step) * 0.5;
        events.push(ChartEvent::note(step as usize % 4, beat));
    }
    events.push(ChartEvent::hold(1, 30.0, 32.0));
    events.push(ChartEvent::hold(3, 33.0, 36.0));
    events
}

struct AutoHold {
    lane: LaneId,
    start: f64,
    end: f64,
    pressed: bool,
    released: bool,
}

/// Plays the chart with a scripted player: every note struck on its beat,
/// every hold pressed at its start and released at its end.
fn run_autoplay(config: &GameConfig, chart: Chart) -> Result<SessionSummary, Box<dyn Error>> {
    let song_seconds = config.timing.first_beat_offset + (chart.last_beat() + TAIL_BEATS) * 60.0 / chart.bpm;
    let mut holds: Vec<AutoHold> = chart
        .lanes
        .iter()
        .enumerate()
        .flat_map(|(lane, l)| {
            l.holds.iter().map(move |span| AutoHold {
                lane,
                start: span.start,
                end: span.end,
                pressed: false,
                released: false,
            })
        })
        .collect();

    let clock = ManualClock::new(0.0).with_song_length(song_seconds);
    let mut session = Session::new(config, chart, clock, Vec::new(), AUTOPLAY_SEED)?;

    for _ in 0..MAX_FRAMES {
        session.clock_mut().advance(FRAME_SECONDS);
        let now = session.clock().dsp_time();

        if session.phase() == Phase::Playing {
            let beat = session.beat_clock().beat_at(now);
            if let Some(target) = session.closest_target() {
                if beat >= target.beat {
                    session.queue_input(InputEdge::strike(target.id, now));
                }
            }
            for hold in &mut holds {
                if !hold.pressed && beat >= hold.start {
                    hold.pressed = true;
                    session.queue_input(InputEdge::press(hold.lane, now));
                } else if hold.pressed && !hold.released && beat >= hold.end {
                    hold.released = true;
                    session.queue_input(InputEdge::release(hold.lane, now));
                }
            }
        }

        session.update(true);
        if session.phase() == Phase::Finished {
            break;
        }
    }

    session.summary().cloned().ok_or_else(|| "session did not finish".into())
}
