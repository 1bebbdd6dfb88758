use std::path::PathBuf;
use std::time::{Duration, Instant};

use linesync::ticker::Ticker;
use linesync::transcript::read_transcript;
use linesync::{
    logging, EngineParams, PlaybackEvent, PlaybackFacade, RepeatTarget, SimulatedTransport,
};

const SAMPLE: &str = r#"{
    "metadata": {"title": "Sample", "artist": "Nobody", "durationMs": 6000},
    "lines": [
        {"startTimeMs": 0, "endTimeMs": 2000, "native": "おはよう", "transliteration": "ohayou", "translation": "good morning"},
        {"startTimeMs": 2500, "endTimeMs": 4000, "native": "元気?", "transliteration": "genki?", "translation": "how are you?"},
        {"startTimeMs": 4000, "endTimeMs": 6000, "native": "またね", "transliteration": "mata ne", "translation": "see you"}
    ]
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let line_index: usize = args
        .get(2)
        .map(|value| value.parse())
        .transpose()?
        .unwrap_or(1);

    let params = EngineParams::load(None)?;
    let tick_interval = Duration::from_millis(params.tick_interval_ms);

    let mut facade = PlaybackFacade::new(SimulatedTransport::new(6000), params);
    match args.get(1) {
        Some(path) => facade.load_transcript(read_transcript(&PathBuf::from(path))?),
        None => facade.load_transcript_json(SAMPLE)?,
    }

    if !facade.loop_line(line_index, RepeatTarget::from_count(2)) {
        return Err(format!("no line at index {line_index}").into());
    }

    let ticker = Ticker::spawn(tick_interval);
    let mut last = Instant::now();

    while let Some(now) = ticker.recv() {
        let elapsed = now.saturating_duration_since(last);
        last = now;

        facade.transport_mut().advance(elapsed.as_millis() as u64);
        facade.tick();

        let mut finished = false;
        for event in facade.drain_events() {
            match event {
                PlaybackEvent::TimeUpdated { .. } => {}
                PlaybackEvent::SegmentChanged { line } => {
                    if let Some(segment) = facade.transcript().and_then(|t| line.segment(t)) {
                        println!(
                            "[{:.2}s - {:.2}s] {} ({})",
                            segment.start_time_ms as f64 / 1000.0,
                            segment.end_time_ms as f64 / 1000.0,
                            segment.transliteration,
                            segment.translation
                        );
                    }
                }
                PlaybackEvent::LoopCompleted {
                    completed_iterations,
                } => {
                    println!("loop finished after {} plays", completed_iterations + 1);
                    finished = true;
                }
                PlaybackEvent::TrackEnded => finished = true,
                other => println!("{other:?}"),
            }
        }

        if finished {
            break;
        }
    }

    Ok(())
}
