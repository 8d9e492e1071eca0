use std::thread;
use std::time::Duration;

use anyhow::Result;
use async_std::task;
use clap::Parser;
use env_logger::Env;
use log::{debug, info, warn};
use serde::Serialize;

use handpose_retarget::detector::{detector_channel, load_recording, LandmarkSource};
use handpose_retarget::engine::{EngineState, RetargetingEngine, TickReport};
use handpose_retarget::retarget_config::load_config_from_file;
use handpose_retarget::rig::{load_bones_from_file, JointTarget, NamedRig, Rig};
use handpose_retarget::systems::facing::FacingSide;

mod cli;

use cli::Cli;

#[derive(Serialize, Debug)]
struct JointPose {
    key: usize,
    name: String,
    position: [f32; 3],
    /// x, y, z, w
    orientation: [f32; 4],
    /// Relative to the parent bone, for named rigs
    #[serde(skip_serializing_if = "Option::is_none")]
    local_position: Option<[f32; 3]>,
}

#[derive(Serialize, Debug)]
struct TickOutput {
    frame: u64,
    facing: Option<FacingSide>,
    joints: Vec<JointPose>,
    skipped: Vec<String>,
}

fn tick_output(rig: &Rig, frame: u64, report: &TickReport) -> TickOutput {
    let joints = report
        .applied
        .iter()
        .filter_map(|&key| {
            let t = rig.transform(key)?;
            let q = t.orientation.coords;
            let local_position = match rig {
                Rig::HierarchicalRig(named) => named
                    .local_transform(key)
                    .map(|l| [l.position.x, l.position.y, l.position.z]),
                Rig::IndependentShapeSet(_) => None,
            };
            Some(JointPose {
                key,
                name: rig.name_of(key).unwrap_or_default(),
                position: [t.position.x, t.position.y, t.position.z],
                orientation: [q.x, q.y, q.z, q.w],
                local_position,
            })
        })
        .collect();
    TickOutput {
        frame,
        facing: report.facing,
        joints,
        skipped: report
            .skipped
            .iter()
            .map(|(key, e)| format!("{}: {}", rig.name_of(*key).unwrap_or_default(), e))
            .collect(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger from the environment

    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    debug!("Started; args: {:?}", cli);

    let mut config = load_config_from_file(&cli.config_path)?;
    if let Some(rig) = cli.rig {
        config.rig_mode = rig.into();
    }
    config.validate()?;
    if cli.write_config {
        config.write_config_to_file(&cli.config_path)?;
    }

    let recording = load_recording(&cli.recording_path)?;

    let mut rig = match &cli.bones_path {
        Some(path) => Rig::HierarchicalRig(NamedRig::from_bones(&load_bones_from_file(path)?)?),
        None => Rig::from_config(&config)?,
    };

    let mut engine = RetargetingEngine::try_new(&config)?;
    let (tx, mut source) = detector_channel();

    let detector_interval = Duration::from_millis(cli.detector_interval_ms);
    let replay = task::spawn(async move {
        let total = recording.len();
        for detection in recording {
            if tx.send(detection).await.is_err() {
                warn!("Detector channel closed before the recording finished");
                break;
            }
            task::sleep(detector_interval).await;
        }
        debug!("Replayed {} detections", total);
        // tx dropped here, which closes the channel
    });

    let tick_interval = Duration::from_millis(cli.tick_interval_ms);
    let mut ticks: u64 = 0;
    let mut stale_ticks: u64 = 0;

    loop {
        engine.poll_detector(&mut source);
        let report = engine.tick(&mut rig);
        ticks += 1;

        if report.state == EngineState::Applying {
            debug!(
                "Tick {}: applied {}, skipped {}",
                ticks,
                report.applied.len(),
                report.skipped.len()
            );
            if cli.print {
                let output = tick_output(&rig, engine.frames_applied(), &report);
                println!("{}", serde_json::to_string(&output)?);
            }
        } else {
            stale_ticks += 1;
        }

        if source.is_finished() && !engine.has_fresh_frame() {
            break;
        }
        thread::sleep(tick_interval);
    }

    task::block_on(replay);

    info!(
        "Recording finished: {} ticks, {} frames applied, {} ticks without a fresh frame",
        ticks,
        engine.frames_applied(),
        stale_ticks
    );
    Ok(())
}
