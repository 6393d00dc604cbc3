use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use cue_capture::{
    frame_index, CaptureError, CapturePipeline, DeviceSelector, FramePair, SyntheticBackend,
    SyntheticConfig,
};
use cue_core::CaptureSettings;

pub struct CaptureArgs {
    pub device: DeviceSelector,
    pub duration: f64,
    pub record: bool,
    pub width: usize,
    pub height: usize,
    pub frame_interval_ms: u64,
}

/// Opens the camera, reads frames for the given duration (or until ctrl-c)
/// and prints the pipeline statistics.
pub async fn capture(settings: &CaptureSettings, args: CaptureArgs) -> Result<()> {
    let name = match &args.device {
        DeviceSelector::Synthetic { name } => name.clone(),
        other => {
            log::warn!("Only synthetic cameras are available, {} will not be found", other);
            "synthetic".into()
        }
    };
    let backend = Arc::new(SyntheticBackend::new(SyntheticConfig {
        name,
        width: args.width,
        height: args.height,
        frame_interval: Duration::from_millis(args.frame_interval_ms),
        ..Default::default()
    }));

    let pipeline = Arc::new(CapturePipeline::new(
        backend,
        args.device,
        settings.clone(),
    ));
    pipeline.open().context("Failed to open the camera")?;
    if args.record {
        pipeline.toggle_recording()?;
    }

    let deadline = tokio::time::sleep(Duration::from_secs_f64(args.duration.max(0.0)));
    tokio::pin!(deadline);
    let mut ticker = tokio::time::interval(Duration::from_millis(100));

    let result = loop {
        tokio::select! {
            _ = &mut deadline => break Ok(()),
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                break Ok(());
            }
            _ = ticker.tick() => {
                let reader = pipeline.clone();
                let frame = tokio::task::spawn_blocking(move || reader.read())
                    .await
                    .context("Frame reader panicked")?;
                match frame {
                    Ok(frame) => report_frame(&frame),
                    Err(err @ CaptureError::StreamTerminated { .. }) => break Err(err),
                    Err(err) => log::warn!("{}", err),
                }
            }
        }
    };

    let stats = pipeline.stats();
    pipeline.close();
    println!(
        "{} frames published, {} failed reads",
        stats.frames_published, stats.failed_reads
    );
    result.context("Capture stopped")
}

fn report_frame(frame: &FramePair) {
    if frame.is_empty() {
        log::debug!("No frame yet");
        return;
    }
    let (width, height) = frame.dimensions();
    let depth = if frame.depth().is_some() {
        " with depth"
    } else {
        ""
    };
    match frame_index(frame) {
        Some(index) => log::info!("Frame {} ({}x{}{})", index, width, height, depth),
        None => log::info!("Frame {}x{}{}", width, height, depth),
    }
}
