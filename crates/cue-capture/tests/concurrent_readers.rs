use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use cue_capture::{frame_index, CapturePipeline, PipelinePhase, SyntheticBackend, SyntheticConfig};
use cue_core::CaptureSettings;

fn recording_pipeline() -> Arc<CapturePipeline> {
    let backend = Arc::new(SyntheticBackend::new(SyntheticConfig {
        width: 320,
        height: 240,
        frame_interval: Duration::from_millis(1),
        ..Default::default()
    }));
    let pipeline = Arc::new(CapturePipeline::new(
        backend.clone(),
        backend.selector(),
        CaptureSettings::default(),
    ));
    pipeline.open().unwrap();
    assert_eq!(pipeline.toggle_recording(), Ok(PipelinePhase::Recording));
    pipeline
}

#[test]
fn readers_never_see_torn_frames() {
    let pipeline = recording_pipeline();
    let done = Arc::new(AtomicBool::new(false));

    let readers = (0..4)
        .map(|_| {
            let pipeline = pipeline.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut last = None;
                let mut checked = 0;
                while !done.load(Ordering::Relaxed) {
                    let frame = pipeline.read().unwrap();
                    if frame.is_empty() {
                        continue;
                    }
                    let index = frame_index(&frame).expect("torn frame");
                    // Frames never go back in time
                    if let Some(last) = last {
                        assert!(index >= last);
                    }
                    last = Some(index);
                    checked += 1;
                }
                checked
            })
        })
        .collect::<Vec<_>>();

    thread::sleep(Duration::from_millis(300));
    done.store(true, Ordering::Relaxed);
    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    pipeline.close();
}

#[test]
fn no_frames_are_published_after_close() {
    let pipeline = recording_pipeline();
    thread::sleep(Duration::from_millis(20));
    pipeline.close();

    let published = pipeline.stats().frames_published;
    let latest = pipeline.latest();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(pipeline.stats().frames_published, published);
    assert!(Arc::ptr_eq(&latest, &pipeline.latest()));
    assert_eq!(pipeline.phase(), PipelinePhase::Closed);
}
