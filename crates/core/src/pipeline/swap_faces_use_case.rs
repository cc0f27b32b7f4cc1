use std::path::Path;
use std::time::Instant;

use thiserror::Error;

use crate::compositing::domain::face_compositor::FaceCompositor;
use crate::pipeline::pipeline_logger::{PipelineLogger, FRAME_STAGE};
use crate::shared::geometry::Size;
use crate::tracking::domain::face_region_tracker::FaceRegionTracker;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SwapPipelineError {
    #[error("frame {index} is {actual:?}, tracker was built for {expected:?}")]
    FrameSizeMismatch {
        index: usize,
        expected: Size,
        actual: Size,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SwapStats {
    pub frames: usize,
    pub swapped: usize,
}

/// Frame loop: read → track → swap → write.
///
/// The swap runs only on frames where the tracker reports every face slot
/// it was configured with, and exchanges the first two. A failed swap is
/// logged and the frame is written unmodified.
pub struct SwapFacesUseCase {
    reader: Box<dyn VideoReader>,
    writer: Box<dyn VideoWriter>,
    tracker: FaceRegionTracker,
    compositor: Box<dyn FaceCompositor>,
    logger: Box<dyn PipelineLogger>,
}

impl SwapFacesUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        tracker: FaceRegionTracker,
        compositor: Box<dyn FaceCompositor>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            reader,
            writer,
            tracker,
            compositor,
            logger,
        }
    }

    pub fn tracker(&self) -> &FaceRegionTracker {
        &self.tracker
    }

    pub fn execute(
        &mut self,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<SwapStats, Box<dyn std::error::Error>> {
        let metadata = self.reader.open(input_path)?;
        self.writer.open(output_path, &metadata)?;
        self.logger.info(&format!(
            "Swapping faces in {} frames ({}x{})",
            metadata.total_frames, metadata.width, metadata.height
        ));

        let result = process_frames(
            self.reader.as_mut(),
            self.writer.as_mut(),
            &mut self.tracker,
            self.compositor.as_ref(),
            self.logger.as_mut(),
            metadata.total_frames,
        );

        self.reader.close();
        let closed = self.writer.close();
        let stats = result?;
        closed?;

        self.logger.info(&format!(
            "Swapped {} of {} frames",
            stats.swapped, stats.frames
        ));
        self.logger.summary();
        Ok(stats)
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

fn process_frames(
    reader: &mut dyn VideoReader,
    writer: &mut dyn VideoWriter,
    tracker: &mut FaceRegionTracker,
    compositor: &dyn FaceCompositor,
    logger: &mut dyn PipelineLogger,
    total: usize,
) -> Result<SwapStats, Box<dyn std::error::Error>> {
    let expected = tracker.native_size();
    let slots = tracker.num_faces();
    let mut stats = SwapStats::default();

    for frame in reader.frames() {
        let mut frame = frame?;
        let frame_start = Instant::now();

        if frame.size() != expected {
            return Err(SwapPipelineError::FrameSizeMismatch {
                index: frame.index(),
                expected,
                actual: frame.size(),
            }
            .into());
        }

        let start = Instant::now();
        tracker.ingest_frame(&frame)?;
        logger.timing("track", elapsed_ms(start));

        let faces = tracker.current_faces();
        logger.metric("faces", faces.len() as f64);

        match faces[..] {
            [face_a, face_b, ..] if faces.len() == slots => {
                let start = Instant::now();
                match compositor.swap(&mut frame, face_a, face_b) {
                    Ok(()) => stats.swapped += 1,
                    Err(e) => log::debug!("Swap skipped on frame {}: {e}", frame.index()),
                }
                logger.timing("swap", elapsed_ms(start));
            }
            _ => {}
        }

        writer.write(&frame)?;
        stats.frames += 1;
        logger.timing(FRAME_STAGE, elapsed_ms(frame_start));
        logger.progress(stats.frames, total);
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_detector::FaceDetector;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::frame::Frame;
    use crate::shared::geometry::Rect;
    use crate::shared::video_metadata::VideoMetadata;
    use crate::tracking::domain::face_region_tracker::TrackerConfig;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubReader {
        frames: Vec<Frame>,
        closed: Arc<Mutex<bool>>,
    }

    impl VideoReader for StubReader {
        fn open(&mut self, _path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            Ok(VideoMetadata {
                width: 512,
                height: 384,
                fps: 30.0,
                total_frames: self.frames.len(),
                source_path: None,
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new(self.frames.drain(..).map(Ok))
        }

        fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    struct StubWriter {
        written: Arc<Mutex<Vec<Frame>>>,
        closed: Arc<Mutex<bool>>,
    }

    impl VideoWriter for StubWriter {
        fn open(
            &mut self,
            _path: &Path,
            _metadata: &VideoMetadata,
        ) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }

        fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.written.lock().unwrap().push(frame.clone());
            Ok(())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    /// Reports `faces` on full-frame scans and the ROI center half on
    /// ROI scans.
    struct StubDetector {
        faces: Vec<Rect>,
    }

    impl FaceDetector for StubDetector {
        fn detect(
            &mut self,
            image: &Frame,
            _min_size: Size,
            _max_size: Size,
        ) -> Result<Vec<Rect>, Box<dyn std::error::Error>> {
            if image.width() == 256 {
                return Ok(self.faces.clone());
            }
            let (w, h) = (image.width() as i32, image.height() as i32);
            Ok(vec![Rect::new(w / 4, h / 4, w / 2, h / 2)])
        }
    }

    /// Marks the top-left pixel so swapped frames are recognizable.
    struct MarkingCompositor {
        calls: Arc<Mutex<Vec<(Rect, Rect)>>>,
        fail: bool,
    }

    impl FaceCompositor for MarkingCompositor {
        fn swap(
            &self,
            frame: &mut Frame,
            face_a: Rect,
            face_b: Rect,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.calls.lock().unwrap().push((face_a, face_b));
            if self.fail {
                return Err("landmarks unavailable".into());
            }
            frame.data_mut()[0] = 255;
            Ok(())
        }
    }

    struct Harness {
        use_case: SwapFacesUseCase,
        written: Arc<Mutex<Vec<Frame>>>,
        swaps: Arc<Mutex<Vec<(Rect, Rect)>>>,
        reader_closed: Arc<Mutex<bool>>,
        writer_closed: Arc<Mutex<bool>>,
    }

    fn frames(count: usize, width: u32, height: u32) -> Vec<Frame> {
        (0..count)
            .map(|i| Frame::new(vec![0u8; (width * height * 3) as usize], width, height, 3, i))
            .collect()
    }

    fn harness(frames: Vec<Frame>, faces: Vec<Rect>, fail_swap: bool) -> Harness {
        harness_with(frames, faces, fail_swap, TrackerConfig::default())
    }

    fn harness_with(
        frames: Vec<Frame>,
        faces: Vec<Rect>,
        fail_swap: bool,
        config: TrackerConfig,
    ) -> Harness {
        let written = Arc::new(Mutex::new(Vec::new()));
        let swaps = Arc::new(Mutex::new(Vec::new()));
        let reader_closed = Arc::new(Mutex::new(false));
        let writer_closed = Arc::new(Mutex::new(false));

        let tracker = FaceRegionTracker::new(
            Box::new(StubDetector { faces }),
            Size::new(512, 384),
            config,
        )
        .unwrap();
        let use_case = SwapFacesUseCase::new(
            Box::new(StubReader {
                frames,
                closed: reader_closed.clone(),
            }),
            Box::new(StubWriter {
                written: written.clone(),
                closed: writer_closed.clone(),
            }),
            tracker,
            Box::new(MarkingCompositor {
                calls: swaps.clone(),
                fail: fail_swap,
            }),
            Box::new(NullPipelineLogger),
        );
        Harness {
            use_case,
            written,
            swaps,
            reader_closed,
            writer_closed,
        }
    }

    const FACE_A: Rect = Rect::new(20, 40, 60, 60);
    const FACE_B: Rect = Rect::new(150, 40, 60, 60);

    #[test]
    fn test_swaps_every_frame_with_two_faces() {
        let mut h = harness(frames(3, 512, 384), vec![FACE_A, FACE_B], false);
        let stats = h
            .use_case
            .execute(Path::new("in"), Path::new("out"))
            .unwrap();

        assert_eq!(stats, SwapStats { frames: 3, swapped: 3 });
        let written = h.written.lock().unwrap();
        assert_eq!(written.len(), 3);
        assert!(written.iter().all(|f| f.data()[0] == 255));
        assert_eq!(
            h.swaps.lock().unwrap()[0],
            (Rect::new(40, 80, 120, 120), Rect::new(300, 80, 120, 120))
        );
        assert!(*h.reader_closed.lock().unwrap());
        assert!(*h.writer_closed.lock().unwrap());
    }

    #[test]
    fn test_no_swap_without_two_faces() {
        let mut h = harness(frames(2, 512, 384), vec![FACE_A], false);
        let stats = h
            .use_case
            .execute(Path::new("in"), Path::new("out"))
            .unwrap();

        assert_eq!(stats, SwapStats { frames: 2, swapped: 0 });
        assert!(h.swaps.lock().unwrap().is_empty());
        assert!(h.written.lock().unwrap().iter().all(|f| f.data()[0] == 0));
    }

    fn slots(num_faces: usize) -> TrackerConfig {
        TrackerConfig {
            num_faces,
            ..TrackerConfig::default()
        }
    }

    #[test]
    fn test_swap_gate_follows_configured_slot_count() {
        let third = Rect::new(90, 130, 40, 40);
        let mut h = harness_with(
            frames(2, 512, 384),
            vec![FACE_A, FACE_B, third],
            false,
            slots(3),
        );
        let stats = h
            .use_case
            .execute(Path::new("in"), Path::new("out"))
            .unwrap();

        assert_eq!(stats, SwapStats { frames: 2, swapped: 2 });
        assert_eq!(
            h.swaps.lock().unwrap()[0],
            (Rect::new(40, 80, 120, 120), Rect::new(300, 80, 120, 120))
        );
    }

    #[test]
    fn test_two_faces_do_not_swap_when_three_slots_configured() {
        let mut h = harness_with(frames(2, 512, 384), vec![FACE_A, FACE_B], false, slots(3));
        let stats = h
            .use_case
            .execute(Path::new("in"), Path::new("out"))
            .unwrap();

        assert_eq!(stats, SwapStats { frames: 2, swapped: 0 });
        assert!(h.swaps.lock().unwrap().is_empty());
    }

    #[test]
    fn test_single_slot_never_swaps() {
        let mut h = harness_with(frames(2, 512, 384), vec![FACE_A], false, slots(1));
        let stats = h
            .use_case
            .execute(Path::new("in"), Path::new("out"))
            .unwrap();

        assert_eq!(h.use_case.tracker().current_faces().len(), 1);
        assert_eq!(stats, SwapStats { frames: 2, swapped: 0 });
        assert!(h.swaps.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failed_swap_writes_original_frame() {
        let mut h = harness(frames(2, 512, 384), vec![FACE_A, FACE_B], true);
        let stats = h
            .use_case
            .execute(Path::new("in"), Path::new("out"))
            .unwrap();

        assert_eq!(stats, SwapStats { frames: 2, swapped: 0 });
        assert_eq!(h.swaps.lock().unwrap().len(), 2);
        assert_eq!(h.written.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_rejects_mismatched_frame_size() {
        let mut h = harness(frames(1, 640, 480), vec![FACE_A, FACE_B], false);
        let err = h
            .use_case
            .execute(Path::new("in"), Path::new("out"))
            .unwrap_err();

        let err = err.downcast::<SwapPipelineError>().unwrap();
        assert_eq!(
            *err,
            SwapPipelineError::FrameSizeMismatch {
                index: 0,
                expected: Size::new(512, 384),
                actual: Size::new(640, 480),
            }
        );
        assert!(h.written.lock().unwrap().is_empty());
        assert!(*h.writer_closed.lock().unwrap());
    }
}
