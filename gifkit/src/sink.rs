//! Destinations for decoded frames.

use std::time::Duration;

use gifkit_core::Bitmap;

/// A composited frame and how long it stays on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Full-canvas RGBA pixels.
    pub bitmap: Bitmap,
    /// Display time from the frame's graphic control extension, zero if absent.
    pub delay: Duration,
}

impl Frame {
    /// Create a frame.
    pub fn new(bitmap: Bitmap, delay: Duration) -> Self {
        Self { bitmap, delay }
    }
}

/// Receives frames from the container reader.
///
/// Frames already delivered stay delivered when a later block fails to parse;
/// `on_reader_finished` is only called after the trailer has been read.
pub trait FrameSink {
    /// Take ownership of one decoded frame.
    fn add_frame(&mut self, frame: Frame);

    /// The whole file was read successfully.
    fn on_reader_finished(&mut self) {}
}

impl FrameSink for Vec<Frame> {
    fn add_frame(&mut self, frame: Frame) {
        self.push(frame);
    }
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn add_frame(&mut self, frame: Frame) {
        (**self).add_frame(frame);
    }

    fn on_reader_finished(&mut self) {
        (**self).on_reader_finished();
    }
}

/// Collects frames converted into a client type.
///
/// ```
/// use gifkit::FrameList;
///
/// let frames = FrameList::new(|bitmap| bitmap.to_rgba());
/// assert!(frames.is_empty());
/// ```
pub struct FrameList<T> {
    convert: Box<dyn FnMut(&Bitmap) -> T>,
    frames: Vec<(T, Duration)>,
    finished: bool,
}

impl<T> FrameList<T> {
    /// Create an empty list that converts each bitmap with `convert`.
    pub fn new<F>(convert: F) -> Self
    where
        F: FnMut(&Bitmap) -> T + 'static,
    {
        Self {
            convert: Box::new(convert),
            frames: Vec::new(),
            finished: false,
        }
    }

    /// Number of frames collected.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no frames have been collected.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame at `index` with its delay.
    pub fn frame(&self, index: usize) -> Option<(&T, Duration)> {
        self.frames.get(index).map(|(item, delay)| (item, *delay))
    }

    /// Iterate over frames and delays in display order.
    pub fn iter(&self) -> impl Iterator<Item = (&T, Duration)> {
        self.frames.iter().map(|(item, delay)| (item, *delay))
    }

    /// Whether the reader reached the trailer.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Sum of all frame delays.
    pub fn total_delay(&self) -> Duration {
        self.frames.iter().map(|(_, delay)| *delay).sum()
    }

    /// Take the collected frames.
    pub fn into_frames(self) -> Vec<(T, Duration)> {
        self.frames
    }
}

impl<T> FrameSink for FrameList<T> {
    fn add_frame(&mut self, frame: Frame) {
        let item = (self.convert)(&frame.bitmap);
        self.frames.push((item, frame.delay));
    }

    fn on_reader_finished(&mut self) {
        self.finished = true;
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for FrameList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameList")
            .field("frames", &self.frames)
            .field("finished", &self.finished)
            .finish()
    }
}
