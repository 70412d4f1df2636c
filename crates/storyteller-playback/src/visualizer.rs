//! Frequency-bar visualizer bound to one audio element at a time.
//!
//! The visualizer owns the analysis graph for the element it is attached
//! to. The graph is built on attach and closed on detach, and detaching
//! cancels the pending animation frame so no draw happens afterwards.

use std::fmt;

use thiserror::Error;
use tracing::{debug, info};

/// Analyser FFT size; yields half as many frequency bins.
pub const FFT_SIZE: usize = 256;

/// Bars drawn across the canvas width.
pub const BAR_COUNT: usize = 80;

const MIN_BAR_HEIGHT: f64 = 3.0;
const HEIGHT_SCALE: f64 = 0.6;
const BAR_FILL: f64 = 0.8;
const CORNER_RADIUS: f64 = 0.4;

/// Identity of an audio element on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u64);

/// Handle of a requested animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Errors raised while attaching to an element.
#[derive(Debug, Error)]
pub enum VisualizerError {
    /// The platform could not build an analysis graph for the element.
    #[error("audio graph unavailable: {0}")]
    GraphUnavailable(String),
}

/// A live source → analyser → output graph.
pub trait AnalysisGraph {
    /// Copies the current byte frequency magnitudes into `out`.
    fn frequency_data(&mut self, out: &mut [u8]);

    /// Releases the underlying audio context.
    fn close(&mut self);
}

/// Builds analysis graphs for audio elements.
pub trait AudioGraphFactory {
    /// The graph type produced.
    type Graph: AnalysisGraph;

    /// Routes `element` through a new analyser with the given FFT size.
    ///
    /// # Errors
    ///
    /// Returns `VisualizerError::GraphUnavailable` if the platform refuses.
    fn connect(
        &mut self,
        element: ElementId,
        fft_size: usize,
    ) -> Result<Self::Graph, VisualizerError>;
}

/// The 2D surface bars are drawn on.
pub trait Canvas {
    /// Current size in pixels, or `None` if the canvas is not mounted.
    fn size(&self) -> Option<(f64, f64)>;

    /// Resizes to and clears the given area.
    fn clear(&mut self, width: f64, height: f64);

    /// Fills one rounded bar.
    fn fill_bar(&mut self, bar: &Bar);
}

/// Animation-frame scheduling.
pub trait FrameScheduler {
    /// Requests a callback on the next frame.
    fn request_frame(&mut self) -> FrameHandle;

    /// Cancels a previously requested frame.
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// A colour in hue/saturation/lightness/alpha form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsla {
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
    pub alpha: f64,
}

impl fmt::Display for Hsla {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsla({},{}%,{}%,{})",
            self.hue, self.saturation, self.lightness, self.alpha
        )
    }
}

/// One bar of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub radius: f64,
    pub color: Hsla,
}

/// Geometry and colour of bar `index` for a magnitude on a canvas of the
/// given size. Bars are centred vertically and never shorter than 3px.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn bar_geometry(index: usize, magnitude: u8, width: f64, height: f64) -> Bar {
    let slot = width / BAR_COUNT as f64;
    let level = f64::from(magnitude) / 255.0;
    let bar_height = (level * height * HEIGHT_SCALE).max(MIN_BAR_HEIGHT);

    Bar {
        x: index as f64 * slot,
        y: height / 2.0 - bar_height / 2.0,
        width: slot * BAR_FILL,
        height: bar_height,
        radius: slot * CORNER_RADIUS,
        color: Hsla {
            hue: 260.0 - (index as f64 / BAR_COUNT as f64) * 60.0,
            saturation: 70.0 + level * 30.0,
            lightness: 60.0 + level * 20.0,
            alpha: 0.7 + level * 0.3,
        },
    }
}

/// Lifecycle of a visualizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualizerState {
    /// Never attached.
    Idle,
    /// Graph built, no frame drawn yet.
    Attached,
    /// Drawing once per frame.
    Rendering,
    /// Graph released; no further frames.
    Detached,
}

struct Session<G> {
    element: ElementId,
    graph: G,
    bins: Vec<u8>,
    pending: Option<FrameHandle>,
}

/// Draws frequency bars for the attached element every animation frame.
pub struct Visualizer<F, C, S>
where
    F: AudioGraphFactory,
    C: Canvas,
    S: FrameScheduler,
{
    factory: F,
    canvas: C,
    scheduler: S,
    session: Option<Session<F::Graph>>,
    state: VisualizerState,
    frames_drawn: u64,
}

impl<F, C, S> Visualizer<F, C, S>
where
    F: AudioGraphFactory,
    C: Canvas,
    S: FrameScheduler,
{
    /// Creates an idle visualizer.
    pub fn new(factory: F, canvas: C, scheduler: S) -> Self {
        Self {
            factory,
            canvas,
            scheduler,
            session: None,
            state: VisualizerState::Idle,
            frames_drawn: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> VisualizerState {
        self.state
    }

    /// Frames drawn since creation.
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// The element currently attached, if any.
    pub fn attached_element(&self) -> Option<ElementId> {
        self.session.as_ref().map(|session| session.element)
    }

    /// Attaches to `element` and draws the first frame.
    ///
    /// Attaching to the element already attached is a no-op. Attaching to
    /// a different element releases the current graph first.
    ///
    /// # Errors
    ///
    /// Returns `VisualizerError` if the graph cannot be built; the
    /// visualizer is then left without a graph.
    pub fn attach(&mut self, element: ElementId) -> Result<(), VisualizerError> {
        if self.attached_element() == Some(element) {
            return Ok(());
        }
        self.detach();

        let graph = self.factory.connect(element, FFT_SIZE)?;
        self.session = Some(Session {
            element,
            graph,
            bins: vec![0; FFT_SIZE / 2],
            pending: None,
        });
        self.state = VisualizerState::Attached;
        info!(element = element.0, "visualizer attached");

        self.on_frame();
        Ok(())
    }

    /// Draws one frame and schedules the next. Does nothing once detached.
    pub fn on_frame(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.pending = None;

        let Some((width, height)) = self.canvas.size() else {
            debug!(element = session.element.0, "canvas not mounted, frame skipped");
            return;
        };

        session.graph.frequency_data(&mut session.bins);
        self.canvas.clear(width, height);
        for index in 0..BAR_COUNT {
            let magnitude = session.bins.get(index).copied().unwrap_or(0);
            self.canvas
                .fill_bar(&bar_geometry(index, magnitude, width, height));
        }

        self.frames_drawn += 1;
        session.pending = Some(self.scheduler.request_frame());
        self.state = VisualizerState::Rendering;
    }

    /// Cancels the pending frame and releases the graph.
    pub fn detach(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        if let Some(handle) = session.pending.take() {
            self.scheduler.cancel_frame(handle);
        }
        session.graph.close();
        self.state = VisualizerState::Detached;
        info!(
            element = session.element.0,
            frames = self.frames_drawn,
            "visualizer detached"
        );
    }
}

impl<F, C, S> fmt::Debug for Visualizer<F, C, S>
where
    F: AudioGraphFactory,
    C: Canvas,
    S: FrameScheduler,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Visualizer")
            .field("state", &self.state)
            .field("element", &self.attached_element())
            .field("frames_drawn", &self.frames_drawn)
            .finish_non_exhaustive()
    }
}

impl<F, C, S> Drop for Visualizer<F, C, S>
where
    F: AudioGraphFactory,
    C: Canvas,
    S: FrameScheduler,
{
    fn drop(&mut self) {
        self.detach();
    }
}
