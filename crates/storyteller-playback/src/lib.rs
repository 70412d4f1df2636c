//! Client-side playback logic for narrated story segments.
//!
//! Everything here is platform-neutral: the audio element, the analysis
//! graph, the canvas and the animation-frame scheduler are traits so the
//! logic can be driven by a browser binding or by tests.

pub mod autoplay;
pub mod clock;
pub mod highlight;
pub mod player;
pub mod visualizer;
