//! Screen annotation overlay engine: strokes, highlighter and text with
//! two-level undo, a cached two-layer compositor, an input mode state machine
//! and a magnifier controller. Platform windows, hooks and GPU backends plug
//! in through the [`draw::renderer::Renderer`], [`draw::magnifier::Magnification`]
//! and [`draw::save::DesktopCapture`] traits.

pub mod draw;
pub mod logging;
