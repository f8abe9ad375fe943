use std::time::Instant;

use crate::draw::input::InputEvent;

/// Everything the owning thread reacts to, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Input(InputEvent),
    /// Posted by the screenshot worker when an encode finishes.
    ScreenshotSaved { ok: bool },
    /// Clock tick used to expire the toast.
    Tick(Instant),
}

impl From<InputEvent> for EngineEvent {
    fn from(event: InputEvent) -> Self {
        EngineEvent::Input(event)
    }
}
