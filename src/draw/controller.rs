use anyhow::{anyhow, Result};
use std::sync::mpsc::{
    sync_channel, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError,
};
use std::time::Duration;

use crate::draw::engine::OverlayEngine;
use crate::draw::input::EventDisposition;
use crate::draw::magnifier::Magnification;
use crate::draw::messages::EngineEvent;
use crate::draw::renderer::Renderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerLifecycle {
    Starting,
    Active,
    Exited,
}

/// Producer half of the event queue. Cloned freely across threads.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: SyncSender<EngineEvent>,
}

impl EventSender {
    /// Queues without blocking. A full queue drops the event and returns
    /// `Ok(false)`.
    pub fn try_post(&self, event: EngineEvent) -> Result<bool> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(event)) => {
                tracing::warn!(?event, "event queue full, dropping event");
                Ok(false)
            }
            Err(TrySendError::Disconnected(_)) => Err(anyhow!("event queue disconnected")),
        }
    }

    /// Queues, waiting for room. Used by background workers whose completion
    /// must not be lost.
    pub fn post(&self, event: EngineEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| anyhow!("event queue disconnected"))
    }
}

/// Builds a bounded queue and the controller that drains it.
pub fn bounded(capacity: usize) -> (EventSender, OverlayController) {
    let (tx, rx) = sync_channel(capacity.max(1));
    (EventSender { tx }, OverlayController::new(rx))
}

/// Consumer half, owned by the thread that owns the engine.
pub struct OverlayController {
    rx: Receiver<EngineEvent>,
    lifecycle: ControllerLifecycle,
    handled: usize,
}

impl OverlayController {
    fn new(rx: Receiver<EngineEvent>) -> Self {
        Self {
            rx,
            lifecycle: ControllerLifecycle::Starting,
            handled: 0,
        }
    }

    pub fn lifecycle(&self) -> ControllerLifecycle {
        self.lifecycle
    }

    pub fn handled(&self) -> usize {
        self.handled
    }

    /// Delivers every queued event to `engine` in arrival order and returns
    /// their dispositions. Stops early once all senders are gone.
    pub fn pump<R: Renderer, M: Magnification>(
        &mut self,
        engine: &mut OverlayEngine<R, M>,
    ) -> Vec<EventDisposition> {
        let mut dispositions = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    self.lifecycle = ControllerLifecycle::Active;
                    dispositions.push(engine.handle(event));
                    self.handled += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.lifecycle != ControllerLifecycle::Exited {
                        tracing::debug!(handled = self.handled, "event queue closed");
                    }
                    self.lifecycle = ControllerLifecycle::Exited;
                    break;
                }
            }
        }
        dispositions
    }

    /// Waits up to `timeout` for the next event, then drains the rest.
    pub fn pump_blocking<R: Renderer, M: Magnification>(
        &mut self,
        engine: &mut OverlayEngine<R, M>,
        timeout: Duration,
    ) -> Vec<EventDisposition> {
        match self.recv_timeout(timeout) {
            Some(event) => {
                self.lifecycle = ControllerLifecycle::Active;
                let mut dispositions = vec![engine.handle(event)];
                self.handled += 1;
                dispositions.extend(self.pump(engine));
                dispositions
            }
            None => Vec::new(),
        }
    }

    /// Takes one event without handling it.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}
