//! Serialization context: command channel, run loop, and handle.
//!
//! External producers submit work from any thread through an
//! [`OrganizerHandle`]; submission is non-blocking. One task owns the
//! organizer and runs each work item to completion before the next, so
//! `organize`, `disorganize`, and `malleated` are totally ordered.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{OrganizeError, OrganizeResult};
use crate::event_bus::RecvError;
use crate::events::Event;
use crate::organizer::engine::Organizer;
use crate::organizer::mode::Mode;
use crate::store::Store;
use crate::types::OrganizerStats;

/// Work items accepted by the run loop.
pub enum Command<M: Mode> {
    Organize {
        payload: M::Payload,
        responder: oneshot::Sender<OrganizeResult>,
    },
    Stats {
        responder: oneshot::Sender<OrganizerStats>,
    },
}

/// Cloneable submission handle bound to a running organizer.
pub struct OrganizerHandle<M: Mode> {
    commands: mpsc::UnboundedSender<Command<M>>,
}

impl<M: Mode> Clone for OrganizerHandle<M> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
        }
    }
}

impl<M: Mode> OrganizerHandle<M> {
    /// Submit a payload and wait for its outcome. The submission itself
    /// never blocks; only the response does.
    pub async fn organize(&self, payload: M::Payload) -> OrganizeResult {
        let (responder, response) = oneshot::channel();
        self.commands
            .send(Command::Organize { payload, responder })
            .map_err(|_| OrganizeError::Stopped)?;
        response.await.map_err(|_| OrganizeError::Stopped)?
    }

    /// Snapshot the organizer's activity counters. `None` after shutdown.
    pub async fn stats(&self) -> Option<OrganizerStats> {
        let (responder, response) = oneshot::channel();
        self.commands.send(Command::Stats { responder }).ok()?;
        response.await.ok()
    }
}

impl<M: Mode, S: Store> Organizer<M, S> {
    /// Create the command channel pair for [`run`](Self::run).
    pub fn command_channel() -> (OrganizerHandle<M>, mpsc::UnboundedReceiver<Command<M>>) {
        let (commands, receiver) = mpsc::unbounded_channel();
        (OrganizerHandle { commands }, receiver)
    }

    /// Drive the organizer until shutdown.
    ///
    /// Processes submitted commands and the bus events the organizer
    /// subscribes to (`BlockUnchecked`, `BlockUnvalid`, `BlockUnconfirmable`,
    /// `BlockMalleated`, `Stop`). Cancellation publishes `Stop` and answers
    /// everything still queued with `Stopped`.
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command<M>>,
        shutdown: CancellationToken,
    ) {
        let mut events = self.bus.subscribe();
        let mut announce_stop = true;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        announce_stop = false;
                        break;
                    }
                },
                event = events.recv() => match event {
                    Ok(Event::Stop) => {
                        announce_stop = false;
                        break;
                    }
                    Ok(event) => self.handle_bus_event(event).await,
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "organizer lagged behind the event bus");
                    }
                    Err(RecvError::Closed) => {
                        announce_stop = false;
                        break;
                    }
                },
            }
        }

        if announce_stop {
            self.bus.emit(&[Event::Stop]);
        }

        // Work accepted before shutdown is answered, not dropped silently.
        commands.close();
        while let Ok(command) = commands.try_recv() {
            match command {
                Command::Organize { responder, .. } => {
                    let _ = responder.send(Err(OrganizeError::Stopped));
                }
                Command::Stats { responder } => {
                    let _ = responder.send(self.stats());
                }
            }
        }
        debug!("organizer stopped");
    }

    /// Spawn the run loop onto the current runtime, returning the handle.
    pub fn spawn(self, shutdown: CancellationToken) -> OrganizerHandle<M> {
        let (handle, receiver) = Self::command_channel();
        tokio::spawn(self.run(receiver, shutdown));
        handle
    }

    async fn handle_command(&mut self, command: Command<M>) {
        match command {
            Command::Organize { payload, responder } => {
                let _ = responder.send(self.organize(payload).await);
            }
            Command::Stats { responder } => {
                let _ = responder.send(self.stats());
            }
        }
    }

    async fn handle_bus_event(&mut self, event: Event) {
        // Fault handling and logging live in the entry points.
        let _ = match event {
            Event::BlockUnchecked { link }
            | Event::BlockUnvalid { link }
            | Event::BlockUnconfirmable { link } => self.disorganize(link).await,
            Event::BlockMalleated { link } => self.malleated(link).await,
            _ => Ok(()),
        };
    }
}
