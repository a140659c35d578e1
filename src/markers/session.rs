//! The map session task: owns a [`MarkerSetManager`] and drives it from
//! user commands, a refresh timer and fetch completions.

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::manager::MarkerSetManager;
use super::set::MarkerSnapshot;
use crate::models::{Category, Coordinate, RadiusMultiplier};
use crate::overpass::FacilityGateway;

const COMMAND_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionCommand {
    Activate(Category),
    Deactivate(Category),
    SetRadiusMultiplier(RadiusMultiplier),
    Recenter(Coordinate),
    RefreshAll,
    Shutdown,
}

#[derive(Debug, thiserror::Error)]
#[error("map session has stopped")]
pub struct SessionClosed;

/// Cloneable front end to a running [`MapSession`]
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<MarkerSnapshot>,
}

impl SessionHandle {
    pub async fn send(&self, command: SessionCommand) -> Result<(), SessionClosed> {
        self.commands.send(command).await.map_err(|_| SessionClosed)
    }

    pub async fn toggle(&self, category: Category, on: bool) -> Result<(), SessionClosed> {
        let command = if on {
            SessionCommand::Activate(category)
        } else {
            SessionCommand::Deactivate(category)
        };
        self.send(command).await
    }

    pub async fn shutdown(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Shutdown).await
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> MarkerSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MarkerSnapshot> {
        self.snapshots.clone()
    }
}

pub struct MapSession<G: FacilityGateway + ?Sized + 'static> {
    manager: MarkerSetManager<G>,
    refresh_interval: Duration,
    commands: mpsc::Receiver<SessionCommand>,
    snapshots: watch::Sender<MarkerSnapshot>,
}

impl<G: FacilityGateway + ?Sized + 'static> MapSession<G> {
    pub fn new(manager: MarkerSetManager<G>, refresh_interval: Duration) -> (Self, SessionHandle) {
        let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (snapshots, snapshots_rx) = watch::channel(manager.snapshot());
        let session = Self {
            manager,
            refresh_interval,
            commands,
            snapshots,
        };
        let handle = SessionHandle {
            commands: commands_tx,
            snapshots: snapshots_rx,
        };
        (session, handle)
    }

    /// Run until shut down or every handle is dropped.
    pub async fn run(mut self) -> MarkerSnapshot {
        let mut ticker = interval_at(Instant::now() + self.refresh_interval, self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Map session started (refresh every {}s)",
            self.refresh_interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    debug!("Periodic refresh");
                    self.manager.refresh_all();
                }
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                Some(completion) = self.manager.next_completion() => {
                    self.manager.apply(completion);
                }
            }
            self.snapshots.send_replace(self.manager.snapshot());
        }

        self.manager.teardown();
        let last = self.manager.snapshot();
        self.snapshots.send_replace(last.clone());
        info!("Map session stopped");
        last
    }

    fn handle(&mut self, command: SessionCommand) {
        debug!("Command {:?}", command);
        match command {
            SessionCommand::Activate(category) => self.manager.activate(category),
            SessionCommand::Deactivate(category) => self.manager.deactivate(category),
            SessionCommand::SetRadiusMultiplier(multiplier) => {
                self.manager.set_radius_multiplier(multiplier);
            }
            SessionCommand::Recenter(center) => {
                self.manager.recenter(center);
            }
            SessionCommand::RefreshAll => {
                self.manager.refresh_all();
            }
            SessionCommand::Shutdown => {}
        }
    }
}
