//! Navigation engine: owns the mission worker thread.
//!
//! At most one mission runs at a time. Starting a second mission while one
//! is active is rejected; to extend a running mission, enqueue more
//! destinations on its queue instead.
//!
//! Dropping a [`MissionHandle`] without joining it cancels the mission.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crate::avoidance::AvoidanceConfig;
use crate::error::{NavError, Result};
use crate::telemetry::Telemetry;

use super::command::CommandSink;
use super::events::{MissionEvents, MissionLog};
use super::mission::{MissionOutcome, MissionRunner, NavigatorConfig};
use super::queue::DestinationQueue;

/// Clears the engine's running flag when the worker exits, even on panic.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to a running mission.
#[must_use = "dropping the handle cancels the mission"]
pub struct MissionHandle {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<MissionOutcome>>,
}

impl MissionHandle {
    /// Ask the worker to stop. It stops within one tick and sends a full stop.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the worker. The final stop command has been sent on return.
    pub fn join(mut self) -> Result<MissionOutcome> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| NavError::Thread("mission worker already joined".to_string()))?;
        handle
            .join()
            .map_err(|e| NavError::Thread(format!("mission worker panicked: {:?}", e)))
    }

    /// Cancel and wait.
    pub fn stop(self) -> Result<MissionOutcome> {
        self.cancel();
        self.join()
    }
}

impl Drop for MissionHandle {
    fn drop(&mut self) {
        if self.handle.is_some() {
            tracing::debug!("Mission handle dropped, cancelling mission");
            self.cancel();
        }
    }
}

/// Top-level navigation orchestrator.
pub struct NavigationEngine {
    config: NavigatorConfig,
    avoidance: AvoidanceConfig,
    telemetry: Arc<Telemetry>,
    commands: Arc<dyn CommandSink>,
    running: Arc<AtomicBool>,
}

impl NavigationEngine {
    pub fn new(
        config: NavigatorConfig,
        avoidance: AvoidanceConfig,
        telemetry: Arc<Telemetry>,
        commands: Arc<dyn CommandSink>,
    ) -> Self {
        Self {
            config,
            avoidance,
            telemetry,
            commands,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a mission worker is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn telemetry(&self) -> &Arc<Telemetry> {
        &self.telemetry
    }

    /// Spawn a worker that drives through `queue`.
    ///
    /// Fails with [`NavError::EmptyMission`] if the queue is empty and with
    /// [`NavError::MissionAlreadyActive`] if another mission is running.
    pub fn run_mission(
        &self,
        queue: Arc<DestinationQueue>,
        events: Box<dyn MissionEvents>,
    ) -> Result<MissionHandle> {
        if queue.is_empty() {
            tracing::warn!("Ignoring mission start: no destinations");
            return Err(NavError::EmptyMission);
        }

        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Rejecting mission start: a mission is already active");
            return Err(NavError::MissionAlreadyActive);
        }
        let guard = RunningGuard(Arc::clone(&self.running));

        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = Arc::clone(&cancel);
        let mut runner = MissionRunner::new(
            self.config.clone(),
            self.avoidance.clone(),
            Arc::clone(&self.telemetry),
            queue,
            Arc::clone(&self.commands),
            events,
        );

        let handle = thread::Builder::new()
            .name("mission".into())
            .spawn(move || {
                let _guard = guard;
                tracing::info!("Mission thread started");
                let outcome = runner.run(&worker_cancel);
                tracing::info!("Mission thread exited: {:?}", outcome);
                outcome
            })
            .map_err(|e| NavError::Thread(format!("failed to spawn mission thread: {}", e)))?;

        Ok(MissionHandle {
            cancel,
            handle: Some(handle),
        })
    }

    /// Drive the route recorded in `log` again.
    ///
    /// The replayed queue is committed, so cancelling one of its markers has
    /// no effect. An empty log fails with [`NavError::EmptyMission`].
    pub fn replay_mission(
        &self,
        log: &MissionLog,
        events: Box<dyn MissionEvents>,
    ) -> Result<MissionHandle> {
        let queue = Arc::new(DestinationQueue::replay(log));
        tracing::info!("Replaying mission log with {} destinations", queue.len());
        self.run_mission(queue, events)
    }
}
