// State Manager - thread-safe handle on a running system
// Background frame loop plus the per-frame snapshot consumed by the renderer

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::body_state::BodySnapshot;
use crate::system_coordinator::{RenderSink, SystemCoordinator};

// =============================================================================
// SHARED STATE
// =============================================================================

pub struct AppState {
    pub system: Arc<RwLock<SystemCoordinator>>,
    pub is_running: Arc<RwLock<bool>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AppState {
    pub fn new(system: SystemCoordinator) -> Self {
        Self {
            system: Arc::new(RwLock::new(system)),
            is_running: Arc::new(RwLock::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// Start the background loop. Returns false when a loop is already
    /// running, so at most one thread ever advances the system.
    pub fn start(&self) -> bool {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return false;
        }
        *self.is_running.write() = true;
        *worker = Some(start_frame_loop(self.system.clone(), self.is_running.clone()));
        true
    }

    /// Stop the loop and wait for its thread to exit
    pub fn stop(&self) {
        *self.is_running.write() = false;
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                tracing::error!("Frame loop thread panicked");
            }
        }
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        self.system.read().to_snapshot()
    }

    /// Stop the loop and release every body
    pub fn teardown(&self, sink: &mut dyn RenderSink) {
        self.stop();
        self.system.write().teardown(sink);
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// FRAME LOOP (runs in background thread)
// =============================================================================

pub fn start_frame_loop(
    system: Arc<RwLock<SystemCoordinator>>,
    is_running: Arc<RwLock<bool>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let target_frame_time = Duration::from_millis(16); // ~60 FPS
        let mut last_frame = Instant::now();

        loop {
            // Check if we should stop
            if !*is_running.read() {
                break;
            }

            let start = Instant::now();
            let delta = start.duration_since(last_frame).as_secs_f64();
            last_frame = start;

            {
                let mut sys = system.write();
                if sys.is_torn_down() {
                    tracing::info!("Frame loop stopping: system torn down");
                    break;
                }
                sys.advance(delta);
            }

            // Sleep to maintain frame rate
            let elapsed = start.elapsed();
            if elapsed < target_frame_time {
                thread::sleep(target_frame_time - elapsed);
            }
        }
    })
}

// =============================================================================
// SERIALIZABLE STATE FOR THE RENDERER
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub generated_at: DateTime<Utc>,
    pub simulated_time: f64,
    pub time_scale: f64,
    pub camera_position: [f64; 3],
    pub bodies: Vec<BodySnapshot>,
}

impl SystemCoordinator {
    pub fn to_snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            generated_at: Utc::now(),
            simulated_time: self.simulated_time(),
            time_scale: self.time_scale(),
            camera_position: self.camera_position().to_array(),
            bodies: self.bodies().iter().map(|b| b.snapshot()).collect(),
        }
    }
}
