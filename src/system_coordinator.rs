// System Coordinator - owns every body and the simulated clock
// One `advance` per rendered frame fans out to each body in load order

use std::collections::HashMap;

use crate::body_state::{BodyState, RenderHandle, UpdateOutcome};
use crate::catalog_loader::CelestialBodyDescriptor;
use crate::config::EngineConfig;
use crate::error::{CatalogError, EngineError, EngineResult, FieldIssue};
use crate::orbit_solver::Vector3;

/// Receives render handles when the system is torn down
pub trait RenderSink {
    fn release(&mut self, handle: RenderHandle, name: &str);
}

/// Summary of one `advance` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub simulated_time: f64,
    pub bodies_updated: usize,
    /// Bodies whose position came back non-finite this frame
    pub anomalies: Vec<String>,
}

#[derive(Debug)]
pub struct SystemCoordinator {
    bodies: Vec<BodyState>,
    index: HashMap<String, usize>,
    simulated_time: f64,
    time_scale: f64,
    camera_position: Vector3,
    torn_down: bool,
}

impl SystemCoordinator {
    /// Build runtime state for every descriptor; handles follow load order
    pub fn new(
        descriptors: Vec<CelestialBodyDescriptor>,
        config: &EngineConfig,
    ) -> Result<Self, CatalogError> {
        let mut bodies = Vec::with_capacity(descriptors.len());
        let mut index = HashMap::with_capacity(descriptors.len());
        let mut issues = Vec::new();

        for descriptor in descriptors {
            if index.contains_key(&descriptor.name) {
                issues.push(FieldIssue::new(&descriptor.name, "name", "duplicate body name"));
                continue;
            }
            let handle = RenderHandle(bodies.len() as u32);
            index.insert(descriptor.name.clone(), bodies.len());
            bodies.push(BodyState::new(descriptor, handle, config));
        }

        if !issues.is_empty() {
            return Err(CatalogError::InvalidBodies(issues));
        }

        tracing::info!("System created with {} bodies", bodies.len());

        Ok(Self {
            bodies,
            index,
            simulated_time: 0.0,
            time_scale: clamp_time_scale(config.time_scale),
            camera_position: Vector3::zero(),
            torn_down: false,
        })
    }

    /// Advance simulated time by `wall_clock_delta * time_scale` and update every body.
    ///
    /// # Panics
    /// If called after [`SystemCoordinator::teardown`].
    pub fn advance(&mut self, wall_clock_delta: f64) -> FrameReport {
        assert!(
            !self.torn_down,
            "SystemCoordinator::advance called after teardown"
        );

        let delta = if wall_clock_delta.is_finite() && wall_clock_delta >= 0.0 {
            wall_clock_delta
        } else {
            tracing::warn!("Ignoring invalid frame delta {}", wall_clock_delta);
            0.0
        };

        let next_time = self.simulated_time + delta * self.time_scale;
        if next_time.is_finite() {
            self.simulated_time = next_time;
        } else {
            tracing::warn!("Simulated time overflowed; holding at {}", self.simulated_time);
        }

        let mut report = FrameReport {
            simulated_time: self.simulated_time,
            ..FrameReport::default()
        };

        let camera = self.camera_position;
        for body in &mut self.bodies {
            if body.update(self.simulated_time, &camera) == UpdateOutcome::NonFinitePosition {
                report.anomalies.push(body.name().to_string());
            }
            report.bodies_updated += 1;
        }

        tracing::debug!(
            "Frame advanced to t={} ({} bodies, {} anomalies)",
            report.simulated_time,
            report.bodies_updated,
            report.anomalies.len()
        );
        report
    }

    pub fn simulated_time(&self) -> f64 {
        self.simulated_time
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Negative and non-finite scales clamp to 0 (frozen). Applies from the next `advance`.
    pub fn set_time_scale(&mut self, scale: f64) {
        let clamped = clamp_time_scale(scale);
        if clamped != scale {
            tracing::warn!("Time scale {} clamped to {}", scale, clamped);
        }
        self.time_scale = clamped;
    }

    pub fn camera_position(&self) -> Vector3 {
        self.camera_position
    }

    pub fn set_camera_position(&mut self, position: Vector3) {
        self.camera_position = position;
    }

    // =========================================================================
    // BROADCAST CONTROLS
    // =========================================================================

    pub fn set_orbit_visibility(&mut self, visible: bool) {
        self.bodies.iter_mut().for_each(|b| b.set_orbit_visibility(visible));
    }

    pub fn set_trail_visibility(&mut self, visible: bool) {
        self.bodies.iter_mut().for_each(|b| b.set_trail_visibility(visible));
    }

    pub fn set_tag_visibility(&mut self, visible: bool) {
        self.bodies.iter_mut().for_each(|b| b.set_tag_visibility(visible));
    }

    /// Truncates existing trails right away, keeping the newest points
    pub fn set_trail_length(&mut self, length: u32) {
        let length = length as usize;
        self.bodies.iter_mut().for_each(|b| b.set_trail_length(length));
    }

    // =========================================================================
    // LOOKUP AND PER-BODY CONTROLS
    // =========================================================================

    pub fn bodies(&self) -> &[BodyState] {
        &self.bodies
    }

    pub fn body_by_name(&self, name: &str) -> Option<&BodyState> {
        self.index.get(name).map(|&i| &self.bodies[i])
    }

    pub fn body_by_name_mut(&mut self, name: &str) -> Option<&mut BodyState> {
        self.index.get(name).map(|&i| &mut self.bodies[i])
    }

    fn with_body<F>(&mut self, name: &str, f: F) -> EngineResult<()>
    where
        F: FnOnce(&mut BodyState),
    {
        let body = self
            .body_by_name_mut(name)
            .ok_or_else(|| EngineError::BodyNotFound(name.to_string()))?;
        f(body);
        Ok(())
    }

    pub fn set_body_highlight(&mut self, name: &str, highlight: bool) -> EngineResult<()> {
        self.with_body(name, |b| b.set_highlight(highlight))
    }

    pub fn set_body_tag_visibility(&mut self, name: &str, visible: bool) -> EngineResult<()> {
        self.with_body(name, |b| b.set_tag_visibility(visible))
    }

    pub fn set_body_orbit_visibility(&mut self, name: &str, visible: bool) -> EngineResult<()> {
        self.with_body(name, |b| b.set_orbit_visibility(visible))
    }

    pub fn set_body_trail_visibility(&mut self, name: &str, visible: bool) -> EngineResult<()> {
        self.with_body(name, |b| b.set_trail_visibility(visible))
    }

    // =========================================================================
    // TEARDOWN
    // =========================================================================

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Release every body and hand its render handle back. Further `advance` calls panic.
    pub fn teardown(&mut self, sink: &mut dyn RenderSink) {
        if self.torn_down {
            return;
        }
        for body in self.bodies.drain(..) {
            sink.release(body.handle(), body.name());
        }
        self.index.clear();
        self.torn_down = true;
        tracing::info!("System torn down");
    }
}

fn clamp_time_scale(scale: f64) -> f64 {
    if scale.is_finite() {
        scale.max(0.0)
    } else {
        0.0
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_loader::BodyKind;
    use crate::orbit_solver::OrbitalElements;
    use approx::assert_relative_eq;

    fn descriptor(name: &str, kind: BodyKind, a: Option<f64>) -> CelestialBodyDescriptor {
        CelestialBodyDescriptor {
            name: name.to_string(),
            kind,
            radius: 1.0,
            mass: 1.0,
            rotation_period: 0.0,
            orbital_elements: a.map(|a| OrbitalElements {
                semi_major_axis: a,
                eccentricity: 0.0,
                inclination: 0.0,
                longitude_of_ascending_node: 0.0,
                argument_of_periapsis: 0.0,
                orbital_period: 100.0,
            }),
            average_temperature: None,
            color: "#ffffff".to_string(),
            texture_url: None,
        }
    }

    fn system() -> SystemCoordinator {
        let config = EngineConfig {
            distance_scale: 1.0,
            ..EngineConfig::default()
        };
        SystemCoordinator::new(
            vec![
                descriptor("Apolla A", BodyKind::Star, None),
                descriptor("Kiri", BodyKind::Planet, Some(10.0)),
                descriptor("Pebble", BodyKind::Moon, Some(2.0)),
            ],
            &config,
        )
        .unwrap()
    }

    #[derive(Default)]
    struct RecordingSink {
        released: Vec<(RenderHandle, String)>,
    }

    impl RenderSink for RecordingSink {
        fn release(&mut self, handle: RenderHandle, name: &str) {
            self.released.push((handle, name.to_string()));
        }
    }

    #[test]
    fn test_advance_scales_delta() {
        let mut sys = system();
        sys.set_time_scale(2.0);
        let report = sys.advance(0.5);
        assert_eq!(report.simulated_time, 1.0);
        assert_eq!(report.bodies_updated, 3);
        assert!(report.anomalies.is_empty());
    }

    #[test]
    fn test_negative_time_scale_freezes() {
        let mut sys = system();
        sys.advance(1.0);
        sys.set_time_scale(-5.0);
        assert_eq!(sys.time_scale(), 0.0);
        sys.advance(10.0);
        assert_eq!(sys.simulated_time(), 1.0);
    }

    #[test]
    fn test_negative_delta_never_rewinds() {
        let mut sys = system();
        sys.advance(3.0);
        sys.advance(-1.0);
        sys.advance(f64::NAN);
        assert_eq!(sys.simulated_time(), 3.0);
    }

    #[test]
    fn test_simulated_time_is_reproducible() {
        let deltas = [0.016, 0.017, 0.0, 0.033, 0.016];
        let run = || {
            let mut sys = system();
            sys.set_time_scale(37.5);
            for d in deltas {
                sys.advance(d);
            }
            sys.simulated_time()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_quarter_period_scenario() {
        let mut sys = system();
        let p0 = sys.body_by_name("Kiri").unwrap().state().position;
        sys.advance(25.0);
        let p25 = sys.body_by_name("Kiri").unwrap().state().position;
        assert_relative_eq!(p0.magnitude(), 10.0, max_relative = 1e-12);
        assert_relative_eq!(p25.magnitude(), 10.0, max_relative = 1e-12);
        assert!(p0.dot(&p25).abs() < 1e-9);
    }

    #[test]
    fn test_set_trail_length_truncates_every_body() {
        let mut sys = system();
        for _ in 0..20 {
            sys.advance(1.0);
        }
        sys.set_trail_length(5);
        for body in sys.bodies() {
            assert_eq!(body.state().trail_history().len(), 5);
        }
    }

    #[test]
    fn test_broadcast_visibility() {
        let mut sys = system();
        sys.set_orbit_visibility(false);
        sys.set_trail_visibility(false);
        sys.set_tag_visibility(false);
        for body in sys.bodies() {
            assert!(!body.state().is_orbit_visible);
            assert!(!body.state().is_trail_visible);
            assert!(!body.state().is_tag_visible);
        }
    }

    #[test]
    fn test_lookup_missing_body_is_not_an_error() {
        let mut sys = system();
        assert!(sys.body_by_name("Nibiru").is_none());
        assert_eq!(
            sys.set_body_highlight("Nibiru", true),
            Err(EngineError::BodyNotFound("Nibiru".to_string()))
        );
    }

    #[test]
    fn test_per_body_controls() {
        let mut sys = system();
        sys.set_body_highlight("Kiri", true).unwrap();
        sys.set_body_tag_visibility("Kiri", false).unwrap();
        sys.set_body_orbit_visibility("Pebble", false).unwrap();
        sys.set_body_trail_visibility("Pebble", false).unwrap();

        let kiri = sys.body_by_name("Kiri").unwrap().state();
        assert!(kiri.is_highlighted);
        assert!(!kiri.is_tag_visible);
        let pebble = sys.body_by_name("Pebble").unwrap().state();
        assert!(!pebble.is_orbit_visible);
        assert!(!pebble.is_trail_visible);
        assert!(sys.body_by_name("Apolla A").unwrap().state().is_tag_visible);
    }

    #[test]
    fn test_handles_follow_load_order() {
        let sys = system();
        let handles: Vec<u32> = sys.bodies().iter().map(|b| b.handle().0).collect();
        assert_eq!(handles, vec![0, 1, 2]);
        assert_eq!(sys.bodies()[1].name(), "Kiri");
    }

    #[test]
    fn test_duplicate_descriptor_rejected() {
        let config = EngineConfig::default();
        let result = SystemCoordinator::new(
            vec![
                descriptor("Twin", BodyKind::Planet, Some(1.0)),
                descriptor("Twin", BodyKind::Planet, Some(2.0)),
            ],
            &config,
        );
        assert!(matches!(result, Err(CatalogError::InvalidBodies(_))));
    }

    #[test]
    fn test_bad_body_does_not_stop_the_others() {
        let config = EngineConfig::default();
        let mut broken = descriptor("Glitch", BodyKind::Planet, Some(1.0));
        if let Some(el) = broken.orbital_elements.as_mut() {
            el.eccentricity = f64::NAN;
        }
        let mut sys = SystemCoordinator::new(
            vec![broken, descriptor("Kiri", BodyKind::Planet, Some(10.0))],
            &config,
        )
        .unwrap();

        let report = sys.advance(1.0);
        assert_eq!(report.anomalies, vec!["Glitch".to_string()]);
        assert_eq!(sys.body_by_name("Kiri").unwrap().state().trail_history().len(), 2);
    }

    #[test]
    fn test_teardown_releases_handles() {
        let mut sys = system();
        sys.advance(1.0);
        let mut sink = RecordingSink::default();
        sys.teardown(&mut sink);

        assert!(sys.is_torn_down());
        assert!(sys.bodies().is_empty());
        assert!(sys.body_by_name("Kiri").is_none());
        assert_eq!(sink.released.len(), 3);
        assert_eq!(sink.released[1], (RenderHandle(1), "Kiri".to_string()));
    }

    #[test]
    #[should_panic(expected = "after teardown")]
    fn test_advance_after_teardown_panics() {
        let mut sys = system();
        sys.teardown(&mut RecordingSink::default());
        sys.advance(0.016);
    }
}
