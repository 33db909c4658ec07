// Body State - per-body runtime state
// Position, rotation, trail history, visibility flags and label presentation for one body

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::f64::consts::TAU;

use crate::catalog_loader::{BodyKind, CelestialBodyDescriptor};
use crate::config::{EngineConfig, HighlightStyle, MAX_TRAIL_LENGTH};
use crate::label_lod::{LabelLodPolicy, LodTier};
use crate::orbit_solver::{orbit_path, solve_position, Vector3};

// =============================================================================
// RENDER-FACING HANDLES AND HINTS
// =============================================================================

/// Opaque id the rendering side maps to its own meshes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderHandle(pub u32);

/// Glow shader parameters carried by stars
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GlowHint {
    pub c: f64,
    pub p: f64,
    /// Camera minus star position, refreshed every tick
    pub view_vector: Vector3,
}

impl Default for GlowHint {
    fn default() -> Self {
        Self {
            c: 0.1,
            p: 1.2,
            view_vector: Vector3::new(0.0, 0.0, 220.0),
        }
    }
}

/// Per-kind behaviour and rendering payload
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum KindHint {
    Star(GlowHint),
    Planet,
    Moon,
}

impl KindHint {
    fn for_kind(kind: BodyKind) -> Self {
        match kind {
            BodyKind::Star => KindHint::Star(GlowHint::default()),
            BodyKind::Planet => KindHint::Planet,
            BodyKind::Moon => KindHint::Moon,
        }
    }
}

/// What happened to a body during one update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// Solver produced NaN/Inf; the previous position was kept and no trail point was recorded
    NonFinitePosition,
}

// =============================================================================
// RUNTIME STATE
// =============================================================================

#[derive(Debug, Clone)]
pub struct BodyRuntimeState {
    pub position: Vector3,
    /// Radians in [0, 2π)
    pub rotation_angle: f64,
    trail_history: VecDeque<Vector3>,
    trail_length: usize,
    pub is_highlighted: bool,
    pub is_orbit_visible: bool,
    pub is_trail_visible: bool,
    pub is_tag_visible: bool,
    pub lod_tier: LodTier,
    pub label_scale: f64,
    pub pick_radius: f64,
    pub halo_scale: f64,
    pub halo_opacity: f64,
}

impl BodyRuntimeState {
    fn new(trail_length: usize, style: &HighlightStyle) -> Self {
        Self {
            position: Vector3::zero(),
            rotation_angle: 0.0,
            trail_history: VecDeque::new(),
            trail_length: trail_length.min(MAX_TRAIL_LENGTH),
            is_highlighted: false,
            is_orbit_visible: true,
            is_trail_visible: true,
            is_tag_visible: true,
            lod_tier: LodTier::Full,
            label_scale: 0.0,
            pick_radius: 0.0,
            halo_scale: style.normal_scale,
            halo_opacity: style.normal_opacity,
        }
    }

    pub fn trail_history(&self) -> &VecDeque<Vector3> {
        &self.trail_history
    }

    pub fn trail_length(&self) -> usize {
        self.trail_length
    }

    fn push_trail(&mut self, position: Vector3) {
        // An empty trail is seeded with two copies so the first drawn
        // segment has both endpoints, including after a shrink to zero
        if self.trail_history.is_empty() {
            self.trail_history.push_back(position);
        }
        self.trail_history.push_back(position);
        self.evict_trail();
    }

    fn evict_trail(&mut self) {
        while self.trail_history.len() > self.trail_length {
            self.trail_history.pop_front();
        }
    }
}

// =============================================================================
// BODY STATE
// =============================================================================

#[derive(Debug, Clone)]
pub struct BodyState {
    descriptor: CelestialBodyDescriptor,
    handle: RenderHandle,
    hint: KindHint,
    orbit_path: Vec<Vector3>,
    state: BodyRuntimeState,
    distance_scale: f64,
    label_base_scale: f64,
    pick_radius_min: f64,
    pick_radius_max: f64,
    lod: LabelLodPolicy,
    highlight: HighlightStyle,
}

impl BodyState {
    pub fn new(
        descriptor: CelestialBodyDescriptor,
        handle: RenderHandle,
        config: &EngineConfig,
    ) -> Self {
        let orbit_path = descriptor
            .orbital_elements
            .as_ref()
            .map(|el| orbit_path(el, config.orbit_segments, config.distance_scale))
            .unwrap_or_default();

        let mut body = Self {
            hint: KindHint::for_kind(descriptor.kind),
            handle,
            orbit_path,
            state: BodyRuntimeState::new(config.clamped_trail_length(), &config.highlight),
            distance_scale: config.distance_scale,
            label_base_scale: config.label_base_scale,
            pick_radius_min: config.pick_radius_min,
            pick_radius_max: config.pick_radius_max.max(config.pick_radius_min),
            lod: config.lod.clone(),
            highlight: config.highlight,
            descriptor,
        };

        // Initial placement at t = 0
        if let Some(el) = body.descriptor.orbital_elements.as_ref().filter(|el| el.propagates()) {
            let p = solve_position(Some(el), 0.0, body.distance_scale);
            if p.is_finite() {
                body.state.position = p;
            }
        }
        body
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &CelestialBodyDescriptor {
        &self.descriptor
    }

    pub fn handle(&self) -> RenderHandle {
        self.handle
    }

    pub fn hint(&self) -> &KindHint {
        &self.hint
    }

    pub fn state(&self) -> &BodyRuntimeState {
        &self.state
    }

    pub fn orbit_path(&self) -> &[Vector3] {
        &self.orbit_path
    }

    /// Advance this body to `simulated_time` as seen from `camera_position`
    pub fn update(&mut self, simulated_time: f64, camera_position: &Vector3) -> UpdateOutcome {
        let mut outcome = UpdateOutcome::Updated;

        let next_position = match (&self.descriptor.orbital_elements, self.descriptor.kind) {
            (Some(el), _) if el.propagates() => {
                Some(solve_position(Some(el), simulated_time, self.distance_scale))
            }
            (_, BodyKind::Star) => Some(Vector3::zero()),
            _ => None,
        };

        if let Some(p) = next_position {
            if p.is_finite() {
                self.state.position = p;
            } else {
                tracing::warn!(
                    "Non-finite position for {} at t={}: {:?}",
                    self.descriptor.name,
                    simulated_time,
                    p
                );
                outcome = UpdateOutcome::NonFinitePosition;
            }
        }

        if self.descriptor.rotation_period > 0.0 {
            let angle = (TAU * simulated_time / self.descriptor.rotation_period).rem_euclid(TAU);
            if angle.is_finite() {
                self.state.rotation_angle = angle;
            }
        }

        if self.state.is_trail_visible && outcome == UpdateOutcome::Updated {
            self.state.push_trail(self.state.position);
        }

        let distance = self.state.position.distance_to(camera_position);
        let level = self.lod.classify(distance);
        self.state.lod_tier = level.tier;
        self.state.label_scale = self.label_base_scale * level.scale_multiplier;
        self.state.pick_radius = if distance.is_finite() {
            distance.clamp(self.pick_radius_min, self.pick_radius_max)
        } else {
            self.pick_radius_max
        };

        if let KindHint::Star(glow) = &mut self.hint {
            glow.view_vector = camera_position.sub(&self.state.position);
        }

        outcome
    }

    /// Idempotent: repeating the current value changes nothing
    pub fn set_highlight(&mut self, highlight: bool) {
        if self.state.is_highlighted == highlight {
            return;
        }
        self.state.is_highlighted = highlight;
        if highlight {
            self.state.halo_scale = self.highlight.highlighted_scale;
            self.state.halo_opacity = self.highlight.highlighted_opacity;
        } else {
            self.state.halo_scale = self.highlight.normal_scale;
            self.state.halo_opacity = self.highlight.normal_opacity;
        }
        tracing::debug!("Highlight set to {} for {}", highlight, self.descriptor.name);
    }

    pub fn set_orbit_visibility(&mut self, visible: bool) {
        self.state.is_orbit_visible = visible;
    }

    /// Hiding the trail pauses recording; the buffer is kept
    pub fn set_trail_visibility(&mut self, visible: bool) {
        self.state.is_trail_visible = visible;
    }

    pub fn set_tag_visibility(&mut self, visible: bool) {
        self.state.is_tag_visible = visible;
    }

    /// Cap at MAX_TRAIL_LENGTH and drop the oldest points immediately
    pub fn set_trail_length(&mut self, length: usize) {
        self.state.trail_length = length.min(MAX_TRAIL_LENGTH);
        self.state.evict_trail();
    }

    pub fn label_text(&self) -> String {
        match self.state.lod_tier {
            LodTier::Full => format!("{}\n{}", self.descriptor.name, self.descriptor.kind.as_str()),
            LodTier::Compact => self.descriptor.name.clone(),
            LodTier::Minimal => self
                .descriptor
                .name
                .chars()
                .next()
                .map(String::from)
                .unwrap_or_default(),
        }
    }

    pub fn snapshot(&self) -> BodySnapshot {
        let glow = match self.hint {
            KindHint::Star(glow) => Some(glow),
            _ => None,
        };

        BodySnapshot {
            name: self.descriptor.name.clone(),
            handle: self.handle,
            kind: self.descriptor.kind,
            color: self.descriptor.color.clone(),
            position: self.state.position.to_array(),
            rotation_angle: self.state.rotation_angle,
            trail: self.state.trail_history.iter().map(Vector3::to_array).collect(),
            trail_visible: self.state.is_trail_visible && !self.state.trail_history.is_empty(),
            orbit_visible: self.state.is_orbit_visible && !self.orbit_path.is_empty(),
            tag_visible: self.state.is_tag_visible,
            highlighted: self.state.is_highlighted,
            halo_scale: self.state.halo_scale,
            halo_opacity: self.state.halo_opacity,
            lod_tier: self.state.lod_tier,
            label_scale: self.state.label_scale,
            label_text: self.label_text(),
            pick_radius: self.state.pick_radius,
            glow,
        }
    }
}

/// Read-only projection handed to the renderer once per frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodySnapshot {
    pub name: String,
    pub handle: RenderHandle,
    pub kind: BodyKind,
    pub color: String,
    pub position: [f64; 3],
    pub rotation_angle: f64,
    pub trail: Vec<[f64; 3]>,
    pub trail_visible: bool,
    pub orbit_visible: bool,
    pub tag_visible: bool,
    pub highlighted: bool,
    pub halo_scale: f64,
    pub halo_opacity: f64,
    pub lod_tier: LodTier,
    pub label_scale: f64,
    pub label_text: String,
    pub pick_radius: f64,
    pub glow: Option<GlowHint>,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbit_solver::OrbitalElements;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn descriptor(
        name: &str,
        kind: BodyKind,
        elements: Option<OrbitalElements>,
    ) -> CelestialBodyDescriptor {
        CelestialBodyDescriptor {
            name: name.to_string(),
            kind,
            radius: 1.0,
            mass: 1.0,
            rotation_period: 10.0,
            orbital_elements: elements,
            average_temperature: None,
            color: "#ffffff".to_string(),
            texture_url: None,
        }
    }

    fn circular(a: f64, period: f64) -> OrbitalElements {
        OrbitalElements {
            semi_major_axis: a,
            eccentricity: 0.0,
            inclination: 0.0,
            longitude_of_ascending_node: 0.0,
            argument_of_periapsis: 0.0,
            orbital_period: period,
        }
    }

    fn unit_config() -> EngineConfig {
        EngineConfig {
            distance_scale: 1.0,
            ..EngineConfig::default()
        }
    }

    fn planet(period: f64) -> BodyState {
        BodyState::new(
            descriptor("Kiri", BodyKind::Planet, Some(circular(10.0, period))),
            RenderHandle(1),
            &unit_config(),
        )
    }

    #[test]
    fn test_first_append_seeds_two_copies() {
        let mut body = planet(100.0);
        body.update(0.0, &Vector3::zero());
        let trail = body.state().trail_history();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0], trail[1]);
    }

    #[test]
    fn test_trail_truncates_to_most_recent() {
        let mut body = planet(100.0);
        let mut positions = Vec::new();
        for i in 0..20 {
            body.update(i as f64, &Vector3::zero());
            positions.push(body.state().position);
        }
        body.set_trail_length(5);

        let trail: Vec<Vector3> = body.state().trail_history().iter().copied().collect();
        assert_eq!(trail, positions[15..].to_vec());
    }

    #[test]
    fn test_hidden_trail_stops_recording() {
        let mut body = planet(100.0);
        body.update(0.0, &Vector3::zero());
        body.update(1.0, &Vector3::zero());
        body.set_trail_visibility(false);
        body.update(2.0, &Vector3::zero());
        assert_eq!(body.state().trail_history().len(), 3);
        assert!(!body.snapshot().trail_visible);
    }

    #[test]
    fn test_trail_never_seeded_while_hidden() {
        let mut body = planet(100.0);
        body.set_trail_visibility(false);
        body.update(0.0, &Vector3::zero());
        assert!(body.state().trail_history().is_empty());
        assert!(!body.snapshot().trail_visible);
    }

    #[test]
    fn test_zero_trail_length_keeps_buffer_empty() {
        let mut body = planet(100.0);
        body.set_trail_length(0);
        body.update(0.0, &Vector3::zero());
        body.update(1.0, &Vector3::zero());
        assert!(body.state().trail_history().is_empty());
    }

    #[test]
    fn test_trail_reseeds_after_shrink_to_zero() {
        let mut body = planet(100.0);
        body.update(0.0, &Vector3::zero());
        body.update(1.0, &Vector3::zero());
        body.set_trail_length(0);
        assert!(body.state().trail_history().is_empty());

        body.set_trail_length(10);
        body.update(2.0, &Vector3::zero());
        let trail = body.state().trail_history();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0], trail[1]);
        assert_eq!(trail[1], body.state().position);
    }

    #[test]
    fn test_trail_length_capped_at_maximum() {
        let mut body = planet(100.0);
        body.set_trail_length(50_000);
        assert_eq!(body.state().trail_length(), MAX_TRAIL_LENGTH);
    }

    #[test]
    fn test_star_without_orbit_stays_at_origin() {
        let mut star = BodyState::new(
            descriptor("Apolla A", BodyKind::Star, None),
            RenderHandle(0),
            &unit_config(),
        );
        for t in [0.0, 1.0, 1.0e6, 3.3e9] {
            star.update(t, &Vector3::new(0.0, 0.0, 100.0));
            assert_eq!(star.state().position, Vector3::zero());
        }
    }

    #[test]
    fn test_star_glow_tracks_camera() {
        let mut star = BodyState::new(
            descriptor("Apolla A", BodyKind::Star, None),
            RenderHandle(0),
            &unit_config(),
        );
        let camera = Vector3::new(3.0, 4.0, 5.0);
        star.update(1.0, &camera);
        match star.hint() {
            KindHint::Star(glow) => {
                assert_eq!(glow.view_vector, camera);
                assert_eq!(glow.c, 0.1);
            }
            other => panic!("expected a star hint, got {other:?}"),
        }
    }

    #[test]
    fn test_static_moon_keeps_position() {
        let mut moon = BodyState::new(
            descriptor("Rock", BodyKind::Moon, None),
            RenderHandle(2),
            &unit_config(),
        );
        moon.update(42.0, &Vector3::zero());
        assert_eq!(moon.state().position, Vector3::zero());
        assert!(moon.orbit_path().is_empty());
        assert!(!moon.snapshot().orbit_visible);
    }

    #[test]
    fn test_non_positive_period_freezes_orbit() {
        let mut body = planet(0.0);
        let initial = body.state().position;
        body.update(50.0, &Vector3::zero());
        assert_eq!(body.state().position, initial);
    }

    #[test]
    fn test_rotation_angle_wraps() {
        let mut body = planet(100.0);
        body.update(25.0, &Vector3::zero());
        // 2.5 turns
        assert_relative_eq!(
            body.state().rotation_angle,
            std::f64::consts::PI,
            max_relative = 1e-12
        );
        assert!(body.state().rotation_angle < TAU);
    }

    #[test]
    fn test_highlight_is_idempotent() {
        let mut once = planet(100.0);
        once.set_highlight(true);

        let mut twice = planet(100.0);
        twice.set_highlight(true);
        twice.set_highlight(true);

        assert_eq!(once.state().halo_scale, 1.2);
        assert_eq!(twice.state().halo_scale, once.state().halo_scale);
        assert_eq!(twice.state().halo_opacity, 0.5);

        twice.set_highlight(false);
        twice.set_highlight(false);
        assert_eq!(twice.state().halo_scale, 1.0);
        assert_eq!(twice.state().halo_opacity, 0.3);
    }

    #[test]
    fn test_lod_follows_camera_distance() {
        let mut body = planet(100.0);
        body.update(0.0, &Vector3::new(10.0, 5.0, 0.0));
        assert_eq!(body.state().lod_tier, LodTier::Full);
        assert_relative_eq!(body.state().label_scale, 6.0);
        assert_eq!(body.label_text(), "Kiri\nplanet");

        body.update(0.0, &Vector3::new(10.0, 0.0, 500.0));
        assert_eq!(body.state().lod_tier, LodTier::Compact);
        assert_eq!(body.label_text(), "Kiri");

        body.update(0.0, &Vector3::new(10.0, 0.0, 5000.0));
        assert_eq!(body.state().lod_tier, LodTier::Minimal);
        assert_relative_eq!(body.state().label_scale, 12.0);
        assert_eq!(body.label_text(), "K");
        assert_eq!(body.state().pick_radius, 1000.0);
    }

    #[test]
    fn test_corrupted_elements_skip_trail_append() {
        let mut broken = circular(10.0, 100.0);
        broken.semi_major_axis = f64::NAN;
        let mut body = BodyState::new(
            descriptor("Glitch", BodyKind::Planet, Some(broken)),
            RenderHandle(3),
            &unit_config(),
        );

        let outcome = body.update(1.0, &Vector3::zero());
        assert_eq!(outcome, UpdateOutcome::NonFinitePosition);
        assert!(body.state().position.is_finite());
        assert!(body.state().trail_history().is_empty());
    }

    #[test]
    fn test_snapshot_projects_state() {
        let mut body = planet(100.0);
        body.update(25.0, &Vector3::new(0.0, 0.0, 100.0));
        let snap = body.snapshot();
        assert_eq!(snap.name, "Kiri");
        assert_eq!(snap.handle, RenderHandle(1));
        assert_eq!(snap.trail.len(), 2);
        assert!(snap.orbit_visible);
        assert!(snap.glow.is_none());
        assert_relative_eq!(snap.position[1], 10.0, max_relative = 1e-9);
    }

    proptest! {
        /// Trail length never exceeds its bound, whatever the update/resize sequence.
        #[test]
        fn prop_trail_bounded(
            ops in proptest::collection::vec((0usize..40, any::<bool>()), 1..200),
        ) {
            let mut body = planet(7.0);
            let mut t = 0.0;
            for (length, resize) in ops {
                if resize {
                    body.set_trail_length(length);
                } else {
                    t += 0.25;
                    body.update(t, &Vector3::zero());
                }
                let state = body.state();
                prop_assert!(state.trail_history().len() <= state.trail_length());
                prop_assert!(state.trail_length() <= MAX_TRAIL_LENGTH);
            }
        }
    }
}
