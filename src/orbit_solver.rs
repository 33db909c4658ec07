// Orbit Solver - Keplerian position propagation
// Turns orbital elements plus a simulated time into a display-space position

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Display-unit conversion applied uniformly to every solved position
pub const DEFAULT_DISTANCE_SCALE: f64 = 1e-4;

/// Newton steps used for Kepler's equation. Fixed, never early-exits.
pub const KEPLER_ITERATIONS: usize = 10;

/// Segments used when tessellating an orbit path for the renderer
pub const DEFAULT_ORBIT_SEGMENTS: usize = 1000;

// =============================================================================
// 3D VECTOR MATHEMATICS
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn dot(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn scale(&self, s: f64) -> Self {
        Self {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    pub fn sub(&self, other: &Vector3) -> Vector3 {
        Vector3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    pub fn distance_to(&self, other: &Vector3) -> f64 {
        self.sub(other).magnitude()
    }

    /// False if any component is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

// =============================================================================
// KEPLERIAN ORBITAL ELEMENTS
// =============================================================================

/// Orbit shape and orientation. Angles are stored in degrees as loaded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OrbitalElements {
    /// Semi-major axis (catalog distance units, > 0)
    pub semi_major_axis: f64,
    /// Eccentricity, [0, 1) for closed orbits
    pub eccentricity: f64,
    /// Inclination (degrees)
    pub inclination: f64,
    /// Longitude of ascending node (degrees)
    pub longitude_of_ascending_node: f64,
    /// Argument of periapsis (degrees)
    pub argument_of_periapsis: f64,
    /// Orbital period in simulated-time units. <= 0 disables propagation.
    pub orbital_period: f64,
}

impl OrbitalElements {
    pub fn propagates(&self) -> bool {
        self.orbital_period > 0.0
    }

    /// Perifocal-to-inertial rotation Rz(Ω)·Rx(i)·Rz(ω), first two columns.
    /// The perifocal z component is always zero so the third column is never needed.
    pub fn rotation(&self) -> OrbitRotation {
        let cos_node = self.longitude_of_ascending_node.to_radians().cos();
        let sin_node = self.longitude_of_ascending_node.to_radians().sin();
        let cos_w = self.argument_of_periapsis.to_radians().cos();
        let sin_w = self.argument_of_periapsis.to_radians().sin();
        let cos_i = self.inclination.to_radians().cos();
        let sin_i = self.inclination.to_radians().sin();

        OrbitRotation {
            r11: cos_node * cos_w - sin_node * sin_w * cos_i,
            r12: -cos_node * sin_w - sin_node * cos_w * cos_i,
            r21: sin_node * cos_w + cos_node * sin_w * cos_i,
            r22: -sin_node * sin_w + cos_node * cos_w * cos_i,
            r31: sin_w * sin_i,
            r32: cos_w * sin_i,
        }
    }

    /// Orbit radius at true anomaly `nu` (radians)
    pub fn radius_at(&self, nu: f64) -> f64 {
        let e = self.eccentricity;
        self.semi_major_axis * (1.0 - e * e) / (1.0 + e * nu.cos())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrbitRotation {
    r11: f64,
    r12: f64,
    r21: f64,
    r22: f64,
    r31: f64,
    r32: f64,
}

impl OrbitRotation {
    pub fn apply(&self, x_orb: f64, y_orb: f64) -> Vector3 {
        Vector3::new(
            self.r11 * x_orb + self.r12 * y_orb,
            self.r21 * x_orb + self.r22 * y_orb,
            self.r31 * x_orb + self.r32 * y_orb,
        )
    }

    /// Inverse rotation back into the orbital plane. Returns (x, y, z_out_of_plane).
    pub fn unapply(&self, v: &Vector3) -> (f64, f64, f64) {
        // Orthonormal matrix: inverse is the transpose. The third column is the
        // orbit normal, recovered as the cross product of the first two.
        let x = self.r11 * v.x + self.r21 * v.y + self.r31 * v.z;
        let y = self.r12 * v.x + self.r22 * v.y + self.r32 * v.z;
        let n = Vector3::new(
            self.r21 * self.r32 - self.r31 * self.r22,
            self.r31 * self.r12 - self.r11 * self.r32,
            self.r11 * self.r22 - self.r21 * self.r12,
        );
        (x, y, n.dot(v))
    }
}

// =============================================================================
// SOLVER
// =============================================================================

/// Solve Kepler's equation M = E - e*sin(E) with a fixed number of Newton steps
pub fn solve_kepler_equation(mean_anomaly: f64, eccentricity: f64) -> f64 {
    let mut e_anom = mean_anomaly; // Initial guess

    for _ in 0..KEPLER_ITERATIONS {
        let f = e_anom - eccentricity * e_anom.sin() - mean_anomaly;
        let f_prime = 1.0 - eccentricity * e_anom.cos();
        e_anom -= f / f_prime;
    }

    e_anom
}

/// True anomaly from eccentric anomaly
pub fn true_anomaly(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    let e = eccentricity;
    2.0 * (((1.0 + e) / (1.0 - e)).sqrt() * (eccentric_anomaly / 2.0).tan()).atan()
}

/// Position of a body at `time`, in display units.
/// `None` elements put the body at the origin.
pub fn solve_position(
    elements: Option<&OrbitalElements>,
    time: f64,
    distance_scale: f64,
) -> Vector3 {
    let Some(elements) = elements else {
        return Vector3::zero();
    };

    let e = elements.eccentricity;
    let mean_anomaly = 2.0 * PI * time / elements.orbital_period;
    let eccentric_anomaly = solve_kepler_equation(mean_anomaly, e);
    let nu = true_anomaly(eccentric_anomaly, e);

    // Position in orbital plane (perifocal frame)
    let r = elements.radius_at(nu);
    let x_orb = r * nu.cos();
    let y_orb = r * nu.sin();

    elements
        .rotation()
        .apply(x_orb, y_orb)
        .scale(distance_scale)
}

/// Closed polyline of the full ellipse, `segments + 1` points (first == last)
pub fn orbit_path(
    elements: &OrbitalElements,
    segments: usize,
    distance_scale: f64,
) -> Vec<Vector3> {
    let segments = segments.max(1);
    let rotation = elements.rotation();

    (0..=segments)
        .map(|i| {
            let angle = (i as f64 / segments as f64) * 2.0 * PI;
            let r = elements.radius_at(angle);
            rotation
                .apply(r * angle.cos(), r * angle.sin())
                .scale(distance_scale)
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
