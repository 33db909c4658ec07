// Catalog Loader - celestial body definitions
// Parses the body data file and validates it into immutable descriptors

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

use crate::error::{CatalogError, FieldIssue};
use crate::orbit_solver::OrbitalElements;

// =============================================================================
// FILE FORMAT
// =============================================================================

/// One entry of the data file exactly as written. Every field is optional here
/// so that missing values surface as validation issues instead of parse errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CelestialBodyData {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub body_type: Option<String>,
    pub radius: Option<f64>,
    pub color: Option<String>,
    pub texture_url: Option<String>,
    pub mass: Option<f64>,
    pub orbital_period: Option<f64>,
    pub rotation_period: Option<f64>,
    pub orbit_data: Option<OrbitData>,
    pub average_temperature: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrbitData {
    pub semi_major_axis: Option<f64>,
    pub eccentricity: Option<f64>,
    pub inclination: Option<f64>,
    pub longitude_of_ascending_node: Option<f64>,
    pub argument_of_periapsis: Option<f64>,
}

// =============================================================================
// VALIDATED DESCRIPTORS
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    Star,
    Planet,
    Moon,
}

impl BodyKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "star" => Some(BodyKind::Star),
            "planet" => Some(BodyKind::Planet),
            "moon" => Some(BodyKind::Moon),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BodyKind::Star => "star",
            BodyKind::Planet => "planet",
            BodyKind::Moon => "moon",
        }
    }
}

/// Immutable description of a body, created once at load time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CelestialBodyDescriptor {
    pub name: String,
    pub kind: BodyKind,
    /// km
    pub radius: f64,
    /// kg
    pub mass: f64,
    /// Simulated-time units per revolution; <= 0 disables self-rotation
    pub rotation_period: f64,
    pub orbital_elements: Option<OrbitalElements>,
    /// °C
    pub average_temperature: Option<f64>,
    pub color: String,
    pub texture_url: Option<String>,
}

impl CelestialBodyDescriptor {
    /// Human-readable summary for info panels
    pub fn info(&self) -> String {
        let mut info = format!(
            "Type: {}\nRadius: {} km\nMass: {:.2e} kg\nRotation Period: {:.3} Earth days",
            self.kind.as_str(),
            self.radius,
            self.mass,
            self.rotation_period
        );
        if let Some(t) = self.average_temperature {
            info.push_str(&format!("\nAverage Temperature: {}°C", t));
        }
        info
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

fn require_finite(
    issues: &mut Vec<FieldIssue>,
    body: &str,
    field: &'static str,
    value: Option<f64>,
) -> Option<f64> {
    match value {
        None => {
            issues.push(FieldIssue::new(body, field, "missing"));
            None
        }
        Some(v) if !v.is_finite() => {
            issues.push(FieldIssue::new(body, field, format!("not finite ({v})")));
            None
        }
        Some(v) => Some(v),
    }
}

fn require_positive(
    issues: &mut Vec<FieldIssue>,
    body: &str,
    field: &'static str,
    value: Option<f64>,
) -> Option<f64> {
    let v = require_finite(issues, body, field, value)?;
    if v <= 0.0 {
        issues.push(FieldIssue::new(body, field, format!("must be > 0, got {v}")));
        return None;
    }
    Some(v)
}

impl OrbitData {
    fn to_elements(
        &self,
        body: &str,
        orbital_period: Option<f64>,
        issues: &mut Vec<FieldIssue>,
    ) -> Option<OrbitalElements> {
        let semi_major_axis =
            require_positive(issues, body, "orbitData.semiMajorAxis", self.semi_major_axis);
        let eccentricity = require_finite(issues, body, "orbitData.eccentricity", self.eccentricity)
            .and_then(|e| {
                if (0.0..1.0).contains(&e) {
                    Some(e)
                } else {
                    issues.push(FieldIssue::new(
                        body,
                        "orbitData.eccentricity",
                        format!("must be in [0, 1), got {e}"),
                    ));
                    None
                }
            });
        let inclination = require_finite(issues, body, "orbitData.inclination", self.inclination);
        let node = require_finite(
            issues,
            body,
            "orbitData.longitudeOfAscendingNode",
            self.longitude_of_ascending_node,
        );
        let periapsis = require_finite(
            issues,
            body,
            "orbitData.argumentOfPeriapsis",
            self.argument_of_periapsis,
        );

        Some(OrbitalElements {
            semi_major_axis: semi_major_axis?,
            eccentricity: eccentricity?,
            inclination: inclination?,
            longitude_of_ascending_node: node?,
            argument_of_periapsis: periapsis?,
            orbital_period: orbital_period?,
        })
    }
}

impl CelestialBodyData {
    /// Convert one file entry to a descriptor, recording every problem found
    pub fn to_descriptor(
        &self,
        index: usize,
        issues: &mut Vec<FieldIssue>,
    ) -> Option<CelestialBodyDescriptor> {
        let label = match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                let label = format!("#{index}");
                issues.push(FieldIssue::new(&label, "name", "missing"));
                label
            }
        };
        let body = label.as_str();

        let kind = match self.body_type.as_deref() {
            None => {
                issues.push(FieldIssue::new(body, "type", "missing"));
                None
            }
            Some(raw) => {
                let kind = BodyKind::parse(raw);
                if kind.is_none() {
                    issues.push(FieldIssue::new(
                        body,
                        "type",
                        format!("expected star, planet or moon, got {raw:?}"),
                    ));
                }
                kind
            }
        };

        let radius = require_positive(issues, body, "radius", self.radius);
        let mass = require_positive(issues, body, "mass", self.mass);
        let orbital_period = require_finite(issues, body, "orbitalPeriod", self.orbital_period);
        let rotation_period = require_finite(issues, body, "rotationPeriod", self.rotation_period);
        let color = match &self.color {
            Some(c) => Some(c.clone()),
            None => {
                issues.push(FieldIssue::new(body, "color", "missing"));
                None
            }
        };

        let average_temperature = match self.average_temperature {
            Some(t) if !t.is_finite() => {
                issues.push(FieldIssue::new(
                    body,
                    "averageTemperature",
                    format!("not finite ({t})"),
                ));
                None
            }
            other => other,
        };

        // A missing orbit block is legal; a broken one is not
        let orbital_elements = match &self.orbit_data {
            None => None,
            Some(orbit) => Some(orbit.to_elements(body, orbital_period, issues)?),
        };

        Some(CelestialBodyDescriptor {
            name: self.name.clone()?.trim().to_string(),
            kind: kind?,
            radius: radius?,
            mass: mass?,
            rotation_period: rotation_period?,
            orbital_elements,
            average_temperature,
            color: color?,
            texture_url: self.texture_url.clone(),
        })
    }
}

// =============================================================================
// LOADING
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Expected {
    Number,
    Text,
    Object,
}

impl Expected {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Expected::Number => value.is_number(),
            Expected::Text => value.is_string(),
            Expected::Object => value.is_object(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Expected::Number => "a number",
            Expected::Text => "a string",
            Expected::Object => "an object",
        }
    }
}

const ENTRY_FIELDS: &[(&str, Expected)] = &[
    ("name", Expected::Text),
    ("type", Expected::Text),
    ("radius", Expected::Number),
    ("color", Expected::Text),
    ("textureUrl", Expected::Text),
    ("mass", Expected::Number),
    ("orbitalPeriod", Expected::Number),
    ("rotationPeriod", Expected::Number),
    ("averageTemperature", Expected::Number),
    ("orbitData", Expected::Object),
];

const ORBIT_FIELDS: &[(&str, &str)] = &[
    ("semiMajorAxis", "orbitData.semiMajorAxis"),
    ("eccentricity", "orbitData.eccentricity"),
    ("inclination", "orbitData.inclination"),
    ("longitudeOfAscendingNode", "orbitData.longitudeOfAscendingNode"),
    ("argumentOfPeriapsis", "orbitData.argumentOfPeriapsis"),
];

fn describe_value(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn check_shape(
    issues: &mut Vec<FieldIssue>,
    body: &str,
    field: &'static str,
    value: Option<&Value>,
    expected: Expected,
) {
    // null reads as absent, same as a missing key
    if let Some(v) = value.filter(|v| !v.is_null() && !expected.accepts(v)) {
        issues.push(FieldIssue::new(
            body,
            field,
            format!("expected {}, got {}", expected.describe(), describe_value(v)),
        ));
    }
}

/// Decode one raw entry, reporting wrongly typed fields by body and field name
fn decode_entry(
    index: usize,
    value: Value,
    issues: &mut Vec<FieldIssue>,
) -> Option<CelestialBodyData> {
    let label = value
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map_or_else(|| format!("#{index}"), str::to_string);

    if !value.is_object() {
        issues.push(FieldIssue::new(
            &label,
            "entry",
            format!("expected an object, got {}", describe_value(&value)),
        ));
        return None;
    }

    let before = issues.len();
    for &(key, expected) in ENTRY_FIELDS {
        check_shape(issues, &label, key, value.get(key), expected);
    }
    if let Some(orbit) = value.get("orbitData").filter(|o| o.is_object()) {
        for &(key, field) in ORBIT_FIELDS {
            check_shape(issues, &label, field, orbit.get(key), Expected::Number);
        }
    }
    if issues.len() > before {
        return None;
    }

    match serde_json::from_value(value) {
        Ok(entry) => Some(entry),
        Err(err) => {
            issues.push(FieldIssue::new(&label, "entry", err.to_string()));
            None
        }
    }
}

fn validate_entries<'a>(
    entries: impl IntoIterator<Item = (usize, &'a CelestialBodyData)>,
    mut issues: Vec<FieldIssue>,
) -> Result<Vec<CelestialBodyDescriptor>, CatalogError> {
    let mut seen = HashSet::new();
    let mut descriptors = Vec::new();

    for (index, entry) in entries {
        if let Some(descriptor) = entry.to_descriptor(index, &mut issues) {
            if !seen.insert(descriptor.name.clone()) {
                issues.push(FieldIssue::new(&descriptor.name, "name", "duplicate body name"));
                continue;
            }
            descriptors.push(descriptor);
        }
    }

    if issues.is_empty() {
        Ok(descriptors)
    } else {
        for issue in &issues {
            tracing::warn!("Rejected catalog field {}", issue);
        }
        Err(CatalogError::InvalidBodies(issues))
    }
}

/// Validate a whole catalog. Either every entry is valid or nothing is returned.
pub fn validate_catalog(
    entries: &[CelestialBodyData],
) -> Result<Vec<CelestialBodyDescriptor>, CatalogError> {
    validate_entries(entries.iter().enumerate(), Vec::new())
}

/// Parse and validate a catalog document. Only a file that is not a JSON
/// array at all fails as `CatalogError::Json`; everything else is reported
/// per body and field.
pub fn parse_catalog(json: &str) -> Result<Vec<CelestialBodyDescriptor>, CatalogError> {
    let raw: Vec<Value> = serde_json::from_str(json)?;
    let mut issues = Vec::new();
    let mut entries = Vec::with_capacity(raw.len());
    for (index, value) in raw.into_iter().enumerate() {
        if let Some(entry) = decode_entry(index, value, &mut issues) {
            entries.push((index, entry));
        }
    }
    validate_entries(entries.iter().map(|(index, entry)| (*index, entry)), issues)
}

pub fn load_catalog(path: impl AsRef<Path>) -> Result<Vec<CelestialBodyDescriptor>, CatalogError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let descriptors = parse_catalog(&json)?;
    tracing::info!("Loaded {} bodies from {:?}", descriptors.len(), path);
    Ok(descriptors)
}
