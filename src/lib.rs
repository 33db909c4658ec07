// Planetarium - orbit propagation and visual-state engine
// Library entry point shared by the CLI and any rendering front end

pub mod body_state;
pub mod catalog_loader;
pub mod config;
pub mod error;
pub mod label_lod;
pub mod orbit_solver;
pub mod state_manager;
pub mod system_coordinator;

pub use body_state::{BodySnapshot, BodyState, KindHint, RenderHandle};
pub use catalog_loader::{load_catalog, parse_catalog, BodyKind, CelestialBodyDescriptor};
pub use config::{EngineConfig, MAX_TRAIL_LENGTH};
pub use error::{CatalogError, ConfigError, EngineError};
pub use label_lod::{LabelLodPolicy, LodLevel, LodTier};
pub use orbit_solver::{solve_position, OrbitalElements, Vector3};
pub use state_manager::{AppState, FrameSnapshot};
pub use system_coordinator::{FrameReport, RenderSink, SystemCoordinator};
