//! Zoom-Pan-Tilt navigation over the knowledge graph

pub mod navigator;
pub mod params;
pub mod query;
pub mod session;

pub use navigator::{Corpuscle, NavigationMetadata, NavigationOutcome, ZptNavigator};
pub use params::{NavigationParams, PanFilter, TemporalRange, TiltProjection, ZoomLevel};
pub use query::ZptQueryBuilder;
pub use session::{NavigationSession, NavigationView, SessionStore, ZptState};
