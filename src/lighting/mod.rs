//! Light aggregation.
//!
//! Lights are grouped per [`LightType`] into [`LightBucket`] chunks that pack
//! their attributes into flat arrays. Shadow casters share the slots of one
//! [`ShadowPool`]. [`LightModel`] owns the lights and wires every chunk under
//! a single root.

pub mod bucket;
pub mod buffer;
pub mod light;
pub mod model;
pub mod shadow;

pub use bucket::{LIGHTS_SLOT, LightBucket, PRE_SLOT};
pub use buffer::LightBuffer;
pub use light::{Light, LightAttribute, LightId, LightKind, LightType, ShadowSettings};
pub use model::LightModel;
pub use shadow::{MAX_SHADOWS, ShadowPool};
