//! Configuration types.

pub mod settings;

pub use settings::{ImagePolicy, McapBounds, Settings, UpdateStyle};
