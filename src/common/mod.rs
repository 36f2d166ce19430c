//! Shared loaders used by the binary and by scenario tests.

pub mod scene;

pub use scene::{Scene, SceneLoadError, SceneRuntime, load_scene};
