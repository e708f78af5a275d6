pub mod render;

pub use render::{FrameStats, SceneView, SkiaRenderer, INSTRUCTIONS};
