pub mod scene;
pub mod video;
