//! Luma nodes
//!
//! Five generation nodes that submit a job, poll it and republish the
//! result, plus two lookup nodes that fetch reference lists.

pub mod common;
mod image_generation;
mod image_reframe;
mod list_camera_motions;
mod list_concepts;
mod reframe;
mod video_generation;
mod video_modify;
mod video_reframe;

pub use common::{MediaArtifact, NodeInputs, PORT_STATUS};
pub use image_generation::LumaImageGenerationTask;
pub use image_reframe::LumaImageReframeTask;
pub use list_camera_motions::LumaListCameraMotionsTask;
pub use list_concepts::LumaListConceptsTask;
pub use video_generation::LumaVideoGenerationTask;
pub use video_modify::LumaVideoModifyTask;
pub use video_reframe::LumaVideoReframeTask;
