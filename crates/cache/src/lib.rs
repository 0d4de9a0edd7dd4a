mod error;
mod project;
mod scene;

pub use error::Error;
pub use project::CachedProject;
pub use scene::CachedScene;
