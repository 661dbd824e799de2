pub mod driver;
pub mod machine;
pub mod timer;

use crate::vision::VisionError;

pub use driver::Referee;

#[derive(Debug, thiserror::Error)]
pub enum RefereeError {
    #[error("robot command failed: {0}")]
    Robot(Box<dyn std::error::Error + Send + Sync>),
    #[error("frame comparison failed: {0}")]
    Vision(#[from] VisionError),
    #[error("robot event stream closed")]
    EventsClosed,
}

impl RefereeError {
    pub fn robot<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
        RefereeError::Robot(Box::new(e))
    }
}
