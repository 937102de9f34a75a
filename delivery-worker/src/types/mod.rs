/// Environment configuration
pub mod environment;
/// Delivery outcome and error codes
pub mod error;

pub use environment::Environment;
pub use error::{Artifact, DeliveryErrorCode, DeliveryOutcome};
