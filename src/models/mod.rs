mod envelope;
mod request;
mod verdict;

pub use envelope::ResultEnvelope;
pub use request::{ExecutionRequest, Language};
pub use verdict::{RuleCategory, VettingVerdict};
