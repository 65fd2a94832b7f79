use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

/// Limits applied to every script execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Wall-clock budget, compared against elapsed time after the run returns
    #[serde(
        default = "default_timeout",
        rename = "timeout_ms",
        serialize_with = "serialize_duration_as_millis",
        deserialize_with = "deserialize_duration_from_millis"
    )]
    pub timeout: Duration,

    /// Largest source accepted, in bytes
    #[serde(default = "default_max_source_bytes")]
    pub max_source_bytes: usize,

    /// Deepest bracket/operator nesting accepted before the source reaches the parser
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            max_source_bytes: default_max_source_bytes(),
            max_nesting_depth: default_max_nesting_depth(),
        }
    }
}

impl SandboxConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_source_bytes(mut self, max_source_bytes: usize) -> Self {
        self.max_source_bytes = max_source_bytes;
        self
    }

    pub fn with_max_nesting_depth(mut self, max_nesting_depth: usize) -> Self {
        self.max_nesting_depth = max_nesting_depth;
        self
    }

    pub fn timeout_ms(&self) -> u128 {
        self.timeout.as_millis()
    }
}

fn default_timeout() -> Duration {
    Duration::from_millis(5_000)
}

fn default_max_source_bytes() -> usize {
    1024 * 1024
}

fn default_max_nesting_depth() -> usize {
    128
}

fn serialize_duration_as_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

fn deserialize_duration_from_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(millis))
}
