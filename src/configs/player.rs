use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlayerConfig {
    /// Pending requests allowed per session. 0 disables the bound.
    #[serde(default = "default_max_queue_length")]
    pub max_queue_length: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_queue_length: default_max_queue_length(),
        }
    }
}

fn default_max_queue_length() -> usize {
    100
}
