//! Queue and input limits configuration.

use serde::Deserialize;

/// Queue and input limits configuration.
///
/// These limits keep a single slow or absent client from exhausting server
/// memory.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum undelivered messages held for one offline name (default: 100).
    /// Further messages are rejected with an error to the sender. 0 disables
    /// offline delivery.
    #[serde(default = "default_max_pending_per_recipient")]
    pub max_pending_per_recipient: usize,
    /// Maximum distinct offline names with queued messages (default: 10000).
    /// A message for a name without a queue is rejected once this many exist.
    #[serde(default = "default_max_offline_recipients")]
    pub max_offline_recipients: usize,
    /// Per-connection outgoing queue capacity (default: 256).
    /// Forwards to a connection whose queue is full fail immediately.
    #[serde(default = "default_outgoing_queue_capacity")]
    pub outgoing_queue_capacity: usize,
    /// Maximum inbound line length in bytes, excluding the terminator (default: 4096).
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    /// Maximum length of a display or room name in characters (default: 32).
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_pending_per_recipient: default_max_pending_per_recipient(),
            max_offline_recipients: default_max_offline_recipients(),
            outgoing_queue_capacity: default_outgoing_queue_capacity(),
            max_line_length: default_max_line_length(),
            max_name_length: default_max_name_length(),
        }
    }
}

fn default_max_pending_per_recipient() -> usize {
    100
}

fn default_max_offline_recipients() -> usize {
    10_000
}

fn default_outgoing_queue_capacity() -> usize {
    256
}

fn default_max_line_length() -> usize {
    courier_proto::line::DEFAULT_MAX_LINE_LEN
}

fn default_max_name_length() -> usize {
    32
}
