//! Configuration types for pull streams

use serde::{Deserialize, Serialize};

use crate::error::{StreamError, StreamResult};

/// Queue capacity used when a stream is not configured explicitly
pub const DEFAULT_HIGH_WATER_MARK: usize = 16;

/// Per-stream configuration, applied before the stream starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Maximum number of values buffered between producer and reader
    pub high_water_mark: usize,
    /// Name used in log lines for this stream
    pub label: Option<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            label: None,
        }
    }
}

impl StreamConfig {
    pub fn with_high_water_mark(mut self, high_water_mark: usize) -> Self {
        self.high_water_mark = high_water_mark;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> StreamResult<Self> {
        let config: StreamConfig =
            serde_json::from_str(json).map_err(|e| StreamError::Custom(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// A zero capacity would stall every producer forever
    pub fn validate(&self) -> StreamResult<()> {
        if self.high_water_mark == 0 {
            return Err(StreamError::Custom(
                "high_water_mark must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
