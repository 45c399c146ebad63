use serde::{Deserialize, Serialize};

/// One telemetry reading exactly as the source store returned it.
///
/// `time` and `location` stay in their stored text form; they are interpreted
/// by the aggregators, which reject the whole batch when they cannot be.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub device_id: String,
    pub time: String,
    pub temperature: Option<f64>,
    /// JSON text: a one-element list of `{"latitude": .., "longitude": ..}`.
    pub location: String,
}

impl Sample {
    pub fn new(
        device_id: impl Into<String>,
        time: impl Into<String>,
        temperature: Option<f64>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            time: time.into(),
            temperature,
            location: location.into(),
        }
    }
}
