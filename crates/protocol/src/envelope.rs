use serde::{Deserialize, Serialize};

/// Outbound notification addressed to one subscriber.
///
/// The `payload` field uses `serde_json::value::RawValue` so the emitter can
/// forward it without re-parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub to: String,
    pub event: String,
    pub payload: Box<serde_json::value::RawValue>,
}

impl Notification {
    /// Creates a notification with the given event name and payload.
    pub fn new<T: Serialize>(
        to: impl Into<String>,
        event: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(payload)?;
        Ok(Self {
            to: to.into(),
            event: event.into(),
            payload: serde_json::value::RawValue::from_string(json)?,
        })
    }

    /// Deserializes the payload into the given type.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(self.payload.get())
    }
}
