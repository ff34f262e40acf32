use serde::Deserialize;

/// The kind of activity a [`ChainEvent`](super::ChainEvent) represents.
///
/// Numeric values are a stable storage contract (the `event_type` column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum EventType {
    Trade = 1,
    AddLiquidity = 2,
    RemoveLiquidity = 3,
    Mint = 4,
    Burn = 5,
    /// Synthetic tag applied to `TransferEvent` rows when they're projected into the
    /// `ChainEvent`-shaped response of `QueryTransferEvents` (query-side only; never
    /// stored, since `transfer_event` rows have no `event_type` column).
    Transfer = 6,
}

pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<EventType, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = i16::deserialize(deserializer)?;
    EventType::from_i16(value)
        .ok_or_else(|| serde::de::Error::custom(format!("unknown event_type discriminant {value}")))
}

pub(crate) fn serialize<S>(event_type: &EventType, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_i16(event_type.as_i16())
}

impl EventType {
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(EventType::Trade),
            2 => Some(EventType::AddLiquidity),
            3 => Some(EventType::RemoveLiquidity),
            4 => Some(EventType::Mint),
            5 => Some(EventType::Burn),
            6 => Some(EventType::Transfer),
            _ => None,
        }
    }

    pub fn as_i16(self) -> i16 {
        self as i16
    }
}
