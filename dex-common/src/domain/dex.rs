use serde::Deserialize;

/// The decentralized exchange program a [`Pool`](super::Pool) or
/// [`ChainEvent`](super::ChainEvent) originates from.
///
/// The numeric values are a stable wire/storage contract: they are persisted in the
/// `dex` column and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum Dex {
    Unknown = 0,
    RaydiumAmm = 1,
    RaydiumClmm = 2,
    MeteoraDlmm = 3,
    MeteoraAmm = 4,
    OrcaWhirlpool = 5,
    PumpFun = 6,
    PumpFunAmm = 7,
}

pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Dex, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Dex::from_i16(i16::deserialize(deserializer)?))
}

pub(crate) fn serialize<S>(dex: &Dex, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_i16(dex.as_i16())
}

impl Dex {
    /// Pools on these DEXes derive a non-zero `account_key` from their token/quote
    /// accounts; all others leave it at zero. See
    /// [`crate::codec`] hash helpers and the pool writer for where this is consumed.
    pub fn uses_account_key(self) -> bool {
        matches!(self, Dex::RaydiumClmm | Dex::MeteoraDlmm | Dex::OrcaWhirlpool)
    }

    pub fn from_i16(value: i16) -> Self {
        match value {
            1 => Dex::RaydiumAmm,
            2 => Dex::RaydiumClmm,
            3 => Dex::MeteoraDlmm,
            4 => Dex::MeteoraAmm,
            5 => Dex::OrcaWhirlpool,
            6 => Dex::PumpFun,
            7 => Dex::PumpFunAmm,
            _ => Dex::Unknown,
        }
    }

    pub fn as_i16(self) -> i16 {
        self as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_i16() {
        for dex in [
            Dex::Unknown,
            Dex::RaydiumAmm,
            Dex::RaydiumClmm,
            Dex::MeteoraDlmm,
            Dex::MeteoraAmm,
            Dex::OrcaWhirlpool,
            Dex::PumpFun,
            Dex::PumpFunAmm,
        ] {
            assert_eq!(Dex::from_i16(dex.as_i16()), dex);
        }
    }

    #[test]
    fn only_clmm_dlmm_whirlpool_use_account_key() {
        assert!(Dex::RaydiumClmm.uses_account_key());
        assert!(Dex::MeteoraDlmm.uses_account_key());
        assert!(Dex::OrcaWhirlpool.uses_account_key());
        assert!(!Dex::RaydiumAmm.uses_account_key());
        assert!(!Dex::PumpFun.uses_account_key());
    }
}
