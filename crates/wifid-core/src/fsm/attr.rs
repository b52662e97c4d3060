use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::model::EntityKind;

/// An attribute whose change must reach the driver on the next commit.
pub trait FsmAttribute: Copy + std::fmt::Debug {
    const KIND: EntityKind;

    /// Index of this attribute in the owning entity's bitset.
    fn bit(self) -> usize;
}

macro_rules! fsm_attribute {
    ($ty:ident, $kind:expr) => {
        impl FsmAttribute for $ty {
            const KIND: EntityKind = $kind;

            fn bit(self) -> usize {
                self as usize
            }
        }
    };
}

/// Radio attributes. Lower indices are cheaper to apply; with a
/// significance threshold configured, bits below it never start a commit
/// on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum RadioAttr {
    Statistics,
    BeaconInterval,
    DtimPeriod,
    RtsThreshold,
    TxPower,
    Antenna,
    Obss,
    ImplicitBeamforming,
    MultiUser,
    CountryCode,
    OperatingStandards,
    DfsSettings,
    BackgroundDfs,
    Bandwidth,
    Channel,
    Enable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ApAttr {
    Statistics,
    Neighbours,
    Mbo,
    MacFilter,
    Wps,
    MaxStations,
    ClientIsolation,
    SsidAdvertisement,
    SecretKey,
    SecurityMode,
    Ssid,
    MultiAp,
    Enable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum EndpointAttr {
    Statistics,
    Wps,
    MultiAp,
    Profile,
    Connect,
    Enable,
}

fsm_attribute!(RadioAttr, EntityKind::Radio);
fsm_attribute!(ApAttr, EntityKind::AccessPoint);
fsm_attribute!(EndpointAttr, EntityKind::Endpoint);

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::fsm::bits::FsmBitSet;

    #[test]
    fn every_attribute_fits_the_bitset() {
        assert!(RadioAttr::iter().all(|a| a.bit() < FsmBitSet::CAPACITY));
        assert!(ApAttr::iter().all(|a| a.bit() < FsmBitSet::CAPACITY));
        assert!(EndpointAttr::iter().all(|a| a.bit() < FsmBitSet::CAPACITY));
    }

    #[test]
    fn names_round_trip() {
        assert_eq!(RadioAttr::Channel.to_string(), "channel");
        assert_eq!("secret_key".parse::<ApAttr>().ok(), Some(ApAttr::SecretKey));
    }
}
