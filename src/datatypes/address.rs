// ABOUTME: This module defines addressing enums shared across PDU types
// ABOUTME: Covers type_of_number, numbering_plan_indicator, and interface_version fields

use num_enum::{FromPrimitive, IntoPrimitive};

/// Type of Number for source and destination addresses (SMPP v3.4 section 5.2.5)
#[derive(FromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeOfNumber {
    Unknown = 0b0000_0000,
    International = 0b0000_0001,
    National = 0b0000_0010,
    NetworkSpecific = 0b0000_0011,
    SubscriberNumber = 0b0000_0100,
    Alphanumeric = 0b0000_0101,
    Abbreviated = 0b0000_0110,

    /// Reserved values pass through unchanged
    #[num_enum(catch_all)]
    Other(u8),
}

impl Default for TypeOfNumber {
    fn default() -> Self {
        TypeOfNumber::Unknown
    }
}

/// Numbering Plan Indicator for source and destination addresses (section 5.2.6)
#[derive(FromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NumericPlanIndicator {
    Unknown = 0b0000_0000,
    Isdn = 0b0000_0001,
    Data = 0b0000_0011,
    Telex = 0b0000_0100,
    LandMobile = 0b0000_0110,
    National = 0b0000_1000,
    Private = 0b0000_1001,
    Ermes = 0b0000_1010,
    Internet = 0b0000_1110,
    WapClientId = 0b0001_0010,

    #[num_enum(catch_all)]
    Other(u8),
}

impl Default for NumericPlanIndicator {
    fn default() -> Self {
        NumericPlanIndicator::Unknown
    }
}

/// This parameter is used to indicate the version of the SMPP protocol.
///
/// Values below 0x34 identify pre-3.4 peers; anything else is carried
/// through so the application can decide how to treat it.
#[derive(FromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InterfaceVersion {
    SmppV33 = 0x33,
    SmppV34 = 0x34,

    #[num_enum(catch_all)]
    Other(u8),
}

impl Default for InterfaceVersion {
    fn default() -> Self {
        InterfaceVersion::SmppV34
    }
}
