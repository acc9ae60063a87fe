use num_enum::{FromPrimitive, IntoPrimitive};

/// Bit in the command_id that marks a PDU as a response.
pub const RESPONSE_BIT: u32 = 0x8000_0000;

/// SMPP v3.4 command identifiers (specification Section 5.1.2.1).
///
/// Every wire value decodes: identifiers this library does not dispatch on
/// (reserved ranges, vendor extensions, v5.0 additions) land in
/// [`CommandId::Other`] and are answered with `generic_nack` by the session
/// layer rather than failing the decode.
#[derive(FromPrimitive, IntoPrimitive)]
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandId {
    GenericNack = 0x8000_0000,
    BindReceiver = 0x0000_0001,
    BindReceiverResp = 0x8000_0001,
    BindTransmitter = 0x0000_0002,
    BindTransmitterResp = 0x8000_0002,
    QuerySm = 0x0000_0003,
    QuerySmResp = 0x8000_0003,
    SubmitSm = 0x0000_0004,
    SubmitSmResp = 0x8000_0004,
    DeliverSm = 0x0000_0005,
    DeliverSmResp = 0x8000_0005,
    Unbind = 0x0000_0006,
    UnbindResp = 0x8000_0006,
    ReplaceSm = 0x0000_0007,
    ReplaceSmResp = 0x8000_0007,
    CancelSm = 0x0000_0008,
    CancelSmResp = 0x8000_0008,
    BindTransceiver = 0x0000_0009,
    BindTransceiverResp = 0x8000_0009,
    // Reserved 0x0000000A - 0x8000000A
    Outbind = 0x0000_000B,
    // Reserved 0x0000000C - 0x00000014
    EnquireLink = 0x0000_0015,
    EnquireLinkResp = 0x8000_0015,
    AlertNotification = 0x0000_0102,
    DataSm = 0x0000_0103,
    DataSmResp = 0x8000_0103,
    /// Anything not listed above: reserved ranges, submit_multi, the v5.0
    /// broadcast family, vendor extensions.
    #[num_enum(catch_all)]
    Other(u32),
}

impl CommandId {
    /// Whether the high bit marks this id as a response PDU.
    pub fn is_response(self) -> bool {
        u32::from(self) & RESPONSE_BIT != 0
    }

    /// The response command id paired with this request, if the protocol
    /// defines one (`outbind` and `alert_notification` have none).
    pub fn response_id(self) -> Option<CommandId> {
        if self.is_response() {
            return None;
        }
        match self {
            CommandId::Outbind | CommandId::AlertNotification => None,
            CommandId::Other(_) => None,
            id => Some(CommandId::from(u32::from(id) | RESPONSE_BIT)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_round_trip() {
        assert_eq!(u32::from(CommandId::SubmitSm), 0x0000_0004);
        assert_eq!(u32::from(CommandId::SubmitSmResp), 0x8000_0004);
        assert_eq!(CommandId::from(0x0000_0015), CommandId::EnquireLink);
        assert_eq!(CommandId::from(0x8000_0000), CommandId::GenericNack);
    }

    #[test]
    fn unlisted_ids_are_preserved() {
        // submit_multi is a defined v3.4 id this library does not dispatch on
        assert_eq!(CommandId::from(0x0000_0021), CommandId::Other(0x0000_0021));
        assert_eq!(u32::from(CommandId::Other(0x0000_0021)), 0x0000_0021);
        // reserved id
        assert_eq!(CommandId::from(0x0000_000A), CommandId::Other(0x0000_000A));
    }

    #[test]
    fn response_bit() {
        assert!(!CommandId::BindTransceiver.is_response());
        assert!(CommandId::BindTransceiverResp.is_response());
        assert!(CommandId::GenericNack.is_response());
        assert!(CommandId::Other(0x8000_0021).is_response());
        assert!(!CommandId::Other(0x0000_0021).is_response());
    }

    #[test]
    fn response_pairing() {
        assert_eq!(
            CommandId::SubmitSm.response_id(),
            Some(CommandId::SubmitSmResp)
        );
        assert_eq!(
            CommandId::BindReceiver.response_id(),
            Some(CommandId::BindReceiverResp)
        );
        assert_eq!(CommandId::Outbind.response_id(), None);
        assert_eq!(CommandId::AlertNotification.response_id(), None);
        assert_eq!(CommandId::SubmitSmResp.response_id(), None);
    }
}
