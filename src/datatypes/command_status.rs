use num_enum::{FromPrimitive, IntoPrimitive};

/// SMPP v3.4 command_status values (specification Section 5.1.3).
///
/// Relevant only in responses; requests carry `Ok` (zero). Values outside the
/// specification's table — reserved ranges and SMSC vendor codes — decode to
/// [`CommandStatus::Other`] so a response carrying one still correlates and
/// surfaces to the caller instead of failing the frame.
#[derive(FromPrimitive, IntoPrimitive)]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CommandStatus {
    /// No error
    Ok = 0x00000000,

    /// Message length is invalid
    InvalidMsgLength = 0x00000001,

    /// Command length is invalid
    InvalidCommandLength = 0x00000002,

    /// Invalid command id
    InvalidCommandId = 0x00000003,

    /// Incorrect BIND status for given command
    IncorrectBindStatus = 0x00000004,

    /// ESME already in bound state
    AlreadyBound = 0x00000005,

    /// Invalid priority flag
    InvalidPriorityFlag = 0x00000006,

    /// Invalid registered delivery flag
    InvalidRegisteredDeliveryFlag = 0x00000007,

    /// System error
    SystemError = 0x00000008,

    // Reserved 0x00000009
    /// Invalid source address
    InvalidSourceAddress = 0x0000000A,

    /// Invalid destination address
    InvalidDestinationAddress = 0x0000000B,

    /// Message id is invalid
    InvalidMessageId = 0x0000000C,

    /// Bind failed
    BindFailed = 0x0000000D,

    /// Invalid password
    InvalidPassword = 0x0000000E,

    /// Invalid system id
    InvalidSystemId = 0x0000000F,

    // Reserved 0x00000010
    /// cancel_sm failed
    CancelSmFailed = 0x00000011,

    // Reserved 0x00000012
    /// replace_sm failed
    ReplaceSmFailed = 0x00000013,

    /// Message queue full
    MessageQueueFull = 0x00000014,

    /// Invalid service type
    InvalidServiceType = 0x00000015,

    // Reserved 0x00000016 - 0x00000032
    /// Invalid number of destinations
    InvalidNumberOfDestinations = 0x00000033,

    /// Invalid distribution list name
    InvalidDistributionListName = 0x00000034,

    // Reserved 0x00000035 - 0x0000003F
    /// Invalid destination flag (submit_multi)
    InvalidDestinationFlag = 0x00000040,

    // Reserved 0x00000041
    /// Invalid submit-with-replace request
    InvalidSubmitWithReplace = 0x00000042,

    /// Invalid esm_class field
    InvalidEsmClass = 0x00000043,

    /// Cannot submit to distribution list
    CannotSubmitToDistributionList = 0x00000044,

    /// submit_sm or submit_multi failed
    SubmitFailed = 0x00000045,

    // Reserved 0x00000046 - 0x00000047
    /// Invalid source address TON
    InvalidSourceTon = 0x00000048,

    /// Invalid source address NPI
    InvalidSourceNpi = 0x00000049,

    /// Invalid destination address TON
    InvalidDestinationTon = 0x00000050,

    /// Invalid destination address NPI
    InvalidDestinationNpi = 0x00000051,

    // Reserved 0x00000052
    /// Invalid system_type field
    InvalidSystemType = 0x00000053,

    /// Invalid replace_if_present flag
    InvalidReplaceIfPresentFlag = 0x00000054,

    /// Invalid number of messages
    InvalidNumberOfMessages = 0x00000055,

    // Reserved 0x00000056 - 0x00000057
    /// Throttling error: ESME has exceeded allowed message limits
    ThrottlingError = 0x00000058,

    // Reserved 0x00000059 - 0x00000060
    /// Invalid scheduled delivery time
    InvalidScheduledDeliveryTime = 0x00000061,

    /// Invalid message validity period (expiry time)
    InvalidExpiryTime = 0x00000062,

    /// Predefined message invalid or not found
    InvalidPredefinedMessageId = 0x00000063,

    /// ESME receiver temporary application error
    ReceiverTemporaryError = 0x00000064,

    /// ESME receiver permanent application error
    ReceiverPermanentError = 0x00000065,

    /// ESME receiver reject message error
    ReceiverRejectError = 0x00000066,

    /// query_sm request failed
    QueryFailed = 0x00000067,

    // Reserved 0x00000068 - 0x000000BF
    /// Error in the optional part of the PDU body
    InvalidOptionalPartStream = 0x000000C0,

    /// Optional parameter not allowed
    OptionalParameterNotAllowed = 0x000000C1,

    /// Invalid parameter length
    InvalidParameterLength = 0x000000C2,

    /// Expected optional parameter missing
    MissingOptionalParameter = 0x000000C3,

    /// Invalid optional parameter value
    InvalidOptionalParameterValue = 0x000000C4,

    // Reserved 0x000000C5 - 0x000000FD
    /// Delivery failure (used for data_sm_resp)
    DeliveryFailure = 0x000000FE,

    /// Unknown error
    UnknownError = 0x000000FF,

    // Reserved for SMPP extension 0x00000100 - 0x000003FF
    // Reserved for SMSC vendor 0x00000400 - 0x000004FF
    /// Unlisted value: reserved or SMSC vendor specific.
    #[num_enum(catch_all)]
    Other(u32),
}

impl CommandStatus {
    /// Whether this status reports success.
    pub fn is_ok(self) -> bool {
        self == CommandStatus::Ok
    }
}
