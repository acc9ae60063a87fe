// ABOUTME: SMPP v3.4 session engine: typed PDUs, framing, and bound sessions for both roles
// ABOUTME: The session module carries the public API; codec and datatypes underpin it

//! An SMPP v3.4 session layer for ESME and SMSC endpoints.
//!
//! The crate is organized in three layers:
//!
//! - [`datatypes`]: typed PDU bodies and field types, each encoding and
//!   decoding itself per the v3.4 wire format.
//! - [`codec`] and [`connection`]: the 16-byte header, the [`codec::Pdu`]
//!   sum type, and length-delimited framing over TCP.
//! - [`session`]: the state machine and dispatch engine. An
//!   [`EsmeSession`] binds to an SMSC and submits messages; an
//!   [`SmscSession`] serves one accepted connection, delivering messages
//!   and answering the peer's requests through an [`SmscHandler`].
//!
//! Sessions run two background tasks per connection (a reader loop and a
//! keepalive loop) and correlate responses to requests by sequence number,
//! so any number of tasks can issue requests on one session concurrently.
//!
//! # Example
//!
//! ```rust,no_run
//! use smpp_session::{BindCredentials, EsmeSession};
//! use smpp_session::datatypes::SubmitSm;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = BindCredentials::transmitter("system_id", "password");
//!     let session = EsmeSession::builder(credentials)
//!         .connect_and_bind("localhost:2775")
//!         .await?;
//!
//!     let submit = SubmitSm::builder()
//!         .source_addr("12345")
//!         .destination_addr("67890")
//!         .short_message("Hello, World!")
//!         .build()?;
//!     let message_id = session.submit_sm(submit).await?;
//!     println!("submitted as {message_id}");
//!
//!     session.unbind_and_close().await?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod connection;
pub mod datatypes;
mod macros;
pub mod session;

pub use codec::{CodecError, Decodable, Encodable, Pdu, PduHeader};
pub use session::{
    BindCredentials, BindRequest, DeliveryHandler, EsmeSession, EsmeSessionBuilder, MessageStatus,
    NullDeliveryHandler, OutboundSession, ProcessRequestError, SequenceGenerator, SessionConfig,
    SessionIdentity, SessionRole, SessionState, SessionStateListener, SmppError, SmppResult,
    SmscHandler, SmscSession, SmscSessionBuilder,
};
