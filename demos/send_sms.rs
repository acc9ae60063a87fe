// ABOUTME: Example ESME that binds as a transmitter, submits one message and unbinds
// ABOUTME: Demonstrates the connect_and_bind / submit_sm / query_sm / unbind_and_close flow

//! # SMS sending example
//!
//! Binds to an SMSC as a transmitter, submits a single message, optionally
//! queries its state, and unbinds.
//!
//! ```bash
//! cargo run --example send_sms -- \
//!   --system-id test --password secret \
//!   --to 447700900000 --from 12345 \
//!   --message "Hello from smpp-session"
//! ```

use argh::FromArgs;
use smpp_session::datatypes::{NumericPlanIndicator, QuerySm, SubmitSm, TypeOfNumber};
use smpp_session::{BindCredentials, EsmeSession};
use std::error::Error;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Send a single SMS through an SMSC
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the system id
    #[argh(option)]
    system_id: String,

    /// the password
    #[argh(option)]
    password: String,

    /// the hostname or IP address of the SMSC (default: localhost)
    #[argh(option)]
    host: Option<String>,

    /// the port to use when connecting to the SMSC (default: 2775)
    #[argh(option, short = 'p')]
    port: Option<u16>,

    /// the recipient telephone number
    #[argh(option, short = 't')]
    to: String,

    /// the telephone number that the message will be from
    #[argh(option, short = 'f')]
    from: String,

    /// the message text
    #[argh(option, short = 'm')]
    message: String,

    /// query the message state after submitting
    #[argh(switch, short = 'q')]
    query: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let host = cli_args.host.unwrap_or_else(|| "localhost".to_owned());
    let port = cli_args.port.unwrap_or(2775);

    info!("Connecting to {host}:{port}");
    let credentials = BindCredentials::transmitter(cli_args.system_id, cli_args.password);
    let session = EsmeSession::builder(credentials)
        .connect_and_bind(format!("{host}:{port}"))
        .await?;
    info!("Bound to SMSC '{}'", session.peer_system_id());

    let submit = SubmitSm::builder()
        .source_addr(&cli_args.from)
        .destination_addr(&cli_args.to)
        .short_message(cli_args.message.clone())
        .build()?;
    let message_id = session.submit_sm(submit).await?;
    info!("Message submitted, id: {message_id}");

    if cli_args.query {
        let query = QuerySm::new(
            0,
            message_id,
            TypeOfNumber::Unknown,
            NumericPlanIndicator::Unknown,
            &cli_args.from,
        )?;
        let status = session.query_sm(query).await?;
        info!(
            "Message state: {:?}, final date: {:?}",
            status.message_state, status.final_date
        );
    }

    session.unbind_and_close().await?;
    info!("Unbound and disconnected");

    Ok(())
}
