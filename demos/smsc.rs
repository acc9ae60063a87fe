// ABOUTME: Example SMSC that accepts connections, grants binds and logs submitted messages
// ABOUTME: Demonstrates SmscSessionBuilder, SmscHandler and the bind accept flow

//! # Minimal SMSC example
//!
//! Listens for ESME connections, accepts any bind, and logs every submitted
//! message with an assigned id. Runs until interrupted.
//!
//! ```bash
//! cargo run --example smsc -- --port 2775
//! ```

use argh::FromArgs;
use async_trait::async_trait;
use smpp_session::datatypes::SubmitSm;
use smpp_session::{
    ProcessRequestError, SessionIdentity, SessionState, SessionStateListener, SmscHandler,
    SmscSessionBuilder,
};
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Run a minimal SMSC
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the address to listen on (default: 0.0.0.0)
    #[argh(option)]
    listen: Option<String>,

    /// the port to listen on (default: 2775)
    #[argh(option, short = 'p')]
    port: Option<u16>,

    /// the system id to answer binds with (default: RUSTSMSC)
    #[argh(option)]
    system_id: Option<String>,
}

struct LoggingSmsc {
    next_id: AtomicU64,
}

#[async_trait]
impl SmscHandler for LoggingSmsc {
    async fn on_submit_sm(&self, submit: SubmitSm) -> Result<String, ProcessRequestError> {
        let id = format!("{:08x}", self.next_id.fetch_add(1, Ordering::Relaxed));
        info!(
            "submit_sm from {} to {}: {} octets, assigned id {id}",
            submit.source_addr,
            submit.destination_addr,
            submit.short_message.len()
        );
        Ok(id)
    }
}

struct LogStates;

impl SessionStateListener for LogStates {
    fn on_state_change(&self, new: SessionState, old: SessionState, session: &SessionIdentity) {
        info!("session {} moved {old:?} -> {new:?}", session.peer);
    }
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

    let listen = cli_args.listen.unwrap_or_else(|| "0.0.0.0".to_owned());
    let port = cli_args.port.unwrap_or(2775);
    let system_id = cli_args.system_id.unwrap_or_else(|| "RUSTSMSC".to_owned());

    let listener = TcpListener::bind(format!("{listen}:{port}")).await?;
    info!("Listening on {listen}:{port}");

    let handler = Arc::new(LoggingSmsc {
        next_id: AtomicU64::new(1),
    });

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                return Ok(());
            }
        };
        info!("Connection from {peer}");

        let builder = SmscSessionBuilder::new(handler.clone()).with_state_listener(Arc::new(LogStates));
        let system_id = system_id.clone();
        tokio::spawn(async move {
            let mut session = match builder.accept(stream) {
                Ok(session) => session,
                Err(e) => {
                    warn!("Failed to start session for {peer}: {e}");
                    return;
                }
            };

            let request = match session.wait_for_bind().await {
                Ok(request) => request,
                Err(e) => {
                    warn!("No bind from {peer}: {e}");
                    return;
                }
            };
            info!(
                "bind from system_id '{}' as {:?}",
                request.bind().system_id,
                request.bind().bind_type
            );
            if let Err(e) = request.accept(&system_id).await {
                warn!("Failed to accept bind from {peer}: {e}");
                return;
            }

            // Keep the session alive until it reaches a terminal state
            while !session.state().is_terminal() {
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
            info!("Session with {peer} ended");
        });
    }
}
