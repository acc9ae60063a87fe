// ABOUTME: The per-connection reader loop: receives PDUs, routes them through the legality table
// ABOUTME: Owns the transition into Closed on unrecoverable I/O or framing failure

use crate::codec::Pdu;
use crate::connection::{FrameReader, ReadError};
use crate::datatypes::{
    BindResponse, BindType, CancelSmResponse, CommandId, CommandStatus, DataSmResponse,
    DeliverSmResponse, EnquireLinkResponse, GenericNack, QuerySmResponse, ReplaceSmResponse,
    SubmitSmResponse, UnbindResponse,
};
use crate::session::bind::BindRequest;
use crate::session::pending::WaitMode;
use crate::session::state::{inbound_action, InboundAction, SessionRole, SessionState};
use crate::session::{HandlerKind, SessionCore};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};

#[derive(PartialEq)]
enum Flow {
    Continue,
    Stop,
}

/// Drive one connection's read side until the session closes.
///
/// The loop terminates exactly once: by its own exit condition (peer close,
/// I/O failure, framing violation, terminal-state PDU) or by an external
/// `close()` tripping the shutdown notification. Either way it leaves the
/// session in `Closed`.
pub(crate) async fn run_reader(core: Arc<SessionCore>, mut reader: FrameReader) {
    loop {
        let result = tokio::select! {
            _ = core.shutdown.notified() => break,
            result = timeout(core.config.session_timer, reader.read_pdu()) => result,
        };

        match result {
            // Read timeout is a liveness check, not an error: probe the
            // peer and keep reading. The probe waits on a separate task so
            // this loop stays free to receive its response; a failed probe
            // propagates as a connection-level error.
            Err(_elapsed) => {
                if core.state.current().is_bound() {
                    let probe = core.clone();
                    tokio::spawn(async move {
                        if let Err(e) = probe.ping(WaitMode::Strict).await {
                            warn!(error = %e, "liveness probe after read timeout failed");
                            probe.close().await;
                        }
                    });
                }
            }

            Ok(Ok(Some(pdu))) => {
                core.touch();
                trace!(kind = ?pdu.command_id(), sequence = pdu.sequence_number(), "PDU received");
                if dispatch(&core, pdu).await == Flow::Stop {
                    break;
                }
            }

            Ok(Ok(None)) => {
                debug!("connection closed by peer");
                break;
            }

            // Byte boundaries are lost; nack best-effort and tear down
            Ok(Err(ReadError::Framing(e))) => {
                error!(error = %e, "framing violation, closing session");
                let nack = Pdu::GenericNack(GenericNack::error(
                    0,
                    CommandStatus::InvalidCommandLength,
                ));
                let _ = core.send(&nack).await;
                break;
            }

            // The frame was well-delimited, so the stream is still
            // synchronized: downgrade to a negative response and keep going
            Ok(Err(ReadError::Malformed {
                command_id,
                sequence_number,
                source,
            })) => {
                warn!(
                    command_id = format_args!("{command_id:#010x}"),
                    sequence = sequence_number,
                    error = %source,
                    "malformed PDU"
                );
                let id = CommandId::from(command_id);
                let status = source.to_command_status();
                if id.is_response() {
                    core.pending.done_with_invalid_response(
                        sequence_number,
                        format!("malformed response: {source}"),
                    );
                } else if core.send(&negative_response(id, sequence_number, status)).await.is_err() {
                    break;
                }
            }

            Ok(Err(ReadError::Io(e))) => {
                error!(error = %e, "read failed, closing session");
                break;
            }
        }
    }

    core.close().await;
}

/// Route one received PDU through the legality table to its handler.
async fn dispatch(core: &Arc<SessionCore>, pdu: Pdu) -> Flow {
    let id = pdu.command_id();
    let sequence = pdu.sequence_number();

    match inbound_action(core.state.current(), core.identity.role, id) {
        InboundAction::Handle => handle(core, pdu).await,

        InboundAction::Reject(status) => {
            warn!(
                kind = ?id,
                sequence,
                state = ?core.state.current(),
                ?status,
                "command not legal in current state"
            );
            match core.send(&negative_response(id, sequence, status)).await {
                Ok(()) => Flow::Continue,
                Err(e) => {
                    error!(error = %e, "failed to send negative response");
                    Flow::Stop
                }
            }
        }

        InboundAction::Fatal => {
            warn!(
                kind = ?id,
                sequence,
                state = ?core.state.current(),
                "PDU received in terminal state, closing"
            );
            Flow::Stop
        }
    }
}

/// Process a PDU the legality table cleared for the current state.
async fn handle(core: &Arc<SessionCore>, pdu: Pdu) -> Flow {
    let sequence = pdu.sequence_number();

    let reply = match pdu {
        Pdu::EnquireLink(_) => Some(Pdu::EnquireLinkResp(EnquireLinkResponse::new(sequence))),

        // The transition to Unbound happens before the response is sent:
        // transition and response are independent failure domains, and the
        // unbind must take effect even if the send fails.
        Pdu::Unbind(_) => {
            info!("unbind requested by peer");
            core.state.transition(SessionState::Unbound);
            Some(Pdu::UnbindResp(UnbindResponse::new(sequence)))
        }

        Pdu::Bind(bind) => {
            let gate = match core.bind_gate {
                Some(ref gate) => gate,
                None => {
                    // Role table admits binds only on servers, which always
                    // carry a gate; treat a missing one as a refusal
                    warn!("no bind acceptor registered");
                    return reply_or_stop(
                        core,
                        Pdu::BindResp(BindResponse::error(
                            bind.bind_type,
                            sequence,
                            CommandStatus::BindFailed,
                        )),
                    )
                    .await;
                }
            };

            let request = BindRequest {
                core: core.clone(),
                bind,
            };
            // Capacity-1 channel: a bind arriving while another is still
            // undecided is refused rather than queued
            if let Err(send_error) = gate.try_send(request) {
                let request = match send_error {
                    tokio::sync::mpsc::error::TrySendError::Full(r) => r,
                    tokio::sync::mpsc::error::TrySendError::Closed(r) => r,
                };
                warn!(system_id = %request.bind.system_id, "bind refused, acceptor unavailable");
                return reply_or_stop(
                    core,
                    Pdu::BindResp(BindResponse::error(
                        request.bind.bind_type,
                        sequence,
                        CommandStatus::BindFailed,
                    )),
                )
                .await;
            }
            None
        }

        // Reached only if the peer sends outbind after the inline
        // outbound-accept phase; drive the state forward, there is no
        // response to send
        Pdu::Outbind(outbind) => {
            info!(system_id = %outbind.system_id, "outbind received");
            core.state.transition(SessionState::Open);
            None
        }

        Pdu::DeliverSm(deliver) => match core.handler {
            HandlerKind::Esme(ref handler) => match handler.on_deliver_sm(*deliver).await {
                Ok(()) => Some(Pdu::DeliverSmResp(DeliverSmResponse::new(sequence))),
                Err(e) => Some(Pdu::DeliverSmResp(DeliverSmResponse::error(
                    sequence, e.status,
                ))),
            },
            // Unreachable per the legality table; answer as if illegal
            HandlerKind::Smsc(_) => Some(Pdu::DeliverSmResp(DeliverSmResponse::error(
                sequence,
                CommandStatus::IncorrectBindStatus,
            ))),
        },

        Pdu::DataSm(data) => {
            let result = match core.handler {
                HandlerKind::Esme(ref handler) => handler.on_data_sm(*data).await,
                HandlerKind::Smsc(ref handler) => handler.on_data_sm(*data).await,
            };
            Some(Pdu::DataSmResp(match result {
                Ok(message_id) => DataSmResponse::new(sequence, message_id),
                Err(e) => DataSmResponse::error(sequence, e.status),
            }))
        }

        Pdu::AlertNotification(alert) => {
            if let HandlerKind::Esme(ref handler) = core.handler {
                handler.on_alert_notification(alert).await;
            }
            None
        }

        Pdu::SubmitSm(submit) => match core.handler {
            HandlerKind::Smsc(ref handler) => match handler.on_submit_sm(*submit).await {
                Ok(message_id) => Some(Pdu::SubmitSmResp(SubmitSmResponse::new(
                    sequence, message_id,
                ))),
                Err(e) => Some(Pdu::SubmitSmResp(SubmitSmResponse::error(
                    sequence, e.status,
                ))),
            },
            HandlerKind::Esme(_) => Some(Pdu::SubmitSmResp(SubmitSmResponse::error(
                sequence,
                CommandStatus::IncorrectBindStatus,
            ))),
        },

        Pdu::QuerySm(query) => match core.handler {
            HandlerKind::Smsc(ref handler) => match handler.on_query_sm(query).await {
                Ok(status) => match QuerySmResponse::new(
                    sequence,
                    status.message_id,
                    status.final_date,
                    status.message_state,
                    status.error_code,
                ) {
                    Ok(resp) => Some(Pdu::QuerySmResp(resp)),
                    Err(e) => {
                        warn!(error = %e, "query result failed field validation");
                        Some(Pdu::QuerySmResp(QuerySmResponse::error(
                            sequence,
                            CommandStatus::SystemError,
                        )))
                    }
                },
                Err(e) => Some(Pdu::QuerySmResp(QuerySmResponse::error(sequence, e.status))),
            },
            HandlerKind::Esme(_) => Some(Pdu::QuerySmResp(QuerySmResponse::error(
                sequence,
                CommandStatus::IncorrectBindStatus,
            ))),
        },

        Pdu::CancelSm(cancel) => match core.handler {
            HandlerKind::Smsc(ref handler) => Some(Pdu::CancelSmResp(
                match handler.on_cancel_sm(cancel).await {
                    Ok(()) => CancelSmResponse::new(sequence),
                    Err(e) => CancelSmResponse::error(sequence, e.status),
                },
            )),
            HandlerKind::Esme(_) => Some(Pdu::CancelSmResp(CancelSmResponse::error(
                sequence,
                CommandStatus::IncorrectBindStatus,
            ))),
        },

        Pdu::ReplaceSm(replace) => match core.handler {
            HandlerKind::Smsc(ref handler) => Some(Pdu::ReplaceSmResp(
                match handler.on_replace_sm(replace).await {
                    Ok(()) => ReplaceSmResponse::new(sequence),
                    Err(e) => ReplaceSmResponse::error(sequence, e.status),
                },
            )),
            HandlerKind::Esme(_) => Some(Pdu::ReplaceSmResp(ReplaceSmResponse::error(
                sequence,
                CommandStatus::IncorrectBindStatus,
            ))),
        },

        // A generic_nack naming one of our sequence numbers resolves that
        // request with an error; otherwise it is logged and dropped
        Pdu::GenericNack(nack) => {
            if !core.pending.done_with_invalid_response(
                sequence,
                format!("peer sent generic_nack with status {:?}", nack.command_status),
            ) {
                warn!(sequence, status = ?nack.command_status, "unmatched generic_nack");
            }
            None
        }

        // A matched successful bind response moves the client to its bound
        // state here, in the reader task, so a request the peer sends right
        // behind it is dispatched against the bound state
        Pdu::BindResp(resp) => {
            if resp.command_status.is_ok()
                && core.identity.role == SessionRole::Esme
                && core.state.current() == SessionState::Open
                && core.pending.expected_kind(sequence).is_some()
            {
                core.state
                    .transition(SessionState::bound_for(resp.bind_type));
            }
            core.resolve_response(Pdu::BindResp(resp)).await;
            None
        }

        // Remaining kinds are responses; the correlation layer owns them
        response => {
            core.resolve_response(response).await;
            None
        }
    };

    match reply {
        Some(reply) => reply_or_stop(core, reply).await,
        None => Flow::Continue,
    }
}

async fn reply_or_stop(core: &SessionCore, reply: Pdu) -> Flow {
    match core.send(&reply).await {
        Ok(()) => Flow::Continue,
        Err(e) => {
            error!(error = %e, kind = ?reply.command_id(), "failed to send reply");
            Flow::Stop
        }
    }
}

/// The negative answer for a request that cannot be processed: the matching
/// response kind when the protocol defines one, generic_nack otherwise.
fn negative_response(id: CommandId, sequence: u32, status: CommandStatus) -> Pdu {
    match id {
        CommandId::BindTransmitter | CommandId::BindReceiver | CommandId::BindTransceiver => {
            // from_request_id cannot fail for these three arms
            let bind_type = BindType::from_request_id(id).unwrap_or(BindType::Transceiver);
            Pdu::BindResp(BindResponse::error(bind_type, sequence, status))
        }
        CommandId::SubmitSm => Pdu::SubmitSmResp(SubmitSmResponse::error(sequence, status)),
        CommandId::DeliverSm => Pdu::DeliverSmResp(DeliverSmResponse::error(sequence, status)),
        CommandId::DataSm => Pdu::DataSmResp(DataSmResponse::error(sequence, status)),
        CommandId::QuerySm => Pdu::QuerySmResp(QuerySmResponse::error(sequence, status)),
        CommandId::CancelSm => Pdu::CancelSmResp(CancelSmResponse::error(sequence, status)),
        CommandId::ReplaceSm => Pdu::ReplaceSmResp(ReplaceSmResponse::error(sequence, status)),
        CommandId::EnquireLink => {
            Pdu::EnquireLinkResp(EnquireLinkResponse::error(sequence, status))
        }
        CommandId::Unbind => Pdu::UnbindResp(UnbindResponse::error(sequence, status)),
        _ => Pdu::GenericNack(GenericNack::error(sequence, status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_response_matches_request_kind() {
        let pdu = negative_response(CommandId::SubmitSm, 7, CommandStatus::IncorrectBindStatus);
        assert_eq!(pdu.command_id(), CommandId::SubmitSmResp);
        assert_eq!(pdu.sequence_number(), 7);
        assert_eq!(pdu.command_status(), CommandStatus::IncorrectBindStatus);

        let pdu = negative_response(CommandId::BindReceiver, 3, CommandStatus::AlreadyBound);
        assert_eq!(pdu.command_id(), CommandId::BindReceiverResp);
    }

    #[test]
    fn unknown_requests_get_generic_nack() {
        let pdu = negative_response(
            CommandId::Other(0x21),
            9,
            CommandStatus::InvalidCommandId,
        );
        assert_eq!(pdu.command_id(), CommandId::GenericNack);
        assert_eq!(pdu.command_status(), CommandStatus::InvalidCommandId);
    }

    #[test]
    fn commands_without_own_response_get_generic_nack() {
        let pdu = negative_response(
            CommandId::Outbind,
            5,
            CommandStatus::IncorrectBindStatus,
        );
        assert_eq!(pdu.command_id(), CommandId::GenericNack);

        let pdu = negative_response(
            CommandId::AlertNotification,
            6,
            CommandStatus::IncorrectBindStatus,
        );
        assert_eq!(pdu.command_id(), CommandId::GenericNack);
    }
}
