//! WebSocket deployment sessions
//!
//! One socket is one session. The client submits `check_password` and
//! `deploy_server` requests; the engine answers with progress events on a
//! per-session channel that this handler serializes back onto the socket.
//!
//! The deployment gate lives here: `deploy_server` is refused until this
//! session's credential check resolved granted, regardless of what the
//! request body claims.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use tokio::sync::mpsc;
use tracing::{info, warn};

use hostforge_api::{ClientRequest, FieldError, WsEvent, validate};
use hostforge_core::{
    CredentialOutcome, CredentialState, SessionState, StartDeployment, VerifyCredentials,
};

use crate::state::AppState;

/// Upgrade to a deployment session
pub async fn handler(
    ws: WebSocketUpgrade,
    Path(client_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session(socket, client_id, state))
}

/// Drive one session until the client disconnects
async fn session(mut socket: WebSocket, client_id: String, state: Arc<AppState>) {
    info!(client = %client_id, "session opened");

    // Engine progress events arrive here; request replies are written to the
    // socket directly, so a saturated channel cannot wedge the loop.
    let (events, mut event_rx) = mpsc::channel::<WsEvent>(64);
    let mut session_state = SessionState::AwaitingCredentials;
    let mut credential_state = CredentialState::Idle;

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                if event.task == "finish" && session_state == SessionState::Deploying {
                    session_state = SessionState::Finished;
                }
                if forward(&mut socket, &client_id, &event).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_request(
                            &text,
                            &state,
                            &events,
                            &mut session_state,
                            &mut credential_state,
                            &client_id,
                        )
                        .await;
                        if let Some(reply) = reply {
                            if forward(&mut socket, &client_id, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(client = %client_id, error = %e, "socket error");
                        break;
                    }
                }
            }
        }
    }

    state.log.append(&client_id, "disconnected").await;
    info!(
        client = %client_id,
        state = %session_state,
        credentials = %credential_state,
        "session closed"
    );
}

/// Serialize one event onto the socket
async fn forward(socket: &mut WebSocket, client_id: &str, event: &WsEvent) -> Result<(), ()> {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!(client = %client_id, error = %e, "event serialization failed");
            return Ok(());
        }
    };
    socket.send(Message::Text(text.into())).await.map_err(|e| {
        warn!(client = %client_id, error = %e, "socket send failed");
    })
}

/// Handle one client request, returning the immediate reply event
async fn handle_request(
    text: &str,
    state: &AppState,
    events: &mpsc::Sender<WsEvent>,
    session_state: &mut SessionState,
    credential_state: &mut CredentialState,
    client_id: &str,
) -> Option<WsEvent> {
    let request: ClientRequest = match serde_json::from_str(text) {
        Ok(request) => request,
        Err(e) => return Some(WsEvent::alert(vec![FieldError::new("request", e.to_string())])),
    };

    match request {
        ClientRequest::CheckPassword { host_data } => {
            if let Err(errors) =
                validate::check_server_ip(&host_data, &state.config.engine.reserved_ips)
            {
                return Some(WsEvent::alert(errors));
            }
            let host = match validate::check_password_data(&host_data) {
                Ok(host) => host,
                Err(errors) => return Some(WsEvent::alert(errors)),
            };

            // Resubmission after a terminal outcome re-enters the attempt
            *credential_state = CredentialState::Verifying;
            match state.deployer.ask(VerifyCredentials { host }).await {
                Ok(CredentialOutcome::Granted { interfaces }) => {
                    *credential_state = CredentialState::Verified;
                    *session_state = SessionState::InventoryReady;
                    Some(WsEvent::check_password(true, interfaces))
                }
                Ok(CredentialOutcome::Denied) => {
                    *credential_state = CredentialState::Denied;
                    Some(WsEvent::check_password(false, Vec::new()))
                }
                Ok(CredentialOutcome::ConnectionError { error }) => {
                    *credential_state = CredentialState::ConnectionError;
                    Some(WsEvent::alert(vec![FieldError::connection(error)]))
                }
                Err(e) => {
                    *credential_state = CredentialState::ConnectionError;
                    warn!(client = %client_id, error = %e, "credential check failed");
                    Some(WsEvent::alert(vec![FieldError::connection(e.to_string())]))
                }
            }
        }
        ClientRequest::DeployServer(request) => {
            // The request body's own claim of verified credentials is ignored
            if !session_state.can_deploy() {
                return Some(deploy_refused(*session_state));
            }

            if let Err(errors) =
                validate::check_server_ip(&request.host_data, &state.config.engine.reserved_ips)
            {
                return Some(WsEvent::alert(errors));
            }
            let host = match validate::check_install_data(&request.host_data) {
                Ok(host) => host,
                Err(errors) => return Some(WsEvent::alert(errors)),
            };
            if request.dhcp.dhcp_status {
                if let Err(errors) = validate::check_dhcp_data(&request.dhcp) {
                    return Some(WsEvent::alert(errors));
                }
            }

            let dispatch = state
                .deployer
                .ask(StartDeployment {
                    host,
                    request,
                    events: events.clone(),
                })
                .await;

            match dispatch {
                Ok(()) => {
                    *session_state = SessionState::Deploying;
                    info!(client = %client_id, "deployment dispatched");
                    None
                }
                Err(e) => {
                    warn!(client = %client_id, error = %e, "deployment dispatch failed");
                    Some(WsEvent::alert(vec![FieldError::connection(e.to_string())]))
                }
            }
        }
    }
}

/// Alert for a `deploy_server` request arriving in a session state that
/// does not permit dispatching one
fn deploy_refused(state: SessionState) -> WsEvent {
    WsEvent::alert(vec![FieldError::new(
        "task",
        format!("deployment not permitted in state {state}"),
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostforge_api::StatusPayload;

    fn alert_message(event: &WsEvent) -> String {
        match &event.status {
            StatusPayload::Errors(errors) => errors[0].msg.clone(),
            StatusPayload::Text(text) => panic!("expected an alert, got {text}"),
        }
    }

    #[test]
    fn refusal_names_the_blocking_state() {
        let unverified = deploy_refused(SessionState::AwaitingCredentials);
        assert_eq!(
            alert_message(&unverified),
            "deployment not permitted in state awaiting_credentials"
        );

        let busy = deploy_refused(SessionState::Deploying);
        assert_eq!(
            alert_message(&busy),
            "deployment not permitted in state deploying"
        );
        assert!(!busy.result);
    }
}
