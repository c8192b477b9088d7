//! Route handlers for `/` and `/hubs`
//!
//! `run_hubs_flow` executes the actions produced by `flow::handle_event`:
//! the hubs fetch, the delete of the used token, and the refresh sub-flow.
//! Store and refresh failures are logged and recorded; they never change the
//! reply chosen by the state machine.

use std::sync::Arc;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use forge_auth::{SecretSource, TokenIssuer};
use token_store::TokenStore;
use tracing::{error, info, instrument, warn};

use crate::authorizer::AuthorizerContext;
use crate::config::StatusCodeMode;
use crate::flow::{FlowAction, FlowEvent, FlowState, HubsReply, handle_event};
use crate::hubs::HubFetcher;
use crate::{metrics, refresh};

/// Static landing page served on `GET /`
pub const WELCOME_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>forge-get-hubs</title>
  </head>
  <body>
    <h1>Welcome to the forge-get-hubs main page</h1>
    <p>
      To access the hubs browse to <b>/hubs</b> resource path.
      You will need to specify an Authorization header and use GET verb.
    </p>
  </body>
</html>
"#;

/// Everything the `/hubs` flow talks to
#[derive(Clone)]
pub struct HubsState {
    pub fetcher: HubFetcher,
    pub secrets: Arc<dyn SecretSource>,
    pub issuer: Arc<dyn TokenIssuer>,
    pub store: Arc<dyn TokenStore>,
    pub status_codes: StatusCodeMode,
}

pub async fn root_handler() -> Html<&'static str> {
    Html(WELCOME_PAGE)
}

/// Drive one `/hubs` request to its reply.
#[instrument(skip_all, fields(request_id = %request_id))]
pub async fn run_hubs_flow(
    state: &HubsState,
    context: AuthorizerContext,
    request_id: &str,
) -> HubsReply {
    let (mut flow, mut action) = handle_event(FlowState::Start, FlowEvent::Received(context));

    loop {
        let event = match action {
            FlowAction::Reply(reply) => {
                info!(outcome = reply.outcome(), "hubs request finished");
                return reply;
            }
            FlowAction::FetchHubs { auth_token } => {
                FlowEvent::Fetched(state.fetcher.fetch(&auth_token).await)
            }
            FlowAction::ConsumeToken { key } => {
                match state.store.delete(key).await {
                    Ok(()) => info!(store = state.store.id(), "deleted used access token"),
                    Err(e) => {
                        warn!(error = %e, store = state.store.id(), "failed to delete used access token");
                        metrics::record_store_error("delete");
                    }
                }
                FlowEvent::TokenConsumed
            }
            FlowAction::RefreshToken => {
                let result = refresh::refresh_token(
                    state.secrets.as_ref(),
                    state.issuer.as_ref(),
                    state.store.as_ref(),
                )
                .await;
                let stored = match result {
                    Ok(_) => {
                        metrics::record_token_refresh("stored");
                        true
                    }
                    Err(e) => {
                        error!(error = %e, stage = e.stage(), "token refresh failed");
                        metrics::record_token_refresh(e.stage());
                        if matches!(e, crate::error::RefreshError::Store(_)) {
                            metrics::record_store_error("save");
                        }
                        false
                    }
                };
                FlowEvent::Refreshed { stored }
            }
        };

        (flow, action) = handle_event(flow, event);
    }
}

/// HTTP status for a reply under the configured mode
pub fn reply_status(reply: &HubsReply, mode: StatusCodeMode) -> StatusCode {
    match (mode, reply) {
        (StatusCodeMode::Legacy, _) => StatusCode::OK,
        (StatusCodeMode::Explicit, HubsReply::Hubs(_)) => StatusCode::OK,
        (StatusCodeMode::Explicit, HubsReply::MissingToken | HubsReply::Unauthorized) => {
            StatusCode::UNAUTHORIZED
        }
        (StatusCodeMode::Explicit, HubsReply::Failed) => StatusCode::BAD_GATEWAY,
    }
}

/// Render a reply as a JSON response.
pub fn reply_response(reply: HubsReply, mode: StatusCodeMode) -> Response {
    let status = reply_status(&reply, mode);
    (status, Json(reply.into_body())).into_response()
}
