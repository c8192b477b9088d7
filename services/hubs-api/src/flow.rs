//! `/hubs` request state machine
//!
//! Pure state machine: receives events, returns (new_state, action).
//! The route handler executes the I/O implied by each action and feeds the
//! result back as the next event until a `Reply` action is produced.
//!
//! ```text
//! Start ──no token──────────────────────────────────────────▶ Done (MissingToken)
//!   │
//!   ▼
//! Fetching ──network failure────────────────────────────────▶ Done (Failed)
//!   │ response
//!   ▼
//! Consuming (delete used token)
//!   ├── hubs ───────────────────────────────────────────────▶ Done (Hubs)
//!   ├── other failure ──────────────────────────────────────▶ Done (Failed)
//!   └── 401 ──▶ Refreshing ──refreshed (ok or not)──────────▶ Done (Unauthorized)
//! ```

use serde_json::Value;
use token_store::TokenKey;

use crate::authorizer::AuthorizerContext;
use crate::hubs::HubsFetch;

pub const MISSING_TOKEN_MESSAGE: &str = "Failed to find bearer token value!";
pub const UNAUTHORIZED_MESSAGE: &str = "401 - Unauthorized";
pub const FAILED_MESSAGE: &str = "Failed to get hubs!";

/// Terminal result of a `/hubs` request
#[derive(Debug, Clone, PartialEq)]
pub enum HubsReply {
    Hubs(Value),
    MissingToken,
    Unauthorized,
    Failed,
}

impl HubsReply {
    /// Metric/log label
    pub fn outcome(&self) -> &'static str {
        match self {
            HubsReply::Hubs(_) => "hubs",
            HubsReply::MissingToken => "missing_token",
            HubsReply::Unauthorized => "unauthorized",
            HubsReply::Failed => "failed",
        }
    }

    /// JSON body sent to the caller
    pub fn into_body(self) -> Value {
        match self {
            HubsReply::Hubs(hubs) => hubs,
            HubsReply::MissingToken => Value::from(MISSING_TOKEN_MESSAGE),
            HubsReply::Unauthorized => Value::from(UNAUTHORIZED_MESSAGE),
            HubsReply::Failed => Value::from(FAILED_MESSAGE),
        }
    }
}

#[derive(Debug)]
pub enum FlowState {
    /// Authorizer context not yet inspected
    Start,
    /// Waiting on the hubs API
    Fetching {
        auth_token: String,
        expires_at: String,
    },
    /// Waiting on the delete of the token just used
    Consuming { outcome: HubsFetch },
    /// Waiting on secrets → issue → save
    Refreshing,
    /// Terminal
    Done,
}

#[derive(Debug)]
pub enum FlowEvent {
    /// Request arrived with this authorizer context
    Received(AuthorizerContext),
    /// Hubs API call finished
    Fetched(HubsFetch),
    /// Delete of the used token finished (success or logged failure)
    TokenConsumed,
    /// Refresh sub-flow finished; `stored` is true when the new token was saved
    Refreshed { stored: bool },
}

/// Work the caller performs after a transition
#[derive(Debug, PartialEq)]
pub enum FlowAction {
    FetchHubs { auth_token: String },
    ConsumeToken { key: TokenKey },
    RefreshToken,
    Reply(HubsReply),
}

/// Handle a state transition. Pure function: no I/O.
pub fn handle_event(state: FlowState, event: FlowEvent) -> (FlowState, FlowAction) {
    match (state, event) {
        // --- Start ---
        (FlowState::Start, FlowEvent::Received(context)) => match context.auth_token {
            Some(auth_token) if !auth_token.is_empty() => (
                FlowState::Fetching {
                    auth_token: auth_token.clone(),
                    expires_at: context.expires_at,
                },
                FlowAction::FetchHubs { auth_token },
            ),
            _ => (
                FlowState::Done,
                FlowAction::Reply(HubsReply::MissingToken),
            ),
        },

        // --- Fetching ---
        (
            FlowState::Fetching {
                auth_token,
                expires_at,
            },
            FlowEvent::Fetched(outcome),
        ) if outcome.reached_upstream() => (
            FlowState::Consuming { outcome },
            FlowAction::ConsumeToken {
                key: TokenKey::new(&auth_token, &expires_at),
            },
        ),

        (FlowState::Fetching { .. }, FlowEvent::Fetched(_)) => {
            (FlowState::Done, FlowAction::Reply(HubsReply::Failed))
        }

        // --- Consuming ---
        (FlowState::Consuming { outcome }, FlowEvent::TokenConsumed) => match outcome {
            HubsFetch::Hubs(hubs) => (FlowState::Done, FlowAction::Reply(HubsReply::Hubs(hubs))),
            HubsFetch::Unauthorized => (FlowState::Refreshing, FlowAction::RefreshToken),
            HubsFetch::Failed(_) => (FlowState::Done, FlowAction::Reply(HubsReply::Failed)),
        },

        // --- Refreshing ---
        // The caller learns about the new token on its next request, through
        // the authorizer; this one always reports unauthorized.
        (FlowState::Refreshing, FlowEvent::Refreshed { .. }) => (
            FlowState::Done,
            FlowAction::Reply(HubsReply::Unauthorized),
        ),

        // --- Invalid transition: finish with the generic failure ---
        (_, _) => (FlowState::Done, FlowAction::Reply(HubsReply::Failed)),
    }
}
