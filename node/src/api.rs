//! # Ticket REST API
//!
//! Builds the axum router that exposes issuance, transfer and lookups.
//! Handlers share [`AppState`] through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                      | Description                       |
//! |--------|---------------------------|-----------------------------------|
//! | GET    | `/health`                 | Liveness probe                    |
//! | POST   | `/tickets/issue`          | Issue a ticket for a payment      |
//! | POST   | `/tickets/:id/transfer`   | Transfer a ticket (`x-user-id`)   |
//! | GET    | `/tickets/:id`            | Ticket by id                      |
//! | GET    | `/owners/:owner_id/tickets` | Tickets held by an owner        |
//!
//! The caller of a transfer is identified by the `x-user-id` header, which
//! the gateway in front of the node sets after authenticating the user.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use lumentix_core::config::CALLER_ID_HEADER;
use lumentix_core::{
    ErrorKind, IssuanceVerifier, Ticket, TicketQueries, TicketingError, TransferAuthorizer,
};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared state for all handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    pub issuer: IssuanceVerifier,
    pub transfers: TransferAuthorizer,
    pub queries: TicketQueries,
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full [`Router`] with CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/tickets/issue", post(issue_handler))
        .route("/tickets/:id/transfer", post(transfer_handler))
        .route("/tickets/:id", get(ticket_handler))
        .route("/owners/:owner_id/tickets", get(owner_tickets_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct IssueRequest {
    pub payment_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IssueResponse {
    pub ticket: Ticket,
    /// `true` when this request minted the ticket.
    pub created: bool,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub new_owner_id: String,
}

/// Error body returned on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Adapter so handlers can `?` on core errors.
pub struct ApiError(TicketingError);

impl From<TicketingError> for ApiError {
    fn from(e: TicketingError) -> Self {
        ApiError(e)
    }
}

// Malformed bodies and path segments get the same JSON error body as
// rejections from the core.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(TicketingError::InvalidRequest(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError(TicketingError::InvalidRequest(rejection.body_text()))
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = ErrorResponse {
            error: kind.as_str().to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok", "version": state.version })),
    )
}

/// `POST /tickets/issue`
///
/// 201 when a ticket is minted, 200 when the payment already has one.
async fn issue_handler(
    State(state): State<AppState>,
    body: Result<Json<IssueRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let started = Instant::now();
    let result = state.issuer.issue(&req.payment_id).await;
    state
        .metrics
        .request_latency_seconds
        .with_label_values(&["issue"])
        .observe(started.elapsed().as_secs_f64());

    let issuance = match result {
        Ok(issuance) => issuance,
        Err(e) => {
            state
                .metrics
                .issuance_rejected_total
                .with_label_values(&[e.kind().as_str()])
                .inc();
            return Err(e.into());
        }
    };

    let created = issuance.is_new();
    let status = if created {
        state.metrics.tickets_issued_total.inc();
        StatusCode::CREATED
    } else {
        state.metrics.issuance_replays_total.inc();
        StatusCode::OK
    };

    Ok((
        status,
        Json(IssueResponse {
            ticket: issuance.into_ticket(),
            created,
        }),
    ))
}

/// `POST /tickets/:id/transfer`
async fn transfer_handler(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    headers: HeaderMap,
    body: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<Ticket>, ApiError> {
    let Path(ticket_id) = path?;
    let Json(req) = body?;
    let caller = headers
        .get(CALLER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            TicketingError::InvalidRequest(format!("missing {} header", CALLER_ID_HEADER))
        })?;

    let started = Instant::now();
    let result = state
        .transfers
        .transfer_ticket(ticket_id, caller, &req.new_owner_id)
        .await;
    state
        .metrics
        .request_latency_seconds
        .with_label_values(&["transfer"])
        .observe(started.elapsed().as_secs_f64());

    match result {
        Ok(ticket) => {
            state.metrics.transfers_total.inc();
            Ok(Json(ticket))
        }
        Err(e) => {
            state
                .metrics
                .transfers_rejected_total
                .with_label_values(&[e.kind().as_str()])
                .inc();
            Err(e.into())
        }
    }
}

/// `GET /tickets/:id`
async fn ticket_handler(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Ticket>, ApiError> {
    let Path(ticket_id) = path?;
    Ok(Json(state.queries.get_ticket(ticket_id).await?))
}

/// `GET /owners/:owner_id/tickets`
async fn owner_tickets_handler(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> Result<Json<Vec<Ticket>>, ApiError> {
    Ok(Json(state.queries.tickets_for_owner(&owner_id).await?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use lumentix_core::storage::memory::{InMemoryChain, InMemoryPayments, InMemoryTicketStore};
    use lumentix_core::{
        ChainTransaction, Memo, NewTicket, Payment, PaymentStatus, TicketStatus,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        payments: Arc<InMemoryPayments>,
        chain: Arc<InMemoryChain>,
        tickets: Arc<InMemoryTicketStore>,
        metrics: SharedMetrics,
    }

    /// Router over in-memory collaborators.
    fn test_app() -> TestApp {
        let payments = Arc::new(InMemoryPayments::new());
        let chain = Arc::new(InMemoryChain::new());
        let tickets = Arc::new(InMemoryTicketStore::new());
        let metrics = Arc::new(crate::metrics::TicketMetrics::new().unwrap());

        let state = AppState {
            version: "0.1.0-test".into(),
            issuer: IssuanceVerifier::new(payments.clone(), chain.clone(), tickets.clone()),
            transfers: TransferAuthorizer::new(tickets.clone()),
            queries: TicketQueries::new(tickets.clone()),
            metrics: metrics.clone(),
        };

        TestApp {
            router: create_router(state),
            payments,
            chain,
            tickets,
            metrics,
        }
    }

    fn seed_paid(app: &TestApp, payment_id: &str, tx_hash: &str, memo: &str) {
        app.payments.insert(Payment {
            id: payment_id.into(),
            status: PaymentStatus::Confirmed,
            transaction_hash: Some(tx_hash.into()),
            event_id: "e1".into(),
            user_id: "u1".into(),
            currency: "USDC".into(),
        });
        app.chain
            .insert(ChainTransaction::new(tx_hash, Memo::Text(memo.into())));
    }

    fn seed_ticket(app: &TestApp, owner: &str, status: TicketStatus) -> Ticket {
        let ticket = Ticket::from_new(NewTicket {
            event_id: "e1".into(),
            owner_id: owner.into(),
            asset_code: "USDC".into(),
            transaction_hash: format!("tx-{}", Uuid::new_v4()),
            status,
        });
        app.tickets.insert_raw(ticket.clone());
        ticket
    }

    async fn send(router: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn get(router: &Router, path: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        send(router, req).await
    }

    async fn post_json(
        router: &Router,
        path: &str,
        caller: Option<&str>,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json");
        if let Some(caller) = caller {
            builder = builder.header(CALLER_ID_HEADER, caller);
        }
        let req = builder
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        send(router, req).await
    }

    // -- Health -------------------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = test_app();
        let (status, json) = get(&app.router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], "0.1.0-test");
    }

    // -- Issuance -----------------------------------------------------------

    #[tokio::test]
    async fn issue_mints_then_replays() {
        let app = test_app();
        seed_paid(&app, "p1", "tx1", "p1");

        let body = serde_json::json!({ "payment_id": "p1" });
        let (status, json) = post_json(&app.router, "/tickets/issue", None, body.clone()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["created"], true);
        assert_eq!(json["ticket"]["event_id"], "e1");
        assert_eq!(json["ticket"]["owner_id"], "u1");
        assert_eq!(json["ticket"]["asset_code"], "USDC");
        assert_eq!(json["ticket"]["transaction_hash"], "tx1");
        assert_eq!(json["ticket"]["status"], "valid");
        let first_id = json["ticket"]["id"].clone();

        let (status, json) = post_json(&app.router, "/tickets/issue", None, body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["created"], false);
        assert_eq!(json["ticket"]["id"], first_id);

        assert_eq!(app.tickets.len(), 1);
        assert_eq!(app.metrics.tickets_issued_total.get(), 1);
        assert_eq!(app.metrics.issuance_replays_total.get(), 1);
    }

    #[tokio::test]
    async fn issue_with_wrong_memo_is_bad_request() {
        let app = test_app();
        seed_paid(&app, "p1", "tx1", "other");

        let (status, json) = post_json(
            &app.router,
            "/tickets/issue",
            None,
            serde_json::json!({ "payment_id": "p1" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_request");
        assert!(app.tickets.is_empty());
        assert_eq!(
            app.metrics
                .issuance_rejected_total
                .with_label_values(&["invalid_request"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn issue_for_unknown_payment_is_not_found() {
        let app = test_app();
        let (status, json) = post_json(
            &app.router,
            "/tickets/issue",
            None,
            serde_json::json!({ "payment_id": "nope" }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "not_found");
    }

    // -- Transfer -----------------------------------------------------------

    #[tokio::test]
    async fn owner_transfer_succeeds() {
        let app = test_app();
        let ticket = seed_ticket(&app, "A", TicketStatus::Valid);

        let (status, json) = post_json(
            &app.router,
            &format!("/tickets/{}/transfer", ticket.id),
            Some("A"),
            serde_json::json!({ "new_owner_id": "B" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["owner_id"], "B");
        assert_eq!(json["status"], "valid");
        assert_eq!(app.metrics.transfers_total.get(), 1);
    }

    #[tokio::test]
    async fn non_owner_transfer_is_forbidden() {
        let app = test_app();
        let ticket = seed_ticket(&app, "A", TicketStatus::Valid);

        let (status, json) = post_json(
            &app.router,
            &format!("/tickets/{}/transfer", ticket.id),
            Some("C"),
            serde_json::json!({ "new_owner_id": "C" }),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"], "forbidden");

        let (_, json) = get(&app.router, &format!("/tickets/{}", ticket.id)).await;
        assert_eq!(json["owner_id"], "A");
    }

    #[tokio::test]
    async fn used_ticket_transfer_is_bad_request() {
        let app = test_app();
        let ticket = seed_ticket(&app, "A", TicketStatus::Used);

        let (status, _) = post_json(
            &app.router,
            &format!("/tickets/{}/transfer", ticket.id),
            Some("A"),
            serde_json::json!({ "new_owner_id": "B" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn transfer_without_caller_header_is_rejected() {
        let app = test_app();
        let ticket = seed_ticket(&app, "A", TicketStatus::Valid);

        let (status, json) = post_json(
            &app.router,
            &format!("/tickets/{}/transfer", ticket.id),
            None,
            serde_json::json!({ "new_owner_id": "B" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_request");
    }

    #[tokio::test]
    async fn transfer_of_unknown_ticket_is_not_found() {
        let app = test_app();
        let (status, _) = post_json(
            &app.router,
            &format!("/tickets/{}/transfer", Uuid::new_v4()),
            Some("A"),
            serde_json::json!({ "new_owner_id": "B" }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            app.metrics
                .transfers_rejected_total
                .with_label_values(&["not_found"])
                .get(),
            1
        );
    }

    // -- Lookups ------------------------------------------------------------

    #[tokio::test]
    async fn owner_listing() {
        let app = test_app();
        seed_ticket(&app, "A", TicketStatus::Valid);
        seed_ticket(&app, "A", TicketStatus::Used);
        seed_ticket(&app, "B", TicketStatus::Valid);

        let (status, json) = get(&app.router, "/owners/A/tickets").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 2);

        let (_, json) = get(&app.router, "/owners/Z/tickets").await;
        assert!(json.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ticket_lookup_404_for_missing() {
        let app = test_app();
        let (status, _) = get(&app.router, &format!("/tickets/{}", Uuid::new_v4())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // -- Malformed input ----------------------------------------------------

    #[tokio::test]
    async fn malformed_ticket_id_gets_json_error() {
        let app = test_app();
        let (status, json) = get(&app.router, "/tickets/not-a-uuid").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_request");
        assert!(json["message"].as_str().is_some_and(|m| !m.is_empty()));
    }

    #[tokio::test]
    async fn malformed_body_gets_json_error() {
        let app = test_app();
        let req = Request::builder()
            .method("POST")
            .uri("/tickets/issue")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, json) = send(&app.router, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_request");

        let ticket = seed_ticket(&app, "A", TicketStatus::Valid);
        let (status, json) = post_json(
            &app.router,
            &format!("/tickets/{}/transfer", ticket.id),
            Some("A"),
            serde_json::json!({ "owner": "B" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_request");
        assert_eq!(app.tickets.len(), 1);
    }
}
