use crate::config::NodeConfig;
use crate::fetch::HttpChainFetcher;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use hadcoin_core::{
    consensus::ConsensusResolver,
    ledger::{Ledger, SharedLedger},
    peers::{network_location, PeerRegistry},
    Block, ChainSnapshot, LedgerError, TransactionInput,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::{atomic::AtomicBool, Arc};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub ledger: SharedLedger,
    pub peers: Arc<RwLock<PeerRegistry>>,
    pub resolver: ConsensusResolver<HttpChainFetcher>,
    pub config: Arc<NodeConfig>,
    /// Raised on shutdown so an in-flight proof search gives up.
    pub stop: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(config: NodeConfig) -> anyhow::Result<Self> {
        let fetcher = HttpChainFetcher::new(config.peer_timeout)?;
        Ok(Self {
            ledger: SharedLedger::new(Ledger::new()),
            peers: Arc::new(RwLock::new(PeerRegistry::new())),
            resolver: ConsensusResolver::new(fetcher).with_timeout(config.peer_timeout),
            config: Arc::new(config),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }
}

#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    InvalidInput(String),
    Unavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Ledger(e @ LedgerError::EmptyChain) => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Ledger(e @ LedgerError::MissingField(_)) => (
                StatusCode::BAD_REQUEST,
                format!("Some elements of the transaction are missing: {e}"),
            ),
            ApiError::Ledger(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize)]
struct MinedBlock {
    message: &'static str,
    #[serde(flatten)]
    block: Block,
}

#[derive(Serialize)]
struct Validity {
    valid: bool,
    message: &'static str,
}

#[derive(Serialize)]
struct TxAccepted {
    message: String,
    index: u64,
}

#[derive(Deserialize)]
struct ConnectNodes {
    nodes: Option<Vec<String>>,
}

#[derive(Serialize)]
struct Connected {
    message: &'static str,
    total_nodes: Vec<String>,
}

#[derive(Serialize)]
struct Reconciled {
    replaced: bool,
    message: &'static str,
    chain: Vec<Block>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/mine_block", get(mine_block))
        .route("/get_chain", get(get_chain))
        .route("/is_valid", get(is_valid))
        .route("/add_transaction", post(add_transaction))
        .route("/connect_node", post(connect_node))
        .route("/replace_chain", get(replace_chain))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn mine_block(State(state): State<AppState>) -> Result<Json<MinedBlock>, ApiError> {
    let ledger = state.ledger.clone();
    let reward = state.config.reward();
    let stop = Arc::clone(&state.stop);
    let mined = tokio::task::spawn_blocking(move || ledger.mine(reward, &stop))
        .await
        .map_err(|e| ApiError::Internal(format!("mining task failed: {e}")))??;
    let block = mined.ok_or_else(|| ApiError::Unavailable("mining stopped".to_string()))?;
    Ok(Json(MinedBlock {
        message: "Congratulations, you just mined a block!",
        block,
    }))
}

async fn get_chain(State(state): State<AppState>) -> Json<ChainSnapshot> {
    Json(state.ledger.snapshot())
}

async fn is_valid(State(state): State<AppState>) -> Result<Json<Validity>, ApiError> {
    let ledger = state.ledger.clone();
    let valid = tokio::task::spawn_blocking(move || ledger.is_valid())
        .await
        .map_err(|e| ApiError::Internal(format!("validation task failed: {e}")))?;
    let message = if valid {
        "All good. The chain is valid."
    } else {
        "The chain is not valid."
    };
    Ok(Json(Validity { valid, message }))
}

async fn add_transaction(
    State(state): State<AppState>,
    body: Result<Json<TransactionInput>, JsonRejection>,
) -> Result<(StatusCode, Json<TxAccepted>), ApiError> {
    let Json(input) = body?;
    let index = state.ledger.submit(input)?;
    Ok((
        StatusCode::CREATED,
        Json(TxAccepted {
            message: format!("This transaction will be added to Block {index}"),
            index,
        }),
    ))
}

async fn connect_node(
    State(state): State<AppState>,
    body: Result<Json<ConnectNodes>, JsonRejection>,
) -> Result<(StatusCode, Json<Connected>), ApiError> {
    let Json(body) = body?;
    let nodes = body
        .nodes
        .filter(|nodes| !nodes.is_empty())
        .ok_or_else(|| ApiError::InvalidInput("No node".to_string()))?;
    // Reject the whole request before touching the registry.
    let locations = nodes
        .iter()
        .map(|node| network_location(node))
        .collect::<Result<Vec<_>, _>>()?;

    let total_nodes = {
        let mut peers = state.peers.write();
        for location in &locations {
            peers.register(location)?;
        }
        peers.list()
    };
    info!(added = locations.len(), total = total_nodes.len(), "peers connected");
    Ok((
        StatusCode::CREATED,
        Json(Connected {
            message: "All the nodes are now connected.",
            total_nodes,
        }),
    ))
}

async fn replace_chain(State(state): State<AppState>) -> Json<Reconciled> {
    let registry = state.peers.read().clone();
    if registry.is_empty() {
        warn!("reconcile requested with no registered peers");
    }
    let replaced = state.resolver.reconcile(&state.ledger, &registry).await;
    let message = if replaced {
        "The nodes had different chains so the chain was replaced by the longest one."
    } else {
        "All good. The chain is the largest one."
    };
    Json(Reconciled {
        replaced,
        message,
        chain: state.ledger.snapshot().chain,
    })
}
