//! API Server Module
//!
//! This module implements a JSON-RPC server for spend validation requests.
//! Callers submit a transaction context, the wallet snapshot and the
//! collected signatures; the server answers with a verdict.

use crate::{
    SpendRequest, TransactionContext, Verdict, WalletState,
    config::Config,
    instrument::SystemMeter,
    validation::{EcdsaVerifier, Validator},
};
use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Validator used by the service: ECDSA signatures, profiled per call
pub type ServiceValidator = Validator<EcdsaVerifier>;

/// Shared application state that is accessible across all request handlers
///
/// - `validator`: Decides each spend; stateless, shared by all requests
/// - `max_signatures_per_owner`: Bound on submitted signatures relative to the owner count
#[derive(Clone)]
pub struct AppState {
    validator: Arc<ServiceValidator>,
    max_signatures_per_owner: usize,
}

/// The main API server struct
pub struct Server {
    config: Config,
    state: AppState,
}

impl Server {
    /// Creates a new API server instance
    ///
    /// # Arguments
    /// * `config` - Service configuration; the `[validation]` section picks the
    ///   matching policy, the gas price of a signature check and the signature bound
    ///
    /// # Returns
    /// A new `Server` instance with an ECDSA validator ready to serve
    pub fn new(config: Config) -> Self {
        // Each validation gets its own gas count from the meter's price
        let meter = SystemMeter::new(config.validation.gas_per_signature_check);
        let validator = Validator::new(EcdsaVerifier, config.validation.matching)
            .with_meter(Arc::new(meter));

        // Bundle all shared state into AppState
        let state = AppState {
            validator: Arc::new(validator),
            max_signatures_per_owner: config.validation.max_signatures_per_owner,
        };

        Self { config, state }
    }

    /// Router with a single POST endpoint at "/"
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", post(handle_rpc))
            .with_state(self.state.clone())
    }

    /// Binds to the configured address and serves until the listener fails
    pub async fn start(self) -> anyhow::Result<()> {
        let app = self.router();

        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);
        info!("API server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// JSON-RPC 2.0 request structure
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
    id: Value,
}

/// JSON-RPC 2.0 response structure
///
/// Either `result` or `error` is populated, never both.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Value,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    fn failure(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError { code, message }),
            id,
        }
    }
}

/// Parameters of `validateSpend`
#[derive(Debug, Deserialize)]
struct ValidateSpendParams {
    context: TransactionContext,
    wallet: WalletState,
    request: SpendRequest,
}

/// Routes each request by method name
async fn handle_rpc(
    State(state): State<AppState>,
    Json(request): Json<JsonRpcRequest>,
) -> Json<JsonRpcResponse> {
    info!("Received RPC request: {}", request.method);

    match request.method.as_str() {
        "validateSpend" => handle_validate_spend(state, request),
        _ => Json(JsonRpcResponse::failure(
            request.id,
            -32601,
            "Method not found".to_string(),
        )),
    }
}

/// Handles the "validateSpend" RPC method
///
/// This function:
/// 1. Deserializes the context, wallet and signatures from the parameters
/// 2. Refuses requests carrying more signatures than the owner set can use
/// 3. Validates the spend (wallet shape, quorum, balance)
/// 4. Returns a verdict, authorized or rejected with the reason
///
/// A rejected spend is still a successful RPC call; the verdict carries
/// the reason.
///
/// # Arguments
/// * `state` - Shared application state
/// * `request` - The JSON-RPC request containing the spend
///
/// # Returns
/// A JSON-RPC response containing a `Verdict`, or an error for bad params
fn handle_validate_spend(state: AppState, request: JsonRpcRequest) -> Json<JsonRpcResponse> {
    // Step 1: Deserialize the spend from the request parameters
    let params: ValidateSpendParams = match serde_json::from_value(request.params) {
        Ok(params) => params,
        Err(e) => {
            error!("Failed to deserialize validateSpend params: {}", e);
            return Json(JsonRpcResponse::failure(
                request.id,
                -32602,
                format!("Invalid params: {}", e),
            ));
        }
    };

    // Step 2: Every extra signature costs one recovery per owner, so bound them
    let limit = params
        .wallet
        .owners
        .len()
        .saturating_mul(state.max_signatures_per_owner);
    if params.request.signatures.len() > limit {
        warn!(
            "Refusing spend with {} signatures for {} owners",
            params.request.signatures.len(),
            params.wallet.owners.len()
        );
        return Json(JsonRpcResponse::failure(
            request.id,
            -32602,
            format!(
                "Invalid params: {} signatures exceeds limit of {}",
                params.request.signatures.len(),
                limit
            ),
        ));
    }

    // Step 3: Validate the spend, measuring this call only
    let tx_hash = params.context.signing_hash();
    let (outcome, profile) =
        state
            .validator
            .check_profiled(&params.context, &params.wallet, &params.request);

    match &outcome {
        Ok(()) => info!("Spend {:?} authorized", tx_hash),
        Err(rejection) => warn!("Spend {:?} rejected: {}", tx_hash, rejection),
    }
    if let Some(profile) = profile {
        info!("Spend {:?} consumed {} gas", tx_hash, profile.gas);
    }

    // Step 4: Report the verdict; rejections are results, not RPC errors
    let verdict = Verdict::new(tx_hash, &outcome);
    match serde_json::to_value(&verdict) {
        Ok(result) => Json(JsonRpcResponse::success(request.id, result)),
        Err(e) => {
            error!("Failed to serialize verdict: {}", e);
            Json(JsonRpcResponse::failure(
                request.id,
                -32603,
                "Internal error".to_string(),
            ))
        }
    }
}
