//! Web 服务器模块
//!
//! 提供邀请码相关的 HTTP API

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info};

use crate::core::referral::ReferralService;
use crate::domain::ReferralKind;
use crate::errors::ReferralError;

// ==================== 错误响应 ====================

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            success: false,
            message: message.into(),
        }),
    )
        .into_response()
}

/// 请求体无法解析（类型不符、缺少 Content-Type、JSON 语法错误）统一按 400 处理
fn invalid_body(rejection: JsonRejection) -> Response {
    debug!("Rejected request body: {}", rejection.body_text());
    error_response(StatusCode::BAD_REQUEST, "Invalid request body")
}

impl IntoResponse for ReferralError {
    fn into_response(self) -> Response {
        if self.status_code().is_server_error() {
            error!("Referral request failed: {}", self);
        }
        error_response(self.status_code(), self.public_message())
    }
}

// ==================== 状态 ====================

#[derive(Clone)]
pub struct AppState {
    pub service: ReferralService,
}

impl AppState {
    pub fn new(service: ReferralService) -> Self {
        Self { service }
    }
}

// ==================== 请求类型 ====================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReferralRequest {
    pub owner_id: Option<String>,
    pub owner_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemReferralRequest {
    pub code: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
pub struct CodeQuery {
    pub code: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQuery {
    pub owner_id: Option<String>,
}

/// 取出非空字段
fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// 根据请求头还原站点根地址，用于生成分享链接
fn request_base_url(headers: &HeaderMap) -> String {
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get("host"))
        .and_then(|value| value.to_str().ok());

    match host {
        Some(host) => {
            let proto = headers
                .get("x-forwarded-proto")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("http");
            format!("{}://{}", proto, host)
        }
        None => String::new(),
    }
}

// ==================== 处理器 ====================

/// 健康检查
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// 创建邀请码
async fn create_referral(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CreateReferralRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return invalid_body(rejection),
    };

    let (Some(owner_id), Some(owner_name), Some(kind)) = (
        required(req.owner_id),
        required(req.owner_name),
        required(req.kind),
    ) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Missing required fields: ownerId, ownerName, type",
        );
    };

    let kind: ReferralKind = match kind.parse() {
        Ok(kind) => kind,
        Err(_) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Invalid type, expected 'coach' or 'client'",
            )
        }
    };

    match state.service.generate(&owner_id, &owner_name, kind).await {
        Ok(record) => {
            let link = ReferralService::share_link(&request_base_url(&headers), &record.code);
            Json(serde_json::json!({
                "success": true,
                "code": record.code,
                "link": link,
                "message": "Referral code created successfully",
            }))
            .into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// 校验邀请码
///
/// 无效的邀请码不视为错误，统一返回 `valid: false`。
async fn validate_referral(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CodeQuery>,
) -> Response {
    let Some(code) = required(query.code) else {
        return Json(serde_json::json!({
            "valid": false,
            "message": "Referral code is required",
        }))
        .into_response();
    };

    match state.service.validate(&code).await {
        Ok(Some(validation)) => Json(serde_json::json!({
            "valid": true,
            "inviterName": validation.owner_name,
            "type": validation.kind,
        }))
        .into_response(),
        Ok(None) => Json(serde_json::json!({
            "valid": false,
            "message": "Invalid or already used referral code",
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// 兑换邀请码
async fn redeem_referral(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RedeemReferralRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return invalid_body(rejection),
    };

    let (Some(code), Some(user_id)) = (required(req.code), required(req.user_id)) else {
        return error_response(StatusCode::BAD_REQUEST, "Missing required fields: code, userId");
    };

    match state.service.redeem(&code, &user_id).await {
        Ok(_) => {
            info!(code = %code, user_id = %user_id, "Referral redeemed via API");
            Json(serde_json::json!({
                "success": true,
                "message": "Referral code redeemed successfully",
            }))
            .into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// 获取邀请成功的用户
async fn list_followers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OwnerQuery>,
) -> Response {
    let Some(owner_id) = required(query.owner_id) else {
        return error_response(StatusCode::BAD_REQUEST, "Missing required parameter: ownerId");
    };

    match state.service.get_referrals_by_inviter(&owner_id).await {
        Ok(followers) => {
            let count = followers.len();
            Json(serde_json::json!({
                "success": true,
                "followers": followers,
                "count": count,
            }))
            .into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// 获取签发过的邀请码
async fn list_codes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OwnerQuery>,
) -> Response {
    let Some(owner_id) = required(query.owner_id) else {
        return error_response(StatusCode::BAD_REQUEST, "Missing required parameter: ownerId");
    };

    match state.service.get_referrals_by_owner(&owner_id).await {
        Ok(codes) => Json(serde_json::json!({
            "success": true,
            "codes": codes,
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

// ==================== 路由 ====================

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/referral/create", post(create_referral))
        .route("/api/referral/validate", get(validate_referral))
        .route("/api/referral/redeem", post(redeem_referral))
        .route("/api/referral/followers", get(list_followers))
        .route("/api/referral/codes", get(list_codes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ==================== 服务器启动 ====================

pub async fn start_web_server(bind_addr: &str, service: ReferralService) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(service));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Web server started on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
