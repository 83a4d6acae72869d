// ==========================================
// 培训中心排课系统 - HTTP 层
// ==========================================
// 职责: axum 路由、站点解析、响应映射
// 约定:
// - 表单接口: 303 重定向 + 提示消息（GET /flash 取出）
// - 单条写入/查询接口: JSON，状态码取自 ApiError::status_code
// - 所有核心调用在 spawn_blocking 中执行（SQLite 同步访问）
// ==========================================

use std::sync::Arc;

use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::{generation_messages, ApiError, FlashMessage, FormFields};
use crate::app::state::AppState;
use crate::i18n::{t, t_with_args};
use crate::perf::PerfGuard;

pub type SharedState = Arc<AppState>;

/// 站点请求头
pub const SITE_HEADER: &str = "x-site-id";

pub const INDEX_PATH: &str = "/";
pub const VIEW_SCHEDULE_PATH: &str = "/view_schedule";
pub const GENERATE_ADVANCED_PATH: &str = "/schedule/generate_advanced";

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/generate_schedule", post(generate_schedule))
        .route("/generate_schedule_advanced", post(generate_schedule_advanced))
        .route("/manual_add_schedule", post(manual_add_schedule))
        .route("/update_schedule/:id", post(update_schedule))
        .route("/schedule/slot/add", post(add_slot))
        .route("/schedule/slot/edit/:id", get(get_slot).post(edit_slot))
        .route("/schedule/slot/delete/:id", post(delete_slot))
        .route("/view_schedule", get(view_schedule))
        .route("/schedule/day/:date", get(schedule_for_day))
        .route("/schedule/range", get(schedule_in_range))
        .route("/schedule/student/:name", get(schedule_for_student))
        .route("/schedule/machine/:name", get(schedule_for_machine))
        .route("/flash", get(take_flashes))
        .with_state(state)
}

// ==========================================
// JsonReply - 状态码 + JSON 体
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct JsonReply {
    pub status: u16,
    pub body: Value,
}

impl JsonReply {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn success(message: Option<String>) -> Self {
        match message {
            Some(message) => Self::ok(json!({ "status": "success", "message": message })),
            None => Self::ok(json!({ "status": "success" })),
        }
    }

    pub fn serialized<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self::ok(body),
            Err(e) => Self::error(&ApiError::InternalError(format!("序列化失败: {}", e))),
        }
    }

    /// 错误响应: {status:"error", message, code, conflicts?}
    pub fn error(err: &ApiError) -> Self {
        let mut body = json!({
            "status": "error",
            "message": user_message(err),
            "code": err.error_code(),
        });
        if let ApiError::ScheduleConflict { conflicts, .. } = err {
            body["conflicts"] = serde_json::to_value(conflicts).unwrap_or(Value::Null);
        }
        Self {
            status: err.status_code(),
            body,
        }
    }
}

impl IntoResponse for JsonReply {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body)).into_response()
    }
}

/// 面向用户的错误文本（业务错误不带前缀）
fn user_message(err: &ApiError) -> String {
    match err {
        ApiError::InvalidInput(msg)
        | ApiError::NotFound(msg)
        | ApiError::BusinessRuleViolation(msg) => msg.clone(),
        ApiError::ScheduleConflict { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

// ==========================================
// 站点解析
// ==========================================

/// X-Site-Id 请求头 → 站点ID；缺省时使用默认站点
pub fn resolve_tenant(headers: &HeaderMap, default_site_id: i64) -> Result<i64, ApiError> {
    match headers.get(SITE_HEADER) {
        None => Ok(default_site_id),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .ok_or_else(|| ApiError::InvalidInput(format!("无效的 {} 请求头", SITE_HEADER))),
    }
}

// ==========================================
// 同步处理函数（在阻塞线程池中执行）
// ==========================================

/// 基础生成 → 重定向首页
pub fn handle_generate_basic(state: &AppState, tenant_id: i64, fields: &FormFields) -> &'static str {
    match state.schedule_api.generate_schedule(tenant_id, fields) {
        Ok(outcome) => state.push_flashes(tenant_id, generation_messages(&outcome)),
        Err(err) => state.push_flashes(tenant_id, [generation_error(&err)]),
    }
    INDEX_PATH
}

/// 高级生成 → 成功时查看课表，前置条件不满足或出错时回到生成页
pub fn handle_generate_advanced(state: &AppState, tenant_id: i64, fields: &FormFields) -> &'static str {
    match state.schedule_api.generate_schedule_advanced(tenant_id, fields) {
        Ok(outcome) => {
            state.push_flashes(tenant_id, generation_messages(&outcome));
            if outcome.stop_reason.is_precondition_failure() {
                GENERATE_ADVANCED_PATH
            } else {
                VIEW_SCHEDULE_PATH
            }
        }
        Err(err) => {
            state.push_flashes(tenant_id, [generation_error(&err)]);
            GENERATE_ADVANCED_PATH
        }
    }
}

/// 人工批量新增 → 重定向首页
pub fn handle_manual_add(state: &AppState, tenant_id: i64, fields: &FormFields) -> &'static str {
    match state.schedule_api.manual_add_schedule(tenant_id, fields) {
        Ok(report) => state.push_flashes(tenant_id, report.flash_messages()),
        Err(ApiError::InvalidInput(msg)) => state.push_flashes(tenant_id, [FlashMessage::danger(msg)]),
        Err(err) => {
            tracing::error!(tenant_id, error = %err, "人工批量新增失败");
            let error = err.to_string();
            state.push_flashes(
                tenant_id,
                [FlashMessage::danger(t_with_args("manual.error", &[("error", error.as_str())]))],
            );
        }
    }
    INDEX_PATH
}

pub fn handle_update_schedule(state: &AppState, tenant_id: i64, id: i64, fields: &FormFields) -> JsonReply {
    match state.schedule_api.update_schedule(tenant_id, id, fields) {
        Ok(_) => JsonReply::success(None),
        Err(err) => JsonReply::error(&err),
    }
}

pub fn handle_add_slot(state: &AppState, tenant_id: i64, fields: &FormFields) -> JsonReply {
    match state.schedule_api.add_slot(tenant_id, fields) {
        Ok(entry) => JsonReply::ok(json!({
            "status": "success",
            "message": t("slot.added"),
            "id": entry.id,
        })),
        Err(err) => JsonReply::error(&err),
    }
}

pub fn handle_get_slot(state: &AppState, tenant_id: i64, id: i64) -> JsonReply {
    match state.schedule_api.get_slot(tenant_id, id) {
        Ok(view) => JsonReply::serialized(&view),
        Err(err) => JsonReply::error(&err),
    }
}

pub fn handle_edit_slot(state: &AppState, tenant_id: i64, id: i64, fields: &FormFields) -> JsonReply {
    match state.schedule_api.edit_slot(tenant_id, id, fields) {
        Ok(_) => JsonReply::success(Some(t("slot.updated"))),
        Err(err) => JsonReply::error(&err),
    }
}

pub fn handle_delete_slot(state: &AppState, tenant_id: i64, id: i64) -> JsonReply {
    match state.schedule_api.delete_slot(tenant_id, id) {
        Ok(()) => JsonReply::success(Some(t("slot.deleted"))),
        Err(err) => JsonReply::error(&err),
    }
}

fn generation_error(err: &ApiError) -> FlashMessage {
    tracing::error!(error = %err, "排课生成失败");
    let error = user_message(err);
    FlashMessage::danger(t_with_args("schedule.generation_error", &[("error", error.as_str())]))
}

fn reads<T: Serialize>(result: Result<T, ApiError>) -> JsonReply {
    match result {
        Ok(value) => JsonReply::serialized(&value),
        Err(err) => JsonReply::error(&err),
    }
}

// ==========================================
// 异步适配
// ==========================================

async fn json_task<F>(state: SharedState, headers: &HeaderMap, op: &'static str, f: F) -> JsonReply
where
    F: FnOnce(&AppState, i64) -> JsonReply + Send + 'static,
{
    let tenant_id = match resolve_tenant(headers, state.default_site_id) {
        Ok(id) => id,
        Err(err) => return JsonReply::error(&err),
    };
    let joined = tokio::task::spawn_blocking(move || {
        let _perf = PerfGuard::new(op);
        f(&state, tenant_id)
    })
    .await;
    joined.unwrap_or_else(|e| JsonReply::error(&ApiError::InternalError(format!("后台任务失败: {}", e))))
}

async fn redirect_task<F>(state: SharedState, headers: &HeaderMap, op: &'static str, f: F) -> Response
where
    F: FnOnce(&AppState, i64) -> &'static str + Send + 'static,
{
    let tenant_id = match resolve_tenant(headers, state.default_site_id) {
        Ok(id) => id,
        Err(err) => return JsonReply::error(&err).into_response(),
    };
    let joined = tokio::task::spawn_blocking(move || {
        let _perf = PerfGuard::new(op);
        f(&state, tenant_id)
    })
    .await;
    match joined {
        Ok(location) => Redirect::to(location).into_response(),
        Err(e) => JsonReply::error(&ApiError::InternalError(format!("后台任务失败: {}", e))).into_response(),
    }
}

// ==========================================
// 路由处理器
// ==========================================

async fn generate_schedule(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    let fields = FormFields::new(pairs);
    redirect_task(state, &headers, "http.generate_schedule", move |state, tenant_id| {
        handle_generate_basic(state, tenant_id, &fields)
    })
    .await
}

async fn generate_schedule_advanced(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    let fields = FormFields::new(pairs);
    redirect_task(state, &headers, "http.generate_schedule_advanced", move |state, tenant_id| {
        handle_generate_advanced(state, tenant_id, &fields)
    })
    .await
}

async fn manual_add_schedule(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    let fields = FormFields::new(pairs);
    redirect_task(state, &headers, "http.manual_add_schedule", move |state, tenant_id| {
        handle_manual_add(state, tenant_id, &fields)
    })
    .await
}

async fn update_schedule(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> JsonReply {
    let fields = FormFields::new(pairs);
    json_task(state, &headers, "http.update_schedule", move |state, tenant_id| {
        handle_update_schedule(state, tenant_id, id, &fields)
    })
    .await
}

async fn add_slot(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> JsonReply {
    let fields = FormFields::new(pairs);
    json_task(state, &headers, "http.add_slot", move |state, tenant_id| {
        handle_add_slot(state, tenant_id, &fields)
    })
    .await
}

async fn get_slot(State(state): State<SharedState>, headers: HeaderMap, Path(id): Path<i64>) -> JsonReply {
    json_task(state, &headers, "http.get_slot", move |state, tenant_id| {
        handle_get_slot(state, tenant_id, id)
    })
    .await
}

async fn edit_slot(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> JsonReply {
    let fields = FormFields::new(pairs);
    json_task(state, &headers, "http.edit_slot", move |state, tenant_id| {
        handle_edit_slot(state, tenant_id, id, &fields)
    })
    .await
}

async fn delete_slot(State(state): State<SharedState>, headers: HeaderMap, Path(id): Path<i64>) -> JsonReply {
    json_task(state, &headers, "http.delete_slot", move |state, tenant_id| {
        handle_delete_slot(state, tenant_id, id)
    })
    .await
}

async fn view_schedule(State(state): State<SharedState>, headers: HeaderMap) -> JsonReply {
    json_task(state, &headers, "http.view_schedule", |state, tenant_id| {
        reads(state.schedule_api.list_schedule(tenant_id))
    })
    .await
}

async fn schedule_for_day(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(date): Path<String>,
) -> JsonReply {
    json_task(state, &headers, "http.schedule_for_day", move |state, tenant_id| {
        reads(state.schedule_api.schedule_for_day(tenant_id, &date))
    })
    .await
}

#[derive(Debug, Deserialize)]
struct RangeQuery {
    start: String,
    end: String,
}

async fn schedule_in_range(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(range): Query<RangeQuery>,
) -> JsonReply {
    json_task(state, &headers, "http.schedule_in_range", move |state, tenant_id| {
        reads(state.schedule_api.schedule_in_range(tenant_id, &range.start, &range.end))
    })
    .await
}

async fn schedule_for_student(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> JsonReply {
    json_task(state, &headers, "http.schedule_for_student", move |state, tenant_id| {
        reads(state.schedule_api.schedule_for_student(tenant_id, &name))
    })
    .await
}

async fn schedule_for_machine(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> JsonReply {
    json_task(state, &headers, "http.schedule_for_machine", move |state, tenant_id| {
        reads(state.schedule_api.schedule_for_machine(tenant_id, &name))
    })
    .await
}

async fn take_flashes(State(state): State<SharedState>, headers: HeaderMap) -> JsonReply {
    match resolve_tenant(&headers, state.default_site_id) {
        Ok(tenant_id) => JsonReply::serialized(&state.take_flashes(tenant_id)),
        Err(err) => JsonReply::error(&err),
    }
}
