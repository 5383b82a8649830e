use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{normalize_id, parse_decimal, EMAIL_HEADER, ID_HEADER, RATE_HEADER};

pub const MSG_NO_DATA: &str = "sin datos";
pub const MSG_MISSING_PARAMS: &str = "faltan parámetros";
pub const MSG_INVALID_ID: &str = "idOp inválido";
pub const MSG_INVALID_RATE: &str = "tasa inválida";
pub const MSG_SAVED: &str = "Tasa actualizada y correo enviado";
pub const MSG_PARTIAL_FAILURE: &str = "Alguna de las acciones falló";

/// Typed view of an update payload. The payload itself is what gets forwarded to the
/// webhook; this only carries what the sheet update needs.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    /// Normalized lookup key, see [`normalize_id`]
    pub operation_id: String,
    pub rate: f64,
    pub email: String,
}

impl UpdateRequest {
    pub fn from_payload(payload: &Value) -> Result<Self, ApiError> {
        let fields = match payload {
            Value::Object(map) if !map.is_empty() => map,
            _ => return Err(ApiError::bad_request(MSG_NO_DATA)),
        };

        let (Some(id), Some(rate), Some(email)) = (
            required(fields, ID_HEADER),
            required(fields, RATE_HEADER),
            required(fields, EMAIL_HEADER),
        ) else {
            return Err(ApiError::validation_error(MSG_MISSING_PARAMS));
        };

        let operation_id = normalize_id(id).ok_or_else(|| ApiError::validation_error(MSG_INVALID_ID))?;
        let rate = match rate {
            Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
            Value::String(s) => parse_decimal(s),
            _ => None,
        }
        .ok_or_else(|| ApiError::validation_error(MSG_INVALID_RATE))?;
        let email = match email {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        };

        Ok(Self { operation_id, rate, email })
    }
}

/// A field counts as present when it is not null and not blank.
fn required<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    fields.get(name).filter(|value| match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    })
}

/// Composite result of an update: overall flag plus each side effect's outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zapier_ok: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_ok: Option<bool>,
    pub msg: &'static str,
}

impl SaveOutcome {
    pub fn from_results(zapier_ok: bool, sheet_ok: bool) -> Self {
        if zapier_ok && sheet_ok {
            Self {
                ok: true,
                zapier_ok: None,
                sheet_ok: None,
                msg: MSG_SAVED,
            }
        } else {
            Self {
                ok: false,
                zapier_ok: Some(zapier_ok),
                sheet_ok: Some(sheet_ok),
                msg: MSG_PARTIAL_FAILURE,
            }
        }
    }
}

impl IntoResponse for SaveOutcome {
    fn into_response(self) -> Response {
        let status = if self.ok { StatusCode::OK } else { StatusCode::INTERNAL_SERVER_ERROR };
        (status, Json(self)).into_response()
    }
}

/// GET /api/data - every rate record in the sheet
///
/// An empty array means either an empty sheet or a failed read; the store adapter
/// does not distinguish the two.
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let records = state.store.list_records().await;
    Ok(Json(serde_json::to_value(records)?))
}

/// POST /api/guardar - notify the webhook, then write the new rate to the sheet
///
/// The webhook always goes first and nothing is rolled back: a 500 with
/// `zapier_ok`/`sheet_ok` tells the caller which side effect happened.
pub async fn save(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<SaveOutcome, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!("Rejected update body: {}", rejection);
        ApiError::bad_request(MSG_NO_DATA)
    })?;
    let request = UpdateRequest::from_payload(&payload)?;

    let zapier_ok = state.notifier.notify(&payload).await;
    let sheet_ok = state.store.update_rate(&request.operation_id, request.rate).await;

    if !(zapier_ok && sheet_ok) {
        tracing::warn!(
            "Update for idOp {} incomplete: zapier_ok={} sheet_ok={}",
            request.operation_id,
            zapier_ok,
            sheet_ok
        );
    }
    Ok(SaveOutcome::from_results(zapier_ok, sheet_ok))
}
