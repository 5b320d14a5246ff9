use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use ytrag_db::models::Setting;

use crate::app::AppState;
use crate::error::ApiError;

/// A `Setting` row with its string `value` column parsed into the typed
/// JSON value its `value_type` names — the typed-settings view the API
/// exposes over the underlying text-column store.
#[derive(Debug, Serialize)]
pub struct SettingView {
    pub component: String,
    pub section: String,
    pub key: String,
    pub value: serde_json::Value,
    pub value_type: String,
    pub description: Option<String>,
}

impl TryFrom<Setting> for SettingView {
    type Error = ytrag_core::YtragError;

    fn try_from(s: Setting) -> Result<Self, Self::Error> {
        let value = typed_value(&s.value, &s.value_type)?;
        Ok(SettingView {
            component: s.component,
            section: s.section,
            key: s.key,
            value,
            value_type: s.value_type,
            description: s.description,
        })
    }
}

fn typed_value(raw: &str, value_type: &str) -> Result<serde_json::Value, ytrag_core::YtragError> {
    let value = match value_type {
        "int" => serde_json::Value::from(
            raw.parse::<i64>()
                .map_err(|_| ytrag_core::YtragError::Validation(format!("stored value {raw:?} is not an int")))?,
        ),
        "float" => serde_json::Value::from(
            raw.parse::<f64>()
                .map_err(|_| ytrag_core::YtragError::Validation(format!("stored value {raw:?} is not a float")))?,
        ),
        "bool" => serde_json::Value::from(raw.eq_ignore_ascii_case("true")),
        "string" => serde_json::Value::from(raw.to_string()),
        other => return Err(ytrag_core::YtragError::Validation(format!("unknown value_type: {other}"))),
    };
    Ok(value)
}

/// `GET /settings/{component}` — every section/key under a component.
pub async fn get_component(
    State(state): State<Arc<AppState>>,
    Path(component): Path<String>,
) -> Result<Json<Vec<SettingView>>, ApiError> {
    let rows = state.settings.get_all(&component).await?;
    let views = rows
        .into_iter()
        .map(SettingView::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(views))
}

pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path((component, section, key)): Path<(String, String, String)>,
) -> Result<Json<SettingView>, ApiError> {
    let rows = state.settings.get_section(&component, &section).await?;
    let row = rows
        .into_iter()
        .find(|r| r.key == key)
        .ok_or_else(|| ytrag_core::YtragError::NotFound(format!("setting {component}/{section}/{key} not found")))?;
    Ok(Json(SettingView::try_from(row)?))
}

#[derive(Debug, Deserialize)]
pub struct SetSettingBody {
    pub value: serde_json::Value,
    #[serde(default)]
    pub value_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// `POST`/`PUT /settings/{component}/{section}/{key}` — upsert. When
/// `value_type` is omitted it is inferred from the JSON value's own
/// shape, which covers the common case of a client just re-PUTting a
/// `GET` response back unmodified.
pub async fn set_one(
    State(state): State<Arc<AppState>>,
    Path((component, section, key)): Path<(String, String, String)>,
    Json(body): Json<SetSettingBody>,
) -> Result<Json<SettingView>, ApiError> {
    let value_type = body
        .value_type
        .unwrap_or_else(|| infer_value_type(&body.value).to_string());
    let value_str = stringify_value(&body.value, &value_type)?;

    let row = state
        .settings
        .set(&component, &section, &key, &value_str, &value_type, body.description.as_deref())
        .await?;
    Ok(Json(SettingView::try_from(row)?))
}

fn infer_value_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        serde_json::Value::Number(_) => "float",
        _ => "string",
    }
}

fn stringify_value(value: &serde_json::Value, value_type: &str) -> Result<String, ApiError> {
    let s = match (value_type, value) {
        ("int", serde_json::Value::Number(n)) => n.to_string(),
        ("float", serde_json::Value::Number(n)) => n.to_string(),
        ("bool", serde_json::Value::Bool(b)) => b.to_string(),
        ("string", serde_json::Value::String(s)) => s.clone(),
        (_, serde_json::Value::String(s)) => s.clone(),
        _ => {
            return Err(ytrag_core::YtragError::Validation(format!(
                "value {value} does not match value_type {value_type}"
            ))
            .into())
        }
    };
    Ok(s)
}

pub async fn delete_one(
    State(state): State<Arc<AppState>>,
    Path((component, section, key)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    if state.settings.delete(&component, &section, &key).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ytrag_core::YtragError::NotFound(format!("setting {component}/{section}/{key} not found")).into())
    }
}
