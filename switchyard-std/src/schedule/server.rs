//! The update-request contract with the server.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use switchyard_core::{HttpResponse, TransportError, UpdateRequest};

use super::payload::{CallbackPayload, OutputSlot};

/// Prop updates per component, keyed by stringified id.
pub type CallbackData = BTreeMap<String, Map<String, Value>>;

#[derive(Deserialize)]
struct UpdateResponse {
    #[serde(default)]
    multi: bool,
    response: Value,
}

/// The request for a payload.
pub fn update_request(url: impl Into<String>, payload: &CallbackPayload) -> UpdateRequest {
    UpdateRequest {
        url: url.into(),
        body: payload.to_json(),
    }
}

/// Interpret the server's answer to `payload`.
///
/// `prevent_status` answers mean "nothing changed" and decode to empty data.
/// Single-output responses carry `{"props": {..}}` for the payload's only
/// output component.
pub fn decode_response(
    payload: &CallbackPayload,
    response: HttpResponse,
    prevent_status: u16,
) -> Result<CallbackData, TransportError> {
    if response.status == prevent_status {
        return Ok(CallbackData::new());
    }
    if !response.is_success() {
        return Err(TransportError::Status {
            status: response.status,
            body: response.body,
        });
    }

    let decoded: UpdateResponse =
        serde_json::from_str(&response.body).map_err(|e| TransportError::Decode(e.to_string()))?;

    if decoded.multi {
        let Value::Object(entries) = decoded.response else {
            return Err(TransportError::Decode("`response` is not an object".into()));
        };
        return entries
            .into_iter()
            .map(|(id, props)| match props {
                Value::Object(props) => Ok((id, props)),
                _ => Err(TransportError::Decode(format!("props of {id} are not an object"))),
            })
            .collect();
    }

    let id = match payload.outputs.first() {
        Some(OutputSlot::Single(output)) => output.id.stringify(),
        _ => return Err(TransportError::Decode("single-output response for a multi-valued output".into())),
    };
    match decoded.response.get("props") {
        Some(Value::Object(props)) => Ok(CallbackData::from([(id, props.clone())])),
        _ => Err(TransportError::Decode("`response.props` is not an object".into())),
    }
}
