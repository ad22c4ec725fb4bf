//! Classifying a response envelope into one typed result.
//!
//! # Design
//! Two error channels are kept apart. `server_errors` is opaque and comes
//! from the server or the infrastructure; `validation_errors` is structured
//! and field-addressable. Every shape an `errors` field can take is resolved
//! once into an `ErrorPayload`, so the rest of the classifier only deals with
//! that sum type.
//!
//! Payload extraction runs regardless of the verdict: a validation failure
//! may still echo the sanitised resource, and callers can use it.

use serde_json::{json, Map, Value};

use crate::manager::ApiResponse;
use crate::model::ApiModel;
use crate::namespace::{extract, Extracted};
use crate::types::ApiNamespace;

pub const GENERIC_SERVER_ERROR: &str = "An unexpected server error occurred";

/// One field-addressable validation message. `field == "base"` marks a
/// message about the resource as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn is_base(&self) -> bool {
        self.field == "base"
    }

    /// `"Title: must not be blank!"`
    pub fn full_message(&self) -> String {
        format!("{}: {}", humanize(&self.field), self.message)
    }
}

/// `created_at` -> `Created at`.
pub fn humanize(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Every shape the `errors` field of a body is known to take.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorPayload {
    /// `[{"title": "must not be blank!"}, {"status": "500", "detail": "..."}]`
    Entries(Vec<Map<String, Value>>),
    /// Legacy `{"title": ["can't be blank"], "base": ["..."]}`.
    FieldMessages(Vec<(String, Vec<String>)>),
    /// `["Something went wrong"]`
    Messages(Vec<String>),
    Opaque(Value),
}

impl ErrorPayload {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Array(items) if items.is_empty() => None,
            Value::Object(map) if map.is_empty() => None,
            Value::Array(items) if items.iter().all(Value::is_object) => Some(ErrorPayload::Entries(
                items.iter().filter_map(Value::as_object).cloned().collect(),
            )),
            Value::Array(items) if items.iter().all(Value::is_string) => Some(ErrorPayload::Messages(
                items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
            )),
            Value::Object(map) => Some(field_messages(map).unwrap_or_else(|| ErrorPayload::Opaque(value.clone()))),
            other => Some(ErrorPayload::Opaque(other.clone())),
        }
    }

    /// Find `errors` at the body root, then inside the extracted object.
    pub fn locate(body: Option<&Value>, object: Option<&Map<String, Value>>) -> Option<Self> {
        body.and_then(|b| b.get("errors"))
            .and_then(Self::from_value)
            .or_else(|| object.and_then(|o| o.get("errors")).and_then(Self::from_value))
    }

    pub fn validation_errors(&self) -> Vec<ValidationError> {
        match self {
            ErrorPayload::Entries(entries) => entries
                .iter()
                .flat_map(|entry| entry.iter())
                .flat_map(|(field, value)| match value {
                    Value::Array(messages) => messages
                        .iter()
                        .map(|m| ValidationError::new(field, &text(m)))
                        .collect::<Vec<_>>(),
                    other => vec![ValidationError::new(field, &text(other))],
                })
                .collect(),
            ErrorPayload::FieldMessages(fields) => fields
                .iter()
                .flat_map(|(field, messages)| messages.iter().map(move |m| ValidationError::new(field, m)))
                .collect(),
            ErrorPayload::Messages(messages) => messages.iter().map(|m| ValidationError::new("base", m)).collect(),
            ErrorPayload::Opaque(Value::String(message)) => vec![ValidationError::new("base", message)],
            ErrorPayload::Opaque(_) => Vec::new(),
        }
    }

    /// The server-error channel value for this payload.
    pub fn server_errors(&self) -> Value {
        match self {
            ErrorPayload::Entries(entries) => Value::Array(entries.iter().cloned().map(Value::Object).collect()),
            ErrorPayload::FieldMessages(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(field, messages)| (field.clone(), json!(messages)))
                    .collect(),
            ),
            ErrorPayload::Messages(messages) => {
                Value::Array(messages.iter().map(|m| json!({ "base": m })).collect())
            }
            ErrorPayload::Opaque(value) => value.clone(),
        }
    }
}

fn field_messages(map: &Map<String, Value>) -> Option<ErrorPayload> {
    let mut fields = Vec::with_capacity(map.len());
    for (field, value) in map {
        let messages = match value {
            Value::String(s) => vec![s.clone()],
            Value::Array(items) if items.iter().all(Value::is_string) => {
                items.iter().filter_map(Value::as_str).map(str::to_string).collect()
            }
            _ => return None,
        };
        fields.push((field.clone(), messages));
    }
    Some(ErrorPayload::FieldMessages(fields))
}

fn generic_server_errors() -> Value {
    json!([{ "base": GENERIC_SERVER_ERROR }])
}

/// Display lines for a server-error value, in the value's own order.
pub fn error_messages(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().flat_map(error_messages).collect(),
        Value::Object(map) => map
            .iter()
            .flat_map(|(key, value)| match value {
                Value::Array(messages) => messages
                    .iter()
                    .map(|m| format!("{}: {}", humanize(key), text(m)))
                    .collect::<Vec<_>>(),
                other => vec![format!("{}: {}", humanize(key), text(other))],
            })
            .collect(),
        Value::Null => Vec::new(),
        other => vec![text(other)],
    }
}

/// Verdict for one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Successful(u16),
    /// 422, or a legacy field-error body under any status.
    ValidationFailure(Option<u16>),
    /// 5xx, a transport failure without a usable body, or a generic
    /// `errors` marker on an otherwise successful response.
    ServerFailure(Option<u16>),
    Unauthorized(u16),
    ClientError(u16),
    /// No status, or a status outside the classified ranges.
    Unknown,
}

#[derive(Debug, Clone)]
pub struct ClassifiedResponse<M> {
    raw: ApiResponse,
    outcome: Outcome,
    response_object: Option<Map<String, Value>>,
    response_array: Option<Vec<Value>>,
    object: Option<M>,
    array: Option<Vec<M>>,
    server_errors: Option<Value>,
    validation_errors: Option<Vec<ValidationError>>,
}

impl<M: ApiModel> ClassifiedResponse<M> {
    pub fn classify(raw: ApiResponse, namespace: &ApiNamespace) -> Self {
        let (response_object, response_array) = match raw.parsed.as_ref().and_then(|tree| extract(tree, namespace)) {
            Some(Extracted::Object(object)) => (Some(object), None),
            Some(Extracted::Array(items)) => (None, Some(items)),
            None => (None, None),
        };

        let payload = ErrorPayload::locate(raw.parsed.as_ref(), response_object.as_ref());
        let (outcome, server_errors, validation_errors) = verdict(&raw, payload);

        let object = response_object.as_ref().map(M::from_wire);
        let array = response_array
            .as_ref()
            .map(|items| items.iter().filter_map(Value::as_object).map(M::from_wire).collect());

        if let Some(server_errors) = &server_errors {
            tracing::debug!(?outcome, "server errors: {server_errors}");
        }

        Self {
            raw,
            outcome,
            response_object,
            response_array,
            object,
            array,
            server_errors,
            validation_errors,
        }
    }
}

type Verdict = (Outcome, Option<Value>, Option<Vec<ValidationError>>);

fn verdict(raw: &ApiResponse, payload: Option<ErrorPayload>) -> Verdict {
    let server = |payload: Option<ErrorPayload>| {
        payload
            .map(|p| p.server_errors())
            .unwrap_or_else(generic_server_errors)
    };

    match raw.status {
        Some(code @ 500..=599) => (Outcome::ServerFailure(Some(code)), Some(server(payload)), None),
        Some(422) => (
            Outcome::ValidationFailure(Some(422)),
            None,
            Some(payload.map(|p| p.validation_errors()).unwrap_or_default()),
        ),
        _ if matches!(payload, Some(ErrorPayload::FieldMessages(_))) => (
            Outcome::ValidationFailure(raw.status),
            None,
            payload.map(|p| p.validation_errors()),
        ),
        Some(401) => (Outcome::Unauthorized(401), None, None),
        Some(code @ 400..=499) => (Outcome::ClientError(code), None, None),
        Some(code @ 200..=299) => match payload {
            Some(p @ (ErrorPayload::Messages(_) | ErrorPayload::Entries(_))) => {
                (Outcome::ServerFailure(Some(code)), Some(p.server_errors()), None)
            }
            _ => (Outcome::Successful(code), None, None),
        },
        Some(_) => (Outcome::Unknown, None, None),
        None if raw.error.is_some() => (Outcome::ServerFailure(None), Some(server(payload)), None),
        None => (Outcome::Unknown, None, None),
    }
}

impl<M> ClassifiedResponse<M> {
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn status_code(&self) -> Option<u16> {
        self.raw.status
    }

    pub fn raw(&self) -> &ApiResponse {
        &self.raw
    }

    /// Parsed body after root-namespace unwrapping.
    pub fn response_data(&self) -> Option<&Value> {
        self.raw.parsed.as_ref()
    }

    pub fn response_object(&self) -> Option<&Map<String, Value>> {
        self.response_object.as_ref()
    }

    pub fn response_array(&self) -> Option<&[Value]> {
        self.response_array.as_deref()
    }

    pub fn object(&self) -> Option<&M> {
        self.object.as_ref()
    }

    pub fn array(&self) -> Option<&[M]> {
        self.array.as_deref()
    }

    pub fn into_object(self) -> Option<M> {
        self.object
    }

    pub fn into_array(self) -> Option<Vec<M>> {
        self.array
    }

    pub fn server_errors(&self) -> Option<&Value> {
        self.server_errors.as_ref()
    }

    pub fn validation_errors(&self) -> Option<&[ValidationError]> {
        self.validation_errors.as_deref()
    }

    pub fn has_server_error(&self) -> bool {
        self.server_errors.is_some()
    }

    pub fn has_validation_errors(&self) -> bool {
        self.validation_errors.as_ref().is_some_and(|errors| !errors.is_empty())
    }

    pub fn has_errors(&self) -> bool {
        self.has_server_error()
            || self.has_validation_errors()
            || !matches!(self.outcome, Outcome::Successful(_) | Outcome::Unknown)
    }

    pub fn is_successful(&self) -> bool {
        matches!(self.outcome, Outcome::Successful(_)) && !self.has_errors()
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.outcome, Outcome::Unauthorized(_))
    }

    pub fn is_transport_failure(&self) -> bool {
        self.raw.error.is_some()
    }

    /// A status arrived but its body could not be read or decoded.
    pub fn is_malformed(&self) -> bool {
        self.raw.status.is_some()
            && self.raw.parsed.is_none()
            && (self.raw.body.is_some() || self.raw.error.is_some())
    }

    pub fn server_error_messages(&self) -> Option<Vec<String>> {
        self.server_errors.as_ref().map(error_messages)
    }

    pub fn validation_error_messages(&self) -> Option<Vec<String>> {
        self.validation_errors
            .as_ref()
            .map(|errors| errors.iter().map(ValidationError::full_message).collect())
    }
}
