//! Parameter binding.
//!
//! Collects raw values from the path, query string, urlencoded form body
//! and JSON object body, then coerces the fields an action declares.
//!
//! # Precedence
//! Values are recorded in source order (path, query, form, JSON). The first
//! recorded value of a key is the bound one, so a path parameter always wins.
//!
//! # Design Decisions
//! - Binding never fails the request; problems become [`BindingError`]s
//! - Undeclared keys stay available as raw strings

use std::collections::BTreeMap;
use std::fmt;

use axum::http::header;
use serde_json::Value;
use thiserror::Error;

use crate::pipeline::context::Context;

/// Declared type of an action parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Str,
    Int,
    Float,
    Bool,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParamKind::Str => "string",
            ParamKind::Int => "integer",
            ParamKind::Float => "number",
            ParamKind::Bool => "boolean",
        })
    }
}

/// One entry of an action's parameter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

impl ParamSpec {
    pub const fn optional(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }

    pub const fn required(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }
}

/// Where a raw value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    Path,
    Query,
    Form,
    Json,
}

/// A coerced parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("{field} is required")]
    Missing { field: String },

    #[error("{field}: expected {expected}, got `{value}`")]
    Invalid {
        field: String,
        expected: ParamKind,
        value: String,
    },

    #[error("{field}: malformed request body ({reason})")]
    MalformedBody { field: String, reason: String },

    #[error("{field}: path segment `{value}` is not valid UTF-8")]
    Undecodable { field: String, value: String },
}

impl BindingError {
    pub fn field(&self) -> &str {
        match self {
            BindingError::Missing { field }
            | BindingError::Invalid { field, .. }
            | BindingError::MalformedBody { field, .. }
            | BindingError::Undecodable { field, .. } => field,
        }
    }
}

/// Bound parameters of one request.
#[derive(Debug, Clone, Default)]
pub struct Params {
    raw: BTreeMap<String, Vec<(ParamSource, String)>>,
    typed: BTreeMap<String, BoundValue>,
    json: Option<Value>,
    errors: Vec<BindingError>,
}

impl Params {
    fn push(&mut self, name: &str, source: ParamSource, value: String) {
        let values = self.raw.entry(name.to_string()).or_default();
        if let Some((ParamSource::Path, _)) = values.first() {
            if source != ParamSource::Path {
                tracing::debug!(param = name, ?source, "Path parameter shadows request value");
            }
        }
        values.push((source, value));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.raw.contains_key(name)
    }

    /// The bound (highest-precedence) raw value.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.raw
            .get(name)
            .and_then(|v| v.first())
            .map(|(_, value)| value.as_str())
    }

    /// Every raw value of a multi-valued key, in precedence order.
    pub fn all(&self, name: &str) -> Vec<&str> {
        self.raw
            .get(name)
            .map(|v| v.iter().map(|(_, value)| value.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn source(&self, name: &str) -> Option<ParamSource> {
        self.raw.get(name).and_then(|v| v.first()).map(|(s, _)| *s)
    }

    pub fn typed(&self, name: &str) -> Option<&BoundValue> {
        self.typed.get(name)
    }

    /// String value, `""` when absent.
    pub fn string(&self, name: &str) -> &str {
        match self.typed.get(name) {
            Some(BoundValue::Str(s)) => s,
            _ => self.first(name).unwrap_or(""),
        }
    }

    /// Integer value, `0` when absent or not an integer.
    pub fn int(&self, name: &str) -> i64 {
        match self.typed.get(name) {
            Some(BoundValue::Int(n)) => *n,
            _ => self
                .first(name)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
        }
    }

    /// Float value, `0.0` when absent or not a number.
    pub fn float(&self, name: &str) -> f64 {
        match self.typed.get(name) {
            Some(BoundValue::Float(n)) => *n,
            _ => self
                .first(name)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0.0),
        }
    }

    /// Boolean value, `false` when absent or not a boolean.
    pub fn bool(&self, name: &str) -> bool {
        match self.typed.get(name) {
            Some(BoundValue::Bool(b)) => *b,
            _ => self.first(name).and_then(parse_bool).unwrap_or(false),
        }
    }

    /// The JSON body, when the request carried one.
    pub fn json(&self) -> Option<&Value> {
        self.json.as_ref()
    }

    pub fn errors(&self) -> &[BindingError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_for(&self, field: &str) -> Option<&BindingError> {
        self.errors.iter().find(|e| e.field() == field)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Some(true),
        "false" | "off" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}

fn coerce(kind: ParamKind, raw: &str) -> Option<BoundValue> {
    match kind {
        ParamKind::Str => Some(BoundValue::Str(raw.to_string())),
        ParamKind::Int => raw.trim().parse().ok().map(BoundValue::Int),
        ParamKind::Float => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(BoundValue::Float),
        ParamKind::Bool => parse_bool(raw).map(BoundValue::Bool),
    }
}

fn zero(kind: ParamKind) -> BoundValue {
    match kind {
        ParamKind::Str => BoundValue::Str(String::new()),
        ParamKind::Int => BoundValue::Int(0),
        ParamKind::Float => BoundValue::Float(0.0),
        ParamKind::Bool => BoundValue::Bool(false),
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Body encodings the binder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Form,
    Json,
    Other,
}

fn body_kind(content_type: Option<&str>) -> BodyKind {
    let Some(content_type) = content_type else {
        return BodyKind::Other;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if essence == "application/x-www-form-urlencoded" {
        BodyKind::Form
    } else if essence == "application/json" || essence.ends_with("+json") {
        BodyKind::Json
    } else {
        BodyKind::Other
    }
}

/// Borrowed request pieces the binder reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct BindInput<'a> {
    pub path_params: &'a [(String, String)],
    /// Path parameter names whose values are still percent-encoded.
    pub undecodable: &'a [String],
    pub query: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub body: &'a [u8],
}

/// Binds request values to an action's declared parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParamBinder;

impl ParamBinder {
    pub fn new() -> Self {
        Self
    }

    /// Bind into the context. Only meaningful after routing.
    pub fn bind(&self, ctx: &mut Context) {
        let Some(route) = ctx.route.as_ref() else {
            return;
        };
        let specs = route.action.params().to_vec();
        let params = self.bind_parts(
            BindInput {
                path_params: &route.path_params,
                undecodable: &route.undecodable_params,
                query: ctx.uri().query(),
                content_type: ctx.header(header::CONTENT_TYPE),
                body: ctx.body(),
            },
            &specs,
        );
        if params.has_errors() {
            tracing::debug!(errors = params.errors().len(), "Parameter binding reported errors");
        }
        ctx.params = params;
    }

    pub fn bind_parts(&self, input: BindInput<'_>, specs: &[ParamSpec]) -> Params {
        let mut params = Params::default();

        for (name, value) in input.path_params {
            params.push(name, ParamSource::Path, value.clone());
            if input.undecodable.contains(name) {
                params.errors.push(BindingError::Undecodable {
                    field: name.clone(),
                    value: value.clone(),
                });
            }
        }

        if let Some(query) = input.query {
            for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
                params.push(&name, ParamSource::Query, value.into_owned());
            }
        }

        if !input.body.is_empty() {
            match body_kind(input.content_type) {
                BodyKind::Form => {
                    for (name, value) in url::form_urlencoded::parse(input.body) {
                        params.push(&name, ParamSource::Form, value.into_owned());
                    }
                }
                BodyKind::Json => self.bind_json(&mut params, input.body),
                BodyKind::Other => {}
            }
        }

        for spec in specs {
            let bound = match params.first(spec.name) {
                Some(raw) if !raw.trim().is_empty() => match coerce(spec.kind, raw) {
                    Some(value) => value,
                    None => {
                        params.errors.push(BindingError::Invalid {
                            field: spec.name.to_string(),
                            expected: spec.kind,
                            value: raw.to_string(),
                        });
                        zero(spec.kind)
                    }
                },
                _ => {
                    if spec.required {
                        params.errors.push(BindingError::Missing {
                            field: spec.name.to_string(),
                        });
                    }
                    zero(spec.kind)
                }
            };
            params.typed.insert(spec.name.to_string(), bound);
        }

        params
    }

    fn bind_json(&self, params: &mut Params, body: &[u8]) {
        let value: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) => {
                params.errors.push(BindingError::MalformedBody {
                    field: "body".to_string(),
                    reason: e.to_string(),
                });
                return;
            }
        };

        if let Value::Object(map) = &value {
            for (name, field) in map {
                match field {
                    Value::Array(items) => {
                        for item in items.iter().filter_map(scalar) {
                            params.push(name, ParamSource::Json, item);
                        }
                    }
                    other => {
                        if let Some(s) = scalar(other) {
                            params.push(name, ParamSource::Json, s);
                        }
                    }
                }
            }
        }
        params.json = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(input: BindInput<'_>, specs: &[ParamSpec]) -> Params {
        ParamBinder::new().bind_parts(input, specs)
    }

    #[test]
    fn test_path_beats_query_and_body() {
        let path = vec![("id".to_string(), "7".to_string())];
        let params = bind(
            BindInput {
                path_params: &path,
                undecodable: &[],
                query: Some("id=8&tag=a&tag=b"),
                content_type: Some("application/x-www-form-urlencoded"),
                body: b"id=9&name=Trip+2024",
            },
            &[ParamSpec::required("id", ParamKind::Int)],
        );

        assert_eq!(params.int("id"), 7);
        assert_eq!(params.all("id"), vec!["7", "8", "9"]);
        assert_eq!(params.source("id"), Some(ParamSource::Path));
        assert_eq!(params.all("tag"), vec!["a", "b"]);
        assert_eq!(params.string("name"), "Trip 2024");
        assert!(!params.has_errors());
    }

    #[test]
    fn test_json_body_is_flattened() {
        let params = bind(
            BindInput {
                content_type: Some("application/json; charset=utf-8"),
                body: br#"{"name":"x","seq":3,"public":true,"ids":[1,2],"meta":{"a":1}}"#,
                ..Default::default()
            },
            &[
                ParamSpec::optional("seq", ParamKind::Int),
                ParamSpec::optional("public", ParamKind::Bool),
            ],
        );

        assert_eq!(params.string("name"), "x");
        assert_eq!(params.int("seq"), 3);
        assert!(params.bool("public"));
        assert_eq!(params.all("ids"), vec!["1", "2"]);
        assert!(!params.contains("meta"));
        assert_eq!(params.json().and_then(|v| v.pointer("/meta/a")), Some(&Value::from(1)));
    }

    #[test]
    fn test_coercion_failures_are_errors_not_faults() {
        let params = bind(
            BindInput {
                query: Some("seq=abc&ratio=1.5&flag=maybe"),
                ..Default::default()
            },
            &[
                ParamSpec::optional("seq", ParamKind::Int),
                ParamSpec::optional("ratio", ParamKind::Float),
                ParamSpec::optional("flag", ParamKind::Bool),
                ParamSpec::required("email", ParamKind::Str),
            ],
        );

        assert_eq!(params.int("seq"), 0);
        assert_eq!(params.float("ratio"), 1.5);
        assert!(!params.bool("flag"));
        assert_eq!(params.string("email"), "");
        let fields: Vec<&str> = params.errors().iter().map(|e| e.field()).collect();
        assert_eq!(fields, vec!["seq", "flag", "email"]);
        assert!(matches!(
            params.error_for("seq"),
            Some(BindingError::Invalid { expected: ParamKind::Int, .. })
        ));
    }

    #[test]
    fn test_empty_required_value_is_missing() {
        let params = bind(
            BindInput {
                content_type: Some("application/x-www-form-urlencoded"),
                body: b"email=&seq=",
                ..Default::default()
            },
            &[
                ParamSpec::required("email", ParamKind::Str),
                ParamSpec::required("seq", ParamKind::Int),
                ParamSpec::optional("other", ParamKind::Int),
            ],
        );

        assert_eq!(params.errors().len(), 2);
        assert!(matches!(params.error_for("email"), Some(BindingError::Missing { .. })));
        assert!(matches!(params.error_for("seq"), Some(BindingError::Missing { .. })));
        assert_eq!(params.int("other"), 0);
    }

    #[test]
    fn test_malformed_json_is_recorded_on_body() {
        let params = bind(
            BindInput {
                query: Some("name=q"),
                content_type: Some("application/json"),
                body: b"{not json",
                ..Default::default()
            },
            &[],
        );

        assert_eq!(params.string("name"), "q");
        assert!(matches!(params.error_for("body"), Some(BindingError::MalformedBody { .. })));
        assert!(params.json().is_none());
    }

    #[test]
    fn test_unknown_body_type_is_ignored() {
        let params = bind(
            BindInput {
                content_type: Some("text/plain"),
                body: b"name=x",
                ..Default::default()
            },
            &[],
        );
        assert!(!params.contains("name"));
        assert!(!params.has_errors());
    }

    #[test]
    fn test_undecodable_path_value_is_an_error() {
        let path = vec![("name".to_string(), "%FF".to_string())];
        let undecodable = vec!["name".to_string()];
        let params = bind(
            BindInput {
                path_params: &path,
                undecodable: &undecodable,
                ..Default::default()
            },
            &[ParamSpec::required("name", ParamKind::Str)],
        );
        assert_eq!(params.string("name"), "%FF");
        assert!(matches!(
            params.error_for("name"),
            Some(BindingError::Undecodable { value, .. }) if value == "%FF"
        ));
    }
}
