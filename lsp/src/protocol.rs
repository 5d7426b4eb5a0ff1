//! LSP message serde types for the subset this server speaks.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use jshint_ls_types::Diagnostic;

pub(crate) const INVALID_REQUEST: i64 = -32600;
pub(crate) const METHOD_NOT_FOUND: i64 = -32601;
pub(crate) const INVALID_PARAMS: i64 = -32602;
pub(crate) const SERVER_NOT_INITIALIZED: i64 = -32002;
/// Application code used when the linter library cannot be loaded.
pub(crate) const LIBRARY_LOAD_FAILED: i64 = 99;

/// `TextDocumentSyncKind.Full`: every change carries the whole text.
pub(crate) const TEXT_DOCUMENT_SYNC_FULL: u8 = 1;

/// A message received from the editor.
#[derive(Debug)]
pub(crate) enum Incoming {
    Request {
        id: Value,
        method: String,
        params: Option<Value>,
    },
    Notification {
        method: String,
        params: Option<Value>,
    },
    /// Reply to a request we sent; this server sends none, so these are dropped.
    Response { id: Value },
}

pub(crate) fn parse_incoming(frame: &Value) -> Option<Incoming> {
    let id = frame.get("id").filter(|id| !id.is_null());
    let method = frame
        .get("method")
        .and_then(Value::as_str)
        .map(String::from);
    let params = frame.get("params").cloned();

    match (id, method) {
        (Some(id), Some(method)) => Some(Incoming::Request {
            id: id.clone(),
            method,
            params,
        }),
        (None, Some(method)) => Some(Incoming::Notification { method, params }),
        (Some(id), None) if frame.get("result").is_some() || frame.get("error").is_some() => {
            Some(Incoming::Response { id: id.clone() })
        }
        _ => None,
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseError {
    pub(crate) fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub(crate) fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Response {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Exactly one of `result` / `error` is serialized; `result` may be `null`.
#[derive(Debug, Serialize)]
pub(crate) enum Outcome {
    #[serde(rename = "result")]
    Result(Value),
    #[serde(rename = "error")]
    Error(ResponseError),
}

impl Response {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            outcome: Outcome::Result(result),
        }
    }

    pub fn error(id: Value, error: ResponseError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            outcome: Outcome::Error(error),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Notification {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Notification {
    pub fn new(method: &'static str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
        }
    }
}

/// A message sent to the editor.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum Outgoing {
    Response(Response),
    Notification(Notification),
}

impl From<Response> for Outgoing {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<Notification> for Outgoing {
    fn from(notification: Notification) -> Self {
        Self::Notification(notification)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InitializeParams {
    #[serde(default)]
    pub root_uri: Option<String>,
    #[serde(default)]
    pub root_path: Option<String>,
    #[serde(default)]
    pub workspace_folders: Option<Vec<WorkspaceFolder>>,
    #[serde(default)]
    pub initialization_options: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkspaceFolder {
    pub uri: String,
}

impl InitializeParams {
    /// Workspace root: `rootUri`, then the legacy `rootPath`, then the first folder.
    pub fn workspace_root(&self) -> Option<PathBuf> {
        self.root_uri
            .as_deref()
            .and_then(file_uri_to_path)
            .or_else(|| {
                self.root_path
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from)
            })
            .or_else(|| {
                self.workspace_folders
                    .as_ref()?
                    .iter()
                    .find_map(|folder| file_uri_to_path(&folder.uri))
            })
    }
}

pub(crate) fn initialize_result() -> Value {
    serde_json::json!({
        "capabilities": {
            "textDocumentSync": TEXT_DOCUMENT_SYNC_FULL
        },
        "serverInfo": {
            "name": "jshint-ls",
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TextDocumentItem {
    pub uri: String,
    #[serde(default)]
    pub language_id: String,
    #[serde(default)]
    pub version: i32,
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DidOpenTextDocumentParams {
    pub text_document: TextDocumentItem,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VersionedTextDocumentIdentifier {
    pub uri: String,
    #[serde(default)]
    pub version: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextDocumentContentChangeEvent {
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DidChangeTextDocumentParams {
    pub text_document: VersionedTextDocumentIdentifier,
    pub content_changes: Vec<TextDocumentContentChangeEvent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextDocumentIdentifier {
    pub uri: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DidCloseTextDocumentParams {
    pub text_document: TextDocumentIdentifier,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DidChangeConfigurationParams {
    #[serde(default)]
    pub settings: Value,
}

#[derive(Debug, Serialize)]
pub(crate) struct PublishDiagnosticsParams<'a> {
    pub uri: &'a str,
    pub diagnostics: &'a [Diagnostic],
}

/// `MessageType.Error` for `window/showMessage`.
const MESSAGE_TYPE_ERROR: u8 = 1;

#[derive(Debug, Serialize)]
pub(crate) struct ShowMessageParams<'a> {
    #[serde(rename = "type")]
    pub kind: u8,
    pub message: &'a str,
}

impl<'a> ShowMessageParams<'a> {
    pub fn error(message: &'a str) -> Self {
        Self {
            kind: MESSAGE_TYPE_ERROR,
            message,
        }
    }
}

pub(crate) fn file_uri_to_path(uri: &str) -> Option<PathBuf> {
    url::Url::parse(uri)
        .ok()
        .filter(|u| u.scheme() == "file")
        .and_then(|u| u.to_file_path().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jshint_ls_types::{DiagnosticSeverity, Position};

    #[test]
    fn parse_request_notification_and_response() {
        let request = serde_json::json!({
            "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}
        });
        assert!(matches!(
            parse_incoming(&request),
            Some(Incoming::Request { ref method, .. }) if method == "initialize"
        ));

        let notification = serde_json::json!({
            "jsonrpc": "2.0", "method": "initialized", "params": {}
        });
        assert!(matches!(
            parse_incoming(&notification),
            Some(Incoming::Notification { ref method, .. }) if method == "initialized"
        ));

        let response = serde_json::json!({ "jsonrpc": "2.0", "id": 7, "result": null });
        assert!(matches!(
            parse_incoming(&response),
            Some(Incoming::Response { .. })
        ));
    }

    #[test]
    fn parse_rejects_frames_without_method_or_result() {
        assert!(parse_incoming(&serde_json::json!({ "jsonrpc": "2.0", "id": 3 })).is_none());
        assert!(parse_incoming(&serde_json::json!({ "jsonrpc": "2.0" })).is_none());
    }

    #[test]
    fn string_ids_are_preserved() {
        let frame = serde_json::json!({ "jsonrpc": "2.0", "id": "abc", "method": "shutdown" });
        match parse_incoming(&frame) {
            Some(Incoming::Request { id, params, .. }) => {
                assert_eq!(id, "abc");
                assert!(params.is_none());
            }
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn ok_response_keeps_null_result() {
        let json = serde_json::to_value(Response::ok(serde_json::json!(4), Value::Null)).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 4);
        assert!(json.get("result").is_some(), "result must be present");
        assert!(json["result"].is_null());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn error_response_carries_data() {
        let error = ResponseError::new(LIBRARY_LOAD_FAILED, "nope")
            .with_data(serde_json::json!({ "retry": true }));
        let json = serde_json::to_value(Response::error(serde_json::json!(1), error)).unwrap();
        assert_eq!(json["error"]["code"], 99);
        assert_eq!(json["error"]["message"], "nope");
        assert_eq!(json["error"]["data"]["retry"], true);
        assert!(json.get("result").is_none());
    }

    #[test]
    fn notification_omits_id_and_missing_params() {
        let json = serde_json::to_value(Notification::new("exit", None)).unwrap();
        assert_eq!(json["method"], "exit");
        assert!(json.get("id").is_none());
        assert!(json.get("params").is_none());
    }

    #[test]
    fn initialize_result_advertises_full_sync() {
        assert_eq!(initialize_result()["capabilities"]["textDocumentSync"], 1);
    }

    #[test]
    fn workspace_root_prefers_root_uri() {
        #[cfg(not(windows))]
        let (uri, path) = ("file:///work/space", "/work/space");
        #[cfg(windows)]
        let (uri, path) = ("file:///C:/work/space", r"C:\work\space");

        let params: InitializeParams = serde_json::from_value(serde_json::json!({
            "rootUri": uri,
            "rootPath": "/elsewhere"
        }))
        .unwrap();
        assert_eq!(params.workspace_root(), Some(PathBuf::from(path)));
    }

    #[test]
    fn workspace_root_falls_back_to_root_path() {
        let params: InitializeParams = serde_json::from_value(serde_json::json!({
            "rootUri": null,
            "rootPath": "/legacy/root"
        }))
        .unwrap();
        assert_eq!(params.workspace_root(), Some(PathBuf::from("/legacy/root")));
    }

    #[test]
    fn workspace_root_absent() {
        let params: InitializeParams = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(params.workspace_root().is_none());
    }

    #[test]
    fn did_change_takes_full_text() {
        let params: DidChangeTextDocumentParams = serde_json::from_value(serde_json::json!({
            "textDocument": { "uri": "file:///a.js", "version": 3 },
            "contentChanges": [{ "text": "var a;" }]
        }))
        .unwrap();
        assert_eq!(params.text_document.version, Some(3));
        assert_eq!(params.content_changes[0].text, "var a;");
    }

    #[test]
    fn publish_params_shape() {
        let diagnostics = [Diagnostic::new(
            DiagnosticSeverity::Error,
            "x".to_string(),
            Some("E1".to_string()),
            Position { line: 4, character: 2 },
        )];
        let json = serde_json::to_value(PublishDiagnosticsParams {
            uri: "file:///a.js",
            diagnostics: &diagnostics,
        })
        .unwrap();
        assert_eq!(json["uri"], "file:///a.js");
        assert_eq!(json["diagnostics"][0]["range"]["start"]["line"], 4);
        assert_eq!(json["diagnostics"][0]["severity"], 1);
    }

    #[test]
    fn show_message_shape() {
        let json =
            serde_json::to_value(ShowMessageParams::error("broken")).unwrap();
        assert_eq!(json, serde_json::json!({ "type": 1, "message": "broken" }));
    }

    #[test]
    fn file_uri_round_trips_to_path() {
        #[cfg(windows)]
        let path = PathBuf::from(r"C:\Users\test\src\app.js");
        #[cfg(not(windows))]
        let path = PathBuf::from("/home/test/src/app.js");

        let uri = url::Url::from_file_path(&path).expect("should create URI");
        assert_eq!(file_uri_to_path(uri.as_str()), Some(path));
    }

    #[test]
    fn non_file_uris_have_no_path() {
        assert!(file_uri_to_path("untitled:Untitled-1").is_none());
        assert!(file_uri_to_path("https://example.com/app.js").is_none());
        assert!(file_uri_to_path("not-a-uri").is_none());
    }
}
