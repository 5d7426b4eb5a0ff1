//! Server loop: reads editor messages one at a time and handles each fully
//! before reading the next.

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};

use jshint_ls_config::{EditorOptions, OptionsResolver};

use crate::checker::Loader;
use crate::client::{Client, spawn_writer};
use crate::codec::MessageReader;
use crate::documents::{TextDocument, TextDocuments};
use crate::protocol::{
    self, DidChangeConfigurationParams, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, INVALID_PARAMS, INVALID_REQUEST, Incoming, InitializeParams,
    LIBRARY_LOAD_FAILED, METHOD_NOT_FOUND, ResponseError, SERVER_NOT_INITIALIZED,
};
use crate::validator::Validator;

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// `exit` (or EOF) after a `shutdown` request.
    Clean,
    /// The editor went away without asking for `shutdown` first.
    Abrupt,
}

impl ExitStatus {
    fn after(shutdown_requested: bool) -> Self {
        if shutdown_requested {
            Self::Clean
        } else {
            Self::Abrupt
        }
    }

    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Clean => 0,
            Self::Abrupt => 1,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Serve one editor session over `reader` / `writer`.
///
/// `loader` produces the checker during `initialize`; `resolver` is the
/// options resolver the session will own.
pub async fn serve<R, W, L>(
    reader: R,
    writer: W,
    loader: L,
    resolver: OptionsResolver,
) -> Result<ExitStatus>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    L: Loader,
{
    let (client, writer_handle) = spawn_writer(writer);
    let mut server = Server::new(loader, resolver, client.clone());
    let mut reader = MessageReader::new(reader);

    let result = loop {
        match reader.read_message().await {
            Ok(Some(message)) => {
                if server.handle_message(message).await == Flow::Exit {
                    break Ok(ExitStatus::after(server.shutdown_requested));
                }
            }
            Ok(None) => {
                tracing::info!("Editor closed the channel");
                break Ok(ExitStatus::after(server.shutdown_requested));
            }
            Err(e) => break Err(e.context("reading from editor")),
        }
    };

    client.shutdown().await;
    if let Err(e) = writer_handle.await {
        tracing::warn!("LSP writer task failed: {e}");
    }
    result
}

pub(crate) struct Server<L: Loader> {
    loader: L,
    client: Client,
    documents: TextDocuments,
    /// Held until `initialize` succeeds, then moved into the validator.
    resolver: Option<OptionsResolver>,
    validator: Option<Validator<L::Checker>>,
    shutdown_requested: bool,
}

impl<L: Loader> Server<L> {
    pub fn new(loader: L, resolver: OptionsResolver, client: Client) -> Self {
        Self {
            loader,
            client,
            documents: TextDocuments::new(),
            resolver: Some(resolver),
            validator: None,
            shutdown_requested: false,
        }
    }

    async fn handle_message(&mut self, message: Incoming) -> Flow {
        match message {
            Incoming::Request { id, method, params } => {
                self.handle_request(id, &method, params).await;
                Flow::Continue
            }
            Incoming::Notification { method, params } => {
                self.handle_notification(&method, params).await
            }
            Incoming::Response { id } => {
                tracing::trace!("Ignoring response to request {id}");
                Flow::Continue
            }
        }
    }

    async fn handle_request(&mut self, id: Value, method: &str, params: Option<Value>) {
        if self.shutdown_requested {
            let error = ResponseError::new(INVALID_REQUEST, "server is shutting down");
            self.client.respond_error(id, error).await;
            return;
        }

        match method {
            "initialize" => self.initialize(id, params).await,
            "shutdown" => {
                tracing::info!("Shutdown requested");
                self.shutdown_requested = true;
                self.client.respond(id, Value::Null).await;
            }
            _ if self.validator.is_none() => {
                let error = ResponseError::new(SERVER_NOT_INITIALIZED, "server not initialized");
                self.client.respond_error(id, error).await;
            }
            _ => {
                tracing::debug!("Unsupported request: {method}");
                let error =
                    ResponseError::new(METHOD_NOT_FOUND, format!("Method not found: {method}"));
                self.client.respond_error(id, error).await;
            }
        }
    }

    async fn initialize(&mut self, id: Value, params: Option<Value>) {
        if self.validator.is_some() {
            let error = ResponseError::new(INVALID_REQUEST, "server already initialized");
            self.client.respond_error(id, error).await;
            return;
        }

        let params: InitializeParams = match params.map(serde_json::from_value).transpose() {
            Ok(params) => params.unwrap_or_default(),
            Err(e) => {
                let error =
                    ResponseError::new(INVALID_PARAMS, format!("invalid initialize params: {e}"));
                self.client.respond_error(id, error).await;
                return;
            }
        };

        let root = params.workspace_root();
        tracing::info!(root = ?root, "Initializing");

        match self.loader.load(root.as_deref()).await {
            Ok(checker) => {
                let mut resolver = self.resolver.take().unwrap_or_default();
                if let Some(editor) = params
                    .initialization_options
                    .as_ref()
                    .and_then(|init| init.get("options"))
                    .and_then(editor_options)
                {
                    resolver.clear(Some(editor));
                }
                self.validator = Some(Validator::new(checker, resolver, root, self.client.clone()));
                self.client.respond(id, protocol::initialize_result()).await;
            }
            Err(error) => {
                tracing::warn!("Failed to load linter library: {error}");
                let error = ResponseError::new(LIBRARY_LOAD_FAILED, error.to_string())
                    .with_data(serde_json::json!({ "retry": error.is_retryable() }));
                self.client.respond_error(id, error).await;
            }
        }
    }

    async fn handle_notification(&mut self, method: &str, params: Option<Value>) -> Flow {
        match method {
            "exit" => return Flow::Exit,
            "initialized" => {
                tracing::debug!("Editor finished initialization");
                return Flow::Continue;
            }
            _ => {}
        }

        let Some(validator) = self.validator.as_mut() else {
            tracing::debug!("Dropping {method} received before initialize");
            return Flow::Continue;
        };

        match method {
            "textDocument/didOpen" => {
                let Some(params) = parse_params::<DidOpenTextDocumentParams>(method, params)
                else {
                    return Flow::Continue;
                };
                let item = params.text_document;
                let document = self.documents.open(TextDocument::new(
                    item.uri,
                    item.language_id,
                    item.version,
                    item.text,
                ));
                tracing::debug!(
                    uri = document.uri(),
                    language = document.language_id(),
                    "Opened document"
                );
                validator.validate_single(document).await;
            }
            "textDocument/didChange" => {
                let Some(mut params) = parse_params::<DidChangeTextDocumentParams>(method, params)
                else {
                    return Flow::Continue;
                };
                let Some(change) = params.content_changes.pop() else {
                    return Flow::Continue;
                };
                let uri = params.text_document.uri;
                match self
                    .documents
                    .change(&uri, params.text_document.version, change.text)
                {
                    Some(document) => validator.validate_single(document).await,
                    None => tracing::debug!("Change for unopened document {uri}"),
                }
            }
            "textDocument/didClose" => {
                if let Some(params) = parse_params::<DidCloseTextDocumentParams>(method, params) {
                    self.documents.close(&params.text_document.uri);
                }
            }
            "workspace/didChangeConfiguration" => {
                let params = parse_params::<DidChangeConfigurationParams>(method, params)
                    .unwrap_or_default();
                validator.clear_options(settings_editor_options(&params.settings));
                tracing::info!(
                    documents = self.documents.len(),
                    "Settings changed; revalidating"
                );
                validator.validate_all(self.documents.all()).await;
            }
            "workspace/didChangeWatchedFiles" => {
                validator.clear_options(None);
                tracing::info!(
                    documents = self.documents.len(),
                    "Watched files changed; revalidating"
                );
                validator.validate_all(self.documents.all()).await;
            }
            _ => tracing::trace!("Ignoring notification: {method}"),
        }
        Flow::Continue
    }
}

fn parse_params<T: DeserializeOwned>(method: &str, params: Option<Value>) -> Option<T> {
    match serde_json::from_value(params.unwrap_or(Value::Null)) {
        Ok(params) => Some(params),
        Err(e) => {
            tracing::warn!("Invalid {method} params: {e}");
            None
        }
    }
}

fn editor_options(options: &Value) -> Option<EditorOptions> {
    options
        .as_object()
        .map(|options| EditorOptions::from_settings(options.clone()))
}

/// Editor options from a `{ jshint: { options } }` settings payload.
///
/// No `jshint` section resets to empty options; a section without an
/// `options` object leaves the current ones in place.
fn settings_editor_options(settings: &Value) -> Option<EditorOptions> {
    match settings.get("jshint") {
        None | Some(Value::Null) => Some(EditorOptions::default()),
        Some(jshint) => jshint.get("options").and_then(editor_options),
    }
}
