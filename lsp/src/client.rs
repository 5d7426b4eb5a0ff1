//! Outgoing side of the editor channel.
//!
//! A single writer task owns stdout; everything else queues frames through a
//! [`Client`] handle so frames are written whole and in order.

use serde::Serialize;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;

use jshint_ls_types::Diagnostic;

use crate::codec::MessageWriter;
use crate::protocol::{
    Notification, Outgoing, PublishDiagnosticsParams, Response, ResponseError, ShowMessageParams,
};

const WRITER_CHANNEL_CAPACITY: usize = 64;

pub(crate) enum WriterCommand {
    Send(Outgoing),
    Shutdown,
}

/// Start the writer task. Returns the sending handle and the task.
pub(crate) fn spawn_writer<W>(writer: W) -> (Client, tokio::task::JoinHandle<()>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<WriterCommand>(WRITER_CHANNEL_CAPACITY);
    let handle = tokio::spawn(async move {
        let mut writer = MessageWriter::new(writer);
        while let Some(command) = rx.recv().await {
            match command {
                WriterCommand::Send(message) => {
                    if let Err(e) = writer.write_message(&message).await {
                        tracing::warn!("LSP write error: {e:#}");
                        break;
                    }
                }
                WriterCommand::Shutdown => break,
            }
        }
    });
    (Client { tx }, handle)
}

/// Cheap handle for queueing frames to the editor.
///
/// Send failures mean the writer is gone (stdout closed); they are logged
/// and otherwise ignored since the read loop will see the channel close.
#[derive(Clone)]
pub(crate) struct Client {
    tx: mpsc::Sender<WriterCommand>,
}

impl Client {
    #[cfg(test)]
    pub fn channel() -> (Self, mpsc::Receiver<WriterCommand>) {
        let (tx, rx) = mpsc::channel(WRITER_CHANNEL_CAPACITY);
        (Self { tx }, rx)
    }

    async fn send(&self, message: impl Into<Outgoing>) {
        if self.tx.send(WriterCommand::Send(message.into())).await.is_err() {
            tracing::warn!("LSP writer closed; dropping outgoing message");
        }
    }

    async fn notify(&self, method: &'static str, params: impl Serialize) {
        match serde_json::to_value(params) {
            Ok(params) => self.send(Notification::new(method, Some(params))).await,
            Err(e) => tracing::warn!("Failed to serialize {method} params: {e}"),
        }
    }

    pub async fn respond(&self, id: serde_json::Value, result: serde_json::Value) {
        self.send(Response::ok(id, result)).await;
    }

    pub async fn respond_error(&self, id: serde_json::Value, error: ResponseError) {
        self.send(Response::error(id, error)).await;
    }

    /// Replace every diagnostic previously published for `uri`.
    pub async fn publish_diagnostics(&self, uri: &str, diagnostics: &[Diagnostic]) {
        self.notify(
            "textDocument/publishDiagnostics",
            PublishDiagnosticsParams { uri, diagnostics },
        )
        .await;
    }

    pub async fn show_error_message(&self, message: &str) {
        tracing::warn!("{message}");
        self.notify("window/showMessage", ShowMessageParams::error(message))
            .await;
    }

    /// Ask the writer to stop after flushing what is already queued.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(WriterCommand::Shutdown).await;
    }
}
