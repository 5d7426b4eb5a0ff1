//! Runs the checker over open documents and publishes the results.

use std::path::PathBuf;

use jshint_ls_config::{EditorOptions, OptionsResolver};
use jshint_ls_types::{Diagnostic, LintError, globals_of};

use crate::checker::{CheckError, Checker};
use crate::client::Client;
use crate::documents::TextDocument;
use crate::protocol;

/// Collects failure messages and sends each distinct one once.
#[derive(Debug, Default)]
pub(crate) struct ErrorMessageTracker {
    messages: Vec<String>,
}

impl ErrorMessageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, message: String) {
        if !self.messages.contains(&message) {
            self.messages.push(message);
        }
    }

    #[cfg(test)]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub async fn send_errors(self, client: &Client) {
        for message in &self.messages {
            client.show_error_message(message).await;
        }
    }
}

/// Turn the checker's raw list into diagnostics, skipping holes.
pub(crate) fn to_diagnostics(errors: &[Option<LintError>]) -> Vec<Diagnostic> {
    errors.iter().flatten().map(Diagnostic::from_lint).collect()
}

pub(crate) struct Validator<C> {
    checker: C,
    resolver: OptionsResolver,
    workspace_root: Option<PathBuf>,
    client: Client,
}

impl<C: Checker> Validator<C> {
    pub fn new(
        checker: C,
        resolver: OptionsResolver,
        workspace_root: Option<PathBuf>,
        client: Client,
    ) -> Self {
        Self {
            checker,
            resolver,
            workspace_root,
            client,
        }
    }

    /// Forget cached options; `editor` replaces the editor settings when given.
    pub fn clear_options(&mut self, editor: Option<EditorOptions>) {
        self.resolver.clear(editor);
    }

    /// Path whose options apply to `document`.
    ///
    /// Documents without a filesystem path use the workspace root.
    fn options_path(&self, document: &TextDocument) -> PathBuf {
        protocol::file_uri_to_path(document.uri())
            .or_else(|| self.workspace_root.clone())
            .unwrap_or_default()
    }

    /// Lint `document` and publish its complete diagnostic set.
    pub async fn validate(&mut self, document: &TextDocument) -> Result<(), CheckError> {
        let path = self.options_path(document);
        let resolution = self.resolver.get_options(&path);
        for error in &resolution.errors {
            self.client.show_error_message(&error.user_message()).await;
        }

        let options = resolution.options;
        let globals = globals_of(&options);
        let errors = self
            .checker
            .check(document.text(), &options, &globals)
            .await?;

        let diagnostics = to_diagnostics(&errors);
        tracing::debug!(
            uri = document.uri(),
            version = document.version(),
            count = diagnostics.len(),
            "Publishing diagnostics"
        );
        self.client
            .publish_diagnostics(document.uri(), &diagnostics)
            .await;
        Ok(())
    }

    /// Validate one document; a failure becomes a single error message.
    pub async fn validate_single(&mut self, document: &TextDocument) {
        if let Err(error) = self.validate(document).await {
            let message = failure_message(&error, document);
            self.client.show_error_message(&message).await;
        }
    }

    /// Validate every document, reporting each distinct failure once.
    pub async fn validate_all<'a>(&mut self, documents: impl IntoIterator<Item = &'a TextDocument>) {
        let mut tracker = ErrorMessageTracker::new();
        for document in documents {
            if let Err(error) = self.validate(document).await {
                tracker.add(failure_message(&error, document));
            }
        }
        tracker.send_errors(&self.client).await;
    }
}

fn failure_message(error: &CheckError, document: &TextDocument) -> String {
    error.message().unwrap_or_else(|| {
        let path = protocol::file_uri_to_path(document.uri());
        let shown = path
            .as_deref()
            .map_or_else(|| document.uri().to_string(), |p| p.display().to_string());
        format!("An unknown error occurred while validating file: {shown}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::WriterCommand;
    use jshint_ls_types::{DiagnosticSeverity, Options};
    use std::cell::RefCell;
    use tokio::sync::mpsc;

    /// Replays a canned outcome and records what it was asked to check.
    #[derive(Default)]
    struct FakeChecker {
        fail_with: Option<String>,
        errors: Vec<Option<LintError>>,
        seen: RefCell<Vec<(String, Options, Options)>>,
    }

    impl Checker for FakeChecker {
        async fn check(
            &self,
            source: &str,
            options: &Options,
            globals: &Options,
        ) -> Result<Vec<Option<LintError>>, CheckError> {
            self.seen
                .borrow_mut()
                .push((source.to_string(), options.clone(), globals.clone()));
            match &self.fail_with {
                Some(message) => Err(CheckError::Failed {
                    message: message.clone(),
                }),
                None => Ok(self.errors.clone()),
            }
        }
    }

    fn doc(uri: &str, text: &str) -> TextDocument {
        TextDocument::new(uri.to_string(), "javascript".to_string(), 1, text.to_string())
    }

    fn lint(line: i64, character: i64, id: &str) -> LintError {
        LintError {
            reason: Some("x".to_string()),
            line: Some(line),
            character: Some(character),
            code: Some(serde_json::json!("E1")),
            id: Some(id.to_string()),
        }
    }

    fn validator(checker: FakeChecker) -> (Validator<FakeChecker>, mpsc::Receiver<WriterCommand>) {
        let (client, rx) = Client::channel();
        let resolver = OptionsResolver::with_home(None);
        (Validator::new(checker, resolver, None, client), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<WriterCommand>) -> Vec<serde_json::Value> {
        let mut frames = Vec::new();
        while let Ok(command) = rx.try_recv() {
            if let WriterCommand::Send(message) = command {
                frames.push(serde_json::to_value(&message).unwrap());
            }
        }
        frames
    }

    #[test]
    fn holes_are_filtered() {
        let errors = vec![None, Some(lint(5, 3, "(error)")), None];
        let diagnostics = to_diagnostics(&errors);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line(), 4);
        assert_eq!(diagnostics[0].character(), 2);
        assert_eq!(diagnostics[0].severity(), DiagnosticSeverity::Error);
    }

    #[test]
    fn tracker_deduplicates_in_first_seen_order() {
        let mut tracker = ErrorMessageTracker::new();
        tracker.add("b".to_string());
        tracker.add("a".to_string());
        tracker.add("b".to_string());
        assert_eq!(tracker.messages(), ["b", "a"]);
    }

    #[tokio::test]
    async fn validate_publishes_replacement_set() {
        let checker = FakeChecker {
            errors: vec![None, Some(lint(5, 3, "(error)")), Some(lint(1, 1, "(warning)"))],
            ..FakeChecker::default()
        };
        let (mut validator, mut rx) = validator(checker);

        validator
            .validate(&doc("untitled:Untitled-1", "var a = 1"))
            .await
            .unwrap();

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        let params = &frames[0]["params"];
        assert_eq!(frames[0]["method"], "textDocument/publishDiagnostics");
        assert_eq!(params["uri"], "untitled:Untitled-1");
        let diagnostics = params["diagnostics"].as_array().unwrap();
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0]["severity"], 1);
        assert_eq!(diagnostics[0]["range"]["start"]["line"], 4);
        assert_eq!(diagnostics[1]["severity"], 2);
    }

    #[tokio::test]
    async fn globals_are_passed_separately() {
        let (mut validator, _rx) = validator(FakeChecker::default());
        let editor: Options = serde_json::from_value(serde_json::json!({
            "browser": true,
            "globals": { "jQuery": false }
        }))
        .unwrap();
        validator.clear_options(Some(EditorOptions::from_settings(editor)));

        validator.validate(&doc("untitled:a", "jQuery()")).await.unwrap();

        let seen = validator.checker.seen.borrow();
        let (source, options, globals) = &seen[0];
        assert_eq!(source, "jQuery()");
        assert_eq!(options["browser"], true);
        assert_eq!(globals["jQuery"], false);
    }

    #[tokio::test]
    async fn single_failure_shows_one_message_and_no_diagnostics() {
        let checker = FakeChecker {
            fail_with: Some("JSHINT exploded".to_string()),
            ..FakeChecker::default()
        };
        let (mut validator, mut rx) = validator(checker);

        validator.validate_single(&doc("untitled:a", "")).await;

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["method"], "window/showMessage");
        assert_eq!(frames[0]["params"]["message"], "JSHINT exploded");
    }

    #[tokio::test]
    async fn unknown_failure_names_the_file() {
        let checker = FakeChecker {
            fail_with: Some(String::new()),
            ..FakeChecker::default()
        };
        let (mut validator, mut rx) = validator(checker);

        validator.validate_single(&doc("untitled:scratch", "")).await;

        let frames = drain(&mut rx);
        assert_eq!(
            frames[0]["params"]["message"],
            "An unknown error occurred while validating file: untitled:scratch"
        );
    }

    #[tokio::test]
    async fn identical_batch_failures_reported_once() {
        let checker = FakeChecker {
            fail_with: Some("Cannot find module".to_string()),
            ..FakeChecker::default()
        };
        let (mut validator, mut rx) = validator(checker);
        let documents = [doc("untitled:a", ""), doc("untitled:b", "")];

        validator.validate_all(&documents).await;

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["params"]["message"], "Cannot find module");
        assert_eq!(validator.checker.seen.borrow().len(), 2);
    }

    #[tokio::test]
    async fn config_load_errors_are_shown() {
        let tmp = tempfile::TempDir::new().unwrap();
        let rc = tmp.path().join(".jshintrc");
        std::fs::write(&rc, "{ broken").unwrap();
        let file = tmp.path().join("app.js");
        let uri = url::Url::from_file_path(&file).unwrap();

        let (mut validator, mut rx) = validator(FakeChecker::default());
        validator.validate(&doc(uri.as_str(), "")).await.unwrap();

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["method"], "window/showMessage");
        let message = frames[0]["params"]["message"].as_str().unwrap();
        assert!(message.starts_with("Can't load JSHint configuration from file"));
        assert!(message.contains(".jshintrc"));
        assert_eq!(frames[1]["method"], "textDocument/publishDiagnostics");
    }

    #[test]
    fn uri_without_path_uses_workspace_root() {
        let (client, _rx) = Client::channel();
        let root = PathBuf::from("/workspace");
        let validator = Validator::new(
            FakeChecker::default(),
            OptionsResolver::with_home(None),
            Some(root.clone()),
            client,
        );
        assert_eq!(validator.options_path(&doc("untitled:a", "")), root);
    }
}
