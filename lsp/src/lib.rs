//! Language server that lints JavaScript documents with JSHint.
//!
//! [`serve`] speaks JSON-RPC over any byte stream pair. Linting goes through
//! the [`Loader`] / [`Checker`] pair; [`NodeLoader`] runs the real library
//! under node.

pub mod codec;

mod checker;
mod client;
mod documents;
mod protocol;
mod server;
mod validator;

pub use checker::{CheckError, Checker, LoadError, Loader, NodeJshint, NodeLoader, resolve_module};
pub use documents::TextDocument;
pub use jshint_ls_config::OptionsResolver;
pub use jshint_ls_types::{LintError, Options};
pub use server::{ExitStatus, serve};
