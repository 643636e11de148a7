//! Resolves the declared inputs of a task to runtime values.
//!
//! A task declares its inputs by name (see [`Params`]). For each name the
//! [`Resolver`] tries a fixed sequence of [`Strategy`]s; the first one that
//! produces a value wins. If none does, the declared default is used, and if
//! there is no default either, resolution of the whole task fails with
//! [`Error::NoProvider`].

/// Runtime values handed to task bodies
mod value;
pub use value::Value;

/// Declared inputs and their default values
mod params;
pub use params::{DefaultValue, Params};

/// Read-only configuration shared by the scanner, resolver and runner
mod config;
pub use config::Config;

/// Loading modules by specifier
mod module;
pub use module::{ModuleLoader, Modules, Provider};

/// The strategy chain
mod resolver;
pub use resolver::{Injection, Injections, ModuleGetter, Resolver, Scope, Strategy, TaskLog, TaskPaths};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No provider for input '{0}'; is a module for it installed?")]
    NoProvider(String),
    #[error("Module '{0}' not found (searched from {1})")]
    ModuleNotFound(String, String),
    #[error("Invalid input declaration \"{0}\"")]
    InvalidDeclaration(String),
}
