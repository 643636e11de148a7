//! Loads a directory tree of task files into a graph of namespaced tasks,
//! resolves each task's declared inputs by injection, and registers the
//! tasks with a scheduler that composes them with their dependencies.
//!
//! The library entry point is [`import_tasks`]; the `ht` binary wraps it
//! in a command-line app (see [`run`]).

#[macro_use]
mod macros;

/// High-level command line app
mod app;
/// Definition of command-line args
mod args;
/// Collecting errors for a recap
mod errors;
/// Wrapping, composing and registering tasks
pub mod exec;
/// Loading task files from disk
pub mod scan;
/// Combined command-line and config run settings
mod settings;
/// Text UI
mod ui;

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Result;

use inject::{Config, Modules, Resolver};
use workflow::{Graph, TaskTree};

// exported for tests:
pub use app::App;
pub use args::Args;
pub use errors::Errors;
pub use settings::Settings;

pub use exec::{Host, HostApi, Registrar, Registration, Registry, Scheduler, Wrapper};
pub use scan::Scanner;

/// Scan `roots` for task files, build the task graph, and register every task with `host`.
pub fn import_tasks(roots: &[PathBuf], config: Config, host: &Host) -> Result<Registration> {
    let config = Rc::new(config);
    let tree = Scanner::new(config.clone()).tree(roots)?;
    register_tree(tree, config, host)
}

/// Like [`import_tasks`], for a tree that was assembled in code.
pub fn register_tree(tree: TaskTree, config: Rc<Config>, host: &Host) -> Result<Registration> {
    let graph = Graph::build(tree, &config.extensions)?;
    let loader = Rc::new(Modules::new(&config.modules_dir));
    Ok(register_graph(&graph, Resolver::new(config, loader), host))
}

/// Register every task in `graph`, resolving inputs with `resolver`.
pub fn register_graph(graph: &Graph, resolver: Resolver, host: &Host) -> Registration {
    let wrapper = Wrapper::new(resolver, host);
    Registrar::new(&wrapper).register(graph)
}

/// Run the command-line app.
pub fn run() -> Result<(), anyhow::Error> {
    use clap::Parser;
    let args = Args::parse();

    // INTERPRET SETTINGS ///////////////
    let settings: Settings = args.try_into()?;

    let log_level = match settings.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    simple_logging::log_to_stderr(log_level);

    // RUN THE THING /////////////////
    let app = App::new(settings);
    app.run()?;

    Ok(())
}
