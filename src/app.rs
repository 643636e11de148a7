use std::rc::Rc;

use anyhow::{Context, Result};
use colored::Colorize;

use inject::{Config, Modules, Resolver};
use workflow::Graph;

use crate::exec::{Host, Registration, Registry};
use crate::scan::Scanner;
use crate::settings::Settings;
use crate::ui::Ui;

/// This struct actually runs the command-line app.
pub struct App {
    /// Interpreted command line settings
    settings: Settings,
    /// User interface
    ui: Ui,
}

impl App {
    /// Create a new `App`.
    pub fn new(settings: Settings) -> Self {
        let ui = Ui::new(&settings);
        Self { settings, ui }
    }

    /// Run the app: load the task graph, then either list it or run the requested tasks.
    pub fn run(mut self) -> Result<()> {
        let config = Rc::new(std::mem::take(&mut self.settings.config));
        let graph = self.load_graph(&config)?;

        if self.settings.list {
            self.ui.print_graph(&graph);
            return Ok(());
        }

        let registry = Rc::new(Registry::new(self.settings.api));
        let registration = self.register(&graph, config, &registry);

        if !registration.is_complete() {
            let errors = registration.errors();
            if let Err(e) = errors.print_recap("registering tasks") {
                log::warn!("{e}");
            }
        }

        self.run_tasks(&registry)
    }

    fn load_graph(&mut self, config: &Rc<Config>) -> Result<Graph> {
        self.ui.verbose_progress_debug("Loading tasks from", &self.settings.roots);
        self.ui.start_timer();
        let tree = Scanner::new(config.clone())
            .tree(&self.settings.roots)
            .context("while scanning task roots")?;
        let graph = Graph::build(tree, &config.extensions)?;
        self.ui.done();
        self.ui.print_elapsed("Loading tasks");
        self.ui.verbose_msg(&format!("Found {} tasks.", graph.len()));
        Ok(graph)
    }

    fn register(&mut self, graph: &Graph, config: Rc<Config>, registry: &Rc<Registry>) -> Registration {
        self.ui.verbose_progress("Registering tasks");
        self.ui.start_timer();
        let host: Host = registry.clone();
        let loader = Rc::new(Modules::new(&config.modules_dir));
        let registration = crate::register_graph(graph, Resolver::new(config, loader), &host);
        self.ui.done();
        self.ui.print_elapsed("Registering tasks");
        self.ui.verbose_msg(&format!(
            "Registered {} of {} tasks in {} passes.",
            registration.registered.len(),
            graph.len(),
            registration.passes,
        ));
        registration
    }

    fn run_tasks(self, registry: &Registry) -> Result<()> {
        let App { settings, mut ui } = self;
        ui.start_timer();
        let ui = Rc::new(ui);
        let hook_ui = ui.clone();
        registry.on_complete(move |id, result| hook_ui.task_finished(id, result.is_ok()));

        eprintln!("{} {}\n", "RUN".green(), settings.tasks.join(", "));
        registry
            .run(&settings.tasks)
            .context("while running tasks")?;
        ui.print_elapsed("Running tasks");

        for watch in registry.watches() {
            ui.verbose_msg(&format!(
                "Watch registered: {} -> {}",
                watch.source.join(", "),
                watch.tasks.join(", ")
            ));
        }
        eprintln!("{}", "Completed all tasks.".green());
        Ok(())
    }
}
