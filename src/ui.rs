use colored::Colorize;

use util::Timer;
use workflow::{Dep, Graph};

use crate::settings::Settings;

/// All interactions with the text UI should go through this struct.
pub struct Ui {
    /// -v setting, displays extra text info to user
    pub verbose: bool,
    /// keeps track of time for each step
    timer: Timer,
}

impl Ui {
    pub fn new(settings: &Settings) -> Self {
        Self {
            verbose: settings.verbose > 0,
            timer: Timer::now(),
        }
    }

    pub fn start_timer(&mut self) {
        if self.verbose {
            self.timer.reset();
        }
    }

    pub fn print_elapsed(&self, step: &str) {
        if self.verbose {
            self.timer.print_elapsed(step);
        }
    }

    pub fn verbose_msg(&self, msg: &str) {
        if self.verbose {
            eprintln!("{}", msg);
        }
    }

    pub fn verbose_progress(&self, msg: &str) {
        if self.verbose {
            eprint!("{}... ", msg.magenta());
        }
    }

    pub fn verbose_progress_debug<T: std::fmt::Debug>(&self, msg: &str, arg: T) {
        if self.verbose {
            eprint!("{} {:?}... ", msg.magenta(), arg);
        }
    }

    pub fn done(&self) {
        if self.verbose {
            eprintln!("{}.", "done".green());
        }
    }

    /// Print every task in the graph with its dependencies.
    pub fn print_graph(&self, graph: &Graph) {
        for task in graph.iter() {
            let deps: Vec<String> = task.deps.iter().map(format_dep).collect();
            if deps.is_empty() {
                println!("{}", task.id.green());
            } else {
                println!("{} <- {}", task.id.green(), deps.join(", "));
            }
            if let Some(description) = &task.description {
                println!("    {description}");
            }
            if self.verbose {
                println!("    {}", task.path.display());
            }
        }
    }

    pub fn task_finished(&self, id: &str, ok: bool) {
        if ok {
            eprintln!("{} {id}", "COMPLETED".green());
        } else {
            eprintln!("{} {id}", "FAILED".red());
        }
    }
}

fn format_dep(dep: &Dep) -> String {
    match dep {
        Dep::Task(id) => id.clone(),
        Dep::Group(ids) => format!("[{}]", ids.join(" | ")),
    }
}
