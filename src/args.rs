use clap::Parser;

const CMD_NAME: &str = "ht";

/// Stores our command-line args format.
#[derive(Parser, Debug)]
#[command(name = CMD_NAME, version, about = None, long_about = None)]
pub struct Args {
    /// Tasks to run, in order [default: default]
    #[arg(value_name = "TASK")]
    pub tasks: Vec<String>,

    /// Directory to load tasks from; may be repeated [default: .]
    #[arg(short, long = "root", value_name = "DIR")]
    #[arg(env = "HERON_TASKS_ROOT")]
    pub roots: Vec<String>,

    /// Sub-directory of each root that holds the task files
    #[arg(short = 'd', long, value_name = "DIR")]
    #[arg(env = "HERON_TASKS_TASK_DIR")]
    pub task_dir: Option<String>,

    /// Provide an input to every task by module specifier
    #[arg(short, long, value_name = "NAME=SPECIFIER")]
    pub inject: Vec<String>,

    /// Run dependencies one at a time instead of composing them
    #[arg(long)]
    pub legacy: bool,

    /// Print the task graph and exit
    #[arg(short, long)]
    pub list: bool,

    /// Log details about scanning and registering tasks
    #[arg(long)]
    pub debug: bool,

    /// Print additional debugging info (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
