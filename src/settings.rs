use std::path::PathBuf;

use anyhow::Result;

use inject::{Config, Injection};

use crate::args::Args;
use crate::exec::HostApi;

const DEFAULT_ROOT: &str = ".";
const DEFAULT_TASK: &str = "default";
const INJECT_DELIM: char = '=';

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid inject flag '{0}' (should be formatted 'NAME=SPECIFIER')")]
    InvalidInjectFlag(String),
    #[error("task root \"{0}\" does not exist")]
    RootNotFound(String),
}

/// Settings are like Args, except all the logic has
/// been applied so e.g. defaults are added in.
#[derive(Debug)]
pub struct Settings {
    pub roots: Vec<PathBuf>,
    pub tasks: Vec<String>,
    pub config: Config,
    pub api: HostApi,
    pub list: bool,
    pub verbose: u8,
}

impl TryFrom<Args> for Settings {
    type Error = anyhow::Error;
    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let mut roots = Vec::with_capacity(args.roots.len().max(1));
        if args.roots.is_empty() {
            roots.push(PathBuf::from(DEFAULT_ROOT).canonicalize()?);
        }
        for root in &args.roots {
            let root = PathBuf::from(root);
            if !root.exists() {
                return Err(Error::RootNotFound(root.display().to_string()).into());
            }
            roots.push(root.canonicalize()?);
        }

        let mut config = Config::default();
        config.debug = args.debug;
        config.task_dir = args.task_dir.map(PathBuf::from);
        for flag in &args.inject {
            let (name, specifier) = flag
                .split_once(INJECT_DELIM)
                .filter(|(name, spec)| !name.is_empty() && !spec.is_empty())
                .ok_or_else(|| Error::InvalidInjectFlag(flag.to_owned()))?;
            config.inject(name, Injection::Specifier(specifier.to_owned()));
        }

        let tasks = if args.tasks.is_empty() {
            vec![DEFAULT_TASK.to_owned()]
        } else {
            args.tasks
        };

        let api = if args.legacy {
            HostApi::Legacy
        } else {
            HostApi::Composing
        };

        Ok(Self {
            roots,
            tasks,
            config,
            api,
            list: args.list,
            verbose: args.verbose,
        })
    }
}
