use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;

use anyhow::{Context, Result};
use futures::channel::oneshot;
use futures::FutureExt;
use log::{debug, info};

use inject::{Params, Value};
use util::env_case;
use workflow::{Outcome, TaskFn, WatchSpec};

use crate::exec::Host;

use super::Error;

/// Prefix of the environment variables inputs are exported as.
pub const ENV_PREFIX: &str = "HT_";

/// What a command body runs.
#[derive(Debug, Clone)]
pub enum Invocation {
    /// A command line, run with the system shell.
    Shell(String),
    /// A script file, run with `sh`.
    Script(PathBuf),
}

impl Invocation {
    fn command(&self) -> Command {
        match self {
            Self::Shell(line) => shell(line),
            Self::Script(path) => {
                let mut cmd = Command::new("sh");
                cmd.arg(path);
                cmd
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Shell(line) => line.clone(),
            Self::Script(path) => path.display().to_string(),
        }
    }
}

#[cfg(not(windows))]
fn shell(line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(line);
    cmd
}

#[cfg(windows)]
fn shell(line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(line);
    cmd
}

/// A body that runs `invocation` in `cwd`.
///
/// Each resolved input is passed to the child as `HT_<NAME>`,
/// e.g. input `outDir` as `HT_OUT_DIR`. Live values aren't passed.
/// The child is started when the body is called; the returned future
/// settles when it exits, so sibling commands run side by side.
/// A non-zero exit status fails the task.
pub fn command_body(invocation: Invocation, params: Params, cwd: &Path) -> TaskFn {
    let names = params.names().to_vec();
    let cwd = cwd.to_path_buf();
    TaskFn::new(params, move |args| {
        let mut cmd = invocation.command();
        cmd.current_dir(&cwd);
        for (name, value) in names.iter().zip(&args) {
            if let Some(text) = value.to_text() {
                cmd.env(format!("{ENV_PREFIX}{}", env_case(name)), text);
            }
        }
        let exit = run_cmd(&mut cmd, invocation.describe())?;
        Ok(Outcome::Future(exit.map(|result| result.map(|_| Value::Undefined)).boxed_local()))
    })
}

/// Spawn `cmd` and wait for it on a helper thread.
fn run_cmd(cmd: &mut Command, display: String) -> Result<impl Future<Output = Result<()>>> {
    info!("Running command: {display}");
    let mut child = cmd.spawn().with_context(|| {
        format!(
            "failed to execute child process {:?} {:?}",
            cmd.get_program(),
            cmd.get_args()
        )
    })?;

    let (sender, receiver) = oneshot::channel();
    thread::spawn(move || {
        // the receiver is gone only if the run was dropped.
        let _ = sender.send(child.wait());
    });

    Ok(async move {
        let status = receiver
            .await
            .context("child process waiter exited early")?
            .with_context(|| format!("failed waiting for {display}"))?;
        debug!("Process finished with {status}");
        if status.success() {
            Ok::<(), anyhow::Error>(())
        } else {
            Err(Error::CommandFailed(display, status).into())
        }
    })
}

/// A body that asks the host to watch `spec.source` and run `spec.tasks` on changes.
/// It never settles on its own.
pub fn watch_body(spec: WatchSpec) -> TaskFn {
    let source: Vec<String> = spec.source.patterns().into_iter().map(str::to_owned).collect();
    let tasks: Vec<String> = spec
        .tasks
        .iter()
        .flat_map(|dep| dep.ids())
        .map(str::to_owned)
        .collect();
    TaskFn::new(Params::from_names(["scheduler"]), move |args| {
        if let Some(host) = args.first().and_then(|v| v.downcast_ref::<Host>()) {
            host.watch(&source, &tasks)?;
        }
        Ok(Outcome::Pending)
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use futures::executor::block_on;
    use std::fs;
    use tempfile::tempdir;
    use workflow::{Dep, Source};

    /// Call `body` and wait for the command it started.
    fn finish(body: &TaskFn, args: Vec<Value>) -> Result<()> {
        match body.call(args)? {
            Outcome::Future(exit) => block_on(exit).map(|_| ()),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_env_inputs() -> Result<()> {
        let dir = tempdir()?;
        let params = Params::from_list("outDir, level, handle")?;
        let body = command_body(
            Invocation::Shell("echo \"$HT_OUT_DIR $HT_LEVEL ${HT_HANDLE-unset}\" > seen.txt".into()),
            params,
            dir.path(),
        );
        finish(&body, vec![Value::from("dist"), Value::Int(3), Value::live(5u8)])?;

        let seen = fs::read_to_string(dir.path().join("seen.txt"))?;
        assert_eq!("dist 3 unset", seen.trim());
        Ok(())
    }

    #[test]
    fn test_failing_command() {
        let dir = tempdir().unwrap();
        let body = command_body(Invocation::Shell("exit 3".into()), Params::none(), dir.path());
        let e = finish(&body, vec![]).unwrap_err();
        assert!(matches!(e.downcast_ref::<Error>(), Some(Error::CommandFailed(..))));
    }

    #[test]
    fn test_script() -> Result<()> {
        let dir = tempdir()?;
        let script = dir.path().join("make.sh");
        fs::write(&script, "touch \"$HT_NAME.out\"\n")?;
        let body = command_body(
            Invocation::Script(script),
            Params::from_names(["name"]),
            dir.path(),
        );
        finish(&body, vec![Value::from("artifact")])?;
        assert!(dir.path().join("artifact.out").exists());
        Ok(())
    }

    #[test]
    fn test_missing_program() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("gone.sh");
        let body = command_body(Invocation::Script(script), Params::none(), dir.path());
        let mut cmd = Command::new("/no/such/program");
        assert!(run_cmd(&mut cmd, "nothing".to_owned()).is_err());
        // `sh` itself exists, so a missing script only fails once it exits:
        assert!(finish(&body, vec![]).is_err());
    }

    #[test]
    fn test_children_overlap() -> Result<()> {
        let dir = tempdir()?;
        let sleeper = || command_body(Invocation::Shell("sleep 1".into()), Params::none(), dir.path());
        let (first, second) = (sleeper(), sleeper());

        let timer = util::Timer::now();
        let exits = match (first.call(vec![])?, second.call(vec![])?) {
            (Outcome::Future(a), Outcome::Future(b)) => futures::future::try_join(a, b),
            other => panic!("unexpected outcomes: {other:?}"),
        };
        block_on(exits)?;
        assert!(timer.elapsed() < std::time::Duration::from_millis(1800));
        Ok(())
    }

    #[test]
    fn test_watch_body() -> Result<()> {
        let body = watch_body(WatchSpec {
            source: Source::One("src/*.rs".into()),
            tasks: vec![Dep::from("build"), Dep::Group(vec!["lint".into(), "test".into()])],
        });
        assert_eq!(&["scheduler".to_owned()], body.params().names());
        // without a scheduler there's nothing to register with, but it still never settles:
        assert!(matches!(body.call(vec![Value::Undefined])?, Outcome::Pending));
        Ok(())
    }
}
