use std::rc::{Rc, Weak};

use anyhow::{Context, Result};
use futures::future::{FutureExt, LocalBoxFuture};
use futures::TryStreamExt;
use log::{info, warn};

use inject::{Injections, Resolver, Scope, Value};
use util::Timer;
use workflow::{Dep, Done, Outcome, TaskDescriptor};

use super::{Error, Host, Runnable, Scheduler, Step};

/// Wraps task descriptors into runnables and registers them with a host.
///
/// Each run of a wrapped task resolves the body's inputs, with `scheduler`
/// and `done` injected, and calls the body. If the body asked for `done`,
/// only `done` settles the run; otherwise the run settles with whatever the
/// body returned (see [`Outcome`]).
pub struct Wrapper {
    resolver: Rc<Resolver>,
    host: Weak<dyn Scheduler>,
}

impl Wrapper {
    pub fn new(resolver: Resolver, host: &Host) -> Self {
        Self {
            resolver: Rc::new(resolver),
            host: Rc::downgrade(host),
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Wrap `task` and register it under its id.
    ///
    /// Fails with an [`inject::Error`] if the body's inputs can't be resolved,
    /// or with [`Error::UnknownTask`] if a dependency isn't registered yet.
    pub fn register(&self, task: &TaskDescriptor) -> Result<()> {
        let host = self.host(&task.id)?;
        self.preflight(task, &host)?;

        let body = self.body(task);
        let runnable = if task.deps.is_empty() {
            body
        } else if let Some(composer) = host.composer() {
            let mut steps = Vec::with_capacity(task.deps.len() + 1);
            for dep in &task.deps {
                steps.push(match dep {
                    Dep::Task(id) => Step::Id(id.clone()),
                    Dep::Group(ids) => {
                        Step::Run(composer.concurrent(ids.iter().cloned().map(Step::Id).collect())?)
                    }
                });
            }
            steps.push(Step::Run(body));
            composer.sequence(steps)?
        } else {
            self.sequential(task, body)
        };

        host.register(&task.id, &display_name(task), runnable);
        Ok(())
    }

    /// Resolve inputs once at registration, so a task that can never run
    /// is reported now instead of when it's first started.
    fn preflight(&self, task: &TaskDescriptor, host: &Host) -> Result<()> {
        let (done, _completion) = Done::channel();
        let scope = scope(task, host.clone(), done);
        self.resolver
            .injection(task.body.params(), &scope)
            .with_context(|| format!("while resolving inputs of task \"{}\"", task.id))?;
        Ok(())
    }

    fn host(&self, id: &str) -> Result<Host, Error> {
        self.host.upgrade().ok_or_else(|| Error::HostGone(id.to_owned()))
    }

    fn body(&self, task: &TaskDescriptor) -> Runnable {
        let resolver = self.resolver.clone();
        let host = self.host.clone();
        let task = Rc::new(task.clone());
        Rc::new(move || invoke(resolver.clone(), host.clone(), task.clone()))
    }

    /// Without a composer: run every dependency one at a time, looked up
    /// when the task starts, then the body.
    fn sequential(&self, task: &TaskDescriptor, body: Runnable) -> Runnable {
        let host = self.host.clone();
        let deps: Vec<String> = task
            .deps
            .iter()
            .flat_map(|dep| dep.ids())
            .map(str::to_owned)
            .collect();
        Rc::new(move || {
            let host = host.clone();
            let deps = deps.clone();
            let body = body.clone();
            async move {
                for id in &deps {
                    let dep = host
                        .upgrade()
                        .ok_or_else(|| Error::HostGone(id.clone()))?
                        .lookup(id)
                        .ok_or_else(|| Error::UnknownTask(id.clone()))?;
                    dep().await?;
                }
                body().await
            }
            .boxed_local()
        })
    }
}

fn display_name(task: &TaskDescriptor) -> String {
    task.name
        .as_deref()
        .or(task.body.display_name())
        .unwrap_or(&task.id)
        .to_owned()
}

fn scope(task: &TaskDescriptor, host: Host, done: Done) -> Scope {
    let inject = Injections::default()
        .with("scheduler", Value::live(host))
        .with("done", Value::live(done));
    Scope::new(&task.id, &task.cwd, &task.path).with_inject(inject)
}

/// What calling the body left us to wait for.
enum Call {
    /// The body was handed `done`; only `done` settles success.
    Direct(Outcome),
    Returned(Outcome),
}

fn call(resolver: &Resolver, host: Host, task: &TaskDescriptor, done: &Done) -> Result<Call> {
    let scope = scope(task, host, done.clone());
    let args = resolver.injection(task.body.params(), &scope)?;
    let direct = args
        .iter()
        .any(|arg| arg.downcast_ref::<Done>().is_some_and(|d| d.same(done)));
    let outcome = task.body.call(args)?;
    Ok(if direct {
        Call::Direct(outcome)
    } else {
        Call::Returned(outcome)
    })
}

fn invoke(
    resolver: Rc<Resolver>,
    host: Weak<dyn Scheduler>,
    task: Rc<TaskDescriptor>,
) -> LocalBoxFuture<'static, Result<()>> {
    async move {
        let label = display_name(&task);
        let timer = Timer::now();
        info!("Starting '{label}'");

        let (done, completion) = Done::channel();
        let called = match host.upgrade() {
            Some(host) => call(&resolver, host, &task, &done),
            None => Err(Error::HostGone(task.id.clone()).into()),
        };
        match called {
            Err(e) => {
                done.fail(e);
            }
            Ok(Call::Direct(outcome)) => drive(outcome, &done).await,
            Ok(Call::Returned(outcome)) => settle(outcome, &done).await,
        }
        // the body may still hold clones of `done`; this one isn't needed.
        drop(done);

        let result = completion.await;
        match &result {
            Ok(()) => info!("Finished '{label}' after {:?}", timer.elapsed()),
            Err(e) => warn!("'{label}' errored after {:?}: {e:#}", timer.elapsed()),
        }
        result
    }
    .boxed_local()
}

/// Run whatever work a direct-call body returned to its end.
/// Its errors fail `done`; its success is ignored.
async fn drive(outcome: Outcome, done: &Done) {
    let result = match outcome {
        Outcome::Pending | Outcome::Value(_) => return,
        Outcome::Future(future) => future.await.map(|_| ()),
        Outcome::Stream(stream) => stream.try_for_each(|_| futures::future::ok(())).await,
    };
    if let Err(e) = result {
        done.fail(e);
    }
}

async fn settle(outcome: Outcome, done: &Done) {
    match outcome {
        // nothing will settle `done`; the run stays pending.
        Outcome::Pending => (),
        Outcome::Value(_) => {
            done.complete();
        }
        Outcome::Future(future) => {
            done.settle(future.await.map(|_| ()));
        }
        Outcome::Stream(stream) => {
            done.settle(stream.try_for_each(|_| futures::future::ok(())).await);
        }
    }
}
