use anyhow::Result;
use heron_tasks::{import_tasks, register_graph, register_tree, App, Args, Host, HostApi, Registry, Scheduler};
use inject::{Config, Injection, ModuleLoader, Modules, Resolver, Value};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tempfile::{tempdir, TempDir};
use workflow::{Dep, Done, Graph, Outcome, TaskDescriptor, TaskFn, TaskTree};

fn basic_args(root: &Path) -> Args {
    Args {
        tasks: Vec::with_capacity(0),
        roots: vec![root.to_str().unwrap().to_owned()],
        task_dir: None,
        inject: Vec::with_capacity(0),
        legacy: false,
        list: false,
        debug: true,
        verbose: 1,
    }
}

fn write(root: &Path, rel: &str, text: &str) -> Result<()> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(())
}

fn read(root: &Path, rel: &str) -> Result<String> {
    Ok(fs::read_to_string(root.join(rel))?.trim().to_owned())
}

/// A small project: two scripts, a namespace, and a default task.
fn project() -> Result<TempDir> {
    let dir = tempdir()?;
    write(dir.path(), "clean.sh", "rm -f log.txt\n")?;
    write(dir.path(), "build/compile.sh", "echo compile >> log.txt\n")?;
    write(dir.path(), "build/package.sh", "echo package >> log.txt\n")?;
    write(dir.path(), "default.json", r#"["clean", "build:*"]"#)?;
    Ok(dir)
}

fn new_host(api: HostApi) -> (Rc<Registry>, Host) {
    let registry = Rc::new(Registry::new(api));
    let host: Host = registry.clone();
    (registry, host)
}

fn noop_task(deps: &[&str]) -> TaskDescriptor {
    let deps = deps.iter().map(|&d| Dep::from(d)).collect();
    TaskDescriptor::new(".", ".", TaskFn::noop()).with_deps(deps)
}

#[test]
fn test_basic() -> Result<()> {
    simple_logging::log_to_stderr(log::LevelFilter::Trace);
    let dir = project()?;

    let settings = basic_args(dir.path()).try_into()?;
    App::new(settings).run()?;

    assert_eq!("compile\npackage", read(dir.path(), "log.txt")?);
    Ok(())
}

#[test]
fn test_named_tasks_in_order() -> Result<()> {
    let dir = project()?;
    let mut args = basic_args(dir.path());
    args.tasks = vec!["build:package".to_owned(), "build:compile".to_owned()];
    App::new(args.try_into()?).run()?;

    assert_eq!("package\ncompile", read(dir.path(), "log.txt")?);
    Ok(())
}

#[test]
fn test_legacy_host() -> Result<()> {
    let dir = project()?;
    let mut args = basic_args(dir.path());
    args.legacy = true;
    App::new(args.try_into()?).run()?;

    assert_eq!("compile\npackage", read(dir.path(), "log.txt")?);
    Ok(())
}

#[test]
fn test_list_runs_nothing() -> Result<()> {
    let dir = project()?;
    let mut args = basic_args(dir.path());
    args.list = true;
    App::new(args.try_into()?).run()?;

    assert!(!dir.path().join("log.txt").exists());
    Ok(())
}

#[test]
fn test_unknown_task_fails() -> Result<()> {
    let dir = project()?;
    let mut args = basic_args(dir.path());
    args.tasks = vec!["nope".to_owned()];
    assert!(App::new(args.try_into()?).run().is_err());
    Ok(())
}

#[test]
fn test_failing_task_stops_sequence() -> Result<()> {
    let dir = tempdir()?;
    write(dir.path(), "fail.sh", "exit 1\n")?;
    write(dir.path(), "after.sh", "touch after.txt\n")?;
    write(dir.path(), "default.json", r#"["fail", "after"]"#)?;

    assert!(App::new(basic_args(dir.path()).try_into()?).run().is_err());
    assert!(!dir.path().join("after.txt").exists());
    Ok(())
}

#[test]
fn test_bad_inject_flag() -> Result<()> {
    let dir = project()?;
    let mut args = basic_args(dir.path());
    args.inject = vec!["no-equals-sign".to_owned()];
    let settings: Result<heron_tasks::Settings> = args.try_into();
    assert!(settings.is_err());
    Ok(())
}

#[test]
fn test_inject_flag_and_modules() -> Result<()> {
    let dir = tempdir()?;
    write(dir.path(), "modules/greeting.json", r#""hello""#)?;
    write(dir.path(), "modules/farewell.toml", "text = 'bye'\n")?;
    write(
        dir.path(),
        "default.toml",
        "inputs = '(greeting, message)'\nrun = 'echo \"$HT_GREETING $HT_MESSAGE\" > out.txt'\n",
    )?;

    let mut args = basic_args(dir.path());
    args.inject = vec!["message=farewell".to_owned()];
    App::new(args.try_into()?).run()?;

    assert_eq!(r#"hello {"text":"bye"}"#, read(dir.path(), "out.txt")?);
    Ok(())
}

#[test]
fn test_script_default_input() -> Result<()> {
    let dir = tempdir()?;
    write(dir.path(), "default.sh", "# inputs: (size=10)\necho $HT_SIZE > size.txt\n")?;
    App::new(basic_args(dir.path()).try_into()?).run()?;

    assert_eq!("10", read(dir.path(), "size.txt")?);
    Ok(())
}

#[test]
fn test_task_dir() -> Result<()> {
    let dir = tempdir()?;
    write(dir.path(), "tasks/default.sh", "touch ran.txt\n")?;
    let mut args = basic_args(dir.path());
    args.task_dir = Some("tasks".to_owned());
    App::new(args.try_into()?).run()?;

    // tasks run in the root, not the task directory:
    assert!(dir.path().join("ran.txt").exists());
    Ok(())
}

#[test]
fn test_graph_from_tree() -> Result<()> {
    // a.sh has no deps; b/c.json depends on a.
    let dir = tempdir()?;
    write(dir.path(), "a.sh", "true\n")?;
    write(dir.path(), "b/c.json", r#"["a"]"#)?;

    let (registry, host) = new_host(HostApi::Composing);
    let registration = import_tasks(&[dir.path().to_path_buf()], Config::default(), &host)?;

    assert_eq!(vec!["a", "b:c"], registration.registered);
    assert_eq!(vec!["a", "b:c"], registry.ids());
    registry.run(&["b:c".to_owned()])?;
    Ok(())
}

#[test]
fn test_wildcard_siblings() -> Result<()> {
    let dir = tempdir()?;
    write(dir.path(), "build/a.json", "[]")?;
    write(dir.path(), "build/b.json", "[]")?;
    write(dir.path(), "all.json", r#"["build:*"]"#)?;

    let config = Rc::new(Config::default());
    let tree = heron_tasks::Scanner::new(config.clone()).tree(&[dir.path().to_path_buf()])?;
    let graph = Graph::build(tree, &config.extensions)?;

    assert_eq!(vec![Dep::from("build:a"), Dep::from("build:b")], graph.get("all").unwrap().deps);
    Ok(())
}

#[test]
fn test_group_runs_concurrently() -> Result<()> {
    let dir = tempdir()?;
    write(dir.path(), "s1.sh", "sleep 1\n")?;
    write(dir.path(), "s2.toml", "run = 'sleep 1'\n")?;
    write(dir.path(), "both.json", r#"[["s1", "s2"]]"#)?;

    let (registry, host) = new_host(HostApi::Composing);
    import_tasks(&[dir.path().to_path_buf()], Config::default(), &host)?;

    let start = Instant::now();
    registry.run(&["both".to_owned()])?;
    assert!(start.elapsed() < Duration::from_millis(1800));
    Ok(())
}

#[test]
fn test_registrar_passes() -> Result<()> {
    let dir = tempdir()?;
    write(dir.path(), "x.json", r#"["y"]"#)?;
    write(dir.path(), "y.json", "[]")?;

    let (_registry, host) = new_host(HostApi::Composing);
    let registration = import_tasks(&[dir.path().to_path_buf()], Config::default(), &host)?;

    assert_eq!(vec!["y", "x"], registration.registered);
    assert_eq!(2, registration.passes);
    Ok(())
}

#[test]
fn test_registrar_terminates() -> Result<()> {
    let mut tree = TaskTree::new();
    tree.insert_at(&["p"], noop_task(&["q"]));
    tree.insert_at(&["q"], noop_task(&["p"]));

    let (registry, host) = new_host(HostApi::Composing);
    let registration = register_tree(tree, Rc::new(Config::default()), &host)?;

    assert!(registration.registered.is_empty());
    assert_eq!(2, registration.stalled.len());
    assert!(registry.is_empty());
    Ok(())
}

/// Counts module loads; never finds anything.
struct CountingLoader(Rc<Cell<usize>>);

impl ModuleLoader for CountingLoader {
    fn load(&self, specifier: &str, _base: &Path) -> Result<Value> {
        self.0.set(self.0.get() + 1);
        Err(anyhow::anyhow!("no module {specifier}"))
    }
}

#[test]
fn test_injected_inputs_need_no_modules() -> Result<()> {
    let (registry, host) = new_host(HostApi::Composing);
    let loads = Rc::new(Cell::new(0));
    let resolver = Resolver::new(
        Rc::new(Config::default()),
        Rc::new(CountingLoader(loads.clone())),
    );

    let saw_host = Rc::new(Cell::new(false));
    let seen = saw_host.clone();
    let body = TaskFn::with_signature("(scheduler, done)", move |args| {
        seen.set(args[0].downcast_ref::<Host>().is_some());
        args[1].downcast_ref::<Done>().unwrap().complete();
        Ok(Outcome::Pending)
    })?;
    let mut tree = TaskTree::new();
    tree.insert_at(&["t"], TaskDescriptor::new(".", ".", body));
    let graph = Graph::build(tree, &[])?;

    let registration = register_graph(&graph, resolver, &host);
    assert_eq!(vec!["t"], registration.registered);
    registry.run(&["t".to_owned()])?;

    assert!(saw_host.get());
    assert_eq!(0, loads.get());
    Ok(())
}

#[test]
fn test_config_injection() -> Result<()> {
    let (registry, host) = new_host(HostApi::Composing);
    let mut config = Config::default();
    config.inject("answer", Injection::Value(Value::Int(42)));

    let got = Rc::new(Cell::new(0));
    let out = got.clone();
    let body = TaskFn::with_signature("(answer)", move |args| {
        if let Value::Int(n) = args[0] {
            out.set(n);
        }
        Ok(Outcome::Value(Value::Undefined))
    })?;
    let mut tree = TaskTree::new();
    tree.insert_at(&["t"], TaskDescriptor::new(".", ".", body));

    register_tree(tree, Rc::new(config), &host)?;
    registry.run(&["t".to_owned()])?;
    assert_eq!(42, got.get());
    Ok(())
}

#[test]
fn test_completion_guard() -> Result<()> {
    let (registry, host) = new_host(HostApi::Composing);
    let runs = Rc::new(Cell::new(0));
    let counter = runs.clone();

    let twice = TaskFn::with_signature("(done)", |args| {
        let done = args[0].downcast_ref::<Done>().unwrap();
        done.complete();
        done.complete();
        Ok(Outcome::Value(Value::Undefined))
    })?;
    let downstream = TaskFn::with_signature("()", move |_| {
        counter.set(counter.get() + 1);
        Ok(Outcome::Value(Value::Undefined))
    })?;

    let mut tree = TaskTree::new();
    tree.insert_at(&["twice"], TaskDescriptor::new(".", ".", twice));
    tree.insert_at(
        &["downstream"],
        TaskDescriptor::new(".", ".", downstream).with_deps(vec!["twice".into()]),
    );
    register_tree(tree, Rc::new(Config::default()), &host)?;

    registry.run(&["downstream".to_owned()])?;
    assert_eq!(1, runs.get());
    Ok(())
}

#[test]
fn test_never_completes() -> Result<()> {
    use futures::FutureExt;

    let (registry, host) = new_host(HostApi::Composing);
    let body = TaskFn::with_signature("(done)", |_| Ok(Outcome::Pending))?;
    let mut tree = TaskTree::new();
    tree.insert_at(&["stuck"], TaskDescriptor::new(".", ".", body));
    register_tree(tree, Rc::new(Config::default()), &host)?;

    let run = registry.lookup("stuck").unwrap();
    assert!(run().now_or_never().is_none());
    Ok(())
}

#[test]
fn test_watch_is_recorded() -> Result<()> {
    let dir = tempdir()?;
    write(dir.path(), "build.json", "[]")?;
    write(
        dir.path(),
        "watch.toml",
        "[watch]\nsource = ['src/**/*.rs', 'Cargo.toml']\ntasks = ['build']\n",
    )?;

    let (registry, host) = new_host(HostApi::Composing);
    import_tasks(&[dir.path().to_path_buf()], Config::default(), &host)?;

    use futures::FutureExt;
    let watch = registry.lookup("watch").unwrap();
    assert!(watch().now_or_never().is_none());

    let watches = registry.watches();
    assert_eq!(1, watches.len());
    assert_eq!(vec!["src/**/*.rs", "Cargo.toml"], watches[0].source);
    assert_eq!(vec!["build"], watches[0].tasks);
    Ok(())
}

#[test]
fn test_modules_provider() -> Result<()> {
    let (registry, host) = new_host(HostApi::Composing);
    let config = Rc::new(Config::default());
    let mut modules = Modules::new(&config.modules_dir);
    modules.provide("ht-version", |_| Ok(Value::from("1.2.3")));

    let got = Rc::new(std::cell::RefCell::new(String::new()));
    let out = got.clone();
    let body = TaskFn::with_signature("(version)", move |args| {
        *out.borrow_mut() = args[0].as_str().unwrap_or_default().to_owned();
        Ok(Outcome::Value(Value::Undefined))
    })?;
    let mut tree = TaskTree::new();
    tree.insert_at(&["t"], TaskDescriptor::new(PathBuf::from("."), ".", body));
    let graph = Graph::build(tree, &config.extensions)?;

    register_graph(&graph, Resolver::new(config, Rc::new(modules)), &host);
    registry.run(&["t".to_owned()])?;
    assert_eq!("1.2.3", *got.borrow());
    Ok(())
}
