use crate::compare::Value;
use crate::subject::{Callable, Registry};
use crate::{t, t_args};
use anyhow::{Context, Result, anyhow};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;
use wait_timeout::ChildExt;

/// 30 sekund per kall
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_LIST_ARG: &str = "--list-methods";

/// A subject implemented by an external program.
///
/// `<command> [args..] <method>` is run once per call with the case input on
/// stdin; whatever it prints on stdout is the result.
#[derive(Debug, Clone)]
pub struct ProcessSubject {
    pub command: PathBuf,
    pub args: Vec<String>,
    /// Known method names. When `None` the program is asked with `list_arg`.
    pub methods: Option<Vec<String>>,
    pub list_arg: String,
    /// Argument for the one-off initialization run, if the program has one
    pub init_arg: Option<String>,
    pub timeout: Option<Duration>,
    pub quiet: bool, // demp stderr frå programmet når true
}

impl ProcessSubject {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            methods: None,
            list_arg: DEFAULT_LIST_ARG.to_string(),
            init_arg: None,
            timeout: Some(DEFAULT_TIMEOUT),
            quiet: false,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args);
        cmd
    }

    /// Runs the program with `arg`, feeding `input` on stdin.
    pub fn run(&self, arg: &str, input: &str) -> Result<Vec<u8>> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);

        let mut cmd = self.command();
        cmd.arg(arg)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| t_args!("subject-failed-to-start", "cmd" => self.command.display()))?;

        // All three pipes are serviced off this thread, so the timeout starts
        // counting even when the program never reads its input.
        let (writer, stdout, stderr) = match spawn_pipes(&mut child, input) {
            Ok(handles) => handles,
            Err(e) => {
                reap(&mut child);
                return Err(e);
            }
        };

        let status = match child.wait_timeout(timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                reap(&mut child);
                // The pipe threads are left to finish on their own: a
                // grandchild may still hold the pipes open.
                return Err(anyhow!(t_args!("subject-timeout",
                    "method" => arg,
                    "seconds" => timeout.as_secs_f64()
                )));
            }
            Err(e) => {
                reap(&mut child);
                return Err(e.into());
            }
        };

        join_writer(writer)?;
        let out = join_reader(stdout)?;
        let err = join_reader(stderr)?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&err);
            return Err(anyhow!(t_args!("subject-exit-status",
                "method" => arg,
                "status" => status,
                "stderr" => stderr.trim_end()
            )));
        }
        if !self.quiet && !err.is_empty() {
            eprint!("{}", String::from_utf8_lossy(&err));
        }

        Ok(out)
    }

    fn list_methods(&self) -> Result<Vec<String>> {
        let out = self
            .run(&self.list_arg, "")
            .with_context(|| t_args!("subject-probe-failed", "cmd" => self.command.display()))?;
        let stdout = String::from_utf8_lossy(&out);
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect())
    }

    /// Builds the name -> callable map for this program.
    pub fn into_registry(self, name: impl Into<String>) -> Result<Registry> {
        let methods = match &self.methods {
            Some(methods) => methods.clone(),
            None => self.list_methods()?,
        };
        debug!(
            "subject {} exposes {} methods",
            self.command.display(),
            methods.len()
        );

        let this = Arc::new(self);
        let mut registry = Registry::new(name);
        for method in methods {
            let subject = Arc::clone(&this);
            let arg = method.clone();
            let callable: Callable = Arc::new(move |input: &str| -> Result<Value> {
                Ok(Value::from(subject.run(&arg, input)?))
            });
            registry.insert(method, callable);
        }

        if this.init_arg.is_some() {
            let subject = Arc::clone(&this);
            registry = registry.on_init(move || match &subject.init_arg {
                Some(arg) => subject.run(arg, "").map(|_| ()),
                None => Ok(()),
            });
        }

        Ok(registry)
    }
}

type Handle<T> = thread::JoinHandle<std::io::Result<T>>;

enum Pipe {
    Stdout,
    Stderr,
}

fn spawn_pipes(child: &mut Child, input: &str) -> Result<(Handle<()>, Handle<Vec<u8>>, Handle<Vec<u8>>)> {
    let stdout = spawn_reader(child, Pipe::Stdout)?;
    let stderr = spawn_reader(child, Pipe::Stderr)?;
    let writer = spawn_writer(child, input.as_bytes().to_vec())?;
    Ok((writer, stdout, stderr))
}

fn spawn_writer(child: &mut Child, input: Vec<u8>) -> Result<Handle<()>> {
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!(t!("subject-missing-stdin")))?;
    Ok(thread::spawn(move || {
        match stdin.write_all(&input) {
            // A program that ignores its input may already have exited
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
            other => other,
        }
        // stdin is dropped here, which closes it and signals EOF
    }))
}

fn spawn_reader(child: &mut Child, pipe: Pipe) -> Result<Handle<Vec<u8>>> {
    let mut source: Box<dyn Read + Send> = match pipe {
        Pipe::Stdout => Box::new(
            child
                .stdout
                .take()
                .ok_or_else(|| anyhow!(t!("subject-missing-stdout")))?,
        ),
        Pipe::Stderr => Box::new(
            child
                .stderr
                .take()
                .ok_or_else(|| anyhow!(t!("subject-missing-stderr")))?,
        ),
    };
    Ok(thread::spawn(move || {
        let mut buf = Vec::new();
        source.read_to_end(&mut buf)?;
        Ok(buf)
    }))
}

fn join_reader(handle: Handle<Vec<u8>>) -> Result<Vec<u8>> {
    handle
        .join()
        .map_err(|_| anyhow!(t!("subject-reader-panicked")))?
        .map_err(Into::into)
}

fn join_writer(handle: Handle<()>) -> Result<()> {
    handle
        .join()
        .map_err(|_| anyhow!(t!("subject-writer-panicked")))?
        .map_err(Into::into)
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::subject::{Resolution, Subject};
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::{TempDir, tempdir};

    /// A tiny shell "student submission".
    fn script(body: &str) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subject.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        (dir, path)
    }

    const SUBJECT: &str = r#"
case "$1" in
  --list-methods) printf 'upper\n# comment\nfail\n' ;;
  upper) tr a-z A-Z ;;
  fail) echo broken >&2; exit 3 ;;
  *) exit 64 ;;
esac
"#;

    #[test]
    fn listed_methods_resolve_and_run() {
        let (_dir, path) = script(SUBJECT);
        let registry = ProcessSubject::new(&path).into_registry("demo").unwrap();
        assert_eq!(registry.method_names().collect::<Vec<_>>(), ["upper", "fail"]);
        assert!(!registry.lookup("lower").is_resolved());

        let Resolution::Resolved(upper) = registry.lookup("upper") else {
            panic!("upper should resolve");
        };
        assert_eq!(upper("ab\ncd").unwrap(), Value::Text("AB\nCD".into()));
    }

    #[test]
    fn non_zero_exit_is_an_error_with_stderr() {
        let (_dir, path) = script(SUBJECT);
        let mut subject = ProcessSubject::new(&path);
        subject.quiet = true;
        let err = subject.run("fail", "").unwrap_err();
        assert!(format!("{err:#}").contains("broken"));
    }

    #[test]
    fn explicit_methods_skip_the_probe() {
        let (_dir, path) = script("exit 1\n");
        let mut subject = ProcessSubject::new(&path);
        subject.methods = Some(vec!["only".into()]);
        let registry = subject.into_registry("demo").unwrap();
        assert!(registry.lookup("only").is_resolved());
    }

    #[test]
    fn slow_program_times_out() {
        let (_dir, path) = script("sleep 5\n");
        let mut subject = ProcessSubject::new(&path);
        subject.timeout = Some(Duration::from_millis(200));
        assert!(subject.run("anything", "").is_err());
    }

    #[test]
    fn timeout_holds_when_a_large_input_is_never_read() {
        let (_dir, path) = script("sleep 20\n");
        let mut subject = ProcessSubject::new(&path);
        subject.timeout = Some(Duration::from_millis(500));
        let input = "A".repeat(1 << 20);

        let started = std::time::Instant::now();
        let result = subject.run("anything", &input);
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(5), "took {:?}", started.elapsed());
    }

    #[test]
    fn large_input_round_trips_through_the_program() {
        let (_dir, path) = script("cat\n");
        let subject = ProcessSubject::new(&path);
        let input = "ACGT".repeat(1 << 16);
        assert_eq!(subject.run("echo", &input).unwrap(), input.as_bytes());
    }

    #[test]
    fn init_argument_runs_once_via_registry() {
        let (dir, path) = script("case \"$1\" in\n  --init) touch \"$(dirname \"$0\")/ready\" ;;\nesac\n");
        let mut subject = ProcessSubject::new(&path);
        subject.methods = Some(vec![]);
        subject.init_arg = Some("--init".into());
        let registry = subject.into_registry("demo").unwrap();
        registry.init().unwrap();
        assert!(dir.path().join("ready").exists());
    }

    #[test]
    fn missing_program_fails_to_start() {
        let subject = ProcessSubject::new("/definitely/not/here");
        assert!(subject.into_registry("demo").is_err());
    }
}
