//! Process spawning with streamed output.

use super::{ExitStatus, ProcessHandle, ProcessListener, SpawnRequest};
use crate::config::CommandLine;
use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::debug;

const CHUNK_SIZE: usize = 4096;

/// Handle to a process started by [`spawn`].
pub struct ChildHandle {
    #[cfg_attr(not(unix), allow(dead_code))]
    pid: u32,
    child: Arc<Mutex<Child>>,
}

impl ProcessHandle for ChildHandle {
    fn kill(&mut self) -> io::Result<()> {
        // The child leads its own process group, so this also reaches
        // anything the shell started.
        #[cfg(unix)]
        {
            // SAFETY: killpg has no memory-safety preconditions.
            let rc = unsafe { libc::killpg(self.pid as libc::pid_t, libc::SIGTERM) };
            if rc == 0 {
                return Ok(());
            }
        }

        match self.child.try_lock() {
            Ok(mut child) => child.kill(),
            // Held by the waiter, which only waits once the pipes have closed.
            Err(_) => Ok(()),
        }
    }
}

/// Spawn a process and stream its output to `listener`.
///
/// Stdout and stderr are read on separate threads and funnelled through one
/// channel, so the listener sees chunks one at a time in arrival order,
/// followed by exactly one `on_finished`.
pub fn spawn(request: &SpawnRequest, listener: Arc<dyn ProcessListener>) -> io::Result<ChildHandle> {
    let mut cmd = build_command(request);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = cmd.spawn()?;
    let pid = child.id();
    debug!("Spawned pid {} for: {}", pid, request.command);

    let (tx, rx) = mpsc::channel();
    if let Some(stdout) = child.stdout.take() {
        read_pipe(stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        read_pipe(stderr, tx.clone());
    }
    drop(tx);

    let child = Arc::new(Mutex::new(child));
    let waiter = Arc::clone(&child);
    thread::spawn(move || {
        for chunk in rx {
            listener.on_data(&chunk);
        }

        let code = match waiter.lock() {
            Ok(mut child) => child.wait().ok().and_then(|status| status.code()),
            Err(_) => None,
        };
        debug!("pid {} exited with {:?}", pid, code);
        listener.on_finished(ExitStatus::from(code));
    });

    Ok(ChildHandle { pid, child })
}

fn read_pipe<R: Read + Send + 'static>(mut pipe: R, tx: Sender<Vec<u8>>) {
    thread::spawn(move || {
        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    });
}

fn build_command(request: &SpawnRequest) -> Command {
    let mut cmd = match &request.command {
        CommandLine::Shell(line) => {
            let mut cmd = Command::new(detect_shell());
            cmd.arg(shell_flag());
            cmd.arg(line);
            cmd
        }
        CommandLine::Argv(argv) => {
            let mut parts = argv.iter();
            let mut cmd = Command::new(parts.next().map(String::as_str).unwrap_or_default());
            cmd.args(parts);
            cmd
        }
    };

    if let Some(cwd) = &request.cwd {
        cmd.current_dir(cwd);
    }

    for (key, value) in &request.env {
        cmd.env(key, value);
    }

    if let Some(path) = &request.path {
        let joined = match std::env::var("PATH") {
            Ok(current) if !current.is_empty() => {
                format!("{}{}{}", path, path_separator(), current)
            }
            _ => path.clone(),
        };
        cmd.env("PATH", joined);
    }

    cmd
}

/// Detect the shell used for string command lines.
fn detect_shell() -> String {
    if cfg!(target_os = "windows") {
        std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string())
    } else {
        std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
    }
}

/// Get the flag to pass commands to the shell.
///
/// Never interactive: the child runs in its own process group and an
/// interactive shell there would stop on terminal access.
fn shell_flag() -> &'static str {
    if cfg!(target_os = "windows") {
        "/C"
    } else {
        "-c"
    }
}

fn path_separator() -> char {
    if cfg!(target_os = "windows") {
        ';'
    } else {
        ':'
    }
}
