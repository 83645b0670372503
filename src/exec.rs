//! Blocking subprocess calls with a deadline

use std::io::{self, Read};
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Run `command` to completion, killing it after `timeout`.
///
/// Returns `Ok(None)` on timeout. Output is captured; stdin is closed.
/// Both pipes are drained while waiting so a chatty child cannot stall
/// on a full pipe.
pub fn run_with_timeout(command: &mut Command, timeout: Duration) -> io::Result<Option<Output>> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    match child.wait_timeout(timeout)? {
        Some(status) => Ok(Some(Output {
            status,
            stdout: collect(stdout)?,
            stderr: collect(stderr)?,
        })),
        None => {
            let _ = child.kill();
            let _ = child.wait();
            // Readers end when the pipes close; a leftover grandchild may
            // keep them open, so they are not joined here.
            Ok(None)
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<io::Result<Vec<u8>>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn collect(reader: Option<JoinHandle<io::Result<Vec<u8>>>>) -> io::Result<Vec<u8>> {
    match reader {
        Some(handle) => handle
            .join()
            .map_err(|_| io::Error::other("output reader panicked"))?,
        None => Ok(Vec::new()),
    }
}

/// Whether `command` ran and exited successfully within `timeout`
pub fn succeeds(command: &mut Command, timeout: Duration) -> bool {
    matches!(run_with_timeout(command, timeout), Ok(Some(output)) if output.status.success())
}
