use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::task::AbortHandle;

const KILL_GRACE: Duration = Duration::from_secs(1);

/// Makes the translator a session leader, so its pid doubles as the id of a
/// process group holding everything it spawns.
#[cfg(unix)]
pub(crate) fn apply_process_group(cmd: &mut Command) {
    unsafe {
        cmd.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
pub(crate) fn apply_process_group(_cmd: &mut Command) {}

/// The translator's process group. The id is captured at spawn because
/// `Child::id` turns `None` once the leader has been reaped, while its
/// background children may still be running.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProcessGroup {
    id: Option<u32>,
}

impl ProcessGroup {
    pub(crate) fn of(child: &Child) -> Self {
        Self { id: child.id() }
    }

    #[cfg(unix)]
    fn signal(&self, signal: i32) {
        let Some(id) = self.id.and_then(|id| i32::try_from(id).ok()) else {
            return;
        };
        unsafe {
            libc::kill(-id, signal);
        }
    }

    /// SIGKILLs every process left in the group, leader or not.
    #[cfg(unix)]
    pub(crate) fn kill_all(&self) {
        self.signal(libc::SIGKILL);
    }

    #[cfg(not(unix))]
    pub(crate) fn kill_all(&self) {}

    /// Asks the group to stop with SIGTERM and escalates to SIGKILL when the
    /// leader is still alive after the grace period.
    #[cfg(unix)]
    pub(crate) async fn terminate(&self, child: &mut Child) -> Option<ExitStatus> {
        self.signal(libc::SIGTERM);
        if let Ok(status) = tokio::time::timeout(KILL_GRACE, child.wait()).await {
            return status.ok();
        }
        self.kill_all();
        let _ = child.kill().await;
        tokio::time::timeout(KILL_GRACE, child.wait())
            .await
            .ok()
            .and_then(Result::ok)
    }

    #[cfg(not(unix))]
    pub(crate) async fn terminate(&self, child: &mut Child) -> Option<ExitStatus> {
        let _ = child.kill().await;
        tokio::time::timeout(KILL_GRACE, child.wait())
            .await
            .ok()
            .and_then(Result::ok)
    }
}

/// Cleans up an abandoned run: on drop it kills whatever is left of the
/// process group and aborts the pipe readers, unless `complete` was called.
/// Covers timeouts, early `?` returns and callers dropping the future.
pub(crate) struct RunGuard {
    group: ProcessGroup,
    readers: Vec<AbortHandle>,
    completed: bool,
}

impl RunGuard {
    pub(crate) fn new(group: ProcessGroup, readers: Vec<AbortHandle>) -> Self {
        Self {
            group,
            readers,
            completed: false,
        }
    }

    pub(crate) fn group(&self) -> ProcessGroup {
        self.group
    }

    pub(crate) fn complete(mut self) {
        self.completed = true;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        self.group.kill_all();
        for reader in &self.readers {
            reader.abort();
        }
    }
}
