//! Liveness checks and termination by pid.

use std::process::{Command, Stdio};

/// Observes and stops processes by pid.
pub trait ProcessMonitor {
    /// Whether `pid` still refers to a running process.
    fn is_alive(&self, pid: u32) -> bool;

    /// Ask `pid` to terminate. Returns whether the signal was delivered.
    fn terminate(&self, pid: u32) -> bool;
}

/// Monitor backed by the system `kill` utility.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcesses;

#[cfg(unix)]
fn kill(signal: &str, pid: u32) -> bool {
    Command::new("kill")
        .args([signal, &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

impl ProcessMonitor for SystemProcesses {
    #[cfg(unix)]
    fn is_alive(&self, pid: u32) -> bool {
        pid != 0 && kill("-0", pid)
    }

    #[cfg(not(unix))]
    fn is_alive(&self, pid: u32) -> bool {
        pid != 0
    }

    #[cfg(unix)]
    fn terminate(&self, pid: u32) -> bool {
        pid != 0 && kill("-TERM", pid)
    }

    #[cfg(not(unix))]
    fn terminate(&self, pid: u32) -> bool {
        Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/F"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn own_process_is_alive() {
        assert!(SystemProcesses.is_alive(std::process::id()));
    }

    #[test]
    fn pid_zero_is_never_alive() {
        assert!(!SystemProcesses.is_alive(0));
        assert!(!SystemProcesses.terminate(0));
    }

    #[test]
    fn terminate_stops_child() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id();
        assert!(SystemProcesses.is_alive(pid));

        assert!(SystemProcesses.terminate(pid));
        child.wait().unwrap();
        assert!(!SystemProcesses.is_alive(pid));
    }
}
