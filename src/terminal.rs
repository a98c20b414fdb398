//! Controlling-terminal handoff for interactive git commands.
//!
//! A pull runs in its own process group so it can be killed as a whole. A
//! background group that reads from the terminal is stopped by the kernel,
//! so while an interactive pull runs its group is made the foreground group
//! and control is taken back afterwards.

/// Foreground ownership lent to a child process group. Dropping it gives
/// the terminal back to this process.
#[cfg(unix)]
pub(crate) struct Foreground {
    own_group: libc::pid_t,
}

#[cfg(unix)]
impl Foreground {
    /// Makes `pgid` the foreground group of the terminal on stdin.
    ///
    /// Returns `None` when stdin is not a terminal or this process is not
    /// in the foreground itself.
    pub(crate) fn hand_to(pgid: u32) -> Option<Self> {
        use std::io::IsTerminal;

        if !std::io::stdin().is_terminal() {
            return None;
        }
        let pgid = libc::pid_t::try_from(pgid).ok()?;

        // SAFETY: these calls only read or change process-group state of the
        // stdin terminal and signal a group this process just spawned.
        unsafe {
            let own_group = libc::getpgrp();
            if libc::tcgetpgrp(libc::STDIN_FILENO) != own_group {
                return None;
            }
            if libc::tcsetpgrp(libc::STDIN_FILENO, pgid) != 0 {
                tracing::debug!(pgid, "Could not hand terminal to git");
                return None;
            }
            // The group may already have stopped on a terminal read
            libc::kill(-pgid, libc::SIGCONT);
            Some(Self { own_group })
        }
    }
}

#[cfg(unix)]
impl Drop for Foreground {
    fn drop(&mut self) {
        // SAFETY: a background group taking the terminal back gets SIGTTOU,
        // which is ignored for the duration of the call and then restored.
        unsafe {
            let previous = libc::signal(libc::SIGTTOU, libc::SIG_IGN);
            if libc::tcsetpgrp(libc::STDIN_FILENO, self.own_group) != 0 {
                tracing::warn!("Could not take back the terminal after git pull");
            }
            libc::signal(libc::SIGTTOU, previous);
        }
    }
}

/// Console windows have no foreground process groups.
#[cfg(not(unix))]
pub(crate) struct Foreground;

#[cfg(not(unix))]
impl Foreground {
    pub(crate) fn hand_to(_pgid: u32) -> Option<Self> {
        None
    }
}
