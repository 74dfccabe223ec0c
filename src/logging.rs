// Logging - everything goes to a rolling file, the terminal belongs to the TUI
// Outside dev mode stderr is pointed at /dev/null so ALSA chatter can't scribble over the screen

use anyhow::{anyhow, Result};
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "treeplay.log";

pub fn default_filter(dev: bool) -> &'static str {
    if dev {
        "info,treeplay=debug"
    } else {
        "info"
    }
}

pub fn init_logging(log_dir: &Path, dev: bool) -> Result<()> {
    fs::create_dir_all(log_dir)?;

    // Daily rotating file appender
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(dev)));

    let subscriber = tracing_subscriber::fmt()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_env_filter(filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // The writer flushes until process exit
    std::mem::forget(guard);

    Ok(())
}

/// Keeps the real stderr around; dropping it points fd 2 back there.
pub struct StderrRedirect {
    backup_fd: libc::c_int,
}

pub fn redirect_stderr_to_null() -> Result<StderrRedirect> {
    unsafe {
        let null_fd = libc::open(
            b"/dev/null\0".as_ptr() as *const libc::c_char,
            libc::O_WRONLY,
        );
        if null_fd == -1 {
            return Err(anyhow!("Failed to open /dev/null"));
        }

        let backup_fd = libc::dup(libc::STDERR_FILENO);
        if backup_fd == -1 {
            libc::close(null_fd);
            return Err(anyhow!("Failed to backup stderr"));
        }

        if libc::dup2(null_fd, libc::STDERR_FILENO) == -1 {
            libc::close(null_fd);
            libc::close(backup_fd);
            return Err(anyhow!("Failed to redirect stderr"));
        }

        libc::close(null_fd);
        Ok(StderrRedirect { backup_fd })
    }
}

impl Drop for StderrRedirect {
    fn drop(&mut self) {
        unsafe {
            libc::dup2(self.backup_fd, libc::STDERR_FILENO);
            libc::close(self.backup_fd);
        }
    }
}
