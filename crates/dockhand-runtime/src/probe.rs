//! Bounded polling for services and files brought up by containers.

use crate::RuntimeError;
use dockhand_schema::ProbeConfig;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace};

/// Call `predicate` up to `max_attempts` times, sleeping `delay` between
/// attempts. Returns the 1-based attempt that succeeded.
pub fn wait_for<F>(predicate: F, max_attempts: u32, delay: Duration) -> Result<u32, RuntimeError>
where
    F: FnMut() -> bool,
{
    poll("condition", predicate, max_attempts, delay)
}

fn poll<F>(what: &str, mut predicate: F, max_attempts: u32, delay: Duration) -> Result<u32, RuntimeError>
where
    F: FnMut() -> bool,
{
    if max_attempts == 0 {
        return Err(RuntimeError::InvalidArgument(
            "max_attempts must be at least 1".to_owned(),
        ));
    }
    for attempt in 1..=max_attempts {
        if predicate() {
            debug!("{what} reached on attempt {attempt}/{max_attempts}");
            return Ok(attempt);
        }
        trace!("{what} not reached on attempt {attempt}/{max_attempts}");
        if attempt < max_attempts {
            thread::sleep(delay);
        }
    }
    Err(RuntimeError::ProbeTimeout {
        what: what.to_owned(),
        attempts: max_attempts,
    })
}

/// True iff a TCP connection to any resolved address of `host:port`
/// succeeds within `timeout`. Resolution failures count as closed.
pub fn check_port(host: &str, port: u16, timeout: Duration) -> bool {
    let addrs = match (host, port).to_socket_addrs() {
        Ok(addrs) => addrs,
        Err(e) => {
            trace!("cannot resolve {host}:{port}: {e}");
            return false;
        }
    };
    addrs
        .into_iter()
        .any(|addr| TcpStream::connect_timeout(&addr, timeout).is_ok())
}

pub fn check_path_exists(path: &Path) -> bool {
    path.exists()
}

/// Poll `host:port` using the default connect timeout per attempt.
pub fn wait_for_port(
    host: &str,
    port: u16,
    max_attempts: u32,
    delay: Duration,
) -> Result<u32, RuntimeError> {
    let timeout = ProbeConfig::default().connect_timeout();
    poll(
        &format!("port {host}:{port}"),
        || check_port(host, port, timeout),
        max_attempts,
        delay,
    )
}

pub fn wait_for_path(path: &Path, max_attempts: u32, delay: Duration) -> Result<u32, RuntimeError> {
    poll(
        &format!("path {}", path.display()),
        || check_path_exists(path),
        max_attempts,
        delay,
    )
}

/// Probe operations bound to a [`ProbeConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Probe {
    config: ProbeConfig,
}

impl Probe {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    #[must_use]
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.config.attempts = attempts;
        self
    }

    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.config.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn wait_for<F>(&self, predicate: F) -> Result<u32, RuntimeError>
    where
        F: FnMut() -> bool,
    {
        wait_for(predicate, self.config.attempts, self.config.delay())
    }

    pub fn check_port(&self, host: &str, port: u16) -> bool {
        check_port(host, port, self.config.connect_timeout())
    }

    pub fn wait_for_port(&self, host: &str, port: u16) -> Result<u32, RuntimeError> {
        let timeout = self.config.connect_timeout();
        poll(
            &format!("port {host}:{port}"),
            || check_port(host, port, timeout),
            self.config.attempts,
            self.config.delay(),
        )
    }

    pub fn wait_for_path(&self, path: &Path) -> Result<u32, RuntimeError> {
        wait_for_path(path, self.config.attempts, self.config.delay())
    }
}
