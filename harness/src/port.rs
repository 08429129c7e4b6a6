//! Free-port allocation and TCP readiness polling.

use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};

const PROBE_TIMEOUT: Duration = Duration::from_millis(250);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Ask the OS for a currently unused port.
///
/// The listener is dropped before returning, so the port is only *likely*
/// free when the caller binds it. Good enough for one child process per run.
pub fn free_port() -> Result<u16> {
    let listener =
        TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).context("bind ephemeral local port")?;
    let port = listener
        .local_addr()
        .context("read ephemeral listener address")?
        .port();
    Ok(port)
}

/// Whether anything currently accepts TCP connections on the local port.
pub fn probe(port: u16) -> bool {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    TcpStream::connect_timeout(&addr, PROBE_TIMEOUT).is_ok()
}

/// Poll the local port until it accepts a connection or the timeout passes.
pub fn wait_for_port(port: u16, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if probe(port) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            bail!(
                "port {} did not accept connections within {}s",
                port,
                timeout.as_secs()
            );
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_port_is_bindable() {
        let port = free_port().expect("free port");
        assert_ne!(port, 0);
        TcpListener::bind((Ipv4Addr::LOCALHOST, port)).expect("rebind allocated port");
    }

    #[test]
    fn wait_succeeds_against_live_listener() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind");
        let port = listener.local_addr().expect("addr").port();
        wait_for_port(port, Duration::from_secs(2)).expect("listener should be reachable");
    }

    #[test]
    fn wait_times_out_when_nothing_listens() {
        let port = free_port().expect("free port");
        let err = wait_for_port(port, Duration::from_millis(200)).expect_err("nothing listening");
        assert!(err.to_string().contains("did not accept connections"));
    }
}
