//! Port Forwarding Manager
//!
//! Lifecycle of forwards: Closed -> Open via `open`, Open -> Closed via
//! `close`. Batches are processed one forward at a time and every forward
//! gets its own result; a failure never stops the rest of the batch.

use std::io;

use tracing::{debug, info, warn};

use super::client::PortForwardClient;
use super::error::ForwardError;
use super::pattern::ForwardPattern;
use super::registry::SocketRegistry;

/// Opens, closes and lists forwards recorded in a `SocketRegistry`
pub struct ForwardingManager<C> {
    registry: SocketRegistry,
    client: C,
}

impl<C: PortForwardClient> ForwardingManager<C> {
    /// Create a new forwarding manager
    pub fn new(registry: SocketRegistry, client: C) -> Self {
        Self { registry, client }
    }

    pub fn registry(&self) -> &SocketRegistry {
        &self.registry
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Forwards currently open
    pub fn list(&self) -> io::Result<Vec<ForwardPattern>> {
        self.registry.list()
    }

    /// Open every forward in the batch
    ///
    /// Successful entries come back with `socket` set and no `error`.
    pub fn open(&self, forwards: Vec<ForwardPattern>) -> Vec<ForwardPattern> {
        forwards
            .into_iter()
            .map(|mut forward| {
                match self.open_one(&forward) {
                    Ok(socket) => {
                        info!("Port forward opened: {} ({})", forward, socket);
                        forward.socket = Some(socket);
                        forward.error = None;
                    }
                    Err(e) => {
                        warn!("Failed to open port forward {}: {}", forward, e);
                        forward.error = Some(e);
                    }
                }
                forward
            })
            .collect()
    }

    /// Close every forward in the batch
    pub fn close(&self, forwards: Vec<ForwardPattern>) -> Vec<ForwardPattern> {
        forwards
            .into_iter()
            .map(|mut forward| {
                match self.close_one(&forward) {
                    Ok(()) => {
                        info!("Port forward closed: {}", forward);
                        forward.socket = None;
                        forward.error = None;
                    }
                    Err(e) => {
                        warn!("Failed to close port forward {}: {}", forward, e);
                        forward.error = Some(e);
                    }
                }
                forward
            })
            .collect()
    }

    fn open_one(&self, forward: &ForwardPattern) -> Result<String, ForwardError> {
        forward.validate()?;
        let socket = forward.socket_name();
        let _lock = self.registry.lock()?;

        if self.registry.exists(&socket) {
            return Err(ForwardError::AlreadyForwarded);
        }

        if let Err(e) = self.client.establish(&self.registry, forward) {
            self.discard_failed(forward, &socket);
            return Err(e);
        }

        Ok(socket)
    }

    /// Clean up after a failed establish
    ///
    /// ssh can background a live master even though the forward itself
    /// failed (e.g. the local port was taken). Its socket is the only handle
    /// to that process, so stop the master before dropping the marker.
    fn discard_failed(&self, forward: &ForwardPattern, socket: &str) {
        if !self.registry.exists(socket) {
            return;
        }

        match self.client.teardown(&self.registry, forward) {
            Ok(()) => debug!("Stopped master of failed forward: {}", socket),
            Err(err) => warn!("Failed to stop master of {}: {}", socket, err),
        }
        match self.registry.remove(socket) {
            Ok(true) => debug!("Removed marker of failed forward: {}", socket),
            Ok(false) => {}
            Err(err) => warn!("Failed to remove marker {}: {}", socket, err),
        }
    }

    fn close_one(&self, forward: &ForwardPattern) -> Result<(), ForwardError> {
        forward.validate()?;
        let socket = forward.socket_name();
        let _lock = self.registry.lock()?;

        if !self.registry.exists(&socket) {
            return Err(ForwardError::NotForwarded);
        }

        self.client.teardown(&self.registry, forward)?;

        // ssh unlinks the socket as the master exits; make sure it is gone
        if self.registry.remove(&socket)? {
            debug!("Removed control socket left after exit: {}", socket);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Behaviour is picked by server name:
    /// - `busy`: leaves a marker behind, then reports the port as taken
    /// - `down`: ssh exits 255 without creating anything
    /// - `sticky`: teardown succeeds but leaves the socket in place
    /// - anything else: behaves like a working ssh
    #[derive(Default)]
    struct MockClient {
        calls: RefCell<Vec<String>>,
    }

    impl MockClient {
        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl PortForwardClient for MockClient {
        fn establish(
            &self,
            registry: &SocketRegistry,
            forward: &ForwardPattern,
        ) -> Result<(), ForwardError> {
            self.calls
                .borrow_mut()
                .push(format!("establish {}", forward.socket_name()));
            match forward.server_name.as_str() {
                "down" => Err(ForwardError::ProcessExit(255)),
                "busy" => {
                    registry.create(&forward.socket_name())?;
                    Err(ForwardError::PortInUse(
                        "bind [127.0.0.1]:8080: Address already in use".to_string(),
                    ))
                }
                _ => {
                    registry.create(&forward.socket_name())?;
                    Ok(())
                }
            }
        }

        fn teardown(
            &self,
            registry: &SocketRegistry,
            forward: &ForwardPattern,
        ) -> Result<(), ForwardError> {
            self.calls
                .borrow_mut()
                .push(format!("teardown {}", forward.socket_name()));
            match forward.server_name.as_str() {
                "down" => Err(ForwardError::ProcessExit(255)),
                "sticky" => Ok(()),
                _ => {
                    registry.remove(&forward.socket_name())?;
                    Ok(())
                }
            }
        }
    }

    fn manager() -> (tempfile::TempDir, ForwardingManager<MockClient>) {
        let dir = tempfile::tempdir().unwrap();
        let registry = SocketRegistry::new(dir.path().join("sockets"));
        (dir, ForwardingManager::new(registry, MockClient::default()))
    }

    #[test]
    fn test_open_list_close_scenario() {
        let (_dir, manager) = manager();
        let fw = ForwardPattern::localhost("web1", 8080, 80);

        let opened = manager.open(vec![fw.clone()]);
        assert!(opened[0].is_ok());
        assert_eq!(
            opened[0].socket.as_deref(),
            Some("localhost-8080-localhost-80.web1")
        );
        assert!(manager
            .registry()
            .path("localhost-8080-localhost-80.web1")
            .exists());

        let listed = manager.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].server_name, "web1");
        assert_eq!(listed[0].local_port, 8080);
        assert_eq!(listed[0].remote_port, 80);

        let closed = manager.close(vec![fw]);
        assert!(closed[0].is_ok());
        assert_eq!(closed[0].socket, None);
        assert!(manager.list().unwrap().is_empty());
    }

    #[test]
    fn test_open_twice_is_rejected() {
        let (_dir, manager) = manager();
        let fw = ForwardPattern::localhost("web1", 8080, 80);

        let first = manager.open(vec![fw.clone()]);
        let second = manager.open(vec![fw]);

        assert!(first[0].is_ok());
        assert_eq!(second[0].error, Some(ForwardError::AlreadyForwarded));
        assert_eq!(second[0].error.as_ref().unwrap().to_string(), "already forwarded");
        // The duplicate never reaches ssh
        assert_eq!(manager.client().calls().len(), 1);
    }

    #[test]
    fn test_close_unopened_is_rejected() {
        let (_dir, manager) = manager();
        let closed = manager.close(vec![ForwardPattern::localhost("web1", 8080, 80)]);

        assert_eq!(closed[0].error, Some(ForwardError::NotForwarded));
        assert_eq!(closed[0].error.as_ref().unwrap().to_string(), "not forwarded");
        assert!(manager.client().calls().is_empty());
    }

    #[test]
    fn test_failures_are_isolated_per_forward() {
        let (_dir, manager) = manager();
        let batch = vec![
            ForwardPattern::localhost("web1", 8080, 80),
            ForwardPattern::localhost("down", 8081, 81),
            ForwardPattern::localhost("web2", 8082, 82),
            ForwardPattern::localhost("-oProxyCommand=evil", 8083, 83),
        ];

        let results = manager.open(batch);
        assert_eq!(results.len(), 4);
        assert!(results[0].is_ok());
        assert_eq!(results[1].error, Some(ForwardError::ProcessExit(255)));
        assert!(results[2].is_ok());
        assert!(matches!(results[3].error, Some(ForwardError::Invalid(_))));

        let open: Vec<_> = manager
            .list()
            .unwrap()
            .into_iter()
            .map(|f| f.server_name)
            .collect();
        assert_eq!(open, vec!["web1", "web2"]);
    }

    #[test]
    fn test_failed_open_stops_master_and_removes_marker() {
        let (_dir, manager) = manager();
        let fw = ForwardPattern::localhost("busy", 8080, 80);

        let results = manager.open(vec![fw.clone()]);
        assert_eq!(
            results[0].error.as_ref().unwrap().to_string(),
            "bind [127.0.0.1]:8080: Address already in use"
        );
        assert_eq!(results[0].socket, None);
        assert!(!manager.registry().exists(&fw.socket_name()));
        assert_eq!(
            manager.client().calls(),
            vec![
                "establish localhost-8080-localhost-80.busy",
                "teardown localhost-8080-localhost-80.busy",
            ]
        );
    }

    #[test]
    fn test_failed_open_without_socket_skips_teardown() {
        let (_dir, manager) = manager();
        let results = manager.open(vec![ForwardPattern::localhost("down", 8080, 80)]);

        assert_eq!(results[0].error, Some(ForwardError::ProcessExit(255)));
        assert_eq!(
            manager.client().calls(),
            vec!["establish localhost-8080-localhost-80.down"]
        );
    }

    #[test]
    fn test_close_removes_socket_left_by_ssh() {
        let (_dir, manager) = manager();
        let fw = ForwardPattern::localhost("sticky", 8080, 80);

        manager.open(vec![fw.clone()]);
        let closed = manager.close(vec![fw.clone()]);

        assert!(closed[0].is_ok());
        assert!(!manager.registry().exists(&fw.socket_name()));
    }

    #[test]
    fn test_failed_close_keeps_marker() {
        let (_dir, manager) = manager();
        let fw = ForwardPattern::localhost("down", 8080, 80);
        manager.registry().create(&fw.socket_name()).unwrap();

        let closed = manager.close(vec![fw.clone()]);
        assert_eq!(closed[0].error, Some(ForwardError::ProcessExit(255)));
        assert!(manager.registry().exists(&fw.socket_name()));
    }
}
