//! `NetworkController` — read-only on the wire, driven by platform state
//! capture.

use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::connection::Connection;
use crate::dispatch::{Dispatcher, FnHandler};
use crate::error::{HlxError, HlxResult};
use crate::model::Network;
use crate::protocol::catalog::{
    render_network_dhcp, render_network_gateway, render_network_host_ip, render_network_mac,
    render_network_netmask, render_network_query, render_network_sddp, Verb,
};
use crate::protocol::framing::render_frame;

pub struct NetworkController {
    state: Mutex<Network>,
}

impl NetworkController {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Network::default()),
        }
    }

    pub fn register(self: &Arc<Self>, dispatcher: &Dispatcher) {
        let a = self.clone();
        dispatcher.register(
            Verb::NetworkQuery,
            Arc::new(FnHandler::new(move |connection, _captures| {
                        let a = a.clone();
                        async move { a.write_current_snapshot(&connection).await }
                    })),
        );
    }

    /// Overwrites the published network identity (platform state capture;
    /// never invoked from a wire handler).
    pub fn set_from_platform(&self, network: Network) {
        *self.state.lock() = network;
    }

    pub async fn write_current_snapshot(&self, connection: &Arc<dyn Connection>) {
        let state = self.state.lock().clone();
        let _ = connection
            .send(&render_frame(&render_network_dhcp(state.dhcpv4_enabled())))
            .await;
        let _ = connection
            .send(&render_frame(&render_network_mac(&state.ethernet_eui48())))
            .await;
        let _ = connection
            .send(&render_frame(&render_network_host_ip(&ip_to_string(
                        state.host_ip(),
                    ))))
            .await;
        let _ = connection
            .send(&render_frame(&render_network_gateway(&ip_to_string(
                        state.default_router_ip(),
                    ))))
            .await;
        let _ = connection
            .send(&render_frame(&render_network_netmask(&ip_to_string(
                        state.netmask(),
                    ))))
            .await;
        let _ = connection
            .send(&render_frame(&render_network_sddp(state.sddp_enabled())))
            .await;
        let _ = connection
            .send(&render_frame(&render_network_query()))
            .await;
    }

    pub fn reset_to_defaults(&self) {
        *self.state.lock() = Network::default();
    }

    /// Network identity is platform state, not user configuration, but
    /// still round-trips through the backup document so a reload doesn't report stale
    /// defaults before the next platform capture runs.
    pub fn load_from_backup(&self, doc: &serde_json::Value) -> HlxResult<()> {
        let value = doc
            .get("Network")
            .ok_or_else(|| HlxError::MissingConfiguration("Network".to_string()))?;
        let state: Network = serde_json::from_value(value.clone())?;
        *self.state.lock() = state;
        Ok(())
    }

    pub fn save_to_backup(&self, doc: &mut serde_json::Value) {
        doc["Network"] =
        serde_json::to_value(self.state.lock().clone()).expect("network backup always serializes");
    }
}

impl Default for NetworkController {
    fn default() -> Self {
        Self::new()
    }
}

fn ip_to_string(addr: IpAddr) -> String {
    addr.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::test_support::MemoryConnection;

    #[tokio::test]
    async fn query_emits_six_frames_then_echoes_bare_query() {
        let ctrl = Arc::new(NetworkController::new());
        let dispatcher = Dispatcher::new();
        ctrl.register(&dispatcher);
        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "QE").await;
        let sent = conn.sent_bodies();
        assert_eq!(sent.len(), 7);
        assert_eq!(sent[0], "DHCP1");
        assert_eq!(sent.last().unwrap(), "QE");
    }

    #[tokio::test]
    async fn platform_capture_is_reflected_on_query() {
        let ctrl = Arc::new(NetworkController::new());
        let mut n = Network::default();
        n.set_ethernet_eui48([0xA0, 0x99, 0x9B, 0x18, 0x05, 0xDB]);
        ctrl.set_from_platform(n);

        let dispatcher = Dispatcher::new();
        ctrl.register(&dispatcher);
        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "QE").await;
        assert!(conn.sent_bodies().contains(&"MACA0-99-9B-18-05-DB".to_string()));
    }
}
