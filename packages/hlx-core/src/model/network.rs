//! `Network` — read-mostly network identity, published by the server and
//! cached by the client.

use std::net::IpAddr;

/// Network identity as reported over the wire. The server populates this
/// from platform state capture; the core model only stores and reports it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Network {
    dhcpv4_enabled: bool,
    ethernet_eui48: [u8; 6],
    host_ip: IpAddr,
    default_router_ip: IpAddr,
    netmask: IpAddr,
    sddp_enabled: bool,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            dhcpv4_enabled: true,
            ethernet_eui48: [0; 6],
            host_ip: IpAddr::from([0, 0, 0, 0]),
            default_router_ip: IpAddr::from([0, 0, 0, 0]),
            netmask: IpAddr::from([255, 255, 255, 0]),
            sddp_enabled: true,
        }
    }
}

impl Network {
    pub fn dhcpv4_enabled(&self) -> bool {
        self.dhcpv4_enabled
    }

    pub fn set_dhcpv4_enabled(&mut self, enabled: bool) {
        self.dhcpv4_enabled = enabled;
    }

    pub fn ethernet_eui48(&self) -> [u8; 6] {
        self.ethernet_eui48
    }

    pub fn set_ethernet_eui48(&mut self, eui48: [u8; 6]) {
        self.ethernet_eui48 = eui48;
    }

    pub fn host_ip(&self) -> IpAddr {
        self.host_ip
    }

    pub fn set_host_ip(&mut self, ip: IpAddr) {
        self.host_ip = ip;
    }

    pub fn default_router_ip(&self) -> IpAddr {
        self.default_router_ip
    }

    pub fn set_default_router_ip(&mut self, ip: IpAddr) {
        self.default_router_ip = ip;
    }

    pub fn netmask(&self) -> IpAddr {
        self.netmask
    }

    pub fn set_netmask(&mut self, ip: IpAddr) {
        self.netmask = ip;
    }

    pub fn sddp_enabled(&self) -> bool {
        self.sddp_enabled
    }

    pub fn set_sddp_enabled(&mut self, enabled: bool) {
        self.sddp_enabled = enabled;
    }

    /// Renders the EUI-48 as dash-separated uppercase hex, e.g.
    /// `A0-99-9B-18-05-DB`.
    pub fn eui48_hex(&self) -> String {
        self.ethernet_eui48
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join("-")
    }
}
