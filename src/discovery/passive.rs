//! Passive device discovery from observed traffic.
//!
//! Runs on every captured packet. Each extraction is independent: the
//! source MAC/IP touch, mDNS hostnames, ARP sender mappings, and DHCP
//! client info. All writes go through the registry lock; this handler
//! keeps no state of its own.

use std::sync::Arc;

use crate::capture::arp::ArpOp;
use crate::capture::packet::{is_unusable_ip, PacketView, Transport};
use crate::capture::PacketSink;
use crate::discovery::DeviceRegistry;
use crate::oui::OuiDb;

pub struct PassiveDiscovery {
    registry: Arc<DeviceRegistry>,
    oui: Arc<OuiDb>,
}

impl PassiveDiscovery {
    pub fn new(registry: Arc<DeviceRegistry>, oui: Arc<OuiDb>) -> Self {
        Self { registry, oui }
    }

    /// Hostname from mDNS traffic: a `.local` name loses its suffix and
    /// any service labels; the leading instance label is the hostname
    /// (`iPad._companion-link._tcp.local` becomes `iPad`).
    fn mdns_hostname(&self, packet: &PacketView<'_>) -> Option<String> {
        let (_, dst_port, transport) = packet.transport_ports()?;
        if transport != Transport::Udp || dst_port != 5353 {
            return None;
        }
        let dns = packet.dns()?;

        for name in dns.questions.iter().chain(dns.answers.iter()) {
            if let Some(stripped) = name.strip_suffix(".local") {
                let host = match stripped.find('.') {
                    Some(dot) => &stripped[..dot],
                    None => stripped,
                };
                if !host.is_empty() {
                    return Some(host.to_string());
                }
            }
        }
        None
    }

    /// NBNS (UDP 137/138) also carries names, but its first-level
    /// encoding is not decoded here yet.
    fn nbns_hostname(&self, packet: &PacketView<'_>) -> Option<String> {
        let (_, dst_port, transport) = packet.transport_ports()?;
        if transport != Transport::Udp || (dst_port != 137 && dst_port != 138) {
            return None;
        }
        None
    }

    /// ARP requests and replies both reveal a live sender mapping.
    fn process_arp(&self, packet: &PacketView<'_>) {
        let Some(arp) = packet.arp() else {
            return;
        };
        if !matches!(arp.operation, ArpOp::Request | ArpOp::Reply) {
            return;
        }
        let mac = arp.sender_mac;
        if mac.is_zero() || mac.is_multicast() {
            return;
        }
        if arp.sender_ip.is_unspecified() {
            return;
        }
        self.registry.upsert(mac, |device| {
            device.add_ip(arp.sender_ip.into());
            device.set_vendor_if_empty(self.oui.vendor(&mac.to_string()));
        });
    }

    /// DHCP identifies the client by its hardware address even when the
    /// frame came from the server.
    fn process_dhcp(&self, packet: &PacketView<'_>) {
        let Some(dhcp) = packet.dhcp() else {
            return;
        };
        let mac = dhcp.client_mac;
        if mac.is_zero() || mac.is_multicast() {
            return;
        }
        self.registry.upsert(mac, |device| {
            if let Some(hostname) = &dhcp.hostname {
                device.set_hostname_if_empty(hostname);
            }
            if !dhcp.your_ip.is_unspecified() {
                device.add_ip(dhcp.your_ip.into());
            }
        });
    }
}

impl PacketSink for PassiveDiscovery {
    fn process(&self, packet: &PacketView<'_>) {
        if let Some(src_mac) = packet.src_mac() {
            // Broadcast and group addresses are not devices.
            if !src_mac.is_broadcast() && !src_mac.is_multicast() && !src_mac.is_zero() {
                let src_ip = packet.ips().map(|(src, _)| src);
                let hostname = self.mdns_hostname(packet).or_else(|| self.nbns_hostname(packet));

                self.registry.upsert(src_mac, |device| {
                    device.set_vendor_if_empty(self.oui.vendor(&src_mac.to_string()));
                    if let Some(ip) = src_ip {
                        if !is_unusable_ip(&ip) {
                            device.add_ip(ip);
                        }
                    }
                    if let Some(hostname) = &hostname {
                        device.set_hostname_if_empty(hostname);
                    }
                });
            }
        }

        self.process_arp(packet);
        self.process_dhcp(packet);
    }
}
