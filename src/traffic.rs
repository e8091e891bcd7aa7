//! Traffic statistics aggregation.
//!
//! One coarse reader/writer lock protects five counter maps: protocol
//! counts, destination ports, per-IP talkers, DNS domains, and external
//! destinations. Every captured packet touches the write lock exactly
//! once; `get_results` takes the read lock and renders the top-N views.

use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;

use parking_lot::RwLock;

use crate::capture::packet::{PacketView, ProtocolLabel, Transport};
use crate::capture::PacketSink;
use crate::output::{DestinationInfo, DnsDomainInfo, PortCount, TalkerInfo, TrafficInfo};

const TOP_PORTS: usize = 20;
const TOP_TALKERS: usize = 20;
const TOP_DOMAINS: usize = 50;
const TOP_DESTINATIONS: usize = 20;

#[derive(Debug, Default, Clone)]
struct TalkerStats {
    bytes_sent: u64,
    bytes_received: u64,
    packets_sent: u64,
    packets_received: u64,
}

#[derive(Debug, Default, Clone)]
struct DomainStats {
    query_count: u64,
    querying_ips: BTreeSet<IpAddr>,
}

#[derive(Debug, Default, Clone)]
struct DestinationStats {
    connection_count: u64,
    bytes_total: u64,
}

#[derive(Default)]
struct Counters {
    protocols: HashMap<ProtocolLabel, u64>,
    ports: HashMap<(Transport, u16), u64>,
    talkers: HashMap<IpAddr, TalkerStats>,
    domains: HashMap<String, DomainStats>,
    destinations: HashMap<IpAddr, DestinationStats>,
}

/// Concurrent traffic aggregator; register as a capture handler.
pub struct TrafficAnalyzer {
    counters: RwLock<Counters>,
    /// First two octets of the local IPv4 address; destinations outside
    /// this /16 count as external.
    local_prefix: Option<[u8; 2]>,
}

impl TrafficAnalyzer {
    pub fn new(local_ip: Option<IpAddr>) -> Self {
        let local_prefix = match local_ip {
            Some(IpAddr::V4(v4)) => {
                let octets = v4.octets();
                Some([octets[0], octets[1]])
            }
            _ => None,
        };
        Self {
            counters: RwLock::new(Counters::default()),
            local_prefix,
        }
    }

    fn is_local(&self, ip: &IpAddr) -> bool {
        match (self.local_prefix, ip) {
            (Some(prefix), IpAddr::V4(v4)) => {
                let octets = v4.octets();
                octets[0] == prefix[0] && octets[1] == prefix[1]
            }
            _ => false,
        }
    }

    /// Aggregated statistics with top-N cuts applied. Ordering among
    /// equal counts is unspecified but stable within one call.
    pub fn get_results(&self) -> TrafficInfo {
        let counters = self.counters.read();

        let protocol_counts = counters
            .protocols
            .iter()
            .map(|(label, count)| (label.to_string(), *count))
            .collect();

        let mut ports: Vec<_> = counters.ports.iter().collect();
        ports.sort_by(|a, b| b.1.cmp(a.1));
        ports.truncate(TOP_PORTS);
        let top_ports = ports
            .into_iter()
            .map(|((transport, port), count)| PortCount {
                port: *port,
                protocol: transport.to_string(),
                count: *count,
            })
            .collect();

        let mut talkers: Vec<_> = counters.talkers.iter().collect();
        talkers.sort_by(|a, b| {
            let a_total = a.1.bytes_sent + a.1.bytes_received;
            let b_total = b.1.bytes_sent + b.1.bytes_received;
            b_total.cmp(&a_total)
        });
        talkers.truncate(TOP_TALKERS);
        let top_talkers = talkers
            .into_iter()
            .map(|(ip, stats)| TalkerInfo {
                ip: ip.to_string(),
                bytes_sent: stats.bytes_sent,
                bytes_received: stats.bytes_received,
                packets_sent: stats.packets_sent,
                packets_received: stats.packets_received,
            })
            .collect();

        let mut domains: Vec<_> = counters.domains.iter().collect();
        domains.sort_by(|a, b| b.1.query_count.cmp(&a.1.query_count));
        domains.truncate(TOP_DOMAINS);
        let dns_domains = domains
            .into_iter()
            .map(|(domain, stats)| DnsDomainInfo {
                domain: domain.clone(),
                query_count: stats.query_count,
                querying_ips: stats.querying_ips.iter().map(|ip| ip.to_string()).collect(),
            })
            .collect();

        let mut destinations: Vec<_> = counters.destinations.iter().collect();
        destinations.sort_by(|a, b| b.1.bytes_total.cmp(&a.1.bytes_total));
        destinations.truncate(TOP_DESTINATIONS);
        let destinations = destinations
            .into_iter()
            .map(|(ip, stats)| DestinationInfo {
                address: ip.to_string(),
                connection_count: stats.connection_count,
                bytes_total: stats.bytes_total,
            })
            .collect();

        TrafficInfo {
            protocol_counts,
            top_ports,
            top_talkers,
            dns_domains,
            destinations,
        }
    }
}

impl PacketSink for TrafficAnalyzer {
    fn process(&self, packet: &PacketView<'_>) {
        let mut counters = self.counters.write();

        *counters.protocols.entry(packet.protocol()).or_default() += 1;

        let size = packet.len() as u64;
        let ips = packet.ips();

        if let Some((src_ip, dst_ip)) = ips {
            let sender = counters.talkers.entry(src_ip).or_default();
            sender.packets_sent += 1;
            sender.bytes_sent += size;

            let receiver = counters.talkers.entry(dst_ip).or_default();
            receiver.packets_received += 1;
            receiver.bytes_received += size;

            if !self.is_local(&dst_ip) {
                let dest = counters.destinations.entry(dst_ip).or_default();
                dest.connection_count += 1;
                dest.bytes_total += size;
            }
        }

        if let Some((_, dst_port, transport)) = packet.transport_ports() {
            if dst_port > 0 {
                *counters.ports.entry((transport, dst_port)).or_default() += 1;
            }
        }

        if let Some(dns) = packet.dns() {
            let src_ip = ips.map(|(src, _)| src);
            for domain in dns.questions {
                if domain.is_empty() {
                    continue;
                }
                let stats = counters.domains.entry(domain).or_default();
                stats.query_count += 1;
                if let Some(src_ip) = src_ip {
                    stats.querying_ips.insert(src_ip);
                }
            }
        }
    }
}
