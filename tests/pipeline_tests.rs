//! End-to-end tests of the handler pipeline fed with synthetic frames.
//!
//! The passive discovery, traffic analyzer, and fingerprint engine are
//! driven exactly as the capture engine drives them: one `PacketView`
//! per frame, handlers invoked in registration order.

mod common;

use std::sync::Arc;

use lanwatch::capture::{MacAddr, PacketSink, PacketView};
use lanwatch::discovery::{DeviceRegistry, PassiveDiscovery};
use lanwatch::fingerprint::FingerprintEngine;
use lanwatch::oui::OuiDb;
use lanwatch::traffic::TrafficAnalyzer;

use common::*;

const MDNS_GROUP_MAC: [u8; 6] = [0x01, 0x00, 0x5e, 0x00, 0x00, 0xfb];
const MDNS_GROUP_IP: [u8; 4] = [224, 0, 0, 251];

struct Pipeline {
    registry: Arc<DeviceRegistry>,
    passive: PassiveDiscovery,
    analyzer: Arc<TrafficAnalyzer>,
    fingerprints: Arc<FingerprintEngine>,
}

impl Pipeline {
    fn new(local_ip: Option<&str>) -> Self {
        let registry = Arc::new(DeviceRegistry::new());
        let oui = Arc::new(OuiDb::new());
        Self {
            passive: PassiveDiscovery::new(registry.clone(), oui),
            analyzer: Arc::new(TrafficAnalyzer::new(
                local_ip.map(|ip| ip.parse().unwrap()),
            )),
            fingerprints: Arc::new(FingerprintEngine::new(registry.clone())),
            registry,
        }
    }

    fn feed(&self, frame: &[u8]) {
        let view = PacketView::new(frame);
        self.passive.process(&view);
        self.analyzer.process(&view);
        self.fingerprints.process(&view);
    }

    fn device(&self, mac: &str) -> lanwatch::discovery::Device {
        self.registry
            .get(mac.parse::<MacAddr>().unwrap())
            .expect("device should exist")
    }
}

#[test]
fn single_arp_reply_creates_passive_device() {
    let pipeline = Pipeline::new(Some("192.168.1.10"));
    let frame = arp_frame(
        2,
        mac("aa:bb:cc:11:22:33"),
        mac("aa:bb:cc:11:22:33"),
        ip("192.168.1.42"),
        mac("66:77:88:99:aa:bb"),
        ip("192.168.1.10"),
    );
    pipeline.feed(&frame);

    assert_eq!(pipeline.registry.count(), 1);
    let device = pipeline.device("aa:bb:cc:11:22:33");
    assert_eq!(
        device.ips.iter().map(|ip| ip.to_string()).collect::<Vec<_>>(),
        vec!["192.168.1.42"]
    );
    assert_eq!(device.source.to_string(), "passive");

    let traffic = pipeline.analyzer.get_results();
    assert_eq!(traffic.protocol_counts.get("ARP"), Some(&1));
}

#[test]
fn mdns_apple_fingerprint() {
    let pipeline = Pipeline::new(Some("192.168.1.10"));
    let query = dns_query(&["iPad._companion-link._tcp.local"]);
    let frame = udp_frame(
        mac("ac:bc:32:00:00:01"),
        MDNS_GROUP_MAC,
        ip("192.168.1.30"),
        MDNS_GROUP_IP,
        5353,
        5353,
        255,
        &query,
    );
    pipeline.feed(&frame);
    pipeline.fingerprints.apply_fingerprints();

    let device = pipeline.device("ac:bc:32:00:00:01");
    assert_eq!(device.vendor.as_deref(), Some("Apple"));
    assert_eq!(device.hostname.as_deref(), Some("iPad"));
    assert_eq!(device.os_guess.as_deref(), Some("iOS"));
    assert!((device.confidence - 0.85).abs() < 1e-9);
    assert_eq!(device.signals.len(), 1);
    assert_eq!(device.signals[0].tag(), "mDNS:_companion-link._tcp");
}

#[test]
fn conflicting_signals_resolve_to_weighted_winner() {
    let pipeline = Pipeline::new(None);
    let device_mac = mac("aa:bb:cc:dd:ee:01");

    // LLMNR query: Windows 0.80
    let llmnr = udp_frame(
        device_mac,
        [0x01, 0x00, 0x5e, 0x00, 0x00, 0xfc],
        ip("192.168.1.77"),
        ip("224.0.0.252"),
        51000,
        5355,
        255,
        &[0u8; 24],
    );
    // Generic mDNS: macOS 0.50
    let mdns = udp_frame(
        device_mac,
        MDNS_GROUP_MAC,
        ip("192.168.1.77"),
        MDNS_GROUP_IP,
        5353,
        5353,
        255,
        &dns_query(&["_services._dns-sd._udp.local"]),
    );
    pipeline.feed(&llmnr);
    pipeline.feed(&mdns);
    pipeline.fingerprints.apply_fingerprints();

    let device = pipeline.device("aa:bb:cc:dd:ee:01");
    assert_eq!(device.os_guess.as_deref(), Some("Windows"));
    assert!((device.confidence - 0.80 / 1.30).abs() < 1e-9);
    assert_eq!(device.signals.len(), 2);
}

#[test]
fn dhcp_offer_records_client_hostname_and_ip() {
    let pipeline = Pipeline::new(Some("10.0.0.1"));
    let offer = dhcp_offer(mac("de:ad:be:ef:00:01"), ip("10.0.0.55"), Some("workstation-7"));
    let frame = udp_frame(
        mac("02:50:00:00:00:01"), // DHCP server
        [0xff; 6],
        ip("10.0.0.1"),
        ip("255.255.255.255"),
        67,
        68,
        64,
        &offer,
    );
    pipeline.feed(&frame);

    let device = pipeline.device("de:ad:be:ef:00:01");
    assert_eq!(device.hostname.as_deref(), Some("workstation-7"));
    assert!(device.ips.contains(&"10.0.0.55".parse().unwrap()));
}

#[test]
fn top_talker_ranking_by_total_bytes() {
    let pipeline = Pipeline::new(None);

    for _ in 0..100 {
        let frame = udp_frame_sized(
            mac("aa:00:00:00:00:02"),
            mac("aa:00:00:00:00:03"),
            ip("10.0.0.2"),
            ip("10.0.0.3"),
            1500,
        );
        pipeline.feed(&frame);
    }
    for _ in 0..50 {
        let frame = udp_frame_sized(
            mac("aa:00:00:00:00:04"),
            mac("aa:00:00:00:00:03"),
            ip("10.0.0.4"),
            ip("10.0.0.3"),
            1500,
        );
        pipeline.feed(&frame);
    }

    let traffic = pipeline.analyzer.get_results();
    let talkers = &traffic.top_talkers;
    assert_eq!(talkers[0].ip, "10.0.0.3");
    assert_eq!(talkers[0].bytes_received, 225_000);
    assert_eq!(talkers[0].packets_received, 150);
    assert_eq!(talkers[1].ip, "10.0.0.2");
    assert_eq!(talkers[1].bytes_sent, 150_000);
    assert_eq!(talkers[2].ip, "10.0.0.4");
    assert_eq!(talkers[2].bytes_sent, 75_000);
}

#[test]
fn replay_scales_counters_but_not_fingerprints() {
    let pipeline = Pipeline::new(None);
    let query = dns_query(&["iPhone._airplay._tcp.local"]);
    let frame = udp_frame(
        mac("ac:bc:32:00:00:07"),
        MDNS_GROUP_MAC,
        ip("192.168.1.31"),
        MDNS_GROUP_IP,
        5353,
        5353,
        255,
        &query,
    );

    for _ in 0..5 {
        pipeline.feed(&frame);
    }
    pipeline.fingerprints.apply_fingerprints();

    let device = pipeline.device("ac:bc:32:00:00:07");
    assert_eq!(device.signals.len(), 1);
    assert_eq!(device.os_guess.as_deref(), Some("macOS"));
    assert!((device.confidence - 0.85).abs() < 1e-9);

    let traffic = pipeline.analyzer.get_results();
    assert_eq!(traffic.protocol_counts.get("UDP"), Some(&5));
    let domain = traffic
        .dns_domains
        .iter()
        .find(|d| d.domain == "iPhone._airplay._tcp.local")
        .expect("domain should be counted");
    assert_eq!(domain.query_count, 5);
    assert_eq!(domain.querying_ips, vec!["192.168.1.31"]);
}

#[test]
fn protocol_counts_sum_to_packets_processed() {
    let pipeline = Pipeline::new(None);
    let frames: Vec<Vec<u8>> = vec![
        arp_frame(
            1,
            mac("aa:bb:cc:11:22:33"),
            mac("aa:bb:cc:11:22:33"),
            ip("192.168.1.5"),
            [0; 6],
            ip("192.168.1.1"),
        ),
        udp_frame(
            mac("aa:bb:cc:11:22:44"),
            mac("aa:bb:cc:11:22:55"),
            ip("192.168.1.6"),
            ip("192.168.1.7"),
            1234,
            9999,
            64,
            &[1, 2, 3],
        ),
        vec![0u8; 10], // undecodable
    ];
    for frame in &frames {
        pipeline.feed(frame);
    }

    let traffic = pipeline.analyzer.get_results();
    let total: u64 = traffic.protocol_counts.values().sum();
    assert_eq!(total, frames.len() as u64);
}

#[test]
fn broadcast_and_multicast_sources_create_no_devices() {
    let pipeline = Pipeline::new(None);

    let from_broadcast = udp_frame(
        [0xff; 6],
        mac("aa:bb:cc:11:22:33"),
        ip("192.168.1.9"),
        ip("192.168.1.10"),
        1000,
        2000,
        64,
        &[0u8; 4],
    );
    let from_multicast = udp_frame(
        MDNS_GROUP_MAC,
        mac("aa:bb:cc:11:22:33"),
        ip("192.168.1.9"),
        ip("192.168.1.10"),
        1000,
        2000,
        64,
        &[0u8; 4],
    );
    pipeline.feed(&from_broadcast);
    pipeline.feed(&from_multicast);

    // Destination MACs never create devices either.
    assert_eq!(pipeline.registry.count(), 0);
}

#[test]
fn ttl_boundaries() {
    let pipeline = Pipeline::new(None);
    let cases: [(u8, [u8; 6], Option<&str>); 4] = [
        (64, mac("aa:00:00:00:00:01"), Some("TTL:64")),
        (65, mac("aa:00:00:00:00:02"), None),
        (128, mac("aa:00:00:00:00:03"), Some("TTL:128")),
        (124, mac("aa:00:00:00:00:04"), None),
    ];

    for (ttl, src, _) in &cases {
        let frame = udp_frame(
            *src,
            mac("bb:00:00:00:00:01"),
            ip("10.1.1.1"),
            ip("10.1.1.2"),
            1000,
            9999,
            *ttl,
            &[0u8; 4],
        );
        pipeline.feed(&frame);
    }

    for (_, src, expected) in &cases {
        let signals = pipeline.fingerprints.signals_for(MacAddr(*src));
        match expected {
            Some(tag) => {
                assert_eq!(signals.len(), 1, "{:?}", src);
                assert_eq!(signals[0].tag(), *tag);
            }
            None => assert!(signals.is_empty(), "{:?}", src),
        }
    }
}

#[test]
fn mdns_port_without_dns_layer_yields_no_signal() {
    let pipeline = Pipeline::new(None);
    let device_mac = mac("aa:00:00:00:00:09");
    // Not a DNS message: too short to parse
    let frame = udp_frame(
        device_mac,
        MDNS_GROUP_MAC,
        ip("192.168.1.50"),
        MDNS_GROUP_IP,
        5353,
        5353,
        255,
        &[0xde, 0xad],
    );
    pipeline.feed(&frame);

    assert!(pipeline.fingerprints.signals_for(MacAddr(device_mac)).is_empty());
}

#[test]
fn external_destinations_only() {
    let pipeline = Pipeline::new(Some("192.168.1.10"));

    // Local destination: same /16
    let local = udp_frame(
        mac("aa:00:00:00:00:01"),
        mac("aa:00:00:00:00:02"),
        ip("192.168.1.5"),
        ip("192.168.44.6"),
        1000,
        443,
        64,
        &[0u8; 8],
    );
    // External destination
    let external = udp_frame(
        mac("aa:00:00:00:00:01"),
        mac("aa:00:00:00:00:02"),
        ip("192.168.1.5"),
        ip("1.1.1.1"),
        1000,
        443,
        64,
        &[0u8; 8],
    );
    pipeline.feed(&local);
    pipeline.feed(&external);

    let traffic = pipeline.analyzer.get_results();
    assert_eq!(traffic.destinations.len(), 1);
    assert_eq!(traffic.destinations[0].address, "1.1.1.1");
    assert_eq!(traffic.destinations[0].connection_count, 1);
}

#[test]
fn hostname_first_non_empty_wins() {
    let pipeline = Pipeline::new(None);
    let device_mac = mac("ac:bc:32:00:00:02");

    let first = udp_frame(
        device_mac,
        MDNS_GROUP_MAC,
        ip("192.168.1.61"),
        MDNS_GROUP_IP,
        5353,
        5353,
        255,
        &dns_query(&["FirstName._homekit._tcp.local"]),
    );
    let second = udp_frame(
        device_mac,
        MDNS_GROUP_MAC,
        ip("192.168.1.61"),
        MDNS_GROUP_IP,
        5353,
        5353,
        255,
        &dns_query(&["SecondName._homekit._tcp.local"]),
    );
    pipeline.feed(&first);
    pipeline.feed(&second);

    let device = pipeline.device("ac:bc:32:00:00:02");
    assert_eq!(device.hostname.as_deref(), Some("FirstName"));
}

#[test]
fn mdns_answer_names_provide_hostnames_too() {
    let pipeline = Pipeline::new(None);
    let device_mac = mac("ac:bc:32:00:00:03");

    let response = udp_frame(
        device_mac,
        MDNS_GROUP_MAC,
        ip("192.168.1.62"),
        MDNS_GROUP_IP,
        5353,
        5353,
        255,
        &dns_response(&["MacBook-Pro.local"]),
    );
    pipeline.feed(&response);

    let device = pipeline.device("ac:bc:32:00:00:03");
    assert_eq!(device.hostname.as_deref(), Some("MacBook-Pro"));
}

#[test]
fn device_invariants_hold_after_mixed_traffic() {
    let pipeline = Pipeline::new(Some("192.168.1.10"));

    let frames = [
        arp_frame(
            1,
            mac("aa:bb:cc:11:22:33"),
            mac("aa:bb:cc:11:22:33"),
            ip("192.168.1.5"),
            [0; 6],
            ip("192.168.1.1"),
        ),
        udp_frame(
            mac("aa:bb:cc:11:22:33"),
            MDNS_GROUP_MAC,
            ip("192.168.1.5"),
            MDNS_GROUP_IP,
            5353,
            5353,
            255,
            &dns_query(&["host._smb._tcp.local"]),
        ),
    ];
    for frame in &frames {
        pipeline.feed(frame);
    }
    pipeline.fingerprints.apply_fingerprints();

    for device in pipeline.registry.all() {
        assert!(device.first_seen <= device.last_seen);
        assert_eq!(device.mac, device.mac.to_lowercase());
        assert!(device.confidence >= 0.0 && device.confidence <= 0.95);
        if device.confidence > 0.0 {
            let guess = device.os_guess.as_deref().unwrap_or("");
            assert!(!guess.is_empty() && guess != "Unknown");
        }
        for ip in &device.ips {
            assert_ne!(ip.to_string(), "0.0.0.0");
            assert_ne!(ip.to_string(), "255.255.255.255");
        }
        // (type, detail) unique within a device
        let mut tags: Vec<String> = device.signals.iter().map(|s| s.tag()).collect();
        let before = tags.len();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), before);
    }

    // The smb-only device resolves to Unknown with zero confidence
    let device = pipeline.device("aa:bb:cc:11:22:33");
    assert_eq!(device.os_guess.as_deref(), Some("Unknown"));
    assert_eq!(device.confidence, 0.0);
}
