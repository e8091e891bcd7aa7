//! Borrowed per-packet view with lazy field accessors.
//!
//! `PacketView` wraps one raw ethernet frame for the lifetime of a single
//! handler dispatch. The link layer is read directly from the frame bytes
//! (so ARP frames still yield MACs); IP and transport layers come from
//! etherparse slicing. Nothing is copied until a handler asks for it.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use etherparse::SlicedPacket;

use super::arp::ArpPacket;
use super::dhcp::DhcpMessage;
use super::dns::DnsMessage;

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;
pub const ETHERTYPE_VLAN: u16 = 0x8100;
pub const ETHERTYPE_IPV6: u16 = 0x86DD;

/// A hardware (MAC) address.
///
/// Displays as lowercase colon-separated hex, which is also the canonical
/// form used for registry keys.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Group bit (LSB of the first octet). Covers broadcast as well.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 6]
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for MacAddr {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut count = 0;
        for part in s.split(|c| c == ':' || c == '-') {
            if count == 6 || part.len() != 2 {
                return Err(());
            }
            octets[count] = u8::from_str_radix(part, 16).map_err(|_| ())?;
            count += 1;
        }
        if count != 6 {
            return Err(());
        }
        Ok(MacAddr(octets))
    }
}

/// Transport protocol carried by a packet, for port accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Transport {
    Tcp,
    Udp,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Tcp => write!(f, "TCP"),
            Transport::Udp => write!(f, "UDP"),
        }
    }
}

/// Coarse protocol label used by the traffic analyzer.
///
/// Every frame maps to exactly one label, so the per-label counts sum to
/// the engine's packet counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolLabel {
    Tcp,
    Udp,
    Icmp,
    Icmpv6,
    Arp,
    Ipv6,
    Ipv4,
    Other,
}

impl fmt::Display for ProtocolLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProtocolLabel::Tcp => "TCP",
            ProtocolLabel::Udp => "UDP",
            ProtocolLabel::Icmp => "ICMP",
            ProtocolLabel::Icmpv6 => "ICMPv6",
            ProtocolLabel::Arp => "ARP",
            ProtocolLabel::Ipv6 => "IPv6",
            ProtocolLabel::Ipv4 => "IPv4",
            ProtocolLabel::Other => "Other",
        };
        write!(f, "{}", s)
    }
}

/// Zero-copy view of a raw ethernet frame.
pub struct PacketView<'p> {
    data: &'p [u8],
    sliced: Option<SlicedPacket<'p>>,
}

impl<'p> PacketView<'p> {
    pub fn new(data: &'p [u8]) -> Self {
        Self {
            data,
            sliced: SlicedPacket::from_ethernet(data).ok(),
        }
    }

    /// Total frame length in bytes, as seen on the wire.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn src_mac(&self) -> Option<MacAddr> {
        if self.data.len() < 14 {
            return None;
        }
        let mut octets = [0u8; 6];
        octets.copy_from_slice(&self.data[6..12]);
        Some(MacAddr(octets))
    }

    pub fn dst_mac(&self) -> Option<MacAddr> {
        if self.data.len() < 14 {
            return None;
        }
        let mut octets = [0u8; 6];
        octets.copy_from_slice(&self.data[0..6]);
        Some(MacAddr(octets))
    }

    /// Ethertype after at most one 802.1Q tag, plus the payload offset.
    fn ether_type(&self) -> Option<(u16, usize)> {
        if self.data.len() < 14 {
            return None;
        }
        let ethertype = u16::from_be_bytes([self.data[12], self.data[13]]);
        if ethertype == ETHERTYPE_VLAN {
            if self.data.len() < 18 {
                return None;
            }
            let inner = u16::from_be_bytes([self.data[16], self.data[17]]);
            Some((inner, 18))
        } else {
            Some((ethertype, 14))
        }
    }

    /// Source and destination IP addresses (IPv4 or IPv6).
    pub fn ips(&self) -> Option<(IpAddr, IpAddr)> {
        match self.sliced.as_ref()?.net.as_ref()? {
            etherparse::NetSlice::Ipv4(ipv4) => {
                let header = ipv4.header();
                Some((
                    IpAddr::from(header.source_addr()),
                    IpAddr::from(header.destination_addr()),
                ))
            }
            etherparse::NetSlice::Ipv6(ipv6) => {
                let header = ipv6.header();
                Some((
                    IpAddr::from(header.source_addr()),
                    IpAddr::from(header.destination_addr()),
                ))
            }
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    /// TTL (IPv4) or hop limit (IPv6).
    pub fn ttl(&self) -> Option<u8> {
        match self.sliced.as_ref()?.net.as_ref()? {
            etherparse::NetSlice::Ipv4(ipv4) => Some(ipv4.header().ttl()),
            etherparse::NetSlice::Ipv6(ipv6) => Some(ipv6.header().hop_limit()),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    /// Source port, destination port, and transport for TCP/UDP packets.
    pub fn transport_ports(&self) -> Option<(u16, u16, Transport)> {
        match self.sliced.as_ref()?.transport.as_ref()? {
            etherparse::TransportSlice::Tcp(tcp) => {
                Some((tcp.source_port(), tcp.destination_port(), Transport::Tcp))
            }
            etherparse::TransportSlice::Udp(udp) => {
                Some((udp.source_port(), udp.destination_port(), Transport::Udp))
            }
            _ => None,
        }
    }

    pub fn udp_payload(&self) -> Option<&[u8]> {
        match self.sliced.as_ref()?.transport.as_ref()? {
            etherparse::TransportSlice::Udp(udp) => Some(udp.payload()),
            _ => None,
        }
    }

    /// Coarse protocol label, checked transport-first like the analyzer
    /// expects: TCP, UDP, ICMP, ICMPv6, then ARP, then bare IP, else Other.
    pub fn protocol(&self) -> ProtocolLabel {
        if let Some(sliced) = &self.sliced {
            match &sliced.transport {
                Some(etherparse::TransportSlice::Tcp(_)) => return ProtocolLabel::Tcp,
                Some(etherparse::TransportSlice::Udp(_)) => return ProtocolLabel::Udp,
                Some(etherparse::TransportSlice::Icmpv4(_)) => return ProtocolLabel::Icmp,
                Some(etherparse::TransportSlice::Icmpv6(_)) => return ProtocolLabel::Icmpv6,
                _ => {}
            }
        }
        if self.arp().is_some() {
            return ProtocolLabel::Arp;
        }
        if let Some(sliced) = &self.sliced {
            match &sliced.net {
                Some(etherparse::NetSlice::Ipv6(_)) => return ProtocolLabel::Ipv6,
                Some(etherparse::NetSlice::Ipv4(_)) => return ProtocolLabel::Ipv4,
                _ => {}
            }
        }
        ProtocolLabel::Other
    }

    /// Parse the ARP body, if this is an ARP frame.
    pub fn arp(&self) -> Option<ArpPacket> {
        let (ethertype, offset) = self.ether_type()?;
        if ethertype != ETHERTYPE_ARP {
            return None;
        }
        ArpPacket::parse(&self.data[offset..])
    }

    /// Parse the UDP payload as DNS for DNS-carrying ports (53, mDNS 5353).
    pub fn dns(&self) -> Option<DnsMessage> {
        let (src, dst, transport) = self.transport_ports()?;
        if transport != Transport::Udp {
            return None;
        }
        const DNS_PORTS: [u16; 2] = [53, 5353];
        if !DNS_PORTS.contains(&src) && !DNS_PORTS.contains(&dst) {
            return None;
        }
        DnsMessage::parse(self.udp_payload()?)
    }

    /// Parse the UDP payload as DHCPv4 when destined to ports 67/68.
    pub fn dhcp(&self) -> Option<DhcpMessage> {
        let (_, dst, transport) = self.transport_ports()?;
        if transport != Transport::Udp || (dst != 67 && dst != 68) {
            return None;
        }
        DhcpMessage::parse(self.udp_payload()?)
    }
}

/// True for addresses that never belong in a device's IP set.
pub fn is_unusable_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => *v4 == Ipv4Addr::UNSPECIFIED || *v4 == Ipv4Addr::BROADCAST,
        IpAddr::V6(v6) => v6.is_unspecified(),
    }
}
