//! ARP body parsing and request-frame construction.
//!
//! Only ethernet/IPv4 ARP (htype 1, ptype 0x0800) is handled; anything
//! else is treated as undecodable and skipped.

use std::net::Ipv4Addr;

use super::packet::{MacAddr, ETHERTYPE_ARP, ETHERTYPE_IPV4};

const ARP_BODY_LEN: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOp {
    Request,
    Reply,
    Other(u16),
}

impl From<u16> for ArpOp {
    fn from(op: u16) -> Self {
        match op {
            1 => ArpOp::Request,
            2 => ArpOp::Reply,
            other => ArpOp::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArpPacket {
    pub operation: ArpOp,
    pub sender_mac: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_mac: MacAddr,
    pub target_ip: Ipv4Addr,
}

impl ArpPacket {
    /// Parse an ARP body (the bytes following the ethernet header).
    pub fn parse(body: &[u8]) -> Option<Self> {
        if body.len() < ARP_BODY_LEN {
            return None;
        }
        let htype = u16::from_be_bytes([body[0], body[1]]);
        let ptype = u16::from_be_bytes([body[2], body[3]]);
        let hlen = body[4];
        let plen = body[5];
        if htype != 1 || ptype != ETHERTYPE_IPV4 || hlen != 6 || plen != 4 {
            return None;
        }
        let operation = ArpOp::from(u16::from_be_bytes([body[6], body[7]]));

        let mut sender_mac = [0u8; 6];
        sender_mac.copy_from_slice(&body[8..14]);
        let sender_ip = Ipv4Addr::new(body[14], body[15], body[16], body[17]);

        let mut target_mac = [0u8; 6];
        target_mac.copy_from_slice(&body[18..24]);
        let target_ip = Ipv4Addr::new(body[24], body[25], body[26], body[27]);

        Some(Self {
            operation,
            sender_mac: MacAddr(sender_mac),
            sender_ip,
            target_mac: MacAddr(target_mac),
            target_ip,
        })
    }
}

/// Build a broadcast ARP request frame (ethernet header included).
///
/// Used by the active sweep: who-has `target_ip`, tell
/// `sender_mac`/`sender_ip`.
pub fn build_request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Vec<u8> {
    let mut frame = Vec::with_capacity(14 + ARP_BODY_LEN);

    // Ethernet: broadcast destination, ARP ethertype
    frame.extend_from_slice(&MacAddr::BROADCAST.octets());
    frame.extend_from_slice(&sender_mac.octets());
    frame.extend_from_slice(&ETHERTYPE_ARP.to_be_bytes());

    // ARP body
    frame.extend_from_slice(&1u16.to_be_bytes()); // htype ethernet
    frame.extend_from_slice(&ETHERTYPE_IPV4.to_be_bytes()); // ptype
    frame.push(6); // hlen
    frame.push(4); // plen
    frame.extend_from_slice(&1u16.to_be_bytes()); // op request
    frame.extend_from_slice(&sender_mac.octets());
    frame.extend_from_slice(&sender_ip.octets());
    frame.extend_from_slice(&[0u8; 6]); // target hw unknown
    frame.extend_from_slice(&target_ip.octets());

    frame
}
