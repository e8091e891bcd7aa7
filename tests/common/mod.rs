//! Byte-level frame builders shared by the integration tests.
//!
//! Checksums are left zeroed; the parsers under test do not verify them.
//! Length fields are kept consistent so etherparse slicing succeeds.

#![allow(dead_code)]

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;

pub fn mac(s: &str) -> [u8; 6] {
    let mut octets = [0u8; 6];
    for (i, part) in s.split(':').enumerate() {
        octets[i] = u8::from_str_radix(part, 16).unwrap();
    }
    octets
}

pub fn ip(s: &str) -> [u8; 4] {
    let addr: std::net::Ipv4Addr = s.parse().unwrap();
    addr.octets()
}

pub fn ethernet(dst: [u8; 6], src: [u8; 6], ethertype: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(14 + payload.len());
    frame.extend_from_slice(&dst);
    frame.extend_from_slice(&src);
    frame.extend_from_slice(&ethertype.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Ethernet + IPv4 + UDP frame.
pub fn udp_frame(
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    src_ip: [u8; 4],
    dst_ip: [u8; 4],
    src_port: u16,
    dst_port: u16,
    ttl: u8,
    payload: &[u8],
) -> Vec<u8> {
    let udp_len = (8 + payload.len()) as u16;
    let total_len = 20 + udp_len;

    let mut ipv4 = Vec::with_capacity(total_len as usize);
    ipv4.push(0x45); // version 4, ihl 5
    ipv4.push(0x00);
    ipv4.extend_from_slice(&total_len.to_be_bytes());
    ipv4.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // id, flags/frag
    ipv4.push(ttl);
    ipv4.push(17); // UDP
    ipv4.extend_from_slice(&[0x00, 0x00]); // checksum
    ipv4.extend_from_slice(&src_ip);
    ipv4.extend_from_slice(&dst_ip);

    ipv4.extend_from_slice(&src_port.to_be_bytes());
    ipv4.extend_from_slice(&dst_port.to_be_bytes());
    ipv4.extend_from_slice(&udp_len.to_be_bytes());
    ipv4.extend_from_slice(&[0x00, 0x00]); // checksum
    ipv4.extend_from_slice(payload);

    ethernet(dst_mac, src_mac, ETHERTYPE_IPV4, &ipv4)
}

/// UDP frame padded with payload zeros to an exact wire length.
pub fn udp_frame_sized(
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    src_ip: [u8; 4],
    dst_ip: [u8; 4],
    frame_len: usize,
) -> Vec<u8> {
    assert!(frame_len > 14 + 20 + 8);
    let payload = vec![0u8; frame_len - 14 - 20 - 8];
    udp_frame(src_mac, dst_mac, src_ip, dst_ip, 40000, 9, 255, &payload)
}

/// Ethernet + ARP frame (request op 1, reply op 2).
pub fn arp_frame(
    op: u16,
    src_mac: [u8; 6],
    sender_mac: [u8; 6],
    sender_ip: [u8; 4],
    target_mac: [u8; 6],
    target_ip: [u8; 4],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(28);
    body.extend_from_slice(&1u16.to_be_bytes()); // htype ethernet
    body.extend_from_slice(&ETHERTYPE_IPV4.to_be_bytes());
    body.push(6);
    body.push(4);
    body.extend_from_slice(&op.to_be_bytes());
    body.extend_from_slice(&sender_mac);
    body.extend_from_slice(&sender_ip);
    body.extend_from_slice(&target_mac);
    body.extend_from_slice(&target_ip);

    ethernet([0xff; 6], src_mac, ETHERTYPE_ARP, &body)
}

fn dns_name(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for label in name.split('.') {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    out
}

/// DNS query payload with the given question names (type PTR).
pub fn dns_query(names: &[&str]) -> Vec<u8> {
    let mut msg = vec![0, 0, 0, 0];
    msg.extend_from_slice(&(names.len() as u16).to_be_bytes());
    msg.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
    for name in names {
        msg.extend_from_slice(&dns_name(name));
        msg.extend_from_slice(&[0, 12, 0, 1]);
    }
    msg
}

/// DNS response payload with the given answer names (type A).
pub fn dns_response(answers: &[&str]) -> Vec<u8> {
    let mut msg = vec![0, 0, 0x84, 0, 0, 0];
    msg.extend_from_slice(&(answers.len() as u16).to_be_bytes());
    msg.extend_from_slice(&[0, 0, 0, 0]);
    for name in answers {
        msg.extend_from_slice(&dns_name(name));
        msg.extend_from_slice(&[0, 1, 0, 1]);
        msg.extend_from_slice(&[0, 0, 0, 120]);
        msg.extend_from_slice(&[0, 4, 10, 0, 0, 1]);
    }
    msg
}

/// DHCPv4 payload (BOOTREPLY) with client hardware address, yiaddr, and
/// an optional Hostname option.
pub fn dhcp_offer(client_mac: [u8; 6], your_ip: [u8; 4], hostname: Option<&str>) -> Vec<u8> {
    let mut msg = vec![0u8; 236];
    msg[0] = 2; // BOOTREPLY
    msg[1] = 1; // ethernet
    msg[2] = 6; // hlen
    msg[16..20].copy_from_slice(&your_ip);
    msg[28..34].copy_from_slice(&client_mac);
    msg.extend_from_slice(&[0x63, 0x82, 0x53, 0x63]); // magic cookie
    msg.extend_from_slice(&[53, 1, 2]); // message type: offer
    if let Some(name) = hostname {
        msg.push(12);
        msg.push(name.len() as u8);
        msg.extend_from_slice(name.as_bytes());
    }
    msg.push(255);
    msg
}
