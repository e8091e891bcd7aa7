//! Minimal DHCPv4 reader.
//!
//! Extracts the three fields passive discovery cares about: the client
//! hardware address, the assigned address (yiaddr), and the Hostname
//! option (12). Everything else in the message is skipped.

use std::net::Ipv4Addr;

use super::packet::MacAddr;

const FIXED_HEADER_LEN: usize = 236;
const MAGIC_COOKIE: [u8; 4] = [0x63, 0x82, 0x53, 0x63];

const OPT_PAD: u8 = 0;
const OPT_HOSTNAME: u8 = 12;
const OPT_END: u8 = 255;

#[derive(Debug, Clone)]
pub struct DhcpMessage {
    pub client_mac: MacAddr,
    /// The `yiaddr` field; unspecified when the server has not assigned one.
    pub your_ip: Ipv4Addr,
    pub hostname: Option<String>,
}

impl DhcpMessage {
    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() < FIXED_HEADER_LEN + 4 {
            return None;
        }
        let op = payload[0];
        let htype = payload[1];
        let hlen = payload[2];
        if (op != 1 && op != 2) || htype != 1 || hlen != 6 {
            return None;
        }
        if payload[FIXED_HEADER_LEN..FIXED_HEADER_LEN + 4] != MAGIC_COOKIE {
            return None;
        }

        let your_ip = Ipv4Addr::new(payload[16], payload[17], payload[18], payload[19]);
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&payload[28..34]);

        let hostname = parse_hostname(&payload[FIXED_HEADER_LEN + 4..]);

        Some(Self {
            client_mac: MacAddr(mac),
            your_ip,
            hostname,
        })
    }
}

fn parse_hostname(mut options: &[u8]) -> Option<String> {
    while let Some(&code) = options.first() {
        match code {
            OPT_PAD => {
                options = &options[1..];
            }
            OPT_END => return None,
            _ => {
                let len = *options.get(1)? as usize;
                let value = options.get(2..2 + len)?;
                if code == OPT_HOSTNAME {
                    let name = String::from_utf8_lossy(value).trim().to_string();
                    if !name.is_empty() {
                        return Some(name);
                    }
                    return None;
                }
                options = &options[2 + len..];
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(client_mac: [u8; 6], your_ip: [u8; 4], hostname: Option<&str>) -> Vec<u8> {
        let mut msg = vec![0u8; FIXED_HEADER_LEN];
        msg[0] = 2; // BOOTREPLY
        msg[1] = 1; // ethernet
        msg[2] = 6; // hlen
        msg[16..20].copy_from_slice(&your_ip);
        msg[28..34].copy_from_slice(&client_mac);
        msg.extend_from_slice(&MAGIC_COOKIE);
        msg.extend_from_slice(&[53, 1, 2]); // message type: offer
        if let Some(name) = hostname {
            msg.push(OPT_HOSTNAME);
            msg.push(name.len() as u8);
            msg.extend_from_slice(name.as_bytes());
        }
        msg.push(OPT_END);
        msg
    }

    #[test]
    fn test_parse_offer() {
        let payload = offer(
            [0xde, 0xad, 0xbe, 0xef, 0x00, 0x01],
            [10, 0, 0, 55],
            Some("workstation-7"),
        );
        let msg = DhcpMessage::parse(&payload).unwrap();
        assert_eq!(msg.client_mac.to_string(), "de:ad:be:ef:00:01");
        assert_eq!(msg.your_ip, Ipv4Addr::new(10, 0, 0, 55));
        assert_eq!(msg.hostname.as_deref(), Some("workstation-7"));
    }

    #[test]
    fn test_parse_without_hostname() {
        let payload = offer([0xde, 0xad, 0xbe, 0xef, 0x00, 0x02], [0, 0, 0, 0], None);
        let msg = DhcpMessage::parse(&payload).unwrap();
        assert!(msg.hostname.is_none());
        assert!(msg.your_ip.is_unspecified());
    }

    #[test]
    fn test_reject_bad_cookie() {
        let mut payload = offer([0; 6], [0, 0, 0, 0], None);
        payload[FIXED_HEADER_LEN] = 0x00;
        assert!(DhcpMessage::parse(&payload).is_none());
    }

    #[test]
    fn test_reject_short_payload() {
        assert!(DhcpMessage::parse(&[0u8; 100]).is_none());
    }

    #[test]
    fn test_reject_non_ethernet_hardware() {
        let mut payload = offer([0; 6], [0, 0, 0, 0], None);
        payload[1] = 7;
        assert!(DhcpMessage::parse(&payload).is_none());
    }
}
