//! Minimal DNS wire-format reader.
//!
//! The pipeline only needs question and answer names (for mDNS hostnames,
//! fingerprint signals, and per-domain query counters), so this parses
//! exactly that: the header, QNAMEs with compression pointers, and answer
//! names with their RDATA skipped. Malformed input returns `None` and the
//! packet is ignored.

const HEADER_LEN: usize = 12;
const MAX_NAME_LEN: usize = 255;
const MAX_POINTER_JUMPS: usize = 8;
// Sanity bound; real LAN traffic stays far below this.
const MAX_RECORDS: u16 = 128;

#[derive(Debug, Clone, Default)]
pub struct DnsMessage {
    /// Question names, dotted, without a trailing dot.
    pub questions: Vec<String>,
    /// Answer record names, dotted, without a trailing dot.
    pub answers: Vec<String>,
}

impl DnsMessage {
    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() < HEADER_LEN {
            return None;
        }
        let qdcount = u16::from_be_bytes([payload[4], payload[5]]);
        let ancount = u16::from_be_bytes([payload[6], payload[7]]);
        if qdcount > MAX_RECORDS || ancount > MAX_RECORDS {
            return None;
        }

        let mut msg = DnsMessage::default();
        let mut offset = HEADER_LEN;

        for _ in 0..qdcount {
            let (name, next) = read_name(payload, offset)?;
            // QTYPE + QCLASS
            offset = next.checked_add(4)?;
            if offset > payload.len() {
                return None;
            }
            msg.questions.push(name);
        }

        for _ in 0..ancount {
            let (name, next) = read_name(payload, offset)?;
            // TYPE + CLASS + TTL + RDLENGTH
            if next + 10 > payload.len() {
                return None;
            }
            let rdlength = u16::from_be_bytes([payload[next + 8], payload[next + 9]]) as usize;
            offset = next.checked_add(10)?.checked_add(rdlength)?;
            if offset > payload.len() {
                return None;
            }
            msg.answers.push(name);
        }

        Some(msg)
    }
}

/// Read a possibly-compressed name starting at `offset`.
///
/// Returns the dotted name and the offset just past the name in the
/// original (non-pointer) byte stream.
fn read_name(payload: &[u8], offset: usize) -> Option<(String, usize)> {
    let mut name = String::new();
    let mut pos = offset;
    let mut end = None;
    let mut jumps = 0;

    loop {
        let len = *payload.get(pos)? as usize;
        if len == 0 {
            pos += 1;
            break;
        }
        if len & 0xC0 == 0xC0 {
            if jumps >= MAX_POINTER_JUMPS {
                return None;
            }
            jumps += 1;
            let low = *payload.get(pos + 1)? as usize;
            if end.is_none() {
                end = Some(pos + 2);
            }
            pos = ((len & 0x3F) << 8) | low;
            continue;
        }
        if len > 63 {
            return None;
        }
        let label = payload.get(pos + 1..pos + 1 + len)?;
        if !name.is_empty() {
            name.push('.');
        }
        name.push_str(&String::from_utf8_lossy(label));
        if name.len() > MAX_NAME_LEN {
            return None;
        }
        pos += 1 + len;
    }

    Some((name, end.unwrap_or(pos)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_name(name: &str) -> Vec<u8> {
        let mut out = Vec::new();
        for label in name.split('.') {
            out.push(label.len() as u8);
            out.extend_from_slice(label.as_bytes());
        }
        out.push(0);
        out
    }

    fn query(names: &[&str]) -> Vec<u8> {
        let mut msg = vec![0, 0, 0, 0];
        msg.extend_from_slice(&(names.len() as u16).to_be_bytes());
        msg.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
        for name in names {
            msg.extend_from_slice(&encode_name(name));
            msg.extend_from_slice(&[0, 12, 0, 1]); // PTR IN
        }
        msg
    }

    fn response(answers: &[&str]) -> Vec<u8> {
        let mut msg = vec![0, 0, 0x84, 0, 0, 0];
        msg.extend_from_slice(&(answers.len() as u16).to_be_bytes());
        msg.extend_from_slice(&[0, 0, 0, 0]);
        for name in answers {
            msg.extend_from_slice(&encode_name(name));
            msg.extend_from_slice(&[0, 1, 0, 1]); // A IN
            msg.extend_from_slice(&[0, 0, 0, 120]); // TTL
            msg.extend_from_slice(&[0, 4, 10, 0, 0, 1]); // RDLENGTH + RDATA
        }
        msg
    }

    #[test]
    fn test_parse_query() {
        let msg = DnsMessage::parse(&query(&["_companion-link._tcp.local"])).unwrap();
        assert_eq!(msg.questions, vec!["_companion-link._tcp.local"]);
        assert!(msg.answers.is_empty());
    }

    #[test]
    fn test_parse_response() {
        let msg = DnsMessage::parse(&response(&["MacBook-Pro.local"])).unwrap();
        assert!(msg.questions.is_empty());
        assert_eq!(msg.answers, vec!["MacBook-Pro.local"]);
    }

    #[test]
    fn test_parse_compressed_name() {
        // Question example.com, answer pointing back at offset 12
        let mut msg = vec![0, 0, 0x84, 0, 0, 1, 0, 1, 0, 0, 0, 0];
        msg.extend_from_slice(&encode_name("example.com"));
        msg.extend_from_slice(&[0, 1, 0, 1]);
        msg.extend_from_slice(&[0xC0, 12]); // pointer to question name
        msg.extend_from_slice(&[0, 1, 0, 1]);
        msg.extend_from_slice(&[0, 0, 0, 60]);
        msg.extend_from_slice(&[0, 4, 93, 184, 216, 34]);

        let parsed = DnsMessage::parse(&msg).unwrap();
        assert_eq!(parsed.questions, vec!["example.com"]);
        assert_eq!(parsed.answers, vec!["example.com"]);
    }

    #[test]
    fn test_reject_garbage() {
        assert!(DnsMessage::parse(&[]).is_none());
        assert!(DnsMessage::parse(&[0u8; 11]).is_none());
        // Claims one question but has no body
        assert!(DnsMessage::parse(&[0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0]).is_none());
    }

    #[test]
    fn test_reject_pointer_loop() {
        let mut msg = vec![0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0];
        msg.extend_from_slice(&[0xC0, 12]); // points at itself
        msg.extend_from_slice(&[0, 1, 0, 1]);
        assert!(DnsMessage::parse(&msg).is_none());
    }

    #[test]
    fn test_reject_absurd_counts() {
        let mut msg = vec![0, 0, 0, 0];
        msg.extend_from_slice(&1000u16.to_be_bytes());
        msg.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
        assert!(DnsMessage::parse(&msg).is_none());
    }
}
