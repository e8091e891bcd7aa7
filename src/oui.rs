//! MAC-prefix (OUI) vendor lookup.
//!
//! Built once from the embedded `assets/oui.txt` database
//! (`PREFIX<TAB>VENDOR` lines, prefixes in `XX:XX:XX` or `XX-XX-XX`
//! form). When the embedded data yields no entries, a small built-in
//! table of common vendors is used instead. Read-only after
//! construction, so no locking is needed.

use std::collections::HashMap;

/// Sentinel returned when no prefix matches.
pub const UNKNOWN_VENDOR: &str = "Unknown";

static EMBEDDED_DB: &str = include_str!("../assets/oui.txt");

/// Fallback prefixes for when the embedded database is unusable.
const FALLBACK_VENDORS: &[(&str, &str)] = &[
    ("00:00:0C", "Cisco"),
    ("00:01:42", "Cisco"),
    ("00:03:93", "Apple"),
    ("00:0A:27", "Apple"),
    ("00:0A:95", "Apple"),
    ("00:17:F2", "Apple"),
    ("00:1B:63", "Apple"),
    ("00:25:00", "Apple"),
    ("A4:5E:60", "Apple"),
    ("AC:BC:32", "Apple"),
    ("AC:E4:B5", "Apple"),
    ("F0:99:BF", "Apple"),
    ("00:50:56", "VMware"),
    ("00:0C:29", "VMware"),
    ("00:05:69", "VMware"),
    ("08:00:27", "VirtualBox"),
    ("0A:00:27", "VirtualBox"),
    ("52:54:00", "QEMU"),
    ("00:16:3E", "Xen"),
    ("00:15:5D", "Hyper-V"),
    ("00:1A:11", "Google"),
    ("3C:5A:B4", "Google"),
    ("B8:27:EB", "Raspberry Pi Foundation"),
    ("DC:A6:32", "Raspberry Pi Trading"),
    ("00:14:22", "Dell"),
    ("00:21:5A", "Hewlett Packard"),
    ("00:1C:43", "Samsung Electronics"),
    ("00:02:B3", "Intel"),
    ("90:E2:BA", "Intel"),
];

/// Vendor keywords that indicate a virtual machine NIC.
const VIRTUAL_KEYWORDS: &[&str] = &["vmware", "virtualbox", "qemu", "xen", "hyper-v", "virtual"];

/// Immutable OUI prefix to vendor map.
pub struct OuiDb {
    vendors: HashMap<String, String>,
}

impl OuiDb {
    pub fn new() -> Self {
        let mut vendors = parse_db(EMBEDDED_DB);
        if vendors.is_empty() {
            vendors = FALLBACK_VENDORS
                .iter()
                .map(|(prefix, vendor)| (normalize_prefix(prefix), vendor.to_string()))
                .collect();
        }
        Self { vendors }
    }

    /// Look up the vendor for a MAC address by its first three octets.
    ///
    /// Lookups are normalized (uppercase, `-` treated as `:`), so
    /// `vendor("ac:bc:32:00:00:01")` and `vendor("AC-BC-32-00-00-01")`
    /// return the same result. Returns [`UNKNOWN_VENDOR`] on a miss.
    pub fn vendor(&self, mac: &str) -> &str {
        let normalized = normalize_prefix(mac);
        if normalized.len() < 8 {
            return UNKNOWN_VENDOR;
        }
        self.vendors
            .get(&normalized[..8])
            .map(String::as_str)
            .unwrap_or(UNKNOWN_VENDOR)
    }

    /// True when the vendor name indicates a virtual machine NIC.
    pub fn is_virtual_vendor(&self, vendor: &str) -> bool {
        let vendor = vendor.to_lowercase();
        VIRTUAL_KEYWORDS.iter().any(|kw| vendor.contains(kw))
    }

    pub fn len(&self) -> usize {
        self.vendors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty()
    }
}

impl Default for OuiDb {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_db(data: &str) -> HashMap<String, String> {
    let mut vendors = HashMap::new();
    for line in data.lines() {
        let Some((prefix, vendor)) = line.split_once('\t') else {
            continue;
        };
        let vendor = vendor.trim();
        if vendor.is_empty() {
            continue;
        }
        vendors.insert(normalize_prefix(prefix), vendor.to_string());
    }
    vendors
}

fn normalize_prefix(s: &str) -> String {
    s.trim().to_uppercase().replace('-', ":")
}
