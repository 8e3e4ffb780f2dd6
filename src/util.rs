//! Small string/byte helpers shared across the dissection, flow-key, and
//! script-codec modules.

/// Renders `bytes` as lowercase hex, zero-padded to two digits per byte.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Trims ASCII whitespace from both ends, in place.
pub fn trim(s: &mut String) {
    let trimmed = s.trim().to_string();
    *s = trimmed;
}

/// Lower-cases ASCII letters in place; non-ASCII bytes pass through
/// untouched (header names in this crate are always ASCII).
pub fn to_lower(s: &mut String) {
    *s = s.to_ascii_lowercase();
}

/// Converts a raw 4- or 16-byte address into a `std::net::IpAddr`.
pub fn bytes_to_ip_addr(bytes: &[u8]) -> crate::error::Result<std::net::IpAddr> {
    match bytes.len() {
        4 => {
            let mut octets = [0u8; 4];
            octets.copy_from_slice(bytes);
            Ok(std::net::IpAddr::from(octets))
        }
        16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(bytes);
            Ok(std::net::IpAddr::from(octets))
        }
        other => Err(crate::error::Error::Internal(format!(
            "unrecognized address length: {other} bytes"
        ))),
    }
}
