use crate::error::{ParseError, Result};
use std::fmt;
use std::str::FromStr;

/// A 128-bit IPv6 address, stored as 16 bytes in network order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ipv6Address(pub(crate) [u8; 16]);

impl Ipv6Address {
    pub const fn from_bytes(bytes: [u8; 16]) -> Ipv6Address {
        Ipv6Address(bytes)
    }

    pub const fn octets(&self) -> [u8; 16] {
        self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }

    pub fn is_loopback(&self) -> bool {
        self.0 == {
            let mut a = [0u8; 16];
            a[15] = 1;
            a
        }
    }

    pub fn is_multicast(&self) -> bool {
        self.0[0] == 0xFF
    }

    pub fn and(&self, other: &Ipv6Address) -> Ipv6Address {
        let mut out = [0u8; 16];
        for i in 0..16 {
            out[i] = self.0[i] & other.0[i];
        }
        Ipv6Address(out)
    }

    /// A mask with the top `n` bits set.
    pub fn from_prefix_length(n: u8) -> Ipv6Address {
        assert!(n <= 128, "IPv6 prefix length must be <= 128");
        let mut out = [0u8; 16];
        let full_bytes = (n / 8) as usize;
        let rem_bits = n % 8;
        for b in out.iter_mut().take(full_bytes) {
            *b = 0xFF;
        }
        if rem_bits > 0 && full_bytes < 16 {
            out[full_bytes] = 0xFFu8 << (8 - rem_bits);
        }
        Ipv6Address(out)
    }
}

impl FromStr for Ipv6Address {
    type Err = ParseError;

    /// Parses RFC 5952 textual form, including `::` compression.
    fn from_str(s: &str) -> Result<Ipv6Address> {
        let invalid = || ParseError::InvalidAddress(s.to_string());

        if s.matches("::").count() > 1 {
            return Err(invalid());
        }

        let (head, tail, has_compression) = match s.split_once("::") {
            Some((h, t)) => (h, t, true),
            None => (s, "", false),
        };

        let parse_groups = |text: &str| -> Result<Vec<u16>> {
            if text.is_empty() {
                return Ok(vec![]);
            }
            text.split(':')
                .map(|g| u16::from_str_radix(g, 16).map_err(|_| invalid()))
                .collect()
        };

        let head_groups = parse_groups(head)?;
        let tail_groups = parse_groups(tail)?;

        let mut groups = Vec::with_capacity(8);
        if has_compression {
            let missing = 8usize
                .checked_sub(head_groups.len() + tail_groups.len())
                .ok_or_else(invalid)?;
            groups.extend(head_groups);
            groups.extend(std::iter::repeat(0u16).take(missing));
            groups.extend(tail_groups);
        } else {
            groups = head_groups;
        }

        if groups.len() != 8 {
            return Err(invalid());
        }

        let mut out = [0u8; 16];
        for (i, g) in groups.into_iter().enumerate() {
            let b = g.to_be_bytes();
            out[i * 2] = b[0];
            out[i * 2 + 1] = b[1];
        }
        Ok(Ipv6Address(out))
    }
}

impl fmt::Display for Ipv6Address {
    /// RFC 5952 canonical form: longest run of zero groups compressed to
    /// `::`, lowercase hex, no leading zeros within a group.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut groups = [0u16; 8];
        for i in 0..8 {
            groups[i] = u16::from_be_bytes([self.0[i * 2], self.0[i * 2 + 1]]);
        }

        // find the longest run of zero groups (length >= 2, per RFC 5952)
        let mut best = (0usize, 0usize); // (start, len)
        let mut cur_start = 0usize;
        let mut cur_len = 0usize;
        for (i, &g) in groups.iter().enumerate() {
            if g == 0 {
                if cur_len == 0 {
                    cur_start = i;
                }
                cur_len += 1;
                if cur_len > best.1 {
                    best = (cur_start, cur_len);
                }
            } else {
                cur_len = 0;
            }
        }
        if best.1 < 2 {
            best = (0, 0);
        }

        let mut i = 0;
        let mut first = true;
        while i < 8 {
            if best.1 > 0 && i == best.0 {
                write!(f, "::")?;
                i += best.1;
                first = true;
                continue;
            }
            if !first {
                write!(f, ":")?;
            }
            write!(f, "{:x}", groups[i])?;
            first = false;
            i += 1;
        }
        Ok(())
    }
}

impl fmt::Debug for Ipv6Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ipv6Address({self})")
    }
}

impl From<[u8; 16]> for Ipv6Address {
    fn from(bytes: [u8; 16]) -> Self {
        Ipv6Address(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_loopback() {
        let a: Ipv6Address = "::1".parse().unwrap();
        assert!(a.is_loopback());
        assert_eq!(a.to_string(), "::1");
    }

    #[test]
    fn compresses_longest_run() {
        let a = Ipv6Address::from_bytes([
            0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
        ]);
        assert_eq!(a.to_string(), "2001:db8::1");
    }

    #[test]
    fn rejects_double_compression() {
        assert!("::1::2".parse::<Ipv6Address>().is_err());
    }

    #[test]
    fn full_form_round_trips() {
        let s = "2001:db8:85a3:0:0:8a2e:370:7334";
        let a: Ipv6Address = s.parse().unwrap();
        let b: Ipv6Address = a.to_string().parse().unwrap();
        assert_eq!(a, b);
    }
}
