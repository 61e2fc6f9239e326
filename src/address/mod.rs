//! Address types: IPv4, IPv6, fixed-length hardware addresses, and the
//! generic address-range iterator that works over any of them.
//!
//! Grounded in `examples/original_source/include/tins/ip_address.h`,
//! `ipv6_address.h`, `hw_address.h`, and `address_range.h`: same
//! predicates, same `from_prefix_length`/`from_mask` constructors, same
//! closed-interval-with-`only_hosts` iterator semantics, re-expressed as
//! plain Rust value types instead of the C++ template hierarchy.

mod hw;
mod ipv4;
mod ipv6;
mod range;

pub use hw::{HwAddress, MacAddress};
pub use ipv4::Ipv4Address;
pub use ipv6::Ipv6Address;
pub use range::{AddressRange, RangeAddress};
