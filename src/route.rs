//! Routing/hostname collaborators (spec §6): trait objects the caller
//! supplies so the core never does its own socket or `/etc/hosts` I/O.
//!
//! Grounded in the same pattern as [`crate::iface::InterfaceInfo`] being
//! a passive data holder rather than a live query surface: `RoutingTable`
//! and `Resolver` are the two collaborators a caller plugs in at the
//! edges (building a packet, printing one) rather than anything the
//! dissection core reaches for on its own.

use crate::address::Ipv4Address;

/// Supplies the outbound route for a destination, so a caller building
/// an [`crate::pdu::Ipv4`] header with an unspecified (`0.0.0.0`) source
/// address can fill it in without the core performing the lookup
/// itself (spec §4.4's MUST on zero-source-address fill-in).
pub trait RoutingTable {
    /// Returns the source address that should be used to reach `dst`,
    /// or `None` if no route covers it.
    fn route_for(&self, dst: Ipv4Address) -> Option<Ipv4Address>;
}

/// Supplies a human-readable name for an address, for callers that want
/// to print a packet stack with resolved hostnames rather than raw
/// addresses. Never consulted by `parse`/`write_into`.
pub trait Resolver {
    fn resolve(&self, addr: Ipv4Address) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StaticTable(HashMap<Ipv4Address, Ipv4Address>);
    impl RoutingTable for StaticTable {
        fn route_for(&self, dst: Ipv4Address) -> Option<Ipv4Address> {
            self.0.get(&dst).copied()
        }
    }

    #[test]
    fn static_table_returns_configured_route() {
        let mut map = HashMap::new();
        let dst = "8.8.8.8".parse().unwrap();
        let src = "192.168.1.1".parse().unwrap();
        map.insert(dst, src);
        let table = StaticTable(map);
        assert_eq!(table.route_for(dst), Some(src));
        assert_eq!(table.route_for("1.1.1.1".parse().unwrap()), None);
    }
}
