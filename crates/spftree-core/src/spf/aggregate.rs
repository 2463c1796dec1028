//! Address-space aggregation for `ip4`/`ip6` literals
//!
//! Counts are informational: a literal that does not parse counts as a
//! single address, and overlapping ranges are summed, not merged.

use ipnet::{Ipv4Net, Ipv6Net};
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::debug;

/// Number of addresses an `ip4:` literal denotes
pub fn ip4_block_size(literal: &str) -> u64 {
    let size = if literal.contains('/') {
        literal
            .parse::<Ipv4Net>()
            .ok()
            .map(|net| 1u64 << (32 - u32::from(net.prefix_len())))
    } else {
        literal.parse::<Ipv4Addr>().ok().map(|_| 1)
    };

    size.unwrap_or_else(|| {
        debug!("Malformed ip4 literal {:?}, counting as one address", literal);
        1
    })
}

/// Number of addresses an `ip6:` literal denotes, saturating at `u128::MAX`
pub fn ip6_block_size(literal: &str) -> u128 {
    let size = if literal.contains('/') {
        literal.parse::<Ipv6Net>().ok().map(|net| {
            1u128
                .checked_shl(128 - u32::from(net.prefix_len()))
                .unwrap_or(u128::MAX)
        })
    } else {
        literal.parse::<Ipv6Addr>().ok().map(|_| 1)
    };

    size.unwrap_or_else(|| {
        debug!("Malformed ip6 literal {:?}, counting as one address", literal);
        1
    })
}

/// Sum of [`ip4_block_size`] over `literals`
pub fn ip4_total<'a>(literals: impl IntoIterator<Item = &'a str>) -> u64 {
    literals
        .into_iter()
        .fold(0u64, |acc, literal| acc.saturating_add(ip4_block_size(literal)))
}

/// Sum of [`ip6_block_size`] over `literals`
pub fn ip6_total<'a>(literals: impl IntoIterator<Item = &'a str>) -> u128 {
    literals
        .into_iter()
        .fold(0u128, |acc, literal| acc.saturating_add(ip6_block_size(literal)))
}
