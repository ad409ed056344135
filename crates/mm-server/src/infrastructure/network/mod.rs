//! Network adapters: the TCP accept loop and zeroconf advertisement.

pub mod advertiser;
pub mod listener;
