//! Host-boundary types: the outgoing event channel and its JSON-RPC
//! notification encoding.

pub mod host_channel;
