//! Helpers shared by unit tests that bind local sockets.

pub mod socket_guard;
