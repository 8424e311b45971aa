//! Test suites for the notification server.

mod socket_behaviour;
pub(crate) mod support;
