//! Stable numeric categories for replay events.
//!
//! Every failure caught inside the replay subsystem is logged with an
//! `event_id` field so log pipelines can alert on a category without parsing
//! messages. The numbers are part of the operational contract; do not reuse
//! or renumber them.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum EventCategory {
    ReplayRejected = 1000,
    ReplayAccepted = 1001,
    MalformedRecord = 2000,
    StoreFault = 2001,
    CleanupFault = 2002,
    PeerUnreachable = 3000,
    PeerRejectedCall = 3001,
    PeerTimeout = 3002,
    InvalidPeerAddress = 3003,
    StateReset = 4000,
}

impl EventCategory {
    #[must_use]
    pub const fn id(self) -> u16 {
        self as u16
    }
}
