//! # otp-replay (Farm-wide One-Time Code Replay Prevention)
//!
//! `otp-replay` runs next to every member of an authentication farm and
//! answers one question for the sign-in path: "has this one-time code already
//! been presented?". It does not compute or verify codes; it only remembers
//! which ones were consumed, for how long, and under which policy.
//!
//! ## Strictness
//!
//! The policy travels with every check, so an operator can change it without
//! restarting the farm:
//!
//! - **`disabled`:** always accept, record nothing.
//! - **`partial_match`:** reject the same user + code coming from a *different*
//!   source address; retries from the original address pass.
//! - **`full_match`:** reject the same user + code from anywhere.
//!
//! ## Farm Replication
//!
//! Every node decides locally under a single store lock, then forwards accepted
//! codes to the participating peers with propagation disabled, so a replay that
//! lands on another node is caught there too. Forwarding is best effort, one hop,
//! and never changes the local answer. A restart forgets all replay state.
//!
//! ## Failure Policy
//!
//! Faults inside the subsystem are logged with a stable `event_id` and surface
//! only as a rejected attempt (fail closed); peer failures are logged and ignored.

pub mod api;
pub mod cli;
pub mod replay;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
