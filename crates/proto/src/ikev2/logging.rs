//! Structured logging for the IKEv2 initiator
//!
//! Thin helpers over `tracing` so every exchange event carries the same
//! context fields. Key material and authenticators are never logged, and
//! peer identities appear only as their ID type and length.
//!
//! # Log Levels
//!
//! - **TRACE**: SK payload internals (lengths only)
//! - **DEBUG**: Rejected messages, negotiation details
//! - **INFO**: State transitions, accepted proposals
//! - **WARN**: Unknown users, credential fallback
//! - **ERROR**: Authentication failures
//!
//! # Example
//!
//! ```no_run
//! use eapike_proto::ikev2::logging;
//!
//! tracing_subscriber::fmt()
//!     .with_env_filter("eapike_proto::ikev2=debug")
//!     .init();
//!
//! logging::log_state_transition(&[0x01; 8], &[0x02; 8], "SA_INIT", "SA_AUTH");
//! ```

use super::payload::IdPayload;
use super::proposal::NegotiatedProposal;
use super::Error;
use tracing::{debug, error, info, warn};

/// Log an exchange state transition
///
/// # Arguments
///
/// * `spi_i` - Initiator SPI
/// * `spi_r` - Responder SPI (zero before the first reply)
/// * `from` - Previous state
/// * `to` - New state
pub fn log_state_transition(spi_i: &[u8], spi_r: &[u8], from: &str, to: &str) {
    info!(
        ike_spi_i = %hex::encode(spi_i),
        ike_spi_r = %hex::encode(spi_r),
        state_from = from,
        state_to = to,
        "IKEv2 state transition"
    );
}

/// Log the proposal accepted from the responder
pub fn log_proposal_accepted(spi_i: &[u8], proposal: &NegotiatedProposal) {
    info!(
        ike_spi_i = %hex::encode(spi_i),
        proposal_num = proposal.proposal_num,
        encr = proposal.encr.id(),
        prf = proposal.prf.id(),
        integ = proposal.integ.id(),
        dh = proposal.dh.id(),
        "IKEv2 proposal accepted"
    );
}

/// Log an inbound message rejected without state change
///
/// # Arguments
///
/// * `state` - Current state
/// * `error` - Rejection reason
pub fn log_message_rejected(state: &str, error: &Error) {
    debug!(
        state = state,
        kind = ?error.kind(),
        error = %error,
        "IKEv2 message rejected"
    );
}

/// Log a failed peer authentication
pub fn log_authentication_failed(spi_i: &[u8], spi_r: &[u8], error: &Error) {
    error!(
        ike_spi_i = %hex::encode(spi_i),
        ike_spi_r = %hex::encode(spi_r),
        error = %error,
        "IKEv2 peer authentication failed"
    );
}

/// Log that no shared secret exists for the peer and a placeholder is used
pub fn log_unknown_user(peer: Option<&IdPayload>) {
    let (id_type, id_len) = peer_label(peer);
    warn!(
        peer_id_type = id_type,
        peer_id_len = id_len,
        "no shared secret for peer, using random placeholder"
    );
}

/// Log use of an explicitly configured fallback secret
pub fn log_credential_fallback(peer: Option<&IdPayload>) {
    let (id_type, id_len) = peer_label(peer);
    warn!(
        peer_id_type = id_type,
        peer_id_len = id_len,
        "no matching credential, using configured fallback secret"
    );
}

/// ID type and length of the peer identity, `(0, 0)` when none is known
fn peer_label(peer: Option<&IdPayload>) -> (u8, usize) {
    match peer {
        Some(id) => (id.id_type.to_u8(), id.data.len()),
        None => (0, 0),
    }
}
