//! Initiator configuration
//!
//! Provides the configuration structure and builder for [`Ikev2Initiator`].
//!
//! [`Ikev2Initiator`]: super::Ikev2Initiator

use super::constants::{KEY_PAD_IKEV2, NONCE_MAX_LEN, NONCE_MIN_LEN};
use super::payload::{AuthMethod, IdPayload};
use super::proposal::LocalProposal;
use super::{Error, Result};

/// Default nonce length in bytes
pub const DEFAULT_NONCE_LEN: usize = 32;

/// How the responder proves its identity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PeerAuthMode {
    /// AUTH is a shared key MIC over the responder's signed octets
    #[default]
    SharedSecret,
    /// AUTH is a signature checked against the CERT payload
    Certificate {
        /// Required AUTH method
        method: AuthMethod,
    },
}

/// Initiator configuration
#[derive(Clone, Debug)]
pub struct InitiatorConfig {
    /// Local identity sent in IDi
    pub local_identity: IdPayload,

    /// Algorithms offered in SAi
    pub proposal: LocalProposal,

    /// Responder authentication mode
    pub peer_auth: PeerAuthMode,

    /// Key pad used in shared key AUTH computation
    pub key_pad: Vec<u8>,

    /// Length of the initiator nonce
    pub nonce_len: usize,

    /// Wait for a CREATE_CHILD_SA response after IKE_AUTH
    pub expect_child_sa: bool,
}

impl InitiatorConfig {
    /// Create builder for initiator configuration
    pub fn builder() -> InitiatorConfigBuilder {
        InitiatorConfigBuilder::new()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.local_identity.data.is_empty() {
            return Err(Error::InvalidParameter(
                "local identity cannot be empty".into(),
            ));
        }
        if !(NONCE_MIN_LEN..=NONCE_MAX_LEN).contains(&self.nonce_len) {
            return Err(Error::InvalidParameter(format!(
                "nonce length {} outside [{}, {}]",
                self.nonce_len, NONCE_MIN_LEN, NONCE_MAX_LEN
            )));
        }
        if self.key_pad.is_empty() {
            return Err(Error::InvalidParameter("key pad cannot be empty".into()));
        }
        if let PeerAuthMode::Certificate { method } = self.peer_auth {
            if method == AuthMethod::SharedKeyMic {
                return Err(Error::InvalidParameter(
                    "certificate mode requires a signature method".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Builder for InitiatorConfig
#[derive(Default)]
pub struct InitiatorConfigBuilder {
    local_identity: Option<IdPayload>,
    proposal: Option<LocalProposal>,
    peer_auth: Option<PeerAuthMode>,
    key_pad: Option<Vec<u8>>,
    nonce_len: Option<usize>,
    expect_child_sa: bool,
}

impl InitiatorConfigBuilder {
    /// Create new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set local identity
    pub fn with_local_identity(mut self, identity: IdPayload) -> Self {
        self.local_identity = Some(identity);
        self
    }

    /// Set offered algorithms
    pub fn with_proposal(mut self, proposal: LocalProposal) -> Self {
        self.proposal = Some(proposal);
        self
    }

    /// Set responder authentication mode
    pub fn with_peer_auth(mut self, mode: PeerAuthMode) -> Self {
        self.peer_auth = Some(mode);
        self
    }

    /// Set key pad
    pub fn with_key_pad(mut self, key_pad: impl Into<Vec<u8>>) -> Self {
        self.key_pad = Some(key_pad.into());
        self
    }

    /// Set nonce length
    pub fn with_nonce_len(mut self, len: usize) -> Self {
        self.nonce_len = Some(len);
        self
    }

    /// Expect a CREATE_CHILD_SA response after IKE_AUTH
    pub fn with_expect_child_sa(mut self, expect: bool) -> Self {
        self.expect_child_sa = expect;
        self
    }

    /// Build InitiatorConfig with validation
    pub fn build(self) -> Result<InitiatorConfig> {
        let config = InitiatorConfig {
            local_identity: self
                .local_identity
                .unwrap_or_else(|| IdPayload::from_key_id(b"eap-ikev2-server")),
            proposal: self.proposal.unwrap_or_default(),
            peer_auth: self.peer_auth.unwrap_or_default(),
            key_pad: self.key_pad.unwrap_or_else(|| KEY_PAD_IKEV2.to_vec()),
            nonce_len: self.nonce_len.unwrap_or(DEFAULT_NONCE_LEN),
            expect_child_sa: self.expect_child_sa,
        };

        config.validate()?;
        Ok(config)
    }
}
