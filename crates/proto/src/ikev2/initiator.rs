//! IKEv2 initiator exchange engine
//!
//! Drives the initiator side of the exchanges carried inside EAP-IKEv2
//! (RFC 5106, Section 4):
//!
//! ```text
//! Initiator                         Responder
//! ---------                         ---------
//! HDR, SAi1, KEi, Ni  -->
//!                     <--  HDR, SAr1, KEr, Nr, [SK {IDr}]
//! HDR, SK {IDi, AUTH} -->
//!                     <--  HDR, SK {IDr, [CERT,] AUTH}
//! ```
//!
//! Every inbound message is checked against the current state before any
//! payload is interpreted. Processing works on staged values and commits
//! them only when the whole message has been accepted, so a rejected
//! message leaves the exchange exactly as it was.

use super::auth::{
    check_identity, shared_key_auth, signed_octets, verify_certificate_auth,
    verify_shared_key_auth,
};
use super::config::{InitiatorConfig, PeerAuthMode};
use super::constants::{
    ExchangeType, IkeFlags, IKE_HEADER_SIZE, IKE_SPI_SIZE, IKE_VERSION, PLACEHOLDER_SECRET_LEN,
};
use super::credentials::{CertificateVerifier, CredentialResolver, RawKeyVerifier};
use super::crypto::{fill_random, random_bytes, DhKeyPair};
use super::encrypted::{decrypt_payloads, encrypt_payloads};
use super::keys::{Direction, KeyMaterial};
use super::logging;
use super::message::{build_message, parse_header, IkeHeader};
use super::payload::{
    parse_payload_chain, AuthMethod, AuthPayload, IdPayload, IkePayload, KePayload,
    NoncePayload, PayloadSet,
};
use super::proposal::{negotiate, NegotiatedProposal, Proposal};
use super::state::ExchangeState;
use super::{Error, Result};
use eapike_platform::{EapikeResult, SecurityModule};
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

/// IKEv2 initiator for one EAP-IKEv2 session
///
/// # Example
///
/// ```rust
/// use eapike_proto::ikev2::{
///     ExchangeState, IdPayload, Ikev2Initiator, InitiatorConfig, StaticCredentials,
/// };
///
/// let config = InitiatorConfig::builder()
///     .with_local_identity(IdPayload::from_fqdn("aaa.example.com"))
///     .build()?;
/// let credentials = StaticCredentials::new()
///     .with_secret(IdPayload::from_email("user@example.com"), b"secret".to_vec());
///
/// let mut initiator = Ikev2Initiator::new(config, credentials)?;
/// let sa_init = initiator.build_next_message()?.expect("IKE_SA_INIT request");
/// assert_eq!(initiator.state(), ExchangeState::SaInit);
/// # let _ = sa_init;
/// # Ok::<(), eapike_proto::ikev2::Error>(())
/// ```
pub struct Ikev2Initiator {
    config: InitiatorConfig,
    resolver: Box<dyn CredentialResolver>,
    cert_verifier: Box<dyn CertificateVerifier>,

    state: ExchangeState,
    initiator_spi: [u8; IKE_SPI_SIZE],
    responder_spi: [u8; IKE_SPI_SIZE],

    dh: Option<DhKeyPair>,
    nonce_i: Vec<u8>,
    nonce_r: Vec<u8>,

    proposal: Option<NegotiatedProposal>,
    keys: Option<KeyMaterial>,
    peer_identity: Option<IdPayload>,

    shared_secret: Option<Zeroizing<Vec<u8>>>,
    unknown_user: bool,

    /// IKE_SA_INIT request, kept until the IKE_AUTH request is built
    transcript_i: Option<Vec<u8>>,
    /// IKE_SA_INIT response, kept until the responder AUTH is verified
    transcript_r: Option<Vec<u8>>,
    auth_request_sent: bool,
}

impl Ikev2Initiator {
    /// Create an initiator in state SA_INIT
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the configuration is invalid.
    pub fn new(config: InitiatorConfig, resolver: impl CredentialResolver + 'static) -> Result<Self> {
        config.validate()?;

        Ok(Ikev2Initiator {
            config,
            resolver: Box::new(resolver),
            cert_verifier: Box::new(RawKeyVerifier),
            state: ExchangeState::SaInit,
            initiator_spi: [0u8; IKE_SPI_SIZE],
            responder_spi: [0u8; IKE_SPI_SIZE],
            dh: None,
            nonce_i: Vec::new(),
            nonce_r: Vec::new(),
            proposal: None,
            keys: None,
            peer_identity: None,
            shared_secret: None,
            unknown_user: false,
            transcript_i: None,
            transcript_r: None,
            auth_request_sent: false,
        })
    }

    /// Replace the verifier used in certificate mode
    pub fn with_certificate_verifier(mut self, verifier: impl CertificateVerifier + 'static) -> Self {
        self.cert_verifier = Box::new(verifier);
        self
    }

    /// Current exchange state
    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Configuration of this initiator
    pub fn config(&self) -> &InitiatorConfig {
        &self.config
    }

    /// Initiator SPI (zero until the first request is built)
    pub fn initiator_spi(&self) -> &[u8; IKE_SPI_SIZE] {
        &self.initiator_spi
    }

    /// Responder SPI (zero until the first response is accepted)
    pub fn responder_spi(&self) -> &[u8; IKE_SPI_SIZE] {
        &self.responder_spi
    }

    /// Derived IKE SA keys, once the IKE_SA_INIT response is accepted
    pub fn keys(&self) -> Option<&KeyMaterial> {
        self.keys.as_ref()
    }

    /// Proposal accepted from the responder
    pub fn negotiated_proposal(&self) -> Option<&NegotiatedProposal> {
        self.proposal.as_ref()
    }

    /// Responder identity, once received
    pub fn peer_identity(&self) -> Option<&IdPayload> {
        self.peer_identity.as_ref()
    }

    /// Whether the IKE_AUTH request was built with a placeholder secret
    pub fn is_unknown_user(&self) -> bool {
        self.unknown_user
    }

    /// Process one inbound message
    ///
    /// On error the exchange is left unchanged.
    ///
    /// # Errors
    ///
    /// - Framing errors for malformed headers or payload chains
    /// - [`Error::InvalidState`], [`Error::InvalidExchangeType`],
    ///   [`Error::InvalidMessageId`], [`Error::InvalidFlags`] or
    ///   [`Error::SpiMismatch`] for messages that do not fit the state
    /// - [`Error::PeerError`] if the responder sent an error notification
    /// - Negotiation, key derivation, crypto or authentication errors from the
    ///   state handler
    pub fn process(&mut self, message: &[u8]) -> Result<()> {
        let result = self.process_message(message);

        if let Err(e) = &result {
            if e.is_security_event() {
                logging::log_authentication_failed(&self.initiator_spi, &self.responder_spi, e);
            } else {
                logging::log_message_rejected(self.state.name(), e);
            }
        }

        result
    }

    /// Build the next outbound message
    ///
    /// Returns `None` once no further request is sent (CHILD_SA and DONE).
    /// In SA_INIT the IKE_SA_INIT request is generated on the first call and
    /// reproduced byte for byte on later calls.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the IKE_AUTH request was already
    /// built, or crypto errors if random generation fails.
    pub fn build_next_message(&mut self) -> Result<Option<Vec<u8>>> {
        match self.state {
            ExchangeState::SaInit => self.build_sa_init().map(Some),
            ExchangeState::SaAuth => self.build_sa_auth().map(Some),
            ExchangeState::ChildSa | ExchangeState::Done => Ok(None),
        }
    }

    fn process_message(&mut self, message: &[u8]) -> Result<()> {
        if self.state.is_terminal() {
            return Err(Error::InvalidState("exchange complete".into()));
        }

        let header = parse_header(message)?;
        self.validate_header(&header)?;

        let payloads = parse_payload_chain(header.next_payload, &message[IKE_HEADER_SIZE..])?;
        check_peer_error(&payloads)?;

        match self.state {
            ExchangeState::SaInit => self.process_sa_init(&header, message, &payloads),
            ExchangeState::SaAuth => self.process_sa_auth(message, &payloads),
            ExchangeState::ChildSa => self.process_child_sa(message, &payloads),
            ExchangeState::Done => Err(Error::Internal("terminal state reached".into())),
        }
    }

    /// Header checks that apply before any payload is looked at
    fn validate_header(&self, header: &IkeHeader) -> Result<()> {
        if header.version != IKE_VERSION {
            return Err(Error::UnsupportedVersion(header.version));
        }

        let (exchange_type, message_id) = self.state.expected_exchange().ok_or_else(|| {
            Error::InvalidState(format!("no message accepted in state {}", self.state))
        })?;

        if header.exchange_type != exchange_type {
            return Err(Error::InvalidExchangeType {
                expected: exchange_type.to_u8(),
                actual: header.exchange_type.to_u8(),
            });
        }
        if header.message_id != message_id {
            return Err(Error::InvalidMessageId {
                expected: message_id,
                actual: header.message_id,
            });
        }

        if !header.flags.is_response() || header.flags.is_initiator() {
            return Err(Error::InvalidFlags(header.flags.value()));
        }

        match self.state {
            ExchangeState::SaInit => {
                if self.transcript_i.is_none() {
                    return Err(Error::InvalidState(
                        "IKE_SA_INIT request not sent".into(),
                    ));
                }
                if header.initiator_spi != self.initiator_spi
                    || header.responder_spi == [0u8; IKE_SPI_SIZE]
                {
                    return Err(Error::SpiMismatch);
                }
            }
            _ => {
                if header.initiator_spi != self.initiator_spi
                    || header.responder_spi != self.responder_spi
                {
                    return Err(Error::SpiMismatch);
                }
            }
        }

        Ok(())
    }

    /// HDR, SAr1, KEr, Nr, [SK {IDr}]
    fn process_sa_init(
        &mut self,
        header: &IkeHeader,
        message: &[u8],
        payloads: &PayloadSet,
    ) -> Result<()> {
        let sa = payloads.sa().ok_or(Error::MissingPayload("SA"))?;
        let ke = payloads.ke().ok_or(Error::MissingPayload("KE"))?;
        let nonce = payloads.nonce().ok_or(Error::MissingPayload("Nonce"))?;

        let proposal = negotiate(&sa.proposals, &self.config.proposal)?;

        if ke.dh_group != proposal.dh.id() {
            return Err(Error::InvalidKeyExchange(format!(
                "KE group {} does not match negotiated group {}",
                ke.dh_group,
                proposal.dh.id()
            )));
        }
        if ke.key_data.len() != proposal.dh.prime_len() {
            return Err(Error::InvalidKeyExchange(format!(
                "public value of {} bytes, expected {}",
                ke.key_data.len(),
                proposal.dh.prime_len()
            )));
        }

        nonce.validate()?;

        let dh = self
            .dh
            .as_ref()
            .ok_or_else(|| Error::InvalidState("no key exchange in progress".into()))?;
        let shared = dh.compute_shared(&ke.key_data)?;

        let keys = KeyMaterial::derive(
            &proposal,
            &shared,
            &self.nonce_i,
            &nonce.nonce,
            &self.initiator_spi,
            &header.responder_spi,
        )?;

        let mut peer_identity = self.peer_identity.clone();
        if let Some(sk) = payloads.encrypted() {
            debug!("encrypted payload in IKE_SA_INIT response");
            let inner = decrypt_payloads(
                &proposal,
                &keys,
                Direction::ResponderToInitiator,
                message,
                sk,
            )?;
            check_peer_error(&inner)?;
            if let Some(idr) = inner.idr() {
                check_identity(peer_identity.as_ref(), idr)?;
                peer_identity = Some(idr.clone());
            }
        }

        let transcript = copy_buffer(message)?;
        let nonce_r = copy_buffer(&nonce.nonce)?;

        self.responder_spi = header.responder_spi;
        self.proposal = Some(proposal);
        self.nonce_r = nonce_r;
        self.keys = Some(keys);
        self.peer_identity = peer_identity;
        self.transcript_r = Some(transcript);
        self.dh = None;

        logging::log_proposal_accepted(&self.initiator_spi, &proposal);
        self.transition(ExchangeState::SaAuth)
    }

    /// HDR, SK {IDr, [CERT,] AUTH}
    fn process_sa_auth(&mut self, message: &[u8], payloads: &PayloadSet) -> Result<()> {
        if !self.auth_request_sent {
            return Err(Error::InvalidState("IKE_AUTH request not sent".into()));
        }

        let (proposal, keys) = self.negotiated()?;
        let sk = payloads.encrypted().ok_or(Error::MissingPayload("SK"))?;
        let inner = decrypt_payloads(proposal, keys, Direction::ResponderToInitiator, message, sk)?;
        check_peer_error(&inner)?;

        let idr = inner.idr().ok_or(Error::MissingPayload("IDr"))?;
        check_identity(self.peer_identity.as_ref(), idr)?;

        let auth = inner.auth().ok_or(Error::MissingPayload("AUTH"))?;
        let transcript_r = self
            .transcript_r
            .as_deref()
            .ok_or_else(|| Error::Internal("IKE_SA_INIT response not recorded".into()))?;
        let signed = signed_octets(
            proposal.prf,
            transcript_r,
            &self.nonce_i,
            keys.auth_key(Direction::ResponderToInitiator),
            idr,
        )?;

        match self.config.peer_auth {
            PeerAuthMode::SharedSecret => {
                let secret = self
                    .shared_secret
                    .as_ref()
                    .ok_or_else(|| Error::Internal("shared secret not resolved".into()))?;
                let verdict = verify_shared_key_auth(
                    proposal.prf,
                    secret,
                    &self.config.key_pad,
                    &signed,
                    auth,
                );
                if self.unknown_user {
                    return Err(Error::UnknownUser);
                }
                verdict?;
            }
            PeerAuthMode::Certificate { method } => {
                verify_certificate_auth(
                    self.cert_verifier.as_ref(),
                    method,
                    inner.cert(),
                    &signed,
                    auth,
                )?;
            }
        }

        debug!("responder authenticated");
        self.peer_identity = Some(idr.clone());
        self.transcript_r = None;

        let next = if self.config.expect_child_sa {
            ExchangeState::ChildSa
        } else {
            ExchangeState::Done
        };
        self.transition(next)
    }

    /// HDR, SK {...}
    fn process_child_sa(&mut self, message: &[u8], payloads: &PayloadSet) -> Result<()> {
        let (proposal, keys) = self.negotiated()?;
        let sk = payloads.encrypted().ok_or(Error::MissingPayload("SK"))?;
        let inner = decrypt_payloads(proposal, keys, Direction::ResponderToInitiator, message, sk)?;
        check_peer_error(&inner)?;
        debug!(payloads = inner.len(), "CREATE_CHILD_SA response accepted");

        self.transition(ExchangeState::Done)
    }

    /// HDR, SAi1, KEi, Ni
    ///
    /// Once built, the request is returned unchanged until a response is
    /// accepted, so a retransmission carries the same SPI, nonce and KE.
    fn build_sa_init(&mut self) -> Result<Vec<u8>> {
        if let Some(transcript) = &self.transcript_i {
            return copy_buffer(transcript);
        }

        let mut initiator_spi = [0u8; IKE_SPI_SIZE];
        fill_random(&mut initiator_spi)?;
        let nonce = NoncePayload::new(random_bytes(self.config.nonce_len)?)?;
        let keypair = self.config.proposal.dh.generate()?;

        let sa = Proposal::ike(1, &self.config.proposal).to_sa_payload()?;
        let ke = KePayload::new(keypair.group().id(), keypair.public_value().to_vec());

        let header = IkeHeader::new(
            initiator_spi,
            [0u8; IKE_SPI_SIZE],
            ExchangeType::IkeSaInit,
            IkeFlags::initiator_request(),
            0,
        );
        let nonce_i = nonce.nonce.clone();
        let message = build_message(
            &header,
            &[IkePayload::SA(sa), IkePayload::KE(ke), IkePayload::Nonce(nonce)],
        )?;
        let transcript = copy_buffer(&message)?;

        self.initiator_spi = initiator_spi;
        self.nonce_i = nonce_i;
        self.dh = Some(keypair);
        self.transcript_i = Some(transcript);

        debug!(
            ike_spi_i = %hex::encode(self.initiator_spi),
            len = message.len(),
            "built IKE_SA_INIT request"
        );
        Ok(message)
    }

    /// HDR, SK {IDi, AUTH}
    fn build_sa_auth(&mut self) -> Result<Vec<u8>> {
        let transcript_i = self
            .transcript_i
            .as_deref()
            .ok_or_else(|| Error::InvalidState("IKE_AUTH request already built".into()))?;
        let (proposal, keys) = self.negotiated()?;

        let (secret, unknown_user) = match self.resolver.shared_secret(self.peer_identity.as_ref()) {
            Some(secret) => (secret, false),
            None => {
                logging::log_unknown_user(self.peer_identity.as_ref());
                (Zeroizing::new(random_bytes(PLACEHOLDER_SECRET_LEN)?), true)
            }
        };

        let idi = self.config.local_identity.clone();
        let signed = signed_octets(
            proposal.prf,
            transcript_i,
            &self.nonce_r,
            keys.auth_key(Direction::InitiatorToResponder),
            &idi,
        )?;
        let auth_data = shared_key_auth(proposal.prf, &secret, &self.config.key_pad, &signed)?;

        let header = IkeHeader::new(
            self.initiator_spi,
            self.responder_spi,
            ExchangeType::IkeAuth,
            IkeFlags::initiator_request(),
            1,
        );
        let message = encrypt_payloads(
            proposal,
            keys,
            Direction::InitiatorToResponder,
            &header,
            &[
                IkePayload::IDi(idi),
                IkePayload::AUTH(AuthPayload::new(AuthMethod::SharedKeyMic, auth_data)),
            ],
        )?;

        self.shared_secret = Some(secret);
        self.unknown_user = unknown_user;
        self.transcript_i = None;
        self.auth_request_sent = true;

        debug!(len = message.len(), "built IKE_AUTH request");
        Ok(message)
    }

    fn negotiated(&self) -> Result<(&NegotiatedProposal, &KeyMaterial)> {
        match (&self.proposal, &self.keys) {
            (Some(proposal), Some(keys)) => Ok((proposal, keys)),
            _ => Err(Error::Internal("IKE SA keys not derived".into())),
        }
    }

    fn transition(&mut self, next: ExchangeState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::InvalidState(format!(
                "cannot move from {} to {}",
                self.state, next
            )));
        }

        logging::log_state_transition(
            &self.initiator_spi,
            &self.responder_spi,
            self.state.name(),
            next.name(),
        );
        self.state = next;
        Ok(())
    }
}

/// First error notification in a payload set, plain or decrypted
fn check_peer_error(payloads: &PayloadSet) -> Result<()> {
    match payloads.notifications().find(|n| n.is_error()) {
        Some(notify) => Err(Error::PeerError(notify.notify_type)),
        None => Ok(()),
    }
}

fn copy_buffer(data: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve(data.len())?;
    buf.extend_from_slice(data);
    Ok(buf)
}

impl fmt::Debug for Ikev2Initiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ikev2Initiator")
            .field("state", &self.state)
            .field("initiator_spi", &hex::encode(self.initiator_spi))
            .field("responder_spi", &hex::encode(self.responder_spi))
            .field("proposal", &self.proposal)
            .field("peer_identity", &self.peer_identity)
            .field("unknown_user", &self.unknown_user)
            .finish_non_exhaustive()
    }
}

impl SecurityModule for Ikev2Initiator {
    fn id(&self) -> &'static str {
        "ikev2-initiator"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &'static str {
        "IKEv2 initiator for EAP-IKEv2"
    }

    fn init(&mut self) -> EapikeResult<()> {
        self.config.validate()?;
        Ok(())
    }
}
