//! IKEv2 initiator exchange tests
//!
//! Runs complete exchanges against a minimal responder assembled from the
//! crate's own codec, key derivation and AUTH primitives.

#![cfg(feature = "ikev2")]

use eapike_proto::ikev2::{
    auth,
    constants::{ExchangeType, IkeFlags, KEY_PAD_IKEV2},
    encrypted::{decrypt_payloads, encrypt_message, encrypt_payloads},
    payload::{build_payload_chain, KePayload, NoncePayload, NotifyPayload},
    build_message, negotiate, parse_header, parse_payload_chain, AuthMethod, AuthPayload,
    CertEncoding, CertPayload, DhGroup, Direction, EncrAlgorithm, Error, ExchangeState,
    IdPayload, IkeHeader, IkePayload, Ikev2Initiator, InitiatorConfig, IntegAlgorithm,
    KeyMaterial, LocalProposal, NegotiatedProposal, PayloadType, PeerAuthMode, PrfAlgorithm,
    Proposal, SignatureAlgorithm, StaticCredentials,
};
use zeroize::Zeroizing;

const SECRET: &[u8] = b"eap-ikev2 shared secret";
const RESPONDER_SPI: [u8; 8] = [0x5a; 8];

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn peer_identity() -> IdPayload {
    IdPayload::from_email("peer@example.org")
}

fn curve25519_proposal() -> LocalProposal {
    LocalProposal {
        encr: EncrAlgorithm::AesCbc,
        prf: PrfAlgorithm::HmacSha256,
        integ: IntegAlgorithm::HmacSha256_128,
        dh: DhGroup::Curve25519,
    }
}

/// How the responder authenticates itself in IKE_AUTH
enum ResponderAuth {
    SharedSecret(Vec<u8>),
    Ed25519(ed25519_dalek::SigningKey),
}

/// Responder side of the exchange, enough to drive the initiator
struct Responder {
    local: LocalProposal,
    identity: IdPayload,
    auth: ResponderAuth,
    spi_i: [u8; 8],
    nonce_i: Vec<u8>,
    nonce_r: Vec<u8>,
    request: Vec<u8>,
    reply: Vec<u8>,
    proposal: Option<NegotiatedProposal>,
    keys: Option<KeyMaterial>,
}

impl Responder {
    fn new(local: LocalProposal, identity: IdPayload, auth: ResponderAuth) -> Self {
        Responder {
            local,
            identity,
            auth,
            spi_i: [0; 8],
            nonce_i: Vec::new(),
            nonce_r: vec![0x4e; 32],
            request: Vec::new(),
            reply: Vec::new(),
            proposal: None,
            keys: None,
        }
    }

    fn negotiated(&self) -> (&NegotiatedProposal, &KeyMaterial) {
        (self.proposal.as_ref().unwrap(), self.keys.as_ref().unwrap())
    }

    fn header(&self, exchange: ExchangeType, message_id: u32) -> IkeHeader {
        IkeHeader::new(
            self.spi_i,
            RESPONDER_SPI,
            exchange,
            IkeFlags::responder_response(),
            message_id,
        )
    }

    /// HDR, SAr1, KEr, Nr, [SK {IDr}]
    fn sa_init(&mut self, request: &[u8], piggyback: Option<IdPayload>) -> Vec<u8> {
        let header = parse_header(request).unwrap();
        let payloads = parse_payload_chain(header.next_payload, &request[28..]).unwrap();

        let proposal = negotiate(&payloads.sa().unwrap().proposals, &self.local).unwrap();
        let dh = proposal.dh.generate().unwrap();
        let shared = dh.compute_shared(&payloads.ke().unwrap().key_data).unwrap();

        self.spi_i = header.initiator_spi;
        self.nonce_i = payloads.nonce().unwrap().nonce.clone();
        self.request = request.to_vec();

        let keys = KeyMaterial::derive(
            &proposal,
            &shared,
            &self.nonce_i,
            &self.nonce_r,
            &self.spi_i,
            &RESPONDER_SPI,
        )
        .unwrap();

        let reply_header = self.header(ExchangeType::IkeSaInit, 0);
        let plain = [
            IkePayload::SA(Proposal::ike(1, &self.local).to_sa_payload().unwrap()),
            IkePayload::KE(KePayload::new(proposal.dh.id(), dh.public_value().to_vec())),
            IkePayload::Nonce(NoncePayload::new(self.nonce_r.clone()).unwrap()),
        ];

        self.reply = match piggyback {
            Some(idr) => {
                let inner = build_payload_chain(&[IkePayload::IDr(idr)]).unwrap();
                encrypt_message(
                    &proposal,
                    &keys,
                    Direction::ResponderToInitiator,
                    &reply_header,
                    &plain,
                    PayloadType::IDr.to_u8(),
                    &inner,
                )
                .unwrap()
            }
            None => build_message(&reply_header, &plain).unwrap(),
        };

        self.proposal = Some(proposal);
        self.keys = Some(keys);
        self.reply.clone()
    }

    /// Check the initiator's IKE_AUTH request, returning its IDi
    fn check_auth_request(&self, request: &[u8], secret: &[u8]) -> IdPayload {
        let (proposal, keys) = self.negotiated();
        let header = parse_header(request).unwrap();
        assert_eq!(header.exchange_type, ExchangeType::IkeAuth);
        assert_eq!(header.message_id, 1);
        assert_eq!(header.responder_spi, RESPONDER_SPI);

        let outer = parse_payload_chain(header.next_payload, &request[28..]).unwrap();
        let inner = decrypt_payloads(
            proposal,
            keys,
            Direction::InitiatorToResponder,
            request,
            outer.encrypted().unwrap(),
        )
        .unwrap();

        let idi = inner.idi().unwrap().clone();
        let signed = auth::signed_octets(
            proposal.prf,
            &self.request,
            &self.nonce_r,
            keys.auth_key(Direction::InitiatorToResponder),
            &idi,
        )
        .unwrap();
        let received = inner.auth().unwrap();
        assert_eq!(received.auth_method, AuthMethod::SharedKeyMic);
        assert_eq!(
            received.auth_data,
            auth::shared_key_auth(proposal.prf, secret, KEY_PAD_IKEV2, &signed).unwrap()
        );
        idi
    }

    /// IKE_AUTH response carrying the responder's own identity
    fn auth_reply(&self) -> Vec<u8> {
        self.sa_auth(&self.identity)
    }

    /// HDR, SK {IDr, [CERT,] AUTH}
    fn sa_auth(&self, identity: &IdPayload) -> Vec<u8> {
        let (proposal, keys) = self.negotiated();
        let signed = auth::signed_octets(
            proposal.prf,
            &self.reply,
            &self.nonce_i,
            keys.auth_key(Direction::ResponderToInitiator),
            identity,
        )
        .unwrap();

        let mut inner = vec![IkePayload::IDr(identity.clone())];
        match &self.auth {
            ResponderAuth::SharedSecret(secret) => {
                let data =
                    auth::shared_key_auth(proposal.prf, secret, KEY_PAD_IKEV2, &signed).unwrap();
                inner.push(IkePayload::AUTH(AuthPayload::new(AuthMethod::SharedKeyMic, data)));
            }
            ResponderAuth::Ed25519(key) => {
                use ed25519_dalek::Signer;

                let alg = SignatureAlgorithm::Ed25519.algorithm_identifier();
                let mut data = vec![alg.len() as u8];
                data.extend_from_slice(alg);
                data.extend_from_slice(&key.sign(&signed).to_bytes());

                inner.push(IkePayload::CERT(CertPayload::new(
                    CertEncoding::RawPublicKey,
                    key.verifying_key().to_bytes().to_vec(),
                )));
                inner.push(IkePayload::AUTH(AuthPayload::new(
                    AuthMethod::DigitalSignature,
                    data,
                )));
            }
        }

        encrypt_payloads(
            proposal,
            keys,
            Direction::ResponderToInitiator,
            &self.header(ExchangeType::IkeAuth, 1),
            &inner,
        )
        .unwrap()
    }

    /// HDR, SK {N}
    fn child_sa(&self) -> Vec<u8> {
        let (proposal, keys) = self.negotiated();
        encrypt_payloads(
            proposal,
            keys,
            Direction::ResponderToInitiator,
            &self.header(ExchangeType::CreateChildSa, 2),
            &[IkePayload::Nonce(NoncePayload::new(vec![0x77; 32]).unwrap())],
        )
        .unwrap()
    }
}

fn initiator(config: InitiatorConfig, credentials: StaticCredentials) -> Ikev2Initiator {
    init_tracing();
    Ikev2Initiator::new(config, credentials).unwrap()
}

fn shared_secret_config(proposal: LocalProposal) -> InitiatorConfig {
    InitiatorConfig::builder()
        .with_local_identity(IdPayload::from_fqdn("aaa.example.com"))
        .with_proposal(proposal)
        .build()
        .unwrap()
}

fn credentials() -> StaticCredentials {
    StaticCredentials::new().with_secret(peer_identity(), SECRET.to_vec())
}

/// Run IKE_SA_INIT and build the IKE_AUTH request
fn run_to_auth_request(
    init: &mut Ikev2Initiator,
    responder: &mut Responder,
    piggyback: Option<IdPayload>,
) -> Vec<u8> {
    let request = init.build_next_message().unwrap().unwrap();
    let reply = responder.sa_init(&request, piggyback);
    init.process(&reply).unwrap();
    assert_eq!(init.state(), ExchangeState::SaAuth);
    init.build_next_message().unwrap().unwrap()
}

#[test]
fn test_shared_secret_exchange_curve25519() {
    let mut init = initiator(shared_secret_config(curve25519_proposal()), credentials());
    let mut responder = Responder::new(
        curve25519_proposal(),
        peer_identity(),
        ResponderAuth::SharedSecret(SECRET.to_vec()),
    );

    let auth_request = run_to_auth_request(&mut init, &mut responder, Some(peer_identity()));
    assert_eq!(init.peer_identity(), Some(&peer_identity()));
    assert!(!init.is_unknown_user());

    let idi = responder.check_auth_request(&auth_request, SECRET);
    assert_eq!(idi, IdPayload::from_fqdn("aaa.example.com"));

    init.process(&responder.auth_reply()).unwrap();
    assert_eq!(init.state(), ExchangeState::Done);
    assert_eq!(init.responder_spi(), &RESPONDER_SPI);
    assert_eq!(init.build_next_message().unwrap(), None);

    let (_, responder_keys) = responder.negotiated();
    let keys = init.keys().unwrap();
    assert_eq!(keys.sk_d, responder_keys.sk_d);
    assert_eq!(keys.sk_pi, responder_keys.sk_pi);
    assert_eq!(keys.sk_er, responder_keys.sk_er);
}

#[test]
fn test_shared_secret_exchange_modp1024() {
    let mut init = initiator(
        shared_secret_config(LocalProposal::default()),
        StaticCredentials::new().with_fallback(SECRET.to_vec()),
    );
    let mut responder = Responder::new(
        LocalProposal::default(),
        peer_identity(),
        ResponderAuth::SharedSecret(SECRET.to_vec()),
    );

    let auth_request = run_to_auth_request(&mut init, &mut responder, None);
    assert!(init.peer_identity().is_none());
    responder.check_auth_request(&auth_request, SECRET);

    init.process(&responder.auth_reply()).unwrap();
    assert_eq!(init.state(), ExchangeState::Done);
    assert_eq!(init.peer_identity(), Some(&peer_identity()));

    let proposal = init.negotiated_proposal().unwrap();
    assert_eq!(proposal.dh, DhGroup::Modp1024);
    assert_eq!(proposal.integ, IntegAlgorithm::HmacSha1_96);
}

#[test]
fn test_child_sa_exchange() {
    let config = InitiatorConfig::builder()
        .with_proposal(curve25519_proposal())
        .with_expect_child_sa(true)
        .build()
        .unwrap();
    let mut init = initiator(config, credentials());
    let mut responder = Responder::new(
        curve25519_proposal(),
        peer_identity(),
        ResponderAuth::SharedSecret(SECRET.to_vec()),
    );

    run_to_auth_request(&mut init, &mut responder, Some(peer_identity()));
    init.process(&responder.auth_reply()).unwrap();
    assert_eq!(init.state(), ExchangeState::ChildSa);
    assert_eq!(init.build_next_message().unwrap(), None);

    // A second IKE_AUTH response is out of place now
    assert!(matches!(
        init.process(&responder.auth_reply()),
        Err(Error::InvalidExchangeType { .. })
    ));

    init.process(&responder.child_sa()).unwrap();
    assert_eq!(init.state(), ExchangeState::Done);
}

#[test]
fn test_tampered_auth_response_leaves_state() {
    let mut init = initiator(shared_secret_config(curve25519_proposal()), credentials());
    let mut responder = Responder::new(
        curve25519_proposal(),
        peer_identity(),
        ResponderAuth::SharedSecret(SECRET.to_vec()),
    );
    run_to_auth_request(&mut init, &mut responder, Some(peer_identity()));

    let reply = responder.auth_reply();
    for offset in [40, reply.len() - 20, reply.len() - 1] {
        let mut tampered = reply.clone();
        tampered[offset] ^= 0x80;
        assert!(matches!(
            init.process(&tampered),
            Err(Error::EncryptedPayloadInvalid)
        ));
        assert_eq!(init.state(), ExchangeState::SaAuth);
    }

    let mut truncated = reply[..reply.len() - 4].to_vec();
    let len = truncated.len() as u32;
    truncated[24..28].copy_from_slice(&len.to_be_bytes());
    assert!(init.process(&truncated).is_err());
    assert_eq!(init.state(), ExchangeState::SaAuth);

    init.process(&reply).unwrap();
    assert_eq!(init.state(), ExchangeState::Done);
}

#[test]
fn test_wrong_secret_rejected() {
    let mut init = initiator(shared_secret_config(curve25519_proposal()), credentials());
    let mut responder = Responder::new(
        curve25519_proposal(),
        peer_identity(),
        ResponderAuth::SharedSecret(b"some other secret".to_vec()),
    );
    run_to_auth_request(&mut init, &mut responder, Some(peer_identity()));

    assert!(matches!(
        init.process(&responder.auth_reply()),
        Err(Error::AuthenticationFailed(_))
    ));
    assert_eq!(init.state(), ExchangeState::SaAuth);
}

#[test]
fn test_unknown_user_rejected() {
    let mut init = initiator(
        shared_secret_config(curve25519_proposal()),
        StaticCredentials::new(),
    );
    let mut responder = Responder::new(
        curve25519_proposal(),
        peer_identity(),
        ResponderAuth::SharedSecret(SECRET.to_vec()),
    );

    // The request still goes out, keyed with a placeholder secret
    let auth_request = run_to_auth_request(&mut init, &mut responder, Some(peer_identity()));
    assert!(init.is_unknown_user());
    assert!(parse_header(&auth_request).is_ok());

    let err = init.process(&responder.auth_reply()).unwrap_err();
    assert!(matches!(err, Error::UnknownUser));
    assert!(err.is_security_event());
    assert_eq!(init.state(), ExchangeState::SaAuth);
}

#[test]
fn test_identity_change_rejected() {
    let mut init = initiator(shared_secret_config(curve25519_proposal()), credentials());
    let mut responder = Responder::new(
        curve25519_proposal(),
        peer_identity(),
        ResponderAuth::SharedSecret(SECRET.to_vec()),
    );
    run_to_auth_request(&mut init, &mut responder, Some(peer_identity()));

    let other = IdPayload::from_email("mallory@example.org");
    assert!(matches!(
        init.process(&responder.sa_auth(&other)),
        Err(Error::IdentityMismatch)
    ));
    assert_eq!(init.peer_identity(), Some(&peer_identity()));
    assert_eq!(init.state(), ExchangeState::SaAuth);
}

#[test]
fn test_spi_mismatch_in_auth_response() {
    let mut init = initiator(shared_secret_config(curve25519_proposal()), credentials());
    let mut responder = Responder::new(
        curve25519_proposal(),
        peer_identity(),
        ResponderAuth::SharedSecret(SECRET.to_vec()),
    );
    run_to_auth_request(&mut init, &mut responder, Some(peer_identity()));

    let mut reply = responder.auth_reply();
    reply[8] ^= 0xff;
    assert!(matches!(init.process(&reply), Err(Error::SpiMismatch)));

    let mut reply = responder.auth_reply();
    reply[0] ^= 0xff;
    assert!(matches!(init.process(&reply), Err(Error::SpiMismatch)));
    assert_eq!(init.state(), ExchangeState::SaAuth);
}

#[test]
fn test_auth_response_before_request() {
    let mut init = initiator(shared_secret_config(curve25519_proposal()), credentials());
    let mut responder = Responder::new(
        curve25519_proposal(),
        peer_identity(),
        ResponderAuth::SharedSecret(SECRET.to_vec()),
    );

    let request = init.build_next_message().unwrap().unwrap();
    init.process(&responder.sa_init(&request, None)).unwrap();

    assert!(matches!(
        init.process(&responder.auth_reply()),
        Err(Error::InvalidState(_))
    ));
    assert_eq!(init.state(), ExchangeState::SaAuth);
}

#[test]
fn test_auth_request_built_once() {
    let mut init = initiator(shared_secret_config(curve25519_proposal()), credentials());
    let mut responder = Responder::new(
        curve25519_proposal(),
        peer_identity(),
        ResponderAuth::SharedSecret(SECRET.to_vec()),
    );
    run_to_auth_request(&mut init, &mut responder, Some(peer_identity()));

    assert!(matches!(
        init.build_next_message(),
        Err(Error::InvalidState(_))
    ));
}

#[test]
fn test_replayed_sa_init_response_rejected() {
    let mut init = initiator(shared_secret_config(curve25519_proposal()), credentials());
    let mut responder = Responder::new(
        curve25519_proposal(),
        peer_identity(),
        ResponderAuth::SharedSecret(SECRET.to_vec()),
    );
    run_to_auth_request(&mut init, &mut responder, None);

    assert!(matches!(
        init.process(&responder.reply),
        Err(Error::InvalidExchangeType { .. })
    ));
    assert_eq!(init.state(), ExchangeState::SaAuth);
}

#[test]
fn test_done_rejects_everything() {
    let mut init = initiator(shared_secret_config(curve25519_proposal()), credentials());
    let mut responder = Responder::new(
        curve25519_proposal(),
        peer_identity(),
        ResponderAuth::SharedSecret(SECRET.to_vec()),
    );
    run_to_auth_request(&mut init, &mut responder, None);
    let reply = responder.auth_reply();
    init.process(&reply).unwrap();
    assert_eq!(init.state(), ExchangeState::Done);

    assert!(matches!(init.process(&reply), Err(Error::InvalidState(_))));
    assert!(matches!(
        init.process(&responder.child_sa()),
        Err(Error::InvalidState(_))
    ));
    assert!(matches!(init.process(&[]), Err(Error::InvalidState(_))));
    assert_eq!(init.state(), ExchangeState::Done);
}

#[test]
fn test_error_notify_in_auth_response() {
    let mut init = initiator(shared_secret_config(curve25519_proposal()), credentials());
    let mut responder = Responder::new(
        curve25519_proposal(),
        peer_identity(),
        ResponderAuth::SharedSecret(SECRET.to_vec()),
    );
    run_to_auth_request(&mut init, &mut responder, None);

    let notify = build_message(
        &responder.header(ExchangeType::IkeAuth, 1),
        &[IkePayload::Notify(NotifyPayload::new(
            NotifyPayload::AUTHENTICATION_FAILED,
            Vec::new(),
        ))],
    )
    .unwrap();
    assert!(matches!(
        init.process(&notify),
        Err(Error::PeerError(NotifyPayload::AUTHENTICATION_FAILED))
    ));
    assert_eq!(init.state(), ExchangeState::SaAuth);
}

#[test]
fn test_encrypted_error_notify_in_auth_response() {
    let mut init = initiator(shared_secret_config(curve25519_proposal()), credentials());
    let mut responder = Responder::new(
        curve25519_proposal(),
        peer_identity(),
        ResponderAuth::SharedSecret(SECRET.to_vec()),
    );
    run_to_auth_request(&mut init, &mut responder, None);

    let (proposal, keys) = responder.negotiated();
    let notify = encrypt_payloads(
        proposal,
        keys,
        Direction::ResponderToInitiator,
        &responder.header(ExchangeType::IkeAuth, 1),
        &[IkePayload::Notify(NotifyPayload::new(
            NotifyPayload::AUTHENTICATION_FAILED,
            Vec::new(),
        ))],
    )
    .unwrap();
    assert!(matches!(
        init.process(&notify),
        Err(Error::PeerError(NotifyPayload::AUTHENTICATION_FAILED))
    ));
    assert_eq!(init.state(), ExchangeState::SaAuth);

    // The exchange can still complete
    init.process(&responder.auth_reply()).unwrap();
    assert_eq!(init.state(), ExchangeState::Done);
}

#[test]
fn test_encrypted_error_notify_in_child_sa_response() {
    let config = InitiatorConfig::builder()
        .with_proposal(curve25519_proposal())
        .with_expect_child_sa(true)
        .build()
        .unwrap();
    let mut init = initiator(config, credentials());
    let mut responder = Responder::new(
        curve25519_proposal(),
        peer_identity(),
        ResponderAuth::SharedSecret(SECRET.to_vec()),
    );
    run_to_auth_request(&mut init, &mut responder, Some(peer_identity()));
    init.process(&responder.auth_reply()).unwrap();
    assert_eq!(init.state(), ExchangeState::ChildSa);

    let (proposal, keys) = responder.negotiated();
    let notify = encrypt_payloads(
        proposal,
        keys,
        Direction::ResponderToInitiator,
        &responder.header(ExchangeType::CreateChildSa, 2),
        &[IkePayload::Notify(NotifyPayload::new(
            NotifyPayload::NO_PROPOSAL_CHOSEN,
            Vec::new(),
        ))],
    )
    .unwrap();
    assert!(matches!(
        init.process(&notify),
        Err(Error::PeerError(NotifyPayload::NO_PROPOSAL_CHOSEN))
    ));
    assert_eq!(init.state(), ExchangeState::ChildSa);
}

#[test]
fn test_nonce_length_out_of_range_rejected() {
    let mut init = initiator(shared_secret_config(curve25519_proposal()), credentials());
    let request = init.build_next_message().unwrap().unwrap();

    let mut responder = Responder::new(
        curve25519_proposal(),
        peer_identity(),
        ResponderAuth::SharedSecret(SECRET.to_vec()),
    );
    responder.spi_i = parse_header(&request).unwrap().initiator_spi;
    let peer = DhGroup::Curve25519.generate().unwrap();

    for len in [NoncePayload::MIN_SIZE - 1, NoncePayload::MAX_SIZE + 1] {
        let reply = build_message(
            &responder.header(ExchangeType::IkeSaInit, 0),
            &[
                IkePayload::SA(Proposal::ike(1, &responder.local).to_sa_payload().unwrap()),
                IkePayload::KE(KePayload::new(
                    DhGroup::Curve25519.id(),
                    peer.public_value().to_vec(),
                )),
                IkePayload::Nonce(NoncePayload {
                    nonce: vec![0x4e; len],
                }),
            ],
        )
        .unwrap();

        assert!(matches!(
            init.process(&reply),
            Err(Error::InvalidNonce(l)) if l == len
        ));
        assert_eq!(init.state(), ExchangeState::SaInit);
        assert!(init.keys().is_none());
    }

    init.process(&responder.sa_init(&request, None)).unwrap();
    assert_eq!(init.state(), ExchangeState::SaAuth);
}

#[test]
fn test_short_ke_rejected_before_derivation() {
    let mut init = initiator(shared_secret_config(curve25519_proposal()), credentials());
    let request = init.build_next_message().unwrap().unwrap();

    let mut responder = Responder::new(
        curve25519_proposal(),
        peer_identity(),
        ResponderAuth::SharedSecret(SECRET.to_vec()),
    );
    responder.spi_i = parse_header(&request).unwrap().initiator_spi;
    let reply = build_message(
        &responder.header(ExchangeType::IkeSaInit, 0),
        &[
            IkePayload::SA(Proposal::ike(1, &responder.local).to_sa_payload().unwrap()),
            IkePayload::KE(KePayload::new(DhGroup::Curve25519.id(), vec![9; 31])),
            IkePayload::Nonce(NoncePayload::new(vec![0x4e; 32]).unwrap()),
        ],
    )
    .unwrap();

    assert!(matches!(
        init.process(&reply),
        Err(Error::InvalidKeyExchange(_))
    ));
    assert_eq!(init.state(), ExchangeState::SaInit);
    assert!(init.keys().is_none());

    // The keypair survives, so the genuine reply is still accepted
    init.process(&responder.sa_init(&request, None)).unwrap();
    assert_eq!(init.state(), ExchangeState::SaAuth);
}

#[test]
fn test_no_proposal_chosen() {
    let mut init = initiator(shared_secret_config(curve25519_proposal()), credentials());
    let request = init.build_next_message().unwrap().unwrap();

    // Responder answers with a group the initiator did not offer
    let mut responder = Responder::new(
        LocalProposal {
            dh: DhGroup::Modp2048,
            ..curve25519_proposal()
        },
        peer_identity(),
        ResponderAuth::SharedSecret(SECRET.to_vec()),
    );
    let header = parse_header(&request).unwrap();
    responder.spi_i = header.initiator_spi;
    let reply = build_message(
        &responder.header(ExchangeType::IkeSaInit, 0),
        &[
            IkePayload::SA(Proposal::ike(1, &responder.local).to_sa_payload().unwrap()),
            IkePayload::KE(KePayload::new(DhGroup::Modp2048.id(), vec![1; 256])),
            IkePayload::Nonce(NoncePayload::new(vec![0x4e; 32]).unwrap()),
        ],
    )
    .unwrap();

    assert!(matches!(init.process(&reply), Err(Error::NoProposalChosen)));
    assert_eq!(init.state(), ExchangeState::SaInit);
}

#[test]
fn test_certificate_exchange_ed25519() {
    let signing_key = ed25519_dalek::SigningKey::from_bytes(&[0x21; 32]);
    let config = InitiatorConfig::builder()
        .with_proposal(curve25519_proposal())
        .with_peer_auth(PeerAuthMode::Certificate {
            method: AuthMethod::DigitalSignature,
        })
        .build()
        .unwrap();

    init_tracing();
    let mut init = Ikev2Initiator::new(config, |_: Option<&IdPayload>| {
        Some(Zeroizing::new(SECRET.to_vec()))
    })
    .unwrap();
    let mut responder = Responder::new(
        curve25519_proposal(),
        peer_identity(),
        ResponderAuth::Ed25519(signing_key),
    );

    run_to_auth_request(&mut init, &mut responder, None);
    init.process(&responder.auth_reply()).unwrap();
    assert_eq!(init.state(), ExchangeState::Done);
}

#[test]
fn test_certificate_exchange_wrong_key() {
    let config = InitiatorConfig::builder()
        .with_proposal(curve25519_proposal())
        .with_peer_auth(PeerAuthMode::Certificate {
            method: AuthMethod::DigitalSignature,
        })
        .build()
        .unwrap();
    let mut init = initiator(config, credentials());
    let mut responder = Responder::new(
        curve25519_proposal(),
        peer_identity(),
        ResponderAuth::Ed25519(ed25519_dalek::SigningKey::from_bytes(&[0x21; 32])),
    );
    run_to_auth_request(&mut init, &mut responder, Some(peer_identity()));

    // Same signature, but the CERT now carries another key
    let honest = responder.auth_reply();
    let (proposal, keys) = responder.negotiated();
    let outer = parse_payload_chain(PayloadType::SK.to_u8(), &honest[28..]).unwrap();
    let inner = decrypt_payloads(
        proposal,
        keys,
        Direction::ResponderToInitiator,
        &honest,
        outer.encrypted().unwrap(),
    )
    .unwrap();
    let mut payloads = inner.into_vec();
    if let Some(IkePayload::CERT(cert)) = payloads.get_mut(1) {
        cert.data = ed25519_dalek::SigningKey::from_bytes(&[0x22; 32])
            .verifying_key()
            .to_bytes()
            .to_vec();
    }
    let forged = encrypt_payloads(
        proposal,
        keys,
        Direction::ResponderToInitiator,
        &responder.header(ExchangeType::IkeAuth, 1),
        &payloads,
    )
    .unwrap();

    assert!(matches!(
        init.process(&forged),
        Err(Error::AuthenticationFailed(_))
    ));
    assert_eq!(init.state(), ExchangeState::SaAuth);

    init.process(&honest).unwrap();
    assert_eq!(init.state(), ExchangeState::Done);
}

#[test]
fn test_certificate_mode_requires_cert() {
    let config = InitiatorConfig::builder()
        .with_proposal(curve25519_proposal())
        .with_peer_auth(PeerAuthMode::Certificate {
            method: AuthMethod::DigitalSignature,
        })
        .build()
        .unwrap();
    let mut init = initiator(config, credentials());
    let mut responder = Responder::new(
        curve25519_proposal(),
        peer_identity(),
        ResponderAuth::Ed25519(ed25519_dalek::SigningKey::from_bytes(&[0x21; 32])),
    );
    run_to_auth_request(&mut init, &mut responder, Some(peer_identity()));

    // Valid signature, but no CERT to verify it with
    let honest = responder.auth_reply();
    let (proposal, keys) = responder.negotiated();
    let outer = parse_payload_chain(PayloadType::SK.to_u8(), &honest[28..]).unwrap();
    let inner = decrypt_payloads(
        proposal,
        keys,
        Direction::ResponderToInitiator,
        &honest,
        outer.encrypted().unwrap(),
    )
    .unwrap();
    let payloads: Vec<IkePayload> = inner
        .into_vec()
        .into_iter()
        .filter(|p| !matches!(p, IkePayload::CERT(_)))
        .collect();
    assert_eq!(payloads.len(), 2);
    let stripped = encrypt_payloads(
        proposal,
        keys,
        Direction::ResponderToInitiator,
        &responder.header(ExchangeType::IkeAuth, 1),
        &payloads,
    )
    .unwrap();

    assert!(matches!(
        init.process(&stripped),
        Err(Error::AuthenticationFailed(_))
    ));
    assert_eq!(init.state(), ExchangeState::SaAuth);

    init.process(&honest).unwrap();
    assert_eq!(init.state(), ExchangeState::Done);
}
