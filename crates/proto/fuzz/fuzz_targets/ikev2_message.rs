//! Fuzz target for IKEv2 message parsing.
//!
//! Feeds arbitrary input to the header parser, the payload chain parser and
//! an initiator waiting for its IKE_SA_INIT response. None of them may panic.
//!
//! Run with:
//! ```bash
//! cd crates/proto
//! cargo +nightly fuzz run ikev2_message -- -max_total_time=300
//! ```

#![no_main]
use eapike_proto::ikev2::{
    parse_header, parse_payload_chain, Ikev2Initiator, InitiatorConfig, StaticCredentials,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = parse_header(data) {
        let _ = parse_payload_chain(header.next_payload, &data[28..]);
    }

    if let Some((&first, rest)) = data.split_first() {
        let _ = parse_payload_chain(first, rest);
    }

    let Ok(config) = InitiatorConfig::builder().build() else {
        return;
    };
    let Ok(mut initiator) = Ikev2Initiator::new(config, StaticCredentials::new()) else {
        return;
    };
    let Ok(Some(request)) = initiator.build_next_message() else {
        return;
    };

    // Splice our SPI into the input so header checks pass more often
    let mut response = data.to_vec();
    if response.len() >= 8 {
        response[..8].copy_from_slice(&request[..8]);
    }
    if initiator.process(&response).is_err() {
        assert_eq!(initiator.state(), eapike_proto::ikev2::ExchangeState::SaInit);
    }
});
