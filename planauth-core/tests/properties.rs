//! Property-based tests for token issuance and verification

use planauth_core::*;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

const START: u64 = 1_700_000_000;

fn codec_at(lifespan_hours: u64) -> (TokenCodec, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START));
    let codec = TokenCodec::new(
        Arc::new(StaticKeySource::generate()),
        Duration::from_secs(lifespan_hours * 3600),
    )
    .with_clock(clock.clone());
    (codec, clock)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn props_verify_returns_issued_principal(
        id in any::<u64>(),
        hours in 1u64..=MAX_TOKEN_HOUR_LIFESPAN,
        elapsed_fraction in 0.0f64..1.0,
    ) {
        let (codec, clock) = codec_at(hours);
        let token = codec.issue(Principal(id)).unwrap();

        let elapsed = ((hours * 3600) as f64 * elapsed_fraction) as u64;
        clock.advance(Duration::from_secs(elapsed.min(hours * 3600 - 1)));

        prop_assert_eq!(codec.verify(&token).unwrap(), Principal(id));
    }

    #[test]
    fn props_expired_tokens_report_expiry_not_forgery(
        id in any::<u64>(),
        hours in 1u64..=72,
        overshoot in 0u64..1_000_000,
    ) {
        let (codec, clock) = codec_at(hours);
        let token = codec.issue(Principal(id)).unwrap();

        clock.advance(Duration::from_secs(hours * 3600 + overshoot));

        prop_assert!(matches!(codec.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn props_foreign_key_never_verifies(id in any::<u64>()) {
        let (codec, _clock) = codec_at(1);
        let (impostor, _other_clock) = codec_at(1);
        let forged = impostor.issue(Principal(id)).unwrap();

        prop_assert!(matches!(codec.verify(&forged), Err(AuthError::InvalidSignature)));
    }
}
