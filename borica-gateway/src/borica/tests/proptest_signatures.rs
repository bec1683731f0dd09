use proptest::prelude::*;

use crate::borica::{BoricaSigner, BoricaVerifier, CanonicalScheme, EmptyField, GatewayProfile};

const PRIVATE_PKCS8: &str = include_str!("../../../tests/data/test_pkcs8.pem");
const PUBLIC_SPKI: &str = include_str!("../../../tests/data/test_pub.pem");

fn field_list() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-zA-Z0-9 .БГЕВРОлв-]{0,24}", 1..16)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn test_sign_verify_roundtrip_emv_3ds(fields in field_list()) {
        let profile = GatewayProfile::emv_3ds();
        let signer = BoricaSigner::new(PRIVATE_PKCS8, None, profile.digest).unwrap();
        let verifier = BoricaVerifier::new(PUBLIC_SPKI, profile).unwrap();

        let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
        let signature = signer.sign(&profile.scheme.canonicalize(&refs)).unwrap();

        prop_assert!(verifier.verify(&refs, &signature));
    }

    #[test]
    fn test_sign_verify_roundtrip_legacy(fields in field_list()) {
        let profile = GatewayProfile::legacy();
        let signer = BoricaSigner::new(PRIVATE_PKCS8, None, profile.digest).unwrap();
        let verifier = BoricaVerifier::new(PUBLIC_SPKI, profile).unwrap();

        let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
        let signature = signer.sign(&profile.scheme.canonicalize(&refs)).unwrap();

        prop_assert!(verifier.verify(&refs, &signature));
    }

    #[test]
    fn test_flipped_signature_nibble_is_rejected(
        fields in field_list(),
        position in 0usize..512,
    ) {
        let profile = GatewayProfile::emv_3ds();
        let signer = BoricaSigner::new(PRIVATE_PKCS8, None, profile.digest).unwrap();
        let verifier = BoricaVerifier::new(PUBLIC_SPKI, profile).unwrap();

        let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
        let signature = signer.sign(&profile.scheme.canonicalize(&refs)).unwrap();

        let position = position % signature.len();
        let original = signature.as_bytes()[position];
        let flipped = if original == b'0' { b'1' } else { b'0' };
        let mut tampered = signature.into_bytes();
        tampered[position] = flipped;
        let tampered = String::from_utf8(tampered).unwrap();

        prop_assert!(!verifier.verify(&refs, &tampered));
    }

    // Length prefixes must keep differently-split field lists with the same
    // joined content from colliding into one MAC source.
    #[test]
    fn test_length_prefixes_separate_field_boundaries(
        joined in "[a-z0-9]{2,32}",
        split in 1usize..31,
    ) {
        prop_assume!(split < joined.len());
        let scheme = CanonicalScheme::LengthPrefixed {
            empty: EmptyField::Dash,
            trailing_dash: true,
        };

        let (left, right) = joined.split_at(split);
        let whole = scheme.canonicalize(&[&joined]);
        let halves = scheme.canonicalize(&[left, right]);

        prop_assert_ne!(whole, halves);
    }

    // Verification is total: arbitrary bytes in either input can reject but
    // never panic.
    #[test]
    fn test_verifier_is_total(
        fields in prop::collection::vec(".{0,32}", 0..8),
        signature in ".{0,64}",
    ) {
        let verifier =
            BoricaVerifier::new(PUBLIC_SPKI, GatewayProfile::emv_3ds()).unwrap();
        let refs: Vec<&str> = fields.iter().map(String::as_str).collect();

        let _ = verifier.verify(&refs, &signature);
    }
}
