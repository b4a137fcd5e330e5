use proptest::prelude::*;

use btc_primitives::ec::private_key::PrivateKey;
use btc_primitives::ec::public_key::PublicKey;
use btc_primitives::ec::signature::Signature;
use btc_primitives::hash::{sha256, sha256d};
use btc_primitives::util::{ByteReader, ByteWriter, VarInt};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn private_key_to_public_key_roundtrip(seed in prop::array::uniform32(any::<u8>())) {
        // Not all 32-byte arrays are valid private keys (must be < curve order, nonzero).
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let pub_key = pk.pub_key();
            let compressed = PublicKey::from_bytes(&pub_key.to_compressed()).unwrap();
            let uncompressed = PublicKey::from_bytes(&pub_key.to_uncompressed()).unwrap();
            prop_assert_eq!(&compressed, &pub_key);
            prop_assert_eq!(&uncompressed, &pub_key);
            let pk2 = PrivateKey::from_hex(&hex::encode(seed)).unwrap();
            prop_assert_eq!(pk2.pub_key(), pub_key);
        }
    }

    #[test]
    fn ecdsa_sign_verify_der_roundtrip(
        seed in prop::array::uniform32(any::<u8>()),
        msg in prop::collection::vec(any::<u8>(), 0..256)
    ) {
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let hash = sha256(&msg);
            let sig = pk.sign(&hash).unwrap();
            prop_assert!(sig.is_low_s());

            let der = sig.to_der();
            let parsed = Signature::from_der(&der).unwrap();
            let parsed_lax = Signature::from_der_lax(&der).unwrap();
            prop_assert_eq!(&parsed, &sig);
            prop_assert_eq!(&parsed_lax, &sig);
            prop_assert!(pk.pub_key().verify(&hash, &parsed));
            prop_assert!(!pk.pub_key().verify(&sha256d(&msg), &parsed));
        }
    }

    /// Lax DER decoding never panics on arbitrary input.
    #[test]
    fn lax_der_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..80)) {
        let _ = Signature::from_der_lax(&bytes);
        let _ = Signature::from_der(&bytes);
    }

    #[test]
    fn varint_writer_reader_roundtrip(value in any::<u64>(), tail in prop::collection::vec(any::<u8>(), 0..16)) {
        let mut writer = ByteWriter::new();
        writer.write_varint(VarInt(value));
        writer.write_bytes(&tail);
        let data = writer.into_bytes();

        let mut reader = ByteReader::new(&data);
        prop_assert_eq!(reader.read_varint().unwrap().value(), value);
        prop_assert_eq!(reader.read_bytes(tail.len()).unwrap(), &tail[..]);
        prop_assert_eq!(reader.remaining(), 0);
    }
}
