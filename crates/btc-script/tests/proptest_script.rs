use proptest::prelude::*;

use btc_script::interpreter::scriptnum::decode_num;
use btc_script::interpreter::{execute_script, SigVersion, Stack, VerifyFlags};
use btc_script::{Script, ScriptBuilder};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn script_program_roundtrip(data in prop::collection::vec(any::<u8>(), 0..512)) {
        if let Ok(script) = Script::parse(&data) {
            prop_assert_eq!(script.program(), &data[..]);
            let rebuilt = Script::from_chunks(script.chunks().to_vec());
            prop_assert_eq!(rebuilt.program(), &data[..]);
        }
    }

    #[test]
    fn script_hex_roundtrip(data in prop::collection::vec(any::<u8>(), 0..256)) {
        if let Ok(script) = Script::parse(&data) {
            let script2 = Script::from_hex(&script.to_hex()).unwrap();
            prop_assert_eq!(script, script2);
        }
    }

    /// A built number push always executes back to the same value.
    #[test]
    fn builder_number_executes_to_value(val in -0x7FFF_FFFFi64..=0x7FFF_FFFFi64) {
        let script = ScriptBuilder::new().number(val).build();
        let mut stack = Stack::new();
        execute_script(None, 0, &script, &mut stack, VerifyFlags::MINIMALDATA, SigVersion::Base).unwrap();
        let top = stack.pop_byte_array().unwrap();
        prop_assert_eq!(decode_num(&top, true, 4).unwrap(), val);
    }

    /// Built data pushes are minimal and push exactly the given bytes.
    #[test]
    fn builder_data_pushes_bytes(data in prop::collection::vec(any::<u8>(), 0..=520)) {
        let script = ScriptBuilder::new().data(&data).unwrap().build();
        let mut stack = Stack::new();
        execute_script(None, 0, &script, &mut stack, VerifyFlags::MINIMALDATA, SigVersion::Base).unwrap();
        let top = stack.pop_byte_array().unwrap();
        // OP_1NEGATE and OP_N push the script number encoding of the same byte
        prop_assert_eq!(top, data);
    }

    #[test]
    fn remove_all_pushes_never_grows(
        data in prop::collection::vec(any::<u8>(), 0..256),
        needle in prop::collection::vec(any::<u8>(), 0..8),
    ) {
        if let Ok(script) = Script::parse(&data) {
            let stripped = Script::remove_all_pushes_of(script.program(), &needle);
            prop_assert!(stripped.len() <= data.len());
        }
    }
}
