//! Property tests for the fixed-point wire formats.

use proptest::prelude::*;

use scenesync_shared::fixed;

macro_rules! round_trip_property {
    ($name:ident, $write:ident, $read:ident, $len:expr, $scale:expr, $range:expr) => {
        proptest! {
            #[test]
            fn $name(value in $range) {
                let mut buf = [0u8; $len];
                fixed::$write(&mut buf, 0, value);
                let decoded = fixed::$read(&mut buf, 0);
                let resolution = 1.0 / $scale;
                prop_assert!(
                    (decoded - value).abs() <= resolution / 2.0 + 1e-9,
                    "value {} decoded as {}",
                    value,
                    decoded
                );
                // sign is preserved exactly
                if value != 0.0 && decoded != 0.0 {
                    prop_assert_eq!(value < 0.0, decoded < 0.0);
                }
                // the decoder cleared the sign bit in the source buffer
                prop_assert_eq!(buf[0] & 0x80, 0);
            }
        }
    };
}

round_trip_property!(fp248_round_trips, write_fp248, read_fp248, 4, 256.0, -8_000_000.0f64..8_000_000.0);
round_trip_property!(fp168_round_trips, write_fp168, read_fp168, 3, 256.0, -32_000.0f64..32_000.0);
round_trip_property!(fp1616_round_trips, write_fp1616, read_fp1616, 4, 65536.0, -32_000.0f64..32_000.0);
round_trip_property!(fp88_round_trips, write_fp88, read_fp88, 2, 256.0, -127.0f64..127.0);
round_trip_property!(fp412_round_trips, write_fp412, read_fp412, 2, 4096.0, -7.9f64..7.9);
round_trip_property!(fp17_round_trips, write_fp17, read_fp17, 1, 128.0, -0.99f64..0.99);

proptest! {
    #[test]
    fn uint_round_trips(a in any::<u16>(), b in 0u32..(1 << 24), c in any::<u32>()) {
        let mut buf = [0u8; 4];
        fixed::write_u16(&mut buf, 0, a);
        prop_assert_eq!(fixed::read_u16(&buf, 0), a);
        fixed::write_u24(&mut buf, 0, b);
        prop_assert_eq!(fixed::read_u24(&buf, 0), b);
        fixed::write_u32(&mut buf, 0, c);
        prop_assert_eq!(fixed::read_u32(&buf, 0), c);
    }

    #[test]
    fn encoders_are_pure_on_fresh_buffers(value in -30_000.0f64..30_000.0) {
        let mut first = [0u8; 3];
        let mut second = [0u8; 3];
        fixed::write_fp168(&mut first, 0, value);
        fixed::write_fp168(&mut second, 0, value);
        prop_assert_eq!(first, second);
    }
}
