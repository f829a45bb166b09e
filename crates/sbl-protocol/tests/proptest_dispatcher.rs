mod common;

use common::{Recorder, dispatcher, header, set_base};
use proptest::prelude::*;
use sbl_protocol::{Header, Width};

fn width() -> impl Strategy<Value = Width> {
    prop_oneof![Just(Width::W8), Just(Width::W16), Just(Width::W32)]
}

proptest! {
    #[test]
    fn read_sends_backend_values(
        width in width(),
        base in any::<u32>(),
        offset in any::<u16>(),
        len in any::<u8>(),
        seed in any::<u8>(),
    ) {
        let start = base.wrapping_add(offset as u32);
        let count = width.count(len);
        let size = count as u32 * width.bytes();
        let memory = Recorder::with((0..size).map(|i| (start.wrapping_add(i), seed ^ i as u8)));

        let mut input = set_base(base);
        input.extend(header(Header::read(width, offset, len)));
        let mut d = dispatcher(&input, memory);
        d.step().unwrap();
        d.step().unwrap();

        let (io, _) = d.into_parts();
        let mut expected = vec![0x0b, 0x90, 0x00, 0x0a];
        expected.extend((0..size).map(|i| seed ^ i as u8));
        expected.extend([0x90, 0x00]);
        prop_assert_eq!(io.output, expected);
    }

    #[test]
    fn write_stores_transmitted_values(
        width in width(),
        base in any::<u32>(),
        offset in any::<u16>(),
        data in proptest::collection::vec(any::<u8>(), 0..=255usize),
    ) {
        let len = data.len() as u8;
        let start = base.wrapping_add(offset as u32);
        let size = (width.count(len) as u32 * width.bytes()) as usize;

        let mut input = set_base(base);
        input.extend(header(Header::write(width, offset, len)));
        input.extend(&data[..size]);
        let mut d = dispatcher(&input, Recorder::default());
        d.step().unwrap();
        d.step().unwrap();

        let (io, memory) = d.into_parts();
        prop_assert_eq!(io.output, vec![0x0b, 0x90, 0x00, 0x0c, 0x90, 0x00]);
        prop_assert_eq!(memory.accesses.len(), width.count(len) as usize);
        prop_assert_eq!(memory.bytes.len(), size);
        for (i, byte) in data[..size].iter().enumerate() {
            prop_assert_eq!(memory.bytes.get(&start.wrapping_add(i as u32)), Some(byte));
        }
    }

    #[test]
    fn base_payload_is_little_endian(bytes in any::<[u8; 4]>()) {
        let mut input = header(Header::base());
        input.extend(bytes);
        let mut d = dispatcher(&input, Recorder::default());
        d.step().unwrap();

        let expected = bytes[0] as u32
            | (bytes[1] as u32) << 8
            | (bytes[2] as u32) << 16
            | (bytes[3] as u32) << 24;
        prop_assert_eq!(d.base(), expected);
    }
}
