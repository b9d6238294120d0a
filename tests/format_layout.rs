//! Byte-exact layout tests through the public API

use lzforge::formats::lz40;
use lzforge::{
    compress, decompress, ByteOrder, Codec, FormatId, ParseSettings, ParseStrategy,
    CRILAYLA_RAW_PREFIX,
};

const TWELVE_A: &[u8] = b"AAAAAAAAAAAA";

#[test]
fn test_twelve_a_lz10() {
    let packed = compress(FormatId::Lz10, TWELVE_A).unwrap();
    assert_eq!(packed, hex::decode("100c000040418000").unwrap());
    assert_eq!(decompress(FormatId::Lz10, &packed).unwrap(), TWELVE_A);
}

#[test]
fn test_twelve_a_yaz0() {
    let packed = compress(FormatId::Yaz0Be, TWELVE_A).unwrap();
    assert_eq!(
        packed,
        hex::decode(concat!("59617a30", "0000000c", "0000000000000000", "e04141417000")).unwrap()
    );
    assert_eq!(decompress(FormatId::Yaz0Be, &packed).unwrap(), TWELVE_A);
}

#[test]
fn test_lz40_prefers_cheaper_shorter_match() {
    // a 16-byte copy needs the one-byte length extension, a 15-byte one
    // fits the nibble
    let input = b"abcdefghijklmnop#pQRSTUVWXY!abcdefghijklmnopQRSTUVWXY";
    let optimal = ParseSettings::default().parse(input, lz40::LIMITATIONS, &lz40::Lz40Price);
    let greedy = ParseSettings {
        strategy: ParseStrategy::Greedy,
        ..ParseSettings::default()
    }
    .parse(input, lz40::LIMITATIONS, &lz40::Lz40Price);

    assert_eq!(greedy.longest_match(), 16);
    assert_eq!(optimal.longest_match(), 15);
    assert!(optimal.price(&lz40::Lz40Price) < greedy.price(&lz40::Lz40Price));

    let small = Codec::new(FormatId::Lz40).compress(input).unwrap();
    let large = Codec::new(FormatId::Lz40)
        .strategy(ParseStrategy::Greedy)
        .compress(input)
        .unwrap();
    assert!(small.len() <= large.len());
    assert_eq!(Codec::new(FormatId::Lz40).decompress(&small).unwrap(), input);
}

#[test]
fn test_endianness_variants() {
    let input = b"the same content in either byte order, the same content".repeat(10);
    for (le, be) in [
        (FormatId::Yaz0Le, FormatId::Yaz0Be),
        (FormatId::Yay0Le, FormatId::Yay0Be),
        (FormatId::Mio0Le, FormatId::Mio0Be),
    ] {
        let little = Codec::new(le).compress(&input).unwrap();
        let big = Codec::new(be).compress(&input).unwrap();
        assert_ne!(little, big, "{le} and {be} should differ");
        assert_eq!(Codec::new(le).decompress(&little).unwrap(), input);
        assert_eq!(Codec::new(be).decompress(&big).unwrap(), input);
    }

    // the byte order option overrides the name's default
    let overridden = Codec::new(FormatId::Mio0Le).byte_order(ByteOrder::BigEndian);
    assert_eq!(
        overridden.compress(&input).unwrap(),
        Codec::new(FormatId::Mio0Be).compress(&input).unwrap()
    );
}

#[test]
fn test_mio0_layout() {
    let packed = compress(FormatId::Mio0Be, b"ABCABCABC").unwrap();
    let expected = hex::decode(concat!(
        "4d494f30", "00000009", "00000014", "00000016", "e0000000", "3002", "414243"
    ))
    .unwrap();
    assert_eq!(packed, expected);
}

#[test]
fn test_nintendo_headers() {
    let input = vec![0x11u8; 300];
    for (format, tag) in [
        (FormatId::Lz10, 0x10),
        (FormatId::Lz11, 0x11),
        (FormatId::Lz40, 0x40),
        (FormatId::Lz60, 0x60),
        (FormatId::Huffman4, 0x24),
        (FormatId::Huffman8, 0x28),
        (FormatId::Rle, 0x30),
    ] {
        let packed = Codec::new(format).compress(&input).unwrap();
        assert_eq!(&packed[..4], &[tag, 0x2C, 0x01, 0x00], "{format}");
        assert_eq!(packed.len() % 4, 0, "{format} output is not word aligned");
    }
}

#[test]
fn test_crilayla_layout() {
    let mut input: Vec<u8> = (0..CRILAYLA_RAW_PREFIX).map(|i| i as u8).collect();
    input.extend(b"cri middleware ".repeat(30));
    let packed = Codec::new(FormatId::Crilayla).compress(&input).unwrap();

    assert_eq!(&packed[..8], b"CRILAYLA");
    let body = u32::from_le_bytes(packed[8..12].try_into().unwrap()) as usize;
    let region = u32::from_le_bytes(packed[12..16].try_into().unwrap()) as usize;
    assert_eq!(body, input.len() - CRILAYLA_RAW_PREFIX);
    assert_eq!(region % 4, 0);
    assert_eq!(packed.len(), 0x10 + region + CRILAYLA_RAW_PREFIX);
    assert_eq!(&packed[0x10 + region..], &input[..CRILAYLA_RAW_PREFIX]);
}

#[test]
fn test_backward_lz77_footer() {
    let input = b"backward backward backward backward".repeat(8);
    let packed = Codec::new(FormatId::BackwardLz77).compress(&input).unwrap();
    let n = packed.len();
    let info = u32::from_le_bytes(packed[n - 8..n - 4].try_into().unwrap());
    let delta = u32::from_le_bytes(packed[n - 4..].try_into().unwrap());

    assert_eq!(n % 4, 0);
    assert_eq!((n as u32).wrapping_add(delta) as usize, input.len());
    let header_len = (info >> 24) as usize;
    assert!((8..=11).contains(&header_len));
    // padding between the region and the footer is 0xFF
    assert!(packed[n - header_len..n - 8].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_detect_rejects_unknown() {
    assert_eq!(FormatId::detect(b""), None);
    assert_eq!(FormatId::detect(b"\x10\x00"), None);
    assert_eq!(FormatId::detect(b"PK\x03\x04 not ours"), None);
}

#[test]
fn test_detect_round_trip() {
    let input = b"detect me from my signature ".repeat(16);
    for format in FormatId::ALL {
        if format == FormatId::BackwardLz77 {
            continue;
        }
        let data = if format == FormatId::Crilayla {
            [vec![0u8; CRILAYLA_RAW_PREFIX], input.clone()].concat()
        } else {
            input.clone()
        };
        let packed = Codec::new(format).compress(&data).unwrap();
        assert_eq!(FormatId::detect(&packed), Some(format));
        assert_eq!(Codec::new(format).decompress(&packed).unwrap(), data);
    }
}
