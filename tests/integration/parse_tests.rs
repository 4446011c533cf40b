//! End-to-end decoding tests.

use dicom_reader::{
    read_bytes, read_file, AttributeDictionary, Bound, DatasetReader, DicomError, DicomValue,
    Tag, Vr,
};

use super::test_utils::{
    element, item, padded, sequence_delimiter, DicomFileBuilder, Encoding, EXPLICIT_BE,
    IMPLICIT_LE, JPEG_BASELINE,
};

fn text(value: &str) -> Option<DicomValue> {
    Some(DicomValue::String(value.to_string()))
}

// =============================================================================
// Meta Group and Transfer Syntax
// =============================================================================

#[test]
fn test_minimal_file_from_disk() {
    let (_dir, path) = DicomFileBuilder::explicit_little()
        .without_group_length()
        .element(0x0008, 0x0005, b"CS", b"ISO_IR 100")
        .element(0x0010, 0x0010, b"PN", b"Doe^John")
        .write();

    let dataset = read_file(&path).unwrap();
    assert!(dataset.explicit_vr);
    assert!(dataset.little_endian);
    assert_eq!(dataset.value(Tag::PATIENT_NAME), text("Doe^John").as_ref());

    let tags = dataset.iter().map(|e| e.tag).collect::<Vec<_>>();
    assert_eq!(
        tags,
        vec![
            Tag::new(0x0002, 0x0001),
            Tag::TRANSFER_SYNTAX_UID,
            Tag::SPECIFIC_CHARACTER_SET,
            Tag::PATIENT_NAME,
        ]
    );
}

#[test]
fn test_implicit_little_endian_body() {
    let bytes = DicomFileBuilder::new(IMPLICIT_LE, Encoding::ImplicitLittle)
        .element(0x0008, 0x0060, b"CS", b"CT")
        .element(0x0028, 0x0010, b"US", &[0x00, 0x02])
        .element(0x0009, 0x1010, b"UN", b"vendor")
        .build();

    let dataset = read_bytes(bytes).unwrap();
    assert!(!dataset.explicit_vr);

    let modality = dataset.get(Tag::new(0x0008, 0x0060)).unwrap();
    assert_eq!(modality.vr, Some(Vr::CS));
    assert_eq!(modality.name, "Modality");
    assert_eq!(modality.value, text("CT"));

    assert_eq!(dataset.value(Tag::ROWS), Some(&DicomValue::U16s(vec![512])));

    let private = dataset.get(Tag::new(0x0009, 0x1010)).unwrap();
    assert_eq!(private.vr, Some(Vr::UN));
    assert_eq!(private.name, "");
    assert_eq!(private.raw.as_slice(), b"vendor");
}

#[test]
fn test_explicit_big_endian_body() {
    let bytes = DicomFileBuilder::new(EXPLICIT_BE, Encoding::ExplicitBig)
        .element(0x0018, 0x0050, b"DS", b"2.5 ")
        .element(0x0028, 0x0011, b"US", &[0x01, 0x00])
        .element(0x0018, 0x9219, b"SS", &[0xFF, 0xFE])
        .build();

    let dataset = read_bytes(bytes).unwrap();
    assert!(dataset.explicit_vr);
    assert!(!dataset.little_endian);
    assert_eq!(dataset.value(Tag::new(0x0018, 0x0050)), text("2.5").as_ref());
    assert_eq!(dataset.value(Tag::COLUMNS), Some(&DicomValue::U16s(vec![256])));
    assert_eq!(
        dataset.value(Tag::new(0x0018, 0x9219)),
        Some(&DicomValue::I16(-2))
    );
}

#[test]
fn test_meta_group_length_is_reported() {
    let bytes = DicomFileBuilder::explicit_little()
        .element(0x0010, 0x0020, b"LO", b"PID1")
        .build();

    let dataset = read_bytes(bytes).unwrap();
    let group_length = dataset.get(Tag::META_GROUP_LENGTH).unwrap();
    assert_eq!(group_length.name, "File Meta Information Group Length");
    assert_eq!(group_length.value, Some(DicomValue::U32(42)));
}

#[test]
fn test_invalid_flag() {
    let mut bytes = DicomFileBuilder::explicit_little()
        .element(0x0010, 0x0010, b"PN", b"Doe")
        .build();
    bytes[128] = b'X';

    match read_bytes(bytes) {
        Err(DicomError::Format { offset, reason }) => {
            assert_eq!(offset, 128);
            assert_eq!(reason, "invalid flag");
        }
        other => panic!("expected format error, got {:?}", other),
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = read_file(dir.path().join("missing.dcm"));
    assert!(matches!(result, Err(DicomError::Io(_))));
}

// =============================================================================
// Sequences
// =============================================================================

#[test]
fn test_defined_and_undefined_sequences() {
    let enc = Encoding::ExplicitLittle;
    let code = element(enc, 0x0008, 0x0100, b"SH", b"113619", None);

    let defined = element(enc, 0x0008, 0x1140, b"SQ", &item(enc, &code, false), None);

    let mut undefined = element(enc, 0x0040, 0xA730, b"SQ", &[], Some(0xFFFF_FFFF));
    undefined.extend(item(enc, &code, true));
    undefined.extend(item(enc, &code, false));
    undefined.extend(sequence_delimiter(enc));

    let bytes = DicomFileBuilder::explicit_little()
        .raw(&defined)
        .raw(&undefined)
        .element(0x0010, 0x0010, b"PN", b"After^Sequence")
        .build();

    let dataset = read_bytes(bytes).unwrap();

    let first = dataset.get(Tag::new(0x0008, 0x1140)).unwrap();
    let first_sequence = first.sequence.as_ref().unwrap();
    assert!(matches!(first_sequence.bound, Bound::Length(_)));
    assert_eq!(first_sequence.items.len(), 1);

    let second = dataset.get(Tag::new(0x0040, 0xA730)).unwrap();
    assert!(second.is_undefined_length());
    let second_sequence = second.sequence.as_ref().unwrap();
    assert_eq!(second_sequence.bound, Bound::Delimited);
    assert_eq!(second_sequence.items.len(), 2);
    assert_eq!(second_sequence.items[0].bound, Bound::Delimited);
    assert!(matches!(second_sequence.items[1].bound, Bound::Length(_)));
    assert_eq!(second_sequence.items[1].elements[0].value, text("113619"));

    assert_eq!(
        dataset.value(Tag::PATIENT_NAME),
        text("After^Sequence").as_ref()
    );
}

#[test]
fn test_implicit_sequence_uses_dictionary_vr() {
    let enc = Encoding::ImplicitLittle;
    let uid = element(enc, 0x0008, 0x1155, b"UI", &padded(b"1.2.3.4", 0), None);
    let mut sequence = element(enc, 0x0008, 0x1140, b"SQ", &[], Some(0xFFFF_FFFF));
    sequence.extend(item(enc, &uid, true));
    sequence.extend(sequence_delimiter(enc));

    let bytes = DicomFileBuilder::new(IMPLICIT_LE, enc)
        .raw(&sequence)
        .element(0x0020, 0x0013, b"IS", b"7 ")
        .build();

    let dataset = read_bytes(bytes).unwrap();
    let element = dataset.get(Tag::new(0x0008, 0x1140)).unwrap();
    assert_eq!(element.vr, Some(Vr::SQ));

    let items = &element.sequence.as_ref().unwrap().items;
    assert_eq!(items[0].elements[0].value, text("1.2.3.4"));
    assert_eq!(dataset.value(Tag::new(0x0020, 0x0013)), text("7 ").as_ref());
}

#[test]
fn test_runaway_sequence_nesting_is_rejected() {
    let enc = Encoding::ExplicitLittle;
    let levels = 20_000;
    let open_sequence = element(enc, 0x0008, 0x1140, b"SQ", &[], Some(0xFFFF_FFFF));
    let empty_item = item(enc, &[], true);
    let (open_item, close_item) = empty_item.split_at(8);

    let mut nested = Vec::new();
    for _ in 0..levels {
        nested.extend_from_slice(&open_sequence);
        nested.extend_from_slice(open_item);
    }
    nested.extend(element(enc, 0x0008, 0x0100, b"SH", b"AB", None));
    for _ in 0..levels {
        nested.extend_from_slice(close_item);
        nested.extend(sequence_delimiter(enc));
    }

    let bytes = DicomFileBuilder::explicit_little().raw(&nested).build();
    assert!(matches!(read_bytes(bytes), Err(DicomError::Format { .. })));
}

// =============================================================================
// Undefined Length Values
// =============================================================================

#[test]
fn test_encapsulated_pixel_data_resolves_to_delimiter() {
    let enc = Encoding::ExplicitLittle;
    let mut pixel_data = element(enc, 0x7FE0, 0x0010, b"OB", &[], Some(0xFFFF_FFFF));
    let fragments = [item(enc, &[], false), item(enc, &[0xFF, 0xD8, 0xFF, 0xD9], false)].concat();
    pixel_data.extend_from_slice(&fragments);
    pixel_data.extend(sequence_delimiter(enc));

    let bytes = DicomFileBuilder::new(JPEG_BASELINE, enc)
        .raw(&pixel_data)
        .build();

    let dataset = read_bytes(bytes).unwrap();
    assert!(dataset.transfer_syntax().unwrap().encapsulated);

    let pixels = dataset.pixel_data().unwrap();
    assert!(pixels.is_undefined_length());
    assert_eq!(pixels.raw.len(), fragments.len());
    assert_eq!(pixels.raw.as_slice(), &fragments[..]);

    let last = dataset.iter().last().unwrap();
    assert_eq!(last.tag, Tag::SEQUENCE_DELIMITATION);
}

#[test]
fn test_undefined_length_without_delimiter_fails() {
    let enc = Encoding::ExplicitLittle;
    let mut pixel_data = element(enc, 0x7FE0, 0x0010, b"OB", &[], Some(0xFFFF_FFFF));
    pixel_data.extend_from_slice(&[1, 2, 3, 4]);

    let bytes = DicomFileBuilder::explicit_little().raw(&pixel_data).build();
    assert!(matches!(read_bytes(bytes), Err(DicomError::Format { .. })));
}

// =============================================================================
// Character Sets
// =============================================================================

#[test]
fn test_utf8_charset() {
    let bytes = DicomFileBuilder::explicit_little()
        .element(0x0008, 0x0005, b"CS", b"ISO_IR 192")
        .element(0x0010, 0x0010, b"PN", &padded("Müller^Jürgen".as_bytes(), b' '))
        .build();

    let dataset = read_bytes(bytes).unwrap();
    let name = dataset.value(Tag::PATIENT_NAME).unwrap().to_string();
    assert_eq!(name.trim_end(), "Müller^Jürgen");
}

#[test]
fn test_korean_person_name() {
    let (hangul, _, _) = encoding_rs::EUC_KR.encode("김^희중");
    let mut name = b"Kim^HeeJoong=".to_vec();
    name.extend_from_slice(b"\x1b$)C");
    name.extend_from_slice(&hangul);
    name.extend_from_slice(b"\x1b(B");

    let bytes = DicomFileBuilder::explicit_little()
        .element(0x0008, 0x0005, b"CS", &padded(b"\\ISO 2022 IR 149", b' '))
        .element(0x0010, 0x0010, b"PN", &name)
        .build();

    let dataset = read_bytes(bytes).unwrap();
    assert_eq!(
        dataset.value(Tag::PATIENT_NAME),
        text("Kim^HeeJoong=김^희중").as_ref()
    );
}

#[test]
fn test_invalid_text_is_encoding_error() {
    let bytes = DicomFileBuilder::explicit_little()
        .element(0x0008, 0x0005, b"CS", b"ISO_IR 192")
        .element(0x0010, 0x0010, b"PN", &[0x41, 0xFF])
        .build();

    assert!(matches!(
        read_bytes(bytes),
        Err(DicomError::Encoding { encoding: "UTF-8", .. })
    ));
}

// =============================================================================
// Dictionary
// =============================================================================

#[test]
fn test_custom_dictionary_names_private_tags() {
    let dir = tempfile::tempdir().unwrap();
    let table = dir.path().join("private.txt");
    std::fs::write(&table, "0009,10xx\tVendor Block\tLO\n").unwrap();
    let dictionary = AttributeDictionary::load(&table).unwrap();

    let bytes = DicomFileBuilder::new(IMPLICIT_LE, Encoding::ImplicitLittle)
        .element(0x0009, 0x1010, b"LO", b"ACME")
        .build();
    let path = dir.path().join("private.dcm");
    std::fs::write(&path, bytes).unwrap();

    let dataset = DatasetReader::new(&dictionary).read_file(&path).unwrap();
    let private = dataset.get(Tag::new(0x0009, 0x1010)).unwrap();
    assert_eq!(private.name, "Vendor Block");
    assert_eq!(private.vr, Some(Vr::LO));
    assert_eq!(private.value, text("ACME"));
}

#[test]
fn test_dump_output() {
    let bytes = DicomFileBuilder::explicit_little()
        .element(0x0010, 0x0010, b"PN", b"Doe^John")
        .element(0x0028, 0x0010, b"US", &[0x00, 0x02])
        .element(0x7FE0, 0x0010, b"OB", &vec![0u8; 2048])
        .build();

    let dataset = read_bytes(bytes).unwrap();
    let mut out = Vec::new();
    dataset.dump(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("[0010,0010](PN)Patient's Name: Doe^John\n"));
    assert!(text.contains("[0028,0010](US)Rows: [512]\n"));
    assert!(text.contains("[7fe0,0010](OB)Pixel Data:[2048 bytes] {value too long to show}\n"));
}
