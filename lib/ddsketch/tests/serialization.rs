use std::collections::BTreeMap;

use ddsketch::{DDSketch, IndexMapping, MappingKind, SketchConfig, SketchError, Store as _};
use ddsketch_protos::sketches::{
    index_mapping::Interpolation, DDSketch as ProtoDDSketch, IndexMapping as ProtoIndexMapping, Store as ProtoStore,
};
use prost::Message as _;

use crate::common::{assert_accurate, datasets, sketch_of, SIZES};

mod common;

const RELATIVE_ACCURACY: f64 = 0.01;

#[test]
fn roundtrip_preserves_quantiles() {
    for dataset in datasets() {
        for size in SIZES {
            let values = dataset.generate(size);
            let sketch = sketch_of(RELATIVE_ACCURACY, &values);

            let decoded = DDSketch::decode(&sketch.encode_to_vec()).unwrap();

            let context = format!("{} ({} values)", dataset.name, size);
            assert_eq!(decoded.count(), sketch.count(), "{}", context);
            assert_eq!(decoded.mapping(), sketch.mapping(), "{}", context);
            assert_accurate(&decoded, &values, RELATIVE_ACCURACY, &context);

            // The summary statistics do not survive the trip.
            assert_eq!(decoded.min(), None, "{}", context);
            assert_eq!(decoded.max(), None, "{}", context);
            assert_eq!(decoded.sum(), None, "{}", context);
        }
    }
}

#[test]
fn roundtrip_every_mapping_kind() {
    let values = datasets()[6].generate(500);
    for mapping in [
        MappingKind::Logarithmic,
        MappingKind::LinearlyInterpolated,
        MappingKind::CubicallyInterpolated,
    ] {
        let config = SketchConfig {
            mapping,
            ..Default::default()
        };
        let mut sketch = config.build().unwrap();
        for &value in &values {
            sketch.accept(value).unwrap();
        }

        let proto = sketch.to_proto();
        let interpolation = proto.mapping.as_ref().unwrap().interpolation;
        let expected = match mapping {
            MappingKind::Logarithmic => Interpolation::None,
            MappingKind::LinearlyInterpolated => Interpolation::Linear,
            MappingKind::CubicallyInterpolated => Interpolation::Cubic,
        };
        assert_eq!(interpolation, expected as i32);

        let decoded = DDSketch::from_proto(&proto).unwrap();
        assert_eq!(decoded.mapping().kind(), mapping);
        assert_eq!(decoded.to_proto(), proto);
    }
}

#[test]
fn decoded_sketches_merge() {
    let values = datasets()[7].generate(1_000);
    let (left, right) = values.split_at(400);

    let mut merged = DDSketch::decode(&sketch_of(RELATIVE_ACCURACY, left).encode_to_vec()).unwrap();
    let other = DDSketch::decode(&sketch_of(RELATIVE_ACCURACY, right).encode_to_vec()).unwrap();
    merged.merge(&other).unwrap();

    assert_eq!(merged.count(), 1_000.0);
    assert_accurate(&merged, &values, RELATIVE_ACCURACY, "decoded and merged");
    assert_eq!(merged.avg(), None);

    // Merging a decoded sketch taints the summary of an exact one.
    let mut exact = sketch_of(RELATIVE_ACCURACY, left);
    exact.merge(&other).unwrap();
    assert_eq!(exact.max(), None);
}

#[test]
fn decodes_sparse_bin_counts() {
    let mapping = IndexMapping::logarithmic(RELATIVE_ACCURACY).unwrap();
    let key = mapping.key(100.0);

    let proto = ProtoDDSketch {
        mapping: Some(mapping.to_proto()),
        positive_values: Some(ProtoStore {
            bin_counts: BTreeMap::from([(key, 3.0), (key + 500, 1.0)]),
            contiguous_bin_counts: vec![2.0],
            contiguous_bin_index_offset: Some(key),
        }),
        negative_values: Some(ProtoStore {
            bin_counts: BTreeMap::new(),
            contiguous_bin_counts: Vec::new(),
            contiguous_bin_index_offset: None,
        }),
        zero_count: 4.0,
    };

    let sketch = DDSketch::decode(&proto.encode_to_vec()).unwrap();
    assert_eq!(sketch.count(), 10.0);
    assert_eq!(sketch.zero_count(), 4.0);
    assert_eq!(sketch.positive_store().bins().collect::<Vec<_>>(), vec![(key, 5.0), (key + 500, 1.0)]);
    assert_eq!(sketch.get_value_at_quantile(0.0), 0.0);
    assert_eq!(sketch.get_value_at_quantile(0.5), mapping.value(key));
    assert_eq!(sketch.get_value_at_quantile(1.0), mapping.value(key + 500));
}

#[test]
fn decodes_shifted_mapping() {
    let proto = ProtoDDSketch {
        mapping: Some(ProtoIndexMapping {
            gamma: Some(1.02),
            index_offset: Some(10.0),
            interpolation: Interpolation::None as i32,
        }),
        positive_values: Some(ProtoStore {
            bin_counts: BTreeMap::new(),
            contiguous_bin_counts: vec![1.0, 0.0, 1.0],
            contiguous_bin_index_offset: Some(10),
        }),
        negative_values: Some(ProtoStore {
            bin_counts: BTreeMap::new(),
            contiguous_bin_counts: Vec::new(),
            contiguous_bin_index_offset: Some(0),
        }),
        zero_count: 0.0,
    };

    let sketch = DDSketch::from_proto(&proto).unwrap();
    assert_eq!(sketch.mapping().index_offset(), 10.0);
    assert_eq!(sketch.count(), 2.0);

    // Key 10 covers (1/1.02, 1] once shifted by the offset.
    let lowest = sketch.get_value_at_quantile(0.0);
    assert!((lowest - 1.0).abs() <= 0.01, "got {}", lowest);
}

#[test]
fn rejects_malformed_messages() {
    let valid = sketch_of(RELATIVE_ACCURACY, &[-1.0, 0.0, 1.0]).to_proto();

    let mut cases = Vec::new();

    let mut proto = valid.clone();
    proto.mapping.as_mut().unwrap().gamma = None;
    cases.push(("missing gamma", proto));

    let mut proto = valid.clone();
    proto.mapping.as_mut().unwrap().index_offset = None;
    cases.push(("missing index offset", proto));

    let mut proto = valid.clone();
    proto.mapping.as_mut().unwrap().interpolation = Interpolation::Quadratic as i32;
    cases.push(("quadratic interpolation", proto));

    let mut proto = valid.clone();
    proto.mapping.as_mut().unwrap().interpolation = 42;
    cases.push(("unknown interpolation", proto));

    let mut proto = valid.clone();
    proto.positive_values.as_mut().unwrap().contiguous_bin_index_offset = None;
    cases.push(("missing contiguous offset", proto));

    let mut proto = valid.clone();
    proto.negative_values.as_mut().unwrap().contiguous_bin_counts[0] = -1.0;
    cases.push(("negative count", proto));

    let mut proto = valid.clone();
    proto.positive_values.as_mut().unwrap().bin_counts.insert(3, f64::NAN);
    cases.push(("non-finite sparse count", proto));

    let mut proto = valid.clone();
    proto.zero_count = f64::INFINITY;
    cases.push(("infinite zero count", proto));

    let mut proto = valid;
    proto.negative_values = None;
    cases.push(("missing negative store", proto));

    for (name, proto) in cases {
        let result = DDSketch::decode(&proto.encode_to_vec());
        assert!(
            matches!(result, Err(SketchError::MalformedMessage { .. })),
            "{}: expected malformed message error, got {:?}",
            name,
            result
        );
    }
}

#[test]
fn rejects_invalid_mapping_parameters() {
    let mut proto = sketch_of(RELATIVE_ACCURACY, &[1.0]).to_proto();
    proto.mapping.as_mut().unwrap().gamma = Some(0.5);

    assert!(matches!(
        DDSketch::from_proto(&proto),
        Err(SketchError::InvalidGamma { .. })
    ));
}

#[test]
fn rejects_truncated_bytes() {
    let bytes = sketch_of(RELATIVE_ACCURACY, &[1.0, 2.0, 3.0]).encode_to_vec();

    let result = DDSketch::decode(&bytes[..bytes.len() - 1]);
    assert!(matches!(result, Err(SketchError::InvalidEncoding { .. })), "got {:?}", result);
}
