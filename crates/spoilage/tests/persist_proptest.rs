//! Property-based tests for preprocessing state and artifact framing.

use proptest::collection::vec as prop_vec;
use proptest::prelude::*;

use spoilage::dataset::{FeatureTable, FeatureVector, N_FEATURES};
use spoilage::persist::format::{HEADER_SIZE, frame, unframe};
use spoilage::persist::{ArtifactKind, FormatError};
use spoilage::{LabelCodec, StandardScaler};

// =============================================================================
// Strategies
// =============================================================================

fn arb_label() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z ]{0,15}"
}

fn arb_vector() -> impl Strategy<Value = FeatureVector> {
    prop::array::uniform5(-1e4..1e4f64).prop_map(FeatureVector::from_array)
}

fn arb_kind() -> impl Strategy<Value = ArtifactKind> {
    prop_oneof![
        Just(ArtifactKind::Classifier),
        Just(ArtifactKind::Scaler),
        Just(ArtifactKind::LabelCodec),
    ]
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn codec_decode_inverts_encode(labels in prop_vec(arb_label(), 1..50)) {
        let codec = LabelCodec::fit(&labels).unwrap();
        for label in &labels {
            let id = codec.encode(label).unwrap();
            prop_assert_eq!(codec.decode(id).unwrap(), label.as_str());
        }
        prop_assert!(codec.classes().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn codec_survives_postcard(labels in prop_vec(arb_label(), 1..20)) {
        let codec = LabelCodec::fit(&labels).unwrap();
        let bytes = postcard::to_allocvec(&codec).unwrap();
        let decoded: LabelCodec = postcard::from_bytes(&bytes).unwrap();
        prop_assert_eq!(decoded, codec);
    }

    #[test]
    fn scaler_keeps_table_shape(rows in prop_vec(arb_vector(), 1..60)) {
        let table = FeatureTable::from_rows(&rows);
        let state = StandardScaler::fit(&table).unwrap();
        let scaled = state.transform_table(&table).unwrap();
        prop_assert_eq!(scaled.n_rows(), rows.len());
        prop_assert_eq!(scaled.n_features(), N_FEATURES);
        prop_assert_eq!(scaled.columns(), table.columns());
        prop_assert!(scaled.values().iter().all(|x| x.is_finite()));
    }

    #[test]
    fn scaler_maps_mean_to_zero(rows in prop_vec(arb_vector(), 1..60)) {
        let state = StandardScaler::fit(&FeatureTable::from_rows(&rows)).unwrap();
        let mut mean = [0.0; N_FEATURES];
        mean.copy_from_slice(state.means());
        let scaled = state.transform_vector(&FeatureVector::from_array(mean));
        prop_assert!(scaled.iter().all(|x| x.abs() < 1e-9), "{:?}", scaled);
    }

    #[test]
    fn any_flipped_bit_is_detected(
        kind in arb_kind(),
        run_id in any::<u64>(),
        payload in prop_vec(any::<u8>(), 1..256),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let mut framed = frame(kind, run_id, &payload);
        let at = HEADER_SIZE + position.index(payload.len());
        framed[at] ^= 1 << bit;
        let result = unframe(&framed, kind);
        prop_assert!(
            matches!(result, Err(FormatError::ChecksumMismatch { .. })),
            "flip at {} not detected", at
        );
    }

    #[test]
    fn frame_carries_run_id(kind in arb_kind(), run_id in any::<u64>(), payload in prop_vec(any::<u8>(), 0..64)) {
        let framed = frame(kind, run_id, &payload);
        let (header, body) = unframe(&framed, kind).unwrap();
        prop_assert_eq!(header.run_id, run_id);
        prop_assert_eq!(body, payload.as_slice());
    }
}
