#[cfg(test)]
mod tests {
    use crate::image_pipeline::acceleration::strategy::AccelerationStrategy;
    use crate::image_pipeline::common::error::DngError;
    use crate::image_pipeline::common::RunTimer;
    use crate::image_pipeline::preprocess::{PreProcessor, PreProcessorOperation, RawMapping, WhiteBalance};
    use crate::image_pipeline::reader::{tag, ByteOrder, CfaPattern, DngFile};
    use crate::image_pipeline::testing::{noise, FixtureBuilder, FixtureIfd, FixtureValue};
    use crate::image_pipeline::types::RawImageData;

    #[test]
    fn test_raw_mapping_normalizes_to_full_scale() {
        let mapping = RawMapping::new(255.0);
        assert_eq!(mapping.process(0, 0, 0), 0);
        assert_eq!(mapping.process(255, 3, 1), 65535);
        assert_eq!(mapping.process(128, 1, 1), 32896);
    }

    #[test]
    fn test_raw_mapping_saturates() {
        let mapping = RawMapping::new(1000.0).with_black_level(vec![100.0], (1, 1));
        assert_eq!(mapping.process(50, 0, 0), 0);
        assert_eq!(mapping.process(4000, 0, 0), 65535);

        let inverted = RawMapping::new(10.0).with_black_level(vec![20.0], (1, 1));
        assert_eq!(inverted.process(15, 0, 0), 0);
    }

    #[test]
    fn test_linearization_clamps_to_last_entry() {
        let mapping = RawMapping::new(20.0).with_linearization(vec![0, 10, 20]);
        assert_eq!(mapping.process(1, 0, 0), 32767);
        assert_eq!(mapping.process(2, 0, 0), 65535);
        assert_eq!(mapping.process(3, 0, 0), 65535);
        assert_eq!(mapping.process(9000, 0, 0), 65535);
    }

    #[test]
    fn test_black_level_pattern_and_deltas() {
        let mapping = RawMapping::new(1000.0)
            .with_black_level(vec![10.0, 20.0, 30.0, 40.0], (2, 2))
            .with_deltas(vec![1.0], vec![0.0, 5.0])
            .with_active_area([1, 1, 5, 5]);

        // outside the active area only the first level applies
        assert_eq!(mapping.black_level_at(0, 0), 10.0);
        assert_eq!(mapping.black_level_at(5, 2), 10.0);
        // pattern anchored at the active area origin
        assert_eq!(mapping.black_level_at(1, 1), 11.0);
        assert_eq!(mapping.black_level_at(2, 1), 20.0);
        assert_eq!(mapping.black_level_at(1, 2), 36.0);
        assert_eq!(mapping.black_level_at(2, 2), 45.0);
        assert_eq!(mapping.black_level_at(3, 3), 10.0);
    }

    fn container(ifd0: FixtureIfd) -> DngFile {
        DngFile::from_bytes(FixtureBuilder::new(ByteOrder::LittleEndian).ifd(ifd0).build()).unwrap()
    }

    #[test]
    fn test_raw_mapping_from_directory() {
        let raw = FixtureIfd::cfa_raw(4, 4, 12, CfaPattern::RGGB)
            .with(tag::BLACK_LEVEL, FixtureValue::Short(vec![64]))
            .with(tag::WHITE_LEVEL, FixtureValue::Short(vec![4095]))
            .with(tag::LINEARIZATION_TABLE, FixtureValue::Short((0..4096u32).map(|v| v as u16).collect()))
            .uncompressed_strips(&[0; 16], 4, 12, 4, ByteOrder::LittleEndian);
        let dng = container(raw);
        let mapping = RawMapping::from_directory(&dng.raw_directory().unwrap()).unwrap();
        assert_eq!(mapping.process(64, 0, 0), 0);
        assert_eq!(mapping.process(4095, 0, 0), 65535);
    }

    #[test]
    fn test_linear_dng_is_rejected() {
        let raw = FixtureIfd::cfa_raw(2, 2, 16, CfaPattern::RGGB)
            .with(tag::SAMPLES_PER_PIXEL, FixtureValue::Short(vec![3]));
        let dng = container(raw);
        assert!(matches!(
            RawMapping::from_directory(&dng.raw_directory().unwrap()),
            Err(DngError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_white_balance_factors() {
        let raw = FixtureIfd::cfa_raw(2, 2, 16, CfaPattern::RGGB)
            .with(tag::ANALOG_BALANCE, FixtureValue::Rational(vec![(1, 1), (1, 1), (1, 2)]))
            .with(tag::AS_SHOT_NEUTRAL, FixtureValue::Rational(vec![(1, 2), (1, 1), (1, 2)]));
        let dng = container(raw);
        let ifd0 = dng.zeroth().unwrap();
        let wb = WhiteBalance::from_directories(ifd0, &dng.raw_directory().unwrap()).unwrap();
        assert_eq!(wb.factors(), [2.0, 1.0, 4.0]);

        // RGGB: red at (0, 0), green at (1, 0), blue at (1, 1)
        assert_eq!(wb.process(1000, 0, 0), 2000);
        assert_eq!(wb.process(1000, 1, 0), 1000);
        assert_eq!(wb.process(1000, 1, 1), 4000);
        assert_eq!(wb.process(60000, 1, 1), 65535);
    }

    #[test]
    fn test_white_balance_without_neutral_is_identity() {
        let raw = FixtureIfd::cfa_raw(2, 2, 16, CfaPattern::GRBG);
        let dng = container(raw);
        let wb = WhiteBalance::from_directories(dng.zeroth().unwrap(), &dng.raw_directory().unwrap()).unwrap();
        assert_eq!(wb.factors(), [1.0, 1.0, 1.0]);
        assert_eq!(wb.process(1234, 1, 0), 1234);
    }

    #[test]
    fn test_white_balance_requires_cfa_pattern() {
        let raw = FixtureIfd::cfa_raw(2, 2, 16, CfaPattern::RGGB).without(tag::CFA_PATTERN);
        let dng = container(raw);
        assert!(matches!(
            WhiteBalance::from_directories(dng.zeroth().unwrap(), &dng.raw_directory().unwrap()),
            Err(DngError::MissingTag(tag::CFA_PATTERN))
        ));
    }

    fn preprocessor(strategy: AccelerationStrategy, chunk_edge: Option<usize>) -> PreProcessor {
        PreProcessor::new(strategy, chunk_edge)
            .with_operation(
                RawMapping::new(3000.0)
                    .with_black_level(vec![100.0, 120.0, 110.0, 90.0], (2, 2))
                    .with_active_area([2, 3, 37, 40]),
            )
            .with_operation(WhiteBalance::new(CfaPattern::rggb(), [1.9, 1.0, 1.4]))
    }

    #[test]
    fn test_preprocessor_strategies_agree() {
        let (width, height) = (41, 37);
        let input = RawImageData::new(width, height, noise(width * height, 12, 7), 12);

        let mut expected = input.clone();
        preprocessor(AccelerationStrategy::None, None).process(&mut expected, &mut RunTimer::new());

        for strategy in AccelerationStrategy::ALL {
            for chunk_edge in [None, Some(5), Some(64)] {
                let mut image = input.clone();
                preprocessor(strategy, chunk_edge).process(&mut image, &mut RunTimer::new());
                assert_eq!(image, expected, "{strategy} with chunk edge {chunk_edge:?}");
            }
        }
    }

    #[test]
    fn test_preprocessor_output_stays_in_range() {
        // gains above one push bright samples against the ceiling
        let mut image = RawImageData::new(16, 16, noise(256, 16, 3), 16);
        image.data[0] = 0;
        image.data[1] = u16::MAX;
        let pre = PreProcessor::new(AccelerationStrategy::Multithreading, None)
            .with_operation(RawMapping::new(40000.0).with_black_level(vec![2000.0], (1, 1)))
            .with_operation(WhiteBalance::new(CfaPattern::bggr(), [3.0, 1.0, 2.5]));
        let mut timer = RunTimer::new();
        pre.process(&mut image, &mut timer);
        assert!(image.data.iter().any(|&v| v == 65535));
        assert!(image.data.iter().any(|&v| v == 0));
        assert!(timer.get_task("Preprocessing").is_some());
        assert_eq!(pre.operation_names(), vec!["RawMapping", "WhiteBalance"]);
    }
}
