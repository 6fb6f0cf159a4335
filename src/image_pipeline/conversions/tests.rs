#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::image_pipeline::acceleration::strategy::AccelerationStrategy;
    use crate::image_pipeline::common::error::DngError;
    use crate::image_pipeline::common::RunTimer;
    use crate::image_pipeline::conversions::{
        available_substeps, demosaic_only, margin_for, DngProcessor, PipelineConfiguration, ProcessorOptions,
    };
    use crate::image_pipeline::demosaic::{Demosaicer, InterpolationMethod, SubStep};
    use crate::image_pipeline::preprocess::{PreProcessor, RawMapping};
    use crate::image_pipeline::reader::{tag, ByteOrder, CfaPattern, DngFile};
    use crate::image_pipeline::testing::{gradient, rationals, srationals, with_profile, FixtureBuilder, FixtureIfd, FixtureValue};
    use crate::image_pipeline::types::{RawImageData, RgbImageData};

    const WIDTH: usize = 40;
    const HEIGHT: usize = 30;

    /// Bright gradient, so that the sRGB curve stays shallow.
    fn samples() -> Vec<u16> {
        gradient(WIDTH, HEIGHT).iter().map(|&v| 6000 + (v as u32 * 3 / 4) as u16).collect()
    }

    fn raw_ifd(samples: &[u16]) -> FixtureIfd {
        FixtureIfd::cfa_raw(WIDTH as u32, HEIGHT as u32, 16, CfaPattern::RGGB).uncompressed_strips(
            samples,
            WIDTH,
            16,
            8,
            ByteOrder::LittleEndian,
        )
    }

    fn container(ifd: FixtureIfd) -> DngFile {
        DngFile::from_bytes(FixtureBuilder::new(ByteOrder::LittleEndian).ifd(ifd).build()).unwrap()
    }

    fn profiled() -> DngFile {
        container(with_profile(raw_ifd(&samples())).with(tag::BASELINE_EXPOSURE, srationals(&[0.25])))
    }

    fn odd_crop() -> DngFile {
        container(
            with_profile(raw_ifd(&samples()))
                .with(tag::DEFAULT_CROP_ORIGIN, rationals(&[1.0, 2.0]))
                .with(tag::DEFAULT_CROP_SIZE, rationals(&[27.0, 20.0])),
        )
    }

    fn processor(method: InterpolationMethod, strategy: AccelerationStrategy, options: ProcessorOptions) -> DngProcessor {
        DngProcessor::new(options, PipelineConfiguration::new(method, strategy, None)).unwrap()
    }

    fn run(file: &DngFile, method: InterpolationMethod, strategy: AccelerationStrategy) -> RgbImageData {
        processor(method, strategy, ProcessorOptions::default()).process(file).unwrap()
    }

    #[test]
    fn test_available_substeps_and_margins() {
        for strategy in AccelerationStrategy::ALL {
            assert_eq!(available_substeps(InterpolationMethod::Rcd, strategy), &SubStep::ALL);
            assert!(available_substeps(InterpolationMethod::Ppg, strategy).is_empty());
        }
        assert_eq!(margin_for(InterpolationMethod::Rcd), 10);
        assert_eq!(DngProcessor::margin_for(InterpolationMethod::BilinearMean), 1);
    }

    #[test]
    fn test_invalid_sub_step_falls_back_to_none() {
        let mut processor = processor(InterpolationMethod::Rcd, AccelerationStrategy::None, ProcessorOptions::default());
        processor.configure(InterpolationMethod::Rcd, AccelerationStrategy::None, Some(SubStep::Greens)).unwrap();
        assert_eq!(processor.configuration().sub_step, Some(SubStep::Greens));

        processor.configure(InterpolationMethod::Ppg, AccelerationStrategy::None, Some(SubStep::Greens)).unwrap();
        assert_eq!(processor.configuration().sub_step, None);
        assert_eq!(processor.configuration().interpolation_method, InterpolationMethod::Ppg);
    }

    #[test]
    fn test_configure_validates_tile_size() {
        let options = ProcessorOptions::builder().tile_size(Some(24)).build();
        let mut processor = processor(InterpolationMethod::BilinearMean, AccelerationStrategy::CpuTiling, options);
        let configuration = *processor.configuration();

        let result = processor.configure(InterpolationMethod::Rcd, AccelerationStrategy::CpuTiling, None);
        assert!(matches!(result, Err(DngError::Configuration { .. })));
        // a failed rebuild keeps the previous configuration
        assert_eq!(*processor.configuration(), configuration);

        processor.configure(InterpolationMethod::BilinearMean, AccelerationStrategy::CpuTiling, None).unwrap();
        assert_eq!(*processor.configuration(), configuration);
    }

    #[test]
    fn test_options_builder() {
        let options = ProcessorOptions::builder().white_balance(false).max_texture_size(512).build();
        assert!(!options.white_balance);
        assert!(options.apply_opcodes);
        assert_eq!(options.max_texture_size, 512);
        assert_eq!(options.tile_size, None);
        assert!(ProcessorOptions::default().white_balance);
    }

    #[test]
    fn test_nearest_neighbor_scenario() {
        // 4x4 RGGB, black 0, white 255, no linearisation, no white balance
        let values: Vec<u16> = (0..16).map(|i| i * 10).collect();
        let ifd = FixtureIfd::cfa_raw(4, 4, 8, CfaPattern::RGGB).uncompressed_strips(&values, 4, 8, 4, ByteOrder::LittleEndian);
        let file = container(ifd);
        let raw_ifd = file.raw_directory().unwrap();
        let mut raw = file.raw_image(false).unwrap();

        let mut timer = RunTimer::new();
        PreProcessor::new(AccelerationStrategy::None, None)
            .with_operation(RawMapping::from_directory(&raw_ifd).unwrap())
            .process(&mut raw, &mut timer);
        let rgb = Demosaicer::new(InterpolationMethod::NearestNeighbor, AccelerationStrategy::None, None)
            .unwrap()
            .process(&raw, &raw_ifd.cfa_pattern().unwrap().unwrap(), &mut timer)
            .unwrap();

        let v = |x: usize, y: usize| values[y * 4 + x] * 257;
        assert_eq!((rgb.width, rgb.height, rgb.data.len()), (4, 4, 48));
        // red site: green from the right, blue from the lower right
        assert_eq!(rgb.pixel(0, 0), [v(0, 0), v(1, 0), v(1, 1)]);
        // green in a red row: red from the right, blue from below
        assert_eq!(rgb.pixel(1, 0), [v(2, 0), v(1, 0), v(1, 1)]);
        // green in a blue row: red from below, blue from the right
        assert_eq!(rgb.pixel(0, 1), [v(0, 2), v(0, 1), v(1, 1)]);
        // blue corner: neighbours to the left and above
        assert_eq!(rgb.pixel(3, 3), [v(2, 2), v(2, 3), v(3, 3)]);
    }

    #[test]
    fn test_cpu_strategies_agree() {
        let file = profiled();
        for method in [InterpolationMethod::Rcd, InterpolationMethod::MalvarHeCutler] {
            let expected = run(&file, method, AccelerationStrategy::None);
            assert_eq!((expected.width, expected.height), (WIDTH, HEIGHT));
            for strategy in [
                AccelerationStrategy::Multithreading,
                AccelerationStrategy::CpuTiling,
                AccelerationStrategy::CpuTilingMt,
                AccelerationStrategy::CpuMtTilingMt,
                AccelerationStrategy::AutoSmall,
            ] {
                assert_eq!(run(&file, method, strategy), expected, "{method} with {strategy}");
            }
        }
    }

    #[test]
    fn test_gpu_strategies_match_cpu() {
        let file = profiled();
        let expected = run(&file, InterpolationMethod::BilinearMean, AccelerationStrategy::None);

        let whole = run(&file, InterpolationMethod::BilinearMean, AccelerationStrategy::GpuOperationWise);
        assert!(whole.mean_abs_diff(&expected) < 2.0, "operation wise: {}", whole.mean_abs_diff(&expected));

        let options = ProcessorOptions::builder().max_texture_size(16).build();
        let tiled = processor(InterpolationMethod::BilinearMean, AccelerationStrategy::GpuTileWise, options)
            .process(&file)
            .unwrap();
        assert_eq!(tiled, whole);
    }

    #[test]
    fn test_gpu_rejects_cpu_only_stages() {
        let curve = FixtureValue::Float(vec![0.0, 0.0, 0.5, 0.6, 1.0, 1.0]);
        let file = container(with_profile(raw_ifd(&samples())).with(tag::PROFILE_TONE_CURVE, curve));

        // methods without a device kernel still post-process on the device
        for method in [InterpolationMethod::Rcd, InterpolationMethod::Ppg, InterpolationMethod::MalvarHeCutler] {
            for strategy in [AccelerationStrategy::GpuOperationWise, AccelerationStrategy::GpuTileWise] {
                let mut gpu = processor(method, strategy, ProcessorOptions::default());
                let result = gpu.process(&file);
                assert!(matches!(result, Err(DngError::Configuration { .. })), "{method} with {strategy}");
                assert!(gpu.timer().get_task("Decoding").is_none());
            }
        }

        // the curve is fine on the CPU
        let image = run(&file, InterpolationMethod::Ppg, AccelerationStrategy::CpuTilingMt);
        assert_eq!((image.width, image.height), (WIDTH, HEIGHT));
    }

    #[test]
    fn test_cpu_demosaic_with_gpu_postprocessing() {
        let file = profiled();
        let expected = run(&file, InterpolationMethod::Ppg, AccelerationStrategy::None);
        for strategy in [AccelerationStrategy::GpuOperationWise, AccelerationStrategy::GpuTileWise] {
            let options = ProcessorOptions::builder().max_texture_size(16).build();
            let mut gpu = processor(InterpolationMethod::Ppg, strategy, options);
            if strategy == AccelerationStrategy::GpuOperationWise {
                assert!(matches!(gpu.process(&file), Err(DngError::Device(_))));
                continue;
            }
            let image = gpu.process(&file).unwrap();
            assert!(image.mean_abs_diff(&expected) < 2.0, "{strategy}: {}", image.mean_abs_diff(&expected));
            assert!(gpu.timer().get_task("Demosaicing").is_some());
            assert!(gpu.timer().get_task("Postprocessing").is_none());
            assert!(gpu.timer().get_task("GPU tile processing").is_some());
        }

        let mut whole = processor(InterpolationMethod::Ppg, AccelerationStrategy::GpuOperationWise, ProcessorOptions::default());
        let image = whole.process(&file).unwrap();
        assert!(image.mean_abs_diff(&expected) < 2.0);
        for task in ["ColorMatrix", "Exposure", "XYZD50ToSRGB"] {
            assert!(whole.timer().get_task(task).is_some(), "{task}");
        }
    }

    #[test]
    fn test_failed_run_is_closed() {
        let mut processor = processor(InterpolationMethod::BilinearMean, AccelerationStrategy::None, ProcessorOptions::default());
        assert!(processor.process(&container(raw_ifd(&samples()))).is_err());
        assert!(!processor.timer().is_running());

        processor.process(&profiled()).unwrap();
        assert!(!processor.timer().is_running());
        assert!(processor.timer().get_task("Postprocessing").is_some());
    }

    #[test]
    fn test_operation_wise_too_large_for_device() {
        let options = ProcessorOptions::builder().max_texture_size(32).build();
        let mut gpu = processor(InterpolationMethod::BilinearMean, AccelerationStrategy::GpuOperationWise, options);
        assert!(matches!(gpu.process(&profiled()), Err(DngError::Device(_))));
    }

    #[test]
    fn test_odd_crop_is_deferred_after_gpu() {
        let file = odd_crop();
        let expected = run(&file, InterpolationMethod::BilinearMean, AccelerationStrategy::None);
        assert_eq!((expected.width, expected.height), (27, 20));

        let mut gpu = processor(InterpolationMethod::BilinearMean, AccelerationStrategy::GpuTileWise, ProcessorOptions::default());
        let image = gpu.process(&file).unwrap();
        assert_eq!((image.width, image.height), (27, 20));
        assert!(image.mean_abs_diff(&expected) < 2.0);
        let crop = gpu.timer().tasks().iter().find(|t| t.name == "ImageCroppingProcessor").unwrap();
        assert_eq!(crop.detail, "after GPU");

        // same deferral when the method falls back to the CPU
        let mut fallback = processor(InterpolationMethod::Ppg, AccelerationStrategy::GpuOperationWise, ProcessorOptions::default());
        let image = fallback.process(&file).unwrap();
        assert!(image.mean_abs_diff(&run(&file, InterpolationMethod::Ppg, AccelerationStrategy::None)) < 2.0);
        let crop = fallback.timer().tasks().iter().find(|t| t.name == "ImageCroppingProcessor").unwrap();
        assert_eq!(crop.detail, "after GPU");
    }

    #[test]
    fn test_even_crop_runs_before_postprocessing() {
        let file = container(
            with_profile(raw_ifd(&samples()))
                .with(tag::DEFAULT_CROP_ORIGIN, rationals(&[2.0, 2.0]))
                .with(tag::DEFAULT_CROP_SIZE, rationals(&[20.0, 10.0])),
        );
        let mut cpu = processor(InterpolationMethod::HamiltonAdams, AccelerationStrategy::CpuTilingMt, ProcessorOptions::default());
        let image = cpu.process(&file).unwrap();
        assert_eq!((image.width, image.height), (20, 10));
        let names: Vec<&str> = cpu.timer().tasks().iter().map(|t| t.name.as_str()).collect();
        let crop = names.iter().position(|&n| n == "ImageCroppingProcessor").unwrap();
        let post = names.iter().position(|&n| n == "Postprocessing").unwrap();
        assert!(crop < post);
    }

    #[test]
    fn test_sub_step_disables_postprocessing() {
        // no camera profile: post-processing would need one
        let file = container(raw_ifd(&samples()));
        let mut processor = processor(InterpolationMethod::Rcd, AccelerationStrategy::None, ProcessorOptions::default());
        processor.configure(InterpolationMethod::Rcd, AccelerationStrategy::None, Some(SubStep::Greens)).unwrap();
        let image = processor.process(&file).unwrap();
        assert!(image.data.chunks_exact(3).all(|px| px[0] == px[1] && px[1] == px[2]));
        assert!(processor.timer().get_task("Postprocessing").is_none());

        processor.configure(InterpolationMethod::Rcd, AccelerationStrategy::GpuOperationWise, Some(SubStep::Greens)).unwrap();
        let image = processor.process(&file).unwrap();
        assert!(image.data.chunks_exact(3).all(|px| px[0] == px[1] && px[1] == px[2]));
    }

    #[test]
    fn test_missing_profile_is_reported() {
        let file = container(raw_ifd(&samples()));
        let mut processor = processor(InterpolationMethod::BilinearMean, AccelerationStrategy::None, ProcessorOptions::default());
        assert!(matches!(processor.process(&file), Err(DngError::MissingTag(tag::COLOR_MATRIX_1))));
    }

    #[test]
    fn test_white_balance_toggle() {
        let file = profiled();
        let balanced = run(&file, InterpolationMethod::BilinearMean, AccelerationStrategy::None);
        let options = ProcessorOptions::builder().white_balance(false).build();
        let unbalanced = processor(InterpolationMethod::BilinearMean, AccelerationStrategy::None, options)
            .process(&file)
            .unwrap();
        assert_ne!(balanced, unbalanced);
    }

    #[test]
    fn test_process_records_stage_timings() {
        let mut processor = processor(InterpolationMethod::BilinearMean, AccelerationStrategy::None, ProcessorOptions::default());
        processor.process(&profiled()).unwrap();
        for task in ["Decoding", "Preprocessing", "Demosaicing", "ImageCroppingProcessor", "Postprocessing"] {
            assert!(processor.timer().get_task(task).is_some(), "{task}");
        }
    }

    #[test]
    fn test_open_from_path() {
        let bytes = FixtureBuilder::new(ByteOrder::BigEndian).ifd(with_profile(raw_ifd(&samples()))).build();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();

        let dng = DngProcessor::open(file.path()).unwrap();
        let image = processor(InterpolationMethod::BilinearMean, AccelerationStrategy::None, ProcessorOptions::default())
            .process(&dng)
            .unwrap();
        assert_eq!((image.width, image.height), (WIDTH, HEIGHT));

        assert!(matches!(DngProcessor::open(file.path().with_extension("missing")), Err(DngError::Io(_))));
    }

    #[test]
    fn test_demosaic_only() {
        let raw = RawImageData::new(WIDTH, HEIGHT, samples(), 16);
        let pattern = CfaPattern::bggr();
        let mut timer = RunTimer::new();
        let cpu = demosaic_only(&raw, &pattern, InterpolationMethod::BilinearMean, AccelerationStrategy::None, &mut timer).unwrap();
        let gpu = demosaic_only(&raw, &pattern, InterpolationMethod::BilinearMean, AccelerationStrategy::GpuTileWise, &mut timer).unwrap();
        assert!(gpu.mean_abs_diff(&cpu) < 1.0);
        let ppg = demosaic_only(&raw, &pattern, InterpolationMethod::Ppg, AccelerationStrategy::GpuTileWise, &mut timer).unwrap();
        assert_eq!((ppg.width, ppg.height), (WIDTH, HEIGHT));
    }
}
