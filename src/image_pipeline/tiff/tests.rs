#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use ::tiff::decoder::{Decoder, DecodingResult};
    use ::tiff::encoder::{colortype, TiffEncoder};
    use ::tiff::ColorType;

    use crate::image_pipeline::common::error::DngError;
    use crate::image_pipeline::testing::noise;
    use crate::image_pipeline::tiff::{read_grey16, OutputConfig, StandardTiffWriter, TiffCompression, TiffWriter};
    use crate::image_pipeline::types::RgbImageData;

    fn decode(bytes: Vec<u8>) -> (u32, u32, ColorType, Vec<u16>) {
        let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
        let (width, height) = decoder.dimensions().unwrap();
        let color_type = decoder.colortype().unwrap();
        match decoder.read_image().unwrap() {
            DecodingResult::U16(data) => (width, height, color_type, data),
            _ => panic!("expected 16-bit samples"),
        }
    }

    #[test]
    fn test_config_builder() {
        let config = OutputConfig::builder().compression(TiffCompression::DeflateBest).predictor(Some(2)).build();
        assert_eq!(config.compression, TiffCompression::DeflateBest);
        assert_eq!(config.predictor, Some(2));
        assert_eq!(OutputConfig::default().compression, TiffCompression::None);
    }

    #[test]
    fn test_compression_names() {
        assert_eq!(TiffCompression::from_name("LZW"), Some(TiffCompression::Lzw));
        assert_eq!(TiffCompression::from_name("deflate"), Some(TiffCompression::DeflateBalanced));
        assert_eq!(TiffCompression::from_name("zstd"), None);
    }

    #[test]
    fn test_writes_rgb16() {
        let image = RgbImageData::from_data(7, 5, noise(7 * 5 * 3, 16, 11));
        for compression in [TiffCompression::None, TiffCompression::Lzw, TiffCompression::DeflateFast] {
            let config = OutputConfig::builder().compression(compression).build();
            let mut output = Vec::new();
            StandardTiffWriter.write_rgb_tiff(&image, &mut output, &config).unwrap();

            let (width, height, color_type, data) = decode(output);
            assert_eq!((width, height), (7, 5));
            assert_eq!(color_type, ColorType::RGB(16));
            assert_eq!(data, image.data, "{compression:?}");
        }
    }

    #[test]
    fn test_read_grey16() {
        let samples = noise(9 * 4, 16, 2);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        TiffEncoder::new(file.as_file_mut())
            .unwrap()
            .write_image::<colortype::Gray16>(9, 4, &samples)
            .unwrap();

        let raw = read_grey16(file.path()).unwrap();
        assert_eq!((raw.width, raw.height, raw.bits_per_sample), (9, 4, 16));
        assert_eq!(raw.data, samples);
    }

    #[test]
    fn test_read_grey16_rejects_rgb() {
        let image = RgbImageData::new(3, 3);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        StandardTiffWriter.write_rgb_tiff(&image, file.as_file_mut(), &OutputConfig::default()).unwrap();
        assert!(matches!(read_grey16(file.path()), Err(DngError::UnsupportedFormat(_))));
    }
}
