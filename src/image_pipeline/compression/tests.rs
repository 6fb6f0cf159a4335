#[cfg(test)]
mod tests {
    use crate::image_pipeline::common::error::{CompressionError, DngError};
    use crate::image_pipeline::compression::{
        decoder_for, CompressionDecoder, HuffmanTable, LosslessJpegDecoder, SampleGeometry,
        UncompressedDecoder,
    };
    use crate::image_pipeline::reader::bit_reader::BitReader;
    use crate::image_pipeline::reader::byte_reader::ByteOrder;
    use crate::image_pipeline::testing::{
        encode_lossless_jpeg, noise, FIXTURE_HUFFMAN_COUNTS, FIXTURE_HUFFMAN_VALUES,
    };

    fn geometry(width: usize, height: usize, bits: u16, order: ByteOrder) -> SampleGeometry {
        SampleGeometry {
            width,
            height,
            samples_per_pixel: 1,
            bits_per_sample: bits,
            byte_order: order,
        }
    }

    #[test]
    fn test_huffman_canonical_codes() {
        let table = HuffmanTable::new(&FIXTURE_HUFFMAN_COUNTS, &FIXTURE_HUFFMAN_VALUES).unwrap();
        let codes = table.codes();
        assert_eq!(codes[0], (0, 0b00, 2));
        assert_eq!(codes[1], (1, 0b01, 2));
        assert_eq!(codes[2], (2, 0b10, 2));
        assert_eq!(codes[3], (3, 0b110, 3));
        assert_eq!(codes[4], (4, 0b1110, 4));
        assert_eq!(codes[16], (16, 0b1111_1111_1111_1110, 16));
    }

    #[test]
    fn test_huffman_decode_symbols() {
        let table = HuffmanTable::new(&FIXTURE_HUFFMAN_COUNTS, &FIXTURE_HUFFMAN_VALUES).unwrap();
        // 01 | 110 | 00 | 1110 | 0 (pad) -> symbols 1, 3, 0, 4
        let data = [0b0111_0001, 0b1100_0000];
        let mut bits = BitReader::new(&data);
        let decoded: Vec<u8> = (0..4).map(|_| table.decode(&mut bits).unwrap()).collect();
        assert_eq!(decoded, vec![1, 3, 0, 4]);
    }

    #[test]
    fn test_huffman_rejects_count_mismatch() {
        let result = HuffmanTable::new(&FIXTURE_HUFFMAN_COUNTS, &[0, 1, 2]);
        assert!(matches!(result, Err(CompressionError::MalformedHuffmanTable(_))));
    }

    #[test]
    fn test_huffman_rejects_oversubscribed_lengths() {
        let mut counts = [0u8; 16];
        counts[0] = 3;
        let result = HuffmanTable::new(&counts, &[0, 1, 2]);
        assert!(matches!(result, Err(CompressionError::MalformedHuffmanTable(_))));
    }

    #[test]
    fn test_huffman_invalid_code() {
        let table = HuffmanTable::new(&FIXTURE_HUFFMAN_COUNTS, &FIXTURE_HUFFMAN_VALUES).unwrap();
        let data = [0xFF, 0xFF, 0xFF];
        let mut bits = BitReader::new(&data);
        let result = table.decode(&mut bits);
        assert!(matches!(
            result,
            Err(DngError::Compression(CompressionError::InvalidHuffmanCode))
        ));
    }

    #[test]
    fn test_ljpeg_single_component() {
        let samples = noise(16 * 8, 12, 7);
        let stream = encode_lossless_jpeg(&samples, 16, 8, 1, 12);
        let decoded = LosslessJpegDecoder
            .decode(&stream, &geometry(16, 8, 12, ByteOrder::BigEndian))
            .unwrap();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_ljpeg_two_components_sixteen_bit() {
        // DNG commonly stores two image columns per JPEG sample
        let samples = noise(12 * 6, 16, 11);
        let stream = encode_lossless_jpeg(&samples, 6, 6, 2, 16);
        let decoded = LosslessJpegDecoder
            .decode(&stream, &geometry(12, 6, 16, ByteOrder::LittleEndian))
            .unwrap();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_ljpeg_full_range_difference() {
        // 0 after the 2^15 prediction is a difference of -32768, category 16
        let samples = vec![0u16, 65535, 0, 32768];
        let stream = encode_lossless_jpeg(&samples, 4, 1, 1, 16);
        let decoded = LosslessJpegDecoder
            .decode(&stream, &geometry(4, 1, 16, ByteOrder::BigEndian))
            .unwrap();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_ljpeg_missing_start_of_image() {
        let samples = noise(8, 12, 1);
        let mut stream = encode_lossless_jpeg(&samples, 8, 1, 1, 12);
        stream[1] = 0xD9;
        let result = LosslessJpegDecoder.decode(&stream, &geometry(8, 1, 12, ByteOrder::BigEndian));
        assert!(matches!(
            result,
            Err(DngError::Compression(CompressionError::MissingStartOfImage))
        ));
    }

    #[test]
    fn test_ljpeg_unsupported_predictor() {
        let samples = noise(8, 12, 2);
        let mut stream = encode_lossless_jpeg(&samples, 8, 1, 1, 12);
        let sos = stream.windows(2).position(|w| w == [0xFF, 0xDA]).unwrap();
        // marker, length, Ns, one (Cs, Td/Ta) pair, then Ss
        stream[sos + 2 + 2 + 1 + 2] = 6;
        let result = LosslessJpegDecoder.decode(&stream, &geometry(8, 1, 12, ByteOrder::BigEndian));
        assert!(matches!(
            result,
            Err(DngError::Compression(CompressionError::UnsupportedPredictor(6)))
        ));
    }

    #[test]
    fn test_ljpeg_truncated_bitstream() {
        let samples = noise(32 * 32, 14, 3);
        let stream = encode_lossless_jpeg(&samples, 32, 32, 1, 14);
        let sos = stream.windows(2).position(|w| w == [0xFF, 0xDA]).unwrap();
        let truncated = &stream[..sos + 10 + 16];
        let result = LosslessJpegDecoder.decode(truncated, &geometry(32, 32, 14, ByteOrder::BigEndian));
        assert!(matches!(
            result,
            Err(DngError::Compression(CompressionError::BitstreamExhausted { expected: 1024, .. }))
        ));
    }

    #[test]
    fn test_ljpeg_rejects_unknown_scan_component() {
        let samples = noise(8, 12, 4);
        let mut stream = encode_lossless_jpeg(&samples, 8, 1, 1, 12);
        let sos = stream.windows(2).position(|w| w == [0xFF, 0xDA]).unwrap();
        // marker, length, Ns, then the component selector
        let selector = sos + 2 + 2 + 1;
        stream[selector] = stream[selector].wrapping_add(7);
        let result = LosslessJpegDecoder.decode(&stream, &geometry(8, 1, 12, ByteOrder::BigEndian));
        assert!(matches!(
            result,
            Err(DngError::Compression(CompressionError::UnknownScanComponent(_)))
        ));
    }

    #[test]
    fn test_ljpeg_rejects_mismatched_row_width() {
        // 8x4 frame decoded into a 16x2 tile holds enough samples but shears rows
        let samples = noise(8 * 4, 12, 9);
        let stream = encode_lossless_jpeg(&samples, 8, 4, 1, 12);
        let result = LosslessJpegDecoder.decode(&stream, &geometry(16, 2, 12, ByteOrder::BigEndian));
        assert!(matches!(
            result,
            Err(DngError::Compression(CompressionError::FrameGeometryMismatch { row_width: 8, expected: 16 }))
        ));

        // extra frame lines past the tile are dropped
        let decoded = LosslessJpegDecoder
            .decode(&stream, &geometry(8, 3, 12, ByteOrder::BigEndian))
            .unwrap();
        assert_eq!(decoded, samples[..24]);
    }

    #[test]
    fn test_ljpeg_scan_without_frame() {
        let stream = [0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x01, 0x00, 0x00];
        let result = LosslessJpegDecoder.decode(&stream, &geometry(1, 1, 12, ByteOrder::BigEndian));
        assert!(matches!(
            result,
            Err(DngError::Compression(CompressionError::MissingFrameHeader))
        ));
    }

    #[test]
    fn test_ljpeg_rejects_baseline_frame() {
        let stream = [0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0x01, 0x00, 0x01, 0x01, 0x01, 0x11, 0x00];
        let result = LosslessJpegDecoder.decode(&stream, &geometry(1, 1, 8, ByteOrder::BigEndian));
        assert!(matches!(
            result,
            Err(DngError::Compression(CompressionError::UnsupportedMarker(0xFFC0)))
        ));
    }

    #[test]
    fn test_ljpeg_deterministic_across_runs() {
        let samples = noise(64 * 16, 16, 5);
        let stream = encode_lossless_jpeg(&samples, 64, 16, 1, 16);
        let geometry = geometry(64, 16, 16, ByteOrder::BigEndian);
        let first = LosslessJpegDecoder.decode(&stream, &geometry).unwrap();
        for _ in 0..5 {
            assert_eq!(LosslessJpegDecoder.decode(&stream, &geometry).unwrap(), first);
        }
    }

    #[test]
    fn test_uncompressed_round_trip_sixteen_bit() {
        for order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
            let bytes: Vec<u8> = (0..6 * 4 * 2).map(|i| (i * 37 % 251) as u8).collect();
            let geometry = geometry(6, 4, 16, order);
            let samples = UncompressedDecoder.decode(&bytes, &geometry).unwrap();
            assert_eq!(samples.len(), 24);
            assert_eq!(UncompressedDecoder::encode(&samples, &geometry), bytes);
        }
    }

    #[test]
    fn test_uncompressed_round_trip_eight_bit() {
        let bytes: Vec<u8> = (0..=255u8).collect();
        let geometry = geometry(16, 16, 8, ByteOrder::LittleEndian);
        let samples = UncompressedDecoder.decode(&bytes, &geometry).unwrap();
        assert_eq!(samples[255], 255);
        assert_eq!(UncompressedDecoder::encode(&samples, &geometry), bytes);
    }

    #[test]
    fn test_uncompressed_round_trip_packed_ten_bit() {
        // 4 samples x 10 bits = 5 bytes per row, no padding bits
        let bytes: Vec<u8> = (0..5 * 3).map(|i| (i * 91 % 256) as u8).collect();
        let geometry = geometry(4, 3, 10, ByteOrder::BigEndian);
        let samples = UncompressedDecoder.decode(&bytes, &geometry).unwrap();
        assert!(samples.iter().all(|&s| s < 1024));
        assert_eq!(UncompressedDecoder::encode(&samples, &geometry), bytes);
    }

    #[test]
    fn test_uncompressed_packed_rows_are_byte_aligned() {
        // 3 samples x 12 bits = 36 bits, so each row occupies 5 bytes
        let samples = vec![0xABC, 0x123, 0xFFF, 0x001, 0x800, 0x7FF];
        let geometry = geometry(3, 2, 12, ByteOrder::BigEndian);
        let bytes = UncompressedDecoder::encode(&samples, &geometry);
        assert_eq!(bytes.len(), 10);
        assert_eq!(&bytes[..5], &[0xAB, 0xC1, 0x23, 0xFF, 0xF0]);
        assert_eq!(UncompressedDecoder.decode(&bytes, &geometry).unwrap(), samples);
    }

    #[test]
    fn test_uncompressed_short_input() {
        let result = UncompressedDecoder.decode(&[0u8; 5], &geometry(4, 1, 16, ByteOrder::LittleEndian));
        assert!(matches!(result, Err(DngError::EndOfData { .. })));
    }

    #[test]
    fn test_decoder_for_unknown_compression() {
        assert!(decoder_for(1).is_ok());
        assert!(decoder_for(7).is_ok());
        assert!(matches!(decoder_for(34713), Err(DngError::UnsupportedFormat(_))));
    }
}
