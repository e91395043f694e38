mod common;

use common::{continuous_grid, pixel, Fixture};
use flate2::read::GzDecoder;
use imzml_raster::imzml::{ImzMLError, ImzMLReader, StorageMode};
use imzml_raster::pipeline::{ConversionConfig, ConversionError, Converter};
use imzml_raster::source::{GridShape, ImagingSource, SpectrumType};
use std::io::Read;
use std::path::Path;
use tempfile::tempdir;

fn npy_f32(path: &Path) -> (String, Vec<f32>) {
    let bytes = std::fs::read(path).unwrap();
    assert_eq!(&bytes[..6], b"\x93NUMPY");
    let len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let header = String::from_utf8(bytes[10..10 + len].to_vec()).unwrap();
    let values = bytes[10 + len..]
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    (header, values)
}

fn nrrd_parts(path: &Path) -> (String, Vec<f32>) {
    let bytes = std::fs::read(path).unwrap();
    let end = bytes.windows(2).position(|w| w == b"\n\n").unwrap();
    let header = String::from_utf8(bytes[..end].to_vec()).unwrap();

    let mut raw = Vec::new();
    GzDecoder::new(&bytes[end + 2..]).read_to_end(&mut raw).unwrap();
    let values = raw
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    (header, values)
}

#[test]
fn test_continuous_centroid_end_to_end() {
    let dir = tempdir().unwrap();
    let input = continuous_grid().write(dir.path(), "sample");
    let out = dir.path().join("out");

    let config = ConversionConfig {
        output_dir: Some(out.clone()),
        save_nrrd: true,
        save_npy_spatial: true,
        save_npy_list: true,
        ..Default::default()
    };
    let report = Converter::with_config(config).convert(&input).unwrap();

    assert_eq!(report.source_file, "sample.imzML");
    assert_eq!(report.spectrum_type, SpectrumType::Centroid);
    assert_eq!(report.mz_values, vec![100.0, 200.0, 300.0]);
    assert_eq!((report.image_width, report.image_height), (3, 2));

    let (header, values) = nrrd_parts(&out.join("sample_mz_200.0000.nrrd"));
    assert!(header.contains("sizes: 3 2"));
    assert!(header.contains("encoding: gzip"));
    assert!(header.contains("space directions: (0.01,0) (0,0.01)"));
    assert!(header.contains("mz_value:=200.0"));
    assert!(header.contains("tolerance_ppm:=75.0"));
    assert!(header.contains("source_file:=sample.imzML"));
    assert_eq!(values, vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);

    let (header, spatial) = npy_f32(&out.join("sample_data_spatial.npy"));
    assert!(header.contains("'descr': '<f4'"));
    assert!(header.contains("'shape': (2, 3, 3)"));
    let (header, list) = npy_f32(&out.join("sample_data_list.npy"));
    assert!(header.contains("'shape': (6, 3)"));
    assert_eq!(spatial, list);
    assert_eq!(&list[3 * 4..3 * 5], &[4.0, 14.0, 104.0]);

    assert!(out.join("sample_data_metadata.npz").is_file());
    assert!(!out.join("sample_data_summary.json").exists());
}

#[test]
fn test_reader_continuous_metadata() {
    let dir = tempdir().unwrap();
    let input = continuous_grid().write(dir.path(), "meta");

    let mut reader = ImzMLReader::open(&input).unwrap();
    assert_eq!(reader.storage_mode(), StorageMode::Continuous);
    assert_eq!(reader.dimensions(), GridShape::new(2, 3));
    assert_eq!(reader.pixel_count(), 6);
    assert_eq!(reader.pixel_spacing(), Some((10.0, 10.0)));
    assert_eq!(reader.centroids().unwrap(), vec![100.0, 200.0, 300.0]);

    let spectrum = reader.read_spectrum(5).unwrap();
    assert_eq!(spectrum.mz, vec![100.0, 200.0, 300.0]);
    assert_eq!(spectrum.intensity, vec![5.0, 15.0, 105.0]);
}

#[test]
fn test_processed_explicit_targets_with_gaps() {
    let dir = tempdir().unwrap();
    // 2x2 grid, pixel (2, 2) never acquired
    let mut fixture = Fixture::new(
        false,
        vec![
            pixel(1, 1, &[500.0, 500.02, 600.0], &[1.0, 2.0, 4.0]),
            pixel(2, 1, &[499.99, 700.0], &[8.0, 16.0]),
            pixel(1, 2, &[600.01], &[32.0]),
        ],
    );
    fixture.max_count = Some((2, 2));
    let input = fixture.write(dir.path(), "proc");

    let config = ConversionConfig {
        centroids: Some(vec![500.0, 600.0]),
        tolerance_ppm: 50.0,
        save_npy_list: true,
        ..Default::default()
    };
    let report = Converter::with_config(config).convert(&input).unwrap();
    assert_eq!(report.pixels_read, 3);

    let (header, list) = npy_f32(&dir.path().join("proc_data_list.npy"));
    assert!(header.contains("'shape': (4, 2)"));
    // 50 ppm at 500 is +-0.025; at 600 it is +-0.03
    assert_eq!(list, vec![3.0, 4.0, 8.0, 0.0, 0.0, 32.0, 0.0, 0.0]);
}

#[test]
fn test_processed_centroid_union_is_sorted_and_distinct() {
    let dir = tempdir().unwrap();
    let input = Fixture::new(
        false,
        vec![
            pixel(1, 1, &[300.0, 100.0], &[1.0, 1.0]),
            pixel(2, 1, &[200.0, 100.0, 400.0], &[1.0, 1.0, 1.0]),
        ],
    )
    .write(dir.path(), "union");

    let mut reader = ImzMLReader::open(&input).unwrap();
    assert_eq!(reader.storage_mode(), StorageMode::Processed);
    assert_eq!(reader.centroids().unwrap(), vec![100.0, 200.0, 300.0, 400.0]);
}

#[test]
fn test_zlib_compressed_intensities_are_rejected() {
    let dir = tempdir().unwrap();
    let mut fixture = Fixture::new(
        false,
        vec![pixel(1, 1, &[150.0, 250.0, 350.0], &[1.5, 2.5, 3.5])],
    );
    fixture.zlib_intensity = true;
    let input = fixture.write(dir.path(), "zlib");

    // Compressed external arrays are not decoded; the failure is reported
    // when the spectrum is read, not silently zeroed
    let mut reader = ImzMLReader::open(&input).unwrap();
    assert_eq!(reader.pixel_count(), 1);
    assert!(matches!(
        reader.read_spectrum(0),
        Err(ImzMLError::Parser(_))
    ));
}

#[test]
fn test_duplicate_position_later_spectrum_wins() {
    let dir = tempdir().unwrap();
    let input = Fixture::new(
        false,
        vec![
            pixel(1, 1, &[500.0], &[1.0]),
            pixel(2, 1, &[500.0], &[2.0]),
            pixel(1, 1, &[500.0], &[7.0]),
        ],
    )
    .write(dir.path(), "dup");

    let config = ConversionConfig {
        centroids: Some(vec![500.0]),
        save_npy_spatial: true,
        ..Default::default()
    };
    let report = Converter::with_config(config).convert(&input).unwrap();
    assert_eq!(report.pixels_read, 2);

    let (_, spatial) = npy_f32(&dir.path().join("dup_data_spatial.npy"));
    assert_eq!(spatial, vec![7.0, 2.0]);
}

#[test]
fn test_uuid_mismatch_is_rejected() {
    let dir = tempdir().unwrap();
    let mut fixture = continuous_grid();
    fixture.declared_uuid = Some("{00000000-0000-0000-0000-000000000001}".to_string());
    let input = fixture.write(dir.path(), "mismatch");

    let err = Converter::new().convert(&input).unwrap_err();
    assert!(matches!(
        err,
        ConversionError::Source(ImzMLError::UuidMismatch { .. })
    ));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_missing_uuid_is_accepted() {
    let dir = tempdir().unwrap();
    let mut fixture = continuous_grid();
    fixture.declared_uuid = None;
    let input = fixture.write(dir.path(), "nouuid");

    assert!(ImzMLReader::open(&input).is_ok());
}

#[test]
fn test_missing_ibd_is_file_not_found() {
    let dir = tempdir().unwrap();
    let input = continuous_grid().write(dir.path(), "orphan");
    std::fs::remove_file(dir.path().join("orphan.ibd")).unwrap();

    let err = Converter::new().convert(&input).unwrap_err();
    match &err {
        ConversionError::FileNotFound(path) => {
            assert_eq!(path.extension().and_then(|e| e.to_str()), Some("ibd"))
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn test_profile_file_needs_explicit_targets() {
    let dir = tempdir().unwrap();
    let mut fixture = continuous_grid();
    fixture.centroid = false;
    let input = fixture.write(dir.path(), "profile");
    let out = dir.path().join("out");

    let config = ConversionConfig {
        output_dir: Some(out.clone()),
        save_nrrd: true,
        ..Default::default()
    };
    let err = Converter::with_config(config.clone())
        .convert(&input)
        .unwrap_err();
    assert!(matches!(err, ConversionError::UnsupportedFormat(_)));
    assert_eq!(err.exit_code(), 4);
    assert!(!out.exists());

    let config = ConversionConfig {
        centroids: Some(vec![300.0]),
        ..config
    };
    let report = Converter::with_config(config).convert(&input).unwrap();
    assert_eq!(report.spectrum_type, SpectrumType::Profile);
    assert!(out.join("profile_mz_300.0000.nrrd").is_file());
}

#[test]
fn test_declared_grid_is_widened_to_positions() {
    let dir = tempdir().unwrap();
    let mut fixture = Fixture::new(false, vec![pixel(4, 3, &[500.0], &[9.0])]);
    fixture.max_count = Some((2, 2));
    let input = fixture.write(dir.path(), "wide");

    let reader = ImzMLReader::open(&input).unwrap();
    assert_eq!(reader.dimensions(), GridShape::new(3, 4));
}

#[test]
fn test_latin1_document_with_micro_sign_opens() {
    let dir = tempdir().unwrap();
    let mut fixture = continuous_grid();
    // Written as the single byte 0xB5
    fixture.intensity_name = "intensity array (\u{b5}V)".to_string();
    let input = fixture.write(dir.path(), "latin1");
    let raw = std::fs::read(&input).unwrap();
    assert!(raw.contains(&0xB5));
    assert!(std::str::from_utf8(&raw).is_err());

    let mut reader = ImzMLReader::open(&input).unwrap();
    assert_eq!(reader.storage_mode(), StorageMode::Continuous);
    assert_eq!(reader.pixel_count(), 6);
    let spectrum = reader.read_spectrum(2).unwrap();
    assert_eq!(spectrum.mz, vec![100.0, 200.0, 300.0]);
    assert_eq!(spectrum.intensity, vec![2.0, 12.0, 102.0]);
}

#[test]
fn test_z_slices_collapse_onto_one_raster() {
    let dir = tempdir().unwrap();
    let mut lower = pixel(1, 1, &[500.0], &[1.0]);
    lower.z = Some(1);
    let mut upper = pixel(1, 1, &[500.0], &[9.0]);
    upper.z = Some(2);
    let mut beside = pixel(2, 1, &[500.0], &[4.0]);
    beside.z = Some(1);
    let input = Fixture::new(false, vec![lower, beside, upper]).write(dir.path(), "stack");

    let mut reader = ImzMLReader::open(&input).unwrap();
    assert_eq!(reader.pixel_count(), 2);
    assert_eq!(reader.dimensions(), GridShape::new(1, 2));
    assert_eq!(reader.read_spectrum(0).unwrap().intensity, vec![4.0]);
    assert_eq!(reader.read_spectrum(1).unwrap().intensity, vec![9.0]);
}

#[test]
fn test_rewinding_reads_earlier_spectra_again() {
    let dir = tempdir().unwrap();
    let input = continuous_grid().write(dir.path(), "rewind");

    let mut reader = ImzMLReader::open(&input).unwrap();
    assert_eq!(reader.read_spectrum(4).unwrap().intensity, vec![4.0, 14.0, 104.0]);
    assert_eq!(reader.read_spectrum(1).unwrap().intensity, vec![1.0, 11.0, 101.0]);
    assert_eq!(reader.read_spectrum(1).unwrap().intensity, vec![1.0, 11.0, 101.0]);
}
