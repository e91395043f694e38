#![no_main]

use libfuzzer_sys::fuzz_target;

use imzml_raster::imzml::ImagingHeader;

fuzz_target!(|data: &[u8]| {
    // Malformed headers must fail with an error, never panic
    if let Ok(header) = ImagingHeader::read(data) {
        let _ = header.pixel_size();
    }
});
