//! Synthetic imzML/ibd pairs shared by the integration tests

#![allow(dead_code)]

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const FILE_UUID: &str = "5a1c7f3e-2b4d-4e6f-8a9b-0c1d2e3f4a5b";

pub struct Pixel {
    pub x: u32,
    pub y: u32,
    pub z: Option<u32>,
    pub mz: Vec<f64>,
    pub intensity: Vec<f32>,
}

pub fn pixel(x: u32, y: u32, mz: &[f64], intensity: &[f32]) -> Pixel {
    Pixel {
        x,
        y,
        z: None,
        mz: mz.to_vec(),
        intensity: intensity.to_vec(),
    }
}

/// Writes a synthetic imzML/ibd pair. The document is declared and
/// written as ISO-8859-1, so every character in it must fit in one byte.
pub struct Fixture {
    pub continuous: bool,
    pub centroid: bool,
    pub declared_uuid: Option<String>,
    pub zlib_intensity: bool,
    pub max_count: Option<(u32, u32)>,
    pub intensity_name: String,
    pub pixels: Vec<Pixel>,
}

impl Fixture {
    pub fn new(continuous: bool, pixels: Vec<Pixel>) -> Self {
        Self {
            continuous,
            centroid: true,
            declared_uuid: Some(format!("{{{FILE_UUID}}}")),
            zlib_intensity: false,
            max_count: None,
            intensity_name: "intensity array".to_string(),
            pixels,
        }
    }

    pub fn write(&self, dir: &Path, stem: &str) -> PathBuf {
        let uuid = Uuid::parse_str(FILE_UUID).unwrap();
        let mut ibd: Vec<u8> = uuid.as_bytes().to_vec();

        // (offset, array length, encoded length)
        let mut shared_mz = None;
        let mut arrays = Vec::new();
        for p in &self.pixels {
            let mz_ref = match (self.continuous, shared_mz) {
                (true, Some(r)) => r,
                _ => {
                    let offset = ibd.len();
                    for &v in &p.mz {
                        ibd.write_f64::<LittleEndian>(v).unwrap();
                    }
                    let r = (offset, p.mz.len(), ibd.len() - offset);
                    shared_mz = Some(r);
                    r
                }
            };

            let mut raw = Vec::new();
            for &v in &p.intensity {
                raw.write_f32::<LittleEndian>(v).unwrap();
            }
            if self.zlib_intensity {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&raw).unwrap();
                raw = encoder.finish().unwrap();
            }
            let offset = ibd.len();
            ibd.extend_from_slice(&raw);
            arrays.push((mz_ref, (offset, p.intensity.len(), raw.len())));
        }

        let mut spectra = String::new();
        for (i, (p, (mz_ref, int_ref))) in self.pixels.iter().zip(&arrays).enumerate() {
            let z_param = p
                .z
                .map(|z| {
                    format!(
                        r#"
            <cvParam cvRef="IMS" accession="IMS:1000052" name="position z" value="{z}"/>"#
                    )
                })
                .unwrap_or_default();
            spectra.push_str(&format!(
                r#"      <spectrum id="Scan={id}" defaultArrayLength="0" index="{i}">
        <scanList count="1">
          <scan>
            <cvParam cvRef="IMS" accession="IMS:1000050" name="position x" value="{x}"/>
            <cvParam cvRef="IMS" accession="IMS:1000051" name="position y" value="{y}"/>{z_param}
          </scan>
        </scanList>
        <binaryDataArrayList count="2">
          <binaryDataArray encodedLength="0">
            <referenceableParamGroupRef ref="mzArray"/>
            <cvParam cvRef="IMS" accession="IMS:1000103" name="external array length" value="{ml}"/>
            <cvParam cvRef="IMS" accession="IMS:1000104" name="external encoded length" value="{me}"/>
            <cvParam cvRef="IMS" accession="IMS:1000102" name="external offset" value="{mo}"/>
            <binary/>
          </binaryDataArray>
          <binaryDataArray encodedLength="0">
            <referenceableParamGroupRef ref="intensityArray"/>
            <cvParam cvRef="IMS" accession="IMS:1000103" name="external array length" value="{il}"/>
            <cvParam cvRef="IMS" accession="IMS:1000104" name="external encoded length" value="{ie}"/>
            <cvParam cvRef="IMS" accession="IMS:1000102" name="external offset" value="{io}"/>
            <binary/>
          </binaryDataArray>
        </binaryDataArrayList>
      </spectrum>
"#,
                id = i + 1,
                x = p.x,
                y = p.y,
                mo = mz_ref.0,
                ml = mz_ref.1,
                me = mz_ref.2,
                io = int_ref.0,
                il = int_ref.1,
                ie = int_ref.2,
            ));
        }

        let uuid_param = self
            .declared_uuid
            .as_ref()
            .map(|u| {
                format!(
                    r#"<cvParam cvRef="IMS" accession="IMS:1000080" name="universally unique identifier" value="{u}"/>"#
                )
            })
            .unwrap_or_default();
        let mode_param = if self.continuous {
            r#"<cvParam cvRef="IMS" accession="IMS:1000030" name="continuous"/>"#
        } else {
            r#"<cvParam cvRef="IMS" accession="IMS:1000031" name="processed"/>"#
        };
        let type_param = if self.centroid {
            r#"<cvParam cvRef="MS" accession="MS:1000127" name="centroid spectrum"/>"#
        } else {
            r#"<cvParam cvRef="MS" accession="MS:1000128" name="profile spectrum"/>"#
        };
        let compression_param = if self.zlib_intensity {
            r#"<cvParam cvRef="MS" accession="MS:1000574" name="zlib compression"/>"#
        } else {
            r#"<cvParam cvRef="MS" accession="MS:1000576" name="no compression"/>"#
        };
        let (max_x, max_y) = self.max_count.unwrap_or((1, 1));

        let xml = format!(
            r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<mzML xmlns="http://psi.hupo.org/ms/mzml" version="1.1">
  <fileDescription>
    <fileContent>
      <cvParam cvRef="MS" accession="MS:1000579" name="MS1 spectrum"/>
      {type_param}
      {uuid_param}
      <cvParam cvRef="IMS" accession="IMS:1000090" name="ibd MD5" value="0123456789ABCDEF0123456789ABCDEF"/>
      {mode_param}
    </fileContent>
  </fileDescription>
  <referenceableParamGroupList count="2">
    <referenceableParamGroup id="mzArray">
      <cvParam cvRef="MS" accession="MS:1000514" name="m/z array"/>
      <cvParam cvRef="MS" accession="MS:1000523" name="64-bit float"/>
      <cvParam cvRef="MS" accession="MS:1000576" name="no compression"/>
    </referenceableParamGroup>
    <referenceableParamGroup id="intensityArray">
      <cvParam cvRef="MS" accession="MS:1000515" name="{intensity_name}"/>
      <cvParam cvRef="MS" accession="MS:1000521" name="32-bit float"/>
      {compression_param}
    </referenceableParamGroup>
  </referenceableParamGroupList>
  <scanSettingsList count="1">
    <scanSettings id="scansettings1">
      <cvParam cvRef="IMS" accession="IMS:1000042" name="max count of pixels x" value="{max_x}"/>
      <cvParam cvRef="IMS" accession="IMS:1000043" name="max count of pixels y" value="{max_y}"/>
      <cvParam cvRef="IMS" accession="IMS:1000046" name="pixel size x" value="10.0"/>
      <cvParam cvRef="IMS" accession="IMS:1000047" name="pixel size y" value="10.0"/>
    </scanSettings>
  </scanSettingsList>
  <run id="run1">
    <spectrumList count="{count}">
{spectra}    </spectrumList>
  </run>
</mzML>
"#,
            intensity_name = self.intensity_name,
            count = self.pixels.len(),
        );

        let latin1: Vec<u8> = xml
            .chars()
            .map(|c| u8::try_from(u32::from(c)).expect("fixture text must be Latin-1"))
            .collect();

        let imzml_path = dir.join(format!("{stem}.imzML"));
        File::create(&imzml_path)
            .unwrap()
            .write_all(&latin1)
            .unwrap();
        File::create(dir.join(format!("{stem}.ibd")))
            .unwrap()
            .write_all(&ibd)
            .unwrap();
        imzml_path
    }
}

/// 3 columns x 2 rows on a shared axis; pixel `i` (row-major) has
/// intensities `[i, 10 + i, 100 + i]`
pub fn continuous_grid() -> Fixture {
    let axis = [100.0, 200.0, 300.0];
    let mut pixels = Vec::new();
    for y in 1..=2u32 {
        for x in 1..=3u32 {
            let i = ((y - 1) * 3 + (x - 1)) as f32;
            pixels.push(pixel(x, y, &axis, &[i, 10.0 + i, 100.0 + i]));
        }
    }
    let mut fixture = Fixture::new(true, pixels);
    fixture.max_count = Some((3, 2));
    fixture
}
