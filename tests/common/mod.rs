use rust_htslib::bam::{self, header::HeaderRecord, Header, HeaderView, Record};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write a coordinate sorted BAM with `depth` single-base reads stacked at
/// every position of every reference.
pub fn write_uniform_bam(dir: &TempDir, references: &[(&str, u64)], depth: usize) -> PathBuf {
    let path = dir.path().join("uniform.bam");
    let header = header(references);
    let view = HeaderView::from_header(&header);
    let mut writer =
        bam::Writer::from_path(&path, &header, bam::Format::Bam).expect("Created writer");
    for (name, len) in references {
        for pos in 0..*len {
            for i in 0..depth {
                let line = format!(
                    "r_{name}_{pos}_{i}\t0\t{name}\t{}\t60\t1M\t*\t0\t0\tA\tI",
                    pos + 1
                );
                let record = Record::from_sam(&view, line.as_bytes()).expect("Valid SAM line");
                writer.write(&record).expect("Wrote record");
            }
        }
    }
    path
}

pub fn header(references: &[(&str, u64)]) -> Header {
    let mut header = Header::new();
    let mut hd = HeaderRecord::new(b"HD");
    hd.push_tag(b"VN", &"1.6".to_owned());
    hd.push_tag(b"SO", &"coordinate".to_owned());
    header.push_record(&hd);
    for (name, len) in references {
        let mut sq = HeaderRecord::new(b"SQ");
        sq.push_tag(b"SN", &name.to_string());
        sq.push_tag(b"LN", &len.to_string());
        header.push_record(&sq);
    }
    header
}

#[allow(dead_code)]
pub fn bin_path() -> &'static Path {
    Path::new(env!("CARGO_BIN_EXE_bamsample"))
}
