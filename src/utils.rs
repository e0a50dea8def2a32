//! Small file and number helpers shared by readers and writers.

use std::fs;
use std::io;
use std::path::Path;

const UTF8_BOM: char = '\u{feff}';

/// Makes sure the directory an output file will be written into exists.
pub fn validate_output_dir(file_path: impl AsRef<Path>) -> io::Result<()> {
    match file_path.as_ref().parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Reads a text export, replacing invalid UTF-8 and dropping a leading BOM.
pub fn read_text_lossy(path: impl AsRef<Path>) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.strip_prefix(UTF8_BOM).unwrap_or(&text).to_string())
}

/// Rounds to two decimal places, ties to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_keeps_two_decimals() {
        assert_eq!(round2(8.33333), 8.33);
        assert_eq!(round2(9.0), 9.0);
        assert_eq!(round2(7.456), 7.46);
        assert_eq!(round2(8.125), 8.12);
        assert_eq!(round2(8.375), 8.38);
    }

    #[test]
    fn read_text_lossy_strips_bom_and_bad_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        let mut bytes = "\u{feff}ID,Title\n1,".as_bytes().to_vec();
        bytes.extend_from_slice(&[0xff, b'x', b'\n']);
        fs::write(&path, bytes).unwrap();

        let text = read_text_lossy(&path).unwrap();
        assert!(text.starts_with("ID,Title"));
        assert!(text.contains("1,\u{fffd}x"));
    }

    #[test]
    fn validate_output_dir_creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("data/nested/books.json");
        validate_output_dir(&target).unwrap();
        assert!(dir.path().join("data/nested").is_dir());
        validate_output_dir("books.json").unwrap();
    }
}
