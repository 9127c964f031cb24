//! JFIF pixel-density stamping.
//!
//! The JPEG encoder writes a JFIF APP0 segment with the density fields set
//! to a unitless 1x1 aspect ratio. Passport output must declare its print
//! density, so the fields are rewritten after encoding. Plain byte surgery,
//! no re-encode.

/// JPEG start-of-image marker.
const SOI: [u8; 2] = [0xFF, 0xD8];

/// JFIF APP0 identifier, NUL-terminated.
const JFIF_ID: [u8; 5] = *b"JFIF\0";

/// Offset of the APP0 segment, immediately after SOI.
const APP0_OFFSET: usize = 2;

/// Density units code for dots per inch.
const UNITS_DPI: u8 = 1;

/// Set the JFIF pixel density of an encoded JPEG to `dpi` in both axes.
///
/// When the stream opens with a JFIF APP0 segment, its units and density
/// fields are rewritten in place and the length does not change. When the
/// JPEG carries no JFIF APP0, a minimal one is spliced in after SOI.
/// Returns the input unchanged if:
/// - the data is too short to hold a JPEG header
/// - the SOI marker is missing
pub(crate) fn stamp_density(data: &[u8], dpi: u16) -> Vec<u8> {
    if data.len() < 4 || data[0..2] != SOI {
        return data.to_vec();
    }

    // APP0 layout after the marker: length (2), "JFIF\0" (5), version (2),
    // units (1), X density (2), Y density (2), thumbnail size (2).
    let has_jfif_app0 = data.len() >= APP0_OFFSET + 18
        && data[APP0_OFFSET] == 0xFF
        && data[APP0_OFFSET + 1] == 0xE0
        && data[APP0_OFFSET + 4..APP0_OFFSET + 9] == JFIF_ID;

    let density = dpi.to_be_bytes();

    if has_jfif_app0 {
        let mut patched = data.to_vec();
        patched[APP0_OFFSET + 11] = UNITS_DPI;
        patched[APP0_OFFSET + 12..APP0_OFFSET + 14].copy_from_slice(&density);
        patched[APP0_OFFSET + 14..APP0_OFFSET + 16].copy_from_slice(&density);
        return patched;
    }

    // No JFIF header. Splice in a standard 16-byte APP0 with no thumbnail.
    let mut result = Vec::with_capacity(data.len() + 18);
    result.extend_from_slice(&SOI);
    result.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
    result.extend_from_slice(&JFIF_ID);
    result.extend_from_slice(&[0x01, 0x02]);
    result.push(UNITS_DPI);
    result.extend_from_slice(&density);
    result.extend_from_slice(&density);
    result.extend_from_slice(&[0x00, 0x00]);
    result.extend_from_slice(&data[2..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SOI plus a JFIF APP0 declaring a 1x1 aspect ratio, plus fake scan
    /// bytes.
    fn jpeg_with_jfif() -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
        data.extend_from_slice(b"JFIF\0");
        data.extend_from_slice(&[0x01, 0x01]); // version 1.01
        data.push(0x00); // no units
        data.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);
        data.extend_from_slice(&[0x00, 0x00]);
        data.extend_from_slice(&[0xFF, 0xDA, 0xAA, 0xBB, 0xCC]);
        data
    }

    /// SOI followed directly by an APP1 segment, no JFIF header.
    fn jpeg_with_exif_only() -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        data.extend_from_slice(&[0xFF, 0xE1, 0x00, 0x08]);
        data.extend_from_slice(b"Exif\0\0");
        data.extend_from_slice(&[0xFF, 0xDA, 0x11, 0x22]);
        data
    }

    #[test]
    fn short_data_is_returned_unchanged() {
        assert_eq!(stamp_density(&[0xFF, 0xD8], 300), vec![0xFF, 0xD8]);
        assert_eq!(stamp_density(&[], 300), Vec::<u8>::new());
    }

    #[test]
    fn non_jpeg_data_is_returned_unchanged() {
        let png_ish = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A];

        assert_eq!(stamp_density(&png_ish, 300), png_ish);
    }

    #[test]
    fn existing_app0_is_patched_in_place() {
        let original = jpeg_with_jfif();
        let stamped = stamp_density(&original, 300);

        assert_eq!(stamped.len(), original.len());
        assert_eq!(stamped[13], 1); // dpi units
        assert_eq!(&stamped[14..16], &[0x01, 0x2C]); // 300 big-endian
        assert_eq!(&stamped[16..18], &[0x01, 0x2C]);
        // everything outside the density fields is untouched
        assert_eq!(&stamped[0..13], &original[0..13]);
        assert_eq!(&stamped[18..], &original[18..]);
    }

    #[test]
    fn app0_is_inserted_when_absent() {
        let original = jpeg_with_exif_only();
        let stamped = stamp_density(&original, 300);

        assert_eq!(stamped.len(), original.len() + 18);
        assert_eq!(&stamped[0..2], &[0xFF, 0xD8]);
        assert_eq!(&stamped[2..4], &[0xFF, 0xE0]);
        assert_eq!(&stamped[6..11], b"JFIF\0");
        assert_eq!(stamped[13], 1);
        assert_eq!(&stamped[14..16], &[0x01, 0x2C]);
        // the original APP1 follows the spliced segment
        assert_eq!(&stamped[20..], &original[2..]);
    }

    #[test]
    fn stamping_twice_is_stable() {
        let once = stamp_density(&jpeg_with_jfif(), 300);
        let twice = stamp_density(&once, 300);

        assert_eq!(once, twice);
    }

    #[test]
    fn density_is_an_arbitrary_dpi() {
        let stamped = stamp_density(&jpeg_with_jfif(), 72);

        assert_eq!(&stamped[14..16], &[0x00, 0x48]);
    }
}
