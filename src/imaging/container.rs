//! Reading structure out of raster containers without decoding pixels:
//! TIFF directories, EXIF tags, embedded ICC profiles and PNG text chunks.

use std::collections::{BTreeMap, HashSet};
use std::io::Read;

use flate2::read::ZlibDecoder;
use serde::Serialize;

/// Upper bound on directories followed in one TIFF chain.
const MAX_TIFF_PAGES: usize = 4096;

/// Byte-order aware view of a TIFF structure.
struct Tiff<'a> {
    bytes: &'a [u8],
    little: bool,
}

/// One 12-byte directory entry.
#[derive(Debug, Clone, Copy)]
struct Entry {
    tag: u16,
    kind: u16,
    count: u32,
    /// Offset of the 4-byte value field within the buffer.
    value_at: usize,
}

impl<'a> Tiff<'a> {
    fn new(bytes: &'a [u8]) -> Option<Self> {
        match bytes.get(..4)? {
            [b'I', b'I', 42, 0] => Some(Self { bytes, little: true }),
            [b'M', b'M', 0, 42] => Some(Self { bytes, little: false }),
            _ => None,
        }
    }

    fn u16_at(&self, at: usize) -> Option<u16> {
        let b: [u8; 2] = self.bytes.get(at..at + 2)?.try_into().ok()?;
        Some(if self.little { u16::from_le_bytes(b) } else { u16::from_be_bytes(b) })
    }

    fn u32_at(&self, at: usize) -> Option<u32> {
        let b: [u8; 4] = self.bytes.get(at..at + 4)?.try_into().ok()?;
        Some(if self.little { u32::from_le_bytes(b) } else { u32::from_be_bytes(b) })
    }

    fn first_ifd(&self) -> Option<usize> {
        self.u32_at(4).map(|o| o as usize)
    }

    /// Entries of the directory at `offset` and the offset of the next one.
    fn directory(&self, offset: usize) -> Option<(Vec<Entry>, usize)> {
        let count = self.u16_at(offset)? as usize;
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let at = offset + 2 + i * 12;
            entries.push(Entry {
                tag: self.u16_at(at)?,
                kind: self.u16_at(at + 2)?,
                count: self.u32_at(at + 4)?,
                value_at: at + 8,
            });
        }
        let next = self.u32_at(offset + 2 + count * 12)? as usize;
        Some((entries, next))
    }

    /// Raw bytes of an entry's value, inline or at its offset.
    fn value_bytes(&self, entry: &Entry) -> Option<&'a [u8]> {
        let unit = match entry.kind {
            1 | 2 | 6 | 7 => 1,
            3 | 8 => 2,
            4 | 9 | 11 => 4,
            5 | 10 | 12 => 8,
            _ => return None,
        };
        let len = unit * entry.count as usize;
        let start = if len <= 4 { entry.value_at } else { self.u32_at(entry.value_at)? as usize };
        self.bytes.get(start..start.checked_add(len)?)
    }

    /// Inline SHORT or LONG value.
    fn integer(&self, entry: &Entry) -> Option<u32> {
        match entry.kind {
            3 => self.u16_at(entry.value_at).map(u32::from),
            4 => self.u32_at(entry.value_at),
            _ => None,
        }
    }

    fn render(&self, entry: &Entry) -> Option<String> {
        let raw = self.value_bytes(entry)?;
        let word = |b: &[u8]| -> Option<u32> {
            let b: [u8; 4] = b.get(..4)?.try_into().ok()?;
            Some(if self.little { u32::from_le_bytes(b) } else { u32::from_be_bytes(b) })
        };
        match entry.kind {
            2 => {
                let text = raw.split(|&b| b == 0).next().unwrap_or_default();
                Some(String::from_utf8_lossy(text).trim().to_string())
            }
            3 => {
                let b: [u8; 2] = raw.get(..2)?.try_into().ok()?;
                let v = if self.little { u16::from_le_bytes(b) } else { u16::from_be_bytes(b) };
                Some(v.to_string())
            }
            4 => word(raw).map(|v| v.to_string()),
            5 => {
                let (num, den) = (word(raw)?, word(raw.get(4..)?)?);
                Some(if den == 0 { num.to_string() } else { format!("{}", num as f64 / den as f64) })
            }
            _ => None,
        }
    }
}

/// Width and height of every page in a TIFF file, `None` for a page that
/// lacks the ImageWidth or ImageLength tag. `None` when `bytes` is not TIFF.
/// Chains that loop or run past the buffer stop at the last good page.
pub fn tiff_page_sizes(bytes: &[u8]) -> Option<Vec<Option<(u32, u32)>>> {
    let tiff = Tiff::new(bytes)?;
    let mut seen = HashSet::new();
    let mut pages = Vec::new();
    let mut offset = tiff.first_ifd()?;
    while offset != 0 && pages.len() < MAX_TIFF_PAGES && seen.insert(offset) {
        let Some((entries, next)) = tiff.directory(offset) else { break };
        let dimension = |tag: u16| entries.iter().find(|e| e.tag == tag).and_then(|e| tiff.integer(e));
        pages.push(dimension(256).zip(dimension(257)));
        offset = next;
    }
    Some(pages)
}

/// Number of directories (pages) in a TIFF file.
pub fn tiff_page_count(bytes: &[u8]) -> Option<usize> {
    tiff_page_sizes(bytes).map(|pages| pages.len())
}

const EXIF_TAGS: &[(u16, &str)] = &[
    (0x010E, "ImageDescription"),
    (0x010F, "Make"),
    (0x0110, "Model"),
    (0x0112, "Orientation"),
    (0x011A, "XResolution"),
    (0x011B, "YResolution"),
    (0x0128, "ResolutionUnit"),
    (0x0131, "Software"),
    (0x0132, "DateTime"),
    (0x013B, "Artist"),
    (0x8298, "Copyright"),
];

const EXIF_POINTER: u16 = 0x8769;

const EXIF_SUB_TAGS: &[(u16, &str)] = &[
    (0x829A, "ExposureTime"),
    (0x829D, "FNumber"),
    (0x8827, "ISOSpeedRatings"),
    (0x9003, "DateTimeOriginal"),
    (0x920A, "FocalLength"),
    (0xA002, "PixelXDimension"),
    (0xA003, "PixelYDimension"),
];

/// Values are truncated to this many characters.
const MAX_TAG_CHARS: usize = 200;

fn collect_tags(tiff: &Tiff, entries: &[Entry], names: &[(u16, &str)], out: &mut BTreeMap<String, String>) {
    for entry in entries {
        if let Some((_, name)) = names.iter().find(|(tag, _)| *tag == entry.tag) {
            if let Some(value) = tiff.render(entry) {
                out.insert(name.to_string(), value.chars().take(MAX_TAG_CHARS).collect());
            }
        }
    }
}

/// Named tags from a TIFF-structured EXIF block (first directory plus the
/// EXIF sub-directory).
pub fn exif_fields(block: &[u8]) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let Some(tiff) = Tiff::new(block) else { return out };
    let Some((entries, _)) = tiff.first_ifd().and_then(|o| tiff.directory(o)) else { return out };
    collect_tags(&tiff, &entries, EXIF_TAGS, &mut out);

    let sub = entries.iter().find(|e| e.tag == EXIF_POINTER).and_then(|e| tiff.u32_at(e.value_at));
    if let Some((sub_entries, _)) = sub.and_then(|o| tiff.directory(o as usize)) {
        collect_tags(&tiff, &sub_entries, EXIF_SUB_TAGS, &mut out);
    }
    out
}

/// PNG chunks as `(type, data)` pairs, stopping at the first malformed one.
fn png_chunks(bytes: &[u8]) -> Vec<([u8; 4], &[u8])> {
    let mut chunks = Vec::new();
    if !bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        return chunks;
    }
    let mut at = 8;
    while let Some(header) = bytes.get(at..at + 8) {
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let kind = [header[4], header[5], header[6], header[7]];
        let Some(data) = bytes.get(at + 8..at + 8 + len) else { break };
        chunks.push((kind, data));
        if &kind == b"IEND" {
            break;
        }
        at += 12 + len;
    }
    chunks
}

/// JPEG marker segments as `(marker, payload)` up to start-of-scan.
fn jpeg_segments(bytes: &[u8]) -> Vec<(u8, &[u8])> {
    let mut segments = Vec::new();
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return segments;
    }
    let mut at = 2;
    while let Some(&[0xFF, marker, hi, lo]) = bytes.get(at..at + 4) {
        if marker == 0xDA || marker == 0xD9 {
            break;
        }
        let len = u16::from_be_bytes([hi, lo]) as usize;
        let Some(payload) = bytes.get(at + 4..at + 2 + len) else { break };
        segments.push((marker, payload));
        at += 2 + len;
    }
    segments
}

/// RIFF chunks of a WebP file.
fn webp_chunks(bytes: &[u8]) -> Vec<([u8; 4], &[u8])> {
    let mut chunks = Vec::new();
    if bytes.get(..4) != Some(&b"RIFF"[..]) || bytes.get(8..12) != Some(&b"WEBP"[..]) {
        return chunks;
    }
    let mut at = 12;
    while let Some(header) = bytes.get(at..at + 8) {
        let kind = [header[0], header[1], header[2], header[3]];
        let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        let Some(data) = bytes.get(at + 8..at + 8 + len) else { break };
        chunks.push((kind, data));
        at += 8 + len + (len & 1);
    }
    chunks
}

/// The TIFF-structured EXIF block of a JPEG, PNG, WebP or TIFF file.
pub fn exif_block(bytes: &[u8]) -> Option<&[u8]> {
    if Tiff::new(bytes).is_some() {
        return Some(bytes);
    }
    if let Some((_, data)) = png_chunks(bytes).into_iter().find(|(kind, _)| kind == b"eXIf") {
        return Some(data);
    }
    if let Some((_, data)) = webp_chunks(bytes).into_iter().find(|(kind, _)| kind == b"EXIF") {
        return Some(data.strip_prefix(b"Exif\0\0").unwrap_or(data));
    }
    jpeg_segments(bytes)
        .into_iter()
        .find_map(|(marker, payload)| if marker == 0xE1 { payload.strip_prefix(b"Exif\0\0") } else { None })
}

/// `tEXt` keyword/value pairs of a PNG.
pub fn png_text(bytes: &[u8]) -> BTreeMap<String, String> {
    png_chunks(bytes)
        .into_iter()
        .filter(|(kind, _)| kind == b"tEXt")
        .filter_map(|(_, data)| {
            let split = data.iter().position(|&b| b == 0)?;
            let key = String::from_utf8_lossy(&data[..split]).to_string();
            let value: String = String::from_utf8_lossy(&data[split + 1..]).chars().take(MAX_TAG_CHARS).collect();
            Some((key, value))
        })
        .collect()
}

/// An embedded colour profile and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedProfile {
    /// Profile name stored by the container (PNG only).
    pub name: Option<String>,
    pub data: Vec<u8>,
}

const ICC_TIFF_TAG: u16 = 34675;

/// The ICC profile embedded in a PNG, JPEG, WebP or TIFF file.
pub fn icc_profile(bytes: &[u8]) -> Option<EmbeddedProfile> {
    if let Some(tiff) = Tiff::new(bytes) {
        let (entries, _) = tiff.directory(tiff.first_ifd()?)?;
        let entry = entries.iter().find(|e| e.tag == ICC_TIFF_TAG)?;
        return Some(EmbeddedProfile { name: None, data: tiff.value_bytes(entry)?.to_vec() });
    }
    if let Some((_, data)) = png_chunks(bytes).into_iter().find(|(kind, _)| kind == b"iCCP") {
        let split = data.iter().position(|&b| b == 0)?;
        let name = String::from_utf8_lossy(&data[..split]).to_string();
        // Keyword, NUL, compression method byte, then a zlib stream.
        let mut inflated = Vec::new();
        ZlibDecoder::new(data.get(split + 2..)?).read_to_end(&mut inflated).ok()?;
        return Some(EmbeddedProfile { name: Some(name), data: inflated });
    }
    if let Some((_, data)) = webp_chunks(bytes).into_iter().find(|(kind, _)| kind == b"ICCP") {
        return Some(EmbeddedProfile { name: None, data: data.to_vec() });
    }
    // JPEG splits the profile over numbered APP2 segments.
    let mut parts: Vec<(u8, &[u8])> = jpeg_segments(bytes)
        .into_iter()
        .filter(|(marker, _)| *marker == 0xE2)
        .filter_map(|(_, payload)| payload.strip_prefix(b"ICC_PROFILE\0"))
        .filter_map(|rest| Some((*rest.first()?, rest.get(2..)?)))
        .collect();
    if parts.is_empty() {
        return None;
    }
    parts.sort_by_key(|(seq, _)| *seq);
    Some(EmbeddedProfile { name: None, data: parts.into_iter().flat_map(|(_, p)| p.iter().copied()).collect() })
}

/// Fields of an ICC profile header plus its description tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IccSummary {
    pub size: u32,
    pub version: String,
    pub device_class: String,
    pub color_space: String,
    pub connection_space: String,
    pub description: Option<String>,
}

fn signature(bytes: &[u8], at: usize) -> Option<String> {
    let raw = bytes.get(at..at + 4)?;
    Some(String::from_utf8_lossy(raw).trim().to_string())
}

fn be_u32(bytes: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_be_bytes(bytes.get(at..at + 4)?.try_into().ok()?))
}

/// Text of the `desc` tag, in either the v2 `desc` or v4 `mluc` encoding.
fn icc_description(profile: &[u8]) -> Option<String> {
    let count = be_u32(profile, 128)? as usize;
    let (offset, size) = (0..count.min(256)).find_map(|i| {
        let at = 132 + i * 12;
        (profile.get(at..at + 4)? == b"desc").then(|| Some((be_u32(profile, at + 4)? as usize, be_u32(profile, at + 8)? as usize)))?
    })?;
    let tag = profile.get(offset..offset.checked_add(size)?)?;
    match tag.get(..4)? {
        b"desc" => {
            let len = be_u32(tag, 8)? as usize;
            let text = tag.get(12..12 + len)?;
            let text = text.split(|&b| b == 0).next().unwrap_or_default();
            Some(String::from_utf8_lossy(text).to_string())
        }
        b"mluc" => {
            let len = be_u32(tag, 20)? as usize;
            let start = be_u32(tag, 24)? as usize;
            let units: Vec<u16> =
                tag.get(start..start + len)?.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
            Some(String::from_utf16_lossy(&units).trim_end_matches('\0').to_string())
        }
        _ => None,
    }
}

/// Parse the 128-byte header. `None` when the data is too short or lacks
/// the `acsp` signature.
pub fn icc_summary(profile: &[u8]) -> Option<IccSummary> {
    if profile.get(36..40)? != b"acsp" {
        return None;
    }
    let version = profile.get(8..10)?;
    Some(IccSummary {
        size: be_u32(profile, 0)?,
        version: format!("{}.{}", version[0], version[1] >> 4),
        device_class: signature(profile, 12)?,
        color_space: signature(profile, 16)?,
        connection_space: signature(profile, 20)?,
        description: icc_description(profile),
    })
}
