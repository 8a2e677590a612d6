//! Word document text extraction.
//!
//! - `.docx` files are ZIP archives; the body lives in `word/document.xml`.
//! - `.doc` files (Word 97-2003) are OLE compound files. Text is located through the
//!   File Information Block (FIB) at the start of the `WordDocument` stream and the
//!   piece table (Clx) stored in the `0Table` or `1Table` stream.

use std::io::{BufReader, Cursor, Read};

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use zip::ZipArchive;

use super::ExtractError;

// ────────────────────────────────────────────────────────────────────────────
// DOCX
// ────────────────────────────────────────────────────────────────────────────

/// Extracts paragraph text from a `.docx` held in memory.
///
/// Only `<w:t>` runs contribute text. Paragraph ends become newlines, `<w:tab/>` a tab,
/// and `<w:br/>` / `<w:cr/>` a newline.
pub fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let document = archive.by_name("word/document.xml")?;

    let mut reader = Reader::from_reader(BufReader::new(document));
    let mut buf = Vec::with_capacity(1024);
    let mut content = String::with_capacity(8192);
    let mut in_text_run = false;
    // `<w:tabs>` holds tab-stop definitions, which are also `<w:tab/>` elements.
    let mut in_tab_stops = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"t" => in_text_run = true,
                b"tabs" => in_tab_stops = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"tabs" => in_tab_stops = false,
                b"p" => content.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" if !in_tab_stops => content.push('\t'),
                b"br" | b"cr" => content.push('\n'),
                b"p" => content.push('\n'),
                _ => {}
            },
            Event::Text(e) if in_text_run => content.push_str(&e.unescape()?),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(content.trim_end().to_string())
}

// ────────────────────────────────────────────────────────────────────────────
// DOC (Word 97-2003 binary)
// ────────────────────────────────────────────────────────────────────────────

const FIB_MAGIC: u16 = 0xA5EC;
const FIB_FLAGS: usize = 0x000A;
const FIB_FC_MIN: usize = 0x0018;
const FIB_FC_MAC: usize = 0x001C;
const FIB_CCP_TEXT: usize = 0x004C;
const FIB_FC_CLX: usize = 0x01A2;
const FIB_LCB_CLX: usize = 0x01A6;
/// Smallest `WordDocument` stream that still holds every FIB field read here.
const FIB_MIN_LEN: usize = FIB_LCB_CLX + 4;

const FLAG_ENCRYPTED: u16 = 0x0100;
const FLAG_WHICH_TABLE: u16 = 0x0200;

const FC_COMPRESSED: u32 = 0x4000_0000;

/// One entry of the piece table: a run of characters and where its bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Piece {
    cp_start: u32,
    cp_end: u32,
    fc: u32,
    compressed: bool,
}

/// Extracts the main document text from a legacy `.doc` held in memory.
pub fn extract_doc(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut compound = cfb::CompoundFile::open(Cursor::new(bytes))?;

    let word_doc = read_stream(&mut compound, "/WordDocument")?;
    if word_doc.len() < FIB_MIN_LEN {
        return Err(ExtractError::Truncated("WordDocument stream"));
    }
    if read_u16(&word_doc, 0)? != FIB_MAGIC {
        return Err(ExtractError::NotWordDocument);
    }

    let flags = read_u16(&word_doc, FIB_FLAGS)?;
    if flags & FLAG_ENCRYPTED != 0 {
        return Err(ExtractError::Encrypted);
    }

    let ccp_text = read_u32(&word_doc, FIB_CCP_TEXT)? as usize;
    let fc_clx = read_u32(&word_doc, FIB_FC_CLX)? as usize;
    let lcb_clx = read_u32(&word_doc, FIB_LCB_CLX)? as usize;

    let raw = if lcb_clx == 0 {
        // No piece table: the text is one contiguous 8-bit run.
        let fc_min = read_u32(&word_doc, FIB_FC_MIN)? as usize;
        let fc_mac = read_u32(&word_doc, FIB_FC_MAC)? as usize;
        let run = word_doc
            .get(fc_min..fc_mac)
            .ok_or(ExtractError::Truncated("document text"))?;
        decode_compressed(&run[..run.len().min(ccp_text)])
    } else {
        let table_name = if flags & FLAG_WHICH_TABLE != 0 {
            "/1Table"
        } else {
            "/0Table"
        };
        let table = read_stream(&mut compound, table_name)?;
        let clx = table
            .get(fc_clx..fc_clx + lcb_clx)
            .ok_or(ExtractError::Truncated("Clx"))?;
        let pieces = parse_piece_table(clx)?;
        text_from_pieces(&word_doc, &pieces, ccp_text)?
    };

    Ok(normalize_word_text(&raw))
}

fn read_stream<F: Read + std::io::Seek>(
    compound: &mut cfb::CompoundFile<F>,
    path: &str,
) -> Result<Vec<u8>, ExtractError> {
    let mut stream = compound.open_stream(path)?;
    let mut data = Vec::new();
    stream.read_to_end(&mut data)?;
    Ok(data)
}

/// Walks the Clx: skips any Prc (0x01) blocks, then reads the Pcdt (0x02) PlcPcd.
fn parse_piece_table(clx: &[u8]) -> Result<Vec<Piece>, ExtractError> {
    let mut pos = 0;
    let plc = loop {
        match clx.get(pos) {
            Some(0x01) => {
                let cb = read_u16(clx, pos + 1)? as usize;
                pos += 3 + cb;
            }
            Some(0x02) => {
                let lcb = read_u32(clx, pos + 1)? as usize;
                break clx
                    .get(pos + 5..pos + 5 + lcb)
                    .ok_or(ExtractError::Truncated("PlcPcd"))?;
            }
            _ => return Err(ExtractError::Malformed("piece table not found")),
        }
    };

    // A PlcPcd with n pieces holds n + 1 character positions and n 8-byte descriptors.
    if plc.len() < 4 || (plc.len() - 4) % 12 != 0 {
        return Err(ExtractError::Malformed("piece table has an invalid length"));
    }
    let count = (plc.len() - 4) / 12;
    let descriptors = (count + 1) * 4;

    (0..count)
        .map(|i| {
            let cp_start = read_u32(plc, i * 4)?;
            let cp_end = read_u32(plc, (i + 1) * 4)?;
            if cp_end < cp_start {
                return Err(ExtractError::Malformed("piece table positions decrease"));
            }
            let fc_raw = read_u32(plc, descriptors + i * 8 + 2)?;
            Ok(Piece {
                cp_start,
                cp_end,
                fc: fc_raw & !FC_COMPRESSED,
                compressed: fc_raw & FC_COMPRESSED != 0,
            })
        })
        .collect()
}

/// Concatenates the pieces covering character positions `0..ccp_text`.
///
/// Footnotes, headers and annotations follow the main text, so pieces are clipped by
/// position. Positions count UTF-16 code units, not decoded `char`s.
fn text_from_pieces(
    word_doc: &[u8],
    pieces: &[Piece],
    ccp_text: usize,
) -> Result<String, ExtractError> {
    let mut text = String::new();
    for piece in pieces {
        let cp_start = piece.cp_start as usize;
        if cp_start >= ccp_text {
            continue;
        }
        let chars = (piece.cp_end as usize).min(ccp_text) - cp_start;
        if piece.compressed {
            let start = (piece.fc / 2) as usize;
            let run = word_doc
                .get(start..start + chars)
                .ok_or(ExtractError::Truncated("compressed piece"))?;
            text.push_str(&decode_compressed(run));
        } else {
            let start = piece.fc as usize;
            let run = word_doc
                .get(start..start + chars * 2)
                .ok_or(ExtractError::Truncated("unicode piece"))?;
            let (decoded, _) = encoding_rs::UTF_16LE.decode_without_bom_handling(run);
            text.push_str(&decoded);
        }
    }
    Ok(text)
}

/// Compressed pieces store one Windows-1252 byte per character.
fn decode_compressed(run: &[u8]) -> String {
    let (decoded, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(run);
    decoded.into_owned()
}

/// Maps Word's in-band control characters onto plain text.
fn normalize_word_text(raw: &str) -> String {
    let text: String = raw
        .chars()
        .filter_map(|c| match c {
            '\r' | '\u{0B}' | '\u{0C}' => Some('\n'), // paragraph, line break, page break
            '\u{07}' => Some('\t'),                   // table cell mark
            '\n' | '\t' => Some(c),
            c if c.is_control() => None, // field markers and anchors
            c => Some(c),
        })
        .collect();
    text.trim_end().to_string()
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16, ExtractError> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(ExtractError::Truncated("u16 field"))
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32, ExtractError> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(ExtractError::Truncated("u32 field"))
}
