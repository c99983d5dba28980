//! On-disk formats shared between pyramid levels and with downstream tooling.
//!
//! * Height thumbnails are binary 16-bit PGM files (`P5`, maxval 65535, big-endian samples).
//! * Tile lists are gzip-compressed text with one `level/i/j.png` path per line.

use anyhow::{bail, ensure, Error};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{BufRead, BufReader, Cursor, Read, Write};

pub fn encode_height_thumbnail(width: usize, height: usize, heights: &[u16]) -> Vec<u8> {
    assert_eq!(heights.len(), width * height);

    let mut output = format!("P5\n{} {}\n65535\n", width, height).into_bytes();
    output.reserve(heights.len() * 2);
    for &h in heights {
        output.write_u16::<BigEndian>(h).unwrap();
    }
    output
}

/// Returns `(width, height, heights)`.
pub fn decode_height_thumbnail(bytes: &[u8]) -> Result<(usize, usize, Vec<u16>), Error> {
    let mut cursor = Cursor::new(bytes);

    let mut fields = Vec::with_capacity(4);
    while fields.len() < 4 {
        let token = read_header_token(&mut cursor)?;
        ensure!(!token.is_empty(), "truncated PGM header");
        fields.push(token);
    }
    ensure!(fields[0] == "P5", "not a binary graymap (magic {:?})", fields[0]);
    let width: usize = fields[1].parse()?;
    let height: usize = fields[2].parse()?;
    let maxval: u32 = fields[3].parse()?;
    ensure!(maxval > 0 && maxval <= 65535, "invalid maxval {}", maxval);

    let mut heights = vec![0u16; width * height];
    if maxval < 256 {
        for h in heights.iter_mut() {
            *h = cursor.read_u8()? as u16;
        }
    } else {
        cursor.read_u16_into::<BigEndian>(&mut heights)?;
    }
    Ok((width, height, heights))
}

/// Reads one whitespace separated header token, skipping `#` comments. Consumes exactly one
/// whitespace byte after the token, as required before the raster.
fn read_header_token(cursor: &mut Cursor<&[u8]>) -> Result<String, Error> {
    let mut token = String::new();
    loop {
        let byte = match cursor.read_u8() {
            Ok(b) => b,
            Err(_) if !token.is_empty() => return Ok(token),
            Err(_) => bail!("truncated PGM header"),
        };
        if byte == b'#' && token.is_empty() {
            while cursor.read_u8()? != b'\n' {}
        } else if byte.is_ascii_whitespace() {
            if !token.is_empty() {
                return Ok(token);
            }
        } else {
            token.push(byte as char);
        }
    }
}

pub fn compress_tile_list<S: AsRef<str>>(paths: &[S]) -> Result<Vec<u8>, Error> {
    let mut e = GzEncoder::new(Vec::new(), Compression::default());
    for path in paths {
        e.write_all(path.as_ref().as_bytes())?;
        e.write_all(b"\n")?;
    }
    Ok(e.finish()?)
}

pub fn uncompress_tile_list(bytes: &[u8]) -> Result<Vec<String>, Error> {
    let mut lines = Vec::new();
    for line in BufReader::new(GzDecoder::new(bytes)).lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    Ok(lines)
}

/// Reads a whole gzip stream into memory, for callers that want the raw text.
pub fn uncompress_to_string(bytes: &[u8]) -> Result<String, Error> {
    let mut s = String::new();
    GzDecoder::new(bytes).read_to_string(&mut s)?;
    Ok(s)
}
