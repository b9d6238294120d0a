//! Nintendo run-length encoding, type 0x30
//!
//! Header `0x30 | u24 size`, then chunks each led by a flag byte. With bit 7
//! set the chunk is a run of `(flag & 0x7F) + 3` copies of the next byte;
//! otherwise `(flag & 0x7F) + 1` literal bytes follow. The output is padded
//! to four bytes.

use super::{output_buffer, ByteReader};
use crate::codec::{Decoder, Encoded, Encoder};
use crate::common::{
    check_plaintext_size, pad_to, read_nintendo_header, write_nintendo_header, FormatId, Result,
};
use crate::matching::ParseSettings;
use log::debug;

const TAG: u8 = 0x30;
const MIN_RUN: usize = 3;
const MAX_RUN: usize = 0x7F + MIN_RUN;
const MAX_LITERALS: usize = 0x80;

/// RLE encoder and decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct Rle;

/// Length of the run of equal bytes starting at `pos`, capped at one chunk
fn run_length(input: &[u8], pos: usize) -> usize {
    input[pos..]
        .iter()
        .take(MAX_RUN)
        .take_while(|&&b| b == input[pos])
        .count()
}

fn flush_literals(out: &mut Vec<u8>, literals: &[u8]) {
    for chunk in literals.chunks(MAX_LITERALS) {
        out.push((chunk.len() - 1) as u8);
        out.extend_from_slice(chunk);
    }
}

impl Encoder for Rle {
    /// Runs are found by a direct scan; the parse settings do not apply
    fn encode(&self, input: &[u8], _settings: &ParseSettings) -> Result<Encoded> {
        check_plaintext_size(FormatId::Rle, input.len())?;

        let mut out = Vec::with_capacity(4 + input.len() + input.len() / MAX_LITERALS + 4);
        write_nintendo_header(&mut out, TAG, input.len());

        let mut encoded = Encoded::default();
        let mut literal_start = 0;
        let mut pos = 0;
        while pos < input.len() {
            let run = run_length(input, pos);
            if run < MIN_RUN {
                pos += 1;
                continue;
            }
            flush_literals(&mut out, &input[literal_start..pos]);
            encoded.literal_count += pos - literal_start;
            out.push(0x80 | (run - MIN_RUN) as u8);
            out.push(input[pos]);
            encoded.match_count += 1;
            encoded.longest_match = encoded.longest_match.max(run);
            pos += run;
            literal_start = pos;
        }
        flush_literals(&mut out, &input[literal_start..]);
        encoded.literal_count += input.len() - literal_start;
        pad_to(&mut out, 4, 0);

        debug!(
            "rle: {} -> {} bytes ({} literals, {} runs)",
            input.len(),
            out.len(),
            encoded.literal_count,
            encoded.match_count
        );
        encoded.data = out;
        Ok(encoded)
    }
}

impl Decoder for Rle {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let size = read_nintendo_header(input, TAG)?;
        let mut reader = ByteReader::new(input, 4);
        let mut out = output_buffer(size);

        while out.len() < size {
            let flag = reader.read_u8()? as usize;
            let remaining = size - out.len();
            if flag & 0x80 != 0 {
                let byte = reader.read_u8()?;
                let run = ((flag & 0x7F) + MIN_RUN).min(remaining);
                out.resize(out.len() + run, byte);
            } else {
                for _ in 0..((flag & 0x7F) + 1).min(remaining) {
                    out.push(reader.read_u8()?);
                }
            }
        }

        debug!("rle: {} -> {} bytes", input.len(), out.len());
        Ok(out)
    }
}
