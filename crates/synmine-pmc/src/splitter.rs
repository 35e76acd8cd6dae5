//! Streaming `<article ...>...</article>` splitter over large corpus files
//!
//! Memory stays bounded by one read chunk plus roughly one article, no
//! matter how large the (decompressed) corpus is.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

/// Default read size per chunk (10 MiB)
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024 * 1024;

pub const ARTICLE_START: &str = "<article ";
pub const ARTICLE_END: &str = "</article>";

/// Buffer size for file and decompressor readers (256KB)
const READ_BUF_SIZE: usize = 256 * 1024;

/// Open a corpus file, gunzipping transparently when the name ends in `.gz`.
pub fn open_corpus(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    let gzipped = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
    if gzipped {
        let decoder = MultiGzDecoder::new(BufReader::with_capacity(READ_BUF_SIZE, file));
        Ok(Box::new(BufReader::with_capacity(READ_BUF_SIZE, decoder)))
    } else {
        Ok(Box::new(BufReader::with_capacity(READ_BUF_SIZE, file)))
    }
}

/// Fast estimate of the article count: lines containing the start marker.
///
/// No XML parsing happens here, so the estimate can disagree with what the
/// splitter actually yields (several articles on one line, truncated tail).
pub fn count_articles(mut reader: impl BufRead) -> io::Result<usize> {
    let marker = ARTICLE_START.as_bytes();
    let mut line = Vec::new();
    let mut count = 0;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        if line.windows(marker.len()).any(|w| w == marker) {
            count += 1;
        }
    }
    Ok(count)
}

/// Lazy iterator over article fragments.
///
/// Each item starts with `<article ` and ends with `</article>`. A start
/// marker without a matching end before EOF is dropped. Invalid UTF-8 is
/// replaced rather than aborting the stream.
pub struct ArticleSplitter<R> {
    reader: R,
    chunk_size: usize,
    buffer: String,
    /// Incomplete UTF-8 sequence at the end of the previous chunk
    carry: Vec<u8>,
    eof: bool,
}

impl<R: BufRead> ArticleSplitter<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            buffer: String::new(),
            carry: Vec::new(),
            eof: false,
        }
    }

    /// Cut the first complete fragment out of the buffer, discarding what precedes it.
    fn take_fragment(&mut self) -> Option<String> {
        let Some(start) = self.buffer.find(ARTICLE_START) else {
            // Keep only a tail that could still begin a split start marker
            let keep_from = floor_char_boundary(
                &self.buffer,
                self.buffer.len().saturating_sub(ARTICLE_START.len() - 1),
            );
            self.buffer.drain(..keep_from);
            return None;
        };
        let Some(rel_end) = self.buffer[start..].find(ARTICLE_END) else {
            self.buffer.drain(..start);
            return None;
        };
        let end = start + rel_end + ARTICLE_END.len();
        let fragment = self.buffer[start..end].to_string();
        self.buffer.drain(..end);
        Some(fragment)
    }

    /// Append the next chunk to the buffer. Returns false at end of stream.
    fn fill(&mut self) -> io::Result<bool> {
        let mut bytes = std::mem::take(&mut self.carry);
        let n = (&mut self.reader)
            .take(self.chunk_size as u64)
            .read_to_end(&mut bytes)?;
        if n == 0 {
            // Trailing partial sequence can never complete
            if !bytes.is_empty() {
                self.buffer.push_str(&String::from_utf8_lossy(&bytes));
            }
            return Ok(false);
        }
        self.carry = decode_into(&mut self.buffer, &bytes).to_vec();
        Ok(true)
    }
}

impl<R: BufRead> Iterator for ArticleSplitter<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(fragment) = self.take_fragment() {
                return Some(Ok(fragment));
            }
            if self.eof {
                return None;
            }
            match self.fill() {
                Ok(true) => {}
                Ok(false) => self.eof = true,
                Err(e) => {
                    self.eof = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Decode `bytes` into `out`, replacing invalid sequences.
///
/// Returns the incomplete sequence at the very end, if any, for the next chunk.
fn decode_into<'a>(out: &mut String, mut bytes: &'a [u8]) -> &'a [u8] {
    loop {
        match std::str::from_utf8(bytes) {
            Ok(s) => {
                out.push_str(s);
                return &[];
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                match e.error_len() {
                    None => return rest,
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        bytes = &rest[len..];
                    }
                }
            }
        }
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
