//! Dictionary candidate source: streams words from a file, round-robin
//! partitioned across workers, optionally rewritten through the
//! [`Rewriter`](crate::rules::Rewriter).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use crate::error::{EngineError, EngineResult};
use crate::rules::{RewriteStep, Rewriter, RuleSet};

use super::{CandidateSource, WORD_BUFFER_SIZE};

pub struct DictionarySource {
    path: PathBuf,
    rules: RuleSet,
    reader: Option<BufReader<File>>,
    last_word: Vec<u8>,
    more_rewriting: bool,
    block_read: usize,
    total: usize,
    rewriter: Rewriter,
}

impl DictionarySource {
    pub fn new(path: PathBuf, rules: RuleSet) -> Self {
        DictionarySource {
            path,
            rules,
            reader: None,
            last_word: Vec::new(),
            more_rewriting: false,
            block_read: 0,
            total: 1,
            rewriter: Rewriter::new(),
        }
    }

    /// Reads one line, stripping a trailing `\n` and an optional preceding
    /// `\r`. Returns `Ok(None)` at EOF.
    fn read_line(reader: &mut BufReader<File>) -> EngineResult<Option<Vec<u8>>> {
        let mut raw = Vec::new();
        let n = reader
            .read_until(b'\n', &mut raw)
            .map_err(|e| EngineError::resource("reading dictionary file", e))?;
        if n == 0 {
            return Ok(None);
        }
        if raw.last() == Some(&b'\n') {
            raw.pop();
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
        }
        Ok(Some(raw))
    }

    /// Skips `count` non-empty lines (empty trailing lines never count
    /// toward a worker's slice, so they are skipped transparently here
    /// too). Stops early and silently at EOF.
    fn skip_lines(&mut self, mut count: usize) -> EngineResult<()> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(());
        };
        while count > 0 {
            match Self::read_line(reader)? {
                Some(line) if !line.is_empty() => count -= 1,
                Some(_) => continue,
                None => break,
            }
        }
        Ok(())
    }
}

impl CandidateSource for DictionarySource {
    fn init(&mut self, id: usize, total: usize) -> EngineResult<()> {
        self.total = total.max(1);
        let file = File::open(&self.path)
            .map_err(|e| EngineError::resource(format!("opening {}", self.path.display()), e))?;
        self.reader = Some(BufReader::new(file));
        self.skip_lines(id * WORD_BUFFER_SIZE)?;
        Ok(())
    }

    fn get_words(&mut self, out: &mut [Vec<u8>]) -> usize {
        let mut filled = 0;
        while filled < out.len() {
            if self.more_rewriting {
                loop {
                    match self.rewriter.get(&mut out[filled]) {
                        RewriteStep::Produced => {
                            filled += 1;
                            break;
                        }
                        RewriteStep::Retry => continue,
                        RewriteStep::Exhausted => {
                            self.more_rewriting = false;
                            break;
                        }
                    }
                }
                if !self.more_rewriting {
                    // fall through to read the next line in this same slot
                } else {
                    continue;
                }
            }

            let Some(reader) = self.reader.as_mut() else {
                break;
            };
            match Self::read_line(reader) {
                Ok(Some(line)) if line.is_empty() => continue,
                Ok(Some(line)) => {
                    out[filled].clear();
                    out[filled].extend_from_slice(&line);
                    self.last_word = line;
                    if !self.rules.is_empty() {
                        self.rewriter.add_rules(self.rules);
                        self.rewriter.arm(&self.last_word);
                        self.more_rewriting = true;
                    }
                    filled += 1;

                    self.block_read += 1;
                    if self.block_read == out.len() {
                        self.block_read = 0;
                        let skip = (self.total.saturating_sub(1)) * out.len();
                        let _ = self.skip_lines(skip);
                    }
                }
                Ok(None) => break,
                Err(_) => break,
            }
        }
        filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSet;
    use std::io::Write;

    fn write_words(words: &[&str]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        for w in words {
            writeln!(f, "{w}").unwrap();
        }
        f.flush().unwrap();
        f
    }

    fn slots(n: usize) -> Vec<Vec<u8>> {
        vec![Vec::new(); n]
    }

    #[test]
    fn single_worker_reads_all_lines() {
        let f = write_words(&["alpha", "beta", "gamma"]);
        let mut src = DictionarySource::new(f.path().to_path_buf(), RuleSet::empty());
        src.init(0, 1).unwrap();
        let mut buf = slots(64);
        let n = src.get_words(&mut buf);
        assert_eq!(n, 3);
        assert_eq!(buf[0], b"alpha");
        assert_eq!(buf[1], b"beta");
        assert_eq!(buf[2], b"gamma");
    }

    #[test]
    fn partitioning_across_workers_covers_every_line_once() {
        let words: Vec<String> = (0..200).map(|i| format!("word{i}")).collect();
        let refs: Vec<&str> = words.iter().map(|s| s.as_str()).collect();
        let f = write_words(&refs);

        let total = 3;
        let mut seen = std::collections::HashSet::new();
        for id in 0..total {
            let mut src = DictionarySource::new(f.path().to_path_buf(), RuleSet::empty());
            src.init(id, total).unwrap();
            loop {
                let mut buf = slots(super::WORD_BUFFER_SIZE);
                let n = src.get_words(&mut buf);
                for slot in &buf[..n] {
                    let s = String::from_utf8(slot.clone()).unwrap();
                    assert!(seen.insert(s), "duplicate candidate produced");
                }
                if n == 0 {
                    break;
                }
            }
        }
        assert_eq!(seen.len(), 200);
    }

    #[test]
    fn rewrite_rules_interleave_before_advancing_file() {
        let f = write_words(&["Pw"]);
        let mut src = DictionarySource::new(f.path().to_path_buf(), RuleSet::APPEND_DIGIT);
        src.init(0, 1).unwrap();
        let mut buf = slots(64);
        let n = src.get_words(&mut buf);
        // "Pw" then its ten APPEND_DIGIT variants = 11 candidates total.
        assert_eq!(n, 11);
        assert_eq!(buf[0], b"Pw");
        assert_eq!(buf[1], b"Pw0");
        assert_eq!(buf[8], b"Pw7");
        assert_eq!(buf[10], b"Pw9");
    }

    #[test]
    fn empty_file_produces_nothing() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let mut src = DictionarySource::new(f.path().to_path_buf(), RuleSet::empty());
        src.init(0, 2).unwrap();
        let mut buf = slots(64);
        assert_eq!(src.get_words(&mut buf), 0);
    }

    #[test]
    fn more_workers_than_lines_terminates_cleanly() {
        let f = write_words(&["only"]);
        let total = 5;
        for id in 0..total {
            let mut src = DictionarySource::new(f.path().to_path_buf(), RuleSet::empty());
            src.init(id, total).unwrap();
            let mut buf = slots(64);
            let n = src.get_words(&mut buf);
            if id == 0 {
                assert_eq!(n, 1);
            } else {
                assert_eq!(n, 0);
            }
        }
    }
}
