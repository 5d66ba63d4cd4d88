//! Incremental candidate source: enumerates every string of length
//! `L ∈ [from, to]` over an ordered alphabet, partitioned across workers.

use crate::error::{EngineError, EngineResult};

use super::CandidateSource;

enum Step {
    /// A candidate was produced; the cursor now holds it.
    Emitted,
    /// Every length in `[from, to]` has been fully enumerated.
    Exhausted,
}

pub struct IncrementalSource {
    from: usize,
    to: usize,
    alphabet: Vec<u8>,
    length: usize,
    digits: Vec<usize>,
    exhausted: bool,
    started: bool,
}

impl IncrementalSource {
    pub fn new(from: usize, to: usize, alphabet: String) -> Self {
        IncrementalSource {
            from,
            to,
            alphabet: alphabet.into_bytes(),
            length: 0,
            digits: Vec::new(),
            exhausted: false,
            started: false,
        }
    }

    fn reset(&mut self, length: usize) {
        self.length = length;
        self.digits = vec![0usize; length];
        if length > 0 {
            let last = length - 1;
            // Sentinel meaning "about to wrap to zero": the first `step`
            // call after a reset produces `length` copies of alphabet[0].
            self.digits[last] = usize::MAX;
        }
    }

    fn materialize(&self, out: &mut Vec<u8>) {
        out.clear();
        out.extend(self.digits.iter().map(|&d| self.alphabet[d]));
    }

    /// Advances the cursor to the next candidate, transparently rolling
    /// over to the next length bucket when the current one is exhausted.
    /// Returns `Step::Exhausted` only when every length up to `to` has been
    /// produced.
    fn step(&mut self) -> Step {
        if self.exhausted {
            return Step::Exhausted;
        }
        if !self.started {
            self.started = true;
            self.reset(self.from);
        }

        let base = self.alphabet.len();
        let mut i = self.length;
        loop {
            if i == 0 {
                // Carried past position 0: this length is exhausted.
                let next_length = self.length + 1;
                if next_length > self.to {
                    self.exhausted = true;
                    return Step::Exhausted;
                }
                self.reset(next_length);
                i = self.length;
                continue;
            }
            i -= 1;
            if self.digits[i] == usize::MAX {
                self.digits[i] = 0;
                return Step::Emitted;
            }
            self.digits[i] += 1;
            if self.digits[i] < base {
                return Step::Emitted;
            }
            self.digits[i] = 0;
            // carry into the next position to the left
        }
    }

    /// Advances `count` steps without writing candidates anywhere.
    pub fn skip(&mut self, count: usize) {
        for _ in 0..count {
            if let Step::Exhausted = self.step() {
                break;
            }
        }
    }

    /// Emits up to `count` candidates into `out`, returning how many were
    /// written.
    pub fn emit(&mut self, out: &mut [Vec<u8>], count: usize) -> usize {
        let mut produced = 0;
        let budget = count.min(out.len());
        while produced < budget {
            match self.step() {
                Step::Emitted => {
                    self.materialize(&mut out[produced]);
                    produced += 1;
                }
                Step::Exhausted => break,
            }
        }
        produced
    }
}

impl CandidateSource for IncrementalSource {
    fn init(&mut self, _id: usize, _total: usize) -> EngineResult<()> {
        if self.alphabet.is_empty() {
            return Err(EngineError::config("incremental alphabet must not be empty"));
        }
        if self.from == 0 || self.from > self.to {
            return Err(EngineError::config(format!(
                "invalid incremental bounds: from={} to={}",
                self.from, self.to
            )));
        }
        Ok(())
    }

    fn get_words(&mut self, out: &mut [Vec<u8>]) -> usize {
        if self.exhausted {
            return 0;
        }
        self.emit(out, out.len())
    }
}

/// Per-worker partitioning wrapper: skip `k*B`, emit `B`, skip `(W-k-1)*B`.
/// Lives alongside `IncrementalSource` rather than inside `get_words`
/// because the façade needs worker identity (`id`, `total`) at call time,
/// not just at `init` time, to compute the skip amounts.
pub struct PartitionedIncremental {
    inner: IncrementalSource,
    id: usize,
    total: usize,
}

impl PartitionedIncremental {
    pub fn new(inner: IncrementalSource, id: usize, total: usize) -> Self {
        PartitionedIncremental { inner, id, total }
    }
}

impl CandidateSource for PartitionedIncremental {
    fn init(&mut self, id: usize, total: usize) -> EngineResult<()> {
        self.id = id;
        self.total = total.max(1);
        self.inner.init(id, total)
    }

    fn get_words(&mut self, out: &mut [Vec<u8>]) -> usize {
        let b = out.len();
        self.inner.skip(self.id * b);
        let produced = self.inner.emit(out, b);
        self.inner.skip((self.total - self.id - 1) * b);
        produced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(n: usize) -> Vec<Vec<u8>> {
        vec![Vec::new(); n]
    }

    fn strings(buf: &[Vec<u8>], n: usize) -> Vec<String> {
        buf[..n]
            .iter()
            .map(|v| String::from_utf8(v.clone()).unwrap())
            .collect()
    }

    #[test]
    fn single_worker_length_one() {
        let mut src = IncrementalSource::new(1, 1, "ab".to_string());
        src.init(0, 1).unwrap();
        let mut buf = slots(10);
        let n = src.emit(&mut buf, 10);
        assert_eq!(n, 2);
        assert_eq!(strings(&buf, n), vec!["a", "b"]);
    }

    #[test]
    fn length_range_total_count() {
        let mut src = IncrementalSource::new(1, 2, "ab".to_string());
        src.init(0, 1).unwrap();
        let mut buf = slots(100);
        let n = src.emit(&mut buf, 100);
        // a, b, aa, ab, ba, bb = 2^1 + 2^2 = 6
        assert_eq!(n, 6);
        assert_eq!(strings(&buf, n), vec!["a", "b", "aa", "ab", "ba", "bb"]);
    }

    #[test]
    fn exact_length_yields_base_pow_length() {
        let mut src = IncrementalSource::new(3, 3, "abc".to_string());
        src.init(0, 1).unwrap();
        let mut buf = slots(100);
        let n = src.emit(&mut buf, 100);
        assert_eq!(n, 27);
        // no duplicates
        let set: std::collections::HashSet<_> = strings(&buf, n).into_iter().collect();
        assert_eq!(set.len(), 27);
    }

    #[test]
    fn default_alphabet_order_stability() {
        let alphabet = super::super::DEFAULT_ALPHABET;
        let mut src = IncrementalSource::new(1, 1, alphabet.to_string());
        src.init(0, 1).unwrap();
        let mut buf = slots(alphabet.len());
        let n = src.emit(&mut buf, alphabet.len());
        let produced = strings(&buf, n);
        let expected: Vec<String> = alphabet.chars().map(|c| c.to_string()).collect();
        assert_eq!(produced, expected);
    }

    #[test]
    fn partitioned_two_workers_cover_everything_without_overlap() {
        let total = 2;
        let mut all = Vec::new();
        for id in 0..total {
            let inner = IncrementalSource::new(1, 2, "ab".to_string());
            let mut part = PartitionedIncremental::new(inner, id, total);
            part.init(id, total).unwrap();
            loop {
                let mut buf = slots(3);
                let n = part.get_words(&mut buf);
                all.extend(strings(&buf, n));
                if n == 0 {
                    break;
                }
            }
        }
        all.sort();
        let mut expected = vec!["a", "b", "aa", "ab", "ba", "bb"];
        expected.sort();
        assert_eq!(all, expected);
    }

    #[test]
    fn exhausted_source_returns_zero_forever() {
        let mut src = IncrementalSource::new(1, 1, "a".to_string());
        src.init(0, 1).unwrap();
        let mut buf = slots(5);
        assert_eq!(src.emit(&mut buf, 5), 1);
        assert_eq!(src.emit(&mut buf, 5), 0);
        assert_eq!(src.emit(&mut buf, 5), 0);
    }

    #[test]
    fn rejects_empty_alphabet() {
        let mut src = IncrementalSource::new(1, 1, String::new());
        assert!(src.init(0, 1).is_err());
    }
}
