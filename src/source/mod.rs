//! Source façade: a uniform "fill a buffer of candidates for worker k of W"
//! API over the dictionary and incremental candidate generators.

mod dictionary;
mod incremental;

pub use dictionary::DictionarySource;
pub use incremental::{IncrementalSource, PartitionedIncremental};

use crate::error::EngineResult;
use crate::rules::RuleSet;
use tracing::warn;

/// The default alphabet used by incremental mode when no `-i`/`PD_CHARMAP`
/// override is given. Order-sensitive: the k-th emitted string for
/// `from=to=1` is `DEFAULT_ALPHABET[k]`.
pub const DEFAULT_ALPHABET: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ 0123456789-_.,+:;!\"$%^&*()[]{}@#~'?/\\<>|";

/// Maximum candidate length sources will produce.
pub const MAX_WORD_LENGTH: usize = 256;

/// Block size: how many candidates one `get_words` call fills, and the unit
/// of the round-robin partition slice handed to each worker.
pub const WORD_BUFFER_SIZE: usize = 64;

/// Tagged descriptor for which source to build, parsed from the CLI.
#[derive(Debug, Clone)]
pub enum SourceDescriptor {
    Dictionary {
        path: std::path::PathBuf,
        rules: RuleSet,
    },
    Incremental {
        from: usize,
        to: usize,
        alphabet: String,
    },
}

impl Default for SourceDescriptor {
    fn default() -> Self {
        SourceDescriptor::Incremental {
            from: 1,
            to: 8,
            alphabet: DEFAULT_ALPHABET.to_string(),
        }
    }
}

/// Common interface implemented by every candidate generator.
pub trait CandidateSource {
    /// Called once per worker after the worker thread starts.
    fn init(&mut self, id: usize, total: usize) -> EngineResult<()>;

    /// Fills up to `out.len()` slots with the next candidates for this
    /// worker, returning the number of slots actually filled (a short read
    /// means exhaustion).
    fn get_words(&mut self, out: &mut [Vec<u8>]) -> usize;
}

/// The façade itself: dispatches to whichever concrete source the
/// descriptor named.
pub enum Source {
    Dictionary(DictionarySource),
    Incremental(PartitionedIncremental),
}

impl Source {
    /// Builds and initializes a source for worker `id` of `total` from a
    /// descriptor. `charmap_override`, when `Some`, is the `PD_CHARMAP`
    /// environment variable's value and takes precedence over whatever
    /// alphabet the descriptor carries.
    pub fn build(
        descriptor: &SourceDescriptor,
        id: usize,
        total: usize,
        charmap_override: Option<&str>,
    ) -> EngineResult<Source> {
        let mut source = match descriptor {
            SourceDescriptor::Dictionary { path, rules } => {
                if id == 0 {
                    tracing::info!(path = %path.display(), "mode: dictionary");
                }
                Source::Dictionary(DictionarySource::new(path.clone(), *rules))
            }
            SourceDescriptor::Incremental { from, to, alphabet } => {
                let alphabet = charmap_override.unwrap_or(alphabet.as_str());
                let alphabet = dedup_alphabet(alphabet);
                if id == 0 {
                    tracing::info!(from, to, "mode: incremental");
                }
                let inner = IncrementalSource::new(*from, *to, alphabet);
                Source::Incremental(PartitionedIncremental::new(inner, id, total))
            }
        };
        source.init(id, total)?;
        Ok(source)
    }

    /// Builds the default source (incremental 1..=8) used when the CLI gave
    /// neither `-i` nor `-d`.
    pub fn build_default(id: usize, total: usize, charmap_override: Option<&str>) -> EngineResult<Source> {
        if id == 0 {
            warn!("source not explicitly specified; assuming incremental from 1 to 8");
        }
        Source::build(&SourceDescriptor::default(), id, total, charmap_override)
    }
}

impl CandidateSource for Source {
    fn init(&mut self, id: usize, total: usize) -> EngineResult<()> {
        match self {
            Source::Dictionary(d) => d.init(id, total),
            Source::Incremental(i) => i.init(id, total),
        }
    }

    fn get_words(&mut self, out: &mut [Vec<u8>]) -> usize {
        match self {
            Source::Dictionary(d) => d.get_words(out),
            Source::Incremental(i) => i.get_words(out),
        }
    }
}

/// Strips duplicate characters from `alphabet`, keeping the first
/// occurrence of each.
pub fn dedup_alphabet(alphabet: &str) -> String {
    let mut seen = std::collections::HashSet::new();
    alphabet.chars().filter(|c| seen.insert(*c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_occurrence() {
        assert_eq!(dedup_alphabet("aabc"), "abc");
        assert_eq!(dedup_alphabet("abcabc"), "abc");
    }

    #[test]
    fn default_alphabet_has_no_duplicates() {
        let deduped = dedup_alphabet(DEFAULT_ALPHABET);
        assert_eq!(deduped.chars().count(), DEFAULT_ALPHABET.chars().count());
    }
}
