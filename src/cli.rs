//! Command-line surface: argument parsing and translation into a
//! [`SourceDescriptor`] plus a resolved [`Backend`].

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::warn;

use crate::backend::Backend;
use crate::backends::BackendRegistry;
use crate::error::{EngineError, EngineResult};
use crate::rules::RuleSet;
use crate::source::SourceDescriptor;

/// Option letters the engine itself reserves. A backend option letter that
/// collides with one of these is dropped with a warning rather than used.
const ENGINE_LETTERS: &[char] = &['h', 'v', 'i', 'd', 'w', 'r'];

#[derive(Parser, Debug)]
#[command(
    name = "gatecrash",
    about = "Parallel passphrase-cracking engine",
    after_help = "Environment:\n  PD_CHARMAP  overrides the incremental-mode alphabet\n  PD_PLUGINS  reserved for future dynamic backend loading; read but unused"
)]
pub struct Cli {
    /// Backend plug-in to use.
    pub backend: String,

    /// Verbose mode.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Incremental mode: `from[:to]`.
    #[arg(short = 'i', long = "incremental", value_name = "FROM[:TO]")]
    pub incremental: Option<String>,

    /// Dictionary file path.
    #[arg(short = 'd', long = "dictionary", value_name = "FILE")]
    pub dictionary: Option<PathBuf>,

    /// Number of worker threads (default 1, floor 1).
    #[arg(short = 'w', long = "workers", value_name = "N")]
    pub workers: Option<i64>,

    /// Rewriting rules for dictionary mode: letters from AFLWaflwDde, or x
    /// for all.
    #[arg(short = 'r', long = "rules", value_name = "RULES")]
    pub rules: Option<String>,

    /// Everything after the recognized engine flags, forwarded to the
    /// backend (e.g. a target path or credentials string).
    #[arg(trailing_var_arg = true)]
    pub backend_args: Vec<String>,
}

/// Parsed, validated configuration ready to hand to the supervisor.
pub struct ResolvedConfig {
    pub worker_count: usize,
    pub source: Option<SourceDescriptor>,
    pub verbose: bool,
}

impl Cli {
    /// Validates and converts the raw CLI into engine configuration,
    /// forwarding recognized backend options via `accept_option` and handing
    /// whatever is left to `set_target`.
    pub fn resolve(&self, registry: &BackendRegistry) -> EngineResult<(ResolvedConfig, Arc<dyn Backend>)> {
        let backend = registry.build(&self.backend)?;

        let worker_count = match self.workers {
            Some(n) if n < 1 => {
                warn!(requested = n, "worker count below 1, using 1");
                1
            }
            Some(n) => n as usize,
            None => 1,
        };

        let source = self.parse_source()?;

        let usable_letters: Vec<char> = backend
            .option_letters()
            .iter()
            .copied()
            .filter(|letter| {
                let collides = ENGINE_LETTERS.contains(letter);
                if collides {
                    warn!(option = %letter, "backend option collides with an engine option and is ignored");
                }
                !collides
            })
            .collect();

        let remainder = route_backend_options(&self.backend_args, &usable_letters, backend.as_ref())?;
        backend.set_target(&remainder)?;

        Ok((
            ResolvedConfig {
                worker_count,
                source,
                verbose: self.verbose,
            },
            backend,
        ))
    }

    fn parse_source(&self) -> EngineResult<Option<SourceDescriptor>> {
        match (&self.incremental, &self.dictionary) {
            (Some(_), Some(_)) => Err(EngineError::config(
                "-i and -d are mutually exclusive",
            )),
            (Some(spec), None) => Ok(Some(parse_incremental_spec(spec)?)),
            (None, Some(path)) => Ok(Some(SourceDescriptor::Dictionary {
                path: path.clone(),
                rules: self.parse_rules()?,
            })),
            (None, None) => Ok(None),
        }
    }

    fn parse_rules(&self) -> EngineResult<RuleSet> {
        let Some(spec) = &self.rules else {
            return Ok(RuleSet::empty());
        };
        let mut rules = RuleSet::empty();
        for c in spec.chars() {
            match RuleSet::from_letter(c) {
                Some(r) => rules |= r,
                None => return Err(EngineError::config(format!("unknown rule letter '{c}'"))),
            }
        }
        Ok(rules)
    }
}

/// Walks the trailing argv looking for single-letter `-X` tokens the backend
/// declared via `option_letters`, routes each through `accept_option`
/// (consuming the following token as its argument, if there is one), and
/// returns whatever tokens were not claimed — the free-form remainder handed
/// to `set_target`.
fn route_backend_options(
    args: &[String],
    letters: &[char],
    backend: &dyn Backend,
) -> EngineResult<Vec<String>> {
    let mut remainder = Vec::new();
    let mut iter = args.iter();
    while let Some(token) = iter.next() {
        let option_letter = token
            .strip_prefix('-')
            .filter(|rest| rest.chars().count() == 1)
            .and_then(|rest| rest.chars().next())
            .filter(|c| letters.contains(c));

        match option_letter {
            Some(letter) => {
                let arg = iter.next().cloned();
                backend.accept_option(letter, arg.as_deref())?;
            }
            None => remainder.push(token.clone()),
        }
    }
    Ok(remainder)
}

fn parse_incremental_spec(spec: &str) -> EngineResult<SourceDescriptor> {
    let (from, to) = match spec.split_once(':') {
        Some((f, t)) => (parse_len(f)?, parse_len(t)?),
        None => {
            let l = parse_len(spec)?;
            (l, l)
        }
    };
    let alphabet = std::env::var("PD_CHARMAP").unwrap_or_else(|_| crate::source::DEFAULT_ALPHABET.to_string());
    Ok(SourceDescriptor::Incremental { from, to, alphabet })
}

fn parse_len(s: &str) -> EngineResult<usize> {
    s.parse::<usize>()
        .map_err(|_| EngineError::config(format!("invalid length '{s}' in -i argument")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incremental_single_value_sets_from_and_to() {
        match parse_incremental_spec("4").unwrap() {
            SourceDescriptor::Incremental { from, to, .. } => {
                assert_eq!(from, 4);
                assert_eq!(to, 4);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn incremental_range_value() {
        match parse_incremental_spec("2:6").unwrap() {
            SourceDescriptor::Incremental { from, to, .. } => {
                assert_eq!(from, 2);
                assert_eq!(to, 6);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn rejects_garbage_length() {
        assert!(parse_incremental_spec("abc").is_err());
    }

    struct RecordingBackend {
        seen: std::sync::Mutex<Vec<(char, Option<String>)>>,
    }

    impl Backend for RecordingBackend {
        fn name(&self) -> &str {
            "recording"
        }
        fn option_letters(&self) -> &[char] {
            &['x', 'y']
        }
        fn init(&self, _total_workers: usize) -> EngineResult<()> {
            Ok(())
        }
        fn worker_init(&self, _id: usize) -> EngineResult<()> {
            Ok(())
        }
        fn try_phrase(&self, _id: usize, _candidate: &[u8]) -> crate::backend::TryOutcome {
            crate::backend::TryOutcome::Continue
        }
        fn worker_finish(&self, _id: usize) {}
        fn finish(&self) {}
        fn accept_option(&self, opt: char, arg: Option<&str>) -> EngineResult<()> {
            self.seen.lock().unwrap().push((opt, arg.map(str::to_string)));
            Ok(())
        }
    }

    #[test]
    fn route_backend_options_claims_declared_letters_and_their_argument() {
        let backend = RecordingBackend {
            seen: std::sync::Mutex::new(Vec::new()),
        };
        let args: Vec<String> = ["-x", "value", "-y", "target.zip"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let remainder = route_backend_options(&args, &['x', 'y'], &backend).unwrap();
        assert!(remainder.is_empty());
        assert_eq!(
            *backend.seen.lock().unwrap(),
            vec![('x', Some("value".to_string())), ('y', Some("target.zip".to_string()))]
        );
    }

    #[test]
    fn route_backend_options_leaves_unclaimed_tokens_in_the_remainder() {
        let backend = RecordingBackend {
            seen: std::sync::Mutex::new(Vec::new()),
        };
        let args: Vec<String> = ["target.zip", "-x", "value"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let remainder = route_backend_options(&args, &['x'], &backend).unwrap();
        assert_eq!(remainder, vec!["target.zip".to_string()]);
        assert_eq!(*backend.seen.lock().unwrap(), vec![('x', Some("value".to_string()))]);
    }

    #[test]
    fn route_backend_options_ignores_letters_not_declared() {
        let backend = RecordingBackend {
            seen: std::sync::Mutex::new(Vec::new()),
        };
        let args: Vec<String> = ["-z", "value"].iter().map(|s| s.to_string()).collect();
        let remainder = route_backend_options(&args, &['x', 'y'], &backend).unwrap();
        assert_eq!(remainder, vec!["-z".to_string(), "value".to_string()]);
        assert!(backend.seen.lock().unwrap().is_empty());
    }
}
