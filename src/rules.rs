//! Rule-based word rewriting for dictionary mode.
//!
//! A [`Rewriter`] takes one base word at a time and walks through every
//! variant implied by the configured [`RuleSet`], one `get` call at a time,
//! so the dictionary source can interleave variants with reading the next
//! line without buffering the whole expansion in memory.

use bitflags::bitflags;

bitflags! {
    /// Enabled rewrite rule kinds. Configured once at startup and never
    /// mutated afterwards.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RuleSet: u32 {
        const ALL_UPPER             = 1 << 0;
        const FIRST_UPPER           = 1 << 1;
        const LAST_UPPER            = 1 << 2;
        const UPPER_WORD_BEGINNING  = 1 << 3;
        const ALL_LOWER             = 1 << 4;
        const FIRST_LOWER           = 1 << 5;
        const LAST_LOWER            = 1 << 6;
        const LOWER_WORD_BEGINNING  = 1 << 7;
        const PREPEND_DIGIT         = 1 << 8;
        const APPEND_DIGIT          = 1 << 9;
        const LEET_1337             = 1 << 10;
    }
}

impl RuleSet {
    /// The `x` CLI rule letter: every kind at once.
    pub const ALL_RULES: RuleSet = RuleSet::all();

    /// Parses the `-r` option's rule letters, one character per kind.
    /// Unknown letters are ignored by the caller (the CLI layer reports them).
    pub fn from_letter(c: char) -> Option<RuleSet> {
        Some(match c {
            'A' => RuleSet::ALL_UPPER,
            'F' => RuleSet::FIRST_UPPER,
            'L' => RuleSet::LAST_UPPER,
            'W' => RuleSet::UPPER_WORD_BEGINNING,
            'a' => RuleSet::ALL_LOWER,
            'f' => RuleSet::FIRST_LOWER,
            'l' => RuleSet::LAST_LOWER,
            'w' => RuleSet::LOWER_WORD_BEGINNING,
            'D' => RuleSet::PREPEND_DIGIT,
            'd' => RuleSet::APPEND_DIGIT,
            'e' => RuleSet::LEET_1337,
            'x' => RuleSet::ALL_RULES,
            _ => return None,
        })
    }
}

/// Result of one [`Rewriter::get`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteStep {
    /// A variant was written into the caller's buffer.
    Produced,
    /// No more variants for this base word; fetch a new one.
    Exhausted,
    /// The current rule step emitted nothing, but more steps remain; call
    /// `get` again without fetching a new base word.
    Retry,
}

const LEET_MAP: [(u8, u8); 6] = [
    (b'a', b'4'),
    (b'e', b'3'),
    (b'i', b'1'),
    (b'o', b'0'),
    (b's', b'5'),
    (b't', b'7'),
];

/// Enumerates, in a fixed deterministic order, every variant of a base word
/// implied by a [`RuleSet`].
///
/// Each call to [`Rewriter::get`] advances a cursor through a flat plan built
/// once per base word: one step per simple case-folding rule, ten steps for
/// each digit rule, and one step for leet substitution.
pub struct Rewriter {
    rules: RuleSet,
    base: Vec<u8>,
    plan: Vec<PlanStep>,
    cursor: usize,
}

#[derive(Clone, Copy)]
enum PlanStep {
    AllUpper,
    FirstUpper,
    LastUpper,
    UpperWordBeginning,
    AllLower,
    FirstLower,
    LastLower,
    LowerWordBeginning,
    PrependDigit(u8),
    AppendDigit(u8),
    Leet1337,
}

impl Rewriter {
    pub fn new() -> Self {
        Rewriter {
            rules: RuleSet::empty(),
            base: Vec::new(),
            plan: Vec::new(),
            cursor: 0,
        }
    }

    /// Configures which rule kinds are active. Immutable once the first
    /// `get` call has been made for a given base word — callers set this
    /// once at startup.
    pub fn add_rules(&mut self, rules: RuleSet) {
        self.rules = rules;
    }

    pub fn has_rules(&self) -> bool {
        !self.rules.is_empty()
    }

    /// Restarts the variant plan for a new base word. The dictionary source
    /// calls this whenever it reads a fresh line.
    pub fn arm(&mut self, base: &[u8]) {
        self.base.clear();
        self.base.extend_from_slice(base);
        self.cursor = 0;
        self.plan = Self::build_plan(self.rules);
    }

    fn build_plan(rules: RuleSet) -> Vec<PlanStep> {
        let mut plan = Vec::new();
        if rules.contains(RuleSet::ALL_UPPER) {
            plan.push(PlanStep::AllUpper);
        }
        if rules.contains(RuleSet::FIRST_UPPER) {
            plan.push(PlanStep::FirstUpper);
        }
        if rules.contains(RuleSet::LAST_UPPER) {
            plan.push(PlanStep::LastUpper);
        }
        if rules.contains(RuleSet::UPPER_WORD_BEGINNING) {
            plan.push(PlanStep::UpperWordBeginning);
        }
        if rules.contains(RuleSet::ALL_LOWER) {
            plan.push(PlanStep::AllLower);
        }
        if rules.contains(RuleSet::FIRST_LOWER) {
            plan.push(PlanStep::FirstLower);
        }
        if rules.contains(RuleSet::LAST_LOWER) {
            plan.push(PlanStep::LastLower);
        }
        if rules.contains(RuleSet::LOWER_WORD_BEGINNING) {
            plan.push(PlanStep::LowerWordBeginning);
        }
        if rules.contains(RuleSet::PREPEND_DIGIT) {
            for d in b'0'..=b'9' {
                plan.push(PlanStep::PrependDigit(d));
            }
        }
        if rules.contains(RuleSet::APPEND_DIGIT) {
            for d in b'0'..=b'9' {
                plan.push(PlanStep::AppendDigit(d));
            }
        }
        if rules.contains(RuleSet::LEET_1337) {
            plan.push(PlanStep::Leet1337);
        }
        plan
    }

    /// Produces the next variant into `out`, returning whether one was
    /// written, whether the plan is exhausted, or whether the caller should
    /// retry without advancing to a new base word.
    pub fn get(&mut self, out: &mut Vec<u8>) -> RewriteStep {
        if self.cursor >= self.plan.len() {
            return RewriteStep::Exhausted;
        }
        let step = self.plan[self.cursor];
        self.cursor += 1;

        out.clear();
        out.extend_from_slice(&self.base);

        if self.base.is_empty() && !matches!(step, PlanStep::PrependDigit(_) | PlanStep::AppendDigit(_)) {
            // nothing to fold on an empty base word; the step produced
            // nothing but the plan has more entries pending.
            return RewriteStep::Retry;
        }

        match step {
            PlanStep::AllUpper => out.make_ascii_uppercase(),
            PlanStep::FirstUpper => {
                if let Some(b) = out.first_mut() {
                    b.make_ascii_uppercase();
                }
            }
            PlanStep::LastUpper => {
                if let Some(b) = out.last_mut() {
                    b.make_ascii_uppercase();
                }
            }
            PlanStep::UpperWordBeginning => fold_word_beginnings(out, true),
            PlanStep::AllLower => out.make_ascii_lowercase(),
            PlanStep::FirstLower => {
                if let Some(b) = out.first_mut() {
                    b.make_ascii_lowercase();
                }
            }
            PlanStep::LastLower => {
                if let Some(b) = out.last_mut() {
                    b.make_ascii_lowercase();
                }
            }
            PlanStep::LowerWordBeginning => fold_word_beginnings(out, false),
            PlanStep::PrependDigit(d) => out.insert(0, d),
            PlanStep::AppendDigit(d) => out.push(d),
            PlanStep::Leet1337 => apply_leet(out),
        }

        RewriteStep::Produced
    }
}

impl Default for Rewriter {
    fn default() -> Self {
        Self::new()
    }
}

fn fold_word_beginnings(word: &mut [u8], upper: bool) {
    for i in 0..word.len() {
        let at_beginning = i == 0 || word[i - 1].is_ascii_whitespace();
        if at_beginning {
            if upper {
                word[i].make_ascii_uppercase();
            } else {
                word[i].make_ascii_lowercase();
            }
        }
    }
}

fn apply_leet(word: &mut [u8]) {
    for b in word.iter_mut() {
        let lower = b.to_ascii_lowercase();
        if let Some((_, digit)) = LEET_MAP.iter().find(|(letter, _)| *letter == lower) {
            *b = *digit;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_variants(rules: RuleSet, base: &str) -> Vec<String> {
        let mut rw = Rewriter::new();
        rw.add_rules(rules);
        rw.arm(base.as_bytes());
        let mut out = Vec::new();
        let mut buf = Vec::new();
        loop {
            match rw.get(&mut buf) {
                RewriteStep::Produced => out.push(String::from_utf8(buf.clone()).unwrap()),
                RewriteStep::Retry => continue,
                RewriteStep::Exhausted => break,
            }
        }
        out
    }

    #[test]
    fn all_upper() {
        assert_eq!(collect_variants(RuleSet::ALL_UPPER, "hello"), vec!["HELLO"]);
    }

    #[test]
    fn first_and_last() {
        assert_eq!(
            collect_variants(RuleSet::FIRST_UPPER | RuleSet::LAST_UPPER, "cat"),
            vec!["Cat".to_string(), "caT".to_string()]
        );
    }

    #[test]
    fn word_beginnings() {
        assert_eq!(
            collect_variants(RuleSet::UPPER_WORD_BEGINNING, "foo bar baz"),
            vec!["Foo Bar Baz"]
        );
    }

    #[test]
    fn append_digit_emits_ten() {
        let variants = collect_variants(RuleSet::APPEND_DIGIT, "Pw");
        assert_eq!(variants.len(), 10);
        assert_eq!(variants[0], "Pw0");
        assert_eq!(variants[7], "Pw7");
        assert_eq!(variants[9], "Pw9");
    }

    #[test]
    fn prepend_digit_emits_ten() {
        let variants = collect_variants(RuleSet::PREPEND_DIGIT, "ab");
        assert_eq!(variants[3], "3ab");
    }

    #[test]
    fn leet_substitutes_every_position() {
        assert_eq!(collect_variants(RuleSet::LEET_1337, "elite"), vec!["3l173"]);
    }

    #[test]
    fn determinism_across_runs() {
        let rules = RuleSet::ALL_RULES;
        let first = collect_variants(rules, "password");
        let second = collect_variants(rules, "password");
        assert_eq!(first, second);
    }

    #[test]
    fn letter_parsing() {
        assert_eq!(RuleSet::from_letter('A'), Some(RuleSet::ALL_UPPER));
        assert_eq!(RuleSet::from_letter('x'), Some(RuleSet::ALL_RULES));
        assert_eq!(RuleSet::from_letter('?'), None);
    }
}
