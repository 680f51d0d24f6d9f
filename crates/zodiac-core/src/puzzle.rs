//! The daily puzzle and the collaborators that feed it.
//!
//! Sentence generation and zodiac lookup sit behind traits; whatever they
//! return is validated here before it is encoded.

use chrono::{Datelike, NaiveDate};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::accounts::Profile;
use crate::cipher;
use crate::clock::Clock;
use crate::error::{Result, ZodiacError};
use crate::settings::SentenceRules;
use crate::storage;
use crate::store::KeyValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZodiacSign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

// First day of each sign, in calendar order.
const CUSPS: [(u32, u32, ZodiacSign); 12] = [
    (1, 20, ZodiacSign::Aquarius),
    (2, 19, ZodiacSign::Pisces),
    (3, 21, ZodiacSign::Aries),
    (4, 20, ZodiacSign::Taurus),
    (5, 21, ZodiacSign::Gemini),
    (6, 21, ZodiacSign::Cancer),
    (7, 23, ZodiacSign::Leo),
    (8, 23, ZodiacSign::Virgo),
    (9, 23, ZodiacSign::Libra),
    (10, 23, ZodiacSign::Scorpio),
    (11, 22, ZodiacSign::Sagittarius),
    (12, 22, ZodiacSign::Capricorn),
];

impl ZodiacSign {
    pub fn for_date(date: NaiveDate) -> Self {
        let key = (date.month(), date.day());
        CUSPS
            .iter()
            .rev()
            .find(|(month, day, _)| key >= (*month, *day))
            .map_or(ZodiacSign::Capricorn, |(_, _, sign)| *sign)
    }
}

impl fmt::Display for ZodiacSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub trait ZodiacResolver {
    fn from_birthday(&self, birthday: NaiveDate) -> Option<ZodiacSign>;
}

pub trait PuzzleGenerator {
    fn generate_deed_sentence(&self, sign: ZodiacSign) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TropicalZodiac;

impl ZodiacResolver for TropicalZodiac {
    fn from_birthday(&self, birthday: NaiveDate) -> Option<ZodiacSign> {
        Some(ZodiacSign::for_date(birthday))
    }
}

/// Offline generator drawing from a fixed list of deeds.
#[derive(Debug, Clone)]
pub struct PhraseBook {
    phrases: Vec<String>,
}

impl PhraseBook {
    pub fn new(phrases: Vec<String>) -> Self {
        Self { phrases }
    }
}

impl Default for PhraseBook {
    fn default() -> Self {
        Self::new(
            [
                "Hold the door open for a stranger",
                "Write a thank you note to a friend",
                "Pick up three pieces of litter outside",
                "Call someone you have not spoken to in a while",
                "Give a sincere compliment to a coworker",
                "Share a meal or a snack with someone",
                "Let another driver merge ahead of you",
                "Donate something you no longer need",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        )
    }
}

impl PuzzleGenerator for PhraseBook {
    fn generate_deed_sentence(&self, _sign: ZodiacSign) -> anyhow::Result<String> {
        self.phrases
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("phrase book is empty"))
    }
}

/// Trims generated text and rejects it if it is too short or too wordy.
pub fn validate_sentence(raw: &str, rules: &SentenceRules) -> Result<String> {
    let sentence = raw.trim();
    if sentence.chars().count() < rules.min_chars {
        return Err(ZodiacError::validation(format!(
            "sentence shorter than {} characters",
            rules.min_chars
        )));
    }
    let words = sentence.split_whitespace().count();
    if words > rules.max_words {
        return Err(ZodiacError::validation(format!(
            "sentence has {words} words, limit is {}",
            rules.max_words
        )));
    }
    Ok(sentence.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Puzzle {
    pub sentence: String,
    pub encoded: String,
    pub shift: u8,
    pub hint: u8,
    pub sign: ZodiacSign,
    pub issued_on: NaiveDate,
}

impl Puzzle {
    pub fn new(sentence: String, sign: ZodiacSign, issued_on: NaiveDate) -> Self {
        let encoded = cipher::encode(&sentence);
        Self {
            hint: cipher::decode_hint(encoded.shift),
            encoded: encoded.encoded,
            shift: encoded.shift,
            sentence,
            sign,
            issued_on,
        }
    }

    pub fn check(&self, answer: &str) -> bool {
        cipher::verify(answer, &self.sentence)
    }
}

/// Issues one puzzle per account per day and remembers it between calls.
pub struct PuzzleDesk<S, C> {
    store: S,
    clock: C,
    rules: SentenceRules,
}

impl<S: KeyValueStore, C: Clock> PuzzleDesk<S, C> {
    pub fn new(store: S, clock: C, rules: SentenceRules) -> Self {
        Self { store, clock, rules }
    }

    /// Today's puzzle for `email`, if one was issued.
    pub fn current(&self, email: &str) -> Result<Option<Puzzle>> {
        let today = self.clock.today();
        Ok(storage::load_puzzle(&self.store, email)?.filter(|p| p.issued_on == today))
    }

    pub fn issue(
        &self,
        profile: &Profile,
        generator: &dyn PuzzleGenerator,
        resolver: &dyn ZodiacResolver,
    ) -> Result<Puzzle> {
        if let Some(existing) = self.current(&profile.email)? {
            debug!(email = %profile.email, "reusing today's puzzle");
            return Ok(existing);
        }
        let sign = resolver.from_birthday(profile.birthday).ok_or_else(|| {
            ZodiacError::validation(format!("no zodiac sign for {}", profile.birthday))
        })?;
        let raw = generator.generate_deed_sentence(sign).map_err(|err| {
            warn!(error = %err, %sign, "deed sentence generation failed");
            ZodiacError::validation(format!("could not generate a deed: {err}"))
        })?;
        let sentence = validate_sentence(&raw, &self.rules)?;
        let puzzle = Puzzle::new(sentence, sign, self.clock.today());
        storage::save_puzzle(&self.store, &profile.email, &puzzle)?;
        debug!(email = %profile.email, %sign, shift = puzzle.shift, "puzzle issued");
        Ok(puzzle)
    }

    pub fn check(&self, email: &str, answer: &str) -> Result<bool> {
        let puzzle = self
            .current(email)?
            .ok_or_else(|| ZodiacError::NotFound(format!("no puzzle issued today for {email}")))?;
        Ok(puzzle.check(answer))
    }
}
