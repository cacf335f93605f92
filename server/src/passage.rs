//! Passage text for races.
//!
//! Hosts normally send the passage along with `start-game`. When they don't,
//! the room asks its `PassageProvider` for one matching the room's passage
//! type.

use rand::seq::SliceRandom;
use rand::Rng;
use shared::PassageType;

pub const PASSAGE_WORDS: usize = 50;
const WORDS_PER_SENTENCE: usize = 10;
const CODE_SNIPPETS_PER_PASSAGE: usize = 4;

const WORD_BANK: &[&str] = &[
    "about", "above", "across", "after", "again", "against", "almost", "along", "already",
    "always", "among", "answer", "around", "away", "back", "because", "become", "before",
    "begin", "behind", "below", "between", "both", "bring", "build", "call", "came", "carry",
    "change", "city", "close", "come", "could", "country", "cover", "cross", "day", "different",
    "does", "down", "during", "each", "early", "earth", "enough", "even", "every", "example",
    "face", "family", "far", "feel", "few", "find", "first", "follow", "food", "form", "found",
    "friend", "from", "give", "good", "great", "group", "grow", "hand", "hard", "head", "hear",
    "help", "here", "high", "home", "house", "idea", "important", "keep", "kind", "know",
    "land", "large", "last", "later", "learn", "leave", "life", "light", "line", "little",
    "live", "long", "look", "made", "make", "many", "mean", "might", "mountain", "move", "much",
    "must", "name", "near", "need", "never", "next", "night", "number", "often", "once", "only",
    "open", "order", "other", "over", "paper", "part", "people", "place", "plant", "point",
    "possible", "question", "quick", "read", "right", "river", "road", "same", "school", "second",
    "should", "show", "side", "small", "sound", "start", "still", "story", "study", "such",
    "take", "tell", "their", "there", "these", "thing", "think", "those", "thought", "through",
    "time", "together", "turn", "under", "until", "very", "walk", "want", "watch", "water",
    "where", "while", "white", "without", "word", "work", "world", "would", "write", "year",
    "young",
];

const CODE_BANK: &[&str] = &[
    "let total = items.iter().map(|item| item.price).sum::<u32>();",
    "if let Some(user) = users.get(&id) { println!(\"{}\", user.name); }",
    "for (index, value) in values.iter().enumerate() { sum += index * value; }",
    "fn add(a: i32, b: i32) -> i32 { a + b }",
    "const result = await fetch(url).then((res) => res.json());",
    "match state { State::Idle => start(), State::Busy => wait() }",
    "let mut map = HashMap::new(); map.insert(key, value);",
    "while queue.len() > 0 { let next = queue.pop_front(); }",
    "def area(radius): return 3.14159 * radius ** 2",
    "items.sort_by(|a, b| b.score.cmp(&a.score));",
    "export function clamp(x, lo, hi) { return Math.min(Math.max(x, lo), hi); }",
    "let words: Vec<&str> = text.split_whitespace().collect();",
];

pub trait PassageProvider: Send + Sync {
    fn passage(&self, kind: PassageType) -> String;
}

/// Random passages drawn from built-in word and snippet banks.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordBankPassages;

impl WordBankPassages {
    pub fn text_passage<R: Rng + ?Sized>(rng: &mut R) -> String {
        let words: Vec<&str> = (0..PASSAGE_WORDS)
            .filter_map(|_| WORD_BANK.choose(rng).copied())
            .collect();

        let sentences: Vec<String> = words
            .chunks(WORDS_PER_SENTENCE)
            .map(|chunk| format!("{}.", capitalize(&chunk.join(" "))))
            .collect();

        normalize_whitespace(&sentences.join(" "))
    }

    pub fn code_passage<R: Rng + ?Sized>(rng: &mut R) -> String {
        let snippets: Vec<&str> = CODE_BANK
            .choose_multiple(rng, CODE_SNIPPETS_PER_PASSAGE)
            .copied()
            .collect();
        normalize_whitespace(&snippets.join(" "))
    }
}

impl PassageProvider for WordBankPassages {
    fn passage(&self, kind: PassageType) -> String {
        let mut rng = rand::thread_rng();
        match kind {
            PassageType::Text => Self::text_passage(&mut rng),
            PassageType::Code => Self::code_passage(&mut rng),
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
