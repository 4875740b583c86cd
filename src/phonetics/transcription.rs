//! Simplified French phonemic transcription
//!
//! Words are normalized (case, punctuation, accents, leading articles), looked
//! up in a small lexicon of words common in RSB lists, and otherwise spelled
//! out with grapheme rules. Phonemes are IPA symbols; nasal vowels span two
//! code points, so a phoneme is a `&'static str` rather than a `char`.

use serde::{Deserialize, Serialize};

/// Broad class of a phoneme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhonemeClass {
    Vowel,
    Consonant,
}

/// Place in the French inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhonemeKind {
    OralVowel,
    NasalVowel,
    VoicelessStop,
    VoicedStop,
    VoicelessFricative,
    VoicedFricative,
    Nasal,
    Liquid,
    Glide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhonemeInfo {
    pub symbol: &'static str,
    pub class: PhonemeClass,
    pub kind: PhonemeKind,
    /// French word carrying the sound
    pub example: &'static str,
}

const fn vowel(symbol: &'static str, kind: PhonemeKind, example: &'static str) -> PhonemeInfo {
    PhonemeInfo {
        symbol,
        class: PhonemeClass::Vowel,
        kind,
        example,
    }
}

const fn consonant(symbol: &'static str, kind: PhonemeKind, example: &'static str) -> PhonemeInfo {
    PhonemeInfo {
        symbol,
        class: PhonemeClass::Consonant,
        kind,
        example,
    }
}

/// Standard French phoneme inventory
pub const FRENCH_PHONEMES: &[PhonemeInfo] = &[
    vowel("a", PhonemeKind::OralVowel, "patte"),
    vowel("ɑ", PhonemeKind::OralVowel, "pâte"),
    vowel("e", PhonemeKind::OralVowel, "thé"),
    vowel("ɛ", PhonemeKind::OralVowel, "mère"),
    vowel("i", PhonemeKind::OralVowel, "lit"),
    vowel("o", PhonemeKind::OralVowel, "sot"),
    vowel("ɔ", PhonemeKind::OralVowel, "mort"),
    vowel("u", PhonemeKind::OralVowel, "roue"),
    vowel("y", PhonemeKind::OralVowel, "mur"),
    vowel("ø", PhonemeKind::OralVowel, "peu"),
    vowel("œ", PhonemeKind::OralVowel, "peur"),
    vowel("ə", PhonemeKind::OralVowel, "le"),
    vowel("ã", PhonemeKind::NasalVowel, "plan"),
    vowel("ɛ̃", PhonemeKind::NasalVowel, "fin"),
    vowel("ɔ̃", PhonemeKind::NasalVowel, "bon"),
    vowel("œ̃", PhonemeKind::NasalVowel, "brun"),
    consonant("p", PhonemeKind::VoicelessStop, "pain"),
    consonant("b", PhonemeKind::VoicedStop, "bain"),
    consonant("t", PhonemeKind::VoicelessStop, "temps"),
    consonant("d", PhonemeKind::VoicedStop, "dans"),
    consonant("k", PhonemeKind::VoicelessStop, "car"),
    consonant("g", PhonemeKind::VoicedStop, "gare"),
    consonant("f", PhonemeKind::VoicelessFricative, "feu"),
    consonant("v", PhonemeKind::VoicedFricative, "veux"),
    consonant("s", PhonemeKind::VoicelessFricative, "seau"),
    consonant("z", PhonemeKind::VoicedFricative, "zéro"),
    consonant("ʃ", PhonemeKind::VoicelessFricative, "chat"),
    consonant("ʒ", PhonemeKind::VoicedFricative, "jeu"),
    consonant("m", PhonemeKind::Nasal, "mère"),
    consonant("n", PhonemeKind::Nasal, "nez"),
    consonant("ɲ", PhonemeKind::Nasal, "agneau"),
    consonant("ŋ", PhonemeKind::Nasal, "parking"),
    consonant("l", PhonemeKind::Liquid, "lit"),
    consonant("ʁ", PhonemeKind::Liquid, "rat"),
    consonant("j", PhonemeKind::Glide, "yeux"),
    consonant("w", PhonemeKind::Glide, "oui"),
    consonant("ɥ", PhonemeKind::Glide, "lui"),
];

/// Inventory entry for an IPA symbol
pub fn phoneme_info(symbol: &str) -> Option<&'static PhonemeInfo> {
    FRENCH_PHONEMES.iter().find(|p| p.symbol == symbol)
}

/// Determiners dropped in front of the word proper
const ARTICLES: &[&str] = &["le", "la", "les", "un", "une", "des", "du", "de"];

/// Normalize a word or a short response for transcription
///
/// Lower-cases, strips punctuation and accents, then keeps the first word
/// that is not an article. When every word is an article the last one is
/// kept.
pub fn normalize_word(text: &str) -> String {
    let folded: String = text
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(*c, '.' | ',' | ';' | ':' | '!' | '?' | '\'' | '"' | '(' | ')' | '-'))
        .map(fold_accent)
        .collect();

    let words: Vec<&str> = folded.split_whitespace().collect();
    match words.iter().find(|w| !ARTICLES.contains(*w)) {
        Some(word) => word.to_string(),
        None => words.last().map_or(folded.clone(), |w| w.to_string()),
    }
}

fn fold_accent(c: char) -> char {
    match c {
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'à' | 'â' | 'ä' => 'a',
        'î' | 'ï' => 'i',
        'ô' | 'ö' => 'o',
        'ù' | 'û' | 'ü' => 'u',
        'ÿ' => 'y',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// Phonemes of a word or response
pub fn transcribe(text: &str) -> Vec<&'static str> {
    let word = normalize_word(text);
    match lexicon(&word) {
        Some(phonemes) => phonemes.to_vec(),
        None => transcribe_with_rules(&word),
    }
}

/// Levenshtein distance between the transcriptions of two words
pub fn phonetic_distance(a: &str, b: &str) -> usize {
    edit_distance(&transcribe(a), &transcribe(b))
}

fn edit_distance(a: &[&str], b: &[&str]) -> usize {
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, pa) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, pb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(pa != pb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

fn transcribe_with_rules(word: &str) -> Vec<&'static str> {
    let chars: Vec<char> = word.chars().collect();
    let len = chars.len();
    let at = |i: usize| chars.get(i).copied();
    let mut phonemes = Vec::new();
    let mut i = 0;

    while i < len {
        let trigram = (at(i), at(i + 1), at(i + 2));
        let trigram_phoneme = match trigram {
            (Some('e'), Some('a'), Some('u')) => Some("o"),
            (Some('a' | 'e'), Some('i'), Some('n')) => Some("ɛ̃"),
            _ => None,
        };
        if let Some(phoneme) = trigram_phoneme {
            phonemes.push(phoneme);
            i += 3;
            continue;
        }

        let digraph = match (chars[i], at(i + 1)) {
            ('c', Some('h')) => Some("ʃ"),
            ('q', Some('u')) => Some("k"),
            ('p', Some('h')) => Some("f"),
            ('t', Some('h')) => Some("t"),
            ('g', Some('n')) => Some("ɲ"),
            ('o', Some('u')) => Some("u"),
            ('e', Some('u')) => Some(match at(i + 2) {
                None => "ø",
                Some(next) if is_consonant(next) => "ø",
                Some(_) => "œ",
            }),
            ('a', Some('u')) => Some("o"),
            ('a' | 'e', Some('i')) => Some("ɛ"),
            ('o', Some('n')) => Some("ɔ̃"),
            ('a' | 'e', Some('n')) => Some("ã"),
            ('i' | 'y', Some('n')) => Some("ɛ̃"),
            ('u', Some('n')) => Some("œ̃"),
            _ => None,
        };
        if let Some(phoneme) = digraph {
            phonemes.push(phoneme);
            i += 2;
            continue;
        }

        match chars[i] {
            'a' => phonemes.push("a"),
            // Final e is mute schwa, e before r is open
            'e' if i == len - 1 && len > 1 => phonemes.push("ə"),
            'e' if at(i + 1) == Some('r') => phonemes.push("ɛ"),
            'e' => phonemes.push("e"),
            'i' | 'y' => phonemes.push("i"),
            'o' => phonemes.push("o"),
            'u' => phonemes.push("y"),
            'b' => phonemes.push("b"),
            'c' if matches!(at(i + 1), Some('e' | 'i')) => phonemes.push("s"),
            'c' | 'k' => phonemes.push("k"),
            'd' => phonemes.push("d"),
            'f' => phonemes.push("f"),
            'g' if matches!(at(i + 1), Some('e' | 'i')) => phonemes.push("ʒ"),
            'g' => phonemes.push("g"),
            'j' => phonemes.push("ʒ"),
            'l' => phonemes.push("l"),
            'm' => phonemes.push("m"),
            'n' => phonemes.push("n"),
            'p' => phonemes.push("p"),
            'r' => phonemes.push("ʁ"),
            's' if i > 0 && at(i + 1).is_some_and(is_vowel) && is_vowel(chars[i - 1]) => {
                phonemes.push("z")
            }
            's' => phonemes.push("s"),
            't' => phonemes.push("t"),
            'v' => phonemes.push("v"),
            'w' => phonemes.push("w"),
            'x' => phonemes.extend(["k", "s"]),
            'z' => phonemes.push("z"),
            // h is silent, anything else is not spelled
            _ => {}
        }
        i += 1;
    }
    phonemes
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

fn is_consonant(c: char) -> bool {
    matches!(
        c,
        'b' | 'c' | 'd' | 'f' | 'g' | 'h' | 'j' | 'k' | 'l' | 'm' | 'n' | 'p' | 'q' | 'r' | 's'
            | 't' | 'v' | 'w' | 'x' | 'z'
    )
}

/// Transcriptions of frequent test words, keyed by normalized spelling
fn lexicon(word: &str) -> Option<&'static [&'static str]> {
    let phonemes: &'static [&'static str] = match word {
        "chat" => &["ʃ", "a"],
        "chien" => &["ʃ", "j", "ɛ̃"],
        "pain" => &["p", "ɛ̃"],
        "bain" => &["b", "ɛ̃"],
        "main" => &["m", "ɛ̃"],
        "train" => &["t", "ʁ", "ɛ̃"],
        "grain" => &["g", "ʁ", "ɛ̃"],
        "plein" => &["p", "l", "ɛ̃"],
        "sein" => &["s", "ɛ̃"],
        "soin" => &["s", "w", "ɛ̃"],

        "lait" | "laid" => &["l", "ɛ"],
        "paix" => &["p", "ɛ"],
        "mais" => &["m", "ɛ"],
        "fait" => &["f", "ɛ"],
        "vrai" => &["v", "ʁ", "ɛ"],

        "fou" => &["f", "u"],
        "sous" => &["s", "u"],
        "tout" => &["t", "u"],
        "coup" => &["k", "u"],
        "loup" => &["l", "u"],
        "bout" => &["b", "u"],
        "gout" => &["g", "u"],
        "nous" => &["n", "u"],
        "vous" => &["v", "u"],
        "joue" => &["ʒ", "u"],

        "porte" => &["p", "ɔ", "ʁ", "t"],
        "morte" => &["m", "ɔ", "ʁ", "t"],
        "forte" => &["f", "ɔ", "ʁ", "t"],
        "sorte" => &["s", "ɔ", "ʁ", "t"],
        "corde" => &["k", "ɔ", "ʁ", "d"],

        "pere" => &["p", "ɛ", "ʁ"],
        "mere" => &["m", "ɛ", "ʁ"],
        "frere" => &["f", "ʁ", "ɛ", "ʁ"],
        "terre" => &["t", "ɛ", "ʁ"],
        "verre" => &["v", "ɛ", "ʁ"],
        "guerre" => &["g", "ɛ", "ʁ"],
        "fete" => &["f", "ɛ", "t"],
        "tete" => &["t", "ɛ", "t"],
        "bete" => &["b", "ɛ", "t"],

        "feu" => &["f", "ø"],
        "peu" => &["p", "ø"],
        "deux" => &["d", "ø"],
        "veux" => &["v", "ø"],
        "jeux" => &["ʒ", "ø"],
        "bleu" => &["b", "l", "ø"],

        "peur" => &["p", "œ", "ʁ"],
        "sœur" => &["s", "œ", "ʁ"],
        "cœur" => &["k", "œ", "ʁ"],
        "fleur" => &["f", "l", "œ", "ʁ"],
        "heure" => &["œ", "ʁ"],

        "long" => &["l", "ɔ̃"],
        "pont" => &["p", "ɔ̃"],
        "fond" => &["f", "ɔ̃"],
        "rond" => &["ʁ", "ɔ̃"],
        "sont" => &["s", "ɔ̃"],
        "mont" => &["m", "ɔ̃"],
        "bon" => &["b", "ɔ̃"],
        "ton" => &["t", "ɔ̃"],
        "don" => &["d", "ɔ̃"],

        "blanc" => &["b", "l", "ã"],
        "grand" => &["g", "ʁ", "ã"],
        "plan" => &["p", "l", "ã"],
        "rang" => &["ʁ", "ã"],
        "sang" => &["s", "ã"],
        "dans" => &["d", "ã"],
        "sans" => &["s", "ã"],
        "temps" => &["t", "ã"],
        "champ" => &["ʃ", "ã"],

        "la" => &["l", "a"],
        "le" => &["l", "ə"],
        "de" => &["d", "ə"],
        "un" => &["œ̃"],
        "une" => &["y", "n"],
        "et" => &["e"],
        "ou" => &["u"],
        "si" => &["s", "i"],
        "ni" => &["n", "i"],
        "mi" => &["m", "i"],
        "lit" => &["l", "i"],
        "dit" => &["d", "i"],
        "fit" => &["f", "i"],
        "kit" => &["k", "i", "t"],

        "ba" => &["b", "a"],
        "da" => &["d", "a"],
        "ga" => &["g", "a"],
        "ma" => &["m", "a"],
        "na" => &["n", "a"],
        "pa" => &["p", "a"],
        "ta" => &["t", "a"],
        "va" => &["v", "a"],
        "za" => &["z", "a"],
        "ja" => &["ʒ", "a"],
        "ra" => &["ʁ", "a"],
        "sa" => &["s", "a"],
        "cha" => &["ʃ", "a"],
        "fa" => &["f", "a"],

        "pre" => &["p", "ʁ", "e"],
        "pro" => &["p", "ʁ", "o"],
        "pru" => &["p", "ʁ", "y"],
        "bre" => &["b", "ʁ", "e"],
        "bro" => &["b", "ʁ", "o"],
        "cre" => &["k", "ʁ", "e"],
        "cro" => &["k", "ʁ", "o"],
        "dre" => &["d", "ʁ", "e"],
        "dro" => &["d", "ʁ", "o"],
        "fre" => &["f", "ʁ", "e"],
        "fro" => &["f", "ʁ", "o"],
        "gre" => &["g", "ʁ", "e"],
        "gro" => &["g", "ʁ", "o"],
        "tre" => &["t", "ʁ", "e"],
        "tro" => &["t", "ʁ", "o"],

        "pla" => &["p", "l", "a"],
        "ple" => &["p", "l", "ə"],
        "pli" => &["p", "l", "i"],
        "plo" => &["p", "l", "o"],
        "blu" => &["b", "l", "y"],
        "bla" => &["b", "l", "a"],
        "ble" => &["b", "l", "ə"],
        "bli" => &["b", "l", "i"],
        "blo" => &["b", "l", "o"],
        "cla" => &["k", "l", "a"],
        "cle" => &["k", "l", "e"],
        "cli" => &["k", "l", "i"],
        "clo" => &["k", "l", "o"],
        "flu" => &["f", "l", "y"],
        "fla" => &["f", "l", "a"],
        "fle" => &["f", "l", "ə"],
        "fli" => &["f", "l", "i"],
        "flo" => &["f", "l", "o"],
        "gla" => &["g", "l", "a"],
        "gle" => &["g", "l", "ə"],
        "gli" => &["g", "l", "i"],
        "glo" => &["g", "l", "o"],
        _ => return None,
    };
    Some(phonemes)
}
