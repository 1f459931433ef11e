//! Splitting entry text into index tokens.

/// Why a token was filed under an entry. Also used as a secondary sort key
/// among the entries of a token, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryTypeTag {
    /// The token is the whole text of the entry.
    Headword,
    /// The token is one word out of several.
    Word,
    /// The token comes from a free-text note.
    Note,
    /// The token is an alternate form, such as one part of a compound.
    Redirect,
}

impl EntryTypeTag {
    /// Test if the tag counts as a directly attached entry.
    pub fn is_main(&self) -> bool {
        !matches!(self, EntryTypeTag::Redirect)
    }
}

/// A token extracted from entry text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub tag: EntryTypeTag,
}

/// Extracts tokens from text.
pub trait Tokenizer: Send + Sync {
    /// Append the tokens in `text` to `output`.
    fn tokenize<'a>(&self, text: &'a str, output: &mut Vec<Token<'a>>);
}

/// Splits on whitespace and punctuation, keeping apostrophes and hyphens
/// which appear inside of words. The parts of hyphenated words are emitted
/// as redirects.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleTokenizer;

impl Tokenizer for SimpleTokenizer {
    fn tokenize<'a>(&self, text: &'a str, output: &mut Vec<Token<'a>>) {
        let start = output.len();

        for word in text.split(|c: char| !is_word_char(c)) {
            let word = word.trim_matches(is_joiner);

            if word.is_empty() {
                continue;
            }

            output.push(Token {
                text: word,
                tag: EntryTypeTag::Word,
            });
        }

        let words = output.len() - start;

        if words == 1 {
            output[start].tag = EntryTypeTag::Headword;
        }

        for index in start..start + words {
            let word = output[index].text;

            if !word.contains('-') {
                continue;
            }

            for part in word.split('-') {
                let part = part.trim_matches(is_joiner);

                if !part.is_empty() {
                    output.push(Token {
                        text: part,
                        tag: EntryTypeTag::Redirect,
                    });
                }
            }
        }
    }
}

/// Count the tokens which are directly attached.
pub fn main_token_count(tokens: &[Token<'_>]) -> u32 {
    tokens.iter().filter(|t| t.tag.is_main()).count() as u32
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || is_joiner(c)
}

fn is_joiner(c: char) -> bool {
    matches!(c, '\'' | '-' | '’')
}
