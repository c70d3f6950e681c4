//! Contextual keywords.
//!
//! Keywords are lexed as ordinary identifiers; the parser decides from
//! context whether `for` or `if` starts a construct or names a variable.

use std::str::FromStr;

use super::token::Token;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display, strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Keyword {
    True,
    False,
    Null,
    For,
    In,
    If,
    Else,
    EndIf,
    EndFor,
}

impl Token {
    /// Interprets an identifier token as a keyword, if it spells one.
    pub fn keyword(&self) -> Option<Keyword> {
        match self {
            Token::Identifier(name) => Keyword::from_str(name).ok(),
            _ => None,
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.keyword() == Some(keyword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_spelling() {
        assert_eq!(Keyword::from_str("endif").unwrap(), Keyword::EndIf);
        assert_eq!(Keyword::EndFor.to_string(), "endfor");
        assert!(Keyword::from_str("For").is_err());
    }

    #[test]
    fn test_identifier_as_keyword() {
        let token = Token::Identifier("null".to_string());
        assert!(token.is_keyword(Keyword::Null));
        assert_eq!(Token::Identifier("nil".to_string()).keyword(), None);
    }
}
