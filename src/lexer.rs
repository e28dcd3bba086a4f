use crate::error::SimaiError;

/// Token types for simai fragment text
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LeftParen,    // ( tempo
    RightParen,   // )
    LeftBrace,    // { divisor
    RightBrace,   // }
    LeftBracket,  // [ duration
    RightBracket, // ]
    Colon,        // : inside a duration
    Hash,         // # inside a duration
    Slash,        // / each
    Backtick,     // ` pseudo-each
    Asterisk,     // * another slide from the same star

    /// Number inside (), {} or []
    Number(String),

    /// Any other character outside brackets: button digits, regions, flags, connectors
    Char(char),
}

/// A token with its 1-based column in the fragment
#[derive(Debug, Clone)]
pub struct LocatedToken {
    pub token: Token,
    pub column: usize,
}

/// Lexer for one simai fragment.
///
/// Digits mean different things inside and outside brackets: `(120)` is a
/// number, `12` outside brackets is two buttons. The lexer tracks which bracket
/// is open and emits `Number` tokens only inside one.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    column: usize,
    closer: Option<char>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            column: 1,
            closer: None,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.column += 1;
        Some(c)
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    fn open(&mut self, closer: char, column: usize, opener: char) -> Result<(), SimaiError> {
        if self.closer.is_some() {
            return Err(SimaiError::ParseError {
                column,
                message: format!("Unexpected '{}' inside brackets", opener),
            });
        }
        self.closer = Some(closer);
        Ok(())
    }

    fn close(&mut self, c: char, column: usize) -> Result<(), SimaiError> {
        if self.closer != Some(c) {
            return Err(SimaiError::ParseError {
                column,
                message: format!("Unmatched '{}'", c),
            });
        }
        self.closer = None;
        Ok(())
    }

    pub fn tokenize(&mut self) -> Result<Vec<LocatedToken>, SimaiError> {
        let mut tokens = Vec::new();

        while let Some(&c) = self.peek() {
            let column = self.column;

            if c.is_whitespace() {
                self.advance();
                continue;
            }

            let token = match c {
                '(' => {
                    self.open(')', column, c)?;
                    self.advance();
                    Token::LeftParen
                }
                '{' => {
                    self.open('}', column, c)?;
                    self.advance();
                    Token::LeftBrace
                }
                '[' => {
                    self.open(']', column, c)?;
                    self.advance();
                    Token::LeftBracket
                }
                ')' | '}' | ']' => {
                    self.close(c, column)?;
                    self.advance();
                    match c {
                        ')' => Token::RightParen,
                        '}' => Token::RightBrace,
                        _ => Token::RightBracket,
                    }
                }
                _ if self.closer.is_some() => self.bracketed(c, column)?,
                '/' => {
                    self.advance();
                    Token::Slash
                }
                '`' => {
                    self.advance();
                    Token::Backtick
                }
                '*' => {
                    self.advance();
                    Token::Asterisk
                }
                _ if c.is_ascii_graphic() => {
                    self.advance();
                    Token::Char(c)
                }
                _ => {
                    return Err(SimaiError::ParseError {
                        column,
                        message: format!("Unexpected character: '{}'", c),
                    });
                }
            };

            tokens.push(LocatedToken { token, column });
        }

        if let Some(closer) = self.closer {
            return Err(SimaiError::ParseError {
                column: self.column,
                message: format!("Missing '{}'", closer),
            });
        }

        Ok(tokens)
    }

    /// Tokens allowed between brackets
    fn bracketed(&mut self, c: char, column: usize) -> Result<Token, SimaiError> {
        match c {
            ':' => {
                self.advance();
                Ok(Token::Colon)
            }
            '#' => {
                self.advance();
                Ok(Token::Hash)
            }
            '0'..='9' | '.' | '-' => {
                let mut number = String::new();
                number.push(c);
                self.advance();
                while let Some(&next) = self.peek() {
                    if next.is_ascii_digit() || next == '.' {
                        number.push(next);
                        self.advance();
                    } else {
                        break;
                    }
                }
                Ok(Token::Number(number))
            }
            _ => Err(SimaiError::ParseError {
                column,
                message: format!("Unexpected character inside brackets: '{}'", c),
            }),
        }
    }
}
