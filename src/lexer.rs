use std::{iter::Peekable, str::CharIndices};

pub mod error;
pub mod token;

pub use error::{LexError, LexResult};
pub use token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    eof_reached: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            eof_reached: false,
        }
    }

    pub fn next_token(&mut self) -> LexResult<Token<'a>> {
        self.skip_trivia();

        let Some(&(start, ch)) = self.chars.peek() else {
            self.eof_reached = true;
            let end = self.input.len();
            return Ok(Token::new(
                TokenKind::EndMarker,
                "",
                Span { start: end, end },
            ));
        };

        match ch {
            '+' => Ok(self.operator(start, TokenKind::Plus, &[('=', TokenKind::PlusEqual)])),
            '-' => Ok(self.operator(start, TokenKind::Minus, &[('=', TokenKind::MinusEqual)])),
            '%' => Ok(self.single(start, TokenKind::Percent)),
            '@' => Ok(self.operator(start, TokenKind::At, &[('=', TokenKind::AtEqual)])),
            '<' => Ok(self.operator(start, TokenKind::Less, &[('=', TokenKind::LessEqual)])),
            '>' => Ok(self.operator(
                start,
                TokenKind::Greater,
                &[('=', TokenKind::GreaterEqual)],
            )),
            '=' => Ok(self.operator(start, TokenKind::Equal, &[('=', TokenKind::EqEqual)])),
            '*' => {
                self.advance_char();
                if self.next_is('*') {
                    self.advance_char();
                    if self.next_is('=') {
                        self.advance_char();
                        return Ok(self.finish(TokenKind::DoubleStarEqual, start));
                    }
                    return Ok(self.finish(TokenKind::DoubleStar, start));
                }
                if self.next_is('=') {
                    self.advance_char();
                    return Ok(self.finish(TokenKind::StarEqual, start));
                }
                Ok(self.finish(TokenKind::Star, start))
            }
            '/' => Ok(self.operator(
                start,
                TokenKind::Slash,
                &[('/', TokenKind::DoubleSlash), ('=', TokenKind::SlashEqual)],
            )),
            '!' => {
                self.advance_char();
                if self.next_is('=') {
                    self.advance_char();
                    Ok(self.finish(TokenKind::NotEqual, start))
                } else {
                    Err(LexError::UnexpectedCharacter {
                        character: '!',
                        position: start,
                    })
                }
            }
            '(' => Ok(self.single(start, TokenKind::LParen)),
            ')' => Ok(self.single(start, TokenKind::RParen)),
            '[' => Ok(self.single(start, TokenKind::LBracket)),
            ']' => Ok(self.single(start, TokenKind::RBracket)),
            '{' => Ok(self.single(start, TokenKind::LBrace)),
            '}' => Ok(self.single(start, TokenKind::RBrace)),
            ',' => Ok(self.single(start, TokenKind::Comma)),
            ':' => Ok(self.single(start, TokenKind::Colon)),
            '.' => {
                if self.input[start..].starts_with("...") {
                    for _ in 0..3 {
                        self.advance_char();
                    }
                    return Ok(self.finish(TokenKind::Ellipsis, start));
                }
                if self.second_char().is_some_and(|c| c.is_ascii_digit()) {
                    return self.read_number(start);
                }
                Ok(self.single(start, TokenKind::Dot))
            }
            '"' | '\'' => self.read_string(start, ch),
            c if c.is_alphabetic() || c == '_' => Ok(self.read_identifier(start)),
            c if c.is_ascii_digit() => self.read_number(start),
            _ => Err(LexError::UnexpectedCharacter {
                character: ch,
                position: start,
            }),
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.advance_char();
            } else if c == '#' {
                // Comment runs to the end of the line.
                while self.chars.peek().is_some_and(|&(_, c)| c != '\n') {
                    self.advance_char();
                }
            } else {
                break;
            }
        }
    }

    fn single(&mut self, start: usize, kind: TokenKind) -> Token<'a> {
        self.advance_char();
        self.finish(kind, start)
    }

    /// Lexes a one-char operator that may be extended by one of `suffixes`.
    fn operator(
        &mut self,
        start: usize,
        kind: TokenKind,
        suffixes: &[(char, TokenKind)],
    ) -> Token<'a> {
        self.advance_char();
        for &(suffix, extended) in suffixes {
            if self.next_is(suffix) {
                self.advance_char();
                return self.finish(extended, start);
            }
        }
        self.finish(kind, start)
    }

    fn read_identifier(&mut self, start: usize) -> Token<'a> {
        self.advance_char(); // Consume first char
        while self
            .chars
            .peek()
            .is_some_and(|&(_, c)| c.is_alphanumeric() || c == '_')
        {
            self.advance_char();
        }

        let end = self.current_index();
        let kind = match &self.input[start..end] {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            "None" => TokenKind::None,
            _ => TokenKind::Identifier,
        };
        self.finish(kind, start)
    }

    fn read_number(&mut self, start: usize) -> LexResult<Token<'a>> {
        let mut is_float = false;
        self.eat_digits();

        if self.next_is('.') {
            // `1.` and `1.e5` are floats, but `1..` or `1.real` are not part of the literal.
            let after_dot = self.second_char();
            if self.exponent_follows(1)
                || !after_dot.is_some_and(|c| c == '.' || c.is_alphabetic() || c == '_')
            {
                is_float = true;
                self.advance_char();
                self.eat_digits();
            }
        }

        if self.exponent_follows(0) {
            is_float = true;
            self.advance_char();
            if self.next_is('+') || self.next_is('-') {
                self.advance_char();
            }
            self.eat_digits();
        }

        let end = self.current_index();
        let literal = &self.input[start..end];
        let valid = if is_float {
            literal.parse::<f64>().is_ok()
        } else {
            literal.parse::<i64>().is_ok()
        };
        if !valid {
            return Err(LexError::InvalidNumber {
                literal: literal.to_string(),
                position: start,
            });
        }
        Ok(self.finish(TokenKind::Number, start))
    }

    fn read_string(&mut self, start: usize, quote: char) -> LexResult<Token<'a>> {
        self.advance_char(); // Consume opening quote
        while let Some((_, c)) = self.advance_char() {
            if c == '\\' {
                self.advance_char();
            } else if c == quote {
                return Ok(self.finish(TokenKind::String, start));
            } else if c == '\n' {
                break;
            }
        }
        Err(LexError::UnterminatedString { position: start })
    }

    fn eat_digits(&mut self) {
        while self.chars.peek().is_some_and(|&(_, c)| c.is_ascii_digit()) {
            self.advance_char();
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = LexResult<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.eof_reached {
            return None;
        }
        Some(self.next_token())
    }
}

impl<'a> Lexer<'a> {
    fn advance_char(&mut self) -> Option<(usize, char)> {
        self.chars.next()
    }

    fn next_is(&mut self, expected: char) -> bool {
        self.chars.peek().is_some_and(|&(_, c)| c == expected)
    }

    /// Whether an exponent such as `e5` or `E-3` starts `skip` chars ahead.
    fn exponent_follows(&self, skip: usize) -> bool {
        let mut lookahead = self.chars.clone().skip(skip).map(|(_, c)| c).peekable();
        if !lookahead.next().is_some_and(|c| c == 'e' || c == 'E') {
            return false;
        }
        lookahead.next_if(|c| *c == '+' || *c == '-');
        lookahead.next().is_some_and(|c| c.is_ascii_digit())
    }

    fn second_char(&self) -> Option<char> {
        let mut lookahead = self.chars.clone();
        lookahead.next();
        lookahead.next().map(|(_, c)| c)
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }

    fn finish(&mut self, kind: TokenKind, start: usize) -> Token<'a> {
        let end = self.current_index();
        Token::new(kind, &self.input[start..end], Span { start, end })
    }
}

/// Splits one source line into tokens, always ending with an `EndMarker`.
pub fn tokenize(input: &str) -> LexResult<Vec<Token<'_>>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_end = matches!(token.kind, TokenKind::EndMarker);
        tokens.push(token);
        if is_end {
            break;
        }
    }
    Ok(tokens)
}
