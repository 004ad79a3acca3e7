use cssparser::{ParseError, Parser, ParserInput, Token as CssToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    String,
    Function,
    Div,
    Punct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Word text, unquoted string contents, function name, or the single
    /// divider/punctuation character.
    pub value: String,
    /// Arguments of a `Function` token; empty for every other kind.
    pub nodes: Vec<Token>,
}

impl Token {
    fn leaf(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            nodes: Vec::new(),
        }
    }

    pub fn is_punct(&self, ch: char) -> bool {
        self.kind == TokenKind::Punct && self.value.len() == 1 && self.value.starts_with(ch)
    }

    pub fn is_div(&self, ch: char) -> bool {
        self.kind == TokenKind::Div && self.value.len() == 1 && self.value.starts_with(ch)
    }

    /// Source-like text of the token, used when a function appears where a
    /// scalar is expected.
    pub fn to_text(&self) -> String {
        match self.kind {
            TokenKind::Function => {
                let args = self
                    .nodes
                    .iter()
                    .map(Token::to_text)
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("{}({})", self.value, args)
            }
            _ => self.value.clone(),
        }
    }
}

/// Splits directive parameter text into value tokens. Whitespace and
/// comments are dropped, strings lose their quotes, and blocks nest: a
/// function keeps its arguments in `nodes`, while `{}` and `[]` blocks are
/// flattened between their bracket tokens.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut parser_input = ParserInput::new(input);
    let mut parser = Parser::new(&mut parser_input);
    let mut tokens = Vec::new();
    read_tokens(&mut parser, &mut tokens);
    tokens
}

fn read_tokens(input: &mut Parser<'_, '_>, tokens: &mut Vec<Token>) {
    // Adjacent word-like tokens (`.` + `card`, `#` + `id`) form one word.
    let mut glue = false;

    loop {
        let start = input.position();
        let token = match input.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        let joins_previous = glue;
        glue = false;

        match token {
            CssToken::WhiteSpace(_) | CssToken::Comment(_) | CssToken::CloseParenthesis => {}
            CssToken::QuotedString(value) | CssToken::BadString(value) => {
                tokens.push(Token::leaf(TokenKind::String, value.to_string()));
            }
            CssToken::Comma => tokens.push(Token::leaf(TokenKind::Div, ",")),
            CssToken::Colon => tokens.push(Token::leaf(TokenKind::Div, ":")),
            CssToken::Delim('/') => tokens.push(Token::leaf(TokenKind::Div, "/")),
            CssToken::CurlyBracketBlock => {
                tokens.push(Token::leaf(TokenKind::Punct, "{"));
                read_block(input, tokens);
                tokens.push(Token::leaf(TokenKind::Punct, "}"));
            }
            CssToken::SquareBracketBlock => {
                tokens.push(Token::leaf(TokenKind::Punct, "["));
                read_block(input, tokens);
                tokens.push(Token::leaf(TokenKind::Punct, "]"));
            }
            CssToken::CloseCurlyBracket => tokens.push(Token::leaf(TokenKind::Punct, "}")),
            CssToken::CloseSquareBracket => tokens.push(Token::leaf(TokenKind::Punct, "]")),
            CssToken::Function(name) => {
                let mut nodes = Vec::new();
                read_block(input, &mut nodes);
                tokens.push(Token {
                    kind: TokenKind::Function,
                    value: name.to_string(),
                    nodes,
                });
            }
            CssToken::ParenthesisBlock => {
                let mut nodes = Vec::new();
                read_block(input, &mut nodes);
                tokens.push(Token {
                    kind: TokenKind::Function,
                    value: String::new(),
                    nodes,
                });
            }
            _ => {
                let text = input.slice_from(start);
                match tokens.last_mut() {
                    Some(last) if joins_previous => last.value.push_str(text),
                    _ => tokens.push(Token::leaf(TokenKind::Word, text)),
                }
                glue = true;
            }
        }
    }
}

fn read_block<'i>(input: &mut Parser<'i, '_>, tokens: &mut Vec<Token>) {
    let _ = input.parse_nested_block(|nested| {
        read_tokens(nested, tokens);
        Ok::<(), ParseError<'i, ()>>(())
    });
}
