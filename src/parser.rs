//! # Parser Module
//!
//! Reference [`FragmentParser`] for simai fragments: turns fragment text into the
//! parse tree the compiler consumes.
//!
//! ## Grammar
//! ```text
//! fragment   := item*
//! item       := '(' NUMBER ')'                  tempo
//!             | '{' NUMBER '}'                  divisor
//!             | pseudo ('/' pseudo)*            each group
//! pseudo     := note ('`' note)*
//! note       := slide_note | tap_hold_note | touch_tap_hold_note
//! tap_hold   := DIGIT [bhx$@?!]* duration?
//! touch      := REGION DIGIT? [hf]* duration?
//! slide_note := DIGIT [bx$@?!]* slide_beg ('*' slide_beg)*
//! slide_beg  := (connector DIGIT duration? [bx]*)+
//! connector  := - > < ^ v p q pp qq s z w | 'V' DIGIT
//! duration   := '[' (NUMBER '#')? INT ':' INT ']'
//! ```
//!
//! An each group of one note is emitted as the note itself; larger groups become
//! a nested `chain`. A pseudo-each of several notes becomes `pseudo_each[chain]`.
//!
//! ## Example
//! ```rust
//! use simai_fragment::{FragmentParser, NodeKind, SimaiParser};
//!
//! let tree = SimaiParser.parse_fragment("(120){4}1/2h[4:1]").unwrap();
//! let kinds: Vec<NodeKind> = tree.nodes().map(|n| n.kind).collect();
//! assert_eq!(kinds, vec![NodeKind::Tempo, NodeKind::Divisor, NodeKind::Chain]);
//! ```
//!
//! ## Related Modules
//! - `lexer` - Provides tokens to parse
//! - `tree` - Defines the node kinds produced here
//! - `compile` - Consumes the tree

use crate::error::SimaiError;
use crate::lexer::{Lexer, LocatedToken, Token};
use crate::tree::{Child, FragmentParser, Leaf, LeafKind, NodeKind, ParseNode};

const TAP_FLAGS: &str = "bhx$@?!";
const STAR_FLAGS: &str = "bx$@?!";
const TOUCH_FLAGS: &str = "hf";
const SEGMENT_FLAGS: &str = "bx";
const CONNECTORS: &str = "-><^vpqszwV";

/// The built-in simai fragment parser
#[derive(Debug, Clone, Copy, Default)]
pub struct SimaiParser;

impl FragmentParser for SimaiParser {
    fn parse_fragment(&self, text: &str) -> Result<ParseNode, SimaiError> {
        parse(text)
    }
}

/// Parse fragment text into a tree rooted at a `chain` node
pub fn parse(text: &str) -> Result<ParseNode, SimaiError> {
    let tokens = Lexer::new(text).tokenize()?;
    let end_column = text.chars().count() + 1;
    Parser::new(tokens, end_column).parse_fragment()
}

struct Parser {
    tokens: Vec<LocatedToken>,
    position: usize,
    end_column: usize,
}

impl Parser {
    fn new(tokens: Vec<LocatedToken>, end_column: usize) -> Self {
        Self {
            tokens,
            position: 0,
            end_column,
        }
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|t| &t.token)
    }

    /// Next token if it is a `Char`
    fn current_char(&self) -> Option<char> {
        match self.current() {
            Some(Token::Char(c)) => Some(*c),
            _ => None,
        }
    }

    fn advance(&mut self) -> Option<&LocatedToken> {
        let token = self.tokens.get(self.position);
        self.position += 1;
        token
    }

    fn column(&self) -> usize {
        self.tokens
            .get(self.position)
            .map(|t| t.column)
            .unwrap_or(self.end_column)
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, SimaiError> {
        Err(SimaiError::ParseError {
            column: self.column(),
            message: message.into(),
        })
    }

    fn describe_current(&self) -> String {
        match self.current() {
            Some(Token::Char(c)) => format!("'{}'", c),
            Some(Token::Number(n)) => format!("'{}'", n),
            Some(other) => format!("{:?}", other),
            None => "end of fragment".to_string(),
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), SimaiError> {
        if self.current() == Some(&expected) {
            self.advance();
            Ok(())
        } else {
            self.error(format!("Expected {}, found {}", what, self.describe_current()))
        }
    }

    fn number(&mut self) -> Result<String, SimaiError> {
        match self.current() {
            Some(Token::Number(n)) => {
                let n = n.clone();
                self.advance();
                Ok(n)
            }
            _ => self.error(format!("Expected a number, found {}", self.describe_current())),
        }
    }

    fn integer(&mut self) -> Result<String, SimaiError> {
        let column = self.column();
        let n = self.number()?;
        if !n.chars().all(|c| c.is_ascii_digit()) {
            return Err(SimaiError::ParseError {
                column,
                message: format!("Expected a whole number, found '{}'", n),
            });
        }
        Ok(n)
    }

    fn parse_fragment(&mut self) -> Result<ParseNode, SimaiError> {
        let mut children = Vec::new();

        while let Some(token) = self.current() {
            let node = match token {
                Token::LeftParen => self.parse_bracketed(Token::RightParen, NodeKind::Tempo)?,
                Token::LeftBrace => self.parse_bracketed(Token::RightBrace, NodeKind::Divisor)?,
                _ => self.parse_each_group()?,
            };
            children.push(Child::Node(node));
        }

        Ok(ParseNode::new(NodeKind::Chain, children))
    }

    /// `(NUMBER)` or `{NUMBER}`
    fn parse_bracketed(&mut self, closer: Token, kind: NodeKind) -> Result<ParseNode, SimaiError> {
        self.advance();
        let value = self.number()?;
        self.expect(closer, "closing bracket")?;
        Ok(ParseNode::with_leaf(kind, LeafKind::Number, value))
    }

    fn parse_each_group(&mut self) -> Result<ParseNode, SimaiError> {
        let mut notes = vec![self.parse_pseudo_each()?];
        while self.current() == Some(&Token::Slash) {
            self.advance();
            notes.push(self.parse_pseudo_each()?);
        }

        if notes.len() == 1 {
            Ok(notes.remove(0))
        } else {
            Ok(ParseNode::new(
                NodeKind::Chain,
                notes.into_iter().map(Child::Node).collect(),
            ))
        }
    }

    fn parse_pseudo_each(&mut self) -> Result<ParseNode, SimaiError> {
        let mut notes = vec![self.parse_note()?];
        while self.current() == Some(&Token::Backtick) {
            self.advance();
            notes.push(self.parse_note()?);
        }

        if notes.len() == 1 {
            Ok(notes.remove(0))
        } else {
            let chain = ParseNode::new(
                NodeKind::Chain,
                notes.into_iter().map(Child::Node).collect(),
            );
            Ok(ParseNode::new(NodeKind::PseudoEach, vec![Child::Node(chain)]))
        }
    }

    fn parse_note(&mut self) -> Result<ParseNode, SimaiError> {
        match self.current_char() {
            Some(c) if c.is_ascii_digit() => self.parse_button_note(c),
            Some(c) if c.is_ascii_uppercase() && c != 'V' => self.parse_touch_note(c),
            _ => self.error(format!("Expected a note, found {}", self.describe_current())),
        }
    }

    /// A note starting with a button digit: a tap, a hold, or the star of a slide
    fn parse_button_note(&mut self, digit: char) -> Result<ParseNode, SimaiError> {
        self.advance();
        let flags_start = self.position;
        let mut flags = String::new();
        while let Some(c) = self.current_char().filter(|c| TAP_FLAGS.contains(*c)) {
            flags.push(c);
            self.advance();
        }

        if self.at_connector() {
            if let Some(index) = flags.find(|c| !STAR_FLAGS.contains(c)) {
                return Err(SimaiError::ParseError {
                    column: self.tokens[flags_start + index].column,
                    message: "A slide star cannot be a hold".to_string(),
                });
            }
            return self.parse_slide_note(digit, &flags);
        }

        let mut text = String::new();
        text.push(digit);
        text.push_str(&flags);
        let mut children = vec![Child::Leaf(Leaf::new(LeafKind::Text, text))];
        if self.current() == Some(&Token::LeftBracket) {
            children.push(Child::Node(self.parse_duration()?));
        }
        Ok(ParseNode::new(NodeKind::TapHoldNote, children))
    }

    fn parse_touch_note(&mut self, region: char) -> Result<ParseNode, SimaiError> {
        self.advance();
        let mut text = String::new();
        text.push(region);
        if let Some(c) = self.current_char().filter(|c| c.is_ascii_digit()) {
            text.push(c);
            self.advance();
        }
        while let Some(c) = self.current_char().filter(|c| TOUCH_FLAGS.contains(*c)) {
            text.push(c);
            self.advance();
        }

        let mut children = vec![Child::Leaf(Leaf::new(LeafKind::Text, text))];
        if self.current() == Some(&Token::LeftBracket) {
            children.push(Child::Node(self.parse_duration()?));
        }
        Ok(ParseNode::new(NodeKind::TouchTapHoldNote, children))
    }

    fn at_connector(&self) -> bool {
        self.current_char().is_some_and(|c| CONNECTORS.contains(c))
    }

    fn parse_slide_note(&mut self, start: char, star_flags: &str) -> Result<ParseNode, SimaiError> {
        let mut children = vec![Child::Node(ParseNode::with_leaf(
            NodeKind::SlidePos,
            LeafKind::Position,
            start.to_string(),
        ))];
        for flag in star_flags.chars() {
            children.push(Child::Node(ParseNode::with_leaf(
                NodeKind::SlideModifier,
                LeafKind::Modifier,
                flag.to_string(),
            )));
        }

        children.push(Child::Node(self.parse_slide_beg()?));
        while self.current() == Some(&Token::Asterisk) {
            self.advance();
            let chained = self.parse_slide_beg()?;
            children.push(Child::Node(ParseNode::new(
                NodeKind::ChainedSlideNote,
                vec![Child::Node(chained)],
            )));
        }

        Ok(ParseNode::new(NodeKind::SlideNote, children))
    }

    fn parse_slide_beg(&mut self) -> Result<ParseNode, SimaiError> {
        if !self.at_connector() {
            return self.error(format!(
                "Expected a slide connector, found {}",
                self.describe_current()
            ));
        }

        let mut children = Vec::new();
        while self.at_connector() {
            children.push(Child::Node(self.parse_connector()?));

            match self.current_char() {
                Some(c) if c.is_ascii_digit() => {
                    self.advance();
                    children.push(Child::Node(ParseNode::with_leaf(
                        NodeKind::SlidePos,
                        LeafKind::Position,
                        c.to_string(),
                    )));
                }
                _ => {
                    return self.error(format!(
                        "Expected a slide end position, found {}",
                        self.describe_current()
                    ))
                }
            }

            if self.current() == Some(&Token::LeftBracket) {
                children.push(Child::Node(self.parse_duration()?));
            }

            while let Some(c) = self.current_char().filter(|c| SEGMENT_FLAGS.contains(*c)) {
                self.advance();
                children.push(Child::Node(ParseNode::with_leaf(
                    NodeKind::SlideModifier,
                    LeafKind::Modifier,
                    c.to_string(),
                )));
            }
        }

        Ok(ParseNode::new(NodeKind::SlideBeg, children))
    }

    fn parse_connector(&mut self) -> Result<ParseNode, SimaiError> {
        let Some(c) = self.current_char() else {
            return self.error("Expected a slide connector");
        };
        self.advance();

        let text = match c {
            'V' => match self.current_char() {
                Some(reflect) if reflect.is_ascii_digit() => {
                    self.advance();
                    format!("V{}", reflect)
                }
                _ => return self.error("'V' slide needs a reflect position, e.g. 1V35"),
            },
            'p' | 'q' if self.current_char() == Some(c) => {
                self.advance();
                format!("{}{}", c, c)
            }
            _ => c.to_string(),
        };

        Ok(ParseNode::with_leaf(
            NodeKind::SlideConnector,
            LeafKind::Connector,
            text,
        ))
    }

    fn parse_duration(&mut self) -> Result<ParseNode, SimaiError> {
        self.expect(Token::LeftBracket, "'['")?;
        let mut children = Vec::new();

        let first = self.number()?;
        let denominator = if self.current() == Some(&Token::Hash) {
            self.advance();
            children.push(Child::Leaf(Leaf::new(
                LeafKind::EquivalentTempo,
                format!("{}#", first),
            )));
            self.integer()?
        } else if first.chars().all(|c| c.is_ascii_digit()) {
            first
        } else {
            return self.error(format!("Expected a whole number, found '{}'", first));
        };
        children.push(Child::Leaf(Leaf::new(LeafKind::Int, denominator)));

        self.expect(Token::Colon, "':'")?;
        let numerator = self.integer()?;
        children.push(Child::Leaf(Leaf::new(LeafKind::Int, numerator)));
        self.expect(Token::RightBracket, "']'")?;

        Ok(ParseNode::new(NodeKind::Duration, children))
    }
}
