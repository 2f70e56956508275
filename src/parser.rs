use crate::ast::{
    AssignOperator, Atom, BinaryOperator, IndexItem, Literal, Node, Slice, UnaryOperator,
};
use crate::lexer::{self, LexError, Span, Token, TokenKind};

pub mod error;

pub use error::{ParseError, ParseResult};

/// Leading keywords of statements that carry no analyzable expression.
const STATEMENT_KEYWORDS: [&str; 24] = [
    "def", "class", "return", "if", "elif", "else", "for", "while", "import", "from", "pass",
    "break", "continue", "with", "try", "except", "finally", "raise", "assert", "del", "global",
    "nonlocal", "lambda", "yield",
];

const ATOM_START: [&str; 5] = ["NAME", "NUMBER", "STRING", "LPAR", "LSQB"];
const BRACE_START: [&str; 1] = ["an expression (dict and set literals are not supported)"];

type BinaryLevel = [(TokenKind, BinaryOperator)];

const BOOLEAN_OPS: &BinaryLevel = &[
    (TokenKind::And, BinaryOperator::And),
    (TokenKind::Or, BinaryOperator::Or),
];
const COMPARISON_OPS: &BinaryLevel = &[
    (TokenKind::EqEqual, BinaryOperator::Eq),
    (TokenKind::NotEqual, BinaryOperator::NotEq),
    (TokenKind::Less, BinaryOperator::Lt),
    (TokenKind::LessEqual, BinaryOperator::LtE),
    (TokenKind::Greater, BinaryOperator::Gt),
    (TokenKind::GreaterEqual, BinaryOperator::GtE),
];
const SUM_OPS: &BinaryLevel = &[
    (TokenKind::Plus, BinaryOperator::Add),
    (TokenKind::Minus, BinaryOperator::Sub),
];
const TERM_OPS: &BinaryLevel = &[
    (TokenKind::Star, BinaryOperator::Mul),
    (TokenKind::Slash, BinaryOperator::Div),
    (TokenKind::DoubleSlash, BinaryOperator::FloorDiv),
    (TokenKind::Percent, BinaryOperator::Mod),
];
const MATMUL_OPS: &BinaryLevel = &[(TokenKind::At, BinaryOperator::MatMul)];

pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    position: usize,
}

impl<'a> Parser<'a> {
    /// `tokens` normally come from [`lexer::tokenize`]; a missing `EndMarker`
    /// is appended.
    pub fn new(mut tokens: Vec<Token<'a>>) -> Self {
        if tokens.last().is_none_or(|token| token.kind != TokenKind::EndMarker) {
            let end = tokens.last().map_or(0, |token| token.span.end);
            tokens.push(Token::new(
                TokenKind::EndMarker,
                "",
                Span { start: end, end },
            ));
        }
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parses the whole line. `Ok(None)` means there is nothing to analyze.
    pub fn parse_line(mut self) -> ParseResult<Option<Node>> {
        match self.current().kind {
            TokenKind::EndMarker => return Ok(None),
            TokenKind::Identifier if STATEMENT_KEYWORDS.contains(&self.current().text) => {
                return Ok(None);
            }
            _ => {}
        }

        let node = self.parse_assignment()?;
        if !self.check(TokenKind::EndMarker) {
            return Err(self.error(&["end of line"]));
        }
        Ok(Some(node))
    }

    fn parse_assignment(&mut self) -> ParseResult<Node> {
        let target = self.parse_expression()?;
        let Some(op) = assign_operator(self.current().kind) else {
            return Ok(target);
        };
        if !matches!(
            target,
            Node::Atom(Atom::Name(_)) | Node::Member { .. } | Node::Index { .. }
        ) {
            return Err(self.error(&["assignable target before assignment"]));
        }
        self.advance();
        let value = self.parse_expression()?;
        Ok(Node::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn parse_expression(&mut self) -> ParseResult<Node> {
        self.parse_binary(BOOLEAN_OPS, Self::parse_comparison)
    }

    fn parse_comparison(&mut self) -> ParseResult<Node> {
        self.parse_binary(COMPARISON_OPS, Self::parse_sum)
    }

    fn parse_sum(&mut self) -> ParseResult<Node> {
        self.parse_binary(SUM_OPS, Self::parse_term)
    }

    fn parse_term(&mut self) -> ParseResult<Node> {
        self.parse_binary(TERM_OPS, Self::parse_matmul)
    }

    fn parse_matmul(&mut self) -> ParseResult<Node> {
        self.parse_binary(MATMUL_OPS, Self::parse_power)
    }

    /// One left-associative precedence level: each operator/operand pair is
    /// folded onto the node built so far.
    fn parse_binary(
        &mut self,
        operators: &BinaryLevel,
        mut operand: impl FnMut(&mut Self) -> ParseResult<Node>,
    ) -> ParseResult<Node> {
        let mut node = operand(self)?;
        while let Some(&(_, op)) = operators
            .iter()
            .find(|(kind, _)| self.check(*kind))
        {
            self.advance();
            let right = operand(self)?;
            node = Node::BinaryOp {
                op,
                left: Box::new(node),
                right: Box::new(right),
            };
        }
        Ok(node)
    }

    fn parse_power(&mut self) -> ParseResult<Node> {
        let base = self.parse_unary()?;
        if !self.check(TokenKind::DoubleStar) {
            return Ok(base);
        }
        self.advance();
        // Right-associative: `a ** b ** c` is `a ** (b ** c)`.
        let exponent = self.parse_power()?;
        Ok(Node::BinaryOp {
            op: BinaryOperator::Pow,
            left: Box::new(base),
            right: Box::new(exponent),
        })
    }

    fn parse_unary(&mut self) -> ParseResult<Node> {
        let op = match self.current().kind {
            TokenKind::Minus => UnaryOperator::Neg,
            TokenKind::Not => UnaryOperator::Not,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Node::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> ParseResult<Node> {
        let mut node = self.parse_primary()?;
        loop {
            match self.current().kind {
                TokenKind::Dot => {
                    self.advance();
                    let member = self.expect(TokenKind::Identifier)?.text.to_string();
                    node = Node::Member {
                        object: Box::new(node),
                        member,
                    };
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_arguments()?;
                    node = Node::Call {
                        callee: Box::new(node),
                        args,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let indices = self.parse_indices()?;
                    node = Node::Index {
                        array: Box::new(node),
                        indices,
                    };
                }
                _ => return Ok(node),
            }
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Node> {
        let token = *self.current();
        let literal = match token.kind {
            TokenKind::Identifier => {
                self.advance();
                return Ok(Node::name(token.text));
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                return Ok(Node::SubExpr {
                    inner: Box::new(inner),
                });
            }
            TokenKind::LBracket => {
                self.advance();
                let elems = self.parse_list_elements()?;
                return Ok(Node::ListLiteral { elems });
            }
            TokenKind::Number => number_literal(&token)?,
            TokenKind::String => Literal::Str {
                text: token.text.to_string(),
                value: unquote(token.text),
            },
            TokenKind::True => Literal::Bool(true),
            TokenKind::False => Literal::Bool(false),
            TokenKind::None => Literal::None,
            TokenKind::LBrace => return Err(self.error(&BRACE_START)),
            _ => return Err(self.error(&ATOM_START)),
        };
        self.advance();
        Ok(Node::Atom(Atom::Literal(literal)))
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Node>> {
        let mut args = Vec::new();
        if self.check(TokenKind::RParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            match self.current().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {
                    self.advance();
                    return Ok(args);
                }
                _ => return Err(self.error(&["COMMA", "RPAR"])),
            }
        }
    }

    fn parse_list_elements(&mut self) -> ParseResult<Vec<Node>> {
        let mut elems = Vec::new();
        if self.check(TokenKind::RBracket) {
            self.advance();
            return Ok(elems);
        }
        loop {
            elems.push(self.parse_expression()?);
            match self.current().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RBracket => {
                    self.advance();
                    return Ok(elems);
                }
                _ => return Err(self.error(&["COMMA", "RSQB"])),
            }
        }
    }

    fn parse_indices(&mut self) -> ParseResult<Vec<IndexItem>> {
        let mut indices = Vec::new();
        loop {
            indices.push(self.parse_index_item()?);
            match self.current().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RBracket => {
                    self.advance();
                    return Ok(indices);
                }
                _ => return Err(self.error(&["COMMA", "RSQB"])),
            }
        }
    }

    fn parse_index_item(&mut self) -> ParseResult<IndexItem> {
        if self.check(TokenKind::Ellipsis) {
            self.advance();
            return Ok(IndexItem::Ellipsis);
        }

        let start = if self.check(TokenKind::Colon) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        if !self.check(TokenKind::Colon) {
            return match start {
                Some(node) => Ok(IndexItem::Expr(*node)),
                None => Err(self.error(&ATOM_START)),
            };
        }
        self.advance();

        let stop = self.parse_slice_bound()?;
        let mut step = None;
        let stepped = self.check(TokenKind::Colon);
        if stepped {
            self.advance();
            step = self.parse_slice_bound()?;
        }

        if start.is_none() && stop.is_none() && !stepped {
            return Ok(IndexItem::Full);
        }
        Ok(IndexItem::Slice(Slice {
            start,
            stop,
            step,
            stepped,
        }))
    }

    fn parse_slice_bound(&mut self) -> ParseResult<Option<Box<Node>>> {
        if matches!(
            self.current().kind,
            TokenKind::Colon | TokenKind::Comma | TokenKind::RBracket
        ) {
            return Ok(None);
        }
        Ok(Some(Box::new(self.parse_expression()?)))
    }

    fn current(&self) -> &Token<'a> {
        &self.tokens[self.position]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token<'a>> {
        let token = *self.current();
        if token.kind == kind {
            self.advance();
            Ok(token)
        } else {
            Err(self.error(&[kind.name()]))
        }
    }

    fn error(&self, expected: &[&'static str]) -> ParseError {
        let token = self.current();
        let found = match token.kind {
            TokenKind::EndMarker => "end of line".to_string(),
            _ => format!("'{}'", token.text),
        };
        ParseError::Syntax {
            position: token.span.start,
            expected: expected.to_vec(),
            found,
        }
    }
}

fn assign_operator(kind: TokenKind) -> Option<AssignOperator> {
    match kind {
        TokenKind::Equal => Some(AssignOperator::Assign),
        TokenKind::PlusEqual => Some(AssignOperator::Add),
        TokenKind::MinusEqual => Some(AssignOperator::Sub),
        TokenKind::StarEqual => Some(AssignOperator::Mul),
        TokenKind::SlashEqual => Some(AssignOperator::Div),
        TokenKind::DoubleStarEqual => Some(AssignOperator::Pow),
        TokenKind::AtEqual => Some(AssignOperator::MatMul),
        _ => None,
    }
}

fn number_literal(token: &Token<'_>) -> ParseResult<Literal> {
    let text = token.text.to_string();
    let invalid = || LexError::InvalidNumber {
        literal: token.text.to_string(),
        position: token.span.start,
    };
    if token.text.contains(['.', 'e', 'E']) {
        let value = token.text.parse::<f64>().map_err(|_| invalid())?;
        Ok(Literal::Float { text, value })
    } else {
        let value = token.text.parse::<i64>().map_err(|_| invalid())?;
        Ok(Literal::Int { text, value })
    }
}

fn unquote(text: &str) -> String {
    let inner = &text[1..text.len().saturating_sub(1).max(1)];
    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => value.push('\n'),
            Some('t') => value.push('\t'),
            Some(escaped @ ('\\' | '\'' | '"')) => value.push(escaped),
            Some(other) => {
                value.push('\\');
                value.push(other);
            }
            None => value.push('\\'),
        }
    }
    value
}

pub fn parse_tokens(tokens: Vec<Token<'_>>) -> ParseResult<Option<Node>> {
    Parser::new(tokens).parse_line()
}

/// Parses one line of code into a tree, or `None` when the line holds no
/// expression worth analyzing (blank, comment, or a statement keyword).
pub fn parse(line: &str) -> ParseResult<Option<Node>> {
    let tokens = lexer::tokenize(line)?;
    parse_tokens(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn squash(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    fn parse_some(line: &str) -> Node {
        parse(line)
            .expect("parse should succeed")
            .expect("line should hold an expression")
    }

    /// Checks both renderings: the source form must reproduce the input and the
    /// debug form must match `expected`, ignoring whitespace in both.
    fn check(line: &str, expected: &str) {
        let node = parse_some(line);
        assert_eq!(squash(&node.to_string()), squash(line), "source form of {line}");
        assert_eq!(
            squash(&node.repr().to_string()),
            squash(expected),
            "debug form of {line}"
        );
    }

    #[test]
    fn assign() {
        check("a = 3", "Assign(op=<EQUAL:=>,lhs=a,rhs=3)");
    }

    #[test]
    fn index_with_full_slice() {
        check("a[:,i,j]", "Index(arr=a, index=[:, i, j])");
        let node = parse_some("a[:,i,j]");
        let Node::Index { indices, .. } = node else {
            panic!("expected index node");
        };
        assert_eq!(indices[0], IndexItem::Full);
    }

    #[test]
    fn literal_list() {
        check(
            "[[1, 2], [3, 4]]",
            "ListLiteral(elems=[ListLiteral(elems=[1, 2]), ListLiteral(elems=[3, 4])])",
        );
    }

    #[test]
    fn literal_array() {
        check(
            "np.array([[1, 2], [3, 4]])",
            indoc! {"
                Call(func=Member(op=<DOT:.>,obj=np,member=array),
                     args=[ListLiteral(elems=[ListLiteral(elems=[1,2]),ListLiteral(elems=[3,4])])])
            "},
        );
    }

    #[test]
    fn method() {
        check(
            "h = torch.tanh(h)",
            "Assign(op=<EQUAL:=>,lhs=h,rhs=Call(func=Member(op=<DOT:.>,obj=torch,member=tanh),args=[h]))",
        );
    }

    #[test]
    fn fields_and_calls() {
        check("a.b", "Member(op=<DOT:.>,obj=a,member=b)");
        check("a.f()", "Call(func=Member(op=<DOT:.>,obj=a,member=f),args=[])");
        check(
            "a.b.c",
            "Member(op=<DOT:.>,obj=Member(op=<DOT:.>,obj=a,member=b),member=c)",
        );
        check(
            "a.f().c",
            "Member(op=<DOT:.>,obj=Call(func=Member(op=<DOT:.>,obj=a,member=f),args=[]),member=c)",
        );
        check(
            "a.b[34]",
            "Index(arr=Member(op=<DOT:.>,obj=a,member=b),index=[34])",
        );
        check(
            "a.b[34].f()",
            "Call(func=Member(op=<DOT:.>,obj=Index(arr=Member(op=<DOT:.>,obj=a,member=b),index=[34]),member=f),args=[])",
        );
    }

    #[test]
    fn parens_wrap_sub_expression() {
        check(
            "(a+b)*c",
            "BinaryOp(op=<STAR:*>,lhs=SubExpr(e=BinaryOp(op=<PLUS:+>,lhs=a,rhs=b)),rhs=c)",
        );
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        check(
            "a+b*c",
            "BinaryOp(op=<PLUS:+>,lhs=a,rhs=BinaryOp(op=<STAR:*>,lhs=b,rhs=c))",
        );
    }

    #[test]
    fn arith() {
        check(
            "(1-z)*h + z*h_",
            indoc! {"
                BinaryOp(op=<PLUS:+>,
                         lhs=BinaryOp(op=<STAR:*>,
                                      lhs=SubExpr(e=BinaryOp(op=<MINUS:->, lhs=1, rhs=z)),
                                      rhs=h),
                         rhs=BinaryOp(op=<STAR:*>,lhs=z,rhs=h_))
            "},
        );
    }

    #[test]
    fn chained_op_is_left_associative() {
        check(
            "a + b + c",
            "BinaryOp(op=<PLUS:+>, lhs=BinaryOp(op=<PLUS:+>, lhs=a, rhs=b), rhs=c)",
        );
    }

    #[test]
    fn matrix_arith() {
        check(
            "self.Whz@h + Uxz@x + bz",
            indoc! {"
                BinaryOp(op=<PLUS:+>,
                         lhs=BinaryOp(op=<PLUS:+>,
                                      lhs=BinaryOp(op=<AT:@>,lhs=Member(op=<DOT:.>,obj=self,member=Whz),rhs=h),
                                      rhs=BinaryOp(op=<AT:@>,lhs=Uxz,rhs=x)),
                         rhs=bz)
            "},
        );
    }

    #[test]
    fn power_is_right_associative() {
        check(
            "a ** b ** c",
            "BinaryOp(op=<DOUBLESTAR:**>, lhs=a, rhs=BinaryOp(op=<DOUBLESTAR:**>, lhs=b, rhs=c))",
        );
    }

    #[test]
    fn matmul_binds_tighter_than_multiplication() {
        check(
            "a * b @ c",
            "BinaryOp(op=<STAR:*>, lhs=a, rhs=BinaryOp(op=<AT:@>, lhs=b, rhs=c))",
        );
    }

    #[test]
    fn unary_operators() {
        check("-x @ W", "BinaryOp(op=<AT:@>, lhs=UnaryOp(op=<MINUS:->, opnd=x), rhs=W)");
        check(
            "not a and b",
            "BinaryOp(op=<AND:and>, lhs=UnaryOp(op=<NOT:not>, opnd=a), rhs=b)",
        );
    }

    #[test]
    fn comparisons_and_augmented_assignment() {
        check(
            "mask = x.sum() >= 0.5",
            "Assign(op=<EQUAL:=>, lhs=mask, rhs=BinaryOp(op=<GREATEREQUAL:>=>, lhs=Call(func=Member(op=<DOT:.>, obj=x, member=sum), args=[]), rhs=0.5))",
        );
        check(
            "self.h @= W",
            "Assign(op=<ATEQUAL:@=>, lhs=Member(op=<DOT:.>, obj=self, member=h), rhs=W)",
        );
        check("out[i] += 1", "Assign(op=<PLUSEQUAL:+=>, lhs=Index(arr=out, index=[i]), rhs=1)");
    }

    #[test]
    fn slices_keep_their_shape() {
        check(
            "x[1:, :-1, ::2, ...]",
            "Index(arr=x, index=[1:, :UnaryOp(op=<MINUS:->, opnd=1), ::2, ...])",
        );
        check("x[a:b:c]", "Index(arr=x, index=[a:b:c])");
        check(
            "x[i+1:n*2]",
            "Index(arr=x, index=[BinaryOp(op=<PLUS:+>, lhs=i, rhs=1):BinaryOp(op=<STAR:*>, lhs=n, rhs=2)])",
        );
    }

    #[test]
    fn literals() {
        check("f('s', \"t\", True, None, 2.5e3)", "Call(func=f, args=['s', \"t\", True, None, 2.5e3])");
        let node = parse_some(r"'a\'b'");
        assert_eq!(
            node,
            Node::Atom(Atom::Literal(Literal::Str {
                text: r"'a\'b'".to_string(),
                value: "a'b".to_string(),
            }))
        );
    }

    #[test]
    fn float_with_bare_dot_and_exponent() {
        assert_eq!(
            parse_some("1.e5"),
            Node::Atom(Atom::Literal(Literal::Float {
                text: "1.e5".to_string(),
                value: 1e5,
            }))
        );
    }

    #[test]
    fn nothing_to_analyze() {
        assert_eq!(parse("").expect("parse"), None);
        assert_eq!(parse("   # just a comment").expect("parse"), None);
        assert_eq!(parse("return x @ y").expect("parse"), None);
        assert_eq!(parse("def f(x):").expect("parse"), None);
    }

    #[test]
    fn rejects_non_target_assignment() {
        let err = parse("a + b = c").expect_err("expected syntax error");
        assert_eq!(
            err,
            ParseError::Syntax {
                position: 6,
                expected: vec!["assignable target before assignment"],
                found: "'='".to_string(),
            }
        );
        assert!(parse("f(x) = 1").is_err());
        assert!(parse("(a) = 1").is_err());
    }

    #[test]
    fn reports_unmatched_bracket() {
        let err = parse("f(a, b").expect_err("expected syntax error");
        assert_eq!(
            err,
            ParseError::Syntax {
                position: 6,
                expected: vec!["COMMA", "RPAR"],
                found: "end of line".to_string(),
            }
        );
        assert_eq!(
            err.to_string(),
            "Syntax error at position 6: expected COMMA or RPAR, found end of line"
        );
    }

    #[test]
    fn reports_missing_operand() {
        let err = parse("a +").expect_err("expected syntax error");
        assert_eq!(err.position(), 3);
        let ParseError::Syntax { expected, .. } = err else {
            panic!("expected syntax error");
        };
        assert_eq!(expected, ATOM_START.to_vec());
    }

    #[test]
    fn rejects_trailing_tokens() {
        let err = parse("a b").expect_err("expected syntax error");
        assert_eq!(
            err,
            ParseError::Syntax {
                position: 2,
                expected: vec!["end of line"],
                found: "'b'".to_string(),
            }
        );
        assert!(parse("a = b = c").is_err());
    }

    #[test]
    fn rejects_brace_literals() {
        let err = parse("f({'a': x})").expect_err("expected syntax error");
        assert_eq!(
            err,
            ParseError::Syntax {
                position: 2,
                expected: BRACE_START.to_vec(),
                found: "'{'".to_string(),
            }
        );
        assert_eq!(
            err.to_string(),
            "Syntax error at position 2: expected an expression (dict and set literals are not supported), found '{'"
        );
    }

    #[test]
    fn surfaces_lex_errors() {
        let err = parse("a ? b").expect_err("expected lex error");
        assert!(matches!(err, ParseError::Lex(LexError::UnexpectedCharacter { .. })));
        assert_eq!(err.position(), 2);
    }
}
