use super::ast::{AssignOp, Ast, BinOp};
use super::lex::Tokenizer;
use super::token::{Keyword, Token, TokenTag};
use super::Error;

type Result<T> = std::result::Result<T, Error>;

/// Buffered token list over the tokenizer with an index cursor. Tokens
/// are pulled on demand and remembered, so the parser can rewind
/// arbitrarily far with `unread`.
pub struct TokenStream<'a> {
    tokenizer: Tokenizer<'a>,
    tokens: Vec<Token>,
    cursor: usize,
}

impl<'a> TokenStream<'a> {
    pub fn new(src: &'a str) -> TokenStream<'a> {
        TokenStream {
            tokenizer: Tokenizer::new(src),
            tokens: vec![],
            cursor: 0,
        }
    }

    pub fn read(&mut self) -> Result<Token> {
        if self.cursor == self.tokens.len() {
            let token = self.tokenizer.next_token()?;
            self.tokens.push(token);
        }
        let token = self.tokens[self.cursor].clone();
        self.cursor += 1;
        Ok(token)
    }

    pub fn unread(&mut self, n: usize) {
        debug_assert!(n <= self.cursor);
        self.cursor = self.cursor.saturating_sub(n);
    }

    /// Peeks `k` tokens behind the cursor; `prev(0)` is the token most
    /// recently consumed.
    pub fn prev(&self, k: usize) -> Token {
        self.tokens[self.cursor - 1 - k].clone()
    }
}

/// Parses a preprocessed script into its statement list.
pub fn parse(src: &str) -> Result<Vec<Ast>> {
    let mut stream = TokenStream::new(src);
    let mut statements = vec![];
    while let Some(statement) = parse_statement(&mut stream)? {
        statements.push(statement);
    }
    let token = stream.read()?;
    if token.tag != TokenTag::Eof {
        return Err(error!(SyntaxError, token.line; "could not parse the script to the end"));
    }
    Ok(statements)
}

fn parse_statement(stream: &mut TokenStream) -> Result<Option<Ast>> {
    {
        let token = stream.read()?;
        if token.tag == TokenTag::Eof {
            return Ok(None);
        }
        if token.tag.is_eos_like() {
            return Ok(Some(Ast::Empty));
        }
        stream.unread(1);
    }

    let statement = if let Some(label) = parse_label(stream)? {
        label
    } else if let Some(control) = parse_control(stream)? {
        control
    } else if let Some(command) = parse_command(stream)? {
        command
    } else if let Some(assign) = parse_assign(stream)? {
        assign
    } else {
        let token = stream.read()?;
        return Err(error!(SyntaxError, token.line; "cannot parse statement"));
    };

    let token = stream.read()?;
    if !token.tag.is_eos_like() {
        return Err(error!(SyntaxError, token.line;
            format!("unexpected token after statement [{}]", token.content)));
    }
    Ok(Some(statement))
}

fn parse_label(stream: &mut TokenStream) -> Result<Option<Ast>> {
    let token = stream.read()?;
    if token.tag != TokenTag::Mul {
        stream.unread(1);
        return Ok(None);
    }
    let ident = stream.read()?;
    if ident.tag != TokenTag::Identifier {
        stream.unread(2);
        return Ok(None);
    }
    Ok(Some(Ast::Label(ident.content)))
}

fn is_else_token(token: &Token) -> bool {
    token.tag == TokenTag::Identifier && Keyword::from_name(&token.content) == Some(Keyword::Else)
}

fn parse_control(stream: &mut TokenStream) -> Result<Option<Ast>> {
    let ident = stream.read()?;
    if ident.tag != TokenTag::Identifier {
        stream.unread(1);
        return Ok(None);
    }
    let keyword = match Keyword::from_name(&ident.content) {
        Some(keyword) => keyword,
        None => {
            stream.unread(1);
            return Ok(None);
        }
    };

    let statement = match keyword {
        Keyword::End => Ast::End,
        Keyword::Return => {
            let next = stream.read()?;
            stream.unread(1);
            let expr = if next.tag.is_eos_like() {
                None
            } else {
                Some(parse_expression(stream)?.boxed())
            };
            Ast::Return(expr)
        }
        Keyword::Goto | Keyword::Gosub => {
            let label = parse_label(stream)?.ok_or_else(
                || error!(SyntaxError, ident.line; "goto and gosub require a label"),
            )?;
            let name = match label {
                Ast::Label(name) => name,
                _ => unreachable!(),
            };
            if keyword == Keyword::Goto {
                Ast::Goto(name, ident.line)
            } else {
                Ast::Gosub(name, ident.line)
            }
        }
        Keyword::Repeat => {
            let next = stream.read()?;
            stream.unread(1);
            let expr = if next.tag.is_eos_like() {
                None
            } else {
                Some(parse_expression(stream)?.boxed())
            };
            Ast::Repeat(expr, ident.line)
        }
        Keyword::Loop => Ast::Loop(ident.line),
        Keyword::Continue => Ast::Continue,
        Keyword::Break => Ast::Break,
        Keyword::If => parse_if(stream, &ident)?,
        Keyword::Else => {
            return Err(error!(SyntaxError, ident.line; "else without a matching if"));
        }
        // Reserved words without statement forms.
        Keyword::Global | Keyword::Ctype => {
            stream.unread(1);
            return Ok(None);
        }
    };
    Ok(Some(statement))
}

fn parse_if(stream: &mut TokenStream, ident: &Token) -> Result<Ast> {
    let cond = parse_expression(stream)?;
    let next = stream.read()?;

    // Set when a body loop consumed the EOL that also terminates the
    // whole if statement; it is pushed back at the end.
    let mut repair_token = false;

    let mut true_block = Ast::Block(None, None);
    if next.tag == TokenTag::LBrace {
        loop {
            let prev = stream.prev(0);
            if prev.tag == TokenTag::RBrace {
                break;
            }
            let statement = parse_statement(stream)?.ok_or_else(
                || error!(SyntaxError, ident.line; "if body is not closed"),
            )?;
            true_block = Ast::Block(Some(true_block.boxed()), Some(statement.boxed()));
        }
    } else {
        stream.unread(1);
        let colon = stream.read()?;
        if colon.tag != TokenTag::Eos {
            return Err(error!(SyntaxError, colon.line;
                "only { or : may follow an if condition"));
        }
        loop {
            let prev = stream.prev(0);
            if prev.tag == TokenTag::Eol || prev.tag == TokenTag::Eof {
                repair_token = true;
                break;
            }
            let peeked = stream.read()?;
            stream.unread(1);
            if is_else_token(&peeked) {
                break;
            }
            let statement = parse_statement(stream)?.ok_or_else(
                || error!(SyntaxError, ident.line; "if body is not closed"),
            )?;
            true_block = Ast::Block(Some(true_block.boxed()), Some(statement.boxed()));
        }
    }

    let mut false_block = None;
    let next = stream.read()?;
    if is_else_token(&next) {
        repair_token = false;
        let mut block = Ast::Block(None, None);
        let body = stream.read()?;
        if body.tag == TokenTag::LBrace {
            loop {
                let prev = stream.prev(0);
                if prev.tag == TokenTag::RBrace {
                    break;
                }
                let statement = parse_statement(stream)?.ok_or_else(
                    || error!(SyntaxError, next.line; "else body is not closed"),
                )?;
                block = Ast::Block(Some(block.boxed()), Some(statement.boxed()));
            }
        } else {
            stream.unread(1);
            let colon = stream.read()?;
            if colon.tag != TokenTag::Eos {
                return Err(error!(SyntaxError, colon.line; "only { or : may follow else"));
            }
            loop {
                let prev = stream.prev(0);
                if prev.tag == TokenTag::Eol || prev.tag == TokenTag::Eof {
                    repair_token = true;
                    break;
                }
                let peeked = stream.read()?;
                stream.unread(1);
                if is_else_token(&peeked) {
                    break;
                }
                let statement = parse_statement(stream)?.ok_or_else(
                    || error!(SyntaxError, next.line; "else body is not closed"),
                )?;
                block = Ast::Block(Some(block.boxed()), Some(statement.boxed()));
            }
        }
        false_block = Some(block.boxed());
    } else {
        stream.unread(1);
    }

    if repair_token {
        stream.unread(1);
    }

    Ok(Ast::If(cond.boxed(), true_block.boxed(), false_block))
}

fn parse_command(stream: &mut TokenStream) -> Result<Option<Ast>> {
    let ident = stream.read()?;
    if ident.tag != TokenTag::Identifier {
        stream.unread(1);
        return Ok(None);
    }
    let next = stream.read()?;

    let mut is_not_command = next.tag.is_assign();
    // An adjacent parenthesis means an indexed variable, not a command.
    if !ident.right_space && next.tag == TokenTag::LParen {
        is_not_command = true;
    }
    if is_not_command {
        stream.unread(2);
        return Ok(None);
    }

    stream.unread(1);
    let args = if next.tag.is_eos_like() {
        None
    } else {
        Some(parse_arguments(stream)?.boxed())
    };
    Ok(Some(Ast::Command(ident.content, ident.line, args)))
}

fn parse_arguments(stream: &mut TokenStream) -> Result<Ast> {
    let mut items = vec![parse_expression(stream)?];
    loop {
        let token = stream.read()?;
        if token.tag != TokenTag::Comma {
            stream.unread(1);
            break;
        }
        items.push(parse_expression(stream)?);
    }
    let mut chain = None;
    for item in items.into_iter().rev() {
        chain = Some(Ast::Arguments(Some(item.boxed()), chain.map(Ast::boxed)));
    }
    Ok(chain.unwrap())
}

fn parse_assign(stream: &mut TokenStream) -> Result<Option<Ast>> {
    let variable = match parse_variable(stream)? {
        Some(variable) => variable,
        None => return Ok(None),
    };
    let next = stream.read()?;
    let op = match next.tag {
        TokenTag::Assign => AssignOp::Set,
        TokenTag::AddAssign => AssignOp::Add,
        TokenTag::SubAssign => AssignOp::Sub,
        TokenTag::MulAssign => AssignOp::Mul,
        TokenTag::DivAssign => AssignOp::Div,
        TokenTag::ModAssign => AssignOp::Mod,
        TokenTag::BOrAssign => AssignOp::BOr,
        TokenTag::BAndAssign => AssignOp::BAnd,
        TokenTag::BXorAssign => AssignOp::BXor,
        _ => {
            return Err(error!(SyntaxError, next.line; "assignment requires an = operator"));
        }
    };
    let expr = parse_expression(stream)?;
    Ok(Some(Ast::Assign(op, variable.boxed(), expr.boxed())))
}

fn parse_variable(stream: &mut TokenStream) -> Result<Option<Ast>> {
    let ident = stream.read()?;
    if ident.tag != TokenTag::Identifier {
        stream.unread(1);
        return Ok(None);
    }
    let next = stream.read()?;
    if next.tag != TokenTag::LParen {
        stream.unread(1);
        return Ok(Some(Ast::Variable(ident.content, None)));
    }
    let index = parse_expression(stream)?;
    let close = stream.read()?;
    if close.tag != TokenTag::RParen {
        if close.tag == TokenTag::Comma {
            return Err(error!(SyntaxError, close.line;
                "arrays have a single dimension"));
        }
        return Err(error!(SyntaxError, close.line; "array index is not closed"));
    }
    Ok(Some(Ast::Variable(ident.content, Some(index.boxed()))))
}

pub fn parse_expression(stream: &mut TokenStream) -> Result<Ast> {
    parse_borand(stream)
}

fn parse_borand(stream: &mut TokenStream) -> Result<Ast> {
    let mut node = parse_eqneq(stream)?;
    loop {
        let token = stream.read()?;
        let op = match token.tag {
            TokenTag::BOr => BinOp::BOr,
            TokenTag::BAnd => BinOp::BAnd,
            TokenTag::BXor => BinOp::BXor,
            _ => {
                stream.unread(1);
                break;
            }
        };
        let rhs = parse_eqneq(stream)?;
        node = Ast::Binary(op, node.boxed(), rhs.boxed());
    }
    Ok(node)
}

fn parse_eqneq(stream: &mut TokenStream) -> Result<Ast> {
    let mut node = parse_gtlt(stream)?;
    loop {
        let token = stream.read()?;
        let op = match token.tag {
            // A single = in expression position means comparison.
            TokenTag::Eq | TokenTag::Assign => BinOp::Eq,
            TokenTag::Neq => BinOp::Neq,
            _ => {
                stream.unread(1);
                break;
            }
        };
        let rhs = parse_gtlt(stream)?;
        node = Ast::Binary(op, node.boxed(), rhs.boxed());
    }
    Ok(node)
}

fn parse_gtlt(stream: &mut TokenStream) -> Result<Ast> {
    let mut node = parse_addsub(stream)?;
    loop {
        let token = stream.read()?;
        let op = match token.tag {
            TokenTag::Gt => BinOp::Gt,
            TokenTag::GtOrEq => BinOp::GtOrEq,
            TokenTag::Lt => BinOp::Lt,
            TokenTag::LtOrEq => BinOp::LtOrEq,
            _ => {
                stream.unread(1);
                break;
            }
        };
        let rhs = parse_addsub(stream)?;
        node = Ast::Binary(op, node.boxed(), rhs.boxed());
    }
    Ok(node)
}

fn parse_addsub(stream: &mut TokenStream) -> Result<Ast> {
    let mut node = parse_muldivmod(stream)?;
    loop {
        let token = stream.read()?;
        let op = match token.tag {
            TokenTag::Add => BinOp::Add,
            TokenTag::Sub => BinOp::Sub,
            _ => {
                stream.unread(1);
                break;
            }
        };
        let rhs = parse_muldivmod(stream)?;
        node = Ast::Binary(op, node.boxed(), rhs.boxed());
    }
    Ok(node)
}

fn parse_muldivmod(stream: &mut TokenStream) -> Result<Ast> {
    let mut node = parse_term(stream)?;
    loop {
        let token = stream.read()?;
        let op = match token.tag {
            TokenTag::Mul => BinOp::Mul,
            TokenTag::Div => BinOp::Div,
            TokenTag::Mod => BinOp::Mod,
            _ => {
                stream.unread(1);
                break;
            }
        };
        let rhs = parse_term(stream)?;
        node = Ast::Binary(op, node.boxed(), rhs.boxed());
    }
    Ok(node)
}

fn parse_term(stream: &mut TokenStream) -> Result<Ast> {
    let token = stream.read()?;
    if token.tag == TokenTag::Sub {
        return Ok(Ast::UnaryMinus(parse_primitive(stream)?.boxed()));
    }
    stream.unread(1);
    parse_primitive(stream)
}

fn parse_primitive(stream: &mut TokenStream) -> Result<Ast> {
    let token = stream.read()?;
    match token.tag {
        TokenTag::LParen => {
            let node = parse_expression(stream)?;
            let next = stream.read()?;
            if next.tag != TokenTag::RParen {
                return Err(error!(SyntaxError, token.line; "parenthesis is not closed"));
            }
            Ok(Ast::Paren(node.boxed()))
        }
        TokenTag::Integer => Ok(Ast::Int(parse_int_literal(&token.content))),
        TokenTag::Real => Ok(Ast::Real(token.content.parse().unwrap_or(0.0))),
        TokenTag::Str => Ok(Ast::Str(token.content)),
        TokenTag::Mul => {
            stream.unread(1);
            if parse_label(stream)?.is_none() {
                return Err(error!(SyntaxError, token.line; "cannot parse a label"));
            }
            Err(error!(SyntaxError, token.line; "a label is not a value"))
        }
        TokenTag::Identifier => {
            stream.unread(1);
            parse_identifier_expression(stream)
        }
        _ => Err(error!(SyntaxError, token.line;
            format!("cannot parse a primitive value [{}]", token.content))),
    }
}

fn parse_identifier_expression(stream: &mut TokenStream) -> Result<Ast> {
    let ident = stream.read()?;
    debug_assert_eq!(ident.tag, TokenTag::Identifier);

    let next = stream.read()?;
    if next.tag != TokenTag::LParen {
        stream.unread(1);
        return Ok(Ast::IdentExpr(ident.content, ident.line, None));
    }

    {
        let close = stream.read()?;
        if close.tag == TokenTag::RParen {
            let empty = Ast::Arguments(None, None);
            return Ok(Ast::IdentExpr(ident.content, ident.line, Some(empty.boxed())));
        }
        stream.unread(1);
    }

    let args = parse_arguments(stream)?;
    let close = stream.read()?;
    if close.tag != TokenTag::RParen {
        return Err(error!(SyntaxError, close.line;
            "function or array parenthesis is not closed"));
    }
    Ok(Ast::IdentExpr(ident.content, ident.line, Some(args.boxed())))
}

/// Decimal digits folded with wrapping arithmetic, so `2147483648`
/// under a unary minus round-trips to the most negative integer.
fn parse_int_literal(s: &str) -> i32 {
    let mut v: i64 = 0;
    for b in s.bytes() {
        v = v.wrapping_mul(10).wrapping_add(i64::from(b - b'0'));
    }
    v as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(src: &str) -> Ast {
        let mut statements = parse(src).unwrap();
        assert_eq!(statements.len(), 1, "{:?}", statements);
        statements.remove(0)
    }

    #[test]
    fn test_assignment() {
        let ast = parse_one("a = 1");
        assert_eq!(
            ast,
            Ast::Assign(
                AssignOp::Set,
                Ast::Variable("a".into(), None).boxed(),
                Ast::Int(1).boxed()
            )
        );
    }

    #[test]
    fn test_precedence() {
        let ast = parse_one("x = 1 + 2 * 3");
        let product = Ast::Binary(BinOp::Mul, Ast::Int(2).boxed(), Ast::Int(3).boxed());
        let sum = Ast::Binary(BinOp::Add, Ast::Int(1).boxed(), product.boxed());
        assert_eq!(
            ast,
            Ast::Assign(
                AssignOp::Set,
                Ast::Variable("x".into(), None).boxed(),
                sum.boxed()
            )
        );
    }

    #[test]
    fn test_unary_minus_binds_tighter_than_mul() {
        let ast = parse_one("x = -2 * 3");
        let neg = Ast::UnaryMinus(Ast::Int(2).boxed());
        let product = Ast::Binary(BinOp::Mul, neg.boxed(), Ast::Int(3).boxed());
        assert_eq!(
            ast,
            Ast::Assign(
                AssignOp::Set,
                Ast::Variable("x".into(), None).boxed(),
                product.boxed()
            )
        );
    }

    #[test]
    fn test_single_equal_is_comparison_in_expression() {
        let ast = parse_one("x = 1 = 2");
        let cmp = Ast::Binary(BinOp::Eq, Ast::Int(1).boxed(), Ast::Int(2).boxed());
        assert_eq!(
            ast,
            Ast::Assign(
                AssignOp::Set,
                Ast::Variable("x".into(), None).boxed(),
                cmp.boxed()
            )
        );
    }

    #[test]
    fn test_command_with_arguments() {
        let ast = parse_one("mes \"hi\"");
        match ast {
            Ast::Command(name, _, Some(_)) => assert_eq!(name, "mes"),
            other => panic!("not a command: {:?}", other),
        }
    }

    #[test]
    fn test_adjacent_paren_is_array_not_command() {
        let ast = parse_one("a(1) = 2");
        match ast {
            Ast::Assign(AssignOp::Set, lhs, _) => {
                assert_eq!(*lhs, Ast::Variable("a".into(), Some(Ast::Int(1).boxed())));
            }
            other => panic!("not an assignment: {:?}", other),
        }
    }

    #[test]
    fn test_label_and_goto() {
        let statements = parse("*top\ngoto *top").unwrap();
        assert_eq!(statements[0], Ast::Label("top".into()));
        assert!(statements
            .iter()
            .any(|s| matches!(s, Ast::Goto(name, _) if name == "top")));
    }

    #[test]
    fn test_if_else_single_line() {
        let statements = parse("if 1 : a = 1 : else : a = 2").unwrap();
        let has_if = statements
            .iter()
            .any(|s| matches!(s, Ast::If(_, _, Some(_))));
        assert!(has_if, "{:?}", statements);
    }

    #[test]
    fn test_if_block_form() {
        let statements = parse("if 1 { a = 1 } else { a = 2 }").unwrap();
        assert!(statements
            .iter()
            .any(|s| matches!(s, Ast::If(_, _, Some(_)))));
    }

    #[test]
    fn test_multidimensional_index_is_error() {
        assert!(parse("a(1, 2) = 3").is_err());
    }

    #[test]
    fn test_label_in_expression_is_error() {
        assert!(parse("a = *top").is_err());
    }

    #[test]
    fn test_unhandled_else_is_error() {
        assert!(parse("else : a = 1").is_err());
    }

    #[test]
    fn test_int_literal_wraps() {
        assert_eq!(parse_int_literal("2147483648"), i32::MIN);
        assert_eq!(parse_int_literal("2147483647"), i32::MAX);
    }
}
