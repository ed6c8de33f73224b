//! Parser for the Ember Scripting Language
//!
//! This module implements a recursive descent parser with operator
//! precedence climbing to convert a token stream into an Abstract Syntax
//! Tree. The parser handles the complete Ember grammar: declarations,
//! assignments, control flow, function definitions and expressions.
//!
//! ## Parser Architecture
//!
//! Expression parsing walks a chain of methods, one per precedence level,
//! from lowest to highest:
//!
//! ```text
//! Precedence Levels (lowest to highest):
//! 1.  Logical OR (or)             - left-associative
//! 2.  Logical AND (and)           - left-associative
//! 3.  Bitwise OR (|)              - left-associative
//! 4.  Bitwise XOR (^)             - left-associative
//! 5.  Bitwise AND (&)             - left-associative
//! 6.  Equality (==, !=)           - left-associative
//! 7.  Relational (<, >, <=, >=)   - left-associative
//! 8.  Shift (<<, >>)              - left-associative
//! 9.  Additive (+, -)             - left-associative
//! 10. Multiplicative (*, /, %)    - left-associative
//! Unary (-, not)                  - right-associative, tighter than binary
//! Postfix (call, index)           - tightest, repeats greedily
//! ```
//!
//! ## Statement Dispatch
//!
//! Statements are distinguished by their leading keyword (`let`, `const`,
//! `fn`, `if`, `while`, `for`, `return`); anything else is parsed as an
//! expression, optionally followed by `=` to become an assignment.
//!
//! ## Newline Handling
//! Newlines terminate statements. Blocks are delimited by keywords
//! (`end`, `else`, `elif`) rather than braces, so newlines inside a block
//! are skipped wherever a new statement may start.

use crate::ast::*;
use crate::error::{EmberError, Location, Result};
use crate::lexer::{Token, TokenKind};

/// Recursive descent parser for the Ember scripting language.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    /// Parses the complete token stream into a `Program`.
    ///
    /// ```text
    /// program → statement* EOF
    /// ```
    pub fn parse(&mut self) -> Result<Program> {
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.is_at_end() {
            statements.push(self.statement()?);
            self.skip_newlines();
        }
        Ok(Program { statements })
    }

    // ---------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------

    fn statement(&mut self) -> Result<Statement> {
        match self.peek_kind() {
            TokenKind::Let | TokenKind::Const => self.var_decl(),
            TokenKind::Fn => self.fn_decl(),
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::For => self.for_statement(),
            TokenKind::Return => self.return_statement(),
            _ => self.assignment_or_expr_statement(),
        }
    }

    /// `("let" | "const") IDENT (":" IDENT)? "=" expression`
    fn var_decl(&mut self) -> Result<Statement> {
        let (line, col) = self.loc();
        let is_const = matches!(self.peek_kind(), TokenKind::Const);
        self.advance();

        let name = self.expect_ident()?;
        let mut type_ann = None;
        if self.check(&TokenKind::Colon) {
            self.advance();
            type_ann = Some(self.expect_ident()?);
        }
        self.expect(&TokenKind::Assign, "Expected '='")?;
        let value = self.expression()?;
        self.skip_newlines();

        Ok(Statement::VarDecl {
            name,
            type_ann,
            value,
            is_const,
            line,
            col,
        })
    }

    /// `"fn" IDENT "(" (IDENT ":" IDENT ("," IDENT ":" IDENT)*)? ")" ("->" IDENT)? statement* "end"`
    fn fn_decl(&mut self) -> Result<Statement> {
        let (line, col) = self.loc();
        self.advance(); // 'fn'

        let name = self.expect_ident()?;
        self.expect(&TokenKind::LParen, "Expected '(' after function name")?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let pname = self.expect_ident()?;
                self.expect(&TokenKind::Colon, "Expected ':' after parameter name")?;
                let ptype = self.expect_ident()?;
                params.push(Param {
                    name: pname,
                    type_ann: ptype,
                });
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "Expected ')' after parameter list")?;

        let mut return_type = None;
        if self.check(&TokenKind::Arrow) {
            self.advance();
            return_type = Some(self.expect_ident()?);
        }
        self.skip_newlines();

        let body = self.parse_block(&[TokenKind::End])?;
        self.expect(&TokenKind::End, "Expected 'end' to close function body")?;
        self.skip_newlines();

        Ok(Statement::FnDecl {
            name,
            params,
            return_type,
            body,
            line,
            col,
        })
    }

    /// `"if" expr "then" stmt* ("elif" expr "then" stmt*)* ("else" stmt*)? "end"`
    fn if_statement(&mut self) -> Result<Statement> {
        let (line, col) = self.loc();
        self.advance(); // 'if'

        let condition = self.expression()?;
        self.expect(&TokenKind::Then, "Expected 'then'")?;
        self.skip_newlines();
        let then_body = self.parse_block(&[TokenKind::Elif, TokenKind::Else, TokenKind::End])?;

        let mut elif_clauses = Vec::new();
        while self.check(&TokenKind::Elif) {
            self.advance();
            let clause_cond = self.expression()?;
            self.expect(&TokenKind::Then, "Expected 'then' after elif condition")?;
            self.skip_newlines();
            let body = self.parse_block(&[TokenKind::Elif, TokenKind::Else, TokenKind::End])?;
            elif_clauses.push((clause_cond, body));
        }

        let mut else_body = None;
        if self.check(&TokenKind::Else) {
            self.advance();
            self.skip_newlines();
            else_body = Some(self.parse_block(&[TokenKind::End])?);
        }

        self.expect(&TokenKind::End, "Expected 'end' to close if statement")?;
        self.skip_newlines();

        Ok(Statement::If {
            condition,
            then_body,
            elif_clauses,
            else_body,
            line,
            col,
        })
    }

    /// `"while" expr "do" stmt* "end"`
    fn while_statement(&mut self) -> Result<Statement> {
        let (line, col) = self.loc();
        self.advance(); // 'while'

        let condition = self.expression()?;
        self.expect(&TokenKind::Do, "Expected 'do' after while condition")?;
        self.skip_newlines();
        let body = self.parse_block(&[TokenKind::End])?;
        self.expect(&TokenKind::End, "Expected 'end' to close while loop")?;
        self.skip_newlines();

        Ok(Statement::While {
            condition,
            body,
            line,
            col,
        })
    }

    /// `"for" IDENT "in" expr (".." expr)? "do" stmt* "end"`
    fn for_statement(&mut self) -> Result<Statement> {
        let (line, col) = self.loc();
        self.advance(); // 'for'

        let var_name = self.expect_ident()?;
        self.expect(&TokenKind::In, "Expected 'in' after for-loop variable")?;

        let first = self.expression()?;
        let iterable = if self.check(&TokenKind::Range) {
            let (rline, rcol) = (first.line(), first.col());
            self.advance(); // '..'
            let end = self.expression()?;
            Expression::Range {
                start: Box::new(first),
                end: Box::new(end),
                line: rline,
                col: rcol,
            }
        } else {
            first
        };

        self.expect(&TokenKind::Do, "Expected 'do' after for-loop iterable")?;
        self.skip_newlines();
        let body = self.parse_block(&[TokenKind::End])?;
        self.expect(&TokenKind::End, "Expected 'end' to close for loop")?;
        self.skip_newlines();

        Ok(Statement::For {
            var_name,
            iterable,
            body,
            line,
            col,
        })
    }

    /// `"return" expression?`
    fn return_statement(&mut self) -> Result<Statement> {
        let (line, col) = self.loc();
        self.advance(); // 'return'

        let value = if self.at_statement_boundary() {
            None
        } else {
            Some(self.expression()?)
        };
        self.skip_newlines();

        Ok(Statement::Return { value, line, col })
    }

    /// Expression statement, or an assignment if followed by `=`. The
    /// assignment target must be an identifier or an index expression.
    fn assignment_or_expr_statement(&mut self) -> Result<Statement> {
        let expr = self.expression()?;

        if self.check(&TokenKind::Assign) {
            match &expr {
                Expression::Identifier { .. } | Expression::Index { .. } => {}
                _ => {
                    return Err(EmberError::parse(
                        "Invalid assignment target",
                        Location::new(expr.line(), expr.col()),
                    ));
                }
            }
            let (line, col) = (expr.line(), expr.col());
            self.advance(); // '='
            let value = self.expression()?;
            self.skip_newlines();
            Ok(Statement::Assignment {
                target: expr,
                value,
                line,
                col,
            })
        } else {
            self.skip_newlines();
            Ok(Statement::ExprStmt(expr))
        }
    }

    /// Parses statements until one of `terminators` (or EOF) is seen,
    /// skipping newlines between them.
    fn parse_block(&mut self, terminators: &[TokenKind]) -> Result<Vec<Statement>> {
        let mut body = Vec::new();
        loop {
            self.skip_newlines();
            if self.is_at_end() || terminators.iter().any(|t| self.check(t)) {
                break;
            }
            body.push(self.statement()?);
        }
        Ok(body)
    }

    fn at_statement_boundary(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Newline
                | TokenKind::End
                | TokenKind::Elif
                | TokenKind::Else
                | TokenKind::Eof
        )
    }

    // ---------------------------------------------------------------
    // Expressions — precedence climbing, lowest to highest
    // ---------------------------------------------------------------

    fn expression(&mut self) -> Result<Expression> {
        self.logical_or()
    }

    fn logical_or(&mut self) -> Result<Expression> {
        let mut expr = self.logical_and()?;
        while matches!(self.peek_kind(), TokenKind::Or) {
            let (line, col) = (expr.line(), expr.col());
            self.advance();
            let right = self.logical_and()?;
            expr = Expression::Binary {
                op: BinOp::Or,
                left: Box::new(expr),
                right: Box::new(right),
                line,
                col,
            };
        }
        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expression> {
        let mut expr = self.bitwise_or()?;
        while matches!(self.peek_kind(), TokenKind::And) {
            let (line, col) = (expr.line(), expr.col());
            self.advance();
            let right = self.bitwise_or()?;
            expr = Expression::Binary {
                op: BinOp::And,
                left: Box::new(expr),
                right: Box::new(right),
                line,
                col,
            };
        }
        Ok(expr)
    }

    fn bitwise_or(&mut self) -> Result<Expression> {
        let mut expr = self.bitwise_xor()?;
        while matches!(self.peek_kind(), TokenKind::BOr) {
            let (line, col) = (expr.line(), expr.col());
            self.advance();
            let right = self.bitwise_xor()?;
            expr = Expression::Binary {
                op: BinOp::BOr,
                left: Box::new(expr),
                right: Box::new(right),
                line,
                col,
            };
        }
        Ok(expr)
    }

    fn bitwise_xor(&mut self) -> Result<Expression> {
        let mut expr = self.bitwise_and()?;
        while matches!(self.peek_kind(), TokenKind::BXor) {
            let (line, col) = (expr.line(), expr.col());
            self.advance();
            let right = self.bitwise_and()?;
            expr = Expression::Binary {
                op: BinOp::BXor,
                left: Box::new(expr),
                right: Box::new(right),
                line,
                col,
            };
        }
        Ok(expr)
    }

    fn bitwise_and(&mut self) -> Result<Expression> {
        let mut expr = self.equality()?;
        while matches!(self.peek_kind(), TokenKind::BAnd) {
            let (line, col) = (expr.line(), expr.col());
            self.advance();
            let right = self.equality()?;
            expr = Expression::Binary {
                op: BinOp::BAnd,
                left: Box::new(expr),
                right: Box::new(right),
                line,
                col,
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expression> {
        let mut expr = self.relational()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::NotEq => BinOp::NotEq,
                _ => break,
            };
            let (line, col) = (expr.line(), expr.col());
            self.advance();
            let right = self.relational()?;
            expr = Expression::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
                line,
                col,
            };
        }
        Ok(expr)
    }

    fn relational(&mut self) -> Result<Expression> {
        let mut expr = self.shift()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Lte => BinOp::Lte,
                TokenKind::Gte => BinOp::Gte,
                _ => break,
            };
            let (line, col) = (expr.line(), expr.col());
            self.advance();
            let right = self.shift()?;
            expr = Expression::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
                line,
                col,
            };
        }
        Ok(expr)
    }

    fn shift(&mut self) -> Result<Expression> {
        let mut expr = self.additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Shl => BinOp::Shl,
                TokenKind::Shr => BinOp::Shr,
                _ => break,
            };
            let (line, col) = (expr.line(), expr.col());
            self.advance();
            let right = self.additive()?;
            expr = Expression::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
                line,
                col,
            };
        }
        Ok(expr)
    }

    fn additive(&mut self) -> Result<Expression> {
        let mut expr = self.multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let (line, col) = (expr.line(), expr.col());
            self.advance();
            let right = self.multiplicative()?;
            expr = Expression::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
                line,
                col,
            };
        }
        Ok(expr)
    }

    fn multiplicative(&mut self) -> Result<Expression> {
        let mut expr = self.unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            let (line, col) = (expr.line(), expr.col());
            self.advance();
            let right = self.unary()?;
            expr = Expression::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
                line,
                col,
            };
        }
        Ok(expr)
    }

    /// Right-associative, binds tighter than any binary operator but looser
    /// than postfix call/index.
    fn unary(&mut self) -> Result<Expression> {
        let (line, col) = self.loc();
        match self.peek_kind() {
            TokenKind::Minus => {
                self.advance();
                let operand = self.unary()?;
                Ok(Expression::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                    line,
                    col,
                })
            }
            TokenKind::Not => {
                self.advance();
                let operand = self.unary()?;
                Ok(Expression::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                    line,
                    col,
                })
            }
            _ => self.postfix(),
        }
    }

    /// `primary (( "(" args ")" ) | ( "[" expr "]" ))*`
    fn postfix(&mut self) -> Result<Expression> {
        let mut expr = self.primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::LParen => {
                    let (line, col) = (expr.line(), expr.col());
                    self.advance();
                    let args = self.argument_list()?;
                    self.expect(&TokenKind::RParen, "Expected ')' after arguments")?;
                    expr = Expression::Call {
                        callee: Box::new(expr),
                        args,
                        line,
                        col,
                    };
                }
                TokenKind::LBracket => {
                    let (line, col) = (expr.line(), expr.col());
                    self.advance();
                    let index = self.expression()?;
                    self.expect(&TokenKind::RBracket, "Expected ']' after index")?;
                    expr = Expression::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        line,
                        col,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expression> {
        let (line, col) = self.loc();
        match self.peek_kind().clone() {
            TokenKind::Int(v) => {
                self.advance();
                Ok(Expression::Int {
                    value: v,
                    line,
                    col,
                })
            }
            TokenKind::Float(v) => {
                self.advance();
                Ok(Expression::Float {
                    value: v,
                    line,
                    col,
                })
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expression::Str {
                    value: s,
                    line,
                    col,
                })
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Bool {
                    value: true,
                    line,
                    col,
                })
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Bool {
                    value: false,
                    line,
                    col,
                })
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expression::Identifier { name, line, col })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(&TokenKind::RParen, "Expected ')'")?;
                Ok(expr)
            }
            TokenKind::LBracket => self.array_literal(),
            other => Err(EmberError::parse(
                format!("Unexpected token {:?}", other),
                Location::new(line, col),
            )),
        }
    }

    fn array_literal(&mut self) -> Result<Expression> {
        let (line, col) = self.loc();
        self.advance(); // '['
        self.skip_newlines();

        let mut elements = Vec::new();
        if !self.check(&TokenKind::RBracket) {
            elements.push(self.expression()?);
            while self.check(&TokenKind::Comma) {
                self.advance();
                self.skip_newlines();
                if self.check(&TokenKind::RBracket) {
                    break; // trailing comma
                }
                elements.push(self.expression()?);
            }
        }
        self.skip_newlines();
        self.expect(&TokenKind::RBracket, "Expected ']'")?;

        Ok(Expression::Array {
            elements,
            line,
            col,
        })
    }

    fn argument_list(&mut self) -> Result<Vec<Expression>> {
        self.skip_newlines();
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            args.push(self.expression()?);
            while self.check(&TokenKind::Comma) {
                self.advance();
                self.skip_newlines();
                if self.check(&TokenKind::RParen) {
                    break;
                }
                args.push(self.expression()?);
            }
        }
        self.skip_newlines();
        Ok(args)
    }

    // ---------------------------------------------------------------
    // Token stream helpers
    // ---------------------------------------------------------------

    fn peek_tok(&self) -> &Token {
        if self.current >= self.tokens.len() {
            self.tokens.last().expect("token stream always ends in EOF")
        } else {
            &self.tokens[self.current]
        }
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek_tok().kind
    }

    fn loc(&self) -> (usize, usize) {
        let t = self.peek_tok();
        (t.line, t.col)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len() || matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn previous(&self) -> &Token {
        if self.current == 0 {
            &self.tokens[0]
        } else {
            &self.tokens[self.current - 1]
        }
    }

    fn expect(&mut self, kind: &TokenKind, msg: &str) -> Result<&Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let found = self.peek_kind().clone();
            let loc = Location::new(self.peek_tok().line, self.peek_tok().col);
            Err(EmberError::parse(format!("{}, found {:?}", msg, found), loc))
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => {
                let loc = Location::new(self.peek_tok().line, self.peek_tok().col);
                Err(EmberError::parse(
                    format!("Expected identifier, found {:?}", other),
                    loc,
                ))
            }
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline) {
            self.advance();
        }
    }
}

/// Parses a complete token stream into a `Program`.
pub fn parse(tokens: Vec<Token>) -> Result<Program> {
    let token_count = tokens.len();
    let program = Parser::new(tokens).parse()?;
    log::debug!(
        "parsed {} tokens into {} top-level statements",
        token_count,
        program.statements.len()
    );
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_src(src: &str) -> Program {
        let tokens = Lexer::new(src).tokenize();
        Parser::new(tokens).parse().expect("parse should succeed")
    }

    #[test]
    fn test_operator_precedence_mul_over_add() {
        let prog = parse_src("1 + 2 * 3");
        match &prog.statements[0] {
            Statement::ExprStmt(Expression::Binary { op, left, right, .. }) => {
                assert_eq!(*op, BinOp::Add);
                assert!(matches!(**left, Expression::Int { value: 1, .. }));
                assert!(matches!(**right, Expression::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let prog = parse_src("a or b and c");
        match &prog.statements[0] {
            Statement::ExprStmt(Expression::Binary { op, right, .. }) => {
                assert_eq!(*op, BinOp::Or);
                assert!(matches!(**right, Expression::Binary { op: BinOp::And, .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unary_binds_tighter_than_mul() {
        let prog = parse_src("-x*y");
        match &prog.statements[0] {
            Statement::ExprStmt(Expression::Binary { op, left, .. }) => {
                assert_eq!(*op, BinOp::Mul);
                assert!(matches!(**left, Expression::Unary { op: UnaryOp::Neg, .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_left_associative_subtraction() {
        let prog = parse_src("a - b - c");
        match &prog.statements[0] {
            Statement::ExprStmt(Expression::Binary { op, left, .. }) => {
                assert_eq!(*op, BinOp::Sub);
                assert!(matches!(**left, Expression::Binary { op: BinOp::Sub, .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_for_range_lowers_to_range_expr() {
        let prog = parse_src("for i in 1..11 do\nend");
        match &prog.statements[0] {
            Statement::For { iterable, .. } => {
                assert!(matches!(iterable, Expression::Range { .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_if_elif_else() {
        let prog = parse_src("if x < 0 then\nelif x == 0 then\nelse\nend");
        match &prog.statements[0] {
            Statement::If {
                elif_clauses,
                else_body,
                ..
            } => {
                assert_eq!(elif_clauses.len(), 1);
                assert!(else_body.is_some());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_fn_decl_requires_typed_params() {
        let prog = parse_src("fn add(a: int, b: int) -> int\nreturn a + b\nend");
        match &prog.statements[0] {
            Statement::FnDecl { params, .. } => {
                assert_eq!(params.len(), 2);
                assert_eq!(params[0].type_ann, "int");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_assignment_target_is_parse_error() {
        let tokens = Lexer::new("1 = 2").tokenize();
        assert!(Parser::new(tokens).parse().is_err());
    }

    #[test]
    fn test_array_literal_trailing_comma() {
        let prog = parse_src("[1, 2, 3,]");
        match &prog.statements[0] {
            Statement::ExprStmt(Expression::Array { elements, .. }) => {
                assert_eq!(elements.len(), 3);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
