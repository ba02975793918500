use crate::{
    frontend::{
        ParseError, SourceFile,
        ast::{
            Additive, Assignment, BinaryOperator, BinaryOperatorKind, Block, Conditional,
            Declaration, Expression, Factor, FactorKind, FunctionCall, FunctionDefinition,
            FunctionParameter, Identifier, Literal, Print, Program, Statement, StatementKind,
            Term, WhileLoop,
        },
        lexer::{Keyword, Lexer, Span, Token, TokenKind},
    },
    middle::primitive::ValueType,
};

#[derive(Debug)]
pub struct Parser<'source> {
    lexer: Lexer<'source>,
}

impl<'source> Parser<'source> {
    pub fn parse_program(source_file: &'source SourceFile) -> Result<Program, ParseError> {
        let mut parser = Self {
            lexer: Lexer::new(source_file),
        };

        let program = parser.parse_program_inner()?;

        if let Some(trailing) = parser.lexer.peek()? {
            return Err(parser.unexpected(&trailing, "end of file"));
        }

        Ok(program)
    }

    fn unexpected(&self, token: &Token, expecting: &str) -> ParseError {
        ParseError::new(
            token.span,
            format!(
                "Expected {expecting} but found `{}`",
                self.lexer.source().value_of_span(token.span)
            ),
        )
    }

    fn expect_peek(&mut self, expecting: &str) -> Result<Token, ParseError> {
        let Some(token) = self.lexer.peek()? else {
            return Err(ParseError::new(
                self.lexer.eof_span(),
                format!("Expected {expecting} but reached end of file"),
            ));
        };

        Ok(token)
    }

    fn expect_next(&mut self, expecting: &str) -> Result<Token, ParseError> {
        let Some(token) = self.lexer.next()? else {
            return Err(ParseError::new(
                self.lexer.eof_span(),
                format!("Expected {expecting} but reached end of file"),
            ));
        };

        Ok(token)
    }

    fn expect_next_to_be(&mut self, kind: TokenKind, expecting: &str) -> Result<Token, ParseError> {
        let token = self.expect_next(expecting)?;

        if token.kind != kind {
            return Err(self.unexpected(&token, expecting));
        }

        Ok(token)
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<Token, ParseError> {
        self.expect_next_to_be(
            TokenKind::Keyword(keyword),
            &format!("`{}`", format!("{keyword:?}").to_lowercase()),
        )
    }

    fn next_is(&mut self, kind: TokenKind) -> Result<bool, ParseError> {
        Ok(self.lexer.peek()?.is_some_and(|t| t.kind == kind))
    }

    /// Consumes the next token if it has the given kind
    fn eat(&mut self, kind: TokenKind) -> Result<Option<Token>, ParseError> {
        if self.next_is(kind)? {
            return self.lexer.next();
        }

        Ok(None)
    }

    /// program name; [var] declarations functions main { ... } end
    fn parse_program_inner(&mut self) -> Result<Program, ParseError> {
        let program_keyword = self.expect_keyword(Keyword::Program)?;
        let name = self.parse_identifier()?;
        self.expect_next_to_be(TokenKind::Semicolon, "`;`")?;

        let mut declarations = Vec::new();
        let mut functions = Vec::new();

        loop {
            let peeked = self.expect_peek("declaration, function or `main`")?;

            match peeked.kind {
                TokenKind::Keyword(Keyword::Var) => {
                    self.lexer.next()?;
                }
                TokenKind::Identifier if functions.is_empty() => {
                    declarations.push(self.parse_declaration()?);
                }
                TokenKind::Keyword(Keyword::Void) => functions.push(self.parse_function()?),
                kind if kind.is_type_keyword() => functions.push(self.parse_function()?),
                TokenKind::Keyword(Keyword::Main) => break,
                _ => {
                    return Err(self.unexpected(&peeked, "declaration, function or `main`"));
                }
            }
        }

        self.expect_keyword(Keyword::Main)?;
        let main = self.parse_block()?;
        let end_keyword = self.expect_keyword(Keyword::End)?;

        Ok(Program {
            span: program_keyword.span.to(end_keyword.span),
            name,
            declarations,
            functions,
            main,
        })
    }

    // counter
    fn parse_identifier(&mut self) -> Result<Identifier, ParseError> {
        let token = self.expect_next_to_be(TokenKind::Identifier, "identifier")?;

        Ok(Identifier {
            span: token.span,
            name: self.lexer.source().value_of_span(token.span).to_string(),
        })
    }

    // integer | float | boolean | string
    fn parse_type(&mut self) -> Result<(ValueType, Span), ParseError> {
        let token = self.expect_next("type")?;

        let ty = match token.kind {
            TokenKind::Keyword(Keyword::Integer) => ValueType::Integer,
            TokenKind::Keyword(Keyword::Float) => ValueType::Float,
            TokenKind::Keyword(Keyword::Boolean) => ValueType::Boolean,
            TokenKind::Keyword(Keyword::String) => ValueType::String,
            _ => return Err(self.unexpected(&token, "type")),
        };

        Ok((ty, token.span))
    }

    fn parse_declaration(&mut self) -> Result<Declaration, ParseError> {
        let first = self.parse_identifier()?;
        self.parse_declaration_rest(first)
    }

    // a, b: integer;
    fn parse_declaration_rest(&mut self, first: Identifier) -> Result<Declaration, ParseError> {
        let mut names = vec![first];

        while self.eat(TokenKind::Comma)?.is_some() {
            names.push(self.parse_identifier()?);
        }

        self.expect_next_to_be(TokenKind::Colon, "`:` or `,`")?;
        let (ty, _) = self.parse_type()?;
        let semicolon = self.expect_next_to_be(TokenKind::Semicolon, "`;`")?;

        Ok(Declaration {
            span: names[0].span.to(semicolon.span),
            names,
            ty,
        })
    }

    /// void name(a: integer, b: float) { ... }
    fn parse_function(&mut self) -> Result<FunctionDefinition, ParseError> {
        let start = self.expect_peek("`void` or type")?.span;

        let return_type = if self.eat(TokenKind::Keyword(Keyword::Void))?.is_some() {
            None
        } else {
            Some(self.parse_type()?.0)
        };

        let name = self.parse_identifier()?;

        self.expect_next_to_be(TokenKind::OpenParen, "`(`")?;

        let mut parameters = Vec::new();

        // If the next token is not a closing paren there MUST be at least one
        // parameter
        if !self.next_is(TokenKind::CloseParen)? {
            parameters.push(self.parse_function_parameter()?);

            while self.eat(TokenKind::Comma)?.is_some() {
                parameters.push(self.parse_function_parameter()?);
            }
        }

        self.expect_next_to_be(TokenKind::CloseParen, "`)` or `,`")?;

        let body = self.parse_block()?;
        let mut span = start.to(body.span);

        if let Some(semicolon) = self.eat(TokenKind::Semicolon)? {
            span = span.to(semicolon.span);
        }

        Ok(FunctionDefinition {
            span,
            name,
            return_type,
            parameters,
            body,
        })
    }

    // count: integer
    fn parse_function_parameter(&mut self) -> Result<FunctionParameter, ParseError> {
        let name = self.parse_identifier()?;
        self.expect_next_to_be(TokenKind::Colon, "`:`")?;
        let (ty, ty_span) = self.parse_type()?;

        Ok(FunctionParameter {
            span: name.span.to(ty_span),
            name,
            ty,
        })
    }

    // { statements }
    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let open_brace = self.expect_next_to_be(TokenKind::OpenBrace, "`{`")?;
        let mut statements = Vec::new();

        while !self.next_is(TokenKind::CloseBrace)? {
            statements.push(self.parse_statement()?);
        }

        let close_brace = self.expect_next_to_be(TokenKind::CloseBrace, "`}`")?;

        Ok(Block {
            span: open_brace.span.to(close_brace.span),
            statements,
        })
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let peeked = self.expect_peek("statement")?;

        let (kind, end) = match peeked.kind {
            TokenKind::Keyword(Keyword::If) => self.parse_conditional()?,
            TokenKind::Keyword(Keyword::While) => self.parse_while_loop()?,
            TokenKind::Keyword(Keyword::Print) => self.parse_print()?,
            TokenKind::Identifier => {
                let name = self.parse_identifier()?;
                let next = self.expect_peek("`=`, `(`, `:` or `,`")?;

                match next.kind {
                    TokenKind::Equals => self.parse_assignment(name)?,
                    TokenKind::OpenParen => self.parse_function_call(name)?,
                    TokenKind::Colon | TokenKind::Comma => {
                        let declaration = self.parse_declaration_rest(name)?;
                        let end = declaration.span;
                        (StatementKind::Declaration(declaration), end)
                    }
                    _ => return Err(self.unexpected(&next, "`=`, `(`, `:` or `,`")),
                }
            }
            _ => return Err(self.unexpected(&peeked, "statement")),
        };

        Ok(Statement {
            span: peeked.span.to(end),
            kind,
        })
    }

    // target = value;
    fn parse_assignment(&mut self, target: Identifier) -> Result<(StatementKind, Span), ParseError> {
        self.expect_next_to_be(TokenKind::Equals, "`=`")?;
        let value = self.parse_expression()?;
        let semicolon = self.expect_next_to_be(TokenKind::Semicolon, "`;`")?;

        Ok((
            StatementKind::Assignment(Assignment { target, value }),
            semicolon.span,
        ))
    }

    // name(a, b + 1);
    fn parse_function_call(&mut self, name: Identifier) -> Result<(StatementKind, Span), ParseError> {
        let arguments = self.parse_expression_list()?;
        let semicolon = self.expect_next_to_be(TokenKind::Semicolon, "`;`")?;

        Ok((
            StatementKind::FunctionCall(FunctionCall { name, arguments }),
            semicolon.span,
        ))
    }

    // print(a, "text");
    fn parse_print(&mut self) -> Result<(StatementKind, Span), ParseError> {
        self.expect_keyword(Keyword::Print)?;

        let open = self.expect_peek("`(`")?;
        let items = self.parse_expression_list()?;

        if items.is_empty() {
            return Err(ParseError::new(open.span, "print needs at least one argument"));
        }

        let semicolon = self.expect_next_to_be(TokenKind::Semicolon, "`;`")?;

        Ok((StatementKind::Print(Print { items }), semicolon.span))
    }

    // (expr, expr, ...)
    fn parse_expression_list(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.expect_next_to_be(TokenKind::OpenParen, "`(`")?;

        let mut expressions = Vec::new();

        if !self.next_is(TokenKind::CloseParen)? {
            expressions.push(self.parse_expression()?);

            while self.eat(TokenKind::Comma)?.is_some() {
                expressions.push(self.parse_expression()?);
            }
        }

        self.expect_next_to_be(TokenKind::CloseParen, "`)` or `,`")?;

        Ok(expressions)
    }

    // if (condition) { ... } else { ... };
    fn parse_conditional(&mut self) -> Result<(StatementKind, Span), ParseError> {
        self.expect_keyword(Keyword::If)?;
        let condition = self.parse_condition()?;
        let then_block = self.parse_block()?;
        let mut end = then_block.span;

        let else_block = if self.eat(TokenKind::Keyword(Keyword::Else))?.is_some() {
            let block = self.parse_block()?;
            end = block.span;
            Some(block)
        } else {
            None
        };

        if let Some(semicolon) = self.eat(TokenKind::Semicolon)? {
            end = semicolon.span;
        }

        Ok((
            StatementKind::Conditional(Conditional {
                condition,
                then_block,
                else_block,
            }),
            end,
        ))
    }

    // while (condition) do { ... };
    fn parse_while_loop(&mut self) -> Result<(StatementKind, Span), ParseError> {
        self.expect_keyword(Keyword::While)?;
        let condition = self.parse_condition()?;
        self.expect_keyword(Keyword::Do)?;
        let body = self.parse_block()?;
        let mut end = body.span;

        if let Some(semicolon) = self.eat(TokenKind::Semicolon)? {
            end = semicolon.span;
        }

        Ok((StatementKind::WhileLoop(WhileLoop { condition, body }), end))
    }

    // (expr)
    fn parse_condition(&mut self) -> Result<Expression, ParseError> {
        self.expect_next_to_be(TokenKind::OpenParen, "`(`")?;
        let condition = self.parse_expression()?;
        self.expect_next_to_be(TokenKind::CloseParen, "`)`")?;

        Ok(condition)
    }

    fn parse_operator(&mut self) -> Result<BinaryOperator, ParseError> {
        let token = self.expect_next("operator")?;

        let kind = match token.kind {
            TokenKind::Plus => BinaryOperatorKind::Add,
            TokenKind::Minus => BinaryOperatorKind::Subtract,
            TokenKind::Asterisk => BinaryOperatorKind::Multiply,
            TokenKind::Divide => BinaryOperatorKind::Divide,
            TokenKind::DoubleEquals => BinaryOperatorKind::Equals,
            TokenKind::NotEquals => BinaryOperatorKind::NotEquals,
            TokenKind::LessThan => BinaryOperatorKind::LessThan,
            TokenKind::LessThanOrEqualTo => BinaryOperatorKind::LessThanOrEqualTo,
            TokenKind::GreaterThan => BinaryOperatorKind::GreaterThan,
            TokenKind::GreaterThanOrEqualTo => BinaryOperatorKind::GreaterThanOrEqualTo,
            _ => return Err(self.unexpected(&token, "operator")),
        };

        Ok(BinaryOperator {
            span: token.span,
            kind,
        })
    }

    // additive (relop additive)?
    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let lhs = self.parse_additive()?;

        let comparison = if self
            .lexer
            .peek()?
            .is_some_and(|t| t.kind.is_comparison_operator())
        {
            let operator = self.parse_operator()?;
            Some((operator, self.parse_additive()?))
        } else {
            None
        };

        let span = comparison
            .as_ref()
            .map(|(_, rhs)| lhs.span.to(rhs.span))
            .unwrap_or(lhs.span);

        Ok(Expression {
            span,
            lhs,
            comparison,
        })
    }

    // term ((+|-) term)*
    fn parse_additive(&mut self) -> Result<Additive, ParseError> {
        let first = self.parse_term()?;
        let mut rest = Vec::new();

        while self.lexer.peek()?.is_some_and(|t| t.kind.is_term_operator()) {
            let operator = self.parse_operator()?;
            rest.push((operator, self.parse_term()?));
        }

        let span = rest
            .last()
            .map(|(_, last)| first.span.to(last.span))
            .unwrap_or(first.span);

        Ok(Additive { span, first, rest })
    }

    // factor ((*|/) factor)*
    fn parse_term(&mut self) -> Result<Term, ParseError> {
        let first = self.parse_factor()?;
        let mut rest = Vec::new();

        while self
            .lexer
            .peek()?
            .is_some_and(|t| t.kind.is_factor_operator())
        {
            let operator = self.parse_operator()?;
            rest.push((operator, self.parse_factor()?));
        }

        let span = rest
            .last()
            .map(|(_, last)| first.span.to(last.span))
            .unwrap_or(first.span);

        Ok(Term { span, first, rest })
    }

    // (expr) | identifier | literal
    fn parse_factor(&mut self) -> Result<Factor, ParseError> {
        let token = self.expect_next("expression")?;
        let text = self.lexer.source().value_of_span(token.span).to_string();

        let literal = |kind| {
            FactorKind::Literal(Literal {
                span: token.span,
                kind,
                text: text.clone(),
            })
        };

        let (kind, span) = match token.kind {
            TokenKind::OpenParen => {
                let inner = self.parse_expression()?;
                let close_paren = self.expect_next_to_be(TokenKind::CloseParen, "`)`")?;

                (
                    FactorKind::Parenthesized(Box::new(inner)),
                    token.span.to(close_paren.span),
                )
            }
            TokenKind::Identifier => (
                FactorKind::Identifier(Identifier {
                    span: token.span,
                    name: text.clone(),
                }),
                token.span,
            ),
            TokenKind::IntegerLiteral => (literal(ValueType::Integer), token.span),
            TokenKind::FloatLiteral => (literal(ValueType::Float), token.span),
            TokenKind::BooleanLiteral => (literal(ValueType::Boolean), token.span),
            TokenKind::StringLiteral => (literal(ValueType::String), token.span),
            _ => return Err(self.unexpected(&token, "expression")),
        };

        Ok(Factor { span, kind })
    }
}
