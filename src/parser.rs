use crate::ast::{
    AssignTarget, BinaryOp, ClassMember, ConditionalBlock, Expr, ForKind, FunctionDecl,
    ImportItems, LogicalOp, Program, Stmt, UnaryOp, CONSTRUCTOR_NAME,
};
use crate::collections::keys_match;
use crate::error::{ScriptError, Span};
use crate::lexer::{Token, TokenKind};
use crate::value::Value;
use std::rc::Rc;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    /// Comment tokens are dropped here; the stream must end with `Eof`.
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|token| token.kind != TokenKind::Comment)
            .collect();

        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, String::new(), span));
        }

        Self { tokens, current: 0 }
    }

    pub fn parse(&mut self) -> Result<Program, ScriptError> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            statements.push(self.statement()?);
        }

        Ok(Program { statements })
    }

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        let token = self.peek().clone();

        match token.kind {
            TokenKind::Keyword => {
                self.advance();
                match token.text.as_str() {
                    "break" => Ok(Stmt::Break { span: token.span }),
                    "print" => self.print_statement(token.span),
                    "if" => self.if_statement(token.span),
                    "f" => {
                        let decl = self.function_decl(token.span)?;
                        Ok(Stmt::Function {
                            span: token.span.to(&self.previous().span),
                            decl,
                        })
                    }
                    "init" => {
                        let decl = self.init_decl(token.span)?;
                        Ok(Stmt::Init {
                            span: token.span.to(&self.previous().span),
                            decl,
                        })
                    }
                    "return" => self.return_statement(token.span),
                    "while" => self.while_statement(token.span),
                    "for" => self.for_statement(token.span),
                    "class" => self.class_statement(token.span),
                    "share" => self.share_statement(token.span),
                    "from" => self.import_statement(token.span),
                    "super" => self.super_statement(token.span),
                    "load" => self.load_statement(token.span),
                    _ => Err(ScriptError::parse_error(
                        token.span,
                        format!("Unexpected token: '{}'", token.text),
                    )),
                }
            }
            TokenKind::Identifier => self.assignment_or_call(),
            TokenKind::Eof => Err(ScriptError::parse_error(
                token.span,
                "Unexpected end of input".to_string(),
            )),
            _ => Err(ScriptError::parse_error(
                token.span,
                format!("Unexpected token: '{}'", token.text),
            )),
        }
    }

    /// Collects statements until the current token is one of `terminators`.
    /// The terminator itself is left for the caller.
    fn block(&mut self, opener: &str, terminators: &[&str]) -> Result<Vec<Stmt>, ScriptError> {
        let mut statements = Vec::new();

        while !self.check_any_keyword(terminators) {
            if self.is_at_end() {
                let expected = terminators
                    .iter()
                    .map(|t| format!("'{}'", t))
                    .collect::<Vec<_>>()
                    .join(" or ");
                return Err(ScriptError::parse_error_with_help(
                    self.peek().span,
                    format!("Expected {} to close '{}' block", expected, opener),
                    format!("Every '{}' block must be closed before the end of the file.", opener),
                ));
            }
            statements.push(self.statement()?);
        }

        Ok(statements)
    }

    fn print_statement(&mut self, start: Span) -> Result<Stmt, ScriptError> {
        self.expect_delimiter("(", "Expected '(' after 'print'")?;
        let expr = self.expression()?;
        self.expect_delimiter(")", "Expected ')' after print argument")?;
        Ok(Stmt::Print {
            expr,
            span: start.to(&self.previous().span),
        })
    }

    fn condition(&mut self, keyword: &str) -> Result<Expr, ScriptError> {
        self.consume_with_help(
            TokenKind::Delimiter,
            "(",
            &format!("Expected '(' after '{}'", keyword),
            format!("Conditions are written in parentheses: {} (condition)", keyword),
        )?;
        let condition = self.expression()?;
        self.consume_with_help(
            TokenKind::Delimiter,
            ")",
            &format!("Expected ')' after {} condition", keyword),
            format!("Conditions are written in parentheses: {} (condition)", keyword),
        )?;
        Ok(condition)
    }

    fn if_statement(&mut self, start: Span) -> Result<Stmt, ScriptError> {
        let condition = self.condition("if")?;
        let body = self.block("if", &["elif", "else", "endif"])?;
        let mut branches = vec![ConditionalBlock { condition, body }];
        let mut else_branch = None;

        loop {
            if self.match_keyword("elif") {
                let condition = self.condition("elif")?;
                let body = self.block("elif", &["elif", "else", "endif"])?;
                branches.push(ConditionalBlock { condition, body });
            } else if self.match_keyword("else") {
                else_branch = Some(self.block("else", &["endif"])?);
                self.expect_keyword("endif", "Expected 'endif' after 'else' block")?;
                break;
            } else {
                self.expect_keyword("endif", "Expected 'endif' to close 'if' block")?;
                break;
            }
        }

        Ok(Stmt::If {
            branches,
            else_branch,
            span: start.to(&self.previous().span),
        })
    }

    fn parameters(&mut self) -> Result<Vec<String>, ScriptError> {
        self.expect_delimiter("(", "Expected '(' before parameter list")?;
        let mut params = Vec::new();

        if !self.check(TokenKind::Delimiter, ")") {
            loop {
                let name = self.expect_identifier("Expected parameter name")?;
                if params.contains(&name) {
                    return Err(ScriptError::parse_error(
                        self.previous().span,
                        format!("Duplicate parameter '{}'", name),
                    ));
                }
                params.push(name);
                if !self.match_delimiter(",") {
                    break;
                }
            }
        }

        self.expect_delimiter(")", "Expected ')' after parameters")?;
        Ok(params)
    }

    fn function_decl(&mut self, start: Span) -> Result<Rc<FunctionDecl>, ScriptError> {
        let name = self.expect_identifier("Expected function name after 'f'")?;
        let params = self.parameters()?;
        let body = self.block("f", &["endf"])?;
        self.expect_keyword("endf", "Expected 'endf' after function body")?;

        Ok(Rc::new(FunctionDecl {
            name,
            params,
            body,
            span: start.to(&self.previous().span),
        }))
    }

    fn init_decl(&mut self, start: Span) -> Result<Rc<FunctionDecl>, ScriptError> {
        let params = self.parameters()?;
        let body = self.block("init", &["endinit"])?;
        self.expect_keyword("endinit", "Expected 'endinit' after constructor body")?;

        Ok(Rc::new(FunctionDecl {
            name: CONSTRUCTOR_NAME.to_string(),
            params,
            body,
            span: start.to(&self.previous().span),
        }))
    }

    fn return_statement(&mut self, start: Span) -> Result<Stmt, ScriptError> {
        let value = if self.is_at_end() || self.check_block_end() {
            None
        } else {
            Some(self.expression()?)
        };

        Ok(Stmt::Return {
            value,
            span: start.to(&self.previous().span),
        })
    }

    fn check_block_end(&self) -> bool {
        self.check_any_keyword(&[
            "endf", "endinit", "endif", "elif", "else", "endwhile", "endfor", "endclass",
        ])
    }

    fn loop_body(&mut self, opener: &str, terminator: &str) -> Result<Vec<Stmt>, ScriptError> {
        // `do` is conventional but optional.
        self.match_keyword("do");
        let body = self.block(opener, &[terminator])?;
        self.expect_keyword(
            terminator,
            &format!("Expected '{}' after '{}' body", terminator, opener),
        )?;
        Ok(body)
    }

    fn while_statement(&mut self, start: Span) -> Result<Stmt, ScriptError> {
        let condition = self.condition("while")?;
        let body = self.loop_body("while", "endwhile")?;

        Ok(Stmt::While {
            condition,
            body,
            span: start.to(&self.previous().span),
        })
    }

    fn for_statement(&mut self, start: Span) -> Result<Stmt, ScriptError> {
        self.consume_with_help(
            TokenKind::Delimiter,
            "(",
            "Expected '(' after 'for'",
            "Loops are written as: for (x in items), for (i = 1 to 10) or for (k, v in object)"
                .to_string(),
        )?;

        let kind = if self.match_delimiter("(") {
            // for ((key, value) in iterable)
            let key = self.expect_identifier("Expected key variable name")?;
            self.expect_delimiter(",", "Expected ',' between key and value variables")?;
            let value = self.expect_identifier("Expected value variable name")?;
            self.expect_delimiter(")", "Expected ')' after loop variables")?;
            self.expect_keyword("in", "Expected 'in' after loop variables")?;
            let iterable = self.expression()?;
            ForKind::KeyValue {
                key,
                value,
                iterable,
            }
        } else {
            let var = self.expect_identifier("Expected loop variable name after 'for ('")?;

            if self.match_keyword("in") {
                let iterable = self.expression()?;
                ForKind::Each { var, iterable }
            } else if self.match_operator("=") {
                let start_expr = self.expression()?;
                self.expect_keyword("to", "Expected 'to' in range loop")?;
                let end_expr = self.expression()?;
                ForKind::Range {
                    var,
                    start: start_expr,
                    end: end_expr,
                }
            } else if self.match_delimiter(",") {
                let value = self.expect_identifier("Expected value variable name after ','")?;
                self.expect_keyword("in", "Expected 'in' after loop variables")?;
                let iterable = self.expression()?;
                ForKind::KeyValue {
                    key: var,
                    value,
                    iterable,
                }
            } else {
                return Err(ScriptError::parse_error_with_help(
                    self.peek().span,
                    "Invalid for statement syntax".to_string(),
                    "Loops are written as: for (x in items), for (i = 1 to 10) \
                     or for (k, v in object)"
                        .to_string(),
                ));
            }
        };

        self.expect_delimiter(")", "Expected ')' after loop header")?;
        let body = self.loop_body("for", "endfor")?;

        Ok(Stmt::For {
            kind,
            body,
            span: start.to(&self.previous().span),
        })
    }

    fn class_path(&mut self, message: &str) -> Result<Vec<String>, ScriptError> {
        let mut path = vec![self.expect_identifier(message)?];
        while self.match_delimiter(".") {
            path.push(self.expect_identifier("Expected name after '.' in class path")?);
        }
        Ok(path)
    }

    fn class_statement(&mut self, start: Span) -> Result<Stmt, ScriptError> {
        let name = self.expect_identifier("Expected class name after 'class'")?;
        let parent = if self.match_keyword("extends") {
            Some(self.class_path("Expected base class name after 'extends'")?)
        } else {
            None
        };

        let mut members = Vec::new();
        let mut has_constructor = false;

        while !self.match_keyword("endclass") {
            if self.is_at_end() {
                return Err(ScriptError::parse_error_with_help(
                    self.peek().span,
                    format!("Expected 'endclass' to close class '{}'", name),
                    "Every 'class' block must be closed with 'endclass'.".to_string(),
                ));
            }

            let member_start = self.peek().clone();
            match self.statement()? {
                Stmt::Assign {
                    target: AssignTarget::Variable { name },
                    value,
                    span,
                } => members.push(ClassMember::Property { name, value, span }),
                Stmt::Function { decl, .. } => members.push(ClassMember::Method(decl)),
                Stmt::Init { decl, .. } => {
                    if has_constructor {
                        return Err(ScriptError::parse_error(
                            member_start.span,
                            format!("Class '{}' already has a constructor", name),
                        ));
                    }
                    has_constructor = true;
                    members.push(ClassMember::Constructor(decl));
                }
                _ => {
                    return Err(ScriptError::parse_error_with_help(
                        member_start.span,
                        format!("Unexpected '{}' in class body", member_start.text),
                        "A class body may only contain property assignments, 'f' methods \
                         and one 'init' constructor."
                            .to_string(),
                    ))
                }
            }
        }

        Ok(Stmt::Class {
            name,
            parent,
            members,
            span: start.to(&self.previous().span),
        })
    }

    fn name_list(&mut self, open: &str, close: &str) -> Result<Vec<String>, ScriptError> {
        self.expect_delimiter(open, &format!("Expected '{}'", open))?;
        let mut names = Vec::new();

        if !self.check(TokenKind::Delimiter, close) {
            loop {
                names.push(self.expect_identifier("Expected a name")?);
                if !self.match_delimiter(",") {
                    break;
                }
            }
        }

        self.expect_delimiter(close, &format!("Expected '{}' after names", close))?;
        Ok(names)
    }

    fn share_statement(&mut self, start: Span) -> Result<Stmt, ScriptError> {
        let names = self.name_list("(", ")")?;
        Ok(Stmt::Share {
            names,
            span: start.to(&self.previous().span),
        })
    }

    fn import_statement(&mut self, start: Span) -> Result<Stmt, ScriptError> {
        let path = self.expect_string("Expected a file name string after 'from'")?;
        self.expect_keyword("use", "Expected 'use' after module file name")?;

        let items = if self.match_operator("*") {
            ImportItems::All
        } else {
            ImportItems::Names(self.name_list("{", "}")?)
        };

        Ok(Stmt::Import {
            path,
            items,
            span: start.to(&self.previous().span),
        })
    }

    fn load_statement(&mut self, start: Span) -> Result<Stmt, ScriptError> {
        let path = self.expect_string("Expected a file name string after 'load'")?;
        self.expect_keyword("as", "Expected 'as' after module file name")?;
        let alias = self.expect_identifier("Expected alias name after 'as'")?;

        Ok(Stmt::Load {
            path,
            alias,
            span: start.to(&self.previous().span),
        })
    }

    fn super_statement(&mut self, start: Span) -> Result<Stmt, ScriptError> {
        self.expect_delimiter("(", "Expected '(' after 'super'")?;
        let args = self.arguments()?;
        Ok(Stmt::Super {
            args,
            span: start.to(&self.previous().span),
        })
    }

    /// Statements starting with an identifier: assignments to a variable,
    /// list element or object key, and function/method call statements.
    fn assignment_or_call(&mut self) -> Result<Stmt, ScriptError> {
        let start = self.peek().clone();
        let target = self.call()?;

        if self.match_operator("=") {
            let target = match target {
                Expr::Variable { name, .. } => AssignTarget::Variable { name },
                Expr::Index { object, index, .. } => AssignTarget::Index {
                    object: *object,
                    index: *index,
                },
                Expr::Property { object, name, .. } => AssignTarget::Property {
                    object: *object,
                    name,
                },
                other => {
                    return Err(ScriptError::parse_error_with_help(
                        *other.span(),
                        "Invalid assignment target".to_string(),
                        "Only variables, list elements and object properties can be assigned to."
                            .to_string(),
                    ))
                }
            };
            let value = self.expression()?;
            return Ok(Stmt::Assign {
                target,
                value,
                span: start.span.to(&self.previous().span),
            });
        }

        match target {
            Expr::Call { .. } | Expr::MethodCall { .. } => Ok(Stmt::Expression {
                span: start.span.to(&self.previous().span),
                expr: target,
            }),
            _ => Err(ScriptError::parse_error(
                self.peek().span,
                format!(
                    "Unexpected token after identifier '{}': '{}'",
                    start.text,
                    self.peek().text
                ),
            )),
        }
    }

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        self.or()
    }

    fn or(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.and()?;

        while self.match_operator("||") {
            let right = self.and()?;
            let span = expr.span().to(right.span());
            expr = Expr::Logical {
                left: Box::new(expr),
                operator: LogicalOp::Or,
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.membership()?;

        while self.match_operator("&&") {
            let right = self.membership()?;
            let span = expr.span().to(right.span());
            expr = Expr::Logical {
                left: Box::new(expr),
                operator: LogicalOp::And,
                right: Box::new(right),
                span,
            };
        }

        Ok(expr)
    }

    fn membership(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.equality()?;

        while self.match_keyword("in") {
            let right = self.operand_after("in", Self::equality)?;
            expr = Self::binary(expr, BinaryOp::In, right);
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, ScriptError> {
        self.binary_level(&["==", "!="], Self::relational)
    }

    fn relational(&mut self) -> Result<Expr, ScriptError> {
        self.binary_level(&[">", "<", ">=", "<="], Self::additive)
    }

    fn additive(&mut self) -> Result<Expr, ScriptError> {
        self.binary_level(&["+", "-"], Self::multiplicative)
    }

    fn multiplicative(&mut self) -> Result<Expr, ScriptError> {
        self.binary_level(&["*", "/", "%", "//"], Self::power)
    }

    /// `**` binds tighter than the multiplicative operators and groups to the right.
    fn power(&mut self) -> Result<Expr, ScriptError> {
        let base = self.unary()?;

        if self.match_operator("**") {
            let exponent = self.operand_after("**", Self::power)?;
            return Ok(Self::binary(base, BinaryOp::Power, exponent));
        }

        Ok(base)
    }

    fn binary_level(
        &mut self,
        operators: &[&str],
        next: fn(&mut Self) -> Result<Expr, ScriptError>,
    ) -> Result<Expr, ScriptError> {
        let mut expr = next(self)?;

        while let Some(symbol) = operators
            .iter()
            .find(|op| self.check(TokenKind::Operator, op))
        {
            let symbol = symbol.to_string();
            self.advance();
            let right = self.operand_after(&symbol, next)?;
            let operator = BinaryOp::from_symbol(&symbol).ok_or_else(|| {
                ScriptError::parse_error(
                    self.previous().span,
                    format!("Unknown operator '{}'", symbol),
                )
            })?;
            expr = Self::binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn operand_after(
        &mut self,
        symbol: &str,
        next: fn(&mut Self) -> Result<Expr, ScriptError>,
    ) -> Result<Expr, ScriptError> {
        let operator_span = self.previous().span;
        next(self).map_err(|error| {
            if error.kind == crate::error::ErrorKind::ParseError
                && error.message.starts_with("Expected expression")
            {
                ScriptError::parse_error_with_help(
                    operator_span,
                    format!("Expected expression after '{}'", symbol),
                    format!("The '{}' operator requires expressions on both sides.", symbol),
                )
            } else {
                error
            }
        })
    }

    fn binary(left: Expr, operator: BinaryOp, right: Expr) -> Expr {
        let span = left.span().to(right.span());
        Expr::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            span,
        }
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        if self.match_operator("-") {
            let start = self.previous().span;
            let operand = self.operand_after("-", Self::unary)?;
            let span = start.to(operand.span());
            return Ok(Expr::Unary {
                operator: UnaryOp::Negate,
                operand: Box::new(operand),
                span,
            });
        }

        self.call()
    }

    /// A primary followed by any chain of `.member`, `.method(args)` and `[index]`.
    fn call(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.primary()?;

        loop {
            if self.match_delimiter(".") {
                let name = self.expect_identifier("Expected property name after '.'")?;
                if self.match_delimiter("(") {
                    let args = self.arguments()?;
                    let span = expr.span().to(&self.previous().span);
                    expr = Expr::MethodCall {
                        object: Box::new(expr),
                        method: name,
                        args,
                        span,
                    };
                } else {
                    let span = expr.span().to(&self.previous().span);
                    expr = Expr::Property {
                        object: Box::new(expr),
                        name,
                        span,
                    };
                }
            } else if self.match_delimiter("[") {
                let index = self.expression()?;
                self.expect_delimiter("]", "Expected ']' after index")?;
                let span = expr.span().to(&self.previous().span);
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    span,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Parses call arguments after the opening '('.
    fn arguments(&mut self) -> Result<Vec<Expr>, ScriptError> {
        let mut args = Vec::new();

        if !self.check(TokenKind::Delimiter, ")") {
            loop {
                if self.is_at_end() {
                    return Err(ScriptError::parse_error_with_help(
                        self.peek().span,
                        "Unexpected end of input in argument list".to_string(),
                        "Calls must be closed with ')' after the arguments. Example: add(1, 2)"
                            .to_string(),
                    ));
                }
                args.push(self.expression()?);
                if !self.match_delimiter(",") {
                    break;
                }
            }
        }

        self.consume_with_help(
            TokenKind::Delimiter,
            ")",
            "Expected ')' after arguments",
            "Calls must be closed with ')' after the arguments. Example: add(1, 2)".to_string(),
        )?;
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        if self.is_at_end() {
            return Err(ScriptError::parse_error_with_help(
                self.peek().span,
                "Expected expression, found end of input".to_string(),
                "Check for unmatched parentheses, brackets, or incomplete statements.".to_string(),
            ));
        }

        let token = self.advance().clone();

        match (token.kind, token.text.as_str()) {
            (TokenKind::Number, text) => {
                let value = if let Ok(n) = text.parse::<i64>() {
                    Value::Int(n)
                } else if let Ok(n) = text.parse::<f64>() {
                    Value::Double(n)
                } else {
                    return Err(ScriptError::parse_error(
                        token.span,
                        format!("Invalid number '{}'", text),
                    ));
                };
                Ok(Expr::Literal {
                    value,
                    span: token.span,
                })
            }
            (TokenKind::String, text) => Ok(Expr::Literal {
                value: Value::String(text.to_string()),
                span: token.span,
            }),
            (TokenKind::Keyword, "True") => Ok(Expr::Literal {
                value: Value::Bool(true),
                span: token.span,
            }),
            (TokenKind::Keyword, "False") => Ok(Expr::Literal {
                value: Value::Bool(false),
                span: token.span,
            }),
            (TokenKind::Keyword, "null") => Ok(Expr::Literal {
                value: Value::Null,
                span: token.span,
            }),
            (TokenKind::Keyword, "new") => self.new_expression(token.span),
            (TokenKind::Identifier, name) => {
                let name = name.to_string();
                if self.match_delimiter("(") {
                    let args = self.arguments()?;
                    Ok(Expr::Call {
                        name,
                        args,
                        span: token.span.to(&self.previous().span),
                    })
                } else {
                    Ok(Expr::Variable {
                        name,
                        span: token.span,
                    })
                }
            }
            (TokenKind::Delimiter, "(") => {
                if self.check(TokenKind::Delimiter, ")") {
                    return Err(ScriptError::parse_error_with_help(
                        token.span.to(&self.peek().span),
                        "Empty parentheses are not allowed".to_string(),
                        "Parentheses must contain an expression. Use 'null' for a null value."
                            .to_string(),
                    ));
                }
                let expr = self.expression()?;
                self.consume_with_help(
                    TokenKind::Delimiter,
                    ")",
                    "Expected ')' after expression",
                    "Every opening parenthesis '(' must have a matching closing parenthesis ')'."
                        .to_string(),
                )?;
                Ok(Expr::Grouping {
                    expr: Box::new(expr),
                    span: token.span.to(&self.previous().span),
                })
            }
            (TokenKind::Delimiter, "[") => self.list_literal(token.span),
            (TokenKind::Delimiter, "{") => self.object_literal(token.span),
            _ => {
                let help_msg = match token.text.as_str() {
                    ")" => "Found ')' without matching '('. Check for unbalanced parentheses.",
                    "}" => "Found '}' without matching '{'. Check for unbalanced braces.",
                    "]" => "Found ']' without matching '['. Check for unbalanced brackets.",
                    _ => "Expected a literal value, variable, or parenthesized expression here.",
                };

                Err(ScriptError::parse_error_with_help(
                    token.span,
                    format!("Expected expression, found '{}'", token.text),
                    help_msg.to_string(),
                ))
            }
        }
    }

    fn new_expression(&mut self, start: Span) -> Result<Expr, ScriptError> {
        let class_path = self.class_path("Expected class name after 'new'")?;
        self.expect_delimiter("(", "Expected '(' after class name")?;
        let args = self.arguments()?;

        Ok(Expr::New {
            class_path,
            args,
            span: start.to(&self.previous().span),
        })
    }

    fn list_literal(&mut self, start: Span) -> Result<Expr, ScriptError> {
        let mut elements = Vec::new();

        if !self.check(TokenKind::Delimiter, "]") {
            loop {
                elements.push(self.expression()?);
                if !self.match_delimiter(",") {
                    break;
                }
            }
        }

        self.consume_with_help(
            TokenKind::Delimiter,
            "]",
            "Expected ']' after list elements",
            "List literals must be closed with ']' after the opening '['. Example: [1, 2, 3]"
                .to_string(),
        )?;
        Ok(Expr::List {
            elements,
            span: start.to(&self.previous().span),
        })
    }

    fn object_literal(&mut self, start: Span) -> Result<Expr, ScriptError> {
        let mut entries: Vec<(String, Expr)> = Vec::new();

        if !self.check(TokenKind::Delimiter, "}") {
            loop {
                let key_token = self.advance().clone();
                if !matches!(key_token.kind, TokenKind::Identifier | TokenKind::String) {
                    return Err(ScriptError::parse_error_with_help(
                        key_token.span,
                        format!(
                            "Expected identifier or string for object key, found '{}'",
                            key_token.text
                        ),
                        "Object entries are written as key: value. \
                         Example: {name: \"Rex\", \"age\": 3}"
                            .to_string(),
                    ));
                }
                if entries.iter().any(|(key, _)| keys_match(key, &key_token.text)) {
                    return Err(ScriptError::parse_error(
                        key_token.span,
                        format!("Duplicate key '{}' in object literal", key_token.text),
                    ));
                }

                self.consume_with_help(
                    TokenKind::Delimiter,
                    ":",
                    "Expected ':' after object key",
                    "Object entries require a colon between key and value. Example: {name: \"Rex\"}"
                        .to_string(),
                )?;
                let value = self.expression()?;
                entries.push((key_token.text, value));

                if !self.match_delimiter(",") {
                    break;
                }
            }
        }

        self.consume_with_help(
            TokenKind::Delimiter,
            "}",
            "Expected '}' after object entries",
            "Object literals must be closed with '}' after the opening '{'. \
             Example: {name: \"Rex\"}"
                .to_string(),
        )?;
        Ok(Expr::Object {
            entries,
            span: start.to(&self.previous().span),
        })
    }

    fn check(&self, kind: TokenKind, text: &str) -> bool {
        self.peek().is(kind, text)
    }

    fn check_any_keyword(&self, keywords: &[&str]) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Keyword && keywords.contains(&token.text.as_str())
    }

    fn match_token(&mut self, kind: TokenKind, text: &str) -> bool {
        if self.check(kind, text) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_keyword(&mut self, keyword: &str) -> bool {
        self.match_token(TokenKind::Keyword, keyword)
    }

    fn match_operator(&mut self, operator: &str) -> bool {
        self.match_token(TokenKind::Operator, operator)
    }

    fn match_delimiter(&mut self, delimiter: &str) -> bool {
        self.match_token(TokenKind::Delimiter, delimiter)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn unexpected(&self, message: &str) -> ScriptError {
        let token = self.peek();
        let found = if token.kind == TokenKind::Eof {
            "end of input".to_string()
        } else {
            format!("'{}'", token.text)
        };
        ScriptError::parse_error(token.span, format!("{}, found {}", message, found))
    }

    fn consume_with_help(
        &mut self,
        kind: TokenKind,
        text: &str,
        message: &str,
        help: String,
    ) -> Result<&Token, ScriptError> {
        if self.check(kind, text) {
            Ok(self.advance())
        } else {
            let mut error = self.unexpected(message);
            error.help = Some(help);
            Err(error)
        }
    }

    fn expect_delimiter(&mut self, delimiter: &str, message: &str) -> Result<(), ScriptError> {
        if self.match_delimiter(delimiter) {
            Ok(())
        } else {
            Err(self.unexpected(message))
        }
    }

    fn expect_keyword(&mut self, keyword: &str, message: &str) -> Result<(), ScriptError> {
        if self.match_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(message))
        }
    }

    fn expect_identifier(&mut self, message: &str) -> Result<String, ScriptError> {
        if self.peek().kind == TokenKind::Identifier {
            Ok(self.advance().text.clone())
        } else {
            Err(self.unexpected(message))
        }
    }

    fn expect_string(&mut self, message: &str) -> Result<String, ScriptError> {
        if self.peek().kind == TokenKind::String {
            Ok(self.advance().text.clone())
        } else {
            Err(self.unexpected(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> Program {
        let tokens = Lexer::new(source).scan_tokens().unwrap();
        Parser::new(tokens).parse().unwrap()
    }

    fn parse_expr(source: &str) -> Expr {
        let program = parse(&format!("print({})", source));
        match program.statements.into_iter().next() {
            Some(Stmt::Print { expr, .. }) => expr,
            other => panic!("expected print statement, got {:?}", other),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        match parse_expr("1 + 2 * 3") {
            Expr::Binary {
                operator: BinaryOp::Add,
                right,
                ..
            } => assert!(matches!(
                *right,
                Expr::Binary {
                    operator: BinaryOp::Multiply,
                    ..
                }
            )),
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn power_groups_to_the_right() {
        match parse_expr("2 ** 3 ** 2") {
            Expr::Binary {
                operator: BinaryOp::Power,
                left,
                right,
                ..
            } => {
                assert!(matches!(*left, Expr::Literal { .. }));
                assert!(matches!(
                    *right,
                    Expr::Binary {
                        operator: BinaryOp::Power,
                        ..
                    }
                ));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn postfix_chain_applies_left_to_right() {
        // a.b[0].c() == MethodCall(Index(Property(a, b), 0), c)
        match parse_expr("a.b[0].c()") {
            Expr::MethodCall { object, method, .. } => {
                assert_eq!(method, "c");
                match *object {
                    Expr::Index { object, .. } => {
                        assert!(matches!(*object, Expr::Property { ref name, .. } if name == "b"))
                    }
                    other => panic!("expected index, got {:?}", other),
                }
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn if_collects_elif_branches_in_order() {
        let program = parse(
            "if (x == 1) print(1) elif (x == 2) print(2) elif (x == 3) print(3) else print(0) endif",
        );
        match &program.statements[0] {
            Stmt::If {
                branches,
                else_branch,
                ..
            } => {
                assert_eq!(branches.len(), 3);
                assert_eq!(else_branch.as_ref().map(Vec::len), Some(1));
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn for_forms_are_distinguished_by_lookahead() {
        let program = parse(
            "for (i = 1 to 3) do print(i) endfor\n\
             for (x in xs) do print(x) endfor\n\
             for (k, v in obj) do print(k) endfor\n\
             for ((k, v) in obj) do print(v) endfor",
        );
        let kinds: Vec<&ForKind> = program
            .statements
            .iter()
            .map(|s| match s {
                Stmt::For { kind, .. } => kind,
                other => panic!("expected for, got {:?}", other),
            })
            .collect();
        assert!(matches!(kinds[0], ForKind::Range { .. }));
        assert!(matches!(kinds[1], ForKind::Each { .. }));
        assert!(matches!(kinds[2], ForKind::KeyValue { .. }));
        assert!(matches!(kinds[3], ForKind::KeyValue { .. }));
    }

    #[test]
    fn class_body_records_members() {
        let program = parse(
            "class Dog extends Animal\n\
               sound = \"Woof\"\n\
               init(name) cur.name = name endinit\n\
               f speak() return cur.sound endf\n\
             endclass",
        );
        match &program.statements[0] {
            Stmt::Class {
                name,
                parent,
                members,
                ..
            } => {
                assert_eq!(name, "Dog");
                assert_eq!(parent.as_deref(), Some(&["Animal".to_string()][..]));
                assert!(matches!(members[0], ClassMember::Property { .. }));
                assert!(matches!(
                    &members[1],
                    ClassMember::Constructor(d) if d.name == CONSTRUCTOR_NAME
                ));
                assert!(matches!(members[2], ClassMember::Method(_)));
            }
            other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn second_constructor_is_rejected() {
        let tokens = Lexer::new("class A init() endinit init() endinit endclass")
            .scan_tokens()
            .unwrap();
        let error = Parser::new(tokens).parse().unwrap_err();
        assert!(error.message.contains("already has a constructor"));
    }

    #[test]
    fn statement_span_starts_at_first_token() {
        let program = parse(">> comment\n\n   total = 1 + 2");
        let span = program.statements[0].span();
        assert_eq!((span.line, span.column), (3, 4));
    }

    #[test]
    fn import_forms() {
        let program =
            parse("from \"lib.es\" use { a, b }\nfrom \"lib.es\" use *\nload \"m.es\" as m");
        assert!(matches!(
            &program.statements[0],
            Stmt::Import { items: ImportItems::Names(names), .. } if names == &["a", "b"]
        ));
        assert!(matches!(
            &program.statements[1],
            Stmt::Import {
                items: ImportItems::All,
                ..
            }
        ));
        assert!(matches!(&program.statements[2], Stmt::Load { alias, .. } if alias == "m"));
    }
}
