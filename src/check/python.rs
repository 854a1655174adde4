//! Static reader for Python module sources.
//!
//! Application modules are never executed. The reader tokenizes a source file
//! and keeps only the statements a structural check needs: imports,
//! module-level constant assignments, top-level class declarations with their
//! declared bases, and class-level constant attributes.
use std::collections::BTreeMap;
use std::fmt;

/// Statically evaluated value of a Python expression.
#[derive(Debug, Clone, PartialEq)]
pub enum PyValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<PyValue>),
    Tuple(Vec<PyValue>),
    Dict(Vec<(PyValue, PyValue)>),
    /// Dotted name that still has to be resolved against imports.
    Ref(String),
    /// Anything the reader cannot evaluate (calls, operators, f-strings).
    Expr(String),
}

impl PyValue {
    /// Python type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            PyValue::None => "NoneType",
            PyValue::Bool(_) => "bool",
            PyValue::Int(_) => "int",
            PyValue::Float(_) => "float",
            PyValue::Str(_) => "str",
            PyValue::List(_) => "list",
            PyValue::Tuple(_) => "tuple",
            PyValue::Dict(_) => "dict",
            PyValue::Ref(_) => "reference",
            PyValue::Expr(_) => "expression",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, PyValue::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PyValue::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Length of sized values (strings count characters).
    pub fn len(&self) -> Option<usize> {
        match self {
            PyValue::Str(value) => Some(value.chars().count()),
            PyValue::List(items) | PyValue::Tuple(items) => Some(items.len()),
            PyValue::Dict(entries) => Some(entries.len()),
            _ => None,
        }
    }

    /// Emptiness of sized values; `None` for values without a length.
    pub fn is_empty(&self) -> Option<bool> {
        self.len().map(|len| len == 0)
    }

    /// Render the value the way Python's `str()` would.
    pub fn render(&self) -> String {
        match self {
            PyValue::Str(value) => value.clone(),
            other => other.repr(),
        }
    }

    fn repr(&self) -> String {
        match self {
            PyValue::None => "None".to_string(),
            PyValue::Bool(true) => "True".to_string(),
            PyValue::Bool(false) => "False".to_string(),
            PyValue::Int(value) => value.to_string(),
            PyValue::Float(value) => format!("{value:?}"),
            PyValue::Str(value) => format!("'{}'", value.replace('\'', "\\'")),
            PyValue::List(items) => format!("[{}]", join_repr(items)),
            PyValue::Tuple(items) if items.len() == 1 => format!("({},)", items[0].repr()),
            PyValue::Tuple(items) => format!("({})", join_repr(items)),
            PyValue::Dict(entries) => {
                let rendered: Vec<String> = entries
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key.repr(), value.repr()))
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }
            PyValue::Ref(name) => name.clone(),
            PyValue::Expr(text) => text.clone(),
        }
    }
}

fn join_repr(items: &[PyValue]) -> String {
    items
        .iter()
        .map(PyValue::repr)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A name bound by an `import` or `from ... import` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    /// Local name introduced in the importing module.
    pub name: String,
    /// Module path as written, without leading dots.
    pub module: String,
    /// Number of leading dots for relative imports.
    pub level: usize,
    /// Imported member for `from` imports.
    pub member: Option<String>,
}

/// A top-level class declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct PyClass {
    pub name: String,
    pub line: usize,
    /// Declared bases as dotted names, in declaration order.
    pub bases: Vec<String>,
    pub attributes: BTreeMap<String, PyValue>,
}

/// Structural summary of one Python source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PyModule {
    pub imports: Vec<ImportBinding>,
    pub constants: BTreeMap<String, PyValue>,
    pub classes: Vec<PyClass>,
}

impl PyModule {
    pub fn class(&self, name: &str) -> Option<&PyClass> {
        self.classes.iter().find(|class| class.name == name)
    }

    /// Find the top-level class whose name matches case-insensitively.
    pub fn class_ignore_case(&self, name: &str) -> Option<&PyClass> {
        self.classes
            .iter()
            .find(|class| class.name.eq_ignore_ascii_case(name))
    }

    /// Latest import binding for a local name.
    pub fn binding(&self, name: &str) -> Option<&ImportBinding> {
        self.imports.iter().rev().find(|binding| binding.name == name)
    }
}

/// Source that cannot be tokenized or has a malformed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {})", self.message, self.line)
    }
}

impl std::error::Error for SyntaxError {}

fn syntax_error(line: usize, message: impl Into<String>) -> SyntaxError {
    SyntaxError {
        line,
        message: message.into(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Name,
    Number,
    Str,
    /// Byte and formatted strings: tokenized but never evaluated.
    OpaqueStr,
    Op,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    text: String,
}

impl Token {
    fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Op && self.text == op
    }

    fn is_name(&self, name: &str) -> bool {
        self.kind == TokenKind::Name && self.text == name
    }
}

#[derive(Debug)]
struct LogicalLine {
    line: usize,
    indent: usize,
    tokens: Vec<Token>,
}

const STRING_PREFIXES: &[&str] = &["r", "u", "b", "f", "br", "rb", "fr", "rf"];
const THREE_CHAR_OPS: &[&str] = &["**=", "//=", ">>=", "<<=", "..."];
const TWO_CHAR_OPS: &[&str] = &[
    "**", "//", "->", ":=", "==", "!=", "<=", ">=", "+=", "-=", "*=", "/=", "%=", "&=", "|=",
    "^=", "@=", "<<", ">>",
];

struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Tokenizer {
    fn new(source: &str) -> Self {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn logical_lines(mut self) -> Result<Vec<LogicalLine>, SyntaxError> {
        let mut lines = Vec::new();
        let mut tokens: Vec<Token> = Vec::new();
        let mut brackets: Vec<(char, usize)> = Vec::new();
        let mut indent = 0;
        let mut start_line = 1;
        let mut at_line_start = true;

        while self.pos < self.chars.len() {
            if at_line_start && brackets.is_empty() {
                let (column, blank) = self.measure_indent();
                if blank {
                    self.skip_to_line_end();
                    if self.peek_at(0) == Some('\n') {
                        self.pos += 1;
                        self.line += 1;
                    }
                    continue;
                }
                indent = column;
                start_line = self.line;
                at_line_start = false;
                continue;
            }

            let Some(c) = self.peek_at(0) else {
                break;
            };
            match c {
                ' ' | '\t' | '\r' | '\x0c' => self.pos += 1,
                '#' => self.skip_to_line_end(),
                '\\' if matches!(self.peek_at(1), Some('\n')) => {
                    self.pos += 2;
                    self.line += 1;
                }
                '\\' if self.peek_at(1) == Some('\r') && self.peek_at(2) == Some('\n') => {
                    self.pos += 3;
                    self.line += 1;
                }
                '\n' => {
                    self.pos += 1;
                    self.line += 1;
                    if brackets.is_empty() {
                        if !tokens.is_empty() {
                            lines.push(LogicalLine {
                                line: start_line,
                                indent,
                                tokens: std::mem::take(&mut tokens),
                            });
                        }
                        at_line_start = true;
                    }
                }
                '\'' | '"' => tokens.push(self.read_string("")?),
                '(' | '[' | '{' => {
                    brackets.push((c, self.line));
                    self.pos += 1;
                    tokens.push(op_token(c.to_string()));
                }
                ')' | ']' | '}' => {
                    let expected = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match brackets.pop() {
                        Some((open, _)) if open == expected => {}
                        Some((open, _)) => {
                            return Err(syntax_error(
                                self.line,
                                format!("closing '{c}' does not match opening '{open}'"),
                            ))
                        }
                        None => return Err(syntax_error(self.line, format!("unmatched '{c}'"))),
                    }
                    self.pos += 1;
                    tokens.push(op_token(c.to_string()));
                }
                c if c.is_ascii_digit()
                    || (c == '.' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit())) =>
                {
                    tokens.push(self.read_number());
                }
                c if c == '_' || c.is_alphabetic() => {
                    let ident = self.read_identifier();
                    let quote_follows = matches!(self.peek_at(0), Some('\'') | Some('"'));
                    let prefix = ident.to_ascii_lowercase();
                    if quote_follows && STRING_PREFIXES.contains(&prefix.as_str()) {
                        tokens.push(self.read_string(&ident)?);
                    } else {
                        tokens.push(Token {
                            kind: TokenKind::Name,
                            text: ident,
                        });
                    }
                }
                _ => tokens.push(self.read_operator()),
            }
        }

        if let Some((open, line)) = brackets.last() {
            return Err(syntax_error(*line, format!("'{open}' was never closed")));
        }
        if !tokens.is_empty() {
            lines.push(LogicalLine {
                line: start_line,
                indent,
                tokens,
            });
        }
        Ok(lines)
    }

    fn measure_indent(&mut self) -> (usize, bool) {
        let mut column = 0;
        while let Some(c) = self.peek_at(0) {
            match c {
                ' ' => column += 1,
                '\t' => column = (column / 8 + 1) * 8,
                '\x0c' => column = 0,
                _ => break,
            }
            self.pos += 1;
        }
        let blank = matches!(self.peek_at(0), None | Some('\n') | Some('\r') | Some('#'));
        (column, blank)
    }

    fn skip_to_line_end(&mut self) {
        while let Some(c) = self.peek_at(0) {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.peek_at(0) {
            if c == '_' || c.is_alphanumeric() {
                ident.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        ident
    }

    fn read_number(&mut self) -> Token {
        let mut text = String::new();
        let hex = self.peek_at(0) == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X'));
        while let Some(c) = self.peek_at(0) {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                text.push(c);
                self.pos += 1;
                let signed = matches!(self.peek_at(0), Some('+') | Some('-'));
                if !hex && (c == 'e' || c == 'E') && signed {
                    if let Some(sign) = self.peek_at(0) {
                        text.push(sign);
                        self.pos += 1;
                    }
                }
            } else {
                break;
            }
        }
        Token {
            kind: TokenKind::Number,
            text,
        }
    }

    fn read_operator(&mut self) -> Token {
        for width in [3, 2] {
            let candidate: String = self.chars.iter().skip(self.pos).take(width).collect();
            let table = if width == 3 { THREE_CHAR_OPS } else { TWO_CHAR_OPS };
            if candidate.chars().count() == width && table.contains(&candidate.as_str()) {
                self.pos += width;
                return op_token(candidate);
            }
        }
        let c = self.chars[self.pos];
        self.pos += 1;
        op_token(c.to_string())
    }

    fn read_string(&mut self, prefix: &str) -> Result<Token, SyntaxError> {
        let start_line = self.line;
        let lowered = prefix.to_ascii_lowercase();
        let raw = lowered.contains('r');
        let opaque = lowered.contains('b') || lowered.contains('f');
        let quote = self.chars[self.pos];
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        let mut value = String::new();
        loop {
            let Some(c) = self.peek_at(0) else {
                return Err(syntax_error(start_line, "unterminated string literal"));
            };
            if c == '\\' {
                let Some(next) = self.peek_at(1) else {
                    return Err(syntax_error(start_line, "unterminated string literal"));
                };
                if next == '\n' {
                    self.line += 1;
                }
                if raw {
                    value.push('\\');
                    value.push(next);
                } else {
                    match next {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '0' => value.push('\0'),
                        '\\' | '\'' | '"' => value.push(next),
                        '\n' => {}
                        other => {
                            value.push('\\');
                            value.push(other);
                        }
                    }
                }
                self.pos += 2;
                continue;
            }
            if c == quote {
                if !triple {
                    self.pos += 1;
                    break;
                }
                if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                    self.pos += 3;
                    break;
                }
            }
            if c == '\n' {
                if !triple {
                    return Err(syntax_error(start_line, "unterminated string literal"));
                }
                self.line += 1;
            }
            value.push(c);
            self.pos += 1;
        }

        Ok(Token {
            kind: if opaque {
                TokenKind::OpaqueStr
            } else {
                TokenKind::Str
            },
            text: value,
        })
    }
}

fn op_token(text: String) -> Token {
    Token {
        kind: TokenKind::Op,
        text,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    /// Body of a top-level class, indexed into `PyModule::classes`.
    Class(usize),
    /// Function bodies and nested classes: invisible to the reader.
    Opaque,
    /// `if`/`try`/`with`/... blocks that keep the enclosing scope.
    Compound,
}

#[derive(Debug, Clone, Copy)]
struct Block {
    indent: usize,
    kind: BlockKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Module,
    ClassBody(usize),
    Hidden,
}

fn current_scope(blocks: &[Block]) -> Scope {
    if blocks.iter().any(|block| block.kind == BlockKind::Opaque) {
        return Scope::Hidden;
    }
    match blocks.iter().rposition(|block| matches!(block.kind, BlockKind::Class(_))) {
        None => Scope::Module,
        Some(position) if position + 1 == blocks.len() => match blocks[position].kind {
            BlockKind::Class(index) => Scope::ClassBody(index),
            _ => Scope::Hidden,
        },
        Some(_) => Scope::Hidden,
    }
}

/// Parse Python source into its structural summary.
pub fn parse_module(source: &str) -> Result<PyModule, SyntaxError> {
    let lines = Tokenizer::new(source).logical_lines()?;
    let mut module = PyModule::default();
    let mut blocks: Vec<Block> = Vec::new();
    let mut pending_header: Option<(usize, usize)> = None;

    for line in &lines {
        if let Some((header_indent, header_line)) = pending_header.take() {
            if line.indent <= header_indent {
                return Err(syntax_error(
                    line.line,
                    format!("expected an indented block after line {header_line}"),
                ));
            }
        }
        while blocks.last().is_some_and(|block| block.indent >= line.indent) {
            blocks.pop();
        }

        let scope = current_scope(&blocks);
        let mut kind = BlockKind::Compound;
        let tokens = &line.tokens;

        for statement in split_top_level(tokens, ";") {
            let Some(first) = statement.first() else {
                continue;
            };
            if first.is_name("class") {
                if scope == Scope::Module {
                    let class = parse_class_header(statement, line.line)?;
                    module.classes.push(class);
                    kind = BlockKind::Class(module.classes.len() - 1);
                } else {
                    kind = BlockKind::Opaque;
                }
            } else if first.is_name("def") || first.is_name("async") {
                kind = BlockKind::Opaque;
            } else if first.is_name("import") && scope == Scope::Module {
                module.imports.extend(parse_import(statement, line.line)?);
            } else if first.is_name("from") && scope == Scope::Module {
                module.imports.extend(parse_from_import(statement, line.line)?);
            } else if let Some((name, value)) = parse_assignment(statement) {
                match scope {
                    Scope::Module => {
                        module.constants.insert(name, value);
                    }
                    Scope::ClassBody(index) => {
                        module.classes[index].attributes.insert(name, value);
                    }
                    Scope::Hidden => {}
                }
            }
        }

        if tokens.last().is_some_and(|token| token.is_op(":")) {
            blocks.push(Block {
                indent: line.indent,
                kind,
            });
            pending_header = Some((line.indent, line.line));
        }
    }

    if let Some((_, header_line)) = pending_header {
        return Err(syntax_error(
            header_line,
            format!("expected an indented block after line {header_line}"),
        ));
    }
    Ok(module)
}

fn parse_class_header(tokens: &[Token], line: usize) -> Result<PyClass, SyntaxError> {
    let name = match tokens.get(1) {
        Some(token) if token.kind == TokenKind::Name => token.text.clone(),
        _ => return Err(syntax_error(line, "invalid class statement")),
    };

    let mut bases = Vec::new();
    let mut index = 2;
    if tokens.get(index).is_some_and(|token| token.is_op("(")) {
        let close = matching_close(tokens, index)
            .ok_or_else(|| syntax_error(line, "invalid class statement"))?;
        for argument in split_top_level(&tokens[index + 1..close], ",") {
            if argument.is_empty() || contains_top_level(argument, "=") {
                continue;
            }
            if argument[0].is_op("*") || argument[0].is_op("**") {
                continue;
            }
            let (dotted, consumed) = dotted_name(argument);
            let trailing_subscript = argument.get(consumed).is_some_and(|token| token.is_op("["));
            if !dotted.is_empty() && (consumed == argument.len() || trailing_subscript) {
                bases.push(dotted);
            }
        }
        index = close + 1;
    }
    if !tokens.get(index).is_some_and(|token| token.is_op(":")) {
        return Err(syntax_error(line, "expected ':' after class declaration"));
    }

    Ok(PyClass {
        name,
        line,
        bases,
        attributes: BTreeMap::new(),
    })
}

fn parse_import(tokens: &[Token], line: usize) -> Result<Vec<ImportBinding>, SyntaxError> {
    let mut bindings = Vec::new();
    for clause in split_top_level(&tokens[1..], ",") {
        let (module, consumed) = dotted_name(clause);
        if module.is_empty() {
            return Err(syntax_error(line, "invalid import statement"));
        }
        // `import a.b` binds `a`; `import a.b as c` binds `c` to `a.b`.
        let (name, module) = match alias_after(clause, consumed, line)? {
            Some(alias) => (alias, module),
            None => {
                let head = module.split('.').next().unwrap_or(&module).to_string();
                (head.clone(), head)
            }
        };
        bindings.push(ImportBinding {
            name,
            module,
            level: 0,
            member: None,
        });
    }
    Ok(bindings)
}

fn parse_from_import(tokens: &[Token], line: usize) -> Result<Vec<ImportBinding>, SyntaxError> {
    let mut index = 1;
    let mut level = 0;
    while let Some(token) = tokens.get(index) {
        if token.is_op(".") {
            level += 1;
        } else if token.is_op("...") {
            level += 3;
        } else {
            break;
        }
        index += 1;
    }
    let (module, consumed) = dotted_name(&tokens[index..]);
    index += consumed;
    if module.is_empty() && level == 0 {
        return Err(syntax_error(line, "invalid import statement"));
    }
    if !tokens.get(index).is_some_and(|token| token.is_name("import")) {
        return Err(syntax_error(line, "expected 'import' in from-import statement"));
    }
    index += 1;

    let mut names = &tokens[index..];
    if names.first().is_some_and(|token| token.is_op("(")) {
        if !names.last().is_some_and(|token| token.is_op(")")) {
            return Err(syntax_error(line, "invalid import statement"));
        }
        names = &names[1..names.len() - 1];
    }
    if names.first().is_some_and(|token| token.is_op("*")) {
        return Ok(Vec::new());
    }

    let mut bindings = Vec::new();
    for clause in split_top_level(names, ",") {
        if clause.is_empty() {
            continue;
        }
        let member = match clause.first() {
            Some(token) if token.kind == TokenKind::Name => token.text.clone(),
            _ => return Err(syntax_error(line, "invalid import statement")),
        };
        let name = alias_after(clause, 1, line)?.unwrap_or_else(|| member.clone());
        bindings.push(ImportBinding {
            name,
            module: module.clone(),
            level,
            member: Some(member),
        });
    }
    if bindings.is_empty() {
        return Err(syntax_error(line, "invalid import statement"));
    }
    Ok(bindings)
}

fn alias_after(
    clause: &[Token],
    index: usize,
    line: usize,
) -> Result<Option<String>, SyntaxError> {
    let ends_after_alias = clause.len() == index + 2;
    match (clause.get(index), clause.get(index + 1)) {
        (None, _) => Ok(None),
        (Some(keyword), Some(alias))
            if keyword.is_name("as") && alias.kind == TokenKind::Name && ends_after_alias =>
        {
            Ok(Some(alias.text.clone()))
        }
        _ => Err(syntax_error(line, "invalid import statement")),
    }
}

fn parse_assignment(tokens: &[Token]) -> Option<(String, PyValue)> {
    let target = tokens.first().filter(|token| token.kind == TokenKind::Name)?;
    let second = tokens.get(1)?;
    if !(second.is_op("=") || second.is_op(":")) {
        return None;
    }
    // Chained targets share the value after the last top-level `=`.
    let parts = split_top_level(tokens, "=");
    if parts.len() < 2 {
        return None;
    }
    let value = parts.last()?;
    Some((target.text.clone(), parse_expression(value)))
}

fn dotted_name(tokens: &[Token]) -> (String, usize) {
    let mut name = String::new();
    let mut index = 0;
    while let Some(token) = tokens.get(index) {
        if token.kind != TokenKind::Name {
            break;
        }
        name.push_str(&token.text);
        index += 1;
        if tokens.get(index).is_some_and(|token| token.is_op("."))
            && tokens
                .get(index + 1)
                .is_some_and(|token| token.kind == TokenKind::Name)
        {
            name.push('.');
            index += 1;
        } else {
            break;
        }
    }
    (name, index)
}

fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, token) in tokens.iter().enumerate().skip(open) {
        if token.kind != TokenKind::Op {
            continue;
        }
        match token.text.as_str() {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level<'a>(tokens: &'a [Token], separator: &str) -> Vec<&'a [Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Op {
            continue;
        }
        match token.text.as_str() {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth = depth.saturating_sub(1),
            text if depth == 0 && text == separator => {
                parts.push(&tokens[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    if start < tokens.len() {
        parts.push(&tokens[start..]);
    }
    parts
}

fn contains_top_level(tokens: &[Token], op: &str) -> bool {
    split_top_level(tokens, op).len() > 1
}

fn parse_expression(tokens: &[Token]) -> PyValue {
    let mut parser = ValueParser { tokens, pos: 0 };
    match parser.value() {
        Some(value) if parser.pos == tokens.len() => value,
        _ => PyValue::Expr(render_tokens(tokens)),
    }
}

fn render_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for (index, token) in tokens.iter().enumerate() {
        let glue = token.is_op(".")
            || token.is_op(")")
            || token.is_op("]")
            || token.is_op(",")
            || token.is_op("(")
            || token.is_op("[")
            || tokens[index.saturating_sub(1)].is_op(".")
            || tokens[index.saturating_sub(1)].is_op("(")
            || tokens[index.saturating_sub(1)].is_op("[");
        if index > 0 && !glue {
            out.push(' ');
        }
        match token.kind {
            TokenKind::Str | TokenKind::OpaqueStr => {
                out.push('\'');
                out.push_str(&token.text);
                out.push('\'');
            }
            _ => out.push_str(&token.text),
        }
    }
    out
}

struct ValueParser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl ValueParser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.peek().is_some_and(|token| token.is_op(op)) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn value(&mut self) -> Option<PyValue> {
        let token = self.peek()?.clone();
        match token.kind {
            TokenKind::Str => {
                let mut text = String::new();
                while let Some(next) = self.peek() {
                    match next.kind {
                        TokenKind::Str => text.push_str(&next.text),
                        TokenKind::OpaqueStr => return None,
                        _ => break,
                    }
                    self.pos += 1;
                }
                Some(PyValue::Str(text))
            }
            TokenKind::OpaqueStr => None,
            TokenKind::Number => {
                self.pos += 1;
                parse_number(&token.text)
            }
            TokenKind::Name => self.name_value(),
            TokenKind::Op => match token.text.as_str() {
                "-" | "+" => {
                    self.pos += 1;
                    let negate = token.text == "-";
                    match self.value()? {
                        PyValue::Int(value) if negate => Some(PyValue::Int(-value)),
                        PyValue::Float(value) if negate => Some(PyValue::Float(-value)),
                        value @ (PyValue::Int(_) | PyValue::Float(_)) => Some(value),
                        _ => None,
                    }
                }
                "[" => {
                    self.pos += 1;
                    self.sequence("]").map(PyValue::List)
                }
                "(" => {
                    self.pos += 1;
                    if self.eat_op(")") {
                        return Some(PyValue::Tuple(Vec::new()));
                    }
                    let first = self.value()?;
                    if self.eat_op(")") {
                        return Some(first);
                    }
                    if !self.eat_op(",") {
                        return None;
                    }
                    let mut items = vec![first];
                    items.extend(self.sequence(")")?);
                    Some(PyValue::Tuple(items))
                }
                "{" => {
                    self.pos += 1;
                    self.dict()
                }
                _ => None,
            },
        }
    }

    fn name_value(&mut self) -> Option<PyValue> {
        let (dotted, consumed) = dotted_name(&self.tokens[self.pos..]);
        self.pos += consumed;
        if self
            .peek()
            .is_some_and(|token| token.is_op("(") || token.is_op("["))
        {
            return None;
        }
        Some(match dotted.as_str() {
            "None" => PyValue::None,
            "True" => PyValue::Bool(true),
            "False" => PyValue::Bool(false),
            _ => PyValue::Ref(dotted),
        })
    }

    fn sequence(&mut self, close: &str) -> Option<Vec<PyValue>> {
        let mut items = Vec::new();
        loop {
            if self.eat_op(close) {
                return Some(items);
            }
            items.push(self.value()?);
            if self.eat_op(close) {
                return Some(items);
            }
            if !self.eat_op(",") {
                return None;
            }
        }
    }

    fn dict(&mut self) -> Option<PyValue> {
        let mut entries = Vec::new();
        loop {
            if self.eat_op("}") {
                return Some(PyValue::Dict(entries));
            }
            let key = self.value()?;
            if !self.eat_op(":") {
                return None;
            }
            let value = self.value()?;
            entries.push((key, value));
            if self.eat_op("}") {
                return Some(PyValue::Dict(entries));
            }
            if !self.eat_op(",") {
                return None;
            }
        }
    }
}

fn parse_number(text: &str) -> Option<PyValue> {
    let cleaned = text.replace('_', "");
    let lowered = cleaned.to_ascii_lowercase();
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(digits) = lowered.strip_prefix(prefix) {
            return i64::from_str_radix(digits, radix).ok().map(PyValue::Int);
        }
    }
    if lowered.ends_with('j') {
        return None;
    }
    if lowered.contains('.') || lowered.contains('e') {
        return lowered.parse::<f64>().ok().map(PyValue::Float);
    }
    lowered.parse::<i64>().ok().map(PyValue::Int)
}

#[cfg(test)]
#[path = "python_tests.rs"]
mod tests;
