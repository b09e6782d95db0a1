//! Filter expressions.
//!
//! Supports a small predicate language over object properties:
//! - comparisons: `==` `=` `!=` `<>` `<` `<=` `>` `>=`
//! - string operators: `BEGINSWITH` `ENDSWITH` `CONTAINS` `LIKE`, with an
//!   optional `[c]` suffix for case-insensitive matching
//! - logic: `AND` `&&` `OR` `||` `NOT` `!` and parentheses
//! - constants: `TRUEPREDICATE` `FALSEPREDICATE`
//! - literals: integers, floats, `"..."` / `'...'` strings, `true`, `false`,
//!   `null` / `nil`
//! - positional arguments: `$0`, `$1`, ...
//!
//! Keywords are case-insensitive. `LIKE` patterns use `*` for any run of
//! characters and `?` for exactly one.

use crate::error::{Error, Result};
use crate::object::Object;
use crate::schema::ObjectSchema;
use core::cmp::Ordering;
use livebind_core::Value;

/// A parsed filter expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// `left op right`
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
        case_insensitive: bool,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// `TRUEPREDICATE` / `FALSEPREDICATE`
    Const(bool),
}

/// One side of a comparison.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Property(String),
    Literal(Value),
    /// `$n`, replaced by a literal when arguments are bound.
    Argument(usize),
}

/// Comparison operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    BeginsWith,
    EndsWith,
    Contains,
    Like,
}

impl CompareOp {
    fn is_string_op(self) -> bool {
        matches!(
            self,
            CompareOp::BeginsWith | CompareOp::EndsWith | CompareOp::Contains | CompareOp::Like
        )
    }
}

/// Parses an expression.
pub fn parse(input: &str) -> Result<Expr> {
    let mut parser = Parser::new(input);
    let expr = parser.parse_or()?;
    parser.skip_whitespace();
    if parser.pos < input.len() {
        return Err(Error::invalid_filter("unexpected trailing input", parser.pos));
    }
    Ok(expr)
}

impl Expr {
    /// Replaces every `$n` with `args[n]`.
    pub fn bind(self, args: &[Value]) -> Result<Expr> {
        Ok(match self {
            Expr::Compare {
                left,
                op,
                right,
                case_insensitive,
            } => Expr::Compare {
                left: left.bind(args)?,
                op,
                right: right.bind(args)?,
                case_insensitive,
            },
            Expr::And(a, b) => Expr::And(Box::new(a.bind(args)?), Box::new(b.bind(args)?)),
            Expr::Or(a, b) => Expr::Or(Box::new(a.bind(args)?), Box::new(b.bind(args)?)),
            Expr::Not(a) => Expr::Not(Box::new(a.bind(args)?)),
            Expr::Const(b) => Expr::Const(b),
        })
    }

    /// Checks that every referenced property is stored on the schema.
    pub fn validate(&self, schema: &ObjectSchema) -> Result<()> {
        match self {
            Expr::Compare { left, right, .. } => {
                left.validate(schema)?;
                right.validate(schema)
            }
            Expr::And(a, b) | Expr::Or(a, b) => {
                a.validate(schema)?;
                b.validate(schema)
            }
            Expr::Not(a) => a.validate(schema),
            Expr::Const(_) => Ok(()),
        }
    }

    /// Evaluates the expression against an object. Arguments must be bound.
    pub fn matches(&self, object: &Object) -> bool {
        match self {
            Expr::Compare {
                left,
                op,
                right,
                case_insensitive,
            } => {
                let (Some(l), Some(r)) = (left.resolve(object), right.resolve(object)) else {
                    return false;
                };
                compare(l, *op, r, *case_insensitive)
            }
            Expr::And(a, b) => a.matches(object) && b.matches(object),
            Expr::Or(a, b) => a.matches(object) || b.matches(object),
            Expr::Not(a) => !a.matches(object),
            Expr::Const(b) => *b,
        }
    }
}

impl Operand {
    fn bind(self, args: &[Value]) -> Result<Operand> {
        match self {
            Operand::Argument(index) => args
                .get(index)
                .cloned()
                .map(Operand::Literal)
                .ok_or(Error::MissingArgument {
                    index,
                    provided: args.len(),
                }),
            other => Ok(other),
        }
    }

    fn validate(&self, schema: &ObjectSchema) -> Result<()> {
        match self {
            Operand::Property(name) => schema.stored_property(name).map(|_| ()),
            _ => Ok(()),
        }
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Value> {
        static NULL: Value = Value::Null;
        match self {
            Operand::Property(name) => Some(object.get(name).unwrap_or(&NULL)),
            Operand::Literal(v) => Some(v),
            Operand::Argument(_) => None,
        }
    }
}

fn compare(left: &Value, op: CompareOp, right: &Value, case_insensitive: bool) -> bool {
    if op.is_string_op() {
        let (Some(l), Some(r)) = (left.as_str(), right.as_str()) else {
            return false;
        };
        return if case_insensitive {
            string_op(&l.to_lowercase(), op, &r.to_lowercase())
        } else {
            string_op(l, op, r)
        };
    }

    match op {
        CompareOp::Eq => equals(left, right, case_insensitive),
        CompareOp::Ne => !equals(left, right, case_insensitive),
        _ => {
            let Some(ord) = order(left, right) else {
                return false;
            };
            match op {
                CompareOp::Lt => ord == Ordering::Less,
                CompareOp::Le => ord != Ordering::Greater,
                CompareOp::Gt => ord == Ordering::Greater,
                CompareOp::Ge => ord != Ordering::Less,
                _ => false,
            }
        }
    }
}

fn equals(left: &Value, right: &Value, case_insensitive: bool) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) if case_insensitive => {
            a.to_lowercase() == b.to_lowercase()
        }
        _ => order(left, right) == Some(Ordering::Equal),
    }
}

/// Orders two non-null values of compatible types.
fn order(left: &Value, right: &Value) -> Option<Ordering> {
    let (lt, rt) = (left.data_type()?, right.data_type()?);
    if lt == rt || (lt.is_numeric() && rt.is_numeric()) {
        Some(left.cmp(right))
    } else {
        None
    }
}

fn string_op(value: &str, op: CompareOp, pattern: &str) -> bool {
    match op {
        CompareOp::BeginsWith => value.starts_with(pattern),
        CompareOp::EndsWith => value.ends_with(pattern),
        CompareOp::Contains => value.contains(pattern),
        CompareOp::Like => like(value, pattern),
        _ => false,
    }
}

/// Wildcard matching: `*` matches any run of characters, `?` exactly one.
///
/// ```
/// use livebind_memory::filter::like;
/// assert!(like("Person 1", "Person*"));
/// assert!(like("Person 1", "?erson ?"));
/// assert!(!like("Person 1", "Task*"));
/// ```
pub fn like(value: &str, pattern: &str) -> bool {
    let v: Vec<char> = value.chars().collect();
    let p: Vec<char> = pattern.chars().collect();

    let (mut vi, mut pi) = (0, 0);
    // Last `*` seen and the value position it currently absorbs up to.
    let mut star: Option<(usize, usize)> = None;
    while vi < v.len() {
        match p.get(pi) {
            Some('*') => {
                star = Some((pi, vi));
                pi += 1;
            }
            Some(&ch) if ch == '?' || ch == v[vi] => {
                vi += 1;
                pi += 1;
            }
            _ => match star {
                Some((star_pi, star_vi)) => {
                    pi = star_pi + 1;
                    vi = star_vi + 1;
                    star = Some((star_pi, vi));
                }
                None => return false,
            },
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

// =========================================================================
// Parser
// =========================================================================

/// Parser state.
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Consumes `symbol` if the input continues with it.
    fn eat_symbol(&mut self, symbol: &str) -> bool {
        self.skip_whitespace();
        if self.rest().starts_with(symbol) {
            self.pos += symbol.len();
            true
        } else {
            false
        }
    }

    /// Consumes a case-insensitive keyword not followed by an identifier char.
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        let rest = self.rest();
        if rest.len() < keyword.len() || !rest.is_char_boundary(keyword.len()) {
            return false;
        }
        let (head, tail) = rest.split_at(keyword.len());
        let boundary = tail.chars().next().map_or(true, |c| !is_ident_char(c));
        if head.eq_ignore_ascii_case(keyword) && boundary {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.eat_symbol("||") || self.eat_keyword("OR") {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.eat_symbol("&&") || self.eat_keyword("AND") {
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        self.skip_whitespace();
        if self.rest().starts_with('!') && !self.rest().starts_with("!=") {
            self.advance();
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        if self.eat_keyword("NOT") {
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        if self.eat_symbol("(") {
            let expr = self.parse_or()?;
            if !self.eat_symbol(")") {
                return Err(Error::invalid_filter("expected ')'", self.pos));
            }
            return Ok(expr);
        }
        if self.eat_keyword("TRUEPREDICATE") {
            return Ok(Expr::Const(true));
        }
        if self.eat_keyword("FALSEPREDICATE") {
            return Ok(Expr::Const(false));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_operand()?;
        let op = self.parse_operator()?;
        let case_insensitive = self.eat_symbol("[c]");
        let right = self.parse_operand()?;
        Ok(Expr::Compare {
            left,
            op,
            right,
            case_insensitive,
        })
    }

    fn parse_operator(&mut self) -> Result<CompareOp> {
        // Longest symbols first.
        const SYMBOLS: &[(&str, CompareOp)] = &[
            ("==", CompareOp::Eq),
            ("!=", CompareOp::Ne),
            ("<>", CompareOp::Ne),
            ("<=", CompareOp::Le),
            (">=", CompareOp::Ge),
            ("=", CompareOp::Eq),
            ("<", CompareOp::Lt),
            (">", CompareOp::Gt),
        ];
        const KEYWORDS: &[(&str, CompareOp)] = &[
            ("BEGINSWITH", CompareOp::BeginsWith),
            ("ENDSWITH", CompareOp::EndsWith),
            ("CONTAINS", CompareOp::Contains),
            ("LIKE", CompareOp::Like),
        ];

        for (symbol, op) in SYMBOLS {
            if self.eat_symbol(symbol) {
                return Ok(*op);
            }
        }
        for (keyword, op) in KEYWORDS {
            if self.eat_keyword(keyword) {
                return Ok(*op);
            }
        }
        Err(Error::invalid_filter("expected comparison operator", self.pos))
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        self.skip_whitespace();
        let start = self.pos;
        match self.peek() {
            Some('$') => {
                self.advance();
                let digits = self.take_while(|c| c.is_ascii_digit());
                digits
                    .parse::<usize>()
                    .map(Operand::Argument)
                    .map_err(|_| Error::invalid_filter("expected argument index after '$'", start))
            }
            Some(q @ ('"' | '\'')) => self.parse_string(q).map(|s| Operand::Literal(Value::String(s))),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => self.parse_number(),
            Some(c) if is_ident_start(c) => {
                let ident = self.take_while(is_ident_char);
                Ok(match ident.to_ascii_lowercase().as_str() {
                    "true" => Operand::Literal(Value::Bool(true)),
                    "false" => Operand::Literal(Value::Bool(false)),
                    "null" | "nil" => Operand::Literal(Value::Null),
                    _ => Operand::Property(ident.to_string()),
                })
            }
            Some(_) => Err(Error::invalid_filter("expected operand", start)),
            None => Err(Error::invalid_filter("unexpected end of expression", start)),
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<String> {
        let start = self.pos;
        self.advance();
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(Error::invalid_filter("unterminated string", start)),
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(out);
                }
                Some('\\') => {
                    self.advance();
                    match self.peek() {
                        Some(c) => {
                            out.push(c);
                            self.advance();
                        }
                        None => return Err(Error::invalid_filter("unterminated string", start)),
                    }
                }
                Some(c) => {
                    out.push(c);
                    self.advance();
                }
            }
        }
    }

    fn parse_number(&mut self) -> Result<Operand> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.advance();
        }
        self.take_while(|c| c.is_ascii_digit() || c == '.');
        if matches!(self.peek(), Some('e' | 'E')) {
            self.advance();
            if matches!(self.peek(), Some('-' | '+')) {
                self.advance();
            }
            self.take_while(|c| c.is_ascii_digit());
        }
        let text = &self.input[start..self.pos];
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Operand::Literal(Value::Int(i)));
        }
        text.parse::<f64>()
            .map(|f| Operand::Literal(Value::Float(f)))
            .map_err(|_| Error::invalid_filter("invalid number", start))
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if pred(c) {
                self.advance();
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PropertyType;
    use hashbrown::HashMap;

    fn person(name: &str, age: i64) -> Object {
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), Value::from(name));
        fields.insert("age".to_string(), Value::Int(age));
        fields.insert("nickname".to_string(), Value::Null);
        Object::new("Person", Value::from(name), 1, fields)
    }

    fn eval(filter: &str, args: &[Value], obj: &Object) -> bool {
        parse(filter).unwrap().bind(args).unwrap().matches(obj)
    }

    #[test]
    fn test_parse_simple_comparison() {
        let expr = parse("age > 30").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                left: Operand::Property("age".into()),
                op: CompareOp::Gt,
                right: Operand::Literal(Value::Int(30)),
                case_insensitive: false,
            }
        );
    }

    #[test]
    fn test_parse_argument() {
        let expr = parse("age > $0").unwrap();
        assert!(matches!(
            expr,
            Expr::Compare {
                right: Operand::Argument(0),
                ..
            }
        ));
    }

    #[test]
    fn test_numeric_comparisons() {
        let p = person("Person 2", 35);
        assert!(eval("age > 30", &[], &p));
        assert!(eval("age >= 35", &[], &p));
        assert!(!eval("age < 35", &[], &p));
        assert!(eval("age <= 35.0", &[], &p));
        assert!(eval("age == 35", &[], &p));
        assert!(eval("age = 35", &[], &p));
        assert!(eval("age != 36", &[], &p));
        assert!(eval("age <> 36", &[], &p));
        assert!(eval("30 < age", &[], &p));
    }

    #[test]
    fn test_bound_arguments() {
        let p = person("Person 2", 35);
        assert!(eval("age > $0", &[Value::Int(30)], &p));
        assert!(!eval("age > $0", &[Value::Int(40)], &p));
        assert!(eval("age > $0 && name == $1", &[Value::Int(30), "Person 2".into()], &p));
    }

    #[test]
    fn test_missing_argument() {
        let err = parse("age > $1").unwrap().bind(&[Value::Int(1)]).unwrap_err();
        assert_eq!(err, Error::MissingArgument { index: 1, provided: 1 });
    }

    #[test]
    fn test_logic_and_precedence() {
        let p = person("Person 1", 25);
        assert!(eval("age > 30 OR name == 'Person 1'", &[], &p));
        assert!(!eval("age > 30 AND name == 'Person 1'", &[], &p));
        assert!(eval("NOT age > 30", &[], &p));
        assert!(eval("!(age > 30)", &[], &p));
        // AND binds tighter than OR
        assert!(eval("age < 30 || age > 40 && name == 'x'", &[], &p));
        assert!(!eval("(age < 30 || age > 40) && name == 'x'", &[], &p));
    }

    #[test]
    fn test_string_operators() {
        let p = person("Person 1", 25);
        assert!(eval("name BEGINSWITH 'Per'", &[], &p));
        assert!(eval("name ENDSWITH \"1\"", &[], &p));
        assert!(eval("name CONTAINS 'son'", &[], &p));
        assert!(!eval("name CONTAINS 'SON'", &[], &p));
        assert!(eval("name CONTAINS[c] 'SON'", &[], &p));
        assert!(eval("name beginswith[c] 'person'", &[], &p));
        assert!(eval("name LIKE 'P*n ?'", &[], &p));
        assert!(eval("name ==[c] 'person 1'", &[], &p));
    }

    #[test]
    fn test_null_comparisons() {
        let p = person("Person 1", 25);
        assert!(eval("nickname == null", &[], &p));
        assert!(eval("nickname = nil", &[], &p));
        assert!(!eval("nickname != null", &[], &p));
        assert!(!eval("nickname > 3", &[], &p));
        assert!(eval("name != null", &[], &p));
    }

    #[test]
    fn test_mismatched_types_never_match() {
        let p = person("Person 1", 25);
        assert!(!eval("age == '25'", &[], &p));
        assert!(!eval("name > 3", &[], &p));
        assert!(!eval("age CONTAINS '2'", &[], &p));
    }

    #[test]
    fn test_constants() {
        let p = person("Person 1", 25);
        assert!(eval("TRUEPREDICATE", &[], &p));
        assert!(!eval("FALSEPREDICATE", &[], &p));
        assert!(eval("truepredicate OR age > 100", &[], &p));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse("age >"), Err(Error::InvalidFilter { .. })));
        assert!(matches!(parse("age 30"), Err(Error::InvalidFilter { .. })));
        assert!(matches!(parse("(age > 30"), Err(Error::InvalidFilter { .. })));
        assert!(matches!(parse("name == 'open"), Err(Error::InvalidFilter { .. })));
        assert!(matches!(parse("age > 30 garbage"), Err(Error::InvalidFilter { .. })));
        assert!(matches!(parse("age > $x"), Err(Error::InvalidFilter { .. })));
        assert!(matches!(parse(""), Err(Error::InvalidFilter { .. })));
    }

    #[test]
    fn test_keyword_prefix_is_property() {
        // "order" starts with "OR" but is an identifier
        let expr = parse("order > 1").unwrap();
        assert!(matches!(
            expr,
            Expr::Compare {
                left: Operand::Property(ref name),
                ..
            } if name == "order"
        ));
    }

    #[test]
    fn test_validate_against_schema() {
        let schema = ObjectSchema::new("Person")
            .property("name", PropertyType::String)
            .property("age", PropertyType::Int);
        assert!(parse("age > 1").unwrap().validate(&schema).is_ok());
        let err = parse("height > 1").unwrap().validate(&schema).unwrap_err();
        assert_eq!(err, Error::unknown_property("Person", "height"));
    }

    #[test]
    fn test_like_wildcards() {
        assert!(like("hello", "h*o"));
        assert!(like("hello", "?ello"));
        assert!(like("", "*"));
        assert!(!like("hello", "h?o"));
        assert!(like("abcbd", "*b*d"));
        assert!(like("abc", "a**c"));
        assert!(!like("abc", "a*b"));
        assert!(!like("", "?"));
    }

    #[test]
    fn test_like_many_stars_on_long_input() {
        let long = "a".repeat(2000);
        assert!(!like(&long, "*a*a*a*a*a*a*a*a*b"));
        assert!(like(&format!("{long}b"), "*a*a*a*a*a*a*a*a*b"));
    }

    #[test]
    fn test_exponent_literals() {
        assert_eq!(
            parse("score > 1e-5").unwrap(),
            Expr::Compare {
                left: Operand::Property("score".into()),
                op: CompareOp::Gt,
                right: Operand::Literal(Value::Float(1e-5)),
                case_insensitive: false,
            }
        );
        let p = person("Person 2", 35);
        assert!(!eval("age < 3.5E+1", &[], &p));
        assert!(eval("age == 3.5e1", &[], &p));
        assert!(matches!(parse("age > 1e"), Err(Error::InvalidFilter { .. })));
    }
}
