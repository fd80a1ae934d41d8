//! Relational operators and `<expr> <relop> <expr>` scalars

use super::postfix::FormulaExpression;
use super::FormulaError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static RELATION_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[~=<>!]+").expect("valid regex"));

/// Relation between the two sides of a formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Less,
    Greater,
    Equal,
    /// `~=`: type-set intersection, or case-insensitive name equality
    Similar,
    LessEqual,
    GreaterEqual,
    NotEqual,
}

impl Relation {
    pub fn symbol(&self) -> &'static str {
        match self {
            Relation::Less => "<",
            Relation::Greater => ">",
            Relation::Equal => "==",
            Relation::Similar => "~=",
            Relation::LessEqual => "<=",
            Relation::GreaterEqual => ">=",
            Relation::NotEqual => "!=",
        }
    }

    /// Numeric comparison; `~=` compares for equality
    pub fn compare(&self, left: f64, right: f64) -> bool {
        match self {
            Relation::Less => left < right,
            Relation::Greater => left > right,
            Relation::Equal | Relation::Similar => left == right,
            Relation::LessEqual => left <= right,
            Relation::GreaterEqual => left >= right,
            Relation::NotEqual => left != right,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl std::str::FromStr for Relation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<" => Ok(Relation::Less),
            ">" => Ok(Relation::Greater),
            "==" => Ok(Relation::Equal),
            "~=" => Ok(Relation::Similar),
            "<=" => Ok(Relation::LessEqual),
            ">=" => Ok(Relation::GreaterEqual),
            "!=" => Ok(Relation::NotEqual),
            _ => Err(format!("Unknown relation: {}", s)),
        }
    }
}

/// Remove whitespace outside quoted literals
fn strip_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    for c in text.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                out.push(c);
            }
            None if c.is_whitespace() => {}
            None => {
                if c == '\'' || c == '"' {
                    quote = Some(c);
                }
                out.push(c);
            }
        }
    }
    out
}

/// Byte ranges of quoted literals
fn quoted_ranges(text: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut open: Option<(char, usize)> = None;
    for (i, c) in text.char_indices() {
        match open {
            Some((q, start)) if c == q => {
                ranges.push((start, i));
                open = None;
            }
            Some(_) => {}
            None if c == '\'' || c == '"' => open = Some((c, i)),
            None => {}
        }
    }
    if let Some((_, start)) = open {
        ranges.push((start, text.len()));
    }
    ranges
}

/// Sign a side: a leading `-` gets a synthetic `0` in front
fn prefix_sign(side: &str) -> String {
    if side.starts_with('-') {
        format!("0{}", side)
    } else {
        side.to_string()
    }
}

/// A scalar formula split into its sides, before compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarFormula {
    pub left: String,
    pub relation: Relation,
    pub right: String,
}

/// Split `L <relop> R`. There must be exactly one relational run.
pub fn parse_scalar(formula: &str) -> Result<ScalarFormula, FormulaError> {
    let text = strip_whitespace(formula);
    let quoted = quoted_ranges(&text);
    let runs: Vec<_> = RELATION_RUN
        .find_iter(&text)
        .filter(|m| !quoted.iter().any(|(s, e)| m.start() > *s && m.start() < *e))
        .collect();

    let [run] = runs.as_slice() else {
        return Err(FormulaError::SideCount(formula.to_string()));
    };

    let relation: Relation = run
        .as_str()
        .parse()
        .map_err(|_| FormulaError::UnknownRelation(run.as_str().to_string()))?;
    let left = &text[..run.start()];
    let right = &text[run.end()..];
    if left.is_empty() || right.is_empty() {
        return Err(FormulaError::EmptySide(formula.to_string()));
    }

    Ok(ScalarFormula {
        left: prefix_sign(left),
        relation,
        right: prefix_sign(right),
    })
}

/// Compiled comparison `left <relation> right`
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub source: String,
    pub left: FormulaExpression,
    pub relation: Relation,
    pub right: FormulaExpression,
}

impl Formula {
    pub fn parse(formula: &str) -> Result<Self, FormulaError> {
        let scalar = parse_scalar(formula)?;
        Ok(Self {
            source: formula.to_string(),
            left: FormulaExpression::parse(&scalar.left)?,
            relation: scalar.relation,
            right: FormulaExpression::parse(&scalar.right)?,
        })
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalar() {
        let scalar = parse_scalar("LOC >= 2 * NOA").unwrap();
        assert_eq!(scalar.left, "LOC");
        assert_eq!(scalar.relation, Relation::GreaterEqual);
        assert_eq!(scalar.right, "2*NOA");
    }

    #[test]
    fn test_every_relation() {
        for symbol in ["<", ">", "==", "~=", "<=", ">=", "!="] {
            let scalar = parse_scalar(&format!("a {} b", symbol)).unwrap();
            assert_eq!(scalar.relation.symbol(), symbol);
        }
    }

    #[test]
    fn test_leading_minus_gets_zero() {
        let scalar = parse_scalar("-(3+2)*2 == -10").unwrap();
        assert_eq!(scalar.left, "0-(3+2)*2");
        assert_eq!(scalar.right, "0-10");
    }

    #[test]
    fn test_side_count() {
        assert!(matches!(parse_scalar("LOC"), Err(FormulaError::SideCount(_))));
        assert!(matches!(
            parse_scalar("a == b == c"),
            Err(FormulaError::SideCount(_))
        ));
        assert!(matches!(parse_scalar("== 2"), Err(FormulaError::EmptySide(_))));
        assert!(matches!(
            parse_scalar("a => b"),
            Err(FormulaError::UnknownRelation(_))
        ));
    }

    #[test]
    fn test_relation_inside_literal_ignored() {
        let scalar = parse_scalar("name == 'a == b'").unwrap();
        assert_eq!(scalar.left, "name");
        assert_eq!(scalar.right, "'a == b'");
    }

    #[test]
    fn test_compare() {
        assert!(Relation::Less.compare(1.0, 2.0));
        assert!(!Relation::Greater.compare(1.0, 2.0));
        assert!(Relation::LessEqual.compare(2.0, 2.0));
        assert!(Relation::NotEqual.compare(2.0, 3.0));
        assert!(Relation::Similar.compare(3.0, 3.0));
    }

    #[test]
    fn test_formula_parse() {
        let formula = Formula::parse("-(3+2)*2 == -10").unwrap();
        let left = formula
            .left
            .calculate::<FormulaError, _>(|_| Ok(0.0))
            .unwrap();
        let right = formula
            .right
            .calculate::<FormulaError, _>(|_| Ok(0.0))
            .unwrap();
        assert!(formula.relation.compare(left, right));
        assert_eq!(left, -10.0);
    }
}
