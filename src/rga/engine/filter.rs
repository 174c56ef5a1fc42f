//! Evaluation of the native filters emitted by the query compiler.
//!
//! A filter reads `field:expression`.  An expression is a single value or a
//! parenthesised group of expressions joined by ` || ` or ` && `.  Colons in
//! values are escaped as `\:`.  A value matches a record if it equals one of
//! the values of the field.

use crate::rga::model::record::RgaRecord;

/// Error type for native filters.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("filter {0:?} has no field")]
    MissingField(String),
    #[error("filter {0:?} has an empty expression")]
    EmptyExpression(String),
    #[error("unbalanced parentheses in filter {0:?}")]
    Unbalanced(String),
    #[error("mixed operators in one group of filter {0:?}")]
    MixedOperators(String),
}

/// Parsed filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Value(String),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    fn matches(&self, values: &[String]) -> bool {
        match self {
            Expr::Value(value) => values.iter().any(|v| v == value),
            Expr::And(terms) => terms.iter().all(|term| term.matches(values)),
            Expr::Or(terms) => terms.iter().any(|term| term.matches(values)),
        }
    }
}

/// Filter on one field of the flat records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub expr: Expr,
}

impl Filter {
    /// Parse from the native `field:expression` syntax.
    pub fn parse(filter: &str) -> Result<Self, Error> {
        let (field, expression) = filter
            .split_once(':')
            .filter(|(field, _)| !field.is_empty())
            .ok_or_else(|| Error::MissingField(filter.to_string()))?;

        let tokens = tokenize(expression);
        if tokens.is_empty() {
            return Err(Error::EmptyExpression(filter.to_string()));
        }
        let mut pos = 0;
        let expr = parse_group(&tokens, &mut pos, filter)?;
        if pos != tokens.len() {
            return Err(Error::Unbalanced(filter.to_string()));
        }
        Ok(Self {
            field: field.to_string(),
            expr,
        })
    }

    pub fn matches(&self, record: &RgaRecord) -> bool {
        self.expr.matches(&record.field_values(&self.field))
    }
}

/// Whether `record` passes all `filters`.
pub fn matches_all(filters: &[Filter], record: &RgaRecord) -> bool {
    filters.iter().all(|filter| filter.matches(record))
}

/// Parse all `filters`.
pub fn parse_all(filters: &[String]) -> Result<Vec<Filter>, Error> {
    filters.iter().map(|filter| Filter::parse(filter)).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    And,
    Or,
    Value(String),
}

/// Split on blanks; consecutive words form one value.
fn tokenize(expression: &str) -> Vec<Token> {
    let mut result = Vec::new();
    let mut words: Vec<&str> = Vec::new();
    let flush = |words: &mut Vec<&str>, result: &mut Vec<Token>| {
        if !words.is_empty() {
            result.push(Token::Value(words.join(" ").replace("\\:", ":")));
            words.clear();
        }
    };
    for word in expression.split(' ').filter(|w| !w.is_empty()) {
        let token = match word {
            "(" => Token::Open,
            ")" => Token::Close,
            "&&" => Token::And,
            "||" => Token::Or,
            _ => {
                words.push(word);
                continue;
            }
        };
        flush(&mut words, &mut result);
        result.push(token);
    }
    flush(&mut words, &mut result);
    result
}

/// Parse a sequence of terms joined by one operator kind.
fn parse_group(tokens: &[Token], pos: &mut usize, filter: &str) -> Result<Expr, Error> {
    let mut terms = vec![parse_term(tokens, pos, filter)?];
    let mut op: Option<Token> = None;
    while let Some(token @ (Token::And | Token::Or)) = tokens.get(*pos) {
        match &op {
            Some(previous) if previous != token => {
                return Err(Error::MixedOperators(filter.to_string()))
            }
            _ => op = Some(token.clone()),
        }
        *pos += 1;
        terms.push(parse_term(tokens, pos, filter)?);
    }
    Ok(match op {
        Some(Token::And) => Expr::And(terms),
        Some(_) => Expr::Or(terms),
        None => terms.remove(0),
    })
}

fn parse_term(tokens: &[Token], pos: &mut usize, filter: &str) -> Result<Expr, Error> {
    match tokens.get(*pos) {
        Some(Token::Value(value)) => {
            *pos += 1;
            Ok(Expr::Value(value.clone()))
        }
        Some(Token::Open) => {
            *pos += 1;
            let expr = parse_group(tokens, pos, filter)?;
            if tokens.get(*pos) != Some(&Token::Close) {
                return Err(Error::Unbalanced(filter.to_string()));
            }
            *pos += 1;
            Ok(expr)
        }
        Some(_) => Err(Error::Unbalanced(filter.to_string())),
        None => Err(Error::EmptyExpression(filter.to_string())),
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn value(v: &str) -> Expr {
        Expr::Value(v.to_string())
    }

    #[rstest::rstest]
    #[case("geneName:BRCA1", value("BRCA1"))]
    #[case("variants:1\\:100\\:A\\:G", value("1:100:A:G"))]
    #[case("phenotypes:Phenotypic abnormality", value("Phenotypic abnormality"))]
    #[case(
        "compoundFilters:( HOA__P__1583 || HOA__NP__1583 )",
        Expr::Or(vec![value("HOA__P__1583"), value("HOA__NP__1583")])
    )]
    #[case(
        "compoundFilters:( ( a && b ) || c )",
        Expr::Or(vec![Expr::And(vec![value("a"), value("b")]), value("c")])
    )]
    fn parse(#[case] filter: &str, #[case] expected: Expr) -> Result<(), anyhow::Error> {
        assert_eq!(Filter::parse(filter)?.expr, expected);
        Ok(())
    }

    #[rstest::rstest]
    #[case("BRCA1", Error::MissingField("BRCA1".into()))]
    #[case("geneName:", Error::EmptyExpression("geneName:".into()))]
    #[case("geneName:( a || b", Error::Unbalanced("geneName:( a || b".into()))]
    #[case("geneName:a )", Error::Unbalanced("geneName:a )".into()))]
    #[case("geneName:( a || b && c )", Error::MixedOperators("geneName:( a || b && c )".into()))]
    fn parse_errors(#[case] filter: &str, #[case] expected: Error) {
        assert_eq!(Filter::parse(filter), Err(expected));
    }

    #[test]
    fn matches() -> Result<(), anyhow::Error> {
        let record = RgaRecord {
            gene_name: "BRCA1".into(),
            consequence_types: vec!["SO:0001583".into(), "SO:0001587".into()],
            ..Default::default()
        };
        let filters = parse_all(&[
            "geneName:( BRCA1 || BRCA2 )".to_string(),
            "consequenceTypes:( SO\\:0001583 && SO\\:0001587 )".to_string(),
        ])?;
        assert!(matches_all(&filters, &record));
        assert!(!Filter::parse("consequenceTypes:( SO\\:0001583 && SO\\:0001630 )")?.matches(&record));
        assert!(!Filter::parse("geneName:TP53")?.matches(&record));
        assert!(!Filter::parse("unknownField:x")?.matches(&record));
        Ok(())
    }
}
