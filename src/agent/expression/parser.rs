//! Parser for the read-only expression language used by snapshot conditions
//! and watch expressions. The grammar covers exactly the side-effect-free
//! subset: literals, identifier reads, member and index access, arithmetic,
//! comparison and logical operators, the conditional operator, comma
//! sequences, grouping, object and array literals, `this`, and call syntax.
//! Assignments, declarations and control transfer are not in the grammar, so
//! they fail as unexpected tokens.

use super::ast::{BinaryOp, Expr, Literal, UnaryOp};
use nom::branch::alt;
use nom::bytes::complete::{is_not, take_while};
use nom::character::complete::{char, digit1, multispace0, one_of};
use nom::combinator::{cut, map, opt, recognize, verify};
use nom::error::context;
use nom::multi::{many0, separated_list0, separated_list1};
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated};
use nom::IResult;
use nom_supreme::error::ErrorTree;
use nom_supreme::final_parser::{final_parser, Location};
use nom_supreme::tag::complete::tag;

type Res<'a, O> = IResult<&'a str, O, ErrorTree<&'a str>>;

/// Statement and mutation keywords. None of them can appear in a read-only
/// expression, so none of them is a valid identifier.
const RESERVED: &[&str] = &[
    "var", "let", "const", "function", "return", "throw", "new", "delete", "debugger", "while",
    "for", "do", "if", "else", "switch", "case", "try", "catch", "finally", "class", "yield",
    "await", "in", "instanceof", "typeof", "void", "with",
];

const VALUE_KEYWORDS: &[&str] = &["this", "true", "false", "null", "undefined"];

fn sym<'a>(t: &'static str) -> impl FnMut(&'a str) -> Res<'a, &'a str> {
    preceded(multispace0, tag(t))
}

fn word(i: &str) -> Res<&str> {
    recognize(pair(
        one_of("abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_$"),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$'),
    ))(i)
}

fn identifier(i: &str) -> Res<&str> {
    verify(word, |w: &&str| {
        !RESERVED.contains(w) && !VALUE_KEYWORDS.contains(w)
    })(i)
}

fn keyword_value(i: &str) -> Res<Expr> {
    map(
        verify(word, |w: &&str| VALUE_KEYWORDS.contains(w)),
        |w| match w {
            "this" => Expr::This,
            "true" => Expr::Literal(Literal::Bool(true)),
            "false" => Expr::Literal(Literal::Bool(false)),
            "null" => Expr::Literal(Literal::Null),
            _ => Expr::Literal(Literal::Undefined),
        },
    )(i)
}

fn number(i: &str) -> Res<Expr> {
    map(
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
        |s: &str| {
            let literal = if s.contains('.') {
                Literal::Float(s.parse().unwrap_or_default())
            } else {
                match s.parse::<i64>() {
                    Ok(n) => Literal::Int(n),
                    Err(_) => Literal::Float(s.parse().unwrap_or_default()),
                }
            };
            Expr::Literal(literal)
        },
    )(i)
}

fn string_literal(i: &str) -> Res<Expr> {
    map(
        alt((
            delimited(char('"'), opt(is_not("\"")), char('"')),
            delimited(char('\''), opt(is_not("'")), char('\'')),
        )),
        |s: Option<&str>| Expr::Literal(Literal::Str(s.unwrap_or_default().to_string())),
    )(i)
}

fn array_literal(i: &str) -> Res<Expr> {
    map(
        preceded(
            sym("["),
            cut(terminated(
                separated_list0(sym(","), conditional),
                sym("]"),
            )),
        ),
        Expr::Array,
    )(i)
}

fn object_key(i: &str) -> Res<String> {
    preceded(
        multispace0,
        alt((
            map(word, str::to_string),
            map(
                delimited(char('"'), opt(is_not("\"")), char('"')),
                |s: Option<&str>| s.unwrap_or_default().to_string(),
            ),
            map(digit1, str::to_string),
        )),
    )(i)
}

fn object_literal(i: &str) -> Res<Expr> {
    map(
        preceded(
            sym("{"),
            cut(terminated(
                separated_list0(sym(","), separated_pair(object_key, sym(":"), conditional)),
                sym("}"),
            )),
        ),
        Expr::Object,
    )(i)
}

fn parens(i: &str) -> Res<Expr> {
    delimited(sym("("), expr, cut(sym(")")))(i)
}

fn primary(i: &str) -> Res<Expr> {
    preceded(
        multispace0,
        alt((
            number,
            string_literal,
            keyword_value,
            map(identifier, |id| Expr::Ident(id.to_string())),
            parens,
            array_literal,
            object_literal,
        )),
    )(i)
}

enum Post {
    Member(String),
    Index(Expr),
    Call(Vec<Expr>),
}

fn postfix(i: &str) -> Res<Expr> {
    let (i, initial) = primary(i)?;
    let (i, ops) = many0(alt((
        context(
            "member access",
            map(preceded(sym("."), cut(preceded(multispace0, word))), |f| {
                Post::Member(f.to_string())
            }),
        ),
        context(
            "index operator",
            map(
                preceded(sym("["), cut(terminated(conditional, sym("]")))),
                Post::Index,
            ),
        ),
        context(
            "call",
            map(
                preceded(
                    sym("("),
                    cut(terminated(separated_list0(sym(","), conditional), sym(")"))),
                ),
                Post::Call,
            ),
        ),
    )))(i)?;

    let folded = ops.into_iter().fold(initial, |acc, op| match op {
        Post::Member(field) => Expr::Member(Box::new(acc), field),
        Post::Index(idx) => Expr::Index(Box::new(acc), Box::new(idx)),
        Post::Call(args) => Expr::Call(Box::new(acc), args),
    });
    Ok((i, folded))
}

fn unary(i: &str) -> Res<Expr> {
    alt((
        map(preceded(sym("!"), unary), |e| {
            Expr::Unary(UnaryOp::Not, Box::new(e))
        }),
        map(preceded(sym("-"), unary), |e| {
            Expr::Unary(UnaryOp::Neg, Box::new(e))
        }),
        map(preceded(sym("+"), unary), |e| {
            Expr::Unary(UnaryOp::Plus, Box::new(e))
        }),
        postfix,
    ))(i)
}

fn fold_binary(initial: Expr, rest: Vec<(BinaryOp, Expr)>) -> Expr {
    rest.into_iter().fold(initial, |acc, (op, rhs)| {
        Expr::Binary(op, Box::new(acc), Box::new(rhs))
    })
}

fn multiplicative(i: &str) -> Res<Expr> {
    let op = preceded(
        multispace0,
        alt((
            map(tag("*"), |_| BinaryOp::Mul),
            map(tag("/"), |_| BinaryOp::Div),
            map(tag("%"), |_| BinaryOp::Rem),
        )),
    );
    let (i, initial) = unary(i)?;
    let (i, rest) = many0(pair(op, unary))(i)?;
    Ok((i, fold_binary(initial, rest)))
}

fn additive(i: &str) -> Res<Expr> {
    let op = preceded(
        multispace0,
        alt((
            map(tag("+"), |_| BinaryOp::Add),
            map(tag("-"), |_| BinaryOp::Sub),
        )),
    );
    let (i, initial) = multiplicative(i)?;
    let (i, rest) = many0(pair(op, multiplicative))(i)?;
    Ok((i, fold_binary(initial, rest)))
}

fn relational(i: &str) -> Res<Expr> {
    let op = preceded(
        multispace0,
        alt((
            map(tag("<="), |_| BinaryOp::Le),
            map(tag(">="), |_| BinaryOp::Ge),
            map(tag("<"), |_| BinaryOp::Lt),
            map(tag(">"), |_| BinaryOp::Gt),
        )),
    );
    let (i, initial) = additive(i)?;
    let (i, rest) = many0(pair(op, additive))(i)?;
    Ok((i, fold_binary(initial, rest)))
}

fn equality(i: &str) -> Res<Expr> {
    let op = preceded(
        multispace0,
        alt((
            map(tag("==="), |_| BinaryOp::StrictEq),
            map(tag("!=="), |_| BinaryOp::StrictNe),
            map(tag("=="), |_| BinaryOp::Eq),
            map(tag("!="), |_| BinaryOp::Ne),
        )),
    );
    let (i, initial) = relational(i)?;
    let (i, rest) = many0(pair(op, relational))(i)?;
    Ok((i, fold_binary(initial, rest)))
}

fn logic_and(i: &str) -> Res<Expr> {
    let op = preceded(multispace0, map(tag("&&"), |_| BinaryOp::And));
    let (i, initial) = equality(i)?;
    let (i, rest) = many0(pair(op, equality))(i)?;
    Ok((i, fold_binary(initial, rest)))
}

fn logic_or(i: &str) -> Res<Expr> {
    let op = preceded(multispace0, map(tag("||"), |_| BinaryOp::Or));
    let (i, initial) = logic_and(i)?;
    let (i, rest) = many0(pair(op, logic_and))(i)?;
    Ok((i, fold_binary(initial, rest)))
}

fn conditional(i: &str) -> Res<Expr> {
    let (i, cond) = logic_or(i)?;
    let (i, branches) = opt(preceded(
        sym("?"),
        cut(separated_pair(conditional, sym(":"), conditional)),
    ))(i)?;

    let expr = match branches {
        Some((then, otherwise)) => Expr::Conditional(
            Box::new(cond),
            Box::new(then),
            Box::new(otherwise),
        ),
        None => cond,
    };
    Ok((i, expr))
}

/// Parser for a full expression, comma sequences included.
pub fn expr(i: &str) -> Res<Expr> {
    map(separated_list1(sym(","), conditional), |mut items| {
        if items.len() == 1 {
            items.pop().expect("non-empty by construction")
        } else {
            Expr::Comma(items)
        }
    })(i)
}

/// Parse a user-supplied condition or watch expression. An empty input (or a
/// bare `;`) yields `None`, the always-true expression. Errors carry
/// `Unexpected token` phrasing and a source location.
pub fn parse(input: &str) -> Result<Option<Expr>, String> {
    let mut src = input.trim();
    if let Some(stripped) = src.strip_suffix(';') {
        src = stripped.trim_end();
    }
    if src.is_empty() {
        return Ok(None);
    }

    let result: Result<Expr, ErrorTree<Location>> =
        final_parser::<_, _, _, ErrorTree<Location>>(terminated(expr, multispace0))(src);
    result.map(Some).map_err(|tree| {
        let location = first_location(&tree);
        format!(
            "Unexpected token at line {}, column {}",
            location.line, location.column
        )
    })
}

fn first_location(tree: &ErrorTree<Location>) -> Location {
    match tree {
        ErrorTree::Base { location, .. } => *location,
        ErrorTree::Stack { base, .. } => first_location(base),
        ErrorTree::Alt(trees) => trees
            .first()
            .map(first_location)
            .unwrap_or(Location { line: 1, column: 1 }),
    }
}
