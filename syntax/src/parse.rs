use anyhow::Result;

use crate::ast::Param;

#[derive(Debug, thiserror::Error)]
#[error("ParseError on line '{line}': {msg}")]
pub struct Error {
    msg: String,
    pos: usize,
    line: String,
}

impl Error {
    fn new(text: &str, pos: usize, msg: String) -> Self {
        // isolate the line in question:
        let before = &text[0..pos];
        let after = &text[pos..text.len()];
        let prefix: String = before.chars().rev().take_while(|&c| c != '\n').collect();
        let prefix: String = prefix.chars().rev().collect();
        let suffix: String = after.chars().take_while(|&c| c != '\n').collect();
        let line = prefix + &suffix;
        Self { msg, pos, line }
    }
}

// since converting combine's errors is a lifetime nightmare,
// we just stringify the error before returning it.
macro_rules! easy_parse {
    ($parser:expr, $text:expr) => {{
        use combine::EasyParser;
        let text: &str = $text;
        $parser
            .easy_parse(text)
            .map(|(parsed, _remainder)| parsed)
            .map_err(|e| {
                let pos = e.position.translate_position(text);
                anyhow::Error::from(Error::new(text, pos, format!("{}", e)))
            })
    }};
}

/// Parse a signature like `build(scheduler, size=10)`.
/// Everything before the first `(` and after the matching `)` is ignored.
pub fn parse_signature(text: &str) -> Result<Vec<Param<'_>>> {
    easy_parse!(signature::signature(), text)
}

/// Parse a bare parameter list like `scheduler, size=10`.
pub fn parse_params(text: &str) -> Result<Vec<Param<'_>>> {
    use combine::parser::char::spaces;
    use combine::{eof, Parser};
    easy_parse!(spaces().with(param::params()).skip(eof()), text)
}

/// Parse a single parameter like `size=10`.
pub fn parse_param(text: &str) -> Result<Param<'_>> {
    use combine::{eof, Parser};
    easy_parse!(util::lex(param::param()).skip(eof()), text)
}

pub mod prelude {
    pub use combine::parser::char::char;
    pub use combine::parser::range::recognize;
    pub use combine::*;
}

pub mod util {

    use super::prelude::*;
    use combine::parser::char::{alpha_num, letter, spaces};

    p! {
        ident_start() -> char, {
            char('_').or(char('$')).or(letter())
        }
    }

    p! {
        ident_rest() -> (), {
            skip_many(char('_').or(char('$')).or(alpha_num()))
        }
    }

    p! {
        ident() -> &'a str, {
            recognize(ident_start().and(ident_rest()))
        }
    }

    wrapper! {
        lex(parser), {
            spaces().with(parser).skip(spaces())
        }
    }

    wrapper! {
        parens(parser), {
            char('(').with(parser).skip(char(')'))
        }
    }

}

/// Default-value expressions. We only need their extent here;
/// classifying them is left to the caller.
mod literal {

    use super::prelude::*;

    p! {
        double_quoted() -> &'a str, {
            recognize(char('"').and(skip_many(none_of("\"".chars()))).and(char('"')))
        }
    }

    p! {
        single_quoted() -> &'a str, {
            recognize(char('\'').and(skip_many(none_of("'".chars()))).and(char('\'')))
        }
    }

    p! {
        quoted() -> &'a str, {
            double_quoted().or(single_quoted())
        }
    }

    p! {
        nested_item() -> (), {
            choice!(
                quoted().map(|_| ()),
                nested().map(|_| ()),
                skip_many1(none_of("[]{}\"'".chars()))
            )
        }
    }

    // json-ish arrays and objects; commas inside them don't end the parameter.
    p! {
        nested() -> &'a str, {
            recognize(
                char('[').with(skip_many(nested_item())).skip(char(']'))
                    .or(char('{').with(skip_many(nested_item())).skip(char('}')))
            )
        }
    }

    p! {
        bare() -> &'a str, {
            recognize(skip_many1(none_of(",)".chars()))).map(|text: &'a str| text.trim())
        }
    }

    p! {
        default_expr() -> &'a str, {
            choice!(quoted(), nested(), bare())
        }
    }

}

mod param {

    use super::literal::default_expr;
    use super::prelude::*;
    use super::util::{ident, lex};
    use crate::ast::Param;

    p! {
        param() -> Param<'a>, {
            lex(ident())
                .and(optional(char('=').with(lex(default_expr()))))
                .map(|(name, default)| Param::new(name, default))
        }
    }

    p! {
        params() -> Vec<Param<'a>>, {
            // empty entries (e.g. a trailing comma) are dropped:
            sep_by(lex(optional(param())), char(','))
                .map(|params: Vec<Option<Param<'a>>>| params.into_iter().flatten().collect())
        }
    }

}

mod signature {

    use super::param::params;
    use super::prelude::*;
    use super::util::parens;
    use crate::ast::Param;

    p! {
        signature() -> Vec<Param<'a>>, {
            skip_many(none_of("(".chars())).with(parens(params()))
        }
    }
}
