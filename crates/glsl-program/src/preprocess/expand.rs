//! Macro expansion in text runs.

use super::{macros::MacroTable, Message};

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn ident_end(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|b| !is_ident_continue(*b))
        .map_or(bytes.len(), |len| start + len)
}

// numbers like `1e10`, `0x1F` or `2.5f` are copied as a whole.
fn number_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        let exponent_sign = (b == b'+' || b == b'-')
            && matches!(bytes[i - 1], b'e' | b'E')
            && !bytes[start..i].starts_with(b"0x")
            && !bytes[start..i].starts_with(b"0X");
        if is_ident_continue(b) || b == b'.' || exponent_sign {
            i += 1;
        } else {
            break;
        }
    }
    i
}

fn comment_end(text: &str, start: usize) -> Option<usize> {
    let rest = &text.as_bytes()[start..];
    if rest.starts_with(b"//") {
        Some(
            rest.iter()
                .position(|b| *b == b'\n')
                .map_or(text.len(), |i| start + i),
        )
    } else if rest.starts_with(b"/*") {
        Some(
            rest[2..]
                .windows(2)
                .position(|w| w == b"*/")
                .map_or(text.len(), |i| start + 2 + i + 2),
        )
    } else {
        None
    }
}

/// Replaces the parameters of a function-like macro in its body, on identifier boundaries.
pub(crate) fn substitute(body: &str, params: &[String], args: &[String]) -> String {
    let bytes = body.as_bytes();
    let mut res = String::with_capacity(body.len());
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        if is_ident_start(bytes[i]) {
            let end = ident_end(bytes, i);
            if let Some(pos) = params.iter().position(|p| *p == body[i..end]) {
                res.push_str(&body[copied..i]);
                res.push_str(&args[pos]);
                copied = end;
            }
            i = end;
        } else if bytes[i].is_ascii_digit() {
            i = number_end(bytes, i);
        } else {
            i += 1;
        }
    }
    res.push_str(&body[copied..]);
    res
}

/// The arguments of a macro call and the position after its closing parenthesis.
struct Call {
    args: Vec<String>,
    end: usize,
}

/// Parses `( a, (b, c), d )` starting at `start`, which must point at the `(`.
fn parse_call(text: &str, start: usize) -> Option<Call> {
    let bytes = text.as_bytes();
    let mut depth = 0;
    let mut args = Vec::new();
    let mut arg_start = start + 1;
    let mut i = start;
    while i < bytes.len() {
        if let Some(end) = comment_end(text, i) {
            i = end;
            continue;
        }
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    args.push(text[arg_start..i].to_string());
                    return Some(Call { args, end: i + 1 });
                }
            }
            b',' if depth == 1 => {
                args.push(text[arg_start..i].to_string());
                arg_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn normalize_arg(arg: &str) -> String {
    arg.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Expands macros in text, rescanning every substitution until nothing is left to expand.
/// A macro is not expanded again inside its own expansion.
pub(crate) struct Expander<'a> {
    pub macros: &'a MacroTable,
    pub max_depth: usize,
    pub log: &'a mut Vec<Message>,
}

impl Expander<'_> {
    pub fn expand(&mut self, text: &str) -> String {
        let mut active = Vec::new();
        self.expand_rec(text, &mut active)
    }

    fn expand_rec(&mut self, text: &str, active: &mut Vec<String>) -> String {
        let macros = self.macros;
        let bytes = text.as_bytes();
        let mut res = String::with_capacity(text.len());
        let mut copied = 0;
        let mut i = 0;

        while i < bytes.len() {
            if let Some(end) = comment_end(text, i) {
                i = end;
                continue;
            }
            let b = bytes[i];
            if b.is_ascii_digit() || (b == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
            {
                i = number_end(bytes, i);
                continue;
            }
            if !is_ident_start(b) {
                i += 1;
                continue;
            }

            let start = i;
            let end = ident_end(bytes, start);
            i = end;
            let name = &text[start..end];
            let Some(mac) = macros.get(name) else {
                continue;
            };
            if active.iter().any(|n| n == name) {
                self.log.push(Message::warn(format!(
                    "recursive macro `{name}` is not expanded"
                )));
                continue;
            }
            if active.len() >= self.max_depth {
                self.log.push(Message::error(format!(
                    "expansion of macro `{name}` exceeds {} nested levels",
                    self.max_depth
                )));
                continue;
            }

            let (replacement, end, newlines) = match &mac.params {
                None => (mac.body.clone(), end, 0),
                Some(params) => {
                    let paren = end + text[end..].len() - text[end..].trim_start().len();
                    if bytes.get(paren) != Some(&b'(') {
                        // a function-like macro name without arguments is left as is.
                        continue;
                    }
                    let Some(call) = parse_call(text, paren) else {
                        self.log.push(Message::error(format!(
                            "unterminated call to macro `{name}`"
                        )));
                        continue;
                    };
                    let mut args = call.args.iter().map(|a| normalize_arg(a)).collect::<Vec<_>>();
                    if params.is_empty() && args.len() == 1 && args[0].is_empty() {
                        args.clear();
                    }
                    if args.len() != params.len() {
                        self.log.push(Message::error(format!(
                            "macro `{name}` expects {} arguments, found {}",
                            params.len(),
                            args.len()
                        )));
                        i = call.end;
                        continue;
                    }
                    let newlines = text[end..call.end].matches('\n').count();
                    (substitute(&mac.body, params, &args), call.end, newlines)
                }
            };

            active.push(name.to_string());
            let expanded = self.expand_rec(&replacement, active);
            active.pop();

            res.push_str(&text[copied..start]);
            res.push_str(&expanded);
            res.extend(std::iter::repeat('\n').take(newlines));
            copied = end;
            i = end;
        }

        res.push_str(&text[copied..]);
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::macros::Macro;

    fn function(name: &str, params: &[&str], body: &str) -> Macro {
        Macro {
            name: name.to_string(),
            params: Some(params.iter().map(|p| p.to_string()).collect()),
            body: body.to_string(),
            defined: true,
        }
    }

    fn expand(macros: &MacroTable, text: &str) -> (String, Vec<Message>) {
        let mut log = Vec::new();
        let mut expander = Expander {
            macros,
            max_depth: 16,
            log: &mut log,
        };
        let res = expander.expand(text);
        (res, log)
    }

    #[test]
    fn object_like() {
        let mut macros = MacroTable::new();
        macros.define(Macro::object("N", "4"));
        macros.define(Macro::object("SIZE", "(N * N)"));
        let (res, log) = expand(&macros, "float a[SIZE]; int NN = N; // N\n");
        assert_eq!(res, "float a[(4 * 4)]; int NN = 4; // N\n");
        assert!(log.is_empty());
    }

    #[test]
    fn function_like() {
        let mut macros = MacroTable::new();
        macros.define(function("DOUBLE", &["x"], "((x)+(x))"));
        macros.define(function("MAX", &["a", "b"], "max(a, b)"));
        let (res, _) = expand(&macros, "y = DOUBLE(3);");
        assert_eq!(res, "y = ((3)+(3));");
        let (res, _) = expand(&macros, "y = MAX(f(1, 2), DOUBLE(x));");
        assert_eq!(res, "y = max(f(1, 2), ((x)+(x)));");
        let (res, _) = expand(&macros, "float DOUBLE;");
        assert_eq!(res, "float DOUBLE;");
    }

    #[test]
    fn call_across_lines_keeps_line_count() {
        let mut macros = MacroTable::new();
        macros.define(function("ADD", &["a", "b"], "a + b"));
        let (res, _) = expand(&macros, "x = ADD(1,\n   2);\ny;\n");
        assert_eq!(res, "x = 1 + 2\n;\ny;\n");
    }

    #[test]
    fn numbers_and_comments_are_skipped() {
        let mut macros = MacroTable::new();
        macros.define(Macro::object("e", "E"));
        macros.define(Macro::object("f", "F"));
        let (res, _) = expand(&macros, "1e10 + 2.5f + 0x1f /* e */ + e");
        assert_eq!(res, "1e10 + 2.5f + 0x1f /* e */ + E");
    }

    #[test]
    fn recursive_macros_are_not_expanded() {
        let mut macros = MacroTable::new();
        macros.define(Macro::object("A", "B + 1"));
        macros.define(Macro::object("B", "A * 2"));
        let (res, log) = expand(&macros, "x = A;");
        assert_eq!(res, "x = A * 2 + 1;");
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].text, "recursive macro `A` is not expanded");
    }

    #[test]
    fn arity_mismatch_is_left_verbatim() {
        let mut macros = MacroTable::new();
        macros.define(function("F", &["a", "b"], "a - b"));
        macros.define(function("G", &[], "0"));
        let (res, log) = expand(&macros, "F(1) + G()");
        assert_eq!(res, "F(1) + 0");
        assert_eq!(log[0].text, "macro `F` expects 2 arguments, found 1");
    }

    #[test]
    fn parameters_on_identifier_boundaries() {
        let params = ["x".to_string()];
        let args = ["1".to_string()];
        assert_eq!(substitute("x + xx + x1 + 2x", &params, &args), "1 + xx + x1 + 2x");
    }
}
