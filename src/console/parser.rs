//! Line parsing for the interactive console.
//!
//! Two surface syntaxes resolve to one [`Command`] value before any
//! dispatch happens: the space-separated form
//! (`update User <id> first_name "Betty"`) and the dotted-call form
//! (`User.update("<id>", "first_name", "Betty")`, including the inline
//! `{key: value, ...}` mapping variant). Because both funnel into the same
//! value, equivalent operations cannot produce divergent output.

/// One parsed input line. Missing arguments stay `None` so the dispatcher
/// can report them in the order the diagnostics demand.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Blank or all-whitespace line; a no-op.
    Empty,
    /// `quit` or the `EOF` sentinel.
    Quit,
    Help {
        topic: Option<String>,
    },
    Create {
        kind: Option<String>,
    },
    Show {
        kind: Option<String>,
        id: Option<String>,
    },
    Destroy {
        kind: Option<String>,
        id: Option<String>,
    },
    All {
        kind: Option<String>,
    },
    Count {
        kind: Option<String>,
    },
    Update {
        kind: Option<String>,
        id: Option<String>,
        /// Attribute/value pairs, applied in order. Only the canonical
        /// space-separated form can carry a pair with a missing value.
        sets: Vec<(String, Option<String>)>,
    },
    /// Anything unrecognized; carries the input for the diagnostic.
    Unknown(String),
}

pub fn parse_line(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if let Some(command) = parse_dotted(line) {
        return command;
    }

    let tokens = tokenize(line);
    let arg = |n: usize| tokens.get(n).cloned();
    match tokens[0].as_str() {
        "quit" | "EOF" => Command::Quit,
        "help" => Command::Help { topic: arg(1) },
        "create" => Command::Create { kind: arg(1) },
        "show" => Command::Show {
            kind: arg(1),
            id: arg(2),
        },
        "destroy" => Command::Destroy {
            kind: arg(1),
            id: arg(2),
        },
        "all" => Command::All { kind: arg(1) },
        "count" => Command::Count { kind: arg(1) },
        "update" => Command::Update {
            kind: arg(1),
            id: arg(2),
            sets: match arg(3) {
                Some(attr) => vec![(attr, arg(4))],
                None => Vec::new(),
            },
        },
        _ => Command::Unknown(line.to_string()),
    }
}

/// Split on whitespace with double-quote support: a quoted segment is one
/// token even when it contains spaces, and `\"` escapes a quote inside it.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut started = false;
    let mut in_quotes = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                started = true;
            }
            '\\' if in_quotes => match chars.next() {
                Some('"') => current.push('"'),
                Some('\\') => current.push('\\'),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            c if c.is_whitespace() && !in_quotes => {
                if started {
                    tokens.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                current.push(c);
                started = true;
            }
        }
    }
    if started {
        tokens.push(current);
    }
    tokens
}

/// Recognize `<Kind>.<verb>(<args>)`. Returns `None` when the line is not
/// dotted-call shaped, so the caller falls through to the canonical form.
fn parse_dotted(line: &str) -> Option<Command> {
    let open = line.find('(')?;
    if !line.ends_with(')') || open + 1 > line.len() - 1 {
        return None;
    }
    let head = &line[..open];
    let (kind, verb) = head.split_once('.')?;
    let (kind, verb) = (kind.trim(), verb.trim());
    if kind.is_empty() || verb.is_empty() || kind.chars().any(char::is_whitespace) {
        return None;
    }

    let args = split_args(&line[open + 1..line.len() - 1]);
    let kind = Some(kind.to_string());
    match verb {
        "all" if args.is_empty() => Some(Command::All { kind }),
        "count" if args.is_empty() => Some(Command::Count { kind }),
        "create" if args.is_empty() => Some(Command::Create { kind }),
        "show" => Some(Command::Show {
            kind,
            id: args.first().map(|s| unquote(s)),
        }),
        "destroy" => Some(Command::Destroy {
            kind,
            id: args.first().map(|s| unquote(s)),
        }),
        "update" => {
            let id = args.first().map(|s| unquote(s));
            let sets = match args.get(1) {
                Some(second) if second.starts_with('{') => parse_mapping(second)?,
                Some(second) => vec![(unquote(second), args.get(2).map(|s| unquote(s)))],
                None => Vec::new(),
            };
            Some(Command::Update { kind, id, sets })
        }
        _ => None,
    }
}

/// Split a call's argument list at top-level commas, leaving quoted
/// segments and mapping/list literals intact.
fn split_args(src: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = src.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' if quote.is_some() => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '\'' | '"' => {
                match quote {
                    None => quote = Some(c),
                    Some(q) if q == c => quote = None,
                    Some(_) => {}
                }
                current.push(c);
            }
            '{' | '[' if quote.is_none() => {
                depth += 1;
                current.push(c);
            }
            '}' | ']' if quote.is_none() => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if quote.is_none() && depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    parts.push(current);

    parts
        .iter()
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

/// Parse an inline `{key: value, ...}` mapping literal into ordered
/// attribute/value pairs. Keys and string values may be single- or
/// double-quoted; bare values are passed through for numeric coercion.
fn parse_mapping(src: &str) -> Option<Vec<(String, Option<String>)>> {
    let inner = src.strip_prefix('{')?.strip_suffix('}')?;
    let mut sets = Vec::new();
    if inner.trim().is_empty() {
        return Some(sets);
    }
    for pair in split_args(inner) {
        let (key, value) = pair.split_once(':')?;
        sets.push((unquote(key.trim()), Some(unquote(value.trim()))));
    }
    Some(sets)
}

/// Strip one matching pair of single or double quotes, unescaping interior
/// quotes of the same flavor. Bare tokens pass through unchanged.
fn unquote(s: &str) -> String {
    let s = s.trim();
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return s[1..s.len() - 1].replace(&format!("\\{quote}"), &quote.to_string());
        }
    }
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_on_whitespace() {
        assert_eq!(tokenize("show User 1234"), vec!["show", "User", "1234"]);
    }

    #[test]
    fn tokenize_keeps_quoted_segments_whole() {
        assert_eq!(
            tokenize(r#"update User 1234 first_name "Betty Holberton""#),
            vec!["update", "User", "1234", "first_name", "Betty Holberton"]
        );
    }

    #[test]
    fn tokenize_unescapes_interior_quotes() {
        assert_eq!(tokenize(r#"a "say \"hi\"""#), vec!["a", r#"say "hi""#]);
    }

    #[test]
    fn tokenize_keeps_empty_quoted_token() {
        assert_eq!(tokenize(r#"update User 1 name """#).len(), 5);
    }

    #[test]
    fn blank_lines_are_empty_commands() {
        assert_eq!(parse_line("   "), Command::Empty);
    }

    #[test]
    fn eof_sentinel_quits() {
        assert_eq!(parse_line("EOF"), Command::Quit);
        assert_eq!(parse_line("quit"), Command::Quit);
    }

    #[test]
    fn unknown_verbs_carry_the_line() {
        assert_eq!(
            parse_line("frobnicate User"),
            Command::Unknown("frobnicate User".to_string())
        );
    }

    #[test]
    fn dotted_all_matches_canonical_all() {
        assert_eq!(parse_line("User.all()"), parse_line("all User"));
    }

    #[test]
    fn dotted_show_matches_canonical_show() {
        assert_eq!(
            parse_line(r#"User.show("1234-5678")"#),
            parse_line("show User 1234-5678")
        );
    }

    #[test]
    fn dotted_update_with_pair() {
        assert_eq!(
            parse_line(r#"User.update("1234", "first_name", "John")"#),
            Command::Update {
                kind: Some("User".to_string()),
                id: Some("1234".to_string()),
                sets: vec![("first_name".to_string(), Some("John".to_string()))],
            }
        );
    }

    #[test]
    fn dotted_update_with_mapping_keeps_pair_order() {
        assert_eq!(
            parse_line(r#"User.update("1234", {'first_name': "John", 'age': 89})"#),
            Command::Update {
                kind: Some("User".to_string()),
                id: Some("1234".to_string()),
                sets: vec![
                    ("first_name".to_string(), Some("John".to_string())),
                    ("age".to_string(), Some("89".to_string())),
                ],
            }
        );
    }

    #[test]
    fn dotted_with_unknown_verb_is_unknown_syntax() {
        assert!(matches!(
            parse_line("User.frobnicate()"),
            Command::Unknown(_)
        ));
    }

    #[test]
    fn update_without_value_leaves_a_hole() {
        assert_eq!(
            parse_line("update User 1234 first_name"),
            Command::Update {
                kind: Some("User".to_string()),
                id: Some("1234".to_string()),
                sets: vec![("first_name".to_string(), None)],
            }
        );
    }
}
