//! Shell-style tokenizer for the `Exec` alert sink's `command` template
//! (§4.6). Single- and double-quoting behave as expected; a backslash
//! escapes the character that follows it *except* whitespace, which always
//! ends the current word even when backslash-prefixed.

pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut buf = String::new();
    let mut quote: Option<char> = None;
    let mut escape = false;

    for c in input.chars() {
        if escape {
            if c.is_whitespace() {
                if !buf.is_empty() {
                    tokens.push(std::mem::take(&mut buf));
                }
            } else {
                buf.push(c);
            }
            escape = false;
            continue;
        }

        if let Some(q) = quote {
            if c == q {
                quote = None;
            } else {
                buf.push(c);
            }
            continue;
        }

        match c {
            '\\' => escape = true,
            '\'' | '"' => quote = Some(c),
            c if c.is_whitespace() => {
                if !buf.is_empty() {
                    tokens.push(std::mem::take(&mut buf));
                }
            }
            c => buf.push(c),
        }
    }

    if !buf.is_empty() {
        tokens.push(buf);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_quotes_preserve_spaces() {
        assert_eq!(tokenize("a \"b c\" d"), vec!["a", "b c", "d"]);
    }

    #[test]
    fn single_quotes_preserve_double_quote_characters() {
        assert_eq!(tokenize("a 'b\"c'"), vec!["a", "b\"c"]);
    }

    #[test]
    fn backslash_before_whitespace_still_splits() {
        assert_eq!(tokenize("a\\ b"), vec!["a", "b"]);
    }
}
