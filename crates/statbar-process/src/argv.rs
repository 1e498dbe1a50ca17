//! Whitespace splitting of command lines, with double-quoted arguments.

/// Split `line` into an argument vector. Double quotes group words containing
/// whitespace; an unterminated quote extends to the end of the line. There is
/// no escape character inside quotes.
#[must_use]
pub fn parse_argv(line: &str) -> Vec<String> {
    let mut argv = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    argv.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        argv.push(current);
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(parse_argv("date +%H:%M"), vec!["date", "+%H:%M"]);
    }

    #[test]
    fn quotes_group_words() {
        assert_eq!(
            parse_argv("sh -c \"echo hello world\""),
            vec!["sh", "-c", "echo hello world"]
        );
    }

    #[test]
    fn adjacent_quotes_make_an_empty_argument() {
        assert_eq!(parse_argv("cmd \"\" tail"), vec!["cmd", "", "tail"]);
    }

    #[test]
    fn repeated_whitespace_is_collapsed() {
        assert_eq!(parse_argv("  a \t b  "), vec!["a", "b"]);
    }

    #[test]
    fn empty_line_yields_no_arguments() {
        assert!(parse_argv("").is_empty());
        assert!(parse_argv("   ").is_empty());
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        assert_eq!(parse_argv("cmd \"a b"), vec!["cmd", "a b"]);
    }
}
