//! Lexical checks on query text.

use crate::{Error, Result};

/// Returns the `@name` placeholders referenced outside string literals.
///
/// Names are returned without the `@`, deduplicated, in order of first use.
/// String literals may use either quote character and backslash escapes.
pub(crate) fn scan_placeholders(text: &str) -> Result<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut quote: Option<(char, usize)> = None;

    while let Some((offset, c)) = chars.next() {
        if let Some((open, _)) = quote {
            match c {
                '\\' => {
                    chars.next();
                }
                c if c == open => quote = None,
                _ => {}
            }
            continue;
        }

        match c {
            '\'' | '"' => quote = Some((c, offset)),
            '@' => {
                let mut name = String::new();
                while let Some(&(_, next)) = chars.peek() {
                    if !(next.is_ascii_alphanumeric() || next == '_') {
                        break;
                    }
                    name.push(next);
                    chars.next();
                }

                if name.is_empty() {
                    return Err(Error::query()
                        .with_message(format!("'@' at offset {offset} is not followed by a name")));
                }

                if !names.contains(&name) {
                    names.push(name);
                }
            }
            _ => {}
        }
    }

    if let Some((open, offset)) = quote {
        return Err(Error::query().with_message(format!(
            "unterminated string literal starting with {open} at offset {offset}"
        )));
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_placeholders() {
        let names = scan_placeholders(concat!(
            "SELECT * FROM c WHERE c.categoryId = @categoryId ",
            "AND c.qty > @min OR c.x = @categoryId",
        ))
        .unwrap();
        assert_eq!(names, vec!["categoryId", "min"]);
    }

    #[test]
    fn test_placeholders_in_literals_ignored() {
        let text = r#"SELECT * FROM c WHERE c.mail = 'a@b' AND c.n = "@x""#;
        let names = scan_placeholders(text).unwrap();
        assert!(names.is_empty());

        let text = r"SELECT * FROM c WHERE c.n = 'it\'s' AND c.id = @id";
        let escaped = scan_placeholders(text).unwrap();
        assert_eq!(escaped, vec!["id"]);
    }

    #[test]
    fn test_malformed_text() {
        assert!(scan_placeholders("SELECT * FROM c WHERE c.n = 'open").is_err());
        assert!(scan_placeholders("SELECT * FROM c WHERE c.n = \"open").is_err());
        assert!(scan_placeholders("SELECT * FROM c WHERE c.n = @").is_err());
        assert!(scan_placeholders("SELECT * FROM c WHERE c.n = @ AND 1 = 1").is_err());
    }
}
