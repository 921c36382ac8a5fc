//! Template rendering for workflow records
//!
//! Templates are plain text with a few special forms:
//!
//! | Form | Meaning |
//! |------|---------|
//! | `$name` | value of `name` (letters and `_`) |
//! | `${name}` | same, with explicit delimiters |
//! | `$$` | a literal `$` |
//! | `[...]` | rendered only if every value used inside is defined |
//! | `\n`, `\t`, `\u00e9`, `\[` ... | backslash escapes |
//!
//! A value that is absent, undefined, or not yet published suppresses the
//! innermost enclosing `[...]` group. Outside of any group the same
//! condition fails the whole render.

use thiserror::Error;

use super::todo::{keys_help, KeyDesc};

/// Failure to resolve a key
#[derive(Debug, Clone, Error, PartialEq)]
pub enum KeyError {
    #[error("{path}: '{key}' undefined, not yet published")]
    NotYetPublished { path: String, key: String },

    #[error("{path}: '{key}' undefined")]
    Undefined { path: String, key: String },

    #[error("{path}: {reason}")]
    Invalid { path: String, reason: String },
}

impl KeyError {
    /// Soft errors are absorbed by an enclosing `[...]` group
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            KeyError::NotYetPublished { .. } | KeyError::Undefined { .. }
        )
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FormatError {
    /// `syntax` is false when the template is well formed but a key used
    /// outside any `[...]` has no value for this record
    #[error("bad format string: {reason}")]
    BadFormatString { reason: String, syntax: bool },

    #[error(transparent)]
    Key(#[from] KeyError),
}

impl FormatError {
    fn bad(reason: impl Into<String>) -> Self {
        FormatError::BadFormatString {
            reason: reason.into(),
            syntax: true,
        }
    }

    fn unbracketed(reason: impl Into<String>) -> Self {
        FormatError::BadFormatString {
            reason: reason.into(),
            syntax: false,
        }
    }

    /// True for errors caused by the template itself, whatever the record
    pub fn is_syntax(&self) -> bool {
        matches!(self, FormatError::BadFormatString { syntax: true, .. })
    }
}

/// Key lookup used by the renderer
///
/// `Ok(None)` means the key is known but currently has no value.
pub trait Resolve {
    fn get(&self, key: &str) -> Result<Option<String>, KeyError>;
}

impl<F> Resolve for F
where
    F: Fn(&str) -> Result<Option<String>, KeyError>,
{
    fn get(&self, key: &str) -> Result<Option<String>, KeyError> {
        self(key)
    }
}

/// Renders `template` against `resolver`
pub fn render<R>(template: &str, resolver: &R) -> Result<String, FormatError>
where
    R: Resolve + ?Sized,
{
    let mut renderer = Renderer {
        rest: template,
        resolver,
    };
    let scan = renderer.scan(0)?;

    match scan.soft {
        None => Ok(scan.out),
        Some(Soft::Absent(key)) => Err(FormatError::unbracketed(format!(
            "'${}' has no value and is not inside [...]",
            key
        ))),
        Some(Soft::Unresolved(err)) => Err(FormatError::unbracketed(format!(
            "{} and is not inside [...]",
            err
        ))),
    }
}

/// Condition that suppresses a group instead of failing the render
enum Soft {
    Absent(String),
    Unresolved(KeyError),
}

struct Scan {
    out: String,
    soft: Option<Soft>,
    /// Stopped at a matching `]`
    closed: bool,
}

struct Renderer<'t, 'r, R: ?Sized> {
    rest: &'t str,
    resolver: &'r R,
}

impl<R: Resolve + ?Sized> Renderer<'_, '_, R> {
    fn scan(&mut self, depth: usize) -> Result<Scan, FormatError> {
        let mut out = String::new();
        let mut soft = None;

        while let Some(ch) = self.next_char() {
            match ch {
                '\\' => out.push(self.escape()?),
                '[' => {
                    let group = self.scan(depth + 1)?;
                    if !group.closed {
                        return Err(FormatError::bad("unterminated '['"));
                    }
                    if group.soft.is_none() {
                        out.push_str(&group.out);
                    }
                }
                ']' => {
                    if depth == 0 {
                        return Err(FormatError::bad("unmatched ']'"));
                    }
                    return Ok(Scan {
                        out,
                        soft,
                        closed: true,
                    });
                }
                '$' => self.variable(&mut out, &mut soft)?,
                _ => out.push(ch),
            }
        }

        Ok(Scan {
            out,
            soft,
            closed: false,
        })
    }

    fn next_char(&mut self) -> Option<char> {
        let ch = self.rest.chars().next()?;
        self.rest = &self.rest[ch.len_utf8()..];
        Some(ch)
    }

    fn variable(
        &mut self,
        out: &mut String,
        soft: &mut Option<Soft>,
    ) -> Result<(), FormatError> {
        let rest = self.rest;
        let key = match rest.chars().next() {
            None => {
                out.push('$');
                return Ok(());
            }
            Some('$') => {
                self.rest = &rest[1..];
                out.push('$');
                return Ok(());
            }
            Some('{') => {
                let end = rest
                    .find('}')
                    .ok_or_else(|| FormatError::bad("unterminated '${'"))?;
                self.rest = &rest[end + 1..];
                &rest[1..end]
            }
            Some(_) => {
                let end = rest
                    .find(|c: char| c != '_' && !c.is_alphabetic())
                    .unwrap_or(rest.len());
                self.rest = &rest[end..];
                &rest[..end]
            }
        };

        if key.is_empty() {
            out.push('$');
            return Ok(());
        }

        match self.resolver.get(key) {
            Ok(Some(value)) => out.push_str(&value),
            Ok(None) => {
                soft.get_or_insert(Soft::Absent(key.to_string()));
            }
            Err(err) if err.is_soft() => {
                soft.get_or_insert(Soft::Unresolved(err));
            }
            Err(err) => return Err(FormatError::Key(err)),
        }
        Ok(())
    }

    fn escape(&mut self) -> Result<char, FormatError> {
        let ch = self
            .next_char()
            .ok_or_else(|| FormatError::bad("trailing '\\'"))?;
        if ch.is_ascii_punctuation() {
            return Ok(ch);
        }

        match ch {
            'n' => Ok('\n'),
            't' => Ok('\t'),
            'r' => Ok('\r'),
            'a' => Ok('\x07'),
            'b' => Ok('\x08'),
            'f' => Ok('\x0c'),
            'v' => Ok('\x0b'),
            'x' => self.code_point(2, 16),
            'u' => self.code_point(4, 16),
            'U' => self.code_point(8, 16),
            '0'..='7' => {
                let rest = self.rest;
                let digits = rest
                    .get(..2)
                    .filter(|d| d.chars().all(|c| ('0'..='7').contains(&c)))
                    .ok_or_else(|| FormatError::bad("octal escape needs three digits"))?;
                self.rest = &rest[2..];
                let value = u32::from_str_radix(&format!("{}{}", ch, digits), 8)
                    .map_err(|e| FormatError::bad(e.to_string()))?;
                if value > 0xff {
                    return Err(FormatError::bad("octal escape out of range"));
                }
                char::from_u32(value).ok_or_else(|| FormatError::bad("invalid octal escape"))
            }
            _ => Err(FormatError::bad(format!("unknown escape '\\{}'", ch))),
        }
    }

    fn code_point(&mut self, len: usize, radix: u32) -> Result<char, FormatError> {
        let rest = self.rest;
        let digits = rest
            .get(..len)
            .filter(|d| d.chars().all(|c| c.is_digit(radix)))
            .ok_or_else(|| FormatError::bad(format!("escape needs {} hex digits", len)))?;
        self.rest = &rest[len..];
        let value =
            u32::from_str_radix(digits, radix).map_err(|e| FormatError::bad(e.to_string()))?;
        char::from_u32(value)
            .ok_or_else(|| FormatError::bad(format!("invalid code point {:#x}", value)))
    }
}

/// Help text describing the template syntax and the given keys
pub fn format_help(keys: &[KeyDesc]) -> String {
    format!(
        r#"<fmtstr> syntax:
  $<var>:   The value of a preset or user-set variable. Must be followed
            by something other than a letter or _.
            Fails if the variable is not defined and has no default value.
  ${{<var>}}: Alternative syntax.
  $$:       A literal $.
  [...]:    Only displays the text if all variables used inside are defined.
            For example to only display the '::' if there are unmet deps. use:
               $path[ :: $unmet]
  \...:     Standard backslash escaping.

preset variables:
{}"#,
        keys_help(keys)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(key: &str) -> Result<Option<String>, KeyError> {
        match key {
            "name" => Ok(Some("foo".to_string())),
            "path" => Ok(Some("github.com/acme/foo".to_string())),
            "deps" => Ok(Some("dep1 dep2".to_string())),
            "empty" => Ok(None),
            "hash" => Err(KeyError::NotYetPublished {
                path: "github.com/acme/foo".to_string(),
                key: key.to_string(),
            }),
            "giturl" => Err(KeyError::Invalid {
                path: "foo".to_string(),
                reason: "ill-formed import path".to_string(),
            }),
            _ => Err(KeyError::Undefined {
                path: "github.com/acme/foo".to_string(),
                key: key.to_string(),
            }),
        }
    }

    fn fmt(template: &str) -> Result<String, FormatError> {
        render(template, &lookup)
    }

    fn is_bad(result: Result<String, FormatError>) -> bool {
        matches!(result, Err(e) if e.is_syntax())
    }

    fn is_unbracketed(result: Result<String, FormatError>) -> bool {
        matches!(
            result,
            Err(FormatError::BadFormatString { syntax: false, .. })
        )
    }

    #[test]
    fn literal_text_passes_through() {
        assert_eq!(fmt("plain text").unwrap(), "plain text");
        assert_eq!(fmt("").unwrap(), "");
    }

    #[test]
    fn bare_and_braced_variables() {
        assert_eq!(fmt("$name").unwrap(), "foo");
        assert_eq!(fmt("${name}").unwrap(), "foo");
        assert_eq!(fmt("${name}s").unwrap(), "foos");
        assert_eq!(fmt("$name-$name").unwrap(), "foo-foo");
    }

    #[test]
    fn dollar_without_name_is_literal() {
        assert_eq!(fmt("$$").unwrap(), "$");
        assert_eq!(fmt("cost: 5$").unwrap(), "cost: 5$");
        assert_eq!(fmt("$1").unwrap(), "$1");
        assert_eq!(fmt("${}").unwrap(), "$");
    }

    #[test]
    fn undefined_inside_group_drops_group() {
        assert_eq!(fmt("[$x]").unwrap(), "");
        assert_eq!(fmt("a[$x]b").unwrap(), "ab");
        assert_eq!(fmt("[$name $hash]").unwrap(), "");
        assert_eq!(fmt("$name[ = $empty]").unwrap(), "foo");
    }

    #[test]
    fn defined_group_is_kept() {
        assert_eq!(
            fmt("$path[ :: $deps]").unwrap(),
            "github.com/acme/foo :: dep1 dep2"
        );
    }

    #[test]
    fn nested_group_absorbs_its_own_failure() {
        assert_eq!(fmt("[$name[ $x]!]").unwrap(), "foo!");
        assert_eq!(fmt("[$x[ $name]]").unwrap(), "");
    }

    #[test]
    fn unresolved_outside_group_is_bad_format() {
        let err = fmt("$x").unwrap_err();
        assert!(!err.is_syntax());
        assert_eq!(
            err.to_string(),
            "bad format string: github.com/acme/foo: 'x' undefined and is not inside [...]"
        );
        assert!(is_unbracketed(fmt("$hash")));
        assert!(is_unbracketed(fmt("$name $x")));
    }

    #[test]
    fn absent_outside_group_is_bad_format() {
        assert!(is_unbracketed(fmt("$empty")));
        assert!(!is_bad(fmt("$empty")));
    }

    #[test]
    fn hard_key_error_escapes_groups() {
        assert!(matches!(
            fmt("[$giturl]"),
            Err(FormatError::Key(KeyError::Invalid { .. }))
        ));
    }

    #[test]
    fn malformed_delimiters() {
        assert!(is_bad(fmt("${abc")));
        assert!(is_bad(fmt("[$name")));
        assert!(is_bad(fmt("$name]")));
        assert!(is_bad(fmt("[a[b]")));
    }

    #[test]
    fn syntax_errors_inside_groups_are_hard() {
        assert!(is_bad(fmt("[$x ${abc]")));
        assert!(is_bad(fmt("[$x \\q]")));
    }

    #[test]
    fn backslash_escapes() {
        assert_eq!(fmt("\\n").unwrap(), "\n");
        assert_eq!(fmt("a\\tb").unwrap(), "a\tb");
        assert_eq!(fmt("\\[$name\\]").unwrap(), "[foo]");
        assert_eq!(fmt("\\$name").unwrap(), "$name");
        assert_eq!(fmt("\\\\").unwrap(), "\\");
        assert_eq!(fmt("\\u00e9").unwrap(), "\u{e9}");
        assert_eq!(fmt("\\U0001F600").unwrap(), "\u{1F600}");
        assert_eq!(fmt("\\x41").unwrap(), "A");
        assert_eq!(fmt("\\101").unwrap(), "A");
    }

    #[test]
    fn bad_escapes() {
        assert!(is_bad(fmt("\\")));
        assert!(is_bad(fmt("\\q")));
        assert!(is_bad(fmt("\\u12")));
        assert!(is_bad(fmt("\\xZZ")));
        assert!(is_bad(fmt("\\777")));
    }

    #[test]
    fn non_ascii_literals() {
        assert_eq!(fmt("→ $name ✓").unwrap(), "→ foo ✓");
    }

    #[test]
    fn help_lists_keys() {
        let help = format_help(crate::domain::todo::BASIC_KEYS);
        assert!(help.contains("${<var>}"));
        assert!(help.contains("giturl"));
        assert!(!help.contains("unmetdeps"));
    }
}
