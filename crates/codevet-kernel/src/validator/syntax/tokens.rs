//! Character-level rescan for problems the tree cannot show.
//!
//! The lexer already rejects stray characters in code, so anything found
//! here sits inside a string literal or a comment.

use crate::diagnostic::Diagnostic;
use crate::validator::detector::{DetectError, Detector, Subject};
use crate::validator::issue::Finding;

pub struct TokenScan;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Irregularity {
    Control(char),
    Replacement,
    InnerBom,
    BareCarriageReturn,
}

impl Irregularity {
    fn describe(self) -> String {
        match self {
            Irregularity::Control(c) => format!("control character U+{:04X}", c as u32),
            Irregularity::Replacement => {
                "replacement character U+FFFD (source was not valid UTF-8)".to_string()
            }
            Irregularity::InnerBom => "byte order mark inside the source".to_string(),
            Irregularity::BareCarriageReturn => "bare carriage return".to_string(),
        }
    }

    fn same_kind(self, other: Irregularity) -> bool {
        std::mem::discriminant(&self) == std::mem::discriminant(&other)
    }
}

impl Detector for TokenScan {
    fn name(&self) -> &'static str {
        "tokenization"
    }

    fn detect(&self, subject: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
        let source = subject.source;
        let mut seen: Vec<Irregularity> = Vec::new();
        let mut findings = Vec::new();

        let mut chars = source.char_indices().peekable();
        while let Some((offset, c)) = chars.next() {
            let found = match c {
                '\r' if chars.peek().map(|&(_, next)| next) != Some('\n') => {
                    Some(Irregularity::BareCarriageReturn)
                }
                '\u{FFFD}' => Some(Irregularity::Replacement),
                '\u{FEFF}' if offset > 0 => Some(Irregularity::InnerBom),
                '\t' | '\n' | '\r' | '\x0c' => None,
                c if c.is_control() => Some(Irregularity::Control(c)),
                _ => None,
            };
            let Some(found) = found else { continue };
            // One report per kind keeps a binary blob from flooding the result.
            if seen.iter().any(|s| s.same_kind(found)) {
                continue;
            }
            seen.push(found);

            let line = subject.line_of(offset);
            findings.push(Finding::error(
                Diagnostic::new(format!(
                    "Tokenization error: {} at line {}",
                    found.describe(),
                    line
                ))
                .with_context(subject.context(line)),
            ));
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidatorConfig;
    use crate::tree::build_tree;

    fn scan(source: &str) -> Vec<String> {
        let tree = build_tree(source).unwrap();
        let config = ValidatorConfig::default();
        let subject = Subject::new(source, &tree, &config);
        TokenScan
            .detect(&subject)
            .unwrap()
            .into_iter()
            .map(|f| f.diagnostic.message)
            .collect()
    }

    #[test]
    fn clean_source() {
        assert!(scan("x = 'tab\there'\r\ny = 2\n").is_empty());
        assert!(scan("\u{FEFF}x = 1\n").is_empty());
    }

    #[test]
    fn control_character_in_string() {
        assert_eq!(
            scan("x = 1\nbell = '\u{7}'\n"),
            ["Tokenization error: control character U+0007 at line 2"]
        );
    }

    #[test]
    fn replacement_character_in_comment() {
        assert_eq!(
            scan("x = 1  # caf\u{FFFD}\n"),
            ["Tokenization error: replacement character U+FFFD (source was not valid UTF-8) at line 1"]
        );
    }

    #[test]
    fn one_report_per_kind() {
        assert_eq!(scan("a = '\u{1}\u{2}'\nb = '\u{3}'\n").len(), 1);
    }

    #[test]
    fn bare_carriage_return_in_triple_string() {
        let found = scan("doc = \"\"\"one\rtwo\"\"\"\n");
        assert_eq!(found, ["Tokenization error: bare carriage return at line 1"]);
    }
}
