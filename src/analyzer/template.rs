//! Template grammar: quoted strings and bare template sources.
//!
//! A template is a sequence of literal text, `${ ... }` interpolations and
//! `%{ ... }` directives (`if`/`else`/`endif` and `for`/`endfor`). A `~`
//! next to a marker strips whitespace from the adjacent literal text.

use crate::ast::{Expression, ExpressionKind, TemplatePart};
use crate::diagnostics::SourceRange;
use crate::tokenizer::{Keyword, Token};

use super::grammar::{for_header, ForHeaderErrors};
use super::parser::{closes, opens, SourceParser};

const INTERPOLATION_HINT: &str = "Expected a closing brace to end the interpolation expression, but found extra characters.\n\nThis can happen when you include interpolation syntax for another language, such as shell scripting, but forget to escape the interpolation start token. If this is an embedded sequence for another language, escape it by starting with \"$${\" instead of just \"${\".";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TerminatorKind {
    /// Closing quote, newline or end of input; not consumed.
    End,
    Else,
    EndIf,
    EndFor,
}

impl TerminatorKind {
    fn keyword(self) -> &'static str {
        match self {
            TerminatorKind::End => "end",
            TerminatorKind::Else => "else",
            TerminatorKind::EndIf => "endif",
            TerminatorKind::EndFor => "endfor",
        }
    }
}

#[derive(Debug, Clone)]
struct Terminator {
    kind: TerminatorKind,
    range: SourceRange,
    strip_after: bool,
}

impl SourceParser {
    /// Parses a whole source as template text.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn parse_template_source(&mut self) -> Expression {
        let start = self.range_of(self.peek_raw());
        let (parts, end) = self.parse_template_parts(false, false);
        if end.kind != TerminatorKind::End {
            self.unexpected_directive(&end);
        }
        let range = SourceRange::between(&start, &end.range);
        Expression::new(ExpressionKind::Template(parts), range)
    }

    /// Parses `"..."` starting at the opening quote.
    pub(crate) fn parse_quoted_template(&mut self) -> Expression {
        let open = self.advance();
        let open_range = self.range_of(&open);
        let (parts, end) = self.parse_template_parts(true, false);
        if end.kind != TerminatorKind::End {
            self.unexpected_directive(&end);
        }

        let next = self.peek_raw().clone();
        let next_range = self.range_of(&next);
        let close_range = match next.token {
            Token::CloseQuote => {
                self.advance_raw();
                next_range
            }
            Token::Newline => {
                self.fail(
                    "Invalid multi-line string",
                    "Quoted strings may not be split over multiple lines. To produce a multi-line string, either use the \\n escape to represent a newline character or use the \"heredoc\" multi-line template syntax.",
                    next_range.clone(),
                );
                next_range.start_range()
            }
            _ => {
                self.fail(
                    "Unterminated template string",
                    "No closing marker was found for the string.",
                    open_range.clone(),
                );
                next_range.start_range()
            }
        };
        Expression::new(
            ExpressionKind::Template(parts),
            SourceRange::between(&open_range, &close_range),
        )
    }

    fn parse_template_parts(
        &mut self,
        quoted: bool,
        strip_first: bool,
    ) -> (Vec<TemplatePart>, Terminator) {
        let mut parts: Vec<TemplatePart> = Vec::new();
        let mut strip_next = strip_first;

        loop {
            let next = self.peek_raw().clone();
            let range = self.range_of(&next);
            match next.token {
                Token::TemplateLiteral(text) => {
                    self.advance_raw();
                    let text = if strip_next {
                        text.trim_start().to_string()
                    } else {
                        text
                    };
                    strip_next = false;
                    push_literal(&mut parts, text, range);
                }
                Token::TemplateInterp { strip } => {
                    self.advance_raw();
                    if strip {
                        strip_trailing(&mut parts);
                    }
                    let expr = self.parse_interpolation();
                    strip_next = expr.1;
                    parts.push(TemplatePart::Interpolation(expr.0));
                }
                Token::TemplateControl { strip } => {
                    self.advance_raw();
                    if strip {
                        strip_trailing(&mut parts);
                    }
                    self.push_newlines(false);
                    let keyword = self.peek().token.keyword();
                    let part = match keyword {
                        Some(kw @ (Keyword::If | Keyword::For)) => {
                            self.parse_directive(kw, range, quoted)
                        }
                        Some(kw @ (Keyword::Else | Keyword::EndIf | Keyword::EndFor)) => {
                            self.advance();
                            let (end_range, strip_after) = self.expect_sequence_end(kw.as_ref());
                            self.pop_newlines();
                            let kind = match kw {
                                Keyword::Else => TerminatorKind::Else,
                                Keyword::EndIf => TerminatorKind::EndIf,
                                _ => TerminatorKind::EndFor,
                            };
                            return (
                                parts,
                                Terminator {
                                    kind,
                                    range: SourceRange::between(&range, &end_range),
                                    strip_after,
                                },
                            );
                        }
                        _ => {
                            let subject = self.peek_range();
                            self.fail(
                                "Invalid template control keyword",
                                "A template control keyword (\"if\", \"for\", etc) is expected here.",
                                subject,
                            );
                            self.recover_to_sequence_end();
                            None
                        }
                    };
                    self.pop_newlines();
                    if let Some((part, strip_after)) = part {
                        parts.push(part);
                        strip_next = strip_after;
                    }
                }
                Token::CloseQuote | Token::Newline | Token::Eof => {
                    return (
                        parts,
                        Terminator {
                            kind: TerminatorKind::End,
                            range: range.start_range(),
                            strip_after: false,
                        },
                    );
                }
                Token::Invalid(c) => {
                    // already reported by the tokenizer
                    self.advance_raw();
                    push_literal(&mut parts, c.to_string(), range);
                }
                _ => {
                    self.advance_raw();
                    self.fail(
                        "Invalid template",
                        "Unexpected token in template.",
                        range,
                    );
                }
            }
        }
    }

    /// Parses the expression of `${ ... }` after the opening marker, and
    /// the closing marker. Returns whether the closing marker strips.
    fn parse_interpolation(&mut self) -> (Expression, bool) {
        self.push_newlines(false);
        let expr = self.parse_expression();
        let next = self.peek().clone();
        let strip = match next.token {
            Token::TemplateSeqEnd { strip } => {
                self.advance();
                strip
            }
            _ => {
                let subject = self.range_of(&next);
                self.fail(
                    "Extra characters after interpolation expression",
                    INTERPOLATION_HINT,
                    subject,
                );
                self.recover_to_sequence_end()
            }
        };
        self.pop_newlines();
        (expr, strip)
    }

    /// An `if` or `for` directive through its closing marker. Each directive
    /// is one nesting level.
    fn parse_directive(
        &mut self,
        keyword: Keyword,
        open: SourceRange,
        quoted: bool,
    ) -> Option<(TemplatePart, bool)> {
        if !self.enter(&open) {
            self.leave();
            self.recover_to_sequence_end();
            return None;
        }
        let part = if keyword == Keyword::If {
            self.parse_if_directive(open, quoted)
        } else {
            self.parse_for_directive(open, quoted)
        };
        self.leave();
        part
    }

    fn parse_if_directive(
        &mut self,
        open: SourceRange,
        quoted: bool,
    ) -> Option<(TemplatePart, bool)> {
        self.advance(); // if
        let condition = self.parse_expression();
        let (_, strip) = self.expect_sequence_end("if");

        let (then_parts, mut end) = self.parse_template_parts(quoted, strip);
        let mut else_parts = Vec::new();
        if end.kind == TerminatorKind::Else {
            let (parts, else_end) = self.parse_template_parts(quoted, end.strip_after);
            else_parts = parts;
            end = else_end;
        }
        if end.kind != TerminatorKind::EndIf {
            self.unclosed_directive("if", "endif", &open, &end);
            return None;
        }
        Some((
            TemplatePart::If {
                condition,
                then_parts,
                else_parts,
                range: SourceRange::between(&open, &end.range),
            },
            end.strip_after,
        ))
    }

    fn parse_for_directive(
        &mut self,
        open: SourceRange,
        quoted: bool,
    ) -> Option<(TemplatePart, bool)> {
        let header = for_header(ForHeaderErrors {
            name: "For directive requires variable name after 'for'.",
            second_name: "For directive requires variable name after 'for'.",
            in_keyword: "For directive requires 'in' keyword after names.",
        });
        let (key_var, value_var) = match self.parse_with(&header) {
            Ok(names) => names,
            Err((err, subject)) => {
                let detail = err.context().unwrap_or("Invalid 'for' header.");
                self.fail("Invalid 'for' directive", detail, subject);
                self.recover_to_sequence_end();
                return None;
            }
        };
        let collection = self.parse_expression();
        let (_, strip) = self.expect_sequence_end("for");

        let (body, end) = self.parse_template_parts(quoted, strip);
        if end.kind != TerminatorKind::EndFor {
            self.unclosed_directive("for", "endfor", &open, &end);
            return None;
        }
        Some((
            TemplatePart::For {
                key_var,
                value_var,
                collection,
                body,
                range: SourceRange::between(&open, &end.range),
            },
            end.strip_after,
        ))
    }

    /// Consumes the `}` or `~}` closing a directive marker.
    fn expect_sequence_end(&mut self, keyword: &str) -> (SourceRange, bool) {
        let next = self.peek().clone();
        let range = self.range_of(&next);
        match next.token {
            Token::TemplateSeqEnd { strip } => {
                self.advance();
                (range, strip)
            }
            _ => {
                self.fail(
                    &format!("Extra characters in {} marker", keyword),
                    "Expected a closing brace to end the sequence, but found extra characters.",
                    range.clone(),
                );
                let strip = self.recover_to_sequence_end();
                (range, strip)
            }
        }
    }

    /// Skips to and consumes the end of the current `${`/`%{` sequence.
    fn recover_to_sequence_end(&mut self) -> bool {
        let mut nesting = 0usize;
        loop {
            let token = self.peek_raw().token.clone();
            match token {
                Token::Eof | Token::CloseQuote if nesting == 0 => return false,
                Token::Eof => return false,
                Token::TemplateSeqEnd { strip } if nesting == 0 => {
                    self.advance_raw();
                    return strip;
                }
                _ => {}
            }
            if opens(&token) {
                nesting += 1;
            } else if closes(&token) {
                nesting = nesting.saturating_sub(1);
            }
            self.advance_raw();
        }
    }

    fn unexpected_directive(&mut self, end: &Terminator) {
        let keyword = end.kind.keyword();
        let opener = if end.kind == TerminatorKind::EndFor {
            "for"
        } else {
            "if"
        };
        self.fail(
            &format!("Unexpected \"{}\" directive", keyword),
            &format!(
                "The control directive \"{}\" is not valid here; there is no open \"{}\" directive.",
                keyword, opener
            ),
            end.range.clone(),
        );
    }

    fn unclosed_directive(
        &mut self,
        opener: &str,
        closer: &str,
        open: &SourceRange,
        end: &Terminator,
    ) {
        if end.kind == TerminatorKind::End {
            self.fail(
                &format!("Unterminated template {} directive", opener),
                &format!("There is no matching \"{}\" for this \"{}\".", closer, opener),
                open.clone(),
            );
        } else {
            self.fail(
                &format!("Unexpected \"{}\" directive", end.kind.keyword()),
                &format!(
                    "Expected an \"{}\" to close the \"{}\" directive.",
                    closer, opener
                ),
                end.range.clone(),
            );
        }
    }
}

/// Appends literal text, merging it into a preceding literal part.
fn push_literal(parts: &mut Vec<TemplatePart>, text: String, range: SourceRange) {
    if let Some(TemplatePart::Literal {
        value,
        range: prev_range,
    }) = parts.last_mut()
    {
        value.push_str(&text);
        *prev_range = SourceRange::between(prev_range, &range);
        return;
    }
    parts.push(TemplatePart::Literal { value: text, range });
}

fn strip_trailing(parts: &mut [TemplatePart]) {
    if let Some(TemplatePart::Literal { value, .. }) = parts.last_mut() {
        let trimmed = value.trim_end().len();
        value.truncate(trimmed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{parse_expression, parse_template};
    use pretty_assertions::assert_eq;

    fn literal_values(parts: &[TemplatePart]) -> Vec<String> {
        parts
            .iter()
            .filter_map(|p| match p {
                TemplatePart::Literal { value, .. } => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_quoted_with_interpolation() {
        let (expr, diags) = parse_expression(r#""hello ${name}!""#, "<src>");
        assert!(diags.is_empty(), "{}", diags);
        let ExpressionKind::Template(parts) = expr.kind else {
            panic!("expected template");
        };
        assert_eq!(parts.len(), 3);
        assert_eq!(literal_values(&parts), vec!["hello ", "!"]);
        assert_eq!(expr.range.to_string(), "<src>:1,1-17");
    }

    #[test]
    fn test_single_interpolation_unwraps() {
        let (expr, diags) = parse_template("${a}", "<src>");
        assert!(diags.is_empty());
        assert!(expr.unwrapped_template().is_some());
    }

    #[test]
    fn test_strip_markers() {
        let (expr, diags) = parse_template("a  ${~ x ~}  b", "<src>");
        assert!(diags.is_empty(), "{}", diags);
        let ExpressionKind::Template(parts) = expr.kind else {
            panic!("expected template");
        };
        assert_eq!(literal_values(&parts), vec!["a", "b"]);
    }

    #[test]
    fn test_if_else_directive() {
        let (expr, diags) = parse_template("%{ if x }yes%{ else }no%{ endif }", "<src>");
        assert!(diags.is_empty(), "{}", diags);
        let ExpressionKind::Template(parts) = expr.kind else {
            panic!("expected template");
        };
        let [TemplatePart::If {
            then_parts,
            else_parts,
            ..
        }] = parts.as_slice()
        else {
            panic!("expected a single if directive");
        };
        assert_eq!(literal_values(then_parts), vec!["yes"]);
        assert_eq!(literal_values(else_parts), vec!["no"]);
    }

    #[test]
    fn test_for_directive() {
        let (expr, diags) = parse_template("%{ for k, v in m }${k}=${v};%{ endfor }", "<src>");
        assert!(diags.is_empty(), "{}", diags);
        let ExpressionKind::Template(parts) = expr.kind else {
            panic!("expected template");
        };
        let [TemplatePart::For {
            key_var,
            value_var,
            body,
            ..
        }] = parts.as_slice()
        else {
            panic!("expected a single for directive");
        };
        assert_eq!(key_var.as_deref(), Some("k"));
        assert_eq!(value_var, "v");
        assert_eq!(body.len(), 4);
    }

    #[test]
    fn test_extra_characters_in_interpolation() {
        let (_, diags) = parse_template("${invalid syntax}", "<src>");
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags.to_string(),
            format!(
                "<src>:1,11-17: Extra characters after interpolation expression; {}",
                INTERPOLATION_HINT
            )
        );
    }

    #[test]
    fn test_unclosed_if() {
        let (_, diags) = parse_template("%{ if x }yes", "<src>");
        assert_eq!(diags.len(), 1);
        assert!(diags.to_string().contains("Unterminated template if directive"));
    }

    #[test]
    fn test_stray_endif() {
        let (_, diags) = parse_template("a%{ endif }", "<src>");
        assert!(diags.to_string().contains("Unexpected \"endif\" directive"));
    }

    #[test]
    fn test_multiline_quoted_string() {
        let (_, diags) = parse_expression("\"abc\ndef\"", "<src>");
        assert!(diags.to_string().contains("Invalid multi-line string"));
    }

    #[test]
    fn test_unterminated_string() {
        let (_, diags) = parse_expression("\"abc", "<src>");
        assert_eq!(diags.len(), 1);
        assert!(diags.to_string().contains("Unterminated template string"));
    }
}
