//! Configuration body grammar: attributes and blocks.

use indexmap::IndexMap;

use crate::ast::{Attribute, Block, Body, ExpressionKind, TemplatePart};
use crate::diagnostics::{Diagnostic, SourceRange};
use crate::tokenizer::{Delimiter, Token};

use super::parser::SourceParser;

impl SourceParser {
    /// Parses a whole source as a configuration body.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn parse_config_source(&mut self) -> Body {
        self.push_newlines(true);
        let start = self.range_of(self.peek_raw()).start_range();
        let body = self.parse_body(start, None);
        self.pop_newlines();
        body
    }

    /// Parses body items until end of input or, inside a block, the closing
    /// brace (left unconsumed).
    fn parse_body(&mut self, start: SourceRange, open_brace: Option<&SourceRange>) -> Body {
        let mut attributes: IndexMap<String, Attribute> = IndexMap::new();
        let mut blocks = Vec::new();

        loop {
            let next = self.peek_raw().clone();
            let range = self.range_of(&next);
            match next.token {
                Token::Newline => {
                    self.advance_raw();
                }
                Token::Eof => {
                    if let Some(open) = open_brace {
                        self.fail(
                            "Unclosed configuration block",
                            "There is no closing brace for this block before the end of the file. This may be caused by incorrect brace nesting elsewhere in this file.",
                            open.clone(),
                        );
                    }
                    break;
                }
                Token::Delimiter(Delimiter::CloseBrace) if open_brace.is_some() => break,
                Token::Identifier(name) => {
                    self.advance_raw();
                    let after = self.peek_raw().token.clone();
                    match after {
                        Token::Delimiter(Delimiter::Equal) => {
                            if let Some(attr) = self.parse_attribute(name, range) {
                                self.define_attribute(&mut attributes, attr);
                            }
                        }
                        Token::Identifier(_)
                        | Token::OpenQuote
                        | Token::Delimiter(Delimiter::OpenBrace) => {
                            if let Some(block) = self.parse_block(name, range) {
                                blocks.push(block);
                            }
                        }
                        _ => {
                            let subject = self.range_of(self.peek_raw());
                            self.fail(
                                "Argument or block definition required",
                                "An argument or block definition is required here. To set an argument, use the equals sign \"=\" to introduce the argument value.",
                                subject,
                            );
                            self.recover_after_body_item();
                        }
                    }
                }
                Token::OpenQuote => {
                    self.fail(
                        "Invalid argument name",
                        "Argument names must not be quoted.",
                        range,
                    );
                    self.recover_after_body_item();
                }
                _ => {
                    self.advance_raw();
                    self.fail(
                        "Argument or block definition required",
                        "An argument or block definition is required here.",
                        range,
                    );
                    self.recover_after_body_item();
                }
            }
        }

        let end = self.range_of(self.peek_raw());
        Body {
            attributes,
            blocks,
            range: SourceRange::between(&start, &end.start_range()),
        }
    }

    fn define_attribute(&mut self, attributes: &mut IndexMap<String, Attribute>, attr: Attribute) {
        if let Some(existing) = attributes.get(&attr.name) {
            // reported without entering recovery: the rest of the body is fine
            let diagnostic = Diagnostic::error(
                "Attribute redefined",
                format!(
                    "The argument {:?} was already set at {}. Each argument may be set only once.",
                    attr.name, existing.name_range
                ),
            )
            .with_subject(attr.name_range.clone());
            self.report(diagnostic);
            return;
        }
        attributes.insert(attr.name.clone(), attr);
    }

    fn parse_attribute(&mut self, name: String, name_range: SourceRange) -> Option<Attribute> {
        self.advance_raw(); // =
        let expr = self.parse_expression();

        let next = self.peek_raw().clone();
        match next.token {
            Token::Newline => {
                self.advance_raw();
            }
            Token::Eof | Token::Delimiter(Delimiter::CloseBrace) => {}
            _ => {
                let subject = self.range_of(&next);
                self.fail(
                    "Missing newline after argument",
                    "An argument definition must end with a newline.",
                    subject,
                );
                self.recover_after_body_item();
            }
        }

        let range = SourceRange::between(&name_range, &expr.range);
        Some(Attribute {
            name,
            expr,
            range,
            name_range,
        })
    }

    fn parse_block(&mut self, type_name: String, type_range: SourceRange) -> Option<Block> {
        let mut labels = Vec::new();
        let mut label_ranges = Vec::new();

        loop {
            let next = self.peek_raw().clone();
            let range = self.range_of(&next);
            match next.token {
                Token::Identifier(label) => {
                    self.advance_raw();
                    labels.push(label);
                    label_ranges.push(range);
                }
                Token::OpenQuote => {
                    let expr = self.parse_quoted_template();
                    match literal_label(&expr.kind) {
                        Some(label) => {
                            labels.push(label);
                            label_ranges.push(expr.range);
                        }
                        None => {
                            self.fail(
                                "Invalid block label",
                                "Template sequences are not allowed in block labels.",
                                expr.range,
                            );
                            self.recover_after_body_item();
                            return None;
                        }
                    }
                }
                Token::Delimiter(Delimiter::OpenBrace) => break,
                Token::Delimiter(Delimiter::Equal) => {
                    self.fail(
                        "Invalid block definition",
                        "The equals sign \"=\" indicates an argument definition, and must not be used when defining a block.",
                        range,
                    );
                    self.recover_after_body_item();
                    return None;
                }
                Token::Newline => {
                    self.fail(
                        "Invalid block definition",
                        "A block definition must have block content delimited by \"{\" and \"}\", starting on the same line as the block header.",
                        range,
                    );
                    self.recover_after_body_item();
                    return None;
                }
                _ => {
                    self.fail(
                        "Invalid block definition",
                        "Either a quoted string block label or an opening brace (\"{\") is expected here.",
                        range,
                    );
                    self.recover_after_body_item();
                    return None;
                }
            }
        }

        let open = self.advance_raw();
        let open_range = self.range_of(&open);
        if !self.enter(&open_range) {
            self.leave();
            self.recover_to(Delimiter::CloseBrace);
            if self.peek_raw().token.is_delimiter(Delimiter::CloseBrace) {
                self.advance_raw();
            }
            return None;
        }
        self.push_newlines(true);
        let body = self.parse_body(open_range.start_range(), Some(&open_range));
        self.pop_newlines();
        self.leave();

        let close = self.peek_raw().clone();
        let close_range = self.range_of(&close);
        if close.token.is_delimiter(Delimiter::CloseBrace) {
            self.advance_raw();
            let after = self.peek_raw().clone();
            match after.token {
                Token::Newline => {
                    self.advance_raw();
                }
                Token::Eof | Token::Delimiter(Delimiter::CloseBrace) => {}
                _ => {
                    let subject = self.range_of(&after);
                    self.fail(
                        "Missing newline after block definition",
                        "A block definition must end with a newline.",
                        subject,
                    );
                    self.recover_after_body_item();
                }
            }
        }

        let body = Body {
            range: SourceRange::between(&open_range, &close_range),
            ..body
        };
        Some(Block {
            type_name,
            labels,
            body,
            range: SourceRange::between(&type_range, &close_range),
            type_range,
            label_ranges,
        })
    }
}

/// The text of a quoted label with no interpolations or directives.
fn literal_label(kind: &ExpressionKind) -> Option<String> {
    let ExpressionKind::Template(parts) = kind else {
        return None;
    };
    match parts.as_slice() {
        [] => Some(String::new()),
        [TemplatePart::Literal { value, .. }] => Some(value.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::analyzer::parse_config;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_attributes_and_blocks() {
        let src = "name = \"x\"\n\nservice \"web\" primary {\n  port = 80\n  inner {}\n}\n";
        let (body, diags) = parse_config(src, "<src>");
        assert!(diags.is_empty(), "{}", diags);
        assert_eq!(body.attributes.len(), 1);
        assert_eq!(body.blocks.len(), 1);
        let block = &body.blocks[0];
        assert_eq!(block.type_name, "service");
        assert_eq!(block.labels, vec!["web".to_string(), "primary".to_string()]);
        assert!(block.body.attributes.contains_key("port"));
        assert_eq!(block.body.blocks[0].type_name, "inner");
        assert_eq!(block.definition_range().to_string(), "<src>:3,1-22");
    }

    #[test]
    fn test_single_line_block() {
        let (body, diags) = parse_config("a { b = 1 }", "<src>");
        assert!(diags.is_empty(), "{}", diags);
        assert!(body.blocks[0].body.attributes.contains_key("b"));
    }

    #[test]
    fn test_missing_item_range_is_body_start() {
        let (body, _) = parse_config("a = 1\n", "<src>");
        assert_eq!(body.missing_item_range().to_string(), "<src>:1,1-1");
    }

    #[test]
    fn test_identifier_without_brace() {
        let (_, diags) = parse_config("invalid syntax", "<src>");
        assert_eq!(
            diags.to_string(),
            "<src>:1,15-15: Invalid block definition; Either a quoted string block label or an opening brace (\"{\") is expected here."
        );
    }

    #[test]
    fn test_block_brace_on_next_line() {
        let (_, diags) = parse_config("object \"hello\"\n{\n}\n", "spec.hcldec");
        assert_eq!(
            diags.to_string(),
            "spec.hcldec:1,15-2,1: Invalid block definition; A block definition must have block content delimited by \"{\" and \"}\", starting on the same line as the block header."
        );
    }

    #[test]
    fn test_attribute_redefined() {
        let (body, diags) = parse_config("a = 1\na = 2\nb = 3\n", "<src>");
        assert_eq!(diags.len(), 1);
        assert!(diags
            .to_string()
            .starts_with("<src>:2,1-2: Attribute redefined; The argument \"a\" was already set at <src>:1,1-2."));
        assert_eq!(body.attributes.len(), 2);
    }

    #[test]
    fn test_missing_newline_after_argument() {
        let (_, diags) = parse_config("a = 1 b = 2\n", "<src>");
        assert!(diags.to_string().contains("Missing newline after argument"));
    }

    #[test]
    fn test_unclosed_block() {
        let (_, diags) = parse_config("a {\n b = 1\n", "<src>");
        assert_eq!(diags.len(), 1);
        assert!(diags.to_string().contains("Unclosed configuration block"));
    }

    #[test]
    fn test_recovery_continues_after_bad_item() {
        let (body, diags) = parse_config("= 1\nb = 2\n", "<src>");
        assert_eq!(diags.len(), 1);
        assert!(body.attributes.contains_key("b"));
    }
}
