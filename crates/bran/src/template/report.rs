use ariadne::{Config, IndexType, Label, Report, ReportKind, Source};

use super::{ParseError, Span};
use crate::protocol::MountError;

const SOURCE_NAME: &str = "schema";

/// A problem found in schema markup, detached from the source it points into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateError {
    pub span: Span,
    pub message: String,
    pub label: String,
}

impl TemplateError {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            span,
            label: message.clone(),
            message,
        }
    }

    pub fn from_parse_error(error: &ParseError<'_>) -> Self {
        Self {
            span: *error.span(),
            message: error.to_string(),
            label: error.reason().to_string(),
        }
    }
}

/// Renders `errors` against `source` into a single `MountError`.
pub fn mount_error(errors: &[TemplateError], source: &str) -> MountError {
    let message = match errors {
        [] => "unknown markup error".to_owned(),
        [error] => error.message.clone(),
        [error, rest @ ..] => format!("{} (and {} more)", error.message, rest.len()),
    };
    let mut report = String::new();
    for error in errors {
        let range = clamp(error.span, source.len());
        let mut report_bytes = Vec::new();
        let written = Report::build(ReportKind::Error, (SOURCE_NAME, range.clone()))
            .with_config(
                Config::default()
                    .with_color(false)
                    .with_index_type(IndexType::Byte),
            )
            .with_message(&error.message)
            .with_label(Label::new((SOURCE_NAME, range)).with_message(&error.label))
            .finish()
            .write((SOURCE_NAME, Source::from(source)), &mut report_bytes);
        match written {
            Ok(()) => report.push_str(&String::from_utf8_lossy(&report_bytes)),
            Err(_) => report.push_str(&error.message),
        }
    }
    MountError { message, report }
}

fn clamp(span: Span, len: usize) -> std::ops::Range<usize> {
    let start = span.start.min(len);
    start..span.end.clamp(start, len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_points_into_the_markup() {
        let source = "<div>\n  <b>bold</i>\n</div>";
        let error = TemplateError::new(Span::from(14..18), "expected </b>, found </i>");
        let mount = mount_error(&[error], source);
        assert_eq!(mount.message, "expected </b>, found </i>");
        assert!(mount.report.contains("schema:2:"), "{}", mount.report);
        assert!(mount.report.contains("expected </b>, found </i>"));
    }

    #[test]
    fn spans_are_byte_offsets() {
        let source = "<p>é…</p>\n<b>x</i>";
        assert_eq!(&source[17..21], "</i>");
        let error = TemplateError::new(Span::from(17..21), "expected </b>, found </i>");
        let mount = mount_error(&[error], source);
        assert!(mount.report.contains("schema:2:"), "{}", mount.report);
        assert!(mount.report.contains("<b>x</i>"), "{}", mount.report);
    }

    #[test]
    fn out_of_range_spans_are_clamped() {
        let mount = mount_error(&[TemplateError::new(Span::from(40..90), "late")], "<p>");
        assert!(!mount.report.is_empty());
    }
}
