use crate::{
    config::FileConfig,
    error::{self, ConfigError},
};
use miette::{NamedSource, SourceSpan};
use std::path::Path;

/// Validate the configuration after parsing.
pub fn validate_config(config: &FileConfig, content: &str, path: &Path) -> error::Result<()> {
    let src = NamedSource::new(path.display().to_string(), content.to_string());

    validate_positive_field(src.clone(), content, "backlog", Some(u64::from(config.backlog)))?;
    validate_positive_field(src.clone(), content, "io_timeout_secs", config.io_timeout_secs)?;
    validate_positive_field(
        src,
        content,
        "max_message_bytes",
        config
            .max_message_bytes
            .map(|v| u64::try_from(v).unwrap_or(u64::MAX)),
    )?;

    Ok(())
}

fn validate_positive_field(
    src: NamedSource<String>,
    content: &str,
    field_name: &str,
    value: Option<u64>,
) -> error::Result<()> {
    if value == Some(0) {
        return Err(ConfigError::ValidationError {
            src,
            span: find_field_span(content, field_name),
            field: field_name.into(),
            message: "Must be greater than 0".into(),
        }
        .into());
    }
    Ok(())
}

/// Find the span of a top-level field value for better error reporting.
fn find_field_span(content: &str, field_name: &str) -> Option<SourceSpan> {
    let mut byte_offset = 0;

    for line in content.lines() {
        let line_len = line.len() + 1; // +1 for newline
        if line.trim_start().starts_with('[') {
            break;
        }

        if let Some(span) = extract_field_value_span(line, field_name, byte_offset) {
            return Some(span);
        }

        byte_offset += line_len;
    }

    None
}

fn extract_field_value_span(
    line: &str,
    field_name: &str,
    line_offset: usize,
) -> Option<SourceSpan> {
    let eq_idx = line.find('=')?;
    let field = line[..eq_idx].trim();

    if field != field_name {
        return None;
    }

    let after_eq = &line[eq_idx + 1..];
    let value_start_offset = after_eq.len() - after_eq.trim_start().len();
    let value_str = after_eq.trim_start();

    let value_start = line_offset + eq_idx + 1 + value_start_offset;
    let value_len = calculate_value_len(value_str);

    Some(SourceSpan::new(value_start.into(), value_len))
}

fn calculate_value_len(value_str: &str) -> usize {
    value_str.find('#').map_or_else(
        || value_str.trim_end().len(),
        |i| value_str[..i].trim_end().len(),
    )
}
