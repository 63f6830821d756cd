use std::path::Path;

use anyhow::{bail, Context, Result};
use log::debug;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_until1, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, rest, value, verify},
    multi::many0,
    sequence::{delimited, preceded, terminated},
    IResult,
};

use crate::config::Config;

/// Values available to the body template
///
/// A borrowed projection of the config file and the date range flags.
#[derive(Debug, Clone, Copy)]
pub struct BodyParams<'a> {
    pub user_id: &'a str,
    pub processor_session_id: &'a str,
    pub security_token: &'a str,
    pub start_date_time: &'a str,
    pub end_date_time: &'a str,
}

impl<'a> BodyParams<'a> {
    pub fn new(config: &'a Config, start_date_time: &'a str, end_date_time: &'a str) -> Self {
        Self {
            user_id: &config.user_id,
            processor_session_id: &config.processor_session_id,
            security_token: &config.security_token,
            start_date_time,
            end_date_time,
        }
    }

    fn field(&self, name: &str) -> Option<&'a str> {
        match name {
            "UserID" => Some(self.user_id),
            "ProcessorSessionID" => Some(self.processor_session_id),
            "SecurityToken" => Some(self.security_token),
            "StartDateTime" => Some(self.start_date_time),
            "EndDateTime" => Some(self.end_date_time),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq)]
enum Segment {
    Text(String),
    Field(String),
}

/// A raw piece of template source before trim markers are applied
#[derive(Debug, Clone, PartialEq)]
enum Piece<'a> {
    Text(&'a str),
    Action {
        /// `None` for a comment
        field: Option<&'a str>,
        trim_left: bool,
        trim_right: bool,
    },
}

const TRIMMED: &[char] = &[' ', '\t', '\r', '\n'];

/// A parsed request body template
///
/// Placeholders look like `{{.UserID}}` or `{{ .UserID }}`. A `{{- ` or ` -}}`
/// marker trims the whitespace before or after the placeholder, and
/// `{{/* ... */}}` is a comment. No other actions are supported. Everything
/// else is copied through untouched; substituted values are not escaped.
#[derive(Debug, PartialEq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub async fn load(path: &Path) -> Result<Self> {
        debug!("Loading body template from {}", path.display());

        let source = tokio::fs::read_to_string(path)
            .await
            .context("read body template")?;

        Self::parse(&source)
    }

    pub fn parse(input: &str) -> Result<Self> {
        let pieces = match many0(piece)(input) {
            Ok(("", pieces)) => pieces,
            Ok((remainder, _)) => bail!(
                "malformed placeholder at byte {}",
                input.len() - remainder.len()
            ),
            Err(_) => bail!("invalid body template"),
        };

        let mut segments = Vec::new();
        let mut trim_next = false;

        for piece in pieces {
            match piece {
                Piece::Text(text) => {
                    let text = if trim_next {
                        text.trim_start_matches(TRIMMED)
                    } else {
                        text
                    };

                    if !text.is_empty() {
                        segments.push(Segment::Text(text.to_string()));
                    }
                    trim_next = false;
                }
                Piece::Action {
                    field,
                    trim_left,
                    trim_right,
                } => {
                    if trim_left {
                        if let Some(Segment::Text(text)) = segments.last_mut() {
                            text.truncate(text.trim_end_matches(TRIMMED).len());
                        }
                    }

                    if let Some(name) = field {
                        segments.push(Segment::Field(name.to_string()));
                    }
                    trim_next = trim_right;
                }
            }
        }

        Ok(Self { segments })
    }

    pub fn render(&self, params: &BodyParams) -> Result<String> {
        let mut body = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Text(text) => body.push_str(text),
                Segment::Field(name) => {
                    let value = params
                        .field(name)
                        .with_context(|| format!("unknown field {:?} in body template", name))?;
                    body.push_str(value);
                }
            }
        }

        Ok(body)
    }
}

fn piece(input: &str) -> IResult<&str, Piece> {
    alt((action, text))(input)
}

fn action(input: &str) -> IResult<&str, Piece> {
    let (input, trim_left) = left_delim(input)?;
    let (input, field) = preceded(
        multispace0,
        alt((
            map(preceded(char('.'), field_name), Some),
            value(None, comment),
        )),
    )(input)?;
    let (input, trim_right) = right_delim(input)?;

    Ok((
        input,
        Piece::Action {
            field,
            trim_left,
            trim_right,
        },
    ))
}

fn left_delim(input: &str) -> IResult<&str, bool> {
    alt((
        value(true, terminated(tag("{{-"), multispace1)),
        value(false, tag("{{")),
    ))(input)
}

fn right_delim(input: &str) -> IResult<&str, bool> {
    alt((
        value(true, preceded(multispace1, tag("-}}"))),
        value(false, preceded(multispace0, tag("}}"))),
    ))(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
    delimited(tag("/*"), take_until("*/"), tag("*/"))(input)
}

fn field_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn text(input: &str) -> IResult<&str, Piece> {
    let (remainder, text) = alt((
        take_until1("{{"),
        verify(rest, |s: &str| !s.is_empty() && !s.starts_with("{{")),
    ))(input)?;

    Ok((remainder, Piece::Text(text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{"userId":"{{.UserID}}","session":"{{ .ProcessorSessionID }}","token":"{{.SecurityToken}}","from":"{{.StartDateTime}}","to":"{{.EndDateTime}}"}"#;

    fn params() -> BodyParams<'static> {
        BodyParams {
            user_id: "user-1",
            processor_session_id: "session-1",
            security_token: "token-1",
            start_date_time: "2024-01-01",
            end_date_time: "2024-01-31T23-59-59",
        }
    }

    #[test]
    fn render_all_fields() {
        let template = Template::parse(BODY).unwrap();
        assert_eq!(
            template.render(&params()).unwrap(),
            r#"{"userId":"user-1","session":"session-1","token":"token-1","from":"2024-01-01","to":"2024-01-31T23-59-59"}"#
        );
    }

    #[test]
    fn render_is_repeatable() {
        let template = Template::parse(BODY).unwrap();
        let first = template.render(&params()).unwrap();
        let second = template.render(&params()).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn empty_config_values_are_substituted() {
        let config = Config::default();
        let params = BodyParams::new(&config, "2024-01-01", "2024-01-02");
        let template = Template::parse(BODY).unwrap();

        assert_eq!(
            template.render(&params).unwrap(),
            r#"{"userId":"","session":"","token":"","from":"2024-01-01","to":"2024-01-02"}"#
        );
    }

    #[test]
    fn values_are_not_escaped() {
        let params = BodyParams {
            user_id: r#"a"b"#,
            ..params()
        };
        let template = Template::parse(r#"{"u":"{{.UserID}}"}"#).unwrap();
        assert_eq!(template.render(&params).unwrap(), r#"{"u":"a"b"}"#);
    }

    #[test]
    fn plain_text_is_kept() {
        let template = Template::parse("{\n  \"a\": {\"b\": 1}\n}\n").unwrap();
        assert_eq!(
            template.segments,
            vec![Segment::Text("{\n  \"a\": {\"b\": 1}\n}\n".to_string())]
        );
    }

    #[test]
    fn adjacent_placeholders() {
        let template = Template::parse("{{.StartDateTime}}{{.EndDateTime}}").unwrap();
        assert_eq!(
            template.render(&params()).unwrap(),
            "2024-01-012024-01-31T23-59-59"
        );
    }

    #[test]
    fn empty_template() {
        let template = Template::parse("").unwrap();
        assert_eq!(template.render(&params()).unwrap(), "");
    }

    #[test]
    fn trim_markers_remove_surrounding_whitespace() {
        let template =
            Template::parse("{\n  \"from\": \"x\",\n  {{- .StartDateTime -}}\n  , \"to\": 1}")
                .unwrap();
        assert_eq!(
            template.render(&params()).unwrap(),
            "{\n  \"from\": \"x\",2024-01-01, \"to\": 1}"
        );
    }

    #[test]
    fn one_sided_trim_marker() {
        let template = Template::parse("a  {{- .UserID }}  b").unwrap();
        assert_eq!(template.render(&params()).unwrap(), "auser-1  b");
    }

    #[test]
    fn comments_render_nothing() {
        let template =
            Template::parse("{{/* credentials */}}{\"u\":\"{{.UserID}}\"}\n{{- /* end */ -}}\n")
                .unwrap();
        assert_eq!(template.render(&params()).unwrap(), r#"{"u":"user-1"}"#);
    }

    #[test]
    fn reject_unterminated_comment() {
        let error = Template::parse("ab{{/* open").unwrap_err();
        assert_eq!(error.to_string(), "malformed placeholder at byte 2");
    }

    #[test]
    fn reject_unterminated_placeholder() {
        let error = Template::parse(r#"{"u":"{{.UserID"}"#).unwrap_err();
        assert_eq!(error.to_string(), "malformed placeholder at byte 6");
    }

    #[test]
    fn reject_placeholder_without_dot() {
        let error = Template::parse("{{UserID}}").unwrap_err();
        assert_eq!(error.to_string(), "malformed placeholder at byte 0");
    }

    #[test]
    fn reject_unknown_field() {
        let template = Template::parse("{{.Password}}").unwrap();
        let error = template.render(&params()).unwrap_err();
        assert_eq!(
            error.to_string(),
            r#"unknown field "Password" in body template"#
        );
    }

    #[tokio::test]
    async fn missing_template_file() {
        let dir = tempfile::tempdir().unwrap();
        let error = Template::load(&dir.path().join("bodytemplate.json"))
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "read body template");
    }
}
