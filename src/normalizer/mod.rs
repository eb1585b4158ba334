//! Turns a downloaded post file into a [`Post`].
//!
//! Files look like `---\n<yaml>\n---\n<markdown>`; the YAML block carries
//! the post metadata and everything after the second delimiter is the body.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::domain::Post;
use crate::fetcher::FetchError;

const DELIMITER: &str = "---";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Frontmatter {
    title: Option<String>,
    #[serde(alias = "description", alias = "summary")]
    excerpt: Option<String>,
    #[serde(
        rename = "publishDate",
        alias = "pubDate",
        alias = "date",
        alias = "publish_date"
    )]
    publish_date: Option<String>,
    category: Option<String>,
    #[serde(deserialize_with = "string_or_list")]
    tags: Vec<String>,
    slug: Option<String>,
    image: Option<serde_yaml::Value>,
}

pub fn parse_post(name: &str, fallback_slug: &str, raw: &str) -> Result<Post, FetchError> {
    let parse_error = |cause: String| FetchError::Parse {
        what: name.to_string(),
        cause,
    };

    let parts: Vec<&str> = raw.splitn(3, DELIMITER).collect();
    let [_, metadata, body] = parts.as_slice() else {
        return Err(parse_error("malformed frontmatter".into()));
    };

    let meta: Frontmatter =
        serde_yaml::from_str(metadata).map_err(|e| parse_error(e.to_string()))?;

    let date = meta
        .publish_date
        .as_deref()
        .ok_or_else(|| parse_error("missing publish date".into()))?;
    let published_at =
        parse_date(date).ok_or_else(|| parse_error(format!("invalid publish date: {}", date)))?;

    let slug = meta
        .slug
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| fallback_slug.to_string());

    let mut post = Post::new(slug, published_at);
    post.title = meta.title.unwrap_or_default();
    post.summary = meta.excerpt.unwrap_or_default();
    post.category = meta.category.filter(|c| !c.trim().is_empty());
    post.tags = meta.tags;
    post.image = meta.image.as_ref().and_then(image_source);
    post.body = Some(body.trim().to_string());

    Ok(post)
}

/// Accepts RFC 3339 timestamps, `YYYY-MM-DD[ HH:MM[:SS]]` and `Month D, YYYY`.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim().trim_matches(|c| c == '"' || c == '\'');

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }

    for fmt in ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%b %d %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }

    None
}

fn image_source(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Mapping(map) => map
            .get("src")
            .and_then(|v| v.as_str())
            .map(String::from),
        _ => None,
    }
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<Tags>::deserialize(deserializer)? {
        Some(Tags::One(tag)) => tag
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        Some(Tags::Many(tags)) => tags,
        None => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = r#"---
title: "Monthly Meetup: June"
excerpt: Talks, pizza and Rust.
publishDate: 2023-06-01
category: Events
tags:
  - meetup
  - rust
slug: june-meetup
image:
  src: ./june.png
  alt: Crowd
---

import { Image } from 'astro:assets';

# June

Welcome!
"#;

    #[test]
    fn test_parse_full_frontmatter() {
        let post = parse_post("june.mdx", "june", SAMPLE).unwrap();

        assert_eq!(post.title, "Monthly Meetup: June");
        assert_eq!(post.summary, "Talks, pizza and Rust.");
        assert_eq!(
            post.published_at,
            Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(post.category.as_deref(), Some("Events"));
        assert_eq!(post.tags, vec!["meetup", "rust"]);
        assert_eq!(post.slug, "june-meetup");
        assert_eq!(post.image.as_deref(), Some("./june.png"));
    }

    #[test]
    fn test_body_is_trimmed() {
        let post = parse_post("june.mdx", "june", SAMPLE).unwrap();
        let body = post.body.unwrap();
        assert!(body.starts_with("import { Image }"));
        assert!(body.ends_with("Welcome!"));
    }

    #[test]
    fn test_body_keeps_later_delimiters() {
        let raw = "---\ndate: 2022-01-01\n---\nabove\n\n---\n\nbelow";
        let post = parse_post("a.md", "a", raw).unwrap();
        assert_eq!(post.body.as_deref(), Some("above\n\n---\n\nbelow"));
    }

    #[test]
    fn test_slug_falls_back_to_file_name() {
        let raw = "---\ntitle: Hi\npubDate: 2022-01-01\n---\nbody";
        let post = parse_post("hello-world.mdx", "hello-world", raw).unwrap();
        assert_eq!(post.slug, "hello-world");
    }

    #[test]
    fn test_missing_title_is_empty() {
        let raw = "---\ndate: 2022-01-01\n---\nbody";
        let post = parse_post("a.mdx", "a", raw).unwrap();
        assert_eq!(post.title, "");
        assert_eq!(post.display_title(), "(Untitled)");
    }

    #[test]
    fn test_fewer_than_three_parts_is_parse_error() {
        let err = parse_post("a.mdx", "a", "# Just markdown").unwrap_err();
        assert_eq!(
            err,
            FetchError::Parse {
                what: "a.mdx".into(),
                cause: "malformed frontmatter".into(),
            }
        );

        assert!(parse_post("a.mdx", "a", "---\ntitle: x\n").is_err());
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let raw = "---\ntitle: [unclosed\n---\nbody";
        assert!(matches!(
            parse_post("a.mdx", "a", raw),
            Err(FetchError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_date_is_parse_error() {
        let raw = "---\ntitle: No date\n---\nbody";
        let err = parse_post("a.mdx", "a", raw).unwrap_err();
        assert!(err.to_string().contains("missing publish date"));
    }

    #[test]
    fn test_tags_as_comma_string() {
        let raw = "---\ndate: 2022-01-01\ntags: rust, community\n---\nbody";
        let post = parse_post("a.mdx", "a", raw).unwrap();
        assert_eq!(post.tags, vec!["rust", "community"]);
    }

    #[test]
    fn test_parse_date_formats() {
        let midnight = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_date("2023-06-01"), Some(midnight));
        assert_eq!(parse_date("June 1, 2023"), Some(midnight));
        assert_eq!(parse_date("Jun 01 2023"), Some(midnight));
        assert_eq!(
            parse_date("2023-06-01T12:30:00Z"),
            Some(Utc.with_ymd_and_hms(2023, 6, 1, 12, 30, 0).unwrap())
        );
        assert_eq!(
            parse_date("2023-06-01T12:30:00-04:00"),
            Some(Utc.with_ymd_and_hms(2023, 6, 1, 16, 30, 0).unwrap())
        );
        assert_eq!(
            parse_date("2023-06-01 08:15"),
            Some(Utc.with_ymd_and_hms(2023, 6, 1, 8, 15, 0).unwrap())
        );
        assert_eq!(parse_date("yesterday"), None);
    }
}
