use std::io::Write;

use crate::app::{AppContext, Result};
use crate::domain::Post;

/// Runs one fetch cycle and prints the posts, newest first.
///
/// A total fetch failure is returned as an error so the process exits non-zero.
pub async fn list_posts(ctx: &AppContext) -> Result<()> {
    let posts = ctx.posts.fetch_posts().await?;

    if posts.is_empty() {
        println!("No posts found");
        return Ok(());
    }

    let mut stdout = std::io::stdout().lock();
    write_posts(&mut stdout, &posts)?;
    Ok(())
}

fn write_posts(out: &mut impl Write, posts: &[Post]) -> std::io::Result<()> {
    for post in posts {
        writeln!(
            out,
            "{}  {}  [{}]",
            post.published_at.format("%Y-%m-%d"),
            post.display_title(),
            post.slug
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_write_posts_format() {
        let mut first = Post::new("spring-social", Utc.with_ymd_and_hms(2024, 4, 2, 0, 0, 0).unwrap());
        first.title = "Spring Social".to_string();
        let second = Post::new("untitled", Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap());

        let mut out = Vec::new();
        write_posts(&mut out, &[first, second]).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "2024-04-02  Spring Social  [spring-social]\n2023-12-01  (Untitled)  [untitled]\n"
        );
    }
}
