//! Askama template definitions.

use askama::Template;
use serde::Serialize;

/// A post entry for the list page
#[derive(Debug, Clone, Serialize)]
pub struct PostEntry {
    pub slug: String,
    pub title: String,
    pub date: String,
    pub excerpt: String,
}

/// Link to a chronologically adjacent post
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostLink {
    pub title: String,
    pub slug: String,
}

/// List page template
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    // Site metadata
    pub site_title: String,
    pub site_description: String,
    pub github_username: Option<String>,

    // Newest first
    pub posts: Vec<PostEntry>,
}

/// Detail page template
#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    // Page metadata
    pub title: String,
    pub date: String,

    // Content
    pub content: String,
    pub toc_html: Option<String>,

    // Navigation: prev is the next-older post, next the next-newer one
    pub prev_post: Option<PostLink>,
    pub next_post: Option<PostLink>,

    // Site metadata
    pub site_title: String,
    pub github_username: Option<String>,
}
