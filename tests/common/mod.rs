#![allow(dead_code)]

use marginalia::{
    Author, AuthorSource, BoundingRect, BranchName, Comment, CommentFile, CommentId, CommitSha,
    DomAnchor, Pathname, ProjectId, SourceAnchor, Timestamp,
};

pub fn author(name: &str) -> Author {
    Author {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        avatar_url: None,
        source: AuthorSource::GitConfig,
    }
}

pub fn dom_anchor(selector: &str, tag: &str, text: &str) -> DomAnchor {
    DomAnchor {
        selector: selector.to_string(),
        text_content: text.to_string(),
        tag_name: tag.to_string(),
        bounding_rect: BoundingRect::new(100.0, 200.0, 120.0, 40.0),
        html_snapshot: format!("<{tag}>{text}</{tag}>"),
    }
}

pub fn source_anchor(file: &str, line: u32, sha: &str) -> SourceAnchor {
    SourceAnchor {
        file_path: file.to_string(),
        component_name: None,
        line_number: Some(line),
        commit_sha: CommitSha::parse(sha).unwrap(),
    }
}

pub fn comment(id: &str, at_ms: i64) -> Comment {
    Comment::new(
        CommentId::parse(id).unwrap(),
        "looks off on mobile",
        BranchName::parse("feature/checkout").unwrap(),
        dom_anchor("#save", "button", "Save changes"),
        None,
        author("Alice"),
        Timestamp::from_unix_ms(at_ms),
    )
}

pub fn empty_file() -> CommentFile {
    CommentFile::empty(
        ProjectId::parse("app").unwrap(),
        Pathname::parse("/dashboard").unwrap(),
    )
}
