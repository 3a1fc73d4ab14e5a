use std::fmt::Write;

use lookout_core::{ChangedFile, InlineComment, LookoutError, PullRequest, ReviewResult};
use lookout_difflens::annotate::annotate_patch;
use serde_json::Value;
use tracing::debug;

const INSTRUCTIONS: &str = "\
You are an experienced software engineer reviewing a GitHub pull request.

Review the changes below for bugs, security issues, performance problems and \
anything that would make the code hard to maintain. Be concrete and brief.

Each diff line is prefixed with its line number in the new version of the \
file. Removed lines have no number. Inline comments must point at a line that \
the pull request added (a line starting with `+`), using that number.

Respond with a single JSON object and nothing else:
{
  \"feedback\": \"Overall assessment of the pull request (markdown allowed)\",
  \"approve\": true or false,
  \"comments\": [
    {\"file_path\": \"path/to/file\", \"line_number\": 42, \"comment\": \"What is wrong and how to fix it\"}
  ],
  \"suggestions\": [\"Optional improvement that does not belong to a single line\"]
}

Set \"approve\" to true only if the change is ready to merge as is. \
Use an empty \"comments\" list when no line needs a comment.";

/// Build the single user-role prompt for a review.
///
/// Only files carrying a patch are included. The diff section is cut at a
/// line boundary once it exceeds `max_diff_chars`, and a marker says how much
/// was left out.
///
/// # Examples
///
/// ```
/// use lookout_core::{ChangedFile, PullRequest};
/// use lookout_review::prompt::build_review_prompt;
///
/// let pr = PullRequest { title: "Add retries".into(), ..PullRequest::default() };
/// let files = vec![ChangedFile::with_patch("src/net.rs", "@@ -1 +1,2 @@\n a\n+b")];
/// let prompt = build_review_prompt(&pr, &files, 10_000);
/// assert!(prompt.contains("Add retries"));
/// assert!(prompt.contains("### src/net.rs"));
/// assert!(prompt.contains("   2 +b"));
/// ```
pub fn build_review_prompt(
    pr: &PullRequest,
    files: &[ChangedFile],
    max_diff_chars: usize,
) -> String {
    let mut prompt = String::from(INSTRUCTIONS);

    let _ = write!(prompt, "\n\n## Pull request\n\nTitle: {}\n", pr.title);
    if !pr.author.is_empty() {
        let _ = writeln!(prompt, "Author: {}", pr.author);
    }
    if let (Some(head), Some(base)) = (&pr.head_ref, &pr.base_ref) {
        let _ = writeln!(prompt, "Branch: {head} -> {base}");
    }
    let description = pr.body.trim();
    if !description.is_empty() {
        let _ = write!(prompt, "\nDescription:\n{description}\n");
    }

    let mut diff = String::new();
    for file in files {
        let Some(patch) = &file.patch else { continue };
        let status = if file.status.is_empty() {
            "modified"
        } else {
            file.status.as_str()
        };
        let _ = write!(
            diff,
            "### {} ({status})\n```diff\n{}```\n\n",
            file.filename,
            annotate_patch(patch)
        );
    }

    let (kept, omitted) = truncate_at_line(&diff, max_diff_chars);
    prompt.push_str("\n## Changes\n\n");
    prompt.push_str(kept);
    if omitted > 0 {
        debug!(omitted, "diff truncated for prompt");
        let _ = writeln!(prompt, "\n[diff truncated: {omitted} more characters omitted]");
    }

    prompt
}

/// Split `text` at the last line break that keeps it within `max` bytes.
///
/// Returns the kept prefix and the number of bytes left out.
fn truncate_at_line(text: &str, max: usize) -> (&str, usize) {
    if text.len() <= max {
        return (text, 0);
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let cut = text[..end].rfind('\n').map_or(end, |i| i + 1);
    (&text[..cut], text.len() - cut)
}

/// Parse the model's JSON answer into a [`ReviewResult`].
///
/// Code fences around the JSON are tolerated. `feedback`, `approve` and
/// `comments` are required; `suggestions` is optional. Comment entries
/// missing a field or pointing at line 0 are dropped. The returned result
/// carries no token usage.
///
/// # Errors
///
/// Returns [`LookoutError::Parse`] if the text is not a JSON object or a
/// required field is missing or mistyped.
///
/// # Examples
///
/// ```
/// use lookout_review::prompt::parse_review_response;
///
/// let json = r#"{"feedback":"Looks fine","approve":true,"comments":[]}"#;
/// let result = parse_review_response(json).unwrap();
/// assert!(result.approve);
/// assert!(result.suggestions.is_empty());
///
/// assert!(parse_review_response(r#"{"approve":true}"#).is_err());
/// ```
pub fn parse_review_response(response: &str) -> Result<ReviewResult, LookoutError> {
    let cleaned = strip_code_fences(response);
    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| LookoutError::Parse(format!("model response is not JSON: {e}")))?;

    let feedback = value
        .get("feedback")
        .and_then(Value::as_str)
        .ok_or_else(|| missing("feedback"))?
        .to_string();
    let approve = value
        .get("approve")
        .and_then(Value::as_bool)
        .ok_or_else(|| missing("approve"))?;
    let entries = value
        .get("comments")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("comments"))?;

    let comments: Vec<InlineComment> = entries.iter().filter_map(parse_comment).collect();
    if comments.len() < entries.len() {
        debug!(
            dropped = entries.len() - comments.len(),
            "dropped malformed comment entries"
        );
    }

    let suggestions = value
        .get("suggestions")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Ok(ReviewResult {
        feedback,
        approve,
        comments,
        suggestions,
        usage: None,
    })
}

fn missing(field: &str) -> LookoutError {
    LookoutError::Parse(format!("model response lacks a valid \"{field}\" field"))
}

fn parse_comment(entry: &Value) -> Option<InlineComment> {
    let file_path = entry.get("file_path")?.as_str()?.trim();
    let comment = entry.get("comment")?.as_str()?.trim();
    let line_number = match entry.get("line_number")? {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    if file_path.is_empty() || comment.is_empty() || line_number == 0 {
        return None;
    }
    Some(InlineComment {
        file_path: file_path.to_string(),
        line_number: u32::try_from(line_number).ok()?,
        comment: comment.to_string(),
    })
}

fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim();
        }
    }
    if let Some(rest) = trimmed.strip_prefix("```") {
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim();
        }
    }
    trimmed
}
