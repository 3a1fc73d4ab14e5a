use std::fmt::Write;

use crate::hunk::split_hunks;

/// Render a patch with new-file line numbers in a left gutter.
///
/// Added and context lines get their line number; removed lines get a blank
/// gutter since they do not exist in the new file. Preamble text and hunks
/// with malformed headers are left out.
///
/// # Examples
///
/// ```
/// use lookout_difflens::annotate::annotate_patch;
///
/// let out = annotate_patch("@@ -4,2 +4,2 @@\n keep\n-old\n+new");
/// assert_eq!(out, "@@ -4,2 +4,2 @@\n   4  keep\n     -old\n   5 +new\n");
/// ```
pub fn annotate_patch(patch: &str) -> String {
    let mut out = String::new();
    for hunk in split_hunks(patch) {
        let _ = writeln!(out, "{}", hunk.header);
        let mut line_no = Some(hunk.header.new_start);
        for line in &hunk.lines {
            match line_no {
                Some(n) if !line.starts_with('-') && !line.starts_with('\\') => {
                    let _ = writeln!(out, "{n:>4} {line}");
                    line_no = n.checked_add(1);
                }
                _ => {
                    let _ = writeln!(out, "     {line}");
                }
            }
        }
    }
    out
}
