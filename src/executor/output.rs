//! Command output sanitization.

/// Sanitize command output for inclusion in error messages.
///
/// Truncates long output to a bounded number of lines and characters so
/// a misbehaving tool cannot flood logs or responses.
pub fn sanitize_output(output: &str, max_lines: usize) -> String {
    const MAX_LINE_LENGTH: usize = 200;
    const MAX_TOTAL_LENGTH: usize = 1000;

    let lines: Vec<&str> = output.lines().take(max_lines).collect();
    let mut result = String::new();

    for line in lines {
        let truncated: String = if line.chars().count() > MAX_LINE_LENGTH {
            let mut t: String = line.chars().take(MAX_LINE_LENGTH).collect();
            t.push_str("...");
            t
        } else {
            line.to_string()
        };

        if result.len() + truncated.len() > MAX_TOTAL_LENGTH {
            result.push_str("...[truncated]");
            break;
        }

        if !result.is_empty() {
            result.push('\n');
        }
        result.push_str(&truncated);
    }

    if output.lines().count() > max_lines {
        result.push_str("\n...[additional output truncated]");
    }

    result
}
