//! Function snippets and file names for function-level targets.

use std::sync::LazyLock;

use regex::Regex;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w-]").expect("valid regex"));
static UNDERSCORE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{2,}").expect("valid regex"));

/// Cut a function body out of `source` by indentation.
///
/// Starts at the 1-based `start_line` and keeps every following line until
/// the first non-blank line indented less than the start line. Returns
/// `None` when `start_line` is out of range.
pub fn extract_function(source: &str, start_line: u32) -> Option<String> {
    let lines: Vec<&str> = source.lines().collect();
    let start = usize::try_from(start_line).ok()?.checked_sub(1)?;
    let first = *lines.get(start)?;
    let base_indent = indent_of(first);

    let body = lines[start + 1..]
        .iter()
        .take_while(|line| line.trim().is_empty() || indent_of(line) >= base_indent);

    Some(
        std::iter::once(&first)
            .chain(body)
            .copied()
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Make a function name usable as part of a file name.
///
/// Characters other than word characters and `-` become `_`, runs of `_`
/// collapse to one, and the result is cut to `max_len` characters.
pub fn sanitize_filename(name: &str, max_len: usize) -> String {
    let replaced = UNSAFE_CHARS.replace_all(name, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    collapsed.chars().take(max_len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "\
namespace odb {

void defin::readChip()
{
  int x = 0;

  x++;
}

void defin::other()
{
}
}";

    #[test]
    fn test_extract_stops_at_dedent() {
        let snippet = extract_function("int f() {\n  a;\n\n  b;\n}\nint g();", 2).unwrap();
        assert_eq!(snippet, "  a;\n\n  b;");
    }

    #[test]
    fn test_extract_top_level_function() {
        // A top-level function has indent 0, so nothing is ever less indented
        let snippet = extract_function(SOURCE, 3).unwrap();
        assert!(snippet.starts_with("void defin::readChip()"));
        assert!(snippet.ends_with('}'));
        assert_eq!(snippet.lines().count(), 11);
    }

    #[test]
    fn test_extract_out_of_range() {
        assert_eq!(extract_function(SOURCE, 0), None);
        assert_eq!(extract_function(SOURCE, 99), None);
        assert_eq!(extract_function("", 1), None);
    }

    #[test]
    fn test_extract_last_line() {
        assert_eq!(extract_function("a\nb", 2).as_deref(), Some("b"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename("odb::defin::readChip(int, char*)", 100),
            "odb_defin_readChip_int_char_"
        );
        assert_eq!(sanitize_filename("operator<<", 100), "operator_");
        assert_eq!(sanitize_filename("keep-dash_ok", 100), "keep-dash_ok");
        assert_eq!(sanitize_filename("abcdef", 3), "abc");
    }
}
