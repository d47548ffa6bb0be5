//! Cleanup of indentation left behind by list items.
//!
//! Items inside an indented `itemize`/`enumerate` body come out as `\t* ...`
//! or `\t1. ...`, which Markdown renders as code. This pass pulls them back to
//! column zero.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ENUMERATION_LINE: Regex = Regex::new(r"^\t([0-9]+)\. (.*)").unwrap();
}

/// Strip the leading tab from bullet and numbered list lines.
pub fn strip_list_indentation(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for line in input.split_inclusive('\n') {
        if let Some(rest) = line.strip_prefix("\t*") {
            output.push('*');
            output.push_str(rest);
            continue;
        }
        let (body, newline) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };
        if let Some(caps) = ENUMERATION_LINE.captures(body) {
            output.push_str(&caps[1]);
            output.push_str(". ");
            output.push_str(&caps[2]);
            output.push_str(newline);
            continue;
        }
        output.push_str(line);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullets() {
        assert_eq!(strip_list_indentation("\t* one\n\t* two\n"), "* one\n* two\n");
    }

    #[test]
    fn test_enumeration() {
        assert_eq!(strip_list_indentation("\t1. first\n\t12. twelfth"), "1. first\n12. twelfth");
    }

    #[test]
    fn test_other_lines_untouched() {
        let input = "\tcode\n  * spaced\n## Title\n";
        assert_eq!(strip_list_indentation(input), input);
    }
}
