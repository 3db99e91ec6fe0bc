use super::commands::is_comment;
use super::types::CommandLine;

/// Join physical lines continued with a trailing backslash `\`, then drop
/// comments and blank lines.
///
/// A doubled `\\` at the end of a line is a literal backslash, not a
/// continuation.
pub fn preprocess_lines(physical: &[&str]) -> Vec<CommandLine> {
    join_continued_lines(physical)
        .into_iter()
        .filter(|line| !is_comment(&line.text))
        .collect()
}

pub fn join_continued_lines(physical: &[&str]) -> Vec<CommandLine> {
    let mut out = Vec::new();
    let mut i = 0usize;

    while i < physical.len() {
        let start = i;
        let mut buf = String::new();

        loop {
            let (continues, piece) = strip_continuation(physical[i]);

            if !buf.is_empty() {
                buf.push(' ');
            }
            buf.push_str(piece.trim());

            if continues && i + 1 < physical.len() {
                i += 1;
                continue;
            }
            break;
        }

        out.push(CommandLine {
            text: buf,
            phys_start: start,
            phys_end: i,
        });
        i += 1;
    }

    out
}

fn strip_continuation(line: &str) -> (bool, &str) {
    let det = line.trim_end_matches([' ', '\t']);
    let slashes = det.chars().rev().take_while(|c| *c == '\\').count();
    if slashes % 2 == 1 {
        (true, &det[..det.len() - 1])
    } else {
        (false, line)
    }
}
