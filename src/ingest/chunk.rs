//! Text cleansing and overlapping character-window chunking.

/// Normalize raw document text before chunking.
///
/// CRLF and lone CR become LF, control characters other than newline and tab are
/// dropped, trailing whitespace is trimmed per line, runs of three or more blank
/// lines collapse to one, and the whole text is trimmed.
pub fn cleanse(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(normalized.len());
    let mut blank_run = 0usize;
    for line in normalized.split('\n') {
        let line: String = line
            .chars()
            .filter(|&c| c == '\t' || !c.is_control())
            .collect();
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
        } else {
            let separators = if out.is_empty() {
                0
            } else if blank_run >= 3 {
                2
            } else {
                blank_run + 1
            };
            for _ in 0..separators {
                out.push('\n');
            }
            out.push_str(line);
            blank_run = 0;
        }
    }
    out.trim().to_string()
}

/// Split `text` into windows of at most `size` chars, consecutive windows sharing
/// about `overlap` chars (clamped below `size`).
///
/// A window that would end mid-word is pulled back to the last whitespace in its
/// second half when there is one, and the next window starts on a word boundary
/// when one is close. Windows are trimmed; empty ones are dropped.
pub fn chunk(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let size = size.max(1);
    let overlap = overlap.min(size - 1);
    let chars: Vec<char> = text.chars().collect();

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < chars.len() {
        let hard_end = (start + size).min(chars.len());
        let end = if hard_end < chars.len() {
            soft_break(&chars, start, hard_end)
        } else {
            hard_end
        };

        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
        if end >= chars.len() {
            break;
        }

        start = next_start(&chars, start, end, overlap);
    }
    chunks
}

/// `overlap` chars before `end`, moved forward to the next word start when that
/// lands mid-word. Always advances past `start`.
fn next_start(chars: &[char], start: usize, end: usize, overlap: usize) -> usize {
    let next = end.saturating_sub(overlap).max(start + 1);
    if chars[next - 1].is_whitespace() {
        return next;
    }
    (next..end)
        .find(|&i| chars[i].is_whitespace())
        .map(|i| i + 1)
        .unwrap_or(next)
}

/// Last whitespace boundary in the second half of `[start, end)`, or `end`.
fn soft_break(chars: &[char], start: usize, end: usize) -> usize {
    let midpoint = start + (end - start) / 2;
    (midpoint..end)
        .rev()
        .find(|&i| chars[i].is_whitespace())
        .map(|i| i + 1)
        .unwrap_or(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanse_normalizes_whitespace() {
        let raw = "  Title\r\n\r\nbody line   \rnext\u{0007}\n\n\n\n\nend\t \n";
        assert_eq!(cleanse(raw), "Title\n\nbody line\nnext\n\nend");
    }

    #[test]
    fn cleanse_keeps_tabs_and_single_blank_lines() {
        assert_eq!(cleanse("a\tb\n\nc"), "a\tb\n\nc");
        assert_eq!(cleanse("a\n\n\nc"), "a\n\n\nc");
    }

    #[test]
    fn chunk_empty_text() {
        assert!(chunk("", 10, 2).is_empty());
        assert!(chunk("   ", 10, 2).is_empty());
    }

    #[test]
    fn chunk_short_text_is_one_window() {
        assert_eq!(chunk("hello world", 100, 20), vec!["hello world"]);
    }

    #[test]
    fn chunk_windows_overlap_and_cover() {
        let text: String = (0..50).map(|i| format!("w{i:02} ")).collect();
        let text = text.trim_end();
        let chunks = chunk(text, 40, 10);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 40));

        // Every word appears in some chunk.
        for word in text.split(' ') {
            assert!(chunks.iter().any(|c| c.contains(word)), "missing {word}");
        }
        // Consecutive chunks share text.
        for pair in chunks.windows(2) {
            let tail_word = pair[0].split(' ').last().unwrap();
            assert!(pair[1].contains(tail_word), "{pair:?}");
        }
    }

    #[test]
    fn chunk_prefers_whitespace_breaks() {
        let chunks = chunk("alpha beta gamma delta", 12, 0);
        assert_eq!(chunks[0], "alpha beta");
    }

    #[test]
    fn chunk_without_whitespace_cuts_hard() {
        let chunks = chunk(&"x".repeat(25), 10, 0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 5);
    }

    #[test]
    fn chunk_overlap_clamped() {
        // overlap >= size would never advance without the clamp
        let chunks = chunk("abcdefghij", 4, 9);
        assert_eq!(chunks.len(), 7);
        assert_eq!(chunks[0], "abcd");
        assert_eq!(chunks[6], "ghij");
    }
}
