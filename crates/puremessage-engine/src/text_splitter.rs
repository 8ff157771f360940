use std::collections::VecDeque;

/// Longest text the server accepts in one admin.say
pub const SAY_MAX_LENGTH: usize = 128;

/// Longest text the server accepts in one admin.yell. Yells are never split.
pub const YELL_MAX_LENGTH: usize = 256;

const SENTENCE_TERMINATORS: [char; 4] = ['.', '!', '?', ';'];

/// Split a message body into chunks that each fit in `max_size` characters.
///
/// Newlines always separate chunks. A line that is still too long is broken,
/// in order of preference, after the median sentence terminator (when there
/// are at least three), after the first terminator, before the first comma,
/// at the first space past the middle, at the first space, or arbitrarily at
/// half of `max_size`. Chunks come back in reading order.
///
/// Lines starting with `/` get a leading space since the server would treat
/// them as commands.
///
/// `max_size` values below 2 are raised to 2, since a slash line needs its
/// two-character `" /"` prefix to stay whole. With such a limit chunks may
/// be 2 characters long, one more than a `max_size` of 1 asks for.
pub fn split_message(message: &str, max_size: usize) -> Vec<String> {
    let max_size = max_size.max(2);

    let mut pending: VecDeque<String> = message
        .replace('\r', "")
        .trim()
        .split('\n')
        .map(str::to_string)
        .collect();
    let mut chunks = Vec::new();

    while let Some(line) = pending.pop_front() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let line = if line.starts_with('/') {
            format!(" {}", line)
        } else {
            line.to_string()
        };

        let chars: Vec<char> = line.chars().collect();
        if chars.len() <= max_size {
            chunks.push(line);
            continue;
        }

        let split = split_point(&chars, max_size);
        let head: String = chars[..split].iter().collect();
        let tail: String = chars[split..].iter().collect();

        // Both halves go back through the loop; the head may still be too long
        pending.push_front(tail);
        pending.push_front(head);
    }

    chunks
}

/// Index to break an over-long line at. Always leaves a non-empty head and a
/// strictly shorter tail.
fn split_point(chars: &[char], max_size: usize) -> usize {
    let len = chars.len();
    // a leading " /" must stay together or the slash would be re-prefixed forever
    let min_split = if chars.starts_with(&[' ', '/']) { 2 } else { 1 };
    let valid = |split: usize| split >= min_split && split < len;

    let terminators: Vec<usize> = chars
        .iter()
        .enumerate()
        .filter(|(i, c)| SENTENCE_TERMINATORS.contains(*c) && *i != len - 1)
        .map(|(i, _)| i)
        .collect();

    let candidate = if terminators.len() >= 3 {
        Some(terminators[terminators.len() / 2] + 1)
    } else if let Some(first) = terminators.first() {
        Some(first + 1)
    } else if let Some(comma) = (min_split..len).find(|&i| chars[i] == ',') {
        // the comma starts the tail
        Some(comma)
    } else if let Some(space) = chars[len / 2..].iter().position(|c| *c == ' ') {
        Some(len / 2 + space)
    } else {
        chars.iter().position(|c| *c == ' ')
    };

    match candidate {
        Some(split) if valid(split) => split,
        _ => (max_size / 2).clamp(min_split, len - 1),
    }
}
