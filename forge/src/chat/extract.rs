//! Fenced code block extraction

const FENCE: &str = "```";
const PREFERRED_TAGS: [&str; 2] = ["javascript", "js"];

struct Block<'a> {
    tag: &'a str,
    body: &'a str,
}

/// Body of the first fenced code block, preferring a `javascript`/`js` tag
///
/// Returns `None` when the text has no complete fence; an empty fence yields
/// `Some("")`.
pub fn extract_code_block(text: &str) -> Option<String> {
    let blocks = fenced_blocks(text);
    blocks
        .iter()
        .find(|block| PREFERRED_TAGS.contains(&block.tag.to_ascii_lowercase().as_str()))
        .or_else(|| blocks.first())
        .map(|block| trim_blank_lines(block.body).to_string())
}

fn fenced_blocks(text: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(FENCE) {
        let after_open = &rest[open + FENCE.len()..];
        // Info string runs to the end of the opening line
        let (info, body_start) = match after_open.find('\n') {
            Some(newline) => (&after_open[..newline], newline + 1),
            None => break,
        };
        let body = &after_open[body_start..];
        let Some(close) = body.find(FENCE) else {
            break;
        };
        blocks.push(Block {
            tag: info.split_whitespace().next().unwrap_or(""),
            body: &body[..close],
        });
        rest = &body[close + FENCE.len()..];
    }

    blocks
}

fn trim_blank_lines(body: &str) -> &str {
    let lines: Vec<&str> = body.split('\n').collect();
    let first = lines.iter().position(|line| !line.trim().is_empty());
    let last = lines.iter().rposition(|line| !line.trim().is_empty());
    match (first, last) {
        (Some(first), Some(last)) => {
            let start: usize = lines[..first].iter().map(|l| l.len() + 1).sum();
            let end: usize = start
                + lines[first..=last].iter().map(|l| l.len() + 1).sum::<usize>()
                - 1;
            body[start..end].trim_end_matches('\r')
        }
        _ => "",
    }
}
