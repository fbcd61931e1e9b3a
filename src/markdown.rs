//! Markdown, math and code rendering for streamed answers

use std::sync::OnceLock;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};
use regex::{Captures, Regex};
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

/// Class prefix for highlighted tokens, e.g. `hl-keyword`
const HIGHLIGHT_PREFIX: &str = "hl-";

const OPERATOR_TEX: [(char, &str); 9] = [
    ('∫', "\\int "),
    ('±', "\\pm "),
    ('∓', "\\mp "),
    ('×', "\\times "),
    ('÷', "\\div "),
    ('∞', "\\infty "),
    ('≤', "\\leq "),
    ('≥', "\\geq "),
    ('≠', "\\neq "),
];

struct MathPatterns {
    blank_runs: Regex,
    trailing_space: Regex,
    block: Regex,
    inline: Regex,
    scripts: Regex,
    url: Regex,
}

fn math_patterns() -> &'static MathPatterns {
    static PATTERNS: OnceLock<MathPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| MathPatterns {
        blank_runs: Regex::new(r"\n{3,}").expect("valid regex"),
        trailing_space: Regex::new(r"(?m)[ \t]+$").expect("valid regex"),
        block: Regex::new(r"(?s)\\\[(.*?)\\\]").expect("valid regex"),
        inline: Regex::new(r"(?s)\\\((.*?)\\\)").expect("valid regex"),
        scripts: Regex::new(r"(\d+|[a-zA-Z])([_^])(\d+)").expect("valid regex"),
        url: Regex::new(r"(?:https?|ftp)://[^\s<>()\[\]]+").expect("valid regex"),
    })
}

fn syntax_set() -> &'static SyntaxSet {
    static SYNTAXES: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAXES.get_or_init(SyntaxSet::load_defaults_newlines)
}

/// Normalise the TeX dialects models emit into `$`/`$$` delimiters.
/// Fenced code, inline code spans and URLs are passed through untouched.
pub fn preprocess_math(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prose = String::new();
    let mut fence: Option<&str> = None;

    for line in text.split_inclusive('\n') {
        let marker = fence_marker(line);
        match fence {
            Some(open) => {
                out.push_str(line);
                if marker == Some(open) {
                    fence = None;
                }
            }
            None if marker.is_some() => {
                out.push_str(&preprocess_prose(&std::mem::take(&mut prose)));
                out.push_str(line);
                fence = marker;
            }
            None => prose.push_str(line),
        }
    }
    out.push_str(&preprocess_prose(&prose));
    out
}

fn fence_marker(line: &str) -> Option<&'static str> {
    let line = line.trim_start();
    ["```", "~~~"].into_iter().find(|marker| line.starts_with(marker))
}

fn preprocess_prose(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let patterns = math_patterns();

    let text = patterns.blank_runs.replace_all(text, "\n\n");
    let text = patterns.trailing_space.replace_all(&text, "");

    let mut out = String::with_capacity(text.len());
    for segment in split_verbatim(&text) {
        match segment {
            Segment::Verbatim(raw) => out.push_str(raw),
            Segment::Prose(raw) => out.push_str(&rewrite_math(raw)),
        }
    }
    out
}

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Prose(&'a str),
    Verbatim(&'a str),
}

/// Split out backtick code spans and bare URLs, which must keep their text
fn split_verbatim(text: &str) -> Vec<Segment<'_>> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut plain_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let run = backtick_run(bytes, i);
        match closing_run(bytes, i + run, run) {
            Some(end) => {
                split_urls(&text[plain_start..i], &mut segments);
                segments.push(Segment::Verbatim(&text[i..end]));
                plain_start = end;
                i = end;
            }
            // An unmatched run is literal text
            None => i += run,
        }
    }
    split_urls(&text[plain_start..], &mut segments);
    segments
}

fn backtick_run(bytes: &[u8], from: usize) -> usize {
    bytes[from..].iter().take_while(|&&b| b == b'`').count()
}

/// End of the next backtick run of exactly `len` after `from`
fn closing_run(bytes: &[u8], from: usize, len: usize) -> Option<usize> {
    let mut j = from;
    while j < bytes.len() {
        if bytes[j] == b'`' {
            let run = backtick_run(bytes, j);
            if run == len {
                return Some(j + run);
            }
            j += run;
        } else {
            j += 1;
        }
    }
    None
}

fn split_urls<'a>(text: &'a str, segments: &mut Vec<Segment<'a>>) {
    let mut last = 0;
    for url in math_patterns().url.find_iter(text) {
        if url.start() > last {
            segments.push(Segment::Prose(&text[last..url.start()]));
        }
        segments.push(Segment::Verbatim(url.as_str()));
        last = url.end();
    }
    if last < text.len() {
        segments.push(Segment::Prose(&text[last..]));
    }
}

fn rewrite_math(text: &str) -> String {
    let patterns = math_patterns();

    let text = patterns.block.replace_all(text, |caps: &Captures| {
        let body = caps[1].trim().lines().map(str::trim_start).collect::<Vec<_>>().join("\n");
        format!("\n$${}$$\n", body)
    });
    let text = patterns
        .inline
        .replace_all(&text, |caps: &Captures| format!("${}$", caps[1].trim()));

    // x_12 -> x_{12}, unless the script is already followed by a brace
    let source: &str = &text;
    let text = patterns.scripts.replace_all(source, |caps: &Captures| {
        let whole = &caps[0];
        let end = caps.get(0).map_or(0, |m| m.end());
        if source[end..].starts_with('}') {
            whole.to_string()
        } else {
            format!("{}{}{{{}}}", &caps[1], &caps[2], &caps[3])
        }
    });

    let mut out = text.into_owned();
    for (symbol, tex) in OPERATOR_TEX {
        if out.contains(symbol) {
            out = out.replace(symbol, tex);
        }
    }
    out.replace('≈', "\\approx ")
}

/// Render an answer (possibly still streaming) to HTML
pub fn render_markdown(text: &str) -> String {
    let source = preprocess_math(text);

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_MATH);

    let parser = Parser::new_ext(&source, options);

    let mut code: Option<(String, String)> = None;
    let events = parser.filter_map(|event| match event {
        Event::Start(Tag::CodeBlock(kind)) => {
            let lang = match kind {
                CodeBlockKind::Fenced(info) => info.split_whitespace().next().unwrap_or("").to_string(),
                CodeBlockKind::Indented => String::new(),
            };
            code = Some((lang, String::new()));
            None
        }
        Event::Text(text) if code.is_some() => {
            if let Some((_, body)) = code.as_mut() {
                body.push_str(&text);
            }
            None
        }
        Event::End(TagEnd::CodeBlock) => code
            .take()
            .map(|(lang, body)| Event::Html(CowStr::from(code_block_html(&lang, &body)))),
        Event::InlineMath(tex) => Some(Event::InlineHtml(CowStr::from(format!(
            "<span class=\"math-inline\">\\({}\\)</span>",
            escape_html(&tex)
        )))),
        Event::DisplayMath(tex) => Some(Event::Html(CowStr::from(format!(
            "<div class=\"math-block\">\\[{}\\]</div>",
            escape_html(&tex)
        )))),
        // Model output is untrusted; show markup instead of injecting it
        Event::Html(raw) | Event::InlineHtml(raw) => Some(Event::Text(raw)),
        other => Some(other),
    });

    let mut output = String::with_capacity(source.len() * 2);
    html::push_html(&mut output, events);
    output
}

fn code_block_html(lang: &str, code: &str) -> String {
    let trimmed = code.trim();
    let class = if lang.is_empty() {
        String::new()
    } else {
        format!(" class=\"language-{}\"", escape_html(lang))
    };

    format!(
        "<div class=\"code-block-wrapper\"><pre class=\"code-wrap\"><code{}>{}</code></pre>\
         <button class=\"copy-button\" data-code=\"{}\" title=\"Copy\">Copy</button></div>",
        class,
        highlight(lang, code),
        escape_html(trimmed)
    )
}

/// Class-based highlighting; unknown languages fall back to escaped text
pub fn highlight(lang: &str, code: &str) -> String {
    let syntaxes = syntax_set();
    let Some(syntax) = (!lang.is_empty())
        .then(|| syntaxes.find_syntax_by_token(lang))
        .flatten()
    else {
        return escape_html(code);
    };

    let mut generator = ClassedHTMLGenerator::new_with_class_style(
        syntax,
        syntaxes,
        ClassStyle::SpacedPrefixed {
            prefix: HIGHLIGHT_PREFIX,
        },
    );
    for line in LinesWithEndings::from(code) {
        if generator.parse_html_for_line_which_includes_newline(line).is_err() {
            return escape_html(code);
        }
    }
    generator.finalize()
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a String cannot fail
    let _ = pulldown_cmark_escape::escape_html(&mut out, text);
    out
}
