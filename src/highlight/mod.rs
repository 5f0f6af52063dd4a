use std::path::Path;

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use syntect::{
    easy::HighlightLines,
    highlighting::{Color as SyntectColor, Theme, ThemeSet},
    parsing::{SyntaxReference, SyntaxSet},
};
use tracing::warn;

/// Lines longer than this are coloured by diff role only.
const MAX_LINE_LENGTH: usize = 10_000;

/// Theme used when the configured one is unknown.
pub const DEFAULT_THEME: &str = "base16-ocean.dark";

/// What a line of unified diff output is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineKind {
    /// `diff --git`, `index`, mode and rename lines.
    FileHeader,
    /// `--- a/...` and `+++ b/...`.
    PathHeader,
    /// `@@ -a,b +c,d @@`.
    HunkHeader,
    Added,
    Removed,
    Context,
    /// Anything else, e.g. `\ No newline at end of file`.
    Other,
}

impl DiffLineKind {
    pub fn classify(line: &str) -> Self {
        if line.starts_with("diff --git ")
            || line.starts_with("index ")
            || line.starts_with("new file mode")
            || line.starts_with("deleted file mode")
            || line.starts_with("old mode")
            || line.starts_with("new mode")
            || line.starts_with("similarity index")
            || line.starts_with("rename ")
            || line.starts_with("Binary files ")
        {
            DiffLineKind::FileHeader
        } else if line.starts_with("+++ ") || line.starts_with("--- ") {
            DiffLineKind::PathHeader
        } else if line.starts_with("@@") {
            DiffLineKind::HunkHeader
        } else if line.starts_with('+') {
            DiffLineKind::Added
        } else if line.starts_with('-') {
            DiffLineKind::Removed
        } else if line.starts_with(' ') || line.is_empty() {
            DiffLineKind::Context
        } else {
            DiffLineKind::Other
        }
    }

    fn style(self) -> Style {
        match self {
            DiffLineKind::FileHeader => Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            DiffLineKind::PathHeader => Style::default().fg(Color::Yellow),
            DiffLineKind::HunkHeader => Style::default().fg(Color::Cyan),
            DiffLineKind::Added => Style::default().fg(Color::Green),
            DiffLineKind::Removed => Style::default().fg(Color::Red),
            DiffLineKind::Context => Style::default().fg(Color::Reset),
            DiffLineKind::Other => Style::default().fg(Color::DarkGray),
        }
    }
}

/// Renders unified diffs as styled terminal lines.
///
/// Loading syntect's bundled syntaxes and themes is slow, so build one and
/// reuse it for every file.
pub struct DiffHighlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
    tab_width: usize,
}

impl DiffHighlighter {
    pub fn new(theme_name: &str, tab_width: usize) -> Self {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let mut theme_set = ThemeSet::load_defaults();

        let theme = match theme_set.themes.remove(theme_name) {
            Some(theme) => theme,
            None => {
                warn!(theme = theme_name, "Unknown theme, using default");
                theme_set
                    .themes
                    .remove(DEFAULT_THEME)
                    .or_else(|| theme_set.themes.into_values().next())
                    .unwrap_or_default()
            }
        };

        Self {
            syntax_set,
            theme,
            tab_width: tab_width.max(1),
        }
    }

    fn syntax_for(&self, path: &str) -> Option<&SyntaxReference> {
        let path = Path::new(path);
        let by_ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.syntax_set.find_syntax_by_extension(ext));
        by_ext.or_else(|| {
            path.file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| self.syntax_set.find_syntax_by_extension(name))
        })
    }

    /// Style every line of a file's diff.
    ///
    /// Code lines keep one highlighting state for the whole file so multi-line
    /// constructs stay coloured across hunks.
    pub fn render(&self, path: &str, diff: &str) -> Vec<Line<'static>> {
        let mut code = self
            .syntax_for(path)
            .map(|syntax| HighlightLines::new(syntax, &self.theme));

        diff.lines()
            .map(|raw| {
                let line = expand_tabs(raw, self.tab_width);
                let kind = DiffLineKind::classify(&line);
                match kind {
                    DiffLineKind::Added | DiffLineKind::Removed | DiffLineKind::Context => {
                        Line::from(self.code_spans(code.as_mut(), kind, &line))
                    }
                    _ => Line::from(Span::styled(line, kind.style())),
                }
            })
            .collect()
    }

    fn code_spans(
        &self,
        highlighter: Option<&mut HighlightLines<'_>>,
        kind: DiffLineKind,
        line: &str,
    ) -> Vec<Span<'static>> {
        let style = kind.style();
        let Some((prefix, content)) = split_prefix(line) else {
            return vec![Span::raw(String::new())];
        };

        let Some(highlighter) = highlighter.filter(|_| line.len() <= MAX_LINE_LENGTH) else {
            return vec![Span::styled(line.to_string(), style)];
        };

        match highlighter.highlight_line(content, &self.syntax_set) {
            Ok(regions) => {
                let mut spans = Vec::with_capacity(regions.len() + 1);
                spans.push(Span::styled(prefix.to_string(), style));
                spans.extend(regions.into_iter().map(|(token, text)| {
                    Span::styled(text.to_string(), Style::default().fg(to_color(token.foreground)))
                }));
                spans
            }
            Err(_) => vec![Span::styled(line.to_string(), style)],
        }
    }
}

fn split_prefix(line: &str) -> Option<(&str, &str)> {
    if line.is_empty() {
        return None;
    }
    Some(line.split_at(1))
}

fn to_color(color: SyntectColor) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

/// Replace tabs with spaces up to the next tab stop.
pub fn expand_tabs(line: &str, tab_width: usize) -> String {
    if !line.contains('\t') {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + tab_width);
    let mut column = 0;
    for ch in line.chars() {
        if ch == '\t' {
            let pad = tab_width - column % tab_width;
            out.extend(std::iter::repeat_n(' ', pad));
            column += pad;
        } else {
            out.push(ch);
            column += 1;
        }
    }
    out
}
