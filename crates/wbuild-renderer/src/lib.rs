use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use once_cell::sync::Lazy;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme as SyntectTheme, ThemeSet};
use syntect::html::{IncludeBackground, styled_line_to_highlighted_html};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use wbuild_core::ThemeMode;

const BASE_CSS: &str = include_str!("../assets/wbuild.css");
const BASE_JS: &str = include_str!("../assets/wbuild.js");

pub const CSS_FILE: &str = "wbuild.css";
pub const JS_FILE: &str = "wbuild.js";

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

/// How the page pulls in its stylesheet and toggle script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Assets {
    #[default]
    Inline,
    /// `<link>`/`<script src>` to the files written by
    /// [`Renderer::generate_files`], relative to the page.
    Linked,
}

/// Wraps emitted document HTML into a standalone page.
#[derive(Debug, Clone)]
pub struct Renderer {
    theme: ThemeMode,
    assets: Assets,
    custom_vars: BTreeMap<String, String>,
}

impl Renderer {
    pub fn new(theme: ThemeMode) -> Self {
        Self {
            theme,
            assets: Assets::Inline,
            custom_vars: BTreeMap::new(),
        }
    }

    pub fn theme(&self) -> ThemeMode {
        self.theme
    }

    pub fn with_assets(mut self, assets: Assets) -> Self {
        self.assets = assets;
        self
    }

    /// Overrides a theme variable in both modes, e.g. `--wb-accent`.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_vars.insert(key.into(), value.into());
        self
    }

    /// Theme variables for each `data-theme` value, followed by the base rules.
    pub fn stylesheet(&self) -> String {
        let (light, dark) = default_theme_vars();
        let mut out = String::new();
        out.push_str(&theme_block("[data-theme=\"light\"]", "light", &light));
        out.push_str(&theme_block("[data-theme=\"dark\"]", "dark", &dark));
        if !self.custom_vars.is_empty() {
            out.push_str(&vars_block(
                "[data-theme=\"light\"],\n[data-theme=\"dark\"]",
                &self.custom_vars,
            ));
        }
        out.push_str(BASE_CSS);
        out
    }

    /// Builds the full page: `body` first, then `footer` when given, then
    /// the theme button and its script. Both fragments are expected to be
    /// emitted by the core and are inserted unchanged.
    pub fn embed_html(&self, body: &str, footer: Option<&str>) -> String {
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n");
        out.push_str("<html lang=\"en\">\n");
        out.push_str("<head>\n");
        out.push_str("  <meta charset=\"utf-8\" />\n");
        out.push_str(
            "  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n",
        );
        match self.assets {
            Assets::Inline => {
                out.push_str("  <style>\n");
                out.push_str(&self.stylesheet());
                out.push_str("  </style>\n");
            }
            Assets::Linked => {
                out.push_str(&format!(
                    "  <link rel=\"stylesheet\" href=\"{}\" />\n",
                    CSS_FILE
                ));
            }
        }
        out.push_str("</head>\n");
        out.push_str(&format!(
            "<body class=\"bg1\" data-theme=\"{}\">\n",
            self.theme
        ));
        push_block(&mut out, body);
        if let Some(footer) = footer {
            out.push_str(&format!("<footer data-theme=\"{}\">\n", self.theme));
            push_block(&mut out, footer);
            out.push_str("</footer>\n");
        }
        out.push_str(&theme_button(self.theme));
        match self.assets {
            Assets::Inline => {
                out.push_str("<script>\n");
                out.push_str(BASE_JS);
                out.push_str("</script>\n");
            }
            Assets::Linked => {
                out.push_str(&format!("<script src=\"{}\"></script>\n", JS_FILE));
            }
        }
        out.push_str("</body>\n");
        out.push_str("</html>\n");
        out
    }

    /// Writes the stylesheet and toggle script into `out_dir`.
    pub fn generate_files(&self, out_dir: &Path) -> io::Result<()> {
        fs::create_dir_all(out_dir)?;
        fs::write(out_dir.join(CSS_FILE), self.stylesheet())?;
        fs::write(out_dir.join(JS_FILE), BASE_JS)?;
        tracing::debug!(dir = %out_dir.display(), "wrote page assets");
        Ok(())
    }

    /// Colors every `<code class="language-X">` block whose language syntect
    /// knows. Other blocks are left as they are.
    pub fn highlight_html(&self, html: &str) -> String {
        match pick_theme(self.theme, &THEME_SET) {
            Some(theme) => highlight_blocks(html, &SYNTAX_SET, theme),
            None => html.to_string(),
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(ThemeMode::default())
    }
}

fn default_theme_vars() -> (BTreeMap<&'static str, &'static str>, BTreeMap<&'static str, &'static str>) {
    let light = BTreeMap::from([
        ("--wb-bg1", "#fbfbf8"),
        ("--wb-bg2", "#f1efe9"),
        ("--wb-bg3", "#e6e2d8"),
        ("--wb-fg", "#1f2328"),
        ("--wb-muted", "#5f6b76"),
        ("--wb-border", "#d8dee4"),
        ("--wb-accent", "#2b6cb0"),
        ("--wb-code-bg", "#f4f6f8"),
        ("--wb-code-fg", "#1f2328"),
    ]);

    let dark = BTreeMap::from([
        ("--wb-bg1", "#0e1116"),
        ("--wb-bg2", "#171c24"),
        ("--wb-bg3", "#202634"),
        ("--wb-fg", "#e6edf3"),
        ("--wb-muted", "#9aa4af"),
        ("--wb-border", "#2a313b"),
        ("--wb-accent", "#63b3ed"),
        ("--wb-code-bg", "#202634"),
        ("--wb-code-fg", "#f0f6fc"),
    ]);

    (light, dark)
}

fn theme_block<K, V>(selector: &str, scheme: &str, vars: &BTreeMap<K, V>) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut out = String::new();
    out.push_str(selector);
    out.push_str(" {\n");
    out.push_str(&format!("  color-scheme: {};\n", scheme));
    out.push_str(&format_vars(vars));
    out.push_str("}\n");
    out
}

fn vars_block<K, V>(selector: &str, vars: &BTreeMap<K, V>) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    format!("{} {{\n{}}}\n", selector, format_vars(vars))
}

fn format_vars<K, V>(vars: &BTreeMap<K, V>) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut out = String::new();
    for (key, value) in vars {
        out.push_str("  ");
        out.push_str(key.as_ref());
        out.push_str(": ");
        out.push_str(value.as_ref());
        out.push_str(";\n");
    }
    out
}

fn push_block(out: &mut String, html: &str) {
    out.push_str(html);
    if !html.is_empty() && !html.ends_with('\n') {
        out.push('\n');
    }
}

/// The icon shows the mode a click switches to.
fn theme_button(theme: ThemeMode) -> String {
    let icon = match theme {
        ThemeMode::Light => "\u{263e}",
        ThemeMode::Dark => "\u{2600}",
    };
    format!(
        "<button class=\"theme-btn\" onclick=\"switchTheme()\" aria-label=\"Toggle theme\">\
         <span class=\"theme-icon\">{}</span></button>\n",
        icon
    )
}

fn pick_theme(theme: ThemeMode, theme_set: &ThemeSet) -> Option<&SyntectTheme> {
    let candidates = match theme {
        ThemeMode::Dark => ["base16-ocean.dark", "base16-eighties.dark", "base16-mocha.dark"],
        ThemeMode::Light => ["InspiredGitHub", "Solarized (light)", "base16-ocean.light"],
    };
    candidates
        .iter()
        .find_map(|name| theme_set.themes.get(*name))
        .or_else(|| theme_set.themes.values().next())
}

fn highlight_blocks(html: &str, syntax_set: &SyntaxSet, theme: &SyntectTheme) -> String {
    const OPEN: &str = "<code class=\"language-";
    const CLOSE: &str = "</code>";

    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    let mut count = 0usize;

    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start..];
        let Some(tag_end) = after.find('>') else {
            break;
        };
        let Some(close) = after[tag_end + 1..].find(CLOSE) else {
            break;
        };
        let close = tag_end + 1 + close;
        let tag = &after[..=tag_end];
        let inner = &after[tag_end + 1..close];

        out.push_str(&rest[..start]);
        out.push_str(tag);
        match extract_language(tag).and_then(|lang| syntax_set.find_syntax_by_token(lang)) {
            Some(syntax) => {
                out.push_str(&highlight_code(inner, syntax_set, syntax, theme));
                count += 1;
            }
            None => out.push_str(inner),
        }
        out.push_str(CLOSE);
        rest = &after[close + CLOSE.len()..];
    }

    out.push_str(rest);
    tracing::debug!(blocks = count, "highlighted code blocks");
    out
}

fn highlight_code(
    code_html: &str,
    syntax_set: &SyntaxSet,
    syntax: &SyntaxReference,
    theme: &SyntectTheme,
) -> String {
    let code = html_escape::decode_html_entities(code_html);
    let mut highlighter = HighlightLines::new(syntax, theme);
    let mut out = String::with_capacity(code_html.len() * 2);
    for line in LinesWithEndings::from(&*code) {
        let html = highlighter
            .highlight_line(line, syntax_set)
            .ok()
            .and_then(|ranges| styled_line_to_highlighted_html(&ranges, IncludeBackground::No).ok());
        match html {
            Some(html) => out.push_str(&strip_font_weight(&html)),
            None => out.push_str(&html_escape::encode_text(line)),
        }
    }
    out
}

fn extract_language(code_tag: &str) -> Option<&str> {
    let start = code_tag.find("class=\"")? + "class=\"".len();
    let end = code_tag[start..].find('"')?;
    code_tag[start..start + end]
        .split_whitespace()
        .find_map(|class| class.strip_prefix("language-"))
        .filter(|lang| !lang.is_empty())
}

/// Page typography owns the weight; syntect themes sometimes bold keywords.
fn strip_font_weight(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(pos) = rest.find("font-weight:") {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + "font-weight:".len()..];
        match tail.find(';') {
            Some(end) => rest = &tail[end + 1..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}
