use crate::error::ParseError;
use crate::escape::unescape_braces;
use crate::span::Span;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CommandName {
    Link,
    Bold,
    Italic,
    TextCode,
    ShowArg,
    TableOfContents,
}

impl CommandName {
    pub const ALL: [CommandName; 6] = [
        CommandName::Link,
        CommandName::Bold,
        CommandName::Italic,
        CommandName::TextCode,
        CommandName::ShowArg,
        CommandName::TableOfContents,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        CommandName::ALL.into_iter().find(|command| command.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            CommandName::Link => "link",
            CommandName::Bold => "bold",
            CommandName::Italic => "italic",
            CommandName::TextCode => "textcode",
            CommandName::ShowArg => "showarg",
            CommandName::TableOfContents => "tableofcontents",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandArg {
    /// Group contents as written, escapes included.
    pub raw: String,
    /// Group contents with `\{` and `\}` unescaped.
    pub value: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Command {
    pub name: CommandName,
    pub args: Vec<CommandArg>,
    /// From the backslash through the last captured group.
    pub span: Span,
}

impl Command {
    pub fn arg(&self, index: usize) -> Option<&CommandArg> {
        self.args.get(index)
    }

    pub fn value(&self, index: usize) -> Option<&str> {
        self.arg(index).map(|arg| arg.value.as_str())
    }
}

const MAX_GROUPS: usize = 2;

/// Finds the known inline commands in `text`, left to right.
///
/// A command is `\name` followed by up to two brace groups with nothing in
/// between. Unknown names are skipped along with their groups. A known
/// command whose group never closes is an error.
pub fn extract_commands(text: &str, max_depth: usize) -> Result<Vec<Command>, ParseError> {
    let bytes = text.as_bytes();
    let mut commands = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find('\\') {
        let start = pos + offset;
        let name_start = start + 1;
        let mut name_end = name_start;
        while name_end < bytes.len() && is_word_byte(bytes[name_end]) {
            name_end += 1;
        }
        if name_end == name_start {
            // `\{`, `\}` and stray backslashes.
            pos = name_start + text[name_start..].chars().next().map_or(0, char::len_utf8);
            continue;
        }
        if is_argument_of_enclosing(text, start, name_end) {
            pos = name_end;
            continue;
        }

        let known = CommandName::from_name(&text[name_start..name_end]);
        let mut args = Vec::new();
        let mut end = name_end;
        while args.len() < MAX_GROUPS && bytes.get(end) == Some(&b'{') {
            match capture_group(text, end, max_depth)? {
                Some((raw, after)) => {
                    args.push(CommandArg {
                        raw: raw.to_string(),
                        value: unescape_braces(raw),
                    });
                    end = after;
                }
                None => match known {
                    Some(name) => {
                        return Err(ParseError::malformed(name.name(), "unbalanced braces"));
                    }
                    None => break,
                },
            }
        }

        if let Some(name) = known {
            commands.push(Command {
                name,
                args,
                span: Span { start, end },
            });
        }
        pos = end;
    }
    Ok(commands)
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Contents of the brace group opening at `open` and the offset just past
/// its closing brace, or `None` when it never closes. Escaped braces do not
/// count toward the depth.
fn capture_group(
    text: &str,
    open: usize,
    max_depth: usize,
) -> Result<Option<(&str, usize)>, ParseError> {
    let bytes = text.as_bytes();
    let mut depth = 1usize;
    let mut pos = open + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' if matches!(bytes.get(pos + 1), Some(b'{' | b'}')) => {
                pos += 2;
                continue;
            }
            b'{' => {
                depth += 1;
                if depth > max_depth {
                    return Err(ParseError::NestingTooDeep {
                        limit: max_depth,
                        span: None,
                    });
                }
            }
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(Some((&text[open + 1..pos], pos + 1)));
                }
            }
            _ => {}
        }
        pos += 1;
    }
    Ok(None)
}

/// True when the command at `start..name_end` is itself the sole content of
/// another command's brace group, as in `\outer{\inner}` or
/// `\outer{...}{\inner}`.
fn is_argument_of_enclosing(text: &str, start: usize, name_end: usize) -> bool {
    if !text[name_end..].trim_start().starts_with('}') {
        return false;
    }
    let Some(before) = text[..start].trim_end().strip_suffix('{') else {
        return false;
    };
    if ends_with_command_name(before) {
        return true;
    }
    let Some(group) = before.strip_suffix('}') else {
        return false;
    };
    match group.rfind(['{', '}']) {
        Some(open) if group.as_bytes()[open] == b'{' => ends_with_command_name(&group[..open]),
        _ => false,
    }
}

fn ends_with_command_name(text: &str) -> bool {
    let name = text.trim_end_matches(|c: char| c.is_ascii_alphanumeric() || c == '_');
    name.len() < text.len() && name.ends_with('\\')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(text: &str) -> Vec<CommandName> {
        extract_commands(text, 64)
            .unwrap()
            .into_iter()
            .map(|command| command.name)
            .collect()
    }

    #[test]
    fn captures_up_to_two_groups() {
        let text = "see \\link{#intro}{the intro}{extra} now";
        let commands = extract_commands(text, 64).unwrap();
        assert_eq!(commands.len(), 1);
        let link = &commands[0];
        assert_eq!(link.name, CommandName::Link);
        assert_eq!(link.value(0), Some("#intro"));
        assert_eq!(link.value(1), Some("the intro"));
        assert_eq!(link.span.slice(text), "\\link{#intro}{the intro}");
    }

    #[test]
    fn groups_must_follow_immediately() {
        let commands = extract_commands("\\bold {x}", 64).unwrap();
        assert_eq!(commands[0].args.len(), 0);
        assert_eq!(commands[0].span.end, 5);
    }

    #[test]
    fn nested_groups_are_kept_whole() {
        let commands = extract_commands("\\bold{a \\italic{b} c} d", 64).unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].value(0), Some("a \\italic{b} c"));
    }

    #[test]
    fn escaped_braces_inside_groups() {
        let commands = extract_commands("\\textcode{fn f() \\{ \\}}", 64).unwrap();
        let arg = commands[0].arg(0).unwrap();
        assert_eq!(arg.raw, "fn f() \\{ \\}");
        assert_eq!(arg.value, "fn f() { }");
    }

    #[test]
    fn unknown_commands_are_skipped_with_their_groups() {
        assert_eq!(names("\\emph{\\bold{x}} \\italic{y}"), vec![CommandName::Italic]);
        assert_eq!(names("\\{ not a command \\}"), Vec::<CommandName>::new());
        assert_eq!(names("C:\\path\\to"), Vec::<CommandName>::new());
    }

    #[test]
    fn backslash_before_multibyte_characters_is_literal() {
        assert_eq!(names("C:\\Übersicht \\bold{ok}"), vec![CommandName::Bold]);
        assert_eq!(names("a \\\u{2014} b \\é"), Vec::<CommandName>::new());
        assert_eq!(names("trailing \\"), Vec::<CommandName>::new());
    }

    #[test]
    fn unbalanced_known_command_fails() {
        let err = extract_commands("\\bold{never closed", 64).unwrap_err();
        assert_eq!(err, ParseError::malformed("bold", "unbalanced braces"));
        assert!(extract_commands("\\emph{never closed", 64).is_ok());
    }

    #[test]
    fn deep_groups_hit_the_limit() {
        let err = extract_commands("\\bold{{{x}}}", 2).unwrap_err();
        assert_eq!(
            err,
            ParseError::NestingTooDeep {
                limit: 2,
                span: None
            }
        );
    }

    #[test]
    fn enclosing_argument_detection() {
        let text = "\\outer{ \\inner }";
        assert!(is_argument_of_enclosing(text, 8, 14));
        let text = "\\outer{a}{ \\inner}";
        assert!(is_argument_of_enclosing(text, 11, 17));
        let text = "x{ \\inner }";
        assert!(!is_argument_of_enclosing(text, 3, 9));
        let text = "\\outer{ \\inner more }";
        assert!(!is_argument_of_enclosing(text, 8, 14));
    }

    #[test]
    fn every_name_round_trips() {
        for command in CommandName::ALL {
            assert_eq!(CommandName::from_name(command.name()), Some(command));
        }
    }
}
