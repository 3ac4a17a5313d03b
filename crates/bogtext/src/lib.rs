//! `bogtext`: the render boundary.
//!
//! Game code emits plain text carrying `@x@` color tokens (each wrapping a
//! single letter code). This crate expands those tokens to ANSI escapes and
//! composes the status prompt appended after every delivered message.

pub const NORMAL: &str = "\x1b[0m";
pub const BLACK: &str = "\x1b[30m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const BLUE: &str = "\x1b[34m";
pub const MAGENTA: &str = "\x1b[35m";
pub const CYAN: &str = "\x1b[36m";
pub const WHITE: &str = "\x1b[37m";
pub const B_BLACK: &str = "\x1b[30;1m";
pub const B_RED: &str = "\x1b[31;1m";
pub const B_GREEN: &str = "\x1b[32;1m";
pub const B_YELLOW: &str = "\x1b[33;1m";
pub const B_BLUE: &str = "\x1b[34;1m";
pub const B_MAGENTA: &str = "\x1b[35;1m";
pub const B_CYAN: &str = "\x1b[36;1m";
pub const B_WHITE: &str = "\x1b[37;1m";

const TOKENS: [(&str, &str); 17] = [
    ("@n@", NORMAL),
    ("@b@", BLACK),
    ("@r@", RED),
    ("@g@", GREEN),
    ("@y@", YELLOW),
    ("@l@", BLUE),
    ("@m@", MAGENTA),
    ("@c@", CYAN),
    ("@w@", WHITE),
    ("@B@", B_BLACK),
    ("@R@", B_RED),
    ("@G@", B_GREEN),
    ("@Y@", B_YELLOW),
    ("@L@", B_BLUE),
    ("@M@", B_MAGENTA),
    ("@C@", B_CYAN),
    ("@W@", B_WHITE),
];

/// Expand every `@x@` token in `text` to its escape sequence.
///
/// Unknown tokens pass through untouched.
pub fn colorize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(i) = rest.find('@') {
        out.push_str(&rest[..i]);
        let tail = &rest[i..];
        match TOKENS.iter().find(|(tok, _)| tail.starts_with(tok)) {
            Some((tok, esc)) => {
                out.push_str(esc);
                rest = &tail[tok.len()..];
            }
            None => {
                out.push('@');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// A snapshot of the stats shown in the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptStats {
    pub health: i32,
    pub max_health: i32,
    pub mana: i32,
    pub max_mana: i32,
    /// Engaged opponent's remaining health percentage, if fighting.
    pub enemy_pct: Option<u32>,
}

/// Compose the status prompt written after every message.
pub fn prompt(stats: PromptStats) -> String {
    let fighting = match stats.enemy_pct {
        Some(pct) => format!(" Enemy {pct:2}%"),
        None => String::new(),
    };
    format!(
        "{NORMAL}Health: {B_GREEN}{}/{} {NORMAL}Mana: {B_BLUE}{}/{}{NORMAL}{fighting}> ",
        stats.health, stats.max_health, stats.mana, stats.max_mana,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colorize_expands_tokens() {
        assert_eq!(
            colorize("@r@Hello @g@There@n@"),
            "\x1b[31mHello \x1b[32mThere\x1b[0m"
        );
    }

    #[test]
    fn colorize_leaves_stray_ats_alone() {
        assert_eq!(colorize("a@b.c @z@ @"), "a@b.c @z@ @");
        assert_eq!(colorize("no tokens"), "no tokens");
    }

    #[test]
    fn prompt_without_engagement() {
        let s = prompt(PromptStats {
            health: 100,
            max_health: 100,
            mana: 30,
            max_mana: 30,
            enemy_pct: None,
        });
        assert!(s.contains("Health: \x1b[32;1m100/100"));
        assert!(s.contains("Mana: \x1b[34;1m30/30"));
        assert!(!s.contains("Enemy"));
        assert!(s.ends_with("> "));
    }

    #[test]
    fn prompt_shows_enemy_percentage() {
        let s = prompt(PromptStats {
            health: 95,
            max_health: 100,
            mana: 30,
            max_mana: 30,
            enemy_pct: Some(80),
        });
        assert!(s.contains("Enemy 80%"));
    }
}
