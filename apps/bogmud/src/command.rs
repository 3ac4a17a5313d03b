//! The command interpreter: one already-stripped input line in, one
//! `Command` out. Stateless; matching is case-sensitive and nothing is
//! normalized beyond the line framing the gateway already did.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    East,
    West,
    North,
    South,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::East,
        Direction::West,
        Direction::North,
        Direction::South,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::East => "east",
            Direction::West => "west",
            Direction::North => "north",
            Direction::South => "south",
        }
    }

    /// Index into a room's exit table.
    pub fn idx(self) -> usize {
        match self {
            Direction::East => 0,
            Direction::West => 1,
            Direction::North => 2,
            Direction::South => 3,
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "east" | "e" => Some(Direction::East),
            "west" | "w" => Some(Direction::West),
            "north" | "n" => Some(Direction::North),
            "south" | "s" => Some(Direction::South),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Say(String),
    Kill(String),
    Move(Direction),
    Look,
    Inventory,
    Wear(String),
    /// Anything unrecognized; carries the original line so it can be echoed
    /// back to the issuer verbatim.
    Unknown(String),
}

/// Map one input line to a command. First match wins.
pub fn parse(line: &str) -> Command {
    if let Some(rest) = line.strip_prefix("say ") {
        return Command::Say(rest.to_string());
    }
    if let Some(rest) = line.strip_prefix('"') {
        return Command::Say(rest.to_string());
    }
    if let Some(rest) = line.strip_prefix('\'') {
        return Command::Say(rest.to_string());
    }
    if let Some(rest) = line.strip_prefix("kill ") {
        return Command::Kill(rest.to_string());
    }
    if let Some(rest) = line.strip_prefix("k ") {
        return Command::Kill(rest.to_string());
    }
    if let Some(dir) = Direction::parse(line) {
        return Command::Move(dir);
    }
    match line {
        "look" | "l" => return Command::Look,
        "inventory" | "inv" | "i" => return Command::Inventory,
        _ => {}
    }
    if let Some(rest) = line.strip_prefix("wear ") {
        return Command::Wear(rest.to_string());
    }
    if let Some(rest) = line.strip_prefix("equip ") {
        return Command::Wear(rest.to_string());
    }
    if let Some(rest) = line.strip_prefix("eq ") {
        return Command::Wear(rest.to_string());
    }
    Command::Unknown(line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn say_forms() {
        assert_eq!(parse("say hello there"), Command::Say("hello there".into()));
        assert_eq!(parse("\"hi"), Command::Say("hi".into()));
        assert_eq!(parse("'hi"), Command::Say("hi".into()));
    }

    #[test]
    fn kill_forms() {
        assert_eq!(parse("kill slime"), Command::Kill("slime".into()));
        assert_eq!(parse("k slime"), Command::Kill("slime".into()));
        // Bare "kill" has no target and is not a kill command.
        assert_eq!(parse("kill"), Command::Unknown("kill".into()));
    }

    #[test]
    fn movement_tokens() {
        assert_eq!(parse("east"), Command::Move(Direction::East));
        assert_eq!(parse("e"), Command::Move(Direction::East));
        assert_eq!(parse("west"), Command::Move(Direction::West));
        assert_eq!(parse("w"), Command::Move(Direction::West));
        assert_eq!(parse("north"), Command::Move(Direction::North));
        assert_eq!(parse("n"), Command::Move(Direction::North));
        assert_eq!(parse("south"), Command::Move(Direction::South));
        assert_eq!(parse("s"), Command::Move(Direction::South));
    }

    #[test]
    fn look_inventory_wear() {
        assert_eq!(parse("look"), Command::Look);
        assert_eq!(parse("l"), Command::Look);
        assert_eq!(parse("inventory"), Command::Inventory);
        assert_eq!(parse("inv"), Command::Inventory);
        assert_eq!(parse("i"), Command::Inventory);
        assert_eq!(parse("wear tunic"), Command::Wear("tunic".into()));
        assert_eq!(parse("equip tunic"), Command::Wear("tunic".into()));
        assert_eq!(parse("eq tunic"), Command::Wear("tunic".into()));
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(parse("EAST"), Command::Unknown("EAST".into()));
        assert_eq!(parse("Say hi"), Command::Unknown("Say hi".into()));
        assert_eq!(parse("Kill slime"), Command::Unknown("Kill slime".into()));
    }

    #[test]
    fn unknown_keeps_original_line() {
        assert_eq!(parse("xyzzy"), Command::Unknown("xyzzy".into()));
        assert_eq!(parse(""), Command::Unknown("".into()));
        assert_eq!(parse("east west"), Command::Unknown("east west".into()));
    }

    #[test]
    fn say_precedes_everything() {
        // A quoted line that happens to start with a direction is still chat.
        assert_eq!(parse("\"east"), Command::Say("east".into()));
        assert_eq!(parse("say kill slime"), Command::Say("kill slime".into()));
    }
}
