use rescue_core::ItemKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MoveDirection {
    Forward,
    Left,
    Back,
    Right,
}

impl MoveDirection {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Left => "left",
            Self::Back => "back",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tool {
    Flashlight,
    NightVision,
}

impl Tool {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Flashlight => "flashlight",
            Self::NightVision => "night_vision",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OperatorCommand {
    Move(MoveDirection),
    Drop(ItemKind),
    Toggle(Tool),
    AcknowledgeError,
    Status,
    Quit,
}

pub(crate) const OPERATOR_USAGE: &str = concat!(
    "commands: W/A/S/D move, 1 drop water, 2 drop food, ",
    "F flashlight, N night vision, ACK clear alert, STATUS, Q quit"
);

/// Maps one input line to a command; `None` for blank or unknown input.
pub(crate) fn parse_operator_command(line: &str) -> Option<OperatorCommand> {
    let command = match line.trim().to_ascii_lowercase().as_str() {
        "w" => OperatorCommand::Move(MoveDirection::Forward),
        "a" => OperatorCommand::Move(MoveDirection::Left),
        "s" => OperatorCommand::Move(MoveDirection::Back),
        "d" => OperatorCommand::Move(MoveDirection::Right),
        "1" => OperatorCommand::Drop(ItemKind::Water),
        "2" => OperatorCommand::Drop(ItemKind::Food),
        "f" => OperatorCommand::Toggle(Tool::Flashlight),
        "n" => OperatorCommand::Toggle(Tool::NightVision),
        "ack" => OperatorCommand::AcknowledgeError,
        "status" => OperatorCommand::Status,
        "q" | "quit" => OperatorCommand::Quit,
        _ => return None,
    };
    Some(command)
}
