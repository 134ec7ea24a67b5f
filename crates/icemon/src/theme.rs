use icemon_core::ColorId;
use ratatui::style::{Color, Modifier, Style};

pub const LABEL_STYLE: Style = Style::new().add_modifier(Modifier::BOLD);
pub const HEADER_STYLE: Style = Style::new().fg(Color::Black).bg(Color::Green);
pub const SELECTED_STYLE: Style = Style::new().fg(Color::Black).bg(Color::Cyan);
pub const EXPAND_STYLE: Style = Style::new().fg(Color::Green);

const HOST_PALETTE: [Color; icemon_core::color::HOST_PALETTE_LEN] = [
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
    Color::White,
];

pub fn host_style(color: ColorId) -> Style {
    match color.0.checked_sub(1).and_then(|index| HOST_PALETTE.get(index)) {
        Some(fg) => Style::new().fg(*fg),
        None => Style::new(),
    }
}

pub fn expand_marker_style(highlighted: bool) -> Style {
    if highlighted {
        SELECTED_STYLE
    } else {
        EXPAND_STYLE
    }
}
