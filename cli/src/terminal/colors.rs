use colored::Color;

pub const PRIMARY: Color = Color::BrightGreen;
pub const ACCENT: Color = Color::BrightYellow;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;

pub const OPEN: Color = Color::BrightGreen;
pub const CLOSED: Color = Color::Red;
pub const FILTERED: Color = Color::Yellow;
pub const AMBIGUOUS: Color = Color::Cyan;
pub const ERROR: Color = Color::BrightRed;
