//! The board's display and buttons as seen by the station

/// Line-oriented text display
pub trait Screen {
    /// Blanks the display and moves the cursor home
    fn clear(&mut self);

    fn print_line(&mut self, line: &str);
}

#[derive(Copy, Clone, Debug, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub enum Button {
    /// Opens the latest data view
    A,
    /// Returns to the main view
    B,
}

pub trait Buttons {
    /// Samples the button state, call once per loop iteration
    fn update(&mut self);

    /// True if `button` went down since the previous `update`
    fn was_pressed(&self, button: Button) -> bool;
}

pub const TITLE: &str = "M5Core2 Sensor Uploader";
pub const LATEST_PROMPT: &str = "Press A for Latest Data";
pub const RETURN_PROMPT: &str = "Press B to return";

pub fn show_home<S: Screen + ?Sized>(screen: &mut S) {
    screen.clear();
    screen.print_line(TITLE);
    screen.print_line(LATEST_PROMPT);
}
