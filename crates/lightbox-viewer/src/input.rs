//! Framework-neutral translation of user input into navigation commands.
//!
//! The embedding UI converts its own key and pointer events into [`Key`]
//! and swipe deltas; everything gesture-specific (distance threshold, axis
//! dominance) lives here so every frontend navigates the same way.

/// Keyboard input relevant to the viewer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    Escape,
    /// Anything else; ignored.
    Other,
}

/// What the viewer should do in response to an input event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavCommand {
    Next,
    Previous,
    Close,
    JumpTo(usize),
}

/// Map a key press to a navigation command.
pub fn map_key(key: Key) -> Option<NavCommand> {
    match key {
        Key::Left => Some(NavCommand::Previous),
        Key::Right => Some(NavCommand::Next),
        Key::Escape => Some(NavCommand::Close),
        Key::Other => None,
    }
}

/// Map a completed swipe gesture to a navigation command.
///
/// `dx`/`dy` are the total pointer displacement in display units, positive
/// right and down. The dominant axis wins; displacement at or below
/// `threshold` on both axes is ignored. A rightward swipe drags the
/// previous item into view, so it navigates backwards.
pub fn map_swipe(dx: f32, dy: f32, threshold: f32) -> Option<NavCommand> {
    let horizontal = dx.abs();
    let vertical = dy.abs();

    if horizontal >= vertical {
        if horizontal <= threshold {
            return None;
        }
        Some(if dx > 0.0 {
            NavCommand::Previous
        } else {
            NavCommand::Next
        })
    } else {
        if vertical <= threshold {
            return None;
        }
        Some(NavCommand::Close)
    }
}
