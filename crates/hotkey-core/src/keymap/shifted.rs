//! Shift-layer character folding.
//!
//! Sources that report characters instead of key codes see `'!'` when the
//! user presses Shift+1. To keep chords layout-stable the character is folded
//! back to the unshifted legend of the same physical key.
//!
//! The table covers the German QWERTZ layout's Shift and AltGr layers, which
//! is the layout the stock bindings were authored against. Characters that
//! are not in the table pass through unchanged.

/// Returns the unshifted base character for `c`, or `None` if `c` is not a
/// shifted character.
pub fn unshift(c: char) -> Option<char> {
    let base = match c {
        '°' => '^',
        '!' => '1',
        '"' | '²' => '2',
        '§' | '³' => '3',
        '$' => '4',
        '%' => '5',
        '&' => '6',
        '/' | '{' => '7',
        '(' | '[' => '8',
        ')' | ']' => '9',
        '=' | '}' => '0',
        '?' | '\\' => 'ß',
        '`' => '´',
        '@' => 'q',
        '€' => 'e',
        '*' | '~' => '+',
        '\'' => '#',
        '>' | '|' => '<',
        ';' => ',',
        ':' => '.',
        '_' => '-',
        _ => return None,
    };
    Some(base)
}
