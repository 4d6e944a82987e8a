//! Windows Virtual Key (VK) code to token translation table.
//!
//! Reference: Windows Virtual-Key Codes (winuser.h).
//!
//! VK codes are logical rather than physical: `VK_A = 0x41` on every layout,
//! and the digit row reports `VK_1 = 0x31` whether or not Shift is held. That
//! makes the VK path layout-stable without any extra work; the character path
//! in [`super::shifted`] exists for sources that only report characters.
//!
//! `VK_TO_TOKEN_TABLE` is a compile-time array of 256 entries indexed by VK
//! code. Side-specific modifier VKs share the generic token, so `VK_LCONTROL`,
//! `VK_RCONTROL` and `VK_CONTROL` all read `"ctrl"`. Mouse-button VKs
//! (0x01–0x06) are deliberately absent: buttons arrive through the mouse hook.

/// Translates a Windows Virtual Key code to a canonical token name.
///
/// Returns `None` for VK codes with no token (mouse VKs, reserved codes,
/// vendor-specific keys).
pub fn vk_to_name(vk: u8) -> Option<&'static str> {
    VK_TO_TOKEN_TABLE[vk as usize]
}

/// Translates a canonical token name back to a Windows VK code.
///
/// The generic VK wins over the sided ones (`"ctrl"` → `VK_CONTROL`), which is
/// what `SendInput` wants when releasing a modifier regardless of side.
pub fn name_to_vk(name: &str) -> Option<u8> {
    // Linear scan is fine for the infrequent token → VK direction.
    VK_TO_TOKEN_TABLE
        .iter()
        .position(|entry| *entry == Some(name))
        .map(|vk| vk as u8)
}

/// Returns `true` if `name` appears anywhere in the table.
pub(crate) fn is_known_name(name: &str) -> bool {
    VK_TO_TOKEN_TABLE.iter().any(|entry| *entry == Some(name))
}

/// Complete VK → token mapping table indexed by VK code (0x00–0xFF).
const VK_TO_TOKEN_TABLE: [Option<&str>; 256] = {
    let mut t: [Option<&str>; 256] = [None; 256];

    // ── Control keys ─────────────────────────────────────────────────────────
    t[0x08] = Some("backspace"); // VK_BACK
    t[0x09] = Some("tab"); // VK_TAB
    t[0x0C] = Some("clear"); // VK_CLEAR
    t[0x0D] = Some("enter"); // VK_RETURN
    t[0x13] = Some("pause"); // VK_PAUSE
    t[0x14] = Some("caps_lock"); // VK_CAPITAL
    t[0x1B] = Some("esc"); // VK_ESCAPE
    t[0x20] = Some("space"); // VK_SPACE
    t[0x2C] = Some("print_screen"); // VK_SNAPSHOT
    t[0x2D] = Some("insert"); // VK_INSERT
    t[0x2E] = Some("delete"); // VK_DELETE
    t[0x5D] = Some("menu"); // VK_APPS
    t[0x90] = Some("num_lock"); // VK_NUMLOCK
    t[0x91] = Some("scroll_lock"); // VK_SCROLL

    // ── Modifiers: generic first so reverse lookup prefers them ──────────────
    t[0x10] = Some("shift"); // VK_SHIFT
    t[0x11] = Some("ctrl"); // VK_CONTROL
    t[0x12] = Some("alt"); // VK_MENU
    t[0x5B] = Some("cmd"); // VK_LWIN
    t[0x5C] = Some("cmd"); // VK_RWIN
    t[0xA0] = Some("shift"); // VK_LSHIFT
    t[0xA1] = Some("shift"); // VK_RSHIFT
    t[0xA2] = Some("ctrl"); // VK_LCONTROL
    t[0xA3] = Some("ctrl"); // VK_RCONTROL
    t[0xA4] = Some("alt"); // VK_LMENU
    t[0xA5] = Some("alt"); // VK_RMENU

    // ── Navigation ────────────────────────────────────────────────────────────
    t[0x21] = Some("page_up"); // VK_PRIOR
    t[0x22] = Some("page_down"); // VK_NEXT
    t[0x23] = Some("end");
    t[0x24] = Some("home");
    t[0x25] = Some("left");
    t[0x26] = Some("up");
    t[0x27] = Some("right");
    t[0x28] = Some("down");

    // ── Digit row (VK_0=0x30 … VK_9=0x39) ───────────────────────────────────
    t[0x30] = Some("0");
    t[0x31] = Some("1");
    t[0x32] = Some("2");
    t[0x33] = Some("3");
    t[0x34] = Some("4");
    t[0x35] = Some("5");
    t[0x36] = Some("6");
    t[0x37] = Some("7");
    t[0x38] = Some("8");
    t[0x39] = Some("9");

    // ── Alphabet keys (VK_A=0x41 … VK_Z=0x5A) ────────────────────────────────
    t[0x41] = Some("a");
    t[0x42] = Some("b");
    t[0x43] = Some("c");
    t[0x44] = Some("d");
    t[0x45] = Some("e");
    t[0x46] = Some("f");
    t[0x47] = Some("g");
    t[0x48] = Some("h");
    t[0x49] = Some("i");
    t[0x4A] = Some("j");
    t[0x4B] = Some("k");
    t[0x4C] = Some("l");
    t[0x4D] = Some("m");
    t[0x4E] = Some("n");
    t[0x4F] = Some("o");
    t[0x50] = Some("p");
    t[0x51] = Some("q");
    t[0x52] = Some("r");
    t[0x53] = Some("s");
    t[0x54] = Some("t");
    t[0x55] = Some("u");
    t[0x56] = Some("v");
    t[0x57] = Some("w");
    t[0x58] = Some("x");
    t[0x59] = Some("y");
    t[0x5A] = Some("z");

    // ── Numpad (VK_NUMPAD0=0x60 … VK_NUMPAD9=0x69) ───────────────────────────
    t[0x60] = Some("num_0");
    t[0x61] = Some("num_1");
    t[0x62] = Some("num_2");
    t[0x63] = Some("num_3");
    t[0x64] = Some("num_4");
    t[0x65] = Some("num_5");
    t[0x66] = Some("num_6");
    t[0x67] = Some("num_7");
    t[0x68] = Some("num_8");
    t[0x69] = Some("num_9");
    t[0x6A] = Some("num_multiply"); // VK_MULTIPLY
    t[0x6B] = Some("num_add"); // VK_ADD
    t[0x6C] = Some("num_separator"); // VK_SEPARATOR
    t[0x6D] = Some("num_subtract"); // VK_SUBTRACT
    t[0x6E] = Some("num_decimal"); // VK_DECIMAL
    t[0x6F] = Some("num_divide"); // VK_DIVIDE

    // ── Function keys (VK_F1=0x70 … VK_F24=0x87) ─────────────────────────────
    t[0x70] = Some("f1");
    t[0x71] = Some("f2");
    t[0x72] = Some("f3");
    t[0x73] = Some("f4");
    t[0x74] = Some("f5");
    t[0x75] = Some("f6");
    t[0x76] = Some("f7");
    t[0x77] = Some("f8");
    t[0x78] = Some("f9");
    t[0x79] = Some("f10");
    t[0x7A] = Some("f11");
    t[0x7B] = Some("f12");
    t[0x7C] = Some("f13");
    t[0x7D] = Some("f14");
    t[0x7E] = Some("f15");
    t[0x7F] = Some("f16");
    t[0x80] = Some("f17");
    t[0x81] = Some("f18");
    t[0x82] = Some("f19");
    t[0x83] = Some("f20");
    t[0x84] = Some("f21");
    t[0x85] = Some("f22");
    t[0x86] = Some("f23");
    t[0x87] = Some("f24");

    // ── Media keys ────────────────────────────────────────────────────────────
    t[0xAD] = Some("media_volume_mute");
    t[0xAE] = Some("media_volume_down");
    t[0xAF] = Some("media_volume_up");
    t[0xB0] = Some("media_next");
    t[0xB1] = Some("media_previous");
    t[0xB2] = Some("media_stop");
    t[0xB3] = Some("media_play_pause");

    // ── Punctuation (US layout legends; the VK is what matters) ──────────────
    t[0xBA] = Some(";"); // VK_OEM_1
    t[0xBB] = Some("="); // VK_OEM_PLUS
    t[0xBC] = Some(","); // VK_OEM_COMMA
    t[0xBD] = Some("-"); // VK_OEM_MINUS
    t[0xBE] = Some("."); // VK_OEM_PERIOD
    t[0xBF] = Some("/"); // VK_OEM_2
    t[0xC0] = Some("`"); // VK_OEM_3
    t[0xDB] = Some("["); // VK_OEM_4
    t[0xDC] = Some("\\"); // VK_OEM_5
    t[0xDD] = Some("]"); // VK_OEM_6
    t[0xDE] = Some("'"); // VK_OEM_7
    t[0xE2] = Some("<"); // VK_OEM_102, the extra key left of Z on ISO boards

    t
};
