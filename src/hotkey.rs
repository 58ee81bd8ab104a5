// 键盘事件 → HotkeyKey 映射
//
// 输入是界面层的原始按键信息（key / code / location），
// 修饰键按左右位置区分，字母和数字按物理位置 code 识别。

use crate::config::HotkeyKey;

/// 修饰键位置：左侧
pub const LOCATION_LEFT: u32 = 1;
/// 修饰键位置：右侧
pub const LOCATION_RIGHT: u32 = 2;

/// 原始按键事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawKey {
    /// 逻辑键值，如 "Control"、"F2"、" "
    pub key: String,
    /// 物理键位，如 "KeyA"、"Digit1"、"Numpad3"
    pub code: String,
    pub location: u32,
}

impl RawKey {
    pub fn new(key: &str, code: &str, location: u32) -> Self {
        Self {
            key: key.to_string(),
            code: code.to_string(),
            location,
        }
    }
}

fn sided(location: u32, left: HotkeyKey, right: HotkeyKey) -> HotkeyKey {
    if location == LOCATION_LEFT {
        left
    } else {
        right
    }
}

fn function_key(n: u8) -> Option<HotkeyKey> {
    Some(match n {
        1 => HotkeyKey::F1, 2 => HotkeyKey::F2, 3 => HotkeyKey::F3,
        4 => HotkeyKey::F4, 5 => HotkeyKey::F5, 6 => HotkeyKey::F6,
        7 => HotkeyKey::F7, 8 => HotkeyKey::F8, 9 => HotkeyKey::F9,
        10 => HotkeyKey::F10, 11 => HotkeyKey::F11, 12 => HotkeyKey::F12,
        _ => return None,
    })
}

fn letter_key(c: char) -> Option<HotkeyKey> {
    Some(match c {
        'A' => HotkeyKey::KeyA, 'B' => HotkeyKey::KeyB, 'C' => HotkeyKey::KeyC,
        'D' => HotkeyKey::KeyD, 'E' => HotkeyKey::KeyE, 'F' => HotkeyKey::KeyF,
        'G' => HotkeyKey::KeyG, 'H' => HotkeyKey::KeyH, 'I' => HotkeyKey::KeyI,
        'J' => HotkeyKey::KeyJ, 'K' => HotkeyKey::KeyK, 'L' => HotkeyKey::KeyL,
        'M' => HotkeyKey::KeyM, 'N' => HotkeyKey::KeyN, 'O' => HotkeyKey::KeyO,
        'P' => HotkeyKey::KeyP, 'Q' => HotkeyKey::KeyQ, 'R' => HotkeyKey::KeyR,
        'S' => HotkeyKey::KeyS, 'T' => HotkeyKey::KeyT, 'U' => HotkeyKey::KeyU,
        'V' => HotkeyKey::KeyV, 'W' => HotkeyKey::KeyW, 'X' => HotkeyKey::KeyX,
        'Y' => HotkeyKey::KeyY, 'Z' => HotkeyKey::KeyZ,
        _ => return None,
    })
}

fn digit_key(c: char) -> Option<HotkeyKey> {
    Some(match c {
        '0' => HotkeyKey::Num0, '1' => HotkeyKey::Num1, '2' => HotkeyKey::Num2,
        '3' => HotkeyKey::Num3, '4' => HotkeyKey::Num4, '5' => HotkeyKey::Num5,
        '6' => HotkeyKey::Num6, '7' => HotkeyKey::Num7, '8' => HotkeyKey::Num8,
        '9' => HotkeyKey::Num9,
        _ => return None,
    })
}

/// 单个字符的后缀，如 "KeyA" 去掉前缀后为 'A'
fn single_char(rest: &str) -> Option<char> {
    let mut chars = rest.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

/// 映射原始按键，不支持的键返回 None
pub fn map_raw_key(raw: &RawKey) -> Option<HotkeyKey> {
    let key = raw.key.as_str();

    // 修饰键（带位置）
    match key {
        "Control" => return Some(sided(raw.location, HotkeyKey::ControlLeft, HotkeyKey::ControlRight)),
        "Shift" => return Some(sided(raw.location, HotkeyKey::ShiftLeft, HotkeyKey::ShiftRight)),
        "Alt" => return Some(sided(raw.location, HotkeyKey::AltLeft, HotkeyKey::AltRight)),
        "Meta" => return Some(sided(raw.location, HotkeyKey::MetaLeft, HotkeyKey::MetaRight)),
        _ => {}
    }

    // 特殊键
    match key {
        " " => return Some(HotkeyKey::Space),
        "Tab" => return Some(HotkeyKey::Tab),
        "Escape" => return Some(HotkeyKey::Escape),
        "CapsLock" => return Some(HotkeyKey::CapsLock),
        _ => {}
    }

    // 功能键 F1-F12
    if let Some(n) = key.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
        if let Some(f) = function_key(n) {
            return Some(f);
        }
    }

    // 字母键
    if let Some(c) = raw.code.strip_prefix("Key").and_then(single_char) {
        if let Some(letter) = letter_key(c) {
            return Some(letter);
        }
    }

    // 数字键（主键盘区与小键盘）
    if let Some(c) = raw
        .code
        .strip_prefix("Digit")
        .or_else(|| raw.code.strip_prefix("Numpad"))
        .and_then(single_char)
    {
        if let Some(digit) = digit_key(c) {
            return Some(digit);
        }
    }

    match key {
        "ArrowUp" => Some(HotkeyKey::Up),
        "ArrowDown" => Some(HotkeyKey::Down),
        "ArrowLeft" => Some(HotkeyKey::Left),
        "ArrowRight" => Some(HotkeyKey::Right),
        "Enter" => Some(HotkeyKey::Return),
        "Backspace" => Some(HotkeyKey::Backspace),
        "Delete" => Some(HotkeyKey::Delete),
        "Insert" => Some(HotkeyKey::Insert),
        "Home" => Some(HotkeyKey::Home),
        "End" => Some(HotkeyKey::End),
        "PageUp" => Some(HotkeyKey::PageUp),
        "PageDown" => Some(HotkeyKey::PageDown),
        _ => None,
    }
}
