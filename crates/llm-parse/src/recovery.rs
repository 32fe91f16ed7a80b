use crate::strategies::strict_object;
use crate::Record;

/// Removes C0 and C1 control characters (U+0000..=U+001F, U+007F..=U+009F).
///
/// Newlines and tabs are control characters too; JSON does not need them between tokens.
pub fn strip_control_characters(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(*c as u32, 0x00..=0x1F | 0x7F..=0x9F))
        .collect()
}

/// Second-chance recovery for a stored raw response.
///
/// Strips control characters and attempts one strict parse. Returns the object if the
/// cleaned text is one; callers decide whether it is usable.
pub fn recover_control_stripped(raw: &str) -> Option<Record> {
    strict_object(strip_control_characters(raw).trim())
}
