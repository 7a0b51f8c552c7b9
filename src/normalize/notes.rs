/// Append `[note]` to a free-text notes field on its own line.
///
/// If `existing` already mentions `note` anywhere it is returned untouched,
/// so repeated repair runs never stack the same tag twice. Blank notes are
/// replaced by the bracketed note alone.
pub fn append_note(existing: Option<&str>, note: &str) -> String {
    let tagged = format!("[{}]", note);
    match existing {
        Some(notes) if !notes.trim().is_empty() => {
            if notes.contains(note) {
                notes.to_string()
            } else {
                format!("{}\n{}", notes, tagged)
            }
        }
        _ => tagged,
    }
}
