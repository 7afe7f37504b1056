// src/scoring/shift.rs

/// Derives the storage identifier of an exam shift.
///
/// `("13/10/2025", "9:30 AM - 11:00 AM")` becomes `"13-10-2025_9-30AM-11-00AM"`.
/// The result contains no whitespace and no path separators.
pub fn resolve_shift_id(exam_date: &str, exam_time: &str) -> String {
    let date = sanitize(exam_date, '/');
    let time = sanitize(exam_time, ':');
    format!("{}_{}", date, time)
}

fn sanitize(segment: &str, separator: char) -> String {
    segment
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            c if c == separator || c == '/' || c == '\\' => '-',
            c => c,
        })
        .collect()
}
