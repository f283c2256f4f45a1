//! Deterministic on-device guess used when no remote backend answers.

/// Marker appended to every local explanation so the UI can tell it apart.
pub const LOCAL_MARKER: &str = "(local placeholder analysis)";

/// Text shown if the local guess itself could not be produced.
pub const LOCAL_FAILURE_TEXT: &str = "Local analysis failed; no result available.";

const HIGH_ENERGY_BYTES: usize = 512 * 1024;
const LOW_ENERGY_BYTES: usize = 50 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalGuess {
    pub label: String,
    pub explanation: String,
}

/// Guess a mood label from the file name and size alone.
pub fn local_guess(file_name: &str, byte_length: usize) -> LocalGuess {
    let name = file_name.to_lowercase();

    let label = if name.contains("angry") || byte_length > HIGH_ENERGY_BYTES {
        "Stressed / High energy"
    } else if name.contains("sad") || byte_length < LOW_ENERGY_BYTES {
        "Sad / Low energy"
    } else if name.contains("happy") {
        "Happy / Positive"
    } else {
        "Neutral / Calm"
    };

    let kib = byte_length as f64 / 1024.0;
    LocalGuess {
        label: label.to_string(),
        explanation: format!(
            "Estimated from file \"{file_name}\" ({kib:.1} KiB) without listening to it {LOCAL_MARKER}."
        ),
    }
}
