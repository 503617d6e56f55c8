//! Player name validation.

use crate::room::{RoomError, RoomResult};

/// Minimum player name length in characters, after trimming
pub const MIN_NAME_LEN: usize = 3;

/// Maximum player name length in characters, after trimming
pub const MAX_NAME_LEN: usize = 15;

/// Shown when a random or private-room join carries a bad name
pub const NAME_LENGTH_MESSAGE: &str = "Please choose a name between 3 and 15 characters";

/// Shown when an invitation join carries a bad name
pub const INVITATION_NAME_MESSAGE: &str = "Please choose a valid name with at least 3 characters";

/// Trim `raw` and check its length.
///
/// # Errors
///
/// Returns `RoomError::InvalidName(message)` if the trimmed name is shorter
/// than [`MIN_NAME_LEN`] or longer than [`MAX_NAME_LEN`] characters.
pub fn validate_player_name(raw: &str, message: &str) -> RoomResult<String> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        return Err(RoomError::InvalidName(message.to_string()));
    }
    Ok(name.to_string())
}
