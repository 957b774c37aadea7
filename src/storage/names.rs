//! File name validation
//!
//! Stored files live directly under the root, so a name must be a single
//! plain path component.

use crate::error::StoreError;

/// Prefix of in-flight upload files; never a valid stored name
pub const TEMP_PREFIX: &str = ".upload-";

/// Check that `name` maps to exactly one entry directly under the root.
pub fn validate(name: &str) -> Result<(), StoreError> {
    let reserved = name.starts_with(TEMP_PREFIX);
    let special = name.is_empty() || name == "." || name == "..";
    let separators = name.contains(['/', '\\', '\0']);

    if reserved || special || separators {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Whether a directory entry is an in-flight upload
pub fn is_temporary(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX)
}
