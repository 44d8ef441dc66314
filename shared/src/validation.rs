//! Validation utilities for the Stockroom inventory platform

// ============================================================================
// Operation Inputs
// ============================================================================

/// Trimmed reference number, or `None` when the caller left it blank
pub fn normalize_reference(number: Option<&str>) -> Option<String> {
    number
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Validate a caller-supplied reference number
pub fn validate_reference_number(number: &str) -> Result<(), &'static str> {
    if number.trim().is_empty() {
        return Err("Reference number cannot be blank");
    }
    if number.len() > 50 {
        return Err("Reference number must be at most 50 characters");
    }
    Ok(())
}

/// Supplier and customer names must carry some text
pub fn validate_party_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Name cannot be blank");
    }
    Ok(())
}

// ============================================================================
// Stock Figures
// ============================================================================

/// Apply a delta, refusing to leave the i32 range
pub fn checked_quantity(current: i32, delta: i32) -> Result<i32, &'static str> {
    current
        .checked_add(delta)
        .ok_or("Stock quantity out of range")
}
