use rust_decimal::Decimal;

use crate::error::{DbError, Result};

pub const AMOUNT_DIGITS: u32 = 10;
pub const AMOUNT_PLACES: u32 = 2;

// Column limits, mirrored by CHECKs in the baseline migration
pub const NAME_MAX: usize = 255;
pub const ROLE_MAX: usize = 50;
pub const KIND_MAX: usize = 20;

/// Required text must carry something other than whitespace.
pub fn required<'a>(entity: &'static str, field: &'static str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(DbError::RequiredField {
            entity,
            field: field.to_string(),
        });
    }
    Ok(value)
}

/// Fit `value` into decimal(10,2), carrying exactly two places.
/// Sign is not restricted.
pub fn amount(field: &'static str, value: Decimal) -> Result<Decimal> {
    let invalid = || DbError::InvalidAmount {
        field,
        value: value.to_string(),
    };

    let normalized = value.normalize();
    if normalized.scale() > AMOUNT_PLACES {
        return Err(invalid());
    }

    let mut fixed = normalized;
    fixed.rescale(AMOUNT_PLACES);
    if fixed.mantissa().unsigned_abs() >= 10u128.pow(AMOUNT_DIGITS) {
        return Err(invalid());
    }
    Ok(fixed)
}

/// Reject text longer than the column allows, counted in characters as
/// SQLite's `length()` does.
pub fn max_len<'a>(
    entity: &'static str,
    field: &'static str,
    value: &'a str,
    max: usize,
) -> Result<&'a str> {
    if value.chars().count() > max {
        return Err(DbError::TooLong { entity, field, max });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_missing() {
        assert!(required("group", "name", "Book Club").is_ok());
        let err = required("group", "name", "   ").unwrap_err();
        assert!(matches!(err, DbError::RequiredField { entity: "group", .. }));
    }

    #[test]
    fn amounts_render_with_two_places() {
        assert_eq!(amount("deposit_amount", Decimal::ZERO).unwrap().to_string(), "0.00");
        assert_eq!(amount("deposit_amount", Decimal::new(5, 0)).unwrap().to_string(), "5.00");
        assert_eq!(amount("deposit_amount", Decimal::new(12_50, 2)).unwrap().to_string(), "12.50");
        // trailing zeros beyond two places are fine
        assert_eq!(amount("deposit_amount", Decimal::new(1_2000, 4)).unwrap().to_string(), "1.20");
    }

    #[test]
    fn negative_amounts_are_accepted() {
        assert_eq!(amount("deposit_amount", Decimal::new(-3_25, 2)).unwrap().to_string(), "-3.25");
    }

    #[test]
    fn excess_precision_is_rejected() {
        let err = amount("subscription_amount", Decimal::new(1_005, 3)).unwrap_err();
        assert!(matches!(err, DbError::InvalidAmount { field: "subscription_amount", .. }));
    }

    #[test]
    fn excess_digits_are_rejected() {
        // 99,999,999.99 is the largest value that fits
        assert!(amount("deposit_amount", Decimal::new(99_999_999_99, 2)).is_ok());
        assert!(amount("deposit_amount", Decimal::new(100_000_000, 0)).is_err());
    }

    #[test]
    fn length_counts_characters() {
        assert!(max_len("group", "name", &"é".repeat(255), 255).is_ok());
        let err = max_len("group", "name", &"x".repeat(256), 255).unwrap_err();
        assert!(matches!(err, DbError::TooLong { field: "name", max: 255, .. }));
    }
}
